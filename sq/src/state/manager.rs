//! QueueStore - actor that owns the queuestore backend
//!
//! Processes commands via channels for thread-safe access to persistent state.

use std::path::Path;

use queuestore::Store;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::domain::Record;

use super::messages::{Collection, StoreCommand, StoreError, StoreResponse};

/// Handle to send commands to the QueueStore actor
#[derive(Clone)]
pub struct QueueStore {
    tx: mpsc::Sender<StoreCommand>,
}

impl QueueStore {
    /// Open the backend at `db_path` and spawn the actor
    ///
    /// A backend that cannot be opened is reported as `Unavailable`.
    pub fn spawn(db_path: impl AsRef<Path>) -> StoreResponse<Self> {
        let db_path = db_path.as_ref();
        debug!(db_path = %db_path.display(), "QueueStore::spawn: called");
        let store = Store::open(db_path).map_err(|e| {
            error!(db_path = %db_path.display(), error = %e, "Failed to open queue store");
            StoreError::Unavailable(e.to_string())
        })?;
        Ok(Self::from_store(store))
    }

    /// Spawn an actor over an in-memory backend (useful for testing)
    pub fn spawn_in_memory() -> StoreResponse<Self> {
        debug!("QueueStore::spawn_in_memory: called");
        let store = Store::open_in_memory().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self::from_store(store))
    }

    fn from_store(store: Store) -> Self {
        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(actor_loop(store, rx));
        info!("QueueStore spawned");
        Self { tx }
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<StoreResponse<T>>) -> StoreCommand) -> StoreResponse<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(command(reply_tx))
            .await
            .map_err(|_| StoreError::Unavailable("store is closed".to_string()))?;
        reply_rx
            .await
            .map_err(|_| StoreError::Unavailable("store closed before replying".to_string()))?
    }

    /// Persist a new item, returning its id
    pub async fn add<R: Record>(&self, record: &R) -> StoreResponse<String> {
        let id = record.id().to_string();
        debug!(%id, collection = R::collection_name(), "add: called");
        let data = serde_json::to_value(record).map_err(|e| StoreError::Backend(e.to_string()))?;
        let updated_at = record.updated_at();
        let cmd_id = id.clone();
        self.request(|reply| StoreCommand::Add {
            collection: R::collection_name(),
            id: cmd_id,
            data,
            updated_at,
            reply,
        })
        .await?;
        Ok(id)
    }

    /// Fetch an item by id
    pub async fn get<R: Record>(&self, id: &str) -> StoreResponse<Option<R>> {
        debug!(%id, collection = R::collection_name(), "get: called");
        let value = self
            .request(|reply| StoreCommand::Get {
                collection: R::collection_name(),
                id: id.to_string(),
                reply,
            })
            .await?;
        value.map(decode::<R>).transpose()
    }

    /// Every item in the record type's collection, in insertion order
    pub async fn get_all<R: Record>(&self) -> StoreResponse<Vec<R>> {
        debug!(collection = R::collection_name(), "get_all: called");
        let values = self
            .request(|reply| StoreCommand::GetAll {
                collection: R::collection_name(),
                reply,
            })
            .await?;
        values.into_iter().map(decode::<R>).collect()
    }

    /// Replace an existing item
    pub async fn update<R: Record>(&self, record: &R) -> StoreResponse<()> {
        debug!(id = %record.id(), collection = R::collection_name(), "update: called");
        let data = serde_json::to_value(record).map_err(|e| StoreError::Backend(e.to_string()))?;
        let updated_at = record.updated_at();
        self.request(|reply| StoreCommand::Update {
            collection: R::collection_name(),
            id: record.id().to_string(),
            data,
            updated_at,
            reply,
        })
        .await
    }

    /// Delete an item, returning whether it existed
    pub async fn delete(&self, collection: Collection, id: &str) -> StoreResponse<bool> {
        debug!(%collection, %id, "delete: called");
        self.request(|reply| StoreCommand::Delete {
            collection: collection.name(),
            id: id.to_string(),
            reply,
        })
        .await
    }

    /// Number of items in a collection
    pub async fn count(&self, collection: Collection) -> StoreResponse<usize> {
        debug!(%collection, "count: called");
        self.request(|reply| StoreCommand::Count {
            collection: collection.name(),
            reply,
        })
        .await
    }

    /// Remove every item in a collection, returning how many were removed
    pub async fn clear(&self, collection: Collection) -> StoreResponse<usize> {
        debug!(%collection, "clear: called");
        self.request(|reply| StoreCommand::Clear {
            collection: collection.name(),
            reply,
        })
        .await
    }

    /// Check whether the actor has stopped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Stop the actor and release the backend
    ///
    /// Every later call on any clone of this handle fails with `Unavailable`.
    pub async fn close(&self) -> StoreResponse<()> {
        debug!("close: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::Shutdown { reply: reply_tx })
            .await
            .map_err(|_| StoreError::Unavailable("store is closed".to_string()))?;
        let _ = reply_rx.await;
        Ok(())
    }
}

fn decode<R: Record>(value: Value) -> StoreResponse<R> {
    serde_json::from_value(value).map_err(|e| StoreError::Deserialization(e.to_string()))
}

/// The actor loop that owns the Store and processes commands
async fn actor_loop(mut store: Store, mut rx: mpsc::Receiver<StoreCommand>) {
    debug!("QueueStore actor started");

    while let Some(cmd) = rx.recv().await {
        match cmd {
            StoreCommand::Add {
                collection,
                id,
                data,
                updated_at,
                reply,
            } => {
                debug!(%collection, %id, "actor_loop: Add command");
                let result = store
                    .insert_value(collection, &id, &data, updated_at)
                    .map_err(StoreError::from);
                let _ = reply.send(result);
            }

            StoreCommand::Get { collection, id, reply } => {
                debug!(%collection, %id, "actor_loop: Get command");
                let result = store.get_value(collection, &id).map_err(StoreError::from);
                let _ = reply.send(result);
            }

            StoreCommand::GetAll { collection, reply } => {
                debug!(%collection, "actor_loop: GetAll command");
                let result = store.list_values(collection).map_err(StoreError::from);
                let _ = reply.send(result);
            }

            StoreCommand::Update {
                collection,
                id,
                data,
                updated_at,
                reply,
            } => {
                debug!(%collection, %id, "actor_loop: Update command");
                let result = store
                    .update_value(collection, &id, &data, updated_at)
                    .map_err(StoreError::from);
                let _ = reply.send(result);
            }

            StoreCommand::Delete { collection, id, reply } => {
                debug!(%collection, %id, "actor_loop: Delete command");
                let result = store.delete(collection, &id).map_err(StoreError::from);
                let _ = reply.send(result);
            }

            StoreCommand::Count { collection, reply } => {
                debug!(%collection, "actor_loop: Count command");
                let result = store.count(collection).map_err(StoreError::from);
                let _ = reply.send(result);
            }

            StoreCommand::Clear { collection, reply } => {
                debug!(%collection, "actor_loop: Clear command");
                let result = store.clear(collection).map_err(StoreError::from);
                let _ = reply.send(result);
            }

            StoreCommand::Shutdown { reply } => {
                debug!("actor_loop: Shutdown command");
                info!("QueueStore shutting down");
                drop(store);
                let _ = reply.send(());
                return;
            }
        }
    }

    debug!("QueueStore actor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{HttpMethod, Priority, QueuedRequest, RecordType, RequestTarget, SyncRecord};
    use serde_json::json;
    use tempfile::tempdir;

    fn request(url: &str) -> QueuedRequest {
        QueuedRequest::new(RequestTarget::new(url, HttpMethod::Post), 3)
    }

    #[tokio::test]
    async fn test_queue_store_request_crud() {
        let store = QueueStore::spawn_in_memory().unwrap();

        // Add
        let req = request("/api/workouts");
        let id = store.add(&req).await.unwrap();
        assert_eq!(id, req.id);

        // Get
        let fetched: QueuedRequest = store.get(&id).await.unwrap().unwrap();
        assert_eq!(fetched.target.url, "/api/workouts");

        // Update
        let mut updated = fetched.clone();
        updated.record_failure("503");
        store.update(&updated).await.unwrap();
        let fetched: QueuedRequest = store.get(&id).await.unwrap().unwrap();
        assert_eq!(fetched.attempts, 1);

        // GetAll
        let all: Vec<QueuedRequest> = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);

        // Delete
        assert!(store.delete(Collection::Requests, &id).await.unwrap());
        assert!(store.get::<QueuedRequest>(&id).await.unwrap().is_none());

        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_collections_are_independent() {
        let store = QueueStore::spawn_in_memory().unwrap();
        store.add(&request("/a")).await.unwrap();
        store.add(&request("/b")).await.unwrap();
        store
            .add(&SyncRecord::new(json!({"id": "w1"}), RecordType::Workout, Priority::High))
            .await
            .unwrap();

        assert_eq!(store.count(Collection::Requests).await.unwrap(), 2);
        assert_eq!(store.count(Collection::SyncData).await.unwrap(), 1);

        assert_eq!(store.clear(Collection::Requests).await.unwrap(), 2);
        assert_eq!(store.count(Collection::Requests).await.unwrap(), 0);
        assert_eq!(store.count(Collection::SyncData).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = QueueStore::spawn_in_memory().unwrap();
        let err = store.update(&request("/ghost")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_add_duplicate_is_rejected() {
        let store = QueueStore::spawn_in_memory().unwrap();
        let req = request("/once");
        store.add(&req).await.unwrap();
        let err = store.add(&req).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_closed_store_is_unavailable() {
        let store = QueueStore::spawn_in_memory().unwrap();
        let other_handle = store.clone();
        store.close().await.unwrap();

        let err = other_handle.add(&request("/late")).await.unwrap_err();
        assert!(err.is_unavailable());
        let err = other_handle.get_all::<QueuedRequest>().await.unwrap_err();
        assert!(err.is_unavailable());
        assert!(other_handle.is_closed());
    }

    #[tokio::test]
    async fn test_unopenable_backend_is_unavailable() {
        let temp = tempdir().unwrap();
        // A directory cannot be opened as a database file
        let result = QueueStore::spawn(temp.path());
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_items_survive_restart() {
        let temp = tempdir().unwrap();
        let db_path = temp.path().join("queue.db");

        let store = QueueStore::spawn(&db_path).unwrap();
        let id = store.add(&request("/persist")).await.unwrap();
        store.close().await.unwrap();

        let reopened = QueueStore::spawn(&db_path).unwrap();
        let fetched: Option<QueuedRequest> = reopened.get(&id).await.unwrap();
        assert_eq!(fetched.unwrap().target.url, "/persist");
    }
}
