//! Record trait for persisted documents

use serde::Serialize;
use serde::de::DeserializeOwned;

/// A document that can be persisted in a [`Store`](crate::Store) collection
pub trait Record: Serialize + DeserializeOwned + Send + 'static {
    /// Unique identifier within the collection
    fn id(&self) -> &str;

    /// Last modification time (Unix milliseconds)
    fn updated_at(&self) -> i64;

    /// Name of the collection this record type lives in
    fn collection_name() -> &'static str;
}

/// Current time in Unix milliseconds
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_ms_is_monotonic_enough() {
        let a = now_ms();
        let b = now_ms();
        assert!(a > 1_600_000_000_000);
        assert!(b >= a);
    }
}
