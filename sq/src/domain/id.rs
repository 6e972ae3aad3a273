//! Queue item ID generation
//!
//! All IDs use the format: `{kind}-{uuid-v7}`
//! Example: `req-0192f5a4c3d27e8b9a61f0c2d4e5b6a7`

/// Generate a unique, time-ordered ID for a queued item
pub fn generate_id(kind: &str) -> String {
    format!("{}-{}", kind, uuid::Uuid::now_v7().simple())
}
