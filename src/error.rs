use thiserror::Error;

/// Domain errors for the tracking core.
///
/// Every variant is recoverable at the workflow level: validation and lookup
/// failures go back to the operator, store and sync failures keep prior
/// in-memory state and wait for a manual or connectivity-triggered retry.
/// Missing references in display joins are not errors at all; they degrade
/// to placeholder values.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// User-correctable input problem; names the offending field and blocks
    /// the submission with no partial write.
    #[error("validation failed on '{field}': {message}")]
    Validation { field: &'static str, message: String },

    /// The vehicle or company a mutation addresses does not exist.
    #[error("{entity} '{id}' not found")]
    Lookup { entity: &'static str, id: String },

    /// Document store or local durable storage failure.
    #[error("store operation failed: {0}")]
    Store(String),

    /// Offline queue drain failure; the queue is left intact.
    #[error("offline sync failed after {completed}/{attempted} entries: {message}")]
    Sync {
        attempted: usize,
        completed: usize,
        message: String,
    },
}

impl TrackerError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn lookup(entity: &'static str, id: impl Into<String>) -> Self {
        Self::Lookup {
            entity,
            id: id.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
