//! Error types for cubbydb
//!
//! Every operation fails by returning an error through its own future; there
//! is no process-wide error channel and nothing is logged in place of a
//! returned error.

use thiserror::Error;

/// The main error type for cubbydb operations
#[derive(Error, Debug)]
pub enum Error {
    // ========== Argument Errors ==========
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // ========== Connection Errors ==========
    #[error("Failed to open database '{name}': {source}")]
    Open {
        name: String,
        #[source]
        source: EngineError,
    },

    // ========== Transaction Errors ==========
    #[error("Write failed on store '{store}': {source}")]
    Write {
        store: String,
        #[source]
        source: EngineError,
    },

    #[error("Read failed on store '{store}': {source}")]
    Read {
        store: String,
        #[source]
        source: EngineError,
    },

    #[error("Clear failed on store '{store}': {source}")]
    Clear {
        store: String,
        #[source]
        source: EngineError,
    },

    // ========== Deletion Errors ==========
    #[error("Failed to delete database '{name}': {source}")]
    Delete {
        name: String,
        #[source]
        source: EngineError,
    },

    #[error("Deletion of database '{name}' still blocked after {attempts} attempts")]
    DeleteBlocked { name: String, attempts: u32 },

    // ========== Internal Errors ==========
    #[error("Host engine dropped a request without replying")]
    Disconnected,
}

/// Result type alias for cubbydb operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns true if this error was raised before any host interaction
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// Returns true if this error came out of the host engine
    pub fn is_host(&self) -> bool {
        matches!(
            self,
            Error::Open { .. }
                | Error::Write { .. }
                | Error::Read { .. }
                | Error::Clear { .. }
                | Error::Delete { .. }
        )
    }
}

/// Failures reported by the host storage engine itself.
///
/// These surface to callers wrapped in the operation-scoped [`Error`]
/// variants above.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("requested version {requested} is below the existing version {current}")]
    VersionMismatch { requested: u32, current: u32 },

    #[error("database not found: {0}")]
    DatabaseNotFound(String),

    #[error("store not found: {0}")]
    StoreNotFound(String),

    #[error("connection is closed")]
    ConnectionClosed,

    #[error("transaction is read-only")]
    ReadOnly,

    #[error("cursor is not positioned on an entry")]
    CursorNotPositioned,

    #[error("upgrade failed: {0}")]
    Upgrade(String),

    #[error("backend failure: {0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Open {
            name: "inventory".to_string(),
            source: EngineError::Backend("quota exceeded".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Failed to open database 'inventory': backend failure: quota exceeded"
        );
    }

    #[test]
    fn test_delete_blocked_display() {
        let err = Error::DeleteBlocked {
            name: "inventory".to_string(),
            attempts: 5,
        };
        assert_eq!(
            err.to_string(),
            "Deletion of database 'inventory' still blocked after 5 attempts"
        );
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::Validation("name".to_string()).is_validation());
        assert!(!Error::Disconnected.is_validation());
        assert!(
            Error::Write {
                store: "s".to_string(),
                source: EngineError::ReadOnly,
            }
            .is_host()
        );
        assert!(!Error::Validation("name".to_string()).is_host());
    }
}
