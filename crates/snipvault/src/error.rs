use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by the store.
///
/// The enum is `Clone` because a coalesced read hands one outcome to every
/// waiting caller; I/O and serde errors are kept behind `Arc` for that reason.
#[derive(Error, Debug, Clone)]
pub enum SnipError {
    #[error("Snippet not found: {0}")]
    SnippetNotFound(String),

    #[error("Directory not found: {0}")]
    DirectoryNotFound(String),

    #[error("Directory {key} cannot be moved under {parent}: it would become its own ancestor")]
    InvalidParent { key: String, parent: String },

    #[error("IO error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("Verification failed for {}: temporary file does not match intended content", path.display())]
    Verification { path: PathBuf },

    #[error("Serialization error: {0}")]
    Serialization(Arc<serde_json::Error>),

    #[error("{operation} of {} failed after {attempts} attempt(s): {source}", path.display())]
    Fatal {
        operation: &'static str,
        path: PathBuf,
        attempts: u32,
        #[source]
        source: Box<SnipError>,
    },

    #[error("Config error: {0}")]
    Config(String),
}

impl SnipError {
    /// True for `SnippetNotFound` and `DirectoryNotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SnipError::SnippetNotFound(_) | SnipError::DirectoryNotFound(_)
        )
    }

    /// Failures that may resolve on retry: I/O, verification, and parse errors
    /// of a file that another writer may have been replacing.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SnipError::Io(_) | SnipError::Verification { .. } | SnipError::Serialization(_)
        )
    }
}

impl From<std::io::Error> for SnipError {
    fn from(err: std::io::Error) -> Self {
        SnipError::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for SnipError {
    fn from(err: serde_json::Error) -> Self {
        SnipError::Serialization(Arc::new(err))
    }
}

impl From<confique::Error> for SnipError {
    fn from(err: confique::Error) -> Self {
        SnipError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SnipError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_not_transient() {
        let err = SnipError::SnippetNotFound("s1".into());
        assert!(err.is_not_found());
        assert!(!err.is_transient());
    }

    #[test]
    fn fatal_message_names_operation_and_cause() {
        let err = SnipError::Fatal {
            operation: "commit",
            path: PathBuf::from("/tmp/snippets.json"),
            attempts: 3,
            source: Box::new(SnipError::Verification {
                path: PathBuf::from("/tmp/snippets.json.tmp"),
            }),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("commit of /tmp/snippets.json failed after 3 attempt(s)"));
        assert!(msg.contains("Verification failed"));
    }
}
