use std::path::PathBuf;

/// Errors raised by the preference store.
///
/// `Validation` carries a human-readable message meant to reach the client
/// unchanged (HTTP 400 in the server, a one-line summary in the CLI).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Validation(String),
    #[error("Preference type not found: {0}")]
    UnknownDocument(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
