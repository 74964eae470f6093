use std::path::PathBuf;

/// Errors that can occur in interactome.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid parameter: {0}")]
    Parameter(String),

    #[error("I/O error: {source} ({path})")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("malformed alignment record at {path}:{line}: {message}")]
    Record {
        path: PathBuf,
        line: u64,
        message: String,
    },

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("paired alignment streams out of sync: mate 1 at '{mate1}', mate 2 at '{mate2}'")]
    Desynchronized { mate1: String, mate2: String },
}

impl Error {
    /// Convenience for wrapping an `io::Error` with a path context.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            source,
            path: path.into(),
        }
    }

    /// Malformed-record error at a given line of an alignment file.
    pub fn record(path: impl Into<PathBuf>, line: u64, message: impl Into<String>) -> Self {
        Self::Record {
            path: path.into(),
            line,
            message: message.into(),
        }
    }
}
