use std::io;

/// Everything that can stop a request (or a mount) from being served.
///
/// Filesystem "absent" and "broken" stay separate all the way up: only the
/// not-found class may be handed to the next handler or rewritten to the SPA
/// index.
#[derive(thiserror::Error, Debug)]
pub enum ServeError {
    #[error("malformed request path: {path:?}")]
    MalformedPath { path: String },

    #[error("not found: {path}")]
    NotFound { path: String },

    #[error("directory {path} has no {index}")]
    DirectoryWithoutIndex { path: String, index: String },

    #[error("I/O failure on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),
}

impl ServeError {
    /// Maps a filesystem error on `path` into the taxonomy, keeping `NotFound` apart.
    pub fn from_io(path: &str, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            ServeError::NotFound {
                path: path.to_string(),
            }
        } else {
            ServeError::Io {
                path: path.to_string(),
                source,
            }
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            ServeError::MalformedPath { .. } => 400,
            ServeError::NotFound { .. } | ServeError::DirectoryWithoutIndex { .. } => 404,
            ServeError::Io { .. } | ServeError::ConfigInvalid(_) => 500,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ServeError::NotFound { .. } | ServeError::DirectoryWithoutIndex { .. }
        )
    }
}

impl From<ServeError> for io::Error {
    fn from(error: ServeError) -> Self {
        match error {
            ServeError::Io { source, .. } => source,
            ServeError::NotFound { .. } | ServeError::DirectoryWithoutIndex { .. } => {
                io::Error::new(io::ErrorKind::NotFound, error)
            }
            ServeError::MalformedPath { .. } | ServeError::ConfigInvalid(_) => {
                io::Error::new(io::ErrorKind::InvalidInput, error)
            }
        }
    }
}
