use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to build the extension index. Fatal to a counting pass.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read language dataset '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed language dataset: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
    },
}

/// Recoverable failures met while walking or counting. These are logged,
/// collected, and never stop the report from being produced.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Error reading directory {}: {source}", path.display())]
    DirectoryAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Error counting lines in {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ScanError {
    pub fn path(&self) -> &PathBuf {
        match self {
            ScanError::DirectoryAccess { path, .. } | ScanError::FileRead { path, .. } => path,
        }
    }
}
