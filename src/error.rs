use std::path::PathBuf;

use thiserror::Error;

/// The stats page could not be retrieved.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("status code error: {status} from {url}")]
    Status { url: String, status: u16 },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// A table row whose cells could not be read at all. The scan skips the row.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowError {
    #[error("row has no cells")]
    NoCells,
}

/// Failure of a whole invocation (ingest or report).
#[derive(Debug, Error)]
pub enum Error {
    #[error("source unavailable: {0}")]
    SourceUnavailable(#[from] FetchError),
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
