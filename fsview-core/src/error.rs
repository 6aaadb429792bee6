use std::path::PathBuf;

use thiserror::Error;

const MIB: f64 = 1024.0 * 1024.0;

#[derive(Error, Debug)]
pub enum FsError {
    #[error("path traversal not allowed: {0}")]
    PathTraversal(String),

    #[error("Invalid file path: {0}")]
    InvalidPath(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Path not accessible: {path}: {source}")]
    NotAccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Path is not a file: {0}")]
    NotAFile(String),

    #[error("File too large ({:.2} MB > {:.2} MB)", mib(.size), mib(.max))]
    TooLarge { size: u64, max: u64 },

    #[error("Failed to read file: {path}: {source}")]
    ReadFailure {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid queries JSON: {0}")]
    InvalidQueriesEncoding(String),

    #[error("At least one search query is required")]
    NoQueries,

    #[error("Maximum {max} search queries allowed (got {count})")]
    TooManyQueries { count: usize, max: usize },

    #[error("grep command failed: {0}")]
    SearchProcessFailure(String),

    #[error("grep command timed out after {0} seconds")]
    SearchTimeout(u64),
}

fn mib(bytes: &u64) -> f64 {
    *bytes as f64 / MIB
}

impl FsError {
    pub fn is_traversal(&self) -> bool {
        matches!(self, Self::PathTraversal(_))
    }
}
