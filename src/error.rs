//! Error types for inkprep operations.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors that abort processing. No output file is produced.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("invalid input {path}: {reason}")]
    InvalidInput { path: PathBuf, reason: String },

    #[error("malformed package document: {0}")]
    MalformedPackage(String),

    #[error("container I/O failed ({context}): {source}")]
    ContainerIo {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Non-fatal conditions. These are accumulated on the pipeline report and
/// logged, never raised as [`Error`].
#[derive(Error, Debug, Clone)]
pub enum Warning {
    #[error("container has no mimetype entry")]
    MissingMimetype,

    #[error("navigation document {path} left unmodified: {reason}")]
    Navigation { path: PathBuf, reason: String },

    #[error("could not delete image {path}: {reason}")]
    ImageNotDeleted { path: PathBuf, reason: String },

    #[error("replacement stylesheet not found: {path}")]
    StylesheetMissing { path: PathBuf },

    #[error("spine shorter than trim request: removed {removed} of {requested}")]
    ShortSpine { requested: usize, removed: usize },
}
