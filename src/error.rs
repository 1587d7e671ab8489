use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a generation. Configuration problems never show up here:
/// they are absorbed with defaults while the settings are resolved.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid settings file: {0}")]
    Settings(serde_json::Error),

    #[error("invalid content file: {0}")]
    Content(serde_json::Error),

    #[error("could not serialize recorded pages: {0}")]
    Serialize(serde_json::Error),

    #[error("page index {index} is out of range (document has {count} pages)")]
    PageOutOfRange { index: usize, count: usize },

    #[error("no page has been created yet")]
    NoActivePage,

    #[error("text measurement failed: {0}")]
    Measure(String),

    #[error("font error: {0}")]
    Font(String),

    #[error("image error: {0}")]
    Image(String),
}
