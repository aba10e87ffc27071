use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("malformed JSON: {0}")]
    Json(#[from] json::Error),

    /// The payload parsed, but a required field was missing or had the wrong type.
    #[error("unexpected response: {0}")]
    Shape(&'static str),

    #[error("storage: {0}")]
    Io(#[from] io::Error),

    #[error("location unavailable")]
    LocationUnavailable,

    #[error("timed out")]
    Timeout,

    #[error("cancelled")]
    Cancelled,

    #[error("display: {0}")]
    Display(String),
}

impl From<&'static str> for Error {
    fn from(message: &'static str) -> Self {
        Self::Shape(message)
    }
}

impl From<piet::Error> for Error {
    fn from(error: piet::Error) -> Self {
        Self::Display(error.to_string())
    }
}
