use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("start index {index} is out of range for a queue of {len} episodes")]
    InvalidIndex { index: usize, len: usize },

    #[error("unsupported media url {0}")]
    UnsupportedUrl(String),

    #[error("no media source loaded")]
    NoSource,

    #[error("media error: {0}")]
    Media(String),
}

pub type Result<T> = std::result::Result<T, PlaybackError>;
