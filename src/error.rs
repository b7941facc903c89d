// src/error.rs
//! Error types surfaced by the crate.
//!
//! Only misuse of the delta engine is a hard failure inside the decoding core.
//! Unknown tags, mismatched tags and unparseable JSON prefixes are absorbed and
//! show up only in the content of the output.

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, StreamError>;

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// `content` handed to the delta engine does not extend `previous`.
    #[error(
        "partial JSON content ({content_len} bytes) does not start with the previous content ({previous_len} bytes)"
    )]
    ProtocolMisuse {
        previous_len: usize,
        content_len: usize,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
