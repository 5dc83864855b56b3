// In: src/error.rs

//! This module defines the single, unified error type for the entire prefpack library.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error handling.
//!
//! Decode-length mismatches are deliberately absent: they indicate an internal
//! inconsistency between the length arrays and the block arrays and are raised
//! as panics by the codec layer.

use thiserror::Error;

/// Which of the two mirrored indices an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    User,
    Item,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::User => write!(f, "user"),
            Axis::Item => write!(f, "item"),
        }
    }
}

#[derive(Error, Debug)]
pub enum PrefError {
    // =========================================================================
    // === Configuration Errors (fatal, reported before any decoding work)
    // =========================================================================
    #[error("Unknown codec name: '{0}'")]
    UnknownCodec(String),

    #[error("Invalid parameter for codec '{name}': {reason}")]
    InvalidCodecParameter { name: String, reason: String },

    #[error("Codec '{id_codec}' cannot be combined with value codec '{value_codec}': {reason}")]
    IncompatibleCodecs {
        id_codec: String,
        value_codec: String,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    // =========================================================================
    // === Construction & Kernel Errors
    // =========================================================================
    #[error("{axis} index {index} is out of range for an index of size {len}")]
    IndexOutOfRange { axis: Axis, index: usize, len: usize },

    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("Decoding failed, the block is truncated or corrupted: {0}")]
    Decode(String),

    #[error("Could not build the construction thread pool: {0}")]
    ThreadPool(String),

    // =========================================================================
    // === Input & Persistence Errors
    // =========================================================================
    #[error("Malformed input at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Persisted store format error: {0}")]
    Format(String),

    #[error("Zstd operation failed: {0}")]
    Zstd(String),

    // =========================================================================
    // === External Error Wrappers (Using #[from] for automatic conversion)
    // =========================================================================
    /// An error originating from the underlying I/O subsystem (e.g., file not found).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error from the Serde JSON library, typically during header or config parsing.
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

impl PrefError {
    /// True for the errors that abort construction because of a bad configuration.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            PrefError::UnknownCodec(_)
                | PrefError::InvalidCodecParameter { .. }
                | PrefError::IncompatibleCodecs { .. }
                | PrefError::Config(_)
        )
    }
}

impl From<rayon::ThreadPoolBuildError> for PrefError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        PrefError::ThreadPool(err.to_string())
    }
}
