//! This module contains the kernels for Zstandard compression and decompression
//! of persisted store bodies.
//!
//! The per-row codecs already remove most redundancy, so this is an optional
//! final stage applied to the whole serialized blob (mostly helps the JSON
//! header and the identifier tables). It is a panic-free wrapper around the
//! `zstd` crate.

use std::io::Write;
use zstd::stream::{Decoder, Encoder};

use crate::error::PrefError;

//==================================================================================
// 1. Public API
//==================================================================================

/// Compresses a byte slice, appending one zstd frame to `output_buf`.
pub fn encode(input_bytes: &[u8], output_buf: &mut Vec<u8>, level: i32) -> Result<(), PrefError> {
    let mut encoder =
        Encoder::new(output_buf, level).map_err(|e| PrefError::Zstd(e.to_string()))?;
    encoder
        .write_all(input_bytes)
        .map_err(|e| PrefError::Zstd(e.to_string()))?;

    // `finish` is essential to finalize the Zstd frame.
    encoder
        .finish()
        .map_err(|e| PrefError::Zstd(e.to_string()))?;
    Ok(())
}

/// Decompresses a zstd frame, appending the result to `output_buf`.
pub fn decode(input_bytes: &[u8], output_buf: &mut Vec<u8>) -> Result<(), PrefError> {
    let mut decoder = Decoder::new(input_bytes).map_err(|e| PrefError::Zstd(e.to_string()))?;
    std::io::copy(&mut decoder, output_buf).map_err(|e| PrefError::Zstd(e.to_string()))?;
    Ok(())
}

//==================================================================================
// 2. Unit Tests
//==================================================================================
