//! This module collects the pure, stateless kernels behind every codec.
//!
//! Kernels work on `&[u32]` runs and know nothing about preferences: the codec
//! layer (`crate::codec`) decides which kernel to call, validates its input and
//! reinterprets the store's `i32` runs. The delta coder lives here too because
//! the store applies it around non-integrated codecs.

//==================================================================================
// 1. Module Declarations
//==================================================================================

/// Shared bit stream plumbing.
pub mod bitio;

/// Value reduction
pub mod delta;

/// Bit-oriented universal codes
pub mod gamma;
pub mod rice;
pub mod zeta;

/// Fixed and byte-aligned widths
pub mod bitpack;
pub mod frame_of_reference;
pub mod vbyte;

/// Word-aligned and patched packing
pub mod pfor;
pub mod simple16;

/// Monotonic sequences
pub mod elias_fano;

/// Final stage for persisted blobs
pub mod zstd;
