// In: src/codec/mod.rs

//! The codec contract shared by every compression algorithm in the store.
//!
//! A codec compresses a contiguous run of `i32` into an [`EncodedBlock`] and
//! restores it on demand. Two flags describe what a codec expects from its
//! caller:
//!
//! * **integrated** codecs encode absolute values directly, so the store must
//!   not delta code identifier lists before handing them over;
//! * **sorted-only** codecs (a subset of the integrated ones) additionally rely
//!   on non-decreasing input and are therefore unusable for ratings.
//!
//! The built-in implementation, [`KernelCodec`], dispatches on a serialisable
//! [`CodecKind`] descriptor to the kernels in `crate::kernels`.

pub mod policy;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::PrefError;
use crate::kernels::pfor::PforVariant;
use crate::kernels::{
    bitpack, elias_fano, frame_of_reference, gamma, pfor, rice, simple16, vbyte, zeta,
};

//==================================================================================
// I. Codec Descriptor
//==================================================================================

/// Identifies a codec and its parameters. This is what gets persisted.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(tag = "codec", content = "params")]
pub enum CodecKind {
    /// Raw 32-bit integers.
    #[serde(rename = "null")]
    Null,
    #[serde(rename = "gamma")]
    Gamma,
    #[serde(rename = "zeta")]
    Zeta { k: u8 },
    #[serde(rename = "rice")]
    Rice,
    /// Fixed-width bit-packing of absolute values.
    #[serde(rename = "fixed")]
    Fixed { bit_width: u8 },
    #[serde(rename = "vbyte")]
    VByte,
    #[serde(rename = "ivbyte")]
    IntegratedVByte,
    #[serde(rename = "for")]
    For,
    #[serde(rename = "ifor")]
    IntegratedFor,
    #[serde(rename = "simple")]
    Simple16,
    #[serde(rename = "optpfd")]
    OptPfd,
    #[serde(rename = "newpfd")]
    NewPfd,
    #[serde(rename = "fastpfor")]
    FastPfor,
    /// Elias-Fano over non-decreasing identifier lists.
    #[serde(rename = "succinct")]
    Succinct,
}

/// The two physical payload shapes a codec can produce.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PayloadShape {
    Bytes,
    Words,
}

impl CodecKind {
    /// The configuration family name, without parameters.
    pub fn family(&self) -> &'static str {
        match self {
            CodecKind::Null => "null",
            CodecKind::Gamma => "gamma",
            CodecKind::Zeta { .. } => "zeta",
            CodecKind::Rice => "rice",
            CodecKind::Fixed { .. } => "fixed",
            CodecKind::VByte => "vbyte",
            CodecKind::IntegratedVByte => "ivbyte",
            CodecKind::For => "for",
            CodecKind::IntegratedFor => "ifor",
            CodecKind::Simple16 => "simple",
            CodecKind::OptPfd => "optpfd",
            CodecKind::NewPfd => "newpfd",
            CodecKind::FastPfor => "fastpfor",
            CodecKind::Succinct => "succinct",
        }
    }

    /// True if absolute values are encoded as-is (no caller-side delta coding).
    pub fn is_integrated(&self) -> bool {
        matches!(
            self,
            CodecKind::Fixed { .. }
                | CodecKind::IntegratedVByte
                | CodecKind::IntegratedFor
                | CodecKind::Succinct
        )
    }

    /// True if the encoding itself relies on non-decreasing input.
    pub fn requires_sorted(&self) -> bool {
        matches!(
            self,
            CodecKind::IntegratedVByte | CodecKind::IntegratedFor | CodecKind::Succinct
        )
    }

    pub fn payload_shape(&self) -> PayloadShape {
        match self {
            CodecKind::Null | CodecKind::Simple16 => PayloadShape::Words,
            _ => PayloadShape::Bytes,
        }
    }
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecKind::Zeta { k } => write!(f, "zeta_{}", k),
            CodecKind::Fixed { bit_width } => write!(f, "fixed_{}", bit_width),
            other => f.write_str(other.family()),
        }
    }
}

//==================================================================================
// II. Encoded Blocks
//==================================================================================

/// Codec-specific compressed bytes or words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Bytes(Box<[u8]>),
    Words(Box<[u32]>),
}

impl Payload {
    pub fn shape(&self) -> PayloadShape {
        match self {
            Payload::Bytes(_) => PayloadShape::Bytes,
            Payload::Words(_) => PayloadShape::Words,
        }
    }

    /// Heap footprint of the payload.
    pub fn size_bytes(&self) -> usize {
        match self {
            Payload::Bytes(bytes) => bytes.len(),
            Payload::Words(words) => words.len() * std::mem::size_of::<u32>(),
        }
    }
}

/// An opaque compressed run together with its logical length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBlock {
    len: u32,
    payload: Payload,
}

impl EncodedBlock {
    /// Reassembles a block, e.g. when loading a persisted store.
    pub fn from_parts(len: u32, payload: Payload) -> Self {
        Self { len, payload }
    }

    /// Number of integers the block decodes to.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn size_bytes(&self) -> usize {
        self.payload.size_bytes()
    }
}

//==================================================================================
// III. Statistics
//==================================================================================

/// Observed compression of everything a codec instance has encoded.
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct CodecStats {
    /// Number of integers encoded.
    pub values: u64,
    /// Number of payload bits produced.
    pub bits: u64,
}

impl CodecStats {
    pub fn bits_per_value(&self) -> f64 {
        if self.values == 0 {
            0.0
        } else {
            self.bits as f64 / self.values as f64
        }
    }

    /// Compressed size relative to plain 32-bit integers.
    pub fn fraction_of_uncompressed(&self) -> f64 {
        self.bits_per_value() / 32.0
    }

    pub fn merge(self, other: CodecStats) -> CodecStats {
        CodecStats {
            values: self.values + other.values,
            bits: self.bits + other.bits,
        }
    }
}

#[derive(Debug, Default)]
struct StatsCounters {
    values: AtomicU64,
    bits: AtomicU64,
}

impl StatsCounters {
    fn record(&self, values: usize, bits: usize) {
        self.values.fetch_add(values as u64, Ordering::Relaxed);
        self.bits.fetch_add(bits as u64, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CodecStats {
        CodecStats {
            values: self.values.load(Ordering::Relaxed),
            bits: self.bits.load(Ordering::Relaxed),
        }
    }
}

//==================================================================================
// IV. The Codec Contract
//==================================================================================

/// Compresses and restores runs of `i32`.
///
/// Implementations must be usable from many threads at once: encoding happens in
/// parallel during construction and decoding on every read.
pub trait Codec: Send + Sync + fmt::Debug {
    /// Persistable descriptor of this instance.
    fn kind(&self) -> CodecKind;

    /// Compresses `values`.
    ///
    /// # Errors
    /// `PrefError::Config` when an integrated codec receives negative values or a
    /// sorted-only codec a decreasing run; `PrefError::Encode` when a value does
    /// not fit the codec's representation.
    fn encode(&self, values: &[i32]) -> Result<EncodedBlock, PrefError>;

    /// Restores the block into `out[..len]`.
    ///
    /// # Panics
    /// If `len` differs from the block's recorded length or `out` is shorter than
    /// `len`. Both mean the caller's length bookkeeping is broken.
    fn decode(&self, block: &EncodedBlock, out: &mut [i32], len: usize) -> Result<(), PrefError>;

    fn is_integrated(&self) -> bool {
        self.kind().is_integrated()
    }

    fn requires_sorted(&self) -> bool {
        self.kind().requires_sorted()
    }

    /// Diagnostics only; never affects correctness.
    fn stats(&self) -> CodecStats;
}

//==================================================================================
// V. Kernel-Backed Implementation
//==================================================================================

/// The built-in codec: a [`CodecKind`] dispatching to the pure kernels.
#[derive(Debug)]
pub struct KernelCodec {
    kind: CodecKind,
    counters: StatsCounters,
}

impl KernelCodec {
    pub fn new(kind: CodecKind) -> Self {
        Self {
            kind,
            counters: StatsCounters::default(),
        }
    }

    /// Rejects input the codec's family cannot represent faithfully.
    fn check_input(&self, values: &[i32]) -> Result<(), PrefError> {
        if self.kind.is_integrated() {
            if let Some(&negative) = values.iter().find(|&&v| v < 0) {
                return Err(PrefError::Config(format!(
                    "integrated codec '{}' requires non-negative values, got {}",
                    self.kind, negative
                )));
            }
        }
        if self.kind.requires_sorted() && !crate::kernels::delta::is_non_decreasing(values) {
            return Err(PrefError::Config(format!(
                "codec '{}' requires a non-decreasing run; it cannot encode non-monotonic values",
                self.kind
            )));
        }
        Ok(())
    }
}

impl Codec for KernelCodec {
    fn kind(&self) -> CodecKind {
        self.kind
    }

    fn encode(&self, values: &[i32]) -> Result<EncodedBlock, PrefError> {
        self.check_input(values)?;
        let len = u32::try_from(values.len())
            .map_err(|_| PrefError::Encode(format!("run of {} values is too long", values.len())))?;
        // Non-integrated codecs accept any sign: the bit pattern is encoded as u32.
        let raw: &[u32] = bytemuck::cast_slice(values);

        let payload = match self.kind {
            CodecKind::Null => Payload::Words(raw.into()),
            CodecKind::Simple16 => Payload::Words(simple16::encode(raw)?.into()),
            CodecKind::Gamma => bytes_payload(gamma::encode(raw)),
            CodecKind::Zeta { k } => bytes_payload(zeta::encode(raw, k)),
            CodecKind::Rice => bytes_payload(rice::encode(raw)),
            CodecKind::Fixed { bit_width } => bytes_payload(bitpack::encode(raw, bit_width)?),
            CodecKind::VByte => {
                let mut buf = Vec::with_capacity(raw.len());
                vbyte::encode(raw, &mut buf);
                bytes_payload(buf)
            }
            CodecKind::IntegratedVByte => {
                let mut buf = Vec::with_capacity(raw.len());
                vbyte::encode_integrated(raw, &mut buf);
                bytes_payload(buf)
            }
            CodecKind::For => {
                let mut buf = Vec::with_capacity(raw.len() + 4);
                frame_of_reference::encode(raw, &mut buf);
                bytes_payload(buf)
            }
            CodecKind::IntegratedFor => {
                let mut buf = Vec::with_capacity(raw.len() + 4);
                frame_of_reference::encode_integrated(raw, &mut buf);
                bytes_payload(buf)
            }
            CodecKind::OptPfd => bytes_payload(pfor::encode(raw, PforVariant::OptPfd)),
            CodecKind::NewPfd => bytes_payload(pfor::encode(raw, PforVariant::NewPfd)),
            CodecKind::FastPfor => bytes_payload(pfor::encode(raw, PforVariant::FastPfor)),
            CodecKind::Succinct => bytes_payload(elias_fano::encode(raw)),
        };

        self.counters.record(values.len(), payload.size_bytes() * 8);
        Ok(EncodedBlock { len, payload })
    }

    fn decode(&self, block: &EncodedBlock, out: &mut [i32], len: usize) -> Result<(), PrefError> {
        assert_eq!(
            len,
            block.len(),
            "decode length {} does not match the encoded length {}",
            len,
            block.len()
        );
        assert!(
            out.len() >= len,
            "output buffer of {} values cannot hold {} decoded values",
            out.len(),
            len
        );
        let out: &mut [u32] = bytemuck::cast_slice_mut(&mut out[..len]);

        match (self.kind, &block.payload) {
            (CodecKind::Null, Payload::Words(words)) => {
                if words.len() != len {
                    return Err(PrefError::Decode(format!(
                        "raw block holds {} words, expected {}",
                        words.len(),
                        len
                    )));
                }
                out.copy_from_slice(words);
                Ok(())
            }
            (CodecKind::Simple16, Payload::Words(words)) => simple16::decode(words, out),
            (CodecKind::Gamma, Payload::Bytes(bytes)) => gamma::decode(bytes, out),
            (CodecKind::Zeta { k }, Payload::Bytes(bytes)) => zeta::decode(bytes, out, k),
            (CodecKind::Rice, Payload::Bytes(bytes)) => rice::decode(bytes, out),
            (CodecKind::Fixed { bit_width }, Payload::Bytes(bytes)) => {
                bitpack::decode(bytes, out, bit_width)
            }
            (CodecKind::VByte, Payload::Bytes(bytes)) => vbyte::decode(bytes, out),
            (CodecKind::IntegratedVByte, Payload::Bytes(bytes)) => {
                vbyte::decode_integrated(bytes, out)
            }
            (CodecKind::For, Payload::Bytes(bytes)) => frame_of_reference::decode(bytes, out),
            (CodecKind::IntegratedFor, Payload::Bytes(bytes)) => {
                frame_of_reference::decode_integrated(bytes, out)
            }
            (CodecKind::OptPfd, Payload::Bytes(bytes)) => {
                pfor::decode(bytes, out, PforVariant::OptPfd)
            }
            (CodecKind::NewPfd, Payload::Bytes(bytes)) => {
                pfor::decode(bytes, out, PforVariant::NewPfd)
            }
            (CodecKind::FastPfor, Payload::Bytes(bytes)) => {
                pfor::decode(bytes, out, PforVariant::FastPfor)
            }
            (CodecKind::Succinct, Payload::Bytes(bytes)) => elias_fano::decode(bytes, out),
            (kind, payload) => Err(PrefError::Decode(format!(
                "codec '{}' cannot read a {:?} payload",
                kind,
                payload.shape()
            ))),
        }
    }

    fn stats(&self) -> CodecStats {
        self.counters.snapshot()
    }
}

#[inline]
fn bytes_payload(bytes: Vec<u8>) -> Payload {
    Payload::Bytes(bytes.into_boxed_slice())
}

//==================================================================================
// VI. Unit Tests
//==================================================================================
