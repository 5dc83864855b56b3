// In: src/codec/policy.rs

//! The codec selection policy.
//!
//! Turns the textual codec names of a [`StoreConfig`] into codec instances:
//!
//! 1. [`CodecSpec::parse`] validates a name such as `"zeta_3"` or `"fixed"`.
//!    This is pure and runs before any preference is read, so a bad
//!    configuration fails fast.
//! 2. [`validate_rating_codecs`] rejects identifier/value codec pairs that
//!    cannot work together.
//! 3. [`CodecPlan::resolve`] instantiates the codecs once the cardinalities are
//!    known (fixed-width id packing derives its width from them).

use std::fmt;
use std::sync::Arc;

use crate::codec::{Codec, CodecKind, KernelCodec};
use crate::config::StoreConfig;
use crate::error::PrefError;
use crate::kernels::zeta;

/// Zeta shrinking factor used when the name carries no parameter.
pub const DEFAULT_ZETA_K: u8 = 3;

//==================================================================================
// 1. Bit Width Derivation
//==================================================================================

/// Minimum fixed width able to represent every identifier in `[0, cardinality)`.
///
/// This is the bit length of `cardinality - 1`, with a floor of one bit so that
/// single-entity spaces still produce a valid packer.
pub fn bit_width_for(cardinality: usize) -> u8 {
    let max_id = cardinality.saturating_sub(1) as u64;
    (64 - max_id.leading_zeros()).max(1) as u8
}

//==================================================================================
// 2. Parsed Codec Names
//==================================================================================

/// A validated codec name, not yet bound to a cardinality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecSpec {
    name: String,
    template: CodecKind,
    /// Fixed-width packing without an explicit width.
    derive_width: bool,
}

impl CodecSpec {
    /// Parses `"<family>[_<parameter>]"` (case-insensitive).
    pub fn parse(name: &str) -> Result<Self, PrefError> {
        let normalized = name.trim().to_ascii_lowercase();
        let (family, param) = match normalized.split_once('_') {
            Some((family, param)) => (family, Some(param)),
            None => (normalized.as_str(), None),
        };

        let invalid = |reason: String| PrefError::InvalidCodecParameter {
            name: name.to_string(),
            reason,
        };
        let parse_param = |raw: &str| -> Result<u8, PrefError> {
            raw.parse::<u8>()
                .map_err(|_| invalid(format!("'{}' is not a small non-negative integer", raw)))
        };

        let mut derive_width = false;
        let template = match family {
            "zeta" => {
                let k = match param {
                    Some(raw) => parse_param(raw)?,
                    None => DEFAULT_ZETA_K,
                };
                if !(1..=zeta::MAX_K).contains(&k) {
                    return Err(invalid(format!("k must be in 1..={}, got {}", zeta::MAX_K, k)));
                }
                CodecKind::Zeta { k }
            }
            "fixed" => match param {
                Some(raw) => {
                    let bit_width = parse_param(raw)?;
                    if !(1..=32).contains(&bit_width) {
                        return Err(invalid(format!("bit width must be in 1..=32, got {}", bit_width)));
                    }
                    CodecKind::Fixed { bit_width }
                }
                None => {
                    derive_width = true;
                    CodecKind::Fixed { bit_width: 32 }
                }
            },
            other => {
                let kind = match other {
                    "null" => CodecKind::Null,
                    "gamma" => CodecKind::Gamma,
                    "rice" => CodecKind::Rice,
                    "vbyte" => CodecKind::VByte,
                    "ivbyte" => CodecKind::IntegratedVByte,
                    "for" => CodecKind::For,
                    "ifor" => CodecKind::IntegratedFor,
                    "simple" => CodecKind::Simple16,
                    "optpfd" => CodecKind::OptPfd,
                    "newpfd" => CodecKind::NewPfd,
                    "fastpfor" => CodecKind::FastPfor,
                    "succinct" => CodecKind::Succinct,
                    _ => return Err(PrefError::UnknownCodec(name.to_string())),
                };
                if let Some(raw) = param {
                    return Err(invalid(format!("codec takes no parameter, got '{}'", raw)));
                }
                kind
            }
        };

        Ok(Self {
            name: name.to_string(),
            template,
            derive_width,
        })
    }

    /// The name as written in the configuration.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_null(&self) -> bool {
        self.template == CodecKind::Null
    }

    pub fn is_integrated(&self) -> bool {
        self.template.is_integrated()
    }

    pub fn requires_sorted(&self) -> bool {
        self.template.requires_sorted()
    }

    /// The concrete descriptor for an identifier (or value) space of `cardinality`.
    pub fn kind_for(&self, cardinality: usize) -> CodecKind {
        if self.derive_width {
            CodecKind::Fixed {
                bit_width: bit_width_for(cardinality),
            }
        } else {
            self.template
        }
    }

    /// Builds a codec instance for a space of `cardinality` symbols.
    pub fn instantiate(&self, cardinality: usize) -> Arc<dyn Codec> {
        from_kind(self.kind_for(cardinality))
    }
}

impl fmt::Display for CodecSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Builds a codec from a fully determined descriptor (e.g. a persisted one).
pub fn from_kind(kind: CodecKind) -> Arc<dyn Codec> {
    Arc::new(KernelCodec::new(kind))
}

//==================================================================================
// 3. Combination Rules
//==================================================================================

/// Checks an identifier/value codec pair for the rating store.
///
/// Ratings are not monotonic, so an integrated codec is never a value codec,
/// and an integrated id codec only supports raw (`null`) values.
pub fn validate_rating_codecs(ids: &CodecSpec, values: &CodecSpec) -> Result<(), PrefError> {
    if values.is_integrated() {
        return Err(PrefError::IncompatibleCodecs {
            id_codec: ids.name().to_string(),
            value_codec: values.name().to_string(),
            reason: "integrated codecs cannot compress ratings, which are not monotonic".to_string(),
        });
    }
    if ids.is_integrated() && !values.is_null() {
        return Err(PrefError::IncompatibleCodecs {
            id_codec: ids.name().to_string(),
            value_codec: values.name().to_string(),
            reason: "this identifier codec only supports uncompressed ('null') values".to_string(),
        });
    }
    Ok(())
}

/// Parses the identifier codec of a binary store.
pub fn parse_binary_codecs(config: &StoreConfig) -> Result<CodecSpec, PrefError> {
    config.validate()?;
    CodecSpec::parse(&config.id_codec)
}

/// Parses and cross-checks both codecs of a rating store.
pub fn parse_rating_codecs(config: &StoreConfig) -> Result<(CodecSpec, CodecSpec), PrefError> {
    config.validate()?;
    let ids = CodecSpec::parse(&config.id_codec)?;
    let values = CodecSpec::parse(&config.value_codec)?;
    validate_rating_codecs(&ids, &values)?;
    Ok((ids, values))
}

//==================================================================================
// 4. Resolved Plan
//==================================================================================

/// The codec instances of one store.
#[derive(Debug, Clone)]
pub struct CodecPlan {
    /// Compresses each user's item list (identifier space: items).
    pub user_ids: Arc<dyn Codec>,
    /// Compresses each item's user list (identifier space: users).
    pub item_ids: Arc<dyn Codec>,
    /// Compresses quantised ratings (rating store only).
    pub values: Option<Arc<dyn Codec>>,
}

impl CodecPlan {
    /// Binds parsed specs to the cardinalities of a dataset.
    ///
    /// Value codecs are never integrated, so they carry no derived width.
    pub fn resolve(
        ids: &CodecSpec,
        values: Option<&CodecSpec>,
        num_users: usize,
        num_items: usize,
    ) -> Self {
        debug_assert!(values.map_or(true, |spec| !spec.is_integrated()));
        let plan = Self {
            user_ids: ids.instantiate(num_items),
            item_ids: ids.instantiate(num_users),
            values: values.map(|spec| from_kind(spec.kind_for(0))),
        };
        log::info!(
            "codec plan: user-major ids = {}, item-major ids = {}, values = {}",
            plan.user_ids.kind(),
            plan.item_ids.kind(),
            plan.values
                .as_ref()
                .map_or_else(|| "-".to_string(), |c| c.kind().to_string()),
        );
        plan
    }
}

//==================================================================================
// 5. Unit Tests
//==================================================================================
