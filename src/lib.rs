//! This file is the root of the `prefpack` Rust crate.
//!
//! `prefpack` keeps a sparse user x item preference matrix in memory as two
//! mirrored, per-row compressed indices (one keyed by user, one by item) and
//! decodes rows on every read.
//!
//! Its responsibilities are strictly limited to:
//! 1.  Declaring all the top-level modules of the library (`codec`, `store`,
//!     `kernels`, etc.) so the Rust compiler knows they exist.
//! 2.  Re-exporting the types a typical caller needs.
//!
//! ```no_run
//! use prefpack::{BinaryPreferenceStore, PreferenceSource, StoreConfig};
//!
//! let config = StoreConfig::with_id_codec("zeta_3");
//! let store = BinaryPreferenceStore::build(2, 3, vec![(0, 0), (0, 2), (1, 1)], &config)?;
//! let items: Vec<u32> = store.user_ids(0).collect();
//! assert_eq!(items, vec![0, 2]);
//! # Ok::<(), prefpack::PrefError>(())
//! ```

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//==================================================================================
// 1. Module Declarations
//==================================================================================
pub mod codec;
pub mod config;
pub mod error;
pub mod index;
pub mod input;
pub mod kernels;
pub mod store;
pub mod traits;

//==================================================================================
// 2. Public Re-exports
//==================================================================================
pub use codec::policy::{bit_width_for, CodecSpec};
pub use codec::{Codec, CodecKind, CodecStats, EncodedBlock, KernelCodec, Payload};
pub use config::StoreConfig;
pub use error::{Axis, PrefError};
pub use index::EntityIndex;
pub use input::Orientation;
pub use store::{
    AnyStore, BinaryPreferenceStore, IdIter, Labels, Preferences, RatingPreferenceStore,
    StoreSummary, ValueIter,
};
pub use traits::{IdxPref, PreferenceSource};
