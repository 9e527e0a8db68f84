//! Grade normalization and cross-system conversion.
//!
//! The crate exposes:
//! - [`normalize`] / [`denormalize`]: pure mappings between a system-specific
//!   [`GradeValue`](tabula_types::GradeValue) and the canonical 0-100 scale,
//!   driven by immutable per-system band tables.
//! - [`ConversionEngine`]: origin → normalized → destination conversion, with
//!   an optional time-bounded result cache that never changes results.
//!
//! Everything here is side-effect free and safe under unbounded concurrency.

mod cache;
mod engine;
mod normalize;
mod tables;

pub use cache::ConversionCache;
pub use engine::{Conversion, ConversionEngine, ConversionError, EquivalenceRow, RuleCatalog};
pub use normalize::{denormalize, domain_values, normalize};
pub use tables::{
    de_descriptor, DeBand, UkBand, DE_BANDS, DE_CANONICAL_NOTAS, UK_BANDS, US_LETTER_PERCENTAGES,
};
