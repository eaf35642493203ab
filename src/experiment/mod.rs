//! A/B experiment subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request headers
//!     → cookie.rs (previously selected variant, if any)
//!     → variants.rs (fetch VariantList from the variants endpoint)
//!     → selection.rs (validated cookie index, or uniform random draw)
//!     → ExperimentConfig::custom_data_for (index mod table length)
//!     → rewrite subsystem
//! ```
//!
//! # Design Decisions
//! - Variant list is fetched per request, never cached
//! - Cookie index is bounds-checked; out of range counts as no cookie
//! - Only a random draw produces a new selection cookie

pub mod cookie;
pub mod selection;
pub mod variants;

pub use cookie::{selection_cookie, variant_from_cookie};
pub use selection::{resolve_variant, Selection, SelectionSource};
pub use variants::{fetch_all_variants, VariantList};
