//! Catalog loaders
//!
//! Parser for the `Key: value` catalog format and the immutable catalog
//! built from it.

pub mod card;
pub mod catalog;

pub use card::{parse_params, CatalogEntry, CatalogLoader};
pub use catalog::{normalize_name, Catalog};
