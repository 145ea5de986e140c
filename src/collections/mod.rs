//! Collection types
//!
//! - [`MultiMap`]: key to ordered list of values
//! - [`NamedCollection`]: ordered list of uniquely named items
//! - [`LanguageSet`]: sorted set of [`LanguageTag`]s with fallback matching

pub mod language_set;
pub mod multi_map;
pub mod named_collection;

pub use language_set::{LanguageSet, LanguageTag};
pub use multi_map::MultiMap;
pub use named_collection::{Named, NamedCollection};
