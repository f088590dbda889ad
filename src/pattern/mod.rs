//! Name Pattern Module
//!
//! The pattern algebra: dotted, wildcard-bearing names and their
//! expansion against directory contents.
//!
//! # Structure
//!
//! - [`segment`]: Segment model and parsing rules
//! - [`name`]: The [`NamePattern`] value type and its operations
//! - [`listing`]: Expansion of a pattern against the filesystem

pub mod listing;
pub mod name;
pub mod segment;

pub use listing::Fix;
pub use name::NamePattern;
pub use segment::{Segment, SEPARATOR};
