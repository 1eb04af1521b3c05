//! # Formats Module
//!
//! Data shapes for describing networks and operation scripts.

mod definition;

pub use definition::*;
