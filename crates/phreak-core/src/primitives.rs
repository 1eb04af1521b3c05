//! # Primitives
//!
//! Hardcoded constants of the Phreak core.
//!
//! These are compiled into the binary and are immutable at runtime.

/// Maximum number of nodes in one segment.
///
/// Each segment member owns one bit of a `u64` link mask, so a segment can
/// never be longer than the mask width.
pub const MAX_SEGMENT_NODES: usize = u64::BITS as usize;

/// Maximum number of segments on a single rule path.
///
/// Path memories track one bit per segment, with the same width limit as
/// segment masks.
pub const MAX_PATH_SEGMENTS: usize = u64::BITS as usize;

/// Maximum number of nodes accepted from a declarative network definition.
///
/// Bounds the work done when loading untrusted definition files.
pub const MAX_DEFINITION_NODES: usize = 100_000;
