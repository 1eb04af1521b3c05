//! # phreak-core
//!
//! Segment memory and linking state for a lazy Rete ("Phreak") rule network.
//!
//! The node network is partitioned into segments: maximal single-child chains
//! of nodes that share a rule-association set. Each session keeps one bit per
//! segment member recording whether that node currently has enough local
//! state to produce output. A segment is *linked* when every bit is set, and
//! only linked segments are worth visiting during propagation.
//!
//! ## Layout
//!
//! - `network`: immutable topology and its builder, shared across sessions
//! - `memory`: per-node counted left/right memories
//! - `segment`: segment discovery and `SegmentMemory`
//! - `linking`: per-kind linking policies
//! - `session`: the session-owned arena and the evaluator-facing API
//! - `path`: linked state of a rule's whole path
//! - `formats`: declarative network and script definitions
//!
//! ## Architectural Constraints
//!
//! - No I/O and no async
//! - `BTreeMap` only, so iteration order never depends on hashing
//! - Errors are returned as [`PhreakError`], never panicked

// =============================================================================
// MODULES
// =============================================================================

pub mod formats;
pub mod linking;
pub mod memory;
pub mod network;
pub mod path;
pub mod primitives;
pub mod segment;
pub mod session;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    AssociationMarker, Associations, FactHandle, LinkMask, NodeId, NodeKind, PhreakError,
    RuleName, SegmentId,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use formats::{NetworkDef, NodeDef, Operation, Script};
pub use linking::{LinkEvent, LinkPolicy, policy_for};
pub use memory::{NodeMemory, Side};
pub use network::{Network, NetworkBuilder, Node};
pub use path::PathMemory;
pub use segment::{SegmentMemory, SegmentSnapshot};
pub use session::Session;
