//! # Linking Policies
//!
//! One table entry per segment-member kind, selected by an exhaustive match
//! on [`NodeKind`]. A policy answers two questions:
//!
//! - is a node with this memory currently eligible to propagate (`is_linked`)
//! - how does the node react to a change on one of its inputs (`reaction`)
//!
//! | Kind | Tracked side | Linked when | Right insert |
//! |------|--------------|-------------|--------------|
//! | LeftInputAdapter | left | left non-empty | not accepted |
//! | Join / Exists | right | right non-empty | recompute |
//! | Not | right | right empty | deferred |
//!
//! A Join/Exists node's left input comes from the segment above it, whose
//! own bits already account for it, so left tuples are counted but never
//! drive its bit.
//!
//! The deferred Not reaction is the first half of a two-phase protocol: the
//! insert only mutates memory, and the evaluator later calls
//! `Session::recompute_not_node_link_on_right_insert` once it has processed
//! the node for the current propagation cycle.

use crate::memory::{NodeMemory, Side};
use crate::{NodeKind, SegmentId};
use serde::{Deserialize, Serialize};
use Reaction::{Deferred, Ignore, Recompute};

/// A population change on one input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Insert,
    Retract,
}

/// What the linking engine does after a node's memory changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    /// Re-evaluate the node's bit now.
    Recompute,
    /// Leave the bit alone until an explicit recompute step.
    Deferred,
    /// The change never affects the bit.
    Ignore,
}

/// Kind-specific linking behavior.
#[derive(Debug)]
pub struct LinkPolicy {
    pub kind: NodeKind,
    /// The side whose population decides the bit.
    pub tracked: Side,
    /// Whether the node has a right input at all.
    pub accepts_right: bool,
    /// Eligibility predicate over the node's memory.
    pub is_linked: fn(&NodeMemory) -> bool,
    /// Indexed by `[side][change]`.
    reactions: [[Reaction; 2]; 2],
}

impl LinkPolicy {
    /// Reaction to a change on one side.
    #[must_use]
    pub fn reaction(&self, side: Side, change: Change) -> Reaction {
        let s = match side {
            Side::Left => 0,
            Side::Right => 1,
        };
        let c = match change {
            Change::Insert => 0,
            Change::Retract => 1,
        };
        self.reactions[s][c]
    }

    /// Whether the node's bit should be set for this memory.
    #[must_use]
    pub fn evaluate(&self, memory: &NodeMemory) -> bool {
        (self.is_linked)(memory)
    }
}

fn left_populated(memory: &NodeMemory) -> bool {
    !memory.left().is_empty()
}

fn right_populated(memory: &NodeMemory) -> bool {
    !memory.right().is_empty()
}

fn right_empty(memory: &NodeMemory) -> bool {
    memory.right().is_empty()
}

static ADAPTER: LinkPolicy = LinkPolicy {
    kind: NodeKind::LeftInputAdapter,
    tracked: Side::Left,
    accepts_right: false,
    is_linked: left_populated,
    reactions: [[Recompute, Recompute], [Ignore, Ignore]],
};

static JOIN: LinkPolicy = LinkPolicy {
    kind: NodeKind::Join,
    tracked: Side::Right,
    accepts_right: true,
    is_linked: right_populated,
    reactions: [[Ignore, Ignore], [Recompute, Recompute]],
};

static EXISTS: LinkPolicy = LinkPolicy {
    kind: NodeKind::Exists,
    tracked: Side::Right,
    accepts_right: true,
    is_linked: right_populated,
    reactions: [[Ignore, Ignore], [Recompute, Recompute]],
};

static NOT: LinkPolicy = LinkPolicy {
    kind: NodeKind::Not,
    tracked: Side::Right,
    accepts_right: true,
    is_linked: right_empty,
    reactions: [[Ignore, Ignore], [Deferred, Recompute]],
};

/// The linking policy of a kind, or `None` for kinds outside segments.
#[must_use]
pub fn policy_for(kind: NodeKind) -> Option<&'static LinkPolicy> {
    match kind {
        NodeKind::LeftInputAdapter => Some(&ADAPTER),
        NodeKind::Join => Some(&JOIN),
        NodeKind::Exists => Some(&EXISTS),
        NodeKind::Not => Some(&NOT),
        NodeKind::ObjectTypeSource | NodeKind::Terminal => None,
    }
}

/// A segment changed between linked and unlinked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEvent {
    pub segment: SegmentId,
    pub linked: bool,
}
