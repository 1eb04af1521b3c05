//! # Node Memory
//!
//! Per-session, per-node population state. Left tuples and right facts are
//! counted per handle, so a node only becomes empty again once every
//! insertion has been matched by a retraction.

use crate::{FactHandle, LinkMask, NodeId, NodeKind, PhreakError, SegmentId};
use std::collections::BTreeMap;

/// Which input of a node a tuple or fact arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Side {
    /// Left tuples (partial matches flowing down the network).
    Left,
    /// Right facts (candidates from the node's right input).
    Right,
}

/// A multiset of handles with an O(1) total count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TupleMemory {
    entries: BTreeMap<FactHandle, u32>,
    len: usize,
}

impl TupleMemory {
    /// Total number of stored entries, duplicates included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the handle is stored at least once.
    #[must_use]
    pub fn contains(&self, fact: FactHandle) -> bool {
        self.entries.contains_key(&fact)
    }

    fn insert(&mut self, fact: FactHandle) {
        let count = self.entries.entry(fact).or_insert(0);
        *count = count.saturating_add(1);
        self.len = self.len.saturating_add(1);
    }

    /// Remove one occurrence. Returns `false` if the handle was absent.
    fn remove(&mut self, fact: FactHandle) -> bool {
        let Some(count) = self.entries.get_mut(&fact) else {
            return false;
        };
        *count -= 1;
        if *count == 0 {
            self.entries.remove(&fact);
        }
        self.len -= 1;
        true
    }
}

/// Mutable state of one node inside one session.
///
/// Created lazily on first touch. `segment` stays `None` until the segment
/// memory covering the node is built; `node_pos_mask_bit` is assigned at the
/// same time and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeMemory {
    node: NodeId,
    kind: NodeKind,
    left: TupleMemory,
    right: TupleMemory,
    segment: Option<SegmentId>,
    node_pos_mask_bit: LinkMask,
}

impl NodeMemory {
    pub(crate) fn new(node: NodeId, kind: NodeKind) -> Self {
        Self {
            node,
            kind,
            left: TupleMemory::default(),
            right: TupleMemory::default(),
            segment: None,
            node_pos_mask_bit: LinkMask::EMPTY,
        }
    }

    /// The node this memory belongs to.
    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Left tuple memory.
    #[must_use]
    pub fn left(&self) -> &TupleMemory {
        &self.left
    }

    /// Right fact memory.
    #[must_use]
    pub fn right(&self) -> &TupleMemory {
        &self.right
    }

    /// Number of entries on one side.
    #[must_use]
    pub fn count(&self, side: Side) -> usize {
        match side {
            Side::Left => self.left.len(),
            Side::Right => self.right.len(),
        }
    }

    /// Segment memory covering this node, once built.
    #[must_use]
    pub fn segment(&self) -> Option<SegmentId> {
        self.segment
    }

    /// Bit of this node inside its segment (empty until the segment exists).
    #[must_use]
    pub fn node_pos_mask_bit(&self) -> LinkMask {
        self.node_pos_mask_bit
    }

    pub(crate) fn attach_segment(&mut self, segment: SegmentId, bit: LinkMask) {
        self.segment = Some(segment);
        self.node_pos_mask_bit = bit;
    }

    pub(crate) fn insert(&mut self, side: Side, fact: FactHandle) {
        match side {
            Side::Left => self.left.insert(fact),
            Side::Right => self.right.insert(fact),
        }
    }

    pub(crate) fn remove(&mut self, side: Side, fact: FactHandle) -> Result<(), PhreakError> {
        let removed = match side {
            Side::Left => self.left.remove(fact),
            Side::Right => self.right.remove(fact),
        };
        if removed {
            Ok(())
        } else {
            Err(PhreakError::FactNotFound {
                node: self.node,
                fact,
            })
        }
    }
}
