//! # Session Module
//!
//! A `Session` owns every piece of mutable state for one run against a
//! shared, immutable [`Network`]:
//! - node memories, keyed by node id and created on first touch
//! - segment memories, stored in an arena indexed by [`SegmentId`]
//! - the queue of link events not yet drained by the evaluator
//!
//! Sessions never share memories, so no locking is done here. Every
//! operation takes `&mut self` and runs to completion, including any segment
//! relinking it triggers.
//!
//! ## Lazy creation
//!
//! - Looking up a node memory creates it, without a segment.
//! - Every population change, explicit bit update or recompute first makes
//!   sure the segment memory exists, then mutates node memory.
//! - A retraction of a fact the node does not hold fails before anything is
//!   created.

use crate::linking::{Change, LinkEvent, Reaction, policy_for};
use crate::memory::{NodeMemory, Side};
use crate::network::Network;
use crate::path::PathMemory;
use crate::primitives::{MAX_PATH_SEGMENTS, MAX_SEGMENT_NODES};
use crate::segment::{self, SegmentMemory};
use crate::{FactHandle, LinkMask, NodeId, NodeKind, PhreakError, RuleName, SegmentId};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Per-session memory of a network.
#[derive(Debug, Clone)]
pub struct Session {
    network: Arc<Network>,
    node_memories: BTreeMap<NodeId, NodeMemory>,
    segments: Vec<SegmentMemory>,
    link_events: Vec<LinkEvent>,
}

impl Session {
    /// Create an empty session over a shared network.
    #[must_use]
    pub fn new(network: Arc<Network>) -> Self {
        Self {
            network,
            node_memories: BTreeMap::new(),
            segments: Vec::new(),
            link_events: Vec::new(),
        }
    }

    /// The network this session runs against.
    #[must_use]
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Drop every memory, keeping the network.
    pub fn reset(&mut self) {
        self.node_memories.clear();
        self.segments.clear();
        self.link_events.clear();
    }

    // =========================================================================
    // NODE MEMORY
    // =========================================================================

    /// Get the memory of a segment member, creating it if absent.
    ///
    /// This does not create the segment memory.
    pub fn node_memory(&mut self, node: NodeId) -> Result<&NodeMemory, PhreakError> {
        self.ensure_node_memory(node).map(|memory| &*memory)
    }

    /// Get the memory of a node only if it already exists.
    #[must_use]
    pub fn peek_node_memory(&self, node: NodeId) -> Option<&NodeMemory> {
        self.node_memories.get(&node)
    }

    fn ensure_node_memory(&mut self, node: NodeId) -> Result<&mut NodeMemory, PhreakError> {
        let kind = self.member_kind(node)?;
        Ok(self
            .node_memories
            .entry(node)
            .or_insert_with(|| NodeMemory::new(node, kind)))
    }

    fn member_kind(&self, node: NodeId) -> Result<NodeKind, PhreakError> {
        let kind = self.network.get(node)?.kind;
        if kind.is_segment_member() {
            Ok(kind)
        } else {
            Err(PhreakError::NotASegmentNode { node, kind })
        }
    }

    // =========================================================================
    // SEGMENT CONSTRUCTION
    // =========================================================================

    /// Make sure the segment containing `node` has a memory and return it.
    ///
    /// Idempotent: if the node is already attached to a segment, nothing is
    /// rebuilt. Otherwise the whole segment is discovered, every member's
    /// current population is evaluated to seed `linked_mask`, and only then
    /// is the memory attached to all members.
    pub fn create_segment_memory(&mut self, node: NodeId) -> Result<SegmentId, PhreakError> {
        if let Some(existing) = self.node_memories.get(&node).and_then(NodeMemory::segment) {
            return Ok(existing);
        }

        let members = segment::discover(&self.network, node)?;
        let id = SegmentId(self.segments.len() as u32);
        let head = members[0];
        let mut memory = SegmentMemory::new(id, members.clone()).ok_or(
            PhreakError::SegmentTooLong {
                head,
                max: MAX_SEGMENT_NODES,
            },
        )?;

        let mut bits = Vec::with_capacity(members.len());
        for (position, &member) in members.iter().enumerate() {
            let kind = self.member_kind(member)?;
            let policy = policy_for(kind).ok_or(PhreakError::NotASegmentNode {
                node: member,
                kind,
            })?;
            let bit = LinkMask::bit(position).ok_or(PhreakError::SegmentTooLong {
                head,
                max: MAX_SEGMENT_NODES,
            })?;
            let node_memory = self.ensure_node_memory(member)?;
            if policy.evaluate(node_memory) {
                memory.update_bit(bit, true);
            }
            bits.push((member, bit));
        }

        for (member, bit) in bits {
            if let Some(node_memory) = self.node_memories.get_mut(&member) {
                node_memory.attach_segment(id, bit);
            }
        }

        tracing::debug!(
            segment = id.0,
            head = %head,
            nodes = memory.node_count(),
            all_linked_mask = memory.all_linked_mask_test().value(),
            linked_mask = memory.linked_mask().value(),
            "segment memory created"
        );
        if memory.is_segment_linked() {
            self.link_events.push(LinkEvent {
                segment: id,
                linked: true,
            });
        }
        self.segments.push(memory);
        Ok(id)
    }

    /// Build the segment memory of every segment in the network.
    ///
    /// Returns the number of segments in the session afterwards.
    pub fn init_all_segments(&mut self) -> Result<usize, PhreakError> {
        let members: Vec<NodeId> = self.network.segment_members().map(|n| n.id).collect();
        for node in members {
            self.create_segment_memory(node)?;
        }
        Ok(self.segments.len())
    }

    // =========================================================================
    // EVALUATOR-FACING QUERIES
    // =========================================================================

    /// The segment memory covering `node`, if it has been created.
    #[must_use]
    pub fn segment_memory_of(&self, node: NodeId) -> Option<&SegmentMemory> {
        let id = self.node_memories.get(&node)?.segment()?;
        self.segment(id)
    }

    /// A segment memory by id.
    #[must_use]
    pub fn segment(&self, id: SegmentId) -> Option<&SegmentMemory> {
        self.segments.get(id.index())
    }

    /// All segment memories in creation order.
    pub fn segments(&self) -> impl Iterator<Item = &SegmentMemory> {
        self.segments.iter()
    }

    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Whether a segment is linked. Unknown segments are not.
    #[must_use]
    pub fn is_segment_linked(&self, id: SegmentId) -> bool {
        self.segment(id).is_some_and(SegmentMemory::is_segment_linked)
    }

    /// Target mask of a segment.
    #[must_use]
    pub fn all_linked_mask_test(&self, id: SegmentId) -> Option<LinkMask> {
        self.segment(id).map(SegmentMemory::all_linked_mask_test)
    }

    /// Bit assigned to a node, once its segment memory exists.
    #[must_use]
    pub fn node_pos_mask_bit(&self, node: NodeId) -> Option<LinkMask> {
        let memory = self.node_memories.get(&node)?;
        memory.segment().map(|_| memory.node_pos_mask_bit())
    }

    /// Link transitions recorded since the last drain.
    #[must_use]
    pub fn link_events(&self) -> &[LinkEvent] {
        &self.link_events
    }

    /// Take the recorded link transitions.
    pub fn drain_link_events(&mut self) -> Vec<LinkEvent> {
        std::mem::take(&mut self.link_events)
    }

    /// The segments on a rule's path, root first, with their linked state.
    ///
    /// Creates any segment memory on the path that does not exist yet.
    pub fn rule_path(&mut self, rule: &RuleName) -> Result<PathMemory, PhreakError> {
        let terminal = self
            .network
            .terminal_for(rule)
            .ok_or_else(|| PhreakError::RuleNotFound(rule.clone()))?;

        let mut segments = Vec::new();
        let mut current = self.network.get(terminal)?.parent;
        while let Some(node) = current {
            let kind = self.network.get(node)?.kind;
            if !kind.is_segment_member() {
                break;
            }
            if segments.len() >= MAX_PATH_SEGMENTS {
                return Err(PhreakError::InvalidTopology {
                    node: terminal,
                    reason: format!("rule path exceeds {} segments", MAX_PATH_SEGMENTS),
                });
            }
            let id = self.create_segment_memory(node)?;
            segments.push(id);
            let head = self.segment(id).map(SegmentMemory::head).unwrap_or(node);
            current = self.network.get(head)?.parent;
        }
        segments.reverse();

        let linked: Vec<bool> = segments
            .iter()
            .map(|&id| self.is_segment_linked(id))
            .collect();
        Ok(PathMemory::new(rule.clone(), terminal, segments, &linked))
    }

    // =========================================================================
    // LINKING ENGINE
    // =========================================================================

    /// Explicitly set or clear a node's bit and recompute its segment.
    pub fn update_node_bit(&mut self, node: NodeId, linked: bool) -> Result<(), PhreakError> {
        self.member_kind(node)?;
        let segment = self.create_segment_memory(node)?;
        self.set_bit(node, segment, linked)
    }

    /// Second phase of a Not node right insert.
    ///
    /// Called by the evaluator after it processed the node's memory for the
    /// current propagation cycle; clears the bit while blocking facts exist.
    pub fn recompute_not_node_link_on_right_insert(
        &mut self,
        node: NodeId,
    ) -> Result<(), PhreakError> {
        let kind = self.member_kind(node)?;
        if kind != NodeKind::Not {
            return Err(PhreakError::UnexpectedKind {
                node,
                expected: "not",
                found: kind,
            });
        }
        let segment = self.create_segment_memory(node)?;
        let linked = self.evaluate(node, kind)?;
        self.set_bit(node, segment, linked)
    }

    /// Insert a fact at a node.
    ///
    /// - object type source: left insert into every adapter below it and
    ///   right insert into every beta node it feeds
    /// - left input adapter: left insert
    /// - beta node: right insert
    pub fn assert_object(&mut self, node: NodeId, fact: FactHandle) -> Result<(), PhreakError> {
        for (target, side) in self.object_targets(node)? {
            self.apply_change(target, side, Change::Insert, fact)?;
        }
        Ok(())
    }

    /// Retract a fact at a node, mirroring [`assert_object`](Self::assert_object).
    ///
    /// When routing from a source, every target is checked first so that a
    /// missing fact leaves all memories unchanged.
    pub fn retract_object(&mut self, node: NodeId, fact: FactHandle) -> Result<(), PhreakError> {
        let targets = self.object_targets(node)?;
        for &(target, side) in &targets {
            self.expect_held(target, side, fact)?;
        }
        for (target, side) in targets {
            self.apply_change(target, side, Change::Retract, fact)?;
        }
        Ok(())
    }

    /// Insert a left tuple into an adapter or beta node.
    pub fn assert_left_tuple(&mut self, node: NodeId, fact: FactHandle) -> Result<(), PhreakError> {
        self.apply_change(node, Side::Left, Change::Insert, fact)
    }

    /// Retract a left tuple from an adapter or beta node.
    pub fn retract_left_tuple(&mut self, node: NodeId, fact: FactHandle) -> Result<(), PhreakError> {
        self.apply_change(node, Side::Left, Change::Retract, fact)
    }

    /// Retract a right fact from a beta node.
    pub fn retract_right_tuple(
        &mut self,
        node: NodeId,
        fact: FactHandle,
    ) -> Result<(), PhreakError> {
        self.apply_change(node, Side::Right, Change::Retract, fact)
    }

    fn object_targets(&self, node: NodeId) -> Result<Vec<(NodeId, Side)>, PhreakError> {
        let entry = self.network.get(node)?;
        let targets = match entry.kind {
            NodeKind::ObjectTypeSource => {
                let mut targets: Vec<(NodeId, Side)> = entry
                    .children
                    .iter()
                    .map(|&child| (child, Side::Left))
                    .collect();
                targets.extend(self.network.right_sinks(node).map(|sink| (sink, Side::Right)));
                targets
            }
            NodeKind::LeftInputAdapter => vec![(node, Side::Left)],
            NodeKind::Join | NodeKind::Exists | NodeKind::Not => vec![(node, Side::Right)],
            NodeKind::Terminal => {
                return Err(PhreakError::NotASegmentNode {
                    node,
                    kind: entry.kind,
                });
            }
        };
        Ok(targets)
    }

    fn apply_change(
        &mut self,
        node: NodeId,
        side: Side,
        change: Change,
        fact: FactHandle,
    ) -> Result<(), PhreakError> {
        let kind = self.member_kind(node)?;
        let policy = policy_for(kind).ok_or(PhreakError::NotASegmentNode { node, kind })?;
        if side == Side::Right && !policy.accepts_right {
            return Err(PhreakError::UnexpectedKind {
                node,
                expected: "beta",
                found: kind,
            });
        }

        if change == Change::Retract {
            self.expect_held(node, side, fact)?;
        }

        let segment = self.create_segment_memory(node)?;
        let memory = self.ensure_node_memory(node)?;
        match change {
            Change::Insert => memory.insert(side, fact),
            Change::Retract => memory.remove(side, fact)?,
        }

        match policy.reaction(side, change) {
            Reaction::Recompute => {
                let linked = policy.evaluate(memory);
                self.set_bit(node, segment, linked)
            }
            Reaction::Deferred | Reaction::Ignore => Ok(()),
        }
    }

    /// Fails with `FactNotFound` unless `node` holds `fact` on `side`.
    fn expect_held(&self, node: NodeId, side: Side, fact: FactHandle) -> Result<(), PhreakError> {
        let held = self
            .node_memories
            .get(&node)
            .is_some_and(|m| match side {
                Side::Left => m.left().contains(fact),
                Side::Right => m.right().contains(fact),
            });
        if held {
            Ok(())
        } else {
            Err(PhreakError::FactNotFound { node, fact })
        }
    }

    fn evaluate(&self, node: NodeId, kind: NodeKind) -> Result<bool, PhreakError> {
        let policy = policy_for(kind).ok_or(PhreakError::NotASegmentNode { node, kind })?;
        let memory = self
            .node_memories
            .get(&node)
            .ok_or(PhreakError::NodeNotFound(node))?;
        Ok(policy.evaluate(memory))
    }

    fn set_bit(
        &mut self,
        node: NodeId,
        segment: SegmentId,
        linked: bool,
    ) -> Result<(), PhreakError> {
        let bit = self
            .node_memories
            .get(&node)
            .map(NodeMemory::node_pos_mask_bit)
            .ok_or(PhreakError::NodeNotFound(node))?;
        let memory = self
            .segments
            .get_mut(segment.index())
            .ok_or(PhreakError::NodeNotFound(node))?;

        let flipped = memory.update_bit(bit, linked);
        tracing::trace!(
            node = %node,
            segment = segment.0,
            linked,
            linked_mask = memory.linked_mask().value(),
            "node bit updated"
        );
        if flipped {
            let now_linked = memory.is_segment_linked();
            tracing::debug!(
                segment = segment.0,
                head = %memory.head(),
                linked = now_linked,
                "segment link state changed"
            );
            self.link_events.push(LinkEvent {
                segment,
                linked: now_linked,
            });
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
