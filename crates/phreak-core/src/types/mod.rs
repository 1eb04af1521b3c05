//! # Core Type Definitions
//!
//! This module contains the core types shared by the network, the session
//! memories and the linking engine:
//! - Identifiers (`NodeId`, `SegmentId`, `FactHandle`, `RuleName`)
//! - Node classification (`NodeKind`)
//! - Rule associations (`Associations`, `AssociationMarker`)
//! - Bit masks (`LinkMask`)
//! - Error types (`PhreakError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`

use crate::primitives::MAX_SEGMENT_NODES;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Stable identity of a node in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Index of a segment memory inside a session's arena.
///
/// Only meaningful for the session that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(pub u32);

impl SegmentId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle of a fact (or of the left tuple it started) inside a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactHandle(pub u64);

/// Name of a compiled rule.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleName(pub String);

impl RuleName {
    /// Create a rule name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the rule name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RuleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RuleName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for RuleName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

// =============================================================================
// NODE KIND
// =============================================================================

/// The closed set of node kinds in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Entry point for facts of one object type.
    ObjectTypeSource,
    /// Turns facts into single-element left tuples.
    LeftInputAdapter,
    /// Inner join of left tuples and right facts.
    Join,
    /// Semi-join: propagates when at least one right fact matches.
    Exists,
    /// Anti-join: propagates when no right fact matches.
    Not,
    /// Leaf representing a full match of one rule.
    Terminal,
}

impl NodeKind {
    /// Whether nodes of this kind take part in segment bit accounting.
    #[must_use]
    pub const fn is_segment_member(self) -> bool {
        matches!(
            self,
            Self::LeftInputAdapter | Self::Join | Self::Exists | Self::Not
        )
    }

    /// Whether this kind joins a left stream with a right input.
    #[must_use]
    pub const fn is_beta(self) -> bool {
        matches!(self, Self::Join | Self::Exists | Self::Not)
    }

    /// Whether this kind can be the left parent of a beta or terminal node.
    #[must_use]
    pub const fn is_left_tuple_source(self) -> bool {
        self.is_segment_member()
    }

    /// Short lowercase name, as used in definition files.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ObjectTypeSource => "object_type_source",
            Self::LeftInputAdapter => "left_input_adapter",
            Self::Join => "join",
            Self::Exists => "exists",
            Self::Not => "not",
            Self::Terminal => "terminal",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// RULE ASSOCIATIONS
// =============================================================================

/// Opaque per-rule marker stored alongside an association.
///
/// The core never interprets it; builders may use it to tag the compilation
/// unit that introduced the association.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AssociationMarker(pub u64);

/// Rules whose compiled pattern passes through a node.
///
/// Two nodes belong to the same segment only if their association *sets*
/// (the rule names, not the markers) are equal.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Associations(BTreeMap<RuleName, AssociationMarker>);

impl Associations {
    /// Create an empty association map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate a rule, keeping the first marker if already present.
    pub fn insert(&mut self, rule: RuleName, marker: AssociationMarker) {
        self.0.entry(rule).or_insert(marker);
    }

    /// Whether the rule is associated.
    #[must_use]
    pub fn contains(&self, rule: &RuleName) -> bool {
        self.0.contains_key(rule)
    }

    /// Marker recorded for a rule, if associated.
    #[must_use]
    pub fn marker(&self, rule: &RuleName) -> Option<AssociationMarker> {
        self.0.get(rule).copied()
    }

    /// Associated rules in deterministic order.
    pub fn rules(&self) -> impl Iterator<Item = &RuleName> {
        self.0.keys()
    }

    /// Number of associated rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no rule is associated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// More than one rule passes through the node.
    #[must_use]
    pub fn is_shared(&self) -> bool {
        self.0.len() > 1
    }

    /// Same rule set, ignoring markers.
    #[must_use]
    pub fn same_rules(&self, other: &Self) -> bool {
        self.0.keys().eq(other.0.keys())
    }

    /// Every rule of `self` is also associated in `other`.
    #[must_use]
    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.0.keys().all(|rule| other.0.contains_key(rule))
    }
}

impl<R: Into<RuleName>> FromIterator<R> for Associations {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        let mut associations = Self::new();
        for rule in iter {
            associations.insert(rule.into(), AssociationMarker::default());
        }
        associations
    }
}

// =============================================================================
// LINK MASK
// =============================================================================

/// A 64-bit mask with one bit per segment position.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LinkMask(pub u64);

impl LinkMask {
    /// The empty mask.
    pub const EMPTY: Self = Self(0);

    /// The single bit for a segment position.
    ///
    /// Returns `None` when the position does not fit in the mask.
    #[must_use]
    pub const fn bit(position: usize) -> Option<Self> {
        if position < MAX_SEGMENT_NODES {
            Some(Self(1u64 << position))
        } else {
            None
        }
    }

    /// The mask with exactly `count` low bits set.
    ///
    /// Returns `None` when `count` exceeds the mask width.
    #[must_use]
    pub const fn all_linked(count: usize) -> Option<Self> {
        if count > MAX_SEGMENT_NODES {
            None
        } else if count == MAX_SEGMENT_NODES {
            Some(Self(u64::MAX))
        } else {
            Some(Self((1u64 << count) - 1))
        }
    }

    /// Get the raw mask value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Every bit of `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Number of set bits.
    #[must_use]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }
}

impl std::fmt::Binary for LinkMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Binary::fmt(&self.0, f)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Phreak core.
///
/// Most variants are invariant violations: they indicate a defect in the
/// network builder and should fail fast. `FactNotFound` and
/// `InvalidDefinition` are recoverable. Reads of memory that has not been
/// created yet return `Option` instead of an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhreakError {
    /// The requested node does not exist in the network.
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// A node with this id was already added.
    #[error("Duplicate node id: {0}")]
    DuplicateNode(NodeId),

    /// The builder tried to create an impossible connection.
    #[error("Invalid topology at {node}: {reason}")]
    InvalidTopology { node: NodeId, reason: String },

    /// Segment operations were requested on a node that has no segment.
    #[error("Node {node} ({kind}) is not part of any segment")]
    NotASegmentNode { node: NodeId, kind: NodeKind },

    /// A kind-specific operation was called on the wrong kind of node.
    #[error("Node {node} is a {found} node, expected {expected}")]
    UnexpectedKind {
        node: NodeId,
        expected: &'static str,
        found: NodeKind,
    },

    /// A child carries a rule its parent does not.
    #[error("Inconsistent associations between {parent} and child {child}")]
    InconsistentAssociations { parent: NodeId, child: NodeId },

    /// A segment has more nodes than the mask can hold.
    #[error("Segment starting at {head} exceeds {max} nodes")]
    SegmentTooLong { head: NodeId, max: usize },

    /// A retraction named a fact the node memory does not hold.
    #[error("Fact {fact:?} not found in memory of {node}")]
    FactNotFound { node: NodeId, fact: FactHandle },

    /// No terminal is bound to the rule.
    #[error("Rule not found: {0}")]
    RuleNotFound(RuleName),

    /// A declarative network or script definition is malformed.
    #[error("Invalid definition: {0}")]
    InvalidDefinition(String),
}

impl PhreakError {
    /// Whether this error indicates a builder/programmer defect.
    #[must_use]
    pub const fn is_invariant_violation(&self) -> bool {
        !matches!(
            self,
            Self::FactNotFound { .. } | Self::RuleNotFound(_) | Self::InvalidDefinition(_)
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_linked_mask_has_count_low_bits() {
        assert_eq!(LinkMask::all_linked(0), Some(LinkMask(0)));
        assert_eq!(LinkMask::all_linked(1), Some(LinkMask(1)));
        assert_eq!(LinkMask::all_linked(4), Some(LinkMask(15)));
        assert_eq!(LinkMask::all_linked(64), Some(LinkMask(u64::MAX)));
        assert_eq!(LinkMask::all_linked(65), None);
    }

    #[test]
    fn bit_positions_double() {
        assert_eq!(LinkMask::bit(0), Some(LinkMask(1)));
        assert_eq!(LinkMask::bit(3), Some(LinkMask(8)));
        assert_eq!(LinkMask::bit(63), Some(LinkMask(1 << 63)));
        assert_eq!(LinkMask::bit(64), None);
    }

    #[test]
    fn mask_set_and_clear() {
        let mask = LinkMask::EMPTY.with(LinkMask(1)).with(LinkMask(4));
        assert_eq!(mask.value(), 5);
        assert!(mask.contains(LinkMask(4)));
        assert_eq!(mask.without(LinkMask(1)).value(), 4);
        assert_eq!(mask.count(), 2);
    }

    #[test]
    fn associations_compare_rule_sets_only() {
        let mut a: Associations = ["rule1", "rule2"].into_iter().collect();
        let b: Associations = ["rule2", "rule1"].into_iter().collect();
        assert!(a.same_rules(&b));

        a.insert(RuleName::new("rule1"), AssociationMarker(7));
        assert!(a.same_rules(&b));
        assert_eq!(a.marker(&RuleName::new("rule1")), Some(AssociationMarker(0)));
        assert!(a.is_shared());
    }

    #[test]
    fn associations_subset() {
        let parent: Associations = ["rule1", "rule2", "rule3"].into_iter().collect();
        let child: Associations = ["rule2"].into_iter().collect();
        assert!(child.is_subset_of(&parent));
        assert!(!parent.is_subset_of(&child));
    }

    #[test]
    fn kinds_in_segments() {
        assert!(NodeKind::LeftInputAdapter.is_segment_member());
        assert!(NodeKind::Not.is_segment_member());
        assert!(!NodeKind::Terminal.is_segment_member());
        assert!(!NodeKind::ObjectTypeSource.is_segment_member());
        assert!(!NodeKind::LeftInputAdapter.is_beta());
    }

    #[test]
    fn error_classification() {
        let missing = PhreakError::FactNotFound {
            node: NodeId(1),
            fact: FactHandle(2),
        };
        assert!(!missing.is_invariant_violation());
        let too_long = PhreakError::SegmentTooLong {
            head: NodeId(1),
            max: MAX_SEGMENT_NODES,
        };
        assert!(too_long.is_invariant_violation());
    }
}
