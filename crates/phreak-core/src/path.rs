//! # Rule Paths
//!
//! A rule's path is the ordered list of segments from the left input
//! adapter down to its terminal. The rule can only fire once every segment
//! on the path is linked, which lets the evaluator skip whole rules.

use crate::{LinkMask, NodeId, RuleName, SegmentId};
use serde::{Deserialize, Serialize};

/// Linked state of every segment on one rule's path.
///
/// This is a point-in-time view computed by `Session::rule_path`; it is not
/// updated by later link changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathMemory {
    pub rule: RuleName,
    pub terminal: NodeId,
    /// Root first.
    pub segments: Vec<SegmentId>,
    /// Bit `i` set when `segments[i]` is linked.
    pub linked_segment_mask: LinkMask,
    pub all_linked_segment_mask: LinkMask,
}

impl PathMemory {
    pub(crate) fn new(
        rule: RuleName,
        terminal: NodeId,
        segments: Vec<SegmentId>,
        linked: &[bool],
    ) -> Self {
        let all_linked_segment_mask = LinkMask::all_linked(segments.len()).unwrap_or(LinkMask::EMPTY);
        let linked_segment_mask = linked
            .iter()
            .enumerate()
            .filter(|(_, linked)| **linked)
            .filter_map(|(position, _)| LinkMask::bit(position))
            .fold(LinkMask::EMPTY, LinkMask::with);
        Self {
            rule,
            terminal,
            segments,
            linked_segment_mask,
            all_linked_segment_mask,
        }
    }

    /// Every segment on the path is linked.
    #[must_use]
    pub fn is_rule_linked(&self) -> bool {
        !self.segments.is_empty() && self.linked_segment_mask == self.all_linked_segment_mask
    }

    /// Segments that still block the rule, root first.
    pub fn unlinked_segments(&self) -> impl Iterator<Item = SegmentId> + '_ {
        self.segments.iter().enumerate().filter_map(|(position, &id)| {
            let bit = LinkMask::bit(position)?;
            (!self.linked_segment_mask.contains(bit)).then_some(id)
        })
    }
}
