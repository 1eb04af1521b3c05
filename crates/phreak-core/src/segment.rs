//! # Segments
//!
//! A segment is a maximal chain of segment-member nodes where every node has
//! exactly one child and the same rule-association set. Branching, a change
//! of association set, an object type source above or a terminal below all
//! end a segment.
//!
//! Discovery is a pure function of the network: starting from any member it
//! walks upstream to the top of the segment, then downstream assigning
//! positions. Starting from any other member of the same segment yields the
//! same node list, which is what makes segment construction idempotent.

use crate::network::{Network, Node};
use crate::primitives::MAX_SEGMENT_NODES;
use crate::{LinkMask, NodeId, PhreakError, SegmentId};
use serde::{Deserialize, Serialize};

// =============================================================================
// DISCOVERY
// =============================================================================

/// Find the ordered members of the segment containing `node`.
///
/// # Errors
///
/// - `NodeNotFound` for unknown ids
/// - `NotASegmentNode` for object type sources and terminals
/// - `InconsistentAssociations` when a child carries a rule its parent lacks
/// - `SegmentTooLong` when the chain exceeds [`MAX_SEGMENT_NODES`]
pub fn discover(network: &Network, node: NodeId) -> Result<Vec<NodeId>, PhreakError> {
    let start = network.get(node)?;
    if !start.kind.is_segment_member() {
        return Err(PhreakError::NotASegmentNode {
            node,
            kind: start.kind,
        });
    }

    let top = segment_top(network, start)?;

    let mut nodes = vec![top.id];
    let mut current = top;
    while let Some(child) = single_member_child(network, current)? {
        if !child.associations.same_rules(&current.associations) {
            break;
        }
        if nodes.len() >= MAX_SEGMENT_NODES {
            return Err(PhreakError::SegmentTooLong {
                head: top.id,
                max: MAX_SEGMENT_NODES,
            });
        }
        nodes.push(child.id);
        current = child;
    }

    Ok(nodes)
}

fn segment_top<'a>(network: &'a Network, start: &'a Node) -> Result<&'a Node, PhreakError> {
    let mut top = start;
    while let Some(parent_id) = top.parent {
        let parent = network.get(parent_id)?;
        if !parent.kind.is_segment_member() {
            break;
        }
        check_associations(parent, top)?;
        if !parent.has_single_child() || !parent.associations.same_rules(&top.associations) {
            break;
        }
        top = parent;
    }
    Ok(top)
}

/// The only child of `node`, if there is exactly one and it is a member.
fn single_member_child<'a>(
    network: &'a Network,
    node: &'a Node,
) -> Result<Option<&'a Node>, PhreakError> {
    let [child_id] = node.children.as_slice() else {
        return Ok(None);
    };
    let child = network.get(*child_id)?;
    if !child.kind.is_segment_member() {
        return Ok(None);
    }
    check_associations(node, child)?;
    Ok(Some(child))
}

fn check_associations(parent: &Node, child: &Node) -> Result<(), PhreakError> {
    if child.associations.is_subset_of(&parent.associations) {
        Ok(())
    } else {
        Err(PhreakError::InconsistentAssociations {
            parent: parent.id,
            child: child.id,
        })
    }
}

// =============================================================================
// SEGMENT MEMORY
// =============================================================================

/// Per-session linking state of one segment.
///
/// `all_linked_mask` is fixed at creation; `linked_mask` only changes
/// through the linking engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentMemory {
    id: SegmentId,
    nodes: Vec<NodeId>,
    all_linked_mask: LinkMask,
    linked_mask: LinkMask,
}

impl SegmentMemory {
    /// Create an all-unlinked memory for the given members.
    ///
    /// Returns `None` for an empty or overlong member list.
    pub(crate) fn new(id: SegmentId, nodes: Vec<NodeId>) -> Option<Self> {
        if nodes.is_empty() {
            return None;
        }
        let all_linked_mask = LinkMask::all_linked(nodes.len())?;
        Some(Self {
            id,
            nodes,
            all_linked_mask,
            linked_mask: LinkMask::EMPTY,
        })
    }

    #[must_use]
    pub fn id(&self) -> SegmentId {
        self.id
    }

    /// First node of the segment.
    #[must_use]
    pub fn head(&self) -> NodeId {
        self.nodes[0]
    }

    /// Last node of the segment.
    #[must_use]
    pub fn tip(&self) -> NodeId {
        self.nodes[self.nodes.len() - 1]
    }

    /// Members in position order.
    #[must_use]
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Target mask: one bit per member.
    #[must_use]
    pub fn all_linked_mask_test(&self) -> LinkMask {
        self.all_linked_mask
    }

    /// Live mask of members currently eligible to propagate.
    #[must_use]
    pub fn linked_mask(&self) -> LinkMask {
        self.linked_mask
    }

    /// Every member is eligible.
    #[must_use]
    pub fn is_segment_linked(&self) -> bool {
        self.linked_mask == self.all_linked_mask
    }

    /// Position of a member.
    #[must_use]
    pub fn position_of(&self, node: NodeId) -> Option<usize> {
        self.nodes.iter().position(|&n| n == node)
    }

    /// Bit of a member.
    #[must_use]
    pub fn node_pos_mask_bit(&self, node: NodeId) -> Option<LinkMask> {
        self.position_of(node).and_then(LinkMask::bit)
    }

    /// Set or clear one member bit.
    ///
    /// Returns `true` when the segment's linked state flipped.
    pub(crate) fn update_bit(&mut self, bit: LinkMask, linked: bool) -> bool {
        let was_linked = self.is_segment_linked();
        self.linked_mask = if linked {
            self.linked_mask.with(bit)
        } else {
            self.linked_mask.without(bit)
        };
        was_linked != self.is_segment_linked()
    }

    /// Serializable view for reporting.
    #[must_use]
    pub fn snapshot(&self) -> SegmentSnapshot {
        SegmentSnapshot {
            id: self.id,
            nodes: self.nodes.clone(),
            all_linked_mask: self.all_linked_mask.value(),
            linked_mask: self.linked_mask.value(),
            linked: self.is_segment_linked(),
        }
    }
}

/// Plain-data copy of a segment memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentSnapshot {
    pub id: SegmentId,
    pub nodes: Vec<NodeId>,
    pub all_linked_mask: u64,
    pub linked_mask: u64,
    pub linked: bool,
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeKind;

    const ALL: [&str; 2] = ["r1", "r2"];

    /// otn(1) -> lia(2) -> j(3) -> j(4) -> {j(5) -> rtn r1, j(6) -> rtn r2}
    fn forked() -> Network {
        let mut b = Network::builder();
        b.add_node(NodeId(1), NodeKind::ObjectTypeSource, None, ALL)
            .expect("otn");
        b.add_node(NodeId(2), NodeKind::LeftInputAdapter, Some(NodeId(1)), ALL)
            .expect("lia");
        b.add_node(NodeId(3), NodeKind::Join, Some(NodeId(2)), ALL)
            .expect("n3");
        b.add_node(NodeId(4), NodeKind::Join, Some(NodeId(3)), ALL)
            .expect("n4");
        b.add_node(NodeId(5), NodeKind::Join, Some(NodeId(4)), ["r1"])
            .expect("n5");
        b.add_node(NodeId(6), NodeKind::Join, Some(NodeId(4)), ["r2"])
            .expect("n6");
        b.add_terminal(NodeId(7), NodeId(5), "r1").expect("rtn1");
        b.add_terminal(NodeId(8), NodeId(6), "r2").expect("rtn2");
        b.build()
    }

    #[test]
    fn discovers_from_any_member() {
        let network = forked();
        for start in [2, 3, 4] {
            let nodes = discover(&network, NodeId(start)).expect("discover");
            assert_eq!(nodes, vec![NodeId(2), NodeId(3), NodeId(4)]);
        }
    }

    #[test]
    fn terminal_ends_segment() {
        let network = forked();
        assert_eq!(discover(&network, NodeId(5)).expect("n5"), vec![NodeId(5)]);
        assert_eq!(discover(&network, NodeId(6)).expect("n6"), vec![NodeId(6)]);
    }

    #[test]
    fn non_members_are_rejected() {
        let network = forked();
        let err = discover(&network, NodeId(7)).expect_err("terminal");
        assert_eq!(
            err,
            PhreakError::NotASegmentNode {
                node: NodeId(7),
                kind: NodeKind::Terminal
            }
        );
        assert!(discover(&network, NodeId(1)).is_err());
        assert_eq!(
            discover(&network, NodeId(99)),
            Err(PhreakError::NodeNotFound(NodeId(99)))
        );
    }

    #[test]
    fn inconsistent_associations_fail_fast() {
        let mut b = Network::builder();
        b.add_node(NodeId(1), NodeKind::ObjectTypeSource, None, ["r1"])
            .expect("otn");
        b.add_node(NodeId(2), NodeKind::LeftInputAdapter, Some(NodeId(1)), ["r1"])
            .expect("lia");
        b.add_node(NodeId(3), NodeKind::Join, Some(NodeId(2)), ["r1", "r2"])
            .expect("n3");
        let network = b.build();

        let err = discover(&network, NodeId(2)).expect_err("inconsistent");
        assert_eq!(
            err,
            PhreakError::InconsistentAssociations {
                parent: NodeId(2),
                child: NodeId(3)
            }
        );
        assert!(discover(&network, NodeId(3)).is_err());
    }

    #[test]
    fn overlong_chain_is_rejected() {
        let mut b = Network::builder();
        b.add_node(NodeId(0), NodeKind::ObjectTypeSource, None, ["r"])
            .expect("otn");
        b.add_node(NodeId(1), NodeKind::LeftInputAdapter, Some(NodeId(0)), ["r"])
            .expect("lia");
        for i in 2..=(MAX_SEGMENT_NODES as u32 + 1) {
            b.add_node(NodeId(i), NodeKind::Join, Some(NodeId(i - 1)), ["r"])
                .expect("join");
        }
        let network = b.build();
        assert_eq!(
            discover(&network, NodeId(1)),
            Err(PhreakError::SegmentTooLong {
                head: NodeId(1),
                max: MAX_SEGMENT_NODES
            })
        );
    }

    #[test]
    fn exactly_max_nodes_fit() {
        let mut b = Network::builder();
        b.add_node(NodeId(0), NodeKind::ObjectTypeSource, None, ["r"])
            .expect("otn");
        b.add_node(NodeId(1), NodeKind::LeftInputAdapter, Some(NodeId(0)), ["r"])
            .expect("lia");
        for i in 2..=(MAX_SEGMENT_NODES as u32) {
            b.add_node(NodeId(i), NodeKind::Join, Some(NodeId(i - 1)), ["r"])
                .expect("join");
        }
        let network = b.build();
        let nodes = discover(&network, NodeId(30)).expect("discover");
        assert_eq!(nodes.len(), MAX_SEGMENT_NODES);

        let memory = SegmentMemory::new(SegmentId(0), nodes).expect("memory");
        assert_eq!(memory.all_linked_mask_test(), LinkMask(u64::MAX));
        assert_eq!(memory.node_pos_mask_bit(NodeId(64)), Some(LinkMask(1 << 63)));
    }

    #[test]
    fn update_bit_reports_flips() {
        let mut memory =
            SegmentMemory::new(SegmentId(0), vec![NodeId(1), NodeId(2)]).expect("memory");
        assert_eq!(memory.all_linked_mask_test(), LinkMask(3));
        assert!(!memory.update_bit(LinkMask(1), true));
        assert!(memory.update_bit(LinkMask(2), true));
        assert!(memory.is_segment_linked());
        assert!(!memory.update_bit(LinkMask(2), true));
        assert!(memory.update_bit(LinkMask(1), false));
        assert_eq!(memory.linked_mask(), LinkMask(2));
        assert_eq!(memory.head(), NodeId(1));
        assert_eq!(memory.tip(), NodeId(2));
    }
}
