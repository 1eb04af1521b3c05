//! Shared network fixtures for integration tests.

#![allow(dead_code)]

use phreak_core::{Network, NodeId, NodeKind};
use std::sync::Arc;

pub const OTN: NodeId = NodeId(3);
pub const LIA: NodeId = NodeId(4);
pub const RIGHT_SOURCE: NodeId = NodeId(8);
pub const N1: NodeId = NodeId(10);
pub const N2: NodeId = NodeId(11);
pub const N3: NodeId = NodeId(12);
pub const N4: NodeId = NodeId(13);
pub const N5: NodeId = NodeId(14);
pub const N6: NodeId = NodeId(15);
pub const N7: NodeId = NodeId(16);
pub const N8: NodeId = NodeId(17);
pub const RTN1: NodeId = NodeId(18);
pub const RTN2: NodeId = NodeId(19);
pub const RTN3: NodeId = NodeId(20);

const ALL: [&str; 3] = ["rule1", "rule2", "rule3"];
const R2_R3: [&str; 2] = ["rule2", "rule3"];
const R3: [&str; 1] = ["rule3"];

/// The reference network, with every beta node of the same kind.
pub fn reference(kind: NodeKind) -> Arc<Network> {
    reference_with([kind; 8])
}

/// The reference network with one kind per beta node `n1..n8`.
///
/// ```text
/// otn -> lia -> n1 -> n2 -> rtn1
///                \
///                 n3 -> n4 -> n5 -> n6 -> rtn2
///                                    \
///                                     n7 -> n8 -> rtn3
/// ```
///
/// `{lia, n1}`, `{n2}`, `{n3..n6}` and `{n7, n8}` are the segments.
pub fn reference_with(kinds: [NodeKind; 8]) -> Arc<Network> {
    let mut b = Network::builder();
    b.add_node(OTN, NodeKind::ObjectTypeSource, None, ALL)
        .expect("otn");
    b.add_node(RIGHT_SOURCE, NodeKind::ObjectTypeSource, None, ALL)
        .expect("right source");
    b.add_node(LIA, NodeKind::LeftInputAdapter, Some(OTN), ALL)
        .expect("lia");

    let right = Some(RIGHT_SOURCE);
    b.add_beta(N1, kinds[0], LIA, right, ALL).expect("n1");
    b.add_beta(N2, kinds[1], N1, right, ALL).expect("n2");
    b.add_terminal(RTN1, N2, "rule1").expect("rtn1");

    b.add_beta(N3, kinds[2], N1, right, R2_R3).expect("n3");
    b.add_beta(N4, kinds[3], N3, right, R2_R3).expect("n4");
    b.add_beta(N5, kinds[4], N4, right, R2_R3).expect("n5");
    b.add_beta(N6, kinds[5], N5, right, R2_R3).expect("n6");
    b.add_terminal(RTN2, N6, "rule2").expect("rtn2");

    b.add_beta(N7, kinds[6], N6, right, R3).expect("n7");
    b.add_beta(N8, kinds[7], N7, right, R3).expect("n8");
    b.add_terminal(RTN3, N8, "rule3").expect("rtn3");

    Arc::new(b.build())
}

/// A single left-input chain of `len` join nodes below an adapter, all for
/// one rule. Node ids: source 0, adapter 1, joins 2..=len+1.
pub fn chain(len: u32) -> Arc<Network> {
    let mut b = Network::builder();
    b.add_node(NodeId(0), NodeKind::ObjectTypeSource, None, ["r"])
        .expect("otn");
    b.add_node(NodeId(1), NodeKind::LeftInputAdapter, Some(NodeId(0)), ["r"])
        .expect("lia");
    for i in 2..=(len + 1) {
        b.add_beta(NodeId(i), NodeKind::Join, NodeId(i - 1), Some(NodeId(0)), ["r"])
            .expect("join");
    }
    Arc::new(b.build())
}
