//! # Declarative Definitions
//!
//! Serde-friendly mirrors of the builder and session APIs, so that a network
//! and a sequence of fact operations can be described in a data file and
//! replayed. The core only defines the shapes; reading files is left to the
//! caller.
//!
//! Nodes must be listed parents first, the same order the builder needs.

use crate::network::{Network, NetworkBuilder};
use crate::primitives::MAX_DEFINITION_NODES;
use crate::session::Session;
use crate::{FactHandle, NodeId, NodeKind, PhreakError, RuleName};
use serde::{Deserialize, Serialize};

// =============================================================================
// NETWORK DEFINITION
// =============================================================================

/// One node of a network definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeDef {
    pub id: NodeId,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<NodeId>,
    /// Right input of a beta node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<NodeId>,
    /// Associated rules (ignored for terminals, which use `rule`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleName>,
    /// Rule bound to a terminal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<RuleName>,
}

/// A whole network.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkDef {
    /// Add each rule to every ancestor of its terminal after loading.
    #[serde(default)]
    pub derive_associations: bool,
    #[serde(default)]
    pub nodes: Vec<NodeDef>,
}

impl NetworkDef {
    /// Replay the definition through a [`NetworkBuilder`].
    pub fn build(&self) -> Result<Network, PhreakError> {
        if self.nodes.len() > MAX_DEFINITION_NODES {
            return Err(PhreakError::InvalidDefinition(format!(
                "{} nodes exceeds the limit of {}",
                self.nodes.len(),
                MAX_DEFINITION_NODES
            )));
        }

        let mut builder = NetworkBuilder::new();
        for def in &self.nodes {
            add_node(&mut builder, def)?;
        }
        if self.derive_associations {
            builder.derive_associations();
        }
        Ok(builder.build())
    }
}

fn add_node(builder: &mut NetworkBuilder, def: &NodeDef) -> Result<(), PhreakError> {
    if def.right.is_some() && !def.kind.is_beta() {
        return Err(PhreakError::InvalidDefinition(format!(
            "node {} is a {} node and cannot take a right input",
            def.id, def.kind
        )));
    }

    match def.kind {
        NodeKind::Terminal => {
            let (Some(parent), Some(rule)) = (def.parent, def.rule.clone()) else {
                return Err(PhreakError::InvalidDefinition(format!(
                    "terminal {} needs a parent and a rule",
                    def.id
                )));
            };
            builder.add_terminal(def.id, parent, rule)?;
        }
        NodeKind::Join | NodeKind::Exists | NodeKind::Not => {
            let Some(left) = def.parent else {
                return Err(PhreakError::InvalidDefinition(format!(
                    "{} node {} needs a parent",
                    def.kind, def.id
                )));
            };
            builder.add_beta(def.id, def.kind, left, def.right, def.rules.iter().cloned())?;
        }
        NodeKind::ObjectTypeSource | NodeKind::LeftInputAdapter => {
            builder.add_node(def.id, def.kind, def.parent, def.rules.iter().cloned())?;
        }
    }
    Ok(())
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// A single session mutation, tagged by `op`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    CreateSegment { node: NodeId },
    AssertObject { node: NodeId, fact: FactHandle },
    RetractObject { node: NodeId, fact: FactHandle },
    AssertLeft { node: NodeId, fact: FactHandle },
    RetractLeft { node: NodeId, fact: FactHandle },
    RetractRight { node: NodeId, fact: FactHandle },
    /// Second phase of a Not node right insert.
    RecomputeNot { node: NodeId },
    UpdateBit { node: NodeId, linked: bool },
}

impl Operation {
    /// Apply the operation to a session.
    pub fn apply(&self, session: &mut Session) -> Result<(), PhreakError> {
        match *self {
            Self::CreateSegment { node } => session.create_segment_memory(node).map(|_| ()),
            Self::AssertObject { node, fact } => session.assert_object(node, fact),
            Self::RetractObject { node, fact } => session.retract_object(node, fact),
            Self::AssertLeft { node, fact } => session.assert_left_tuple(node, fact),
            Self::RetractLeft { node, fact } => session.retract_left_tuple(node, fact),
            Self::RetractRight { node, fact } => session.retract_right_tuple(node, fact),
            Self::RecomputeNot { node } => session.recompute_not_node_link_on_right_insert(node),
            Self::UpdateBit { node, linked } => session.update_node_bit(node, linked),
        }
    }

    /// The node the operation targets.
    #[must_use]
    pub fn node(&self) -> NodeId {
        match *self {
            Self::CreateSegment { node }
            | Self::AssertObject { node, .. }
            | Self::RetractObject { node, .. }
            | Self::AssertLeft { node, .. }
            | Self::RetractLeft { node, .. }
            | Self::RetractRight { node, .. }
            | Self::RecomputeNot { node }
            | Self::UpdateBit { node, .. } => node,
        }
    }
}

/// An ordered list of operations.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    #[serde(default)]
    pub steps: Vec<Operation>,
}

impl Script {
    /// Apply every step in order, stopping at the first error.
    ///
    /// Returns the number of steps applied.
    pub fn run(&self, session: &mut Session) -> Result<usize, PhreakError> {
        for (index, step) in self.steps.iter().enumerate() {
            step.apply(session).inspect_err(|e| {
                tracing::warn!(step = index, node = %step.node(), error = %e, "script step failed");
            })?;
        }
        Ok(self.steps.len())
    }
}

// =============================================================================
// TESTS
// =============================================================================
