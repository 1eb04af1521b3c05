//! # Node Network
//!
//! The immutable topology of a knowledge base: typed nodes, their left
//! parent, optional right input, children and rule associations.
//!
//! A `Network` is built once through [`NetworkBuilder`] and then shared
//! read-only (typically behind an `Arc`) by every session of the knowledge
//! base. All data structures use `BTreeMap` for deterministic ordering.

use crate::{AssociationMarker, Associations, NodeId, NodeKind, PhreakError, RuleName};
use std::collections::BTreeMap;

// =============================================================================
// NODE
// =============================================================================

/// A node of the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Stable identity.
    pub id: NodeId,
    /// Kind tag, selects the linking policy.
    pub kind: NodeKind,
    /// Left parent (absent only for object type sources).
    pub parent: Option<NodeId>,
    /// Right input of a beta node.
    pub right_input: Option<NodeId>,
    /// Children in attachment order, terminals included.
    pub children: Vec<NodeId>,
    /// Rules whose pattern passes through this node.
    pub associations: Associations,
    /// Rule bound to a terminal node.
    pub rule: Option<RuleName>,
}

impl Node {
    fn new(id: NodeId, kind: NodeKind, parent: Option<NodeId>) -> Self {
        Self {
            id,
            kind,
            parent,
            right_input: None,
            children: Vec::new(),
            associations: Associations::new(),
            rule: None,
        }
    }

    /// The node has exactly one child.
    #[must_use]
    pub fn has_single_child(&self) -> bool {
        self.children.len() == 1
    }

    /// A node is shared when more than one rule passes through it.
    #[must_use]
    pub fn is_shared(&self) -> bool {
        self.associations.is_shared()
    }
}

// =============================================================================
// NETWORK
// =============================================================================

/// The built, immutable node network.
#[derive(Debug, Clone, Default)]
pub struct Network {
    nodes: BTreeMap<NodeId, Node>,
    /// Rule -> terminal node
    terminals: BTreeMap<RuleName, NodeId>,
    /// Object type source -> beta nodes using it as right input
    right_sinks: BTreeMap<NodeId, Vec<NodeId>>,
}

impl Network {
    /// Start building a network.
    #[must_use]
    pub fn builder() -> NetworkBuilder {
        NetworkBuilder::new()
    }

    /// Lookup a node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Lookup a node, failing with `NodeNotFound`.
    pub fn get(&self, id: NodeId) -> Result<&Node, PhreakError> {
        self.nodes.get(&id).ok_or(PhreakError::NodeNotFound(id))
    }

    /// Whether the node exists.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// All nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Nodes that carry segment bits, in id order.
    pub fn segment_members(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(|n| n.kind.is_segment_member())
    }

    /// Total number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the network has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Terminal node of a rule.
    #[must_use]
    pub fn terminal_for(&self, rule: &RuleName) -> Option<NodeId> {
        self.terminals.get(rule).copied()
    }

    /// All rules with their terminal, in name order.
    pub fn rules(&self) -> impl Iterator<Item = (&RuleName, NodeId)> {
        self.terminals.iter().map(|(rule, id)| (rule, *id))
    }

    /// Beta nodes fed on their right side by the given source.
    pub fn right_sinks(&self, source: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.right_sinks
            .get(&source)
            .into_iter()
            .flat_map(|sinks| sinks.iter().copied())
    }
}

// =============================================================================
// BUILDER
// =============================================================================

/// Incrementally assembles a [`Network`].
///
/// Every call validates the connection it makes, so a successful `build()`
/// always yields a well-formed DAG: sources at the roots, adapters directly
/// below sources, beta chains below adapters and terminals at the leaves.
#[derive(Debug, Clone, Default)]
pub struct NetworkBuilder {
    network: Network,
}

impl NetworkBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a non-terminal node.
    ///
    /// - Object type sources take no parent.
    /// - Left input adapters must hang off an object type source.
    /// - Beta nodes must hang off an adapter or another beta node.
    ///
    /// Terminals are added with [`add_terminal`](Self::add_terminal).
    pub fn add_node<R, I>(
        &mut self,
        id: NodeId,
        kind: NodeKind,
        parent: Option<NodeId>,
        rules: I,
    ) -> Result<NodeId, PhreakError>
    where
        R: Into<RuleName>,
        I: IntoIterator<Item = R>,
    {
        self.check_new(id)?;
        match (kind, parent) {
            (NodeKind::Terminal, _) => {
                return Err(topology(id, "terminal nodes are added with a rule"));
            }
            (NodeKind::ObjectTypeSource, Some(_)) => {
                return Err(topology(id, "object type sources have no parent"));
            }
            (NodeKind::ObjectTypeSource, None) => {}
            (_, None) => return Err(topology(id, "node needs a parent")),
            (NodeKind::LeftInputAdapter, Some(p)) => {
                self.expect_parent(id, p, |k| k == NodeKind::ObjectTypeSource)?;
            }
            (_, Some(p)) => {
                self.expect_parent(id, p, NodeKind::is_left_tuple_source)?;
            }
        }

        let mut node = Node::new(id, kind, parent);
        node.associations = rules.into_iter().collect();
        self.attach(node);
        Ok(id)
    }

    /// Add a beta node with an optional right input.
    pub fn add_beta<R, I>(
        &mut self,
        id: NodeId,
        kind: NodeKind,
        left: NodeId,
        right: Option<NodeId>,
        rules: I,
    ) -> Result<NodeId, PhreakError>
    where
        R: Into<RuleName>,
        I: IntoIterator<Item = R>,
    {
        if !kind.is_beta() {
            return Err(topology(id, "add_beta needs a join, exists or not kind"));
        }
        if let Some(source) = right {
            let is_source = self
                .network
                .node(source)
                .is_some_and(|n| n.kind == NodeKind::ObjectTypeSource);
            if !is_source {
                return Err(topology(id, "right input must be an object type source"));
            }
        }

        self.add_node(id, kind, Some(left), rules)?;
        if let Some(source) = right {
            if let Some(node) = self.network.nodes.get_mut(&id) {
                node.right_input = Some(source);
            }
            self.network
                .right_sinks
                .entry(source)
                .or_default()
                .push(id);
        }
        Ok(id)
    }

    /// Add the terminal node of a rule.
    ///
    /// Each rule has exactly one terminal.
    pub fn add_terminal(
        &mut self,
        id: NodeId,
        parent: NodeId,
        rule: impl Into<RuleName>,
    ) -> Result<NodeId, PhreakError> {
        let rule = rule.into();
        self.check_new(id)?;
        self.expect_parent(id, parent, NodeKind::is_left_tuple_source)?;
        if self.network.terminals.contains_key(&rule) {
            return Err(topology(id, &format!("rule '{}' already has a terminal", rule)));
        }

        let mut node = Node::new(id, NodeKind::Terminal, Some(parent));
        node.associations.insert(rule.clone(), AssociationMarker::default());
        node.rule = Some(rule.clone());
        self.attach(node);
        self.network.terminals.insert(rule, id);
        Ok(id)
    }

    /// Associate a rule with an existing node.
    pub fn associate(
        &mut self,
        id: NodeId,
        rule: impl Into<RuleName>,
        marker: AssociationMarker,
    ) -> Result<(), PhreakError> {
        let node = self
            .network
            .nodes
            .get_mut(&id)
            .ok_or(PhreakError::NodeNotFound(id))?;
        node.associations.insert(rule.into(), marker);
        Ok(())
    }

    /// Associate each rule with every ancestor of its terminal.
    ///
    /// This is what a rule compiler does when it attaches a rule's pattern
    /// to the network; explicitly added associations are kept.
    pub fn derive_associations(&mut self) {
        let terminals: Vec<(RuleName, NodeId)> = self
            .network
            .terminals
            .iter()
            .map(|(rule, id)| (rule.clone(), *id))
            .collect();

        for (rule, terminal) in terminals {
            let mut current = self.network.node(terminal).and_then(|n| n.parent);
            while let Some(id) = current {
                let Some(node) = self.network.nodes.get_mut(&id) else {
                    break;
                };
                node.associations
                    .insert(rule.clone(), AssociationMarker::default());
                current = node.parent;
            }
        }
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> Network {
        tracing::debug!(
            nodes = self.network.nodes.len(),
            rules = self.network.terminals.len(),
            "network built"
        );
        self.network
    }

    fn check_new(&self, id: NodeId) -> Result<(), PhreakError> {
        if self.network.nodes.contains_key(&id) {
            return Err(PhreakError::DuplicateNode(id));
        }
        Ok(())
    }

    fn expect_parent(
        &self,
        id: NodeId,
        parent: NodeId,
        accepts: impl Fn(NodeKind) -> bool,
    ) -> Result<(), PhreakError> {
        let parent_node = self
            .network
            .node(parent)
            .ok_or(PhreakError::NodeNotFound(parent))?;
        if !accepts(parent_node.kind) {
            return Err(topology(
                id,
                &format!("cannot attach below {} node {}", parent_node.kind, parent),
            ));
        }
        Ok(())
    }

    fn attach(&mut self, node: Node) {
        if let Some(parent) = node.parent {
            if let Some(p) = self.network.nodes.get_mut(&parent) {
                p.children.push(node.id);
            }
        }
        self.network.nodes.insert(node.id, node);
    }
}

fn topology(node: NodeId, reason: &str) -> PhreakError {
    PhreakError::InvalidTopology {
        node,
        reason: reason.to_string(),
    }
}

// =============================================================================
// TESTS
// =============================================================================
