use std::collections::{BTreeSet, HashMap};
use std::fmt;

use super::link::Link;
use super::node::{Node, NodeId};

/// Read-only structure graph: nodes plus the links between them.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    links: Vec<Link>,
    node_index: HashMap<NodeId, usize>,
}

impl Graph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: Node) -> Result<NodeId, GraphError> {
        let id = node.id;
        if self.node_index.contains_key(&id) {
            return Err(GraphError::DuplicateNode(id));
        }
        self.node_index.insert(id, self.nodes.len());
        self.nodes.push(node);
        Ok(id)
    }

    /// Adds a link between two existing, distinct nodes.
    pub fn add_link(&mut self, link: Link) -> Result<(), GraphError> {
        for id in [link.n1, link.n2] {
            if !self.node_index.contains_key(&id) {
                return Err(GraphError::UnknownNode(id));
            }
        }
        if link.n1 == link.n2 {
            return Err(GraphError::SelfLink(link.n1));
        }
        self.links.push(link);
        Ok(())
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.node_index
            .get(&id)
            .and_then(|idx| self.nodes.get(*idx))
    }

    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[must_use]
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn links_of(&self, id: NodeId) -> impl Iterator<Item = &Link> + '_ {
        self.links.iter().filter(move |link| link.has_node(id))
    }

    #[must_use]
    pub fn valence(&self, id: NodeId) -> usize {
        self.links_of(id).count()
    }

    #[must_use]
    pub fn is_disconnected(&self, id: NodeId) -> bool {
        self.valence(id) == 0
    }

    /// Distinct neighbours of `id`, in ascending id order.
    #[must_use]
    pub fn adjacent(&self, id: NodeId) -> Vec<NodeId> {
        self.links_of(id)
            .filter_map(|link| link.other_node(id))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    DuplicateNode(NodeId),
    UnknownNode(NodeId),
    SelfLink(NodeId),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateNode(id) => write!(f, "node {id} already exists in the graph"),
            Self::UnknownNode(id) => write!(f, "node {id} not found in the graph"),
            Self::SelfLink(id) => write!(f, "node {id} cannot be linked to itself"),
        }
    }
}

impl std::error::Error for GraphError {}
