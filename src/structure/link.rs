//! Links between structure nodes.

use serde::{Deserialize, Serialize};

use super::node::{Coord, Node, NodeId};
use crate::geom::Point3;

/// Connection between two nodes, with the attachment coordinate on each end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub n1: NodeId,
    pub n2: NodeId,
    pub coords: [Coord; 2],
}

impl Link {
    #[must_use]
    pub fn new(n1: NodeId, coord1: Coord, n2: NodeId, coord2: Coord) -> Self {
        Self {
            n1,
            n2,
            coords: [coord1, coord2],
        }
    }

    #[must_use]
    pub fn has_node(&self, id: NodeId) -> bool {
        self.n1 == id || self.n2 == id
    }

    /// The node on the far side of the link, or `None` if `id` is not an end.
    #[must_use]
    pub fn other_node(&self, id: NodeId) -> Option<NodeId> {
        if self.n1 == id {
            Some(self.n2)
        } else if self.n2 == id {
            Some(self.n1)
        } else {
            None
        }
    }

    #[must_use]
    pub fn coord(&self, id: NodeId) -> Option<Coord> {
        if self.n1 == id {
            Some(self.coords[0])
        } else if self.n2 == id {
            Some(self.coords[1])
        } else {
            None
        }
    }

    /// Updates the coordinate on the end attached to `id`. Returns false when
    /// the link does not touch `id`.
    pub fn set_coord(&mut self, id: NodeId, coord: Coord) -> bool {
        let mut touched = false;
        if self.n1 == id {
            self.coords[0] = coord;
            touched = true;
        }
        if self.n2 == id {
            self.coords[1] = coord;
            touched = true;
        }
        touched
    }

    /// World position of the attachment point on `node`.
    #[must_use]
    pub fn position(&self, node: &Node) -> Option<Point3> {
        self.coord(node.id).map(|coord| node.get(coord).0)
    }
}

#[cfg(test)]
mod tests {
    use super::{Coord, Link, NodeId};

    #[test]
    fn link_resolves_both_ends() {
        let mut link = Link::new(
            NodeId::new(1),
            Coord::on_curve(0.0),
            NodeId::new(2),
            Coord::new(0.5, 0.5),
        );
        assert!(link.has_node(NodeId::new(2)));
        assert_eq!(link.other_node(NodeId::new(1)), Some(NodeId::new(2)));
        assert_eq!(link.other_node(NodeId::new(7)), None);
        assert_eq!(link.coord(NodeId::new(2)), Some(Coord::new(0.5, 0.5)));

        assert!(link.set_coord(NodeId::new(1), Coord::on_curve(1.0)));
        assert!(!link.set_coord(NodeId::new(9), Coord::default()));
        assert_eq!(link.coord(NodeId::new(1)), Some(Coord::on_curve(1.0)));
    }
}
