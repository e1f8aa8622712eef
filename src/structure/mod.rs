//! Minimal structure model: curve and sheet nodes joined by links.

mod graph;
mod link;
mod node;

pub use graph::{Graph, GraphError};
pub use link::Link;
pub use node::{Coord, CurveNode, CurvePath, Frame, Node, NodeId, NodeKind, SheetNode};

#[cfg(test)]
mod tests;
