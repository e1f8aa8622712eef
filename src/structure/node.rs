//! Curve and sheet nodes of a structure graph.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geom::{
    BBox, Curve3, NurbsCurve3, NurbsSurface, Point3, Polyline3, Surface, Vec3,
    orthogonal_unit_vector,
};

/// Grid resolution used when a sheet projection is approximated.
const SHEET_PROJECTION_SAMPLES: usize = 32;

/// Identifier of a node within a [`Graph`](super::Graph).
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Ord, PartialOrd, Serialize, Deserialize,
)]
pub struct NodeId(pub usize);

impl NodeId {
    #[must_use]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Parameter coordinate on a node. Curves only read `u`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coord {
    pub u: f64,
    #[serde(default)]
    pub v: f64,
}

impl Coord {
    #[must_use]
    pub const fn new(u: f64, v: f64) -> Self {
        Self { u, v }
    }

    #[must_use]
    pub const fn on_curve(u: f64) -> Self {
        Self { u, v: 0.0 }
    }
}

/// Local orthonormal frame returned by [`Node::get`].
///
/// For curves `tangent` follows the skeleton and the other two axes are an
/// arbitrary perpendicular pair. For sheets `tangent` and `bitangent` are the
/// normalized `∂u` and `∂v` directions and `normal` is `∂u × ∂v`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub tangent: Vec3,
    pub bitangent: Vec3,
    pub normal: Vec3,
}

impl Frame {
    fn from_tangent(tangent: Vec3) -> Self {
        let normal = orthogonal_unit_vector(tangent);
        Self {
            tangent,
            bitangent: tangent.cross(normal),
            normal,
        }
    }

    const fn degenerate() -> Self {
        Self {
            tangent: Vec3::ZERO,
            bitangent: Vec3::ZERO,
            normal: Vec3::ZERO,
        }
    }
}

/// Skeleton of a curve node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CurvePath {
    Nurbs(NurbsCurve3),
    Polyline(Polyline3),
}

impl Curve3 for CurvePath {
    fn point_at(&self, t: f64) -> Point3 {
        match self {
            Self::Nurbs(curve) => curve.point_at(t),
            Self::Polyline(polyline) => polyline.point_at(t),
        }
    }

    fn domain(&self) -> (f64, f64) {
        match self {
            Self::Nurbs(curve) => curve.domain(),
            Self::Polyline(polyline) => polyline.domain(),
        }
    }
}

impl CurvePath {
    #[must_use]
    pub fn control_points(&self) -> &[Point3] {
        match self {
            Self::Nurbs(curve) => curve.control_points(),
            Self::Polyline(polyline) => polyline.points(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveNode {
    pub path: CurvePath,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetNode {
    pub surface: NurbsSurface,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    Curve(CurveNode),
    Sheet(SheetNode),
}

impl NodeKind {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Curve(_) => "curve",
            Self::Sheet(_) => "sheet",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
}

impl Node {
    #[must_use]
    pub const fn new(id: NodeId, kind: NodeKind) -> Self {
        Self { id, kind }
    }

    #[must_use]
    pub fn curve(id: usize, path: CurvePath) -> Self {
        Self::new(NodeId::new(id), NodeKind::Curve(CurveNode { path }))
    }

    #[must_use]
    pub fn sheet(id: usize, surface: NurbsSurface) -> Self {
        Self::new(NodeId::new(id), NodeKind::Sheet(SheetNode { surface }))
    }

    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        self.kind.name()
    }

    #[must_use]
    pub fn control_points(&self) -> &[Point3] {
        match &self.kind {
            NodeKind::Curve(curve) => curve.path.control_points(),
            NodeKind::Sheet(sheet) => sheet.surface.control_points(),
        }
    }

    /// Control point counts per parametric direction.
    #[must_use]
    pub fn control_count(&self) -> Vec<usize> {
        match &self.kind {
            NodeKind::Curve(curve) => vec![curve.path.control_points().len()],
            NodeKind::Sheet(sheet) => {
                let (u_count, v_count) = sheet.surface.control_counts();
                vec![u_count, v_count]
            }
        }
    }

    /// Control-point bounds scaled about their center.
    #[must_use]
    pub fn bbox(&self, scaling: f64) -> Option<BBox> {
        BBox::from_points(self.control_points()).map(|bbox| bbox.scaled(scaling))
    }

    /// Position and local frame at `coord`.
    #[must_use]
    pub fn get(&self, coord: Coord) -> (Point3, Frame) {
        match &self.kind {
            NodeKind::Curve(curve) => {
                let t = curve.path.parameter_at_fraction(coord.u);
                let frame = curve
                    .path
                    .tangent_at(t)
                    .map_or_else(Frame::degenerate, Frame::from_tangent);
                (curve.path.point_at(t), frame)
            }
            NodeKind::Sheet(sheet) => {
                let surface = &sheet.surface;
                let (u, v) = sheet_params(surface, coord);
                let (du, dv) = surface.partial_derivatives_at(u, v);
                let frame = Frame {
                    tangent: du.normalized().unwrap_or(Vec3::ZERO),
                    bitangent: dv.normalized().unwrap_or(Vec3::ZERO),
                    normal: du.cross(dv).normalized().unwrap_or(Vec3::ZERO),
                };
                (surface.point_at(u, v), frame)
            }
        }
    }

    /// Normalized coordinate of the densely sampled point closest to `point`.
    #[must_use]
    pub fn approx_projection(&self, point: Point3) -> Coord {
        match &self.kind {
            NodeKind::Curve(curve) => {
                let (a, b) = curve.path.domain();
                let t = curve.path.approx_projection(point);
                Coord::on_curve(if b > a { (t - a) / (b - a) } else { 0.0 })
            }
            NodeKind::Sheet(sheet) => {
                let n = SHEET_PROJECTION_SAMPLES;
                let mut best = Coord::default();
                let mut best_d = f64::INFINITY;
                for i in 0..=n {
                    for j in 0..=n {
                        let coord = Coord::new(i as f64 / n as f64, j as f64 / n as f64);
                        let (u, v) = sheet_params(&sheet.surface, coord);
                        let d = sheet.surface.point_at(u, v).distance_to(point);
                        if d < best_d {
                            best_d = d;
                            best = coord;
                        }
                    }
                }
                best
            }
        }
    }
}

/// Maps a normalized coordinate onto the surface domain.
fn sheet_params(surface: &NurbsSurface, coord: Coord) -> (f64, f64) {
    let (u0, u1) = surface.domain_u();
    let (v0, v1) = surface.domain_v();
    (
        u0 + (u1 - u0) * coord.u.clamp(0.0, 1.0),
        v0 + (v1 - v0) * coord.v.clamp(0.0, 1.0),
    )
}
