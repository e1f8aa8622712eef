use crate::geom::{BBox, NurbsCurve3, NurbsSurface, Point3};
use crate::structure::{CurvePath, Node};
use crate::synth::{ReferenceSurface, SpatialIndex};

/// Closed, outward-wound box mesh (12 triangles). Vertex `i` sits at
/// `(x, y, z)` with bits `x + 2y + 4z` picking `min` or `max`.
pub(super) fn box_surface(min: Point3, max: Point3) -> ReferenceSurface {
    let positions = (0..8)
        .map(|i| {
            [
                if i & 1 == 0 { min.x } else { max.x },
                if i & 2 == 0 { min.y } else { max.y },
                if i & 4 == 0 { min.z } else { max.z },
            ]
        })
        .collect();
    let indices = vec![
        0, 2, 3, 0, 3, 1, // -z
        4, 5, 7, 4, 7, 6, // +z
        0, 1, 5, 0, 5, 4, // -y
        2, 6, 7, 2, 7, 3, // +y
        0, 4, 6, 0, 6, 2, // -x
        1, 3, 7, 1, 7, 5, // +x
    ];
    ReferenceSurface::new(positions, indices).expect("box surface")
}

pub(super) fn box_index(min: Point3, max: Point3) -> SpatialIndex {
    SpatialIndex::build(box_surface(min, max)).expect("box index")
}

/// Large square in the plane `x = 2`.
pub(super) fn wall_index() -> SpatialIndex {
    let surface = ReferenceSurface::new(
        vec![
            [2.0, -10.0, -10.0],
            [2.0, 10.0, -10.0],
            [2.0, 10.0, 10.0],
            [2.0, -10.0, 10.0],
        ],
        vec![0, 1, 2, 0, 2, 3],
    )
    .expect("wall");
    SpatialIndex::build(surface).expect("wall index")
}

/// Straight curve node from `(0, 0, 0)` to `(0, 0, length)`.
pub(super) fn z_curve(id: usize, length: f64) -> Node {
    let curve = NurbsCurve3::clamped(
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, length * 0.5),
            Point3::new(0.0, 0.0, length),
        ],
        2,
    )
    .expect("curve");
    Node::curve(id, CurvePath::Nurbs(curve))
}

/// Cubic S-bend in the `xz` plane from `(0, 0, 0)` to `(0, 0, 3)` with an
/// inflection at mid height.
pub(super) fn s_curve(id: usize) -> Node {
    let curve = NurbsCurve3::clamped(
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.5, 0.0, 1.0),
            Point3::new(-0.5, 0.0, 2.0),
            Point3::new(0.0, 0.0, 3.0),
        ],
        3,
    )
    .expect("curve");
    Node::curve(id, CurvePath::Nurbs(curve))
}

/// Flat sheet over `[0, size]²` in the plane `z = 0`, normal `+z`.
pub(super) fn flat_sheet(id: usize, size: f64) -> Node {
    let surface = NurbsSurface::bilinear(
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(size, 0.0, 0.0),
        Point3::new(0.0, size, 0.0),
        Point3::new(size, size, 0.0),
    )
    .expect("sheet");
    Node::sheet(id, surface)
}

pub(super) fn curve_box() -> (Point3, Point3) {
    (Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 3.0))
}

pub(super) fn s_curve_box() -> (Point3, Point3) {
    (Point3::new(-2.0, -2.0, -1.5), Point3::new(2.0, 2.0, 4.5))
}

pub(super) fn sheet_slab() -> (Point3, Point3) {
    (Point3::new(-1.0, -1.0, -0.5), Point3::new(3.0, 3.0, 0.5))
}

pub(super) fn loose_bbox((min, max): (Point3, Point3)) -> BBox {
    BBox::new(min, max).expand_by(1e-9)
}
