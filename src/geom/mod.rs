mod bvh;
mod core;
mod curve;
mod diagnostics;
mod mesh;
mod surface;

pub(crate) use bvh::Bvh;
pub use core::{
    BBox, Point3, Tolerance, Vec3, orthogonal_unit_vector, rotate_vector, transport_direction,
};
pub use curve::{Curve3, NurbsCurve3, Polyline3, clamped_uniform_knots};
pub use diagnostics::MeshDiagnostics;
pub use mesh::OutputMesh;
pub use surface::{IsoCurve, IsoDirection, NurbsSurface, Surface};
