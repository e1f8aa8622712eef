//! Ray queries against the triangulated surface being resampled.

use super::error::{SynthError, SynthResult};
use crate::geom::{BBox, Bvh, OutputMesh, Point3, Tolerance, Vec3};

/// Triangle soup a part is resampled against. Validated once at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceSurface {
    positions: Vec<Point3>,
    triangles: Vec<[u32; 3]>,
}

impl ReferenceSurface {
    pub fn new(positions: Vec<[f64; 3]>, indices: Vec<u32>) -> SynthResult<Self> {
        if positions.is_empty() || indices.is_empty() {
            return Err(SynthError::IndexUnavailable(
                "reference surface is empty".to_string(),
            ));
        }
        if indices.len() % 3 != 0 {
            return Err(SynthError::IndexUnavailable(format!(
                "index count {} is not a multiple of 3",
                indices.len()
            )));
        }

        let positions: Vec<Point3> = positions.into_iter().map(Point3::from).collect();
        if positions.iter().any(|p| !p.is_finite()) {
            return Err(SynthError::IndexUnavailable(
                "reference surface has non-finite vertices".to_string(),
            ));
        }
        let vertex_count = positions.len();
        if let Some(bad) = indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(SynthError::IndexUnavailable(format!(
                "index {bad} is out of range for {vertex_count} vertices"
            )));
        }

        let triangles = indices
            .chunks_exact(3)
            .map(|tri| [tri[0], tri[1], tri[2]])
            .collect();
        Ok(Self {
            positions,
            triangles,
        })
    }

    pub fn from_mesh(mesh: OutputMesh) -> SynthResult<Self> {
        Self::new(mesh.positions, mesh.indices)
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    fn triangle(&self, face: usize) -> [Point3; 3] {
        let [a, b, c] = self.triangles[face];
        [
            self.positions[a as usize],
            self.positions[b as usize],
            self.positions[c as usize],
        ]
    }

    fn triangle_bbox(&self, face: usize) -> BBox {
        let [a, b, c] = self.triangle(face);
        BBox::new(a, a).expand_point(b).expand_point(c)
    }
}

/// Intersection of a ray with the reference surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    pub point: Point3,
    /// Index of the hit triangle.
    pub face: usize,
    /// Euclidean distance from the ray origin.
    pub distance: f64,
}

/// BVH over a [`ReferenceSurface`], built once and queried many times.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    surface: ReferenceSurface,
    bvh: Bvh,
    tol: Tolerance,
}

impl SpatialIndex {
    pub fn build(surface: ReferenceSurface) -> SynthResult<Self> {
        Self::build_with_tolerance(surface, Tolerance::default_geom())
    }

    pub fn build_with_tolerance(surface: ReferenceSurface, tol: Tolerance) -> SynthResult<Self> {
        let bboxes: Vec<BBox> = (0..surface.triangle_count())
            .map(|face| surface.triangle_bbox(face))
            .collect();
        let bvh = Bvh::build(&bboxes).ok_or_else(|| {
            SynthError::IndexUnavailable("reference surface has no triangles".to_string())
        })?;

        log::debug!(
            "spatial index: {} triangles, {} vertices",
            bvh.primitive_count(),
            surface.vertex_count()
        );
        Ok(Self { surface, bvh, tol })
    }

    #[must_use]
    pub fn surface(&self) -> &ReferenceSurface {
        &self.surface
    }

    #[must_use]
    pub fn bounds(&self) -> Option<BBox> {
        self.bvh.bounds()
    }

    #[must_use]
    pub fn tolerance(&self) -> Tolerance {
        self.tol
    }

    /// Closest intersection along the ray with parameter `t >= -eps`.
    ///
    /// `direction` need not be normalized. Equidistant hits resolve to the
    /// lowest face index.
    #[must_use]
    pub fn nearest_hit(&self, origin: Point3, direction: Vec3) -> Option<SurfaceHit> {
        if !origin.is_finite() || !direction.is_finite() {
            return None;
        }
        let dir_length = direction.length();
        if dir_length <= Tolerance::ZERO_LENGTH.eps {
            return None;
        }

        let eps = self.tol.eps;
        let (face, t) = self.bvh.closest_ray_hit(origin, direction, -eps, |face| {
            let [a, b, c] = self.surface.triangle(face);
            ray_triangle(origin, direction, a, b, c, eps)
        })?;

        Some(SurfaceHit {
            point: origin.add_vec(direction.mul_scalar(t)),
            face,
            distance: t * dir_length,
        })
    }
}

/// Möller–Trumbore ray/triangle test. Returns the ray parameter of the hit.
///
/// Barycentric bounds are widened by `eps` so rays through shared edges hit
/// at least one of the adjacent triangles.
fn ray_triangle(origin: Point3, dir: Vec3, a: Point3, b: Point3, c: Point3, eps: f64) -> Option<f64> {
    let edge1 = b.sub_point(a);
    let edge2 = c.sub_point(a);
    let p = dir.cross(edge2);
    let det = edge1.dot(p);

    let scale = edge1.length() * edge2.length() * dir.length();
    if !det.is_finite() || det.abs() <= eps * scale.max(f64::MIN_POSITIVE) {
        return None;
    }

    let inv_det = 1.0 / det;
    let s = origin.sub_point(a);
    let u = s.dot(p) * inv_det;
    if u < -eps || u > 1.0 + eps {
        return None;
    }

    let q = s.cross(edge1);
    let v = dir.dot(q) * inv_det;
    if v < -eps || u + v > 1.0 + eps {
        return None;
    }

    let t = edge2.dot(q) * inv_det;
    t.is_finite().then_some(t)
}

/// Result of a single cast. A miss is an expected outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RayCast {
    Hit(SurfaceHit),
    Miss,
}

impl RayCast {
    #[must_use]
    pub fn hit(self) -> Option<SurfaceHit> {
        match self {
            Self::Hit(hit) => Some(hit),
            Self::Miss => None,
        }
    }

    #[must_use]
    pub fn is_miss(self) -> bool {
        matches!(self, Self::Miss)
    }
}

/// Casts rays against one [`SpatialIndex`].
#[derive(Debug, Clone, Copy)]
pub struct RayCaster<'a> {
    index: &'a SpatialIndex,
}

impl<'a> RayCaster<'a> {
    #[must_use]
    pub fn new(index: &'a SpatialIndex) -> Self {
        Self { index }
    }

    #[must_use]
    pub fn index(&self) -> &'a SpatialIndex {
        self.index
    }

    /// Zero-length or non-finite directions always miss.
    #[must_use]
    pub fn cast(&self, origin: Point3, direction: Vec3) -> RayCast {
        self.index
            .nearest_hit(origin, direction)
            .map_or(RayCast::Miss, RayCast::Hit)
    }
}
