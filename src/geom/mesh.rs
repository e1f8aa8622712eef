use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::diagnostics::MeshDiagnostics;
use super::{BBox, Point3, Tolerance, Vec3};

/// Indexed triangle soup produced by stitching.
///
/// Vertex indices are assigned in emission order and never renumbered, so a
/// later stage can refer back to any vertex emitted before it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OutputMesh {
    pub positions: Vec<[f64; 3]>,
    pub indices: Vec<u32>,
}

impl OutputMesh {
    #[must_use]
    pub fn new(positions: Vec<[f64; 3]>, indices: Vec<u32>) -> Self {
        Self { positions, indices }
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn position(&self, index: usize) -> Option<Point3> {
        self.positions.get(index).copied().map(Point3::from)
    }

    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|tri| [tri[0], tri[1], tri[2]])
    }

    #[must_use]
    pub fn bbox(&self) -> Option<BBox> {
        let points: Vec<Point3> = self.positions.iter().copied().map(Point3::from).collect();
        BBox::from_points(&points)
    }

    /// Returns true if any vertex position contains NaN or Inf values.
    #[must_use]
    pub fn has_invalid_vertices(&self) -> bool {
        self.positions.iter().any(|p| !Point3::from(*p).is_finite())
    }

    #[must_use]
    pub fn has_valid_indices(&self) -> bool {
        let n = self.positions.len() as u32;
        self.indices.iter().all(|&i| i < n)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.indices.len() % 3 != 0 {
            return Err("mesh indices are not a triangle list (len % 3 != 0)".to_string());
        }
        if self.has_invalid_vertices() {
            return Err("mesh has invalid vertex coordinates (NaN/Inf)".to_string());
        }
        if !self.has_valid_indices() {
            return Err("mesh has out-of-bounds vertex indices".to_string());
        }
        Ok(())
    }

    /// Edge topology, degeneracy and orientation summary of the mesh.
    #[must_use]
    pub fn diagnostics(&self, tol: Tolerance) -> MeshDiagnostics {
        let points: Vec<Point3> = self.positions.iter().copied().map(Point3::from).collect();
        let (open_edge_count, non_manifold_edge_count) = count_edge_topology(&self.indices);
        let degenerate_triangle_count = count_degenerate_triangles(&points, &self.indices, tol);
        let unreferenced_vertex_count = count_unreferenced_vertices(points.len(), &self.indices);

        let mut diagnostics = MeshDiagnostics {
            vertex_count: points.len(),
            triangle_count: self.triangle_count(),
            open_edge_count,
            non_manifold_edge_count,
            degenerate_triangle_count,
            unreferenced_vertex_count,
            signed_volume: signed_volume(&points, &self.indices),
            warnings: Vec::new(),
        };

        if open_edge_count > 0 {
            diagnostics.add_warning("mesh has open edges");
        }
        if non_manifold_edge_count > 0 {
            diagnostics.add_warning("mesh has non-manifold edges");
        }
        if degenerate_triangle_count > 0 {
            diagnostics.add_warning(format!("{degenerate_triangle_count} degenerate triangles"));
        }
        diagnostics
    }
}

fn count_edge_topology(indices: &[u32]) -> (usize, usize) {
    let mut edge_counts: HashMap<(u32, u32), u32> = HashMap::new();

    for tri in indices.chunks_exact(3) {
        let (i0, i1, i2) = (tri[0], tri[1], tri[2]);
        if i0 == i1 || i1 == i2 || i0 == i2 {
            continue;
        }

        for (ea, eb) in [(i0, i1), (i1, i2), (i2, i0)] {
            let key = if ea <= eb { (ea, eb) } else { (eb, ea) };
            *edge_counts.entry(key).or_insert(0) += 1;
        }
    }

    edge_counts.values().fold((0, 0), |(open, non_manifold), &count| match count {
        1 => (open + 1, non_manifold),
        2 => (open, non_manifold),
        _ => (open, non_manifold + 1),
    })
}

fn count_degenerate_triangles(points: &[Point3], indices: &[u32], tol: Tolerance) -> usize {
    indices
        .chunks_exact(3)
        .filter(|tri| {
            let (Some(a), Some(b), Some(c)) = (
                points.get(tri[0] as usize),
                points.get(tri[1] as usize),
                points.get(tri[2] as usize),
            ) else {
                return true;
            };
            let area2 = b.sub_point(*a).cross(c.sub_point(*a)).length_squared();
            !area2.is_finite() || area2 <= tol.eps_squared() * tol.eps_squared()
        })
        .count()
}

fn count_unreferenced_vertices(vertex_count: usize, indices: &[u32]) -> usize {
    let mut used = vec![false; vertex_count];
    for &i in indices {
        if let Some(slot) = used.get_mut(i as usize) {
            *slot = true;
        }
    }
    used.iter().filter(|u| !**u).count()
}

/// Divergence-theorem volume; positive for closed, outward-wound meshes.
fn signed_volume(points: &[Point3], indices: &[u32]) -> f64 {
    let volume: f64 = indices
        .chunks_exact(3)
        .filter_map(|tri| {
            let a: Vec3 = points.get(tri[0] as usize)?.to_vec3();
            let b: Vec3 = points.get(tri[1] as usize)?.to_vec3();
            let c: Vec3 = points.get(tri[2] as usize)?.to_vec3();
            Some(a.dot(b.cross(c)))
        })
        .sum();
    volume / 6.0
}
