//! Mesh diagnostics for stitched output.
//!
//! Stitching never repairs a mesh, so these numbers describe exactly what the
//! grids produced:
//!
//! - Whether the surface is closed (no open edges) and manifold
//! - Degenerate faces that slipped through (e.g. coincident ray hits)
//! - Vertices that no face refers to
//! - Orientation, through the signed volume of closed meshes
//!
//! # Example
//!
//! ```ignore
//! use topoblend_engine::geom::Tolerance;
//!
//! let diagnostics = mesh.diagnostics(Tolerance::default_geom());
//! if !diagnostics.is_watertight() {
//!     log::warn!("blend left {} open edges", diagnostics.open_edge_count);
//! }
//! ```

use std::fmt;

/// Topology and quality summary of an [`OutputMesh`](super::OutputMesh).
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MeshDiagnostics {
    pub vertex_count: usize,
    pub triangle_count: usize,

    /// Edges with exactly one adjacent triangle.
    pub open_edge_count: usize,

    /// Edges with more than two adjacent triangles.
    pub non_manifold_edge_count: usize,

    /// Zero-area triangles (collinear or coincident corners).
    pub degenerate_triangle_count: usize,

    /// Emitted vertices that no triangle references.
    pub unreferenced_vertex_count: usize,

    /// Signed enclosed volume. Only meaningful when the mesh is watertight;
    /// positive means the faces point outward.
    pub signed_volume: f64,

    pub warnings: Vec<String>,
}

impl MeshDiagnostics {
    #[must_use]
    pub fn is_watertight(&self) -> bool {
        self.open_edge_count == 0
    }

    #[must_use]
    pub fn is_manifold(&self) -> bool {
        self.non_manifold_edge_count == 0
    }

    /// Watertight and manifold.
    #[must_use]
    pub fn is_valid_solid(&self) -> bool {
        self.is_watertight() && self.is_manifold()
    }

    /// Watertight, manifold and wound so that normals point out of the volume.
    #[must_use]
    pub fn is_outward_solid(&self) -> bool {
        self.is_valid_solid() && self.signed_volume > 0.0
    }

    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

impl fmt::Display for MeshDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} vertices, {} triangles, {} open edges, {} non-manifold edges, {} degenerate",
            self.vertex_count,
            self.triangle_count,
            self.open_edge_count,
            self.non_manifold_edge_count,
            self.degenerate_triangle_count
        )?;
        if !self.warnings.is_empty() {
            write!(f, " ({})", self.warnings.join("; "))?;
        }
        Ok(())
    }
}
