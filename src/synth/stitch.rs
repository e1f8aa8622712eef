//! Turns resampled grids into mesh faces.
//!
//! Vertices are emitted in row-major grid order and keep their index for the
//! lifetime of the builder. Every emitter returns a [`GridVertices`] handle so
//! later stages (cap bridges) can address vertices emitted earlier.
//!
//! Winding conventions, for outward-facing triangles:
//!
//! - cylinder and sheet rim: rings advance along the path and rotate
//!   right-handed about it; quad `(i,j) (i,j+1) (i+1,j+1) (i+1,j)`.
//! - caps: rings move away from the pole and rotate right-handed about it;
//!   the same quad with the opposite winding.
//! - planes: front grids use the cap winding, back grids the cylinder one.

use super::error::StitchError;
use super::grid::{Grid, Sample};
use super::sampler::{PlaneGrid, PlaneSide};
use crate::geom::{OutputMesh, Point3};

/// Incrementally built [`OutputMesh`].
#[derive(Debug, Clone, Default)]
pub struct MeshBuilder {
    mesh: OutputMesh,
}

impl MeshBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn vertex_count(&self) -> u32 {
        self.mesh.positions.len() as u32
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.mesh.triangle_count()
    }

    /// Appends a vertex and returns its index.
    pub fn add_vertex(&mut self, position: Point3) -> u32 {
        let index = self.vertex_count();
        self.mesh.positions.push(position.to_array());
        index
    }

    /// Appends a triangle. Every index must refer to an emitted vertex.
    pub fn add_triangle(&mut self, tri: [u32; 3]) -> Result<(), StitchError> {
        let emitted = self.vertex_count();
        if let Some(&index) = tri.iter().find(|&&i| i >= emitted) {
            return Err(StitchError::ForwardReference { index, emitted });
        }
        self.mesh.indices.extend_from_slice(&tri);
        Ok(())
    }

    /// Quad `a b c d` as triangles `(a, b, c)` and `(a, c, d)`, or with the
    /// opposite winding when `flip` is set.
    fn add_quad(&mut self, [a, b, c, d]: [u32; 4], flip: bool) -> Result<(), StitchError> {
        if flip {
            self.add_triangle([a, c, b])?;
            self.add_triangle([a, d, c])
        } else {
            self.add_triangle([a, b, c])?;
            self.add_triangle([a, c, d])
        }
    }

    #[must_use]
    pub fn finish(self) -> OutputMesh {
        self.mesh
    }
}

/// Where a grid's vertices live in the mesh.
///
/// With `pole` set, row 0 collapsed into the single vertex at `base` and row
/// `r >= 1` starts at `base + 1 + (r - 1) * cols`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridVertices {
    pub base: u32,
    pub rows: usize,
    pub cols: usize,
    pub pole: bool,
}

impl GridVertices {
    #[must_use]
    pub fn index(&self, row: usize, col: usize) -> Option<u32> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        let offset = match (self.pole, row) {
            (true, 0) => 0,
            (true, r) => 1 + (r - 1) * self.cols + col,
            (false, r) => r * self.cols + col,
        };
        Some(self.base + offset as u32)
    }

    /// Number of vertices the grid occupies.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        if self.pole {
            1 + (self.rows - 1) * self.cols
        } else {
            self.rows * self.cols
        }
    }

    fn ring(&self, row: usize) -> Result<Vec<u32>, StitchError> {
        (0..self.cols)
            .map(|col| {
                self.index(row, col).ok_or(StitchError::RingOutOfRange {
                    row,
                    rows: self.rows,
                })
            })
            .collect()
    }
}

fn check_size(grid: &Grid<Sample>) -> Result<(), StitchError> {
    if grid.rows() < 2 || grid.cols() < 2 {
        return Err(StitchError::GridTooSmall {
            rows: grid.rows(),
            cols: grid.cols(),
        });
    }
    Ok(())
}

fn emit_rows(grid: &Grid<Sample>, builder: &mut MeshBuilder, from_row: usize) {
    for row in grid.iter_rows().skip(from_row) {
        for sample in row {
            builder.add_vertex(sample.position);
        }
    }
}

/// Quads between every pair of consecutive rows of `vertices`, starting at
/// `first_row`.
fn add_row_quads(
    vertices: GridVertices,
    builder: &mut MeshBuilder,
    first_row: usize,
    wrap: bool,
    flip: bool,
) -> Result<(), StitchError> {
    let cols = vertices.cols;
    let spans = if wrap { cols } else { cols - 1 };
    for i in first_row..vertices.rows.saturating_sub(1) {
        let lower = vertices.ring(i)?;
        let upper = vertices.ring(i + 1)?;
        for j in 0..spans {
            let k = (j + 1) % cols;
            builder.add_quad([lower[j], lower[k], upper[k], upper[j]], flip)?;
        }
    }
    Ok(())
}

/// Cylinder wall, `Grid[time][angle]`. `closed` wraps the last column onto
/// the first.
pub fn add_cylinder_faces(
    grid: &Grid<Sample>,
    builder: &mut MeshBuilder,
    closed: bool,
) -> Result<GridVertices, StitchError> {
    check_size(grid)?;
    let vertices = GridVertices {
        base: builder.vertex_count(),
        rows: grid.rows(),
        cols: grid.cols(),
        pole: false,
    };
    emit_rows(grid, builder, 0);
    add_row_quads(vertices, builder, 0, closed, false)?;
    Ok(vertices)
}

/// Sphere cap, `Grid[phi][theta]` with row 0 at the pole. The azimuth wraps.
pub fn add_end_faces(
    grid: &Grid<Sample>,
    builder: &mut MeshBuilder,
) -> Result<GridVertices, StitchError> {
    check_size(grid)?;
    let pole_sample = grid.get(0, 0).ok_or(StitchError::GridTooSmall {
        rows: grid.rows(),
        cols: grid.cols(),
    })?;

    let vertices = GridVertices {
        base: builder.vertex_count(),
        rows: grid.rows(),
        cols: grid.cols(),
        pole: true,
    };
    let pole = builder.add_vertex(pole_sample.position);
    emit_rows(grid, builder, 1);

    let cols = vertices.cols;
    let first = vertices.ring(1)?;
    for j in 0..cols {
        builder.add_triangle([pole, first[j], first[(j + 1) % cols]])?;
    }
    add_row_quads(vertices, builder, 1, true, true)?;
    Ok(vertices)
}

/// Planar grid of one sheet side. Neither direction wraps.
pub fn add_plane_faces(
    plane: &PlaneGrid,
    builder: &mut MeshBuilder,
) -> Result<GridVertices, StitchError> {
    check_size(&plane.grid)?;
    let vertices = GridVertices {
        base: builder.vertex_count(),
        rows: plane.grid.rows(),
        cols: plane.grid.cols(),
        pole: false,
    };
    emit_rows(&plane.grid, builder, 0);
    add_row_quads(vertices, builder, 0, false, plane.side == PlaneSide::Front)?;
    Ok(vertices)
}

/// Boundary of a plane grid (rows along `u`, columns along `v`) as four runs,
/// counter-clockwise in parameter space: bottom (`v` min), right (`u` max),
/// top (`v` max) and left (`u` min). Run `k` ends on the vertex run `k + 1`
/// starts with.
pub fn plane_boundary(vertices: GridVertices) -> Result<[Vec<u32>; 4], StitchError> {
    let (rows, cols) = (vertices.rows, vertices.cols);
    if vertices.pole || rows < 2 || cols < 2 {
        return Err(StitchError::GridTooSmall { rows, cols });
    }
    let run = |cells: Vec<(usize, usize)>| -> Result<Vec<u32>, StitchError> {
        cells
            .into_iter()
            .map(|(row, col)| {
                vertices
                    .index(row, col)
                    .ok_or(StitchError::RingOutOfRange { row, rows })
            })
            .collect()
    };
    Ok([
        run((0..rows).map(|i| (i, 0)).collect())?,
        run((0..cols).map(|j| (rows - 1, j)).collect())?,
        run((0..rows).rev().map(|i| (i, cols - 1)).collect())?,
        run((0..cols).rev().map(|j| (0, j)).collect())?,
    ])
}

/// Closed band through a loop of stations, each listing one vertex per step
/// across the band. Consecutive stations, the last wrapping onto the first,
/// are joined with the cylinder winding. Triangles that collapse because two
/// neighbouring stations share a vertex are left out.
pub fn add_band_faces(builder: &mut MeshBuilder, stations: &[Vec<u32>]) -> Result<(), StitchError> {
    let cols = stations.first().map_or(0, Vec::len);
    if stations.len() < 3 || cols < 2 {
        return Err(StitchError::GridTooSmall {
            rows: stations.len(),
            cols,
        });
    }
    if let Some(station) = stations.iter().find(|station| station.len() != cols) {
        return Err(StitchError::ColumnMapMismatch {
            got: station.len(),
            expected: cols,
        });
    }

    for (s, lower) in stations.iter().enumerate() {
        let upper = &stations[(s + 1) % stations.len()];
        for j in 0..cols - 1 {
            let [a, b, c, d] = [lower[j], lower[j + 1], upper[j + 1], upper[j]];
            for tri in [[a, b, c], [a, c, d]] {
                if tri[0] != tri[1] && tri[1] != tri[2] && tri[2] != tri[0] {
                    builder.add_triangle(tri)?;
                }
            }
        }
    }
    Ok(())
}

/// Rim of a sheet between its `front` and `back` planes, closed into one
/// band.
///
/// `edges[k]` holds the strip along boundary run `k` of [`plane_boundary`],
/// `Grid[time][angle]`, and `corners[k]` the lune where run `k` ends,
/// `Grid[azimuth][polar]`. Both carry interior angles only: the front plane
/// supplies angle zero and the back plane the half turn.
pub fn add_sheet_rim(
    builder: &mut MeshBuilder,
    front: GridVertices,
    back: GridVertices,
    edges: &[Grid<Sample>],
    corners: &[Grid<Sample>],
) -> Result<(), StitchError> {
    if edges.len() != 4 || corners.len() != 4 {
        return Err(StitchError::RimMismatch {
            edges: edges.len(),
            corners: corners.len(),
        });
    }
    let front_runs = plane_boundary(front)?;
    let back_runs = plane_boundary(back)?;

    let mut stations: Vec<Vec<u32>> = Vec::new();
    for (k, (strip, lune)) in edges.iter().zip(corners).enumerate() {
        let (front_run, back_run) = (&front_runs[k], &back_runs[k]);
        if strip.rows() != front_run.len() || back_run.len() != front_run.len() {
            return Err(StitchError::RunLength {
                run: k,
                got: strip.rows(),
                expected: front_run.len(),
            });
        }

        let strip_vertices = emit_interior(strip, builder);
        for (t, (&f, &b)) in front_run.iter().zip(back_run).enumerate() {
            stations.push(station(f, strip_vertices.ring(t)?, b));
        }

        let (Some(&f), Some(&b)) = (front_run.last(), back_run.last()) else {
            continue;
        };
        let lune_vertices = emit_interior(lune, builder);
        for j in 0..lune_vertices.rows {
            stations.push(station(f, lune_vertices.ring(j)?, b));
        }
    }
    add_band_faces(builder, &stations)
}

fn emit_interior(grid: &Grid<Sample>, builder: &mut MeshBuilder) -> GridVertices {
    let vertices = GridVertices {
        base: builder.vertex_count(),
        rows: grid.rows(),
        cols: grid.cols(),
        pole: false,
    };
    emit_rows(grid, builder, 0);
    vertices
}

fn station(front: u32, interior: Vec<u32>, back: u32) -> Vec<u32> {
    let mut station = Vec::with_capacity(interior.len() + 2);
    station.push(front);
    station.extend(interior);
    station.push(back);
    station
}

/// Joins ring `row_a` of `a` to ring `row_b` of `b` with a wrapped band of
/// quads, wound like a cylinder running from `a` to `b`.
///
/// Column `j` of ring `b` pairs with column `column_map[j]` of ring `a`;
/// `None` pairs equal columns.
pub fn bridge_rings(
    builder: &mut MeshBuilder,
    a: GridVertices,
    row_a: usize,
    b: GridVertices,
    row_b: usize,
    column_map: Option<&[usize]>,
) -> Result<(), StitchError> {
    if a.cols != b.cols {
        return Err(StitchError::ColumnMapMismatch {
            got: a.cols,
            expected: b.cols,
        });
    }
    let ring_a = a.ring(row_a)?;
    let ring_b = b.ring(row_b)?;
    let cols = b.cols;

    let mapped: Vec<u32> = match column_map {
        None => ring_a,
        Some(map) => {
            if map.len() != cols {
                return Err(StitchError::ColumnMapMismatch {
                    got: map.len(),
                    expected: cols,
                });
            }
            map.iter()
                .map(|&col| {
                    ring_a
                        .get(col)
                        .copied()
                        .ok_or(StitchError::ColumnOutOfRange { col, cols })
                })
                .collect::<Result<_, _>>()?
        }
    };

    for j in 0..cols {
        let k = (j + 1) % cols;
        builder.add_quad([mapped[j], mapped[k], ring_b[k], ring_b[j]], false)?;
    }
    Ok(())
}

/// Column map pairing a ring swept the opposite way round: column `j` meets
/// column `(cols - j) % cols`.
#[must_use]
pub fn reversed_columns(cols: usize) -> Vec<usize> {
    (0..cols).map(|j| (cols - j) % cols).collect()
}
