//! Blending two resampled nodes into one mesh.

use super::error::{SynthError, SynthResult};
use super::grid::{Grid, Sample};
use super::raycast::{RayCaster, SpatialIndex};
use super::resample::{CurveResampling, ResampleOptions, Resampling, SheetResampling, resample_node};
use super::sampler::{PlaneGrid, PlaneSide};
use super::stitch::{
    MeshBuilder, add_cylinder_faces, add_end_faces, add_plane_faces, add_sheet_rim, bridge_rings,
    reversed_columns,
};
use crate::geom::{OutputMesh, Tolerance};
use crate::structure::Node;

/// A node together with the index of the surface it is resampled against.
#[derive(Debug, Clone, Copy)]
pub struct BlendSource<'a> {
    pub node: &'a Node,
    pub index: &'a SpatialIndex,
}

impl<'a> BlendSource<'a> {
    #[must_use]
    pub fn new(node: &'a Node, index: &'a SpatialIndex) -> Self {
        Self { node, index }
    }
}

/// Resamples both sources with the same options and blends them at `t`.
///
/// Kinds are compared before any ray is cast.
pub fn blend(
    a: BlendSource<'_>,
    b: BlendSource<'_>,
    t: f64,
    options: &ResampleOptions,
) -> SynthResult<OutputMesh> {
    check_fraction(t)?;
    if std::mem::discriminant(&a.node.kind) != std::mem::discriminant(&b.node.kind) {
        return Err(SynthError::IncompatiblePrimitiveKinds {
            a: a.node.kind_name(),
            b: b.node.kind_name(),
        });
    }

    let resampled_a = resample_node(a.node, &RayCaster::new(a.index), options)?;
    let resampled_b = resample_node(b.node, &RayCaster::new(b.index), options)?;
    log::debug!(
        "blending {} {} with {} at t = {t}",
        a.node.kind_name(),
        a.node.id,
        b.node.id
    );
    blend_resampled(&resampled_a, &resampled_b, t)
}

/// Interpolates every sample position from `a` towards `b` and stitches the
/// result.
///
/// Curves produce a closed mesh: the cylinder, both caps and the bands
/// joining them. Sheets produce a closed mesh too: both sides and the rim of
/// edge strips and corner lunes that runs between them.
pub fn blend_resampled(a: &Resampling, b: &Resampling, t: f64) -> SynthResult<OutputMesh> {
    check_fraction(t)?;
    let mesh = match (a, b) {
        (Resampling::Curve(a), Resampling::Curve(b)) => blend_curves(a, b, t)?,
        (Resampling::Sheet(a), Resampling::Sheet(b)) => blend_sheets(a, b, t)?,
        _ => {
            return Err(SynthError::IncompatiblePrimitiveKinds {
                a: kind_name(a),
                b: kind_name(b),
            });
        }
    };

    let diagnostics = mesh.diagnostics(Tolerance::default_geom());
    log::debug!("blend mesh: {diagnostics}");
    Ok(mesh)
}

fn blend_curves(a: &CurveResampling, b: &CurveResampling, t: f64) -> SynthResult<OutputMesh> {
    let cylinder = lerp_grid("cylinder", &a.cylinder, &b.cylinder, t)?;
    let start_cap = lerp_grid("start cap", &a.start_cap, &b.start_cap, t)?;
    let end_cap = lerp_grid("end cap", &a.end_cap, &b.end_cap, t)?;

    let mut builder = MeshBuilder::new();
    let wall = add_cylinder_faces(&cylinder, &mut builder, true)?;
    let start = add_end_faces(&start_cap, &mut builder)?;
    let end = add_end_faces(&end_cap, &mut builder)?;

    // The start cap turns the other way round the skeleton.
    let start_columns = reversed_columns(wall.cols);
    bridge_rings(&mut builder, start, start.rows - 1, wall, 0, Some(start_columns.as_slice()))?;
    bridge_rings(&mut builder, wall, wall.rows - 1, end, end.rows - 1, None)?;
    Ok(builder.finish())
}

fn blend_sheets(a: &SheetResampling, b: &SheetResampling, t: f64) -> SynthResult<OutputMesh> {
    check_count("plane", a.planes.len(), b.planes.len())?;
    check_count("edge", a.edges.len(), b.edges.len())?;
    check_count("corner", a.corners.len(), b.corners.len())?;

    let mut builder = MeshBuilder::new();
    let (mut front, mut back) = (None, None);
    for (pa, pb) in a.planes.iter().zip(&b.planes) {
        let plane = PlaneGrid {
            side: pa.side,
            grid: lerp_grid("plane", &pa.grid, &pb.grid, t)?,
        };
        let vertices = add_plane_faces(&plane, &mut builder)?;
        match plane.side {
            PlaneSide::Front => front = Some(vertices),
            PlaneSide::Back => back = Some(vertices),
        }
    }
    let (Some(front), Some(back)) = (front, back) else {
        return Err(SynthError::DegenerateGrid(
            "sheet resampling needs a front and a back plane".to_string(),
        ));
    };

    let edges = lerp_all("edge", &a.edges, &b.edges, t)?;
    let corners = lerp_all("corner", &a.corners, &b.corners, t)?;
    add_sheet_rim(&mut builder, front, back, &edges, &corners)?;
    Ok(builder.finish())
}

fn lerp_all(
    name: &'static str,
    a: &[Grid<Sample>],
    b: &[Grid<Sample>],
    t: f64,
) -> SynthResult<Vec<Grid<Sample>>> {
    a.iter().zip(b).map(|(ga, gb)| lerp_grid(name, ga, gb, t)).collect()
}

fn lerp_grid(
    name: &'static str,
    a: &Grid<Sample>,
    b: &Grid<Sample>,
    t: f64,
) -> SynthResult<Grid<Sample>> {
    a.zip_map(b, |sa, sb| sa.lerp(sb, t))
        .ok_or(SynthError::ResolutionMismatch {
            grid: name,
            a_rows: a.rows(),
            a_cols: a.cols(),
            b_rows: b.rows(),
            b_cols: b.cols(),
        })
}

fn check_count(name: &'static str, a: usize, b: usize) -> SynthResult<()> {
    if a == b {
        Ok(())
    } else {
        Err(SynthError::ResolutionMismatch {
            grid: name,
            a_rows: a,
            a_cols: 1,
            b_rows: b,
            b_cols: 1,
        })
    }
}

fn check_fraction(t: f64) -> SynthResult<()> {
    if (0.0..=1.0).contains(&t) {
        Ok(())
    } else {
        Err(SynthError::InvalidBlendFraction(t))
    }
}

fn kind_name(resampling: &Resampling) -> &'static str {
    match resampling {
        Resampling::Curve(_) => "curve",
        Resampling::Sheet(_) => "sheet",
    }
}
