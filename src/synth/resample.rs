//! Resampling of whole structure nodes onto canonical grids.
//!
//! The result is a new value next to the node; nodes are never modified.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use serde::{Deserialize, Serialize};

use super::error::{SynthError, SynthResult};
use super::grid::{Grid, Sample};
use super::raycast::RayCaster;
use super::sampler::{
    GridSampling, PathFrame, PlaneGrid, SamplerOptions, SamplingStats, cylinder_resampling,
    lune_resampling, plane_resampling, sphere_resampling,
};
use crate::geom::{
    Curve3, IsoCurve, IsoDirection, NurbsSurface, Surface, Tolerance, Vec3,
    orthogonal_unit_vector, rotate_vector,
};
use crate::structure::{CurveNode, Node, NodeKind, SheetNode};

/// Resolutions and sampling settings shared by both blend inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResampleOptions {
    /// Rings along a curve skeleton.
    pub time_res: usize,
    /// Columns around a ring or cap.
    pub theta_res: usize,
    /// Rings of a cap, pole included. Also the azimuth steps across a sheet
    /// corner.
    pub phi_res: usize,
    pub u_res: usize,
    pub v_res: usize,
    pub sampler: SamplerOptions,
    pub tol: Tolerance,
}

impl Default for ResampleOptions {
    fn default() -> Self {
        Self {
            time_res: 20,
            theta_res: 24,
            phi_res: 8,
            u_res: 12,
            v_res: 12,
            sampler: SamplerOptions::default(),
            tol: Tolerance::default_geom(),
        }
    }
}

impl ResampleOptions {
    /// Defaults with the time resolution raised for elongated pairs.
    ///
    /// The longer bounding box diagonal relative to the shorter one scales the
    /// ring count, up to four times the default.
    #[must_use]
    pub fn for_nodes(a: &Node, b: &Node) -> Self {
        let defaults = Self::default();
        let diagonals = [a, b].map(|node| node.bbox(1.0).map_or(0.0, |bbox| bbox.diagonal()));
        let (short, long) = if diagonals[0] <= diagonals[1] {
            (diagonals[0], diagonals[1])
        } else {
            (diagonals[1], diagonals[0])
        };
        if short <= defaults.tol.eps || !long.is_finite() {
            return defaults;
        }

        let base = defaults.time_res as f64;
        let time_res = (base * (long / short).sqrt()).round().clamp(base, 4.0 * base);
        Self {
            time_res: time_res as usize,
            ..defaults
        }
    }
}

/// Cylinder and both end caps of a curve node.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveResampling {
    /// `time_res × theta_res`, closed around.
    pub cylinder: Grid<Sample>,
    /// `phi_res × theta_res`, pole along the reversed start tangent.
    pub start_cap: Grid<Sample>,
    /// `phi_res × theta_res`, pole along the end tangent.
    pub end_cap: Grid<Sample>,
    pub stats: SamplingStats,
}

/// Both planar sides and the rim between them: edge strips and corner lunes.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetResampling {
    /// Front then back.
    pub planes: Vec<PlaneGrid>,
    /// Bottom, right, top, left: counter-clockwise in parameter space.
    /// `time_res × (theta_res - 1)`, interior angles only.
    pub edges: Vec<Grid<Sample>>,
    /// Corner `k` sits where edge `k` ends and edge `k + 1` starts.
    /// `(phi_res - 1) × (theta_res - 1)`, interior meridians only.
    pub corners: Vec<Grid<Sample>>,
    pub stats: SamplingStats,
}

/// Either resampling, tagged by node kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Resampling {
    Curve(CurveResampling),
    Sheet(SheetResampling),
}

impl Resampling {
    #[must_use]
    pub fn stats(&self) -> SamplingStats {
        match self {
            Self::Curve(curve) => curve.stats,
            Self::Sheet(sheet) => sheet.stats,
        }
    }
}

/// Resamples any node with `options`.
pub fn resample_node(
    node: &Node,
    caster: &RayCaster<'_>,
    options: &ResampleOptions,
) -> SynthResult<Resampling> {
    match &node.kind {
        NodeKind::Curve(_) => resample_curve(
            node,
            caster,
            options.time_res,
            options.theta_res,
            options.phi_res,
            &options.sampler,
        )
        .map(Resampling::Curve),
        NodeKind::Sheet(_) => resample_sheet(
            node,
            caster,
            options.u_res,
            options.v_res,
            options.theta_res,
            options.phi_res,
            &options.sampler,
        )
        .map(Resampling::Sheet),
    }
}

/// Resamples a curve node into a closed cylinder plus two hemispherical caps.
///
/// Each cap's seam follows the adjacent ring's angle-zero direction so cap
/// column `j` lines up with ring column `j` at the end, and with column
/// `(theta_res - j) % theta_res` at the start.
pub fn resample_curve(
    node: &Node,
    caster: &RayCaster<'_>,
    time_res: usize,
    theta_res: usize,
    phi_res: usize,
    options: &SamplerOptions,
) -> SynthResult<CurveResampling> {
    let NodeKind::Curve(CurveNode { path }) = &node.kind else {
        return Err(SynthError::DegenerateGrid(format!(
            "node {} is a {}, not a curve",
            node.id,
            node.kind_name()
        )));
    };

    let start_tangent = path
        .tangent_at(path.parameter_at_fraction(0.0))
        .ok_or_else(|| SynthError::DegenerateGrid(format!("curve {} has no start tangent", node.id)))?;
    let initial_direction = orthogonal_unit_vector(start_tangent);

    let cylinder = cylinder_resampling(
        path,
        initial_direction,
        time_res,
        theta_res,
        TAU,
        caster,
        false,
        options,
    )?;

    let (first, last) = match (cylinder.frames.first(), cylinder.frames.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => {
            return Err(SynthError::DegenerateGrid(format!(
                "curve {} produced no frames",
                node.id
            )));
        }
    };
    let start_cap = cap(first, -first.tangent, theta_res, phi_res, caster, options)?;
    let end_cap = cap(last, last.tangent, theta_res, phi_res, caster, options)?;

    let mut stats = cylinder.stats;
    stats.merge(start_cap.stats);
    stats.merge(end_cap.stats);
    log::debug!(
        "resampled curve {}: {}x{} cylinder, {}x{} caps",
        node.id,
        cylinder.grid.rows(),
        cylinder.grid.cols(),
        phi_res,
        theta_res
    );

    Ok(CurveResampling {
        cylinder: cylinder.grid,
        start_cap: start_cap.grid,
        end_cap: end_cap.grid,
        stats,
    })
}

fn cap(
    frame: PathFrame,
    pole: Vec3,
    theta_res: usize,
    phi_res: usize,
    caster: &RayCaster<'_>,
    options: &SamplerOptions,
) -> SynthResult<GridSampling> {
    sphere_resampling(
        frame.origin,
        pole,
        frame.direction,
        theta_res,
        phi_res,
        TAU,
        FRAC_PI_2,
        caster,
        options,
    )
}

/// Resamples a sheet node: both planar sides, a half-turn strip along each
/// edge and a lune at each corner.
///
/// Around every boundary point the rim sweeps from the front normal to the
/// back normal in `theta_res` steps. Those two end directions are the plane
/// samples themselves, so strips and lunes only cast the interior angles.
/// Each lune opens from the outward direction of the edge ending at the
/// corner to that of the edge starting there, in `phi_res` steps.
#[allow(clippy::too_many_arguments)]
pub fn resample_sheet(
    node: &Node,
    caster: &RayCaster<'_>,
    u_res: usize,
    v_res: usize,
    theta_res: usize,
    phi_res: usize,
    options: &SamplerOptions,
) -> SynthResult<SheetResampling> {
    let NodeKind::Sheet(SheetNode { surface }) = &node.kind else {
        return Err(SynthError::DegenerateGrid(format!(
            "node {} is a {}, not a sheet",
            node.id,
            node.kind_name()
        )));
    };
    if theta_res < 3 {
        return Err(SynthError::DegenerateGrid(format!(
            "sheet rim needs at least 3 angular steps, got {theta_res}"
        )));
    }

    let planar = plane_resampling(surface, u_res, v_res, caster, options)?;
    let mut stats = planar.stats;

    let step = PI / theta_res as f64;
    let mut edges = Vec::with_capacity(4);
    let mut edge_ends: Vec<(PathFrame, PathFrame)> = Vec::with_capacity(4);
    for (edge, time_res) in sheet_edges(surface).iter().zip([u_res, v_res, u_res, v_res]) {
        let (u, v) = edge.surface_params(0.0);
        let (normal, tangent) = match (surface.normal_at(u, v), edge.tangent_at(0.0)) {
            (Some(normal), Some(tangent)) => (normal, tangent),
            _ => {
                return Err(SynthError::DegenerateGrid(format!(
                    "sheet {} has no frame at ({u}, {v})",
                    node.id
                )));
            }
        };
        let first = rotate_vector(normal, tangent, step);
        let strip = cylinder_resampling(
            edge,
            first,
            time_res,
            theta_res - 1,
            PI - step,
            caster,
            true,
            options,
        )?;
        stats.merge(strip.stats);

        let ends = match (strip.frames.first(), strip.frames.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => {
                return Err(SynthError::DegenerateGrid(format!(
                    "sheet {} edge produced no frames",
                    node.id
                )));
            }
        };
        edge_ends.push(ends);
        edges.push(strip.grid);
    }

    let mut corners = Vec::with_capacity(4);
    for k in 0..edge_ends.len() {
        let (_, end) = edge_ends[k];
        let (next, _) = edge_ends[(k + 1) % edge_ends.len()];
        let pole = rotate_vector(end.direction, end.tangent, -step);
        let seam = rotate_vector(end.direction, end.tangent, FRAC_PI_2 - step);
        let towards = rotate_vector(next.direction, next.tangent, FRAC_PI_2 - step);
        let opening = seam.cross(towards).dot(pole).atan2(seam.dot(towards));
        let lune = lune_resampling(
            end.origin, pole, seam, phi_res, opening, theta_res, caster, options,
        )
        .map_err(|err| match err {
            SynthError::DegenerateGrid(reason) => {
                SynthError::DegenerateGrid(format!("sheet {} corner {k}: {reason}", node.id))
            }
            other => other,
        })?;
        stats.merge(lune.stats);
        corners.push(lune.grid);
    }

    log::debug!(
        "resampled sheet {}: {}x{} planes, {} edges, {} corners",
        node.id,
        u_res,
        v_res,
        edges.len(),
        corners.len()
    );

    Ok(SheetResampling {
        planes: planar.planes,
        edges,
        corners,
        stats,
    })
}

/// Sheet boundary traversed counter-clockwise in parameter space.
fn sheet_edges(surface: &NurbsSurface) -> [IsoCurve<'_, NurbsSurface>; 4] {
    let (u0, u1) = surface.domain_u();
    let (v0, v1) = surface.domain_v();
    [
        IsoCurve::new(surface, IsoDirection::AlongU, v0, false),
        IsoCurve::new(surface, IsoDirection::AlongV, u1, false),
        IsoCurve::new(surface, IsoDirection::AlongU, v1, true),
        IsoCurve::new(surface, IsoDirection::AlongV, u0, true),
    ]
}
