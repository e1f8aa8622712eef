//! Parametric resampling: cylinder, sphere-cap, lune, planar and contour
//! sweeps.
//!
//! Every mode follows the same pattern. Frames are evaluated analytically
//! from the primitive first, then one ray is cast per grid cell. Rows only
//! read the frames and the spatial index, so with the `parallel` feature
//! they are computed on the rayon pool and collected back in row order.

use std::f64::consts::{PI, TAU};

use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::error::{SynthError, SynthResult};
use super::grid::{Grid, Sample};
use super::raycast::{RayCast, RayCaster};
use crate::geom::{
    Curve3, Point3, Surface, Tolerance, Vec3, orthogonal_unit_vector, rotate_vector,
    transport_direction,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerOptions {
    /// Offset along the ray used for a miss when the row has no hit yet.
    pub fallback_offset: f64,
    pub tol: Tolerance,
}

impl Default for SamplerOptions {
    fn default() -> Self {
        Self {
            fallback_offset: 0.0,
            tol: Tolerance::default_geom(),
        }
    }
}

/// Ray counts of one or more sampling calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SamplingStats {
    pub rays_cast: usize,
    pub misses: usize,
}

impl SamplingStats {
    pub fn merge(&mut self, other: Self) {
        self.rays_cast += other.rays_cast;
        self.misses += other.misses;
    }

    #[must_use]
    pub fn miss_ratio(&self) -> f64 {
        if self.rays_cast == 0 {
            0.0
        } else {
            self.misses as f64 / self.rays_cast as f64
        }
    }

    fn report(&self, label: &str) {
        log::debug!(
            "{label}: {} rays, {} misses",
            self.rays_cast,
            self.misses
        );
        if self.miss_ratio() > 0.5 {
            log::warn!(
                "{label}: {} of {} rays missed the reference surface",
                self.misses,
                self.rays_cast
            );
        }
    }
}

/// Skeleton frame at one path step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathFrame {
    pub parameter: f64,
    pub origin: Point3,
    pub tangent: Vec3,
    /// Unit vector perpendicular to `tangent`; angle zero of the ring.
    pub direction: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CylinderSampling {
    /// `time_res × theta_res`, indexed `[time][angle]`.
    pub grid: Grid<Sample>,
    pub frames: Vec<PathFrame>,
    pub stats: SamplingStats,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridSampling {
    pub grid: Grid<Sample>,
    pub stats: SamplingStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaneSide {
    /// Rays along `+∂u × ∂v`.
    Front,
    /// Rays along `-(∂u × ∂v)`.
    Back,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaneGrid {
    pub side: PlaneSide,
    /// `u_res × v_res`, rows indexed by `u`.
    pub grid: Grid<Sample>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaneSampling {
    pub planes: Vec<PlaneGrid>,
    pub stats: SamplingStats,
}

// ─────────────────────────────────────────────────────────────────────────────
// Cylinder mode
// ─────────────────────────────────────────────────────────────────────────────

/// Sweeps rings of rays along `path`.
///
/// Ring `i` sits at the `i`-th of `time_res` uniform path parameters (both
/// ends included). Ray `j` leaves the ring origin along the ring direction
/// rotated by `j * theta_range / theta_res` around the tangent. The ring
/// direction starts as `initial_direction` and is parallel transported from
/// step to step.
///
/// `sheet_boundary` marks a partial sweep around a sheet edge; it only
/// affects diagnostics.
#[allow(clippy::too_many_arguments)]
pub fn cylinder_resampling<C: Curve3 + ?Sized>(
    path: &C,
    initial_direction: Vec3,
    time_res: usize,
    theta_res: usize,
    theta_range: f64,
    caster: &RayCaster<'_>,
    sheet_boundary: bool,
    options: &SamplerOptions,
) -> SynthResult<CylinderSampling> {
    validate_time_resolution(time_res)?;
    validate_sweep("theta", theta_res, theta_range, TAU)?;
    let frames = path_frames(path, initial_direction, time_res, options.tol)?;

    let step = theta_range / theta_res as f64;
    let rows = map_rows(frames.len(), |i| {
        let frame = frames[i];
        cast_row(
            caster,
            options,
            (0..theta_res).map(|j| {
                let angle = j as f64 * step;
                let dir = rotate_vector(frame.direction, frame.tangent, angle);
                (frame.origin, dir, frame.parameter, angle)
            }),
        )
    });

    let label = if sheet_boundary {
        "sheet boundary resampling"
    } else {
        "cylinder resampling"
    };
    let (grid, stats) = collect_rows(rows, label)?;
    Ok(CylinderSampling {
        grid,
        frames,
        stats,
    })
}

/// One ring of a cylinder sweep at path parameter `t`.
///
/// The ring direction is `fixed_start_direction` made perpendicular to the
/// tangent at `t`; no transport from other rings takes place.
pub fn contour_resampling<C: Curve3 + ?Sized>(
    path: &C,
    t: f64,
    theta_res: usize,
    theta_range: f64,
    fixed_start_direction: Vec3,
    caster: &RayCaster<'_>,
    options: &SamplerOptions,
) -> SynthResult<(Vec<Sample>, SamplingStats)> {
    validate_sweep("theta", theta_res, theta_range, TAU)?;
    let tangent = path
        .tangent_at(t)
        .ok_or_else(|| SynthError::DegenerateGrid(format!("path has no tangent at {t}")))?;
    let direction = start_direction(fixed_start_direction, tangent)?;
    let origin = path.point_at(t);

    let step = theta_range / theta_res as f64;
    let (samples, stats) = cast_row(
        caster,
        options,
        (0..theta_res).map(|j| {
            let angle = j as f64 * step;
            (origin, rotate_vector(direction, tangent, angle), t, angle)
        }),
    );
    stats.report("contour resampling");
    Ok((samples, stats))
}

fn path_frames<C: Curve3 + ?Sized>(
    path: &C,
    initial_direction: Vec3,
    time_res: usize,
    tol: Tolerance,
) -> SynthResult<Vec<PathFrame>> {
    let mut frames: Vec<PathFrame> = Vec::with_capacity(time_res);
    for i in 0..time_res {
        let parameter = path.parameter_at_fraction(i as f64 / (time_res - 1) as f64);
        let origin = path.point_at(parameter);

        let frame = match frames.last() {
            None => {
                let tangent = path.tangent_at(parameter).ok_or_else(|| {
                    SynthError::DegenerateGrid("path has no tangent at its start".to_string())
                })?;
                PathFrame {
                    parameter,
                    origin,
                    tangent,
                    direction: start_direction(initial_direction, tangent)?,
                }
            }
            Some(prev) => {
                // A locally degenerate derivative keeps the previous frame orientation.
                let tangent = path.tangent_at(parameter).unwrap_or(prev.tangent);
                PathFrame {
                    parameter,
                    origin,
                    tangent,
                    direction: transport_direction(prev.direction, prev.tangent, tangent, tol),
                }
            }
        };
        frames.push(frame);
    }
    Ok(frames)
}

fn start_direction(direction: Vec3, tangent: Vec3) -> SynthResult<Vec3> {
    if !direction.is_finite() || direction.length_squared() == 0.0 {
        return Err(SynthError::DegenerateGrid(
            "start direction must be finite and non-zero".to_string(),
        ));
    }
    Ok(direction
        .reject_from(tangent)
        .normalized()
        .unwrap_or_else(|| orthogonal_unit_vector(tangent)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Sphere-cap mode
// ─────────────────────────────────────────────────────────────────────────────

/// Dome of rays around `end_point`.
///
/// Row `i` is the polar ring at `phi = i * phi_range / phi_res` measured from
/// `pole_axis`; column `j` the azimuth `theta = j * theta_range / theta_res`
/// measured from `seam_axis` around the pole. Row 0 is the pole itself: it is
/// cast once and the sample repeated across the row.
#[allow(clippy::too_many_arguments)]
pub fn sphere_resampling(
    end_point: Point3,
    pole_axis: Vec3,
    seam_axis: Vec3,
    theta_res: usize,
    phi_res: usize,
    theta_range: f64,
    phi_range: f64,
    caster: &RayCaster<'_>,
    options: &SamplerOptions,
) -> SynthResult<GridSampling> {
    validate_sweep("theta", theta_res, theta_range, TAU)?;
    if phi_res < 2 {
        return Err(SynthError::DegenerateGrid(format!(
            "phi resolution must be at least 2, got {phi_res}"
        )));
    }
    if !phi_range.is_finite() || phi_range <= 0.0 || phi_range > PI + options.tol.eps {
        return Err(SynthError::DegenerateGrid(format!(
            "phi range must lie in (0, pi], got {phi_range}"
        )));
    }
    if !end_point.is_finite() {
        return Err(SynthError::DegenerateGrid("cap center must be finite".to_string()));
    }
    let pole = pole_axis.normalized().ok_or_else(|| {
        SynthError::DegenerateGrid("pole axis must be non-zero".to_string())
    })?;
    let seam = start_direction(seam_axis, pole)?;

    let theta_step = theta_range / theta_res as f64;
    let phi_step = phi_range / phi_res as f64;

    let rows = map_rows(phi_res, |i| {
        if i == 0 {
            let (pole_row, stats) =
                cast_row(caster, options, std::iter::once((end_point, pole, 0.0, 0.0)));
            let pole_position = pole_row[0].position;
            let row = (0..theta_res)
                .map(|j| Sample::new(pole_position, j as f64 * theta_step, 0.0))
                .collect();
            return (row, stats);
        }

        let phi = i as f64 * phi_step;
        let (sin_phi, cos_phi) = phi.sin_cos();
        cast_row(
            caster,
            options,
            (0..theta_res).map(|j| {
                let theta = j as f64 * theta_step;
                let around = rotate_vector(seam, pole, theta);
                let dir = pole.mul_scalar(cos_phi).add(around.mul_scalar(sin_phi));
                (end_point, dir, theta, phi)
            }),
        )
    });

    let (grid, stats) = collect_rows(rows, "sphere resampling")?;
    Ok(GridSampling { grid, stats })
}

// ─────────────────────────────────────────────────────────────────────────────
// Lune mode
// ─────────────────────────────────────────────────────────────────────────────

/// Interior meridians of the spherical lune around `center` that opens from
/// `seam_axis` by `azimuth_range` right-handed about `pole_axis`.
///
/// Row `j` is the meridian at azimuth `(j + 1) * azimuth_range / azimuth_res`,
/// column `c` the polar angle `(c + 1) * PI / polar_res`. Both bounding
/// meridians and both poles are left out, so the grid is
/// `(azimuth_res - 1) × (polar_res - 1)`.
#[allow(clippy::too_many_arguments)]
pub fn lune_resampling(
    center: Point3,
    pole_axis: Vec3,
    seam_axis: Vec3,
    azimuth_res: usize,
    azimuth_range: f64,
    polar_res: usize,
    caster: &RayCaster<'_>,
    options: &SamplerOptions,
) -> SynthResult<GridSampling> {
    if azimuth_res < 2 || polar_res < 2 {
        return Err(SynthError::DegenerateGrid(format!(
            "lune resolution must be at least 2x2, got {azimuth_res}x{polar_res}"
        )));
    }
    if !azimuth_range.is_finite() || azimuth_range <= 0.0 || azimuth_range > PI + options.tol.eps {
        return Err(SynthError::DegenerateGrid(format!(
            "lune opening must lie in (0, pi], got {azimuth_range}"
        )));
    }
    if !center.is_finite() {
        return Err(SynthError::DegenerateGrid("lune center must be finite".to_string()));
    }
    let pole = pole_axis.normalized().ok_or_else(|| {
        SynthError::DegenerateGrid("pole axis must be non-zero".to_string())
    })?;
    let seam = start_direction(seam_axis, pole)?;

    let azimuth_step = azimuth_range / azimuth_res as f64;
    let polar_step = PI / polar_res as f64;
    let rows = map_rows(azimuth_res - 1, |j| {
        let azimuth = (j + 1) as f64 * azimuth_step;
        let around = rotate_vector(seam, pole, azimuth);
        cast_row(
            caster,
            options,
            (1..polar_res).map(|c| {
                let polar = c as f64 * polar_step;
                let (sin_polar, cos_polar) = polar.sin_cos();
                let dir = pole.mul_scalar(cos_polar).add(around.mul_scalar(sin_polar));
                (center, dir, azimuth, polar)
            }),
        )
    });

    let (grid, stats) = collect_rows(rows, "lune resampling")?;
    Ok(GridSampling { grid, stats })
}

// ─────────────────────────────────────────────────────────────────────────────
// Planar mode
// ─────────────────────────────────────────────────────────────────────────────

/// Casts from a `u_res × v_res` lattice on `sheet` along the surface normal,
/// once towards the front and once towards the back.
///
/// Parameters span the closed domain, both ends included. Each side becomes
/// an independent [`PlaneGrid`].
pub fn plane_resampling<S: Surface + ?Sized>(
    sheet: &S,
    u_res: usize,
    v_res: usize,
    caster: &RayCaster<'_>,
    options: &SamplerOptions,
) -> SynthResult<PlaneSampling> {
    if u_res < 2 || v_res < 2 {
        return Err(SynthError::DegenerateGrid(format!(
            "planar resolution must be at least 2x2, got {u_res}x{v_res}"
        )));
    }

    let (u0, u1) = sheet.domain_u();
    let (v0, v1) = sheet.domain_v();
    let mut lattice: Vec<(Point3, Vec3, f64, f64)> = Vec::with_capacity(u_res * v_res);
    for i in 0..u_res {
        let u = u0 + (u1 - u0) * i as f64 / (u_res - 1) as f64;
        for j in 0..v_res {
            let v = v0 + (v1 - v0) * j as f64 / (v_res - 1) as f64;
            let normal = sheet.normal_at(u, v).ok_or_else(|| {
                SynthError::DegenerateGrid(format!("sheet has no normal at ({u}, {v})"))
            })?;
            lattice.push((sheet.point_at(u, v), normal, u, v));
        }
    }

    let mut planes = Vec::with_capacity(2);
    let mut stats = SamplingStats::default();
    for side in [PlaneSide::Front, PlaneSide::Back] {
        let sign = match side {
            PlaneSide::Front => 1.0,
            PlaneSide::Back => -1.0,
        };
        let rows = map_rows(u_res, |i| {
            cast_row(
                caster,
                options,
                lattice[i * v_res..(i + 1) * v_res]
                    .iter()
                    .map(|&(origin, normal, u, v)| (origin, normal.mul_scalar(sign), u, v)),
            )
        });
        let (grid, side_stats) = collect_rows(rows, "plane resampling")?;
        stats.merge(side_stats);
        planes.push(PlaneGrid { side, grid });
    }

    Ok(PlaneSampling { planes, stats })
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared helpers
// ─────────────────────────────────────────────────────────────────────────────

fn validate_time_resolution(time_res: usize) -> SynthResult<()> {
    if time_res < 2 {
        return Err(SynthError::DegenerateGrid(format!(
            "time resolution must be at least 2, got {time_res}"
        )));
    }
    Ok(())
}

/// Full-circle sweeps need three columns, partial sweeps two.
fn validate_sweep(name: &str, res: usize, range: f64, full: f64) -> SynthResult<()> {
    let eps = Tolerance::LOOSE.eps;
    if !range.is_finite() || range <= 0.0 || range > full + eps {
        return Err(SynthError::DegenerateGrid(format!(
            "{name} range must lie in (0, {full}], got {range}"
        )));
    }
    let min_res = if range >= full - eps { 3 } else { 2 };
    if res < min_res {
        return Err(SynthError::DegenerateGrid(format!(
            "{name} resolution must be at least {min_res}, got {res}"
        )));
    }
    Ok(())
}

/// Casts one row of rays given as `(origin, direction, u, v)`.
///
/// A miss lands at the distance of the last hit in the same row, or at
/// `fallback_offset` before the row has any hit.
fn cast_row<I>(caster: &RayCaster<'_>, options: &SamplerOptions, rays: I) -> (Vec<Sample>, SamplingStats)
where
    I: Iterator<Item = (Point3, Vec3, f64, f64)>,
{
    let mut stats = SamplingStats::default();
    let mut last_distance: Option<f64> = None;
    let samples = rays
        .map(|(origin, dir, u, v)| {
            stats.rays_cast += 1;
            let position = match caster.cast(origin, dir) {
                RayCast::Hit(hit) => {
                    last_distance = Some(hit.distance);
                    hit.point
                }
                RayCast::Miss => {
                    stats.misses += 1;
                    let offset = last_distance.unwrap_or(options.fallback_offset);
                    let unit = dir.normalized().unwrap_or(Vec3::ZERO);
                    origin.add_vec(unit.mul_scalar(offset))
                }
            };
            Sample::new(position, u, v)
        })
        .collect();
    (samples, stats)
}

fn collect_rows(rows: Vec<(Vec<Sample>, SamplingStats)>, label: &str) -> SynthResult<(Grid<Sample>, SamplingStats)> {
    let mut stats = SamplingStats::default();
    let mut samples = Vec::with_capacity(rows.len());
    for (row, row_stats) in rows {
        stats.merge(row_stats);
        samples.push(row);
    }
    stats.report(label);
    Ok((Grid::from_rows(samples)?, stats))
}

#[cfg(feature = "parallel")]
fn map_rows<R, F>(count: usize, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(usize) -> R + Sync + Send,
{
    (0..count).into_par_iter().map(f).collect()
}

#[cfg(not(feature = "parallel"))]
fn map_rows<R, F>(count: usize, f: F) -> Vec<R>
where
    F: Fn(usize) -> R,
{
    (0..count).map(f).collect()
}
