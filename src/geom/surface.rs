use serde::{Deserialize, Serialize};

use super::core::{Point3, Tolerance, Vec3};
use super::curve::{Curve3, HPoint4, clamped_uniform_knots, de_boor, find_span, is_non_decreasing};

pub trait Surface {
    fn point_at(&self, u: f64, v: f64) -> Point3;

    #[must_use]
    fn domain_u(&self) -> (f64, f64) {
        (0.0, 1.0)
    }

    #[must_use]
    fn domain_v(&self) -> (f64, f64) {
        (0.0, 1.0)
    }

    /// Finite-difference partial derivatives `(du, dv)`, clamped to the domain.
    #[must_use]
    fn partial_derivatives_at(&self, u: f64, v: f64) -> (Vec3, Vec3) {
        let (u0, u1) = self.domain_u();
        let (v0, v1) = self.domain_v();
        let u = u.clamp(u0, u1);
        let v = v.clamp(v0, v1);

        let du = {
            let h = Tolerance::DERIVATIVE.relative_to(u1 - u0);
            let (ua, ub) = ((u - h).max(u0), (u + h).min(u1));
            if ub > ua {
                self.point_at(ub, v)
                    .sub_point(self.point_at(ua, v))
                    .mul_scalar(1.0 / (ub - ua))
            } else {
                Vec3::ZERO
            }
        };

        let dv = {
            let h = Tolerance::DERIVATIVE.relative_to(v1 - v0);
            let (va, vb) = ((v - h).max(v0), (v + h).min(v1));
            if vb > va {
                self.point_at(u, vb)
                    .sub_point(self.point_at(u, va))
                    .mul_scalar(1.0 / (vb - va))
            } else {
                Vec3::ZERO
            }
        };

        (du, dv)
    }

    /// Unit normal `du × dv`, or `None` at degenerate points.
    #[must_use]
    fn normal_at(&self, u: f64, v: f64) -> Option<Vec3> {
        let (du, dv) = self.partial_derivatives_at(u, v);
        du.cross(dv).normalized()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// NurbsSurface
// ─────────────────────────────────────────────────────────────────────────────

/// Tensor-product NURBS patch. Control points are stored row-major with `u`
/// varying fastest: index `v_index * u_count + u_index`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NurbsSurfaceData")]
pub struct NurbsSurface {
    degree_u: usize,
    degree_v: usize,
    u_count: usize,
    v_count: usize,
    control_points: Vec<Point3>,
    knots_u: Vec<f64>,
    knots_v: Vec<f64>,
    weights: Option<Vec<f64>>,
}

#[derive(Deserialize)]
struct NurbsSurfaceData {
    degree_u: usize,
    degree_v: usize,
    u_count: usize,
    v_count: usize,
    control_points: Vec<Point3>,
    knots_u: Vec<f64>,
    knots_v: Vec<f64>,
    #[serde(default)]
    weights: Option<Vec<f64>>,
}

impl TryFrom<NurbsSurfaceData> for NurbsSurface {
    type Error = String;

    fn try_from(data: NurbsSurfaceData) -> Result<Self, Self::Error> {
        Self::new(
            data.degree_u,
            data.degree_v,
            data.u_count,
            data.v_count,
            data.control_points,
            data.knots_u,
            data.knots_v,
            data.weights,
        )
    }
}

impl NurbsSurface {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        degree_u: usize,
        degree_v: usize,
        u_count: usize,
        v_count: usize,
        control_points: Vec<Point3>,
        knots_u: Vec<f64>,
        knots_v: Vec<f64>,
        weights: Option<Vec<f64>>,
    ) -> Result<Self, String> {
        if u_count < 2 || v_count < 2 {
            return Err("nurbs surface requires at least a 2x2 control net".to_string());
        }
        if degree_u == 0 || degree_v == 0 {
            return Err("nurbs surface degrees must be >= 1".to_string());
        }
        if degree_u >= u_count || degree_v >= v_count {
            return Err("nurbs surface degrees must be < control point counts".to_string());
        }
        if control_points.len() != u_count * v_count {
            return Err("nurbs surface control point count must match u_count*v_count".to_string());
        }
        if control_points.iter().any(|p| !p.is_finite()) {
            return Err("nurbs surface control points must be finite".to_string());
        }
        if knots_u.len() != u_count + degree_u + 1 || knots_v.len() != v_count + degree_v + 1 {
            return Err(format!(
                "nurbs surface knot lengths must be {}x{}, got {}x{}",
                u_count + degree_u + 1,
                v_count + degree_v + 1,
                knots_u.len(),
                knots_v.len()
            ));
        }
        if !is_non_decreasing(&knots_u) || !is_non_decreasing(&knots_v) {
            return Err("nurbs surface knots must be non-decreasing".to_string());
        }
        if knots_u[degree_u] >= knots_u[u_count] || knots_v[degree_v] >= knots_v[v_count] {
            return Err("nurbs surface domain must be non-empty".to_string());
        }
        if let Some(ref weights) = weights {
            if weights.len() != control_points.len() {
                return Err("nurbs surface weights length must match control point count".to_string());
            }
            if weights.iter().any(|w| !w.is_finite() || *w <= 0.0) {
                return Err("nurbs surface weights must be finite and > 0".to_string());
            }
        }

        Ok(Self {
            degree_u,
            degree_v,
            u_count,
            v_count,
            control_points,
            knots_u,
            knots_v,
            weights,
        })
    }

    /// Non-rational patch over a control net with clamped uniform knots.
    /// Degrees are reduced to fit small nets.
    pub fn clamped(
        control_points: Vec<Point3>,
        u_count: usize,
        v_count: usize,
        degree: usize,
    ) -> Result<Self, String> {
        let degree_u = degree.min(u_count.saturating_sub(1)).max(1);
        let degree_v = degree.min(v_count.saturating_sub(1)).max(1);
        Self::new(
            degree_u,
            degree_v,
            u_count,
            v_count,
            control_points,
            clamped_uniform_knots(u_count, degree_u),
            clamped_uniform_knots(v_count, degree_v),
            None,
        )
    }

    /// Bilinear patch through four corners, `p00` at `(0, 0)` and `p11` at `(1, 1)`.
    pub fn bilinear(p00: Point3, p10: Point3, p01: Point3, p11: Point3) -> Result<Self, String> {
        Self::clamped(vec![p00, p10, p01, p11], 2, 2, 1)
    }

    /// Control net size as `(u_count, v_count)`.
    #[must_use]
    pub fn control_counts(&self) -> (usize, usize) {
        (self.u_count, self.v_count)
    }

    #[must_use]
    pub fn control_points(&self) -> &[Point3] {
        &self.control_points
    }

    fn control_hpoint(&self, u_index: usize, v_index: usize) -> HPoint4 {
        let idx = v_index * self.u_count + u_index;
        let w = self
            .weights
            .as_ref()
            .and_then(|weights| weights.get(idx).copied())
            .unwrap_or(1.0);
        HPoint4::weighted(self.control_points[idx], w)
    }

    #[must_use]
    pub fn corners(&self) -> [Point3; 4] {
        let (u0, u1) = self.domain_u();
        let (v0, v1) = self.domain_v();
        [
            self.point_at(u0, v0),
            self.point_at(u1, v0),
            self.point_at(u1, v1),
            self.point_at(u0, v1),
        ]
    }
}

impl Surface for NurbsSurface {
    fn point_at(&self, u: f64, v: f64) -> Point3 {
        let p = self.degree_u;
        let q = self.degree_v;
        let (u0, u1) = self.domain_u();
        let (v0, v1) = self.domain_v();
        let u = u.clamp(u0, u1);
        let v = v.clamp(v0, v1);

        let span_u = find_span(self.u_count - 1, p, u, &self.knots_u);
        let span_v = find_span(self.v_count - 1, q, v, &self.knots_v);

        let mut column = vec![HPoint4::ZERO; q + 1];
        for (l, slot) in column.iter_mut().enumerate() {
            let v_index = span_v - q + l;
            let mut row: Vec<HPoint4> = (0..=p)
                .map(|j| self.control_hpoint(span_u - p + j, v_index))
                .collect();
            de_boor(&mut row, span_u, p, u, &self.knots_u);
            *slot = row[p];
        }

        de_boor(&mut column, span_v, q, v, &self.knots_v);
        column[q].to_point3().unwrap_or(self.control_points[0])
    }

    fn domain_u(&self) -> (f64, f64) {
        (self.knots_u[self.degree_u], self.knots_u[self.u_count])
    }

    fn domain_v(&self) -> (f64, f64) {
        (self.knots_v[self.degree_v], self.knots_v[self.v_count])
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// IsoCurve
// ─────────────────────────────────────────────────────────────────────────────

/// Which parameter an [`IsoCurve`] holds fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsoDirection {
    /// `u` varies, `v` is fixed.
    AlongU,
    /// `v` varies, `u` is fixed.
    AlongV,
}

/// A constant-parameter curve on a surface, optionally traversed backwards.
///
/// The curve domain is always `[0, 1]`; `reversed` maps `t` to `1 - t` before
/// it is spread over the varying surface parameter.
pub struct IsoCurve<'a, S: Surface + ?Sized> {
    surface: &'a S,
    direction: IsoDirection,
    fixed: f64,
    reversed: bool,
}

impl<'a, S: Surface + ?Sized> IsoCurve<'a, S> {
    #[must_use]
    pub fn new(surface: &'a S, direction: IsoDirection, fixed: f64, reversed: bool) -> Self {
        Self {
            surface,
            direction,
            fixed,
            reversed,
        }
    }

    /// Surface parameters `(u, v)` of the curve point at `t`.
    #[must_use]
    pub fn surface_params(&self, t: f64) -> (f64, f64) {
        let s = if self.reversed { 1.0 - t } else { t }.clamp(0.0, 1.0);
        match self.direction {
            IsoDirection::AlongU => {
                let (u0, u1) = self.surface.domain_u();
                (u0 + (u1 - u0) * s, self.fixed)
            }
            IsoDirection::AlongV => {
                let (v0, v1) = self.surface.domain_v();
                (self.fixed, v0 + (v1 - v0) * s)
            }
        }
    }
}

impl<S: Surface + ?Sized> Curve3 for IsoCurve<'_, S> {
    fn point_at(&self, t: f64) -> Point3 {
        let (u, v) = self.surface_params(t);
        self.surface.point_at(u, v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> NurbsSurface {
        NurbsSurface::bilinear(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(2.0, 1.0, 0.0),
        )
        .expect("bilinear patch")
    }

    #[test]
    fn bilinear_patch_evaluates_corners_and_normal() {
        let sheet = unit_square();
        let tol = Tolerance::default_geom();
        assert!(tol.approx_eq_point3(sheet.point_at(1.0, 1.0), Point3::new(2.0, 1.0, 0.0)));
        assert!(tol.approx_eq_point3(sheet.point_at(0.5, 0.5), Point3::new(1.0, 0.5, 0.0)));

        let n = sheet.normal_at(0.3, 0.7).expect("normal");
        assert!(n.sub(Vec3::Z).length() < 1e-9);
    }

    #[test]
    fn iso_curve_runs_backwards_when_reversed() {
        let sheet = unit_square();
        let edge = IsoCurve::new(&sheet, IsoDirection::AlongU, 1.0, true);
        let tol = Tolerance::default_geom();
        assert!(tol.approx_eq_point3(edge.point_at(0.0), Point3::new(2.0, 1.0, 0.0)));
        assert!(tol.approx_eq_point3(edge.point_at(1.0), Point3::new(0.0, 1.0, 0.0)));
        let tangent = edge.tangent_at(0.5).expect("tangent");
        assert!(tangent.sub(-Vec3::X).length() < 1e-9);
    }

    #[test]
    fn clamped_patch_checks_net_size() {
        let pts = vec![Point3::ORIGIN; 5];
        assert!(NurbsSurface::clamped(pts, 2, 2, 1).is_err());
    }

    #[test]
    fn deserialization_rejects_a_short_control_net() {
        let mut value = serde_json::to_value(unit_square()).expect("serialize");
        value["control_points"]
            .as_array_mut()
            .expect("control points")
            .pop();
        assert!(serde_json::from_value::<NurbsSurface>(value.clone()).is_err());

        value["u_count"] = serde_json::json!(0);
        assert!(serde_json::from_value::<NurbsSurface>(value).is_err());

        let round_trip: NurbsSurface =
            serde_json::from_value(serde_json::to_value(unit_square()).expect("serialize"))
                .expect("valid patch");
        assert_eq!(round_trip.control_counts(), (2, 2));
    }
}
