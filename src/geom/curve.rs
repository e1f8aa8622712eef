use serde::{Deserialize, Serialize};

use super::core::{Point3, Tolerance, Vec3};

/// Number of chords used when a curve length or projection is approximated.
const DENSE_SAMPLES: usize = 256;

pub trait Curve3 {
    fn point_at(&self, t: f64) -> Point3;

    #[must_use]
    fn domain(&self) -> (f64, f64) {
        (0.0, 1.0)
    }

    /// Central difference derivative, one-sided at the domain ends.
    #[must_use]
    fn derivative_at(&self, t: f64) -> Vec3 {
        let (a, b) = self.domain();
        let span = b - a;
        if !span.is_finite() || span == 0.0 {
            return Vec3::ZERO;
        }

        let h = Tolerance::DERIVATIVE.relative_to(span);
        let t0 = (t - h).max(a);
        let t1 = (t + h).min(b);
        if t1 == t0 {
            return Vec3::ZERO;
        }

        self.point_at(t1)
            .sub_point(self.point_at(t0))
            .mul_scalar(1.0 / (t1 - t0))
    }

    /// Unit tangent at `t`, or `None` where the derivative vanishes.
    #[must_use]
    fn tangent_at(&self, t: f64) -> Option<Vec3> {
        self.derivative_at(t).normalized()
    }

    /// Parameter at normalized position `s` in `[0, 1]` of the domain.
    #[must_use]
    fn parameter_at_fraction(&self, s: f64) -> f64 {
        let (a, b) = self.domain();
        a + (b - a) * s.clamp(0.0, 1.0)
    }

    /// Chord-length approximation of the curve length.
    #[must_use]
    fn approx_length(&self) -> f64 {
        let mut prev = self.point_at(self.parameter_at_fraction(0.0));
        let mut length = 0.0;
        for i in 1..=DENSE_SAMPLES {
            let p = self.point_at(self.parameter_at_fraction(i as f64 / DENSE_SAMPLES as f64));
            length += p.distance_to(prev);
            prev = p;
        }
        length
    }

    /// Parameter of the dense sample closest to `point`.
    #[must_use]
    fn approx_projection(&self, point: Point3) -> f64 {
        let mut best_t = self.parameter_at_fraction(0.0);
        let mut best_d = f64::INFINITY;
        for i in 0..=DENSE_SAMPLES {
            let t = self.parameter_at_fraction(i as f64 / DENSE_SAMPLES as f64);
            let d = self.point_at(t).distance_to(point);
            if d < best_d {
                best_d = d;
                best_t = t;
            }
        }
        best_t
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Polyline3
// ─────────────────────────────────────────────────────────────────────────────

/// Piecewise linear curve parameterized uniformly per segment over `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PolylineData")]
pub struct Polyline3 {
    points: Vec<Point3>,
}

#[derive(Deserialize)]
struct PolylineData {
    points: Vec<Point3>,
}

impl TryFrom<PolylineData> for Polyline3 {
    type Error = String;

    fn try_from(data: PolylineData) -> Result<Self, Self::Error> {
        Self::new(data.points)
    }
}

impl Polyline3 {
    pub fn new(points: Vec<Point3>) -> Result<Self, String> {
        if points.len() < 2 {
            return Err("polyline requires at least 2 points".to_string());
        }
        if points.iter().any(|p| !p.is_finite()) {
            return Err("polyline points must be finite".to_string());
        }
        Ok(Self { points })
    }

    #[must_use]
    pub fn points(&self) -> &[Point3] {
        &self.points
    }
}

impl Curve3 for Polyline3 {
    fn point_at(&self, t: f64) -> Point3 {
        let segments = self.points.len() - 1;
        let scaled = t.clamp(0.0, 1.0) * segments as f64;
        let index = (scaled.floor() as usize).min(segments - 1);
        let local = scaled - index as f64;
        self.points[index].lerp(self.points[index + 1], local)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// NURBS helpers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct HPoint4 {
    x: f64,
    y: f64,
    z: f64,
    w: f64,
}

impl HPoint4 {
    pub(super) const ZERO: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    pub(super) const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    pub(super) fn weighted(p: Point3, w: f64) -> Self {
        Self::new(p.x * w, p.y * w, p.z * w, w)
    }

    fn lerp(self, rhs: Self, t: f64) -> Self {
        let s = 1.0 - t;
        Self::new(
            self.x * s + rhs.x * t,
            self.y * s + rhs.y * t,
            self.z * s + rhs.z * t,
            self.w * s + rhs.w * t,
        )
    }

    pub(super) fn to_point3(self) -> Option<Point3> {
        if self.w.is_finite() && self.w != 0.0 {
            Some(Point3::new(self.x / self.w, self.y / self.w, self.z / self.w))
        } else {
            None
        }
    }
}

pub(super) fn is_non_decreasing(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] <= w[1])
}

pub(super) fn find_span(n: usize, p: usize, u: f64, knots: &[f64]) -> usize {
    if u >= knots[n + 1] {
        return n;
    }
    if u <= knots[p] {
        return p;
    }

    let mut low = p;
    let mut high = n + 1;
    let mut mid = (low + high) / 2;
    while u < knots[mid] || u >= knots[mid + 1] {
        if u < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
        mid = (low + high) / 2;
    }
    mid
}

/// In-place de Boor evaluation; the result ends up in `d[p]`.
pub(super) fn de_boor(d: &mut [HPoint4], span: usize, p: usize, u: f64, knots: &[f64]) {
    for r in 1..=p {
        for j in (r..=p).rev() {
            let i = span - p + j;
            let denom = knots[i + p + 1 - r] - knots[i];
            let alpha = if denom == 0.0 { 0.0 } else { (u - knots[i]) / denom };
            d[j] = d[j - 1].lerp(d[j], alpha);
        }
    }
}

/// Clamped knot vector with uniformly spaced interior knots over `[0, 1]`.
#[must_use]
pub fn clamped_uniform_knots(control_count: usize, degree: usize) -> Vec<f64> {
    let interior = control_count.saturating_sub(degree + 1);
    let mut knots = Vec::with_capacity(control_count + degree + 1);
    knots.extend(std::iter::repeat_n(0.0, degree + 1));
    for i in 1..=interior {
        knots.push(i as f64 / (interior + 1) as f64);
    }
    knots.extend(std::iter::repeat_n(1.0, degree + 1));
    knots
}

// ─────────────────────────────────────────────────────────────────────────────
// NurbsCurve3
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NurbsCurveData")]
pub struct NurbsCurve3 {
    degree: usize,
    control_points: Vec<Point3>,
    knots: Vec<f64>,
    weights: Option<Vec<f64>>,
}

#[derive(Deserialize)]
struct NurbsCurveData {
    degree: usize,
    control_points: Vec<Point3>,
    knots: Vec<f64>,
    #[serde(default)]
    weights: Option<Vec<f64>>,
}

impl TryFrom<NurbsCurveData> for NurbsCurve3 {
    type Error = String;

    fn try_from(data: NurbsCurveData) -> Result<Self, Self::Error> {
        Self::new(data.degree, data.control_points, data.knots, data.weights)
    }
}

impl NurbsCurve3 {
    pub fn new(
        degree: usize,
        control_points: Vec<Point3>,
        knots: Vec<f64>,
        weights: Option<Vec<f64>>,
    ) -> Result<Self, String> {
        if control_points.len() < 2 {
            return Err("nurbs curve requires at least 2 control points".to_string());
        }
        if degree == 0 {
            return Err("nurbs curve degree must be >= 1".to_string());
        }
        if degree >= control_points.len() {
            return Err("nurbs curve degree must be < control point count".to_string());
        }
        if control_points.iter().any(|p| !p.is_finite()) {
            return Err("nurbs curve control points must be finite".to_string());
        }

        let expected_knot_len = control_points.len() + degree + 1;
        if knots.len() != expected_knot_len {
            return Err(format!(
                "nurbs curve knot length must be {expected_knot_len}, got {}",
                knots.len()
            ));
        }
        if !is_non_decreasing(&knots) || knots[degree] >= knots[control_points.len()] {
            return Err("nurbs curve knots must be non-decreasing with a non-empty domain".to_string());
        }

        if let Some(ref weights) = weights {
            if weights.len() != control_points.len() {
                return Err("nurbs curve weights length must match control point count".to_string());
            }
            if weights.iter().any(|w| !w.is_finite() || *w <= 0.0) {
                return Err("nurbs curve weights must be finite and > 0".to_string());
            }
        }

        Ok(Self {
            degree,
            control_points,
            knots,
            weights,
        })
    }

    /// Non-rational curve with a clamped uniform knot vector. The degree is
    /// reduced when there are too few control points for it.
    pub fn clamped(control_points: Vec<Point3>, degree: usize) -> Result<Self, String> {
        let degree = degree.min(control_points.len().saturating_sub(1)).max(1);
        let knots = clamped_uniform_knots(control_points.len(), degree);
        Self::new(degree, control_points, knots, None)
    }

    #[must_use]
    pub fn degree(&self) -> usize {
        self.degree
    }

    #[must_use]
    pub fn control_points(&self) -> &[Point3] {
        &self.control_points
    }

    fn weight(&self, index: usize) -> f64 {
        self.weights
            .as_ref()
            .and_then(|weights| weights.get(index).copied())
            .unwrap_or(1.0)
    }
}

impl Curve3 for NurbsCurve3 {
    fn point_at(&self, t: f64) -> Point3 {
        let p = self.degree;
        let (a, b) = self.domain();
        let u = t.clamp(a, b);

        let n = self.control_points.len() - 1;
        let span = find_span(n, p, u, &self.knots);

        let mut d: Vec<HPoint4> = (0..=p)
            .map(|j| {
                let index = span - p + j;
                HPoint4::weighted(self.control_points[index], self.weight(index))
            })
            .collect();
        de_boor(&mut d, span, p, u, &self.knots);
        d[p].to_point3().unwrap_or(self.control_points[0])
    }

    fn domain(&self) -> (f64, f64) {
        (self.knots[self.degree], self.knots[self.control_points.len()])
    }
}
