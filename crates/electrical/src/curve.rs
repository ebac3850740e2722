//! Piecewise-linear lookup curves.
//!
//! A [`Curve`] is built once from `(x, y)` control points and is read-only
//! afterwards. Forward lookups walk the points sorted by `x`; inverse lookups
//! walk a second copy sorted by `y`, so the inverse is only meaningful for
//! curves that are monotonic in `x`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    by_x: Vec<CurvePoint>,
    by_y: Vec<CurvePoint>,
}

impl Curve {
    /// Build a curve from control points. Non-finite points are dropped.
    pub fn new<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut by_x: Vec<CurvePoint> = points
            .into_iter()
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .map(|(x, y)| CurvePoint { x, y })
            .collect();
        by_x.sort_by(|a, b| a.x.total_cmp(&b.x));

        let mut by_y = by_x.clone();
        by_y.sort_by(|a, b| a.y.total_cmp(&b.y));

        Curve { by_x, by_y }
    }

    pub fn points(&self) -> &[CurvePoint] {
        &self.by_x
    }

    pub fn is_empty(&self) -> bool {
        self.by_x.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_x.len()
    }

    /// Domain covered by the control points, `None` for an empty curve.
    pub fn domain(&self) -> Option<(f64, f64)> {
        Some((self.by_x.first()?.x, self.by_x.last()?.x))
    }

    /// True when `y` never decreases as `x` increases.
    pub fn is_non_decreasing(&self) -> bool {
        self.by_x.windows(2).all(|w| w[1].y >= w[0].y)
    }

    /// Look up `y` for `x`, clamping to the boundary values outside the domain.
    ///
    /// Returns `None` only when the curve has no points.
    pub fn interpolate(&self, x: f64) -> Option<f64> {
        lookup(&self.by_x, x, |p| p.x, |p| p.y)
    }

    /// Look up `x` for `y` using the `y`-sorted index.
    pub fn inverse_interpolate(&self, y: f64) -> Option<f64> {
        lookup(&self.by_y, y, |p| p.y, |p| p.x)
    }
}

fn lookup(
    points: &[CurvePoint],
    key: f64,
    key_of: impl Fn(&CurvePoint) -> f64,
    value_of: impl Fn(&CurvePoint) -> f64,
) -> Option<f64> {
    let first = points.first()?;
    let last = points.last()?;

    if key <= key_of(first) {
        return Some(value_of(first));
    }
    if key >= key_of(last) {
        return Some(value_of(last));
    }

    // Lowest point at or above the key, highest point at or below it.
    let upper = points.iter().find(|p| key_of(p) >= key)?;
    let lower = points.iter().rev().find(|p| key_of(p) <= key)?;

    let span = key_of(upper) - key_of(lower);
    if span == 0.0 {
        return Some(value_of(lower));
    }

    let ratio = (key - key_of(lower)) / span;
    Some(value_of(lower) + ratio * (value_of(upper) - value_of(lower)))
}

/// Li-ion open-circuit voltage against state of charge (% → V).
pub fn soc_ocv_curve() -> Curve {
    Curve::new([
        (0.0, 2.80),
        (5.0, 3.40),
        (10.0, 3.52),
        (15.0, 3.58),
        (20.0, 3.62),
        (25.0, 3.65),
        (30.0, 3.68),
        (35.0, 3.71),
        (40.0, 3.74),
        (45.0, 3.77),
        (50.0, 3.80),
        (55.0, 3.83),
        (60.0, 3.86),
        (65.0, 3.89),
        (70.0, 3.92),
        (75.0, 3.95),
        (80.0, 4.00),
        (85.0, 4.05),
        (90.0, 4.10),
        (95.0, 4.15),
        (100.0, 4.20),
    ])
}

/// Coulombic efficiency factor against ambient temperature (°C → factor).
pub fn temperature_efficiency_curve() -> Curve {
    Curve::new([
        (-20.0, 0.6),
        (-10.0, 0.7),
        (0.0, 0.8),
        (10.0, 0.9),
        (20.0, 0.98),
        (25.0, 1.0),
        (30.0, 0.99),
        (40.0, 0.97),
        (50.0, 0.94),
        (60.0, 0.90),
    ])
}
