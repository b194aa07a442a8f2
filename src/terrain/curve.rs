//! Keyframed height-response curve.
//!
//! [`HeightCurve`] maps a blended column height in `[0, 1]` to a signed height
//! offset before the height multiplier is applied. Sampling between keys is
//! linear; outside the key range the curve holds its end values.

use serde::{Deserialize, Serialize};

/// Keyframe-based response curve.
///
/// Keys are `(input, output)` pairs sorted by input.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightCurve {
    keys: Vec<(f32, f32)>,
}

impl HeightCurve {
    /// Create a new curve from unsorted keys. Keys are sorted by input.
    ///
    /// An empty key list behaves like [`HeightCurve::constant(0.0)`](Self::constant).
    pub fn new(mut keys: Vec<(f32, f32)>) -> Self {
        keys.retain(|k| k.0.is_finite() && k.1.is_finite());
        keys.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        Self { keys }
    }

    /// Create a curve that always returns the same value.
    pub fn constant(value: f32) -> Self {
        Self {
            keys: vec![(0.0, value)],
        }
    }

    /// Identity over `[0, 1]`.
    pub fn linear() -> Self {
        Self::new(vec![(0.0, 0.0), (1.0, 1.0)])
    }

    pub fn keys(&self) -> &[(f32, f32)] {
        &self.keys
    }

    /// Evaluate the curve at `t`.
    pub fn evaluate(&self, t: f32) -> f32 {
        let n = self.keys.len();
        match n {
            0 => return 0.0,
            1 => return self.keys[0].1,
            _ => {}
        }

        if t <= self.keys[0].0 {
            return self.keys[0].1;
        }
        if t >= self.keys[n - 1].0 {
            return self.keys[n - 1].1;
        }

        // First key strictly after t; guaranteed to exist and be > 0 by the checks above
        let upper = self.keys.iter().position(|k| k.0 > t).unwrap_or(n - 1);
        let (t_a, v_a) = self.keys[upper - 1];
        let (t_b, v_b) = self.keys[upper];
        let span = t_b - t_a;
        if span < 1e-6 {
            return v_a;
        }
        let frac = (t - t_a) / span;
        v_a + (v_b - v_a) * frac
    }
}

impl Default for HeightCurve {
    fn default() -> Self {
        Self::linear()
    }
}

impl Serialize for HeightCurve {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.keys.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for HeightCurve {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let keys = Vec::<(f32, f32)>::deserialize(deserializer)?;
        Ok(Self::new(keys))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_constant_curve() {
        let curve = HeightCurve::constant(0.0);
        assert_eq!(curve.evaluate(0.0), 0.0);
        assert_eq!(curve.evaluate(0.6), 0.0);
        assert_eq!(curve.evaluate(1.0), 0.0);
    }

    #[test]
    fn test_linear_interpolation() {
        let curve = HeightCurve::new(vec![(1.0, 2.0), (0.0, -2.0)]);
        assert!(approx_eq(curve.evaluate(0.5), 0.0));
        assert!(approx_eq(curve.evaluate(0.25), -1.0));
        assert!(approx_eq(curve.evaluate(1.0), 2.0));
    }

    #[test]
    fn test_clamps_outside_range() {
        let curve = HeightCurve::new(vec![(0.2, 1.0), (0.8, 3.0)]);
        assert_eq!(curve.evaluate(-5.0), 1.0);
        assert_eq!(curve.evaluate(0.0), 1.0);
        assert_eq!(curve.evaluate(0.9), 3.0);
    }

    #[test]
    fn test_empty_curve_is_zero() {
        let curve = HeightCurve::new(Vec::new());
        assert_eq!(curve.evaluate(0.5), 0.0);
    }

    #[test]
    fn test_multi_key_curve() {
        let curve = HeightCurve::new(vec![(0.0, 0.0), (0.5, 0.1), (1.0, 1.0)]);
        assert!(approx_eq(curve.evaluate(0.25), 0.05));
        assert!(approx_eq(curve.evaluate(0.75), 0.55));
    }

    #[test]
    fn test_serde_as_key_list() {
        let curve = HeightCurve::new(vec![(1.0, 1.0), (0.0, 0.0)]);
        let json = serde_json::to_string(&curve).unwrap();
        assert_eq!(json, "[[0.0,0.0],[1.0,1.0]]");
        let back: HeightCurve = serde_json::from_str(&json).unwrap();
        assert_eq!(back, curve);
    }
}
