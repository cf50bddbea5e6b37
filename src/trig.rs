//! Trigonometric primitives working in degrees.
//!
//! The rotation code relies on two guarantees the raw `f64` methods do not
//! give once a degree-to-radian conversion is involved:
//! * `sincosd` / `sind` / `cosd` return exact values (`0`, `±1`) at every
//!   multiple of 90°, so the meridian and pole branches of the rotation stay
//!   free of rounding;
//! * `asind` / `acosd` accept arguments that overshoot `[-1, 1]` by rounding
//!   and clamp them to the nearest pole instead of returning NaN.

/// Simultaneous sine and cosine of an angle given in degrees.
/// Returns `(sin, cos)`, exact at every multiple of 90°.
///
/// ```rust
/// use sphrot::trig::sincosd;
/// assert_eq!(sincosd(180.0), (0.0, -1.0));
/// assert_eq!(sincosd(-90.0), (-1.0, 0.0));
/// ```
pub fn sincosd(angle: f64) -> (f64, f64) {
  if angle % 90.0 == 0.0 {
    // Quadrant in -3..=3, exact since the operands are small integers.
    return match ((angle % 360.0) / 90.0) as i32 {
      0 => (0.0, 1.0),
      1 | -3 => (1.0, 0.0),
      2 | -2 => (0.0, -1.0),
      _ => (-1.0, 0.0),
    };
  }
  angle.to_radians().sin_cos()
}

/// Sine of an angle given in degrees, exact at multiples of 90°.
#[inline]
pub fn sind(angle: f64) -> f64 {
  sincosd(angle).0
}

/// Cosine of an angle given in degrees, exact at multiples of 90°.
#[inline]
pub fn cosd(angle: f64) -> f64 {
  sincosd(angle).1
}

/// Two-argument arctangent, in degrees, exact on the axes:
/// `y == 0` maps to `0` or `180`, `x == 0` maps to `±90`.
pub fn atan2d(y: f64, x: f64) -> f64 {
  if y == 0.0 {
    if x >= 0.0 {
      0.0
    } else {
      180.0
    }
  } else if x == 0.0 {
    if y > 0.0 {
      90.0
    } else {
      -90.0
    }
  } else {
    y.atan2(x).to_degrees()
  }
}

/// Arcsine in degrees. Arguments outside `[-1, 1]` (rounding overshoot)
/// are clamped to the corresponding pole.
pub fn asind(v: f64) -> f64 {
  if v <= -1.0 {
    -90.0
  } else if v >= 1.0 {
    90.0
  } else if v == 0.0 {
    0.0
  } else {
    v.asin().to_degrees()
  }
}

/// Arccosine in degrees. Arguments outside `[-1, 1]` (rounding overshoot)
/// are clamped to the corresponding limit.
pub fn acosd(v: f64) -> f64 {
  if v >= 1.0 {
    0.0
  } else if v <= -1.0 {
    180.0
  } else if v == 0.0 {
    90.0
  } else {
    v.acos().to_degrees()
  }
}
