//! Rotation between the native spherical frame of a map projection and the
//! celestial frame, defined by three Euler angles.
//! See paper:
//! * Calabretta2002: "Representations of celestial coordinates in FITS (Paper II)",
//!   Calabretta, M. R. et Greisen, E. W., 2002; 2002A&A...395.1077C, Sect. 2.3, Eq. (2).
//!
//! All angles are in degrees. The forward transform maps native `(phi, theta)`
//! to celestial `(lng, lat)`; the inverse transform is its exact structural
//! mirror. Degenerate rotations (untilted axis) reduce to longitude-origin
//! shifts or pole flips and are handled without any trigonometry.

use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::grid::{check_input, check_output, Layout, Pairing};
use crate::trig::{acosd, asind, atan2d, cosd, sincosd};

/// Tolerance below which the longitude numerator is recomputed with the
/// rearranged, cancellation-free formula.
const TOL: f64 = 1.0e-5;
/// |sin(lat)| above which the asin-based latitude loses precision and the
/// acos-based alternative is used instead.
const Z_ALT: f64 = 0.99;

/// Longitude folding conventions shared by every branch of the transforms.
#[derive(Debug, Clone, Copy)]
enum Wrap {
  /// Fold into `(-360, 360]`, the sign of the result first pushed to match
  /// the sign of the given reference angle (celestial convention).
  SignOf(f64),
  /// Fold into `(-180, 180]` (native convention).
  Symmetric,
}

/// Folds a longitude according to the given convention.
fn normalize_longitude(value: f64, wrap: Wrap) -> f64 {
  match wrap {
    Wrap::SignOf(reference) => {
      let mut lng = value;
      if reference >= 0.0 {
        if lng < 0.0 {
          lng += 360.0;
        }
      } else if lng > 0.0 {
        lng -= 360.0;
      }
      if lng > 360.0 {
        lng - 360.0
      } else if lng < -360.0 {
        lng + 360.0
      } else {
        lng
      }
    }
    Wrap::Symmetric => {
      let lng = value % 360.0;
      if lng > 180.0 {
        lng - 360.0
      } else if lng <= -180.0 {
        lng + 360.0
      } else {
        lng
      }
    }
  }
}

/// Reflects a latitude overshooting `[-90, 90]` by rounding back into range.
#[inline]
fn reflect_latitude(lat: f64) -> f64 {
  if lat > 90.0 {
    180.0 - lat
  } else if lat < -90.0 {
    -180.0 - lat
  } else {
    lat
  }
}

/// The Euler angles of the rotation between the native and celestial frames,
/// with the derived cosine/sine of the colatitude kept alongside.
///
/// The five numbers are, in the classical ordering:
/// * the celestial longitude of the native pole;
/// * the colatitude of the native pole (90° minus its celestial latitude),
///   expected in `[0, 180]`;
/// * the native longitude of the celestial pole;
/// * the cosine and sine of the colatitude, computed once by the
///   constructor so they can never disagree with the angle.
///
/// A null sine flags a degenerate rotation: the two poles are aligned (or
/// anti-aligned) and the rotation reduces to a longitude shift (or a pole
/// flip), handled without trigonometry.
///
/// ```rust
/// use sphrot::EulerAngles;
/// // Equatorial -> galactic rotation.
/// let eul = EulerAngles::new(192.85948, 62.87175, 122.93192);
/// // The native pole (theta = 90) maps to the celestial position of the pole.
/// let (lng, lat) = eul.native_to_celestial_coo(0.0, 90.0);
/// assert!((lng - 192.85948).abs() < 1e-12);
/// assert!((lat - 27.12825).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "EulerAnglesDef", into = "EulerAnglesDef")]
pub struct EulerAngles {
  alpha_p: f64,
  colat_p: f64,
  phi_p: f64,
  cos_colat: f64,
  sin_colat: f64,
}

/// Serialized form of [`EulerAngles`]: the three angles only, the derived
/// cosine/sine being recomputed on deserialization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct EulerAnglesDef {
  alpha_p: f64,
  colat_p: f64,
  phi_p: f64,
}

impl From<EulerAnglesDef> for EulerAngles {
  fn from(def: EulerAnglesDef) -> Self {
    EulerAngles::new(def.alpha_p, def.colat_p, def.phi_p)
  }
}

impl From<EulerAngles> for EulerAnglesDef {
  fn from(eul: EulerAngles) -> Self {
    EulerAnglesDef {
      alpha_p: eul.alpha_p,
      colat_p: eul.colat_p,
      phi_p: eul.phi_p,
    }
  }
}

/// Trigonometric products shared by every cell of one latitude-like row.
struct RowTrig {
  /// The row angle itself (native theta or celestial lat), in degrees.
  angle: f64,
  cos: f64,
  /// sin(angle) * cos(colat_p)
  s3: f64,
  /// sin(angle) * sin(colat_p)
  s4: f64,
  /// cos(angle) * cos(colat_p)
  c3: f64,
  /// cos(angle) * sin(colat_p)
  c4: f64,
}

impl RowTrig {
  #[inline]
  fn new(angle: f64, eul: &EulerAngles) -> RowTrig {
    let (sin_a, cos_a) = sincosd(angle);
    RowTrig {
      angle,
      cos: cos_a,
      s3: sin_a * eul.cos_colat,
      s4: sin_a * eul.sin_colat,
      c3: cos_a * eul.cos_colat,
      c4: cos_a * eul.sin_colat,
    }
  }
}

impl EulerAngles {
  /// New rotation from the three Euler angles, in degrees:
  /// `alpha_p` celestial longitude of the native pole, `colat_p` colatitude
  /// of the native pole in `[0, 180]`, `phi_p` native longitude of the
  /// celestial pole. The cosine and sine of `colat_p` are computed here.
  pub fn new(alpha_p: f64, colat_p: f64, phi_p: f64) -> EulerAngles {
    debug_assert!(
      (0.0..=180.0).contains(&colat_p),
      "colatitude out of [0, 180]: {}",
      colat_p
    );
    let (sin_colat, cos_colat) = sincosd(colat_p);
    if sin_colat == 0.0 {
      debug!(
        "degenerate rotation (untilted axis): colat_p = {}",
        colat_p
      );
    }
    EulerAngles {
      alpha_p,
      colat_p,
      phi_p,
      cos_colat,
      sin_colat,
    }
  }

  /// Rotation placing the native pole at the given celestial reference
  /// point, with a null native longitude of the celestial pole. This is the
  /// rotation underlying the distance/position-angle transforms.
  pub fn about_point(lng0: f64, lat0: f64) -> EulerAngles {
    EulerAngles::new(lng0, 90.0 - lat0, 0.0)
  }

  /// Celestial longitude of the native pole, in degrees.
  #[inline]
  pub fn alpha_p(&self) -> f64 {
    self.alpha_p
  }

  /// Colatitude of the native pole, in degrees.
  #[inline]
  pub fn colat_p(&self) -> f64 {
    self.colat_p
  }

  /// Native longitude of the celestial pole, in degrees.
  #[inline]
  pub fn phi_p(&self) -> f64 {
    self.phi_p
  }

  /// `true` for an untilted rotation (aligned or anti-aligned poles),
  /// i.e. a null sine of the colatitude.
  #[inline]
  pub fn is_degenerate(&self) -> bool {
    self.sin_colat == 0.0
  }

  /// One cell of the native -> celestial rotation, general (tilted) case.
  /// `row` caches the theta-row trigonometry, `dphi` is the native
  /// longitude offset from the celestial pole.
  #[inline]
  fn fwd_cell(&self, row: &RowTrig, dphi: f64) -> (f64, f64) {
    let (sin_dphi, cos_dphi) = sincosd(dphi);

    // Celestial longitude.
    let mut x = row.s4 - row.c3 * cos_dphi;
    if x.abs() < TOL {
      // Rearranged formula reducing roundoff near the tie-point.
      x = -cosd(row.angle + self.colat_p) + row.c3 * (1.0 - cos_dphi);
    }
    let y = -row.cos * sin_dphi;
    let dlng = if x != 0.0 || y != 0.0 {
      atan2d(y, x)
    } else if self.colat_p < 90.0 {
      // Pole singularity: the analytic limit is a plain change of the
      // longitude origin.
      dphi + 180.0
    } else {
      -dphi
    };
    let lng = normalize_longitude(self.alpha_p + dlng, Wrap::SignOf(self.alpha_p));

    // Celestial latitude.
    let lat = if dphi % 180.0 == 0.0 {
      // On the meridian plane the latitude is a plain angle sum.
      reflect_latitude(row.angle + cos_dphi * self.colat_p)
    } else {
      let z = row.s3 + row.c4 * cos_dphi;
      if z.abs() > Z_ALT {
        acosd((x * x + y * y).sqrt()).copysign(z)
      } else {
        asind(z)
      }
    };
    (lng, lat)
  }

  /// One cell of the celestial -> native rotation, general (tilted) case.
  /// Mirror of [`Self::fwd_cell`] with the frame roles swapped.
  #[inline]
  fn inv_cell(&self, row: &RowTrig, dlng: f64) -> (f64, f64) {
    let (sin_dlng, cos_dlng) = sincosd(dlng);

    // Native longitude.
    let mut x = row.s4 - row.c3 * cos_dlng;
    if x.abs() < TOL {
      // Rearranged formula reducing roundoff near the tie-point.
      x = -cosd(row.angle + self.colat_p) + row.c3 * (1.0 - cos_dlng);
    }
    let y = -row.cos * sin_dlng;
    let dphi = if x != 0.0 || y != 0.0 {
      atan2d(y, x)
    } else if self.colat_p < 90.0 {
      dlng - 180.0
    } else {
      -dlng
    };
    let phi = normalize_longitude(self.phi_p + dphi, Wrap::Symmetric);

    // Native latitude.
    let theta = if dlng % 180.0 == 0.0 {
      reflect_latitude(row.angle + cos_dlng * self.colat_p)
    } else {
      let z = row.s3 + row.c4 * cos_dlng;
      if z.abs() > Z_ALT {
        acosd((x * x + y * y).sqrt()).copysign(z)
      } else {
        asind(z)
      }
    };
    (phi, theta)
  }

  /// Rotates a single native coordinate pair `(phi, theta)` into the
  /// celestial frame, returning `(lng, lat)`.
  pub fn native_to_celestial_coo(&self, phi: f64, theta: f64) -> (f64, f64) {
    if self.sin_colat == 0.0 {
      if self.colat_p == 0.0 {
        // Simple change in origin of longitude.
        let dlng = (self.alpha_p + 180.0 - self.phi_p) % 360.0;
        (
          normalize_longitude(phi + dlng, Wrap::SignOf(self.alpha_p)),
          theta,
        )
      } else {
        // Pole-flip with change in origin of longitude.
        let dlng = (self.alpha_p + self.phi_p) % 360.0;
        (
          normalize_longitude(dlng - phi, Wrap::SignOf(self.alpha_p)),
          -theta,
        )
      }
    } else {
      let row = RowTrig::new(theta, self);
      self.fwd_cell(&row, phi - self.phi_p)
    }
  }

  /// Rotates a single celestial coordinate pair `(lng, lat)` into the
  /// native frame, returning `(phi, theta)`.
  pub fn celestial_to_native_coo(&self, lng: f64, lat: f64) -> (f64, f64) {
    if self.sin_colat == 0.0 {
      if self.colat_p == 0.0 {
        let dphi = (self.phi_p - 180.0 - self.alpha_p) % 360.0;
        (normalize_longitude(lng + dphi, Wrap::Symmetric), lat)
      } else {
        let dphi = (self.phi_p + self.alpha_p) % 360.0;
        (normalize_longitude(dphi - lng, Wrap::Symmetric), -lat)
      }
    } else {
      let row = RowTrig::new(lat, self);
      self.inv_cell(&row, lng - self.alpha_p)
    }
  }

  /// Rotates arrays of native coordinates `(phi, theta)` into celestial
  /// `(lng, lat)`.
  ///
  /// `pairing` selects how the two input arrays combine (see [`Pairing`]);
  /// the output is always the full set of `pairing.n_out()` cells, written
  /// through `out_layout` with the longitude-like index varying fastest.
  /// Inputs are read through `in_layout`.
  ///
  /// Fails only on under-sized buffers; the rotation itself writes a
  /// geometrically defined value in every cell, pole singularity included.
  ///
  /// ```rust
  /// use sphrot::{EulerAngles, Layout, Pairing};
  /// let eul = EulerAngles::new(120.0, 35.0, 180.0);
  /// let phi = [-60.0, 0.0, 60.0];
  /// let theta = [30.0, 60.0];
  /// let mut lng = [0.0; 6];
  /// let mut lat = [0.0; 6];
  /// eul
  ///   .native_to_celestial(
  ///     Pairing::Grid { n_lng: 3, n_lat: 2 },
  ///     &phi,
  ///     &theta,
  ///     Layout::packed(),
  ///     &mut lng,
  ///     &mut lat,
  ///     Layout::packed(),
  ///   )
  ///   .unwrap();
  /// let (l, b) = eul.native_to_celestial_coo(phi[2], theta[1]);
  /// assert_eq!((lng[5], lat[5]), (l, b));
  /// ```
  pub fn native_to_celestial(
    &self,
    pairing: Pairing,
    phi: &[f64],
    theta: &[f64],
    in_layout: Layout,
    lng: &mut [f64],
    lat: &mut [f64],
    out_layout: Layout,
  ) -> Result<(), Error> {
    let it = pairing.iteration();
    let n_out = it.n_inner * it.n_rows;
    check_input("phi", phi, in_layout, it.lng_cycle)?;
    check_input("theta", theta, in_layout, it.n_rows)?;
    check_output("lng", lng, out_layout, n_out)?;
    check_output("lat", lat, out_layout, n_out)?;

    // Degenerate rotations reduce to longitude shifts and pole flips: no
    // trigonometry, no rounding-sensitive branch.
    if self.sin_colat == 0.0 {
      let flip = self.colat_p != 0.0;
      let dlng = if flip {
        (self.alpha_p + self.phi_p) % 360.0
      } else {
        (self.alpha_p + 180.0 - self.phi_p) % 360.0
      };
      for i in 0..it.n_rows {
        let t = theta[in_layout.at(i)];
        for j in 0..it.n_inner {
          let flat = i * it.n_inner + j;
          let p = phi[in_layout.at(flat % it.lng_cycle)];
          let (l, b) = if flip { (dlng - p, -t) } else { (p + dlng, t) };
          lng[out_layout.at(flat)] = normalize_longitude(l, Wrap::SignOf(self.alpha_p));
          lat[out_layout.at(flat)] = b;
        }
      }
      return Ok(());
    }

    // The longitude offset depends only on phi: compute it once per column
    // and broadcast it down the theta rows, using the longitude output
    // buffer as scratch.
    for j in 0..it.lng_cycle {
      let dphi = phi[in_layout.at(j)] - self.phi_p;
      for r in 0..it.col_rows {
        lng[out_layout.at(r * it.n_inner + j)] = dphi;
      }
    }

    // One pass of row trigonometry per theta value.
    for i in 0..it.n_rows {
      let row = RowTrig::new(theta[in_layout.at(i)], self);
      for j in 0..it.n_inner {
        let o = out_layout.at(i * it.n_inner + j);
        let (l, b) = self.fwd_cell(&row, lng[o]);
        lng[o] = l;
        lat[out_layout.at(i * it.n_inner + j)] = b;
      }
    }
    Ok(())
  }

  /// Rotates arrays of celestial coordinates `(lng, lat)` into native
  /// `(phi, theta)`. Exact structural mirror of
  /// [`Self::native_to_celestial`]; the output native longitude is folded
  /// into `(-180, 180]` instead of the sign-matched `(-360, 360]`.
  pub fn celestial_to_native(
    &self,
    pairing: Pairing,
    lng: &[f64],
    lat: &[f64],
    in_layout: Layout,
    phi: &mut [f64],
    theta: &mut [f64],
    out_layout: Layout,
  ) -> Result<(), Error> {
    let it = pairing.iteration();
    let n_out = it.n_inner * it.n_rows;
    check_input("lng", lng, in_layout, it.lng_cycle)?;
    check_input("lat", lat, in_layout, it.n_rows)?;
    check_output("phi", phi, out_layout, n_out)?;
    check_output("theta", theta, out_layout, n_out)?;

    if self.sin_colat == 0.0 {
      let flip = self.colat_p != 0.0;
      let dphi = if flip {
        (self.phi_p + self.alpha_p) % 360.0
      } else {
        (self.phi_p - 180.0 - self.alpha_p) % 360.0
      };
      for i in 0..it.n_rows {
        let b = lat[in_layout.at(i)];
        for j in 0..it.n_inner {
          let flat = i * it.n_inner + j;
          let l = lng[in_layout.at(flat % it.lng_cycle)];
          let (p, t) = if flip { (dphi - l, -b) } else { (l + dphi, b) };
          phi[out_layout.at(flat)] = normalize_longitude(p, Wrap::Symmetric);
          theta[out_layout.at(flat)] = t;
        }
      }
      return Ok(());
    }

    // Longitude offsets first, broadcast down the latitude rows.
    for j in 0..it.lng_cycle {
      let dlng = lng[in_layout.at(j)] - self.alpha_p;
      for r in 0..it.col_rows {
        phi[out_layout.at(r * it.n_inner + j)] = dlng;
      }
    }

    for i in 0..it.n_rows {
      let row = RowTrig::new(lat[in_layout.at(i)], self);
      for j in 0..it.n_inner {
        let o = out_layout.at(i * it.n_inner + j);
        let (p, t) = self.inv_cell(&row, phi[o]);
        phi[o] = p;
        theta[out_layout.at(i * it.n_inner + j)] = t;
      }
    }
    Ok(())
  }

  /// Parallel version of [`Self::native_to_celestial`], splitting the work
  /// by theta rows; the outputs are written packed (contiguous, starting at
  /// index 0). Rows write disjoint output regions, so the split is safe.
  /// Degenerate rotations fall through to the sequential path: they are
  /// trigless and memory-bound, forking is pure overhead.
  pub fn par_native_to_celestial(
    &self,
    pairing: Pairing,
    phi: &[f64],
    theta: &[f64],
    in_layout: Layout,
    lng: &mut [f64],
    lat: &mut [f64],
  ) -> Result<(), Error> {
    if self.sin_colat == 0.0 {
      return self.native_to_celestial(pairing, phi, theta, in_layout, lng, lat, Layout::packed());
    }
    let it = pairing.iteration();
    let n_out = it.n_inner * it.n_rows;
    check_input("phi", phi, in_layout, it.lng_cycle)?;
    check_input("theta", theta, in_layout, it.n_rows)?;
    check_output("lng", lng, Layout::packed(), n_out)?;
    check_output("lat", lat, Layout::packed(), n_out)?;
    if n_out == 0 {
      return Ok(());
    }

    lng[..n_out]
      .par_chunks_mut(it.n_inner)
      .zip(lat[..n_out].par_chunks_mut(it.n_inner))
      .enumerate()
      .for_each(|(i, (lng_row, lat_row))| {
        let row = RowTrig::new(theta[in_layout.at(i)], self);
        for j in 0..it.n_inner {
          let flat = i * it.n_inner + j;
          let dphi = phi[in_layout.at(flat % it.lng_cycle)] - self.phi_p;
          let (l, b) = self.fwd_cell(&row, dphi);
          lng_row[j] = l;
          lat_row[j] = b;
        }
      });
    Ok(())
  }

  /// Parallel version of [`Self::celestial_to_native`]; same contract as
  /// [`Self::par_native_to_celestial`].
  pub fn par_celestial_to_native(
    &self,
    pairing: Pairing,
    lng: &[f64],
    lat: &[f64],
    in_layout: Layout,
    phi: &mut [f64],
    theta: &mut [f64],
  ) -> Result<(), Error> {
    if self.sin_colat == 0.0 {
      return self.celestial_to_native(pairing, lng, lat, in_layout, phi, theta, Layout::packed());
    }
    let it = pairing.iteration();
    let n_out = it.n_inner * it.n_rows;
    check_input("lng", lng, in_layout, it.lng_cycle)?;
    check_input("lat", lat, in_layout, it.n_rows)?;
    check_output("phi", phi, Layout::packed(), n_out)?;
    check_output("theta", theta, Layout::packed(), n_out)?;
    if n_out == 0 {
      return Ok(());
    }

    phi[..n_out]
      .par_chunks_mut(it.n_inner)
      .zip(theta[..n_out].par_chunks_mut(it.n_inner))
      .enumerate()
      .for_each(|(i, (phi_row, theta_row))| {
        let row = RowTrig::new(lat[in_layout.at(i)], self);
        for j in 0..it.n_inner {
          let flat = i * it.n_inner + j;
          let dlng = lng[in_layout.at(flat % it.lng_cycle)] - self.alpha_p;
          let (p, t) = self.inv_cell(&row, dlng);
          phi_row[j] = p;
          theta_row[j] = t;
        }
      });
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::trig::sind;
  use rand::rngs::StdRng;
  use rand::{Rng, SeedableRng};

  /// Difference of two angles folded into (-180, 180], so comparisons
  /// survive a 360-degree wrap.
  fn ang_diff(a: f64, b: f64) -> f64 {
    normalize_longitude(a - b, Wrap::Symmetric)
  }

  fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
  }

  #[test]
  fn test_roundtrip_general_rotation() {
    init_logger();
    let mut rng = StdRng::seed_from_u64(0x5f3759df);
    for _ in 0..50 {
      let eul = EulerAngles::new(
        rng.gen_range(-180.0..180.0),
        rng.gen_range(1.0..179.0),
        rng.gen_range(-180.0..180.0),
      );
      for _ in 0..50 {
        let phi = rng.gen_range(-179.0..180.0);
        let theta = rng.gen_range(-89.0..89.0);
        let (lng, lat) = eul.native_to_celestial_coo(phi, theta);
        let (phi2, theta2) = eul.celestial_to_native_coo(lng, lat);
        assert!(
          ang_diff(phi2, phi).abs() < 1e-9,
          "phi: {} -> {}",
          phi,
          phi2
        );
        assert!((theta2 - theta).abs() < 1e-9, "theta: {} -> {}", theta, theta2);
      }
    }
  }

  #[test]
  fn test_roundtrip_degenerate_rotations() {
    // Untilted axis (colat 0) and pole flip (colat 180).
    for eul in [
      EulerAngles::new(40.0, 0.0, 75.0),
      EulerAngles::new(-40.0, 0.0, 75.0),
      EulerAngles::new(40.0, 180.0, -75.0),
      EulerAngles::new(-40.0, 180.0, -75.0),
    ] {
      assert!(eul.is_degenerate());
      for phi in [-150.0, -30.0, 0.0, 60.0, 179.0] {
        for theta in [-60.0, 0.0, 45.0] {
          let (lng, lat) = eul.native_to_celestial_coo(phi, theta);
          let (phi2, theta2) = eul.celestial_to_native_coo(lng, lat);
          assert!(ang_diff(phi2, phi).abs() < 1e-12);
          assert_eq!(theta2, theta);
        }
      }
    }
  }

  #[test]
  fn test_longitude_shift_fast_path_is_exact() {
    // colat 0: lng = phi + (alpha_p + 180 - phi_p) mod 360, lat = theta.
    let eul = EulerAngles::new(30.0, 0.0, 210.0);
    let (lng, lat) = eul.native_to_celestial_coo(10.0, 25.0);
    assert_eq!(lng, 10.0);
    assert_eq!(lat, 25.0);
  }

  #[test]
  fn test_pole_flip_fast_path_is_exact() {
    // colat 180: lng = (alpha_p + phi_p) mod 360 - phi, lat = -theta.
    let eul = EulerAngles::new(30.0, 180.0, 60.0);
    let (lng, lat) = eul.native_to_celestial_coo(10.0, 25.0);
    assert_eq!(lng, 80.0);
    assert_eq!(lat, -25.0);
  }

  #[test]
  fn test_degenerate_agrees_with_near_degenerate() {
    // The trigless fast path must agree with the general formulas in the
    // limit of a vanishing tilt.
    let exact = EulerAngles::new(40.0, 0.0, 75.0);
    let tilted = EulerAngles::new(40.0, 1e-7, 75.0);
    assert!(!tilted.is_degenerate());
    for phi in [-120.0, -45.0, 0.0, 30.0, 150.0] {
      for theta in [-75.0, -10.0, 0.0, 20.0, 80.0] {
        let (l0, b0) = exact.native_to_celestial_coo(phi, theta);
        let (l1, b1) = tilted.native_to_celestial_coo(phi, theta);
        assert!(ang_diff(l1, l0).abs() < 1e-5, "phi {} theta {}", phi, theta);
        assert!((b1 - b0).abs() < 1e-5);
      }
    }
  }

  #[test]
  fn test_native_pole_longitude_is_phi_independent() {
    // At theta = 90 the output longitude must not depend on phi.
    let eul = EulerAngles::new(120.0, 60.0, 45.0);
    for phi in [0.0, 90.0, 180.0, 270.0] {
      let (lng, lat) = eul.native_to_celestial_coo(phi, 90.0);
      assert_eq!(lng, 120.0, "phi: {}", phi);
      assert!((lat - 30.0).abs() < 1e-12, "phi: {}", phi);
    }
    // Same at the south native pole: latitude is -(90 - colat).
    for phi in [0.0, 90.0, 180.0, 270.0] {
      let (_, lat) = eul.native_to_celestial_coo(phi, -90.0);
      assert!((lat + 30.0).abs() < 1e-12, "phi: {}", phi);
    }
  }

  #[test]
  fn test_pole_singularity_analytic_limit() {
    // theta + colat = 90 with dphi = 0 puts the point exactly at the
    // celestial pole: x and y are both null and the longitude comes from
    // the analytic limit dphi + 180.
    let eul = EulerAngles::new(0.0, 60.0, 0.0);
    let (lng, lat) = eul.native_to_celestial_coo(0.0, 30.0);
    assert_eq!(lat, 90.0);
    assert_eq!(lng, 180.0);
  }

  #[test]
  fn test_latitude_reflection_is_exact() {
    // Meridian-plane branch overshooting 90 must reflect exactly.
    let eul = EulerAngles::new(0.0, 30.0, 0.0);
    let (_, lat) = eul.native_to_celestial_coo(0.0, 75.0);
    // Raw value is 75 + 30 = 105, reflected to 180 - 105 = 75.
    assert_eq!(lat, 75.0);
    let (_, lat) = eul.native_to_celestial_coo(180.0, -75.0);
    // Raw value is -75 - 30 = -105, reflected to -180 + 105 = -75.
    assert_eq!(lat, -75.0);
  }

  #[test]
  fn test_output_ranges() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..40 {
      let alpha_p = rng.gen_range(-180.0..180.0);
      let eul = EulerAngles::new(alpha_p, rng.gen_range(0.0..=180.0), rng.gen_range(-180.0..180.0));
      for _ in 0..40 {
        let phi = rng.gen_range(-180.0..180.0);
        let theta = rng.gen_range(-90.0..=90.0);
        let (lng, lat) = eul.native_to_celestial_coo(phi, theta);
        assert!(lng > -360.0 && lng <= 360.0, "lng: {}", lng);
        assert!((-90.0..=90.0).contains(&lat), "lat: {}", lat);
        if alpha_p >= 0.0 {
          assert!(lng >= 0.0, "lng {} vs alpha_p {}", lng, alpha_p);
        } else {
          assert!(lng <= 0.0, "lng {} vs alpha_p {}", lng, alpha_p);
        }
        let (p, t) = eul.celestial_to_native_coo(lng, lat);
        assert!(p > -180.0 && p <= 180.0, "phi: {}", p);
        assert!((-90.0..=90.0).contains(&t), "theta: {}", t);
      }
    }
  }

  #[test]
  fn test_grid_matches_scalar() {
    let eul = EulerAngles::new(-100.0, 25.0, 180.0);
    let phi = [-120.0, -40.0, 0.0, 40.0, 120.0];
    let theta = [-60.0, 0.0, 60.0];
    let mut lng = [0.0; 15];
    let mut lat = [0.0; 15];
    eul
      .native_to_celestial(
        Pairing::Grid { n_lng: 5, n_lat: 3 },
        &phi,
        &theta,
        Layout::packed(),
        &mut lng,
        &mut lat,
        Layout::packed(),
      )
      .unwrap();
    for (i, &t) in theta.iter().enumerate() {
      for (j, &p) in phi.iter().enumerate() {
        let (l, b) = eul.native_to_celestial_coo(p, t);
        assert_eq!(lng[i * 5 + j], l);
        assert_eq!(lat[i * 5 + j], b);
      }
    }
  }

  #[test]
  fn test_broadcast_matches_per_point_calls() {
    let eul = EulerAngles::new(80.0, 70.0, 20.0);
    let phi = [-90.0, -30.0, 0.0, 45.0, 135.0, 180.0];
    let theta = [33.0];
    let mut lng = [0.0; 6];
    let mut lat = [0.0; 6];
    eul
      .native_to_celestial(
        Pairing::Broadcast { n_lng: 6 },
        &phi,
        &theta,
        Layout::packed(),
        &mut lng,
        &mut lat,
        Layout::packed(),
      )
      .unwrap();
    for (j, &p) in phi.iter().enumerate() {
      let (l, b) = eul.native_to_celestial_coo(p, 33.0);
      assert_eq!(lng[j], l);
      assert_eq!(lat[j], b);
    }
  }

  #[test]
  fn test_diagonal_pairing() {
    let eul = EulerAngles::new(10.0, 45.0, -60.0);
    let phi = [0.0, 30.0, 60.0, 90.0];
    let theta = [5.0, 15.0, 25.0, 35.0];
    let mut lng = [0.0; 4];
    let mut lat = [0.0; 4];
    eul
      .native_to_celestial(
        Pairing::Diagonal { n: 4 },
        &phi,
        &theta,
        Layout::packed(),
        &mut lng,
        &mut lat,
        Layout::packed(),
      )
      .unwrap();
    // Element i pairs with element i, no crossed pairing.
    for i in 0..4 {
      let (l, b) = eul.native_to_celestial_coo(phi[i], theta[i]);
      assert_eq!(lng[i], l);
      assert_eq!(lat[i], b);
    }
  }

  #[test]
  fn test_interleaved_input_records() {
    // (phi, theta) pairs interleaved in a single record buffer: both inputs
    // read the same storage through an element stride of 2, theta through a
    // one-element offset subslice.
    let eul = EulerAngles::new(55.0, 120.0, 5.0);
    let records = [10.0, 40.0, 70.0, -20.0, 130.0, 80.0];
    let (mut lng, mut lat) = ([0.0; 3], [0.0; 3]);
    eul
      .native_to_celestial(
        Pairing::Diagonal { n: 3 },
        &records,
        &records[1..],
        Layout::new(0, 2),
        &mut lng,
        &mut lat,
        Layout::packed(),
      )
      .unwrap();
    for i in 0..3 {
      let (l, b) = eul.native_to_celestial_coo(records[2 * i], records[2 * i + 1]);
      assert_eq!(lng[i], l);
      assert_eq!(lat[i], b);
    }
  }

  #[test]
  fn test_strided_output() {
    let eul = EulerAngles::new(55.0, 120.0, 5.0);
    let phi = [10.0, 70.0, 130.0];
    let theta = [40.0, -20.0, 80.0];
    let mut lng = [f64::NAN; 5];
    let mut lat = [f64::NAN; 5];
    eul
      .native_to_celestial(
        Pairing::Diagonal { n: 3 },
        &phi,
        &theta,
        Layout::packed(),
        &mut lng,
        &mut lat,
        Layout::new(0, 2),
      )
      .unwrap();
    for i in 0..3 {
      let (l, b) = eul.native_to_celestial_coo(phi[i], theta[i]);
      assert_eq!(lng[2 * i], l);
      assert_eq!(lat[2 * i], b);
    }
    // The stride gaps are never written.
    assert!(lng[1].is_nan() && lng[3].is_nan());
    assert!(lat[1].is_nan() && lat[3].is_nan());
  }

  #[test]
  fn test_par_matches_sequential() {
    let eul = EulerAngles::new(-75.0, 100.0, 30.0);
    let phi: Vec<f64> = (0..64).map(|i| -180.0 + 5.5 * i as f64).collect();
    let theta: Vec<f64> = (0..32).map(|i| -88.0 + 5.5 * i as f64).collect();
    let pairing = Pairing::Grid { n_lng: 64, n_lat: 32 };
    let n = pairing.n_out();
    let (mut lng_s, mut lat_s) = (vec![0.0; n], vec![0.0; n]);
    let (mut lng_p, mut lat_p) = (vec![0.0; n], vec![0.0; n]);
    eul
      .native_to_celestial(
        pairing,
        &phi,
        &theta,
        Layout::packed(),
        &mut lng_s,
        &mut lat_s,
        Layout::packed(),
      )
      .unwrap();
    eul
      .par_native_to_celestial(pairing, &phi, &theta, Layout::packed(), &mut lng_p, &mut lat_p)
      .unwrap();
    assert_eq!(lng_s, lng_p);
    assert_eq!(lat_s, lat_p);

    let (mut phi_s, mut theta_s) = (vec![0.0; n], vec![0.0; n]);
    let (mut phi_p2, mut theta_p2) = (vec![0.0; n], vec![0.0; n]);
    eul
      .celestial_to_native(
        pairing,
        &lng_s,
        &lat_s,
        Layout::packed(),
        &mut phi_s,
        &mut theta_s,
        Layout::packed(),
      )
      .unwrap();
    eul
      .par_celestial_to_native(pairing, &lng_s, &lat_s, Layout::packed(), &mut phi_p2, &mut theta_p2)
      .unwrap();
    assert_eq!(phi_s, phi_p2);
    assert_eq!(theta_s, theta_p2);
  }

  #[test]
  fn test_buffer_too_short() {
    let eul = EulerAngles::new(0.0, 45.0, 0.0);
    let phi = [0.0; 3];
    let theta = [0.0; 2];
    let mut lng = [0.0; 5]; // 6 needed
    let mut lat = [0.0; 6];
    let res = eul.native_to_celestial(
      Pairing::Grid { n_lng: 3, n_lat: 2 },
      &phi,
      &theta,
      Layout::packed(),
      &mut lng,
      &mut lat,
      Layout::packed(),
    );
    assert!(matches!(
      res,
      Err(Error::OutputTooShort { name: "lng", expected: 6, actual: 5 })
    ));
  }

  #[test]
  fn test_serde_roundtrip_recomputes_derived_terms() {
    let eul = EulerAngles::new(12.5, 77.0, -33.0);
    let def = EulerAnglesDef::from(eul);
    let back = EulerAngles::from(def);
    assert_eq!(eul, back);
    assert_eq!(back.cos_colat, cosd(77.0));
    assert_eq!(back.sin_colat, sind(77.0));
  }

  #[test]
  fn test_normalize_longitude() {
    assert_eq!(normalize_longitude(-10.0, Wrap::SignOf(5.0)), 350.0);
    assert_eq!(normalize_longitude(10.0, Wrap::SignOf(-5.0)), -350.0);
    assert_eq!(normalize_longitude(370.0, Wrap::SignOf(5.0)), 10.0);
    assert_eq!(normalize_longitude(0.0, Wrap::SignOf(0.0)), 0.0);
    assert_eq!(normalize_longitude(190.0, Wrap::Symmetric), -170.0);
    assert_eq!(normalize_longitude(-190.0, Wrap::Symmetric), 170.0);
    assert_eq!(normalize_longitude(-180.0, Wrap::Symmetric), 180.0);
    assert_eq!(normalize_longitude(180.0, Wrap::Symmetric), 180.0);
    assert_eq!(normalize_longitude(540.0, Wrap::Symmetric), 180.0);
  }
}
