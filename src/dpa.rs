//! Angular distance and position angle relative to a reference point.
//!
//! A field point can be expressed relative to a reference point as the
//! great-circle distance between the two and the bearing of the field point,
//! measured east of north in the celestial frame. Both directions build the
//! rotation whose native pole sits on the reference point
//! ([`EulerAngles::about_point`]) and delegate to the frame rotations of
//! [`crate::rotate`]: the angular distance is the native colatitude of the
//! field point in that rotated frame, the position angle the negated native
//! longitude.

use crate::error::Error;
use crate::grid::{Layout, Pairing};
use crate::rotate::EulerAngles;

/// Folds a position angle into `(-180, 180]`.
#[inline]
fn fold_pa(pa: f64) -> f64 {
  if pa <= -180.0 {
    pa + 360.0
  } else {
    pa
  }
}

/// Angular distance and position angle of one field point `(lng, lat)` seen
/// from the reference point `(lng0, lat0)`, all in degrees.
/// Returns `(dist, pa)` with `dist` in `[0, 180]` and `pa` in `(-180, 180]`,
/// east of north.
///
/// ```rust
/// use sphrot::dist_pa_coo;
/// // A point due east of the reference, a quarter turn away.
/// let (dist, pa) = dist_pa_coo(0.0, 0.0, 90.0, 0.0);
/// assert_eq!(dist, 90.0);
/// assert_eq!(pa, 90.0);
/// // The north celestial pole seen from the equator.
/// let (dist, pa) = dist_pa_coo(0.0, 0.0, 0.0, 90.0);
/// assert_eq!(dist, 90.0);
/// assert_eq!(pa, 0.0);
/// ```
pub fn dist_pa_coo(lng0: f64, lat0: f64, lng: f64, lat: f64) -> (f64, f64) {
  let eul = EulerAngles::about_point(lng0, lat0);
  let (phi, theta) = eul.celestial_to_native_coo(lng, lat);
  (90.0 - theta, fold_pa(-phi))
}

/// Celestial coordinates `(lng, lat)` of the point at angular distance
/// `dist` and position angle `pa` from the reference point `(lng0, lat0)`,
/// all in degrees. Inverse of [`dist_pa_coo`].
pub fn lnglat_from_dist_pa_coo(lng0: f64, lat0: f64, dist: f64, pa: f64) -> (f64, f64) {
  let eul = EulerAngles::about_point(lng0, lat0);
  eul.native_to_celestial_coo(-pa, 90.0 - dist)
}

/// Angular distances and position angles of the field points `(lng, lat)`
/// seen from the reference point `(lng0, lat0)`, written into `dist` and
/// `pa`. All buffers are packed and element `i` of `lng` pairs with element
/// `i` of `lat`.
pub fn dist_pa(
  lng0: f64,
  lat0: f64,
  lng: &[f64],
  lat: &[f64],
  dist: &mut [f64],
  pa: &mut [f64],
) -> Result<(), Error> {
  if lng.len() != lat.len() {
    return Err(Error::LengthMismatch {
      name1: "lng",
      name2: "lat",
      len1: lng.len(),
      len2: lat.len(),
    });
  }
  let n = lng.len();
  let eul = EulerAngles::about_point(lng0, lat0);
  // Position angle comes out as the native longitude, angular distance as
  // the native colatitude.
  eul.celestial_to_native(
    Pairing::Diagonal { n },
    lng,
    lat,
    Layout::packed(),
    pa,
    dist,
    Layout::packed(),
  )?;
  for d in &mut dist[..n] {
    *d = 90.0 - *d;
  }
  for p in &mut pa[..n] {
    *p = fold_pa(-*p);
  }
  Ok(())
}

/// As [`dist_pa`], overwriting the inputs: on return, `lng_dist` holds the
/// angular distances and `lat_pa` the position angles. This is the
/// aliased-buffer form for callers recycling their coordinate storage.
pub fn dist_pa_in_place(
  lng0: f64,
  lat0: f64,
  lng_dist: &mut [f64],
  lat_pa: &mut [f64],
) -> Result<(), Error> {
  if lng_dist.len() != lat_pa.len() {
    return Err(Error::LengthMismatch {
      name1: "lng_dist",
      name2: "lat_pa",
      len1: lng_dist.len(),
      len2: lat_pa.len(),
    });
  }
  let eul = EulerAngles::about_point(lng0, lat0);
  for (l, b) in lng_dist.iter_mut().zip(lat_pa.iter_mut()) {
    let (phi, theta) = eul.celestial_to_native_coo(*l, *b);
    *l = 90.0 - theta;
    *b = fold_pa(-phi);
  }
  Ok(())
}

/// Celestial coordinates of the points at angular distances `dist` and
/// position angles `pa` from the reference point `(lng0, lat0)`, written
/// into `lng` and `lat`. Inverse of [`dist_pa`].
pub fn lnglat_from_dist_pa(
  lng0: f64,
  lat0: f64,
  dist: &[f64],
  pa: &[f64],
  lng: &mut [f64],
  lat: &mut [f64],
) -> Result<(), Error> {
  if dist.len() != pa.len() {
    return Err(Error::LengthMismatch {
      name1: "dist",
      name2: "pa",
      len1: dist.len(),
      len2: pa.len(),
    });
  }
  let n = dist.len();
  if lng.len() < n {
    return Err(Error::OutputTooShort {
      name: "lng",
      expected: n,
      actual: lng.len(),
    });
  }
  if lat.len() < n {
    return Err(Error::OutputTooShort {
      name: "lat",
      expected: n,
      actual: lat.len(),
    });
  }
  let eul = EulerAngles::about_point(lng0, lat0);
  // The native coordinates in the pole-at-reference frame are direct
  // functions of distance and position angle.
  for i in 0..n {
    let (l, b) = eul.native_to_celestial_coo(-pa[i], 90.0 - dist[i]);
    lng[i] = l;
    lat[i] = b;
  }
  Ok(())
}

/// As [`lnglat_from_dist_pa`], overwriting the inputs: on return,
/// `dist_lng` holds the celestial longitudes and `pa_lat` the latitudes.
pub fn lnglat_from_dist_pa_in_place(
  lng0: f64,
  lat0: f64,
  dist_lng: &mut [f64],
  pa_lat: &mut [f64],
) -> Result<(), Error> {
  if dist_lng.len() != pa_lat.len() {
    return Err(Error::LengthMismatch {
      name1: "dist_lng",
      name2: "pa_lat",
      len1: dist_lng.len(),
      len2: pa_lat.len(),
    });
  }
  let eul = EulerAngles::about_point(lng0, lat0);
  for (d, p) in dist_lng.iter_mut().zip(pa_lat.iter_mut()) {
    let (l, b) = eul.native_to_celestial_coo(-*p, 90.0 - *d);
    *d = l;
    *p = b;
  }
  Ok(())
}
