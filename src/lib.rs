//! Rotation of spherical coordinates between the "native" frame of a map
//! projection and the "celestial" frame of the observer.
//! See paper:
//! * Calabretta2002: "Representations of celestial coordinates in FITS (Paper II)",
//!   Calabretta, M. R. et Greisen, E. W., 2002; 2002A&A...395.1077C, Sect. 2.3, Eq. (2).
//!
//! The rotation is defined by three Euler angles (see [`EulerAngles`]) and
//! applied to arrays of coordinate pairs accessed through explicit strides
//! (see [`Layout`] and [`Pairing`]), so both contiguous vectors and
//! record-interleaved storage are supported without copies. All angles are
//! in degrees; the degree-based trigonometric primitives live in [`trig`].
//!
//! Two convenience transforms ([`dist_pa`] and [`lnglat_from_dist_pa`])
//! express field points relative to a reference point as great-circle
//! distance and position angle.
//!
//! ```rust
//! use sphrot::EulerAngles;
//!
//! // Equatorial -> galactic rotation.
//! let eul = EulerAngles::new(192.85948, 62.87175, 122.93192);
//! let (lng, lat) = eul.native_to_celestial_coo(12.0, 34.0);
//! let (phi, theta) = eul.celestial_to_native_coo(lng, lat);
//! assert!((phi - 12.0).abs() < 1e-9);
//! assert!((theta - 34.0).abs() < 1e-9);
//! ```

pub mod dpa;
mod error;
pub mod grid;
pub mod rotate;
pub mod trig;

pub use crate::dpa::{
  dist_pa, dist_pa_coo, dist_pa_in_place, lnglat_from_dist_pa, lnglat_from_dist_pa_coo,
  lnglat_from_dist_pa_in_place,
};
pub use crate::error::Error;
pub use crate::grid::{Layout, Pairing};
pub use crate::rotate::EulerAngles;
