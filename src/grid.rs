//! Strided access to caller-allocated coordinate arrays.
//!
//! The transforms never own coordinate storage: callers hand in plain `f64`
//! slices together with a [`Layout`] describing where the logical elements
//! live inside them. This covers contiguous vectors, record-interleaved
//! storage (two coordinates of a record array, `step` = record size) and
//! split input/output strides, without requiring contiguous copies.

use crate::error::Error;

/// Maps logical element `i` of a coordinate sequence to slice index
/// `start + i * step`.
///
/// ```rust
/// use sphrot::Layout;
/// // Longitude values stored at even indices of an interleaved buffer.
/// let lng = Layout::new(0, 2);
/// // Latitude values at odd indices.
/// let lat = Layout::new(1, 2);
/// assert_eq!(Layout::packed(), Layout::new(0, 1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
  start: usize,
  step: usize,
}

impl Layout {
  /// `step` must be non-null (a null step would alias every element).
  pub const fn new(start: usize, step: usize) -> Layout {
    assert!(step > 0, "null layout step");
    Layout { start, step }
  }

  /// Contiguous storage starting at index 0.
  pub const fn packed() -> Layout {
    Layout { start: 0, step: 1 }
  }

  /// Slice index of logical element `i`.
  #[inline]
  pub(crate) const fn at(&self, i: usize) -> usize {
    self.start + i * self.step
  }

  /// Number of slice elements needed to address `n` logical elements.
  pub(crate) const fn required_len(&self, n: usize) -> usize {
    if n == 0 {
      0
    } else {
      self.start + (n - 1) * self.step + 1
    }
  }
}

impl Default for Layout {
  fn default() -> Self {
    Layout::packed()
  }
}

/// How the longitude-like and latitude-like input arrays pair up into
/// output cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pairing {
  /// Full cross product: `n_lng * n_lat` output cells, the longitude index
  /// varying fastest.
  Grid { n_lng: usize, n_lat: usize },
  /// A single latitude-like value reused against `n_lng` longitude-like
  /// values; `n_lng` output cells.
  Broadcast { n_lng: usize },
  /// Element `i` of one array pairs with element `i` of the other;
  /// `n` output cells. No crossed pairing.
  Diagonal { n: usize },
}

/// The three pairing modes reduced to one row/column walk:
/// cell `(row i, column j)` reads latitude input `i` and longitude input
/// `(i * n_inner + j) % lng_cycle`, and writes output `i * n_inner + j`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Iteration {
  /// Cells per latitude row.
  pub n_inner: usize,
  /// Number of latitude rows (also the latitude input count).
  pub n_rows: usize,
  /// Longitude input count, and the cycle of the longitude index.
  pub lng_cycle: usize,
  /// Rows sharing one longitude column (1 in diagonal mode, where each row
  /// owns its own longitude value).
  pub col_rows: usize,
}

impl Pairing {
  pub(crate) fn iteration(&self) -> Iteration {
    match *self {
      Pairing::Grid { n_lng, n_lat } => Iteration {
        n_inner: n_lng,
        n_rows: n_lat,
        lng_cycle: n_lng,
        col_rows: n_lat,
      },
      Pairing::Broadcast { n_lng } => Iteration {
        n_inner: n_lng,
        n_rows: 1,
        lng_cycle: n_lng,
        col_rows: 1,
      },
      Pairing::Diagonal { n } => Iteration {
        n_inner: 1,
        n_rows: n,
        lng_cycle: n,
        col_rows: 1,
      },
    }
  }

  /// Number of output cells the pairing produces.
  pub fn n_out(&self) -> usize {
    let it = self.iteration();
    it.n_inner * it.n_rows
  }
}

pub(crate) fn check_input(
  name: &'static str,
  data: &[f64],
  layout: Layout,
  n: usize,
) -> Result<(), Error> {
  let expected = layout.required_len(n);
  if data.len() < expected {
    Err(Error::InputTooShort {
      name,
      expected,
      actual: data.len(),
    })
  } else {
    Ok(())
  }
}

pub(crate) fn check_output(
  name: &'static str,
  data: &[f64],
  layout: Layout,
  n: usize,
) -> Result<(), Error> {
  let expected = layout.required_len(n);
  if data.len() < expected {
    Err(Error::OutputTooShort {
      name,
      expected,
      actual: data.len(),
    })
  } else {
    Ok(())
  }
}
