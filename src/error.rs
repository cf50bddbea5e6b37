use thiserror::Error;

/// Errors a transform can return before any computation starts.
/// The rotation itself is infallible: every in-range cell gets a
/// geometrically defined value.
#[derive(Error, Debug)]
pub enum Error {
  #[error("input buffer '{name:}' too short. Expected: >= {expected:}. Actual: {actual:}.")]
  InputTooShort {
    name: &'static str,
    expected: usize,
    actual: usize,
  },
  #[error("output buffer '{name:}' too short. Expected: >= {expected:}. Actual: {actual:}.")]
  OutputTooShort {
    name: &'static str,
    expected: usize,
    actual: usize,
  },
  #[error("coordinate buffers '{name1:}' and '{name2:}' differ in length: {len1:} != {len2:}.")]
  LengthMismatch {
    name1: &'static str,
    name2: &'static str,
    len1: usize,
    len2: usize,
  },
}
