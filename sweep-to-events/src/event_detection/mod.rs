pub mod analysis;
pub mod datatype;
pub mod detectors;
pub mod differentiator;
pub mod iterators;
pub mod template;
pub(crate) mod window;

pub use ephys_common::Real;
pub use iterators::{EventFilter, EventIter};
pub use window::SmoothingWindowSize;

/// Index and value of the first maximum, ignoring `NaN`.
pub(crate) fn first_argmax(values: &[Real]) -> Option<(usize, Real)> {
    values
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, v)| match best {
            Some((_, b)) if !(v > b) => best,
            _ if v.is_nan() => best,
            _ => Some((i, v)),
        })
}

/// Index and value of the first minimum, ignoring `NaN`.
pub(crate) fn first_argmin(values: &[Real]) -> Option<(usize, Real)> {
    values
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, v)| match best {
            Some((_, b)) if !(v < b) => best,
            _ if v.is_nan() => best,
            _ => Some((i, v)),
        })
}
