//! Progress reporting contract.
//!
//! Long operations take a `&mut dyn FnMut(Real, &str)` and call it with a ratio
//! in `0..=1` and a short status text. Reports are purely observational: a
//! callback can never change what an operation computes. The last report is
//! not guaranteed to be exactly `1.0`.

use crate::float_types::Real;

/// Callback receiving `(ratio, status)`.
pub type ProgressFn<'a> = dyn FnMut(Real, &str) + 'a;

/// A callback that discards every report.
pub fn no_progress() -> impl FnMut(Real, &str) {
    |_, _| {}
}

/// Map a child operation's `0..=1` range onto `start..start + span` of `parent`.
pub fn sub_range<'a>(
    parent: &'a mut ProgressFn<'_>,
    start: Real,
    span: Real,
) -> impl FnMut(Real, &str) + 'a {
    move |ratio, status| parent(start + span * ratio.clamp(0.0, 1.0), status)
}
