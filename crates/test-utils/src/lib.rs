//! Shared test utilities for the forcing workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Fixture writers for card decks, time-series text, NetCDF and native
//!   binary files
//! - Deterministic data generators
//! - Approximate float assertions
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{CardDeckBuilder, NetcdfFixture};
//! ```

pub mod fixtures;
pub mod generators;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f64, 1.0_f64, 0.001_f64);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Assert that two value slices agree, treating NaN as equal to NaN.
#[macro_export]
macro_rules! assert_values_eq {
    ($left:expr, $right:expr) => {{
        let left: Vec<f64> = $left.iter().copied().collect();
        let right: Vec<f64> = $right.iter().copied().collect();
        assert_eq!(left.len(), right.len(), "length mismatch");
        for (i, (a, b)) in left.iter().zip(right.iter()).enumerate() {
            if !(a == b || (a.is_nan() && b.is_nan())) {
                panic!("values differ at {}: {:?} != {:?}", i, a, b);
            }
        }
    }};
}
