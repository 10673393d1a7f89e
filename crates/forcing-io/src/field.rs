//! Extracted field values.

use chrono::{DateTime, Utc};
use ndarray::{s, Array1, Array2, Axis};

use crate::error::{ForcingError, Result};

/// Missing-value marker written by the surface model.
pub const MISSING_SENTINEL: f64 = 1.0e20;

/// Map the missing-value sentinel (in f64 or f32 precision) to NaN.
#[inline]
pub fn canonicalize_missing(value: f64) -> f64 {
    if value == MISSING_SENTINEL || value == (MISSING_SENTINEL as f32) as f64 {
        f64::NAN
    } else {
        value
    }
}

/// A `[time, point]` field.
///
/// The point axis holds `npoints * nsub` columns with sub-point slots
/// (patches/layers) outermost: column `s * npoints + k` is slot `s` of
/// point `k`. Missing values are NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct RawField {
    times: Vec<DateTime<Utc>>,
    values: Array2<f64>,
}

impl RawField {
    /// Wrap a value array.
    ///
    /// `times` is either empty (no validity time known) or has one entry
    /// per row.
    pub fn new(times: Vec<DateTime<Utc>>, values: Array2<f64>) -> Result<Self> {
        if !times.is_empty() && times.len() != values.nrows() {
            return Err(ForcingError::invalid_format(format!(
                "{} timestamps for {} rows",
                times.len(),
                values.nrows()
            )));
        }
        Ok(Self { times, values })
    }

    /// Single-row field from raw values, with the sentinel canonicalized.
    pub fn single(time: Option<DateTime<Utc>>, values: Vec<f64>) -> Self {
        let values = Array1::from_iter(values.into_iter().map(canonicalize_missing))
            .insert_axis(Axis(0));
        Self {
            times: time.into_iter().collect(),
            values,
        }
    }

    /// Gather slots from a flat snapshot laid out as `nslots` blocks of
    /// `npoints` values.
    ///
    /// An empty `slots` keeps every block.
    pub fn from_slots(
        time: Option<DateTime<Utc>>,
        values: &[f64],
        npoints: usize,
        slots: &[usize],
    ) -> Result<Self> {
        if npoints == 0 || values.len() % npoints != 0 {
            return Err(ForcingError::PointCountMismatch {
                got: values.len(),
                expected: npoints * slots.len().max(1),
            });
        }
        let nslots = values.len() / npoints;
        let selected: Vec<usize> = if slots.is_empty() {
            (0..nslots).collect()
        } else {
            slots.to_vec()
        };

        let mut out = Vec::with_capacity(selected.len() * npoints);
        for &slot in &selected {
            if slot >= nslots {
                return Err(ForcingError::InvalidSelection {
                    axis: "patch",
                    index: slot,
                    len: nslots,
                });
            }
            out.extend_from_slice(&values[slot * npoints..(slot + 1) * npoints]);
        }
        Ok(Self::single(time, out))
    }

    pub fn times(&self) -> &[DateTime<Utc>] {
        &self.times
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn into_values(self) -> Array2<f64> {
        self.values
    }

    /// `(ntimes, width)`.
    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn ntimes(&self) -> usize {
        self.values.nrows()
    }

    /// Length of the point axis (`npoints * nsub`).
    pub fn width(&self) -> usize {
        self.values.ncols()
    }

    /// Values of row `t`, slot `s`, for a geometry with `npoints` points.
    pub fn slot(&self, t: usize, s: usize, npoints: usize) -> Vec<f64> {
        self.values
            .slice(s![t, s * npoints..(s + 1) * npoints])
            .to_vec()
    }

    /// Count of non-missing values.
    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_nan()).count()
    }

    /// Min/max/mean over non-missing values, if any.
    pub fn stats(&self) -> Option<(f64, f64, f64)> {
        let mut n = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &v in self.values.iter().filter(|v| !v.is_nan()) {
            n += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }
        if n == 0 {
            None
        } else {
            Some((min, max, sum / n as f64))
        }
    }

    /// Exact equality that treats NaN as equal to NaN.
    pub fn same_values(&self, other: &RawField) -> bool {
        self.times == other.times
            && self.values.dim() == other.values.dim()
            && self
                .values
                .iter()
                .zip(other.values.iter())
                .all(|(a, b)| a == b || (a.is_nan() && b.is_nan()))
    }
}
