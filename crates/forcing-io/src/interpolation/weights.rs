//! Interpolation weight computation.
//!
//! Weights are sparse: each target point keeps a short list of
//! `(source point, weight)` pairs. Zero weights are never stored, so a
//! degenerate cell (single row or column) only references points that exist.

use tracing::warn;

use crate::error::{ForcingError, Result};
use crate::geometry::GeometryModel;

/// Relative tolerance when testing whether a target lies on the grid.
const EDGE_TOLERANCE: f64 = 1e-9;

/// Sparse remapping weights from a source to a target geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolationWeights {
    source_points: usize,
    rows: Vec<Vec<(usize, f64)>>,
    flagged: Vec<usize>,
}

impl InterpolationWeights {
    fn new(source_points: usize, rows: Vec<Vec<(usize, f64)>>, flagged: Vec<usize>) -> Self {
        Self {
            source_points,
            rows,
            flagged,
        }
    }

    /// One-to-one weights between structurally equal geometries.
    pub fn identity(source: &GeometryModel, target: &GeometryModel) -> Result<Self> {
        if source != target {
            return Err(ForcingError::geometry_mismatch(format!(
                "identity interpolation from {} to {}",
                source, target
            )));
        }
        let n = source.npoints();
        Ok(Self::new(n, (0..n).map(|k| vec![(k, 1.0)]).collect(), Vec::new()))
    }

    /// Nearest source point for every target point.
    pub fn nearest(source: &GeometryModel, target: &GeometryModel) -> Self {
        let search = NeighbourSearch::new(source);
        let rows = (0..target.npoints())
            .map(|k| {
                let (lon, lat) = target.lonlat(k);
                vec![(search.nearest_index(lon, lat), 1.0)]
            })
            .collect();
        Self::new(source.npoints(), rows, Vec::new())
    }

    /// Bilinear weights on structured unmasked sources, inverse-distance
    /// weights of `neighbours` points otherwise.
    ///
    /// Targets outside the source domain get nearest-neighbour weights and
    /// are listed in [`flagged`](Self::flagged).
    pub fn linear(source: &GeometryModel, target: &GeometryModel, neighbours: usize) -> Self {
        let search = NeighbourSearch::new(source);
        let bilinear = source.is_structured() && source.mask().is_none();

        let mut rows = Vec::with_capacity(target.npoints());
        let mut flagged = Vec::new();
        for k in 0..target.npoints() {
            let (lon, lat) = target.lonlat(k);
            let row = if bilinear {
                bilinear_weights(source, lon, lat)
            } else {
                search.inverse_distance(lon, lat, neighbours)
            };
            match row {
                Some(row) => rows.push(row),
                None => {
                    flagged.push(k);
                    rows.push(vec![(search.nearest_index(lon, lat), 1.0)]);
                }
            }
        }

        if !flagged.is_empty() {
            warn!(
                flagged = flagged.len(),
                targets = target.npoints(),
                source = %source,
                "Targets outside the source grid, using nearest neighbour"
            );
        }
        Self::new(source.npoints(), rows, flagged)
    }

    /// Number of source points the weights expect.
    pub fn source_points(&self) -> usize {
        self.source_points
    }

    /// Number of target points produced.
    pub fn target_points(&self) -> usize {
        self.rows.len()
    }

    /// Contributors of target point `k`.
    pub fn row(&self, k: usize) -> &[(usize, f64)] {
        &self.rows[k]
    }

    /// Target points that fell back to nearest neighbour.
    pub fn flagged(&self) -> &[usize] {
        &self.flagged
    }

    /// Remap one block of `source_points` values.
    ///
    /// A NaN contributor makes the target NaN.
    pub fn apply(&self, values: &[f64], out: &mut [f64]) {
        for (target, row) in out.iter_mut().zip(&self.rows) {
            let mut acc = 0.0;
            for &(k, w) in row {
                let v = values[k];
                if v.is_nan() {
                    acc = f64::NAN;
                    break;
                }
                acc += w * v;
            }
            *target = acc;
        }
    }
}

/// Bilinear cell weights, or `None` outside the grid.
fn bilinear_weights(source: &GeometryModel, lon: f64, lat: f64) -> Option<Vec<(usize, f64)>> {
    let (fi, fj) = source.fractional_index(lon, lat)?;
    let (i0, tx) = cell(fi, source.nlons())?;
    let (j0, ty) = cell(fj, source.nlats())?;

    let corners = [
        (i0, j0, (1.0 - tx) * (1.0 - ty)),
        (i0 + 1, j0, tx * (1.0 - ty)),
        (i0, j0 + 1, (1.0 - tx) * ty),
        (i0 + 1, j0 + 1, tx * ty),
    ];
    let row: Vec<(usize, f64)> = corners
        .iter()
        .filter(|(_, _, w)| *w != 0.0)
        .filter_map(|&(x, y, w)| source.point_index(x, y).map(|k| (k, w)))
        .collect();
    if row.is_empty() {
        None
    } else {
        Some(row)
    }
}

/// Lower cell index and fraction along one axis of `n` points.
fn cell(f: f64, n: usize) -> Option<(usize, f64)> {
    let last = n.saturating_sub(1) as f64;
    let tol = EDGE_TOLERANCE * last.max(1.0);
    if !f.is_finite() || f < -tol || f > last + tol {
        return None;
    }
    if n < 2 {
        return Some((0, 0.0));
    }
    let f = f.clamp(0.0, last);
    let i0 = (f.floor() as usize).min(n - 2);
    Some((i0, f - i0 as f64))
}

/// Source points in native coordinates, with structured shortcuts.
struct NeighbourSearch<'a> {
    source: &'a GeometryModel,
    native: Vec<(f64, f64)>,
    bounds: (f64, f64, f64, f64),
}

impl<'a> NeighbourSearch<'a> {
    fn new(source: &'a GeometryModel) -> Self {
        let native: Vec<(f64, f64)> = (0..source.npoints()).map(|k| source.native_point(k)).collect();
        let bounds = native.iter().fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(x0, y0, x1, y1), &(x, y)| (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        );
        Self {
            source,
            native,
            bounds,
        }
    }

    fn nearest_index(&self, lon: f64, lat: f64) -> usize {
        if self.source.mask().is_none() {
            if let Some((fi, fj)) = self.source.fractional_index(lon, lat) {
                let clamp = |f: f64, n: usize| {
                    let last = n.saturating_sub(1) as f64;
                    if f.is_finite() {
                        f.round().clamp(0.0, last) as usize
                    } else {
                        0
                    }
                };
                let x = clamp(fi, self.source.nlons());
                let y = clamp(fj, self.source.nlats());
                return y * self.source.nlons() + x;
            }
        }

        let (tx, ty) = self.source.to_native(lon, lat);
        let mut best = 0;
        let mut best_d = f64::INFINITY;
        for (k, &(x, y)) in self.native.iter().enumerate() {
            let d = (x - tx).powi(2) + (y - ty).powi(2);
            if d < best_d {
                best = k;
                best_d = d;
            }
        }
        best
    }

    /// Inverse-distance weights of the `n` nearest points, `None` outside
    /// the bounding box of the source points.
    fn inverse_distance(&self, lon: f64, lat: f64, n: usize) -> Option<Vec<(usize, f64)>> {
        let (tx, ty) = self.source.to_native(lon, lat);
        let (x0, y0, x1, y1) = self.bounds;
        let tol = EDGE_TOLERANCE * (x1 - x0).abs().max(y1 - y0).max(1.0);
        if tx < x0 - tol || tx > x1 + tol || ty < y0 - tol || ty > y1 + tol {
            return None;
        }

        let mut by_distance: Vec<(usize, f64)> = self
            .native
            .iter()
            .enumerate()
            .map(|(k, &(x, y))| (k, ((x - tx).powi(2) + (y - ty).powi(2)).sqrt()))
            .collect();
        by_distance.sort_by(|a, b| a.1.total_cmp(&b.1));
        by_distance.truncate(n.max(1));

        if let Some(&(k, d)) = by_distance.first() {
            if d == 0.0 {
                return Some(vec![(k, 1.0)]);
            }
        }
        let total: f64 = by_distance.iter().map(|(_, d)| 1.0 / d).sum();
        Some(
            by_distance
                .into_iter()
                .map(|(k, d)| (k, (1.0 / d) / total))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GridDefinition;

    fn reg(nlon: usize, nlat: usize) -> GeometryModel {
        GeometryModel::new(GridDefinition::LonLatReg {
            lonmin: 0.0,
            latmin: 0.0,
            lonmax: (nlon - 1) as f64,
            latmax: (nlat - 1) as f64,
            nlon,
            nlat,
        })
        .unwrap()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_identity_requires_equal_geometry() {
        let err = InterpolationWeights::identity(&reg(2, 2), &reg(3, 2)).unwrap_err();
        assert!(matches!(err, ForcingError::GeometryMismatch(_)));
        let w = InterpolationWeights::identity(&reg(2, 2), &reg(2, 2)).unwrap();
        assert_eq!(w.row(3), &[(3, 1.0)]);
    }

    #[test]
    fn test_nearest_on_structured_grid() {
        let source = reg(3, 3);
        let target = GeometryModel::points(vec![0.4, 1.6, 10.0], vec![1.7, 0.2, -5.0]).unwrap();
        let w = InterpolationWeights::nearest(&source, &target);
        assert_eq!(w.row(0), &[(2 * 3, 1.0)]);
        assert_eq!(w.row(1), &[(2, 1.0)]);
        // clamped to the last column, first row
        assert_eq!(w.row(2), &[(2, 1.0)]);
    }

    #[test]
    fn test_nearest_on_points() {
        let source = GeometryModel::points(vec![0.0, 5.0, 10.0], vec![0.0, 5.0, 0.0]).unwrap();
        let target = GeometryModel::points(vec![9.0, 4.0], vec![1.0, 4.0]).unwrap();
        let w = InterpolationWeights::nearest(&source, &target);
        assert_eq!(w.row(0), &[(2, 1.0)]);
        assert_eq!(w.row(1), &[(1, 1.0)]);
    }

    #[test]
    fn test_bilinear_weights() {
        let source = reg(3, 2);
        let target = GeometryModel::points(vec![0.5, 2.0], vec![0.25, 1.0]).unwrap();
        let w = InterpolationWeights::linear(&source, &target, 4);
        assert!(w.flagged().is_empty());

        let row = w.row(0);
        assert_eq!(row.len(), 4);
        let total: f64 = row.iter().map(|(_, w)| w).sum();
        assert!(approx(total, 1.0));

        let mut values = vec![0.0; 6];
        // f(x, y) = x + 10 y is reproduced exactly
        for k in 0..6 {
            values[k] = (k % 3) as f64 + 10.0 * (k / 3) as f64;
        }
        let mut out = vec![0.0; 2];
        w.apply(&values, &mut out);
        assert!(approx(out[0], 0.5 + 2.5));
        // corner point uses a single weight
        assert_eq!(w.row(1), &[(5, 1.0)]);
        assert!(approx(out[1], 12.0));
    }

    #[test]
    fn test_linear_outside_falls_back_to_nearest() {
        let source = reg(2, 2);
        let target = GeometryModel::points(vec![0.5, 3.0], vec![0.5, 0.9]).unwrap();
        let w = InterpolationWeights::linear(&source, &target, 4);
        assert_eq!(w.flagged(), &[1]);
        assert_eq!(w.row(1), &[(3, 1.0)]);
    }

    #[test]
    fn test_inverse_distance_on_points() {
        let source =
            GeometryModel::points(vec![0.0, 2.0, 0.0, 2.0], vec![0.0, 0.0, 2.0, 2.0]).unwrap();
        let target = GeometryModel::points(vec![1.0, 2.0], vec![1.0, 2.0]).unwrap();
        let w = InterpolationWeights::linear(&source, &target, 4);
        assert!(w.flagged().is_empty());
        for &(_, weight) in w.row(0) {
            assert!(approx(weight, 0.25));
        }
        assert_eq!(w.row(1), &[(3, 1.0)]);
    }

    #[test]
    fn test_nan_propagates() {
        let source = reg(2, 1);
        let target = GeometryModel::points(vec![0.5], vec![0.0]).unwrap();
        let w = InterpolationWeights::linear(&source, &target, 4);
        let mut out = vec![0.0];
        w.apply(&[1.0, f64::NAN], &mut out);
        assert!(out[0].is_nan());
        w.apply(&[1.0, 3.0], &mut out);
        assert!(approx(out[0], 2.0));
    }
}
