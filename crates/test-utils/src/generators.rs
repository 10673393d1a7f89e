//! Deterministic data generators.
//!
//! Values encode where they came from so tests can check that extraction
//! put every value in the right place.

/// Value encoding `(time, slot, point)`: `1000 * t + 100 * slot + point`.
///
/// ```
/// use test_utils::encoded_value;
///
/// assert_eq!(encoded_value(1, 2, 3), 1203.0);
/// ```
pub fn encoded_value(t: usize, slot: usize, point: usize) -> f64 {
    (1000 * t + 100 * slot + point) as f64
}

/// Flat snapshot of `nslots` blocks of `npoints` encoded values for time 0.
pub fn slot_blocks(npoints: usize, nslots: usize) -> Vec<f64> {
    (0..nslots)
        .flat_map(|s| (0..npoints).map(move |k| encoded_value(0, s, k)))
        .collect()
}

/// Rows of encoded values, one row per time step, `width` values each.
pub fn encoded_rows(ntimes: usize, width: usize) -> Vec<Vec<f64>> {
    (0..ntimes)
        .map(|t| (0..width).map(|k| encoded_value(t, 0, k)).collect())
        .collect()
}

/// Temperature-like series in Kelvin: a diurnal cycle around 280 K with a
/// per-point offset.
pub fn temperature_series(ntimes: usize, npoints: usize) -> Vec<Vec<f64>> {
    (0..ntimes)
        .map(|t| {
            let phase = (t as f64 / 24.0) * std::f64::consts::TAU;
            (0..npoints)
                .map(|k| 280.0 + 5.0 * phase.sin() + k as f64 * 0.1)
                .collect()
        })
        .collect()
}

/// Linear function of lon/lat, reproduced exactly by bilinear weights.
pub fn linear_field(lons: &[f64], lats: &[f64]) -> Vec<f64> {
    lons.iter()
        .zip(lats)
        .map(|(lon, lat)| 2.0 * lon + 3.0 * lat + 1.0)
        .collect()
}

/// Replace every `stride`-th value with the model's missing-value sentinel.
pub fn with_sentinels(mut values: Vec<f64>, stride: usize) -> Vec<f64> {
    for v in values.iter_mut().step_by(stride.max(1)) {
        *v = 1.0e20;
    }
    values
}
