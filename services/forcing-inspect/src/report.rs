//! JSON report printed by the inspector.

use chrono::{DateTime, Utc};
use forcing_io::{
    CacheStats, ContainerFormat, ContentKind, GeometrySummary, InterpolationMethod, Interpolator,
    RawField, SurfexFile,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Report {
    pub file: String,
    pub kind: ContentKind,
    pub format: ContainerFormat,
    pub geometry: GeometrySummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<FieldReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interpolation: Option<InterpolationReport>,
}

impl Report {
    pub fn new(file: &SurfexFile) -> Self {
        Self {
            file: file.path().display().to_string(),
            kind: file.kind(),
            format: file.format(),
            geometry: file.geometry().summary(),
            field: None,
            interpolation: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FieldReport {
    pub variable: String,
    pub ntimes: usize,
    pub width: usize,
    pub times: Vec<DateTime<Utc>>,
    pub valid: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    /// One row per time step; missing values serialize as `null`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Vec<f64>>>,
}

impl FieldReport {
    pub fn new(variable: &str, field: &RawField, with_values: bool) -> Self {
        let stats = field.stats();
        Self {
            variable: variable.to_string(),
            ntimes: field.ntimes(),
            width: field.width(),
            times: field.times().to_vec(),
            valid: field.valid_count(),
            min: stats.map(|s| s.0),
            max: stats.map(|s| s.1),
            mean: stats.map(|s| s.2),
            values: with_values.then(|| {
                field
                    .values()
                    .rows()
                    .into_iter()
                    .map(|row| row.to_vec())
                    .collect()
            }),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InterpolationReport {
    pub method: InterpolationMethod,
    pub target_points: usize,
    pub flagged: Vec<usize>,
    pub cache: CacheStats,
}

impl InterpolationReport {
    pub fn new(interpolator: &Interpolator, cache: CacheStats) -> Self {
        Self {
            method: interpolator.method(),
            target_points: interpolator.target().npoints(),
            flagged: interpolator.flagged_points().to_vec(),
            cache,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_report() {
        let field = RawField::single(None, vec![1.0, 1.0e20, 3.0]);
        let report = FieldReport::new("SST", &field, true);
        assert_eq!(report.width, 3);
        assert_eq!(report.valid, 2);
        assert_eq!(report.mean, Some(2.0));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["values"][0][1], serde_json::Value::Null);
        assert_eq!(json["min"], 1.0);
    }

    #[test]
    fn test_values_omitted_by_default() {
        let field = RawField::single(None, vec![f64::NAN]);
        let report = FieldReport::new("SST", &field, false);
        assert_eq!(report.min, None);
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("values").is_none());
    }
}
