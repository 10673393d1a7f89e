//! YAML inputs for the inspector: reader configuration and target points.
//!
//! Both files support `${VAR}` and `${VAR:-default}` substitution before
//! parsing.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use forcing_io::{GeometryModel, ReaderConfig};
use serde::Deserialize;

/// Target point set, as `lons: [...]` / `lats: [...]`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TargetPoints {
    pub lons: Vec<f64>,
    pub lats: Vec<f64>,
}

impl TargetPoints {
    pub fn geometry(&self) -> Result<GeometryModel> {
        if self.lons.len() != self.lats.len() {
            bail!(
                "target points have {} longitudes but {} latitudes",
                self.lons.len(),
                self.lats.len()
            );
        }
        GeometryModel::points(self.lons.clone(), self.lats.clone())
            .context("Invalid target points")
    }
}

fn read_expanded(path: &Path, what: &str) -> Result<String> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} from {:?}", what, path))?;
    expand_env_vars(&content)
}

/// Load a [`ReaderConfig`]; absent keys keep their defaults.
pub fn load_reader_config<P: AsRef<Path>>(path: P) -> Result<ReaderConfig> {
    let path = path.as_ref();
    let content = read_expanded(path, "reader config")?;
    let config: ReaderConfig = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse reader config from {:?}", path))?;
    if let Err(msg) = config.validate() {
        bail!("Invalid reader config {:?}: {}", path, msg);
    }
    Ok(config)
}

/// Load target points.
pub fn load_target_points<P: AsRef<Path>>(path: P) -> Result<TargetPoints> {
    let path = path.as_ref();
    let content = read_expanded(path, "target points")?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse target points from {:?}", path))
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

fn expand_env_vars(content: &str) -> Result<String> {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = match after.find('}') {
            Some(end) => end,
            None => bail!("Unclosed variable substitution in '{}'", rest),
        };
        out.push_str(&resolve_var_expr(&after[..end])?);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn resolve_var_expr(expr: &str) -> Result<String> {
    match expr.split_once(":-") {
        Some((name, default)) => match std::env::var(name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        },
        None => std::env::var(expr.trim())
            .with_context(|| format!("Environment variable {} not set", expr)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("FORCING_INSPECT_TILE", "NATURE");
        let out = expand_env_vars("default_tile: ${FORCING_INSPECT_TILE}\n").unwrap();
        assert_eq!(out, "default_tile: NATURE\n");
    }

    #[test]
    fn test_expand_env_vars_default_and_missing() {
        std::env::remove_var("FORCING_INSPECT_UNSET");
        let out = expand_env_vars("n: ${FORCING_INSPECT_UNSET:-8}").unwrap();
        assert_eq!(out, "n: 8");
        assert!(expand_env_vars("${FORCING_INSPECT_UNSET}").is_err());
        assert!(expand_env_vars("${OPEN").is_err());
    }

    #[test]
    fn test_load_reader_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reader.yaml");
        fs::write(&path, "linear_neighbours: 6\nweight_cache_entries: 2\n").unwrap();

        let config = load_reader_config(&path).unwrap();
        assert_eq!(config.linear_neighbours, 6);
        assert_eq!(config.weight_cache_entries, 2);
        assert_eq!(config.default_tile, "FULL");

        fs::write(&path, "linear_neighbours: 0\n").unwrap();
        assert!(load_reader_config(&path).is_err());
    }

    #[test]
    fn test_load_target_points() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.yaml");
        fs::write(&path, "lons: [10.0, 10.5]\nlats: [60.0, 60.25]\n").unwrap();

        let points = load_target_points(&path).unwrap();
        let geometry = points.geometry().unwrap();
        assert_eq!(geometry.npoints(), 2);
        assert_eq!(geometry.lonlat(1), (10.5, 60.25));

        let bad = TargetPoints {
            lons: vec![1.0],
            lats: vec![],
        };
        assert!(bad.geometry().is_err());
    }
}
