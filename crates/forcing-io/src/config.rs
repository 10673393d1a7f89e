//! Configuration for forcing readers and interpolation.

use serde::{Deserialize, Serialize};

/// Sphere radius for rebuilding a `CONF PROJ` grid centre from its stored
/// corner (meters). This is the forcing tools' value, not the model's
/// [`projection::EARTH_RADIUS`].
pub const CONF_PROJ_EARTH_RADIUS: f64 = 6.37122e6;

/// Configuration shared by every reader opened through [`crate::SurfexFile`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Tile used for card-deck and native-binary lookups when none is given.
    pub default_tile: String,

    /// Sphere radius for conformal (`CONF PROJ`) grids, in meters.
    /// Defaults to [`CONF_PROJ_EARTH_RADIUS`].
    pub earth_radius: f64,

    /// Neighbour count for inverse-distance blending on unstructured sources.
    pub linear_neighbours: usize,

    /// Maximum number of weight sets kept by a [`crate::WeightCache`].
    pub weight_cache_entries: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            default_tile: "FULL".to_string(),
            earth_radius: CONF_PROJ_EARTH_RADIUS,
            linear_neighbours: 4,
            weight_cache_entries: 64,
        }
    }
}

impl ReaderConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("FORCING_DEFAULT_TILE") {
            config.default_tile = val;
        }

        if let Ok(val) = std::env::var("FORCING_EARTH_RADIUS") {
            if let Ok(radius) = val.parse() {
                config.earth_radius = radius;
            }
        }

        if let Ok(val) = std::env::var("FORCING_LINEAR_NEIGHBOURS") {
            if let Ok(n) = val.parse() {
                config.linear_neighbours = n;
            }
        }

        if let Ok(val) = std::env::var("FORCING_WEIGHT_CACHE_ENTRIES") {
            if let Ok(n) = val.parse() {
                config.weight_cache_entries = n;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.default_tile.trim_start_matches('&').is_empty() {
            return Err("default_tile must not be empty".to_string());
        }

        if !(self.earth_radius.is_finite() && self.earth_radius > 0.0) {
            return Err("earth_radius must be a positive number".to_string());
        }

        if self.linear_neighbours == 0 {
            return Err("linear_neighbours must be > 0".to_string());
        }

        if self.weight_cache_entries == 0 {
            return Err("weight_cache_entries must be > 0".to_string());
        }

        Ok(())
    }

    /// Default tile as a header token (`&FULL`).
    pub fn tile_token(&self) -> String {
        tile_token(&self.default_tile)
    }
}

/// Normalise a tile name to its header form with a leading `&`.
pub fn tile_token(tile: &str) -> String {
    if tile.starts_with('&') {
        tile.to_string()
    } else {
        format!("&{}", tile)
    }
}
