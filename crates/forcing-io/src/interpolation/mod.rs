//! Remapping of extracted fields onto another geometry.

mod cache;
mod weights;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ReaderConfig;
use crate::error::{ForcingError, Result};
use crate::field::RawField;
use crate::geometry::GeometryModel;

pub use cache::{CacheStats, WeightCache, WeightKey};
pub use weights::InterpolationWeights;

/// Interpolation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationMethod {
    Nearest,
    Linear,
    Identity,
}

impl InterpolationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterpolationMethod::Nearest => "nearest",
            InterpolationMethod::Linear => "linear",
            InterpolationMethod::Identity => "none",
        }
    }
}

impl FromStr for InterpolationMethod {
    type Err = ForcingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "nearest" => Ok(InterpolationMethod::Nearest),
            "linear" | "bilinear" => Ok(InterpolationMethod::Linear),
            "none" | "identity" => Ok(InterpolationMethod::Identity),
            _ => Err(ForcingError::UnknownInterpolation(s.to_string())),
        }
    }
}

impl fmt::Display for InterpolationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Weights bound to a source and target geometry.
#[derive(Debug, Clone)]
pub struct Interpolator {
    method: InterpolationMethod,
    source: GeometryModel,
    target: GeometryModel,
    weights: Arc<InterpolationWeights>,
}

impl Interpolator {
    /// Build (or fetch from `cache`) the weights from `source` to `target`.
    pub fn new(
        method: InterpolationMethod,
        source: &GeometryModel,
        target: &GeometryModel,
        cache: Option<&mut WeightCache>,
        config: &ReaderConfig,
    ) -> Result<Self> {
        let compute = || match method {
            InterpolationMethod::Identity => InterpolationWeights::identity(source, target),
            InterpolationMethod::Nearest => Ok(InterpolationWeights::nearest(source, target)),
            InterpolationMethod::Linear => Ok(InterpolationWeights::linear(
                source,
                target,
                config.linear_neighbours,
            )),
        };

        let weights = match cache {
            Some(cache) => {
                let key = WeightKey::new(source.identity(), target.identity(), method);
                cache.get_or_compute(key, compute)?
            }
            None => Arc::new(compute()?),
        };
        debug!(
            method = %method,
            source = %source,
            target = %target,
            "Prepared interpolation"
        );

        Ok(Self {
            method,
            source: source.clone(),
            target: target.clone(),
            weights,
        })
    }

    pub fn method(&self) -> InterpolationMethod {
        self.method
    }

    pub fn source(&self) -> &GeometryModel {
        &self.source
    }

    pub fn target(&self) -> &GeometryModel {
        &self.target
    }

    pub fn weights(&self) -> &InterpolationWeights {
        &self.weights
    }

    /// Target points that fell back to nearest neighbour.
    pub fn flagged_points(&self) -> &[usize] {
        self.weights.flagged()
    }

    /// Remap every row and every patch/layer block of `field`.
    pub fn interpolate(&self, field: &RawField) -> Result<RawField> {
        let n_src = self.weights.source_points();
        let n_dst = self.weights.target_points();
        let (ntimes, width) = field.shape();
        if width == 0 || width % n_src != 0 {
            return Err(ForcingError::PointCountMismatch {
                got: width,
                expected: n_src,
            });
        }
        let nblocks = width / n_src;

        let mut out = Array2::<f64>::zeros((ntimes, nblocks * n_dst));
        let mut dst = vec![0.0; n_dst];
        for t in 0..ntimes {
            for b in 0..nblocks {
                let src = field.slot(t, b, n_src);
                self.weights.apply(&src, &mut dst);
                for (k, v) in dst.iter().enumerate() {
                    out[[t, b * n_dst + k]] = *v;
                }
            }
        }
        RawField::new(field.times().to_vec(), out)
    }
}
