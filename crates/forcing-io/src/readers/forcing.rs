//! Forcing archives (`FORCING.nc`, `Forc_*.nc`).
//!
//! Forcing files store point series: `LON`/`LAT`/`ZS` per point and
//! `(time, Number_of_points)` fields such as `Tair` or `Rainf`.

use std::path::Path;

use tracing::info;

use super::dimensions::{AxisRole, DimensionMapper};
use super::netcdf::NetcdfDataset;
use crate::error::{ForcingError, Result};
use crate::field::RawField;
use crate::geometry::GeometryModel;
use crate::variable::VariableDescriptor;

#[derive(Debug)]
pub struct ForcingArchiveFile {
    dataset: NetcdfDataset,
    geometry: GeometryModel,
}

impl ForcingArchiveFile {
    /// Open a forcing archive.
    ///
    /// Without a supplied geometry the point set is read from `LON`/`LAT`.
    pub fn open(path: &Path, geometry: Option<GeometryModel>) -> Result<Self> {
        let dataset = NetcdfDataset::open(path)?;
        let geometry = match geometry {
            Some(geometry) => geometry,
            None => {
                let lons = dataset.floats("LON")?;
                let lats = dataset.floats("LAT")?;
                if lons.is_empty() || lats.is_empty() {
                    return Err(ForcingError::MissingGeometry(path.display().to_string()));
                }
                GeometryModel::points(lons, lats)?
            }
        };
        info!(file = %path.display(), geometry = %geometry, "Opened forcing archive");
        Ok(Self { dataset, geometry })
    }

    pub fn path(&self) -> &Path {
        self.dataset.path()
    }

    pub fn geometry(&self) -> &GeometryModel {
        &self.geometry
    }

    /// Extract a forcing variable.
    ///
    /// Time-less variables (scalars, per-point constants) are returned whole
    /// as a single row. Timed variables are matched at hour resolution.
    pub fn field(&self, var: &VariableDescriptor) -> Result<RawField> {
        let axes = self.dataset.axes(&var.name)?;
        let timed = axes
            .iter()
            .any(|(name, _)| AxisRole::classify(name) == Some(AxisRole::Time));
        if !timed {
            let values = self.dataset.values(&var.name)?;
            return Ok(RawField::single(None, values.into_iter().collect()));
        }

        let mapper = DimensionMapper::new(&var.name, &axes)?;
        self.dataset.read_mapped(&mapper, var, &self.geometry, None)
    }
}
