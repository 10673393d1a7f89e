//! NetCDF (self-describing array) files.
//!
//! [`NetcdfDataset`] wraps an open file and provides the shared pieces:
//! grid parameters, time-coordinate decoding, validity dates and mapped
//! variable extraction. [`NetcdfSurfexFile`] is the state/time-series reader
//! built on it; the forcing archive reader lives in `forcing.rs`.

use std::path::{Path, PathBuf};
use std::sync::Once;

use chrono::{DateTime, Utc};
use ndarray::{ArrayD, IxDyn};
use netcdf::AttributeValue;
use tracing::{debug, info};

use super::dimensions::{AxisRole, AxisSelection, DimensionMapper};
use super::{check_snapshot_time, resolve_geometry};
use crate::config::ReaderConfig;
use crate::error::{ForcingError, Result};
use crate::field::RawField;
use crate::geometry::{reconstruct, GeometryModel, GridParameters, ParameterConvention};
use crate::time::{decode_times, from_date_and_seconds, match_hourly};
use crate::variable::VariableDescriptor;

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints diagnostics even for errors handled on the Rust
/// side (e.g. probing optional attributes). Safe to call repeatedly.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and null handlers are a
        // documented way to disable error output.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

/// Helper to get a string attribute.
fn get_string_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}

/// An open NetCDF file.
pub struct NetcdfDataset {
    path: PathBuf,
    file: netcdf::File,
}

impl std::fmt::Debug for NetcdfDataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetcdfDataset").field("path", &self.path).finish()
    }
}

impl NetcdfDataset {
    pub fn open(path: &Path) -> Result<Self> {
        silence_hdf5_errors();
        let file = netcdf::open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn variable(&self, name: &str) -> Result<netcdf::Variable<'_>> {
        self.file
            .variable(name)
            .ok_or_else(|| ForcingError::VariableNotFound(name.to_string()))
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.file.variable(name).is_some()
    }

    /// Declared `(name, length)` axes of a variable in file order.
    pub fn axes(&self, name: &str) -> Result<Vec<(String, usize)>> {
        let var = self.variable(name)?;
        Ok(var
            .dimensions()
            .iter()
            .map(|d| (d.name(), d.len()))
            .collect())
    }

    /// All values of a variable, shaped as its axes.
    pub fn values(&self, name: &str) -> Result<ArrayD<f64>> {
        let var = self.variable(name)?;
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        let data = var.get_values::<f64, _>(..)?;
        ArrayD::from_shape_vec(IxDyn(&shape), data)
            .map_err(|e| ForcingError::invalid_format(format!("{}: {}", name, e)))
    }

    /// Decoded time coordinate named `axis`.
    pub fn times(&self, axis: &str) -> Result<Vec<DateTime<Utc>>> {
        let var = self.variable(axis).map_err(|_| {
            ForcingError::InvalidTimeUnits(format!("no coordinate variable for axis '{}'", axis))
        })?;
        let units = get_string_attr(&var, "units").ok_or_else(|| {
            ForcingError::InvalidTimeUnits(format!("'{}' has no units attribute", axis))
        })?;
        let calendar = get_string_attr(&var, "calendar");
        let offsets = var.get_values::<f64, _>(..)?;
        decode_times(&offsets, &units, calendar.as_deref())
    }

    fn first_float(&self, name: &str) -> Result<Option<f64>> {
        Ok(self.floats(name)?.first().copied())
    }

    /// Validity date from `DTCUR-YEAR/MONTH/DAY/TIME`, if present.
    pub fn validity_time(&self) -> Result<Option<DateTime<Utc>>> {
        let parts = (
            self.first_float("DTCUR-YEAR")?,
            self.first_float("DTCUR-MONTH")?,
            self.first_float("DTCUR-DAY")?,
            self.first_float("DTCUR-TIME")?,
        );
        match parts {
            (Some(y), Some(m), Some(d), Some(s)) => {
                Ok(from_date_and_seconds(y as i64, m as i64, d as i64, s))
            }
            _ => Ok(None),
        }
    }

    /// Bind a variable's axes to canonical roles.
    pub fn mapper(&self, name: &str) -> Result<DimensionMapper> {
        DimensionMapper::new(name, &self.axes(name)?)
    }

    /// Extract a mapped variable as `[time, npoints * nsub]`.
    ///
    /// Variables without a time axis produce one row stamped with
    /// `untimed` when given.
    pub fn read_mapped(
        &self,
        mapper: &DimensionMapper,
        var: &VariableDescriptor,
        geometry: &GeometryModel,
        untimed: Option<DateTime<Utc>>,
    ) -> Result<RawField> {
        let (times, time_indices) = match mapper.binding(AxisRole::Time) {
            Some(binding) => {
                let available = self.times(&binding.name)?;
                let indices = match_hourly(&available, &var.valid_times)?;
                debug!(variable = %var.name, indices = ?indices, "Matched time indices");
                (indices.iter().map(|&i| available[i]).collect(), Some(indices))
            }
            None => (untimed.into_iter().collect(), None),
        };

        let selection = AxisSelection {
            times: time_indices,
            patches: var.patches.clone(),
            layers: var.layers.clone(),
        };
        let canonical = mapper.canonicalize(self.values(mapper.variable())?, &selection)?;
        let flat = DimensionMapper::flatten(&canonical, geometry, &selection)?;
        RawField::new(times, flat)
    }
}

impl GridParameters for NetcdfDataset {
    fn grid_type(&mut self) -> Result<Option<String>> {
        if let Some(attr) = self.file.attribute("GRID_TYPE") {
            if let AttributeValue::Str(s) = attr.value()? {
                return Ok(Some(s));
            }
        }
        // Some writers attach the tag to a scalar GRID_TYPE variable instead
        Ok(self
            .file
            .variable("GRID_TYPE")
            .and_then(|var| get_string_attr(&var, "value")))
    }

    fn floats(&mut self, name: &str) -> Result<Vec<f64>> {
        NetcdfDataset::floats(self, name)
    }

    fn integers(&mut self, name: &str) -> Result<Vec<i64>> {
        match self.file.variable(name) {
            Some(var) => Ok(var.get_values::<i64, _>(..)?),
            None => Ok(Vec::new()),
        }
    }
}

impl NetcdfDataset {
    /// Flattened values of a numeric variable, empty if absent.
    pub fn floats(&self, name: &str) -> Result<Vec<f64>> {
        match self.file.variable(name) {
            Some(var) => Ok(var.get_values::<f64, _>(..)?),
            None => Ok(Vec::new()),
        }
    }
}

/// State-snapshot or time-series NetCDF file.
#[derive(Debug)]
pub struct NetcdfSurfexFile {
    dataset: NetcdfDataset,
    geometry: GeometryModel,
}

impl NetcdfSurfexFile {
    /// Open the file and reconstruct its grid from `GRID_TYPE`, or use the
    /// supplied geometry for files that carry none.
    pub fn open(
        path: &Path,
        geometry: Option<GeometryModel>,
        config: &ReaderConfig,
    ) -> Result<Self> {
        let mut dataset = NetcdfDataset::open(path)?;
        let reconstructed = reconstruct(&mut dataset, ParameterConvention::SelfDescribing, config)?;
        let geometry = resolve_geometry(reconstructed, geometry, path)?;
        info!(file = %path.display(), geometry = %geometry, "Opened NetCDF file");
        Ok(Self { dataset, geometry })
    }

    pub fn path(&self) -> &Path {
        self.dataset.path()
    }

    pub fn geometry(&self) -> &GeometryModel {
        &self.geometry
    }

    pub fn dataset(&self) -> &NetcdfDataset {
        &self.dataset
    }

    pub fn field(&self, var: &VariableDescriptor) -> Result<RawField> {
        let mapper = self.dataset.mapper(&var.name)?;
        let untimed = if mapper.has(AxisRole::Time) {
            None
        } else {
            let validity = self.dataset.validity_time()?;
            check_snapshot_time(validity, &var.valid_times)?;
            validity
        };
        self.dataset
            .read_mapped(&mapper, var, &self.geometry, untimed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CONF_PROJ_EARTH_RADIUS;
    use crate::geometry::GridDefinition;
    use chrono::{Duration, TimeZone};
    use test_utils::{
        assert_approx_eq, assert_values_eq, linear_field, scratch_dir, temperature_series,
        NetcdfFixture,
    };

    fn open(path: &Path) -> NetcdfSurfexFile {
        NetcdfSurfexFile::open(path, None, &ReaderConfig::default()).unwrap()
    }

    #[test]
    fn test_conf_proj_centre_from_stored_corner() {
        let expected = GeometryModel::new(GridDefinition::conf_proj_from_corner(
            10.0,
            60.0,
            9.0,
            59.5,
            11,
            21,
            2500.0,
            2500.0,
            CONF_PROJ_EARTH_RADIUS,
        ))
        .unwrap();
        let zs = linear_field(expected.lons(), expected.lats());

        let dir = scratch_dir().unwrap();
        let path = NetcdfFixture::new()
            .attribute("GRID_TYPE", "CONF PROJ")
            .parameter("LON0", 10.0)
            .parameter("LAT0", 60.0)
            .parameter("LONORI", 9.0)
            .parameter("LATORI", 59.5)
            .parameter("IMAX", 11.0)
            .parameter("JMAX", 21.0)
            .parameter("DX", 2500.0)
            .parameter("DY", 2500.0)
            .dimension("xx", 11)
            .dimension("yy", 21)
            .variable("ZS", &["yy", "xx"], zs.clone())
            .write(dir.path(), "PGD.nc")
            .unwrap();

        let file = open(&path);
        let geometry = file.geometry();
        assert_eq!(geometry, &expected);
        assert_eq!(geometry.npoints(), 11 * 21);

        // Lower-left point is the stored corner, the middle cell the centre
        let (lon, lat) = geometry.lonlat(0);
        assert_approx_eq!(lon, 9.0, 1e-8);
        assert_approx_eq!(lat, 59.5, 1e-8);
        match geometry.definition() {
            GridDefinition::ConfProj {
                lonc,
                latc,
                earth_radius,
                ..
            } => {
                assert_eq!(*earth_radius, CONF_PROJ_EARTH_RADIUS);
                let (lon, lat) = geometry.lonlat(10 * 11 + 5);
                assert_approx_eq!(lon, *lonc, 1e-8);
                assert_approx_eq!(lat, *latc, 1e-8);
                assert!(*lonc > 9.0 && *latc > 59.5);
            }
            other => panic!("unexpected grid {:?}", other),
        }

        let field = file.field(&VariableDescriptor::new("ZS")).unwrap();
        assert_eq!(field.shape(), (1, 11 * 21));
        assert_values_eq!(field.values(), zs);
    }

    /// 2x2 grid stored as a point list, with a soil variable on two patches
    /// and three layers and a layer-only variable.
    fn soil_file(dir: &Path) -> PathBuf {
        let tsoil: Vec<f64> = (0..2)
            .flat_map(|p| {
                (0..3).flat_map(move |l| (0..4).map(move |k| (100 * p + 10 * l + k) as f64))
            })
            .collect();
        let wg: Vec<f64> = (0..3)
            .flat_map(|l| (0..4).map(move |k| (10 * l + k) as f64))
            .collect();
        NetcdfFixture::new()
            .lonlat_reg((0.0, 0.0, 1.0, 1.0), 2, 2)
            .dimension("Number_of_points", 4)
            .dimension("Number_of_Tile", 2)
            .dimension("Number_of_Layers", 3)
            .variable(
                "TSOIL",
                &["Number_of_Tile", "Number_of_Layers", "Number_of_points"],
                tsoil,
            )
            .variable("WG", &["Number_of_Layers", "Number_of_points"], wg)
            .write(dir, "PREP.nc")
            .unwrap()
    }

    #[test]
    fn test_layer_selection() {
        let dir = scratch_dir().unwrap();
        let file = open(&soil_file(dir.path()));

        let field = file
            .field(&VariableDescriptor::new("WG").with_layers(vec![1]))
            .unwrap();
        assert_eq!(field.shape(), (1, 4));
        assert_values_eq!(field.values(), [10.0, 11.0, 12.0, 13.0]);

        let field = file
            .field(&VariableDescriptor::new("WG").with_layers(vec![2, 0]))
            .unwrap();
        assert_eq!(field.shape(), (1, 8));
        assert_eq!(field.slot(0, 0, 4), vec![20.0, 21.0, 22.0, 23.0]);
        assert_eq!(field.slot(0, 1, 4), vec![0.0, 1.0, 2.0, 3.0]);

        let err = file
            .field(&VariableDescriptor::new("WG").with_layers(vec![3]))
            .unwrap_err();
        assert!(matches!(err, ForcingError::InvalidSelection { index: 3, len: 3, .. }));
    }

    #[test]
    fn test_patches_with_layers() {
        let dir = scratch_dir().unwrap();
        let file = open(&soil_file(dir.path()));

        // One patch applies to every requested layer
        let var = VariableDescriptor::new("TSOIL")
            .with_patches(vec![1])
            .with_layers(vec![0, 1, 2]);
        let field = file.field(&var).unwrap();
        assert_eq!(field.width(), 4 * var.sub_width());
        assert_eq!(field.slot(0, 2, 4), vec![120.0, 121.0, 122.0, 123.0]);

        // Equal lists pair up
        let var = VariableDescriptor::new("TSOIL")
            .with_patches(vec![0, 1])
            .with_layers(vec![2, 0]);
        let field = file.field(&var).unwrap();
        assert_eq!(field.width(), 4 * 2);
        assert_eq!(field.slot(0, 0, 4)[0], 20.0);
        assert_eq!(field.slot(0, 1, 4)[0], 100.0);

        let var = VariableDescriptor::new("TSOIL")
            .with_patches(vec![0, 1])
            .with_layers(vec![0, 1, 2]);
        assert!(matches!(
            file.field(&var),
            Err(ForcingError::IncompatibleSelection { patches: 2, layers: 3 })
        ));

        // Only layers requested: every patch is kept, patch-major
        let field = file
            .field(&VariableDescriptor::new("TSOIL").with_layers(vec![1]))
            .unwrap();
        assert_eq!(field.width(), 4 * 2);
        assert_eq!(field.slot(0, 1, 4)[3], 113.0);
    }

    #[test]
    fn test_sub_hourly_round_trip() {
        let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let series = temperature_series(3, 4);
        let dir = scratch_dir().unwrap();
        let path = NetcdfFixture::new()
            .lonlat_reg((0.0, 0.0, 1.0, 1.0), 2, 2)
            .time_axis("seconds since 2020-01-01 00:00:00", vec![0.0, 1800.0, 3600.0])
            .dimension("Number_of_points", 4)
            .variable("T2M", &["time", "Number_of_points"], series.concat())
            .write(dir.path(), "ISBA_PROGNOSTIC.OUT.nc")
            .unwrap();
        let file = open(&path);

        let all = file.field(&VariableDescriptor::new("T2M")).unwrap();
        assert_eq!(
            all.times(),
            &[start, start + Duration::minutes(30), start + Duration::hours(1)]
        );
        assert_values_eq!(all.values().row(1), series[1]);

        let again = file
            .field(&VariableDescriptor::new("T2M").with_valid_times(all.times().to_vec()))
            .unwrap();
        assert_eq!(again, all);

        // Both half-hour steps share the hour, each read once
        let early = file
            .field(&VariableDescriptor::new("T2M").with_valid_times(vec![start, start]))
            .unwrap();
        assert_eq!(early.ntimes(), 2);
        assert_eq!(early.times(), &all.times()[..2]);
    }
}
