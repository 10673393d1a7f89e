//! Rebuilding a [`GeometryModel`] from grid parameters stored in a file.
//!
//! Every container stores the same named parameters (`GRID_TYPE`, `NLON`,
//! `LON0`, ...) in its own way, so readers implement [`GridParameters`] and
//! share the dispatch below.

use projection::IgnZone;
use tracing::{debug, info};

use super::{GeometryModel, GridDefinition};
use crate::config::ReaderConfig;
use crate::error::{ForcingError, Result};

/// Named grid parameters of an open file.
///
/// Absent parameters are reported as empty vectors, not errors.
pub trait GridParameters {
    /// The grid-type tag, if the file declares one.
    fn grid_type(&mut self) -> Result<Option<String>>;

    fn floats(&mut self, name: &str) -> Result<Vec<f64>>;

    fn integers(&mut self, name: &str) -> Result<Vec<i64>>;
}

/// Naming differences between containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterConvention {
    /// Card decks and native binary files.
    CardDeck,
    /// NetCDF files.
    SelfDescribing,
}

impl ParameterConvention {
    fn lambert_zone(&self) -> &'static str {
        match self {
            ParameterConvention::CardDeck => "LAMBERT",
            ParameterConvention::SelfDescribing => "CLAMBERT",
        }
    }
}

fn required_floats<P: GridParameters + ?Sized>(params: &mut P, name: &str) -> Result<Vec<f64>> {
    let values = params.floats(name)?;
    if values.is_empty() {
        return Err(ForcingError::MissingParameter(name.to_string()));
    }
    Ok(values)
}

fn required_float<P: GridParameters + ?Sized>(params: &mut P, name: &str) -> Result<f64> {
    Ok(required_floats(params, name)?[0])
}

fn required_count<P: GridParameters + ?Sized>(params: &mut P, name: &str) -> Result<usize> {
    let values = params.integers(name)?;
    let value = *values
        .first()
        .ok_or_else(|| ForcingError::MissingParameter(name.to_string()))?;
    usize::try_from(value).map_err(|_| {
        ForcingError::unsupported_grid(format!("{} must be non-negative, got {}", name, value))
    })
}

/// First spacing of a coordinate list.
fn spacing_of(coords: &[f64]) -> Option<f64> {
    if coords.len() > 1 {
        Some((coords[1] - coords[0]).abs())
    } else {
        None
    }
}

/// Reconstruct the geometry declared by `params`.
///
/// Returns `Ok(None)` when the file has no grid type.
pub fn reconstruct<P: GridParameters + ?Sized>(
    params: &mut P,
    convention: ParameterConvention,
    config: &ReaderConfig,
) -> Result<Option<GeometryModel>> {
    let grid_type = match params.grid_type()? {
        Some(t) => t,
        None => return Ok(None),
    };
    let tag = grid_type.trim().to_uppercase();
    debug!(grid_type = %tag, "Reconstructing geometry");

    let definition = match tag.as_str() {
        "IGN" => {
            let code = *params
                .integers(convention.lambert_zone())?
                .first()
                .ok_or_else(|| ForcingError::MissingParameter(convention.lambert_zone().into()))?;
            let zone = IgnZone::from_code(code)?;
            GridDefinition::Ign {
                zone,
                x: required_floats(params, "XX")?,
                y: required_floats(params, "XY")?,
                dx: params.floats("DX")?,
                dy: params.floats("DY")?,
            }
        }
        "LONLATVAL" => GridDefinition::LonLatVal {
            lons: required_floats(params, "XX")?,
            lats: required_floats(params, "XY")?,
            dx: params.floats("DX")?,
            dy: params.floats("DY")?,
        },
        "LONLAT REG" => GridDefinition::LonLatReg {
            lonmin: required_float(params, "LONMIN")?,
            latmin: required_float(params, "LATMIN")?,
            lonmax: required_float(params, "LONMAX")?,
            latmax: required_float(params, "LATMAX")?,
            nlon: required_count(params, "NLON")?,
            nlat: required_count(params, "NLAT")?,
        },
        "CONF PROJ" => {
            let lon0 = required_float(params, "LON0")?;
            let lat0 = required_float(params, "LAT0")?;
            let lonori = required_float(params, "LONORI")?;
            let latori = required_float(params, "LATORI")?;
            let nx = required_count(params, "IMAX")?;
            let ny = required_count(params, "JMAX")?;

            let dx = match params.floats("DX")?.first() {
                Some(&dx) => dx,
                None => spacing_of(&params.floats("XX")?)
                    .ok_or_else(|| ForcingError::MissingParameter("DX".to_string()))?,
            };
            let dy = match params.floats("DY")?.first() {
                Some(&dy) => dy,
                None => spacing_of(&params.floats("YY")?)
                    .ok_or_else(|| ForcingError::MissingParameter("DY".to_string()))?,
            };

            GridDefinition::conf_proj_from_corner(
                lon0,
                lat0,
                lonori,
                latori,
                nx,
                ny,
                dx,
                dy,
                config.earth_radius,
            )
        }
        other => return Err(ForcingError::unsupported_grid(other)),
    };

    let geometry = GeometryModel::new(definition)?;
    info!(
        grid_type = geometry.grid_type(),
        nlons = geometry.nlons(),
        nlats = geometry.nlats(),
        npoints = geometry.npoints(),
        "Reconstructed geometry"
    );
    Ok(Some(geometry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapParameters {
        grid_type: Option<String>,
        floats: HashMap<&'static str, Vec<f64>>,
        ints: HashMap<&'static str, Vec<i64>>,
    }

    impl GridParameters for MapParameters {
        fn grid_type(&mut self) -> Result<Option<String>> {
            Ok(self.grid_type.clone())
        }

        fn floats(&mut self, name: &str) -> Result<Vec<f64>> {
            Ok(self.floats.get(name).cloned().unwrap_or_default())
        }

        fn integers(&mut self, name: &str) -> Result<Vec<i64>> {
            Ok(self.ints.get(name).cloned().unwrap_or_default())
        }
    }

    fn lonlat_reg_params() -> MapParameters {
        let mut p = MapParameters {
            grid_type: Some("LONLAT REG".to_string()),
            ..Default::default()
        };
        p.floats.insert("LONMIN", vec![0.0]);
        p.floats.insert("LATMIN", vec![0.0]);
        p.floats.insert("LONMAX", vec![1.0]);
        p.floats.insert("LATMAX", vec![1.0]);
        p.ints.insert("NLON", vec![2]);
        p.ints.insert("NLAT", vec![2]);
        p
    }

    #[test]
    fn test_lonlat_reg() {
        let geo = reconstruct(
            &mut lonlat_reg_params(),
            ParameterConvention::CardDeck,
            &ReaderConfig::default(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(geo.npoints(), 4);
        assert_eq!(geo.lonlat(3), (1.0, 1.0));
    }

    #[test]
    fn test_no_grid_type() {
        let mut p = MapParameters::default();
        let geo =
            reconstruct(&mut p, ParameterConvention::SelfDescribing, &ReaderConfig::default())
                .unwrap();
        assert!(geo.is_none());
    }

    #[test]
    fn test_unknown_grid_type() {
        let mut p = MapParameters {
            grid_type: Some("GAUSS".to_string()),
            ..Default::default()
        };
        let err = reconstruct(&mut p, ParameterConvention::CardDeck, &ReaderConfig::default())
            .unwrap_err();
        assert!(matches!(err, ForcingError::UnsupportedGrid(_)));
    }

    #[test]
    fn test_missing_parameter() {
        let mut p = lonlat_reg_params();
        p.ints.remove("NLAT");
        let err = reconstruct(&mut p, ParameterConvention::CardDeck, &ReaderConfig::default())
            .unwrap_err();
        assert!(matches!(err, ForcingError::MissingParameter(ref n) if n == "NLAT"));
    }

    #[test]
    fn test_ign_zone_naming() {
        let mut p = MapParameters {
            grid_type: Some("IGN".to_string()),
            ..Default::default()
        };
        p.ints.insert("CLAMBERT", vec![6]);
        p.floats.insert("XX", vec![700000.0, 701000.0]);
        p.floats.insert("XY", vec![6600000.0, 6600000.0]);

        let geo = reconstruct(&mut p, ParameterConvention::SelfDescribing, &ReaderConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(geo.npoints(), 2);

        // Card decks call the zone LAMBERT
        let err = reconstruct(&mut p, ParameterConvention::CardDeck, &ReaderConfig::default())
            .unwrap_err();
        assert!(matches!(err, ForcingError::MissingParameter(ref n) if n == "LAMBERT"));
    }

    #[test]
    fn test_conf_proj_spacing_from_coordinates() {
        let mut p = MapParameters {
            grid_type: Some("CONF PROJ".to_string()),
            ..Default::default()
        };
        p.floats.insert("LON0", vec![10.0]);
        p.floats.insert("LAT0", vec![60.0]);
        p.floats.insert("LONORI", vec![9.0]);
        p.floats.insert("LATORI", vec![59.0]);
        p.ints.insert("IMAX", vec![3]);
        p.ints.insert("JMAX", vec![4]);
        p.floats.insert("XX", vec![0.0, 2500.0, 5000.0]);
        p.floats.insert("YY", vec![0.0, 2500.0, 5000.0, 7500.0]);

        let geo = reconstruct(&mut p, ParameterConvention::CardDeck, &ReaderConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(geo.npoints(), 12);
        match geo.definition() {
            GridDefinition::ConfProj { dx, dy, .. } => {
                assert_eq!(*dx, 2500.0);
                assert_eq!(*dy, 2500.0);
            }
            other => panic!("unexpected definition {:?}", other),
        }
    }
}
