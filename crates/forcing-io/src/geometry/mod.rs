//! Spatial domain descriptions.
//!
//! A [`GeometryModel`] is built once when a file is opened and never changes
//! afterwards. It knows how many points a field has, where each point is, and
//! how to express an arbitrary lon/lat in the grid's native coordinates.
//!
//! Point ordering:
//! - without a mask, grid points are enumerated y-major (x varies fastest),
//!   so output point `k` sits at `x = k % nlons`, `y = k / nlons`;
//! - with a mask, output point `k` is grid index `mask[k]`, which is x-major:
//!   `x = mask[k] / nlats`, `y = mask[k] % nlats`.

pub mod reconstruct;

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use projection::{IgnZone, LambertConformal};
use serde::Serialize;

use crate::error::{ForcingError, Result};

pub use reconstruct::{reconstruct, GridParameters, ParameterConvention};

/// Grid layout and projection parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum GridDefinition {
    /// Regular lon/lat grid, corners inclusive.
    LonLatReg {
        lonmin: f64,
        latmin: f64,
        lonmax: f64,
        latmax: f64,
        nlon: usize,
        nlat: usize,
    },
    /// Regular grid on a tangent Lambert conformal projection.
    ConfProj {
        /// Central meridian (degrees)
        lon0: f64,
        /// Reference (tangent) latitude (degrees)
        lat0: f64,
        /// Grid centre longitude (degrees)
        lonc: f64,
        /// Grid centre latitude (degrees)
        latc: f64,
        nx: usize,
        ny: usize,
        /// Cell size in x (meters)
        dx: f64,
        /// Cell size in y (meters)
        dy: f64,
        /// Sphere radius (meters)
        earth_radius: f64,
    },
    /// Irregular points in an IGN Lambert zone.
    Ign {
        zone: IgnZone,
        x: Vec<f64>,
        y: Vec<f64>,
        dx: Vec<f64>,
        dy: Vec<f64>,
    },
    /// Irregular lon/lat points with cell sizes.
    LonLatVal {
        lons: Vec<f64>,
        lats: Vec<f64>,
        dx: Vec<f64>,
        dy: Vec<f64>,
    },
    /// Plain point set.
    Points { lons: Vec<f64>, lats: Vec<f64> },
}

impl GridDefinition {
    /// Conformal grid from its lower-left corner.
    ///
    /// The corner is projected, shifted by half the grid extent and
    /// projected back to obtain the centre.
    #[allow(clippy::too_many_arguments)]
    pub fn conf_proj_from_corner(
        lon0: f64,
        lat0: f64,
        lonori: f64,
        latori: f64,
        nx: usize,
        ny: usize,
        dx: f64,
        dy: f64,
        earth_radius: f64,
    ) -> Self {
        let proj = LambertConformal::tangent(lat0, lon0, earth_radius);
        let (x, y) = proj.forward(lonori, latori);
        let xc = x + 0.5 * (nx as f64 - 1.0) * dx;
        let yc = y + 0.5 * (ny as f64 - 1.0) * dy;
        let (lonc, latc) = proj.inverse(xc, yc);
        GridDefinition::ConfProj {
            lon0,
            lat0,
            lonc,
            latc,
            nx,
            ny,
            dx,
            dy,
            earth_radius,
        }
    }

    /// Tag used in files for this grid kind.
    pub fn grid_type(&self) -> &'static str {
        match self {
            GridDefinition::LonLatReg { .. } => "LONLAT REG",
            GridDefinition::ConfProj { .. } => "CONF PROJ",
            GridDefinition::Ign { .. } => "IGN",
            GridDefinition::LonLatVal { .. } => "LONLATVAL",
            GridDefinition::Points { .. } => "POINTS",
        }
    }

    fn shape(&self) -> (usize, usize) {
        match self {
            GridDefinition::LonLatReg { nlon, nlat, .. } => (*nlon, *nlat),
            GridDefinition::ConfProj { nx, ny, .. } => (*nx, *ny),
            GridDefinition::Ign { x, .. } => (x.len(), 1),
            GridDefinition::LonLatVal { lons, .. } => (lons.len(), 1),
            GridDefinition::Points { lons, .. } => (lons.len(), 1),
        }
    }

    fn validate(&self) -> Result<()> {
        let (nx, ny) = self.shape();
        if nx == 0 || ny == 0 {
            return Err(ForcingError::unsupported_grid(format!(
                "{} grid with no points",
                self.grid_type()
            )));
        }
        let same_len = |a: &[f64], b: &[f64], what: &str| {
            if a.len() == b.len() {
                Ok(())
            } else {
                Err(ForcingError::unsupported_grid(format!(
                    "{} has {} values, expected {}",
                    what,
                    b.len(),
                    a.len()
                )))
            }
        };
        match self {
            GridDefinition::ConfProj { dx, dy, .. } if *dx <= 0.0 || *dy <= 0.0 => Err(
                ForcingError::unsupported_grid("CONF PROJ grid with non-positive spacing"),
            ),
            GridDefinition::Ign { x, y, .. } => same_len(x, y, "XY"),
            GridDefinition::LonLatVal { lons, lats, .. } | GridDefinition::Points { lons, lats } => {
                same_len(lons, lats, "latitudes")
            }
            _ => Ok(()),
        }
    }
}

/// Immutable description of a spatial domain.
#[derive(Debug, Clone)]
pub struct GeometryModel {
    definition: GridDefinition,
    mask: Option<Vec<usize>>,
    projection: Option<LambertConformal>,
    /// Native coordinates of grid point (0, 0) for structured grids.
    origin: (f64, f64),
    lons: Vec<f64>,
    lats: Vec<f64>,
}

impl GeometryModel {
    /// Build an unmasked geometry.
    pub fn new(definition: GridDefinition) -> Result<Self> {
        definition.validate()?;

        let projection = match &definition {
            GridDefinition::ConfProj {
                lon0,
                lat0,
                earth_radius,
                ..
            } => Some(LambertConformal::tangent(*lat0, *lon0, *earth_radius)),
            GridDefinition::Ign { zone, .. } => Some(zone.projection()),
            _ => None,
        };

        let origin = match (&definition, &projection) {
            (
                GridDefinition::ConfProj {
                    lonc,
                    latc,
                    nx,
                    ny,
                    dx,
                    dy,
                    ..
                },
                Some(proj),
            ) => {
                let (xc, yc) = proj.forward(*lonc, *latc);
                (
                    xc - 0.5 * (*nx as f64 - 1.0) * dx,
                    yc - 0.5 * (*ny as f64 - 1.0) * dy,
                )
            }
            (GridDefinition::LonLatReg { lonmin, latmin, .. }, _) => (*lonmin, *latmin),
            _ => (0.0, 0.0),
        };

        let mut geometry = Self {
            definition,
            mask: None,
            projection,
            origin,
            lons: Vec::new(),
            lats: Vec::new(),
        };
        geometry.compute_coordinates();
        Ok(geometry)
    }

    /// Plain point-set geometry.
    pub fn points(lons: Vec<f64>, lats: Vec<f64>) -> Result<Self> {
        Self::new(GridDefinition::Points { lons, lats })
    }

    /// Restrict the grid to the given x-major grid indices.
    pub fn with_mask(mut self, mask: Vec<usize>) -> Result<Self> {
        let size = self.grid_size();
        if let Some(bad) = mask.iter().find(|&&g| g >= size) {
            return Err(ForcingError::InvalidMask(format!(
                "grid index {} outside grid of {} points",
                bad, size
            )));
        }
        if mask.is_empty() {
            return Err(ForcingError::InvalidMask("empty mask".to_string()));
        }
        self.mask = Some(mask);
        self.compute_coordinates();
        Ok(self)
    }

    fn compute_coordinates(&mut self) {
        let n = self.npoints();
        let mut lons = Vec::with_capacity(n);
        let mut lats = Vec::with_capacity(n);
        for k in 0..n {
            let (x, y) = self.grid_position(k);
            let (lon, lat) = self.grid_lonlat(x, y);
            lons.push(lon);
            lats.push(lat);
        }
        self.lons = lons;
        self.lats = lats;
    }

    pub fn definition(&self) -> &GridDefinition {
        &self.definition
    }

    pub fn grid_type(&self) -> &'static str {
        self.definition.grid_type()
    }

    pub fn mask(&self) -> Option<&[usize]> {
        self.mask.as_deref()
    }

    /// Number of grid columns (points for irregular kinds).
    pub fn nlons(&self) -> usize {
        self.definition.shape().0
    }

    /// Number of grid rows (1 for irregular kinds).
    pub fn nlats(&self) -> usize {
        self.definition.shape().1
    }

    /// Cells of the full, unmasked grid.
    pub fn grid_size(&self) -> usize {
        self.nlons() * self.nlats()
    }

    /// Number of output points.
    pub fn npoints(&self) -> usize {
        match &self.mask {
            Some(mask) => mask.len(),
            None => self.grid_size(),
        }
    }

    /// Regular grids whose native coordinates are an affine function of the
    /// grid indices.
    pub fn is_structured(&self) -> bool {
        matches!(
            self.definition,
            GridDefinition::LonLatReg { .. } | GridDefinition::ConfProj { .. }
        )
    }

    /// Grid column/row of output point `k`.
    pub fn grid_position(&self, k: usize) -> (usize, usize) {
        match &self.mask {
            Some(mask) => {
                let g = mask[k];
                (g / self.nlats(), g % self.nlats())
            }
            None => (k % self.nlons(), k / self.nlons()),
        }
    }

    pub fn lons(&self) -> &[f64] {
        &self.lons
    }

    pub fn lats(&self) -> &[f64] {
        &self.lats
    }

    /// Longitude/latitude of output point `k`.
    pub fn lonlat(&self, k: usize) -> (f64, f64) {
        (self.lons[k], self.lats[k])
    }

    /// Grid spacing in native units for structured grids.
    fn spacing(&self) -> (f64, f64) {
        match &self.definition {
            GridDefinition::LonLatReg {
                lonmin,
                latmin,
                lonmax,
                latmax,
                nlon,
                nlat,
            } => {
                let dlon = if *nlon > 1 {
                    (lonmax - lonmin) / (*nlon as f64 - 1.0)
                } else {
                    0.0
                };
                let dlat = if *nlat > 1 {
                    (latmax - latmin) / (*nlat as f64 - 1.0)
                } else {
                    0.0
                };
                (dlon, dlat)
            }
            GridDefinition::ConfProj { dx, dy, .. } => (*dx, *dy),
            _ => (0.0, 0.0),
        }
    }

    fn grid_native(&self, x: usize, y: usize) -> (f64, f64) {
        match &self.definition {
            GridDefinition::LonLatReg { .. } | GridDefinition::ConfProj { .. } => {
                let (dx, dy) = self.spacing();
                (self.origin.0 + x as f64 * dx, self.origin.1 + y as f64 * dy)
            }
            GridDefinition::Ign { x: xs, y: ys, .. } => (xs[x], ys[x]),
            GridDefinition::LonLatVal { lons, lats, .. } | GridDefinition::Points { lons, lats } => {
                (lons[x], lats[x])
            }
        }
    }

    fn grid_lonlat(&self, x: usize, y: usize) -> (f64, f64) {
        let (nx, ny) = self.grid_native(x, y);
        match &self.projection {
            Some(proj) => proj.inverse(nx, ny),
            None => (nx, ny),
        }
    }

    /// Native coordinates of output point `k` (degrees or meters).
    pub fn native_point(&self, k: usize) -> (f64, f64) {
        let (x, y) = self.grid_position(k);
        self.grid_native(x, y)
    }

    /// Express a lon/lat in this geometry's native coordinates.
    pub fn to_native(&self, lon: f64, lat: f64) -> (f64, f64) {
        match &self.projection {
            Some(proj) => proj.forward(lon, lat),
            None => (lon, lat),
        }
    }

    /// Fractional grid column/row of a lon/lat on a structured grid.
    ///
    /// Returns `None` for irregular kinds. Degenerate axes (a single row or
    /// column) always map to index 0.
    pub fn fractional_index(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        if !self.is_structured() {
            return None;
        }
        let (x, y) = self.to_native(lon, lat);
        let (dx, dy) = self.spacing();
        let fi = if dx != 0.0 { (x - self.origin.0) / dx } else { 0.0 };
        let fj = if dy != 0.0 { (y - self.origin.1) / dy } else { 0.0 };
        Some((fi, fj))
    }

    /// Output point index of a grid cell, if the cell is an output point.
    pub fn point_index(&self, x: usize, y: usize) -> Option<usize> {
        if x >= self.nlons() || y >= self.nlats() {
            return None;
        }
        match &self.mask {
            Some(mask) => {
                let g = x * self.nlats() + y;
                mask.iter().position(|&m| m == g)
            }
            None => Some(y * self.nlons() + x),
        }
    }

    /// Stable hash of the definition and mask, used as a weight-cache key.
    pub fn identity(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.grid_type().hash(&mut hasher);
        let mut floats: Vec<f64> = Vec::new();
        match &self.definition {
            GridDefinition::LonLatReg {
                lonmin,
                latmin,
                lonmax,
                latmax,
                nlon,
                nlat,
            } => {
                floats.extend([*lonmin, *latmin, *lonmax, *latmax]);
                nlon.hash(&mut hasher);
                nlat.hash(&mut hasher);
            }
            GridDefinition::ConfProj {
                lon0,
                lat0,
                lonc,
                latc,
                nx,
                ny,
                dx,
                dy,
                earth_radius,
            } => {
                floats.extend([*lon0, *lat0, *lonc, *latc, *dx, *dy, *earth_radius]);
                nx.hash(&mut hasher);
                ny.hash(&mut hasher);
            }
            GridDefinition::Ign { zone, x, y, dx, dy } => {
                zone.hash(&mut hasher);
                for v in [x, y, dx, dy] {
                    v.len().hash(&mut hasher);
                    floats.extend(v.iter());
                }
            }
            GridDefinition::LonLatVal { lons, lats, dx, dy } => {
                for v in [lons, lats, dx, dy] {
                    v.len().hash(&mut hasher);
                    floats.extend(v.iter());
                }
            }
            GridDefinition::Points { lons, lats } => {
                for v in [lons, lats] {
                    v.len().hash(&mut hasher);
                    floats.extend(v.iter());
                }
            }
        }
        for f in floats {
            f.to_bits().hash(&mut hasher);
        }
        self.mask.hash(&mut hasher);
        hasher.finish()
    }

    /// Serializable overview for reports.
    pub fn summary(&self) -> GeometrySummary {
        let fold = |v: &[f64]| {
            v.iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
                    (lo.min(x), hi.max(x))
                })
        };
        GeometrySummary {
            grid_type: self.grid_type().to_string(),
            nlons: self.nlons(),
            nlats: self.nlats(),
            npoints: self.npoints(),
            masked: self.mask.is_some(),
            lon_range: fold(&self.lons),
            lat_range: fold(&self.lats),
        }
    }
}

impl PartialEq for GeometryModel {
    fn eq(&self, other: &Self) -> bool {
        self.definition == other.definition && self.mask == other.mask
    }
}

impl fmt::Display for GeometryModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}x{} ({} points{})",
            self.grid_type(),
            self.nlons(),
            self.nlats(),
            self.npoints(),
            if self.mask.is_some() { ", masked" } else { "" }
        )
    }
}

/// Overview of a geometry.
#[derive(Debug, Clone, Serialize)]
pub struct GeometrySummary {
    pub grid_type: String,
    pub nlons: usize,
    pub nlats: usize,
    pub npoints: usize,
    pub masked: bool,
    pub lon_range: (f64, f64),
    pub lat_range: (f64, f64),
}
