//! IGN Lambert zones.
//!
//! Irregular `IGN` grids identify their projected coordinate system by an
//! integer code. Codes 1 to 5 are the NTF Lambert zones on the Clarke 1880
//! ellipsoid relative to the Paris meridian, code 6 is Lambert-93.

use std::fmt;

use crate::error::ProjectionError;
use crate::lambert::{Ellipsoid, LambertConformal};

/// Longitude of the Paris meridian east of Greenwich (degrees).
pub const PARIS_MERIDIAN: f64 = 2.337229167;

/// Lambert zone referenced by an `IGN` grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IgnZone {
    LambertI,
    LambertII,
    LambertIII,
    LambertIV,
    LambertIIExtended,
    Lambert93,
}

impl IgnZone {
    /// Zone from the integer code stored in the file.
    pub fn from_code(code: i64) -> Result<Self, ProjectionError> {
        match code {
            1 => Ok(IgnZone::LambertI),
            2 => Ok(IgnZone::LambertII),
            3 => Ok(IgnZone::LambertIII),
            4 => Ok(IgnZone::LambertIV),
            5 => Ok(IgnZone::LambertIIExtended),
            6 => Ok(IgnZone::Lambert93),
            other => Err(ProjectionError::UnknownIgnZone(other)),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            IgnZone::LambertI => 1,
            IgnZone::LambertII => 2,
            IgnZone::LambertIII => 3,
            IgnZone::LambertIV => 4,
            IgnZone::LambertIIExtended => 5,
            IgnZone::Lambert93 => 6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IgnZone::LambertI => "Lambert I",
            IgnZone::LambertII => "Lambert II",
            IgnZone::LambertIII => "Lambert III",
            IgnZone::LambertIV => "Lambert IV",
            IgnZone::LambertIIExtended => "Lambert II etendu",
            IgnZone::Lambert93 => "Lambert-93",
        }
    }

    /// The projection defining this zone's coordinates.
    pub fn projection(&self) -> LambertConformal {
        let clarke = Ellipsoid::clarke_1880_ign();
        match self {
            IgnZone::LambertI => LambertConformal::secant(
                48.598523,
                50.395912,
                49.5,
                PARIS_MERIDIAN,
                600000.0,
                200000.0,
                clarke,
            ),
            IgnZone::LambertII => LambertConformal::secant(
                45.898919,
                47.696014,
                46.8,
                PARIS_MERIDIAN,
                600000.0,
                200000.0,
                clarke,
            ),
            IgnZone::LambertIII => LambertConformal::secant(
                43.199291,
                44.996094,
                44.1,
                PARIS_MERIDIAN,
                600000.0,
                200000.0,
                clarke,
            ),
            IgnZone::LambertIV => LambertConformal::secant(
                41.560388,
                42.767663,
                42.165,
                PARIS_MERIDIAN,
                234.358,
                185861.369,
                clarke,
            ),
            IgnZone::LambertIIExtended => LambertConformal::secant(
                45.898919,
                47.696014,
                46.8,
                PARIS_MERIDIAN,
                600000.0,
                2200000.0,
                clarke,
            ),
            IgnZone::Lambert93 => LambertConformal::secant(
                49.0,
                44.0,
                46.5,
                3.0,
                700000.0,
                6600000.0,
                Ellipsoid::grs80(),
            ),
        }
    }
}

impl fmt::Display for IgnZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_codes_roundtrip() {
        for code in 1..=6 {
            let zone = IgnZone::from_code(code).unwrap();
            assert_eq!(zone.code(), code);
        }
        assert!(IgnZone::from_code(0).is_err());
        assert!(IgnZone::from_code(7).is_err());
    }

    #[test]
    fn test_lambert93_origin() {
        let proj = IgnZone::Lambert93.projection();
        let (x, y) = proj.forward(3.0, 46.5);
        assert!((x - 700000.0).abs() < 1e-3, "x = {}", x);
        assert!((y - 6600000.0).abs() < 1e-3, "y = {}", y);
    }

    #[test]
    fn test_lambert93_paris() {
        // Notre-Dame de Paris
        let proj = IgnZone::Lambert93.projection();
        let (x, y) = proj.forward(2.3499, 48.8530);
        assert!((x - 652_200.0).abs() < 2_000.0, "x = {}", x);
        assert!((y - 6_861_700.0).abs() < 2_000.0, "y = {}", y);
    }

    #[test]
    fn test_lambert2_extended_origin() {
        let proj = IgnZone::LambertIIExtended.projection();
        let (x, y) = proj.forward(PARIS_MERIDIAN, 46.8);
        assert!((x - 600000.0).abs() < 1e-3, "x = {}", x);
        assert!((y - 2200000.0).abs() < 1e-3, "y = {}", y);

        let (lon, lat) = proj.inverse(x + 10_000.0, y - 25_000.0);
        let (x2, y2) = proj.forward(lon, lat);
        assert!((x2 - x - 10_000.0).abs() < 1e-4);
        assert!((y2 - y + 25_000.0).abs() < 1e-4);
    }
}
