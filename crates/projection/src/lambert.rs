//! Lambert Conformal Conic projection.
//!
//! Maps a cone tangent or secant to the Earth's surface onto a flat plane.
//! Both the spherical form (model grids such as `CONF PROJ`) and the
//! ellipsoidal form (national grids such as the IGN Lambert zones) are
//! supported; the sphere is simply the ellipsoid with zero eccentricity.
//!
//! The projection parameters include:
//! - Reference latitude (lat0): latitude of the projection origin
//! - Reference longitude (lon0): the central meridian
//! - Standard parallel(s): latin1 and latin2 (equal for a tangent cone)
//! - False easting/northing: projected coordinates of the origin (meters)
//!
//! Projected coordinates are expressed in meters.

use std::f64::consts::PI;

const TO_RAD: f64 = PI / 180.0;
const TO_DEG: f64 = 180.0 / PI;

/// Mean Earth radius used by atmospheric models (meters).
pub const EARTH_RADIUS: f64 = 6371229.0;

/// Reference ellipsoid given by its semi-major axis and eccentricity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    /// Semi-major axis (meters)
    pub a: f64,
    /// First eccentricity
    pub e: f64,
}

impl Ellipsoid {
    /// A sphere of the given radius.
    pub fn sphere(radius: f64) -> Self {
        Self { a: radius, e: 0.0 }
    }

    /// Build an ellipsoid from its semi-major and semi-minor axes.
    pub fn from_axes(a: f64, b: f64) -> Self {
        Self {
            a,
            e: (1.0 - (b * b) / (a * a)).sqrt(),
        }
    }

    /// GRS 1980, used by RGF93 / Lambert-93.
    pub fn grs80() -> Self {
        Self::from_axes(6378137.0, 6356752.314140347)
    }

    /// Clarke 1880 (IGN), used by the NTF Lambert zones.
    pub fn clarke_1880_ign() -> Self {
        Self::from_axes(6378249.2, 6356515.0)
    }

    fn m(&self, phi: f64) -> f64 {
        let s = self.e * phi.sin();
        phi.cos() / (1.0 - s * s).sqrt()
    }

    fn t(&self, phi: f64) -> f64 {
        let s = self.e * phi.sin();
        (PI / 4.0 - phi / 2.0).tan() / ((1.0 - s) / (1.0 + s)).powf(self.e / 2.0)
    }
}

/// Lambert Conformal Conic projection parameters.
///
/// These parameters define the projection from geographic (lon/lat) to
/// projected (x, y) coordinates and back.
#[derive(Debug, Clone, PartialEq)]
pub struct LambertConformal {
    /// Central meridian in radians
    pub lon0: f64,
    /// Latitude of origin in radians
    pub lat0: f64,
    /// First standard parallel in radians
    pub latin1: f64,
    /// Second standard parallel in radians
    pub latin2: f64,
    /// Projected x of the origin (meters)
    pub false_easting: f64,
    /// Projected y of the origin (meters)
    pub false_northing: f64,
    /// Reference ellipsoid
    pub ellipsoid: Ellipsoid,
    /// Cone constant (n)
    n: f64,
    /// F constant
    f: f64,
    /// Rho at the latitude of origin
    rho0: f64,
}

impl LambertConformal {
    /// Spherical projection on a cone tangent at `lat0_deg`, origin at
    /// (`lon0_deg`, `lat0_deg`) and no false easting/northing.
    pub fn tangent(lat0_deg: f64, lon0_deg: f64, radius: f64) -> Self {
        Self::secant(
            lat0_deg,
            lat0_deg,
            lat0_deg,
            lon0_deg,
            0.0,
            0.0,
            Ellipsoid::sphere(radius),
        )
    }

    /// General (possibly ellipsoidal) projection.
    ///
    /// # Arguments
    /// * `latin1_deg` - First standard parallel (degrees)
    /// * `latin2_deg` - Second standard parallel (degrees)
    /// * `lat0_deg` - Latitude of origin (degrees)
    /// * `lon0_deg` - Central meridian (degrees)
    /// * `false_easting` - x of the origin (meters)
    /// * `false_northing` - y of the origin (meters)
    /// * `ellipsoid` - Reference ellipsoid
    pub fn secant(
        latin1_deg: f64,
        latin2_deg: f64,
        lat0_deg: f64,
        lon0_deg: f64,
        false_easting: f64,
        false_northing: f64,
        ellipsoid: Ellipsoid,
    ) -> Self {
        let latin1 = latin1_deg * TO_RAD;
        let latin2 = latin2_deg * TO_RAD;
        let lat0 = lat0_deg * TO_RAD;
        let lon0 = lon0_deg * TO_RAD;

        let m1 = ellipsoid.m(latin1);
        let t1 = ellipsoid.t(latin1);

        // Compute cone constant n
        let n = if (latin1 - latin2).abs() < 1e-10 {
            // Tangent cone (single standard parallel)
            latin1.sin()
        } else {
            // Secant cone (two standard parallels)
            let m2 = ellipsoid.m(latin2);
            let t2 = ellipsoid.t(latin2);
            (m1.ln() - m2.ln()) / (t1.ln() - t2.ln())
        };

        let f = m1 / (n * t1.powf(n));
        let rho0 = ellipsoid.a * f * ellipsoid.t(lat0).powf(n);

        Self {
            lon0,
            lat0,
            latin1,
            latin2,
            false_easting,
            false_northing,
            ellipsoid,
            n,
            f,
            rho0,
        }
    }

    /// Cone constant (sine of the tangent latitude for a tangent cone).
    pub fn cone_constant(&self) -> f64 {
        self.n
    }

    /// Project geographic coordinates (degrees) to (x, y) in meters.
    pub fn forward(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let lat = lat_deg * TO_RAD;
        let lon = lon_deg * TO_RAD;

        // Normalize longitude difference to [-π, π]
        let mut dlon = lon - self.lon0;
        while dlon > PI {
            dlon -= 2.0 * PI;
        }
        while dlon < -PI {
            dlon += 2.0 * PI;
        }

        let rho = self.ellipsoid.a * self.f * self.ellipsoid.t(lat).powf(self.n);
        let theta = self.n * dlon;

        let x = self.false_easting + rho * theta.sin();
        let y = self.false_northing + self.rho0 - rho * theta.cos();
        (x, y)
    }

    /// Inverse projection from (x, y) in meters to (lon, lat) in degrees.
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let sign = self.n.signum();
        let dx = x - self.false_easting;
        let dy = self.rho0 - (y - self.false_northing);

        let rho = sign * (dx * dx + dy * dy).sqrt();
        if rho == 0.0 {
            return (self.lon0 * TO_DEG, sign * 90.0);
        }
        let theta = (sign * dx).atan2(sign * dy);

        let t = (rho / (self.ellipsoid.a * self.f)).powf(1.0 / self.n);
        let e = self.ellipsoid.e;
        let mut phi = PI / 2.0 - 2.0 * t.atan();
        if e > 0.0 {
            for _ in 0..15 {
                let s = e * phi.sin();
                let next = PI / 2.0 - 2.0 * (t * ((1.0 - s) / (1.0 + s)).powf(e / 2.0)).atan();
                let converged = (next - phi).abs() < 1e-12;
                phi = next;
                if converged {
                    break;
                }
            }
        }

        let mut lon = (self.lon0 + theta / self.n) * TO_DEG;
        if lon > 180.0 {
            lon -= 360.0;
        } else if lon < -180.0 {
            lon += 360.0;
        }
        (lon, phi * TO_DEG)
    }
}
