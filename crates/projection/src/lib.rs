//! Coordinate reference system transformations.
//!
//! Implements the conformal conic projections used by surface model grids
//! from scratch without external dependencies.

pub mod error;
pub mod ign;
pub mod lambert;

pub use error::ProjectionError;
pub use ign::IgnZone;
pub use lambert::{Ellipsoid, LambertConformal, EARTH_RADIUS};
