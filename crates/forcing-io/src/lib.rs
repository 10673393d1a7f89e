//! Forcing and surface file access for a land-surface model.
//!
//! This crate opens files written by (or for) the surface model, rebuilds
//! the grid they were written on, extracts variables as `[time, point]`
//! arrays and remaps them onto other geometries.
//!
//! Supported files:
//!
//! | kind            | container           | reader                          |
//! |-----------------|---------------------|---------------------------------|
//! | state snapshot  | text card deck      | [`readers::CardDeckFile`]       |
//! | state snapshot  | NetCDF              | [`readers::NetcdfSurfexFile`]   |
//! | state snapshot  | native binary       | [`readers::NativeBinaryFile`]   |
//! | time series     | NetCDF              | [`readers::NetcdfSurfexFile`]   |
//! | time series     | fixed-width text    | [`readers::TexteFile`]          |
//! | forcing archive | NetCDF              | [`readers::ForcingArchiveFile`] |
//!
//! # Architecture
//!
//! ```text
//! SurfexFile::open(path)
//!      │
//!      ├─► detect(kind, format) from the file name
//!      │
//!      └─► FileReader variant
//!               │
//!               ├─► GeometryModel rebuilt from GRID_TYPE (or supplied)
//!               │
//!               └─► field(var) ─► RawField [time, npoints * nsub]
//!                                     │
//!                                     ▼
//!                      Interpolator (weights from WeightCache)
//!                                     │
//!                                     ▼
//!                           RawField on the target geometry
//! ```
//!
//! # Example
//!
//! ```ignore
//! use forcing_io::{InterpolationMethod, OpenOptions, SurfexFile, VariableDescriptor, WeightCache};
//!
//! let mut file = SurfexFile::open("PGD.nc", OpenOptions::new())?;
//! let var = VariableDescriptor::new("ZS");
//! let (field, geometry) = file.field(&var)?;
//!
//! let mut cache = WeightCache::new(16);
//! let (at_stations, _) =
//!     file.points(&var, &stations, InterpolationMethod::Linear, Some(&mut cache))?;
//! ```

pub mod config;
pub mod detect;
pub mod error;
pub mod field;
pub mod geometry;
pub mod interpolation;
pub mod pattern;
pub mod readers;
pub mod time;
pub mod variable;

// Re-export commonly used types at crate root
pub use config::{ReaderConfig, CONF_PROJ_EARTH_RADIUS};
pub use detect::{detect, detect_format, detect_kind, ContainerFormat, ContentKind};
pub use error::{ForcingError, Result};
pub use field::{canonicalize_missing, RawField, MISSING_SENTINEL};
pub use geometry::{GeometryModel, GeometrySummary, GridDefinition};
pub use interpolation::{
    CacheStats, InterpolationMethod, InterpolationWeights, Interpolator, WeightCache, WeightKey,
};
pub use pattern::parse_file_pattern;
pub use readers::{read_field, read_points, FileReader, OpenOptions, SurfexFile};
pub use variable::{DataType, VariableDescriptor};
