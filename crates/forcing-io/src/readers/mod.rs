//! File readers and the [`SurfexFile`] facade.
//!
//! Every supported `(kind, format)` pair maps to one [`FileReader`] variant.
//! The variant is chosen once at open time; extraction and interpolation go
//! through the facade.

pub mod card_deck;
pub mod dimensions;
pub mod forcing;
pub mod native_binary;
pub mod netcdf;
pub mod texte;

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::ReaderConfig;
use crate::detect::{detect, ContainerFormat, ContentKind};
use crate::error::{ForcingError, Result};
use crate::field::RawField;
use crate::geometry::GeometryModel;
use crate::interpolation::{InterpolationMethod, Interpolator, WeightCache};
use crate::time::{format_times, truncate_to_hour};
use crate::variable::VariableDescriptor;

pub use self::card_deck::{CardDeckFile, CardValues};
pub use self::forcing::ForcingArchiveFile;
pub use self::native_binary::{Article, NativeBinaryFile};
pub use self::netcdf::NetcdfSurfexFile;
pub use self::texte::TexteFile;

/// Pick the geometry a reader works with.
///
/// A supplied geometry wins when the file declares none, or when it covers
/// the same grid as the declared one (typically to add a land mask).
pub(crate) fn resolve_geometry(
    reconstructed: Option<GeometryModel>,
    supplied: Option<GeometryModel>,
    path: &Path,
) -> Result<GeometryModel> {
    match (reconstructed, supplied) {
        (Some(found), Some(given)) => {
            if found.grid_size() != given.grid_size() {
                return Err(ForcingError::geometry_mismatch(format!(
                    "{}: file grid {} does not match supplied {}",
                    path.display(),
                    found,
                    given
                )));
            }
            if found.definition() != given.definition() {
                warn!(
                    file = %path.display(),
                    file_grid = %found,
                    supplied = %given,
                    "Supplied geometry differs from the file grid"
                );
            }
            Ok(given)
        }
        (Some(found), None) => Ok(found),
        (None, Some(given)) => Ok(given),
        (None, None) => Err(ForcingError::MissingGeometry(path.display().to_string())),
    }
}

/// Check requested times against a snapshot's validity date.
///
/// Without a validity date in the file the request cannot be verified and
/// is accepted.
pub(crate) fn check_snapshot_time(
    validity: Option<DateTime<Utc>>,
    requested: &[DateTime<Utc>],
) -> Result<()> {
    if requested.is_empty() {
        return Ok(());
    }
    match validity {
        Some(validity) => {
            let valid = truncate_to_hour(validity);
            if requested.iter().any(|t| truncate_to_hour(*t) == valid) {
                Ok(())
            } else {
                Err(ForcingError::TimeNotFound(format!(
                    "{} (file is valid at {})",
                    format_times(requested),
                    validity
                )))
            }
        }
        None => {
            debug!(requested = %format_times(requested), "Snapshot has no validity date, accepting request");
            Ok(())
        }
    }
}

/// Options for [`SurfexFile::open`].
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    pub kind: Option<ContentKind>,
    pub format: Option<ContainerFormat>,
    pub geometry: Option<GeometryModel>,
    pub config: ReaderConfig,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: ContentKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn format(mut self, format: ContainerFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn geometry(mut self, geometry: GeometryModel) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn config(mut self, config: ReaderConfig) -> Self {
        self.config = config;
        self
    }
}

/// One open reader per supported format.
#[derive(Debug)]
pub enum FileReader {
    CardDeck(CardDeckFile),
    SelfDescribing(NetcdfSurfexFile),
    NativeBinary(NativeBinaryFile),
    TimeSeriesText(TexteFile),
    Forcing(ForcingArchiveFile),
}

impl FileReader {
    fn open(
        path: &Path,
        kind: ContentKind,
        format: ContainerFormat,
        geometry: Option<GeometryModel>,
        config: &ReaderConfig,
    ) -> Result<Self> {
        use ContainerFormat::*;
        use ContentKind::*;

        match (kind, format) {
            (StateSnapshot, TextCardDeck) => {
                Ok(FileReader::CardDeck(CardDeckFile::open(path, geometry, config)?))
            }
            (StateSnapshot | TimeSeries, SelfDescribingArray) => Ok(FileReader::SelfDescribing(
                NetcdfSurfexFile::open(path, geometry, config)?,
            )),
            (StateSnapshot, NativeBinary) => Ok(FileReader::NativeBinary(NativeBinaryFile::open(
                path, geometry, config,
            )?)),
            (TimeSeries, FixedWidthTimeSeries) => {
                Ok(FileReader::TimeSeriesText(TexteFile::open(path, geometry)?))
            }
            (ForcingArchive, SelfDescribingArray) => {
                Ok(FileReader::Forcing(ForcingArchiveFile::open(path, geometry)?))
            }
            (kind, format) => Err(ForcingError::unknown_format(
                path.display().to_string(),
                kind,
                format,
            )),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            FileReader::CardDeck(r) => r.path(),
            FileReader::SelfDescribing(r) => r.path(),
            FileReader::NativeBinary(r) => r.path(),
            FileReader::TimeSeriesText(r) => r.path(),
            FileReader::Forcing(r) => r.path(),
        }
    }

    pub fn geometry(&self) -> &GeometryModel {
        match self {
            FileReader::CardDeck(r) => r.geometry(),
            FileReader::SelfDescribing(r) => r.geometry(),
            FileReader::NativeBinary(r) => r.geometry(),
            FileReader::TimeSeriesText(r) => r.geometry(),
            FileReader::Forcing(r) => r.geometry(),
        }
    }

    pub fn field(&mut self, var: &VariableDescriptor) -> Result<RawField> {
        match self {
            FileReader::CardDeck(r) => r.field(var),
            FileReader::SelfDescribing(r) => r.field(var),
            FileReader::NativeBinary(r) => r.field(var),
            FileReader::TimeSeriesText(r) => r.field(var),
            FileReader::Forcing(r) => r.field(var),
        }
    }
}

/// An open forcing or surface file of any supported format.
#[derive(Debug)]
pub struct SurfexFile {
    reader: FileReader,
    kind: ContentKind,
    format: ContainerFormat,
    config: ReaderConfig,
}

impl SurfexFile {
    /// Detect the file type and open the matching reader.
    pub fn open(path: impl AsRef<Path>, options: OpenOptions) -> Result<Self> {
        let path = path.as_ref();
        options.config.validate().map_err(ForcingError::Config)?;

        let (kind, format) = detect(path, options.kind, options.format)?;
        let reader = FileReader::open(path, kind, format, options.geometry, &options.config)?;

        info!(
            file = %path.display(),
            kind = %kind,
            format = %format,
            npoints = reader.geometry().npoints(),
            "Opened file"
        );

        Ok(Self {
            reader,
            kind,
            format,
            config: options.config,
        })
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    pub fn format(&self) -> ContainerFormat {
        self.format
    }

    pub fn path(&self) -> &Path {
        self.reader.path()
    }

    pub fn geometry(&self) -> &GeometryModel {
        self.reader.geometry()
    }

    pub fn reader(&self) -> &FileReader {
        &self.reader
    }

    pub fn reader_mut(&mut self) -> &mut FileReader {
        &mut self.reader
    }

    /// Extract a variable on the file's own geometry.
    pub fn field(&mut self, var: &VariableDescriptor) -> Result<(RawField, GeometryModel)> {
        let field = self.reader.field(var)?;
        debug!(
            file = %self.path().display(),
            variable = %var.name,
            shape = ?field.shape(),
            "Extracted field"
        );
        Ok((field, self.geometry().clone()))
    }

    /// Extract a variable and remap it onto `target`.
    pub fn points(
        &mut self,
        var: &VariableDescriptor,
        target: &GeometryModel,
        method: InterpolationMethod,
        cache: Option<&mut WeightCache>,
    ) -> Result<(RawField, Interpolator)> {
        let (field, source) = self.field(var)?;
        let interpolator = Interpolator::new(method, &source, target, cache, &self.config)?;
        let remapped = interpolator.interpolate(&field)?;
        Ok((remapped, interpolator))
    }

    /// Release the underlying file.
    pub fn close(self) {
        debug!(file = %self.path().display(), "Closed file");
    }
}

/// Open, extract and close in one call.
pub fn read_field(
    path: impl AsRef<Path>,
    options: OpenOptions,
    var: &VariableDescriptor,
) -> Result<(RawField, GeometryModel)> {
    let mut file = SurfexFile::open(path, options)?;
    let result = file.field(var);
    file.close();
    result
}

/// Open, extract, remap and close in one call.
pub fn read_points(
    path: impl AsRef<Path>,
    options: OpenOptions,
    var: &VariableDescriptor,
    target: &GeometryModel,
    method: InterpolationMethod,
    cache: Option<&mut WeightCache>,
) -> Result<(RawField, Interpolator)> {
    let mut file = SurfexFile::open(path, options)?;
    let result = file.points(var, target, method, cache);
    file.close();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GridDefinition;
    use chrono::TimeZone;

    fn reg(nlon: usize, nlat: usize) -> GeometryModel {
        GeometryModel::new(GridDefinition::LonLatReg {
            lonmin: 0.0,
            latmin: 0.0,
            lonmax: 1.0,
            latmax: 1.0,
            nlon,
            nlat,
        })
        .unwrap()
    }

    #[test]
    fn test_resolve_geometry() {
        let path = Path::new("PREP.txt");
        assert_eq!(resolve_geometry(Some(reg(2, 2)), None, path).unwrap(), reg(2, 2));
        assert_eq!(resolve_geometry(None, Some(reg(2, 2)), path).unwrap(), reg(2, 2));

        let masked = reg(2, 2).with_mask(vec![0, 3]).unwrap();
        let chosen = resolve_geometry(Some(reg(2, 2)), Some(masked.clone()), path).unwrap();
        assert_eq!(chosen, masked);

        let err = resolve_geometry(Some(reg(2, 2)), Some(reg(3, 2)), path).unwrap_err();
        assert!(matches!(err, ForcingError::GeometryMismatch(_)));

        let err = resolve_geometry(None, None, path).unwrap_err();
        assert!(matches!(err, ForcingError::MissingGeometry(_)));
    }

    #[test]
    fn test_check_snapshot_time() {
        let valid = Utc.with_ymd_and_hms(2020, 3, 1, 6, 0, 0).unwrap();
        let same_hour = Utc.with_ymd_and_hms(2020, 3, 1, 6, 30, 0).unwrap();
        let other = Utc.with_ymd_and_hms(2020, 3, 1, 7, 0, 0).unwrap();

        assert!(check_snapshot_time(Some(valid), &[]).is_ok());
        assert!(check_snapshot_time(Some(valid), &[other, same_hour]).is_ok());
        assert!(check_snapshot_time(None, &[other]).is_ok());
        let err = check_snapshot_time(Some(valid), &[other]).unwrap_err();
        assert!(matches!(err, ForcingError::TimeNotFound(_)));
    }

    #[test]
    fn test_unsupported_combination() {
        let err = SurfexFile::open(
            "FORCING.txt",
            OpenOptions::new().geometry(reg(2, 2)),
        )
        .unwrap_err();
        assert!(matches!(err, ForcingError::UnknownFormat { .. }));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = ReaderConfig::default();
        config.linear_neighbours = 0;
        let err = SurfexFile::open("PREP.txt", OpenOptions::new().config(config)).unwrap_err();
        assert!(matches!(err, ForcingError::Config(_)));
    }
}
