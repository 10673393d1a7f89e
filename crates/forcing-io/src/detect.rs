//! File kind and container format detection from file names.
//!
//! Detection is purely name based: no I/O happens here.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ForcingError, Result};

/// What a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentKind {
    /// Model state or physiography at one validity time (PREP, PGD, SURFOUT).
    StateSnapshot,
    /// Model output time series (PROGNOSTIC, DIAGNOSTICS, SURF_ATM, *.TXT).
    TimeSeries,
    /// Atmospheric forcing archive (Forc_*, FORCING*).
    ForcingArchive,
}

impl ContentKind {
    /// Parse the short names used on the command line.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "surf" | "snapshot" | "state" => Some(Self::StateSnapshot),
            "ts" | "timeseries" | "time-series" => Some(Self::TimeSeries),
            "forcing" => Some(Self::ForcingArchive),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StateSnapshot => "surf",
            Self::TimeSeries => "ts",
            Self::ForcingArchive => "forcing",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a file is encoded on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerFormat {
    /// Line-oriented `&TILE NAME` header/value blocks (`*.txt`).
    TextCardDeck,
    /// NetCDF (`*.nc`).
    SelfDescribingArray,
    /// Word-oriented binary article container (`*.fa`, `*.sfx`).
    NativeBinary,
    /// Whitespace-separated time-series values (`*.TXT`).
    FixedWidthTimeSeries,
}

impl ContainerFormat {
    /// Parse the short names used on the command line.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ascii" => Some(Self::TextCardDeck),
            "netcdf" | "nc" => Some(Self::SelfDescribingArray),
            "fa" | "sfx" | "binary" => Some(Self::NativeBinary),
            "texte" => Some(Self::FixedWidthTimeSeries),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TextCardDeck => "ascii",
            Self::SelfDescribingArray => "netcdf",
            Self::NativeBinary => "fa",
            Self::FixedWidthTimeSeries => "texte",
        }
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn extension(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// Infer the content kind from a file name.
///
/// Rules are applied in order and later matches override earlier ones.
/// Returns `None` when nothing matched.
pub fn detect_kind(path: &Path) -> Result<Option<ContentKind>> {
    let name = file_name(path);
    let ext = extension(&name);
    let mut kind = None;

    if name.contains("PREP") || name.contains("PGD") {
        kind = Some(ContentKind::StateSnapshot);
    }
    if ext.ends_with("nc") {
        kind = Some(ContentKind::StateSnapshot);
    }
    if name.contains("PROGNOSTIC")
        || name.contains("DIAGNOSTICS")
        || name.contains("SURF_ATM")
        || ext.ends_with("TXT")
    {
        kind = Some(ContentKind::TimeSeries);
    }
    if name.contains("Forc_") || name.contains("FORCING") {
        kind = Some(ContentKind::ForcingArchive);
    }

    if kind.is_none() && name.contains("SURFOUT") {
        return Err(ForcingError::AmbiguousFileKind(name));
    }
    Ok(kind)
}

/// Infer the container format from the file extension (case-sensitive).
pub fn detect_format(path: &Path) -> Option<ContainerFormat> {
    let name = file_name(path);
    let ext = extension(&name);

    let mut format = None;
    if ext.ends_with("txt") {
        format = Some(ContainerFormat::TextCardDeck);
    }
    if ext.ends_with("TXT") {
        format = Some(ContainerFormat::FixedWidthTimeSeries);
    }
    if ext.ends_with("nc") {
        format = Some(ContainerFormat::SelfDescribingArray);
    }
    if ext.ends_with("fa") || ext.ends_with("sfx") {
        format = Some(ContainerFormat::NativeBinary);
    }
    format
}

/// Resolve `(kind, format)` for a file, honouring explicit hints.
pub fn detect(
    path: &Path,
    kind: Option<ContentKind>,
    format: Option<ContainerFormat>,
) -> Result<(ContentKind, ContainerFormat)> {
    let kind = match kind {
        Some(kind) => Some(kind),
        None => detect_kind(path)?,
    };
    let format = format.or_else(|| detect_format(path));

    match (kind, format) {
        (Some(kind), Some(format)) => {
            debug!(file = %path.display(), kind = %kind, format = %format, "Detected file type");
            Ok((kind, format))
        }
        (kind, format) => Err(ForcingError::unknown_format(
            path.display().to_string(),
            kind,
            format,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(name: &str) -> Option<ContentKind> {
        detect_kind(Path::new(name)).unwrap()
    }

    #[test]
    fn test_detect_kind() {
        assert_eq!(kind("PREP.txt"), Some(ContentKind::StateSnapshot));
        assert_eq!(kind("/data/PGD.fa"), Some(ContentKind::StateSnapshot));
        assert_eq!(kind("anything.nc"), Some(ContentKind::StateSnapshot));
        assert_eq!(kind("ISBA_PROGNOSTIC.OUT.nc"), Some(ContentKind::TimeSeries));
        assert_eq!(kind("SURF_ATM_DIAGNOSTICS.OUT.nc"), Some(ContentKind::TimeSeries));
        assert_eq!(kind("T2M.TEB.TXT"), Some(ContentKind::TimeSeries));
        assert_eq!(kind("FORCING.nc"), Some(ContentKind::ForcingArchive));
        assert_eq!(kind("Forc_TA.TXT"), Some(ContentKind::ForcingArchive));
        assert_eq!(kind("SURFOUT.nc"), Some(ContentKind::StateSnapshot));
        assert_eq!(kind("unknown.dat"), None);
    }

    #[test]
    fn test_surfout_text_is_ambiguous() {
        let err = detect_kind(Path::new("SURFOUT.20200101_00h00.txt")).unwrap_err();
        assert!(matches!(err, ForcingError::AmbiguousFileKind(_)));
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format(Path::new("PGD.txt")), Some(ContainerFormat::TextCardDeck));
        assert_eq!(
            detect_format(Path::new("T2M.TXT")),
            Some(ContainerFormat::FixedWidthTimeSeries)
        );
        assert_eq!(
            detect_format(Path::new("PREP.nc")),
            Some(ContainerFormat::SelfDescribingArray)
        );
        assert_eq!(detect_format(Path::new("PREP.fa")), Some(ContainerFormat::NativeBinary));
        assert_eq!(detect_format(Path::new("ICMSHHARM+0003.sfx")), Some(ContainerFormat::NativeBinary));
        assert_eq!(detect_format(Path::new("PREP.grib")), None);
    }

    #[test]
    fn test_detect_with_hints() {
        let (k, f) = detect(
            Path::new("SURFOUT.txt"),
            Some(ContentKind::StateSnapshot),
            None,
        )
        .unwrap();
        assert_eq!(k, ContentKind::StateSnapshot);
        assert_eq!(f, ContainerFormat::TextCardDeck);

        let (_, f) = detect(
            Path::new("data.bin"),
            Some(ContentKind::StateSnapshot),
            Some(ContainerFormat::NativeBinary),
        )
        .unwrap();
        assert_eq!(f, ContainerFormat::NativeBinary);
    }

    #[test]
    fn test_detect_unknown() {
        let err = detect(Path::new("data.bin"), None, None).unwrap_err();
        assert!(matches!(err, ForcingError::UnknownFormat { .. }));

        let err = detect(Path::new("PGD.grib"), None, None).unwrap_err();
        assert!(matches!(err, ForcingError::UnknownFormat { .. }));
    }

    #[test]
    fn test_short_names() {
        assert_eq!(ContentKind::from_str("ts"), Some(ContentKind::TimeSeries));
        assert_eq!(ContainerFormat::from_str("TEXTE"), Some(ContainerFormat::FixedWidthTimeSeries));
        assert_eq!(ContainerFormat::NativeBinary.to_string(), "fa");
    }
}
