//! Text card-deck files (`*.txt`).
//!
//! A card deck is a sequence of blocks:
//!
//! ```text
//! &FULL GRID_TYPE
//! (-)
//! LONLAT REG
//! &FULL NLON
//! (-)
//!           2
//! ```
//!
//! The header names the tile and the parameter, the next line is a free-text
//! description and the value lines follow until the next header or a blank
//! line.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::{check_snapshot_time, resolve_geometry};
use crate::config::{tile_token, ReaderConfig};
use crate::error::{ForcingError, Result};
use crate::field::{canonicalize_missing, RawField};
use crate::geometry::{reconstruct, GeometryModel, GridParameters, ParameterConvention};
use crate::time::from_date_and_seconds;
use crate::variable::{DataType, VariableDescriptor};

/// Values of one card-deck block.
#[derive(Debug, Clone, PartialEq)]
pub enum CardValues {
    Float(Vec<f64>),
    Integer(Vec<i64>),
    Text(Vec<String>),
}

impl CardValues {
    fn empty(datatype: DataType) -> Self {
        match datatype {
            DataType::Float => CardValues::Float(Vec::new()),
            DataType::Integer => CardValues::Integer(Vec::new()),
            DataType::String => CardValues::Text(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            CardValues::Float(v) => v.len(),
            CardValues::Integer(v) => v.len(),
            CardValues::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Numeric values as floats (empty for text).
    pub fn into_floats(self) -> Vec<f64> {
        match self {
            CardValues::Float(v) => v,
            CardValues::Integer(v) => v.into_iter().map(|i| i as f64).collect(),
            CardValues::Text(_) => Vec::new(),
        }
    }
}

/// Parse a float token, accepting the Fortran `D` exponent.
pub(crate) fn parse_fortran_float(token: &str) -> Option<f64> {
    token.replace(['D', 'd'], "E").parse::<f64>().ok()
}

/// Block scanner over an open card deck.
#[derive(Debug)]
pub struct CardDeckReader {
    reader: BufReader<File>,
    default_tile: String,
}

impl CardDeckReader {
    pub fn new(file: File, default_tile: impl Into<String>) -> Self {
        Self {
            reader: BufReader::new(file),
            default_tile: tile_token(&default_tile.into()),
        }
    }

    /// Value lines of the first `(tile, parameter)` block, if any.
    fn block_lines(&mut self, parameter: &str, tile: &str) -> Result<Option<Vec<String>>> {
        self.reader.seek(SeekFrom::Start(0))?;

        let mut found = false;
        let mut in_values = false;
        let mut lines = Vec::new();
        for line in (&mut self.reader).lines() {
            let line = line?;
            let mut words = line.split_whitespace();
            let first = words.next();
            let is_header = first.map_or(false, |w| w.starts_with('&'));

            if in_values {
                if is_header || first.is_none() {
                    break;
                }
                lines.push(line);
            } else if found {
                // description line
                in_values = true;
            } else if is_header {
                let header_tile = first.unwrap_or_default();
                let header_name = words.next().unwrap_or_default();
                if header_tile.eq_ignore_ascii_case(tile)
                    && header_name.eq_ignore_ascii_case(parameter)
                {
                    found = true;
                }
            }
        }

        Ok(if found { Some(lines) } else { None })
    }

    /// Read a block's values.
    ///
    /// A missing block yields an empty result, not an error.
    pub fn read(
        &mut self,
        parameter: &str,
        tile: Option<&str>,
        datatype: DataType,
    ) -> Result<CardValues> {
        let tile = tile.map(tile_token).unwrap_or_else(|| self.default_tile.clone());
        let lines = match self.block_lines(parameter, &tile)? {
            Some(lines) => lines,
            None => {
                warn!(tile = %tile, parameter = parameter, "Parameter not found in card deck");
                return Ok(CardValues::empty(datatype));
            }
        };

        let values = match datatype {
            DataType::Float => CardValues::Float(
                lines
                    .iter()
                    .flat_map(|l| l.split_whitespace())
                    .map(|tok| {
                        parse_fortran_float(tok)
                            .map(canonicalize_missing)
                            .ok_or_else(|| ForcingError::type_conversion(tok, datatype))
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            DataType::Integer => CardValues::Integer(
                lines
                    .iter()
                    .flat_map(|l| l.split_whitespace())
                    .map(|tok| {
                        tok.parse::<i64>()
                            .map_err(|_| ForcingError::type_conversion(tok, datatype))
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            DataType::String => CardValues::Text(
                lines
                    .iter()
                    .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
                    .collect(),
            ),
        };
        debug!(tile = %tile, parameter = parameter, count = values.len(), "Read card-deck block");
        Ok(values)
    }
}

impl GridParameters for CardDeckReader {
    fn grid_type(&mut self) -> Result<Option<String>> {
        match self.read("GRID_TYPE", None, DataType::String)? {
            CardValues::Text(v) => Ok(v.into_iter().next()),
            _ => Ok(None),
        }
    }

    fn floats(&mut self, name: &str) -> Result<Vec<f64>> {
        Ok(self.read(name, None, DataType::Float)?.into_floats())
    }

    fn integers(&mut self, name: &str) -> Result<Vec<i64>> {
        match self.read(name, None, DataType::Integer)? {
            CardValues::Integer(v) => Ok(v),
            _ => Ok(Vec::new()),
        }
    }
}

/// An open card-deck state file.
#[derive(Debug)]
pub struct CardDeckFile {
    path: PathBuf,
    reader: CardDeckReader,
    geometry: GeometryModel,
    version: Option<i64>,
    bug: Option<i64>,
}

impl CardDeckFile {
    /// Open a card deck and reconstruct its grid.
    ///
    /// A supplied geometry is used when the file declares no grid, or
    /// replaces the declared one when it covers the same grid (e.g. to add
    /// a land mask).
    pub fn open(
        path: &Path,
        geometry: Option<GeometryModel>,
        config: &ReaderConfig,
    ) -> Result<Self> {
        let file = File::open(path)?;
        let mut reader = CardDeckReader::new(file, config.default_tile.clone());

        let version = reader.integers("VERSION")?.first().copied();
        let bug = reader.integers("BUG")?.first().copied();

        let reconstructed = reconstruct(&mut reader, ParameterConvention::CardDeck, config)?;
        let geometry = resolve_geometry(reconstructed, geometry, path)?;

        info!(
            file = %path.display(),
            version = ?version,
            bug = ?bug,
            geometry = %geometry,
            "Opened card deck"
        );

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            geometry,
            version,
            bug,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn geometry(&self) -> &GeometryModel {
        &self.geometry
    }

    /// Surface model version written in the file.
    pub fn version(&self) -> Option<i64> {
        self.version
    }

    pub fn bug(&self) -> Option<i64> {
        self.bug
    }

    /// Read one block.
    pub fn read(
        &mut self,
        parameter: &str,
        tile: Option<&str>,
        datatype: DataType,
    ) -> Result<CardValues> {
        self.reader.read(parameter, tile, datatype)
    }

    /// Validity time from `DTCUR%TDATE` and `DTCUR%TIME`, if present.
    pub fn validity_time(&mut self) -> Result<Option<DateTime<Utc>>> {
        let date = self.reader.integers("DTCUR%TDATE")?;
        let secs = self.reader.floats("DTCUR%TIME")?;
        match (date.as_slice(), secs.first()) {
            ([year, month, day, ..], Some(&secs)) => {
                Ok(from_date_and_seconds(*year, *month, *day, secs))
            }
            _ => Ok(None),
        }
    }

    /// Extract a float block as a one-row field.
    pub fn field(&mut self, var: &VariableDescriptor) -> Result<RawField> {
        let values = self
            .reader
            .read(&var.name, var.tile.as_deref(), DataType::Float)?
            .into_floats();
        if values.is_empty() {
            return Err(ForcingError::VariableNotFound(var.name.clone()));
        }

        let validity = self.validity_time()?;
        check_snapshot_time(validity, &var.valid_times)?;
        RawField::from_slots(validity, &values, self.geometry.npoints(), var.slots()?)
    }
}
