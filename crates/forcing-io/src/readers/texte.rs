//! Fixed-width time-series text files (`*.TXT`).
//!
//! The model writes one row per output step: `npoints * npatches` values,
//! wrapped over as many lines as needed, each row ending a line. The file
//! carries no timestamps; row `t` (counting from 1) is valid at
//! `basetime + t * interval`.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use ndarray::Array2;
use tracing::{debug, info};

use super::card_deck::parse_fortran_float;
use crate::error::{ForcingError, Result};
use crate::field::{canonicalize_missing, RawField};
use crate::geometry::GeometryModel;
use crate::time::format_times;
use crate::variable::{DataType, VariableDescriptor};

#[derive(Debug)]
pub struct TexteFile {
    path: PathBuf,
    reader: BufReader<File>,
    geometry: GeometryModel,
}

impl TexteFile {
    /// Open a time-series text file. The geometry must come from elsewhere
    /// (usually the PGD file).
    pub fn open(path: &Path, geometry: Option<GeometryModel>) -> Result<Self> {
        let file = File::open(path)?;
        let geometry =
            geometry.ok_or_else(|| ForcingError::MissingGeometry(path.display().to_string()))?;
        info!(file = %path.display(), geometry = %geometry, "Opened time-series text file");
        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            geometry,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn geometry(&self) -> &GeometryModel {
        &self.geometry
    }

    /// Read the rows whose stamp is requested (all rows when none are).
    ///
    /// The row width is `npoints * max(len(patches), len(layers), 1)`.
    pub fn field(&mut self, var: &VariableDescriptor) -> Result<RawField> {
        let (basetime, interval) = var.time_basis()?;
        var.slots()?;
        let width = self.geometry.npoints() * var.sub_width();

        self.reader.seek(SeekFrom::Start(0))?;

        let mut row: Vec<f64> = Vec::with_capacity(width);
        let mut values: Vec<f64> = Vec::new();
        let mut times = Vec::new();
        let mut step: i32 = 0;
        let mut lineno = 0;

        for line in (&mut self.reader).lines() {
            let line = line?;
            lineno += 1;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            for (i, token) in tokens.iter().enumerate() {
                let value = parse_fortran_float(token)
                    .ok_or_else(|| ForcingError::type_conversion(*token, DataType::Float))?;
                row.push(canonicalize_missing(value));

                if row.len() == width {
                    let remaining = tokens.len() - 1 - i;
                    if remaining != 0 {
                        return Err(ForcingError::RowLengthMismatch {
                            row_len: width,
                            line: lineno,
                            remaining,
                        });
                    }
                    step += 1;
                    let stamp = basetime + interval * step;
                    if var.valid_times.is_empty() || var.valid_times.contains(&stamp) {
                        values.append(&mut row);
                        times.push(stamp);
                    } else {
                        row.clear();
                    }
                }
            }
        }

        if !row.is_empty() {
            return Err(ForcingError::RowLengthMismatch {
                row_len: width,
                line: lineno,
                remaining: row.len(),
            });
        }
        if !var.valid_times.is_empty() && times.is_empty() {
            return Err(ForcingError::TimeNotFound(format_times(&var.valid_times)));
        }

        debug!(file = %self.path.display(), rows = step, kept = times.len(), "Read time series");
        let values = Array2::from_shape_vec((times.len(), width), values)
            .map_err(|e| ForcingError::invalid_format(e.to_string()))?;
        RawField::new(times, values)
    }
}
