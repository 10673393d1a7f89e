//! Fixture writers for every supported container.
//!
//! Each writer produces the smallest file the readers accept, so tests can
//! describe a file inline and read it back.

use std::fmt::Display;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bytes::{BufMut, BytesMut};
use chrono::{DateTime, Datelike, Timelike, Utc};

/// Scratch directory removed when dropped.
pub fn scratch_dir() -> io::Result<tempfile::TempDir> {
    tempfile::Builder::new().prefix("forcing-test").tempdir()
}

/// Builder for text card decks.
///
/// ```
/// use test_utils::CardDeckBuilder;
///
/// let text = CardDeckBuilder::new()
///     .text("GRID_TYPE", "LONLAT REG")
///     .integers("NLON", &[2])
///     .render();
/// assert!(text.starts_with("&FULL GRID_TYPE\n(-)\nLONLAT REG\n"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CardDeckBuilder {
    blocks: Vec<(String, String, Vec<String>)>,
}

impl CardDeckBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a block on an explicit tile.
    pub fn block(mut self, tile: &str, name: &str, lines: Vec<String>) -> Self {
        self.blocks
            .push((tile.to_string(), name.to_string(), lines));
        self
    }

    /// Float block on the `FULL` tile, five values per line.
    pub fn floats(self, name: &str, values: &[f64]) -> Self {
        self.tile_floats("FULL", name, values)
    }

    pub fn tile_floats(self, tile: &str, name: &str, values: &[f64]) -> Self {
        self.block(tile, name, wrap(values, 5))
    }

    pub fn integers(self, name: &str, values: &[i64]) -> Self {
        self.block("FULL", name, wrap(values, 8))
    }

    pub fn text(self, name: &str, value: &str) -> Self {
        self.block("FULL", name, vec![value.to_string()])
    }

    /// `LONLAT REG` grid parameters.
    pub fn lonlat_reg(
        self,
        (lonmin, latmin, lonmax, latmax): (f64, f64, f64, f64),
        nlon: i64,
        nlat: i64,
    ) -> Self {
        self.text("GRID_TYPE", "LONLAT REG")
            .floats("LONMIN", &[lonmin])
            .floats("LATMIN", &[latmin])
            .floats("LONMAX", &[lonmax])
            .floats("LATMAX", &[latmax])
            .integers("NLON", &[nlon])
            .integers("NLAT", &[nlat])
    }

    /// `DTCUR%TDATE` / `DTCUR%TIME` validity blocks.
    pub fn validity(self, time: DateTime<Utc>) -> Self {
        self.integers(
            "DTCUR%TDATE",
            &[time.year() as i64, time.month() as i64, time.day() as i64],
        )
        .floats("DTCUR%TIME", &[time.num_seconds_from_midnight() as f64])
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for (tile, name, lines) in &self.blocks {
            out.push_str(&format!("&{} {}\n(-)\n", tile.trim_start_matches('&'), name));
            for line in lines {
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }

    /// Write the deck to `dir/file_name`.
    pub fn write(&self, dir: &Path, file_name: &str) -> io::Result<PathBuf> {
        let path = dir.join(file_name);
        fs::write(&path, self.render())?;
        Ok(path)
    }
}

fn wrap<T: Display>(values: &[T], per_line: usize) -> Vec<String> {
    values
        .chunks(per_line.max(1))
        .map(|chunk| {
            chunk
                .iter()
                .map(|v| format!("{:>14}", v))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

/// Write a fixed-width time-series file, each row wrapped at `per_line`
/// values.
pub fn write_texte(
    dir: &Path,
    file_name: &str,
    rows: &[Vec<f64>],
    per_line: usize,
) -> io::Result<PathBuf> {
    let mut out = String::new();
    for row in rows {
        for line in wrap(row, per_line) {
            out.push_str(&line);
            out.push('\n');
        }
    }
    let path = dir.join(file_name);
    fs::write(&path, out)?;
    Ok(path)
}

/// One article of a native binary fixture.
#[derive(Debug, Clone)]
pub enum ArticleData {
    Real(Vec<f64>),
    Integer(Vec<i64>),
    Text(String),
}

/// Encode articles in the native binary container layout.
pub fn encode_articles(articles: &[(&str, ArticleData)]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.put_u64(articles.len() as u64);
    for (name, data) in articles {
        let mut padded = format!("{:<16}", name).into_bytes();
        padded.truncate(16);
        buf.put_slice(&padded);
        let (tag, len) = match data {
            ArticleData::Real(v) => (b'R', v.len()),
            ArticleData::Integer(v) => (b'I', v.len()),
            ArticleData::Text(s) => (b'C', s.len()),
        };
        buf.put_u8(tag);
        buf.put_slice(&[0u8; 7]);
        buf.put_u64(len as u64);
        match data {
            ArticleData::Real(v) => v.iter().for_each(|x| buf.put_f64(*x)),
            ArticleData::Integer(v) => v.iter().for_each(|x| buf.put_i64(*x)),
            ArticleData::Text(s) => {
                buf.put_slice(s.as_bytes());
                let pad = (8 - s.len() % 8) % 8;
                buf.put_bytes(b' ', pad);
            }
        }
    }
    buf.to_vec()
}

/// Write a native binary file.
pub fn write_native_binary(
    dir: &Path,
    file_name: &str,
    articles: &[(&str, ArticleData)],
) -> io::Result<PathBuf> {
    let path = dir.join(file_name);
    fs::write(&path, encode_articles(articles))?;
    Ok(path)
}

/// `LONLAT REG` grid articles.
pub fn lonlat_reg_articles(
    (lonmin, latmin, lonmax, latmax): (f64, f64, f64, f64),
    nlon: i64,
    nlat: i64,
) -> Vec<(&'static str, ArticleData)> {
    vec![
        ("GRID_TYPE", ArticleData::Text("LONLAT REG".to_string())),
        ("LONMIN", ArticleData::Real(vec![lonmin])),
        ("LATMIN", ArticleData::Real(vec![latmin])),
        ("LONMAX", ArticleData::Real(vec![lonmax])),
        ("LATMAX", ArticleData::Real(vec![latmax])),
        ("NLON", ArticleData::Integer(vec![nlon])),
        ("NLAT", ArticleData::Integer(vec![nlat])),
    ]
}

#[derive(Debug, Clone)]
struct VariableSpec {
    name: String,
    dims: Vec<String>,
    values: Vec<f64>,
    attributes: Vec<(String, String)>,
}

/// Builder for small NetCDF files.
///
/// Dimensions are declared explicitly; variables are `f64`.
#[derive(Debug, Clone, Default)]
pub struct NetcdfFixture {
    dimensions: Vec<(String, usize)>,
    attributes: Vec<(String, String)>,
    variables: Vec<VariableSpec>,
}

impl NetcdfFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dimension(mut self, name: &str, len: usize) -> Self {
        self.dimensions.push((name.to_string(), len));
        self
    }

    /// Global text attribute.
    pub fn attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.push((name.to_string(), value.to_string()));
        self
    }

    pub fn variable(mut self, name: &str, dims: &[&str], values: Vec<f64>) -> Self {
        self.variables.push(VariableSpec {
            name: name.to_string(),
            dims: dims.iter().map(|d| d.to_string()).collect(),
            values,
            attributes: Vec::new(),
        });
        self
    }

    /// Text attribute on the most recently added variable.
    pub fn variable_attribute(mut self, name: &str, value: &str) -> Self {
        if let Some(var) = self.variables.last_mut() {
            var.attributes.push((name.to_string(), value.to_string()));
        }
        self
    }

    /// A single-value parameter on a length-1 dimension named `one`.
    pub fn parameter(self, name: &str, value: f64) -> Self {
        let this = if self.dimensions.iter().any(|(d, _)| d == "one") {
            self
        } else {
            self.dimension("one", 1)
        };
        this.variable(name, &["one"], vec![value])
    }

    /// `LONLAT REG` grid parameters (global `GRID_TYPE` attribute).
    pub fn lonlat_reg(
        self,
        (lonmin, latmin, lonmax, latmax): (f64, f64, f64, f64),
        nlon: usize,
        nlat: usize,
    ) -> Self {
        self.attribute("GRID_TYPE", "LONLAT REG")
            .parameter("LONMIN", lonmin)
            .parameter("LATMIN", latmin)
            .parameter("LONMAX", lonmax)
            .parameter("LATMAX", latmax)
            .parameter("NLON", nlon as f64)
            .parameter("NLAT", nlat as f64)
    }

    /// A `time` axis with hourly-resolution offsets in `units`.
    pub fn time_axis(self, units: &str, offsets: Vec<f64>) -> Self {
        let n = offsets.len();
        self.dimension("time", n)
            .variable("time", &["time"], offsets)
            .variable_attribute("units", units)
            .variable_attribute("calendar", "standard")
    }

    /// `DTCUR-*` validity parameters.
    pub fn validity(self, time: DateTime<Utc>) -> Self {
        self.parameter("DTCUR-YEAR", time.year() as f64)
            .parameter("DTCUR-MONTH", time.month() as f64)
            .parameter("DTCUR-DAY", time.day() as f64)
            .parameter("DTCUR-TIME", time.num_seconds_from_midnight() as f64)
    }

    /// Write the file to `dir/file_name`.
    pub fn write(&self, dir: &Path, file_name: &str) -> Result<PathBuf, netcdf::Error> {
        let path = dir.join(file_name);
        let mut file = netcdf::create(&path)?;

        for (name, len) in &self.dimensions {
            file.add_dimension(name, *len)?;
        }
        for (name, value) in &self.attributes {
            file.add_attribute(name, value.as_str())?;
        }
        for spec in &self.variables {
            let dims: Vec<&str> = spec.dims.iter().map(|d| d.as_str()).collect();
            let mut var = file.add_variable::<f64>(&spec.name, &dims)?;
            for (name, value) in &spec.attributes {
                var.put_attribute(name, value.as_str())?;
            }
            var.put_values(&spec.values, ..)?;
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_deck_render() {
        let text = CardDeckBuilder::new()
            .floats("XX", &[1.0, 2.5])
            .tile_floats("NATURE", "TG1", &[1e20])
            .render();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "&FULL XX");
        assert_eq!(lines[1], "(-)");
        assert_eq!(lines[2].split_whitespace().collect::<Vec<_>>(), vec!["1", "2.5"]);
        assert_eq!(lines[3], "&NATURE TG1");
        assert_eq!(lines[5].trim().parse::<f64>().unwrap(), 1e20);
    }

    #[test]
    fn test_wrap_lines() {
        let lines = wrap(&[1, 2, 3, 4, 5], 2);
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_encode_articles_layout() {
        let bytes = encode_articles(&[("GRID_TYPE", ArticleData::Text("IGN".to_string()))]);
        // count + name + tag/pad + length + padded text
        assert_eq!(bytes.len(), 8 + 16 + 8 + 8 + 8);
        assert_eq!(&bytes[8..17], b"GRID_TYPE");
        assert_eq!(bytes[24], b'C');
    }
}
