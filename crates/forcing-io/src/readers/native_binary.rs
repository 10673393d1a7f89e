//! Native binary article files (`*.fa`, `*.sfx`).
//!
//! The container is word oriented (8-byte big-endian words):
//!
//! | field        | size                                   |
//! |--------------|----------------------------------------|
//! | count        | 8 bytes, number of articles            |
//! | name         | 16 bytes, ASCII, space padded          |
//! | type tag     | 1 byte: `R` real, `I` integer, `C` text |
//! | padding      | 7 bytes                                |
//! | length       | 8 bytes, element count                 |
//! | payload      | 8 bytes per number, text padded to 8   |
//!
//! The whole file is indexed once when it is opened.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use bytes::{Buf, Bytes};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::{check_snapshot_time, resolve_geometry};
use crate::config::ReaderConfig;
use crate::error::{ForcingError, Result};
use crate::field::RawField;
use crate::geometry::{reconstruct, GeometryModel, GridParameters, ParameterConvention};
use crate::time::from_date_and_seconds;
use crate::variable::VariableDescriptor;

/// Length of an article name.
pub const NAME_LEN: usize = 16;

/// Prefix of surface fields in model files.
const SURFACE_PREFIX: &str = "SFX.";

/// Payload of one article.
#[derive(Debug, Clone, PartialEq)]
pub enum Article {
    Real(Vec<f64>),
    Integer(Vec<i64>),
    Text(String),
}

impl Article {
    fn floats(&self) -> Vec<f64> {
        match self {
            Article::Real(v) => v.clone(),
            Article::Integer(v) => v.iter().map(|&i| i as f64).collect(),
            Article::Text(_) => Vec::new(),
        }
    }
}

fn need(buf: &Bytes, n: usize, what: &str) -> Result<()> {
    if buf.remaining() < n {
        return Err(ForcingError::invalid_format(format!(
            "truncated article container reading {} ({} bytes left, {} needed)",
            what,
            buf.remaining(),
            n
        )));
    }
    Ok(())
}

fn read_len(buf: &mut Bytes, what: &str) -> Result<usize> {
    need(buf, 8, what)?;
    usize::try_from(buf.get_u64())
        .map_err(|_| ForcingError::invalid_format(format!("{} does not fit in memory", what)))
}

/// Parse every article of a container.
pub fn parse_articles(mut buf: Bytes) -> Result<Vec<(String, Article)>> {
    let count = read_len(&mut buf, "article count")?;
    let mut articles = Vec::with_capacity(count.min(4096));

    for _ in 0..count {
        need(&buf, NAME_LEN + 8, "article header")?;
        let name_bytes = buf.copy_to_bytes(NAME_LEN);
        let name = String::from_utf8_lossy(&name_bytes).trim_end().to_string();
        let tag = buf.get_u8();
        buf.advance(7);
        let len = read_len(&mut buf, &name)?;

        let article = match tag {
            b'R' => {
                need(&buf, len.saturating_mul(8), &name)?;
                Article::Real((0..len).map(|_| buf.get_f64()).collect())
            }
            b'I' => {
                need(&buf, len.saturating_mul(8), &name)?;
                Article::Integer((0..len).map(|_| buf.get_i64()).collect())
            }
            b'C' => {
                let padded = len.div_ceil(8).checked_mul(8).ok_or_else(|| {
                    ForcingError::invalid_format(format!(
                        "text article {} length {} overflows",
                        name, len
                    ))
                })?;
                need(&buf, padded, &name)?;
                let text = buf.copy_to_bytes(padded);
                Article::Text(String::from_utf8_lossy(&text[..len]).trim_end().to_string())
            }
            other => {
                return Err(ForcingError::invalid_format(format!(
                    "article {} has unknown type tag 0x{:02x}",
                    name, other
                )))
            }
        };
        articles.push((name, article));
    }

    if buf.has_remaining() {
        return Err(ForcingError::invalid_format(format!(
            "{} trailing bytes after {} articles",
            buf.remaining(),
            count
        )));
    }
    Ok(articles)
}

/// Articles of one file keyed by upper-case name.
#[derive(Debug, Default)]
pub struct ArticleIndex {
    articles: HashMap<String, Article>,
}

impl ArticleIndex {
    pub fn from_bytes(data: Bytes) -> Result<Self> {
        let articles = parse_articles(data)?
            .into_iter()
            .map(|(name, article)| (name.to_uppercase(), article))
            .collect();
        Ok(Self { articles })
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    /// Look up `NAME`, then `SFX.NAME` (with a tile, `TILE.NAME` first).
    pub fn get(&self, name: &str, tile: Option<&str>) -> Option<&Article> {
        let name = name.to_uppercase();
        let mut candidates = Vec::with_capacity(3);
        if let Some(tile) = tile {
            candidates.push(format!("{}.{}", tile.trim_start_matches('&').to_uppercase(), name));
        }
        candidates.push(name.clone());
        candidates.push(format!("{}{}", SURFACE_PREFIX, name));
        candidates.iter().find_map(|c| self.articles.get(c))
    }
}

impl GridParameters for ArticleIndex {
    fn grid_type(&mut self) -> Result<Option<String>> {
        Ok(match self.get("GRID_TYPE", None) {
            Some(Article::Text(s)) => Some(s.clone()),
            _ => None,
        })
    }

    fn floats(&mut self, name: &str) -> Result<Vec<f64>> {
        Ok(self.get(name, None).map(Article::floats).unwrap_or_default())
    }

    fn integers(&mut self, name: &str) -> Result<Vec<i64>> {
        Ok(match self.get(name, None) {
            Some(Article::Integer(v)) => v.clone(),
            Some(Article::Real(v)) => v.iter().map(|&x| x.round() as i64).collect(),
            _ => Vec::new(),
        })
    }
}

/// An open native binary state file.
#[derive(Debug)]
pub struct NativeBinaryFile {
    path: PathBuf,
    index: ArticleIndex,
    geometry: GeometryModel,
}

impl NativeBinaryFile {
    pub fn open(
        path: &Path,
        geometry: Option<GeometryModel>,
        config: &ReaderConfig,
    ) -> Result<Self> {
        let data = Bytes::from(std::fs::read(path)?);
        let mut index = ArticleIndex::from_bytes(data)?;
        debug!(file = %path.display(), articles = index.len(), "Indexed articles");

        let reconstructed = reconstruct(&mut index, ParameterConvention::CardDeck, config)?;
        let geometry = resolve_geometry(reconstructed, geometry, path)?;
        info!(file = %path.display(), geometry = %geometry, "Opened native binary file");

        Ok(Self {
            path: path.to_path_buf(),
            index,
            geometry,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn geometry(&self) -> &GeometryModel {
        &self.geometry
    }

    pub fn article(&self, name: &str, tile: Option<&str>) -> Option<&Article> {
        self.index.get(name, tile)
    }

    /// Validity date from the `DTCUR-*` articles, if present.
    pub fn validity_time(&self) -> Option<DateTime<Utc>> {
        let first = |name: &str| {
            self.index
                .get(name, None)
                .and_then(|a| a.floats().first().copied())
        };
        from_date_and_seconds(
            first("DTCUR-YEAR")? as i64,
            first("DTCUR-MONTH")? as i64,
            first("DTCUR-DAY")? as i64,
            first("DTCUR-TIME")?,
        )
    }

    pub fn field(&self, var: &VariableDescriptor) -> Result<RawField> {
        let values = match self.index.get(&var.name, var.tile.as_deref()) {
            Some(Article::Text(_)) | None => {
                return Err(ForcingError::VariableNotFound(var.name.clone()))
            }
            Some(article) => article.floats(),
        };
        let validity = self.validity_time();
        check_snapshot_time(validity, &var.valid_times)?;
        RawField::from_slots(validity, &values, self.geometry.npoints(), var.slots()?)
    }
}
