//! Read requests.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ForcingError, Result};

/// Declared type of a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DataType {
    #[default]
    Float,
    Integer,
    String,
}

impl DataType {
    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "float" | "real" | "double" => Some(Self::Float),
            "integer" | "int" => Some(Self::Integer),
            "string" | "str" | "char" => Some(Self::String),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Integer => "integer",
            Self::String => "string",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What to read from a file.
///
/// Built per call:
///
/// ```
/// use forcing_io::VariableDescriptor;
///
/// let var = VariableDescriptor::new("TG1").with_patches(vec![0, 2]);
/// assert_eq!(var.sub_width(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDescriptor {
    /// Variable or parameter name.
    pub name: String,
    /// Tile for card-deck and native-binary lookups (default tile if `None`).
    pub tile: Option<String>,
    /// Requested valid times; empty selects every time.
    pub valid_times: Vec<DateTime<Utc>>,
    /// Requested patch indices; empty selects every patch.
    pub patches: Vec<usize>,
    /// Requested layer indices; empty selects every layer.
    pub layers: Vec<usize>,
    /// First time of a fixed-width time series is `basetime + interval`.
    pub basetime: Option<DateTime<Utc>>,
    /// Time-series step.
    pub interval: Option<Duration>,
    pub datatype: DataType,
}

impl VariableDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tile: None,
            valid_times: Vec::new(),
            patches: Vec::new(),
            layers: Vec::new(),
            basetime: None,
            interval: None,
            datatype: DataType::Float,
        }
    }

    pub fn with_tile(mut self, tile: impl Into<String>) -> Self {
        self.tile = Some(tile.into());
        self
    }

    pub fn with_valid_time(mut self, time: DateTime<Utc>) -> Self {
        self.valid_times.push(time);
        self
    }

    pub fn with_valid_times(mut self, times: Vec<DateTime<Utc>>) -> Self {
        self.valid_times = times;
        self
    }

    pub fn with_patches(mut self, patches: Vec<usize>) -> Self {
        self.patches = patches;
        self
    }

    pub fn with_layers(mut self, layers: Vec<usize>) -> Self {
        self.layers = layers;
        self
    }

    pub fn with_basetime(mut self, basetime: DateTime<Utc>) -> Self {
        self.basetime = Some(basetime);
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn with_datatype(mut self, datatype: DataType) -> Self {
        self.datatype = datatype;
        self
    }

    /// Width of the sub-point axis: `max(len(patches), len(layers), 1)`.
    pub fn sub_width(&self) -> usize {
        self.patches.len().max(self.layers.len()).max(1)
    }

    /// Number of requested sub-point slots, or `None` when every slot in the
    /// file is wanted.
    pub fn sub_count(&self) -> Option<usize> {
        if self.patches.is_empty() && self.layers.is_empty() {
            None
        } else {
            Some(self.sub_width())
        }
    }

    /// Block selection for containers that store patches or layers as one
    /// flat sub-point axis: the longer of the two lists, patches on a tie.
    pub fn slots(&self) -> Result<&[usize]> {
        check_pairing(self.patches.len(), self.layers.len())?;
        if self.patches.len() >= self.layers.len() {
            Ok(&self.patches)
        } else {
            Ok(&self.layers)
        }
    }

    /// Base time and interval of a time series.
    pub fn time_basis(&self) -> Result<(DateTime<Utc>, Duration)> {
        let basetime = self.basetime.ok_or(ForcingError::MissingTimeBasis("a base time"))?;
        let interval = self.interval.ok_or(ForcingError::MissingTimeBasis("an interval"))?;
        if interval <= Duration::zero() {
            return Err(ForcingError::MissingTimeBasis("a positive interval"));
        }
        Ok((basetime, interval))
    }
}

/// Pair patch and layer slots of a canonical `(npatch, nlayer)` block.
///
/// When both lists were requested they are paired slot by slot, a
/// single-entry side applying to every slot of the other, so the result
/// has `max(npatch, nlayer)` entries. Otherwise every combination is kept,
/// patch-major.
pub fn pair_slots(npatch: usize, nlayer: usize, paired: bool) -> Result<Vec<(usize, usize)>> {
    if npatch <= 1 || nlayer <= 1 || !paired {
        return Ok((0..npatch)
            .flat_map(|p| (0..nlayer).map(move |l| (p, l)))
            .collect());
    }
    check_pairing(npatch, nlayer)?;
    Ok((0..npatch).map(|s| (s, s)).collect())
}

fn check_pairing(npatch: usize, nlayer: usize) -> Result<()> {
    if npatch > 1 && nlayer > 1 && npatch != nlayer {
        return Err(ForcingError::IncompatibleSelection {
            patches: npatch,
            layers: nlayer,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sub_count() {
        assert_eq!(VariableDescriptor::new("T2M").sub_count(), None);
        assert_eq!(
            VariableDescriptor::new("TG").with_patches(vec![0, 2]).sub_count(),
            Some(2)
        );
        assert_eq!(
            VariableDescriptor::new("WG")
                .with_patches(vec![1])
                .with_layers(vec![0, 1, 2])
                .sub_count(),
            Some(3)
        );
        assert_eq!(
            VariableDescriptor::new("WG").with_layers(vec![0, 1, 2]).slots().unwrap(),
            &[0, 1, 2]
        );
    }

    #[test]
    fn test_slots_with_patches_and_layers() {
        let var = VariableDescriptor::new("WG")
            .with_patches(vec![1])
            .with_layers(vec![0, 1, 2]);
        assert_eq!(var.sub_width(), 3);
        assert_eq!(var.slots().unwrap(), &[0, 1, 2]);

        let var = VariableDescriptor::new("WG")
            .with_patches(vec![0, 1])
            .with_layers(vec![0, 1, 2]);
        assert!(matches!(
            var.slots(),
            Err(ForcingError::IncompatibleSelection { patches: 2, layers: 3 })
        ));
    }

    #[test]
    fn test_pair_slots() {
        assert_eq!(pair_slots(1, 3, true).unwrap(), vec![(0, 0), (0, 1), (0, 2)]);
        assert_eq!(pair_slots(2, 1, true).unwrap(), vec![(0, 0), (1, 0)]);
        assert_eq!(pair_slots(2, 2, true).unwrap(), vec![(0, 0), (1, 1)]);
        assert_eq!(pair_slots(2, 2, false).unwrap().len(), 4);
        assert!(pair_slots(2, 3, true).is_err());
    }

    #[test]
    fn test_time_basis() {
        let var = VariableDescriptor::new("T2M");
        assert!(matches!(
            var.time_basis(),
            Err(ForcingError::MissingTimeBasis(_))
        ));

        let base = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let var = var.with_basetime(base);
        assert!(var.time_basis().is_err());

        let var = var.with_interval(Duration::hours(1));
        assert_eq!(var.time_basis().unwrap(), (base, Duration::hours(1)));
    }

    #[test]
    fn test_datatype_names() {
        assert_eq!(DataType::from_str("INT"), Some(DataType::Integer));
        assert_eq!(DataType::from_str("bogus"), None);
        assert_eq!(DataType::String.to_string(), "string");
    }
}
