use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::MeterError;

pub mod measurement;

/// Identity of a meter across every dataset and building of the corpus.
///
/// A meter with incomplete metadata has a partially defined identity; the
/// missing parts stay `None` and will never equal a complete identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeterId {
    pub instance: Option<u32>,
    pub building: Option<u32>,
    pub dataset: Option<String>,
}

impl MeterId {
    pub fn new(instance: u32, building: u32, dataset: &str) -> Self {
        MeterId {
            instance: Some(instance),
            building: Some(building),
            dataset: Some(dataset.to_string()),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.instance.is_some() && self.building.is_some() && self.dataset.is_some()
    }
}

fn fmt_opt<T: fmt::Display>(value: &Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "None".to_string(),
    }
}

impl fmt::Display for MeterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dataset = match &self.dataset {
            Some(d) => format!("'{d}'"),
            None => "None".to_string(),
        };
        write!(f, "(instance={}, building={}, dataset={})",
               fmt_opt(&self.instance), fmt_opt(&self.building), dataset)
    }
}

lazy_static! {
    static ref KEY_RE: Regex =
        Regex::new(r"^/*(?:building(\d+)(?:/([A-Za-z_]+)(?:/meter(\d+))?)?)?/*$").unwrap();
}

/// Storage address of a meter's data, e.g. `/building1/elec/meter2`.
///
/// `/` is the dataset root and carries the dataset-wide metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Key {
    pub building: Option<u32>,
    pub utility: Option<String>,
    pub meter: Option<u32>,
}

impl Key {
    pub fn is_root(&self) -> bool {
        self.building.is_none()
    }

    /// Copy of this key addressing another meter; all other fields are kept.
    pub fn with_meter(&self, meter: u32) -> Self {
        let mut key = self.clone();
        key.meter = Some(meter);
        key
    }
}

impl FromStr for Key {
    type Err = MeterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = KEY_RE
            .captures(s.trim())
            .ok_or_else(|| MeterError::InvalidKey(s.to_string()))?;

        let number = |idx: usize| -> Result<Option<u32>, MeterError> {
            match caps.get(idx) {
                Some(m) => m
                    .as_str()
                    .parse::<u32>()
                    .map(Some)
                    .map_err(|_| MeterError::InvalidKey(s.to_string())),
                None => Ok(None),
            }
        };

        Ok(Key {
            building: number(1)?,
            utility: caps.get(2).map(|m| m.as_str().to_string()),
            meter: number(3)?,
        })
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let building = match self.building {
            Some(b) => b,
            None => return write!(f, "/"),
        };
        write!(f, "/building{building}")?;
        if let Some(utility) = &self.utility {
            write!(f, "/{utility}")?;
            if let Some(meter) = self.meter {
                write!(f, "/meter{meter}")?;
            }
        }
        Ok(())
    }
}

/// Half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeFrame {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeFrame {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        TimeFrame { start, end }
    }
}
