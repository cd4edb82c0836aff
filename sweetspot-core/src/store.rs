//! Keyed store of measured (or predicted) configuration results.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::{CanonicalKey, KeyCodec};
use crate::domain::ParameterDomain;
use crate::error::Result;
use crate::types::ParamValue;

/// Which event produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOrigin {
    /// Baseline measurement of the default configuration
    Default,
    /// Incrementally measured configuration
    New,
    /// Point designated final by the optimizer
    Final,
    /// Model prediction, never measured
    Prediction,
}

impl RecordOrigin {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::New => "new",
            Self::Final => "final",
            Self::Prediction => "prediction",
        }
    }
}

/// Results for one configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub key: CanonicalKey,
    pub configuration: Vec<ParamValue>,
    pub results: Vec<Value>,
    /// Number of measurements observed up to and including this one.
    pub measured_points: usize,
    pub origin: RecordOrigin,
    pub observed_at: DateTime<Utc>,
}

impl ResultRecord {
    /// Build a record, deriving its key from the declared parameters.
    pub fn new(
        configuration: Vec<ParamValue>,
        results: Vec<Value>,
        domains: &[ParameterDomain],
        origin: RecordOrigin,
    ) -> Result<Self> {
        let key = KeyCodec::encode(&configuration, domains)?;
        Ok(Self {
            key,
            configuration,
            results,
            measured_points: 0,
            origin,
            observed_at: Utc::now(),
        })
    }

    /// Numeric result at `index`, if present.
    #[must_use]
    pub fn scalar(&self, index: usize) -> Option<f64> {
        self.results.get(index).and_then(Value::as_f64)
    }
}

/// Canonical mapping from key to record, plus arrival order.
///
/// A key appears at most once: upserting an existing key replaces the record
/// in its original arrival slot.
#[derive(Debug, Default)]
pub struct ResultStore {
    records: Vec<ResultRecord>,
    index: HashMap<CanonicalKey, usize>,
}

impl ResultStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite by key; returns the replaced record, if any.
    pub fn upsert(&mut self, record: ResultRecord) -> Option<ResultRecord> {
        match self.index.get(&record.key) {
            Some(&slot) => Some(std::mem::replace(&mut self.records[slot], record)),
            None => {
                self.index.insert(record.key.clone(), self.records.len());
                self.records.push(record);
                None
            }
        }
    }

    #[must_use]
    pub fn get(&self, key: &CanonicalKey) -> Option<&ResultRecord> {
        self.index.get(key).map(|&slot| &self.records[slot])
    }

    /// Records in arrival order.
    #[must_use]
    pub fn all(&self) -> &[ResultRecord] {
        &self.records
    }

    /// Records indexed by key.
    #[must_use]
    pub fn by_key(&self) -> BTreeMap<&CanonicalKey, &ResultRecord> {
        self.index
            .iter()
            .map(|(key, &slot)| (key, &self.records[slot]))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.index.clear();
    }
}
