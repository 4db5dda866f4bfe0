// Per-player point predictions produced by the external forecasting model.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Deserializer};

use crate::persist;

/// One predicted line: `{week, player_id, predicted_fpts}`. Other fields the
/// model writes are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PredictionRow {
    pub week: u32,
    #[serde(deserialize_with = "string_or_number")]
    pub player_id: String,
    #[serde(default)]
    pub predicted_fpts: f64,
}

/// Player ids arrive as strings from some model versions and as bare
/// numbers from others.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
        Float(f64),
    }
    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Int(n) => n.to_string(),
        Id::Float(f) => f.to_string(),
    })
}

/// Predictions indexed by week, then player id.
#[derive(Debug, Clone, Default)]
pub struct Predictions {
    by_week: BTreeMap<u32, HashMap<String, f64>>,
}

impl Predictions {
    pub fn from_rows(rows: Vec<PredictionRow>) -> Self {
        let mut by_week: BTreeMap<u32, HashMap<String, f64>> = BTreeMap::new();
        for row in rows {
            let value = if row.predicted_fpts.is_finite() {
                row.predicted_fpts
            } else {
                0.0
            };
            by_week.entry(row.week).or_default().insert(row.player_id, value);
        }
        Self { by_week }
    }

    /// Load the model's JSON output. A missing file means no predictions.
    pub fn load(path: &Path) -> Result<Self> {
        let rows: Option<Vec<PredictionRow>> = persist::read_json(path)?;
        Ok(Self::from_rows(rows.unwrap_or_default()))
    }

    pub fn for_week(&self, week: u32) -> Option<&HashMap<String, f64>> {
        self.by_week.get(&week)
    }

    /// Weeks that have at least one prediction.
    pub fn weeks(&self) -> impl Iterator<Item = u32> + '_ {
        self.by_week.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.by_week.is_empty()
    }
}
