// Per-player-week stat breakdown published for lineup detail views.
//
// Keys are `"{player_id}_{week}"`; values map upper-case stat codes to their
// weekly totals. Only non-zero totals are kept, negatives included.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::persist;
use crate::stats::StatRow;

/// Stat code -> weekly total for one player.
pub type StatLine = BTreeMap<String, f64>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatDetailDocument {
    entries: BTreeMap<String, StatLine>,
}

pub fn detail_key(player_id: &str, week: u32) -> String {
    format!("{player_id}_{week}")
}

impl StatDetailDocument {
    /// Aggregate raw rows into one line per player-week. Rows sharing a key
    /// (double game weeks) are summed, matching the points lookup.
    pub fn build(rows: &[StatRow]) -> Self {
        let mut entries: BTreeMap<String, StatLine> = BTreeMap::new();
        for row in rows {
            let line = entries.entry(detail_key(&row.player_id, row.week)).or_default();
            *line.entry("FPTS".into()).or_insert(0.0) += row.points();
            *line.entry("MIN".into()).or_insert(0.0) += row.minutes;
            for (code, value) in &row.counts {
                *line.entry(code.to_uppercase()).or_insert(0.0) += value;
            }
        }
        for line in entries.values_mut() {
            line.retain(|_, total| *total != 0.0);
        }
        Self { entries }
    }

    pub fn get(&self, player_id: &str, week: u32) -> Option<&StatLine> {
        self.entries.get(&detail_key(player_id, week))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load a published document; a missing file is an empty document.
    pub fn load(path: &Path) -> Result<Self> {
        Ok(persist::read_json(path)?.unwrap_or_default())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        persist::write_json_atomic(path, self)
    }
}
