// Raw per-player weekly stats: CSV loading and a read-only points index.
//
// The stats table is wide and its column set changes with the feed, so rows
// are read as string records: a handful of known metadata columns, and every
// other column is treated as a per-event count.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use tracing::warn;

use crate::lineup::ScoredPlayer;
use crate::position::Position;
use crate::roster::RosterSnapshot;
use crate::scoring;
use crate::source::SourceError;

/// One player's stat line for one week.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatRow {
    pub player_id: String,
    pub week: u32,
    pub position: Option<Position>,
    pub player_name: Option<String>,
    pub team: Option<String>,
    /// Fantasy points as published by the league host, when present.
    pub fpts: Option<f64>,
    pub minutes: f64,
    /// Per-event counts keyed by lowercase stat code.
    pub counts: HashMap<String, f64>,
}

impl StatRow {
    /// Fantasy points for this line. Published points win; otherwise the
    /// counts are scored with the rule table for the row's position.
    pub fn points(&self) -> f64 {
        match self.fpts {
            Some(fpts) if fpts.is_finite() => fpts,
            _ => scoring::fantasy_score(
                self.position.unwrap_or(Position::FALLBACK),
                &self.counts,
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// CSV loading
// ---------------------------------------------------------------------------

const PLAYER_ID_COLUMNS: &[&str] = &["player_id", "scorerid"];
const WEEK_COLUMNS: &[&str] = &["matchweek", "week"];
const MINUTES_COLUMNS: &[&str] = &["min", "minutes"];
const NAME_COLUMNS: &[&str] = &["player_name", "name"];
const IGNORED_COLUMNS: &[&str] = &["date", "season", "opp", "injured", "status"];

/// Parse a numeric cell, coercing blanks and garbage to zero.
fn coerce_number(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

fn parse_week(raw: &str) -> Option<u32> {
    let value = raw.trim().parse::<f64>().ok()?;
    if value.is_finite() && value >= 1.0 {
        Some(value as u32)
    } else {
        None
    }
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub(crate) fn load_stats_from_reader<R: Read>(rdr: R) -> Result<Vec<StatRow>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let mut rows = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!("skipping malformed stats row {}: {}", line + 2, e);
                continue;
            }
        };

        let mut row = StatRow::default();
        let mut week = None;
        for (header, value) in headers.iter().zip(record.iter()) {
            let h = header.as_str();
            if PLAYER_ID_COLUMNS.contains(&h) {
                row.player_id = value.trim().to_string();
            } else if WEEK_COLUMNS.contains(&h) {
                week = week.or_else(|| parse_week(value));
            } else if MINUTES_COLUMNS.contains(&h) {
                row.minutes = coerce_number(value);
            } else if NAME_COLUMNS.contains(&h) {
                row.player_name = non_empty(value);
            } else if h == "position" {
                row.position = non_empty(value).map(|p| Position::parse_or_fallback(&p));
            } else if h == "team" {
                row.team = non_empty(value);
            } else if h == "fpts" {
                row.fpts = non_empty(value).map(|v| coerce_number(&v));
            } else if IGNORED_COLUMNS.contains(&h) || h.is_empty() {
                continue;
            } else {
                row.counts.insert(h.to_string(), coerce_number(value));
            }
        }

        let Some(week) = week else {
            warn!("skipping stats row {}: missing or invalid week", line + 2);
            continue;
        };
        if row.player_id.is_empty() {
            warn!("skipping stats row {}: missing player id", line + 2);
            continue;
        }
        row.week = week;
        rows.push(row);
    }
    Ok(rows)
}

/// Load a raw stats CSV from disk.
pub fn load_stats_csv(path: &Path) -> Result<Vec<StatRow>, SourceError> {
    let file = std::fs::File::open(path).map_err(|e| SourceError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    load_stats_from_reader(file).map_err(|e| SourceError::Csv {
        path: path.to_path_buf(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Points lookup
// ---------------------------------------------------------------------------

/// Immutable `(player_id, week) -> fantasy points` index.
///
/// Built once per run and only ever read through `&self`; lookups never
/// consume or alter entries, so the same key reads the same value for every
/// caller.
#[derive(Debug, Clone, Default)]
pub struct StatsLookup {
    points: HashMap<(String, u32), f64>,
}

impl StatsLookup {
    /// Index the rows. Multiple rows for the same player and week (double
    /// game weeks) are summed.
    pub fn build(rows: &[StatRow]) -> Self {
        let mut points: HashMap<(String, u32), f64> = HashMap::new();
        for row in rows {
            *points.entry((row.player_id.clone(), row.week)).or_insert(0.0) += row.points();
        }
        Self { points }
    }

    pub fn get(&self, player_id: &str, week: u32) -> Option<f64> {
        self.points.get(&(player_id.to_string(), week)).copied()
    }

    /// Points for a player-week, zero when the player has no line.
    pub fn points(&self, player_id: &str, week: u32) -> f64 {
        self.get(player_id, week).unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Attach this week's points to every player on `roster`.
    pub fn scored_players(&self, roster: &RosterSnapshot, week: u32) -> Vec<ScoredPlayer> {
        roster
            .entries()
            .iter()
            .map(|entry| ScoredPlayer {
                player_id: entry.player_id.clone(),
                position: entry.position,
                fpts: self.points(&entry.player_id, week),
            })
            .collect()
    }
}
