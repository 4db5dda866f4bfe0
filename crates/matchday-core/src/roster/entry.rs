// Roster entries and the canonical snapshot ordering.

use serde::{Deserialize, Serialize};

use crate::position::Position;

/// Whether a player was in the submitted lineup or on the bench.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RosterStatus {
    Starter,
    Bench,
}

impl RosterStatus {
    /// Feeds report lineup status as a numeric id: 1 is active, anything
    /// else is a reserve.
    pub fn from_status_id(raw: &str) -> Self {
        if raw.trim() == "1" {
            RosterStatus::Starter
        } else {
            RosterStatus::Bench
        }
    }

    fn sort_order(&self) -> u8 {
        match self {
            RosterStatus::Starter => 0,
            RosterStatus::Bench => 1,
        }
    }
}

/// A player on a team's roster for one week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    #[serde(rename = "id")]
    pub player_id: String,
    #[serde(rename = "pos", default = "fallback_position")]
    pub position: Position,
    #[serde(default = "default_status")]
    pub status: RosterStatus,
}

fn fallback_position() -> Position {
    Position::FALLBACK
}

fn default_status() -> RosterStatus {
    RosterStatus::Bench
}

/// An immutable, canonically ordered roster for one (week, team) pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RosterSnapshot {
    entries: Vec<RosterEntry>,
}

impl RosterSnapshot {
    /// Build a snapshot, dropping entries without a player id and applying
    /// the canonical order: starters before bench, then G < D < M < F.
    /// The sort is stable, so feed order survives within each group.
    pub fn new(mut entries: Vec<RosterEntry>) -> Self {
        entries.retain(|e| !e.player_id.trim().is_empty());
        entries.sort_by_key(|e| (e.status.sort_order(), e.position.sort_order()));
        Self { entries }
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn starters(&self) -> impl Iterator<Item = &RosterEntry> {
        self.entries
            .iter()
            .filter(|e| e.status == RosterStatus::Starter)
    }

    pub fn contains_player(&self, player_id: &str) -> bool {
        self.entries.iter().any(|e| e.player_id == player_id)
    }

    /// Re-apply the canonical order. Used after deserializing snapshots that
    /// were written by older, unsorted caches.
    pub(crate) fn normalized(self) -> Self {
        Self::new(self.entries)
    }
}
