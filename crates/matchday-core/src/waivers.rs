// Season totals for players nobody currently rosters.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::position::Position;
use crate::stats::StatRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaiverPlayer {
    pub player_id: String,
    pub player_name: Option<String>,
    pub team: Option<String>,
    pub position: Option<Position>,
    /// Games with at least one minute played.
    pub gp: u32,
    pub minutes: f64,
    pub fpts: f64,
    pub fpts_per_game: f64,
    pub fpts_per_90: f64,
    /// Season totals per stat code.
    pub totals: BTreeMap<String, f64>,
    pub per_90: BTreeMap<String, f64>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn per_90(total: f64, minutes: f64) -> f64 {
    let minutes = if minutes == 0.0 { 1.0 } else { minutes };
    round2(total / minutes * 90.0)
}

#[derive(Default)]
struct Accumulator {
    latest_week: u32,
    player_name: Option<String>,
    team: Option<String>,
    position: Option<Position>,
    gp: u32,
    minutes: f64,
    fpts: f64,
    totals: BTreeMap<String, f64>,
}

impl Accumulator {
    fn add(&mut self, row: &StatRow) {
        // Descriptive fields follow the most recent week.
        if row.week >= self.latest_week {
            self.latest_week = row.week;
            self.player_name = row.player_name.clone().or(self.player_name.take());
            self.team = row.team.clone().or(self.team.take());
            self.position = row.position.or(self.position);
        }
        if row.minutes > 0.0 {
            self.gp += 1;
        }
        self.minutes += row.minutes;
        self.fpts += row.points();
        for (code, count) in &row.counts {
            *self.totals.entry(code.clone()).or_insert(0.0) += count;
        }
    }

    fn finish(self, player_id: String) -> WaiverPlayer {
        let fpts_per_game = if self.gp == 0 {
            0.0
        } else {
            round2(self.fpts / f64::from(self.gp))
        };
        let per_90_stats = self
            .totals
            .iter()
            .map(|(code, total)| (code.clone(), per_90(*total, self.minutes)))
            .collect();
        WaiverPlayer {
            player_id,
            player_name: self.player_name,
            team: self.team,
            position: self.position,
            gp: self.gp,
            minutes: self.minutes,
            fpts: round2(self.fpts),
            fpts_per_game,
            fpts_per_90: per_90(self.fpts, self.minutes),
            totals: self.totals,
            per_90: per_90_stats,
        }
    }
}

/// Aggregate every unrostered player's stat rows into season totals.
///
/// Players with no minutes are dropped. The list is ordered by total fantasy
/// points, highest first; equal totals keep player-id order.
pub fn available_players(rows: &[StatRow], rostered: &HashSet<String>) -> Vec<WaiverPlayer> {
    let mut by_player: BTreeMap<&str, Accumulator> = BTreeMap::new();
    for row in rows.iter().filter(|r| !rostered.contains(&r.player_id)) {
        by_player.entry(row.player_id.as_str()).or_default().add(row);
    }

    let mut players: Vec<WaiverPlayer> = by_player
        .into_iter()
        .map(|(id, acc)| acc.finish(id.to_string()))
        .filter(|p| p.minutes > 0.0)
        .collect();
    players.sort_by(|a, b| b.fpts.total_cmp(&a.fpts));
    players
}
