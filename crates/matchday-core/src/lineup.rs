// Lineup optimizer: picks the best legal eleven from a scored roster.
//
// The search is greedy, not exhaustive. A fixed core of 1 G / 3 D / 2 M / 1 F
// is taken first, then four flex slots are filled one at a time with the best
// remaining outfield player whose position is still under its cap. When the
// greedy choice of an early flex slot forecloses a better combination later,
// the result is below the true optimum; that is accepted.

use std::collections::HashMap;

use crate::position::Position;
use crate::roster::RosterSnapshot;

/// Total players in a full lineup.
pub const LINEUP_SIZE: usize = 11;

/// Number of flex slots filled after the fixed core.
pub const FLEX_SLOTS: usize = 4;

/// Starters needed before a submitted lineup is trusted as the projection
/// basis instead of an auto-filled best lineup.
pub const MIN_SUBMITTED_STARTERS: usize = 9;

/// A roster player with the points they scored (or are projected to score)
/// in the week under consideration.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPlayer {
    pub player_id: String,
    pub position: Position,
    pub fpts: f64,
}

impl ScoredPlayer {
    pub fn new(player_id: impl Into<String>, position: Position, fpts: f64) -> Self {
        Self {
            player_id: player_id.into(),
            position,
            fpts,
        }
    }
}

/// Minimum count taken into the fixed core for each position.
fn core_count(position: Position) -> usize {
    match position {
        Position::Goalkeeper => 1,
        Position::Defender => 3,
        Position::Midfielder => 2,
        Position::Forward => 1,
    }
}

/// Hard cap on how many players of a position a lineup may hold.
fn position_cap(position: Position) -> usize {
    match position {
        Position::Goalkeeper => 1,
        Position::Defender => 5,
        Position::Midfielder => 5,
        Position::Forward => 3,
    }
}

/// Positions eligible for flex slots, in the order candidates are compared.
/// On equal scores the earlier position keeps the pick.
const FLEX_ORDER: [Position; 3] = [Position::Defender, Position::Midfielder, Position::Forward];

/// The players chosen to play, in selection order (core first, then flex).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lineup {
    pub picks: Vec<ScoredPlayer>,
}

impl Lineup {
    pub fn score(&self) -> f64 {
        self.picks.iter().map(|p| p.fpts).sum()
    }

    pub fn len(&self) -> usize {
        self.picks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.picks.is_empty()
    }

    pub fn count(&self, position: Position) -> usize {
        self.picks.iter().filter(|p| p.position == position).count()
    }
}

/// Select the greedy-best lineup from `players`.
///
/// Short pools leave slots empty rather than failing, so a roster without a
/// forward simply has no forward in its lineup.
pub fn select_lineup(players: &[ScoredPlayer]) -> Lineup {
    // Per-position pools, best first. The sort is stable so equal scores keep
    // roster order.
    let mut pools: HashMap<Position, Vec<&ScoredPlayer>> = HashMap::new();
    for player in players {
        pools.entry(player.position).or_default().push(player);
    }
    for pool in pools.values_mut() {
        pool.sort_by(|a, b| b.fpts.total_cmp(&a.fpts));
        // Ascending from here on, so `pop` yields the best remaining player.
        pool.reverse();
    }

    let mut lineup = Lineup::default();
    let mut taken: HashMap<Position, usize> = HashMap::new();

    for position in Position::ALL {
        let Some(pool) = pools.get_mut(&position) else {
            continue;
        };
        for _ in 0..core_count(position) {
            match pool.pop() {
                Some(player) => {
                    lineup.picks.push(player.clone());
                    *taken.entry(position).or_insert(0) += 1;
                }
                None => break,
            }
        }
    }

    for _ in 0..FLEX_SLOTS {
        let mut best: Option<(Position, f64)> = None;
        for position in FLEX_ORDER {
            if taken.get(&position).copied().unwrap_or(0) >= position_cap(position) {
                continue;
            }
            let Some(candidate) = pools.get(&position).and_then(|pool| pool.last()) else {
                continue;
            };
            if best.map_or(true, |(_, score)| candidate.fpts > score) {
                best = Some((position, candidate.fpts));
            }
        }

        let Some((position, _)) = best else {
            break;
        };
        if let Some(player) = pools.get_mut(&position).and_then(|pool| pool.pop()) {
            lineup.picks.push(player.clone());
            *taken.entry(position).or_insert(0) += 1;
        }
    }

    lineup
}

/// Total points of the greedy-best lineup. An empty roster scores 0.
pub fn best_lineup_score(players: &[ScoredPlayer]) -> f64 {
    select_lineup(players).score()
}

/// Projected points for `roster` given per-player predictions for the week.
///
/// When the team has submitted a lineup (at least
/// [`MIN_SUBMITTED_STARTERS`] starters) the projection is the sum of its
/// starters' predictions. Otherwise the lineup is treated as unset and the
/// best lineup over the whole roster is used. Players without a prediction
/// count as 0.
pub fn projected_lineup_score(roster: &RosterSnapshot, predictions: &HashMap<String, f64>) -> f64 {
    let predicted = |id: &str| predictions.get(id).copied().unwrap_or(0.0);

    let starters: Vec<f64> = roster.starters().map(|e| predicted(&e.player_id)).collect();
    if starters.len() >= MIN_SUBMITTED_STARTERS {
        return starters.iter().sum();
    }

    let scored: Vec<ScoredPlayer> = roster
        .entries()
        .iter()
        .map(|e| ScoredPlayer::new(e.player_id.clone(), e.position, predicted(&e.player_id)))
        .collect();
    best_lineup_score(&scored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::{RosterEntry, RosterStatus};

    fn p(id: &str, position: Position, fpts: f64) -> ScoredPlayer {
        ScoredPlayer::new(id, position, fpts)
    }

    /// Build a roster from per-position score lists. Ids are the position
    /// code plus the index within that list.
    fn squad(g: &[f64], d: &[f64], m: &[f64], f: &[f64]) -> Vec<ScoredPlayer> {
        let mut out = Vec::new();
        for (position, scores) in Position::ALL.into_iter().zip([g, d, m, f]) {
            for (i, score) in scores.iter().enumerate() {
                out.push(p(&format!("{}{}", position.code(), i), position, *score));
            }
        }
        out
    }

    // -----------------------------------------------------------------------
    // Core selection
    // -----------------------------------------------------------------------

    #[test]
    fn empty_roster_scores_zero() {
        assert_eq!(best_lineup_score(&[]), 0.0);
        assert!(select_lineup(&[]).is_empty());
    }

    #[test]
    fn exact_core_roster_sums_every_player() {
        let players = squad(
            &[5.0],
            &[1.0, 2.0, 3.0],
            &[4.0, 4.0],
            &[6.0],
        );
        assert_eq!(best_lineup_score(&players), 25.0);
        assert_eq!(select_lineup(&players).len(), 7);
    }

    #[test]
    fn core_takes_the_best_of_each_position() {
        let players = squad(
            &[2.0, 9.0],
            &[1.0, 8.0, 7.0, 6.0],
            &[3.0],
            &[],
        );
        let lineup = select_lineup(&players);
        assert_eq!(lineup.count(Position::Goalkeeper), 1);
        assert!(lineup.picks.iter().any(|pk| pk.player_id == "G1"));
        // Core: G 9, D 8+7+6, M 3. Flex: remaining D 1 (goalkeepers are never flex).
        assert_eq!(lineup.score(), 9.0 + 8.0 + 7.0 + 6.0 + 3.0 + 1.0);
    }

    #[test]
    fn missing_position_leaves_slot_unfilled() {
        let players = squad(
            &[4.0],
            &[1.0, 1.0, 1.0],
            &[2.0, 2.0],
            &[],
        );
        let lineup = select_lineup(&players);
        assert_eq!(lineup.count(Position::Forward), 0);
        assert_eq!(lineup.score(), 11.0);
    }

    // -----------------------------------------------------------------------
    // Flex slots and caps
    // -----------------------------------------------------------------------

    #[test]
    fn full_squad_fills_eleven() {
        let players = squad(
            &[5.0, 4.0],
            &[6.0, 5.0, 4.0, 3.0, 2.0, 1.0],
            &[9.0, 8.0, 7.0, 6.0, 5.0],
            &[10.0, 2.0, 1.0],
        );
        let lineup = select_lineup(&players);
        assert_eq!(lineup.len(), LINEUP_SIZE);
        // Core: 5 + 6+5+4 + 9+8 + 10 = 47. Flex: M7, M6, M5, D3 = 21.
        assert_eq!(lineup.score(), 68.0);
    }

    #[test]
    fn forward_cap_stops_at_three() {
        let players = squad(
            &[1.0],
            &[1.0, 1.0, 1.0],
            &[1.0, 1.0],
            &[20.0, 19.0, 18.0, 17.0, 16.0],
        );
        let lineup = select_lineup(&players);
        assert_eq!(lineup.count(Position::Forward), 3);
        // Only two more forwards fit; the other two flex slots have no candidates.
        assert_eq!(lineup.len(), 9);
        assert_eq!(lineup.score(), 6.0 + 20.0 + 19.0 + 18.0);
    }

    #[test]
    fn defender_and_midfielder_caps_hold() {
        let players = squad(
            &[1.0],
            &[9.0; 8],
            &[8.0; 8],
            &[0.0],
        );
        let lineup = select_lineup(&players);
        assert_eq!(lineup.count(Position::Defender), 5);
        assert!(lineup.count(Position::Midfielder) <= 5);
        assert_eq!(lineup.len(), LINEUP_SIZE);
    }

    #[test]
    fn flex_tie_goes_to_earlier_position() {
        let players = squad(
            &[1.0],
            &[5.0, 5.0, 5.0, 4.0],
            &[5.0, 5.0, 4.0],
            &[5.0, 4.0],
        );
        let lineup = select_lineup(&players);
        let flex: Vec<Position> = lineup.picks[7..].iter().map(|pk| pk.position).collect();
        assert_eq!(
            flex,
            vec![Position::Defender, Position::Midfielder, Position::Forward]
        );
    }

    /// Sum of the best `n` scores at `position`, or `None` when the roster
    /// holds fewer than `n` such players.
    fn top_n(players: &[ScoredPlayer], position: Position, n: usize) -> Option<f64> {
        let mut scores: Vec<f64> = players
            .iter()
            .filter(|pk| pk.position == position)
            .map(|pk| pk.fpts)
            .collect();
        if scores.len() < n {
            return None;
        }
        scores.sort_by(|a, b| b.total_cmp(a));
        Some(scores[..n].iter().sum())
    }

    #[test]
    fn greedy_matches_best_legal_formation_without_ties() {
        let players = squad(
            &[3.0, 0.25],
            &[7.0, 6.5, 6.0, 2.5, 1.5, 0.75],
            &[8.0, 5.5, 4.5, 3.5, 2.0, 1.25],
            &[9.0, 5.0, 4.0, 0.5],
        );

        let mut best_formation = f64::MIN;
        let mut formations = 0;
        for d in 3..=5 {
            for m in 2..=5 {
                for f in 1..=3 {
                    if d + m + f != LINEUP_SIZE - 1 {
                        continue;
                    }
                    let total = top_n(&players, Position::Goalkeeper, 1).unwrap()
                        + top_n(&players, Position::Defender, d).unwrap()
                        + top_n(&players, Position::Midfielder, m).unwrap()
                        + top_n(&players, Position::Forward, f).unwrap();
                    best_formation = best_formation.max(total);
                    formations += 1;
                }
            }
        }

        // 5-4-1, 5-3-2, 5-2-3, 4-5-1, 4-4-2, 4-3-3, 3-5-2, 3-4-3
        assert_eq!(formations, 8);
        let lineup = select_lineup(&players);
        assert_eq!(lineup.len(), LINEUP_SIZE);
        assert_eq!(lineup.score(), best_formation);
    }

    // -----------------------------------------------------------------------
    // Projections
    // -----------------------------------------------------------------------

    fn roster_with(starters: usize, bench: usize) -> RosterSnapshot {
        let mut entries = Vec::new();
        for i in 0..starters {
            entries.push(RosterEntry {
                player_id: format!("s{i}"),
                position: Position::Midfielder,
                status: RosterStatus::Starter,
            });
        }
        for i in 0..bench {
            entries.push(RosterEntry {
                player_id: format!("b{i}"),
                position: Position::Defender,
                status: RosterStatus::Bench,
            });
        }
        RosterSnapshot::new(entries)
    }

    #[test]
    fn projection_uses_submitted_starters() {
        let roster = roster_with(11, 2);
        let mut preds: HashMap<String, f64> = (0..11).map(|i| (format!("s{i}"), 2.0)).collect();
        preds.insert("b0".into(), 50.0);
        assert_eq!(projected_lineup_score(&roster, &preds), 22.0);
    }

    #[test]
    fn projection_falls_back_to_best_lineup_when_lineup_unset() {
        let roster = roster_with(0, 4);
        let preds: HashMap<String, f64> = (0..4).map(|i| (format!("b{i}"), 1.0 + i as f64)).collect();
        // All defenders: three in the core plus one flex.
        assert_eq!(projected_lineup_score(&roster, &preds), 10.0);
    }

    #[test]
    fn projection_without_predictions_is_zero() {
        assert_eq!(projected_lineup_score(&roster_with(11, 0), &HashMap::new()), 0.0);
    }
}
