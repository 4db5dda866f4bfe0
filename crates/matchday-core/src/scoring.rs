// Fantasy scoring rules: per-position weights applied to per-event counts.

use std::collections::HashMap;

use crate::position::Position;

/// (stat code, points per event). Stat codes are lowercase.
type RuleRow = (&'static str, f64);

const GOALKEEPER_RULES: &[RuleRow] = &[
    ("aer", 1.0),
    ("at", 7.0),
    ("cs", 8.0),
    ("dis", -0.5),
    ("gao", -2.0),
    ("g", 10.0),
    ("hcs", 1.0),
    ("int", 1.0),
    ("og", -5.0),
    ("pks", 8.0),
    ("rc", -7.0),
    ("sot", 2.0),
    ("sm", 1.0),
    ("cos", 1.0),
    ("clr", 0.25),
    ("kp", 2.0),
    ("sv", 2.0),
    ("tkw", 1.0),
    ("yc", -2.0),
];

const DEFENDER_RULES: &[RuleRow] = &[
    ("acnc", 1.0),
    ("aer", 1.0),
    ("at", 7.0),
    ("bs", 1.0),
    ("cs", 6.0),
    ("dis", -0.5),
    ("gao", -2.0),
    ("g", 10.0),
    ("int", 1.0),
    ("og", -5.0),
    ("pkd", 2.0),
    ("pkm", -4.0),
    ("rc", -7.0),
    ("sot", 2.0),
    ("cos", 1.0),
    ("clr", 0.25),
    ("kp", 2.0),
    ("tkw", 1.0),
    ("yc", -2.0),
];

const MIDFIELDER_RULES: &[RuleRow] = &[
    ("acnc", 1.0),
    ("aer", 0.5),
    ("at", 6.0),
    ("bs", 1.0),
    ("cs", 1.0),
    ("dis", -0.5),
    ("g", 9.0),
    ("int", 1.0),
    ("og", -5.0),
    ("pkd", 2.0),
    ("pkm", -4.0),
    ("rc", -7.0),
    ("sot", 2.0),
    ("cos", 1.0),
    ("kp", 2.0),
    ("tkw", 1.0),
    ("yc", -2.0),
];

const FORWARD_RULES: &[RuleRow] = &[
    ("acnc", 1.0),
    ("aer", 0.5),
    ("at", 6.0),
    ("bs", 1.0),
    ("dis", -0.5),
    ("g", 9.0),
    ("int", 1.0),
    ("og", -5.0),
    ("pkd", 2.0),
    ("pkm", -4.0),
    ("rc", -7.0),
    ("sot", 2.0),
    ("cos", 1.0),
    ("kp", 2.0),
    ("tkw", 1.0),
    ("yc", -2.0),
];

/// The rule rows for a position.
pub fn rules_for(position: Position) -> &'static [RuleRow] {
    match position {
        Position::Goalkeeper => GOALKEEPER_RULES,
        Position::Defender => DEFENDER_RULES,
        Position::Midfielder => MIDFIELDER_RULES,
        Position::Forward => FORWARD_RULES,
    }
}

/// Weight for a single stat at a position; stats the position does not
/// score return 0.
pub fn weight(position: Position, stat: &str) -> f64 {
    rules_for(position)
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(stat))
        .map_or(0.0, |(_, w)| *w)
}

/// Score a set of per-event counts for a player at `position`.
///
/// Count keys are matched case-insensitively against the rule codes. Missing
/// stats contribute nothing and non-finite counts are treated as zero.
pub fn fantasy_score(position: Position, counts: &HashMap<String, f64>) -> f64 {
    let normalized: HashMap<String, f64> = counts
        .iter()
        .map(|(k, v)| (k.to_lowercase(), *v))
        .collect();

    rules_for(position)
        .iter()
        .map(|(code, w)| {
            let count = normalized.get(*code).copied().unwrap_or(0.0);
            if count.is_finite() {
                w * count
            } else {
                0.0
            }
        })
        .sum()
}

/// Convenience wrapper that accepts a raw position string.
pub fn fantasy_score_for(raw_position: &str, counts: &HashMap<String, f64>) -> f64 {
    fantasy_score(Position::parse_or_fallback(raw_position), counts)
}
