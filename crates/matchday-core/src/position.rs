// Player positions and their canonical ordering.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Soccer positions used for scoring and lineup formation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(from = "Option<String>")]
pub enum Position {
    Goalkeeper,
    Defender,
    Midfielder,
    Forward,
}

impl Position {
    /// Position used when a record carries no recognizable position.
    pub const FALLBACK: Position = Position::Midfielder;

    pub const ALL: [Position; 4] = [
        Position::Goalkeeper,
        Position::Defender,
        Position::Midfielder,
        Position::Forward,
    ];

    /// Parse a single position token.
    ///
    /// Accepts short codes ("G", "D", "M", "F", plus "GK"/"FW"/"ST") and the
    /// long names used by some feeds ("Goalkeeper", "Defenders", ...).
    pub fn from_str_pos(s: &str) -> Option<Self> {
        let upper = s.trim().to_uppercase();
        match upper.as_str() {
            "G" | "GK" => return Some(Position::Goalkeeper),
            "D" | "DEF" => return Some(Position::Defender),
            "M" | "MID" => return Some(Position::Midfielder),
            "F" | "FW" | "ST" => return Some(Position::Forward),
            _ => {}
        }
        if upper.contains("GOALKEEPER") || upper.contains("KEEPER") {
            Some(Position::Goalkeeper)
        } else if upper.contains("DEFENDER") {
            Some(Position::Defender)
        } else if upper.contains("MIDFIELDER") {
            Some(Position::Midfielder)
        } else if upper.contains("FORWARD") || upper.contains("STRIKER") {
            Some(Position::Forward)
        } else {
            None
        }
    }

    /// Lenient parse: multi-position strings ("D,M") take the first
    /// recognized token, anything unrecognized becomes [`Position::FALLBACK`].
    pub fn parse_or_fallback(s: &str) -> Self {
        s.split([',', '/'])
            .find_map(Position::from_str_pos)
            .unwrap_or(Position::FALLBACK)
    }

    /// Short code written to persisted documents.
    pub fn code(&self) -> &'static str {
        match self {
            Position::Goalkeeper => "G",
            Position::Defender => "D",
            Position::Midfielder => "M",
            Position::Forward => "F",
        }
    }

    /// Rank used for roster ordering (G < D < M < F).
    pub fn sort_order(&self) -> u8 {
        match self {
            Position::Goalkeeper => 0,
            Position::Defender => 1,
            Position::Midfielder => 2,
            Position::Forward => 3,
        }
    }
}

impl From<String> for Position {
    fn from(raw: String) -> Self {
        Position::parse_or_fallback(&raw)
    }
}

impl From<Option<String>> for Position {
    fn from(raw: Option<String>) -> Self {
        raw.map_or(Position::FALLBACK, Position::from)
    }
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
