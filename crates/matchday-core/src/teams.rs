// Per-team display metadata published alongside the standings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Display name, manager and logo for one fantasy team.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamDetails {
    pub team: String,
    #[serde(default)]
    pub manager: String,
    #[serde(default)]
    pub logo: String,
}

/// Team id -> details.
pub type TeamDirectory = BTreeMap<String, TeamDetails>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_optional_fields_read_as_empty() {
        let dir: TeamDirectory =
            serde_json::from_str(r#"{"t1": {"team": "Alpha", "logo": "https://img/alpha.png"}}"#)
                .unwrap();
        let alpha = &dir["t1"];
        assert_eq!(alpha.team, "Alpha");
        assert_eq!(alpha.manager, "");
        assert_eq!(alpha.logo, "https://img/alpha.png");
    }
}
