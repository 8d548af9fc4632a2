use serde::{Deserialize, Serialize};

use crate::game::types::{CharacterClass, Player};

/// One leaderboard row. Rows carry a summary instead of the full record so a
/// full board always fits in a single frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub name: String,
    pub class: CharacterClass,
    pub level: u32,
    pub exp: u32,
    pub kills: u32,
    pub pvp_wins: u32,
}

impl From<&Player> for LeaderboardEntry {
    fn from(p: &Player) -> Self {
        Self {
            name: p.name.clone(),
            class: p.class,
            level: p.level,
            exp: p.exp,
            kills: p.kills,
            pvp_wins: p.pvp_wins,
        }
    }
}

/// Top `limit` players by `(level, exp)` descending. The sort is stable, so
/// ties keep the order of `players`.
pub fn leaderboard<'a, I>(players: I, limit: usize) -> Vec<LeaderboardEntry>
where
    I: IntoIterator<Item = &'a Player>,
{
    let mut rows: Vec<LeaderboardEntry> = players.into_iter().map(LeaderboardEntry::from).collect();
    rows.sort_by(|a, b| (b.level, b.exp).cmp(&(a.level, a.exp)));
    rows.truncate(limit);
    rows
}
