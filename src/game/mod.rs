//! Game rules: the player record, static catalogs, combat resolution and the
//! economy. Nothing in here touches sockets or disk; callers load a record,
//! run one of these functions on it and persist the result.

pub mod catalog;
pub mod combat;
pub mod economy;
pub mod errors;
pub mod ranking;
pub mod types;

pub use catalog::{Catalog, ItemEffect, MonsterTemplate, Quest, ShopItem, Skill, DUNGEON_LADDER};
pub use combat::{dungeon, hunt, pvp, resolve, Combatant, DungeonOutcome, Engagement, HuntOutcome, PvpOutcome};
pub use errors::GameError;
pub use ranking::{leaderboard, LeaderboardEntry};
pub use types::{CharacterClass, EquipSlot, Player};
