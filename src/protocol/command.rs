//! Typed view of a decoded request record.

use serde::Deserialize;
use serde_json::Value;

/// Every `cmd` the server answers.
pub const COMMAND_NAMES: [&str; 20] = [
    "register",
    "login",
    "hunt",
    "pvp",
    "shop_list",
    "buy_item",
    "sell_item",
    "quest_list",
    "accept_quest",
    "complete_quest",
    "skill_list",
    "use_skill",
    "dungeon",
    "daily_reward",
    "stats",
    "inventory",
    "equip",
    "rest",
    "leaderboard",
    "players_online",
];

/// Argument fields are optional at this layer: a missing or `null` field
/// reaches the handler as `None` and is reported with the handler's own
/// message. A field of the wrong JSON type fails the whole parse with
/// [`ParseError::Invalid`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    Register {
        name: Option<String>,
        class: Option<String>,
    },
    Login {
        name: Option<String>,
    },
    Hunt {
        player: Option<String>,
        difficulty: Option<String>,
    },
    Pvp {
        player: Option<String>,
        opponent: Option<String>,
    },
    ShopList,
    BuyItem {
        player: Option<String>,
        item: Option<String>,
    },
    SellItem {
        player: Option<String>,
        item: Option<String>,
    },
    QuestList,
    AcceptQuest {
        player: Option<String>,
        quest_id: Option<u32>,
    },
    CompleteQuest {
        player: Option<String>,
        quest_id: Option<u32>,
    },
    SkillList,
    UseSkill {
        player: Option<String>,
        skill: Option<String>,
    },
    Dungeon {
        player: Option<String>,
    },
    DailyReward {
        player: Option<String>,
    },
    Stats {
        player: Option<String>,
    },
    Inventory {
        player: Option<String>,
    },
    Equip {
        player: Option<String>,
        item: Option<String>,
    },
    Rest {
        player: Option<String>,
    },
    Leaderboard,
    PlayersOnline,
}

/// Why a request record could not become a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// `cmd` missing, not a string, or not one of [`COMMAND_NAMES`].
    Unknown(Option<String>),
    /// Known `cmd` but an argument has the wrong shape.
    Invalid(&'static str),
}

impl Command {
    pub fn from_request(request: Value) -> Result<Command, ParseError> {
        let name = match request.get("cmd").and_then(Value::as_str) {
            Some(cmd) => match COMMAND_NAMES.iter().find(|known| **known == cmd) {
                Some(known) => *known,
                None => return Err(ParseError::Unknown(Some(cmd.to_string()))),
            },
            None => return Err(ParseError::Unknown(None)),
        };
        serde_json::from_value(request).map_err(|_| ParseError::Invalid(name))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Register { .. } => "register",
            Command::Login { .. } => "login",
            Command::Hunt { .. } => "hunt",
            Command::Pvp { .. } => "pvp",
            Command::ShopList => "shop_list",
            Command::BuyItem { .. } => "buy_item",
            Command::SellItem { .. } => "sell_item",
            Command::QuestList => "quest_list",
            Command::AcceptQuest { .. } => "accept_quest",
            Command::CompleteQuest { .. } => "complete_quest",
            Command::SkillList => "skill_list",
            Command::UseSkill { .. } => "use_skill",
            Command::Dungeon { .. } => "dungeon",
            Command::DailyReward { .. } => "daily_reward",
            Command::Stats { .. } => "stats",
            Command::Inventory { .. } => "inventory",
            Command::Equip { .. } => "equip",
            Command::Rest { .. } => "rest",
            Command::Leaderboard => "leaderboard",
            Command::PlayersOnline => "players_online",
        }
    }

    /// The player record this command acts on, if any.
    pub fn subject(&self) -> Option<&str> {
        match self {
            Command::Register { name, .. } | Command::Login { name } => name.as_deref(),
            Command::Hunt { player, .. }
            | Command::Pvp { player, .. }
            | Command::BuyItem { player, .. }
            | Command::SellItem { player, .. }
            | Command::AcceptQuest { player, .. }
            | Command::CompleteQuest { player, .. }
            | Command::UseSkill { player, .. }
            | Command::Dungeon { player }
            | Command::DailyReward { player }
            | Command::Stats { player }
            | Command::Inventory { player }
            | Command::Equip { player, .. }
            | Command::Rest { player } => player.as_deref(),
            Command::ShopList
            | Command::QuestList
            | Command::SkillList
            | Command::Leaderboard
            | Command::PlayersOnline => None,
        }
    }
}
