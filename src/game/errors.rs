use thiserror::Error;

/// Rule violations a command can report. None of these end a session: the
/// dispatcher turns them into `{status: error, msg}` with the display text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    // validation
    #[error("Invalid data")]
    InvalidData,
    #[error("Invalid name")]
    InvalidName,
    #[error("Invalid name: {0}")]
    RejectedName(String),
    #[error("Invalid class")]
    InvalidClass,
    #[error("Invalid monster")]
    InvalidMonster,
    #[error("Invalid player names")]
    InvalidPlayerNames,
    #[error("Invalid item")]
    InvalidItem,

    // not found
    #[error("Player not found")]
    PlayerNotFound,
    #[error("Player {0} not found")]
    NamedPlayerNotFound(String),
    #[error("Opponent {0} not found")]
    OpponentNotFound(String),
    #[error("Item not found")]
    ItemNotFound,
    #[error("Item not in inventory")]
    ItemNotInInventory,
    #[error("Cannot sell this item")]
    CannotSell,
    #[error("Quest not found")]
    QuestNotFound,
    #[error("Skill not found")]
    SkillNotFound,
    #[error("Nothing equipped")]
    NothingEquipped,

    // state
    #[error("Name already taken")]
    NameTaken,
    #[error("Dead! Rest first")]
    Dead,
    #[error("You are dead! Rest first")]
    AttackerDead,
    #[error("Opponent is dead! Find another opponent")]
    OpponentDead,
    #[error("Cannot PVP yourself")]
    SelfPvp,
    #[error("Not enough gold")]
    NotEnoughGold,
    #[error("Not enough mana")]
    NotEnoughMana,
    #[error("Quest already active")]
    QuestAlreadyActive,
    #[error("Quest not active")]
    QuestNotActive,
    #[error("Quest requirements not met ({have}/{need} {monster} kills)")]
    QuestIncomplete { monster: String, have: u32, need: u32 },
    #[error("Daily reward already claimed")]
    DailyRewardCooldown,
}
