use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::game::catalog::class_base_stats;

pub const STARTING_GOLD: u32 = 100;
pub const STARTING_MANA: i32 = 100;
pub const STARTING_SPEED: i32 = 10;
pub const STARTING_SKILL: &str = "Quick Strike";
pub const STARTING_POTIONS: usize = 2;

/// Experience needed to leave `level`.
pub fn exp_for_level(level: u32) -> u32 {
    level * 100
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CharacterClass {
    Warrior,
    Mage,
    Rogue,
    Paladin,
    Archer,
    Berserker,
}

impl CharacterClass {
    pub const ALL: [CharacterClass; 6] = [
        CharacterClass::Warrior,
        CharacterClass::Mage,
        CharacterClass::Rogue,
        CharacterClass::Paladin,
        CharacterClass::Archer,
        CharacterClass::Berserker,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CharacterClass::Warrior => "Warrior",
            CharacterClass::Mage => "Mage",
            CharacterClass::Rogue => "Rogue",
            CharacterClass::Paladin => "Paladin",
            CharacterClass::Archer => "Archer",
            CharacterClass::Berserker => "Berserker",
        }
    }
}

impl fmt::Display for CharacterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CharacterClass {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CharacterClass::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or(())
    }
}

/// Equipment slot. Weapons add to `atk`, armor adds to `def`, rings carry no
/// combat bonus.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EquipSlot {
    Weapon,
    Armor,
    Ring,
}

/// Durable per-character record. Field names are the wire names, so the
/// record is returned to clients as-is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Player {
    pub name: String,
    pub class: CharacterClass,
    pub created: DateTime<Utc>,

    pub level: u32,
    pub exp: u32,
    pub exp_max: u32,

    pub hp: i32,
    pub max_hp: i32,
    pub mana: i32,
    pub max_mana: i32,

    pub atk: i32,
    pub def: i32,
    pub speed: i32,

    pub gold: u32,
    pub inventory: Vec<String>,

    pub weapon: Option<String>,
    pub armor: Option<String>,
    pub ring: Option<String>,

    pub kills: u32,
    pub deaths: u32,
    pub battles: u32,
    pub pvp_wins: u32,
    pub pvp_loses: u32,
    pub active_quests: BTreeSet<u32>,
    pub completed_quests: BTreeSet<u32>,
    /// Unix seconds of the last daily reward claim (0 = never).
    pub daily_reward_time: i64,
    pub dungeon_level: u32,
    pub skills: BTreeSet<String>,
    /// Victories per monster kind, used when quest kill requirements are enforced.
    #[serde(default)]
    pub monster_kills: BTreeMap<String, u32>,
}

impl Player {
    pub fn new(name: &str, class: CharacterClass, created: DateTime<Utc>) -> Self {
        let base = class_base_stats(class);
        let mut skills = BTreeSet::new();
        skills.insert(STARTING_SKILL.to_string());
        Self {
            name: name.to_string(),
            class,
            created,
            level: 1,
            exp: 0,
            exp_max: exp_for_level(1),
            hp: base.hp,
            max_hp: base.hp,
            mana: STARTING_MANA,
            max_mana: STARTING_MANA,
            atk: base.atk,
            def: base.def,
            speed: STARTING_SPEED,
            gold: STARTING_GOLD,
            inventory: vec!["Health Potion".to_string(); STARTING_POTIONS],
            weapon: None,
            armor: None,
            ring: None,
            kills: 0,
            deaths: 0,
            battles: 0,
            pvp_wins: 0,
            pvp_loses: 0,
            active_quests: BTreeSet::new(),
            completed_quests: BTreeSet::new(),
            daily_reward_time: 0,
            dungeon_level: 0,
            skills,
            monster_kills: BTreeMap::new(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn has_item(&self, item: &str) -> bool {
        self.inventory.iter().any(|i| i == item)
    }

    /// Remove one instance of `item`; returns false when absent.
    pub fn take_item(&mut self, item: &str) -> bool {
        match self.inventory.iter().position(|i| i == item) {
            Some(pos) => {
                self.inventory.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn slot(&self, slot: EquipSlot) -> Option<&String> {
        match slot {
            EquipSlot::Weapon => self.weapon.as_ref(),
            EquipSlot::Armor => self.armor.as_ref(),
            EquipSlot::Ring => self.ring.as_ref(),
        }
    }

    pub fn slot_mut(&mut self, slot: EquipSlot) -> &mut Option<String> {
        match slot {
            EquipSlot::Weapon => &mut self.weapon,
            EquipSlot::Armor => &mut self.armor,
            EquipSlot::Ring => &mut self.ring,
        }
    }

    /// Subtract a gold penalty, flooring at zero.
    pub fn lose_gold(&mut self, amount: u32) {
        self.gold = self.gold.saturating_sub(amount);
    }
}
