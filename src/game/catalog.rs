//! Static, read-only game definitions shared by every session.
//!
//! The tables are built once at startup (`Catalog::standard`) and handed out
//! behind an `Arc`; nothing mutates them afterwards.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::game::types::{CharacterClass, EquipSlot};

/// Monster kinds fought on successive dungeon tiers, easiest first.
pub const DUNGEON_LADDER: [&str; 4] = ["goblin", "orc", "troll", "dragon"];

pub const DEFAULT_HUNT_TARGET: &str = "goblin";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassStats {
    pub hp: i32,
    pub atk: i32,
    pub def: i32,
}

pub fn class_base_stats(class: CharacterClass) -> ClassStats {
    let (hp, atk, def) = match class {
        CharacterClass::Warrior => (100, 15, 8),
        CharacterClass::Mage => (70, 20, 5),
        CharacterClass::Rogue => (85, 18, 6),
        CharacterClass::Paladin => (110, 12, 10),
        CharacterClass::Archer => (80, 17, 6),
        CharacterClass::Berserker => (120, 22, 6),
    };
    ClassStats { hp, atk, def }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonsterTemplate {
    pub hp: i32,
    pub atk: i32,
    pub def: i32,
    pub exp: u32,
    pub gold: u32,
    pub loot: Vec<String>,
}

/// What an item does; serialized inline as `"effect": "<kind>"` plus the
/// kind-specific magnitude.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum ItemEffect {
    Heal { amount: i32 },
    Mana { amount: i32 },
    Weapon { atk: i32 },
    Armor { def: i32 },
    Ring { exp_boost: f64 },
    Speed { bonus: i32 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShopItem {
    pub cost: u32,
    #[serde(flatten)]
    pub effect: ItemEffect,
}

impl ShopItem {
    /// Slot the item occupies when equipped, if it is equipment at all.
    pub fn slot(&self) -> Option<EquipSlot> {
        match self.effect {
            ItemEffect::Weapon { .. } => Some(EquipSlot::Weapon),
            ItemEffect::Armor { .. } => Some(EquipSlot::Armor),
            ItemEffect::Ring { .. } => Some(EquipSlot::Ring),
            _ => None,
        }
    }

    /// `(atk, def)` added while the item is equipped.
    pub fn stat_bonus(&self) -> (i32, i32) {
        match self.effect {
            ItemEffect::Weapon { atk } => (atk, 0),
            ItemEffect::Armor { def } => (0, def),
            _ => (0, 0),
        }
    }

    pub fn sell_price(&self) -> u32 {
        self.cost / 2
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quest {
    pub name: String,
    pub desc: String,
    pub reward: u32,
    /// Informational kill requirement; only checked when enforcement is enabled.
    pub kills: u32,
    #[serde(rename = "type")]
    pub monster: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SkillEffect {
    Damage { damage_mult: f64 },
    Defense { defense_mult: f64 },
    Heal { heal_amount: i32 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Skill {
    pub cost: i32,
    #[serde(flatten)]
    pub effect: SkillEffect,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    pub monsters: BTreeMap<String, MonsterTemplate>,
    pub shop: BTreeMap<String, ShopItem>,
    pub quests: BTreeMap<u32, Quest>,
    pub skills: BTreeMap<String, Skill>,
}

fn monster(hp: i32, atk: i32, def: i32, exp: u32, gold: u32, loot: [&str; 2]) -> MonsterTemplate {
    MonsterTemplate {
        hp,
        atk,
        def,
        exp,
        gold,
        loot: loot.iter().map(|s| s.to_string()).collect(),
    }
}

fn quest(name: &str, desc: &str, reward: u32, kills: u32, monster: &str) -> Quest {
    Quest {
        name: name.to_string(),
        desc: desc.to_string(),
        reward,
        kills,
        monster: monster.to_string(),
    }
}

impl Catalog {
    pub fn standard() -> Self {
        let monsters = [
            ("goblin", monster(30, 5, 2, 15, 10, ["Health Potion", "Goblin Dagger"])),
            ("orc", monster(50, 8, 4, 25, 20, ["Iron Sword", "Health Potion"])),
            ("troll", monster(80, 12, 6, 40, 35, ["Steel Sword", "Troll Ring"])),
            ("dragon", monster(150, 20, 10, 100, 100, ["Dragon Sword", "Dragon Stone"])),
            ("skeleton", monster(35, 7, 3, 20, 15, ["Bone Sword", "Health Potion"])),
            ("demon", monster(120, 18, 8, 80, 80, ["Demon Blade", "Dark Amulet"])),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let shop = [
            ("Health Potion", 50, ItemEffect::Heal { amount: 30 }),
            ("Mana Potion", 70, ItemEffect::Mana { amount: 50 }),
            ("Iron Sword", 200, ItemEffect::Weapon { atk: 5 }),
            ("Steel Sword", 400, ItemEffect::Weapon { atk: 8 }),
            ("Dragon Sword", 1000, ItemEffect::Weapon { atk: 15 }),
            ("Iron Armor", 250, ItemEffect::Armor { def: 5 }),
            ("Steel Armor", 500, ItemEffect::Armor { def: 8 }),
            ("Dragon Armor", 1200, ItemEffect::Armor { def: 15 }),
            ("Speed Boots", 300, ItemEffect::Speed { bonus: 10 }),
            ("Ancient Ring", 600, ItemEffect::Ring { exp_boost: 1.2 }),
        ]
        .into_iter()
        .map(|(name, cost, effect)| (name.to_string(), ShopItem { cost, effect }))
        .collect();

        let quests = [
            (1, quest("Goblin Slayer", "Kill 5 Goblins", 100, 5, "goblin")),
            (2, quest("Orc Hunter", "Kill 3 Orcs", 200, 3, "orc")),
            (3, quest("Troll Danger", "Kill 2 Trolls", 500, 2, "troll")),
            (4, quest("Dragon Slayer", "Kill 1 Dragon", 1000, 1, "dragon")),
            (5, quest("Demon Lord", "Kill 1 Demon", 800, 1, "demon")),
        ]
        .into_iter()
        .collect();

        let skills = [
            ("Power Strike", 20, SkillEffect::Damage { damage_mult: 2.0 }, "Double damage attack"),
            ("Heavy Defense", 15, SkillEffect::Defense { defense_mult: 2.0 }, "Double defense for 1 turn"),
            ("Quick Strike", 10, SkillEffect::Damage { damage_mult: 1.5 }, "1.5x damage"),
            ("Heal", 25, SkillEffect::Heal { heal_amount: 100 }, "Restore 100 HP"),
        ]
        .into_iter()
        .map(|(name, cost, effect, desc)| {
            (
                name.to_string(),
                Skill {
                    cost,
                    effect,
                    description: desc.to_string(),
                },
            )
        })
        .collect();

        Self {
            monsters,
            shop,
            quests,
            skills,
        }
    }

    pub fn monster(&self, kind: &str) -> Option<&MonsterTemplate> {
        self.monsters.get(kind)
    }

    pub fn item(&self, name: &str) -> Option<&ShopItem> {
        self.shop.get(name)
    }

    pub fn quest(&self, id: u32) -> Option<&Quest> {
        self.quests.get(&id)
    }

    pub fn skill(&self, name: &str) -> Option<&Skill> {
        self.skills.get(name)
    }

    /// Monster kind for the tier after `cleared`, clamped at the hardest tier.
    pub fn dungeon_monster(cleared: u32) -> &'static str {
        let idx = (cleared as usize).min(DUNGEON_LADDER.len() - 1);
        DUNGEON_LADDER[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_monster_has_loot() {
        let catalog = Catalog::standard();
        assert_eq!(catalog.monsters.len(), 6);
        assert!(catalog.monsters.values().all(|m| !m.loot.is_empty()));
    }

    #[test]
    fn dungeon_ladder_clamps_at_dragon() {
        assert_eq!(Catalog::dungeon_monster(0), "goblin");
        assert_eq!(Catalog::dungeon_monster(2), "troll");
        assert_eq!(Catalog::dungeon_monster(3), "dragon");
        assert_eq!(Catalog::dungeon_monster(40), "dragon");
    }

    #[test]
    fn shop_item_serializes_inline_effect() {
        let catalog = Catalog::standard();
        let v = serde_json::to_value(catalog.item("Iron Sword").unwrap()).unwrap();
        assert_eq!(v["cost"], 200);
        assert_eq!(v["effect"], "weapon");
        assert_eq!(v["atk"], 5);
    }

    #[test]
    fn equipment_slots_and_bonuses() {
        let catalog = Catalog::standard();
        let armor = catalog.item("Steel Armor").unwrap();
        assert_eq!(armor.slot(), Some(EquipSlot::Armor));
        assert_eq!(armor.stat_bonus(), (0, 8));
        let ring = catalog.item("Ancient Ring").unwrap();
        assert_eq!(ring.slot(), Some(EquipSlot::Ring));
        assert_eq!(ring.stat_bonus(), (0, 0));
        assert_eq!(catalog.item("Speed Boots").unwrap().slot(), None);
    }

    #[test]
    fn sell_price_is_half_cost_rounded_down() {
        let item = ShopItem {
            cost: 75,
            effect: ItemEffect::Heal { amount: 1 },
        };
        assert_eq!(item.sell_price(), 37);
    }

    #[test]
    fn quest_serializes_type_field() {
        let catalog = Catalog::standard();
        let v = serde_json::to_value(catalog.quest(2).unwrap()).unwrap();
        assert_eq!(v["type"], "orc");
        assert_eq!(v["reward"], 200);
    }
}
