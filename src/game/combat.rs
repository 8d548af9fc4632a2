//! Turn-based engagement resolution for Hunt, Dungeon and PvP.
//!
//! All three share [`resolve`]: the initiator strikes first, blows alternate,
//! and each blow deals `max(1, atk - def + jitter)` with jitter drawn
//! uniformly from `-JITTER..=JITTER`. Every randomized draw goes through the
//! caller-supplied generator so outcomes are reproducible under a seeded
//! `StdRng`.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::game::catalog::Catalog;
use crate::game::errors::GameError;
use crate::game::types::{exp_for_level, Player};

pub const JITTER: i32 = 2;
pub const DEATH_GOLD_PENALTY: u32 = 20;
pub const PVP_BASE_REWARD: u32 = 50;
pub const PVP_REWARD_PER_LEVEL: u32 = 10;

/// One side of an engagement.
#[derive(Debug, Clone, Copy)]
pub struct Combatant<'a> {
    pub label: &'a str,
    pub hp: i32,
    pub atk: i32,
    pub def: i32,
}

impl<'a> Combatant<'a> {
    pub fn from_player(p: &'a Player) -> Self {
        Self {
            label: &p.name,
            hp: p.hp,
            atk: p.atk,
            def: p.def,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Engagement {
    pub initiator_hp: i32,
    pub defender_hp: i32,
    pub rounds: u32,
    pub initiator_won: bool,
    pub log: Vec<String>,
}

pub fn roll_damage<R: Rng + ?Sized>(atk: i32, def: i32, rng: &mut R) -> i32 {
    (atk - def + rng.gen_range(-JITTER..=JITTER)).max(1)
}

/// Run blows until one side drops to 0 hp or `round_cap` rounds have passed.
/// At the cap the side with more hp wins; a tie goes to the initiator.
pub fn resolve<R: Rng + ?Sized>(
    initiator: Combatant<'_>,
    defender: Combatant<'_>,
    round_cap: u32,
    rng: &mut R,
) -> Engagement {
    let mut a_hp = initiator.hp;
    let mut d_hp = defender.hp;
    let mut rounds = 0;
    let mut log = Vec::new();

    while a_hp > 0 && d_hp > 0 && rounds < round_cap {
        rounds += 1;

        let dmg = roll_damage(initiator.atk, defender.def, rng);
        d_hp -= dmg;
        log.push(format!("{} deals {} dmg", initiator.label, dmg));
        if d_hp <= 0 {
            break;
        }

        let dmg = roll_damage(defender.atk, initiator.def, rng);
        a_hp -= dmg;
        log.push(format!("{} deals {} dmg", defender.label, dmg));
    }

    let initiator_won = if d_hp <= 0 {
        true
    } else if a_hp <= 0 {
        false
    } else {
        a_hp >= d_hp
    };

    Engagement {
        initiator_hp: a_hp,
        defender_hp: d_hp,
        rounds,
        initiator_won,
        log,
    }
}

/// Apply pending level-ups. Each level starts from 0 exp; excess is discarded.
pub fn apply_level_ups(player: &mut Player) -> bool {
    let mut leveled = false;
    while player.exp >= player.exp_max {
        player.level += 1;
        player.exp = 0;
        player.exp_max = exp_for_level(player.level);
        player.max_hp += 10;
        player.atk += 2;
        player.def += 1;
        player.hp = player.max_hp;
        leveled = true;
    }
    leveled
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuntOutcome {
    pub monster: String,
    pub victory: bool,
    pub log: Vec<String>,
    pub exp: u32,
    pub gold: u32,
    pub loot: Option<String>,
    pub levelup: bool,
}

/// Fight one copy of the catalog monster `kind` and fold the result into `player`.
pub fn hunt<R: Rng + ?Sized>(
    player: &mut Player,
    catalog: &Catalog,
    kind: &str,
    round_cap: u32,
    rng: &mut R,
) -> Result<HuntOutcome, GameError> {
    if !player.is_alive() {
        return Err(GameError::Dead);
    }
    let template = catalog.monster(kind).ok_or(GameError::InvalidMonster)?;

    let fight = resolve(
        Combatant::from_player(player),
        Combatant {
            label: kind,
            hp: template.hp,
            atk: template.atk,
            def: template.def,
        },
        round_cap,
        rng,
    );
    player.battles += 1;

    if !fight.initiator_won {
        player.hp = 0;
        player.deaths += 1;
        player.lose_gold(DEATH_GOLD_PENALTY);
        return Ok(HuntOutcome {
            monster: kind.to_string(),
            victory: false,
            log: fight.log,
            exp: 0,
            gold: 0,
            loot: None,
            levelup: false,
        });
    }

    let loot = template.loot.choose(rng).cloned();
    player.exp += template.exp;
    player.gold = player.gold.saturating_add(template.gold);
    if let Some(item) = &loot {
        player.inventory.push(item.clone());
    }
    player.hp = fight.initiator_hp.min(player.max_hp);
    player.kills += 1;
    *player.monster_kills.entry(kind.to_string()).or_insert(0) += 1;
    let levelup = apply_level_ups(player);

    Ok(HuntOutcome {
        monster: kind.to_string(),
        victory: true,
        log: fight.log,
        exp: template.exp,
        gold: template.gold,
        loot,
        levelup,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DungeonOutcome {
    /// Tier that was attempted (1-based).
    pub tier: u32,
    pub hunt: HuntOutcome,
}

/// Hunt the next tier's monster; a victory advances `dungeon_level` by one.
pub fn dungeon<R: Rng + ?Sized>(
    player: &mut Player,
    catalog: &Catalog,
    round_cap: u32,
    rng: &mut R,
) -> Result<DungeonOutcome, GameError> {
    let tier = player.dungeon_level + 1;
    let kind = Catalog::dungeon_monster(player.dungeon_level);
    let hunt = hunt(player, catalog, kind, round_cap, rng)?;
    if hunt.victory {
        player.dungeon_level = tier;
    }
    Ok(DungeonOutcome { tier, hunt })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PvpOutcome {
    pub log: Vec<String>,
    pub initiator_won: bool,
    pub winner: String,
    pub reward: u32,
}

/// Duel between two stored players. Both records are updated in place; the
/// caller persists them.
pub fn pvp<R: Rng + ?Sized>(
    attacker: &mut Player,
    defender: &mut Player,
    round_cap: u32,
    rng: &mut R,
) -> Result<PvpOutcome, GameError> {
    if attacker.name == defender.name {
        return Err(GameError::SelfPvp);
    }
    if !attacker.is_alive() {
        return Err(GameError::AttackerDead);
    }
    if !defender.is_alive() {
        return Err(GameError::OpponentDead);
    }

    let fight = resolve(
        Combatant::from_player(attacker),
        Combatant::from_player(defender),
        round_cap,
        rng,
    );

    let (winner, winner_hp, loser) = if fight.initiator_won {
        (attacker, fight.initiator_hp, defender)
    } else {
        (defender, fight.defender_hp, attacker)
    };
    let reward = PVP_BASE_REWARD + PVP_REWARD_PER_LEVEL * loser.level;
    winner.pvp_wins += 1;
    winner.gold = winner.gold.saturating_add(reward);
    winner.hp = winner_hp.max(1);
    loser.pvp_loses += 1;
    loser.hp = 0;

    Ok(PvpOutcome {
        log: fight.log,
        initiator_won: fight.initiator_won,
        winner: winner.name.clone(),
        reward,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::CharacterClass;
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn warrior(name: &str) -> Player {
        Player::new(name, CharacterClass::Warrior, Utc::now())
    }

    fn blow_damage(line: &str) -> i32 {
        let parts: Vec<&str> = line.split_whitespace().collect();
        parts[parts.len() - 2].parse().expect("damage value")
    }

    #[test]
    fn damage_stays_inside_jitter_band() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let d = roll_damage(15, 8, &mut rng);
            assert!((5..=9).contains(&d), "damage {} out of band", d);
        }
    }

    #[test]
    fn damage_never_below_one() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            assert_eq!(roll_damage(2, 40, &mut rng), 1);
        }
    }

    #[test]
    fn round_cap_bounds_stalemates() {
        let mut rng = StdRng::seed_from_u64(1);
        let a = Combatant { label: "a", hp: 10_000, atk: 1, def: 50 };
        let b = Combatant { label: "b", hp: 10_000, atk: 1, def: 50 };
        let fight = resolve(a, b, 50, &mut rng);
        assert_eq!(fight.rounds, 50);
        assert_eq!(fight.log.len(), 100);
        // equal remaining hp at the cap favours the initiator
        assert!(fight.initiator_won);
    }

    #[test]
    fn cap_decision_prefers_higher_remaining_hp() {
        let mut rng = StdRng::seed_from_u64(1);
        let a = Combatant { label: "a", hp: 500, atk: 1, def: 50 };
        let b = Combatant { label: "b", hp: 900, atk: 1, def: 50 };
        let fight = resolve(a, b, 10, &mut rng);
        assert!(!fight.initiator_won);
    }

    #[test]
    fn warrior_beats_goblin_without_levelup() {
        let catalog = Catalog::standard();
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut p = warrior("hero");
            let out = hunt(&mut p, &catalog, "goblin", 50, &mut rng).unwrap();
            assert!(out.victory);
            assert!(out.log.len() <= 5, "took {} blows", out.log.len());
            assert_eq!(p.gold, 110);
            assert_eq!(p.kills, 1);
            assert_eq!(p.battles, 1);
            assert_eq!(p.exp, 15);
            assert_eq!(p.exp_max, 100);
            assert!(!out.levelup);
            assert_eq!(p.inventory.len(), 3);
            assert!(p.hp >= 97);
            for line in out.log.iter().filter(|l| l.starts_with("hero")) {
                let d = blow_damage(line);
                assert!((11..=15).contains(&d));
            }
        }
    }

    #[test]
    fn dead_player_cannot_hunt() {
        let catalog = Catalog::standard();
        let mut rng = StdRng::seed_from_u64(3);
        let mut p = warrior("hero");
        p.hp = 0;
        assert_eq!(hunt(&mut p, &catalog, "goblin", 50, &mut rng), Err(GameError::Dead));
        assert_eq!(p.battles, 0);
    }

    #[test]
    fn unknown_monster_rejected() {
        let catalog = Catalog::standard();
        let mut rng = StdRng::seed_from_u64(3);
        let mut p = warrior("hero");
        let err = hunt(&mut p, &catalog, "unicorn", 50, &mut rng).unwrap_err();
        assert_eq!(err, GameError::InvalidMonster);
    }

    #[test]
    fn defeat_applies_penalty_and_zero_hp() {
        let catalog = Catalog::standard();
        let mut rng = StdRng::seed_from_u64(11);
        let mut p = Player::new("weak", CharacterClass::Mage, Utc::now());
        p.hp = 5;
        p.gold = 15;
        let out = hunt(&mut p, &catalog, "dragon", 50, &mut rng).unwrap();
        assert!(!out.victory);
        assert_eq!(p.hp, 0);
        assert_eq!(p.deaths, 1);
        assert_eq!(p.gold, 0);
        assert_eq!(p.battles, 1);
    }

    #[test]
    fn level_up_resets_exp_and_grows_stats() {
        let mut p = warrior("hero");
        p.exp = 130;
        p.hp = 40;
        assert!(apply_level_ups(&mut p));
        assert_eq!(p.level, 2);
        assert_eq!(p.exp, 0);
        assert_eq!(p.exp_max, 200);
        assert_eq!(p.max_hp, 110);
        assert_eq!(p.hp, 110);
        assert_eq!((p.atk, p.def), (17, 9));
        assert!(!apply_level_ups(&mut p));
    }

    #[test]
    fn leveling_invariant_holds_after_many_hunts() {
        let catalog = Catalog::standard();
        let mut rng = StdRng::seed_from_u64(99);
        let mut p = Player::new("grinder", CharacterClass::Berserker, Utc::now());
        for _ in 0..40 {
            p.hp = p.max_hp;
            let out = hunt(&mut p, &catalog, "orc", 50, &mut rng).unwrap();
            if out.victory {
                assert_eq!(p.exp_max, p.level * 100);
                assert!(p.exp < p.exp_max);
            }
        }
        assert!(p.level > 1);
    }

    #[test]
    fn dungeon_advances_one_tier_on_victory() {
        let catalog = Catalog::standard();
        let mut rng = StdRng::seed_from_u64(5);
        let mut p = warrior("delver");
        let out = dungeon(&mut p, &catalog, 50, &mut rng).unwrap();
        assert_eq!(out.tier, 1);
        assert_eq!(out.hunt.monster, "goblin");
        assert!(out.hunt.victory);
        assert_eq!(p.dungeon_level, 1);
    }

    #[test]
    fn dungeon_defeat_keeps_tier() {
        let catalog = Catalog::standard();
        let mut rng = StdRng::seed_from_u64(5);
        let mut p = Player::new("frail", CharacterClass::Mage, Utc::now());
        p.dungeon_level = 3;
        p.hp = 3;
        let out = dungeon(&mut p, &catalog, 50, &mut rng).unwrap();
        assert_eq!(out.hunt.monster, "dragon");
        assert!(!out.hunt.victory);
        assert_eq!(p.dungeon_level, 3);
    }

    #[test]
    fn pvp_between_equal_fresh_players() {
        for seed in 0..30 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut a = warrior("alice");
            let mut b = warrior("bob");
            let out = pvp(&mut a, &mut b, 50, &mut rng).unwrap();
            assert_eq!(out.reward, 60);
            assert_eq!(a.pvp_wins + b.pvp_wins, 1);
            assert_eq!(a.pvp_loses + b.pvp_loses, 1);
            let (winner, loser) = if out.initiator_won { (&a, &b) } else { (&b, &a) };
            assert_eq!(winner.name, out.winner);
            assert!(winner.hp >= 1);
            assert_eq!(loser.hp, 0);
            assert_eq!(winner.gold, 160);
            assert_eq!(loser.gold, 100);
            assert!(out.log.len() <= 100);
        }
    }

    #[test]
    fn pvp_rejects_self_and_dead() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut a = warrior("alice");
        let mut a2 = warrior("alice");
        assert_eq!(pvp(&mut a, &mut a2, 50, &mut rng), Err(GameError::SelfPvp));

        let mut b = warrior("bob");
        b.hp = 0;
        assert_eq!(pvp(&mut a, &mut b, 50, &mut rng), Err(GameError::OpponentDead));
        assert_eq!(pvp(&mut b, &mut a, 50, &mut rng), Err(GameError::AttackerDead));
        assert_eq!(a.pvp_wins + a.pvp_loses + b.pvp_wins + b.pvp_loses, 0);
    }

    #[test]
    fn pvp_winner_kept_above_zero_at_cap() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut a = warrior("alice");
        let mut b = warrior("bob");
        a.def = 100;
        b.def = 100;
        let out = pvp(&mut a, &mut b, 50, &mut rng).unwrap();
        assert!(out.initiator_won);
        assert_eq!(b.hp, 0);
        assert!(a.hp >= 1);
    }
}
