//! `cmd` -> handler table.
//!
//! Every handler that changes a record follows the same cycle: take the
//! record lock, load a private copy, run the game rule on the copy, save. The
//! save is durable before the handler returns, so the client never sees a
//! result that a crash could take back.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;
use thiserror::Error;

use crate::config::GameConfig;
use crate::game::catalog::{Catalog, DEFAULT_HUNT_TARGET};
use crate::game::combat::{self, HuntOutcome};
use crate::game::economy;
use crate::game::errors::GameError;
use crate::game::ranking::leaderboard;
use crate::game::types::Player;
use crate::logutil::escape_log;
use crate::metrics;
use crate::protocol::command::{Command, ParseError};
use crate::protocol::response::Response;
use crate::server::registry::{SessionId, SessionRegistry};
use crate::storage::{PlayerStore, StoreError};
use crate::validation::validate_player_name;

/// Failure of one command. Rule violations go back to the client verbatim;
/// storage failures are logged and reported generically.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Game(#[from] GameError),
    #[error("Storage error")]
    Store(#[from] StoreError),
}

type CommandResult = Result<Response, CommandError>;

/// Per-connection state the dispatcher needs: who is asking and the
/// connection's own random source.
pub struct SessionContext {
    pub id: SessionId,
    pub peer: String,
    rng: StdRng,
}

impl SessionContext {
    /// `seed` fixes the generator for reproducible runs; `number` keeps two
    /// sessions under the same seed from rolling identical dice.
    pub fn new(id: SessionId, peer: impl Into<String>, number: u64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ number.wrapping_mul(0x9E37_79B9_7F4A_7C15)),
            None => StdRng::from_entropy(),
        };
        Self {
            id,
            peer: peer.into(),
            rng,
        }
    }
}

pub struct CommandProcessor {
    store: Arc<PlayerStore>,
    catalog: Arc<Catalog>,
    registry: Arc<SessionRegistry>,
    game: GameConfig,
}

/// A required string argument, with `None` and `""` both treated as missing.
fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

impl CommandProcessor {
    pub fn new(
        store: Arc<PlayerStore>,
        catalog: Arc<Catalog>,
        registry: Arc<SessionRegistry>,
        game: GameConfig,
    ) -> Self {
        Self {
            store,
            catalog,
            registry,
            game,
        }
    }

    pub fn store(&self) -> &Arc<PlayerStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Answer one decoded request. Never fails: every problem becomes an
    /// error response and the connection stays usable.
    pub async fn process(&self, ctx: &mut SessionContext, request: Value) -> Response {
        let started = Instant::now();
        let command = match Command::from_request(request) {
            Ok(command) => command,
            Err(ParseError::Unknown(cmd)) => {
                metrics::inc_unknown_commands();
                debug!(
                    "[{}] unknown command {}",
                    ctx.peer,
                    escape_log(cmd.as_deref().unwrap_or("<none>"))
                );
                return Response::error("Unknown command");
            }
            Err(ParseError::Invalid(name)) => {
                metrics::record_command(name, false, started);
                return GameError::InvalidData.into();
            }
        };

        let name = command.name();
        let subject = command.subject().map(escape_log);
        let response = match self.execute(ctx, command).await {
            Ok(response) => response,
            Err(CommandError::Game(e)) => e.into(),
            Err(e @ CommandError::Store(_)) => {
                metrics::inc_persist_failures();
                warn!("[{}] {} failed: {:?}", ctx.peer, name, e);
                Response::error(e.to_string())
            }
        };
        let counter = metrics::record_command(name, response.is_ok(), started);
        debug!(
            "[{}] {} {} -> {} ({} handled, {} rejected)",
            ctx.peer,
            name,
            subject.as_deref().unwrap_or("-"),
            if response.is_ok() { "ok" } else { "error" },
            counter.handled,
            counter.rejected
        );
        response
    }

    async fn execute(&self, ctx: &mut SessionContext, command: Command) -> CommandResult {
        match command {
            Command::Register { name, class } => self.register(ctx, name, class).await,
            Command::Login { name } => self.login(ctx, name),
            Command::Hunt { player, difficulty } => self.hunt(ctx, player, difficulty).await,
            Command::Pvp { player, opponent } => self.pvp(ctx, player, opponent).await,
            Command::ShopList => Ok(Response::ok().with("shop", &self.catalog.shop)),
            Command::BuyItem { player, item } => {
                self.mutate(player, |p, catalog| {
                    let item = present(&item).ok_or(GameError::ItemNotFound)?;
                    economy::buy_item(p, catalog, &item)?;
                    Ok(Response::ok().msg(format!("Bought {}", item)))
                })
                .await
            }
            Command::SellItem { player, item } => {
                self.mutate(player, |p, catalog| {
                    let item = present(&item).ok_or(GameError::ItemNotInInventory)?;
                    let price = economy::sell_item(p, catalog, &item)?;
                    Ok(Response::ok().msg(format!("Sold {} for {} gold", item, price)))
                })
                .await
            }
            Command::QuestList => Ok(Response::ok().with("quests", &self.catalog.quests)),
            Command::AcceptQuest { player, quest_id } => {
                self.mutate_quietly(player, |p, catalog| {
                    let quest_id = quest_id.ok_or(GameError::QuestNotFound)?;
                    economy::accept_quest(p, catalog, quest_id)?;
                    Ok(Response::ok().msg(format!("Quest {} accepted", quest_id)))
                })
                .await
            }
            Command::CompleteQuest { player, quest_id } => {
                let enforce = self.game.enforce_quest_kills;
                self.mutate_quietly(player, |p, catalog| {
                    let quest_id = quest_id.ok_or(GameError::QuestNotActive)?;
                    let reward = economy::complete_quest(p, catalog, quest_id, enforce)?;
                    Ok(Response::ok().msg("Quest completed!").with("reward", reward))
                })
                .await
            }
            Command::SkillList => Ok(Response::ok().with("skills", &self.catalog.skills)),
            Command::UseSkill { player, skill } => {
                self.mutate(player, |p, catalog| {
                    let skill = present(&skill).ok_or(GameError::SkillNotFound)?;
                    economy::use_skill(p, catalog, &skill)?;
                    Ok(Response::ok().msg(format!("Used {}", skill)))
                })
                .await
            }
            Command::Dungeon { player } => self.dungeon(ctx, player).await,
            Command::DailyReward { player } => self.daily_reward(ctx, player).await,
            Command::Stats { player } => {
                let player = self.load(&player)?;
                Ok(Response::ok().with("player", &player))
            }
            Command::Inventory { player } => {
                let player = self.load(&player)?;
                Ok(Response::ok()
                    .with("inventory", &player.inventory)
                    .with("weapon", &player.weapon)
                    .with("armor", &player.armor)
                    .with("ring", &player.ring))
            }
            Command::Equip { player, item } => {
                self.mutate(player, |p, catalog| {
                    let item = present(&item).ok_or(GameError::ItemNotInInventory)?;
                    economy::equip_item(p, catalog, &item)?;
                    Ok(Response::ok().msg(format!("Equipped {}", item)))
                })
                .await
            }
            Command::Rest { player } => {
                self.mutate(player, |p, _| {
                    economy::rest(p);
                    Ok(Response::ok().msg("Fully restored"))
                })
                .await
            }
            Command::Leaderboard => {
                let players = self.store.all();
                let rows = leaderboard(&players, self.game.leaderboard_size);
                Ok(Response::ok().with("leaderboard", rows))
            }
            Command::PlayersOnline => {
                let names = self.registry.online();
                Ok(Response::ok().with("count", names.len()).with("players", names))
            }
        }
    }

    fn load(&self, name: &Option<String>) -> Result<Player, GameError> {
        let name = present(name).ok_or(GameError::PlayerNotFound)?;
        self.store.get(name).map_err(|_| GameError::PlayerNotFound)
    }

    /// Lock, load, apply `f`, save. The updated record is attached as
    /// `player` on success.
    async fn mutate<F>(&self, name: Option<String>, f: F) -> CommandResult
    where
        F: FnOnce(&mut Player, &Catalog) -> Result<Response, GameError>,
    {
        let (response, player) = self.mutate_record(name, f).await?;
        Ok(response.with("player", &player))
    }

    /// Like [`Self::mutate`] without echoing the record.
    async fn mutate_quietly<F>(&self, name: Option<String>, f: F) -> CommandResult
    where
        F: FnOnce(&mut Player, &Catalog) -> Result<Response, GameError>,
    {
        Ok(self.mutate_record(name, f).await?.0)
    }

    async fn mutate_record<F>(&self, name: Option<String>, f: F) -> Result<(Response, Player), CommandError>
    where
        F: FnOnce(&mut Player, &Catalog) -> Result<Response, GameError>,
    {
        let name = present(&name).ok_or(GameError::PlayerNotFound)?;
        let _guard = self.store.lock(name).await;
        let mut player = self.store.get(name).map_err(|_| GameError::PlayerNotFound)?;
        let response = f(&mut player, &self.catalog)?;
        self.store.save(player.clone())?;
        Ok((response, player))
    }

    async fn register(&self, ctx: &SessionContext, name: Option<String>, class: Option<String>) -> CommandResult {
        let (name, class) = match (present(&name), present(&class)) {
            (Some(name), Some(class)) => (name, class),
            _ => return Err(GameError::InvalidData.into()),
        };
        validate_player_name(name).map_err(|e| GameError::RejectedName(e.to_string()))?;

        let _guard = self.store.lock(name).await;
        if self.store.exists(name) {
            return Err(GameError::NameTaken.into());
        }
        let player = economy::create_character(name, class, Utc::now())?;
        match self.store.insert_new(player.clone()) {
            Ok(()) => {}
            Err(StoreError::AlreadyExists(_)) => return Err(GameError::NameTaken.into()),
            Err(e) => return Err(e.into()),
        }
        self.registry.mark_online(ctx.id, name);
        info!("[{}] registered {} ({})", ctx.peer, escape_log(name), player.class);
        Ok(Response::ok().msg("Character created").with("player", &player))
    }

    fn login(&self, ctx: &SessionContext, name: Option<String>) -> CommandResult {
        let name = present(&name).ok_or(GameError::InvalidName)?;
        let player = self.store.get(name).map_err(|_| GameError::PlayerNotFound)?;
        self.registry.mark_online(ctx.id, name);
        info!("[{}] {} logged in", ctx.peer, escape_log(name));
        Ok(Response::ok().msg("Login success").with("player", &player))
    }

    fn engagement_response(outcome: &HuntOutcome, player: &Player) -> Response {
        if outcome.victory {
            Response::ok()
                .with("result", "victory")
                .with("log", &outcome.log)
                .with("exp", outcome.exp)
                .with("gold", outcome.gold)
                .with("loot", &outcome.loot)
                .with("levelup", outcome.levelup)
                .with("player", player)
        } else {
            Response::ok()
                .with("result", "defeat")
                .with("log", &outcome.log)
                .with("player", player)
        }
    }

    async fn hunt(&self, ctx: &mut SessionContext, player: Option<String>, difficulty: Option<String>) -> CommandResult {
        let name = present(&player).ok_or(GameError::PlayerNotFound)?;
        let kind = present(&difficulty).unwrap_or(DEFAULT_HUNT_TARGET);

        let _guard = self.store.lock(name).await;
        let mut player = self.store.get(name).map_err(|_| GameError::PlayerNotFound)?;
        let outcome = combat::hunt(&mut player, &self.catalog, kind, self.game.hunt_round_cap, &mut ctx.rng)?;
        self.store.save(player.clone())?;
        debug!(
            "[{}] {} hunted {}: {}",
            ctx.peer,
            escape_log(name),
            escape_log(kind),
            if outcome.victory { "victory" } else { "defeat" }
        );
        Ok(Self::engagement_response(&outcome, &player))
    }

    async fn dungeon(&self, ctx: &mut SessionContext, player: Option<String>) -> CommandResult {
        let name = present(&player).ok_or(GameError::PlayerNotFound)?;

        let _guard = self.store.lock(name).await;
        let mut player = self.store.get(name).map_err(|_| GameError::PlayerNotFound)?;
        let outcome = combat::dungeon(&mut player, &self.catalog, self.game.hunt_round_cap, &mut ctx.rng)?;
        self.store.save(player.clone())?;

        let response = Self::engagement_response(&outcome.hunt, &player);
        if outcome.hunt.victory {
            Ok(response.msg(format!("Dungeon Level {} cleared!", outcome.tier)))
        } else {
            Ok(response)
        }
    }

    async fn pvp(&self, ctx: &mut SessionContext, player: Option<String>, opponent: Option<String>) -> CommandResult {
        let (attacker_name, defender_name) = match (present(&player), present(&opponent)) {
            (Some(a), Some(d)) => (a, d),
            _ => return Err(GameError::InvalidPlayerNames.into()),
        };
        if attacker_name == defender_name {
            if !self.store.exists(attacker_name) {
                return Err(GameError::NamedPlayerNotFound(attacker_name.to_string()).into());
            }
            return Err(GameError::SelfPvp.into());
        }

        let _guards = self.store.lock_pair(attacker_name, defender_name).await;
        let mut attacker = self
            .store
            .get(attacker_name)
            .map_err(|_| GameError::NamedPlayerNotFound(attacker_name.to_string()))?;
        let mut defender = self
            .store
            .get(defender_name)
            .map_err(|_| GameError::OpponentNotFound(defender_name.to_string()))?;

        let outcome = combat::pvp(&mut attacker, &mut defender, self.game.pvp_round_cap, &mut ctx.rng)?;
        self.store.save_pair(attacker.clone(), defender)?;
        info!(
            "[{}] pvp {} vs {}: {} wins {} gold",
            ctx.peer,
            escape_log(attacker_name),
            escape_log(defender_name),
            escape_log(&outcome.winner),
            outcome.reward
        );

        Ok(Response::ok()
            .with("log", &outcome.log)
            .with("result", format!("{} WIN!", outcome.winner))
            .with("reward", outcome.reward)
            .with("winner", outcome.initiator_won)
            .with("player", &attacker))
    }

    async fn daily_reward(&self, ctx: &mut SessionContext, player: Option<String>) -> CommandResult {
        let name = present(&player).ok_or(GameError::PlayerNotFound)?;

        let _guard = self.store.lock(name).await;
        let mut player = self.store.get(name).map_err(|_| GameError::PlayerNotFound)?;
        let reward = economy::claim_daily_reward(
            &mut player,
            Utc::now().timestamp(),
            self.game.daily_reward_cooldown_secs,
            &mut ctx.rng,
        )?;
        self.store.save(player)?;
        Ok(Response::ok()
            .msg(format!("Daily reward: {} gold", reward))
            .with("reward", reward))
    }
}
