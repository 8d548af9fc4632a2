//! # rpgserver - persistent multiplayer RPG server
//!
//! Clients connect over TCP, register or log in to a character by name, and
//! issue turn-based actions: hunting monsters, running the dungeon ladder,
//! duelling other players, trading in the shop, taking quests, using skills
//! and claiming a daily reward. Every action mutates a durable player record.
//!
//! ## Features
//!
//! - **Framed JSON protocol**: four ASCII digits of payload length, then the
//!   JSON payload; one request and one response in flight per connection.
//! - **Concurrent sessions**: one Tokio task per connection with per-record
//!   locking, including deadlock-free two-record locking for PvP.
//! - **Durable before response**: every mutation is on disk before the reply
//!   leaves, either as an atomically replaced JSON image or as sled records.
//! - **Reproducible combat**: all dice go through an injected `rand` generator.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rpgserver::config::Config;
//! use rpgserver::server::GameServer;
//! use rpgserver::storage::PlayerStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let store = PlayerStore::open(&config.storage)?;
//!     GameServer::new(config, store).run().await
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`server`] - listener, per-connection sessions, command dispatch, online registry
//! - [`protocol`] - framing codec, typed commands, response records
//! - [`game`] - player record, catalogs, combat and economy rules, leaderboard
//! - [`storage`] - player store and its persistence backends
//! - [`config`] - TOML configuration
//! - [`validation`] - player name rules
//! - [`metrics`] - process-wide counters
//! - [`logutil`] - log-safe rendering of peer input
//!
//! ```text
//! ┌─────────────────┐
//! │   GameServer    │ ← accept loop, one task per connection
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │    Session      │ ← codec decode → CommandProcessor → codec encode
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │ Combat/Economy  │ ← pure rules over a private record copy
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │  PlayerStore    │ ← per-record locks, durable save
//! └─────────────────┘
//! ```

pub mod config;
pub mod game;
pub mod logutil;
pub mod metrics;
pub mod protocol;
pub mod server;
pub mod storage;
pub mod validation;
