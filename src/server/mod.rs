//! # Server
//!
//! [`GameServer`] binds one TCP address and spawns a [`session::Session`]
//! task per accepted connection. Sessions share the player store, the
//! catalogs and the online registry through one [`CommandProcessor`]; they
//! never wait on each other except for the per-record locks inside the store.
//!
//! ```rust,no_run
//! use rpgserver::config::Config;
//! use rpgserver::server::GameServer;
//! use rpgserver::storage::PlayerStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let store = PlayerStore::open(&config.storage)?;
//!     GameServer::new(config, store).run().await
//! }
//! ```

pub mod dispatch;
pub mod registry;
pub mod session;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, error, info};
use tokio::net::{TcpListener, TcpStream};

use crate::config::Config;
use crate::game::catalog::Catalog;
use crate::metrics;
use crate::storage::PlayerStore;

pub use dispatch::{CommandError, CommandProcessor, SessionContext};
pub use registry::{SessionId, SessionRegistry};
pub use session::Session;

pub struct GameServer {
    config: Config,
    processor: Arc<CommandProcessor>,
    next_session: Arc<AtomicU64>,
}

impl GameServer {
    pub fn new(config: Config, store: PlayerStore) -> Self {
        let processor = CommandProcessor::new(
            Arc::new(store),
            Arc::new(Catalog::standard()),
            Arc::new(SessionRegistry::new()),
            config.game.clone(),
        );
        Self {
            config,
            processor: Arc::new(processor),
            next_session: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn processor(&self) -> &Arc<CommandProcessor> {
        &self.processor
    }

    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = self.config.server.bind_address();
        TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))
    }

    /// Bind the configured address and serve until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Received shutdown signal");
        })
        .await
    }

    /// Accept on `listener` until `shutdown` resolves. Sessions already
    /// running are left to finish on their own.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!("Server listening on {}", listener.local_addr()?);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((socket, addr)) => self.spawn_session(socket, addr),
                    Err(e) => error!("Error accepting connection: {}", e),
                },
                _ = &mut shutdown => break,
            }
        }

        let snap = metrics::snapshot();
        info!(
            "Listener stopped: {} connections served (peak {}), {} commands, {} framing errors, {} unknown commands, {} oversize responses, {} persist failures",
            snap.connections_accepted,
            snap.connections_peak,
            snap.commands_handled,
            snap.framing_errors,
            snap.unknown_commands,
            snap.oversize_responses,
            snap.persist_failures
        );
        let mut per_command: Vec<_> = metrics::command_counters_snapshot().into_iter().collect();
        per_command.sort_by_key(|(name, _)| *name);
        for (name, counter) in per_command {
            debug!("  {}: {} handled, {} rejected", name, counter.handled, counter.rejected);
        }
        Ok(())
    }

    fn spawn_session(&self, socket: TcpStream, addr: SocketAddr) {
        let _ = socket.set_nodelay(true);
        metrics::inc_connections_accepted();

        let peer = addr.to_string();
        let number = self.next_session.fetch_add(1, Ordering::Relaxed);
        let id = self.processor.registry().open_session(&peer);
        let ctx = SessionContext::new(id, peer.clone(), number, self.config.game.rng_seed);
        let processor = Arc::clone(&self.processor);
        info!("[{}] connected (session {})", peer, id);

        tokio::spawn(async move {
            let session = Session::new(socket, ctx, processor);
            if let Err(e) = session.run().await {
                info!("[{}] closed after error: {}", peer, e);
            }
            metrics::dec_connections_active();
            info!("[{}] disconnected", peer);
        });
    }
}
