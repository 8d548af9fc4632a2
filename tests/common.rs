//! Test utilities & fixtures.
//! Spins up a real listener on an ephemeral port and talks to it over TCP.

use std::net::SocketAddr;

use rpgserver::config::{Config, StorageBackend};
use rpgserver::protocol::codec;
use rpgserver::protocol::Response;
use rpgserver::server::GameServer;
use rpgserver::storage::PlayerStore;
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Config with in-memory storage, no log file and fixed dice.
#[allow(dead_code)]
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.server.host = "127.0.0.1".into();
    config.server.port = 0;
    config.storage.backend = StorageBackend::Memory;
    config.logging.file = None;
    config.game.rng_seed = Some(42);
    config
}

/// Config backed by a snapshot file under `dir`.
#[allow(dead_code)]
pub fn snapshot_config(dir: &std::path::Path) -> Config {
    let mut config = test_config();
    config.storage.backend = StorageBackend::Snapshot;
    config.storage.data_dir = dir.to_string_lossy().into_owned();
    config
}

pub struct RunningServer {
    pub addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<anyhow::Result<()>>>,
}

impl RunningServer {
    /// Stop accepting and wait for the listener to return.
    #[allow(dead_code)]
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.await.expect("join listener").expect("listener result");
        }
    }
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

pub async fn start_server(config: Config) -> RunningServer {
    let store = PlayerStore::open(&config.storage).expect("open store");
    start_server_with_store(config, store).await
}

pub async fn start_server_with_store(config: Config, store: PlayerStore) -> RunningServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let (tx, rx) = oneshot::channel::<()>();
    let server = GameServer::new(config, store);
    let task = tokio::spawn(async move {
        server
            .serve(listener, async {
                let _ = rx.await;
            })
            .await
    });
    RunningServer {
        addr,
        shutdown: Some(tx),
        task: Some(task),
    }
}

pub struct Client {
    stream: TcpStream,
}

impl Client {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect");
        Self { stream }
    }

    pub async fn request(&mut self, body: Value) -> Response {
        codec::write_message(&mut self.stream, &body).await.expect("send frame");
        codec::read_message(&mut self.stream)
            .await
            .expect("read frame")
            .expect("server closed connection")
    }

    #[allow(dead_code)]
    pub fn stream(&mut self) -> &mut TcpStream {
        &mut self.stream
    }
}
