//! Binary entrypoint for the rpgserver CLI.
//!
//! Commands:
//! - `start [--host <addr>] [--port <n>]` - run the game server
//! - `init` - write a starter `config.toml` and create the data directory
//! - `status` - print player count and the top of the leaderboard
//!
//! See the library crate docs for module-level details: `rpgserver::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{info, warn};

use rpgserver::config::Config;
use rpgserver::game::ranking::leaderboard;
use rpgserver::server::GameServer;
use rpgserver::storage::PlayerStore;

#[derive(Parser)]
#[command(name = "rpgserver")]
#[command(about = "Persistent multiplayer RPG server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the game server
    Start {
        /// Address to bind (overrides [server] host)
        #[arg(long)]
        host: Option<String>,

        /// TCP port to listen on (overrides [server] port)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Write a default configuration file
    Init,
    /// Show player statistics
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let pre_config = match cli.command {
        Commands::Init => None,
        _ => match Config::load(&cli.config).await {
            Ok(config) => Some(config),
            Err(e) => {
                eprintln!("{} (using defaults)", e);
                None
            }
        },
    };

    match cli.command {
        Commands::Start { host, port } => {
            let mut config = pre_config.unwrap_or_default();
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            init_logging(&Some(config.clone()), cli.verbose);
            info!("Starting rpgserver v{}", env!("CARGO_PKG_VERSION"));

            let store = PlayerStore::open(&config.storage)?;
            GameServer::new(config, store).run().await?;
        }
        Commands::Init => {
            init_logging(&None, cli.verbose);
            if std::path::Path::new(&cli.config).exists() {
                warn!("{} already exists; leaving it untouched", cli.config);
                return Ok(());
            }
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);

            let config = Config::default();
            tokio::fs::create_dir_all(&config.storage.data_dir).await?;
            info!("Data directory ready at {}", config.storage.data_dir);
        }
        Commands::Status => {
            init_logging(&pre_config, cli.verbose);
            let config = pre_config.unwrap_or_default();
            let store = PlayerStore::open(&config.storage)?;
            let players = store.all();
            println!("rpgserver v{}", env!("CARGO_PKG_VERSION"));
            println!("Listen address: {}", config.server.bind_address());
            println!("Storage: {:?} in {}", config.storage.backend, config.storage.data_dir);
            println!("Players: {}", players.len());
            let top = leaderboard(&players, 5);
            if !top.is_empty() {
                println!("Top players:");
                for (rank, row) in top.iter().enumerate() {
                    println!(
                        "  {}. {} ({}) level {} exp {} kills {} pvp wins {}",
                        rank + 1,
                        row.name,
                        row.class,
                        row.level,
                        row.exp,
                        row.kills,
                        row.pvp_wins
                    );
                }
            }
        }
    }

    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // Config level applies when no -v flag is given
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|cfg| cfg.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .as_ref()
        .and_then(|cfg| cfg.logging.file.as_ref())
        .and_then(|file| std::fs::OpenOptions::new().create(true).append(true).open(file).ok());

    if let Some(f) = log_file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Echo to the console only in the foreground
        let is_tty = atty::is(atty::Stream::Stdout);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}
