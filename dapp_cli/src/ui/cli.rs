use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use dapp_core::core::settings::Settings;
use dapp_core::storage::FileTagStore;
use dapp_core::{ConnectorError, ConnectorManager, ConnectorSnapshot, Phase};
use log::{error, info, LevelFilter};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "dapp-connect", version, subcommand_required = true)]
pub struct Args {
    /// Settings file (defaults to the per-user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    pub fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect a configured wallet, asking for account access
    Connect {
        /// Connector tag from the settings file
        #[arg(long, default_value = "metamask")]
        connector: String,
    },
    /// Silently restore the last used connection, if auto-connect is on
    Reconnect,
    /// Forget the last used connector
    Disconnect,
    /// Show configured connectors and the remembered one
    Status,
}

pub async fn run_cli(args: Args) -> Result<(), ConnectorError> {
    let path = match args.config {
        Some(path) => path,
        None => Settings::default_path()?,
    };
    info!("Loading settings from {}", path.display());
    let settings = Settings::load_or_default(&path)?;
    let host = Arc::new(settings.build_host());
    let config = settings.into_config(host)?;

    let manager = ConnectorManager::new(config, Arc::new(FileTagStore::new()?));
    let _errors = manager.subscribe_errors(|e| {
        error!("{e}");
        if let Some(url) = e.install_url() {
            println!("No wallet found. Install one from {url}");
        }
    });

    match args.command {
        Command::Connect { connector } => {
            let phase = manager.activate_named(&connector).await?;
            print_snapshot(&manager.snapshot());
            if phase != Phase::Active {
                return Err(ConnectorError::Other(format!(
                    "{connector} did not connect"
                )));
            }
        }
        Command::Reconnect => match manager.connect_on_startup().await {
            Some(_) => print_snapshot(&manager.snapshot()),
            None => println!("Nothing to reconnect."),
        },
        Command::Disconnect => {
            manager.deactivate().await;
            println!("Disconnected.");
        }
        Command::Status => {
            let config = manager.config();
            println!("Configured connectors: {}", config.connectors.tags().join(", "));
            println!("Auto-connect: {}", if config.auto_connect { "on" } else { "off" });
            match manager.auto_connect_tag() {
                Some(tag) => println!("Last used: {tag}"),
                None => println!("Last used: -"),
            }
        }
    }
    Ok(())
}

fn print_snapshot(snapshot: &ConnectorSnapshot) {
    let connector = snapshot.connector.as_deref().unwrap_or("-");
    println!("Connector: {connector} ({:?})", snapshot.phase);
    match snapshot.chain_id {
        Some(chain_id) => println!("Chain id:  {chain_id}"),
        None => println!("Chain id:  -"),
    }
    for account in &snapshot.accounts {
        println!("Account:   {account}");
    }
}
