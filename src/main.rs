use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use minimail::{Config, CredentialStore, MailDaemon};

#[derive(Parser)]
#[command(name = "minimail")]
#[command(about = "Minimal SMTP submission and POP3 retrieval servers")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, short, global = true, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run both servers (the default)
    Serve,

    /// Append an account to the account log
    AddAccount {
        /// Mailbox address, e.g. bob@example.com
        address: String,

        /// Login secret
        secret: String,
    },
}

fn load_config(path: &Path) -> Config {
    match Config::load_with_env(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", path.display());
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let config = load_config(&args.config);

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::AddAccount { address, secret } => add_account(config, &address, &secret).await,
    }
}

async fn serve(config: Config) -> ExitCode {
    if let Err(e) = minimail::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        minimail::logging::init_console_only(&config.logging.level);
    }

    info!("minimail starting");

    let daemon = match MailDaemon::bind(&config).await {
        Ok(daemon) => daemon,
        Err(e) => {
            error!("Failed to start: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match daemon.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Server stopped: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn add_account(config: Config, address: &str, secret: &str) -> ExitCode {
    minimail::logging::init_console_only(&config.logging.level);

    let result = async {
        let store = CredentialStore::load(&config.storage.users_file).await?;
        store.append(address, secret).await
    }
    .await;

    match result {
        Ok(account) => {
            info!("Added account {}", account.address);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to add account {}: {}", address, e);
            ExitCode::FAILURE
        }
    }
}
