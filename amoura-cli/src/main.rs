//! Main entry point for the Amoura CLI.

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use shared::config::Config;
use std::path::PathBuf;
use uuid::Uuid;

mod commands;

/// Amoura CLI
#[derive(Parser)]
#[command(name = "Amoura CLI")]
#[command(about = "Command-line client for the Amoura platform", long_about = None)]
struct Cli {
    /// Path to the configuration file (optional)
    #[arg(
        long,
        short,
        global = true,
        help = "Path to the configuration file (e.g., config.toml). If not provided, defaults and environment variables are used."
    )]
    config: Option<PathBuf>,

    /// Backend URL override
    #[arg(
        long,
        global = true,
        help = "Backend base URL (e.g., https://api.amoura.app). Overrides the configuration file."
    )]
    backend_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Subcommands for the Amoura CLI
#[derive(Subcommand)]
enum Commands {
    /// Show or edit your profile
    Profile {
        /// Your user id; falls back to AMOURA_USER_ID
        #[arg(long, help = "Your user id (UUID). Falls back to the AMOURA_USER_ID environment variable.")]
        user: Option<Uuid>,

        /// New display name
        #[arg(long, help = "Set a new display name")]
        display_name: Option<String>,

        /// New bio
        #[arg(long, help = "Set a new bio")]
        bio: Option<String>,
    },
    /// Browse the feed or publish a post
    Feed {
        /// Your user id; falls back to AMOURA_USER_ID
        #[arg(long, help = "Your user id (UUID). Falls back to the AMOURA_USER_ID environment variable.")]
        user: Option<Uuid>,

        /// Publish a post with this body instead of listing the feed
        #[arg(long, help = "Publish a post with this body instead of listing the feed")]
        publish: Option<String>,

        /// Gate the published post behind a one-time unlock price, in cents
        #[arg(long, help = "Unlock price in cents; makes the published post premium")]
        price_cents: Option<i64>,
    },
    /// Open a direct-message conversation
    Chat {
        /// Your user id; falls back to AMOURA_USER_ID
        #[arg(long, help = "Your user id (UUID). Falls back to the AMOURA_USER_ID environment variable.")]
        user: Option<Uuid>,

        /// The user to chat with
        #[arg(long, help = "The peer's user id (UUID)")]
        peer: Uuid,

        /// Send this message; without it the conversation history is shown
        #[arg(long, short, help = "Send this message; without it the conversation history is shown")]
        message: Option<String>,

        /// Keep the conversation open and print live messages
        #[arg(long, help = "Keep the conversation open and print messages as they arrive")]
        watch: bool,
    },
    /// Wallet balance and ledger
    Wallet {
        /// Your user id; falls back to AMOURA_USER_ID
        #[arg(long, help = "Your user id (UUID). Falls back to the AMOURA_USER_ID environment variable.")]
        user: Option<Uuid>,

        /// Credit the wallet with this many cents
        #[arg(long, help = "Credit the wallet with this many cents")]
        top_up_cents: Option<i64>,
    },
    /// Run the offline messaging demo against the in-memory backend
    Demo,
    /// Generate shell completion scripts for the CLI
    Completion {
        /// The shell to generate completions for
        #[arg(value_enum, help = "The shell to generate completions for (e.g., bash, zsh, fish)")]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    let config_path = cli.config.or_else(Config::default_config_path_if_present);
    let config = Config::load_config(config_path, cli.backend_url)
        .map_err(|err| anyhow::anyhow!("failed to load configuration: {err}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&config.log_level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Profile {
            user,
            display_name,
            bio,
        } => commands::profile::run(&config, user, display_name, bio).await,
        Commands::Feed {
            user,
            publish,
            price_cents,
        } => commands::feed::run(&config, user, publish, price_cents).await,
        Commands::Chat {
            user,
            peer,
            message,
            watch,
        } => commands::chat::run(&config, user, peer, message, watch).await,
        Commands::Wallet { user, top_up_cents } => {
            commands::wallet::run(&config, user, top_up_cents).await
        }
        Commands::Demo => commands::demo::run().await,
        Commands::Completion { shell } => {
            commands::completion::run(shell);
            Ok(())
        }
    }
}
