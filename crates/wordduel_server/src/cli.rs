//! Command-line interface for wordduel.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use wordduel::GameMode;

/// Word Duel - two-player word guessing over WebSockets
#[derive(Parser, Debug)]
#[command(name = "wordduel")]
#[command(about = "Word Duel game server", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the game server
    Serve {
        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
    },

    /// Print a player's recorded totals
    Stats {
        /// Player id
        player_id: String,

        /// Only count this mode
        #[arg(short, long)]
        mode: Option<GameMode>,

        /// Path to the database file
        #[arg(long, default_value = "wordduel.db")]
        db: String,

        /// Also list this many recent results
        #[arg(long, default_value = "10")]
        history: i64,
    },

    /// Apply pending database migrations
    Migrate {
        /// Path to the database file
        #[arg(long, default_value = "wordduel.db")]
        db: String,
    },

    /// Mint a verified identity token for a player
    IssueToken {
        /// Player id to embed in the token
        player_id: String,

        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
