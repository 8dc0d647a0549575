//! Command-line interface for the Guild Arena.

mod commands;

use clap::{Parser, Subcommand};

/// Guild Arena - mission progression service
#[derive(Parser)]
#[command(name = "arena")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server (default)
    #[command(alias = "daemon")]
    Serve,

    /// Create a default config.toml with a fresh JWT secret
    #[command(alias = "--init")]
    Init,

    /// Create an administrator account
    CreateAdmin {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Print the rank earned by a number of completed missions
    Rank {
        missions: i32,
    },
}

pub use commands::*;
