use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// `taskpush` - push today's Todoist tasks to a TRMNL display.
#[derive(Parser, Debug)]
#[command(name = "taskpush")]
#[command(author = "theonlyhennygod")]
#[command(version)]
#[command(about = "Push due and overdue Todoist tasks to a TRMNL display.", long_about = None)]
pub struct Cli {
    /// Path to config.toml (default: ~/.taskpush/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch, compact and publish the task list (the scheduled entry point)
    Run {
        /// Build and print the payload without posting it
        #[arg(long)]
        dry_run: bool,

        /// Never open the browser flow; fail if no usable token is stored
        #[arg(long, conflicts_with = "interactive")]
        non_interactive: bool,

        /// Allow the browser flow even when stdin is not a terminal
        #[arg(long)]
        interactive: bool,
    },

    /// Authorize with Todoist and store a fresh token
    Login,

    /// Delete the stored token
    Logout,

    /// Show configuration and token state (no secrets)
    Status,
}
