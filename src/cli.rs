//! CLI argument parsing.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::{
    config::DEFAULT_CONFIG_FILE, error::Result, forge::config::GithubConfig,
};

/// Subcommand execution.
pub mod command;

/// Global CLI arguments for configuration and debugging.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[arg(long, default_value = DEFAULT_CONFIG_FILE, global = true)]
    /// Path to the advisor configuration file.
    pub config: PathBuf,

    #[arg(long, default_value = "", global = true)]
    /// GitHub personal access token. Falls back to GITHUB_TOKEN env var.
    pub github_token: String,

    #[arg(long, default_value_t = false, global = true)]
    /// Enable debug logging.
    pub debug: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Advisor subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Suggest cherry-picks for a pull_request webhook payload.
    Suggest {
        #[arg(long)]
        /// File containing the GitHub pull_request event JSON.
        event: PathBuf,

        #[arg(long, default_value_t = false)]
        /// Log the comment instead of posting it.
        dry_run: bool,
    },

    /// Print the newest release lines of the integration checkout.
    ReleaseLines {
        #[arg(long)]
        /// Number of release lines (defaults to the configured count).
        count: Option<usize>,
    },

    /// Print which revision of a repository each release line pins.
    Matrix {
        #[arg(long)]
        /// Repository name.
        repo: String,

        #[arg(long)]
        /// Number of release lines (defaults to the configured count).
        count: Option<usize>,
    },

    /// Pull the latest changes into the integration checkout.
    RefreshManifest,

    /// List the repositories versioned in an integration version.
    Repositories {
        #[arg(long)]
        /// Integration version, e.g. `master` or `3.1.x`.
        version: String,
    },

    /// List the integration versions that include a repository version.
    Integrations {
        #[arg(long)]
        /// Repository name.
        repo: String,

        #[arg(long)]
        /// Repository version or branch.
        version: String,
    },
}

impl Args {
    /// GitHub connection settings from CLI arguments and environment.
    pub fn github_config(&self) -> Result<GithubConfig> {
        GithubConfig::from_token(&self.github_token)
    }
}
