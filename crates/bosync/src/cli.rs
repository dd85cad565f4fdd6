//! Clap derive structures for the `bosync` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// bosync -- building ontology to asset hierarchy synchronizer
#[derive(Debug, Parser)]
#[command(
    name = "bosync",
    version,
    about = "Synchronize building ontologies into asset hierarchies",
    long_about = "Fetches the ontology of each configured gateway account, resolves its\n\
        types and templates, synthesizes the asset hierarchy, and exports it.\n\n\
        Without a platform backend the export is recorded in-process (dry run).",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (overrides the platform default location)
    #[arg(long, env = "BOSYNC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "BOSYNC_OUTPUT",
        default_value = "text",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary (default)
    Text,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one synchronization for one or all accounts
    Sync(SyncArgs),

    /// Keep every account synchronized until interrupted
    Run,

    /// Resolve an ontology document offline and print the result
    Inspect(InspectArgs),

    /// Manage the configuration file
    Config(ConfigArgs),
}

// ── Sync ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Account id (default: every configured account)
    #[arg(long, short = 'a')]
    pub account: Option<i64>,

    /// Also register webhook subscriptions after the rebuild
    #[arg(long)]
    pub subscribe: bool,
}

// ── Inspect ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Ontology JSON document as served by the gateway
    #[arg(long, short = 'f')]
    pub file: PathBuf,

    /// Apply the asset filter of this configured account
    #[arg(long)]
    pub account: Option<String>,

    /// Part of the resolution to print
    #[arg(long, default_value = "summary")]
    pub show: InspectView,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InspectView {
    /// Counts and warnings
    Summary,
    /// Synthesized asset tree
    Tree,
    /// Exported asset types
    Types,
    /// Recovered problems only
    Warnings,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Show the effective configuration with secrets masked
    Show,

    /// Add an account profile to the config file
    Init(InitArgs),
}

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Profile name
    #[arg(long)]
    pub name: String,

    /// Numeric account id, used in webhook paths
    #[arg(long)]
    pub id: i64,

    #[arg(long)]
    pub gateway_id: String,

    #[arg(long)]
    pub client_id: String,

    /// Environment variable holding the client secret
    #[arg(long)]
    pub client_secret_env: Option<String>,

    /// Platform project to export into (repeatable)
    #[arg(long = "project")]
    pub project_ids: Vec<String>,

    /// Public base URL the gateway posts webhooks to
    #[arg(long)]
    pub webhook_url: Option<String>,

    /// Replace an existing profile of the same name
    #[arg(long)]
    pub force: bool,
}
