//! Clap derive structures for the `brewlink` CLI.

use clap::{Args, Parser, Subcommand};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// brewlink -- drive a brewgate espresso gateway from the command line
#[derive(Debug, Parser)]
#[command(
    name = "brewlink",
    version,
    about = "Discover and control a brewgate espresso gateway",
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
    /// Gateway host (skips mDNS discovery)
    #[arg(long, env = "BREWLINK_HOST", global = true)]
    pub host: Option<String>,

    /// Gateway HTTP port
    #[arg(long, env = "BREWLINK_PORT", global = true)]
    pub port: Option<u16>,

    /// Gateway streaming port (defaults to the HTTP port)
    #[arg(long, env = "BREWLINK_WS_PORT", global = true)]
    pub ws_port: Option<u16>,

    /// mDNS scan budget in seconds
    #[arg(long, global = true)]
    pub scan_budget: Option<u64>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Discover the gateway and list attached devices
    Scan,

    /// Show machine info, state, and water levels
    Status,

    /// Stream live machine (and scale) telemetry until interrupted
    Watch,

    /// Request a machine state transition
    State(StateArgs),

    /// Zero the scale
    Tare,
}

#[derive(Debug, Args)]
pub struct StateArgs {
    /// Target state
    #[arg(value_parser = ["sleep", "idle", "espresso", "steam", "hotWater", "flush"])]
    pub state: String,
}
