use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "astore",
    version,
    about = "Browse and buy asset packs from the terminal"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Config file (defaults to the platform config directory).
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Raise log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Bearer token of the logged-in user.
    #[arg(
        long,
        env = "ASTORE_AUTH_TOKEN",
        hide_env_values = true,
        global = true
    )]
    pub auth_token: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List asset packs the user owns.
    Purchases(PurchasesArgs),
    /// Buy an asset pack and wait for the purchase to be confirmed.
    Purchase(PurchaseArgs),
}

#[derive(Debug, Args)]
pub struct PurchasesArgs {
    #[arg(long)]
    pub user_id: String,
}

#[derive(Debug, Args)]
pub struct PurchaseArgs {
    #[arg(long)]
    pub pack_id: String,
    /// Stripe price reference of the pack.
    #[arg(long)]
    pub price_id: String,
    #[arg(long)]
    pub user_id: String,
    #[arg(long)]
    pub email: String,
    /// Display name of the pack; defaults to its id.
    #[arg(long)]
    pub name: Option<String>,
}
