use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "sizewatch",
    version,
    about = "Track build artifact sizes per branch and gate pull requests on size regressions"
)]
pub struct Cli {
    /// Store spec (memory://, file://<path>, https://<database>)
    #[arg(long, global = true, env = "SIZEWATCH_STORE")]
    pub store: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Process one CI status webhook payload
    Event(EventArgs),
    /// List projects with stored snapshots
    Projects,
    /// Print the artifacts stored for one commit
    Show(ShowArgs),
    /// Compare two stored commits of a branch
    Compare(CompareArgs),
}

#[derive(Args, Debug, Clone)]
pub struct EventArgs {
    /// Webhook JSON file, or `-` for stdin
    #[arg(long)]
    pub payload: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    #[arg(long)]
    pub project: String,

    #[arg(long)]
    pub branch: String,

    #[arg(long)]
    pub sha: String,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CompareArgs {
    #[arg(long)]
    pub branch: String,

    /// Baseline commit
    #[arg(long)]
    pub base_sha: String,

    /// Candidate commit
    #[arg(long)]
    pub head_sha: String,

    /// Largest allowed per-artifact increase in bytes
    #[arg(long, default_value_t = 1000)]
    pub max_increase: u64,
}
