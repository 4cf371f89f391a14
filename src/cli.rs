use crate::engine::Variant;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "eai",
    version,
    about = "Environmental Assessment Index for marine water and sediment samples"
)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Assess one measurement set (JSON object)
    Assess(AssessArgs),
    /// Assess every record in a JSON/CSV file or a directory of them
    Batch(BatchArgs),
    /// Print the active standards table
    Standards(RunArgs),
    /// Write a default eai.toml in the current directory
    Init(InitArgs),
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    #[arg(long, value_enum)]
    pub profile: Option<Variant>,
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct AssessArgs {
    /// JSON file to read, or `-` for stdin
    #[arg(long, default_value = "-")]
    pub input: PathBuf,
    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Debug, Args, Clone)]
pub struct BatchArgs {
    #[arg(long)]
    pub input: PathBuf,
    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Debug, Args)]
pub struct InitArgs {
    #[arg(long)]
    pub config: Option<PathBuf>,
}
