//! CLI command definitions

use clap::Args;
use std::path::PathBuf;

/// Run a job
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to job YAML file
    #[arg(short, long)]
    pub file: String,

    /// Directory to provision run workspaces under (defaults to the
    /// system temp directory)
    #[arg(long)]
    pub workspace: Option<PathBuf>,

    /// Directory for the cache store (defaults to the user cache dir)
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Use an in-memory cache store instead of the filesystem
    #[arg(long)]
    pub no_cache: bool,

    /// Output the final report in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Validate a job configuration
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to job YAML file
    #[arg(short, long)]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}
