use clap::Parser;
use std::path::PathBuf;

/// Interactive decimal calculator with undoable, persistent history
#[derive(Parser, Debug)]
#[command(name = "abacus", version)]
#[command(about = "Interactive decimal calculator with undoable, persistent history")]
pub struct Args {
    /// Directory that relative log and history paths are resolved against
    #[arg(long, env = "CALCULATOR_BASE_DIR")]
    pub base_dir: Option<PathBuf>,

    /// TOML configuration file, applied before CALCULATOR_* environment overrides
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Load the saved history before the first prompt
    #[arg(long, default_value_t = false)]
    pub load: bool,
}
