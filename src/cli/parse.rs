//! CLI parse: clap types for metabase-git-sync. No behavior; definitions only.

use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

/// Mirror Metabase collections and cards into a git repository
#[derive(Parser, Debug)]
#[command(name = "metabase-git-sync")]
#[command(about = "Mirror Metabase collections and cards into a git repository")]
pub struct Cli {
    /// Directory holding metabase-git-sync.toml; relative repo paths resolve here
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (replaces global and workspace files)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Mirror directory (overrides repo.path and REPO_PATH)
    #[arg(long)]
    pub repo_path: Option<PathBuf>,

    /// Also write a zip archive of the resulting revision
    #[arg(long)]
    pub archive: bool,

    /// Report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Print the effective configuration (password redacted) and exit
    #[arg(long)]
    pub show_config: bool,

    /// Debug-level logging
    #[arg(long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Disable logging
    #[arg(long)]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (when output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
}

impl Cli {
    /// Workspace directory made absolute against `cwd`.
    pub fn workspace_root(&self, cwd: &Path) -> PathBuf {
        if self.workspace.is_absolute() {
            self.workspace.clone()
        } else {
            cwd.join(&self.workspace)
        }
    }
}
