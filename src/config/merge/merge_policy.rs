//! Merge rules: defaults, override order, conflict handling.
//!
//! Later sources win key by key: defaults, global file, workspace file (or an
//! explicit `--config` file in place of both), `MBSYNC_*` variables, then the
//! plain `METABASE_*` / `REPO_PATH` variables.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("metabase.connect_timeout_secs", 10)?
        .set_default("metabase.request_timeout_secs", 120)?
        .set_default("repo.path", "repo")?
        .set_default("repo.archive", false)?
        .set_default("git.author_name", "metabase-git-sync")?
        .set_default("git.author_email", "metabase-git-sync@localhost")
}
