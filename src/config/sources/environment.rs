//! Environment sources.
//!
//! `MBSYNC_<SECTION>__<KEY>` reaches any key (`MBSYNC_METABASE__URL`,
//! `MBSYNC_REPO__ARCHIVE`). The plain variables `METABASE_URL`,
//! `METABASE_USER`, `METABASE_PASSWORD` and `REPO_PATH` are honored on top.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::Map;

pub const ENV_PREFIX: &str = "MBSYNC";

/// Plain variable names and the keys they set.
pub const PLAIN_VARIABLES: &[(&str, &str)] = &[
    ("METABASE_URL", "metabase.url"),
    ("METABASE_USER", "metabase.user"),
    ("METABASE_PASSWORD", "metabase.password"),
    ("REPO_PATH", "repo.path"),
];

/// Snapshot of the process environment.
pub fn process_env() -> Map<String, String> {
    std::env::vars().collect()
}

/// Add both environment layers, reading from `env` instead of the process
/// environment so callers (and tests) control the input.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    env: &Map<String, String>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let mut builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .source(Some(env.clone())),
    );

    for (variable, key) in PLAIN_VARIABLES {
        let value = env.get(*variable).filter(|v| !v.is_empty()).cloned();
        builder = builder.set_override_option(*key, value)?;
    }
    Ok(builder)
}
