//! Config loading entry point.

use super::merge::merge_policy;
use super::sources::{environment, global_file, workspace_file};
use super::SyncConfig;
use crate::error::SyncError;
use config::{File, Map};
use std::path::Path;

/// Loads [`SyncConfig`] from every source in precedence order.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, global file, workspace file, process environment.
    pub fn load(workspace_root: &Path) -> Result<SyncConfig, SyncError> {
        Self::load_with_env(workspace_root, None, &environment::process_env())
    }

    /// Defaults, the given file, process environment. The global and workspace
    /// files are not read.
    pub fn load_from_file(path: &Path) -> Result<SyncConfig, SyncError> {
        let workspace_root = path.parent().unwrap_or(Path::new("."));
        Self::load_with_env(workspace_root, Some(path), &environment::process_env())
    }

    /// Full load with an explicit environment map.
    pub fn load_with_env(
        workspace_root: &Path,
        config_file: Option<&Path>,
        env: &Map<String, String>,
    ) -> Result<SyncConfig, SyncError> {
        let mut builder = merge_policy::builder_with_defaults()?;

        builder = match config_file {
            Some(path) => {
                if !path.exists() {
                    return Err(SyncError::Config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                builder.add_source(File::from(path.to_path_buf()).required(true))
            }
            None => {
                let builder = global_file::add_to_builder(builder)?;
                workspace_file::add_to_builder(builder, workspace_root)?
            }
        };

        builder = environment::add_to_builder(builder, env)?;

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }
}
