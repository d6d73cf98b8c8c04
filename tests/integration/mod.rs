//! Integration tests for metabase-git-sync

mod config_layers;
mod pipeline_scenarios;
mod test_utils;
