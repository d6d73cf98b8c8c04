//! Sync pipeline
//!
//! One run: authenticate, expand the collection tree, resolve card bodies,
//! write the mirror, snapshot it into git. Only authentication failure aborts
//! the run; everything else is recorded in the report and the run continues.

use crate::client::MetabaseApi;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::materialize::Materializer;
use crate::report::{CommitOutcome, DegradationLog, SyncReport};
use crate::resolver::{resolve_artifacts, ArtifactMap};
use crate::snapshot::{GitRepository, SnapshotController, SnapshotOutcome};
use crate::tree::builder::TreeBuilder;
use crate::tree::hasher;
use chrono::Utc;
use std::path::PathBuf;
use tracing::{info, instrument, warn};

/// Runs a sync against one Metabase instance into one mirror directory.
pub struct SyncPipeline<'a> {
    config: &'a SyncConfig,
    api: &'a dyn MetabaseApi,
    root: PathBuf,
}

impl<'a> SyncPipeline<'a> {
    /// `root` is the mirror directory, already resolved against the
    /// working directory.
    pub fn new(config: &'a SyncConfig, api: &'a dyn MetabaseApi, root: PathBuf) -> Self {
        Self { config, api, root }
    }

    #[instrument(skip_all, fields(root = %self.root.display()))]
    pub async fn run(&self) -> Result<SyncReport, SyncError> {
        let started_at = Utc::now();
        let mut log = DegradationLog::new();

        let token = self.api.authenticate().await?;
        info!("Authenticated");

        let tree = TreeBuilder::new(self.api, &token).build(&mut log).await;

        let cards = match self.api.fetch_cards(&token).await {
            Ok(cards) => cards,
            Err(e) => {
                log.record("cards", &e);
                Vec::new()
            }
        };
        let artifacts: ArtifactMap = resolve_artifacts(self.api, &token, cards, &mut log).await;

        let materialized =
            Materializer::new(self.root.clone()).write_tree(&tree, &artifacts, &mut log);

        let fingerprint = match hasher::fingerprint(&self.root) {
            Ok(fingerprint) => Some(fingerprint),
            Err(e) => {
                log.record("fingerprint", &e);
                None
            }
        };

        let snapshot = self.snapshot(&mut log);

        if !log.is_empty() {
            warn!(degradations = log.len(), "Sync finished with degradations");
        }

        Ok(SyncReport {
            started_at,
            finished_at: Utc::now(),
            repo_path: self.root.display().to_string(),
            fresh_repo: snapshot.fresh_repo,
            collections: tree.container_count(),
            items: tree.leaf_count(),
            artifacts: artifacts.len(),
            resolved_bodies: artifacts.resolved_count(),
            files_written: materialized.files_written,
            indexed_leaves: materialized.path_index.len(),
            fingerprint,
            commit: snapshot.commit,
            archive: snapshot.archive.map(|p| p.display().to_string()),
            degradations: log,
        })
    }

    fn snapshot(&self, log: &mut DegradationLog) -> SnapshotOutcome {
        let mut repo = match GitRepository::new(self.root.clone(), &self.config.git) {
            Ok(repo) => repo,
            Err(e) => {
                log.record("git open", &e);
                return SnapshotOutcome {
                    fresh_repo: false,
                    commit: CommitOutcome::Unchanged { revision: None },
                    archive: None,
                };
            }
        };

        let mut controller = SnapshotController::new(&mut repo);
        if self.config.repo.archive {
            match self.root.parent() {
                Some(dir) => controller = controller.with_archive_dir(dir.to_path_buf()),
                None => log.record(
                    "archive",
                    &SyncError::VersionControl(format!(
                        "{} has no parent directory to archive into",
                        self.root.display()
                    )),
                ),
            }
        }
        controller.snapshot(log)
    }
}
