//! Snapshot controller: commits the mirror as one git revision
//!
//! Repository freshness is decided by the presence of `<root>/.git`. A fresh
//! repository is initialized and gets the migration commit message; later runs
//! get the sync message. A run that changes nothing produces no commit and
//! reports the existing HEAD instead.

use crate::config::GitConfig;
use crate::error::SyncError;
use crate::report::{CommitOutcome, DegradationLog};
use git2::{Commit, IndexAddOption, Repository, Signature};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, instrument};

/// Commit message for the first snapshot in a new repository.
pub const INIT_MESSAGE: &str = "Init Metabase Git Migration";

/// Commit message for every later snapshot.
pub const SYNC_MESSAGE: &str = "Sync Metabase Git";

/// Directory prefix inside archives.
pub const ARCHIVE_PREFIX: &str = "metabase-git-sync/";

/// Archive file name for a revision.
pub fn archive_file_name(revision: &str) -> String {
    format!("metabase-git-sync-{}.zip", revision)
}

/// The version-control operations the controller needs.
pub trait VersionControl {
    /// Whether repository metadata already exists at the root.
    fn is_initialized(&self) -> bool;

    fn init(&mut self) -> Result<(), SyncError>;

    /// Stage every change under the root, including deletions.
    fn add_all(&mut self) -> Result<(), SyncError>;

    /// Commit the staged tree. `None` when there is nothing new to commit.
    fn commit(&mut self, message: &str) -> Result<Option<String>, SyncError>;

    /// Current HEAD revision; `None` on an unborn branch.
    fn head_revision(&self) -> Result<Option<String>, SyncError>;

    /// Write a zip archive of `revision` to `output`.
    fn archive(&self, revision: &str, output: &Path) -> Result<(), SyncError>;
}

/// git2-backed repository rooted at the mirror directory
pub struct GitRepository {
    workdir: PathBuf,
    repo: Option<Repository>,
    author_name: String,
    author_email: String,
}

impl GitRepository {
    /// Bind to `workdir`, opening the repository if one exists.
    pub fn new(workdir: PathBuf, git: &GitConfig) -> Result<Self, SyncError> {
        let repo = if workdir.join(".git").exists() {
            Some(Repository::open(&workdir)?)
        } else {
            None
        };
        Ok(Self {
            workdir,
            repo,
            author_name: git.author_name.clone(),
            author_email: git.author_email.clone(),
        })
    }

    fn repo(&self) -> Result<&Repository, SyncError> {
        self.repo.as_ref().ok_or_else(|| {
            SyncError::VersionControl(format!("no repository at {}", self.workdir.display()))
        })
    }

    fn head_commit(&self) -> Option<Commit<'_>> {
        self.repo
            .as_ref()?
            .head()
            .ok()
            .and_then(|head| head.peel_to_commit().ok())
    }
}

impl VersionControl for GitRepository {
    fn is_initialized(&self) -> bool {
        self.workdir.join(".git").exists()
    }

    fn init(&mut self) -> Result<(), SyncError> {
        info!(path = %self.workdir.display(), "Initializing repo");
        self.repo = Some(Repository::init(&self.workdir)?);
        Ok(())
    }

    fn add_all(&mut self) -> Result<(), SyncError> {
        let repo = self.repo()?;
        let mut index = repo.index()?;
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"].iter(), None)?;
        index.write()?;
        Ok(())
    }

    fn commit(&mut self, message: &str) -> Result<Option<String>, SyncError> {
        let repo = self.repo()?;
        let mut index = repo.index()?;
        let tree_oid = index.write_tree()?;

        let parent = self.head_commit();
        match &parent {
            Some(head) if head.tree_id() == tree_oid => {
                debug!("Staged tree matches HEAD");
                return Ok(None);
            }
            None if index.len() == 0 => {
                debug!("Nothing staged on unborn branch");
                return Ok(None);
            }
            _ => {}
        }

        let tree = repo.find_tree(tree_oid)?;
        let sig = Signature::now(&self.author_name, &self.author_email)?;
        let parents: Vec<&Commit> = parent.iter().collect();
        let oid = repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;
        Ok(Some(oid.to_string()))
    }

    fn head_revision(&self) -> Result<Option<String>, SyncError> {
        let repo = self.repo()?;
        match repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?.id().to_string())),
            Err(e) if matches!(
                e.code(),
                git2::ErrorCode::UnbornBranch | git2::ErrorCode::NotFound
            ) =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// libgit2 has no archive support, so this runs `git archive`.
    fn archive(&self, revision: &str, output: &Path) -> Result<(), SyncError> {
        let result = Command::new("git")
            .arg("archive")
            .arg("--format=zip")
            .arg(format!("--prefix={}", ARCHIVE_PREFIX))
            .arg(format!("--output={}", output.display()))
            .arg(revision)
            .current_dir(&self.workdir)
            .output()
            .map_err(|e| SyncError::VersionControl(format!("Failed to run git archive: {}", e)))?;

        if !result.status.success() {
            return Err(SyncError::VersionControl(format!(
                "git archive failed: {}",
                String::from_utf8_lossy(&result.stderr).trim()
            )));
        }
        Ok(())
    }
}

/// What the snapshot step produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotOutcome {
    pub fresh_repo: bool,
    pub commit: CommitOutcome,
    pub archive: Option<PathBuf>,
}

/// Drives one snapshot of the mirror directory.
pub struct SnapshotController<'a, V: VersionControl> {
    vcs: &'a mut V,
    archive_dir: Option<PathBuf>,
}

impl<'a, V: VersionControl> SnapshotController<'a, V> {
    pub fn new(vcs: &'a mut V) -> Self {
        Self {
            vcs,
            archive_dir: None,
        }
    }

    /// Also archive the resulting revision into `dir` unless that archive
    /// already exists.
    pub fn with_archive_dir(mut self, dir: PathBuf) -> Self {
        self.archive_dir = Some(dir);
        self
    }

    #[instrument(skip_all)]
    pub fn snapshot(mut self, log: &mut DegradationLog) -> SnapshotOutcome {
        let fresh_repo = !self.vcs.is_initialized();
        if fresh_repo {
            info!("No git repo found, will initialize");
            if let Err(e) = self.vcs.init() {
                log.record("git init", &e);
                return SnapshotOutcome {
                    fresh_repo,
                    commit: CommitOutcome::Unchanged { revision: None },
                    archive: None,
                };
            }
        } else {
            info!("Found existing git repo");
        }

        let message = if fresh_repo { INIT_MESSAGE } else { SYNC_MESSAGE };

        if let Err(e) = self.vcs.add_all() {
            log.record("git add", &e);
        }

        let committed = match self.vcs.commit(message) {
            Ok(revision) => revision,
            Err(e) => {
                log.record("git commit", &e);
                None
            }
        };

        let commit = match committed {
            Some(revision) => {
                info!(revision = %revision, message, "Added commit");
                CommitOutcome::Committed {
                    revision,
                    message: message.to_string(),
                }
            }
            None => {
                info!("Did not commit anything");
                let revision = match self.vcs.head_revision() {
                    Ok(revision) => revision,
                    Err(e) => {
                        log.record("git rev-parse HEAD", &e);
                        None
                    }
                };
                CommitOutcome::Unchanged { revision }
            }
        };

        let archive = match (&self.archive_dir, commit.revision()) {
            (Some(dir), Some(revision)) => archive_revision(&*self.vcs, dir, revision, log),
            (Some(_), None) => {
                debug!("No revision to archive");
                None
            }
            _ => None,
        };

        SnapshotOutcome {
            fresh_repo,
            commit,
            archive,
        }
    }
}

fn archive_revision<V: VersionControl>(
    vcs: &V,
    dir: &Path,
    revision: &str,
    log: &mut DegradationLog,
) -> Option<PathBuf> {
    let output = dir.join(archive_file_name(revision));
    if output.exists() {
        debug!(path = %output.display(), "Archive already exists");
        return None;
    }
    match vcs.archive(revision, &output) {
        Ok(()) => {
            info!(path = %output.display(), "Archive created");
            Some(output)
        }
        Err(e) => {
            log.record(output.display().to_string(), &e);
            None
        }
    }
}
