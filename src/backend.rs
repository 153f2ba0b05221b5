// src/backend.rs

use crate::error::{DiffError, Result};
use crate::model::{ChangeKind, ChangedPath, Commit, FileDiff, RepositoryIdentity};
use git2::{Delta, DiffFindOptions, DiffOptions, ErrorCode, Oid, Patch, Repository, Sort};
use std::path::Path;

/// Read access to a version-controlled tree.
///
/// Expected absences (unknown id, missing path) are `Ok(None)`; only real
/// failures are errors.
pub trait RepositoryBackend {
    /// Every commit reachable from any reference, in the backend's own order
    fn full_commit_log(&self) -> Result<Vec<Commit>>;

    fn resolve(&self, id: &str) -> Result<Option<Commit>>;

    /// Number of paths that differ between the two trees, without patch text
    fn changed_path_count(&self, old_id: &str, new_id: &str) -> Result<usize>;

    /// Per-path changes from `old_id` to `new_id` with unified patch text
    fn tree_diff(&self, old_id: &str, new_id: &str, context_lines: u32, detect_renames: bool) -> Result<Vec<FileDiff>>;

    /// Text of `path` as of `commit_id`
    fn blob_at(&self, commit_id: &str, path: &str) -> Result<Option<String>>;

    /// Commits reachable from `commit_id`, starting with that commit
    fn ancestry_from(&self, commit_id: &str) -> Result<Vec<Commit>>;

    fn identity(&self) -> RepositoryIdentity;
}

/// `RepositoryBackend` over a local git repository.
pub struct GitBackend {
    repo: Repository,
}

impl GitBackend {
    pub fn open(path: &Path) -> Result<Self> {
        let repo = Repository::open(path).map_err(|source| DiffError::OpenRepository { path: path.to_path_buf(), source })?;
        tracing::info!(path = %path.display(), "opened repository");
        Ok(Self { repo })
    }

    fn find_commit(&self, id: &str) -> Result<git2::Commit<'_>> {
        let oid = Oid::from_str(id).map_err(|_| DiffError::UnresolvedCommit(id.to_string()))?;
        self.repo.find_commit(oid).map_err(|e| match e.code() {
            ErrorCode::NotFound => DiffError::UnresolvedCommit(id.to_string()),
            _ => DiffError::Git(e),
        })
    }

    fn diff_trees(&self, old_id: &str, new_id: &str, context_lines: u32, detect_renames: bool) -> Result<git2::Diff<'_>> {
        let old_tree = self.find_commit(old_id)?.tree()?;
        let new_tree = self.find_commit(new_id)?.tree()?;

        let mut diff_opts = DiffOptions::new();
        diff_opts.context_lines(context_lines);
        diff_opts.ignore_filemode(true);

        let mut diff = self.repo.diff_tree_to_tree(Some(&old_tree), Some(&new_tree), Some(&mut diff_opts))?;
        if detect_renames {
            let mut find_opts = DiffFindOptions::new();
            find_opts.renames(true);
            diff.find_similar(Some(&mut find_opts))?;
        }
        Ok(diff)
    }

    fn walk(&self, revwalk: git2::Revwalk<'_>) -> Result<Vec<Commit>> {
        let mut commits = Vec::new();
        for oid in revwalk {
            let commit = self.repo.find_commit(oid?)?;
            commits.push(to_commit(&commit));
        }
        Ok(commits)
    }
}

impl RepositoryBackend for GitBackend {
    /// Oldest first, so a walk from an anchor runs towards the branch heads.
    fn full_commit_log(&self) -> Result<Vec<Commit>> {
        let mut revwalk = self.repo.revwalk()?;
        if let Err(e) = revwalk.push_head() {
            tracing::debug!(error = %e, "HEAD has no commit to walk from");
        }
        for reference in self.repo.references()? {
            let reference = reference?;
            if let Ok(commit) = reference.peel_to_commit() {
                revwalk.push(commit.id())?;
            }
        }
        revwalk.set_sorting(Sort::TIME | Sort::REVERSE)?;
        self.walk(revwalk)
    }

    fn resolve(&self, id: &str) -> Result<Option<Commit>> {
        let id = id.trim();
        if id.is_empty() {
            return Ok(None);
        }

        let mut candidates = vec![id.to_string()];
        if id.chars().all(|c| c.is_ascii_hexdigit()) && id.chars().any(|c| c.is_ascii_uppercase()) {
            candidates.push(id.to_ascii_lowercase());
        }

        for candidate in candidates {
            match self.repo.revparse_single(&candidate) {
                Ok(object) => return Ok(object.peel_to_commit().ok().map(|c| to_commit(&c))),
                Err(e) => tracing::debug!(id = %candidate, error = %e, "revision not found"),
            }
        }
        Ok(None)
    }

    fn changed_path_count(&self, old_id: &str, new_id: &str) -> Result<usize> {
        Ok(self.diff_trees(old_id, new_id, 0, false)?.deltas().len())
    }

    fn tree_diff(&self, old_id: &str, new_id: &str, context_lines: u32, detect_renames: bool) -> Result<Vec<FileDiff>> {
        let diff = self.diff_trees(old_id, new_id, context_lines, detect_renames)?;

        let mut files = Vec::with_capacity(diff.deltas().len());
        for (idx, delta) in diff.deltas().enumerate() {
            let change = ChangedPath {
                old_path: path_of(delta.old_file()),
                new_path: path_of(delta.new_file()),
                kind: change_kind(delta.status()),
            };

            let patch = match Patch::from_diff(&diff, idx) {
                Ok(Some(mut patch)) => match patch.to_buf() {
                    Ok(buf) => Some(String::from_utf8_lossy(&buf).into_owned()),
                    Err(e) => {
                        tracing::warn!(path = ?change.live_path(), error = %e, "could not format patch");
                        None
                    }
                },
                Ok(None) => Some(String::new()),
                Err(e) => {
                    tracing::warn!(path = ?change.live_path(), error = %e, "could not build patch");
                    None
                }
            };

            files.push(FileDiff { change, patch });
        }

        Ok(files)
    }

    fn blob_at(&self, commit_id: &str, path: &str) -> Result<Option<String>> {
        let tree = self.find_commit(commit_id)?.tree()?;
        let entry = match tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let object = entry.to_object(&self.repo)?;
        let Some(blob) = object.as_blob() else {
            return Ok(None);
        };
        if blob.is_binary() {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(blob.content()).into_owned()))
    }

    /// Newest first: the commit itself, then its parents.
    fn ancestry_from(&self, commit_id: &str) -> Result<Vec<Commit>> {
        let commit = self.find_commit(commit_id)?;
        let mut revwalk = self.repo.revwalk()?;
        revwalk.push(commit.id())?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        self.walk(revwalk)
    }

    fn identity(&self) -> RepositoryIdentity {
        let name = self
            .repo
            .workdir()
            .unwrap_or_else(|| self.repo.path())
            .components()
            .next_back()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .unwrap_or_default();

        let config = self.repo.config().and_then(|mut c| c.snapshot()).ok();
        let setting = |key: &str| config.as_ref().and_then(|c| c.get_string(key).ok()).unwrap_or_default();

        RepositoryIdentity { name, user_name: setting("user.name"), user_email: setting("user.email") }
    }
}

fn to_commit(commit: &git2::Commit<'_>) -> Commit {
    Commit {
        id: commit.id().to_string(),
        message: commit.summary().unwrap_or_default().to_string(),
        timestamp: commit.time().seconds(),
        parents: commit.parent_ids().map(|id| id.to_string()).collect(),
    }
}

fn path_of(file: git2::DiffFile<'_>) -> Option<String> {
    file.path().and_then(|p| p.to_str()).map(String::from)
}

fn change_kind(status: Delta) -> ChangeKind {
    match status {
        Delta::Added => ChangeKind::Added,
        Delta::Deleted => ChangeKind::Deleted,
        Delta::Modified => ChangeKind::Modified,
        Delta::Renamed => ChangeKind::Renamed,
        _ => ChangeKind::Other,
    }
}
