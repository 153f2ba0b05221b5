// src/workspace.rs

use crate::attributor::PairwiseDiffAttributor;
use crate::backend::{GitBackend, RepositoryBackend};
use crate::classify::{FileCategory, PathClassifier};
use crate::error::{DiffError, Result};
use crate::model::{Commit, CommitSummary};
use crate::parser::{JavaSourceParser, SourceParser};
use crate::resolver;
use crate::session::ReportOptions;
use std::path::Path;

/// One application run: the selected repository plus the settings every diff
/// request shares. Without a repository, queries return nothing and diffs fail
/// with `DiffError::NoRepository`.
pub struct Workspace {
    backend: Option<Box<dyn RepositoryBackend>>,
    parser: Box<dyn SourceParser>,
    classifier: PathClassifier,
    report: ReportOptions,
    progress: bool,
}

impl Workspace {
    pub fn new(classifier: PathClassifier, report: ReportOptions) -> Self {
        Self { backend: None, parser: Box::new(JavaSourceParser), classifier, report, progress: false }
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Opens the repository at `path`. On failure any previous selection is
    /// dropped and the error is returned once.
    pub fn select_root(&mut self, path: &Path) -> Result<()> {
        self.backend = None;
        match GitBackend::open(path) {
            Ok(backend) => {
                self.backend = Some(Box::new(backend));
                Ok(())
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "no repository selected");
                Err(e)
            }
        }
    }

    /// Summaries of the log from `anchor` onwards, oldest first.
    pub fn list_commits_from(&self, anchor: Option<&str>) -> Vec<CommitSummary> {
        resolver::list_from(anchor, &self.commit_log())
    }

    pub fn visible_base_commits(&self) -> Vec<CommitSummary> {
        resolver::visible_base_commits(&self.commit_log())
    }

    pub fn visible_new_commits(&self, base_index: usize) -> Vec<CommitSummary> {
        resolver::visible_new_commits(&self.commit_log(), base_index)
    }

    /// Attributes `base_id..new_id` and returns the rendered report.
    pub fn run_diff(&self, base_id: &str, new_id: &str) -> Result<String> {
        let backend = self.backend.as_deref().ok_or(DiffError::NoRepository)?;
        let session = PairwiseDiffAttributor::new(backend, self.parser.as_ref(), &self.classifier)
            .with_report_options(self.report)
            .with_progress(self.progress)
            .run(base_id, new_id)?;

        tracing::info!(
            delta_count = session.delta_count(),
            markup_files = session.auxiliary_files(FileCategory::Markup).map_or(0, |f| f.len()),
            query_files = session.auxiliary_files(FileCategory::QueryScript).map_or(0, |f| f.len()),
            packages = session.packages().count(),
            "attribution finished"
        );
        for package in session.packages() {
            tracing::debug!(package, methods = session.methods(package).map_or(0, |m| m.len()), "package attributed");
        }

        Ok(session.render())
    }

    fn commit_log(&self) -> Vec<Commit> {
        let Some(backend) = self.backend.as_deref() else {
            return Vec::new();
        };
        backend.full_commit_log().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not read commit log");
            Vec::new()
        })
    }
}
