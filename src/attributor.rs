// src/attributor.rs

use crate::backend::RepositoryBackend;
use crate::classify::{FileCategory, PathClassifier};
use crate::error::{DiffError, Result};
use crate::hunks;
use crate::locator;
use crate::model::{ChangeKind, Commit, FileDiff};
use crate::parser::SourceParser;
use crate::session::{DiffSession, ReportOptions};
use indicatif::ProgressBar;
use std::collections::HashSet;

/// Pair diffs carry changed lines only
const PAIR_CONTEXT_LINES: u32 = 0;

/// Attributes every change between two commits to the methods it touched.
pub struct PairwiseDiffAttributor<'a> {
    backend: &'a dyn RepositoryBackend,
    parser: &'a dyn SourceParser,
    classifier: &'a PathClassifier,
    report: ReportOptions,
    progress: bool,
}

impl<'a> PairwiseDiffAttributor<'a> {
    pub fn new(backend: &'a dyn RepositoryBackend, parser: &'a dyn SourceParser, classifier: &'a PathClassifier) -> Self {
        Self { backend, parser, classifier, report: ReportOptions::default(), progress: false }
    }

    pub fn with_report_options(mut self, report: ReportOptions) -> Self {
        self.report = report;
        self
    }

    /// Show a progress bar over the pair diffs
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Runs the whole attribution for `base_id..new_id`.
    ///
    /// Fails only when an endpoint can't be resolved; every other problem is
    /// logged and skips the file or pair it concerns.
    pub fn run(&self, base_id: &str, new_id: &str) -> Result<DiffSession> {
        let base = self.endpoint(base_id)?;
        let new = self.endpoint(new_id)?;
        tracing::info!(base = %base.id, new = %new.id, "diffing commit range");

        let mut session = DiffSession::new(self.report);
        session.set_identity(self.backend.identity());

        let delta_count = match self.backend.changed_path_count(&base.id, &new.id) {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(error = %e, "could not diff the endpoints; delta count left at zero");
                0
            }
        };
        session.set_delta_count(delta_count);

        if base.parents.is_empty() {
            tracing::debug!(base = %base.id, "base is a root commit; its own changes are not measured");
        }

        let base_plot = self.ancestry(&base.id);
        let new_plot = self.ancestry(&new.id);
        let window = accepted_window(&base.id, &base_plot, &new_plot);
        let pairs = pair_indices(window.len());
        tracing::debug!(commits = window.len(), pairs = pairs.len(), "accepted commit window");

        let bar = if self.progress { ProgressBar::new(pairs.len() as u64) } else { ProgressBar::hidden() };
        bar.set_message("Diffing commit pairs");

        for (newer, older) in pairs {
            self.attribute_pair(&window[older], &window[newer], &mut session);
            bar.inc(1);
        }
        bar.finish_with_message("Diff complete");

        session.set_endpoints(base, new);
        Ok(session)
    }

    fn endpoint(&self, id: &str) -> Result<Commit> {
        match self.backend.resolve(id) {
            Ok(Some(commit)) => Ok(commit),
            Ok(None) => Err(DiffError::UnresolvedCommit(id.to_string())),
            Err(e) => {
                tracing::error!(id, error = %e, "failed to resolve endpoint commit");
                Err(DiffError::UnresolvedCommit(id.to_string()))
            }
        }
    }

    fn ancestry(&self, id: &str) -> Vec<Commit> {
        self.backend.ancestry_from(id).unwrap_or_else(|e| {
            tracing::warn!(id, error = %e, "could not walk ancestry");
            Vec::new()
        })
    }

    fn attribute_pair(&self, older: &Commit, newer: &Commit, session: &mut DiffSession) {
        let files = match self.backend.tree_diff(&older.id, &newer.id, PAIR_CONTEXT_LINES, false) {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!(older = %older.id, newer = %newer.id, error = %e, "skipping commit pair");
                return;
            }
        };

        for file in &files {
            self.attribute_file(older, newer, file, session);
        }
    }

    fn attribute_file(&self, older: &Commit, newer: &Commit, file: &FileDiff, session: &mut DiffSession) {
        let Some(path) = file.change.live_path() else {
            return;
        };

        match self.classifier.classify(path) {
            Some(category @ (FileCategory::Markup | FileCategory::QueryScript)) => {
                session.record_auxiliary_file(category, Some(path));
            }
            Some(FileCategory::Source) => self.attribute_source(older, newer, file, session),
            None => {}
        }
    }

    fn attribute_source(&self, older: &Commit, newer: &Commit, file: &FileDiff, session: &mut DiffSession) {
        let (use_old, use_new) = match file.change.kind {
            ChangeKind::Added => (false, true),
            ChangeKind::Deleted => (true, false),
            ChangeKind::Modified => (true, true),
            ChangeKind::Renamed | ChangeKind::Other => {
                tracing::debug!(path = ?file.change.live_path(), kind = ?file.change.kind, "change kind not attributed");
                return;
            }
        };

        let Some(patch) = file.patch.as_deref() else {
            tracing::warn!(path = ?file.change.live_path(), "no patch text; skipping file");
            return;
        };

        if use_old {
            if let Some(path) = file.change.old_path.as_deref() {
                self.attribute_side(&older.id, path, &hunks::old_lines(patch), session);
            }
        }
        if use_new {
            if let Some(path) = file.change.new_path.as_deref() {
                self.attribute_side(&newer.id, path, &hunks::new_lines(patch), session);
            }
        }
    }

    /// Maps `lines` of `path` at `commit_id` onto their enclosing methods.
    fn attribute_side(&self, commit_id: &str, path: &str, lines: &[usize], session: &mut DiffSession) {
        let blob = match self.backend.blob_at(commit_id, path) {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                tracing::debug!(commit = commit_id, path, "no blob at path");
                return;
            }
            Err(e) => {
                tracing::warn!(commit = commit_id, path, error = %e, "could not read blob");
                return;
            }
        };

        let parsed = self.parser.parse(&blob);
        session.record_source_file(&parsed.package);
        for &line in lines {
            session.record_method_change(&parsed.package, locator::locate(&parsed.methods, line));
        }
    }
}

/// The commits relevant to `base..new`, newest first.
///
/// Everything reachable from the base is rejected except the base itself and
/// its immediate predecessor, so the base's own change is measured too. The
/// rest of the new commit's ancestry is kept in walk order without repeats.
pub fn accepted_window(base_id: &str, base_plot: &[Commit], new_plot: &[Commit]) -> Vec<Commit> {
    let mut rejected: HashSet<String> =
        base_plot.iter().filter(|c| !c.has_id(base_id)).map(|c| c.id.to_ascii_lowercase()).collect();
    if let Some(predecessor) = base_plot.get(1) {
        rejected.remove(&predecessor.id.to_ascii_lowercase());
    }

    let mut seen = HashSet::new();
    new_plot
        .iter()
        .filter(|c| {
            let id = c.id.to_ascii_lowercase();
            !rejected.contains(&id) && seen.insert(id)
        })
        .cloned()
        .collect()
}

/// Adjacent index pairs `(i, i + 1)` stepping by two, once from 0 and once
/// from 1, so every interior commit is diffed in both roles.
pub fn pair_indices(len: usize) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for offset in [0, 1] {
        let mut i = offset;
        while i + 1 < len {
            pairs.push((i, i + 1));
            i += 2;
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChangedPath, LineRange, MethodDeclaration, ParsedSource, RepositoryIdentity};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::cell::RefCell;
    use std::collections::{BTreeSet, HashMap};

    /// Linear history held in memory; diffs and blobs are canned.
    #[derive(Default)]
    struct MemoryBackend {
        /// Oldest first
        commits: Vec<Commit>,
        diffs: HashMap<(String, String), Vec<FileDiff>>,
        blobs: HashMap<(String, String), String>,
        broken_blobs: HashSet<(String, String)>,
        diff_calls: RefCell<Vec<(String, String)>>,
        count_calls: RefCell<Vec<(String, String)>>,
        blob_calls: RefCell<Vec<(String, String)>>,
    }

    impl MemoryBackend {
        fn linear(ids: &[&str]) -> Self {
            let mut commits: Vec<Commit> = Vec::new();
            for (i, id) in ids.iter().enumerate() {
                let parents = commits.last().map(|p| vec![p.id.clone()]).unwrap_or_default();
                commits.push(Commit { id: id.to_string(), message: format!("commit {id}"), timestamp: 1_000 + i as i64, parents });
            }
            Self { commits, ..Self::default() }
        }

        fn diff(mut self, old: &str, new: &str, files: Vec<FileDiff>) -> Self {
            self.diffs.insert((old.to_string(), new.to_string()), files);
            self
        }

        fn blob(mut self, commit: &str, path: &str, text: &str) -> Self {
            self.blobs.insert((commit.to_string(), path.to_string()), text.to_string());
            self
        }

        fn broken_blob(mut self, commit: &str, path: &str) -> Self {
            self.broken_blobs.insert((commit.to_string(), path.to_string()));
            self
        }

        fn pair_calls(&self) -> BTreeSet<(String, String)> {
            self.diff_calls.borrow().iter().cloned().collect()
        }
    }

    impl RepositoryBackend for MemoryBackend {
        fn full_commit_log(&self) -> Result<Vec<Commit>> {
            Ok(self.commits.clone())
        }

        fn resolve(&self, id: &str) -> Result<Option<Commit>> {
            Ok(self.commits.iter().find(|c| c.has_id(id)).cloned())
        }

        fn changed_path_count(&self, old_id: &str, new_id: &str) -> Result<usize> {
            self.count_calls.borrow_mut().push((old_id.to_string(), new_id.to_string()));
            Ok(self.diffs.get(&(old_id.to_string(), new_id.to_string())).map_or(0, Vec::len))
        }

        fn tree_diff(&self, old_id: &str, new_id: &str, context_lines: u32, _detect_renames: bool) -> Result<Vec<FileDiff>> {
            assert_eq!(context_lines, PAIR_CONTEXT_LINES, "pair diffs carry no context");
            self.diff_calls.borrow_mut().push((old_id.to_string(), new_id.to_string()));
            Ok(self.diffs.get(&(old_id.to_string(), new_id.to_string())).cloned().unwrap_or_default())
        }

        fn blob_at(&self, commit_id: &str, path: &str) -> Result<Option<String>> {
            let key = (commit_id.to_string(), path.to_string());
            self.blob_calls.borrow_mut().push(key.clone());
            if self.broken_blobs.contains(&key) {
                return Err(DiffError::Git(git2::Error::from_str("corrupt object")));
            }
            Ok(self.blobs.get(&key).cloned())
        }

        fn ancestry_from(&self, commit_id: &str) -> Result<Vec<Commit>> {
            let end = self.commits.iter().position(|c| c.has_id(commit_id)).map_or(0, |i| i + 1);
            Ok(self.commits[..end].iter().rev().cloned().collect())
        }

        fn identity(&self) -> RepositoryIdentity {
            RepositoryIdentity { name: "memory".to_string(), ..RepositoryIdentity::default() }
        }
    }

    /// Reads `package <name>` then `<signature> <start> <length>` lines.
    struct StubParser;

    impl SourceParser for StubParser {
        fn parse(&self, source: &str) -> ParsedSource {
            let mut parsed = ParsedSource::default();
            for line in source.lines() {
                if let Some(package) = line.strip_prefix("package ") {
                    parsed.package = package.to_string();
                    continue;
                }
                let parts: Vec<&str> = line.split_whitespace().collect();
                if let [signature, start, length] = parts[..] {
                    if let (Ok(start), Ok(length)) = (start.parse(), length.parse()) {
                        parsed.methods.push(MethodDeclaration {
                            signature: signature.to_string(),
                            range: LineRange::new(start, length),
                        });
                    }
                }
            }
            parsed
        }
    }

    fn changed(path: &str, kind: ChangeKind, patch: &str) -> FileDiff {
        FileDiff {
            change: ChangedPath { old_path: Some(path.to_string()), new_path: Some(path.to_string()), kind },
            patch: Some(patch.to_string()),
        }
    }

    fn methods(session: &DiffSession, package: &str) -> Vec<String> {
        session.methods(package).map(|m| m.iter().cloned().collect()).unwrap_or_default()
    }

    fn run(backend: &MemoryBackend, base: &str, new: &str) -> Result<DiffSession> {
        let classifier = PathClassifier::default();
        PairwiseDiffAttributor::new(backend, &StubParser, &classifier).run(base, new)
    }

    #[rstest]
    #[case(0, vec![])]
    #[case(1, vec![])]
    #[case(2, vec![(0, 1)])]
    #[case(3, vec![(0, 1), (1, 2)])]
    #[case(5, vec![(0, 1), (2, 3), (1, 2), (3, 4)])]
    fn pairs_cover_every_adjacent_pair_once(#[case] len: usize, #[case] expected: Vec<(usize, usize)>) {
        assert_eq!(pair_indices(len), expected);
    }

    #[test]
    fn window_keeps_base_and_its_predecessor() {
        let backend = MemoryBackend::linear(&["o", "p", "a", "b", "c"]);
        let base_plot = backend.ancestry_from("a").expect("ancestry");
        let new_plot = backend.ancestry_from("c").expect("ancestry");

        let window: Vec<String> = accepted_window("a", &base_plot, &new_plot).into_iter().map(|c| c.id).collect();
        assert_eq!(window, vec!["c", "b", "a", "p"]);
    }

    #[test]
    fn window_for_a_root_base_is_the_whole_new_ancestry() {
        let backend = MemoryBackend::linear(&["a", "b"]);
        let base_plot = backend.ancestry_from("a").expect("ancestry");
        let new_plot = backend.ancestry_from("b").expect("ancestry");

        let window: Vec<String> = accepted_window("a", &base_plot, &new_plot).into_iter().map(|c| c.id).collect();
        assert_eq!(window, vec!["b", "a"]);
    }

    #[test]
    fn methods_from_every_commit_in_the_range_are_collected() {
        let backend = MemoryBackend::linear(&["a", "b", "c"])
            .diff("a", "b", vec![changed("src/p/Foo.java", ChangeKind::Modified, "@@ -3 +3 @@\n-x\n+y\n")])
            .diff("b", "c", vec![changed("src/p/Foo.java", ChangeKind::Modified, "@@ -6,0 +7,2 @@\n+a\n+b\n")])
            .diff("a", "c", vec![changed("src/p/Foo.java", ChangeKind::Modified, "")])
            .blob("a", "src/p/Foo.java", "package p\nfoo() 2 3\n")
            .blob("b", "src/p/Foo.java", "package p\nfoo() 2 3\n")
            .blob("c", "src/p/Foo.java", "package p\nfoo() 2 3\nbar() 7 2\n");

        let session = run(&backend, "a", "c").expect("run");

        assert_eq!(methods(&session, "p"), vec!["bar()", "foo()"]);
        assert_eq!(session.delta_count(), 1);
        assert_eq!(*backend.count_calls.borrow(), vec![("a".to_string(), "c".to_string())]);
        assert_eq!(
            backend.pair_calls(),
            BTreeSet::from([("a".to_string(), "b".to_string()), ("b".to_string(), "c".to_string())])
        );
    }

    #[test]
    fn base_commit_change_is_measured_against_its_parent() {
        let backend = MemoryBackend::linear(&["p", "a", "b"])
            .diff("p", "a", vec![changed("Foo.java", ChangeKind::Modified, "@@ -2 +2 @@\n")])
            .blob("p", "Foo.java", "package q\nearly() 1 4\n")
            .blob("a", "Foo.java", "package q\nearly() 1 4\n");

        let session = run(&backend, "a", "b").expect("run");

        assert_eq!(methods(&session, "q"), vec!["early()"]);
        assert_eq!(
            backend.pair_calls(),
            BTreeSet::from([("p".to_string(), "a".to_string()), ("a".to_string(), "b".to_string())])
        );
    }

    #[test]
    fn query_scripts_are_listed_and_never_parsed() {
        let backend = MemoryBackend::linear(&["a", "b"])
            .diff(
                "a",
                "b",
                vec![
                    changed("db/schema.sql", ChangeKind::Modified, "@@ -1,3 +1,3 @@\n"),
                    changed("web/index.JSP", ChangeKind::Added, "@@ -0,0 +1,2 @@\n"),
                    changed("README.md", ChangeKind::Modified, "@@ -1 +1 @@\n"),
                    FileDiff {
                        change: ChangedPath { old_path: Some("web/old.jsp".to_string()), new_path: None, kind: ChangeKind::Deleted },
                        patch: Some("@@ -1,2 +0,0 @@\n".to_string()),
                    },
                ],
            )
            .blob("a", "db/schema.sql", "package p\nfoo() 1 9\n")
            .blob("b", "db/schema.sql", "package p\nfoo() 1 9\n");

        let session = run(&backend, "a", "b").expect("run");

        let queries: Vec<_> = session.auxiliary_files(FileCategory::QueryScript).into_iter().flatten().collect();
        let markup: Vec<_> = session.auxiliary_files(FileCategory::Markup).into_iter().flatten().collect();
        assert_eq!(queries, vec!["db/schema.sql"]);
        assert_eq!(markup, vec!["web/index.JSP", "web/old.jsp"]);
        assert_eq!(session.packages().count(), 0);
        assert!(backend.blob_calls.borrow().is_empty());
    }

    #[test]
    fn added_and_deleted_files_read_only_their_live_side() {
        let backend = MemoryBackend::linear(&["a", "b"])
            .diff(
                "a",
                "b",
                vec![
                    changed("New.java", ChangeKind::Added, "@@ -0,0 +1,3 @@\n"),
                    changed("Old.java", ChangeKind::Deleted, "@@ -1,3 +0,0 @@\n"),
                    changed("Moved.java", ChangeKind::Renamed, "@@ -1 +1 @@\n"),
                ],
            )
            .blob("b", "New.java", "package n\ncreate() 1 2\n")
            .blob("a", "Old.java", "package o\nremove() 1 2\n");

        let session = run(&backend, "a", "b").expect("run");

        assert_eq!(methods(&session, "n"), vec!["create()"]);
        assert_eq!(methods(&session, "o"), vec!["remove()"]);
        assert_eq!(
            *backend.blob_calls.borrow(),
            vec![("b".to_string(), "New.java".to_string()), ("a".to_string(), "Old.java".to_string())]
        );
    }

    #[test]
    fn changes_outside_methods_register_the_package_only() {
        let backend = MemoryBackend::linear(&["a", "b"])
            .diff("a", "b", vec![changed("Foo.java", ChangeKind::Modified, "@@ -1 +1 @@\n")])
            .blob("a", "Foo.java", "package p\nfoo() 5 3\n")
            .blob("b", "Foo.java", "package p\nfoo() 5 3\n");

        let session = run(&backend, "a", "b").expect("run");

        assert_eq!(session.packages().collect::<Vec<_>>(), vec!["p"]);
        assert!(methods(&session, "p").is_empty());
    }

    #[test]
    fn unreadable_blobs_skip_only_that_side() {
        let backend = MemoryBackend::linear(&["a", "b"])
            .diff(
                "a",
                "b",
                vec![
                    changed("Broken.java", ChangeKind::Modified, "@@ -1 +1 @@\n"),
                    changed("Fine.java", ChangeKind::Modified, "@@ -2 +2 @@\n"),
                ],
            )
            .broken_blob("a", "Broken.java")
            .blob("b", "Broken.java", "package x\nfixed() 1 1\n")
            .blob("a", "Fine.java", "package y\nok() 1 3\n")
            .blob("b", "Fine.java", "package y\nok() 1 3\n");

        let session = run(&backend, "a", "b").expect("run");

        assert_eq!(methods(&session, "x"), vec!["fixed()"]);
        assert_eq!(methods(&session, "y"), vec!["ok()"]);
    }

    #[test]
    fn missing_patch_text_skips_attribution() {
        let mut file = changed("Foo.java", ChangeKind::Modified, "");
        file.patch = None;
        let backend = MemoryBackend::linear(&["a", "b"]).diff("a", "b", vec![file]).blob("a", "Foo.java", "package p\n");

        let session = run(&backend, "a", "b").expect("run");

        assert_eq!(session.packages().count(), 0);
        assert!(backend.blob_calls.borrow().is_empty());
    }

    #[test]
    fn unresolvable_endpoint_aborts_the_run() {
        let backend = MemoryBackend::linear(&["a", "b"]);

        let err = run(&backend, "a", "zzz").err().expect("unresolved endpoint");
        assert!(matches!(err, DiffError::UnresolvedCommit(ref id) if id == "zzz"));
        assert!(backend.diff_calls.borrow().is_empty());
    }
}
