// src/resolver.rs

use crate::model::{Commit, CommitSummary};

/// Commits from `anchor` (inclusive) to the end of `log`, in `log`'s order.
///
/// With no anchor the whole log is returned. Inclusion starts at the first
/// commit whose id matches the anchor case-insensitively and never stops after
/// that; an anchor missing from the log yields an empty list.
pub fn list_from(anchor: Option<&str>, log: &[Commit]) -> Vec<CommitSummary> {
    let start = match anchor {
        None => 0,
        Some(anchor) => match log.iter().position(|commit| commit.has_id(anchor)) {
            Some(index) => index,
            None => return Vec::new(),
        },
    };

    log[start..].iter().map(Commit::summary).collect()
}

/// Every commit that can be picked as the base of a diff.
pub fn visible_base_commits(log: &[Commit]) -> Vec<CommitSummary> {
    list_from(None, log)
}

/// The commits that can be picked as "new" once the base at `base_index` of
/// `visible_base_commits` is chosen: the ones after it, excluding the base.
pub fn visible_new_commits(log: &[Commit], base_index: usize) -> Vec<CommitSummary> {
    let bases = visible_base_commits(log);
    match bases.get(base_index) {
        Some(base) => list_from(Some(&base.id), log).into_iter().skip(1).collect(),
        None => Vec::new(),
    }
}
