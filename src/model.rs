// src/model.rs

/// A commit as the engine sees it. Ids are full lowercase hex strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub id: String,
    /// First line of the commit message
    pub message: String,
    /// Commit time, seconds since the epoch
    pub timestamp: i64,
    pub parents: Vec<String>,
}

impl Commit {
    /// Case-insensitive id comparison
    pub fn has_id(&self, id: &str) -> bool {
        self.id.eq_ignore_ascii_case(id)
    }

    pub fn summary(&self) -> CommitSummary {
        CommitSummary { id: self.id.clone(), message: self.message.clone() }
    }
}

/// The (id, message) pair offered to commit pickers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSummary {
    pub id: String,
    pub message: String,
}

impl CommitSummary {
    /// `abcde.....message`, the way pickers list commits
    pub fn label(&self) -> String {
        let short = self.id.get(..5).unwrap_or(&self.id);
        format!("{}.....{}", short, self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Deleted,
    Modified,
    /// Never produced while rename detection is off
    Renamed,
    Other,
}

/// One file-level change between two trees
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedPath {
    pub old_path: Option<String>,
    pub new_path: Option<String>,
    pub kind: ChangeKind,
}

impl ChangedPath {
    /// The path that exists after the change, or the removed path for deletions
    pub fn live_path(&self) -> Option<&str> {
        match self.kind {
            ChangeKind::Deleted => self.old_path.as_deref().or(self.new_path.as_deref()),
            _ => self.new_path.as_deref().or(self.old_path.as_deref()),
        }
    }
}

/// A changed path plus its unified patch text. `patch` is `None` when the
/// backend could not format the patch for this path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub change: ChangedPath,
    pub patch: Option<String>,
}

/// A 1-based start line and a length. Contains `start..=start + length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub start: usize,
    pub length: usize,
}

impl LineRange {
    pub fn new(start: usize, length: usize) -> Self {
        Self { start, length }
    }

    /// Last covered line, saturating at `usize::MAX`
    pub fn end(&self) -> usize {
        self.start.saturating_add(self.length)
    }

    pub fn contains(&self, line: usize) -> bool {
        self.start <= line && line <= self.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDeclaration {
    pub signature: String,
    pub range: LineRange,
}

/// Output of a source parser for one blob
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSource {
    /// Grouping key for the report; empty when nothing was recognised
    pub package: String,
    /// In declaration order
    pub methods: Vec<MethodDeclaration>,
}

/// Who and where the report is about
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryIdentity {
    pub name: String,
    pub user_name: String,
    pub user_email: String,
}
