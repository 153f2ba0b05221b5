// src/error.rs

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    #[error("invalid repository path {}: {source}", path.display())]
    OpenRepository {
        path: PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error("no repository has been selected")]
    NoRepository,

    #[error("commit {0} could not be resolved")]
    UnresolvedCommit(String),

    #[error(transparent)]
    Git(#[from] git2::Error),
}

pub type Result<T, E = DiffError> = std::result::Result<T, E>;
