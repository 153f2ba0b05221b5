// src/classify.rs

/// What a changed path contributes to the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FileCategory {
    /// Listed in the markup section, never attributed to methods
    Markup,
    /// Listed in the query script section, never attributed to methods
    QueryScript,
    /// Parsed and attributed to enclosing methods
    Source,
}

/// Routes paths to a category by extension. Paths matching none are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathClassifier {
    pub markup: Vec<String>,
    pub query: Vec<String>,
    pub source: Vec<String>,
}

impl Default for PathClassifier {
    fn default() -> Self {
        Self { markup: vec!["jsp".to_string()], query: vec!["sql".to_string()], source: vec!["java".to_string()] }
    }
}

impl PathClassifier {
    pub fn new(markup: Vec<String>, query: Vec<String>, source: Vec<String>) -> Self {
        let normalize = |exts: Vec<String>| -> Vec<String> {
            exts.into_iter()
                .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect()
        };
        Self { markup: normalize(markup), query: normalize(query), source: normalize(source) }
    }

    pub fn classify(&self, path: &str) -> Option<FileCategory> {
        let path = path.trim_end().to_ascii_lowercase();
        let matches = |exts: &[String]| exts.iter().any(|ext| has_extension(&path, ext));

        if matches(&self.markup) {
            Some(FileCategory::Markup)
        } else if matches(&self.query) {
            Some(FileCategory::QueryScript)
        } else if matches(&self.source) {
            Some(FileCategory::Source)
        } else {
            None
        }
    }
}

fn has_extension(path: &str, ext: &str) -> bool {
    path.strip_suffix(ext)
        .and_then(|rest| rest.strip_suffix('.'))
        .is_some_and(|stem| !stem.is_empty() && !stem.ends_with('/'))
}
