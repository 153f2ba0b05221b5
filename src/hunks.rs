// src/hunks.rs

use crate::model::LineRange;
use regex::Regex;
use std::sync::LazyLock;

/// `@@ -<oldStart>[,<oldLen>] +<newStart>[,<newLen>] @@`, shared by both sides.
/// Tokens are captured loosely so malformed numbers can be reported and skipped
/// instead of silently not matching.
static HUNK_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^@@\s+-([^\s,@]*)(?:,([^\s,@]*))?\s+\+([^\s,@]*)(?:,([^\s,@]*))?\s+@@")
        .expect("hardcoded hunk header regex")
});

/// Longer hunks are treated as malformed rather than expanded line by line
const MAX_HUNK_LENGTH: usize = 1 << 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Old,
    New,
}

impl Side {
    /// Capture group indices of (start, length) in `HUNK_HEADER`
    fn groups(self) -> (usize, usize) {
        match self {
            Side::Old => (1, 2),
            Side::New => (3, 4),
        }
    }
}

/// Line numbers covered on the old side across every hunk in `diff_text`.
pub fn old_lines(diff_text: &str) -> Vec<usize> {
    affected_lines(diff_text, Side::Old)
}

/// Line numbers covered on the new side across every hunk in `diff_text`.
pub fn new_lines(diff_text: &str) -> Vec<usize> {
    affected_lines(diff_text, Side::New)
}

/// One pass over the hunk headers in `diff_text`, collecting the lines of `side`.
///
/// A hunk with a length `n > 0` yields `start..=start + n`, one line more than
/// the hunk strictly covers. Attribution tolerates the extra line, so the
/// superset is kept. A missing length means the single line `start`; a zero
/// length or an empty start yields nothing.
pub fn affected_lines(diff_text: &str, side: Side) -> Vec<usize> {
    let (start_group, length_group) = side.groups();
    let mut lines = Vec::new();

    for caps in HUNK_HEADER.captures_iter(diff_text) {
        let start = caps.get(start_group).map_or("", |m| m.as_str());
        let length = caps.get(length_group).map(|m| m.as_str());

        match span(start, length) {
            Ok(Some(range)) => lines.extend(range.start..=range.end()),
            Ok(None) => {}
            Err(token) => {
                tracing::debug!(header = &caps[0], token = %token, ?side, "skipping malformed hunk header");
            }
        }
    }

    lines
}

/// The range described by one side of a hunk header, `Err` holding the
/// offending token when it isn't numeric.
fn span(start: &str, length: Option<&str>) -> Result<Option<LineRange>, String> {
    let Some(start) = number(start)? else {
        return Ok(None);
    };

    match length {
        None => Ok(Some(LineRange::new(start, 0))),
        Some(token) => match number(token)? {
            None | Some(0) => Ok(None),
            Some(length) if length > MAX_HUNK_LENGTH || start.checked_add(length).is_none() => Err(token.to_string()),
            Some(length) => Ok(Some(LineRange::new(start, length))),
        },
    }
}

fn number(token: &str) -> Result<Option<usize>, String> {
    let digits = token.trim().trim_matches(|c| c == '+' || c == '-');
    if digits.is_empty() {
        return Ok(None);
    }
    digits.parse().map(Some).map_err(|_| token.to_string())
}
