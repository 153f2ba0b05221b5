// src/wrap.rs

/// Greedy word wrap at `width` characters.
///
/// Words are separated by any whitespace and rejoined with single spaces.
/// A word longer than `width` is split into hyphenated pieces; its last piece
/// starts the next line.
pub fn wrap_words(text: &str, width: usize) -> Vec<String> {
    let width = width.max(2);
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        let mut word = word.to_string();

        if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut line));
        }

        while word.chars().count() > width {
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            let head: String = word.chars().take(width - 1).collect();
            let tail: String = word.chars().skip(width - 1).collect();
            lines.push(format!("{head}-"));
            word = tail;
        }

        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(&word);
    }

    if !line.is_empty() {
        lines.push(line);
    }

    lines
}
