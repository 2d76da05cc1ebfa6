//! Small text helpers shared by the models and the logger.

use regex::Regex;
use std::sync::LazyLock;

static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    // CSI sequences (colors, cursor moves) and OSC sequences (hyperlinks, titles).
    Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|\x1b[@-Z\\-_]")
        .expect("ANSI escape pattern is valid")
});

/// Removes ANSI escape sequences from `input`.
///
/// # Examples
///
/// ```
/// use shared::text::strip_ansi;
///
/// assert_eq!(strip_ansi("\u{1b}[32mok\u{1b}[39m"), "ok");
/// ```
#[must_use]
pub fn strip_ansi(input: &str) -> String {
    if !input.contains('\u{1b}') {
        return input.to_string();
    }
    ANSI_ESCAPE.replace_all(input, "").into_owned()
}

/// Cuts `input` to at most `max_chars` characters, on a char boundary.
#[must_use]
pub fn truncate_chars(input: &str, max_chars: usize) -> &str {
    match input.char_indices().nth(max_chars) {
        Some((idx, _)) => &input[..idx],
        None => input,
    }
}

/// Truncates or right-pads `input` with spaces to exactly `width` characters.
#[must_use]
pub fn fixed_width(input: &str, width: usize) -> String {
    let cut = truncate_chars(input, width);
    format!("{cut:<width$}")
}
