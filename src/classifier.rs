/// Prefixes that mark a trimmed line as a comment. Checked with `starts_with`
/// only; there is no memory of an open block comment between lines.
const COMMENT_MARKERS: [&str; 8] = ["///", "//", "/*", "*/", "-->", "<!--", "#", "*"];

/// Returns true when the line is neither blank nor starts with a comment marker.
pub fn is_code_line(raw_line: &str) -> bool {
    let line = raw_line.trim();
    if line.is_empty() {
        return false;
    }
    !COMMENT_MARKERS
        .iter()
        .any(|marker| line.starts_with(marker))
}
