//! Whitespace canonicalization for comparing migration SQL.

/// Canonical comparison form of `query`.
///
/// Tabs and newlines become single spaces, then leading and trailing spaces,
/// tabs, newlines, and carriage returns are trimmed. Runs of spaces inside
/// the text are left alone, so only tab and line-break layout is ignored.
pub fn normalize_query(query: &str) -> String {
    query
        .replace(['\t', '\n'], " ")
        .trim_matches([' ', '\t', '\n', '\r'])
        .to_string()
}
