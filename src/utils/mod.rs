//! Input helpers for model-generated code.

/// Strip Markdown fences and a leading `python` language tag from a command.
///
/// Leading whitespace and backticks are removed, then an optional
/// case-insensitive `python` tag plus the whitespace after it, then trailing
/// whitespace and backticks.
///
/// # Examples
///
/// ```rust
/// use pyrepl::sanitize_input;
///
/// assert_eq!(sanitize_input("```python\nprint(1)\n```"), "print(1)");
/// ```
pub fn sanitize_input(command: &str) -> String {
    let s = command.trim_start_matches(|c: char| c.is_whitespace() || c == '`');
    let s = strip_prefix_ignore_ascii_case(s, "python").unwrap_or(s);
    s.trim_start()
        .trim_end_matches(|c: char| c.is_whitespace() || c == '`')
        .to_string()
}

fn strip_prefix_ignore_ascii_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}
