//! Small helpers for writing OLX markup.

/// Escapes `&`, `<`, `>` and `"` for use in XML text or attribute values.
///
/// # Example
///
/// ```rust
/// use coursegen_olx::escape_xml;
///
/// assert_eq!(escape_xml("a < b & c"), "a &lt; b &amp; c");
/// ```
#[must_use]
pub fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escapes a value for a double-quoted attribute on a single line.
pub(crate) fn escape_attr(value: &str) -> String {
    escape_xml(value).replace(['\n', '\r'], " ")
}
