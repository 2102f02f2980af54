/// Escapes HTML in free-text bodies before they are stored. Existing
/// entities are decoded first so text that arrives partially escaped does
/// not end up double-escaped.
pub fn escape_body(input: &str) -> String {
    let decoded = html_escape::decode_html_entities(input);
    html_escape::encode_text(&decoded).to_string()
}

/// Strips all HTML tags from input (for names, titles, links, and other
/// single-line display fields).
pub fn strip_all_html(input: &str) -> String {
    use std::collections::HashSet;
    ammonia::Builder::new()
        .tags(HashSet::new())
        .clean(input)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_escaping_neutralizes_markup() {
        let escaped = escape_body("I felt <script>alert('better')</script> after a term of sessions");
        assert!(!escaped.contains("<script>"));
        assert!(escaped.contains("&lt;script&gt;"));
    }

    #[test]
    fn body_escaping_does_not_double_escape() {
        assert_eq!(escape_body("tea &amp; biscuits"), "tea &amp; biscuits");
    }

    #[test]
    fn strip_all_html_leaves_plain_text() {
        assert_eq!(strip_all_html("Dr. <b>Imani</b> Okafor"), "Dr. Imani Okafor");
        assert_eq!(strip_all_html("plain text"), "plain text");
    }
}
