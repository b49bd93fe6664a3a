//! Manual HTML sanitization for bill text. GPO documents are served as
//! either `<pre>`-dominant HTML or loosely structured markup; both get
//! reduced to a small safe subset (`<pre>`, `<p>`, `<br />`) with all
//! original tags stripped and text re-escaped.

use std::sync::LazyLock;

use regex::Regex;

static BODY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<body[^>]*>(.*?)</body>").expect("valid regex"));
static PRE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<pre[^>]*>(.*?)</pre>").expect("valid regex"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static BR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?\s*>").expect("valid regex"));
static BLOCK_CLOSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</(p|div|section|article|li|h[1-6]|tr)>").expect("valid regex")
});
static BLOCK_OPEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<(p|div|section|article|li|h[1-6]|tr)[^>]*>").expect("valid regex")
});
static DANGEROUS_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ["script", "style", "noscript", "iframe", "object", "embed"]
        .iter()
        .map(|tag| Regex::new(&format!(r"(?is)<{tag}.*?</{tag}>")).expect("valid regex"))
        .collect()
});
static EXCESS_NEWLINES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));
static PARAGRAPH_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{2,}").expect("valid regex"));
static ENTITY_RES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        ("&nbsp;", " "),
        ("&amp;", "&"),
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&quot;", "\""),
        ("&#39;", "'"),
    ]
    .iter()
    .map(|(entity, replacement)| {
        (
            Regex::new(&format!("(?i){}", regex::escape(entity))).expect("valid regex"),
            *replacement,
        )
    })
    .collect()
});

pub fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

pub fn decode_entities(value: &str) -> String {
    let mut out = value.to_string();
    for (entity, replacement) in ENTITY_RES.iter() {
        out = entity.replace_all(&out, *replacement).into_owned();
    }
    out
}

/// The `<body>` contents, or the whole document when no body tag exists.
pub fn extract_body(html: &str) -> &str {
    match BODY_RE.captures(html) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(html),
        None => html,
    }
}

fn strip_dangerous(html: &str) -> String {
    let mut out = html.to_string();
    for re in DANGEROUS_RES.iter() {
        out = re.replace_all(&out, "").into_owned();
    }
    out
}

/// Reduce arbitrary HTML to safe paragraph markup. A `<pre>` block, when
/// present, dominates the document: its text is extracted whole and kept
/// preformatted.
pub fn html_to_paragraphs(html: &str) -> String {
    if let Some(caps) = PRE_RE.captures(html) {
        let inner = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let cleaned = decode_entities(&TAG_RE.replace_all(inner, ""));
        return format!("<pre>{}</pre>", escape_html(cleaned.trim()));
    }

    let without_dangerous = strip_dangerous(html);
    let with_breaks = BR_RE.replace_all(&without_dangerous, "\n");
    let with_breaks = BLOCK_CLOSE_RE.replace_all(&with_breaks, "</$1>\n\n");
    let with_breaks = BLOCK_OPEN_RE.replace_all(&with_breaks, "\n\n");

    let stripped = TAG_RE.replace_all(&with_breaks, "");
    let normalized = EXCESS_NEWLINES_RE
        .replace_all(&decode_entities(&stripped), "\n\n")
        .trim()
        .to_string();
    if normalized.is_empty() {
        return String::new();
    }

    PARAGRAPH_SPLIT_RE
        .split(&normalized)
        .map(|paragraph| format!("<p>{}</p>", escape_html(paragraph).replace('\n', "<br />")))
        .collect()
}

/// Wrap plain text in a `<pre>` block, normalizing CRLF line endings.
pub fn plain_text_to_html(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n");
    let trimmed = normalized.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    format!("<pre>{}</pre>", escape_html(trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pre_block_dominates_the_document() {
        let html = r#"<html><body><div>nav</div><pre>SECTION 1. <b>SHORT TITLE</b>.
This Act may be cited as the &quot;Example Act&quot;.</pre><footer>x</footer></body></html>"#;
        let out = html_to_paragraphs(extract_body(html));
        assert!(out.starts_with("<pre>"));
        assert!(out.ends_with("</pre>"));
        assert!(out.contains("SECTION 1. SHORT TITLE."));
        assert!(out.contains("&quot;Example Act&quot;"));
        assert!(!out.contains("<b>"));
        assert!(!out.contains("nav"));
    }

    #[test]
    fn scripts_and_styles_are_removed() {
        let html = r#"<div>Keep me</div><script>alert("x")</script><style>.a{}</style><iframe src="x"></iframe>"#;
        let out = html_to_paragraphs(html);
        assert_eq!(out, "<p>Keep me</p>");
    }

    #[test]
    fn block_tags_become_paragraph_breaks() {
        let html = "<p>First clause.</p><p>Second clause.<br>Continued.</p>";
        let out = html_to_paragraphs(html);
        assert_eq!(
            out,
            "<p>First clause.</p><p>Second clause.<br />Continued.</p>"
        );
    }

    #[test]
    fn entities_are_decoded_then_reescaped() {
        let html = "<p>Fish &amp; Wildlife &lt;Act&gt;</p>";
        let out = html_to_paragraphs(html);
        assert_eq!(out, "<p>Fish &amp; Wildlife &lt;Act&gt;</p>");
    }

    #[test]
    fn nbsp_decodes_case_insensitively() {
        assert_eq!(decode_entities("a&nbsp;b&NBSP;c"), "a b c");
    }

    #[test]
    fn plain_text_is_escaped_and_preformatted() {
        let out = plain_text_to_html("SEC. 2. <FINDINGS>\r\nCongress finds that...");
        assert_eq!(
            out,
            "<pre>SEC. 2. &lt;FINDINGS&gt;\nCongress finds that...</pre>"
        );
        assert_eq!(plain_text_to_html("   \r\n  "), "");
    }

    #[test]
    fn empty_markup_yields_empty_output() {
        assert_eq!(html_to_paragraphs("<div></div>"), "");
    }

    #[test]
    fn body_extraction_falls_back_to_whole_document() {
        assert_eq!(extract_body("<p>no body tag</p>"), "<p>no body tag</p>");
        assert_eq!(
            extract_body("<html><body class=\"x\">inner</body></html>"),
            "inner"
        );
    }
}
