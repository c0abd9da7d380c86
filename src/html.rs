//! String transforms applied to message bodies before rendering

use regex::Regex;

static WRAPPER_TAG_REGEX: std::sync::LazyLock<Regex> =
    std::sync::LazyLock::new(|| Regex::new(r"(?i)</?(?:html|head|body)\b[^>]*>").unwrap());

static PAGE_BLOCK_REGEX: std::sync::LazyLock<Regex> =
    std::sync::LazyLock::new(|| Regex::new(r"(?is)@page\b[^{]*\{[^}]*\}").unwrap());

static PAGE_DECLARATION_REGEX: std::sync::LazyLock<Regex> =
    std::sync::LazyLock::new(|| Regex::new(r"(?i)\bpage\s*:\s*[^;{]+;").unwrap());

/// Escape text for use in HTML content and quoted attributes
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Remove the outer `<html>`, `<head>` and `<body>` tags, keeping what they
/// wrap
#[must_use]
pub fn strip_wrapper_tags(html: &str) -> String {
    WRAPPER_TAG_REGEX.replace_all(html, "").trim().to_string()
}

/// Remove `@page { ... }` blocks and `page: ...;` declarations
#[must_use]
pub fn remove_page_rules(html: &str) -> String {
    let without_blocks = PAGE_BLOCK_REGEX.replace_all(html, "");
    PAGE_DECLARATION_REGEX
        .replace_all(&without_blocks, "")
        .into_owned()
}

/// Point every `cid:<name>` reference at `uri`
#[must_use]
pub fn replace_cid(html: &str, name: &str, uri: &str) -> String {
    html.replace(&format!("cid:{name}"), uri)
}
