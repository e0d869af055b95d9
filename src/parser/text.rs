use std::sync::LazyLock;

use percent_encoding::percent_decode_str;
use regex::Regex;

static CITATION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\d+\]").unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static UNSAFE_FILE_CHARS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\-\.]").unwrap());

/// Strip citation markers like `[1]`, collapse whitespace and fix doubled quotes.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let text = CITATION_RE.replace_all(text, "");
    let text = WHITESPACE_RE.replace_all(&text, " ");
    text.trim().replace("''", "\"")
}

/// Identifier for a detail page: `.../Mr._Mime_(Pok%C3%A9mon)` becomes `mr._mime`.
pub fn normalize_name(url: &str) -> String {
    let last = url.trim_end_matches('/').rsplit('/').next().unwrap_or(url);
    let page = last.split('(').next().unwrap_or(last);
    let decoded = percent_decode_str(page).decode_utf8_lossy();
    decoded.trim_end_matches('_').to_lowercase().replace(' ', "-")
}

pub fn sanitize_file_stem(name: &str) -> String {
    UNSAFE_FILE_CHARS_RE.replace_all(name, "_").into_owned()
}

/// Make an `img src` absolute: protocol-relative gets `https:`, site-relative gets `base_url`.
pub fn resolve_url(src: &str, base_url: &str) -> String {
    if src.starts_with("//") {
        format!("https:{}", src)
    } else if src.starts_with("http") {
        src.to_string()
    } else {
        format!("{}{}", base_url, src)
    }
}
