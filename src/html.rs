//! Lightweight HTML → plain text reduction for fetched pages.
//!
//! This is a tag stripper, not a parser: script and style bodies are dropped,
//! closing block-level tags become line breaks, list items become `- ` bullets,
//! every other tag becomes a space, and runs of blank lines and horizontal
//! whitespace are collapsed.

use regex::Regex;
use std::sync::LazyLock;

static SCRIPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b.*?</script\s*>").unwrap());
static STYLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b.*?</style\s*>").unwrap());
static BLOCK_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</(p|div|h[1-6]|li|br|section|article|header|footer)>").unwrap()
});
static LIST_ITEM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<li>").unwrap());
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());
static SPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]{2,}").unwrap());

pub fn html_to_text(html: &str) -> String {
    let text = SCRIPT.replace_all(html, " ");
    let text = STYLE.replace_all(&text, " ");
    let text = BLOCK_END.replace_all(&text, "\n");
    let text = LIST_ITEM.replace_all(&text, "- ");
    let text = ANY_TAG.replace_all(&text, " ");
    let text = BLANK_RUN.replace_all(&text, "\n\n");
    let text = SPACE_RUN.replace_all(&text, " ");
    text.trim().to_string()
}

/// First `max_chars` characters of `text`, on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_script_and_style_bodies() {
        let html = "<html><head><style>body{color:red}</style>\
                    <script type=\"text/javascript\">var x = '<p>';</script></head>\
                    <body><p>Visible</p></body></html>";
        assert_eq!(html_to_text(html), "Visible");
    }

    #[test]
    fn block_tags_break_lines_and_list_items_become_bullets() {
        let html = "<h1>Title</h1><ul><li>one</li><li>two</li></ul><p>End</p>";
        let text = html_to_text(html);
        assert!(text.starts_with("Title\n"));
        assert!(text.contains("- one"));
        assert!(text.contains("- two"));
        assert!(text.ends_with("End"));
    }

    #[test]
    fn collapses_whitespace_runs() {
        let html = "<div>a</div>\n\n\n\n<div>b     c</div>";
        assert_eq!(html_to_text(html), "a\n\n b c");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }
}
