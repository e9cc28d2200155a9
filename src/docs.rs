//! Markdown/HTML description cleaning.
//!
//! Spec descriptions arrive as Markdown with embedded HTML anchors. CLI help
//! text is plain text, so everything that is markup gets stripped while the
//! inner text survives.

use once_cell::sync::Lazy;
use regex::Regex;

static HTML_TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?[a-zA-Z][^>]*>").expect("html tag regex should be valid"));

static MARKDOWN_LINK_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("link regex should be valid"));

/// Strip Markdown and HTML markup from a spec description.
///
/// Keeps link and tag inner text, drops `**` emphasis markers and inline
/// code backticks. Plain text (including literal underscores) is untouched.
pub fn clean(description: &str) -> anyhow::Result<String> {
    let text = MARKDOWN_LINK_REGEX.replace_all(description, "$1");
    let text = HTML_TAG_REGEX.replace_all(&text, "");
    let text = text.replace("**", "").replace('`', "");
    Ok(text)
}
