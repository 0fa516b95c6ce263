//! File-format-specific text extraction.
//!
//! The rest of the crate only sees `loader(path) -> raw text`; unknown
//! extensions fail with [`RagError::UnsupportedFormat`]. Markdown is reduced
//! to plain text with a small regex pass, HTML through `scraper` after the
//! script and style blocks are cut out.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;
use tokio::fs;

use crate::types::RagError;

/// Extensions the loader understands (lowercase, no dot).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["md", "txt", "html"];

/// Reads `path` and converts its contents to plain text.
pub async fn load_text(path: &Path) -> Result<String, RagError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "txt" => Ok(fs::read_to_string(path).await?),
        "md" => {
            let markdown = fs::read_to_string(path).await?;
            Ok(strip_markdown(&markdown))
        }
        "html" => {
            let html = fs::read_to_string(path).await?;
            Ok(strip_html(&html))
        }
        other => Err(RagError::UnsupportedFormat(format!(".{other}"))),
    }
}

static MD_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[.*?\]\(.*?\)").expect("static regex"));
static MD_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(.*?)\]\(.*?\)").expect("static regex"));
static MD_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,6}\s*").expect("static regex"));
static MD_BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("static regex"));
static MD_ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*(.*?)\*").expect("static regex"));
static MD_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`{1,3}[^`]*`{1,3}").expect("static regex"));
static MD_LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*[-*+]\s+").expect("static regex"));
static MD_NUMBERED_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\d+\.\s+").expect("static regex"));

/// Strips basic markdown syntax, leaving running text.
fn strip_markdown(markdown: &str) -> String {
    let text = MD_IMAGE.replace_all(markdown, "");
    let text = MD_LINK.replace_all(&text, "$1");
    let text = MD_HEADER.replace_all(&text, "");
    let text = MD_BOLD.replace_all(&text, "$1");
    let text = MD_ITALIC.replace_all(&text, "$1");
    let text = MD_CODE.replace_all(&text, "");
    let text = MD_LIST_MARKER.replace_all(&text, "");
    let text = MD_NUMBERED_MARKER.replace_all(&text, "");
    text.trim().to_string()
}

static HTML_SCRIPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b.*?</script>").expect("static regex"));
static HTML_STYLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b.*?</style>").expect("static regex"));
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

/// Strips markup from an HTML document, leaving collapsed running text.
fn strip_html(html: &str) -> String {
    let without_script = HTML_SCRIPT.replace_all(html, " ");
    let without_style = HTML_STYLE.replace_all(&without_script, " ");
    let document = Html::parse_document(&without_style);
    let text: String = document
        .root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ");
    WHITESPACE_RUN.replace_all(&text, " ").trim().to_string()
}
