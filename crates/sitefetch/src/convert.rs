//! HTML conversion utilities
//!
//! Best-effort, pattern-based rewriting: nested or overlapping tags are not
//! handled exactly. Conversions never fail observably; markdown falls back
//! to plain text and plain text falls back to a character scanner.

use crate::types::PageMetadata;
use regex::{Captures, Regex};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Elements whose content is dropped by the fallback scanner
const SKIP_TAGS: &[&str] = &["script", "style"];

/// Optional attribute list after a tag name
const ATTRS: &str = r"(?:\s[^>]*)?";

/// Errors raised while converting; absorbed by the public functions
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("conversion pattern failed to compile: {0}")]
    Pattern(#[from] regex::Error),
}

/// Options for [`html_to_markdown_with`]
#[derive(Debug, Clone)]
pub struct MarkdownOptions {
    /// Drop `<script>`, `<style>` and `<noscript>` blocks before converting
    pub strip_scripts: bool,
    /// Resolve relative link and image targets against this URL
    pub base_url: Option<Url>,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            strip_scripts: true,
            base_url: None,
        }
    }
}

/// Compiled patterns shared by every conversion
struct Patterns {
    script: Regex,
    style: Regex,
    noscript: Regex,
    nav: Regex,
    aside: Regex,
    footer: Regex,
    tag: Regex,
    title: Regex,
    h1: Regex,
    headings: Vec<(Regex, String)>,
    strong: Regex,
    em: Regex,
    link: Regex,
    pre: Regex,
    language: Regex,
    code: Regex,
    list: Regex,
    item: Regex,
    paragraph_open: Regex,
    paragraph_close: Regex,
    line_break: Regex,
    image: Regex,
    meta: Regex,
    link_tag: Regex,
    script_block: Regex,
}

impl Patterns {
    fn compile() -> Result<Self, regex::Error> {
        let headings = (1..=6)
            .map(|level| {
                let re = Regex::new(&format!(r"(?is)<h{level}\b[^>]*>(.*?)</h{level}\s*>"))?;
                Ok((re, format!("\n{} ${{1}}\n\n", "#".repeat(level))))
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(Self {
            script: Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>")?,
            style: Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>")?,
            noscript: Regex::new(r"(?is)<noscript\b[^>]*>.*?</noscript\s*>")?,
            nav: Regex::new(r"(?is)<nav\b[^>]*>.*?</nav\s*>")?,
            aside: Regex::new(r"(?is)<aside\b[^>]*>.*?</aside\s*>")?,
            footer: Regex::new(r"(?is)<footer\b[^>]*>(.*?)</footer\s*>")?,
            tag: Regex::new(r"(?s)<[^>]*>")?,
            title: Regex::new(r"(?i)<title[^>]*>([^<]*)</title>")?,
            h1: Regex::new(r"(?is)<h1\b[^>]*>(.*?)</h1\s*>")?,
            headings,
            strong: Regex::new(&format!(r"(?is)<(?:strong|b){ATTRS}>(.*?)</(?:strong|b)\s*>"))?,
            em: Regex::new(&format!(r"(?is)<(?:em|i){ATTRS}>(.*?)</(?:em|i)\s*>"))?,
            link: Regex::new(r"(?is)<a\b([^>]*)>(.*?)</a\s*>")?,
            pre: Regex::new(&format!(
                r"(?is)<pre{ATTRS}>\s*(?:<code(\s[^>]*)?>)?(.*?)(?:</code\s*>)?\s*</pre\s*>"
            ))?,
            language: Regex::new(r"language-(\w+)")?,
            code: Regex::new(&format!(r"(?is)<code{ATTRS}>(.*?)</code\s*>"))?,
            list: Regex::new(&format!(r"(?i)</?(?:ul|ol){ATTRS}>"))?,
            item: Regex::new(&format!(r"(?is)<li{ATTRS}>(.*?)</li\s*>"))?,
            paragraph_open: Regex::new(&format!(r"(?i)<p{ATTRS}>"))?,
            paragraph_close: Regex::new(r"(?i)</p\s*>")?,
            line_break: Regex::new(r"(?i)<br\b[^>]*>")?,
            image: Regex::new(r"(?i)<img\b[^>]*>")?,
            meta: Regex::new(r"(?is)<meta\b[^>]*>")?,
            link_tag: Regex::new(r"(?is)<link\b[^>]*>")?,
            script_block: Regex::new(r"(?is)<script\b([^>]*)>(.*?)</script\s*>")?,
        })
    }
}

static PATTERNS: LazyLock<Result<Patterns, regex::Error>> = LazyLock::new(Patterns::compile);

fn patterns() -> Result<&'static Patterns, ConvertError> {
    PATTERNS
        .as_ref()
        .map_err(|err| ConvertError::Pattern(err.clone()))
}

/// Check if a Content-Type denotes HTML or XHTML
pub fn is_html_content_type(content_type: &str) -> bool {
    let ct_lower = content_type.to_lowercase();
    ct_lower.contains("text/html") || ct_lower.contains("application/xhtml")
}

/// Check if a body starts like an HTML document
pub fn looks_like_html(body: &str) -> bool {
    let head: String = body.trim_start().chars().take(9).collect::<String>().to_lowercase();
    head.starts_with("<!doctype") || head.starts_with("<html")
}

/// Extract the page title
///
/// First `<title>` text, trimmed; otherwise the first `<h1>` with nested
/// tags stripped; otherwise an empty string.
pub fn extract_title(html: &str) -> String {
    let Ok(p) = patterns() else {
        return String::new();
    };

    if let Some(title) = p.title.captures(html).and_then(|c| c.get(1)) {
        let title = title.as_str().trim();
        if !title.is_empty() {
            return decode_entities(title);
        }
    }

    if let Some(h1) = p.h1.captures(html).and_then(|c| c.get(1)) {
        let text = p.tag.replace_all(h1.as_str(), "");
        return decode_entities(text.trim());
    }

    String::new()
}

/// Convert HTML to plain text
pub fn html_to_text(html: &str) -> String {
    match patterns() {
        Ok(p) => {
            let stripped = p.script.replace_all(html, "");
            let stripped = p.style.replace_all(&stripped, "");
            let stripped = p.tag.replace_all(&stripped, "");
            finish(&stripped)
        }
        Err(err) => {
            warn!(error = %err, "Falling back to scanning text conversion");
            finish(&scan_text(html))
        }
    }
}

/// Convert HTML to markdown with default options
pub fn html_to_markdown(html: &str) -> String {
    html_to_markdown_with(html, &MarkdownOptions::default())
}

/// Convert HTML to markdown
///
/// Falls back to [`html_to_text`] if the conversion fails.
pub fn html_to_markdown_with(html: &str, options: &MarkdownOptions) -> String {
    or_plain_text(html, try_html_to_markdown(html, options))
}

fn or_plain_text(html: &str, converted: Result<String, ConvertError>) -> String {
    match converted {
        Ok(markdown) => markdown,
        Err(err) => {
            warn!(error = %err, "Markdown conversion failed, using plain text");
            html_to_text(html)
        }
    }
}

/// Convert HTML to markdown, surfacing failures
pub fn try_html_to_markdown(html: &str, options: &MarkdownOptions) -> Result<String, ConvertError> {
    let p = patterns()?;
    let base = options.base_url.as_ref();

    let mut md = html.to_string();

    if options.strip_scripts {
        md = p.script.replace_all(&md, "").into_owned();
        md = p.style.replace_all(&md, "").into_owned();
        md = p.noscript.replace_all(&md, "").into_owned();
    }

    // Page chrome: navigation and sidebars go, footers are fenced off
    md = p.nav.replace_all(&md, "").into_owned();
    md = p.aside.replace_all(&md, "").into_owned();
    md = p
        .footer
        .replace_all(&md, |caps: &Captures| {
            let content = caps[1].trim();
            if content.is_empty() {
                String::new()
            } else {
                format!("\n\n---\n{}\n---\n\n", content)
            }
        })
        .into_owned();

    for (re, replacement) in &p.headings {
        md = re.replace_all(&md, replacement.as_str()).into_owned();
    }

    md = p.strong.replace_all(&md, "**${1}**").into_owned();
    md = p.em.replace_all(&md, "*${1}*").into_owned();

    md = p
        .link
        .replace_all(&md, |caps: &Captures| {
            let text = &caps[2];
            match extract_attribute(&caps[1], "href") {
                Some(href) => format!("[{}]({})", text, resolve(base, &href)),
                None => text.to_string(),
            }
        })
        .into_owned();

    md = p
        .pre
        .replace_all(&md, |caps: &Captures| {
            let language = caps
                .get(1)
                .and_then(|attrs| extract_attribute(attrs.as_str(), "class"))
                .and_then(|class| {
                    p.language
                        .captures(&class)
                        .map(|c| c[1].to_string())
                })
                .unwrap_or_default();
            format!("\n```{}\n{}\n```\n", language, &caps[2])
        })
        .into_owned();
    md = p.code.replace_all(&md, "`${1}`").into_owned();

    md = p.list.replace_all(&md, "\n\n").into_owned();
    md = p.item.replace_all(&md, "- ${1}\n").into_owned();

    md = p.paragraph_open.replace_all(&md, "\n").into_owned();
    md = p.paragraph_close.replace_all(&md, "\n\n").into_owned();
    md = p.line_break.replace_all(&md, "\n").into_owned();

    md = p
        .image
        .replace_all(&md, |caps: &Captures| {
            let tag = &caps[0];
            match extract_attribute(tag, "src") {
                Some(src) => {
                    let alt = extract_attribute(tag, "alt").unwrap_or_default();
                    format!("![{}]({})", alt, resolve(base, &src))
                }
                None => String::new(),
            }
        })
        .into_owned();

    md = p.tag.replace_all(&md, "").into_owned();

    Ok(finish(&md))
}

/// Extract page metadata: meta tags, canonical link and JSON-LD blocks
pub fn extract_metadata(html: &str) -> PageMetadata {
    let mut metadata = PageMetadata::default();

    let title = extract_title(html);
    if !title.is_empty() {
        metadata.title = Some(title);
    }

    let Ok(p) = patterns() else {
        return metadata;
    };

    for tag in p.meta.find_iter(html) {
        let tag = tag.as_str();
        let Some(content) = extract_attribute(tag, "content") else {
            continue;
        };
        let content = decode_entities(&content);

        if let Some(name) = extract_attribute(tag, "name") {
            let name = name.to_lowercase();
            match name.as_str() {
                "description" => metadata.description = Some(content.clone()),
                "keywords" => metadata.keywords = Some(content.clone()),
                "author" => metadata.author = Some(content.clone()),
                "robots" => metadata.robots = Some(content.clone()),
                // Twitter cards are commonly declared via `name`
                _ if name.starts_with("twitter:") => {
                    metadata.twitter_card.insert(name, content.clone());
                }
                _ => {}
            }
        }

        if let Some(property) = extract_attribute(tag, "property") {
            if property.starts_with("og:") {
                metadata.open_graph.insert(property, content);
            } else if property.starts_with("twitter:") {
                metadata.twitter_card.insert(property, content);
            }
        }
    }

    metadata.canonical = p.link_tag.find_iter(html).find_map(|tag| {
        let tag = tag.as_str();
        let rel = extract_attribute(tag, "rel")?;
        if rel.eq_ignore_ascii_case("canonical") {
            extract_attribute(tag, "href")
        } else {
            None
        }
    });

    for caps in p.script_block.captures_iter(html) {
        let is_json_ld = extract_attribute(&caps[1], "type")
            .is_some_and(|t| t.trim().eq_ignore_ascii_case("application/ld+json"));
        if !is_json_ld {
            continue;
        }

        match serde_json::from_str::<serde_json::Value>(caps[2].trim()) {
            Ok(value) => metadata.structured_data.push(value),
            Err(err) => debug!(error = %err, "Skipping malformed JSON-LD block"),
        }
    }

    metadata
}

/// Decode the basic HTML entity set
pub fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

/// Collapse runs of blank lines to a single empty line
pub fn collapse_blank_lines(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut in_blank_run = false;

    for (i, line) in s.split('\n').enumerate() {
        if line.trim().is_empty() {
            if !in_blank_run && i > 0 {
                result.push('\n');
            }
            in_blank_run = true;
            continue;
        }
        if i > 0 {
            result.push('\n');
        }
        in_blank_run = false;
        result.push_str(line);
    }

    result
}

/// Shared tail of every conversion: decode, collapse, trim
fn finish(s: &str) -> String {
    collapse_blank_lines(&decode_entities(s)).trim().to_string()
}

/// Resolve a link target against the base URL when one is known
fn resolve(base: Option<&Url>, target: &str) -> String {
    base.and_then(|b| b.join(target).ok())
        .map(|u| u.to_string())
        .unwrap_or_else(|| target.to_string())
}

/// Extract attribute value from tag
///
/// The attribute name must start the tag text or follow whitespace, so
/// `name` does not match inside `data-name`.
fn extract_attribute(tag: &str, attr: &str) -> Option<String> {
    // ASCII lowering keeps byte offsets aligned with `tag`
    let tag_lower = tag.to_ascii_lowercase();
    let mut search_from = 0;

    while let Some(pos) = tag_lower[search_from..].find(attr) {
        let start = search_from + pos;
        search_from = start + attr.len();

        let bounded = start == 0
            || tag_lower.as_bytes()[start - 1].is_ascii_whitespace()
            || tag_lower.as_bytes()[start - 1] == b'<';
        if !bounded {
            continue;
        }

        let rest = tag[search_from..].trim_start();
        let Some(rest) = rest.strip_prefix('=') else {
            continue;
        };
        let rest = rest.trim_start();

        if let Some(rest) = rest.strip_prefix('"') {
            return rest.find('"').map(|end| rest[..end].to_string());
        } else if let Some(rest) = rest.strip_prefix('\'') {
            return rest.find('\'').map(|end| rest[..end].to_string());
        } else {
            let end = rest
                .find(|c: char| c.is_whitespace() || c == '>')
                .unwrap_or(rest.len());
            return Some(rest[..end].to_string());
        }
    }
    None
}

/// Strip tags by scanning characters, dropping script/style content
fn scan_text(html: &str) -> String {
    let mut output = String::new();
    let mut skip_elements: Vec<String> = Vec::new();

    let mut chars = html.chars();

    while let Some(c) = chars.next() {
        if c != '<' {
            if skip_elements.is_empty() {
                output.push(c);
            }
            continue;
        }

        let tag: String = chars.by_ref().take_while(|&next| next != '>').collect();
        let tag_lower = tag.to_lowercase();
        let is_closing = tag_lower.starts_with('/');
        let tag_name = tag_lower
            .trim_start_matches('/')
            .split_whitespace()
            .next()
            .unwrap_or("");

        if SKIP_TAGS.contains(&tag_name) {
            if is_closing {
                if let Some(pos) = skip_elements.iter().rposition(|t| t == tag_name) {
                    skip_elements.remove(pos);
                }
            } else if !tag.ends_with('/') {
                skip_elements.push(tag_name.to_string());
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_html_content_type() {
        assert!(is_html_content_type("text/html"));
        assert!(is_html_content_type("text/html; charset=utf-8"));
        assert!(is_html_content_type("application/xhtml+xml"));
        assert!(is_html_content_type("TEXT/HTML"));
        assert!(!is_html_content_type("text/plain"));
        assert!(!is_html_content_type("application/json"));
    }

    #[test]
    fn test_looks_like_html() {
        assert!(looks_like_html("<!DOCTYPE html><html>"));
        assert!(looks_like_html("  <!doctype html>"));
        assert!(looks_like_html("<html><body>"));
        assert!(!looks_like_html("Hello world"));
        assert!(!looks_like_html("{\"json\": true}"));
    }

    #[test]
    fn test_extract_title() {
        assert_eq!(
            extract_title("<html><head><title>  My Page </title></head></html>"),
            "My Page"
        );
        assert_eq!(
            extract_title("<body><h1 class=\"x\">Hello <em>there</em></h1></body>"),
            "Hello there"
        );
        assert_eq!(extract_title("<p>No title</p>"), "");
    }

    #[test]
    fn test_title_preferred_over_h1() {
        let html = "<title>Doc</title><h1>Heading</h1>";
        assert_eq!(extract_title(html), "Doc");
    }

    #[test]
    fn test_html_to_text_strips_scripts_and_styles() {
        let html = "<p>Before</p><script type=\"text/javascript\">alert('bad');</script>\
                    <style>p { color: red }</style><p>After</p>";
        let text = html_to_text(html);
        assert!(text.contains("Before"));
        assert!(text.contains("After"));
        assert!(!text.contains("alert"));
        assert!(!text.contains("color"));
    }

    #[test]
    fn test_html_to_text_non_greedy() {
        let html = "<script>a()</script>keep<script>b()</script>";
        assert_eq!(html_to_text(html), "keep");
    }

    #[test]
    fn test_html_to_text_entities() {
        let html = "<p>&lt;tag&gt; &amp; &quot;quoted&quot; it&#39;s&nbsp;here</p>";
        assert_eq!(html_to_text(html), "<tag> & \"quoted\" it's here");
    }

    #[test]
    fn test_html_to_text_collapses_blank_lines() {
        let html = "<p>One</p>\n\n\n   \n\n<p>Two</p>\n";
        assert_eq!(html_to_text(html), "One\n\nTwo");
    }

    #[test]
    fn test_markdown_heading_and_paragraph() {
        let md = html_to_markdown("<h1>Hi</h1><p>There</p>");
        assert!(!md.contains('<'));
        assert!(md.contains("# Hi"));
        assert!(md.contains("There"));
    }

    #[test]
    fn test_markdown_all_heading_levels() {
        let html = "<h1>A</h1><h2>B</h2><h3>C</h3><h4>D</h4><h5>E</h5><h6>F</h6>";
        let md = html_to_markdown(html);
        assert!(md.contains("# A"));
        assert!(md.contains("## B"));
        assert!(md.contains("### C"));
        assert!(md.contains("#### D"));
        assert!(md.contains("##### E"));
        assert!(md.contains("###### F"));
    }

    #[test]
    fn test_markdown_emphasis() {
        let html = "<p><strong>bold</strong>, <b>also</b> and <em>italic</em>, <i>too</i></p>";
        let md = html_to_markdown(html);
        assert!(md.contains("**bold**"));
        assert!(md.contains("**also**"));
        assert!(md.contains("*italic*"));
        assert!(md.contains("*too*"));
    }

    #[test]
    fn test_markdown_emphasis_ignores_similar_tags() {
        let md = html_to_markdown("<body><blockquote>quote</blockquote></body>");
        assert_eq!(md, "quote");
    }

    #[test]
    fn test_markdown_links() {
        let md = html_to_markdown("<a class=\"x\" href=\"https://example.com\">Example</a>");
        assert_eq!(md, "[Example](https://example.com)");
    }

    #[test]
    fn test_markdown_links_resolved_against_base() {
        let options = MarkdownOptions {
            base_url: Url::parse("https://example.com/docs/").ok(),
            ..Default::default()
        };
        let md = html_to_markdown_with("<a href=\"page.html\">Page</a>", &options);
        assert_eq!(md, "[Page](https://example.com/docs/page.html)");
    }

    #[test]
    fn test_markdown_drops_navigation_and_sidebars() {
        let md = html_to_markdown(
            "<nav><a href=\"/x\">Home</a></nav><aside>ads</aside><p>Body</p>",
        );
        assert_eq!(md, "Body");
    }

    #[test]
    fn test_markdown_fences_footer() {
        let md = html_to_markdown("<p>Body</p><footer>© 2024</footer>");
        assert!(md.starts_with("Body"));
        assert!(md.contains("\n---\n© 2024\n"));
        assert!(md.ends_with("---"));

        assert_eq!(html_to_markdown("<p>Body</p><footer> </footer>"), "Body");
    }

    #[test]
    fn test_markdown_code_language() {
        let md = html_to_markdown("<pre><code class=\"hl language-rust\">fn x() {}</code></pre>");
        assert_eq!(md, "```rust\nfn x() {}\n```");

        let md = html_to_markdown("<pre><code class=\"hl\">plain</code></pre>");
        assert_eq!(md, "```\nplain\n```");
    }

    #[test]
    fn test_markdown_code() {
        let md = html_to_markdown("<p>Use <code>cargo</code></p><pre><code>fn main() {}</code></pre>");
        assert!(md.contains("`cargo`"));
        assert!(md.contains("```\nfn main() {}\n```"));
    }

    #[test]
    fn test_markdown_lists() {
        let md = html_to_markdown("<p>Intro</p><ul><li>Item 1</li><li>Item 2</li></ul><p>Outro</p>");
        assert!(md.contains("- Item 1\n- Item 2"));
        assert!(md.contains("Intro\n\n- Item 1"));
    }

    #[test]
    fn test_markdown_line_breaks() {
        let md = html_to_markdown("<p>line one<br>line two<br/>line three</p>");
        assert_eq!(md, "line one\nline two\nline three");
    }

    #[test]
    fn test_markdown_images_either_attribute_order() {
        let md = html_to_markdown("<img src=\"a.png\" alt=\"First\"><img alt=\"Second\" src=\"b.png\">");
        assert!(md.contains("![First](a.png)"));
        assert!(md.contains("![Second](b.png)"));

        let md = html_to_markdown("<img src=\"c.png\">");
        assert_eq!(md, "![](c.png)");
    }

    #[test]
    fn test_markdown_strips_scripts_by_default() {
        let html = "<p>Before</p><script>alert('bad');</script><noscript>enable js</noscript><p>After</p>";
        let md = html_to_markdown(html);
        assert!(md.contains("Before"));
        assert!(md.contains("After"));
        assert!(!md.contains("alert"));
        assert!(!md.contains("enable js"));
    }

    #[test]
    fn test_markdown_keeps_script_text_when_not_stripping() {
        let options = MarkdownOptions {
            strip_scripts: false,
            ..Default::default()
        };
        let md = html_to_markdown_with("<noscript>enable js</noscript>", &options);
        assert_eq!(md, "enable js");
    }

    #[test]
    fn test_markdown_failure_falls_back_to_text() {
        let html = "<p>Hello &amp; goodbye</p>";
        let failed = Err(ConvertError::Pattern(regex::Error::Syntax("broken".to_string())));
        assert_eq!(or_plain_text(html, failed), "Hello & goodbye");
    }

    #[test]
    fn test_extract_metadata_open_graph() {
        let metadata = extract_metadata("<meta property=\"og:title\" content=\"Foo\">");
        assert_eq!(metadata.open_graph.get("og:title").map(String::as_str), Some("Foo"));
    }

    #[test]
    fn test_extract_metadata_fields() {
        let html = r#"<html><head>
            <title>Site</title>
            <meta name="Description" content="A page about things">
            <meta name="keywords" content="a, b">
            <meta content="Jane" name="author">
            <meta name="robots" content="noindex">
            <meta name="twitter:card" content="summary">
            <meta property="twitter:site" content="@site">
            <meta property="og:image" content="https://example.com/i.png">
            <link href="https://example.com/canonical" rel="canonical">
        </head></html>"#;
        let metadata = extract_metadata(html);
        assert_eq!(metadata.title.as_deref(), Some("Site"));
        assert_eq!(metadata.description.as_deref(), Some("A page about things"));
        assert_eq!(metadata.keywords.as_deref(), Some("a, b"));
        assert_eq!(metadata.author.as_deref(), Some("Jane"));
        assert_eq!(metadata.robots.as_deref(), Some("noindex"));
        assert_eq!(metadata.canonical.as_deref(), Some("https://example.com/canonical"));
        assert_eq!(metadata.twitter_card.len(), 2);
        assert_eq!(
            metadata.open_graph.get("og:image").map(String::as_str),
            Some("https://example.com/i.png")
        );
    }

    #[test]
    fn test_extract_metadata_json_ld() {
        let html = r#"<script type="application/ld+json">{"@type": "Article", "name": "X"}</script>
            <script type="application/ld+json">{bad json</script>
            <script>var x = 1;</script>"#;
        let metadata = extract_metadata(html);
        assert_eq!(metadata.structured_data.len(), 1);
        assert_eq!(metadata.structured_data[0]["@type"], "Article");
    }

    #[test]
    fn test_extract_metadata_invalid_json_ld_only() {
        let metadata = extract_metadata(r#"<script type="application/ld+json">{bad json</script>"#);
        assert!(metadata.structured_data.is_empty());
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(
            decode_entities("&nbsp;&lt;&gt;&amp;&quot;&#39;"),
            " <>&\"'"
        );
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n  \n\t\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\nb"), "a\nb");
        assert_eq!(collapse_blank_lines("a\n  indented"), "a\n  indented");
    }

    #[test]
    fn test_extract_attribute() {
        assert_eq!(
            extract_attribute("a href=\"https://example.com\" class=\"link\"", "href"),
            Some("https://example.com".to_string())
        );
        assert_eq!(
            extract_attribute("img src='image.png'", "src"),
            Some("image.png".to_string())
        );
        assert_eq!(
            extract_attribute("div class=test", "class"),
            Some("test".to_string())
        );
        assert_eq!(
            extract_attribute("<meta data-name=\"x\" name = \"y\">", "name"),
            Some("y".to_string())
        );
        assert_eq!(extract_attribute("<meta charset=\"utf-8\">", "content"), None);
    }

    #[test]
    fn test_scan_text() {
        let html = "<p>Keep</p><script>drop()</script><style>.x{}</style><p>this</p>";
        assert_eq!(scan_text(html), "Keepthis");
    }
}
