//! Markdown rendering: comrak with syntect highlighting, ammonia
//! sanitisation, heading anchors, and table-of-contents extraction.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::Arc;

use comrak::{
    Arena, Options, Plugins, format_html_with_plugins,
    nodes::{AstNode, NodeValue},
    parse_document,
    plugins::syntect::SyntectAdapter,
};
use lol_html::{RewriteStrSettings, element, rewrite_str};
use once_cell::sync::Lazy;
use thiserror::Error;

use crate::domain::slug::AnchorSlugger;

/// Auto-derived excerpts keep the first 54 characters of the rendered body.
pub const EXCERPT_MAX_CHARS: usize = 54;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("markdown rendering failed: {0}")]
    Markdown(String),
    #[error("anchor injection failed: {0}")]
    AnchorInjection(String),
}

/// One heading of the rendered document, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub anchor: String,
    pub title: String,
    pub level: u8,
}

/// Sanitised HTML plus the table of contents extracted from its headings.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub html: String,
    pub toc: Vec<TocEntry>,
}

pub struct MarkdownRenderService {
    options: Options<'static>,
    adapter: SyntectAdapter,
    sanitizer: ammonia::Builder<'static>,
}

static RENDER_SERVICE: Lazy<Arc<MarkdownRenderService>> =
    Lazy::new(|| Arc::new(MarkdownRenderService::new()));

/// Shared render service instance, initialised on first use.
pub fn render_service() -> Arc<MarkdownRenderService> {
    Arc::clone(&RENDER_SERVICE)
}

impl Default for MarkdownRenderService {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderService {
    fn new() -> Self {
        Self {
            options: default_options(),
            // `None` keeps highlighting as CSS classes instead of inline styles.
            adapter: SyntectAdapter::new(None),
            sanitizer: build_sanitizer(),
        }
    }

    /// Render a post body to sanitised HTML with anchored headings and a TOC.
    pub fn render(&self, markdown: &str) -> Result<RenderedDocument, RenderError> {
        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &self.options);

        let toc = collect_toc(root);

        let mut plugins = Plugins::default();
        plugins.render.codefence_syntax_highlighter = Some(&self.adapter);

        let mut html = String::new();
        format_html_with_plugins(root, &self.options, &mut html, &plugins)
            .map_err(|err| RenderError::Markdown(err.to_string()))?;

        let sanitized = self.sanitizer.clean(&html).to_string();
        let html = inject_heading_anchors(&sanitized, &toc)?;

        Ok(RenderedDocument { html, toc })
    }

    /// Render and reduce to plain text, capped at `max_chars` characters.
    /// Used to derive the stored excerpt when an author supplies none.
    pub fn derive_excerpt(&self, markdown: &str) -> Result<String, RenderError> {
        let document = self.render(markdown)?;
        Ok(plain_text_excerpt(&document.html, EXCERPT_MAX_CHARS))
    }
}

fn default_options() -> Options<'static> {
    let mut options = Options::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options.extension.footnotes = true;
    options
}

fn build_sanitizer() -> ammonia::Builder<'static> {
    let mut builder = ammonia::Builder::default();
    builder
        .add_tags(["span", "input"])
        // Syntect emits class-annotated spans; tasklists emit checkboxes.
        .add_tag_attributes("span", ["class"])
        .add_tag_attributes("code", ["class"])
        .add_tag_attributes("pre", ["class"])
        .add_tag_attributes("input", ["type", "checked", "disabled"]);
    builder
}

/// Walk the AST in document order, collecting heading text and assigning
/// deterministic anchors. Headings whose text cannot produce a slug fall back
/// to a positional anchor.
fn collect_toc<'a>(root: &'a AstNode<'a>) -> Vec<TocEntry> {
    let mut slugger = AnchorSlugger::new();
    let mut toc = Vec::new();

    for node in root.descendants() {
        let level = match &node.data.borrow().value {
            NodeValue::Heading(heading) => heading.level,
            _ => continue,
        };

        let title = collect_text(node).trim().to_string();
        let anchor = slugger
            .anchor_for(&title)
            .unwrap_or_else(|_| format!("section-{}", toc.len() + 1));

        toc.push(TocEntry {
            anchor,
            title,
            level,
        });
    }

    toc
}

fn collect_text<'a>(node: &'a AstNode<'a>) -> String {
    let mut text = String::new();
    for child in node.descendants().skip(1) {
        match &child.data.borrow().value {
            NodeValue::Text(literal) => text.push_str(literal),
            NodeValue::Code(code) => text.push_str(&code.literal),
            NodeValue::SoftBreak | NodeValue::LineBreak => text.push(' '),
            _ => {}
        }
    }
    text
}

/// Set `id` attributes on `<h1>`–`<h6>` in document order. Runs after
/// sanitisation so the anchors cannot be stripped; the anchors themselves
/// come from the slugger and are URL-safe.
fn inject_heading_anchors(html: &str, toc: &[TocEntry]) -> Result<String, RenderError> {
    if toc.is_empty() {
        return Ok(html.to_string());
    }

    let anchors: RefCell<VecDeque<&str>> =
        RefCell::new(toc.iter().map(|entry| entry.anchor.as_str()).collect());

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("h1, h2, h3, h4, h5, h6", |el| {
                if let Some(anchor) = anchors.borrow_mut().pop_front() {
                    el.set_attribute("id", anchor)?;
                }
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| RenderError::AnchorInjection(err.to_string()))
}

/// Strip tags and collapse whitespace, keeping at most `max_chars` characters.
pub fn plain_text_excerpt(html: &str, max_chars: usize) -> String {
    let mut text = String::with_capacity(max_chars);
    let mut taken = 0;
    let mut in_tag = false;
    let mut last_was_space = false;

    for ch in html.chars() {
        match ch {
            '<' => {
                in_tag = true;
                continue;
            }
            '>' => {
                in_tag = false;
                last_was_space = false;
                continue;
            }
            _ if in_tag => continue,
            c if c.is_whitespace() => {
                if !last_was_space && !text.is_empty() {
                    text.push(' ');
                    taken += 1;
                }
                last_was_space = true;
            }
            c => {
                text.push(c);
                taken += 1;
                last_was_space = false;
            }
        }

        if taken >= max_chars {
            break;
        }
    }

    text.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headings_receive_anchor_ids_and_toc_entries() {
        let service = MarkdownRenderService::default();
        let document = service
            .render("# Overview\n\nbody\n\n## Setup\n\n## Setup\n")
            .expect("rendered");

        assert_eq!(
            document.toc,
            vec![
                TocEntry {
                    anchor: "overview".to_string(),
                    title: "Overview".to_string(),
                    level: 1,
                },
                TocEntry {
                    anchor: "setup".to_string(),
                    title: "Setup".to_string(),
                    level: 2,
                },
                TocEntry {
                    anchor: "setup-2".to_string(),
                    title: "Setup".to_string(),
                    level: 2,
                },
            ]
        );
        assert!(document.html.contains(r#"id="overview""#));
        assert!(document.html.contains(r#"id="setup-2""#));
    }

    #[test]
    fn chinese_headings_get_pinyin_anchors() {
        let service = MarkdownRenderService::default();
        let document = service.render("## 分页算法\n").expect("rendered");

        assert_eq!(document.toc[0].anchor, "fen-ye-suan-fa");
        assert!(document.html.contains(r#"id="fen-ye-suan-fa""#));
    }

    #[test]
    fn tables_and_fenced_code_survive_sanitisation() {
        let service = MarkdownRenderService::default();
        let markdown = "| a | b |\n|---|---|\n| 1 | 2 |\n\n```rust\nfn main() {}\n```\n";
        let document = service.render(markdown).expect("rendered");

        assert!(document.html.contains("<table>"));
        assert!(document.html.contains("<pre"));
        assert!(document.toc.is_empty());
    }

    #[test]
    fn script_content_is_stripped() {
        let service = MarkdownRenderService::default();
        let document = service
            .render("hello <script>alert(1)</script> world\n")
            .expect("rendered");

        assert!(!document.html.contains("<script"));
        assert!(document.html.contains("hello"));
    }

    #[test]
    fn excerpt_strips_markup_and_caps_length() {
        let excerpt = plain_text_excerpt("<p>one <strong>two</strong>\n three</p>", 54);
        assert_eq!(excerpt, "one two three");

        let long = "x".repeat(200);
        let capped = plain_text_excerpt(&format!("<p>{long}</p>"), EXCERPT_MAX_CHARS);
        assert_eq!(capped.chars().count(), EXCERPT_MAX_CHARS);
    }

    #[test]
    fn excerpt_counts_characters_not_bytes() {
        let body: String = "汉".repeat(80);
        let excerpt = plain_text_excerpt(&format!("<p>{body}</p>"), EXCERPT_MAX_CHARS);
        assert_eq!(excerpt.chars().count(), EXCERPT_MAX_CHARS);
    }

    #[test]
    fn derive_excerpt_renders_then_truncates() {
        let service = MarkdownRenderService::default();
        let excerpt = service
            .derive_excerpt("# Title\n\nFirst paragraph of the article body.")
            .expect("excerpt");

        assert!(excerpt.starts_with("Title First paragraph"));
        assert!(excerpt.chars().count() <= EXCERPT_MAX_CHARS);
    }
}
