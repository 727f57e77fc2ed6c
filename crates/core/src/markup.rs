//! Page body rendering.
//!
//! The markup filter is picked once from configuration and held in a
//! [`MarkupRenderer`]; rendering never looks a filter up by name.

use std::str::FromStr;
use std::sync::LazyLock;

use pulldown_cmark::{html, CowStr, Event, LinkType, Options, Parser, Tag, TagEnd, TextMergeStream};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// `[[target]]` or `[[target|label]]`.
static WIKI_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\[([\w _-]+)(\|([\w _-]+))?\]\]").expect("valid regex")
});

/// Space runs, optionally touching an underscore.
static URL_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"( +_)|(_ +)|( +)").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkupFilter {
    /// Escaped text, paragraphs and line breaks preserved.
    Plain,
    /// CommonMark.
    Markdown,
    /// CommonMark with `[[wiki links]]`.
    WikiLinks,
}

impl MarkupFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Markdown => "markdown",
            Self::WikiLinks => "wikilinks",
        }
    }
}

impl FromStr for MarkupFilter {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" => Ok(Self::Plain),
            "markdown" => Ok(Self::Markdown),
            "wikilinks" => Ok(Self::WikiLinks),
            other => Err(CoreError::Validation(format!(
                "Invalid text filter '{other}'. Must be one of: plain, markdown, wikilinks"
            ))),
        }
    }
}

/// Renders page bodies to HTML with a fixed filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupRenderer {
    filter: MarkupFilter,
    base_url: String,
}

impl MarkupRenderer {
    /// `base_url` prefixes every wiki link href.
    pub fn new(filter: MarkupFilter, base_url: impl Into<String>) -> Self {
        Self {
            filter,
            base_url: base_url.into(),
        }
    }

    pub fn filter(&self) -> MarkupFilter {
        self.filter
    }

    pub fn render(&self, content: &str) -> String {
        match self.filter {
            MarkupFilter::Plain => render_plain(content),
            MarkupFilter::Markdown => render_markdown(content, None),
            MarkupFilter::WikiLinks => render_markdown(content, Some(&self.base_url)),
        }
    }
}

// ---------------------------------------------------------------------------
// Wiki links
// ---------------------------------------------------------------------------

/// A resolved wiki link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiLink {
    pub href: String,
    pub text: String,
}

/// Join `base` and a link target, folding spaces (and spaces next to
/// underscores) into single underscores.
pub fn build_url(target: &str, base: &str) -> String {
    let clean = URL_SEPARATOR.replace_all(target, "_");
    format!("{base}{clean}")
}

/// Resolve one link. A blank target yields no link at all.
pub fn resolve_wiki_link(target: &str, label: Option<&str>, base: &str) -> Option<WikiLink> {
    let target = target.trim();
    if target.is_empty() {
        return None;
    }
    let text = label
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(target);
    Some(WikiLink {
        href: build_url(target, base),
        text: text.to_string(),
    })
}

/// Split a text run around wiki link tokens into Markdown events.
fn expand_wiki_links<'a>(text: &str, base: &str, out: &mut Vec<Event<'a>>) {
    let mut last = 0;
    for caps in WIKI_LINK.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last {
            out.push(Event::Text(CowStr::from(text[last..whole.start()].to_string())));
        }
        last = whole.end();

        let target = caps.get(1).map_or("", |m| m.as_str());
        let label = caps.get(3).map(|m| m.as_str());
        if let Some(link) = resolve_wiki_link(target, label, base) {
            out.push(Event::Start(Tag::Link {
                link_type: LinkType::Inline,
                dest_url: CowStr::from(link.href),
                title: CowStr::Borrowed(""),
                id: CowStr::Borrowed(""),
            }));
            out.push(Event::Text(CowStr::from(link.text)));
            out.push(Event::End(TagEnd::Link));
        }
    }
    if last < text.len() {
        out.push(Event::Text(CowStr::from(text[last..].to_string())));
    }
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

fn render_markdown(content: &str, wiki_base: Option<&str>) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let mut events = Vec::new();
    let mut in_code_block = false;
    for event in TextMergeStream::new(Parser::new_ext(content, options)) {
        match (event, wiki_base) {
            (Event::Text(text), Some(base)) if !in_code_block => {
                expand_wiki_links(&text, base, &mut events);
            }
            (event, _) => {
                match &event {
                    Event::Start(Tag::CodeBlock(_)) => in_code_block = true,
                    Event::End(TagEnd::CodeBlock) => in_code_block = false,
                    _ => {}
                }
                events.push(event);
            }
        }
    }

    let mut out = String::with_capacity(content.len() * 3 / 2);
    html::push_html(&mut out, events.into_iter());
    out
}

fn render_plain(content: &str) -> String {
    let normalized = content.replace("\r\n", "\n");
    normalized
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| format!("<p>{}</p>\n", escape_html(p).replace('\n', "<br />\n")))
        .collect()
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "/api/v1/wiki/pages/";

    fn wiki(content: &str) -> String {
        MarkupRenderer::new(MarkupFilter::WikiLinks, BASE).render(content)
    }

    // -- filter parsing ------------------------------------------------------

    #[test]
    fn filter_parses_known_names() {
        assert_eq!("plain".parse::<MarkupFilter>().unwrap(), MarkupFilter::Plain);
        assert_eq!("Markdown".parse::<MarkupFilter>().unwrap(), MarkupFilter::Markdown);
        assert_eq!("wikilinks".parse::<MarkupFilter>().unwrap(), MarkupFilter::WikiLinks);
        assert!("textile".parse::<MarkupFilter>().is_err());
        assert_eq!(MarkupFilter::WikiLinks.as_str(), "wikilinks");
    }

    // -- wiki links ----------------------------------------------------------

    #[test]
    fn build_url_folds_spaces() {
        assert_eq!(build_url("Foo Bar", "/w/"), "/w/Foo_Bar");
        assert_eq!(build_url("Foo _Bar", "/w/"), "/w/Foo_Bar");
        assert_eq!(build_url("Foo_  Bar", "/w/"), "/w/Foo_Bar");
        assert_eq!(build_url("Foo   Bar", "/w/"), "/w/Foo_Bar");
    }

    #[test]
    fn link_href_uses_underscores() {
        let html = wiki("[[Foo Bar]]");
        assert!(html.contains("href=\"/api/v1/wiki/pages/Foo_Bar\""), "{html}");
        assert!(html.contains(">Foo Bar</a>"));
    }

    #[test]
    fn link_label_replaces_text() {
        let html = wiki("See [[Foo Bar|Label]] here.");
        assert!(html.contains("href=\"/api/v1/wiki/pages/Foo_Bar\""), "{html}");
        assert!(html.contains(">Label</a>"));
        assert!(html.starts_with("<p>See "));
        assert!(html.contains("</a> here.</p>"));
    }

    #[test]
    fn blank_link_renders_nothing() {
        let html = wiki("before [[ ]] after");
        assert!(!html.contains("<a"), "{html}");
        assert!(!html.contains("[["));
        assert!(html.contains("before"));
        assert!(html.contains("after"));
    }

    #[test]
    fn link_href_is_escaped_by_renderer() {
        let html = MarkupRenderer::new(MarkupFilter::WikiLinks, "/w/\"x/").render("[[Foo]]");
        assert!(!html.contains("/w/\"x"), "{html}");
        assert!(html.contains(">Foo</a>"), "{html}");
    }

    #[test]
    fn link_target_is_trimmed() {
        let link = resolve_wiki_link("  Main page ", None, "/w/").unwrap();
        assert_eq!(link.href, "/w/Main_page");
        assert_eq!(link.text, "Main page");
    }

    #[test]
    fn links_inside_code_blocks_are_left_alone() {
        let html = wiki("```\n[[Foo]]\n```\n");
        assert!(!html.contains("<a"), "{html}");
        assert!(html.contains("[[Foo]]"));
    }

    #[test]
    fn markdown_filter_ignores_wiki_links() {
        let html = MarkupRenderer::new(MarkupFilter::Markdown, BASE).render("[[Foo]] *x*");
        assert!(!html.contains("<a"), "{html}");
        assert!(html.contains("<em>x</em>"));
    }

    // -- plain ---------------------------------------------------------------

    #[test]
    fn plain_filter_escapes_and_keeps_paragraphs() {
        let html = MarkupRenderer::new(MarkupFilter::Plain, BASE).render("a <b>\nc\n\nd & e");
        assert_eq!(html, "<p>a &lt;b&gt;<br />\nc</p>\n<p>d &amp; e</p>\n");
    }
}
