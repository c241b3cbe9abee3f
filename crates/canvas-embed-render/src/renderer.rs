//! Rich-text rendering
//!
//! [`RichTextRenderer`] is the seam to the host's formatter. The bundled
//! [`MarkdownRenderer`] renders CommonMark with `pulldown-cmark` and turns
//! `[[wikilinks]]` into internal links resolved against the *context path*,
//! the document the embed appears in.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use pulldown_cmark::{html, Options, Parser};
use regex::Regex;

use canvas_embed_core::error::{EmbedError, Result};
use canvas_embed_core::store::DocumentStore;

use crate::tree::{escape_html, Element, Node};

/// Renders formatted text into a container.
#[async_trait]
pub trait RichTextRenderer: Send + Sync {
    /// Render `text` into `target`. Relative links in `text` resolve against
    /// `context_path`.
    async fn render(&self, text: &str, target: &mut Element, context_path: &str) -> Result<()>;
}

static WIKILINK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(!?)\[\[([^\]]+)\]\]").expect("wikilink regex"));

static CODE_BLOCK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^```[\s\S]*?^```|^    .*$|`[^`]+`").expect("code block regex")
});

/// CommonMark renderer with wikilink support.
#[derive(Clone, Default)]
pub struct MarkdownRenderer {
    store: Option<Arc<dyn DocumentStore>>,
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve wikilink targets through `store`. Without a store links are
    /// emitted unresolved.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    fn options() -> Options {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_FOOTNOTES);
        options
    }

    fn is_inside_code_block(content: &str, offset: usize) -> bool {
        CODE_BLOCK_REGEX
            .find_iter(content)
            .any(|m| offset >= m.start() && offset < m.end())
    }

    /// Replace wikilinks outside code with inline `<a>` tags.
    async fn link_wikilinks(&self, text: &str, context_path: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;

        // Collected up front: the regex iterator must not live across awaits.
        let links: Vec<(usize, usize, String)> = WIKILINK_REGEX
            .captures_iter(text)
            .filter_map(|cap| {
                let whole = cap.get(0)?;
                if Self::is_inside_code_block(text, whole.start()) {
                    return None;
                }
                Some((whole.start(), whole.end(), cap[2].to_string()))
            })
            .collect();

        for (start, end, inner) in links {
            out.push_str(&text[last..start]);
            last = end;

            let (target, alias) = match inner.split_once('|') {
                Some((target, alias)) => (target.trim(), Some(alias.trim())),
                None => (inner.trim(), None),
            };
            let (path, fragment) = match target.split_once('#') {
                Some((path, fragment)) => (path, Some(fragment)),
                None => (target, None),
            };

            let resolved = match (&self.store, path.is_empty()) {
                (Some(store), false) => {
                    resolve_note(store.as_ref(), path, context_path).await
                }
                (_, true) => Some(context_path.to_string()),
                (None, false) => None,
            };

            let mut href = resolved.clone().unwrap_or_else(|| path.to_string());
            if let Some(fragment) = fragment {
                href.push('#');
                href.push_str(fragment);
            }
            let class = if resolved.is_some() {
                "internal-link"
            } else {
                "internal-link is-unresolved"
            };
            let label = alias.unwrap_or(target);

            out.push_str(&format!(
                "<a class=\"{}\" data-href=\"{}\" href=\"{}\">{}</a>",
                class,
                escape_html(target),
                escape_html(&href),
                escape_html(label)
            ));
        }

        out.push_str(&text[last..]);
        out
    }
}

/// Resolve a wikilink path, trying `<path>.md` for extension-less targets.
async fn resolve_note(store: &dyn DocumentStore, path: &str, context_path: &str) -> Option<String> {
    if let Some(found) = store.resolve_link_path(path, context_path).await {
        return Some(found);
    }
    if !path.contains('.') {
        return store
            .resolve_link_path(&format!("{path}.md"), context_path)
            .await;
    }
    None
}

#[async_trait]
impl RichTextRenderer for MarkdownRenderer {
    async fn render(&self, text: &str, target: &mut Element, context_path: &str) -> Result<()> {
        let linked = self.link_wikilinks(text, context_path).await;
        let parser = Parser::new_ext(&linked, Self::options());

        let mut rendered = String::new();
        html::push_html(&mut rendered, parser);
        if rendered.is_empty() && !text.trim().is_empty() {
            return Err(EmbedError::render("markdown produced no output"));
        }

        target.push(Node::Html(rendered));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_embed_core::InMemoryStore;

    async fn render_with(renderer: &MarkdownRenderer, text: &str, context: &str) -> String {
        let mut target = Element::div();
        renderer.render(text, &mut target, context).await.unwrap();
        target.to_html()
    }

    #[tokio::test]
    async fn test_renders_commonmark() {
        let html = render_with(&MarkdownRenderer::new(), "# Title\n\n- one\n- two", "n.md").await;
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<li>one</li>"));
    }

    #[tokio::test]
    async fn test_empty_text_renders_nothing() {
        let html = render_with(&MarkdownRenderer::new(), "", "n.md").await;
        assert_eq!(html, "<div></div>");
    }

    #[tokio::test]
    async fn test_wikilinks_resolve_against_context_path() {
        let store = Arc::new(
            InMemoryStore::new()
                .with_document("projects/ideas.md", "")
                .with_document("ideas.md", ""),
        );
        let renderer = MarkdownRenderer::new().with_store(store);

        let from_project = render_with(&renderer, "see [[ideas]]", "projects/today.md").await;
        assert!(from_project.contains("href=\"projects/ideas.md\""));

        let from_root = render_with(&renderer, "see [[ideas|my ideas]]", "today.md").await;
        assert!(from_root.contains("href=\"ideas.md\""));
        assert!(from_root.contains(">my ideas</a>"));
    }

    #[tokio::test]
    async fn test_unresolved_and_code_wikilinks() {
        let store = Arc::new(InMemoryStore::new());
        let renderer = MarkdownRenderer::new().with_store(store);

        let html = render_with(&renderer, "[[missing#part]] and `[[code]]`", "a.md").await;
        assert!(html.contains("internal-link is-unresolved"));
        assert!(html.contains("href=\"missing#part\""));
        assert!(html.contains("<code>[[code]]</code>"));
    }
}
