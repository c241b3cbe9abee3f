//! `render`: a markdown note to HTML, canvas node embeds resolved.
//!
//! The note is laid out the way the host would: markdown between embeds is
//! rendered directly and every `![[...]]` becomes a placeholder span. The
//! section is then inserted into a live tree with an [`EmbedObserver`]
//! attached, so embeds go through the same pipeline as in the editor.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use anyhow::{Context, Result};
use regex::Regex;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::info;

use canvas_embed_render::{
    DocumentTree, Element, EmbedBuilder, LinkIconOptions, MarkdownRenderer, Node,
    RichTextRenderer, Selector,
};
use canvas_embed_watch::EmbedObserver;

use super::CliContext;

static EMBED_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[\[([^\]|]+)(?:\|[^\]]*)?\]\]").expect("embed regex"));

const RESOLVE_TIMEOUT: Duration = Duration::from_secs(30);

pub async fn execute(ctx: CliContext, note: String) -> Result<()> {
    let note_path = ctx.kiln_path(&note)?;
    let text = ctx.read_text(&note_path).await?;
    ctx.workspace.set_active(note_path.clone());

    let html = render_note(&ctx, &note_path, &text).await?;
    println!("{html}");
    Ok(())
}

/// HTML of the note at `note_path` with its canvas node embeds rendered.
pub async fn render_note(ctx: &CliContext, note_path: &str, text: &str) -> Result<String> {
    let watch = &ctx.config.watch;
    let renderer = Arc::new(MarkdownRenderer::new().with_store(ctx.store.clone()));
    let builder = EmbedBuilder::new(renderer.clone())
        .with_link_icon(LinkIconOptions::from(&ctx.config.embed));
    let section = layout_note(renderer.as_ref(), text, note_path, &watch.placeholder_class).await?;

    let tree = DocumentTree::new().shared();
    let (tx, mut outcomes) = mpsc::unbounded_channel();
    let mut observer = EmbedObserver::new(
        tree.clone(),
        ctx.loader(),
        ctx.workspace.clone(),
        builder,
        watch,
    )
    .with_event_sender(tx);
    observer.start().await?;

    let (root, expected) = {
        let mut tree = tree.lock();
        let root = tree.root();
        let section = tree
            .append(root, section)
            .context("Document root is not an element")?;
        let placeholders = Selector::class(&watch.placeholder_class).with_attribute("src");
        (root, tree.query_all(section, &placeholders).len())
    };

    let mut rendered = 0;
    for _ in 0..expected {
        let outcome = timeout(RESOLVE_TIMEOUT, outcomes.recv())
            .await
            .context("Timed out waiting for embeds to resolve")?
            .context("Embed observer stopped unexpectedly")?;
        if outcome.is_rendered() {
            rendered += 1;
        }
    }
    observer.stop().await?;

    info!(note = note_path, embeds = expected, rendered, "Rendered note");
    let html = tree.lock().inner_html(root);
    Ok(html)
}

/// Markdown between embeds rendered in place; embeds as placeholder spans.
async fn layout_note(
    renderer: &MarkdownRenderer,
    text: &str,
    note_path: &str,
    placeholder_class: &str,
) -> Result<Element> {
    let mut section =
        Element::div().with_classes(&["markdown-preview-view", "markdown-rendered"]);

    let embeds: Vec<(usize, usize, String)> = EMBED_REGEX
        .captures_iter(text)
        .filter_map(|cap| {
            let whole = cap.get(0)?;
            Some((whole.start(), whole.end(), cap[1].trim().to_string()))
        })
        .collect();

    let mut last = 0;
    for (start, end, target) in embeds {
        render_segment(renderer, &text[last..start], &mut section, note_path).await?;
        section.push(
            Element::new("span")
                .with_class(placeholder_class)
                .with_attr("src", target.clone())
                .with_child(Node::text(target)),
        );
        last = end;
    }
    render_segment(renderer, &text[last..], &mut section, note_path).await?;

    Ok(section)
}

async fn render_segment(
    renderer: &MarkdownRenderer,
    segment: &str,
    section: &mut Element,
    note_path: &str,
) -> Result<()> {
    if segment.trim().is_empty() {
        return Ok(());
    }
    renderer
        .render(segment, section, note_path)
        .await
        .context("Failed to render markdown")
}
