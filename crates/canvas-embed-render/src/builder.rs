//! Embed structure builder
//!
//! Produces the detached structure that replaces a canvas node placeholder:
//!
//! ```text
//! div.markdown-embed-content
//! └── div.markdown-preview-view
//!     └── div.markdown-preview-sizer
//!         ├── div.markdown-preview-pusher
//!         └── div.el-p            <- rendered node text
//! div.markdown-embed-link         <- optional "Open in canvas" control
//! ```
//!
//! The pusher must come before the rendered content; the host's layout
//! measures from it.

use std::sync::Arc;

use canvas_embed_config::EmbedRenderConfig;
use canvas_embed_core::canvas::CanvasNode;
use canvas_embed_core::error::{EmbedError, Result};
use canvas_embed_core::reference::NodeReference;

use crate::renderer::RichTextRenderer;
use crate::tree::{Element, EventKind, Listener, ListenerAction, Node};

const LINK_ICON_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="16" height="16" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round" class="svg-icon lucide-link"><path d="M10 13a5 5 0 0 0 7.54.54l3-3a5 5 0 0 0-7.07-7.07l-1.72 1.71"/><path d="M14 11a5 5 0 0 0-7.54-.54l-3 3a5 5 0 0 0 7.07 7.07l1.71-1.71"/></svg>"#;

/// Presentation of the "Open in canvas" control.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkIconOptions {
    pub enabled: bool,
    pub rest_opacity: f32,
    pub hover_opacity: f32,
    pub offset_px: u32,
}

impl Default for LinkIconOptions {
    fn default() -> Self {
        Self::from(&EmbedRenderConfig::default())
    }
}

impl From<&EmbedRenderConfig> for LinkIconOptions {
    fn from(config: &EmbedRenderConfig) -> Self {
        Self {
            enabled: config.show_link_icon,
            rest_opacity: config.link_icon_rest_opacity,
            hover_opacity: config.link_icon_hover_opacity,
            offset_px: config.link_icon_offset_px,
        }
    }
}

/// Everything that goes into a placeholder once its node is resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEmbed {
    pub content: Element,
    pub link_icon: Option<Element>,
}

impl RenderedEmbed {
    /// Nodes in insertion order.
    pub fn into_nodes(self) -> Vec<Node> {
        let mut nodes = vec![Node::Element(self.content)];
        if let Some(icon) = self.link_icon {
            nodes.push(Node::Element(icon));
        }
        nodes
    }
}

/// Builds [`RenderedEmbed`]s with a rich-text renderer.
#[derive(Clone)]
pub struct EmbedBuilder {
    renderer: Arc<dyn RichTextRenderer>,
    link_icon: LinkIconOptions,
}

impl EmbedBuilder {
    pub fn new(renderer: Arc<dyn RichTextRenderer>) -> Self {
        Self {
            renderer,
            link_icon: LinkIconOptions::default(),
        }
    }

    #[must_use]
    pub fn with_link_icon(mut self, options: LinkIconOptions) -> Self {
        self.link_icon = options;
        self
    }

    /// Content container for `node`, its text rendered with `context_path`
    /// (the document hosting the embed, not the canvas) as link context.
    pub async fn build(&self, node: &CanvasNode, context_path: &str) -> Result<Element> {
        let mut paragraph = Element::div().with_class("el-p");
        self.renderer
            .render(node.text_or_empty(), &mut paragraph, context_path)
            .await
            .map_err(|e| match e {
                EmbedError::Render(_) => e,
                other => EmbedError::render(other.to_string()),
            })?;

        let sizer = Element::div()
            .with_classes(&["markdown-preview-sizer", "markdown-preview-section"])
            .with_child(Element::div().with_class("markdown-preview-pusher"))
            .with_child(paragraph);

        let preview = Element::div()
            .with_classes(&[
                "markdown-preview-view",
                "markdown-rendered",
                "node-insert-event",
                "show-indentation-guide",
                "allow-fold-headings",
                "allow-fold-lists",
            ])
            .with_child(sizer);

        Ok(Element::div()
            .with_classes(&["markdown-embed-content", "node-insert-event"])
            .with_child(preview))
    }

    /// Overlay control that opens the canvas at `canvas_path`.
    pub fn link_icon(&self, node: &CanvasNode, canvas_path: &str) -> Element {
        let rest = format_opacity(self.link_icon.rest_opacity);
        let hover = format_opacity(self.link_icon.hover_opacity);
        let offset = format!("{}px", self.link_icon.offset_px);
        let src = NodeReference::new(canvas_path, node.id.clone()).to_string();

        Element::div()
            .with_class("markdown-embed-link")
            .with_attr("aria-label", "Open in canvas")
            .with_attr("src", src)
            .with_style("position", "absolute")
            .with_style("top", &offset)
            .with_style("right", &offset)
            .with_style("cursor", "pointer")
            .with_style("opacity", &rest)
            .with_style("transition", "opacity 0.2s ease-in-out")
            .with_listener(Listener::new(
                EventKind::Click,
                ListenerAction::OpenDocument(canvas_path.to_string()),
            ))
            .with_listener(Listener::new(
                EventKind::MouseEnter,
                ListenerAction::SetStyle {
                    property: "opacity".to_string(),
                    value: hover,
                },
            ))
            .with_listener(Listener::new(
                EventKind::MouseLeave,
                ListenerAction::SetStyle {
                    property: "opacity".to_string(),
                    value: rest,
                },
            ))
            .with_child(Node::html(LINK_ICON_SVG))
    }

    /// Content plus (if enabled) the link icon.
    pub async fn render(
        &self,
        node: &CanvasNode,
        canvas_path: &str,
        context_path: &str,
    ) -> Result<RenderedEmbed> {
        let content = self.build(node, context_path).await?;
        let link_icon = self
            .link_icon
            .enabled
            .then(|| self.link_icon(node, canvas_path));
        Ok(RenderedEmbed { content, link_icon })
    }
}

fn format_opacity(value: f32) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{rounded}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Records the context path and echoes the text.
    #[derive(Default)]
    struct RecordingRenderer {
        contexts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RichTextRenderer for RecordingRenderer {
        async fn render(&self, text: &str, target: &mut Element, context_path: &str) -> Result<()> {
            self.contexts.lock().push(context_path.to_string());
            target.push(Node::text(text));
            Ok(())
        }
    }

    struct BrokenRenderer;

    #[async_trait]
    impl RichTextRenderer for BrokenRenderer {
        async fn render(&self, _: &str, _: &mut Element, _: &str) -> Result<()> {
            Err(EmbedError::render("formatter crashed"))
        }
    }

    fn child_classes(el: &Element) -> Vec<String> {
        el.children
            .iter()
            .filter_map(|c| match c {
                Node::Element(e) => e.classes.first().cloned(),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_structure_and_pusher_order() {
        let builder = EmbedBuilder::new(Arc::new(RecordingRenderer::default()));
        let content = builder
            .build(&CanvasNode::text("abc", "hello"), "notes/day.md")
            .await
            .unwrap();

        assert!(content.has_class("markdown-embed-content"));
        let preview = content.find_class("markdown-preview-view").unwrap();
        assert!(preview.has_class("allow-fold-lists"));
        let sizer = content.find_class("markdown-preview-sizer").unwrap();
        assert_eq!(
            child_classes(sizer),
            vec!["markdown-preview-pusher".to_string(), "el-p".to_string()]
        );
        assert_eq!(content.find_class("el-p").unwrap().to_html(), "<div class=\"el-p\">hello</div>");
    }

    #[tokio::test]
    async fn test_renders_with_host_document_context() {
        let renderer = Arc::new(RecordingRenderer::default());
        let builder = EmbedBuilder::new(renderer.clone());

        builder
            .render(&CanvasNode::text("abc", "x"), "boards/plan.canvas", "notes/day.md")
            .await
            .unwrap();

        assert_eq!(*renderer.contexts.lock(), vec!["notes/day.md".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_text_renders_empty() {
        let builder = EmbedBuilder::new(Arc::new(RecordingRenderer::default()));
        let content = builder
            .build(&CanvasNode::new("abc", "text"), "n.md")
            .await
            .unwrap();
        assert_eq!(content.find_class("el-p").unwrap().to_html(), "<div class=\"el-p\"></div>");
    }

    #[tokio::test]
    async fn test_render_failure_propagates() {
        let builder = EmbedBuilder::new(Arc::new(BrokenRenderer));
        let err = builder
            .build(&CanvasNode::text("abc", "x"), "n.md")
            .await
            .unwrap_err();
        assert_eq!(err, EmbedError::render("formatter crashed"));
    }

    #[test]
    fn test_link_icon_contract() {
        let builder = EmbedBuilder::new(Arc::new(RecordingRenderer::default()));
        let icon = builder.link_icon(&CanvasNode::text("beef", "x"), "boards/plan.canvas");

        assert_eq!(icon.attr("src"), Some("boards/plan.canvas#beef"));
        assert_eq!(icon.attr("aria-label"), Some("Open in canvas"));
        assert_eq!(icon.style("position"), Some("absolute"));
        assert_eq!(icon.style("top"), Some("8px"));
        assert_eq!(icon.style("right"), Some("8px"));
        assert_eq!(icon.style("cursor"), Some("pointer"));
        assert_eq!(icon.style("opacity"), Some("0.6"));
        assert!(icon.listeners.contains(&Listener::new(
            EventKind::MouseEnter,
            ListenerAction::SetStyle {
                property: "opacity".into(),
                value: "1".into()
            }
        )));
        assert!(icon.listeners.contains(&Listener::new(
            EventKind::Click,
            ListenerAction::OpenDocument("boards/plan.canvas".into())
        )));
    }

    #[tokio::test]
    async fn test_link_icon_can_be_disabled() {
        let builder = EmbedBuilder::new(Arc::new(RecordingRenderer::default())).with_link_icon(
            LinkIconOptions {
                enabled: false,
                ..Default::default()
            },
        );
        let rendered = builder
            .render(&CanvasNode::text("abc", "x"), "a.canvas", "n.md")
            .await
            .unwrap();
        assert!(rendered.link_icon.is_none());
        assert_eq!(rendered.into_nodes().len(), 1);
    }
}
