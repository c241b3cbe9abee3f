//! Embed observer
//!
//! Watches the document tree for inserted embed placeholders whose `src` is a
//! canvas node reference and replaces their content with the rendered node.
//!
//! Each placeholder is claimed exactly once: the claim (registry test-and-set
//! plus the `data-node-embed` marker) happens under the tree lock before any
//! suspension point, so duplicate or overlapping mutation batches never start
//! a second resolution for the same element.
//!
//! While running, each batch is claimed inline in the watch loop and its
//! resolutions are handed to a [`JoinSet`], so a slow canvas read never
//! holds up placeholders from later batches.

use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{debug, error, info, trace, warn};

use canvas_embed_config::WatchConfig;
use canvas_embed_core::{CanvasLoader, EmbedError, NodeReference, Result, Workspace};
use canvas_embed_render::{
    ElementId, EmbedBuilder, EventKind, Listener, ListenerAction, MutationBatch, MutationOptions,
    RenderedEmbed, Selector, SharedTree,
};

use crate::mutation::Subscription;
use crate::state::{PlaceholderRegistry, PlaceholderState};

/// Attribute written onto claimed placeholders.
pub const NODE_EMBED_ATTR: &str = "data-node-embed";

/// Result of resolving one placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionOutcome {
    pub placeholder: ElementId,
    /// Raw `src` attribute of the placeholder.
    pub src: String,
    pub state: PlaceholderState,
    pub error: Option<EmbedError>,
}

impl ResolutionOutcome {
    pub fn is_rendered(&self) -> bool {
        self.state == PlaceholderState::Rendered
    }
}

struct Pipeline {
    tree: SharedTree,
    loader: CanvasLoader,
    workspace: Arc<dyn Workspace>,
    builder: EmbedBuilder,
    selector: Selector,
    marker: String,
    registry: PlaceholderRegistry,
    events: Mutex<Option<mpsc::UnboundedSender<ResolutionOutcome>>>,
}

/// Resolves canvas node embeds as they appear in a [`SharedTree`].
pub struct EmbedObserver {
    pipeline: Arc<Pipeline>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl EmbedObserver {
    pub fn new(
        tree: SharedTree,
        loader: CanvasLoader,
        workspace: Arc<dyn Workspace>,
        builder: EmbedBuilder,
        config: &WatchConfig,
    ) -> Self {
        let selector = Selector::class(&config.placeholder_class)
            .with_attribute("src")
            .without_attribute_value(NODE_EMBED_ATTR, &config.processed_marker);

        Self {
            pipeline: Arc::new(Pipeline {
                tree,
                loader,
                workspace,
                builder,
                selector,
                marker: config.processed_marker.clone(),
                registry: PlaceholderRegistry::new(),
                events: Mutex::new(None),
            }),
            shutdown_tx: None,
            task: None,
        }
    }

    /// Report every [`ResolutionOutcome`] to `sender`.
    #[must_use]
    pub fn with_event_sender(self, sender: mpsc::UnboundedSender<ResolutionOutcome>) -> Self {
        self.set_event_sender(sender);
        self
    }

    pub fn set_event_sender(&self, sender: mpsc::UnboundedSender<ResolutionOutcome>) {
        *self.pipeline.events.lock() = Some(sender);
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Current state of a placeholder.
    pub fn state(&self, placeholder: ElementId) -> PlaceholderState {
        self.pipeline.registry.state(placeholder)
    }

    pub fn registry(&self) -> &PlaceholderRegistry {
        &self.pipeline.registry
    }

    /// Subscribe to the tree and start resolving inserted placeholders.
    pub async fn start(&mut self) -> Result<()> {
        if self.task.is_some() {
            return Err(EmbedError::AlreadyRunning);
        }

        info!("Starting embed observer");

        let root = self.pipeline.tree.lock().root();
        let mut subscription = Subscription::open(
            self.pipeline.tree.clone(),
            root,
            MutationOptions::subtree(),
        );
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let pipeline = Arc::clone(&self.pipeline);

        let task = tokio::spawn(async move {
            let mut in_flight = JoinSet::new();
            loop {
                tokio::select! {
                    Some(batch) = subscription.recv() => {
                        trace!(added = batch.added.len(), "Mutation batch received");
                        let claimed = pipeline.claim(&batch);
                        if claimed.is_empty() {
                            continue;
                        }
                        let pipeline = Arc::clone(&pipeline);
                        in_flight.spawn(async move {
                            pipeline.resolve_claimed(claimed).await;
                        });
                    }
                    Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                        log_join(joined);
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("Embed observer loop shutting down");
                        break;
                    }
                    else => break,
                }
            }

            if !in_flight.is_empty() {
                debug!(pending = in_flight.len(), "Waiting for in-flight embed resolutions");
            }
            while let Some(joined) = in_flight.join_next().await {
                log_join(joined);
            }
            subscription.close();
        });

        self.shutdown_tx = Some(shutdown_tx);
        self.task = Some(task);
        Ok(())
    }

    /// Stop watching. In-flight resolutions finish first. No-op when stopped.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };

        info!("Stopping embed observer");

        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(()).await;
        }
        task.await
            .map_err(|e| EmbedError::Internal(format!("observer task failed: {e}")))?;

        info!("Embed observer stopped");
        Ok(())
    }

    /// Resolve every unprocessed placeholder in `batch`. Resolutions run
    /// concurrently; one outcome is returned per claimed placeholder.
    pub async fn process_batch(&self, batch: MutationBatch) -> Vec<ResolutionOutcome> {
        self.pipeline.process_batch(batch).await
    }
}

impl Drop for EmbedObserver {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Pipeline {
    async fn process_batch(&self, batch: MutationBatch) -> Vec<ResolutionOutcome> {
        let claimed = self.claim(&batch);
        self.resolve_claimed(claimed).await
    }

    /// Resolve already-claimed placeholders concurrently and report outcomes.
    async fn resolve_claimed(&self, claimed: Vec<(ElementId, String)>) -> Vec<ResolutionOutcome> {
        if claimed.is_empty() {
            return Vec::new();
        }

        debug!(count = claimed.len(), "Resolving canvas node embeds");
        let outcomes = join_all(
            claimed
                .into_iter()
                .map(|(placeholder, src)| self.resolve(placeholder, src)),
        )
        .await;

        let events = self.events.lock().clone();
        if let Some(events) = events {
            for outcome in &outcomes {
                let _ = events.send(outcome.clone());
            }
        }
        outcomes
    }

    /// Find unprocessed placeholders among the inserted nodes and claim them.
    fn claim(&self, batch: &MutationBatch) -> Vec<(ElementId, String)> {
        let mut tree = self.tree.lock();

        let mut candidates = Vec::new();
        for &added in &batch.added {
            if tree.matches(added, &self.selector) {
                candidates.push(added);
            } else {
                candidates.extend(tree.query_all(added, &self.selector));
            }
        }

        let mut claimed = Vec::with_capacity(candidates.len());
        for placeholder in candidates {
            if !self.registry.claim(placeholder) {
                trace!(?placeholder, "Placeholder already claimed");
                continue;
            }
            let Some(element) = tree.get_mut(placeholder) else {
                self.registry.finish(placeholder, PlaceholderState::Failed);
                continue;
            };
            element.set_attr(NODE_EMBED_ATTR, self.marker.as_str());
            let src = element.attr("src").unwrap_or_default().to_string();
            claimed.push((placeholder, src));
        }

        let pruned = self.registry.prune(|id| tree.contains(id));
        if pruned > 0 {
            trace!(pruned, "Forgot placeholders no longer in the tree");
        }
        claimed
    }

    async fn resolve(&self, placeholder: ElementId, src: String) -> ResolutionOutcome {
        let result = self.render(placeholder, &src).await;
        let state = match &result {
            Ok(()) => PlaceholderState::Rendered,
            Err(e) => {
                log_failure(&src, e);
                PlaceholderState::Failed
            }
        };
        self.registry.finish(placeholder, state);

        ResolutionOutcome {
            placeholder,
            src,
            state,
            error: result.err(),
        }
    }

    async fn render(&self, placeholder: ElementId, src: &str) -> Result<()> {
        let reference = NodeReference::parse(src)?;
        let host_path = self.workspace.active_document().ok_or_else(|| {
            EmbedError::not_found("no active document to resolve the embed against")
        })?;

        let canvas_path = self
            .loader
            .store()
            .resolve_link_path(&reference.canvas_path, &host_path)
            .await
            .ok_or_else(|| EmbedError::not_found(format!("canvas {}", reference.canvas_path)))?;

        let node = self.loader.find_node(&canvas_path, &reference.node_id).await?;
        let rendered = self.builder.render(&node, &canvas_path, &host_path).await?;

        self.install(placeholder, rendered)?;
        debug!(src, canvas = %canvas_path, host = %host_path, "Rendered canvas node embed");
        Ok(())
    }

    /// Swap the placeholder's content for the rendered embed.
    fn install(&self, placeholder: ElementId, rendered: RenderedEmbed) -> Result<()> {
        let mut tree = self.tree.lock();
        if !tree.contains(placeholder) {
            return Err(EmbedError::not_found("placeholder was removed before rendering"));
        }

        tree.clear_children(placeholder);
        tree.append_all(placeholder, rendered.into_nodes())
            .ok_or_else(|| EmbedError::Internal("placeholder is not an element".to_string()))?;

        let element = tree
            .get_mut(placeholder)
            .ok_or_else(|| EmbedError::Internal("placeholder is not an element".to_string()))?;
        element.add_class("markdown-embed");
        element.set_attr("data-type", "block");
        element.set_style("position", "relative");
        // Bubble phase: the link icon's own click handler runs before this.
        element
            .listeners
            .push(Listener::new(EventKind::Click, ListenerAction::SuppressDefault));
        Ok(())
    }
}

fn log_join(joined: std::result::Result<(), JoinError>) {
    if let Err(e) = joined {
        if !e.is_cancelled() {
            error!(error = %e, "Embed resolution task failed");
        }
    }
}

fn log_failure(src: &str, error: &EmbedError) {
    match error {
        EmbedError::Parse(_) => debug!(src, error = %error, "Embed is not a canvas node reference"),
        EmbedError::NotFound(_) | EmbedError::Decode { .. } => {
            warn!(src, error = %error, "Could not resolve canvas node embed")
        }
        _ => error!(src, error = %error, kind = error.kind(), "Failed to render canvas node embed"),
    }
}
