//! Mutation subscriptions.
//!
//! A [`Subscription`] owns one registration on a [`MutationSource`] and
//! removes it when stopped or dropped, so a stopped observer never hears
//! about later insertions.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::trace;

use canvas_embed_render::{DocumentTree, ElementId, MutationBatch, MutationOptions};

/// Anything that reports structural insertions.
pub trait MutationSource: Send + Sync {
    /// Register for insertions at or below `root`.
    fn register(
        &self,
        root: ElementId,
        options: MutationOptions,
    ) -> (u64, mpsc::UnboundedReceiver<MutationBatch>);

    /// Remove a registration. Returns false if it was already gone.
    fn unregister(&self, id: u64) -> bool;
}

impl MutationSource for Mutex<DocumentTree> {
    fn register(
        &self,
        root: ElementId,
        options: MutationOptions,
    ) -> (u64, mpsc::UnboundedReceiver<MutationBatch>) {
        self.lock().subscribe(root, options)
    }

    fn unregister(&self, id: u64) -> bool {
        self.lock().unsubscribe(id)
    }
}

/// A live registration on a [`MutationSource`].
pub struct Subscription {
    source: Arc<dyn MutationSource>,
    id: u64,
    receiver: mpsc::UnboundedReceiver<MutationBatch>,
    active: bool,
}

impl Subscription {
    pub fn open(source: Arc<dyn MutationSource>, root: ElementId, options: MutationOptions) -> Self {
        let (id, receiver) = source.register(root, options);
        trace!(subscription = id, "Mutation subscription opened");
        Self {
            source,
            id,
            receiver,
            active: true,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Next batch, or `None` once the subscription is closed.
    pub async fn recv(&mut self) -> Option<MutationBatch> {
        self.receiver.recv().await
    }

    /// Next batch if one is already queued.
    pub fn try_recv(&mut self) -> Option<MutationBatch> {
        self.receiver.try_recv().ok()
    }

    /// Unregister from the source. Batches already queued are discarded.
    pub fn close(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.source.unregister(self.id);
        self.receiver.close();
        while self.receiver.try_recv().is_ok() {}
        trace!(subscription = self.id, "Mutation subscription closed");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_embed_render::Element;

    #[test]
    fn test_receives_batches_until_closed() {
        let tree = DocumentTree::new().shared();
        let root = tree.lock().root();
        let mut sub = Subscription::open(tree.clone(), root, MutationOptions::subtree());

        let added = tree.lock().append(root, Element::div()).unwrap();
        assert_eq!(sub.try_recv().unwrap().added, vec![added]);

        sub.close();
        assert!(!sub.is_active());
        assert_eq!(tree.lock().subscriber_count(), 0);

        tree.lock().append(root, Element::div());
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn test_drop_unregisters() {
        let tree = DocumentTree::new().shared();
        let root = tree.lock().root();
        {
            let _sub = Subscription::open(tree.clone(), root, MutationOptions::subtree());
            assert_eq!(tree.lock().subscriber_count(), 1);
        }
        assert_eq!(tree.lock().subscriber_count(), 0);
    }

    #[test]
    fn test_direct_children_only() {
        let tree = DocumentTree::new().shared();
        let root = tree.lock().root();
        let section = tree.lock().append(root, Element::div()).unwrap();
        let mut sub = Subscription::open(
            tree.clone(),
            root,
            MutationOptions {
                subtree: false,
                child_list: true,
            },
        );

        tree.lock().append(section, Element::div());
        assert!(sub.try_recv().is_none());

        tree.lock().append(root, Element::div());
        assert!(sub.try_recv().is_some());
    }
}
