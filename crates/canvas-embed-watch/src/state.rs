//! Placeholder processing state.

use std::collections::HashMap;

use parking_lot::Mutex;

use canvas_embed_render::ElementId;

/// Lifecycle of one embed placeholder.
///
/// `Unseen -> Processing -> Rendered | Failed`. Both end states are terminal;
/// a failed placeholder is not retried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PlaceholderState {
    #[default]
    Unseen,
    Processing,
    Rendered,
    Failed,
}

impl PlaceholderState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rendered | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unseen => "unseen",
            Self::Processing => "processing",
            Self::Rendered => "rendered",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PlaceholderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of every placeholder an observer has seen.
#[derive(Debug, Default)]
pub struct PlaceholderRegistry {
    states: Mutex<HashMap<ElementId, PlaceholderState>>,
}

impl PlaceholderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `id` from `Unseen` to `Processing`. Returns false if it was
    /// already claimed.
    pub fn claim(&self, id: ElementId) -> bool {
        let mut states = self.states.lock();
        let state = states.entry(id).or_default();
        if *state != PlaceholderState::Unseen {
            return false;
        }
        *state = PlaceholderState::Processing;
        true
    }

    /// Record the end state of a claimed placeholder. Ignored if the entry
    /// was pruned in the meantime.
    pub fn finish(&self, id: ElementId, state: PlaceholderState) {
        debug_assert!(state.is_terminal());
        if let Some(current) = self.states.lock().get_mut(&id) {
            *current = state;
        }
    }

    /// Drop every entry for which `keep` returns false. Returns how many were
    /// dropped.
    pub fn prune(&self, mut keep: impl FnMut(ElementId) -> bool) -> usize {
        let mut states = self.states.lock();
        let before = states.len();
        states.retain(|id, _| keep(*id));
        before - states.len()
    }

    pub fn state(&self, id: ElementId) -> PlaceholderState {
        self.states.lock().get(&id).copied().unwrap_or_default()
    }

    /// How many placeholders are in `state`.
    pub fn count(&self, state: PlaceholderState) -> usize {
        self.states.lock().values().filter(|s| **s == state).count()
    }

    pub fn len(&self) -> usize {
        self.states.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_embed_render::{DocumentTree, Element};

    fn ids(n: usize) -> Vec<ElementId> {
        let mut tree = DocumentTree::new();
        let root = tree.root();
        (0..n)
            .map(|_| tree.append(root, Element::div()).unwrap())
            .collect()
    }

    #[test]
    fn test_claim_is_test_and_set() {
        let registry = PlaceholderRegistry::new();
        let id = ids(1)[0];

        assert_eq!(registry.state(id), PlaceholderState::Unseen);
        assert!(registry.claim(id));
        assert!(!registry.claim(id));
        assert_eq!(registry.state(id), PlaceholderState::Processing);
    }

    #[test]
    fn test_terminal_states_are_not_reclaimed() {
        let registry = PlaceholderRegistry::new();
        let placeholders = ids(2);
        let (a, b) = (placeholders[0], placeholders[1]);

        registry.claim(a);
        registry.finish(a, PlaceholderState::Failed);
        registry.claim(b);
        registry.finish(b, PlaceholderState::Rendered);

        assert!(!registry.claim(a));
        assert!(!registry.claim(b));
        assert_eq!(registry.count(PlaceholderState::Failed), 1);
        assert_eq!(registry.count(PlaceholderState::Rendered), 1);
    }

    #[test]
    fn test_prune_forgets_removed_placeholders() {
        let registry = PlaceholderRegistry::new();
        let placeholders = ids(3);

        for &id in &placeholders {
            registry.claim(id);
        }
        registry.finish(placeholders[0], PlaceholderState::Rendered);

        let removed = registry.prune(|id| id == placeholders[2]);
        assert_eq!(removed, 2);
        assert_eq!(registry.len(), 1);

        registry.finish(placeholders[1], PlaceholderState::Failed);
        assert_eq!(registry.state(placeholders[1]), PlaceholderState::Unseen);
        assert_eq!(registry.len(), 1);
    }
}
