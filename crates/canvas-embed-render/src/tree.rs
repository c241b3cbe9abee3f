//! Document tree
//!
//! An arena of elements, text and raw HTML nodes rooted at a `body` element.
//! It models the parts of a browser DOM the embed pipeline relies on:
//!
//! - class/attribute/style bookkeeping and simple selectors
//! - child-list mutation notifications delivered as [`MutationBatch`]es to
//!   subscribers of a subtree
//! - click/hover event dispatch with capture, target and bubble phases
//!
//! Structures are usually built detached as owned [`Element`] values and then
//! grafted in with [`DocumentTree::append`], which assigns ids and notifies
//! subscribers once per call.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::trace;

/// Tree shared between the host and the embed observer. Never hold the lock
/// across an `.await`.
pub type SharedTree = Arc<Mutex<DocumentTree>>;

/// Handle to a node in a [`DocumentTree`]. Ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

impl ElementId {
    pub fn index(&self) -> usize {
        self.0
    }
}

// ============================================================================
// Detached nodes
// ============================================================================

/// A node not (yet) attached to a tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    /// Text content, escaped on serialization.
    Text(String),
    /// Pre-rendered markup, emitted verbatim.
    Html(String),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn html(html: impl Into<String>) -> Self {
        Self::Html(html.into())
    }

    fn write_html(&self, out: &mut String) {
        match self {
            Self::Element(el) => {
                el.write_open_tag(out);
                for child in &el.children {
                    child.write_html(out);
                }
                el.write_close_tag(out);
            }
            Self::Text(text) => out.push_str(&escape_html(text)),
            Self::Html(html) => out.push_str(html),
        }
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Self::Element(el)
    }
}

/// Events the tree can dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    MouseEnter,
    MouseLeave,
}

/// What a listener does when it fires.
#[derive(Debug, Clone, PartialEq)]
pub enum ListenerAction {
    /// Stop propagation (including remaining listeners on the same element)
    /// and prevent the host's default handling.
    SuppressDefault,
    /// Ask the host to open a document.
    OpenDocument(String),
    /// Set an inline style on the element the listener is attached to.
    SetStyle { property: String, value: String },
}

/// An event listener attached to an element.
#[derive(Debug, Clone, PartialEq)]
pub struct Listener {
    pub event: EventKind,
    /// Fire during the capture phase instead of the bubble phase.
    pub capture: bool,
    pub action: ListenerAction,
}

impl Listener {
    pub fn new(event: EventKind, action: ListenerAction) -> Self {
        Self {
            event,
            capture: false,
            action,
        }
    }

    #[must_use]
    pub fn capturing(mut self) -> Self {
        self.capture = true;
        self
    }
}

/// Element selector: optional class plus attribute constraints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selector {
    pub class: Option<String>,
    pub has_attribute: Option<String>,
    /// Excludes elements whose attribute equals the value.
    pub attribute_not: Option<(String, String)>,
}

impl Selector {
    pub fn class(class: impl Into<String>) -> Self {
        Self {
            class: Some(class.into()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>) -> Self {
        self.has_attribute = Some(name.into());
        self
    }

    #[must_use]
    pub fn without_attribute_value(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.attribute_not = Some((name.into(), value.into()));
        self
    }
}

/// An element: tag, classes, attributes, inline styles, listeners, children.
///
/// Inside a [`DocumentTree`] the `children` vector is always empty; the tree
/// tracks children by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub tag: String,
    pub classes: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    /// Inline styles in insertion order.
    pub styles: Vec<(String, String)>,
    pub listeners: Vec<Listener>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn div() -> Self {
        Self::new("div")
    }

    #[must_use]
    pub fn with_class(mut self, class: &str) -> Self {
        self.add_class(class);
        self
    }

    #[must_use]
    pub fn with_classes(mut self, classes: &[&str]) -> Self {
        for class in classes {
            self.add_class(class);
        }
        self
    }

    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    #[must_use]
    pub fn with_style(mut self, property: &str, value: &str) -> Self {
        self.set_style(property, value);
        self
    }

    #[must_use]
    pub fn with_listener(mut self, listener: Listener) -> Self {
        self.listeners.push(listener);
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn push(&mut self, child: impl Into<Node>) {
        self.children.push(child.into());
    }

    pub fn add_class(&mut self, class: &str) {
        if !self.has_class(class) {
            self.classes.push(class.to_string());
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn style(&self, property: &str) -> Option<&str> {
        self.styles
            .iter()
            .find(|(p, _)| p == property)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_style(&mut self, property: &str, value: &str) {
        match self.styles.iter_mut().find(|(p, _)| p == property) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.styles.push((property.to_string(), value.to_string())),
        }
    }

    pub fn matches(&self, selector: &Selector) -> bool {
        if let Some(class) = &selector.class {
            if !self.has_class(class) {
                return false;
            }
        }
        if let Some(name) = &selector.has_attribute {
            if !self.attributes.contains_key(name) {
                return false;
            }
        }
        if let Some((name, value)) = &selector.attribute_not {
            if self.attr(name) == Some(value.as_str()) {
                return false;
            }
        }
        true
    }

    /// First detached descendant (depth-first) carrying `class`.
    pub fn find_class(&self, class: &str) -> Option<&Element> {
        self.children.iter().find_map(|child| match child {
            Node::Element(el) if el.has_class(class) => Some(el),
            Node::Element(el) => el.find_class(class),
            _ => None,
        })
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        Node::Element(self.clone()).write_html(&mut out);
        out
    }

    fn write_open_tag(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        if !self.classes.is_empty() {
            let _ = write!(out, " class=\"{}\"", escape_html(&self.classes.join(" ")));
        }
        for (name, value) in &self.attributes {
            let _ = write!(out, " {}=\"{}\"", name, escape_html(value));
        }
        if !self.styles.is_empty() {
            let style = self
                .styles
                .iter()
                .map(|(p, v)| format!("{p}: {v};"))
                .collect::<Vec<_>>()
                .join(" ");
            let _ = write!(out, " style=\"{}\"", escape_html(&style));
        }
        out.push('>');
    }

    fn write_close_tag(&self, out: &mut String) {
        let _ = write!(out, "</{}>", self.tag);
    }
}

/// Escape text for HTML content and double-quoted attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

// ============================================================================
// Mutation notifications
// ============================================================================

/// What a subscriber wants to hear about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationOptions {
    /// Report insertions anywhere below the subscription root, not only
    /// direct children.
    pub subtree: bool,
    /// Report child insertions at all.
    pub child_list: bool,
}

impl MutationOptions {
    /// Child insertions anywhere in the subtree.
    pub fn subtree() -> Self {
        Self {
            subtree: true,
            child_list: true,
        }
    }
}

/// Nodes inserted by a single tree operation. Only the top of each inserted
/// structure is listed; its descendants arrived with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationBatch {
    pub added: Vec<ElementId>,
}

struct Subscriber {
    id: u64,
    root: ElementId,
    options: MutationOptions,
    sender: mpsc::UnboundedSender<MutationBatch>,
}

// ============================================================================
// Event dispatch
// ============================================================================

/// Requests raised by listeners for the host to carry out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostAction {
    OpenDocument(String),
}

/// Result of [`DocumentTree::dispatch`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchOutcome {
    pub actions: Vec<HostAction>,
    pub propagation_stopped: bool,
    /// The host must skip its own default handling of the event.
    pub default_prevented: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Capture,
    Target,
    Bubble,
}

// ============================================================================
// Tree
// ============================================================================

#[derive(Debug)]
enum Content {
    Element(Element),
    Text(String),
    Html(String),
}

#[derive(Debug)]
struct Entry {
    content: Content,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
}

/// Document tree keyed by [`ElementId`]. Removed subtrees are dropped from
/// the map; ids keep counting up so a stale id never names a new node.
pub struct DocumentTree {
    entries: HashMap<ElementId, Entry>,
    next_id: usize,
    root: ElementId,
    subscribers: Vec<Subscriber>,
    next_subscriber: u64,
}

impl Default for DocumentTree {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DocumentTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentTree")
            .field("nodes", &self.len())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl DocumentTree {
    /// Empty tree with a `body` root.
    pub fn new() -> Self {
        let root = Entry {
            content: Content::Element(Element::new("body")),
            parent: None,
            children: Vec::new(),
        };
        Self {
            entries: HashMap::from([(ElementId(0), root)]),
            next_id: 1,
            root: ElementId(0),
            subscribers: Vec::new(),
            next_subscriber: 0,
        }
    }

    pub fn shared(self) -> SharedTree {
        Arc::new(Mutex::new(self))
    }

    pub fn root(&self) -> ElementId {
        self.root
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.entries.contains_key(&id)
    }

    fn entry(&self, id: ElementId) -> Option<&Entry> {
        self.entries.get(&id)
    }

    fn entry_mut(&mut self, id: ElementId) -> Option<&mut Entry> {
        self.entries.get_mut(&id)
    }

    /// The element at `id`, if it is a live element (not text).
    pub fn get(&self, id: ElementId) -> Option<&Element> {
        match &self.entry(id)?.content {
            Content::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        match &mut self.entry_mut(id)?.content {
            Content::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.entry(id).map(|e| e.children.as_slice()).unwrap_or(&[])
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.entry(id)?.parent
    }

    /// Whether `id` lies strictly below `ancestor`.
    pub fn is_descendant(&self, id: ElementId, ancestor: ElementId) -> bool {
        let mut current = self.parent(id);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parent(parent);
        }
        false
    }

    /// Attach `node` as the last child of `parent`. Returns `None` if `parent`
    /// is not a live element.
    pub fn append(&mut self, parent: ElementId, node: impl Into<Node>) -> Option<ElementId> {
        self.append_all(parent, vec![node.into()])?.into_iter().next()
    }

    /// Attach several nodes under `parent`, reported as one mutation batch.
    pub fn append_all(&mut self, parent: ElementId, nodes: Vec<Node>) -> Option<Vec<ElementId>> {
        self.get(parent)?;

        let mut added = Vec::with_capacity(nodes.len());
        for node in nodes {
            let id = self.graft(parent, node);
            added.push(id);
        }
        if let Some(entry) = self.entry_mut(parent) {
            entry.children.extend(added.iter().copied());
        }

        self.notify(parent, &added);
        Some(added)
    }

    fn graft(&mut self, parent: ElementId, node: Node) -> ElementId {
        let (content, children) = match node {
            Node::Element(mut el) => {
                let children = std::mem::take(&mut el.children);
                (Content::Element(el), children)
            }
            Node::Text(text) => (Content::Text(text), Vec::new()),
            Node::Html(html) => (Content::Html(html), Vec::new()),
        };

        let id = ElementId(self.next_id);
        self.next_id += 1;
        self.entries.insert(
            id,
            Entry {
                content,
                parent: Some(parent),
                children: Vec::new(),
            },
        );

        for child in children {
            let child_id = self.graft(id, child);
            if let Some(entry) = self.entry_mut(id) {
                entry.children.push(child_id);
            }
        }
        id
    }

    /// Remove every child of `id` (and their subtrees). Returns how many nodes
    /// were dropped.
    pub fn clear_children(&mut self, id: ElementId) -> usize {
        let children = match self.entry_mut(id) {
            Some(entry) => std::mem::take(&mut entry.children),
            None => return 0,
        };

        let mut removed = 0;
        let mut pending = children;
        while let Some(child) = pending.pop() {
            if let Some(entry) = self.entries.remove(&child) {
                removed += 1;
                pending.extend(entry.children);
            }
        }
        removed
    }

    /// Whether the element at `id` matches `selector`.
    pub fn matches(&self, id: ElementId, selector: &Selector) -> bool {
        self.get(id).is_some_and(|el| el.matches(selector))
    }

    /// Descendants of `id` (not `id` itself) matching `selector`, in
    /// document order.
    pub fn query_all(&self, id: ElementId, selector: &Selector) -> Vec<ElementId> {
        let mut found = Vec::new();
        let mut stack: Vec<ElementId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            if self.matches(current, selector) {
                found.push(current);
            }
            stack.extend(self.children(current).iter().rev().copied());
        }
        found
    }

    // ------------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------------

    /// Receive a [`MutationBatch`] for every insertion at or below `root`.
    pub fn subscribe(
        &mut self,
        root: ElementId,
        options: MutationOptions,
    ) -> (u64, mpsc::UnboundedReceiver<MutationBatch>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self.next_subscriber;
        self.next_subscriber += 1;
        self.subscribers.push(Subscriber {
            id,
            root,
            options,
            sender,
        });
        (id, receiver)
    }

    /// Drop a subscription. Its receiver sees the channel close.
    pub fn unsubscribe(&mut self, subscriber: u64) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != subscriber);
        before != self.subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn notify(&mut self, parent: ElementId, added: &[ElementId]) {
        if added.is_empty() {
            return;
        }
        for sub in &self.subscribers {
            if !sub.options.child_list {
                continue;
            }
            let relevant = parent == sub.root
                || (sub.options.subtree && self.is_descendant(parent, sub.root));
            if relevant {
                trace!(subscriber = sub.id, added = added.len(), "Delivering mutation batch");
                let _ = sub.sender.send(MutationBatch {
                    added: added.to_vec(),
                });
            }
        }
        self.subscribers.retain(|s| !s.sender.is_closed());
    }

    // ------------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------------

    /// Dispatch `event` at `target`: capture listeners from the root down,
    /// every listener on the target, then bubble listeners back up.
    pub fn dispatch(&mut self, target: ElementId, event: EventKind) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        if self.get(target).is_none() {
            return outcome;
        }

        let mut path = vec![target];
        let mut current = self.parent(target);
        while let Some(id) = current {
            path.push(id);
            current = self.parent(id);
        }
        path.reverse();
        let ancestors = &path[..path.len() - 1];

        for &id in ancestors {
            if self.fire(id, event, Phase::Capture, &mut outcome) {
                return outcome;
            }
        }
        if self.fire(target, event, Phase::Target, &mut outcome) {
            return outcome;
        }
        for &id in ancestors.iter().rev() {
            if self.fire(id, event, Phase::Bubble, &mut outcome) {
                return outcome;
            }
        }
        outcome
    }

    /// Run matching listeners on `id`. Returns true when propagation stopped.
    fn fire(
        &mut self,
        id: ElementId,
        event: EventKind,
        phase: Phase,
        outcome: &mut DispatchOutcome,
    ) -> bool {
        let listeners: Vec<Listener> = match self.get(id) {
            Some(el) => el
                .listeners
                .iter()
                .filter(|l| l.event == event)
                .filter(|l| match phase {
                    Phase::Capture => l.capture,
                    Phase::Target => true,
                    Phase::Bubble => !l.capture,
                })
                .cloned()
                .collect(),
            None => return false,
        };

        for listener in listeners {
            match listener.action {
                ListenerAction::SuppressDefault => {
                    outcome.propagation_stopped = true;
                    outcome.default_prevented = true;
                    return true;
                }
                ListenerAction::OpenDocument(path) => {
                    outcome.actions.push(HostAction::OpenDocument(path));
                }
                ListenerAction::SetStyle { property, value } => {
                    if let Some(el) = self.get_mut(id) {
                        el.set_style(&property, &value);
                    }
                }
            }
        }
        false
    }

    // ------------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------------

    /// Serialize the subtree at `id` (inclusive) as HTML.
    pub fn to_html(&self, id: ElementId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    /// Serialize only the children of `id`.
    pub fn inner_html(&self, id: ElementId) -> String {
        let mut out = String::new();
        for &child in self.children(id) {
            self.write_html(child, &mut out);
        }
        out
    }

    fn write_html(&self, id: ElementId, out: &mut String) {
        let Some(entry) = self.entry(id) else {
            return;
        };
        match &entry.content {
            Content::Element(el) => {
                el.write_open_tag(out);
                for &child in &entry.children {
                    self.write_html(child, out);
                }
                el.write_close_tag(out);
            }
            Content::Text(text) => out.push_str(&escape_html(text)),
            Content::Html(html) => out.push_str(html),
        }
    }
}
