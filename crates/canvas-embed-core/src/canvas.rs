use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A `.canvas` document: an ordered node list plus whatever else the host
/// stored alongside it (edges, metadata), kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanvasDocument {
    #[serde(default)]
    pub nodes: Vec<CanvasNode>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CanvasDocument {
    pub fn new(nodes: Vec<CanvasNode>) -> Self {
        Self {
            nodes,
            extra: Map::new(),
        }
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// First node whose id equals `id`.
    pub fn find_node(&self, id: &str) -> Option<&CanvasNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Nodes whose ids appear in `ids`, in canvas order.
    pub fn select<S: AsRef<str>>(&self, ids: &[S]) -> Vec<CanvasNode> {
        self.nodes
            .iter()
            .filter(|node| ids.iter().any(|id| id.as_ref() == node.id))
            .cloned()
            .collect()
    }
}

/// Node type tag as interpreted by the embed pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Text,
    Other(String),
}

impl NodeKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::File => "file",
            Self::Text => "text",
            Self::Other(tag) => tag,
        }
    }
}

/// A single canvas card.
///
/// Only `id`, `type`, `text` and `file` are interpreted. Geometry, colors and
/// unknown keys are carried in `properties` so a decode/encode cycle does not
/// lose them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasNode {
    pub id: String,
    #[serde(rename = "type", default)]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl CanvasNode {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            text: None,
            file: None,
            properties: Map::new(),
        }
    }

    /// A `text` card with markdown content.
    pub fn text(id: impl Into<String>, text: impl Into<String>) -> Self {
        let mut node = Self::new(id, "text");
        node.text = Some(text.into());
        node
    }

    /// A `file` card pointing at another document in the kiln.
    pub fn file(id: impl Into<String>, file: impl Into<String>) -> Self {
        let mut node = Self::new(id, "file");
        node.file = Some(file.into());
        node
    }

    pub fn kind(&self) -> NodeKind {
        match self.node_type.as_str() {
            "file" => NodeKind::File,
            "text" => NodeKind::Text,
            other => NodeKind::Other(other.to_string()),
        }
    }

    /// Text content, or the empty string for cards without any.
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"{
        "nodes": [
            {"id": "a1b2", "type": "text", "text": "# Hello", "x": 0, "y": 0, "width": 250, "height": 60},
            {"id": "c3d4", "type": "file", "file": "images/x.png", "x": 300, "y": 0},
            {"id": "e5f6", "type": "group", "label": "Cluster"}
        ],
        "edges": [
            {"id": "edge1", "fromNode": "a1b2", "toNode": "c3d4"}
        ]
    }"##;

    #[test]
    fn test_decode_sample_canvas() {
        let doc = CanvasDocument::from_json(SAMPLE).unwrap();
        assert_eq!(doc.nodes.len(), 3);
        assert_eq!(doc.nodes[0].kind(), NodeKind::Text);
        assert_eq!(doc.nodes[0].text_or_empty(), "# Hello");
        assert_eq!(doc.nodes[1].kind(), NodeKind::File);
        assert_eq!(doc.nodes[1].file.as_deref(), Some("images/x.png"));
        assert_eq!(doc.nodes[2].kind(), NodeKind::Other("group".to_string()));
        assert!(doc.extra.contains_key("edges"));
    }

    #[test]
    fn test_unknown_fields_survive_reencode() {
        let doc = CanvasDocument::from_json(SAMPLE).unwrap();
        let encoded = doc.to_json().unwrap();
        let value: Value = serde_json::from_str(&encoded).unwrap();

        assert_eq!(value["nodes"][0]["width"], 250);
        assert_eq!(value["nodes"][2]["label"], "Cluster");
        assert_eq!(value["edges"][0]["fromNode"], "a1b2");
    }

    #[test]
    fn test_empty_canvas_has_no_nodes() {
        let doc = CanvasDocument::from_json("{}").unwrap();
        assert!(doc.nodes.is_empty());
        assert!(doc.find_node("abc").is_none());
    }

    #[test]
    fn test_select_keeps_canvas_order() {
        let doc = CanvasDocument::from_json(SAMPLE).unwrap();
        let selected = doc.select(&["e5f6", "a1b2"]);
        let ids: Vec<_> = selected.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a1b2", "e5f6"]);
    }
}
