use serde::Serialize;
use serde_json::{Map, Value};

use crate::schema::Action;

/// An event of a rendered node bound to its actions.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BoundHandler {
    /// Event name, e.g. `click`.
    pub event: String,
    /// Prop the host attaches the handler to, e.g. `onClick`.
    pub prop: String,
    pub actions: Vec<Action>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Repeat variables in scope where the node was rendered.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub locals: Map<String, Value>,
}

/// `click` -> `onClick`; names already starting with `on` are kept.
pub(crate) fn event_prop_name(event: &str) -> String {
    if event.starts_with("on") {
        return event.to_string();
    }
    let mut chars = event.chars();
    match chars.next() {
        Some(first) => format!("on{}{}", first.to_uppercase(), chars.as_str()),
        None => "on".to_string(),
    }
}

/// One rendered component instance.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RenderNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub element: String,
    /// `<id>` or, for repeated nodes, `<id>-<index>`.
    pub key: String,
    pub props: Map<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub handlers: Vec<BoundHandler>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RenderNode>,
}

impl RenderNode {
    /// Depth-first search by key, then by component id.
    pub fn find(&self, id: &str) -> Option<&RenderNode> {
        self.find_by(&|n| n.key == id).or_else(|| self.find_by(&|n| n.id == id))
    }

    fn find_by(&self, pred: &dyn Fn(&RenderNode) -> bool) -> Option<&RenderNode> {
        if pred(self) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_by(pred))
    }

    /// The handler bound to `event`, given as `click` or `onClick`.
    pub fn handler(&self, event: &str) -> Option<&BoundHandler> {
        self.handlers
            .iter()
            .find(|h| h.event == event || h.prop == event)
    }

    /// Number of nodes in this subtree.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(RenderNode::count).sum::<usize>()
    }
}
