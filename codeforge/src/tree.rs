//! Terminal rendering of component trees.

use std::fmt::Write;

use colored::Colorize;
use forge_ui::{RenderNode, Value};

const MAX_PROP_LEN: usize = 40;

/// Format `nodes` as an indented tree, one line per node.
pub fn format_tree(nodes: &[RenderNode]) -> String {
    let mut out = String::new();
    for (i, node) in nodes.iter().enumerate() {
        write_node(&mut out, node, "", i + 1 == nodes.len());
    }
    out
}

fn write_node(out: &mut String, node: &RenderNode, prefix: &str, last: bool) {
    let branch = if last { "└── " } else { "├── " };
    let _ = write!(
        out,
        "{prefix}{branch}{} {}",
        node.kind.bold(),
        format!("#{}", node.key).cyan()
    );

    for (name, value) in &node.props {
        let _ = write!(out, " {name}={}", summarize(value).dimmed());
    }
    for h in &node.handlers {
        let _ = write!(out, " {}", format!("{}[{}]", h.prop, h.actions.len()).yellow());
    }
    out.push('\n');

    let child_prefix = format!("{prefix}{}", if last { "    " } else { "│   " });
    for (i, child) in node.children.iter().enumerate() {
        write_node(out, child, &child_prefix, i + 1 == node.children.len());
    }
}

fn summarize(value: &Value) -> String {
    let s = value.to_string();
    if s.chars().count() <= MAX_PROP_LEN {
        return s;
    }
    let cut: String = s.chars().take(MAX_PROP_LEN - 3).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_ui::{ComponentRegistry, Renderer, UIComponent};
    use serde_json::json;

    #[test]
    fn test_format_tree() {
        colored::control::set_override(false);
        let c: UIComponent = serde_json::from_value(json!({
            "id": "root", "type": "div",
            "children": [
                {"id": "a", "type": "Text", "props": {"children": "hello"}},
                {"id": "b", "type": "Button", "events": [{"event": "click", "actions": [
                    {"id": "t", "type": "show-toast"}
                ]}]}
            ]
        }))
        .unwrap();
        let registry = ComponentRegistry::builtin();
        let nodes = Renderer::new(&registry).render(&c, &serde_json::Map::new());
        let out = format_tree(&nodes);
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines[0], "└── div #root");
        assert_eq!(lines[1], "    ├── Text #a children=\"hello\"");
        assert_eq!(lines[2], "    └── Button #b type=\"button\" onClick[1]");
    }

    #[test]
    fn test_summarize_truncates() {
        let long = Value::String("x".repeat(100));
        assert_eq!(summarize(&long).chars().count(), MAX_PROP_LEN);
    }
}
