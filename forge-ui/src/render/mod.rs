//! Component tree renderer.
//!
//! Rendering is a pure, synchronous walk of a [`UIComponent`] tree against a
//! data context. For each node the renderer
//!
//! 1. drops the node when its `condition` is falsy,
//! 2. expands `repeat` into one node per array element, with the item and
//!    index variables visible to the node and its subtree,
//! 3. resolves props, applies `bindings`, merges `className` and `style`
//!    and binds `events`,
//! 4. looks the type up in the [`ComponentRegistry`], dropping unknown types,
//! 5. renders children in order.
//!
//! The host re-runs [`Renderer::render`] after every data change.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
    binding::{BindingErrorCallback, BindingResolver},
    expr::is_truthy,
    schema::{ComponentCondition, Layout, Loop, PageSchema, UIComponent},
    store::ComputeRegistry,
};

mod node;
mod registry;

pub use node::{BoundHandler, RenderNode};
pub use registry::{ComponentRegistry, ComponentSpec};

/// Output of [`Renderer::render_page`].
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RenderedPage {
    pub id: String,
    pub name: String,
    pub layout: Layout,
    pub nodes: Vec<RenderNode>,
}

impl RenderedPage {
    /// Find a rendered node by key, then by component id.
    pub fn find(&self, id: &str) -> Option<&RenderNode> {
        self.nodes.iter().find_map(|n| n.find(id))
    }
}

/// Renders component trees through one registry.
#[derive(Clone, Copy)]
pub struct Renderer<'r> {
    registry: &'r ComponentRegistry,
    computes: Option<&'r ComputeRegistry>,
    on_error: Option<BindingErrorCallback<'r>>,
}

impl fmt::Debug for Renderer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("registry", self.registry)
            .field("computes", &self.computes)
            .finish_non_exhaustive()
    }
}

impl<'r> Renderer<'r> {
    /// A renderer with no named transforms and no error hook.
    pub fn new(registry: &'r ComponentRegistry) -> Self {
        Self {
            registry,
            computes: None,
            on_error: None,
        }
    }

    /// Resolve named binding transforms through `computes`.
    pub fn with_computes(mut self, computes: &'r ComputeRegistry) -> Self {
        self.computes = Some(computes);
        self
    }

    /// Report binding and transform failures to `callback`.
    pub fn with_on_error(mut self, callback: BindingErrorCallback<'r>) -> Self {
        self.on_error = Some(callback);
        self
    }

    /// Render `component` against `data`.
    ///
    /// Returns no node when the component is hidden or of an unknown type,
    /// and one node per element when it repeats.
    pub fn render(&self, component: &UIComponent, data: &Map<String, Value>) -> Vec<RenderNode> {
        self.render_node(component, data, &Map::new(), None)
    }

    /// Render every top-level component of `page`, in order.
    pub fn render_page(&self, page: &PageSchema, data: &Map<String, Value>) -> RenderedPage {
        RenderedPage {
            id: page.id.clone(),
            name: page.name.clone(),
            layout: page.layout.clone(),
            nodes: page
                .components
                .iter()
                .flat_map(|c| self.render(c, data))
                .collect(),
        }
    }

    fn resolver<'s>(&self, scope: &'s Map<String, Value>) -> BindingResolver<'s>
    where
        'r: 's,
    {
        let mut resolver = BindingResolver::new(scope);
        if let Some(computes) = self.computes {
            resolver = resolver.with_computes(computes);
        }
        if let Some(cb) = self.on_error {
            resolver = resolver.with_on_error(cb);
        }
        resolver
    }

    fn render_node(
        &self,
        component: &UIComponent,
        scope: &Map<String, Value>,
        locals: &Map<String, Value>,
        index: Option<usize>,
    ) -> Vec<RenderNode> {
        let resolver = self.resolver(scope);

        let visible = match &component.condition {
            None => true,
            Some(ComponentCondition::Expression(cond)) => resolver.resolve_condition(cond),
            Some(ComponentCondition::Binding(binding)) => {
                is_truthy(resolver.resolve_binding(binding).as_ref())
            }
        };
        if !visible {
            return Vec::new();
        }

        if let Some(conditional) = &component.conditional {
            let branch = if resolver.resolve_condition(&conditional.r#if) {
                conditional.then.as_deref()
            } else {
                match conditional.r#else.as_deref() {
                    Some(otherwise) => Some(otherwise),
                    None => return Vec::new(),
                }
            };
            if let Some(branch) = branch {
                return self.render_node(branch, scope, locals, None);
            }
        }

        if let Some(repeat) = component.repeat.as_ref().filter(|_| index.is_none()) {
            let items = match resolver.resolve_expression(&repeat.items, None) {
                Some(Value::Array(items)) => items,
                other => {
                    debug!(
                        "repeat `{}` of `{}` is not an array: {other:?}",
                        repeat.items, component.id
                    );
                    return Vec::new();
                }
            };

            return items
                .into_iter()
                .enumerate()
                .flat_map(|(i, item)| {
                    let (item_scope, item_locals) =
                        with_item(scope, locals, &repeat.item_var, repeat.index_var.as_deref(), item, i);
                    self.render_node(component, &item_scope, &item_locals, Some(i))
                })
                .collect();
        }

        if let Some(lp) = &component.r#loop {
            return self.render_loop(component, lp, &resolver, locals);
        }

        let mut props = resolver.resolve_props(&component.props);
        resolver.apply_bindings(&mut props, &component.bindings);
        merge_class_and_style(&mut props, component);
        if let Some(bound) = component
            .data_binding
            .as_ref()
            .and_then(|r| resolver.resolve_data_ref(r))
        {
            props.insert("value".into(), bound.clone());
            props.insert("data".into(), bound);
        }

        let Some(spec) = self.registry.get(&component.kind) else {
            warn!("Component type \"{}\" not found in registry", component.kind);
            return Vec::new();
        };

        let props = if spec.default_props.is_empty() {
            props
        } else {
            let mut merged = spec.default_props.clone();
            merged.extend(props);
            merged
        };

        let handlers = component
            .events
            .iter()
            .map(|h| BoundHandler {
                event: h.event.clone(),
                prop: node::event_prop_name(&h.event),
                actions: h.actions.clone(),
                condition: h.condition.clone(),
                locals: locals.clone(),
            })
            .collect();

        let children = component
            .children
            .iter()
            .flat_map(|c| self.render_node(c, scope, locals, None))
            .collect();

        let key = match index {
            Some(i) => format!("{}-{i}", component.id),
            None => component.id.clone(),
        };

        vec![RenderNode {
            id: component.id.clone(),
            kind: component.kind.clone(),
            element: spec.element.clone(),
            key,
            props,
            handlers,
            children,
        }]
    }

    /// Children once per element of the loop source, with `-i` appended to
    /// the keys of each pass's top-level nodes. A missing or non-array
    /// source renders nothing.
    fn render_loop(
        &self,
        component: &UIComponent,
        lp: &Loop,
        resolver: &BindingResolver<'_>,
        locals: &Map<String, Value>,
    ) -> Vec<RenderNode> {
        let items = match resolver.resolve_data_ref(&lp.source) {
            Some(Value::Array(items)) => items,
            None | Some(Value::Null) => Vec::new(),
            Some(other) => {
                debug!("loop source of `{}` is not an array: {other}", component.id);
                Vec::new()
            }
        };

        let mut out = Vec::new();
        for (i, item) in items.into_iter().enumerate() {
            let (item_scope, item_locals) =
                with_item(resolver.data(), locals, &lp.item_var, lp.index_var.as_deref(), item, i);
            for child in &component.children {
                for mut node in self.render_node(child, &item_scope, &item_locals, None) {
                    node.key = format!("{}-{i}", node.key);
                    out.push(node);
                }
            }
        }
        out
    }
}

/// Scope and locals for one element of a repeat or loop.
fn with_item(
    scope: &Map<String, Value>,
    locals: &Map<String, Value>,
    item_var: &str,
    index_var: Option<&str>,
    item: Value,
    index: usize,
) -> (Map<String, Value>, Map<String, Value>) {
    let mut item_locals = locals.clone();
    item_locals.insert(item_var.to_string(), item);
    if let Some(index_var) = index_var {
        item_locals.insert(index_var.to_string(), Value::from(index));
    }
    let mut item_scope = scope.clone();
    item_scope.extend(item_locals.clone());
    (item_scope, item_locals)
}

fn merge_class_and_style(props: &mut Map<String, Value>, component: &UIComponent) {
    if let Some(class) = component.class_name.as_deref().filter(|c| !c.is_empty()) {
        let joined = match props.get("className").and_then(Value::as_str) {
            Some(existing) if !existing.is_empty() => format!("{existing} {class}"),
            _ => class.to_string(),
        };
        props.insert("className".into(), Value::String(joined));
    }

    if let Some(style) = &component.style {
        let mut merged = match props.remove("style") {
            Some(Value::Object(base)) => base,
            _ => Map::new(),
        };
        merged.extend(style.clone());
        props.insert("style".into(), Value::Object(merged));
    }
}
