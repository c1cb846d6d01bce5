use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

/// How one component type is realised by the host.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    /// Host element or widget name, e.g. `button` or `p`.
    pub element: String,
    /// Props applied underneath the resolved props of every instance.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub default_props: Map<String, Value>,
}

impl ComponentSpec {
    pub fn element(element: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            default_props: Map::new(),
        }
    }

    pub fn with_default(mut self, prop: impl Into<String>, value: Value) -> Self {
        self.default_props.insert(prop.into(), value);
        self
    }
}

const HTML_ELEMENTS: &[&str] = &["div", "section", "article", "header", "footer", "main"];

const WIDGETS: &[(&str, &str)] = &[
    ("Card", "card"),
    ("CardHeader", "card-header"),
    ("CardTitle", "card-title"),
    ("CardDescription", "card-description"),
    ("CardContent", "card-content"),
    ("CardFooter", "card-footer"),
    ("Select", "select"),
    ("Switch", "switch"),
    ("Badge", "badge"),
    ("Progress", "progress"),
    ("Separator", "separator"),
    ("Tabs", "tabs"),
    ("TabsList", "tabs-list"),
    ("TabsTrigger", "tabs-trigger"),
    ("TabsContent", "tabs-content"),
    ("Dialog", "div"),
    ("Text", "p"),
    ("Heading", "h2"),
    ("Label", "label"),
    ("List", "ul"),
    ("Grid", "div"),
    ("StatusBadge", "badge"),
    ("DataCard", "card"),
    ("SearchInput", "input"),
    ("ActionBar", "div"),
    ("Icon", "svg"),
];

/// Type name to [`ComponentSpec`] lookup table.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    specs: BTreeMap<String, ComponentSpec>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard component set.
    pub fn builtin() -> Self {
        let mut r = Self::new();
        for name in HTML_ELEMENTS {
            r.register(*name, ComponentSpec::element(*name));
        }
        for (name, element) in WIDGETS {
            r.register(*name, ComponentSpec::element(*element));
        }
        r.register(
            "Button",
            ComponentSpec::element("button").with_default("type", Value::from("button")),
        );
        r.register(
            "Input",
            ComponentSpec::element("input").with_default("type", Value::from("text")),
        );
        r.register(
            "Checkbox",
            ComponentSpec::element("input").with_default("type", Value::from("checkbox")),
        );
        r.register(
            "Textarea",
            ComponentSpec::element("textarea").with_default("rows", Value::from(3)),
        );
        r
    }

    /// Add or replace the spec for `name`.
    pub fn register(&mut self, name: impl Into<String>, spec: ComponentSpec) {
        self.specs.insert(name.into(), spec);
    }

    pub fn get(&self, name: &str) -> Option<&ComponentSpec> {
        self.specs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.specs.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }
}
