use serde::{Deserialize, Serialize};

/// Declared type tag of a parameter
///
/// `Grid` and `Map` are opaque domain types: never coerced and never
/// subject to emptiness checks beyond null. `Choice` is an enumerated
/// string type whose first entry doubles as the implicit default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "choices")]
pub enum ParamKind {
    #[serde(rename = "STRING")]
    Str,
    #[serde(rename = "INT")]
    Int,
    #[serde(rename = "FLOAT")]
    Float,
    #[serde(rename = "BOOLEAN")]
    Bool,
    #[serde(rename = "CHOICE")]
    Choice(Vec<String>),
    #[serde(rename = "GRID")]
    Grid,
    #[serde(rename = "DICT")]
    Map,
}

/// One declared parameter of a node handler
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    #[serde(flatten)]
    pub kind: ParamKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
            min: None,
            max: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Range hint published for capability discovery; not enforced
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }
}

/// Declared inputs of a node handler
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InputSchema {
    pub required: Vec<ParamSpec>,
    pub optional: Vec<ParamSpec>,
}

impl InputSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, spec: ParamSpec) -> Self {
        self.required.push(spec);
        self
    }

    pub fn optional(mut self, spec: ParamSpec) -> Self {
        self.optional.push(spec);
        self
    }

    /// All declared parameters, required first
    pub fn params(&self) -> impl Iterator<Item = &ParamSpec> {
        self.required.iter().chain(self.optional.iter())
    }

    pub fn declares(&self, name: &str) -> bool {
        self.params().any(|p| p.name == name)
    }
}

/// Everything the engine needs to know about a node type
///
/// Capability flags are declared at registration time; the engine never
/// inspects a handler to discover what it accepts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HandlerDescriptor {
    pub type_name: String,
    pub display_name: String,
    pub category: String,
    pub input: InputSchema,
    pub output_names: Vec<String>,
    /// Terminal nodes are the run's requested outputs
    pub is_terminal: bool,
    /// Blocking handlers are dispatched to the worker pool
    pub is_blocking: bool,
    /// Whether a progress reporter is injected at invocation
    pub accepts_progress: bool,
}

impl HandlerDescriptor {
    pub fn new(type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        Self {
            display_name: type_name.clone(),
            type_name,
            category: "general".to_string(),
            input: InputSchema::new(),
            output_names: Vec::new(),
            is_terminal: false,
            is_blocking: false,
            accepts_progress: false,
        }
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn input(mut self, schema: InputSchema) -> Self {
        self.input = schema;
        self
    }

    pub fn outputs(mut self, names: &[&str]) -> Self {
        self.output_names = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn terminal(mut self) -> Self {
        self.is_terminal = true;
        self
    }

    pub fn blocking(mut self) -> Self {
        self.is_blocking = true;
        self
    }

    pub fn with_progress(mut self) -> Self {
        self.accepts_progress = true;
        self
    }

    pub fn output_count(&self) -> usize {
        self.output_names.len()
    }
}
