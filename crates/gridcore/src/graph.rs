use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// Node identifier, unique within one graph
pub type NodeId = String;

/// One input wire on a node
///
/// A two-element `[source-node-id, slot-index]` array is a reference to
/// another node's output slot; any other JSON shape is a literal value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum InputBinding {
    Reference(String, usize),
    Literal(serde_json::Value),
}

/// A single node in a graph request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeSpec {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub inputs: HashMap<String, InputBinding>,
}

impl NodeSpec {
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            inputs: HashMap::new(),
        }
    }

    pub fn with_literal(mut self, param: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.inputs
            .insert(param.into(), InputBinding::Literal(value.into()));
        self
    }

    pub fn with_reference(
        mut self,
        param: impl Into<String>,
        source: impl Into<String>,
        slot: usize,
    ) -> Self {
        self.inputs
            .insert(param.into(), InputBinding::Reference(source.into(), slot));
        self
    }
}

/// A graph execution request: node id -> node spec
///
/// Declaration order is preserved because the engine falls back to the
/// last-declared node when no terminal node exists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    entries: Vec<(NodeId, NodeSpec)>,
    index: HashMap<NodeId, usize>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, replacing any previous spec under the same id
    pub fn insert(&mut self, id: impl Into<NodeId>, spec: NodeSpec) {
        let id = id.into();
        match self.index.get(&id) {
            Some(&pos) => self.entries[pos] = (id, spec),
            None => {
                self.index.insert(id.clone(), self.entries.len());
                self.entries.push((id, spec));
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&NodeSpec> {
        self.index.get(id).map(|&pos| &self.entries[pos].1)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn last_declared(&self) -> Option<&str> {
        self.entries.last().map(|(id, _)| id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NodeSpec)> {
        self.entries.iter().map(|(id, spec)| (id.as_str(), spec))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Graph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, spec) in &self.entries {
            map.serialize_entry(id, spec)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Graph {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct GraphVisitor;

        impl<'de> Visitor<'de> for GraphVisitor {
            type Value = Graph;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of node id to node spec")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Graph, A::Error> {
                let mut graph = Graph::new();
                while let Some((id, spec)) = access.next_entry::<NodeId, NodeSpec>()? {
                    graph.insert(id, spec);
                }
                Ok(graph)
            }
        }

        deserializer.deserialize_map(GraphVisitor)
    }
}
