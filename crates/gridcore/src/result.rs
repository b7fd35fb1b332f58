use crate::Value;

/// Value(s) produced by one node invocation
///
/// Handlers with one conceptual output may return `Single`; multi-output
/// handlers return `Slots` in declaration order. Results live in the run's
/// memo table and are cloned out to each consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeResult {
    Single(Value),
    Slots(Vec<Value>),
}

impl NodeResult {
    pub fn single(value: impl Into<Value>) -> Self {
        NodeResult::Single(value.into())
    }

    pub fn slots(values: Vec<Value>) -> Self {
        NodeResult::Slots(values)
    }

    /// Select an output slot
    ///
    /// A `Single` result ignores the index. An out-of-range index on a
    /// `Slots` result falls back to slot 0 rather than failing; the
    /// leniency absorbs mismatched arities between graph and handler.
    pub fn slot(&self, index: usize) -> Value {
        match self {
            NodeResult::Single(value) => value.clone(),
            NodeResult::Slots(values) => values
                .get(index)
                .or_else(|| values.first())
                .cloned()
                .unwrap_or(Value::Null),
        }
    }

    pub fn slot_count(&self) -> usize {
        match self {
            NodeResult::Single(_) => 1,
            NodeResult::Slots(values) => values.len(),
        }
    }
}

impl From<Value> for NodeResult {
    fn from(value: Value) -> Self {
        NodeResult::Single(value)
    }
}
