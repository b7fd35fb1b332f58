use crate::dispatch::Invocation;
use async_trait::async_trait;
use gridcore::{EngineError, HandlerDescriptor, HandlerError, NodeResult};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// A registered node type
///
/// `descriptor()` declares everything the engine needs up front: input
/// schema, output slots, and the terminal/blocking/progress capability
/// flags. Cooperative handlers implement `invoke`; handlers registered as
/// blocking implement `invoke_blocking` instead and run on the worker pool.
#[async_trait]
pub trait NodeHandler: Send + Sync {
    fn descriptor(&self) -> HandlerDescriptor;

    async fn invoke(&self, call: Invocation) -> Result<NodeResult, HandlerError> {
        let _ = call;
        Err(HandlerError::ExecutionFailed(
            "handler is registered as blocking".to_string(),
        ))
    }

    fn invoke_blocking(&self, call: Invocation) -> Result<NodeResult, HandlerError> {
        let _ = call;
        Err(HandlerError::ExecutionFailed(
            "handler is not registered as blocking".to_string(),
        ))
    }
}

/// Registry of available node types
///
/// Populated once at startup and read-only during execution; tests build
/// isolated instances rather than sharing process state.
pub struct NodeRegistry {
    handlers: HashMap<String, Arc<dyn NodeHandler>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register(&mut self, handler: Arc<dyn NodeHandler>) {
        let type_name = handler.descriptor().type_name;
        tracing::info!("registering node type: {}", type_name);
        self.handlers.insert(type_name, handler);
    }

    pub fn lookup(&self, type_name: &str) -> Result<Arc<dyn NodeHandler>, EngineError> {
        self.handlers
            .get(type_name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownNodeType(type_name.to_string()))
    }

    /// Full capability document for remote discovery, stably ordered
    pub fn list_all(&self) -> BTreeMap<String, HandlerDescriptor> {
        self.handlers
            .iter()
            .map(|(name, handler)| (name.clone(), handler.descriptor()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
