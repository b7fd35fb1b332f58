use async_trait::async_trait;
use gridcore::{
    HandlerDescriptor, HandlerError, InputSchema, NodeResult, ParamKind, ParamSpec, Value,
};
use gridruntime::{Invocation, NodeHandler};

/// Logs its message and passes it through
pub struct LogNode;

#[async_trait]
impl NodeHandler for LogNode {
    fn descriptor(&self) -> HandlerDescriptor {
        HandlerDescriptor::new("util.log")
            .display_name("Log")
            .category("util")
            .input(
                InputSchema::new()
                    .optional(ParamSpec::new("message", ParamKind::Str).with_default("")),
            )
            .outputs(&["message"])
    }

    async fn invoke(&self, call: Invocation) -> Result<NodeResult, HandlerError> {
        let message = call
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        tracing::info!(node_id = %call.node_id, "{}", message);
        Ok(NodeResult::single(message))
    }
}
