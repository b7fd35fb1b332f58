use crate::dispatch::{dispatch, WorkerPool};
use crate::registry::NodeRegistry;
use crate::validate::validate_inputs;
use futures::future::BoxFuture;
use futures::FutureExt;
use gridcore::{EngineError, EventSink, Graph, InputBinding, NodeResult, Value};
use std::collections::{HashMap, HashSet};

/// Per-run resolution state, discarded when the run ends
#[derive(Default)]
struct RunState {
    memo: HashMap<String, NodeResult>,
    in_flight: HashSet<String>,
}

/// Depth-first memoizing graph executor
///
/// Each node is resolved at most once per run; consumers of the same node
/// read the memoized result. Resolution is sequential from the caller's
/// point of view even when individual handlers run on the worker pool.
pub struct GraphExecutor {
    pool: WorkerPool,
}

impl GraphExecutor {
    pub fn new(pool: WorkerPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Resolve the graph's terminal nodes, or the last-declared node when
    /// no handler is marked terminal
    pub async fn execute(
        &self,
        graph: &Graph,
        registry: &NodeRegistry,
        sink: &EventSink,
    ) -> Result<(), EngineError> {
        let mut state = RunState::default();

        let terminals: Vec<String> = graph
            .iter()
            .filter(|(_, spec)| {
                registry
                    .lookup(&spec.node_type)
                    .map(|h| h.descriptor().is_terminal)
                    .unwrap_or(false)
            })
            .map(|(id, _)| id.to_string())
            .collect();

        let targets: Vec<String> = if terminals.is_empty() {
            graph.last_declared().map(str::to_string).into_iter().collect()
        } else {
            terminals
        };

        for node_id in &targets {
            self.resolve(node_id, graph, registry, &mut state, sink)
                .await?;
        }

        tracing::info!(
            nodes = state.memo.len(),
            targets = targets.len(),
            "graph resolved"
        );
        Ok(())
    }

    fn resolve<'a>(
        &'a self,
        node_id: &'a str,
        graph: &'a Graph,
        registry: &'a NodeRegistry,
        state: &'a mut RunState,
        sink: &'a EventSink,
    ) -> BoxFuture<'a, Result<NodeResult, EngineError>> {
        async move {
            if let Some(cached) = state.memo.get(node_id) {
                return Ok(cached.clone());
            }
            // A node already being resolved can only be reached again
            // through one of its own dependencies.
            if !state.in_flight.insert(node_id.to_string()) {
                return Err(EngineError::CyclicGraph(node_id.to_string()));
            }

            let spec = graph
                .get(node_id)
                .ok_or_else(|| EngineError::NodeNotFound(node_id.to_string()))?;
            tracing::debug!(node_id, node_type = %spec.node_type, "resolving node");

            let mut raw: HashMap<String, Value> = HashMap::new();
            for (param, binding) in &spec.inputs {
                match binding {
                    InputBinding::Reference(source, slot) => {
                        let upstream = self
                            .resolve(source, graph, registry, state, sink)
                            .await?;
                        raw.insert(param.clone(), upstream.slot(*slot));
                    }
                    InputBinding::Literal(json) => {
                        raw.insert(param.clone(), Value::from_json(json.clone()));
                    }
                }
            }

            let handler = registry.lookup(&spec.node_type)?;
            let args = validate_inputs(&handler.descriptor().input, &raw, node_id)?;
            let result =
                dispatch(handler, node_id, &spec.node_type, args, &self.pool, sink).await?;
            tracing::debug!(node_id, "node completed");

            state.in_flight.remove(node_id);
            state.memo.insert(node_id.to_string(), result.clone());
            Ok(result)
        }
        .boxed()
    }
}
