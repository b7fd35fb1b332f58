use crate::dispatch::WorkerPool;
use crate::executor::GraphExecutor;
use crate::monitor::run_monitor;
use crate::registry::NodeRegistry;
use gridcore::{EngineError, EventSink, Graph};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Main entry point for executing graphs
pub struct GridRuntime {
    registry: Arc<NodeRegistry>,
    executor: GraphExecutor,
    config: RuntimeConfig,
}

impl GridRuntime {
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self::with_config(registry, RuntimeConfig::default())
    }

    pub fn with_config(registry: Arc<NodeRegistry>, config: RuntimeConfig) -> Self {
        let executor = GraphExecutor::new(WorkerPool::new(config.worker_slots));
        Self {
            registry,
            executor,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    /// Execute one graph, emitting events on `sink` over the run's lifetime
    ///
    /// Emits exactly one `error` event and aborts on any failure, or
    /// exactly one `done` event on full success. The telemetry task is
    /// cancelled and awaited before this returns, on both paths.
    pub async fn run(&self, graph: &Graph, sink: &EventSink) -> Result<(), EngineError> {
        let run_id = Uuid::new_v4();
        tracing::info!(%run_id, nodes = graph.len(), "graph run started");
        sink.log("engine started");

        let cancel = CancellationToken::new();
        let monitor = tokio::spawn(run_monitor(
            sink.clone(),
            self.config.monitor_interval,
            self.config.worker_slots,
            cancel.clone(),
        ));

        let outcome = self.executor.execute(graph, &self.registry, sink).await;

        cancel.cancel();
        let _ = monitor.await;

        match &outcome {
            Ok(()) => {
                tracing::info!(%run_id, "graph run completed");
                sink.done("Done");
            }
            Err(err) => {
                tracing::error!(%run_id, error = %err, "graph run failed");
                sink.error(err.to_string());
            }
        }
        outcome
    }
}

/// Runtime tuning knobs
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Bound on concurrently executing blocking handlers
    pub worker_slots: usize,
    /// Resource telemetry sampling interval
    pub monitor_interval: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_slots: 4,
            monitor_interval: Duration::from_secs(2),
        }
    }
}
