use crate::registry::NodeHandler;
use gridcore::{ChunkGrid, EngineError, EventSink, HandlerError, NodeResult, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Progress callback surface handed to handlers that declare it
///
/// Normalizes `(current, total)` into an integer percentage and delivers
/// it through the session's event channel, so it is safe to call from
/// worker threads.
#[derive(Clone)]
pub struct ProgressReporter {
    node_id: String,
    sink: EventSink,
}

impl ProgressReporter {
    pub fn new(node_id: impl Into<String>, sink: EventSink) -> Self {
        Self {
            node_id: node_id.into(),
            sink,
        }
    }

    pub fn report(&self, current: u64, total: u64, message: &str) {
        // A zero total counts as one step so 0/0 reads as 0%, not a fault.
        let total = total.max(1);
        let percent = ((current as f64 / total as f64) * 100.0) as u64;
        self.sink
            .progress(&self.node_id, percent.min(100) as u8, message);
    }
}

/// Validated arguments plus per-node context for one handler invocation
pub struct Invocation {
    pub node_id: String,
    pub args: HashMap<String, Value>,
    pub progress: Option<ProgressReporter>,
}

impl Invocation {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.args.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&Value, HandlerError> {
        self.args
            .get(name)
            .filter(|v| !v.is_null())
            .ok_or_else(|| HandlerError::MissingInput(name.to_string()))
    }

    pub fn require_str(&self, name: &str) -> Result<&str, HandlerError> {
        self.require(name)?
            .as_str()
            .ok_or_else(|| invalid(name, "string"))
    }

    pub fn require_f64(&self, name: &str) -> Result<f64, HandlerError> {
        self.require(name)?
            .as_f64()
            .ok_or_else(|| invalid(name, "number"))
    }

    pub fn require_grid(&self, name: &str) -> Result<Arc<ChunkGrid>, HandlerError> {
        self.require(name)?
            .as_grid()
            .cloned()
            .ok_or_else(|| invalid(name, "grid"))
    }

    pub fn require_map(&self, name: &str) -> Result<&HashMap<String, Value>, HandlerError> {
        self.require(name)?
            .as_map()
            .ok_or_else(|| invalid(name, "map"))
    }

    /// Report progress if this invocation carries a reporter
    pub fn progress(&self, current: u64, total: u64, message: &str) {
        if let Some(reporter) = &self.progress {
            reporter.report(current, total, message);
        }
    }
}

fn invalid(field: &str, expected: &str) -> HandlerError {
    HandlerError::InvalidInput {
        field: field.to_string(),
        expected: expected.to_string(),
    }
}

/// Bounded pool for blocking handler work
///
/// A semaphore permit gates each `spawn_blocking` call, so the pool size
/// is the real concurrency ceiling across all sessions sharing it.
#[derive(Clone)]
pub struct WorkerPool {
    slots: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            slots: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub async fn run<T, F>(&self, work: F) -> Result<T, HandlerError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, HandlerError> + Send + 'static,
    {
        let permit = self
            .slots
            .acquire()
            .await
            .map_err(|_| HandlerError::ExecutionFailed("worker pool closed".to_string()))?;
        let outcome = tokio::task::spawn_blocking(work)
            .await
            .map_err(|join| HandlerError::ExecutionFailed(format!("worker panicked: {join}")))?;
        drop(permit);
        outcome
    }
}

/// Invoke a handler with validated args, bridging sync and async worlds
///
/// Drops any argument the handler does not declare, injects a progress
/// reporter when the descriptor asks for one, and routes the call either
/// inline on the scheduling loop or through the worker pool. Handler
/// errors come back wrapped with the node's identity.
pub async fn dispatch(
    handler: Arc<dyn NodeHandler>,
    node_id: &str,
    node_type: &str,
    mut args: HashMap<String, Value>,
    pool: &WorkerPool,
    sink: &EventSink,
) -> Result<NodeResult, EngineError> {
    let descriptor = handler.descriptor();

    args.retain(|name, _| descriptor.input.declares(name));

    let progress = descriptor
        .accepts_progress
        .then(|| ProgressReporter::new(node_id, sink.clone()));

    let call = Invocation {
        node_id: node_id.to_string(),
        args,
        progress,
    };

    let outcome = if descriptor.is_blocking {
        let handler = Arc::clone(&handler);
        pool.run(move || handler.invoke_blocking(call)).await
    } else {
        handler.invoke(call).await
    };

    outcome.map_err(|err| EngineError::HandlerFailed {
        node_id: node_id.to_string(),
        node_type: node_type.to_string(),
        message: err.to_string(),
    })
}
