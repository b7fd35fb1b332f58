use async_trait::async_trait;
use gridcore::{
    EngineError, EventSink, Graph, HandlerDescriptor, HandlerError, InputSchema, NodeResult,
    NodeSpec, ParamKind, ParamSpec, SessionEvent, Value,
};
use gridruntime::{GridRuntime, Invocation, NodeHandler, NodeRegistry, RuntimeConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// --- fixture handlers -----------------------------------------------------

/// Emits its literal `value` input unchanged
struct ConstNode;

#[async_trait]
impl NodeHandler for ConstNode {
    fn descriptor(&self) -> HandlerDescriptor {
        HandlerDescriptor::new("test.const")
            .input(InputSchema::new().required(ParamSpec::new("value", ParamKind::Int)))
            .outputs(&["value"])
    }

    async fn invoke(&self, call: Invocation) -> Result<NodeResult, HandlerError> {
        Ok(NodeResult::single(call.require("value")?.clone()))
    }
}

/// Adds one to `x`, records the sum, and is a terminal node
struct AddOneNode {
    seen: Arc<Mutex<Vec<i64>>>,
}

#[async_trait]
impl NodeHandler for AddOneNode {
    fn descriptor(&self) -> HandlerDescriptor {
        HandlerDescriptor::new("test.add_one")
            .input(InputSchema::new().required(ParamSpec::new("x", ParamKind::Int)))
            .outputs(&["sum"])
            .terminal()
    }

    async fn invoke(&self, call: Invocation) -> Result<NodeResult, HandlerError> {
        let x = call
            .require("x")?
            .as_i64()
            .ok_or_else(|| HandlerError::InvalidInput {
                field: "x".to_string(),
                expected: "int".to_string(),
            })?;
        self.seen.lock().unwrap().push(x + 1);
        Ok(NodeResult::single(Value::Int(x + 1)))
    }
}

/// Plain pass-through add-one without terminal marking (for cycle graphs)
struct PlainAddOneNode;

#[async_trait]
impl NodeHandler for PlainAddOneNode {
    fn descriptor(&self) -> HandlerDescriptor {
        HandlerDescriptor::new("test.plain_add_one")
            .input(InputSchema::new().required(ParamSpec::new("x", ParamKind::Int)))
            .outputs(&["sum"])
    }

    async fn invoke(&self, call: Invocation) -> Result<NodeResult, HandlerError> {
        let x = call.require("x")?.as_i64().unwrap_or(0);
        Ok(NodeResult::single(Value::Int(x + 1)))
    }
}

/// Counts invocations; configurable type name so graphs can hold several
struct CountingNode {
    type_name: String,
    count: Arc<AtomicUsize>,
}

#[async_trait]
impl NodeHandler for CountingNode {
    fn descriptor(&self) -> HandlerDescriptor {
        HandlerDescriptor::new(self.type_name.clone()).outputs(&["count"])
    }

    async fn invoke(&self, _call: Invocation) -> Result<NodeResult, HandlerError> {
        let n = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(NodeResult::single(Value::Int(n as i64)))
    }
}

/// Terminal sink that records whatever arrives on `x`
struct CaptureNode {
    seen: Arc<Mutex<Vec<Value>>>,
}

#[async_trait]
impl NodeHandler for CaptureNode {
    fn descriptor(&self) -> HandlerDescriptor {
        HandlerDescriptor::new("test.capture")
            .input(InputSchema::new().required(ParamSpec::new("x", ParamKind::Int)))
            .outputs(&["x"])
            .terminal()
    }

    async fn invoke(&self, call: Invocation) -> Result<NodeResult, HandlerError> {
        let value = call.require("x")?.clone();
        self.seen.lock().unwrap().push(value.clone());
        Ok(NodeResult::single(value))
    }
}

/// Terminal probe recording which argument names survive dispatch
struct ArgsProbeNode {
    seen: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl NodeHandler for ArgsProbeNode {
    fn descriptor(&self) -> HandlerDescriptor {
        HandlerDescriptor::new("test.args_probe")
            .input(InputSchema::new().required(ParamSpec::new("x", ParamKind::Int)))
            .outputs(&["x"])
            .terminal()
    }

    async fn invoke(&self, call: Invocation) -> Result<NodeResult, HandlerError> {
        let mut names: Vec<String> = call.args.keys().cloned().collect();
        names.sort();
        *self.seen.lock().unwrap() = names;
        Ok(NodeResult::single(Value::Null))
    }
}

/// Two fixed output slots
struct TupleNode;

#[async_trait]
impl NodeHandler for TupleNode {
    fn descriptor(&self) -> HandlerDescriptor {
        HandlerDescriptor::new("test.tuple").outputs(&["first", "second"])
    }

    async fn invoke(&self, _call: Invocation) -> Result<NodeResult, HandlerError> {
        Ok(NodeResult::slots(vec![Value::Int(10), Value::Int(20)]))
    }
}

/// Fresh grid per invocation; memoization must make consumers share it
struct GridSourceNode;

#[async_trait]
impl NodeHandler for GridSourceNode {
    fn descriptor(&self) -> HandlerDescriptor {
        HandlerDescriptor::new("test.grid_source").outputs(&["grid"])
    }

    async fn invoke(&self, _call: Invocation) -> Result<NodeResult, HandlerError> {
        let grid = gridcore::ChunkGrid::synthetic([2, 4, 4], [1, 2, 2]);
        Ok(NodeResult::single(Value::from(grid)))
    }
}

/// Always fails
struct FailNode;

#[async_trait]
impl NodeHandler for FailNode {
    fn descriptor(&self) -> HandlerDescriptor {
        HandlerDescriptor::new("test.fail").outputs(&["never"])
    }

    async fn invoke(&self, _call: Invocation) -> Result<NodeResult, HandlerError> {
        Err(HandlerError::ExecutionFailed("boom".to_string()))
    }
}

/// Blocking handler reporting progress from the worker thread
struct BlockingProgressNode;

#[async_trait]
impl NodeHandler for BlockingProgressNode {
    fn descriptor(&self) -> HandlerDescriptor {
        HandlerDescriptor::new("test.blocking_progress")
            .outputs(&["value"])
            .terminal()
            .blocking()
            .with_progress()
    }

    fn invoke_blocking(&self, call: Invocation) -> Result<NodeResult, HandlerError> {
        call.progress(0, 0, "start");
        call.progress(5, 10, "half");
        call.progress(10, 10, "end");
        Ok(NodeResult::single(Value::Int(1)))
    }
}

/// Blocking handler that panics on the worker thread
struct PanicNode;

#[async_trait]
impl NodeHandler for PanicNode {
    fn descriptor(&self) -> HandlerDescriptor {
        HandlerDescriptor::new("test.panic")
            .outputs(&["never"])
            .terminal()
            .blocking()
    }

    fn invoke_blocking(&self, _call: Invocation) -> Result<NodeResult, HandlerError> {
        panic!("worker thread panic");
    }
}

/// Requires a string input with no default
struct StrictNode;

#[async_trait]
impl NodeHandler for StrictNode {
    fn descriptor(&self) -> HandlerDescriptor {
        HandlerDescriptor::new("test.strict")
            .input(InputSchema::new().required(ParamSpec::new("path", ParamKind::Str)))
            .outputs(&["path"])
            .terminal()
    }

    async fn invoke(&self, call: Invocation) -> Result<NodeResult, HandlerError> {
        Ok(NodeResult::single(call.require("path")?.clone()))
    }
}

// --- helpers --------------------------------------------------------------

fn test_config() -> RuntimeConfig {
    RuntimeConfig {
        worker_slots: 2,
        monitor_interval: Duration::from_secs(60),
    }
}

async fn run_collect(
    graph: &Graph,
    registry: NodeRegistry,
) -> (Result<(), EngineError>, Vec<SessionEvent>) {
    let runtime = GridRuntime::with_config(Arc::new(registry), test_config());
    let (sink, mut receiver) = EventSink::channel();
    let outcome = runtime.run(graph, &sink).await;
    drop(sink);

    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    (outcome, events)
}

fn done_count(events: &[SessionEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, SessionEvent::Done { .. }))
        .count()
}

fn error_messages(events: &[SessionEvent]) -> Vec<&str> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Error { message } => Some(message.as_str()),
            _ => None,
        })
        .collect()
}

// --- tests ----------------------------------------------------------------

#[tokio::test]
async fn end_to_end_const_into_add_one() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut registry = NodeRegistry::new();
    registry.register(Arc::new(ConstNode));
    registry.register(Arc::new(AddOneNode { seen: seen.clone() }));

    let mut graph = Graph::new();
    graph.insert("a", NodeSpec::new("test.const").with_literal("value", 5));
    graph.insert(
        "b",
        NodeSpec::new("test.add_one").with_reference("x", "a", 0),
    );

    let (outcome, events) = run_collect(&graph, registry).await;
    assert!(outcome.is_ok());
    assert_eq!(done_count(&events), 1);
    assert!(error_messages(&events).is_empty());
    assert_eq!(*seen.lock().unwrap(), vec![6]);
}

#[tokio::test]
async fn shared_dependency_runs_at_most_once() {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut registry = NodeRegistry::new();
    registry.register(Arc::new(CountingNode {
        type_name: "test.count".to_string(),
        count: count.clone(),
    }));
    registry.register(Arc::new(CaptureNode { seen: seen.clone() }));

    let mut graph = Graph::new();
    graph.insert("a", NodeSpec::new("test.count"));
    graph.insert("b", NodeSpec::new("test.capture").with_reference("x", "a", 0));
    graph.insert("c", NodeSpec::new("test.capture").with_reference("x", "a", 0));

    let (outcome, events) = run_collect(&graph, registry).await;
    assert!(outcome.is_ok());
    assert_eq!(done_count(&events), 1);
    assert_eq!(count.load(Ordering::SeqCst), 1);
    // Both consumers read the same memoized result.
    assert_eq!(*seen.lock().unwrap(), vec![Value::Int(1), Value::Int(1)]);
}

#[tokio::test]
async fn memoized_result_is_the_identical_object() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut registry = NodeRegistry::new();
    registry.register(Arc::new(GridSourceNode));
    registry.register(Arc::new(CaptureNode { seen: seen.clone() }));

    let mut graph = Graph::new();
    graph.insert("src", NodeSpec::new("test.grid_source"));
    graph.insert("b", NodeSpec::new("test.capture").with_reference("x", "src", 0));
    graph.insert("c", NodeSpec::new("test.capture").with_reference("x", "src", 0));

    let (outcome, _) = run_collect(&graph, registry).await;
    assert!(outcome.is_ok());

    let seen = seen.lock().unwrap();
    let grids: Vec<_> = seen.iter().map(|v| v.as_grid().unwrap()).collect();
    assert_eq!(grids.len(), 2);
    assert!(Arc::ptr_eq(grids[0], grids[1]));
}

#[tokio::test]
async fn out_of_range_slot_falls_back_to_slot_zero() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut registry = NodeRegistry::new();
    registry.register(Arc::new(TupleNode));
    registry.register(Arc::new(CaptureNode { seen: seen.clone() }));

    let mut graph = Graph::new();
    graph.insert("t", NodeSpec::new("test.tuple"));
    graph.insert("b", NodeSpec::new("test.capture").with_reference("x", "t", 1));
    graph.insert("c", NodeSpec::new("test.capture").with_reference("x", "t", 5));

    let (outcome, _) = run_collect(&graph, registry).await;
    assert!(outcome.is_ok());
    assert_eq!(*seen.lock().unwrap(), vec![Value::Int(20), Value::Int(10)]);
}

#[tokio::test]
async fn single_result_ignores_requested_slot() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut registry = NodeRegistry::new();
    registry.register(Arc::new(ConstNode));
    registry.register(Arc::new(CaptureNode { seen: seen.clone() }));

    let mut graph = Graph::new();
    graph.insert("a", NodeSpec::new("test.const").with_literal("value", 5));
    graph.insert("b", NodeSpec::new("test.capture").with_reference("x", "a", 3));

    let (outcome, _) = run_collect(&graph, registry).await;
    assert!(outcome.is_ok());
    assert_eq!(*seen.lock().unwrap(), vec![Value::Int(5)]);
}

#[tokio::test]
async fn cycle_is_detected_not_recursed() {
    let mut registry = NodeRegistry::new();
    registry.register(Arc::new(PlainAddOneNode));

    let mut graph = Graph::new();
    graph.insert(
        "x",
        NodeSpec::new("test.plain_add_one").with_reference("x", "y", 0),
    );
    graph.insert(
        "y",
        NodeSpec::new("test.plain_add_one").with_reference("x", "x", 0),
    );

    let (outcome, events) = run_collect(&graph, registry).await;
    assert!(matches!(outcome, Err(EngineError::CyclicGraph(_))));
    assert_eq!(done_count(&events), 0);
    let errors = error_messages(&events);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("cycle"));
}

#[tokio::test]
async fn self_reference_is_a_cycle() {
    let mut registry = NodeRegistry::new();
    registry.register(Arc::new(PlainAddOneNode));

    let mut graph = Graph::new();
    graph.insert(
        "x",
        NodeSpec::new("test.plain_add_one").with_reference("x", "x", 0),
    );

    let (outcome, _) = run_collect(&graph, registry).await;
    assert_eq!(outcome, Err(EngineError::CyclicGraph("x".to_string())));
}

#[tokio::test]
async fn failure_aborts_run_and_skips_dependents() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut registry = NodeRegistry::new();
    registry.register(Arc::new(FailNode));
    registry.register(Arc::new(CaptureNode { seen: seen.clone() }));

    let mut graph = Graph::new();
    graph.insert("a", NodeSpec::new("test.fail"));
    graph.insert("b", NodeSpec::new("test.capture").with_reference("x", "a", 0));

    let (outcome, events) = run_collect(&graph, registry).await;
    assert!(matches!(outcome, Err(EngineError::HandlerFailed { .. })));
    assert_eq!(done_count(&events), 0);

    let errors = error_messages(&events);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("boom"));
    // The dependent capture node never ran.
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_node_type_fails_the_run() {
    let registry = NodeRegistry::new();

    let mut graph = Graph::new();
    graph.insert("a", NodeSpec::new("no.such.type"));

    let (outcome, events) = run_collect(&graph, registry).await;
    assert_eq!(
        outcome,
        Err(EngineError::UnknownNodeType("no.such.type".to_string()))
    );
    let errors = error_messages(&events);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("no.such.type"));
}

#[tokio::test]
async fn dangling_reference_fails_lazily() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut registry = NodeRegistry::new();
    registry.register(Arc::new(CaptureNode { seen }));

    let mut graph = Graph::new();
    graph.insert(
        "b",
        NodeSpec::new("test.capture").with_reference("x", "ghost", 0),
    );

    let (outcome, _) = run_collect(&graph, registry).await;
    assert_eq!(outcome, Err(EngineError::NodeNotFound("ghost".to_string())));
}

#[tokio::test]
async fn without_terminals_only_the_last_declared_node_runs() {
    let count_a = Arc::new(AtomicUsize::new(0));
    let count_b = Arc::new(AtomicUsize::new(0));
    let mut registry = NodeRegistry::new();
    registry.register(Arc::new(CountingNode {
        type_name: "test.count_a".to_string(),
        count: count_a.clone(),
    }));
    registry.register(Arc::new(CountingNode {
        type_name: "test.count_b".to_string(),
        count: count_b.clone(),
    }));

    let mut graph = Graph::new();
    graph.insert("a", NodeSpec::new("test.count_a"));
    graph.insert("b", NodeSpec::new("test.count_b"));

    let (outcome, events) = run_collect(&graph, registry).await;
    assert!(outcome.is_ok());
    assert_eq!(done_count(&events), 1);
    assert_eq!(count_a.load(Ordering::SeqCst), 0);
    assert_eq!(count_b.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn progress_crosses_the_worker_boundary_normalized() {
    let mut registry = NodeRegistry::new();
    registry.register(Arc::new(BlockingProgressNode));

    let mut graph = Graph::new();
    graph.insert("work", NodeSpec::new("test.blocking_progress"));

    let (outcome, events) = run_collect(&graph, registry).await;
    assert!(outcome.is_ok());
    assert_eq!(done_count(&events), 1);

    let progress: Vec<(String, u8)> = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Progress {
                task_id, progress, ..
            } => Some((task_id.clone(), *progress)),
            _ => None,
        })
        .collect();
    // (0, 0) normalizes to 0% instead of faulting.
    assert_eq!(
        progress,
        vec![
            ("work".to_string(), 0),
            ("work".to_string(), 50),
            ("work".to_string(), 100),
        ]
    );
}

#[tokio::test]
async fn worker_panic_becomes_a_handler_error() {
    let mut registry = NodeRegistry::new();
    registry.register(Arc::new(PanicNode));

    let mut graph = Graph::new();
    graph.insert("p", NodeSpec::new("test.panic"));

    let (outcome, events) = run_collect(&graph, registry).await;
    match outcome {
        Err(EngineError::HandlerFailed {
            node_id, node_type, ..
        }) => {
            assert_eq!(node_id, "p");
            assert_eq!(node_type, "test.panic");
        }
        other => panic!("expected HandlerFailed, got {other:?}"),
    }
    assert_eq!(done_count(&events), 0);
    assert_eq!(error_messages(&events).len(), 1);
}

#[tokio::test]
async fn missing_required_string_surfaces_as_error_event() {
    let mut registry = NodeRegistry::new();
    registry.register(Arc::new(StrictNode));

    let mut graph = Graph::new();
    graph.insert("s", NodeSpec::new("test.strict"));

    let (outcome, events) = run_collect(&graph, registry).await;
    assert!(matches!(outcome, Err(EngineError::MissingRequired { .. })));
    let errors = error_messages(&events);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("path"));
}

#[tokio::test]
async fn undeclared_arguments_are_dropped_before_invocation() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut registry = NodeRegistry::new();
    registry.register(Arc::new(ArgsProbeNode { seen: seen.clone() }));

    let mut graph = Graph::new();
    graph.insert(
        "probe",
        NodeSpec::new("test.args_probe")
            .with_literal("x", 1)
            .with_literal("bogus", 2),
    );

    let (outcome, _) = run_collect(&graph, registry).await;
    assert!(outcome.is_ok());
    assert_eq!(*seen.lock().unwrap(), vec!["x".to_string()]);
}

#[tokio::test]
async fn registry_lists_descriptors() {
    let mut registry = NodeRegistry::new();
    registry.register(Arc::new(ConstNode));
    registry.register(Arc::new(TupleNode));

    let all = registry.list_all();
    assert_eq!(all.len(), 2);

    let tuple = &all["test.tuple"];
    assert_eq!(tuple.output_names, vec!["first", "second"]);
    assert_eq!(tuple.output_count(), 2);
    assert!(!tuple.is_terminal);

    assert!(registry.lookup("missing").is_err());
    assert!(registry.lookup("test.const").is_ok());
}
