//! Graph execution runtime
//!
//! This crate provides the node registry, the input validator, the
//! dispatch bridge with its bounded worker pool, the recursive memoizing
//! executor and the resource monitor task.

mod dispatch;
mod executor;
mod monitor;
mod registry;
mod runtime;
mod validate;

pub use dispatch::{Invocation, ProgressReporter, WorkerPool};
pub use executor::GraphExecutor;
pub use registry::{NodeHandler, NodeRegistry};
pub use runtime::{GridRuntime, RuntimeConfig};
pub use validate::validate_inputs;
