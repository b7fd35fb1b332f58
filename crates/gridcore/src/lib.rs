//! Core types for the grid engine
//!
//! This crate provides the graph model, the dynamic value type, input
//! schemas, wire events and the error taxonomy that all other components
//! depend on. It has no runtime dependencies beyond the event channel.

mod error;
pub mod events;
mod graph;
mod grid;
mod result;
mod schema;
mod value;

pub use error::{EngineError, HandlerError};
pub use graph::{Graph, InputBinding, NodeSpec};
pub use grid::{ChunkGrid, ShapeMismatch};
pub use result::NodeResult;
pub use schema::{HandlerDescriptor, InputSchema, ParamKind, ParamSpec};
pub use value::Value;
pub use events::{EventSink, SessionEvent};

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
