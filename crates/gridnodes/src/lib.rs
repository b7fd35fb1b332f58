//! Standard node library
//!
//! Built-in nodes for loading, filtering, inspecting and storing chunked
//! grid data.

mod debug;
mod filter;
mod reader;
mod stats;
mod store;
mod writer;

pub use debug::LogNode;
pub use filter::GridFilterNode;
pub use reader::GridReaderNode;
pub use stats::GridStatsNode;
pub use writer::GridWriterNode;

use gridruntime::NodeRegistry;
use std::sync::Arc;

/// Register all standard nodes with a registry
pub fn register_all(registry: &mut NodeRegistry) {
    registry.register(Arc::new(reader::GridReaderNode));
    registry.register(Arc::new(filter::GridFilterNode));
    registry.register(Arc::new(writer::GridWriterNode));
    registry.register(Arc::new(stats::GridStatsNode));
    registry.register(Arc::new(debug::LogNode));
}
