//! Graph traversal engine for Switchyard workflows.
//!
//! This crate implements the core runner: the tool registry, the in-memory
//! graph and run stores, the node-by-node traversal loop with conditional
//! edge selection, and the poll-based run streaming observer.

pub mod condition;
pub mod edge_selection;
pub mod engine;
pub mod registry;
pub mod store;
pub mod stream;

pub use condition::compare;
pub use edge_selection::select_edge;
pub use engine::Engine;
pub use registry::{FnTool, Tool, ToolRegistry};
pub use store::{GraphStore, RunStore, SharedRun};
pub use stream::{stream_run, RunStreamEvent, DEFAULT_POLL_INTERVAL};
