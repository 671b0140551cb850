//! Shared types and errors for the Switchyard workflow engine.
//!
//! This crate provides the foundational types used across all other Switchyard
//! crates:
//! - `SwitchyardError` — unified error taxonomy
//! - `GraphDef` / `NodeDef` / `EdgeDef` — immutable workflow definitions
//! - `Run` / `RunLogEntry` / `RunStatus` — mutable execution records

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The shared mutable state threaded through tool invocations. Each tool
/// receives the current state and returns its wholesale replacement.
pub type State = serde_json::Map<String, serde_json::Value>;

/// Unified error type for all Switchyard subsystems.
#[derive(Debug, thiserror::Error)]
pub enum SwitchyardError {
    // === Graph construction ===
    #[error("invalid graph: {0}")]
    InvalidGraph(String),

    // === Store lookups ===
    #[error("graph '{id}' not found")]
    GraphNotFound { id: String },

    #[error("run '{id}' not found")]
    RunNotFound { id: String },

    // === Execution ===
    #[error("tool '{tool}' is not registered")]
    ToolNotFound { tool: String },

    #[error("node '{node}' is not defined in the graph")]
    UnknownNode { node: String },

    #[error("cannot compare {left} {operator} {right}")]
    UnsupportedComparison {
        operator: String,
        left: String,
        right: String,
    },

    #[error("tool '{tool}' failed: {message}")]
    ToolFailed { tool: String, message: String },

    #[error("run exceeded the step limit of {limit} node executions")]
    StepLimitExceeded { limit: u64 },

    // === Generic ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl SwitchyardError {
    /// Maps the error to an HTTP status code for server mode. Execution
    /// failures return `None`: they are recorded on the Run, not surfaced as
    /// HTTP errors.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            SwitchyardError::InvalidGraph(_) => Some(400),
            SwitchyardError::GraphNotFound { .. } | SwitchyardError::RunNotFound { .. } => {
                Some(404)
            }
            _ => None,
        }
    }
}

/// A convenience alias for `Result<T, SwitchyardError>`.
pub type Result<T> = std::result::Result<T, SwitchyardError>;

// ---------------------------------------------------------------------------
// Graph definition
// ---------------------------------------------------------------------------

/// A named step bound to a registered tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDef {
    pub name: String,
    /// Tool name resolved in the registry at execution time.
    pub tool: String,
}

impl NodeDef {
    pub fn new(name: impl Into<String>, tool: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tool: tool.into(),
        }
    }
}

/// Comparison operator for conditional edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    #[default]
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Lt => "lt",
            CompareOp::Gt => "gt",
            CompareOp::Lte => "lte",
            CompareOp::Gte => "gte",
        };
        f.write_str(s)
    }
}

/// A directed transition between two nodes, optionally gated by comparing a
/// state field to a value. An edge with no `condition_key` is unconditional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeDef {
    pub from_node: String,
    pub to_node: String,
    #[serde(default)]
    pub condition_key: Option<String>,
    #[serde(default)]
    pub operator: CompareOp,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

impl EdgeDef {
    /// An unconditional edge: always taken when encountered.
    pub fn unconditional(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from_node: from.into(),
            to_node: to.into(),
            condition_key: None,
            operator: CompareOp::Eq,
            value: None,
        }
    }

    /// An edge gated on `state[key] <op> value`.
    pub fn conditional(
        from: impl Into<String>,
        to: impl Into<String>,
        key: impl Into<String>,
        operator: CompareOp,
        value: serde_json::Value,
    ) -> Self {
        Self {
            from_node: from.into(),
            to_node: to.into(),
            condition_key: Some(key.into()),
            operator,
            value: Some(value),
        }
    }
}

/// An immutable workflow definition: named nodes plus directed, optionally
/// conditional edges, plus a start node.
///
/// Edge declaration order is significant: the engine evaluates a node's
/// outgoing edges in the order they appear in `edges`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDef {
    pub id: String,
    pub nodes: HashMap<String, NodeDef>,
    pub edges: Vec<EdgeDef>,
    pub start_node: String,
}

// ---------------------------------------------------------------------------
// Run record
// ---------------------------------------------------------------------------

/// Lifecycle status of a run. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

/// One log record per node visited: the node name and an independent snapshot
/// of the state taken right after the node's tool ran.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunLogEntry {
    pub node: String,
    pub state_snapshot: State,
}

/// One execution instance of a graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub graph_id: String,
    pub status: RunStatus,
    pub current_node: Option<String>,
    pub state: State,
    pub log: Vec<RunLogEntry>,
    pub error: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Run {
    /// Create a fresh PENDING run for `graph_id` with a copy of the caller's
    /// initial state.
    pub fn new(graph_id: impl Into<String>, initial_state: State) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            graph_id: graph_id.into(),
            status: RunStatus::Pending,
            current_node: None,
            state: initial_state,
            log: Vec::new(),
            error: None,
            created_at: chrono::Utc::now(),
        }
    }
}
