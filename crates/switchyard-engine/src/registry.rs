//! Tool trait, function adapter, and the name-keyed tool registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use switchyard_types::{Result, State, SwitchyardError};

// ---------------------------------------------------------------------------
// Tool trait
// ---------------------------------------------------------------------------

/// A named unit of work invoked at a node.
///
/// A tool receives the current shared state and returns its wholesale
/// replacement. Tools may suspend (perform I/O, sleep, call out) inside
/// `invoke`; the engine awaits each invocation without blocking other runs.
#[async_trait]
pub trait Tool: Send + Sync {
    async fn invoke(&self, state: State) -> Result<State>;
}

// ---------------------------------------------------------------------------
// FnTool — adapter for plain functions
// ---------------------------------------------------------------------------

/// Adapts a plain `Fn(State) -> Result<State>` into the [`Tool`] trait so
/// synchronous handlers share the one suspension-capable call shape.
pub struct FnTool<F>(pub F);

#[async_trait]
impl<F> Tool for FnTool<F>
where
    F: Fn(State) -> Result<State> + Send + Sync,
{
    async fn invoke(&self, state: State) -> Result<State> {
        (self.0)(state)
    }
}

// ---------------------------------------------------------------------------
// ToolRegistry
// ---------------------------------------------------------------------------

/// Name→tool bindings shared across the engine.
///
/// Cloning a `ToolRegistry` yields another handle to the same bindings.
/// Registration is last-write-wins and takes effect on the next node visit:
/// the engine resolves by name once per visit and never caches the lookup
/// across a run.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Arc<RwLock<HashMap<String, Arc<dyn Tool>>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `tool`, overwriting any prior binding for that name.
    pub async fn register(&self, name: impl Into<String>, tool: impl Tool + 'static) {
        let name = name.into();
        tracing::debug!(tool = %name, "registering tool");
        self.tools.write().await.insert(name, Arc::new(tool));
    }

    /// Bind `name` to a plain function via [`FnTool`].
    pub async fn register_fn<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(State) -> Result<State> + Send + Sync + 'static,
    {
        self.register(name, FnTool(f)).await;
    }

    /// Look up the tool bound to `name`.
    pub async fn resolve(&self, name: &str) -> Result<Arc<dyn Tool>> {
        self.tools
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| SwitchyardError::ToolNotFound {
                tool: name.to_string(),
            })
    }

    pub async fn has(&self, name: &str) -> bool {
        self.tools.read().await.contains_key(name)
    }
}
