//! In-memory graph and run stores.
//!
//! Both stores are Arc-cloneable handles over a lock-guarded map with
//! process-lifetime scope. The engine is the only writer of a run's fields;
//! observers take read-locked snapshots while it executes. Neither store
//! supports deletion: retention is an external concern.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use switchyard_types::{GraphDef, Result, Run, SwitchyardError};

/// A run shared between the executing engine task and concurrent observers.
pub type SharedRun = Arc<RwLock<Run>>;

/// Graph definitions by id. Graphs are immutable after insertion.
#[derive(Clone, Default)]
pub struct GraphStore {
    inner: Arc<RwLock<HashMap<String, Arc<GraphDef>>>>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, graph: GraphDef) -> Arc<GraphDef> {
        let graph = Arc::new(graph);
        self.inner
            .write()
            .await
            .insert(graph.id.clone(), graph.clone());
        graph
    }

    pub async fn get(&self, id: &str) -> Result<Arc<GraphDef>> {
        self.inner
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| SwitchyardError::GraphNotFound { id: id.to_string() })
    }
}

/// Run records by id, live while executing and retained after termination.
#[derive(Clone, Default)]
pub struct RunStore {
    inner: Arc<RwLock<HashMap<String, SharedRun>>>,
}

impl RunStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, run: Run) -> SharedRun {
        let id = run.id.clone();
        let shared = Arc::new(RwLock::new(run));
        self.inner.write().await.insert(id, shared.clone());
        shared
    }

    /// The live handle, reflecting in-progress mutation by the engine.
    pub async fn get(&self, id: &str) -> Result<SharedRun> {
        self.inner
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| SwitchyardError::RunNotFound { id: id.to_string() })
    }

    /// A point-in-time copy of the run taken under its read lock.
    pub async fn snapshot(&self, id: &str) -> Result<Run> {
        let shared = self.get(id).await?;
        let guard = shared.read().await;
        Ok(guard.clone())
    }
}
