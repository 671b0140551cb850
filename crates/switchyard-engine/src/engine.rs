//! The run executor: graph creation, run lifecycle, and the traversal loop.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::Instrument;

use crate::edge_selection::select_edge;
use crate::registry::ToolRegistry;
use crate::store::{GraphStore, RunStore, SharedRun};
use switchyard_types::{
    EdgeDef, GraphDef, NodeDef, Result, Run, RunLogEntry, RunStatus, State, SwitchyardError,
};

/// The workflow executor. Owns the tool registry and the graph and run
/// stores; cheap to clone (all handles are shared).
///
/// Two execution modes drive the identical traversal loop:
/// [`run_to_completion`](Engine::run_to_completion) blocks the caller's task
/// until the run is terminal, [`spawn_run`](Engine::spawn_run) detaches the
/// run onto its own task and returns immediately. Either way, every failure
/// inside the loop is captured on the run record: one run failing never
/// affects another.
#[derive(Clone, Default)]
pub struct Engine {
    registry: ToolRegistry,
    graphs: GraphStore,
    runs: RunStore,
    step_limit: Option<u64>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the number of node executions per run. Off by default: an
    /// infinitely-looping graph is the caller's responsibility, but a capped
    /// engine fails such a run with `StepLimitExceeded` instead of spinning.
    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = Some(limit);
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn graphs(&self) -> &GraphStore {
        &self.graphs
    }

    pub fn runs(&self) -> &RunStore {
        &self.runs
    }

    // -----------------------------------------------------------------------
    // Graph creation
    // -----------------------------------------------------------------------

    /// Index `nodes` by name, assign a fresh id, and store the graph.
    ///
    /// Fails with `InvalidGraph` when `start_node` is not among the node
    /// names. Edge endpoints are deliberately not validated here: a dangling
    /// target is a runtime failure (`UnknownNode`) on the run that reaches it.
    pub async fn create_graph(
        &self,
        nodes: Vec<NodeDef>,
        edges: Vec<EdgeDef>,
        start_node: impl Into<String>,
    ) -> Result<Arc<GraphDef>> {
        let start_node = start_node.into();
        let nodes: HashMap<String, NodeDef> =
            nodes.into_iter().map(|n| (n.name.clone(), n)).collect();

        if !nodes.contains_key(&start_node) {
            return Err(SwitchyardError::InvalidGraph(
                "start_node must be one of the nodes".into(),
            ));
        }

        let graph = GraphDef {
            id: uuid::Uuid::new_v4().to_string(),
            nodes,
            edges,
            start_node,
        };
        tracing::info!(graph = %graph.id, nodes = graph.nodes.len(), "graph created");
        Ok(self.graphs.insert(graph).await)
    }

    // -----------------------------------------------------------------------
    // Run lifecycle
    // -----------------------------------------------------------------------

    /// Create a PENDING run for `graph_id` with a copy of the caller's
    /// initial state and insert it into the run store.
    pub async fn start_run(&self, graph_id: &str, initial_state: State) -> Result<Run> {
        // Resolve the graph up front so an unknown id surfaces to the caller
        // instead of producing a run that can never execute.
        let graph = self.graphs.get(graph_id).await?;
        let run = Run::new(graph.id.clone(), initial_state);
        let snapshot = run.clone();
        self.runs.insert(run).await;
        tracing::info!(run = %snapshot.id, graph = %graph.id, "run created");
        Ok(snapshot)
    }

    /// Foreground mode: drive the run on the caller's task and return the
    /// terminal record. A FAILED run is an `Ok` result; only store lookups
    /// error here.
    pub async fn run_to_completion(&self, run_id: &str) -> Result<Run> {
        let (graph, run) = self.lookup(run_id).await?;
        self.execute(graph, run).await;
        self.runs.snapshot(run_id).await
    }

    /// Background mode: detach the run onto its own task and return
    /// immediately. Progress is observable only through the run store.
    pub async fn spawn_run(&self, run_id: &str) -> Result<()> {
        let (graph, run) = self.lookup(run_id).await?;
        let engine = self.clone();
        tokio::spawn(async move {
            engine.execute(graph, run).await;
        });
        Ok(())
    }

    /// A point-in-time snapshot of the run.
    pub async fn get_run(&self, run_id: &str) -> Result<Run> {
        self.runs.snapshot(run_id).await
    }

    async fn lookup(&self, run_id: &str) -> Result<(Arc<GraphDef>, SharedRun)> {
        let run = self.runs.get(run_id).await?;
        let graph_id = run.read().await.graph_id.clone();
        let graph = self.graphs.get(&graph_id).await?;
        Ok((graph, run))
    }

    // -----------------------------------------------------------------------
    // Traversal loop
    // -----------------------------------------------------------------------

    /// Drive `run` over `graph` to a terminal state. Failures raised inside
    /// the loop are captured on the run record; `current_node` is left at the
    /// node that was executing when the failure occurred.
    async fn execute(&self, graph: Arc<GraphDef>, run: SharedRun) {
        // Claim the run under one write lock: a run is driven at most once,
        // so re-driving a terminal or already-running record is a no-op.
        let run_id = {
            let mut guard = run.write().await;
            if guard.status != RunStatus::Pending {
                tracing::debug!(run = %guard.id, status = ?guard.status, "run already driven");
                return;
            }
            guard.status = RunStatus::Running;
            guard.id.clone()
        };
        let span = tracing::info_span!("run", id = %run_id, graph = %graph.id);

        if let Err(err) = self.drive(&graph, &run).instrument(span).await {
            let mut guard = run.write().await;
            guard.status = RunStatus::Failed;
            guard.error = Some(err.to_string());
            tracing::warn!(run = %guard.id, error = %err, "run failed");
        }
    }

    async fn drive(&self, graph: &GraphDef, run: &SharedRun) -> Result<()> {
        let mut current = Some(graph.start_node.clone());
        let mut steps: u64 = 0;

        while let Some(name) = current {
            if let Some(limit) = self.step_limit {
                if steps >= limit {
                    return Err(SwitchyardError::StepLimitExceeded { limit });
                }
            }
            steps += 1;

            run.write().await.current_node = Some(name.clone());

            let node = graph
                .nodes
                .get(&name)
                .ok_or_else(|| SwitchyardError::UnknownNode { node: name.clone() })?;

            // Resolved per visit: late (re)registration takes effect on the
            // next node, never mid-invocation.
            let tool = self.registry.resolve(&node.tool).await?;

            let state = run.read().await.state.clone();
            let new_state =
                tool.invoke(state)
                    .await
                    .map_err(|err| SwitchyardError::ToolFailed {
                        tool: node.tool.clone(),
                        message: err.to_string(),
                    })?;

            // The tool's return value replaces the state wholesale, then the
            // log snapshot is taken before edge evaluation.
            let next = {
                let mut guard = run.write().await;
                guard.state = new_state;
                let state_snapshot = guard.state.clone();
                guard.log.push(RunLogEntry {
                    node: name.clone(),
                    state_snapshot,
                });
                select_edge(graph, &name, &guard.state)?
            };
            tracing::debug!(node = %name, next = ?next, "node completed");
            current = next;
        }

        let mut guard = run.write().await;
        guard.current_node = None;
        guard.status = RunStatus::Completed;
        tracing::info!(run = %guard.id, steps, "run completed");
        Ok(())
    }
}
