//! Edge selection: which node follows the one that just ran.
//!
//! Candidates are the graph's edges whose `from_node` matches, considered in
//! declaration order. The first match wins: an edge with no `condition_key`
//! matches unconditionally; a conditional edge matches when its comparison
//! holds against the current state. No match means the run terminates.

use crate::condition::compare;
use switchyard_types::{GraphDef, Result, State};

/// Returns the name of the next node to visit after `node_name`, or `None`
/// when no outgoing edge matches (the run's sole non-failure exit).
pub fn select_edge(graph: &GraphDef, node_name: &str, state: &State) -> Result<Option<String>> {
    for edge in graph.edges.iter().filter(|e| e.from_node == node_name) {
        let Some(key) = &edge.condition_key else {
            return Ok(Some(edge.to_node.clone()));
        };
        if compare(state.get(key), edge.operator, edge.value.as_ref())? {
            return Ok(Some(edge.to_node.clone()));
        }
    }
    Ok(None)
}
