//! The sample "code review" tool set.
//!
//! Five ordinary tools with no engine-level significance: they review a blob
//! of Python-ish source held in `state["code"]`, score it, and decide whether
//! the review loop should go around again. Any handler satisfying the tool
//! contract is interchangeable with these.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};

use switchyard_engine::{Tool, ToolRegistry};
use switchyard_types::{CompareOp, EdgeDef, NodeDef, Result, State};

fn code_of(state: &State) -> String {
    match state.get("code") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

fn int_of(state: &State, key: &str, default: i64) -> i64 {
    state.get(key).and_then(|v| v.as_i64()).unwrap_or(default)
}

// ---------------------------------------------------------------------------
// Tools
// ---------------------------------------------------------------------------

/// Naive function extraction: `def name(` patterns.
pub struct ExtractFunctions;

#[async_trait]
impl Tool for ExtractFunctions {
    async fn invoke(&self, mut state: State) -> Result<State> {
        static FUNCTION_DEF: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"def\s+([a-zA-Z_][a-zA-Z0-9_]*)\s*\(").unwrap());

        let code = code_of(&state);
        let names: Vec<Value> = FUNCTION_DEF
            .captures_iter(&code)
            .map(|c| json!(c[1].to_string()))
            .collect();

        state.insert("function_count".into(), json!(names.len()));
        state.insert("functions".into(), Value::Array(names));
        Ok(state)
    }
}

/// Toy complexity heuristic: longer code scores higher, clamped to 1–10.
pub struct CheckComplexity;

#[async_trait]
impl Tool for CheckComplexity {
    async fn invoke(&self, mut state: State) -> Result<State> {
        let code = code_of(&state);
        let line_count = code.lines().filter(|l| !l.trim().is_empty()).count() as i64;
        let complexity_score = (line_count / 10).clamp(1, 10);

        state.insert("line_count".into(), json!(line_count));
        state.insert("complexity_score".into(), json!(complexity_score));
        Ok(state)
    }
}

/// Flags a few obvious smells.
pub struct DetectBasicIssues;

#[async_trait]
impl Tool for DetectBasicIssues {
    async fn invoke(&self, mut state: State) -> Result<State> {
        let code = code_of(&state);
        let mut issues: Vec<Value> = Vec::new();

        if code.contains("print(") {
            issues.push(json!("Debug prints present"));
        }
        if code.contains("TODO") {
            issues.push(json!("TODO comment found"));
        }
        if code.contains("  ") {
            issues.push(json!("Potential inconsistent indentation"));
        }

        state.insert("issue_count".into(), json!(issues.len()));
        state.insert("issues".into(), Value::Array(issues));
        Ok(state)
    }
}

/// Turns the collected metrics into suggestions and a 0–10 quality score.
pub struct SuggestImprovements;

#[async_trait]
impl Tool for SuggestImprovements {
    async fn invoke(&self, mut state: State) -> Result<State> {
        let complexity = int_of(&state, "complexity_score", 5);
        let issue_count = int_of(&state, "issue_count", 0);
        let fn_count = int_of(&state, "function_count", 0);

        let mut suggestions: Vec<Value> = Vec::new();
        if complexity > 7 {
            suggestions.push(json!("Consider splitting large functions into smaller ones."));
        }
        if issue_count > 0 {
            suggestions.push(json!("Fix detected issues before merging."));
        }
        if fn_count == 0 {
            suggestions.push(json!(
                "No functions detected. Consider structuring code into functions."
            ));
        }

        let quality_score = (10 - (complexity - 5).max(0) - issue_count).clamp(0, 10);

        state.insert("suggestions".into(), Value::Array(suggestions));
        state.insert("quality_score".into(), json!(quality_score));

        let threshold = int_of(&state, "quality_threshold", 7);
        state.insert("quality_threshold".into(), json!(threshold));
        Ok(state)
    }
}

/// Decides whether the review loop goes around again.
pub struct EvaluateQuality;

#[async_trait]
impl Tool for EvaluateQuality {
    async fn invoke(&self, mut state: State) -> Result<State> {
        let quality_score = int_of(&state, "quality_score", 0);
        let threshold = int_of(&state, "quality_threshold", 7);
        state.insert("quality_ok".into(), json!(quality_score >= threshold));
        Ok(state)
    }
}

// ---------------------------------------------------------------------------
// Registration and sample graph
// ---------------------------------------------------------------------------

/// Register all five review tools.
pub async fn register_review_tools(registry: &ToolRegistry) {
    registry.register("extract_functions", ExtractFunctions).await;
    registry.register("check_complexity", CheckComplexity).await;
    registry.register("detect_basic_issues", DetectBasicIssues).await;
    registry
        .register("suggest_improvements", SuggestImprovements)
        .await;
    registry.register("evaluate_quality", EvaluateQuality).await;
}

/// The sample review pipeline: a linear chain through the five tools, plus a
/// loop edge back to the start while `quality_ok` is false. No edge matches
/// once `quality_ok` is true, which terminates the run.
pub fn sample_review_graph() -> (Vec<NodeDef>, Vec<EdgeDef>, &'static str) {
    let nodes = vec![
        NodeDef::new("extract_functions", "extract_functions"),
        NodeDef::new("check_complexity", "check_complexity"),
        NodeDef::new("detect_basic_issues", "detect_basic_issues"),
        NodeDef::new("suggest_improvements", "suggest_improvements"),
        NodeDef::new("evaluate_quality", "evaluate_quality"),
    ];

    let edges = vec![
        EdgeDef::unconditional("extract_functions", "check_complexity"),
        EdgeDef::unconditional("check_complexity", "detect_basic_issues"),
        EdgeDef::unconditional("detect_basic_issues", "suggest_improvements"),
        EdgeDef::unconditional("suggest_improvements", "evaluate_quality"),
        EdgeDef::conditional(
            "evaluate_quality",
            "extract_functions",
            "quality_ok",
            CompareOp::Eq,
            json!(false),
        ),
    ];

    (nodes, edges, "extract_functions")
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_engine::Engine;
    use switchyard_types::RunStatus;

    fn state_with_code(code: &str) -> State {
        let mut state = State::new();
        state.insert("code".into(), json!(code));
        state
    }

    #[tokio::test]
    async fn extract_functions_finds_defs() {
        let state = state_with_code("def alpha():\n    pass\n\ndef beta(x):\n    return x\n");
        let out = ExtractFunctions.invoke(state).await.unwrap();

        assert_eq!(out.get("function_count"), Some(&json!(2)));
        assert_eq!(out.get("functions"), Some(&json!(["alpha", "beta"])));
    }

    #[tokio::test]
    async fn extract_functions_handles_missing_code() {
        let out = ExtractFunctions.invoke(State::new()).await.unwrap();
        assert_eq!(out.get("function_count"), Some(&json!(0)));
    }

    #[tokio::test]
    async fn check_complexity_scores_by_length() {
        let short = CheckComplexity
            .invoke(state_with_code("x = 1\n"))
            .await
            .unwrap();
        assert_eq!(short.get("line_count"), Some(&json!(1)));
        assert_eq!(short.get("complexity_score"), Some(&json!(1)));

        let long_code = "line\n".repeat(55);
        let long = CheckComplexity
            .invoke(state_with_code(&long_code))
            .await
            .unwrap();
        assert_eq!(long.get("line_count"), Some(&json!(55)));
        assert_eq!(long.get("complexity_score"), Some(&json!(5)));
    }

    #[tokio::test]
    async fn detect_basic_issues_flags_smells() {
        let out = DetectBasicIssues
            .invoke(state_with_code("print(x)  # TODO fix\n"))
            .await
            .unwrap();
        assert_eq!(out.get("issue_count"), Some(&json!(3)));

        let clean = DetectBasicIssues
            .invoke(state_with_code("x = 1\n"))
            .await
            .unwrap();
        assert_eq!(clean.get("issue_count"), Some(&json!(0)));
    }

    #[tokio::test]
    async fn suggest_improvements_scores_and_defaults_threshold() {
        let mut state = State::new();
        state.insert("complexity_score".into(), json!(8));
        state.insert("issue_count".into(), json!(2));
        state.insert("function_count".into(), json!(1));

        let out = SuggestImprovements.invoke(state).await.unwrap();
        // 10 - (8-5) - 2 = 5
        assert_eq!(out.get("quality_score"), Some(&json!(5)));
        assert_eq!(out.get("quality_threshold"), Some(&json!(7)));
        let suggestions = out.get("suggestions").unwrap().as_array().unwrap();
        assert_eq!(suggestions.len(), 2);
    }

    #[tokio::test]
    async fn evaluate_quality_compares_against_threshold() {
        let mut state = State::new();
        state.insert("quality_score".into(), json!(8));
        state.insert("quality_threshold".into(), json!(7));
        let out = EvaluateQuality.invoke(state).await.unwrap();
        assert_eq!(out.get("quality_ok"), Some(&json!(true)));

        let mut state = State::new();
        state.insert("quality_score".into(), json!(3));
        let out = EvaluateQuality.invoke(state).await.unwrap();
        assert_eq!(out.get("quality_ok"), Some(&json!(false)));
    }

    #[tokio::test]
    async fn sample_graph_runs_clean_code_to_completion() {
        let engine = Engine::new();
        register_review_tools(engine.registry()).await;

        let (nodes, edges, start) = sample_review_graph();
        let graph = engine.create_graph(nodes, edges, start).await.unwrap();

        // Clean, single-function code: no issues, low complexity, so
        // quality_ok is true after the first pass and the loop edge never
        // matches.
        let run = engine
            .start_run(&graph.id, state_with_code("def tidy():\n return 1\n"))
            .await
            .unwrap();
        let done = engine.run_to_completion(&run.id).await.unwrap();

        assert_eq!(done.status, RunStatus::Completed);
        let visited: Vec<_> = done.log.iter().map(|e| e.node.as_str()).collect();
        assert_eq!(
            visited,
            vec![
                "extract_functions",
                "check_complexity",
                "detect_basic_issues",
                "suggest_improvements",
                "evaluate_quality",
            ]
        );
        assert_eq!(done.state.get("quality_ok"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn sample_graph_loops_on_poor_quality() {
        // Messy code scores below the threshold; the review is
        // deterministic, so the loop would spin forever. The step cap turns
        // that into a bounded, observable loop.
        let engine = Engine::new().with_step_limit(12);
        register_review_tools(engine.registry()).await;

        let (nodes, edges, start) = sample_review_graph();
        let graph = engine.create_graph(nodes, edges, start).await.unwrap();

        let mut initial = state_with_code("print(1)  # TODO\nprint(2)\n");
        initial.insert("quality_threshold".into(), json!(9));
        let run = engine.start_run(&graph.id, initial).await.unwrap();
        let done = engine.run_to_completion(&run.id).await.unwrap();

        assert_eq!(done.status, RunStatus::Failed);
        assert_eq!(done.state.get("quality_ok"), Some(&json!(false)));
        // Two full passes plus the start of a third.
        assert_eq!(done.log.len(), 12);
        assert_eq!(done.log[5].node, "extract_functions");
    }
}
