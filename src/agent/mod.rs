//! Workflow orchestrator
//!
//! planner → executor → synthesizer → END
//!
//! The three stages run strictly in order over one [`PipelineState`]. In
//! graph mode they are walked through a compiled [`StageGraph`]; in
//! sequential mode they are called directly. Both produce the same state
//! for the same inputs.

use crate::config::{AppConfig, WorkflowSettings};
use crate::execution::ExecutionEngine;
use crate::llm::LanguageModel;
use crate::models::{ExecutionMode, Plan, Query, ResultSet, WorkflowStatus};
use crate::planner::QueryPlanner;
use crate::state::PipelineState;
use crate::synthesis::Synthesizer;
use crate::tools::{create_default_registry, ToolRegistry};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

pub mod graph;
pub use graph::{Stage, StageGraph, StageGraphBuilder, END};

pub const PLANNER_NODE: &str = "planner";
pub const EXECUTOR_NODE: &str = "executor";
pub const SYNTHESIZER_NODE: &str = "synthesizer";

const NO_RESPONSE: &str = "No response generated";

//
// ================= Stages =================
//

pub struct PlannerStage {
    planner: QueryPlanner,
}

#[async_trait]
impl Stage for PlannerStage {
    fn name(&self) -> &'static str {
        PLANNER_NODE
    }

    async fn run(&self, state: &mut PipelineState) {
        state.plan = Some(self.planner.plan(&state.query).await);
    }
}

pub struct ExecutorStage {
    engine: ExecutionEngine,
}

#[async_trait]
impl Stage for ExecutorStage {
    fn name(&self) -> &'static str {
        EXECUTOR_NODE
    }

    async fn run(&self, state: &mut PipelineState) {
        let results = match &state.plan {
            Some(plan) => self.engine.execute(plan, &state.query).await,
            None => {
                self.engine
                    .execute(&Plan::empty("No plan produced"), &state.query)
                    .await
            }
        };
        state.results = Some(results);
    }
}

pub struct SynthesizerStage {
    synthesizer: Synthesizer,
}

#[async_trait]
impl Stage for SynthesizerStage {
    fn name(&self) -> &'static str {
        SYNTHESIZER_NODE
    }

    async fn run(&self, state: &mut PipelineState) {
        let empty = ResultSet::new();
        let results = state.results.as_ref().unwrap_or(&empty);
        let response = self
            .synthesizer
            .synthesize(&state.query, state.plan.as_ref(), results)
            .await;
        state.final_response = Some(response);
    }
}

//
// ================= Orchestrator =================
//

pub struct Orchestrator {
    registry: Arc<ToolRegistry>,
    mode: ExecutionMode,
    stages: Vec<Arc<dyn Stage>>,
    graph: StageGraph,
}

impl Orchestrator {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        registry: Arc<ToolRegistry>,
        settings: &WorkflowSettings,
    ) -> Result<Self> {
        let engine =
            ExecutionEngine::new(registry.clone()).with_concurrency(settings.parallel_tools);

        let stages: Vec<Arc<dyn Stage>> = vec![
            Arc::new(PlannerStage {
                planner: QueryPlanner::new(model.clone(), &registry),
            }),
            Arc::new(ExecutorStage { engine }),
            Arc::new(SynthesizerStage {
                synthesizer: Synthesizer::new(model),
            }),
        ];

        Self::with_stages(registry, settings.mode, stages)
    }

    /// Orchestrator over the default registry built from `config`.
    pub fn from_config(config: &AppConfig, model: Arc<dyn LanguageModel>) -> Result<Self> {
        let registry = Arc::new(create_default_registry(config, model.clone())?);
        Self::new(model, registry, &config.workflow)
    }

    /// Chain `stages` in the given order.
    pub fn with_stages(
        registry: Arc<ToolRegistry>,
        mode: ExecutionMode,
        stages: Vec<Arc<dyn Stage>>,
    ) -> Result<Self> {
        let graph = build_graph(&stages)?;

        info!(
            mode = %mode,
            tools = ?registry.names(),
            "Agentic workflow initialized"
        );

        Ok(Self {
            registry,
            mode,
            stages,
            graph,
        })
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Answer one query. Never fails: workflow errors are folded into the
    /// returned text.
    pub async fn run(&self, query: &str, session_id: &str) -> String {
        let start = Instant::now();

        match self.execute(Query::new(query, session_id)).await {
            Ok(state) => {
                info!(
                    run_id = %state.run_id,
                    mode = %self.mode,
                    stages = ?state.trace,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Workflow completed"
                );
                state
                    .final_response
                    .unwrap_or_else(|| NO_RESPONSE.to_string())
            }
            Err(e) => {
                error!(error = %e, mode = %self.mode, "Workflow failed");
                format!("Error in workflow: {}", e)
            }
        }
    }

    /// Run the pipeline and hand back the full state.
    pub async fn execute(&self, query: Query) -> Result<PipelineState> {
        let state = PipelineState::new(query);

        match self.mode {
            ExecutionMode::Graph => self.graph.invoke(state).await,
            ExecutionMode::Sequential => Ok(self.run_sequential(state).await),
        }
    }

    async fn run_sequential(&self, mut state: PipelineState) -> PipelineState {
        for stage in &self.stages {
            stage.run(&mut state).await;
            state.trace.push(stage.name().to_string());
        }
        state
    }

    pub fn status(&self) -> WorkflowStatus {
        WorkflowStatus {
            mode: self.mode,
            capability_names: self.registry.names(),
            nodes: self.graph.node_names().to_vec(),
            status: "ready".to_string(),
        }
    }
}

fn build_graph(stages: &[Arc<dyn Stage>]) -> Result<StageGraph> {
    let mut builder = StageGraph::builder();

    for stage in stages {
        builder = builder.node(stage.clone());
    }

    if let Some(first) = stages.first() {
        builder = builder.entry(first.name());
    }

    for pair in stages.windows(2) {
        builder = builder.edge(pair[0].name(), pair[1].name());
    }

    if let Some(last) = stages.last() {
        builder = builder.edge(last.name(), END);
    }

    builder.compile()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedModel;
    use crate::models::ToolParameters;
    use crate::test_support::StubTool;
    use crate::tools::{RAG_SEARCH, STOCK_QUOTE};
    use serde_json::json;

    const QUOTE_TEXT: &str = "AAPL is currently trading at $190.12, up $1.25 (0.66%) from previous close. Trading volume: 1,234,567 shares. Last updated: 2024-05-01.";
    const KB_ANSWER: &str = "Machine learning fits models to data.\n\nSources: ml.md";

    struct Fixture {
        model: Arc<ScriptedModel>,
        quote: Arc<StubTool>,
        rag: Arc<StubTool>,
        registry: Arc<ToolRegistry>,
    }

    fn fixture(planner_reply: &str) -> Fixture {
        let quote = Arc::new(StubTool::ok(STOCK_QUOTE, QUOTE_TEXT));
        let rag = Arc::new(StubTool::ok(RAG_SEARCH, KB_ANSWER));

        let mut registry = ToolRegistry::new();
        registry.register(quote.clone());
        registry.register(rag.clone());

        Fixture {
            model: Arc::new(ScriptedModel::replying(planner_reply)),
            quote,
            rag,
            registry: Arc::new(registry),
        }
    }

    fn orchestrator(fixture: &Fixture, mode: ExecutionMode) -> Orchestrator {
        let settings = WorkflowSettings {
            mode,
            parallel_tools: false,
        };
        Orchestrator::new(fixture.model.clone(), fixture.registry.clone(), &settings).unwrap()
    }

    #[tokio::test]
    async fn test_apple_price_returns_quote_text_verbatim() {
        let fixture = fixture(r#"{"tools_to_use": ["stock_quote"]}"#);
        let orchestrator = orchestrator(&fixture, ExecutionMode::Graph);

        let answer = orchestrator.run("What's Apple's stock price?", "default").await;

        assert_eq!(answer, QUOTE_TEXT);
        // Planner only; a single result skips synthesis.
        assert_eq!(fixture.model.call_count(), 1);
        assert_eq!(fixture.rag.call_count(), 0);

        let inputs = fixture.quote.seen_inputs();
        let inputs = inputs.lock().unwrap();
        assert_eq!(inputs[0].parameters["symbol"], json!("AAPL"));
    }

    #[tokio::test]
    async fn test_general_question_returns_kb_answer_verbatim() {
        let fixture = fixture("rag_search");
        let orchestrator = orchestrator(&fixture, ExecutionMode::Graph);

        let answer = orchestrator.run("Explain machine learning", "s-42").await;

        assert_eq!(answer, KB_ANSWER);
        assert_eq!(fixture.quote.call_count(), 0);

        let inputs = fixture.rag.seen_inputs();
        let inputs = inputs.lock().unwrap();
        assert_eq!(inputs[0].parameters["question"], json!("Explain machine learning"));
        assert_eq!(inputs[0].parameters["session_id"], json!("s-42"));
    }

    struct FixedPlan(Plan);

    #[async_trait]
    impl Stage for FixedPlan {
        fn name(&self) -> &'static str {
            PLANNER_NODE
        }

        async fn run(&self, state: &mut PipelineState) {
            state.plan = Some(self.0.clone());
        }
    }

    fn two_tool_orchestrator(model: Arc<ScriptedModel>) -> Orchestrator {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(StubTool::failing(STOCK_QUOTE, "MCP Error: rate limit")));
        registry.register(Arc::new(StubTool::ok(RAG_SEARCH, "A P/E ratio divides price by earnings.")));
        let registry = Arc::new(registry);

        let plan = Plan::empty("quote and definition")
            .with_tool(STOCK_QUOTE, ToolParameters::new())
            .with_tool(RAG_SEARCH, ToolParameters::new());

        let stages: Vec<Arc<dyn Stage>> = vec![
            Arc::new(FixedPlan(plan)),
            Arc::new(ExecutorStage {
                engine: ExecutionEngine::new(registry.clone()),
            }),
            Arc::new(SynthesizerStage {
                synthesizer: Synthesizer::new(model),
            }),
        ];

        Orchestrator::with_stages(registry, ExecutionMode::Graph, stages).unwrap()
    }

    #[tokio::test]
    async fn test_one_failing_tool_still_yields_an_answer() {
        let model = Arc::new(ScriptedModel::replying(
            "A P/E ratio divides price by earnings; the AAPL quote is unavailable right now.",
        ));
        let orchestrator = two_tool_orchestrator(model.clone());

        let answer = orchestrator.run("AAPL price and what is P/E?", "default").await;

        assert!(answer.contains("P/E ratio divides price by earnings"));
        assert_eq!(model.call_count(), 1);
        assert!(model.prompts()[0].contains("Error executing stock_quote"));
    }

    #[tokio::test]
    async fn test_fallback_keeps_success_and_error_text() {
        let orchestrator = two_tool_orchestrator(Arc::new(ScriptedModel::failing("groq unavailable")));

        let answer = orchestrator.run("AAPL price and what is P/E?", "default").await;

        assert!(answer.contains("rag_search: A P/E ratio divides price by earnings."));
        assert!(answer.contains("Error executing"));
        assert!(answer.contains("rate limit"));
    }

    #[tokio::test]
    async fn test_awkward_inputs_never_fail() {
        let fixture = fixture("rag_search");
        let orchestrator = orchestrator(&fixture, ExecutionMode::Sequential);

        let long_query = "lorem ipsum ".repeat(20_000);
        for query in ["", "   ", "?!#@ ~~ ---", "🙂🙂🙂", long_query.as_str()] {
            let answer = orchestrator.run(query, "").await;
            assert!(!answer.is_empty());
        }
    }

    #[tokio::test]
    async fn test_planner_failure_degrades_to_explanation() {
        let mut fixture = fixture("unused");
        fixture.model = Arc::new(ScriptedModel::failing("connection refused"));
        let orchestrator = orchestrator(&fixture, ExecutionMode::Graph);

        let answer = orchestrator.run("What's Apple's stock price?", "default").await;

        assert!(answer.contains("unable to answer"));
        assert!(answer.contains("connection refused"));
        assert_eq!(fixture.quote.call_count(), 0);
        assert_eq!(fixture.rag.call_count(), 0);
    }

    #[test]
    fn test_run_from_blocking_context() {
        let fixture = fixture("stock_quote");
        let orchestrator = orchestrator(&fixture, ExecutionMode::Sequential);

        let answer = tokio_test::block_on(orchestrator.run("How is MSFT doing?", "default"));

        assert_eq!(answer, QUOTE_TEXT);
    }

    #[tokio::test]
    async fn test_graph_and_sequential_agree() {
        for reply in ["stock_quote", "rag_search", "no idea"] {
            let graph = orchestrator(&fixture(reply), ExecutionMode::Graph);
            let sequential = orchestrator(&fixture(reply), ExecutionMode::Sequential);
            let query = Query::new("Is Tesla a buy?", "s1");

            let a = graph.execute(query.clone()).await.unwrap();
            let b = sequential.execute(query).await.unwrap();

            assert_eq!(a.outcome(), b.outcome(), "planner reply: {}", reply);
            assert_eq!(a.trace, b.trace);
            assert_eq!(a.trace, vec![PLANNER_NODE, EXECUTOR_NODE, SYNTHESIZER_NODE]);
        }
    }

    #[tokio::test]
    async fn test_missing_final_response_is_reported() {
        struct Silent;

        #[async_trait]
        impl Stage for Silent {
            fn name(&self) -> &'static str {
                "silent"
            }

            async fn run(&self, _state: &mut PipelineState) {}
        }

        let stages: Vec<Arc<dyn Stage>> = vec![Arc::new(Silent)];
        let orchestrator =
            Orchestrator::with_stages(Arc::new(ToolRegistry::new()), ExecutionMode::Graph, stages)
                .unwrap();

        assert_eq!(orchestrator.run("anything", "default").await, NO_RESPONSE);
    }

    #[test]
    fn test_status_lists_nodes_and_tools() {
        let orchestrator = orchestrator(&fixture("rag_search"), ExecutionMode::Sequential);
        let status = orchestrator.status();

        assert_eq!(status.mode, ExecutionMode::Sequential);
        assert_eq!(status.capability_names, vec![RAG_SEARCH, STOCK_QUOTE]);
        assert_eq!(status.nodes, vec![PLANNER_NODE, EXECUTOR_NODE, SYNTHESIZER_NODE]);
        assert_eq!(status.status, "ready");
    }
}
