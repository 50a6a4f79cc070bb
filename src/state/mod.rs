//! Per-run pipeline state
//!
//! Created fresh for every query and owned by exactly one run. The planner
//! fills `plan`, the executor fills `results` and the synthesizer fills
//! `final_response`; no stage writes another stage's field.

use crate::models::{Plan, Query, ResultSet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineState {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub query: Query,
    pub plan: Option<Plan>,
    pub results: Option<ResultSet>,
    pub final_response: Option<String>,
    /// Names of the stages that ran, in order
    pub trace: Vec<String>,
}

impl PipelineState {
    pub fn new(query: Query) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            query,
            plan: None,
            results: None,
            final_response: None,
            trace: Vec::new(),
        }
    }

    /// The pipeline's output with the run-specific identity stripped, for
    /// comparing two runs of the same query.
    pub fn outcome(&self) -> (Option<&Plan>, Option<&ResultSet>, Option<&str>) {
        (
            self.plan.as_ref(),
            self.results.as_ref(),
            self.final_response.as_deref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_empty() {
        let state = PipelineState::new(Query::in_default_session("hi"));

        assert!(state.plan.is_none());
        assert!(state.results.is_none());
        assert!(state.final_response.is_none());
        assert!(state.trace.is_empty());
        assert_eq!(state.query.session_id, "default");
    }

    #[test]
    fn test_each_run_gets_its_own_id() {
        let a = PipelineState::new(Query::in_default_session("hi"));
        let b = PipelineState::new(Query::in_default_session("hi"));
        assert_ne!(a.run_id, b.run_id);
        assert_eq!(a.outcome(), b.outcome());
    }
}
