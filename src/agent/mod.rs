//! Workflow orchestrator - runs every stage agent over one application
//!
//! INTAKE → PROCESSING → FRAUD RISK → CASH FLOW → COLLATERAL → UNDERWRITING → DECISION
//!
//! The orchestrator only recommends. It never changes the application;
//! applying a decision goes through the portfolio store.

use crate::agents::AgentReport;
use crate::analytics::CashFlowAnalysis;
use crate::error::LoanDeskError;
use crate::execution::{ExecutionEngine, RunStatus};
use crate::models::{AgentStage, Decision, LoanApplication, RiskRating};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

/// Order in which stages run during a full workflow
pub const PIPELINE: [AgentStage; 7] = [
    AgentStage::Intake,
    AgentStage::Processing,
    AgentStage::FraudRisk,
    AgentStage::CashFlowAnalysis,
    AgentStage::Collateral,
    AgentStage::Underwriting,
    AgentStage::Decision,
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowResult {
    pub workflow_id: Uuid,
    pub application_id: String,
    pub recommended_decision: Decision,
    pub risk_summary: RiskRating,
    /// Mean report score across stages
    pub score: u8,
    pub reports: Vec<AgentReport>,
    pub reasoning_trace: Vec<String>,
    pub elapsed_ms: u64,
    pub completed_at: DateTime<Utc>,
}

pub struct WorkflowOrchestrator {
    engine: Arc<ExecutionEngine>,
}

impl WorkflowOrchestrator {
    pub fn new(engine: Arc<ExecutionEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &ExecutionEngine {
        &self.engine
    }

    /// Run the full pipeline and return a recommendation
    pub async fn run(
        &self,
        application: &LoanApplication,
        analysis: Option<&CashFlowAnalysis>,
    ) -> Result<WorkflowResult> {
        let start = Instant::now();
        let workflow_id = Uuid::new_v4();
        let mut reasoning_trace = Vec::with_capacity(PIPELINE.len() + 2);
        let mut reports = Vec::with_capacity(PIPELINE.len());

        info!(
            workflow_id = %workflow_id,
            application_id = %application.id,
            status = %application.status,
            "Workflow: starting"
        );

        reasoning_trace.push(format!(
            "INPUT: {} ({}, {})",
            application.id,
            application.asset_class.label(),
            application.display_status()
        ));

        for stage in PIPELINE {
            let run = self
                .engine
                .run_agent(application, stage, analysis, None)
                .await?;

            let report = match (run.status, run.report) {
                (RunStatus::Completed, Some(report)) => report,
                _ => {
                    return Err(LoanDeskError::ExecutionError(format!(
                        "{} agent did not complete: {}",
                        stage,
                        run.error.unwrap_or_else(|| "no report".to_string())
                    )))
                }
            };

            debug!(
                workflow_id = %workflow_id,
                stage = %stage,
                score = report.score,
                risk = %report.risk,
                "Stage complete"
            );

            reasoning_trace.push(format!(
                "{}: score {} / risk {} - {}",
                stage.as_str().to_uppercase(),
                report.score,
                report.risk,
                report.recommendation
            ));
            reports.push(report);
        }

        let risk_summary = reports
            .iter()
            .map(|r| r.risk)
            .max()
            .unwrap_or(application.risk);

        let recommended_decision = reports
            .iter()
            .find_map(|r| r.decision)
            .ok_or_else(|| LoanDeskError::ExecutionError("decision agent gave no decision".to_string()))?;

        // A high-risk finding anywhere caps the outcome at conditional approval
        let recommended_decision = match (recommended_decision, risk_summary) {
            (Decision::Approve, RiskRating::High) => Decision::ConditionallyApprove,
            (decision, _) => decision,
        };

        let score = if reports.is_empty() {
            0
        } else {
            (reports.iter().map(|r| r.score as u32).sum::<u32>() / reports.len() as u32) as u8
        };

        reasoning_trace.push(format!(
            "COMPLETE: recommend {} ({} risk)",
            recommended_decision.target_status().display_status(),
            risk_summary
        ));

        info!(
            workflow_id = %workflow_id,
            application_id = %application.id,
            decision = ?recommended_decision,
            risk = %risk_summary,
            "Workflow: complete"
        );

        Ok(WorkflowResult {
            workflow_id,
            application_id: application.id.clone(),
            recommended_decision,
            risk_summary,
            score,
            reports,
            reasoning_trace,
            elapsed_ms: start.elapsed().as_millis() as u64,
            completed_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::create_default_registry;
    use crate::analytics::synthesize_cash_flow_analysis;
    use crate::generator::generate_population_seeded;
    use crate::rng::SeededRng;
    use chrono::TimeZone;
    use std::time::Duration;

    fn create_test_orchestrator() -> WorkflowOrchestrator {
        let engine = ExecutionEngine::new(create_default_registry(), Duration::ZERO);
        WorkflowOrchestrator::new(Arc::new(engine))
    }

    fn create_test_population() -> Vec<LoanApplication> {
        let as_of = Utc.with_ymd_and_hms(2025, 6, 30, 0, 0, 0).unwrap();
        generate_population_seeded(20, 4242, as_of)
    }

    #[tokio::test]
    async fn test_workflow_runs_every_stage() {
        let orchestrator = create_test_orchestrator();
        let app = create_test_population().remove(0);
        let analysis = synthesize_cash_flow_analysis(&app, app.last_updated, &mut SeededRng::new(9));

        let result = orchestrator.run(&app, Some(&analysis)).await.unwrap();

        assert_eq!(result.reports.len(), PIPELINE.len());
        for (report, stage) in result.reports.iter().zip(PIPELINE) {
            assert_eq!(report.stage, stage);
        }
        assert_eq!(result.reasoning_trace.len(), PIPELINE.len() + 2);
        assert!(result.reasoning_trace[0].starts_with("INPUT"));
        assert!(result.reasoning_trace.last().unwrap().starts_with("COMPLETE"));
    }

    #[tokio::test]
    async fn test_workflow_does_not_mutate() {
        let orchestrator = create_test_orchestrator();
        for app in create_test_population() {
            let before = app.clone();
            orchestrator.run(&app, None).await.unwrap();
            assert_eq!(app, before);
        }
    }

    #[tokio::test]
    async fn test_high_risk_never_recommends_plain_approval() {
        let orchestrator = create_test_orchestrator();
        for app in create_test_population() {
            let result = orchestrator.run(&app, None).await.unwrap();
            if result.risk_summary == RiskRating::High {
                assert_ne!(result.recommended_decision, Decision::Approve);
            }
        }
    }
}
