//! REST API server for the loan desk dashboard
//!
//! Serves the generated population, cash-flow charts and agent runs to the
//! single-page UI. Every response uses the `ApiResponse` envelope.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::agent::{WorkflowOrchestrator, WorkflowResult};
use crate::analytics::{cash_flow_charts, CashFlowAnalysis, CashFlowCharts};
use crate::error::LoanDeskError;
use crate::execution::AgentRun;
use crate::models::{AgentStage, Decision, DocumentStatus, LoanApplication, LoanStatus};
use crate::state::PortfolioStore;
use crate::Result;

/// Upper bound for a population requested over HTTP
pub const MAX_POPULATION_SIZE: usize = 10_000;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub stage: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub decision: Decision,
    pub actor: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: LoanStatus,
    pub actor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub verdict: DocumentStatus,
    pub actor: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    /// Negative counts yield an empty population
    pub count: Option<i64>,
    pub seed: Option<u64>,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Application as the UI sees it, with the derived display status
#[derive(Debug, Serialize)]
pub struct ApplicationView {
    #[serde(flatten)]
    pub application: LoanApplication,
    pub display_status: &'static str,
}

impl From<LoanApplication> for ApplicationView {
    fn from(application: LoanApplication) -> Self {
        let display_status = application.display_status();
        Self {
            application,
            display_status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CashFlowResponse {
    pub analysis: CashFlowAnalysis,
    pub charts: CashFlowCharts,
}

type ApiReply = (StatusCode, Json<ApiResponse>);

pub fn status_for(error: &LoanDeskError) -> StatusCode {
    if error.is_not_found() {
        StatusCode::NOT_FOUND
    } else if error.is_conflict() {
        StatusCode::CONFLICT
    } else if error.is_busy() {
        StatusCode::TOO_MANY_REQUESTS
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn reply<T: Serialize>(result: Result<T>) -> ApiReply {
    match result {
        Ok(data) => (StatusCode::OK, Json(ApiResponse::success(data))),
        Err(e) => {
            let status = status_for(&e);
            if status == StatusCode::INTERNAL_SERVER_ERROR {
                warn!(error = %e, "Request failed");
            }
            (status, Json(ApiResponse::error(e.to_string())))
        }
    }
}

fn actor_or_default(actor: Option<String>) -> String {
    actor
        .filter(|a| !a.trim().is_empty())
        .unwrap_or_else(|| "loan-officer".to_string())
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn PortfolioStore>,
    pub orchestrator: Arc<WorkflowOrchestrator>,
    pub default_population_size: usize,
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Application Endpoints
/// =============================

async fn list_applications(
    State(state): State<ApiState>,
    Query(query): Query<ListQuery>,
) -> ApiReply {
    // Unknown stage or status names select nothing
    let stage = match query.stage.as_deref() {
        Some(name) => match AgentStage::parse(name) {
            Some(stage) => Some(stage),
            None => return reply(Ok(Vec::<ApplicationView>::new())),
        },
        None => None,
    };
    let status = match query.status.as_deref() {
        Some(name) => match LoanStatus::parse(name) {
            Some(status) => Some(status),
            None => return reply(Ok(Vec::<ApplicationView>::new())),
        },
        None => None,
    };

    let result = state
        .store
        .list_applications(stage, status)
        .await
        .map(|apps| apps.into_iter().map(ApplicationView::from).collect::<Vec<_>>());
    reply(result)
}

async fn get_application(State(state): State<ApiState>, Path(id): Path<String>) -> ApiReply {
    reply(state.store.get_application(&id).await.map(ApplicationView::from))
}

async fn get_cash_flow(State(state): State<ApiState>, Path(id): Path<String>) -> ApiReply {
    let result = state.store.cash_flow_analysis(&id).await.map(|analysis| {
        let charts = cash_flow_charts(&analysis);
        CashFlowResponse { analysis, charts }
    });
    reply(result)
}

async fn apply_decision(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(req): Json<DecisionRequest>,
) -> ApiReply {
    let actor = actor_or_default(req.actor);
    let result = state
        .store
        .apply_decision(&id, req.decision, &actor, req.note)
        .await
        .map(ApplicationView::from);
    reply(result)
}

async fn advance_status(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> ApiReply {
    let actor = actor_or_default(req.actor);
    let result = state
        .store
        .advance_status(&id, req.status, &actor)
        .await
        .map(ApplicationView::from);
    reply(result)
}

async fn review_document(
    State(state): State<ApiState>,
    Path((id, document_id)): Path<(String, String)>,
    Json(req): Json<ReviewRequest>,
) -> ApiReply {
    let actor = actor_or_default(req.actor);
    let result = state
        .store
        .review_document(&id, &document_id, req.verdict, &actor)
        .await
        .map(ApplicationView::from);
    reply(result)
}

/// =============================
/// Agent Endpoints
/// =============================

async fn run_agent(
    State(state): State<ApiState>,
    Path((id, stage)): Path<(String, String)>,
) -> ApiReply {
    let Some(stage) = AgentStage::parse(&stage) else {
        return reply::<()>(Err(LoanDeskError::AgentNotRegistered(stage)));
    };

    info!(application_id = %id, stage = %stage, "Agent run requested");
    reply(execute_agent(&state, &id, stage).await)
}

async fn execute_agent(state: &ApiState, id: &str, stage: AgentStage) -> Result<AgentRun> {
    let (application, analysis) = state.store.application_with_analysis(id).await?;
    state
        .orchestrator
        .engine()
        .run_agent(&application, stage, Some(&analysis), None)
        .await
}

async fn run_workflow(State(state): State<ApiState>, Path(id): Path<String>) -> ApiReply {
    info!(application_id = %id, "Workflow requested");
    reply(execute_workflow(&state, &id).await)
}

async fn execute_workflow(state: &ApiState, id: &str) -> Result<WorkflowResult> {
    let (application, analysis) = state.store.application_with_analysis(id).await?;
    state.orchestrator.run(&application, Some(&analysis)).await
}

/// =============================
/// Portfolio Endpoints
/// =============================

async fn get_borrower(State(state): State<ApiState>, Path(id): Path<String>) -> ApiReply {
    reply(state.store.get_borrower(&id).await)
}

async fn summary(State(state): State<ApiState>) -> ApiReply {
    reply(state.store.summary().await)
}

async fn refresh_population(
    State(state): State<ApiState>,
    body: Option<Json<RefreshRequest>>,
) -> ApiReply {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let count = match req.count {
        Some(count) => count.clamp(0, MAX_POPULATION_SIZE as i64) as usize,
        None => state.default_population_size,
    };
    reply(state.store.refresh(count, req.seed).await)
}

async fn audit_trail(State(state): State<ApiState>, Path(id): Path<String>) -> ApiReply {
    reply(state.store.audit_trail(&id).await)
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/applications", get(list_applications))
        .route("/api/applications/:id", get(get_application))
        .route("/api/applications/:id/cash-flow", get(get_cash_flow))
        .route("/api/applications/:id/decision", post(apply_decision))
        .route("/api/applications/:id/status", post(advance_status))
        .route(
            "/api/applications/:id/documents/:document_id/review",
            post(review_document),
        )
        .route("/api/applications/:id/agents/:stage", post(run_agent))
        .route("/api/applications/:id/workflow", post(run_workflow))
        .route("/api/borrowers/:id", get(get_borrower))
        .route("/api/summary", get(summary))
        .route("/api/population/refresh", post(refresh_population))
        .route("/api/audit/:id", get(audit_trail))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    state: ApiState,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
