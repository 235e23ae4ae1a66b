//! Portfolio state
//!
//! `Portfolio` is the single owner of a generated population. Readers get
//! borrowed views; the three lifecycle mutations each touch exactly one
//! application. `InMemoryPortfolioStore` shares a portfolio with the HTTP
//! server, memoises cash-flow analyses and records every change in the
//! decision log.

use crate::analytics::{synthesize_cash_flow_analysis, CashFlowAnalysis};
use crate::audit::{AuditAction, DecisionLog, DecisionRecord};
use crate::error::LoanDeskError;
use crate::generator::generate_population_seeded;
use crate::models::{
    AgentStage, Borrower, Decision, Document, DocumentStatus, LoanApplication, LoanStatus,
};
use crate::query::{self, PortfolioSummary};
use crate::rng::{derive_seed, SeededRng};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Result of a lifecycle mutation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusChange {
    pub from: LoanStatus,
    pub to: LoanStatus,
}

pub struct Portfolio {
    applications: Vec<LoanApplication>,
    index: HashMap<String, usize>,
    seed: u64,
    generated_at: DateTime<Utc>,
}

impl Portfolio {
    pub fn new(applications: Vec<LoanApplication>, seed: u64, generated_at: DateTime<Utc>) -> Self {
        let index = applications
            .iter()
            .enumerate()
            .map(|(i, app)| (app.id.clone(), i))
            .collect();

        Self {
            applications,
            index,
            seed,
            generated_at,
        }
    }

    /// Generate a fresh population; a missing seed is drawn from the clock
    pub fn generate(count: usize, seed: Option<u64>, as_of: DateTime<Utc>) -> Self {
        let seed = seed.unwrap_or_else(|| SeededRng::from_clock().next_u64());
        Self::new(generate_population_seeded(count, seed, as_of), seed, as_of)
    }

    pub fn applications(&self) -> &[LoanApplication] {
        &self.applications
    }

    pub fn len(&self) -> usize {
        self.applications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.applications.is_empty()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn get(&self, id: &str) -> Result<&LoanApplication> {
        self.index
            .get(id)
            .map(|&i| &self.applications[i])
            .ok_or_else(|| LoanDeskError::ApplicationNotFound(id.to_string()))
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut LoanApplication> {
        match self.index.get(id) {
            Some(&i) => Ok(&mut self.applications[i]),
            None => Err(LoanDeskError::ApplicationNotFound(id.to_string())),
        }
    }

    pub fn find_borrower(&self, id: &str) -> Result<&Borrower> {
        query::find_borrower(&self.applications, id)
    }

    /// Record an underwriting decision.
    ///
    /// Allowed from any decision-stage status, so an earlier decision can be
    /// overridden (approved to rejected and back). Only `status` changes on an
    /// override; the first decision also stamps `date_decided`. The time of
    /// each decision lives in the audit trail.
    pub fn apply_decision(
        &mut self,
        id: &str,
        decision: Decision,
        at: DateTime<Utc>,
    ) -> Result<StatusChange> {
        let application = self.get_mut(id)?;
        let from = application.status;

        if !AgentStage::Decision.statuses().contains(&from) {
            return Err(LoanDeskError::DecisionNotAllowed(from));
        }

        let to = decision.target_status();
        application.status = to;
        if application.date_decided.is_none() {
            application.date_decided = Some(at);
        }

        Ok(StatusChange { from, to })
    }

    /// Move one step along the lifecycle state machine
    pub fn advance_status(
        &mut self,
        id: &str,
        to: LoanStatus,
        at: DateTime<Utc>,
    ) -> Result<StatusChange> {
        let application = self.get_mut(id)?;
        let from = application.status;

        if !from.can_transition_to(to) {
            return Err(LoanDeskError::InvalidTransition { from, to });
        }

        application.status = to;
        match to {
            LoanStatus::Submitted => application.date_submitted = Some(at),
            LoanStatus::Approved | LoanStatus::ConditionallyApproved | LoanStatus::Rejected => {
                application.date_decided = Some(at)
            }
            LoanStatus::Funded => application.date_funded = Some(at),
            LoanStatus::Closed => application.date_closed = Some(at),
            _ => {}
        }
        application.last_updated = at;

        Ok(StatusChange { from, to })
    }

    /// Verify or reject a pending document; completeness follows
    pub fn review_document(
        &mut self,
        id: &str,
        document_id: &str,
        verdict: DocumentStatus,
        at: DateTime<Utc>,
    ) -> Result<Document> {
        let application = self.get_mut(id)?;

        let document = application
            .document_mut(document_id)
            .ok_or_else(|| LoanDeskError::DocumentNotFound {
                application_id: id.to_string(),
                document_id: document_id.to_string(),
            })?;

        if !document.status.can_transition_to(verdict) {
            return Err(LoanDeskError::InvalidDocumentTransition {
                from: document.status,
                to: verdict,
            });
        }

        document.status = verdict;
        document.reviewed_at = Some(at);
        let reviewed = document.clone();

        application.refresh_completeness();
        application.last_updated = at;

        Ok(reviewed)
    }
}

//
// ================= Store =================
//

/// Population metadata returned by a refresh
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PopulationInfo {
    pub count: usize,
    pub seed: u64,
    pub generated_at: DateTime<Utc>,
}

/// Trait for portfolio access shared with the HTTP layer
#[async_trait::async_trait]
pub trait PortfolioStore: Send + Sync {
    async fn list_applications(
        &self,
        stage: Option<AgentStage>,
        status: Option<LoanStatus>,
    ) -> Result<Vec<LoanApplication>>;
    async fn get_application(&self, id: &str) -> Result<LoanApplication>;
    async fn get_borrower(&self, id: &str) -> Result<Borrower>;
    async fn summary(&self) -> Result<PortfolioSummary>;
    async fn cash_flow_analysis(&self, id: &str) -> Result<CashFlowAnalysis>;
    /// Application and its analysis read from the same population
    async fn application_with_analysis(
        &self,
        id: &str,
    ) -> Result<(LoanApplication, CashFlowAnalysis)>;
    async fn apply_decision(
        &self,
        id: &str,
        decision: Decision,
        actor: &str,
        note: Option<String>,
    ) -> Result<LoanApplication>;
    async fn advance_status(&self, id: &str, to: LoanStatus, actor: &str) -> Result<LoanApplication>;
    async fn review_document(
        &self,
        id: &str,
        document_id: &str,
        verdict: DocumentStatus,
        actor: &str,
    ) -> Result<LoanApplication>;
    async fn refresh(&self, count: usize, seed: Option<u64>) -> Result<PopulationInfo>;
    async fn audit_trail(&self, id: &str) -> Result<Vec<DecisionRecord>>;
}

/// In-memory store for the dashboard server
pub struct InMemoryPortfolioStore {
    portfolio: Arc<RwLock<Portfolio>>,
    analyses: Arc<RwLock<HashMap<String, CashFlowAnalysis>>>,
    audit_log: DecisionLog,
}

impl InMemoryPortfolioStore {
    pub fn new(portfolio: Portfolio) -> Self {
        Self {
            portfolio: Arc::new(RwLock::new(portfolio)),
            analyses: Arc::new(RwLock::new(HashMap::new())),
            audit_log: DecisionLog::new(),
        }
    }

    pub fn generate(count: usize, seed: Option<u64>) -> Self {
        Self::new(Portfolio::generate(count, seed, Utc::now()))
    }

    pub fn audit_log(&self) -> &DecisionLog {
        &self.audit_log
    }

    pub async fn population_info(&self) -> PopulationInfo {
        let portfolio = self.portfolio.read().await;
        PopulationInfo {
            count: portfolio.len(),
            seed: portfolio.seed(),
            generated_at: portfolio.generated_at(),
        }
    }

    /// Caller holds the portfolio lock, so a refresh cannot interleave and
    /// leave a stale entry behind.
    async fn memoised_analysis(&self, portfolio: &Portfolio, id: &str) -> Result<CashFlowAnalysis> {
        let application = portfolio.get(id)?;

        {
            let analyses = self.analyses.read().await;
            if let Some(analysis) = analyses.get(id) {
                return Ok(analysis.clone());
            }
        }

        let mut analyses = self.analyses.write().await;
        let analysis = analyses.entry(id.to_string()).or_insert_with(|| {
            debug!(application_id = %id, "Synthesizing cash-flow analysis");
            let mut rng = SeededRng::new(derive_seed(portfolio.seed(), id));
            synthesize_cash_flow_analysis(application, portfolio.generated_at(), &mut rng)
        });

        Ok(analysis.clone())
    }

    /// Run a mutation, then log it against the updated application
    async fn mutate<F>(
        &self,
        id: &str,
        actor: &str,
        note: Option<String>,
        action: AuditAction,
        mutation: F,
    ) -> Result<LoanApplication>
    where
        F: FnOnce(&mut Portfolio, DateTime<Utc>) -> Result<StatusChange> + Send,
    {
        // The write guard spans the audit insert so a refresh cannot clear
        // the log between the two.
        let mut portfolio = self.portfolio.write().await;
        let change = mutation(&mut *portfolio, Utc::now())?;
        let updated = portfolio.get(id)?.clone();

        let record = DecisionRecord::new(&updated, action, change.from, actor, note);
        let audit_id = self.audit_log.record(record).await?;
        drop(portfolio);

        info!(
            application_id = %id,
            from = %change.from,
            to = %change.to,
            actor = %actor,
            audit_id = %audit_id,
            "Application updated"
        );

        Ok(updated)
    }
}

#[async_trait::async_trait]
impl PortfolioStore for InMemoryPortfolioStore {
    async fn list_applications(
        &self,
        stage: Option<AgentStage>,
        status: Option<LoanStatus>,
    ) -> Result<Vec<LoanApplication>> {
        let portfolio = self.portfolio.read().await;
        let population = portfolio.applications();

        let selected: Vec<&LoanApplication> = match stage {
            Some(stage) => query::applications_for_stage(population, stage),
            None => population.iter().collect(),
        };

        Ok(selected
            .into_iter()
            .filter(|app| status.map_or(true, |s| app.status == s))
            .cloned()
            .collect())
    }

    async fn get_application(&self, id: &str) -> Result<LoanApplication> {
        let portfolio = self.portfolio.read().await;
        portfolio.get(id).cloned()
    }

    async fn get_borrower(&self, id: &str) -> Result<Borrower> {
        let portfolio = self.portfolio.read().await;
        portfolio.find_borrower(id).cloned()
    }

    async fn summary(&self) -> Result<PortfolioSummary> {
        let portfolio = self.portfolio.read().await;
        Ok(query::portfolio_summary(portfolio.applications()))
    }

    /// Memoised per application id for the lifetime of the population
    async fn cash_flow_analysis(&self, id: &str) -> Result<CashFlowAnalysis> {
        let portfolio = self.portfolio.read().await;
        self.memoised_analysis(&portfolio, id).await
    }

    async fn application_with_analysis(
        &self,
        id: &str,
    ) -> Result<(LoanApplication, CashFlowAnalysis)> {
        let portfolio = self.portfolio.read().await;
        let analysis = self.memoised_analysis(&portfolio, id).await?;
        Ok((portfolio.get(id)?.clone(), analysis))
    }

    async fn apply_decision(
        &self,
        id: &str,
        decision: Decision,
        actor: &str,
        note: Option<String>,
    ) -> Result<LoanApplication> {
        self.mutate(id, actor, note, AuditAction::Decision { decision }, |portfolio, at| {
            portfolio.apply_decision(id, decision, at)
        })
        .await
    }

    async fn advance_status(&self, id: &str, to: LoanStatus, actor: &str) -> Result<LoanApplication> {
        self.mutate(id, actor, None, AuditAction::StatusChange, |portfolio, at| {
            portfolio.advance_status(id, to, at)
        })
        .await
    }

    async fn review_document(
        &self,
        id: &str,
        document_id: &str,
        verdict: DocumentStatus,
        actor: &str,
    ) -> Result<LoanApplication> {
        let action = AuditAction::DocumentReview {
            document_id: document_id.to_string(),
            verdict,
        };
        self.mutate(id, actor, None, action, |portfolio, at| {
            let status = portfolio.get(id)?.status;
            portfolio.review_document(id, document_id, verdict, at)?;
            Ok(StatusChange { from: status, to: status })
        })
        .await
    }

    async fn refresh(&self, count: usize, seed: Option<u64>) -> Result<PopulationInfo> {
        let mut portfolio = self.portfolio.write().await;
        *portfolio = Portfolio::generate(count, seed, Utc::now());

        self.analyses.write().await.clear();
        self.audit_log.clear().await;

        info!(
            count = portfolio.len(),
            seed = portfolio.seed(),
            "Population regenerated"
        );

        Ok(PopulationInfo {
            count: portfolio.len(),
            seed: portfolio.seed(),
            generated_at: portfolio.generated_at(),
        })
    }

    async fn audit_trail(&self, id: &str) -> Result<Vec<DecisionRecord>> {
        let portfolio = self.portfolio.read().await;
        portfolio.get(id)?;
        self.audit_log.list_for_application(id).await
    }
}
