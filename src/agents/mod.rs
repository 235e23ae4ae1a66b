//! Stage agents and registry
//!
//! One agent per workflow stage. Agents are deterministic and side-effect
//! free: they read an application (and its cash-flow analysis when the
//! stage needs one) and return a report. They never change status.

use crate::analytics::{CashFlowAnalysis, CashFlowHealth};
use crate::models::{AgentStage, Decision, DocumentStatus, LoanApplication, LoanStatus, RiskRating};
use crate::query::format_currency;
use crate::rng::{derive_seed, SeededRng};
use crate::verification::{create_default_underwriting_policy, UnderwritingPolicy};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Inputs shared by every agent run
#[derive(Default)]
pub struct AgentContext<'a> {
    pub analysis: Option<&'a CashFlowAnalysis>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Finding {
    pub label: String,
    pub passed: bool,
    pub detail: String,
}

impl Finding {
    fn new(label: &str, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            label: label.to_string(),
            passed,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentReport {
    pub stage: AgentStage,
    pub application_id: String,
    /// 0..=100, higher is better
    pub score: u8,
    pub risk: RiskRating,
    pub findings: Vec<Finding>,
    pub recommendation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_status: Option<LoanStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
}

impl AgentReport {
    fn new(stage: AgentStage, application: &LoanApplication, findings: Vec<Finding>) -> Self {
        let score = score_findings(&findings);
        Self {
            stage,
            application_id: application.id.clone(),
            score,
            risk: application.risk,
            findings,
            recommendation: String::new(),
            suggested_status: None,
            decision: None,
        }
    }
}

fn score_findings(findings: &[Finding]) -> u8 {
    if findings.is_empty() {
        return 100;
    }
    let passed = findings.iter().filter(|f| f.passed).count();
    (passed * 100 / findings.len()) as u8
}

/// Trait for a single stage agent (deterministic execution)
pub trait StageAgent: Send + Sync {
    fn stage(&self) -> AgentStage;
    fn description(&self) -> &'static str;
    fn assess(&self, application: &LoanApplication, context: &AgentContext<'_>) -> Result<AgentReport>;
}

/// Agent registry for looking up agents by stage
pub struct AgentRegistry {
    agents: HashMap<AgentStage, Arc<dyn StageAgent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: HashMap::new(),
        }
    }

    pub fn register(&mut self, agent: Arc<dyn StageAgent>) {
        self.agents.insert(agent.stage(), agent);
    }

    pub fn get(&self, stage: AgentStage) -> Option<Arc<dyn StageAgent>> {
        self.agents.get(&stage).cloned()
    }

    pub fn list(&self) -> Vec<AgentStage> {
        let mut stages: Vec<_> = self.agents.keys().copied().collect();
        stages.sort();
        stages
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

//
// ================= Intake =================
//

pub struct IntakeAgent;

impl StageAgent for IntakeAgent {
    fn stage(&self) -> AgentStage {
        AgentStage::Intake
    }

    fn description(&self) -> &'static str {
        "Checks that the application is complete enough to enter processing"
    }

    fn assess(&self, application: &LoanApplication, _context: &AgentContext<'_>) -> Result<AgentReport> {
        let borrower = &application.borrower;
        let missing = application.missing_documents();

        let findings = vec![
            Finding::new(
                "contact_details",
                borrower.email.contains('@') && !borrower.phone.is_empty(),
                format!("{} / {}", borrower.email, borrower.phone),
            ),
            Finding::new(
                "loan_request",
                application.amount > 0.0 && application.term > 0 && !application.purpose.is_empty(),
                format!(
                    "{} over {} months: {}",
                    format_currency(application.amount),
                    application.term,
                    application.purpose
                ),
            ),
            Finding::new(
                "required_documents",
                missing.is_empty(),
                if missing.is_empty() {
                    "All required documents uploaded".to_string()
                } else {
                    format!("Missing: {}", missing.join(", "))
                },
            ),
        ];

        let mut report = AgentReport::new(self.stage(), application, findings);
        if missing.is_empty() {
            report.recommendation = "Application complete; forward to processing.".to_string();
            report.suggested_status = match application.status {
                LoanStatus::Draft => Some(LoanStatus::Submitted),
                LoanStatus::Submitted => Some(LoanStatus::Reviewing),
                _ => None,
            };
        } else {
            report.recommendation = format!(
                "Request {} outstanding document(s) from the borrower.",
                missing.len()
            );
        }
        Ok(report)
    }
}

//
// ================= Processing =================
//

pub struct ProcessingAgent;

impl StageAgent for ProcessingAgent {
    fn stage(&self) -> AgentStage {
        AgentStage::Processing
    }

    fn description(&self) -> &'static str {
        "Tracks document verification and routes the file to underwriting"
    }

    fn assess(&self, application: &LoanApplication, _context: &AgentContext<'_>) -> Result<AgentReport> {
        let pending = application.pending_documents();
        let rejected = application
            .documents
            .iter()
            .filter(|d| d.status == DocumentStatus::Rejected)
            .count();
        let missing = application.missing_documents();

        let findings = vec![
            Finding::new("pending_review", pending == 0, format!("{} document(s) awaiting review", pending)),
            Finding::new("rejected_documents", rejected == 0, format!("{} document(s) rejected", rejected)),
            Finding::new(
                "completeness",
                missing.is_empty(),
                format!("{}% complete", application.completeness),
            ),
        ];

        let mut report = AgentReport::new(self.stage(), application, findings);
        if !missing.is_empty() {
            report.recommendation = "Request replacement documents from the borrower.".to_string();
            report.suggested_status = (application.status == LoanStatus::Reviewing)
                .then_some(LoanStatus::InformationNeeded);
        } else if pending > 0 {
            report.recommendation = format!("Verify {} pending document(s).", pending);
        } else {
            report.recommendation = "File verified; route to underwriting.".to_string();
            report.suggested_status = match application.status {
                LoanStatus::Reviewing => Some(LoanStatus::Underwriting),
                LoanStatus::InformationNeeded => Some(LoanStatus::Reviewing),
                _ => None,
            };
        }
        Ok(report)
    }
}

//
// ================= Underwriting =================
//

pub struct UnderwritingAgent {
    policy: UnderwritingPolicy,
}

impl UnderwritingAgent {
    pub fn new(policy: UnderwritingPolicy) -> Self {
        Self { policy }
    }
}

impl StageAgent for UnderwritingAgent {
    fn stage(&self) -> AgentStage {
        AgentStage::Underwriting
    }

    fn description(&self) -> &'static str {
        "Runs the underwriting policy against the application and its cash flow"
    }

    fn assess(&self, application: &LoanApplication, context: &AgentContext<'_>) -> Result<AgentReport> {
        let result = self.policy.evaluate(application, context.analysis)?;

        let findings = result
            .checks
            .iter()
            .map(|c| Finding::new(&c.rule_name, c.passed, c.details.clone()))
            .collect();

        let mut report = AgentReport::new(self.stage(), application, findings);
        report.risk = std::cmp::max(result.risk, application.risk);
        report.recommendation = if result.passed {
            "All underwriting rules passed.".to_string()
        } else {
            format!("{} rule(s) failed: {}", result.issues.len(), result.issues.join("; "))
        };
        Ok(report)
    }
}

//
// ================= Decision =================
//

pub struct DecisionAgent {
    policy: UnderwritingPolicy,
}

impl DecisionAgent {
    pub fn new(policy: UnderwritingPolicy) -> Self {
        Self { policy }
    }
}

impl StageAgent for DecisionAgent {
    fn stage(&self) -> AgentStage {
        AgentStage::Decision
    }

    fn description(&self) -> &'static str {
        "Recommends approve, approve with conditions, or reject"
    }

    fn assess(&self, application: &LoanApplication, context: &AgentContext<'_>) -> Result<AgentReport> {
        let result = self.policy.evaluate(application, context.analysis)?;
        let strong_cash_flow = context
            .analysis
            .map(|a| a.cash_flow_health == CashFlowHealth::Strong)
            .unwrap_or(false);

        let decision = if result.passed && strong_cash_flow && application.risk != RiskRating::High {
            Decision::Approve
        } else if result.risk < RiskRating::High {
            Decision::ConditionallyApprove
        } else {
            Decision::Reject
        };

        let findings = vec![
            Finding::new(
                "underwriting_policy",
                result.passed,
                format!("{}/{} rules passed", result.passed_count(), result.checks.len()),
            ),
            Finding::new(
                "cash_flow_health",
                strong_cash_flow,
                context
                    .analysis
                    .map(|a| format!("Cash flow health: {}", a.cash_flow_health))
                    .unwrap_or_else(|| "No cash-flow analysis".to_string()),
            ),
            Finding::new(
                "application_risk",
                application.risk != RiskRating::High,
                format!("Risk rated {}", application.risk),
            ),
        ];

        // Policy issues first, then whichever decision gates fell short
        let mut conditions = result.issues.clone();
        conditions.extend(
            findings
                .iter()
                .skip(1)
                .filter(|f| !f.passed)
                .map(|f| f.detail.clone()),
        );

        let mut report = AgentReport::new(self.stage(), application, findings);
        report.risk = std::cmp::max(result.risk, application.risk);
        report.decision = Some(decision);
        report.recommendation = match decision {
            Decision::Approve => "Approve as requested.".to_string(),
            Decision::ConditionallyApprove => {
                format!("Approve subject to: {}", conditions.join("; "))
            }
            Decision::Reject => format!("Reject: {}", conditions.join("; ")),
        };
        Ok(report)
    }
}

//
// ================= Fraud Risk =================
//

pub struct FraudRiskAgent;

impl StageAgent for FraudRiskAgent {
    fn stage(&self) -> AgentStage {
        AgentStage::FraudRisk
    }

    fn description(&self) -> &'static str {
        "Scans for inconsistencies that suggest misrepresentation"
    }

    fn assess(&self, application: &LoanApplication, _context: &AgentContext<'_>) -> Result<AgentReport> {
        let flagged_documents = application
            .documents
            .iter()
            .filter(|d| {
                d.analysis
                    .as_ref()
                    .map(|a| a.flags.iter().any(|f| f == "mismatch"))
                    .unwrap_or(false)
            })
            .count();

        let leverage = application
            .borrower
            .annual_revenue
            .filter(|r| *r > 0.0)
            .map(|r| application.amount / r);

        let young_business_large_loan = matches!(
            (application.borrower.years_in_business, leverage),
            (Some(years), Some(leverage)) if years < 2 && leverage > 1.0
        );

        let findings = vec![
            Finding::new(
                "document_consistency",
                flagged_documents == 0,
                format!("{} document(s) flagged for data mismatch", flagged_documents),
            ),
            Finding::new(
                "revenue_plausibility",
                leverage.map(|l| l <= 5.0).unwrap_or(true),
                leverage
                    .map(|l| format!("Requested amount is {:.1}x annual revenue", l))
                    .unwrap_or_else(|| "No company revenue reported".to_string()),
            ),
            Finding::new(
                "business_maturity",
                !young_business_large_loan,
                match application.borrower.years_in_business {
                    Some(years) => format!("{} year(s) in business", years),
                    None => "Individual borrower".to_string(),
                },
            ),
        ];

        let mut report = AgentReport::new(self.stage(), application, findings);
        let failed = report.findings.iter().filter(|f| !f.passed).count();
        report.risk = match failed {
            0 => RiskRating::Low,
            1 => RiskRating::Medium,
            _ => RiskRating::High,
        };
        report.recommendation = match report.risk {
            RiskRating::Low => "No fraud indicators found.".to_string(),
            RiskRating::Medium => "Minor inconsistencies; confirm with the borrower.".to_string(),
            RiskRating::High => "Escalate to fraud investigations before proceeding.".to_string(),
        };
        Ok(report)
    }
}

//
// ================= Collateral =================
//

pub struct CollateralAgent;

impl CollateralAgent {
    /// Typical maximum loan-to-value per asset class
    fn max_ltv(application: &LoanApplication) -> f64 {
        use crate::models::AssetClass::*;
        match application.asset_class {
            ResidentialMortgage => 0.80,
            CommercialRealEstate => 0.75,
            AutoLoan => 0.90,
            EquipmentFinance => 0.85,
            SmeLoan => 0.70,
            PersonalLoan | Other => 0.0,
        }
    }

    /// Appraised value, stable per application id
    pub fn estimated_value(application: &LoanApplication) -> f64 {
        let mut rng = SeededRng::new(derive_seed(0xC011_A7E2, &application.id));
        (application.amount * rng.range_f64(1.0, 1.6)).round()
    }
}

impl StageAgent for CollateralAgent {
    fn stage(&self) -> AgentStage {
        AgentStage::Collateral
    }

    fn description(&self) -> &'static str {
        "Estimates collateral value and loan-to-value coverage"
    }

    fn assess(&self, application: &LoanApplication, _context: &AgentContext<'_>) -> Result<AgentReport> {
        if !application.asset_class.is_secured() {
            let findings = vec![Finding::new("secured", false, "Unsecured facility")];
            let mut report = AgentReport::new(self.stage(), application, findings);
            report.risk = std::cmp::max(application.risk, RiskRating::Medium);
            report.recommendation =
                "No collateral; rely on borrower cash flow and guarantees.".to_string();
            return Ok(report);
        }

        let value = Self::estimated_value(application);
        let ltv = crate::analytics::safe_ratio(application.amount, value);
        let max_ltv = Self::max_ltv(application);

        let findings = vec![
            Finding::new("secured", true, format!("Collateral valued at {}", format_currency(value))),
            Finding::new(
                "loan_to_value",
                ltv <= max_ltv,
                format!("LTV {:.0}% (maximum {:.0}%)", ltv * 100.0, max_ltv * 100.0),
            ),
        ];

        let mut report = AgentReport::new(self.stage(), application, findings);
        if ltv > max_ltv {
            report.risk = application.risk.raise();
            report.recommendation = format!(
                "Reduce the amount to {} or add collateral.",
                format_currency(value * max_ltv)
            );
        } else {
            report.recommendation = "Collateral coverage adequate.".to_string();
        }
        Ok(report)
    }
}

//
// ================= Cash Flow =================
//

pub struct CashFlowAgent;

impl StageAgent for CashFlowAgent {
    fn stage(&self) -> AgentStage {
        AgentStage::CashFlowAnalysis
    }

    fn description(&self) -> &'static str {
        "Summarises repayment capacity from the cash-flow analysis"
    }

    fn assess(&self, application: &LoanApplication, context: &AgentContext<'_>) -> Result<AgentReport> {
        let Some(analysis) = context.analysis else {
            let findings = vec![Finding::new("analysis_available", false, "No cash-flow analysis")];
            let mut report = AgentReport::new(self.stage(), application, findings);
            report.recommendation = "Run cash-flow analysis first.".to_string();
            return Ok(report);
        };

        let mut findings: Vec<Finding> = analysis
            .strengths
            .iter()
            .map(|s| Finding::new("strength", true, s.clone()))
            .collect();
        findings.extend(
            analysis
                .concerns
                .iter()
                .map(|c| Finding::new("concern", false, c.clone())),
        );

        let mut report = AgentReport::new(self.stage(), application, findings);
        report.risk = match analysis.cash_flow_health {
            CashFlowHealth::Strong => RiskRating::Low,
            CashFlowHealth::Adequate => RiskRating::Medium,
            CashFlowHealth::Weak => RiskRating::High,
        };
        report.recommendation = analysis.recommendation.clone();
        Ok(report)
    }
}

/// Create a registry with one agent per stage
pub fn create_default_registry() -> AgentRegistry {
    let mut registry = AgentRegistry::new();

    registry.register(Arc::new(IntakeAgent));
    registry.register(Arc::new(ProcessingAgent));
    registry.register(Arc::new(UnderwritingAgent::new(create_default_underwriting_policy())));
    registry.register(Arc::new(DecisionAgent::new(create_default_underwriting_policy())));
    registry.register(Arc::new(FraudRiskAgent));
    registry.register(Arc::new(CollateralAgent));
    registry.register(Arc::new(CashFlowAgent));

    registry
}
