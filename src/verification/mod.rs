//! Underwriting policy engine
//!
//! Rules-based checks run by the underwriting and decision agents.
//! Deterministic: the same application and analysis always give the same result.

use crate::analytics::CashFlowAnalysis;
use crate::models::{LoanApplication, RiskRating};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Trait for underwriting rules
pub trait UnderwritingRule: Send + Sync {
    fn name(&self) -> &'static str;

    /// Risk severity if this rule fails
    fn risk_level(&self) -> RiskRating;

    fn evaluate(
        &self,
        application: &LoanApplication,
        analysis: Option<&CashFlowAnalysis>,
    ) -> RuleOutcome;
}

pub struct RuleOutcome {
    pub passed: bool,
    pub details: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicyCheck {
    pub rule_name: String,
    pub passed: bool,
    pub details: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicyResult {
    pub passed: bool,
    pub risk: RiskRating,
    pub checks: Vec<PolicyCheck>,
    pub issues: Vec<String>,
    pub evaluated_at: DateTime<Utc>,
}

impl PolicyResult {
    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }
}

/// Policy engine that runs every rule and escalates risk on failures
pub struct UnderwritingPolicy {
    rules: Vec<Box<dyn UnderwritingRule>>,
}

impl UnderwritingPolicy {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn add_rule(&mut self, rule: Box<dyn UnderwritingRule>) {
        self.rules.push(rule);
    }

    pub fn evaluate(
        &self,
        application: &LoanApplication,
        analysis: Option<&CashFlowAnalysis>,
    ) -> Result<PolicyResult> {
        let mut checks = Vec::with_capacity(self.rules.len());
        let mut issues = Vec::new();
        let mut max_risk = RiskRating::Low;

        for rule in &self.rules {
            let outcome = rule.evaluate(application, analysis);

            if !outcome.passed {
                issues.push(format!("{}: {}", rule.name(), outcome.details));
                max_risk = std::cmp::max(max_risk, rule.risk_level());
            }

            checks.push(PolicyCheck {
                rule_name: rule.name().to_string(),
                passed: outcome.passed,
                details: outcome.details,
            });
        }

        let passed = issues.is_empty();

        debug!(
            application_id = %application.id,
            rule_count = self.rules.len(),
            passed,
            "Underwriting policy evaluated"
        );

        Ok(PolicyResult {
            passed,
            risk: max_risk,
            checks,
            issues,
            evaluated_at: Utc::now(),
        })
    }
}

impl Default for UnderwritingPolicy {
    fn default() -> Self {
        Self::new()
    }
}

//
// ========== Standard Rules ==========
//

pub struct MinimumCreditScoreRule {
    pub minimum: u16,
}

impl UnderwritingRule for MinimumCreditScoreRule {
    fn name(&self) -> &'static str {
        "minimum_credit_score"
    }

    fn risk_level(&self) -> RiskRating {
        RiskRating::High
    }

    fn evaluate(&self, application: &LoanApplication, _analysis: Option<&CashFlowAnalysis>) -> RuleOutcome {
        let score = application.borrower.credit_score;
        RuleOutcome {
            passed: score >= self.minimum,
            details: format!("Credit score {} (minimum {})", score, self.minimum),
        }
    }
}

pub struct DebtServiceCoverageRule {
    pub minimum: f64,
}

impl UnderwritingRule for DebtServiceCoverageRule {
    fn name(&self) -> &'static str {
        "debt_service_coverage"
    }

    fn risk_level(&self) -> RiskRating {
        RiskRating::High
    }

    fn evaluate(&self, _application: &LoanApplication, analysis: Option<&CashFlowAnalysis>) -> RuleOutcome {
        match analysis {
            Some(analysis) => {
                let dscr = analysis.projections.debt_service_coverage_ratio;
                RuleOutcome {
                    passed: dscr >= self.minimum,
                    details: format!("DSCR {:.2}x (minimum {:.2}x)", dscr, self.minimum),
                }
            }
            None => RuleOutcome {
                passed: false,
                details: "No cash-flow analysis available".to_string(),
            },
        }
    }
}

/// Companies only: requested amount against annual revenue
pub struct LoanToRevenueRule {
    pub maximum: f64,
}

impl UnderwritingRule for LoanToRevenueRule {
    fn name(&self) -> &'static str {
        "loan_to_revenue"
    }

    fn risk_level(&self) -> RiskRating {
        RiskRating::Medium
    }

    fn evaluate(&self, application: &LoanApplication, _analysis: Option<&CashFlowAnalysis>) -> RuleOutcome {
        match application.borrower.annual_revenue {
            Some(revenue) if revenue > 0.0 => {
                let ratio = application.amount / revenue;
                RuleOutcome {
                    passed: ratio <= self.maximum,
                    details: format!("Loan-to-revenue {:.2} (maximum {:.2})", ratio, self.maximum),
                }
            }
            Some(_) => RuleOutcome {
                passed: false,
                details: "Company reports no revenue".to_string(),
            },
            None => RuleOutcome {
                passed: true,
                details: "Not applicable to individual borrowers".to_string(),
            },
        }
    }
}

pub struct DocumentCompletenessRule {
    pub minimum: u8,
}

impl UnderwritingRule for DocumentCompletenessRule {
    fn name(&self) -> &'static str {
        "document_completeness"
    }

    fn risk_level(&self) -> RiskRating {
        RiskRating::Medium
    }

    fn evaluate(&self, application: &LoanApplication, _analysis: Option<&CashFlowAnalysis>) -> RuleOutcome {
        let missing = application.missing_documents();
        RuleOutcome {
            passed: application.completeness >= self.minimum,
            details: if missing.is_empty() {
                format!("{}% complete", application.completeness)
            } else {
                format!(
                    "{}% complete, missing: {}",
                    application.completeness,
                    missing.join(", ")
                )
            },
        }
    }
}

/// Create a policy with the standard underwriting rules
pub fn create_default_underwriting_policy() -> UnderwritingPolicy {
    let mut policy = UnderwritingPolicy::new();
    policy.add_rule(Box::new(MinimumCreditScoreRule { minimum: 620 }));
    policy.add_rule(Box::new(DebtServiceCoverageRule { minimum: 1.2 }));
    policy.add_rule(Box::new(LoanToRevenueRule { maximum: 3.0 }));
    policy.add_rule(Box::new(DocumentCompletenessRule { minimum: 80 }));
    policy
}

//
// ================= Tests =================
//
