//! Core data models for the loan desk

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

//
// ================= Enums =================
//

/// Internal lifecycle status of a loan application.
///
/// Declaration order follows the lifecycle, so `Ord` sorts drafts first
/// and closed loans last.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Draft,
    Submitted,
    Reviewing,
    InformationNeeded,
    Underwriting,
    Approved,
    ConditionallyApproved,
    Rejected,
    Funding,
    Funded,
    Closed,
}

impl LoanStatus {
    pub const ALL: [LoanStatus; 11] = [
        LoanStatus::Draft,
        LoanStatus::Submitted,
        LoanStatus::Reviewing,
        LoanStatus::InformationNeeded,
        LoanStatus::Underwriting,
        LoanStatus::Approved,
        LoanStatus::ConditionallyApproved,
        LoanStatus::Rejected,
        LoanStatus::Funding,
        LoanStatus::Funded,
        LoanStatus::Closed,
    ];

    /// Statuses counted as "decided" for approval-rate purposes
    pub const DECIDED: [LoanStatus; 3] = [
        LoanStatus::Approved,
        LoanStatus::ConditionallyApproved,
        LoanStatus::Rejected,
    ];

    pub const APPROVED: [LoanStatus; 2] =
        [LoanStatus::Approved, LoanStatus::ConditionallyApproved];

    pub const IN_PROCESS: [LoanStatus; 4] = [
        LoanStatus::Submitted,
        LoanStatus::Reviewing,
        LoanStatus::InformationNeeded,
        LoanStatus::Underwriting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Draft => "draft",
            LoanStatus::Submitted => "submitted",
            LoanStatus::Reviewing => "reviewing",
            LoanStatus::InformationNeeded => "information_needed",
            LoanStatus::Underwriting => "underwriting",
            LoanStatus::Approved => "approved",
            LoanStatus::ConditionallyApproved => "conditionally_approved",
            LoanStatus::Rejected => "rejected",
            LoanStatus::Funding => "funding",
            LoanStatus::Funded => "funded",
            LoanStatus::Closed => "closed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_lowercase().replace(&['-', ' '][..], "_");
        LoanStatus::ALL
            .iter()
            .copied()
            .find(|s| s.as_str() == normalized)
    }

    /// Human-readable projection of the status. Never stored.
    pub fn display_status(&self) -> &'static str {
        match self {
            LoanStatus::Draft => "Draft",
            LoanStatus::Submitted => "Submitted",
            LoanStatus::Reviewing => "In Review",
            LoanStatus::InformationNeeded => "Information Needed",
            LoanStatus::Underwriting => "Underwriting",
            LoanStatus::Approved => "Approved",
            LoanStatus::ConditionallyApproved => "Conditionally Approved",
            LoanStatus::Rejected => "Rejected",
            LoanStatus::Funding => "Funding",
            LoanStatus::Funded => "Funded",
            LoanStatus::Closed => "Closed",
        }
    }

    /// Allowed successors in the lifecycle state machine
    pub fn next_statuses(&self) -> &'static [LoanStatus] {
        match self {
            LoanStatus::Draft => &[LoanStatus::Submitted],
            LoanStatus::Submitted => &[LoanStatus::Reviewing],
            LoanStatus::Reviewing => &[LoanStatus::InformationNeeded, LoanStatus::Underwriting],
            LoanStatus::InformationNeeded => &[LoanStatus::Reviewing],
            LoanStatus::Underwriting => &[
                LoanStatus::Approved,
                LoanStatus::ConditionallyApproved,
                LoanStatus::Rejected,
            ],
            LoanStatus::Approved => &[LoanStatus::Funding],
            LoanStatus::ConditionallyApproved => &[LoanStatus::Funding],
            LoanStatus::Funding => &[LoanStatus::Funded],
            LoanStatus::Funded => &[LoanStatus::Closed],
            LoanStatus::Rejected | LoanStatus::Closed => &[],
        }
    }

    pub fn can_transition_to(&self, next: LoanStatus) -> bool {
        self.next_statuses().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.next_statuses().is_empty()
    }

    pub fn is_decided(&self) -> bool {
        LoanStatus::DECIDED.contains(self)
    }

    pub fn is_in_process(&self) -> bool {
        LoanStatus::IN_PROCESS.contains(self)
    }

    /// Coarse lifecycle depth: parallel branches share a depth
    pub fn progress(&self) -> u8 {
        match self {
            LoanStatus::Draft => 0,
            LoanStatus::Submitted => 1,
            LoanStatus::Reviewing | LoanStatus::InformationNeeded => 2,
            LoanStatus::Underwriting => 3,
            LoanStatus::Approved | LoanStatus::ConditionallyApproved | LoanStatus::Rejected => 4,
            LoanStatus::Funding => 5,
            LoanStatus::Funded => 6,
            LoanStatus::Closed => 7,
        }
    }

    /// True once an underwriting decision has been made
    pub fn has_decision(&self) -> bool {
        self.progress() >= 4
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    ResidentialMortgage,
    CommercialRealEstate,
    AutoLoan,
    PersonalLoan,
    SmeLoan,
    EquipmentFinance,
    Other,
}

impl AssetClass {
    pub const ALL: [AssetClass; 7] = [
        AssetClass::ResidentialMortgage,
        AssetClass::CommercialRealEstate,
        AssetClass::AutoLoan,
        AssetClass::PersonalLoan,
        AssetClass::SmeLoan,
        AssetClass::EquipmentFinance,
        AssetClass::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::ResidentialMortgage => "residential_mortgage",
            AssetClass::CommercialRealEstate => "commercial_real_estate",
            AssetClass::AutoLoan => "auto_loan",
            AssetClass::PersonalLoan => "personal_loan",
            AssetClass::SmeLoan => "sme_loan",
            AssetClass::EquipmentFinance => "equipment_finance",
            AssetClass::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AssetClass::ResidentialMortgage => "Residential Mortgage",
            AssetClass::CommercialRealEstate => "Commercial Real Estate",
            AssetClass::AutoLoan => "Auto Loan",
            AssetClass::PersonalLoan => "Personal Loan",
            AssetClass::SmeLoan => "SME Loan",
            AssetClass::EquipmentFinance => "Equipment Finance",
            AssetClass::Other => "Other",
        }
    }

    /// Borrowers in these classes are companies
    pub fn is_business(&self) -> bool {
        matches!(
            self,
            AssetClass::CommercialRealEstate | AssetClass::SmeLoan | AssetClass::EquipmentFinance
        )
    }

    pub fn is_secured(&self) -> bool {
        !matches!(self, AssetClass::PersonalLoan | AssetClass::Other)
    }

    pub fn required_documents(&self) -> &'static [&'static str] {
        match self {
            AssetClass::ResidentialMortgage => &[
                "identity_document",
                "proof_of_income",
                "bank_statements",
                "property_appraisal",
                "purchase_agreement",
            ],
            AssetClass::CommercialRealEstate => &[
                "business_registration",
                "financial_statements",
                "tax_returns",
                "rent_roll",
                "property_appraisal",
                "environmental_report",
            ],
            AssetClass::AutoLoan => &["identity_document", "proof_of_income", "vehicle_invoice"],
            AssetClass::PersonalLoan => &["identity_document", "proof_of_income", "bank_statements"],
            AssetClass::SmeLoan => &[
                "business_registration",
                "financial_statements",
                "tax_returns",
                "bank_statements",
                "business_plan",
            ],
            AssetClass::EquipmentFinance => &[
                "business_registration",
                "financial_statements",
                "equipment_quote",
                "bank_statements",
            ],
            AssetClass::Other => &["identity_document", "proof_of_income"],
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RiskRating {
    Low,
    Medium,
    High,
}

impl RiskRating {
    pub fn raise(self) -> Self {
        match self {
            RiskRating::Low => RiskRating::Medium,
            _ => RiskRating::High,
        }
    }

    pub fn lower(self) -> Self {
        match self {
            RiskRating::High => RiskRating::Medium,
            _ => RiskRating::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Verified,
    Rejected,
}

impl DocumentStatus {
    /// Documents only ever leave `pending`, and never come back
    pub fn can_transition_to(&self, next: DocumentStatus) -> bool {
        matches!(
            (self, next),
            (DocumentStatus::Pending, DocumentStatus::Verified)
                | (DocumentStatus::Pending, DocumentStatus::Rejected)
        )
    }

    /// Pending and verified documents still count toward completeness
    pub fn is_usable(&self) -> bool {
        !matches!(self, DocumentStatus::Rejected)
    }
}

/// Workflow stages handled by the agent screens
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum AgentStage {
    Intake,
    Processing,
    Underwriting,
    Decision,
    FraudRisk,
    CashFlowAnalysis,
    Collateral,
}

impl AgentStage {
    pub const ALL: [AgentStage; 7] = [
        AgentStage::Intake,
        AgentStage::Processing,
        AgentStage::Underwriting,
        AgentStage::Decision,
        AgentStage::FraudRisk,
        AgentStage::CashFlowAnalysis,
        AgentStage::Collateral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStage::Intake => "intake",
            AgentStage::Processing => "processing",
            AgentStage::Underwriting => "underwriting",
            AgentStage::Decision => "decision",
            AgentStage::FraudRisk => "fraud-risk",
            AgentStage::CashFlowAnalysis => "cash-flow-analysis",
            AgentStage::Collateral => "collateral",
        }
    }

    /// Lenient parse; unknown names yield `None`
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().replace('_', "-").as_str() {
            "intake" => Some(AgentStage::Intake),
            "processing" => Some(AgentStage::Processing),
            "underwriting" => Some(AgentStage::Underwriting),
            "decision" => Some(AgentStage::Decision),
            "fraud-risk" | "fraud" => Some(AgentStage::FraudRisk),
            "cash-flow-analysis" | "cash-flow" | "cashflow" => Some(AgentStage::CashFlowAnalysis),
            "collateral" => Some(AgentStage::Collateral),
            _ => None,
        }
    }

    /// Fixed status set worked by this stage
    pub fn statuses(&self) -> &'static [LoanStatus] {
        match self {
            AgentStage::Intake => &[LoanStatus::Draft, LoanStatus::Submitted],
            AgentStage::Processing => &[LoanStatus::Reviewing, LoanStatus::InformationNeeded],
            AgentStage::Underwriting => &[LoanStatus::Underwriting],
            AgentStage::Decision => &[
                LoanStatus::Underwriting,
                LoanStatus::Approved,
                LoanStatus::ConditionallyApproved,
                LoanStatus::Rejected,
            ],
            AgentStage::FraudRisk => &[
                LoanStatus::Submitted,
                LoanStatus::Reviewing,
                LoanStatus::Underwriting,
            ],
            AgentStage::CashFlowAnalysis => &[LoanStatus::Reviewing, LoanStatus::Underwriting],
            AgentStage::Collateral => &[LoanStatus::Underwriting, LoanStatus::ConditionallyApproved],
        }
    }

    /// Lifecycle depth at which an agent gets assigned to this stage
    pub fn entry_progress(&self) -> u8 {
        match self {
            AgentStage::Intake => 0,
            AgentStage::FraudRisk => 1,
            AgentStage::Processing | AgentStage::CashFlowAnalysis => 2,
            AgentStage::Underwriting | AgentStage::Collateral => 3,
            AgentStage::Decision => 4,
        }
    }
}

/// Outcome of the decision action
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    ConditionallyApprove,
    Reject,
}

impl Decision {
    pub fn target_status(&self) -> LoanStatus {
        match self {
            Decision::Approve => LoanStatus::Approved,
            Decision::ConditionallyApprove => LoanStatus::ConditionallyApproved,
            Decision::Reject => LoanStatus::Rejected,
        }
    }
}

//
// ================= Borrower =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Borrower {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub credit_score: u16,
    pub credit_rating: String,
    pub company_name: Option<String>,
    pub industry: Option<String>,
    pub annual_revenue: Option<f64>,
    pub years_in_business: Option<u32>,
    pub address: Address,
}

impl Borrower {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Company name when present, otherwise the person's name
    pub fn display_name(&self) -> String {
        self.company_name.clone().unwrap_or_else(|| self.full_name())
    }
}

/// Bureau-style band for a credit score
pub fn credit_rating_for(score: u16) -> &'static str {
    match score {
        800.. => "Excellent",
        740..=799 => "Very Good",
        670..=739 => "Good",
        580..=669 => "Fair",
        _ => "Poor",
    }
}

//
// ================= Documents & Notes =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentAnalysis {
    pub summary: String,
    pub confidence: f32,
    pub flags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub status: DocumentStatus,
    pub uploaded_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub analysis: Option<DocumentAnalysis>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Note {
    pub id: String,
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AgentAssignments {
    pub intake: Option<String>,
    pub processing: Option<String>,
    pub underwriting: Option<String>,
    pub decision: Option<String>,
    pub fraud_risk: Option<String>,
    pub cash_flow_analysis: Option<String>,
    pub collateral: Option<String>,
}

impl AgentAssignments {
    pub fn get(&self, stage: AgentStage) -> Option<&str> {
        self.slot(stage).as_deref()
    }

    pub fn assign(&mut self, stage: AgentStage, agent_id: String) {
        *self.slot_mut(stage) = Some(agent_id);
    }

    fn slot(&self, stage: AgentStage) -> &Option<String> {
        match stage {
            AgentStage::Intake => &self.intake,
            AgentStage::Processing => &self.processing,
            AgentStage::Underwriting => &self.underwriting,
            AgentStage::Decision => &self.decision,
            AgentStage::FraudRisk => &self.fraud_risk,
            AgentStage::CashFlowAnalysis => &self.cash_flow_analysis,
            AgentStage::Collateral => &self.collateral,
        }
    }

    fn slot_mut(&mut self, stage: AgentStage) -> &mut Option<String> {
        match stage {
            AgentStage::Intake => &mut self.intake,
            AgentStage::Processing => &mut self.processing,
            AgentStage::Underwriting => &mut self.underwriting,
            AgentStage::Decision => &mut self.decision,
            AgentStage::FraudRisk => &mut self.fraud_risk,
            AgentStage::CashFlowAnalysis => &mut self.cash_flow_analysis,
            AgentStage::Collateral => &mut self.collateral,
        }
    }
}

//
// ================= Loan Application =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoanApplication {
    pub id: String,
    pub borrower: Borrower,
    pub asset_class: AssetClass,
    pub amount: f64,
    /// Months
    pub term: u32,
    /// Percent per annum
    pub interest_rate: f64,
    pub purpose: String,
    pub status: LoanStatus,
    pub completeness: u8,
    pub risk: RiskRating,
    pub documents: Vec<Document>,
    pub notes: Vec<Note>,
    pub date_created: DateTime<Utc>,
    pub date_submitted: Option<DateTime<Utc>>,
    pub date_decided: Option<DateTime<Utc>>,
    pub date_funded: Option<DateTime<Utc>>,
    pub date_closed: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
    pub agent_assignments: AgentAssignments,
}

impl LoanApplication {
    pub fn display_status(&self) -> &'static str {
        self.status.display_status()
    }

    pub fn document(&self, document_id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == document_id)
    }

    pub fn document_mut(&mut self, document_id: &str) -> Option<&mut Document> {
        self.documents.iter_mut().find(|d| d.id == document_id)
    }

    /// Required document kinds with no pending or verified upload
    pub fn missing_documents(&self) -> Vec<&'static str> {
        self.asset_class
            .required_documents()
            .iter()
            .copied()
            .filter(|kind| {
                !self
                    .documents
                    .iter()
                    .any(|d| d.kind == *kind && d.status.is_usable())
            })
            .collect()
    }

    pub fn pending_documents(&self) -> usize {
        self.documents
            .iter()
            .filter(|d| d.status == DocumentStatus::Pending)
            .count()
    }

    /// Completeness derived from the document set
    pub fn compute_completeness(&self) -> u8 {
        let required = self.asset_class.required_documents().len();
        if required == 0 {
            return 100;
        }
        let collected = required - self.missing_documents().len();
        crate::analytics::round_half_up(collected as f64 / required as f64 * 100.0) as u8
    }

    pub fn refresh_completeness(&mut self) {
        self.completeness = self.compute_completeness();
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl fmt::Display for RiskRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskRating::Low => "Low",
            RiskRating::Medium => "Medium",
            RiskRating::High => "High",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Verified => "verified",
            DocumentStatus::Rejected => "rejected",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for AgentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
