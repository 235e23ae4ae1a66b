//! Loan Desk
//!
//! Data layer behind a loan-origination back-office dashboard:
//! - Generates a seeded, internally consistent population of loan applications
//! - Answers read-only stage, status and portfolio queries over it
//! - Synthesizes per-application cash-flow analyses and chart series
//! - Runs deterministic stage agents and a full review workflow
//! - Applies lifecycle changes one application at a time, with an audit trail
//!
//! WORKFLOW:
//! INTAKE → PROCESSING → FRAUD RISK → CASH FLOW → COLLATERAL → UNDERWRITING → DECISION

pub mod agent;
pub mod agents;
pub mod analytics;
pub mod api;
pub mod audit;
pub mod config;
pub mod error;
pub mod execution;
pub mod generator;
pub mod models;
pub mod query;
pub mod risk;
pub mod rng;
pub mod state;
pub mod verification;

pub use error::{LoanDeskError, Result};

// Re-export common types
pub use models::*;
pub use generator::{generate_population, generate_population_seeded};
pub use query::{
    applications_for_stage, approval_rate, count_by_status, format_currency, portfolio_summary,
};
pub use analytics::{synthesize_cash_flow_analysis, CashFlowAnalysis};
