//! Error types for the loan desk

use crate::models::{DocumentStatus, LoanStatus};
use thiserror::Error;

/// Result type alias for loan desk operations
pub type Result<T> = std::result::Result<T, LoanDeskError>;

#[derive(Error, Debug)]
pub enum LoanDeskError {

    // =============================
    // Lookup Errors
    // =============================

    #[error("Application not found: {0}")]
    ApplicationNotFound(String),

    #[error("Borrower not found: {0}")]
    BorrowerNotFound(String),

    #[error("Document {document_id} not found on application {application_id}")]
    DocumentNotFound {
        application_id: String,
        document_id: String,
    },

    // =============================
    // Lifecycle Errors
    // =============================

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: LoanStatus, to: LoanStatus },

    #[error("Invalid document transition: {from} -> {to}")]
    InvalidDocumentTransition {
        from: DocumentStatus,
        to: DocumentStatus,
    },

    #[error("Decision not allowed while application is {0}")]
    DecisionNotAllowed(LoanStatus),

    // =============================
    // Agent Errors
    // =============================

    #[error("Agent not registered: {0}")]
    AgentNotRegistered(String),

    #[error("Agent {stage} already running for application {application_id}")]
    AgentBusy {
        application_id: String,
        stage: String,
    },

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl LoanDeskError {
    /// Lookup misses are reported to callers as "not found", never as failures
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LoanDeskError::ApplicationNotFound(_)
                | LoanDeskError::BorrowerNotFound(_)
                | LoanDeskError::DocumentNotFound { .. }
                | LoanDeskError::AgentNotRegistered(_)
        )
    }

    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            LoanDeskError::InvalidTransition { .. }
                | LoanDeskError::InvalidDocumentTransition { .. }
                | LoanDeskError::DecisionNotAllowed(_)
        )
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, LoanDeskError::AgentBusy { .. })
    }
}
