//! Decision audit trail
//!
//! Every lifecycle change made through the portfolio store is recorded
//! with a hash of the application as it stood afterwards.

use crate::models::{Decision, DocumentStatus, LoanApplication, LoanStatus};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditAction {
    Decision { decision: Decision },
    StatusChange,
    DocumentReview {
        document_id: String,
        verdict: DocumentStatus,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub audit_id: Uuid,
    pub application_id: String,
    pub action: AuditAction,
    pub from: LoanStatus,
    pub to: LoanStatus,
    pub actor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
    pub snapshot_hash: String,
    #[serde(skip)]
    snapshot: Option<Arc<LoanApplication>>,
}

impl DecisionRecord {
    pub fn new(
        application: &LoanApplication,
        action: AuditAction,
        from: LoanStatus,
        actor: &str,
        note: Option<String>,
    ) -> Self {
        Self {
            audit_id: Uuid::new_v4(),
            application_id: application.id.clone(),
            action,
            from,
            to: application.status,
            actor: actor.to_string(),
            note,
            recorded_at: Utc::now(),
            snapshot_hash: compute_snapshot_hash(application),
            snapshot: Some(Arc::new(application.clone())),
        }
    }
}

/// Append-only audit trail storage
pub struct DecisionLog {
    records: Arc<RwLock<HashMap<Uuid, DecisionRecord>>>,
}

impl DecisionLog {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn record(&self, record: DecisionRecord) -> Result<Uuid> {
        let audit_id = record.audit_id;
        let mut records = self.records.write().await;
        records.insert(audit_id, record);
        Ok(audit_id)
    }

    pub async fn get(&self, audit_id: Uuid) -> Result<Option<DecisionRecord>> {
        let records = self.records.read().await;
        Ok(records.get(&audit_id).cloned())
    }

    /// All records for an application, oldest first
    pub async fn list_for_application(&self, application_id: &str) -> Result<Vec<DecisionRecord>> {
        let records = self.records.read().await;

        let mut items: Vec<_> = records
            .values()
            .filter(|record| record.application_id == application_id)
            .cloned()
            .collect();

        items.sort_by_key(|record| record.recorded_at);

        Ok(items)
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Drop every record (used when the population is regenerated)
    pub async fn clear(&self) {
        self.records.write().await.clear();
    }

    /// Recompute the snapshot hash and compare it with the stored one
    pub async fn verify_integrity(&self, audit_id: Uuid) -> Result<bool> {
        let records = self.records.read().await;

        match records.get(&audit_id) {
            Some(DecisionRecord {
                snapshot: Some(snapshot),
                snapshot_hash,
                ..
            }) => Ok(compute_snapshot_hash(snapshot) == *snapshot_hash),
            _ => Ok(false),
        }
    }
}

impl Default for DecisionLog {
    fn default() -> Self {
        Self::new()
    }
}

/// SHA-256 of the application's JSON form, streamed into the hasher
pub fn compute_snapshot_hash(application: &LoanApplication) -> String {
    let mut hasher = Sha256::new();

    if serde_json::to_writer(&mut HashWriter(&mut hasher), application).is_err() {
        return String::new();
    }

    hex::encode(hasher.finalize())
}

/// Adapter to allow writing into Sha256 via std::io::Write
struct HashWriter<'a, H: Digest>(&'a mut H);

impl<'a, H: Digest> Write for HashWriter<'a, H> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::generate_population_seeded;
    use chrono::TimeZone;

    fn create_test_application() -> LoanApplication {
        let as_of = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        generate_population_seeded(3, 11, as_of).remove(0)
    }

    #[test]
    fn test_snapshot_hash_is_stable() {
        let app = create_test_application();
        let hash = compute_snapshot_hash(&app);
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, compute_snapshot_hash(&app.clone()));

        let mut changed = app.clone();
        changed.amount += 1.0;
        assert_ne!(hash, compute_snapshot_hash(&changed));
    }

    #[tokio::test]
    async fn test_records_listed_in_order() {
        let log = DecisionLog::new();
        let app = create_test_application();

        let first = DecisionRecord::new(&app, AuditAction::StatusChange, app.status, "ops", None);
        let mut second = DecisionRecord::new(
            &app,
            AuditAction::Decision { decision: Decision::Reject },
            app.status,
            "underwriter",
            Some("Insufficient coverage".to_string()),
        );
        second.recorded_at = first.recorded_at + chrono::Duration::seconds(1);

        let second_id = log.record(second).await.unwrap();
        let first_id = log.record(first).await.unwrap();

        let listed = log.list_for_application(&app.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].audit_id, first_id);
        assert_eq!(listed[1].audit_id, second_id);
        assert!(log.list_for_application("APP-00000").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_verify_integrity() {
        let log = DecisionLog::new();
        let app = create_test_application();
        let id = log
            .record(DecisionRecord::new(&app, AuditAction::StatusChange, app.status, "ops", None))
            .await
            .unwrap();

        assert!(log.verify_integrity(id).await.unwrap());
        assert!(!log.verify_integrity(Uuid::new_v4()).await.unwrap());

        log.clear().await;
        assert!(log.is_empty().await);
    }
}
