//! Execution engine for agent runs
//!
//! Runs one stage agent against one application after a simulated
//! processing latency. At most one run per (application, stage) is in
//! flight; a run can be cancelled while it waits.

use crate::agents::{AgentContext, AgentRegistry, AgentReport};
use crate::analytics::CashFlowAnalysis;
use crate::error::LoanDeskError;
use crate::models::{AgentStage, LoanApplication};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Cancelled,
    Failed,
}

/// Outcome of a single agent run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentRun {
    pub run_id: Uuid,
    pub application_id: String,
    pub stage: AgentStage,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<AgentReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
    pub started_at: DateTime<Utc>,
}

/// Caller side of a cancellation pair
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        // Receiver may already be gone once the run finished
        let _ = self.tx.send(true);
    }
}

/// Engine side of a cancellation pair
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }
}

pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

type RunKey = (String, AgentStage);

/// Releases the in-flight slot when the run ends, however it ends
struct InFlightGuard {
    key: RunKey,
    in_flight: Arc<Mutex<HashSet<RunKey>>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Ok(mut set) = self.in_flight.lock() {
            set.remove(&self.key);
        }
    }
}

pub struct ExecutionEngine {
    registry: AgentRegistry,
    latency: Duration,
    in_flight: Arc<Mutex<HashSet<RunKey>>>,
}

impl ExecutionEngine {
    pub fn new(registry: AgentRegistry, latency: Duration) -> Self {
        Self {
            registry,
            latency,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn is_running(&self, application_id: &str, stage: AgentStage) -> bool {
        self.in_flight
            .lock()
            .map(|set| set.contains(&(application_id.to_string(), stage)))
            .unwrap_or(false)
    }

    fn acquire(&self, application_id: &str, stage: AgentStage) -> Result<InFlightGuard> {
        let key = (application_id.to_string(), stage);
        let mut set = self
            .in_flight
            .lock()
            .map_err(|_| LoanDeskError::AgentBusy {
                application_id: application_id.to_string(),
                stage: stage.to_string(),
            })?;

        if !set.insert(key.clone()) {
            return Err(LoanDeskError::AgentBusy {
                application_id: application_id.to_string(),
                stage: stage.to_string(),
            });
        }

        Ok(InFlightGuard {
            key,
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    /// Run the stage agent for an application.
    ///
    /// Fails with `AgentBusy` if the same stage is already running for this
    /// application and with `AgentNotRegistered` for an unknown stage. Agent
    /// errors do not fail the call; they come back as a `Failed` run.
    pub async fn run_agent(
        &self,
        application: &LoanApplication,
        stage: AgentStage,
        analysis: Option<&CashFlowAnalysis>,
        cancel: Option<CancelToken>,
    ) -> Result<AgentRun> {
        let agent = self
            .registry
            .get(stage)
            .ok_or_else(|| LoanDeskError::AgentNotRegistered(stage.to_string()))?;

        let _guard = self.acquire(&application.id, stage)?;

        let started_at = Utc::now();
        let start = Instant::now();
        let run_id = Uuid::new_v4();

        debug!(
            run_id = %run_id,
            application_id = %application.id,
            stage = %stage,
            "Agent run started"
        );

        let mut run = AgentRun {
            run_id,
            application_id: application.id.clone(),
            stage,
            status: RunStatus::Completed,
            report: None,
            error: None,
            elapsed_ms: 0,
            started_at,
        };

        if self.wait_or_cancel(cancel).await {
            run.status = RunStatus::Cancelled;
            run.elapsed_ms = start.elapsed().as_millis() as u64;
            info!(run_id = %run_id, application_id = %application.id, stage = %stage, "Agent run cancelled");
            return Ok(run);
        }

        let context = AgentContext { analysis };
        match agent.assess(application, &context) {
            Ok(report) => run.report = Some(report),
            Err(e) => {
                warn!(
                    run_id = %run_id,
                    application_id = %application.id,
                    stage = %stage,
                    error = %e,
                    "Agent run failed"
                );
                run.status = RunStatus::Failed;
                run.error = Some(e.to_string());
            }
        }

        run.elapsed_ms = start.elapsed().as_millis() as u64;

        debug!(
            run_id = %run_id,
            status = ?run.status,
            elapsed_ms = run.elapsed_ms,
            "Agent run finished"
        );

        Ok(run)
    }

    /// Returns true if cancelled before the latency elapsed
    async fn wait_or_cancel(&self, cancel: Option<CancelToken>) -> bool {
        let sleep = tokio::time::sleep(self.latency);
        tokio::pin!(sleep);

        let Some(mut token) = cancel else {
            sleep.await;
            return false;
        };

        if token.is_cancelled() {
            return true;
        }

        loop {
            tokio::select! {
                _ = &mut sleep => return false,
                changed = token.rx.changed() => match changed {
                    Ok(()) if token.is_cancelled() => return true,
                    Ok(()) => continue,
                    Err(_) => {
                        // Handle dropped without cancelling
                        (&mut sleep).await;
                        return false;
                    }
                },
            }
        }
    }
}
