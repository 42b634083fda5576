//! Challenge wizard engine — async coordination around the step state.
//!
//! Wraps the pure [`WizardState`] with the concerns the presentation layer
//! must not get wrong: a single in-flight submission per instance,
//! fire-and-forget notifications, and the terminal completed phase.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{Result, WizardError};
use crate::notify::{Notice, PresentationObserver};
use crate::services::{SubmissionTarget, SubmitOutcome};
use crate::wizard::rules::StepRules;
use crate::wizard::state::{
    AdvanceOutcome, ChallengePayload, Stage, StageField, WizardPhase, WizardState, fields,
};

/// Result of a finalize attempt that reached the submission target (or was
/// stopped by validation on the final step).
#[derive(Debug, Clone, PartialEq)]
pub enum FinalizeOutcome {
    /// The payload was accepted and the wizard entered its completed phase.
    Published { id: Uuid },
    /// Rejected — either by final-step validation or by the target. The
    /// wizard state is unchanged so the user can correct and retry.
    Rejected { errors: BTreeMap<String, String> },
}

/// Read-only projection of the wizard for the presentation layer.
#[derive(Debug, Clone, serde::Serialize)]
pub struct WizardSnapshot {
    pub step_index: usize,
    pub step_count: usize,
    pub phase: WizardPhase,
    pub data: serde_json::Map<String, Value>,
    pub step_errors: BTreeMap<String, String>,
    pub stages: Vec<Stage>,
    pub multi_stage: bool,
}

/// Generic N-step wizard engine, instantiated for challenge creation.
pub struct ChallengeWizard {
    state: RwLock<WizardState>,
    submission: Arc<dyn SubmissionTarget>,
    observer: Arc<dyn PresentationObserver>,
    in_flight: AtomicBool,
}

impl std::fmt::Debug for ChallengeWizard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChallengeWizard")
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

impl ChallengeWizard {
    pub fn new(
        submission: Arc<dyn SubmissionTarget>,
        observer: Arc<dyn PresentationObserver>,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: RwLock::new(WizardState::new(StepRules::challenge_creation())),
            submission,
            observer,
            in_flight: AtomicBool::new(false),
        })
    }

    // ── Field editing ────────────────────────────────────────────────

    pub async fn update_field(&self, name: &str, value: Value) {
        self.state.write().await.update_field(name, value);
    }

    pub async fn toggle_reward(&self, reward: &str) {
        self.state
            .write()
            .await
            .toggle_list_value(fields::REWARDS, reward);
    }

    // ── Stages ───────────────────────────────────────────────────────

    pub async fn add_stage(&self) -> u32 {
        self.state.write().await.add_stage()
    }

    pub async fn remove_stage(&self, id: u32) -> bool {
        self.state.write().await.remove_stage(id)
    }

    pub async fn update_stage(&self, id: u32, field: StageField, value: &str) -> bool {
        self.state.write().await.update_stage(id, field, value)
    }

    pub async fn set_multi_stage(&self, enabled: bool) {
        self.state.write().await.set_multi_stage(enabled);
    }

    // ── Navigation ───────────────────────────────────────────────────

    /// Revalidate the current step and advance on success.
    ///
    /// Every failing field is surfaced individually through the observer;
    /// a step completion is announced the same way. Rejected while a
    /// submission is in flight.
    pub async fn attempt_advance(&self) -> Result<AdvanceOutcome> {
        if self.in_flight.load(Ordering::Acquire) {
            return Err(WizardError::RequestInFlight.into());
        }
        let outcome = {
            let mut state = self.state.write().await;
            if state.phase() == WizardPhase::Completed {
                return Err(WizardError::AlreadyCompleted.into());
            }
            state.attempt_advance()
        };
        match &outcome {
            AdvanceOutcome::Advanced { step } => {
                tracing::debug!(step, "wizard advanced");
                self.observer.notify(Notice::StepCompleted { step: *step });
            }
            AdvanceOutcome::Rejected { errors } => {
                tracing::debug!(count = errors.len(), "wizard step rejected");
                self.notify_field_errors(errors);
            }
        }
        Ok(outcome)
    }

    /// Step backward; unconditional.
    pub async fn go_back(&self) {
        self.state.write().await.go_back();
    }

    // ── Completion ───────────────────────────────────────────────────

    /// Submit the accumulated data and enter the completed phase.
    ///
    /// Only valid on the last step; calling earlier is a contract
    /// violation reported as an error. A second finalize (or advance)
    /// while one is outstanding is rejected, never run concurrently.
    pub async fn finalize(&self) -> Result<FinalizeOutcome> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(WizardError::RequestInFlight.into());
        }

        let payload = match self.prepare_payload().await {
            Ok(payload) => payload,
            Err(e) => {
                self.in_flight.store(false, Ordering::Release);
                return Err(e);
            }
        };
        let payload = match payload {
            Prepared::Ready(payload) => payload,
            Prepared::Invalid(errors) => {
                self.in_flight.store(false, Ordering::Release);
                self.notify_field_errors(&errors);
                return Ok(FinalizeOutcome::Rejected { errors });
            }
        };

        let result = self.submission.submit(&payload).await;

        let outcome = match result {
            Ok(SubmitOutcome::Accepted { id }) => {
                let title = {
                    let mut state = self.state.write().await;
                    state.complete();
                    state
                        .data()
                        .get(fields::TITLE)
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string()
                };
                tracing::info!(%id, "challenge published");
                self.observer.notify(Notice::ChallengePublished { title });
                Ok(FinalizeOutcome::Published { id })
            }
            Ok(SubmitOutcome::FieldErrors(errors)) => {
                // Retryable: the wizard state stays untouched
                tracing::warn!(count = errors.len(), "submission rejected field errors");
                self.notify_field_errors(&errors);
                Ok(FinalizeOutcome::Rejected { errors })
            }
            Err(e) => {
                tracing::warn!(error = %e, "submission failed");
                Err(e.into())
            }
        };
        self.in_flight.store(false, Ordering::Release);
        outcome
    }

    /// Check preconditions and snapshot the payload under the state lock.
    async fn prepare_payload(&self) -> Result<Prepared> {
        let state = self.state.read().await;
        if state.phase() == WizardPhase::Completed {
            return Err(WizardError::AlreadyCompleted.into());
        }
        if !state.on_last_step() {
            return Err(WizardError::FinalizeBeforeLastStep {
                step_index: state.step_index(),
                step_count: state.step_count(),
            }
            .into());
        }
        let errors = state.validate_final_step();
        if !errors.is_empty() {
            return Ok(Prepared::Invalid(errors));
        }
        Ok(Prepared::Ready(state.payload()))
    }

    /// Announce a draft save. The draft itself lives with the host
    /// application; the core only reports the intent.
    pub async fn save_draft(&self) {
        tracing::debug!("wizard draft saved");
        self.observer.notify(Notice::DraftSaved);
    }

    /// Reset to a fresh instance ("create another"). Stage ids restart
    /// at 1. Rejected while a submission is in flight.
    pub async fn reset(&self) -> Result<()> {
        if self.in_flight.load(Ordering::Acquire) {
            return Err(WizardError::RequestInFlight.into());
        }
        self.state.write().await.reset();
        Ok(())
    }

    // ── Read-only projections ────────────────────────────────────────

    pub async fn step_index(&self) -> usize {
        self.state.read().await.step_index()
    }

    pub async fn phase(&self) -> WizardPhase {
        self.state.read().await.phase()
    }

    pub async fn step_errors(&self) -> BTreeMap<String, String> {
        self.state.read().await.step_errors().clone()
    }

    pub async fn snapshot(&self) -> WizardSnapshot {
        let state = self.state.read().await;
        WizardSnapshot {
            step_index: state.step_index(),
            step_count: state.step_count(),
            phase: state.phase(),
            data: state.data().clone(),
            step_errors: state.step_errors().clone(),
            stages: state.stages().to_vec(),
            multi_stage: state.multi_stage(),
        }
    }

    fn notify_field_errors(&self, errors: &BTreeMap<String, String>) {
        for (field, message) in errors {
            self.observer.notify(Notice::ValidationFailed {
                field: field.clone(),
                message: message.clone(),
            });
        }
    }
}

enum Prepared {
    Ready(ChallengePayload),
    Invalid(BTreeMap<String, String>),
}
