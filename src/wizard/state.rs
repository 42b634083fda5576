//! Wizard step state — accumulated data, per-step errors, dynamic stages.
//!
//! Pure state: every operation is synchronous and deterministic. The async
//! coordination (in-flight guard, submission handoff, notifications) lives
//! in the engine.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::wizard::rules::StepRules;

/// Field names used by the challenge creation wizard.
pub mod fields {
    pub const TITLE: &str = "title";
    pub const DESCRIPTION: &str = "description";
    pub const CATEGORY: &str = "category";
    pub const MODE: &str = "mode";
    pub const TEAM_SIZE: &str = "team_size";
    pub const TEAM_NAME_GUIDELINES: &str = "team_name_guidelines";
    pub const DIFFICULTY: &str = "difficulty";
    pub const VISIBILITY: &str = "visibility";
    pub const REWARDS: &str = "rewards";
    pub const PUBLISH_START: &str = "publish_start";
    pub const PUBLISH_END: &str = "publish_end";
    pub const CHALLENGE_START: &str = "challenge_start";
    pub const CHALLENGE_END: &str = "challenge_end";
    pub const MEDIA_NAME: &str = "media_name";
}

/// A user-defined sub-item of a multi-stage challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub id: u32,
    pub name: String,
    pub reward_description: String,
}

impl Stage {
    fn empty(id: u32) -> Self {
        Self {
            id,
            name: String::new(),
            reward_description: String::new(),
        }
    }
}

/// Editable field of a [`Stage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageField {
    Name,
    RewardDescription,
}

/// Display phase of a wizard instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardPhase {
    InProgress,
    Completed,
}

impl std::fmt::Display for WizardPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Result of an advance attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceOutcome {
    /// The step validated; `step` is the new (possibly capped) index.
    Advanced { step: usize },
    /// Validation failed; the index did not move.
    Rejected { errors: BTreeMap<String, String> },
}

/// The complete accumulated wizard data handed to the submission target.
#[derive(Debug, Clone, Serialize)]
pub struct ChallengePayload {
    pub fields: Map<String, Value>,
    pub multi_stage: bool,
    pub stages: Vec<Stage>,
}

/// Per-step wizard state: data accumulates across steps, errors are scoped
/// to the current step, and the stage sub-list keeps monotonic ids.
#[derive(Debug, Clone)]
pub struct WizardState {
    rules: StepRules,
    step_index: usize,
    data: Map<String, Value>,
    step_errors: BTreeMap<String, String>,
    stages: Vec<Stage>,
    multi_stage: bool,
    next_stage_id: u32,
    phase: WizardPhase,
    completed_at: Option<DateTime<Utc>>,
}

impl WizardState {
    pub fn new(rules: StepRules) -> Self {
        Self {
            rules,
            step_index: 0,
            data: Self::default_data(),
            step_errors: BTreeMap::new(),
            stages: vec![Stage::empty(1)],
            multi_stage: false,
            next_stage_id: 2,
            phase: WizardPhase::InProgress,
            completed_at: None,
        }
    }

    fn default_data() -> Map<String, Value> {
        let mut data = Map::new();
        data.insert(fields::VISIBILITY.to_string(), json!("public"));
        data.insert(fields::TEAM_SIZE.to_string(), json!(2));
        data.insert(fields::REWARDS.to_string(), json!([]));
        data
    }

    // ── Field editing ────────────────────────────────────────────────

    /// Merge a field value into the accumulated data.
    ///
    /// Clears any existing error on that field optimistically — the error
    /// only reappears on the next explicit validation pass, never per
    /// keystroke.
    pub fn update_field(&mut self, name: &str, value: Value) {
        self.data.insert(name.to_string(), value);
        self.step_errors.remove(name);
    }

    /// Toggle membership of a string value in a list field (multi-select).
    pub fn toggle_list_value(&mut self, name: &str, value: &str) {
        let list = self
            .data
            .entry(name.to_string())
            .or_insert_with(|| json!([]));
        if let Some(items) = list.as_array_mut() {
            if let Some(pos) = items.iter().position(|v| v.as_str() == Some(value)) {
                items.remove(pos);
            } else {
                items.push(json!(value));
            }
        }
        self.step_errors.remove(name);
    }

    // ── Step navigation ──────────────────────────────────────────────

    /// Revalidate the current step and advance on success.
    ///
    /// The index is capped at the last step; data is never reset between
    /// steps.
    pub fn attempt_advance(&mut self) -> AdvanceOutcome {
        let errors = self.rules.validate(self.step_index, &self.data);
        if !errors.is_empty() {
            self.step_errors = errors.clone();
            return AdvanceOutcome::Rejected { errors };
        }
        self.step_errors.clear();
        self.step_index = (self.step_index + 1).min(self.rules.step_count() - 1);
        AdvanceOutcome::Advanced {
            step: self.step_index,
        }
    }

    /// Step backward. Always permitted: no revalidation, no data loss.
    pub fn go_back(&mut self) {
        self.step_index = self.step_index.saturating_sub(1);
    }

    // ── Stages ───────────────────────────────────────────────────────

    /// Append a fresh stage and return its id.
    ///
    /// Ids are monotonic per wizard instance and never reused, even after
    /// removal.
    pub fn add_stage(&mut self) -> u32 {
        let id = self.next_stage_id;
        self.next_stage_id += 1;
        self.stages.push(Stage::empty(id));
        id
    }

    /// Remove a stage by id. Removing the last remaining stage is a no-op,
    /// not an error. Returns whether a stage was removed.
    pub fn remove_stage(&mut self, id: u32) -> bool {
        if self.stages.len() <= 1 {
            return false;
        }
        let before = self.stages.len();
        self.stages.retain(|s| s.id != id);
        self.stages.len() < before
    }

    /// Update a field of one stage. Returns false for an unknown id.
    pub fn update_stage(&mut self, id: u32, field: StageField, value: &str) -> bool {
        let Some(stage) = self.stages.iter_mut().find(|s| s.id == id) else {
            return false;
        };
        match field {
            StageField::Name => stage.name = value.to_string(),
            StageField::RewardDescription => stage.reward_description = value.to_string(),
        }
        true
    }

    /// Toggle the multi-stage mode. Disabling keeps the entries; the list
    /// is simply not part of the payload's active shape.
    pub fn set_multi_stage(&mut self, enabled: bool) {
        self.multi_stage = enabled;
    }

    // ── Completion ───────────────────────────────────────────────────

    /// Whether the wizard sits on its last step with a clean validation
    /// pass, i.e. is eligible for finalization.
    pub fn validate_final_step(&self) -> BTreeMap<String, String> {
        self.rules.validate(self.step_index, &self.data)
    }

    pub fn on_last_step(&self) -> bool {
        self.step_index == self.rules.step_count() - 1
    }

    /// Snapshot the accumulated data for submission.
    pub fn payload(&self) -> ChallengePayload {
        ChallengePayload {
            fields: self.data.clone(),
            multi_stage: self.multi_stage,
            stages: self.stages.clone(),
        }
    }

    /// Enter the terminal completed display state.
    pub fn complete(&mut self) {
        self.phase = WizardPhase::Completed;
        self.completed_at = Some(Utc::now());
    }

    /// Reset to defaults for a fresh instance ("create another").
    ///
    /// Stage ids restart at 1: the id counter is per instance.
    pub fn reset(&mut self) {
        let rules = self.rules.clone();
        *self = Self::new(rules);
    }

    // ── Read-only projections ────────────────────────────────────────

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn step_count(&self) -> usize {
        self.rules.step_count()
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn step_errors(&self) -> &BTreeMap<String, String> {
        &self.step_errors
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn multi_stage(&self) -> bool {
        self.multi_stage
    }

    pub fn phase(&self) -> WizardPhase {
        self.phase
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }
}
