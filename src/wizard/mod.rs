//! Multi-step wizard engine — per-step validation, accumulated data, and
//! a dynamic stage sub-list.
//!
//! The wizard gates forward navigation on validation while leaving backward
//! navigation unconditional; data entered on any step persists for the life
//! of the instance.

pub mod engine;
pub mod rules;
pub mod state;

pub use engine::{ChallengeWizard, FinalizeOutcome, WizardSnapshot};
pub use rules::{FieldCheck, FieldRule, StepRules};
pub use state::{
    AdvanceOutcome, ChallengePayload, Stage, StageField, WizardPhase, WizardState, fields,
};
