//! Per-step validation rules for the wizard.
//!
//! Rules are declared once per wizard flavor as a fixed, ordered list of
//! required-field checks per step. Validation is pure: the same data always
//! produces the same error map, and a field absent from the result is valid.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::wizard::state::fields;

/// What a required field must look like to pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCheck {
    /// A non-empty string after trimming (free-text inputs).
    NonEmptyText,
    /// A non-empty string (single-choice selection cards).
    Selected,
    /// A non-empty array (multi-choice selections).
    NonEmptyList,
}

/// One required-field check within a step.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub field: &'static str,
    pub message: &'static str,
    pub check: FieldCheck,
}

/// The ordered per-step rule table for one wizard flavor.
#[derive(Debug, Clone)]
pub struct StepRules {
    steps: Vec<Vec<FieldRule>>,
}

impl StepRules {
    /// Rules for the challenge creation wizard: three input steps.
    pub fn challenge_creation() -> Self {
        Self {
            steps: vec![
                vec![
                    FieldRule {
                        field: fields::TITLE,
                        message: "Please enter a challenge title",
                        check: FieldCheck::NonEmptyText,
                    },
                    FieldRule {
                        field: fields::DESCRIPTION,
                        message: "Please enter a challenge description",
                        check: FieldCheck::NonEmptyText,
                    },
                    FieldRule {
                        field: fields::CATEGORY,
                        message: "Please select a category",
                        check: FieldCheck::Selected,
                    },
                ],
                vec![
                    FieldRule {
                        field: fields::MODE,
                        message: "Please select a challenge mode",
                        check: FieldCheck::Selected,
                    },
                    FieldRule {
                        field: fields::DIFFICULTY,
                        message: "Please select a difficulty level",
                        check: FieldCheck::Selected,
                    },
                ],
                vec![FieldRule {
                    field: fields::REWARDS,
                    message: "Please select at least one reward type",
                    check: FieldCheck::NonEmptyList,
                }],
            ],
        }
    }

    /// Number of input steps this rule table covers.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Validate one step's slice of the data map.
    ///
    /// Returns `field -> message` for every failing rule; empty means the
    /// step may advance. Steps beyond the table validate trivially.
    pub fn validate(&self, step: usize, data: &Map<String, Value>) -> BTreeMap<String, String> {
        let mut errors = BTreeMap::new();
        let Some(rules) = self.steps.get(step) else {
            return errors;
        };
        for rule in rules {
            if !check_passes(rule.check, data.get(rule.field)) {
                errors.insert(rule.field.to_string(), rule.message.to_string());
            }
        }
        errors
    }
}

fn check_passes(check: FieldCheck, value: Option<&Value>) -> bool {
    match check {
        FieldCheck::NonEmptyText | FieldCheck::Selected => value
            .and_then(Value::as_str)
            .is_some_and(|s| !s.trim().is_empty()),
        FieldCheck::NonEmptyList => value.and_then(Value::as_array).is_some_and(|a| !a.is_empty()),
    }
}
