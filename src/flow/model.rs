//! Role and persona selection types.

use serde::{Deserialize, Serialize};

/// The role chosen after signup. Recorded by the flow, interpreted only by
/// the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Commander,
    Participant,
    Supporter,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Admin => "admin",
            Self::Commander => "commander",
            Self::Participant => "participant",
            Self::Supporter => "supporter",
        };
        write!(f, "{s}")
    }
}

/// The persona context chosen during onboarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    Community,
    Company,
    Education,
}

impl Persona {
    /// Audience sub-options for this persona. Empty means the persona
    /// completes without an audience choice.
    pub fn audiences(&self) -> &'static [&'static str] {
        match self {
            Self::Community => &["Team Leaders", "Youth", "Parents", "Volunteers"],
            Self::Company => &["HR", "Supervisor", "Manager", "Employees"],
            Self::Education => &[],
        }
    }
}

/// A persona selection in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaChoice {
    pub persona: Persona,
    pub audience: Option<String>,
    pub age: u8,
}

impl PersonaChoice {
    pub fn new(persona: Persona) -> Self {
        Self {
            persona,
            audience: None,
            age: 15,
        }
    }

    /// Whether the choice is complete: personas with audience sub-options
    /// require one of them to be selected.
    pub fn ready(&self) -> bool {
        let audiences = self.persona.audiences();
        if audiences.is_empty() {
            return true;
        }
        self.audience
            .as_deref()
            .is_some_and(|chosen| audiences.contains(&chosen))
    }
}
