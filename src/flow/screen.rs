//! Screen-flow state machine — which full-screen view is active.
//!
//! The original development build selected the active screen from several
//! independent boolean flags; here the flow is a single tagged state with
//! an explicit transition table, so inconsistent flag combinations are
//! unrepresentable. The machine is pure: the async controller translates
//! service outcomes into events and feeds them in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FlowError;
use crate::flow::model::Role;
use crate::services::SessionToken;

/// The full-screen views of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Auth,
    Verification,
    RoleSelect,
    PersonaSelect,
    Dashboard,
    ProfileEdit,
}

impl Screen {
    /// Screens that are only reachable with an established session.
    pub fn requires_session(&self) -> bool {
        matches!(self, Self::Dashboard | Self::ProfileEdit)
    }
}

impl std::fmt::Display for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Auth => "auth",
            Self::Verification => "verification",
            Self::RoleSelect => "role_select",
            Self::PersonaSelect => "persona_select",
            Self::Dashboard => "dashboard",
            Self::ProfileEdit => "profile_edit",
        };
        write!(f, "{s}")
    }
}

/// Why the verification screen is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationPurpose {
    Signup,
    Login,
}

/// Verification context, present exactly while the verification screen is
/// active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingVerification {
    pub destination: String,
    pub purpose: VerificationPurpose,
}

/// Events accepted by the screen flow.
#[derive(Debug)]
pub enum FlowEvent {
    LoginSucceeded { session: SessionToken },
    SignupSubmitted { destination: String },
    LoginRequiresVerification { destination: String },
    CodeAccepted { session: SessionToken },
    BackPressed,
    RoleChosen { role: Role },
    PersonaCompleted,
    ProfileEditRequested,
    ProfileClosed,
    LogoutRequested,
}

impl FlowEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LoginSucceeded { .. } => "login_succeeded",
            Self::SignupSubmitted { .. } => "signup_submitted",
            Self::LoginRequiresVerification { .. } => "login_requires_verification",
            Self::CodeAccepted { .. } => "code_accepted",
            Self::BackPressed => "back_pressed",
            Self::RoleChosen { .. } => "role_chosen",
            Self::PersonaCompleted => "persona_completed",
            Self::ProfileEditRequested => "profile_edit_requested",
            Self::ProfileClosed => "profile_closed",
            Self::LogoutRequested => "logout_requested",
        }
    }
}

/// A recorded screen transition.
#[derive(Debug, Clone, Serialize)]
pub struct ScreenTransition {
    pub from: Screen,
    pub to: Screen,
    pub event: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// The top-level flow state machine.
///
/// `session` is written exclusively by [`ScreenFlow::apply`]; everything
/// outside reads it through accessors. Invariants:
/// - the verification screen is active iff `pending_verification` is set;
/// - dashboard and profile-edit imply an established session.
#[derive(Debug)]
pub struct ScreenFlow {
    screen: Screen,
    session: Option<SessionToken>,
    pending_verification: Option<PendingVerification>,
    /// Session issued by a signup-purpose verification, promoted to
    /// `session` once persona selection completes.
    provisional_session: Option<SessionToken>,
    role: Option<Role>,
    transitions: Vec<ScreenTransition>,
}

impl ScreenFlow {
    pub fn new() -> Self {
        Self {
            screen: Screen::Auth,
            session: None,
            pending_verification: None,
            provisional_session: None,
            role: None,
            transitions: Vec::new(),
        }
    }

    /// Apply an event, mutating the flow state per the transition table.
    ///
    /// An event not valid for the active screen is rejected with
    /// [`FlowError::InvalidEvent`] and leaves the state untouched.
    pub fn apply(&mut self, event: FlowEvent) -> Result<Screen, FlowError> {
        use Screen::*;

        let event_name = event.name();
        let target = match (self.screen, event) {
            (Auth, FlowEvent::LoginSucceeded { session }) => {
                self.session = Some(session);
                Dashboard
            }
            (Auth, FlowEvent::SignupSubmitted { destination }) => {
                self.pending_verification = Some(PendingVerification {
                    destination,
                    purpose: VerificationPurpose::Signup,
                });
                Verification
            }
            (Auth, FlowEvent::LoginRequiresVerification { destination }) => {
                self.pending_verification = Some(PendingVerification {
                    destination,
                    purpose: VerificationPurpose::Login,
                });
                Verification
            }
            (Verification, FlowEvent::CodeAccepted { session }) => {
                let Some(pending) = self.pending_verification.take() else {
                    // Unreachable by construction: Verification implies a
                    // pending context. Reject rather than panic.
                    return Err(self.rejected(event_name));
                };
                match pending.purpose {
                    VerificationPurpose::Signup => {
                        self.provisional_session = Some(session);
                        RoleSelect
                    }
                    VerificationPurpose::Login => {
                        self.session = Some(session);
                        Dashboard
                    }
                }
            }
            (Verification, FlowEvent::BackPressed) => {
                self.pending_verification = None;
                Auth
            }
            (RoleSelect, FlowEvent::RoleChosen { role }) => {
                self.role = Some(role);
                PersonaSelect
            }
            (PersonaSelect, FlowEvent::PersonaCompleted) => {
                let Some(session) = self.provisional_session.take() else {
                    return Err(self.rejected(event_name));
                };
                self.session = Some(session);
                Dashboard
            }
            (Dashboard, FlowEvent::ProfileEditRequested) => ProfileEdit,
            (ProfileEdit, FlowEvent::ProfileClosed) => Dashboard,
            (Dashboard | ProfileEdit, FlowEvent::LogoutRequested) => {
                self.session = None;
                self.pending_verification = None;
                self.provisional_session = None;
                self.role = None;
                Auth
            }
            _ => return Err(self.rejected(event_name)),
        };

        self.record(target, event_name);
        self.screen = target;
        Ok(target)
    }

    fn rejected(&self, event: &'static str) -> FlowError {
        FlowError::InvalidEvent {
            screen: self.screen.to_string(),
            event: event.to_string(),
        }
    }

    fn record(&mut self, to: Screen, event: &'static str) {
        self.transitions.push(ScreenTransition {
            from: self.screen,
            to,
            event,
            timestamp: Utc::now(),
        });

        // Cap transition history to prevent unbounded memory growth
        const MAX_TRANSITIONS: usize = 100;
        if self.transitions.len() > MAX_TRANSITIONS {
            let drain_count = self.transitions.len() - MAX_TRANSITIONS;
            self.transitions.drain(..drain_count);
        }
    }

    // ── Read-only projections ────────────────────────────────────────

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn session(&self) -> Option<&SessionToken> {
        self.session.as_ref()
    }

    pub fn pending_verification(&self) -> Option<&PendingVerification> {
        self.pending_verification.as_ref()
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn transitions(&self) -> &[ScreenTransition] {
        &self.transitions
    }
}

impl Default for ScreenFlow {
    fn default() -> Self {
        Self::new()
    }
}
