//! Screen-flow orchestration — the top-level state machine and its
//! async controller.

pub mod controller;
pub mod forms;
pub mod model;
pub mod screen;

pub use controller::{AuthAttempt, CodeSubmission, FlowController, FlowSnapshot};
pub use forms::{AuthField, AuthForm, AuthMode, AuthRules};
pub use model::{Persona, PersonaChoice, Role};
pub use screen::{
    FlowEvent, PendingVerification, Screen, ScreenFlow, ScreenTransition, VerificationPurpose,
};
