//! Error types for the flow orchestration core.

/// Top-level error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Flow error: {0}")]
    Flow(#[from] FlowError),

    #[error("Wizard error: {0}")]
    Wizard(#[from] WizardError),

    #[error("Timer error: {0}")]
    Timer(#[from] TimerError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Verification error: {0}")]
    Verification(#[from] VerificationError),

    #[error("Submission error: {0}")]
    Submission(#[from] SubmissionError),
}

/// Screen-flow errors.
///
/// An invalid event is an integration defect, not a user mistake: the
/// presentation layer fired an event the active screen does not accept.
/// These are logged at error level and surfaced to the caller instead of
/// being silently dropped.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("Event {event} is not valid on screen {screen}")]
    InvalidEvent { screen: String, event: String },

    #[error("Another request is already in flight")]
    RequestInFlight,
}

/// Wizard contract errors.
///
/// Per-field validation failures are NOT errors — they are returned as a
/// discriminated outcome so the caller can surface each message inline.
#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("finalize() called on step {step_index} of {step_count}; only the last step may finalize")]
    FinalizeBeforeLastStep { step_index: usize, step_count: usize },

    #[error("Wizard instance is already completed")]
    AlreadyCompleted,

    #[error("A submission is already in flight for this wizard instance")]
    RequestInFlight,
}

/// Countdown gate errors.
#[derive(Debug, thiserror::Error)]
pub enum TimerError {
    #[error("Cannot re-arm while the gate is closed ({remaining}s remaining)")]
    RearmWhileClosed { remaining: u32 },
}

/// Auth backend errors (transport-level, not credential rejections).
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Auth backend unavailable: {0}")]
    Unavailable(String),

    #[error("Auth request failed: {0}")]
    RequestFailed(String),
}

/// Verification backend errors.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("Verification backend unavailable: {0}")]
    Unavailable(String),

    #[error("Verification request failed: {0}")]
    RequestFailed(String),
}

/// Submission target errors.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("Submission target unavailable: {0}")]
    Unavailable(String),

    #[error("Submission failed: {0}")]
    RequestFailed(String),
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
