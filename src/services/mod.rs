//! External collaborator contracts.
//!
//! The orchestration core talks to its backends exclusively through these
//! async traits. The real implementations live in the host application;
//! [`simulated`] provides timer-backed stand-ins matching the mocked
//! behavior of the development build.

pub mod simulated;

use std::collections::BTreeMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{AuthError, SubmissionError, VerificationError};
use crate::wizard::ChallengePayload;

pub use simulated::{SimulatedAuth, SimulatedSubmission, SimulatedVerification};

/// Opaque identity token issued by the auth/verification backend.
///
/// Owned exclusively by the screen-flow controller; everything else sees it
/// as a read-only reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Login credentials as entered on the auth screen.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Signup data as entered on the auth screen.
#[derive(Debug, Clone)]
pub struct SignupProfile {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub accepted_terms: bool,
}

/// Outcome of a login attempt.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    /// Credentials accepted; a session was issued.
    Success { session: SessionToken },
    /// Credentials accepted but a verification code was sent first.
    RequiresVerification { destination: String },
}

/// Outcome of a signup attempt.
#[derive(Debug, Clone)]
pub enum SignupOutcome {
    /// Account created; a verification code was sent.
    VerificationRequired { destination: String },
    /// The backend rejected individual fields.
    FieldErrors(BTreeMap<String, String>),
}

/// Outcome of submitting a verification code.
#[derive(Debug, Clone)]
pub enum CodeOutcome {
    Accepted { session: SessionToken },
    Rejected,
}

/// Outcome of submitting a completed wizard payload.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    Accepted { id: Uuid },
    FieldErrors(BTreeMap<String, String>),
}

/// Authentication backend.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Attempt a login with the given credentials.
    async fn login(&self, credentials: &Credentials) -> Result<LoginOutcome, AuthError>;

    /// Create an account. Verification is always required afterwards.
    async fn signup(&self, profile: &SignupProfile) -> Result<SignupOutcome, AuthError>;
}

/// Verification (OTP) backend.
#[async_trait]
pub trait VerificationService: Send + Sync {
    /// Check a code the user entered for the given destination.
    async fn submit_code(
        &self,
        destination: &str,
        code: &str,
    ) -> Result<CodeOutcome, VerificationError>;

    /// Send a fresh code to the destination.
    async fn resend(&self, destination: &str) -> Result<(), VerificationError>;
}

/// Receives the completed wizard payload.
#[async_trait]
pub trait SubmissionTarget: Send + Sync {
    async fn submit(&self, payload: &ChallengePayload) -> Result<SubmitOutcome, SubmissionError>;
}
