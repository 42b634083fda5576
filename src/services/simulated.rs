//! Simulated backends — timer-backed stand-ins for the real services.
//!
//! These reproduce the mocked behavior of the development build: fixed
//! latencies, every login accepted, and the well-known demo code `123456`
//! as the only valid verification code.

use std::collections::BTreeMap;

use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

use crate::error::{AuthError, SubmissionError, VerificationError};
use crate::wizard::ChallengePayload;

use super::{
    AuthService, CodeOutcome, Credentials, LoginOutcome, SessionToken, SignupOutcome,
    SignupProfile, SubmissionTarget, SubmitOutcome, VerificationService,
};

/// The demo verification code accepted by [`SimulatedVerification`].
pub const DEMO_CODE: &str = "123456";

fn fresh_session() -> SessionToken {
    SessionToken::new(Uuid::new_v4().to_string())
}

/// Auth backend that accepts any credentials after a fixed delay.
pub struct SimulatedAuth {
    latency: Duration,
    login_requires_verification: bool,
}

impl SimulatedAuth {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            login_requires_verification: false,
        }
    }

    /// Make logins require a verification step (second-factor flow).
    pub fn with_login_verification(mut self) -> Self {
        self.login_requires_verification = true;
        self
    }
}

#[async_trait]
impl AuthService for SimulatedAuth {
    async fn login(&self, credentials: &Credentials) -> Result<LoginOutcome, AuthError> {
        tokio::time::sleep(self.latency).await;
        if self.login_requires_verification {
            tracing::info!(email = %credentials.email, "simulated login: verification required");
            Ok(LoginOutcome::RequiresVerification {
                destination: credentials.email.clone(),
            })
        } else {
            tracing::info!(email = %credentials.email, "simulated login accepted");
            Ok(LoginOutcome::Success {
                session: fresh_session(),
            })
        }
    }

    async fn signup(&self, profile: &SignupProfile) -> Result<SignupOutcome, AuthError> {
        tokio::time::sleep(self.latency).await;
        if !profile.accepted_terms {
            let mut errors = BTreeMap::new();
            errors.insert(
                "terms".to_string(),
                "You must accept the terms and privacy policy to continue".to_string(),
            );
            return Ok(SignupOutcome::FieldErrors(errors));
        }
        tracing::info!(email = %profile.email, "simulated signup: verification required");
        Ok(SignupOutcome::VerificationRequired {
            destination: profile.email.clone(),
        })
    }
}

/// Verification backend that accepts only [`DEMO_CODE`].
pub struct SimulatedVerification {
    latency: Duration,
}

impl SimulatedVerification {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl VerificationService for SimulatedVerification {
    async fn submit_code(
        &self,
        destination: &str,
        code: &str,
    ) -> Result<CodeOutcome, VerificationError> {
        tokio::time::sleep(self.latency).await;
        if code == DEMO_CODE {
            tracing::info!(destination, "simulated verification accepted");
            Ok(CodeOutcome::Accepted {
                session: fresh_session(),
            })
        } else {
            tracing::debug!(destination, "simulated verification rejected");
            Ok(CodeOutcome::Rejected)
        }
    }

    async fn resend(&self, destination: &str) -> Result<(), VerificationError> {
        tokio::time::sleep(self.latency).await;
        tracing::info!(destination, "simulated verification code resent");
        Ok(())
    }
}

/// Submission target that accepts every payload.
pub struct SimulatedSubmission {
    latency: Duration,
}

impl SimulatedSubmission {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl SubmissionTarget for SimulatedSubmission {
    async fn submit(&self, payload: &ChallengePayload) -> Result<SubmitOutcome, SubmissionError> {
        tokio::time::sleep(self.latency).await;
        let id = Uuid::new_v4();
        tracing::info!(%id, fields = payload.fields.len(), "simulated submission accepted");
        Ok(SubmitOutcome::Accepted { id })
    }
}
