//! Flow controller — async coordination around the screen-flow machine.
//!
//! Owns the session, drives the external auth/verification services, arms
//! and tears down the resend countdown, and guarantees that late-arriving
//! async results cannot resurrect an abandoned flow. All state mutation
//! funnels through the pure [`ScreenFlow`] transition function; everything
//! exposed outward is a read-only projection.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::config::FlowConfig;
use crate::error::{Error, FlowError, Result};
use crate::flow::forms::{AuthField, AuthForm, AuthMode, AuthRules};
use crate::flow::model::{PersonaChoice, Role};
use crate::flow::screen::{FlowEvent, Screen, ScreenFlow};
use crate::notify::{Notice, PresentationObserver};
use crate::profile::{ProfileData, ProfileEditor, ProfileField};
use crate::services::{
    AuthService, CodeOutcome, LoginOutcome, SessionToken, SignupOutcome, SubmissionTarget,
    VerificationService,
};
use crate::timer::{CountdownTask, TimerGate};
use crate::wizard::ChallengeWizard;

/// Result of a login or signup submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAttempt {
    /// Logged straight in; the flow moved to the dashboard.
    LoggedIn,
    /// A verification code was sent; the flow moved to verification.
    VerificationRequired,
    /// Client-side or backend field validation failed; still on auth.
    Invalid,
    /// The flow was cancelled while the request was in flight; the result
    /// was discarded.
    Discarded,
}

/// Result of submitting a verification code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeSubmission {
    /// Code accepted; the flow moved on per the verification purpose.
    Accepted,
    /// Code rejected (or malformed); still on verification, retry allowed.
    Rejected,
    /// The verification was abandoned while the check was in flight; the
    /// late result was discarded.
    Discarded,
}

/// Read-only projection of the flow for the presentation layer.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FlowSnapshot {
    pub screen: Screen,
    pub authenticated: bool,
    pub verification_destination: Option<String>,
    pub resend_remaining_secs: u32,
    pub resend_gate_open: bool,
}

struct ControllerState {
    flow: ScreenFlow,
    auth_form: AuthForm,
    persona: Option<PersonaChoice>,
    profile: ProfileEditor,
    wizard: Option<Arc<ChallengeWizard>>,
    countdown: Option<CountdownTask>,
    /// One outstanding auth/verification request at a time.
    in_flight: bool,
    /// Bumped on every cancellation (back, logout, acceptance); async
    /// completions from an older epoch are discarded.
    epoch: u64,
    /// Bumped whenever form errors are set or cleared; the delayed
    /// auto-clear task only fires if no newer change happened.
    error_epoch: u64,
}

/// The top-level screen-flow controller.
pub struct FlowController {
    config: FlowConfig,
    rules: AuthRules,
    auth: Arc<dyn AuthService>,
    verification: Arc<dyn VerificationService>,
    submission: Arc<dyn SubmissionTarget>,
    observer: Arc<dyn PresentationObserver>,
    timer: Arc<RwLock<TimerGate>>,
    state: Arc<RwLock<ControllerState>>,
}

impl FlowController {
    pub fn new(
        config: FlowConfig,
        auth: Arc<dyn AuthService>,
        verification: Arc<dyn VerificationService>,
        submission: Arc<dyn SubmissionTarget>,
        observer: Arc<dyn PresentationObserver>,
    ) -> Self {
        Self {
            config,
            rules: AuthRules::new(),
            auth,
            verification,
            submission,
            observer,
            timer: Arc::new(RwLock::new(TimerGate::new())),
            state: Arc::new(RwLock::new(ControllerState {
                flow: ScreenFlow::new(),
                auth_form: AuthForm::new(AuthMode::Login),
                persona: None,
                profile: ProfileEditor::new(ProfileData::default()),
                wizard: None,
                countdown: None,
                in_flight: false,
                epoch: 0,
                error_epoch: 0,
            })),
        }
    }

    // ── Auth screen ──────────────────────────────────────────────────

    pub async fn set_auth_mode(&self, mode: AuthMode) {
        self.state.write().await.auth_form.set_mode(mode);
    }

    pub async fn update_auth_field(&self, field: AuthField, value: &str) {
        self.state.write().await.auth_form.set_field(field, value);
    }

    pub async fn set_accepted_terms(&self, accepted: bool) {
        self.state.write().await.auth_form.set_accepted_terms(accepted);
    }

    pub async fn auth_errors(&self) -> BTreeMap<String, String> {
        self.state.read().await.auth_form.errors().clone()
    }

    /// Validate the form and attempt a login against the auth backend.
    pub async fn submit_login(&self) -> Result<AuthAttempt> {
        let (credentials, epoch) = {
            let mut st = self.state.write().await;
            if st.flow.screen() != Screen::Auth {
                return Err(self.rejected(&st, "login_submitted"));
            }
            if st.in_flight {
                return Err(FlowError::RequestInFlight.into());
            }
            st.auth_form.set_mode(AuthMode::Login);
            if !st.auth_form.validate(&self.rules) {
                let errors = st.auth_form.errors().clone();
                st.error_epoch += 1;
                let clear_at = st.error_epoch;
                drop(st);
                self.notify_field_errors(&errors);
                self.schedule_error_clear(clear_at);
                return Ok(AuthAttempt::Invalid);
            }
            st.in_flight = true;
            (st.auth_form.credentials(), st.epoch)
        };

        let result = self.auth.login(&credentials).await;

        let mut st = self.state.write().await;
        st.in_flight = false;
        if st.epoch != epoch {
            tracing::debug!("discarding stale login result");
            return Ok(AuthAttempt::Discarded);
        }
        match result? {
            LoginOutcome::Success { session } => {
                self.apply_event(&mut st, FlowEvent::LoginSucceeded { session })?;
                drop(st);
                self.observer.notify(Notice::Welcome { returning: true });
                Ok(AuthAttempt::LoggedIn)
            }
            LoginOutcome::RequiresVerification { destination } => {
                self.apply_event(
                    &mut st,
                    FlowEvent::LoginRequiresVerification {
                        destination: destination.clone(),
                    },
                )?;
                self.arm_countdown(&mut st).await;
                drop(st);
                self.observer.notify(Notice::CodeSent { destination });
                Ok(AuthAttempt::VerificationRequired)
            }
        }
    }

    /// Validate the form and attempt a signup against the auth backend.
    pub async fn submit_signup(&self) -> Result<AuthAttempt> {
        let (profile, epoch) = {
            let mut st = self.state.write().await;
            if st.flow.screen() != Screen::Auth {
                return Err(self.rejected(&st, "signup_submitted"));
            }
            if st.in_flight {
                return Err(FlowError::RequestInFlight.into());
            }
            st.auth_form.set_mode(AuthMode::Signup);
            if !st.auth_form.validate(&self.rules) {
                let errors = st.auth_form.errors().clone();
                st.error_epoch += 1;
                let clear_at = st.error_epoch;
                drop(st);
                self.notify_field_errors(&errors);
                self.schedule_error_clear(clear_at);
                return Ok(AuthAttempt::Invalid);
            }
            st.in_flight = true;
            (st.auth_form.signup_profile(), st.epoch)
        };

        let result = self.auth.signup(&profile).await;

        let mut st = self.state.write().await;
        st.in_flight = false;
        if st.epoch != epoch {
            tracing::debug!("discarding stale signup result");
            return Ok(AuthAttempt::Discarded);
        }
        match result? {
            SignupOutcome::VerificationRequired { destination } => {
                self.apply_event(
                    &mut st,
                    FlowEvent::SignupSubmitted {
                        destination: destination.clone(),
                    },
                )?;
                self.arm_countdown(&mut st).await;
                drop(st);
                self.observer.notify(Notice::CodeSent { destination });
                Ok(AuthAttempt::VerificationRequired)
            }
            SignupOutcome::FieldErrors(errors) => {
                st.auth_form.set_errors(errors.clone());
                st.error_epoch += 1;
                let clear_at = st.error_epoch;
                drop(st);
                self.notify_field_errors(&errors);
                self.schedule_error_clear(clear_at);
                Ok(AuthAttempt::Invalid)
            }
        }
    }

    // ── Verification screen ──────────────────────────────────────────

    /// Submit a verification code for the pending destination.
    pub async fn submit_code(&self, code: &str) -> Result<CodeSubmission> {
        let (destination, epoch) = {
            let mut st = self.state.write().await;
            let destination = match st.flow.pending_verification() {
                Some(pending) => pending.destination.clone(),
                None => return Err(self.rejected(&st, "code_submitted")),
            };
            if st.in_flight {
                return Err(FlowError::RequestInFlight.into());
            }
            if code.len() != self.config.code_length
                || !code.chars().all(|c| c.is_ascii_digit())
            {
                drop(st);
                self.observer.notify(Notice::ValidationFailed {
                    field: "code".to_string(),
                    message: format!(
                        "Please enter a {}-digit code",
                        self.config.code_length
                    ),
                });
                return Ok(CodeSubmission::Rejected);
            }
            st.in_flight = true;
            (destination, st.epoch)
        };

        let result = self.verification.submit_code(&destination, code).await;

        let mut st = self.state.write().await;
        st.in_flight = false;
        if st.epoch != epoch {
            tracing::debug!("discarding stale verification result");
            return Ok(CodeSubmission::Discarded);
        }
        match result? {
            CodeOutcome::Accepted { session } => {
                self.stop_countdown(&mut st).await;
                st.epoch += 1;
                self.apply_event(&mut st, FlowEvent::CodeAccepted { session })?;
                drop(st);
                self.observer.notify(Notice::CodeAccepted);
                Ok(CodeSubmission::Accepted)
            }
            CodeOutcome::Rejected => {
                drop(st);
                self.observer.notify(Notice::CodeRejected);
                Ok(CodeSubmission::Rejected)
            }
        }
    }

    /// Request a fresh code. Only valid once the resend gate has opened;
    /// re-arms the countdown.
    pub async fn resend_code(&self) -> Result<()> {
        let (destination, epoch) = {
            let mut st = self.state.write().await;
            let destination = match st.flow.pending_verification() {
                Some(pending) => pending.destination.clone(),
                None => return Err(self.rejected(&st, "resend_requested")),
            };
            if st.in_flight {
                return Err(FlowError::RequestInFlight.into());
            }
            self.timer
                .write()
                .await
                .rearm(self.config.resend_cooldown_secs)?;
            if let Some(task) = st.countdown.take() {
                task.stop();
            }
            st.countdown = Some(CountdownTask::spawn(Arc::clone(&self.timer)));
            st.in_flight = true;
            (destination, st.epoch)
        };

        let result = self.verification.resend(&destination).await;

        let mut st = self.state.write().await;
        st.in_flight = false;
        if st.epoch != epoch {
            tracing::debug!("discarding stale resend ack");
            return Ok(());
        }
        result?;
        drop(st);
        self.observer.notify(Notice::CodeResent { destination });
        Ok(())
    }

    /// Leave the verification screen back to auth, stopping the countdown
    /// and discarding any in-flight verification result.
    pub async fn verification_back(&self) -> Result<()> {
        let mut st = self.state.write().await;
        self.apply_event(&mut st, FlowEvent::BackPressed)?;
        self.stop_countdown(&mut st).await;
        st.epoch += 1;
        Ok(())
    }

    // ── Onboarding screens ───────────────────────────────────────────

    pub async fn choose_role(&self, role: Role) -> Result<()> {
        let mut st = self.state.write().await;
        self.apply_event(&mut st, FlowEvent::RoleChosen { role })?;
        Ok(())
    }

    /// Complete persona selection. Returns false (with a notice) when the
    /// choice is not yet complete.
    pub async fn complete_persona(&self, choice: PersonaChoice) -> Result<bool> {
        let mut st = self.state.write().await;
        if st.flow.screen() != Screen::PersonaSelect {
            return Err(self.rejected(&st, "persona_completed"));
        }
        if !choice.ready() {
            drop(st);
            self.observer.notify(Notice::ValidationFailed {
                field: "persona".to_string(),
                message: "Please choose a persona and audience".to_string(),
            });
            return Ok(false);
        }
        self.apply_event(&mut st, FlowEvent::PersonaCompleted)?;
        st.persona = Some(choice);
        Ok(true)
    }

    // ── Dashboard / profile ──────────────────────────────────────────

    pub async fn open_profile(&self) -> Result<()> {
        let mut st = self.state.write().await;
        self.apply_event(&mut st, FlowEvent::ProfileEditRequested)?;
        Ok(())
    }

    pub async fn close_profile(&self) -> Result<()> {
        let mut st = self.state.write().await;
        self.apply_event(&mut st, FlowEvent::ProfileClosed)?;
        Ok(())
    }

    pub async fn begin_profile_edit(&self, field: ProfileField) -> Result<String> {
        let mut st = self.state.write().await;
        if st.flow.screen() != Screen::ProfileEdit {
            return Err(self.rejected(&st, "profile_edit"));
        }
        Ok(st.profile.begin_edit(field))
    }

    pub async fn set_profile_draft(&self, value: &str) -> Result<()> {
        let mut st = self.state.write().await;
        if st.flow.screen() != Screen::ProfileEdit {
            return Err(self.rejected(&st, "profile_edit"));
        }
        st.profile.set_draft(value);
        Ok(())
    }

    pub async fn save_profile_edit(&self) -> Result<Option<ProfileField>> {
        let saved = {
            let mut st = self.state.write().await;
            if st.flow.screen() != Screen::ProfileEdit {
                return Err(self.rejected(&st, "profile_edit"));
            }
            st.profile.save()
        };
        if let Some(field) = saved {
            self.observer.notify(Notice::ProfileFieldUpdated { field });
        }
        Ok(saved)
    }

    pub async fn cancel_profile_edit(&self) -> Result<()> {
        let mut st = self.state.write().await;
        if st.flow.screen() != Screen::ProfileEdit {
            return Err(self.rejected(&st, "profile_edit"));
        }
        st.profile.cancel();
        Ok(())
    }

    pub async fn profile(&self) -> ProfileData {
        self.state.read().await.profile.data().clone()
    }

    /// The challenge-creation wizard for the current session, created on
    /// first use. Torn down on logout.
    pub async fn challenge_wizard(&self) -> Result<Arc<ChallengeWizard>> {
        let mut st = self.state.write().await;
        if !st.flow.screen().requires_session() {
            return Err(self.rejected(&st, "wizard_opened"));
        }
        let wizard = match &st.wizard {
            Some(wizard) => Arc::clone(wizard),
            None => {
                let wizard =
                    ChallengeWizard::new(Arc::clone(&self.submission), Arc::clone(&self.observer));
                st.wizard = Some(Arc::clone(&wizard));
                wizard
            }
        };
        Ok(wizard)
    }

    // ── Logout ───────────────────────────────────────────────────────

    /// Ask the presentation layer to confirm the logout.
    pub fn request_logout(&self) {
        self.observer.notify(Notice::LogoutConfirmationRequested);
    }

    /// Log out: clear the session and tear down every transient sub-state
    /// (pending verification, wizard instance, countdown, persona, forms).
    pub async fn logout(&self) -> Result<()> {
        let mut st = self.state.write().await;
        self.apply_event(&mut st, FlowEvent::LogoutRequested)?;
        self.stop_countdown(&mut st).await;
        st.epoch += 1;
        st.wizard = None;
        st.persona = None;
        st.auth_form = AuthForm::new(AuthMode::Login);
        st.profile = ProfileEditor::new(ProfileData::default());
        drop(st);
        tracing::info!("logged out");
        self.observer.notify(Notice::LoggedOut);
        Ok(())
    }

    // ── Read-only projections ────────────────────────────────────────

    pub async fn active_screen(&self) -> Screen {
        self.state.read().await.flow.screen()
    }

    pub async fn session(&self) -> Option<SessionToken> {
        self.state.read().await.flow.session().cloned()
    }

    pub async fn role(&self) -> Option<Role> {
        self.state.read().await.flow.role()
    }

    pub async fn persona(&self) -> Option<PersonaChoice> {
        self.state.read().await.persona.clone()
    }

    pub async fn resend_remaining_secs(&self) -> u32 {
        self.timer.read().await.remaining_seconds()
    }

    pub async fn resend_gate_open(&self) -> bool {
        self.timer.read().await.gate_open()
    }

    pub async fn snapshot(&self) -> FlowSnapshot {
        let st = self.state.read().await;
        let timer = self.timer.read().await;
        FlowSnapshot {
            screen: st.flow.screen(),
            authenticated: st.flow.session().is_some(),
            verification_destination: st
                .flow
                .pending_verification()
                .map(|p| p.destination.clone()),
            resend_remaining_secs: timer.remaining_seconds(),
            resend_gate_open: timer.gate_open(),
        }
    }

    // ── Internals ────────────────────────────────────────────────────

    fn apply_event(&self, st: &mut ControllerState, event: FlowEvent) -> Result<Screen> {
        match st.flow.apply(event) {
            Ok(screen) => {
                tracing::debug!(screen = %screen, "screen transition");
                Ok(screen)
            }
            Err(e) => {
                tracing::error!(error = %e, "rejected flow event");
                Err(e.into())
            }
        }
    }

    fn rejected(&self, st: &ControllerState, event: &str) -> Error {
        let screen = st.flow.screen();
        tracing::error!(screen = %screen, event, "event not valid for the active screen");
        FlowError::InvalidEvent {
            screen: screen.to_string(),
            event: event.to_string(),
        }
        .into()
    }

    async fn arm_countdown(&self, st: &mut ControllerState) {
        if let Some(task) = st.countdown.take() {
            task.stop();
        }
        self.timer
            .write()
            .await
            .start(self.config.resend_cooldown_secs);
        st.countdown = Some(CountdownTask::spawn(Arc::clone(&self.timer)));
    }

    async fn stop_countdown(&self, st: &mut ControllerState) {
        if let Some(task) = st.countdown.take() {
            task.stop();
        }
        self.timer.write().await.stop();
    }

    fn notify_field_errors(&self, errors: &BTreeMap<String, String>) {
        for (field, message) in errors {
            self.observer.notify(Notice::ValidationFailed {
                field: field.clone(),
                message: message.clone(),
            });
        }
    }

    fn schedule_error_clear(&self, epoch: u64) {
        let state = Arc::clone(&self.state);
        let window = self.config.error_display_window;
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let mut st = state.write().await;
            if st.error_epoch == epoch {
                st.auth_form.clear_errors();
            }
        });
    }
}
