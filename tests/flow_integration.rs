//! End-to-end tests for the onboarding funnel and the challenge wizard,
//! driven against mock collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use rocketflow::config::FlowConfig;
use rocketflow::error::{AuthError, Error, FlowError, SubmissionError, TimerError};
use rocketflow::flow::{
    AuthAttempt, AuthField, CodeSubmission, FlowController, Persona, PersonaChoice, Role, Screen,
};
use rocketflow::notify::{Notice, PresentationObserver};
use rocketflow::profile::ProfileField;
use rocketflow::services::{
    AuthService, CodeOutcome, Credentials, LoginOutcome, SessionToken, SignupOutcome,
    SignupProfile, SimulatedAuth, SimulatedSubmission, SimulatedVerification, SubmissionTarget,
    SubmitOutcome, VerificationService,
};
use rocketflow::wizard::{
    AdvanceOutcome, ChallengePayload as Payload, FinalizeOutcome, StageField, WizardPhase, fields,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

fn test_config() -> FlowConfig {
    FlowConfig {
        resend_cooldown_secs: 3,
        error_display_window: Duration::from_millis(50),
        auth_latency: Duration::ZERO,
        verification_latency: Duration::ZERO,
        submission_latency: Duration::ZERO,
        ..FlowConfig::default()
    }
}

// ── Test doubles ─────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingObserver {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingObserver {
    fn snapshot(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    fn contains(&self, wanted: &Notice) -> bool {
        self.notices.lock().unwrap().iter().any(|n| n == wanted)
    }
}

impl PresentationObserver for RecordingObserver {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

/// Auth backend that counts calls.
#[derive(Default)]
struct CountingAuth {
    login_calls: AtomicUsize,
}

#[async_trait]
impl AuthService for CountingAuth {
    async fn login(&self, _credentials: &Credentials) -> Result<LoginOutcome, AuthError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        Ok(LoginOutcome::Success {
            session: SessionToken::new("counting-session"),
        })
    }

    async fn signup(&self, profile: &SignupProfile) -> Result<SignupOutcome, AuthError> {
        Ok(SignupOutcome::VerificationRequired {
            destination: profile.email.clone(),
        })
    }
}

/// Verification backend whose responses are gated on an explicit release,
/// so tests can hold a request in flight.
struct GatedVerification {
    started: Notify,
    release: Notify,
}

impl GatedVerification {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            started: Notify::new(),
            release: Notify::new(),
        })
    }
}

#[async_trait]
impl VerificationService for GatedVerification {
    async fn submit_code(
        &self,
        _destination: &str,
        code: &str,
    ) -> Result<CodeOutcome, rocketflow::error::VerificationError> {
        self.started.notify_one();
        self.release.notified().await;
        if code == "123456" {
            Ok(CodeOutcome::Accepted {
                session: SessionToken::new("gated-session"),
            })
        } else {
            Ok(CodeOutcome::Rejected)
        }
    }

    async fn resend(
        &self,
        _destination: &str,
    ) -> Result<(), rocketflow::error::VerificationError> {
        Ok(())
    }
}

/// Submission target that records every accepted payload.
#[derive(Default)]
struct CapturingSubmission {
    payloads: Mutex<Vec<Payload>>,
}

#[async_trait]
impl SubmissionTarget for CapturingSubmission {
    async fn submit(&self, payload: &Payload) -> Result<SubmitOutcome, SubmissionError> {
        self.payloads.lock().unwrap().push(payload.clone());
        Ok(SubmitOutcome::Accepted {
            id: uuid::Uuid::new_v4(),
        })
    }
}

fn simulated_controller(observer: Arc<RecordingObserver>) -> FlowController {
    init_tracing();
    FlowController::new(
        test_config(),
        Arc::new(SimulatedAuth::new(Duration::ZERO)),
        Arc::new(SimulatedVerification::new(Duration::ZERO)),
        Arc::new(SimulatedSubmission::new(Duration::ZERO)),
        observer,
    )
}

async fn fill_signup_form(controller: &FlowController) {
    controller
        .update_auth_field(AuthField::FullName, "Alex Thompson")
        .await;
    controller
        .update_auth_field(AuthField::Email, "alex@example.com")
        .await;
    controller
        .update_auth_field(AuthField::Password, "hunter22")
        .await;
    controller.set_accepted_terms(true).await;
}

async fn fill_login_form(controller: &FlowController) {
    controller
        .update_auth_field(AuthField::Email, "alex@example.com")
        .await;
    controller
        .update_auth_field(AuthField::Password, "hunter22")
        .await;
}

// ── Funnel tests ─────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn signup_funnel_reaches_dashboard() {
    let observer = Arc::new(RecordingObserver::default());
    let controller = simulated_controller(Arc::clone(&observer));

    assert_eq!(controller.active_screen().await, Screen::Auth);
    fill_signup_form(&controller).await;

    let attempt = controller.submit_signup().await.unwrap();
    assert_eq!(attempt, AuthAttempt::VerificationRequired);
    assert_eq!(controller.active_screen().await, Screen::Verification);
    assert!(controller.session().await.is_none());
    assert!(observer.contains(&Notice::CodeSent {
        destination: "alex@example.com".into()
    }));

    // The resend countdown is ticking while verification is active
    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(controller.resend_remaining_secs().await, 2);

    let submission = controller.submit_code("123456").await.unwrap();
    assert_eq!(submission, CodeSubmission::Accepted);
    assert_eq!(controller.active_screen().await, Screen::RoleSelect);
    // Session is only established once persona selection completes
    assert!(controller.session().await.is_none());

    // The countdown stopped with the screen; no further ticks
    let frozen = controller.resend_remaining_secs().await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(controller.resend_remaining_secs().await, frozen);

    controller.choose_role(Role::Commander).await.unwrap();
    assert_eq!(controller.active_screen().await, Screen::PersonaSelect);
    assert!(controller.session().await.is_none());

    // Incomplete persona choice is bounced with a notice
    let done = controller
        .complete_persona(PersonaChoice::new(Persona::Community))
        .await
        .unwrap();
    assert!(!done);
    assert_eq!(controller.active_screen().await, Screen::PersonaSelect);

    let mut choice = PersonaChoice::new(Persona::Community);
    choice.audience = Some("Youth".into());
    assert!(controller.complete_persona(choice).await.unwrap());

    assert_eq!(controller.active_screen().await, Screen::Dashboard);
    assert!(controller.session().await.is_some());
    assert_eq!(controller.role().await, Some(Role::Commander));
}

#[tokio::test]
async fn login_goes_straight_to_dashboard() {
    let observer = Arc::new(RecordingObserver::default());
    let controller = simulated_controller(Arc::clone(&observer));

    fill_login_form(&controller).await;
    let attempt = controller.submit_login().await.unwrap();
    assert_eq!(attempt, AuthAttempt::LoggedIn);
    assert_eq!(controller.active_screen().await, Screen::Dashboard);
    assert!(controller.session().await.is_some());
    assert!(observer.contains(&Notice::Welcome { returning: true }));
}

#[tokio::test]
async fn login_requiring_verification_establishes_session_on_code() {
    let observer = Arc::new(RecordingObserver::default());
    init_tracing();
    let controller = FlowController::new(
        test_config(),
        Arc::new(SimulatedAuth::new(Duration::ZERO).with_login_verification()),
        Arc::new(SimulatedVerification::new(Duration::ZERO)),
        Arc::new(SimulatedSubmission::new(Duration::ZERO)),
        Arc::clone(&observer) as Arc<dyn PresentationObserver>,
    );

    fill_login_form(&controller).await;
    let attempt = controller.submit_login().await.unwrap();
    assert_eq!(attempt, AuthAttempt::VerificationRequired);
    assert_eq!(controller.active_screen().await, Screen::Verification);

    let submission = controller.submit_code("123456").await.unwrap();
    assert_eq!(submission, CodeSubmission::Accepted);
    // Login purpose skips role/persona selection entirely
    assert_eq!(controller.active_screen().await, Screen::Dashboard);
    assert!(controller.session().await.is_some());
}

#[tokio::test]
async fn wrong_code_is_rejected_and_retryable() {
    let observer = Arc::new(RecordingObserver::default());
    let controller = simulated_controller(Arc::clone(&observer));

    fill_signup_form(&controller).await;
    controller.submit_signup().await.unwrap();

    let submission = controller.submit_code("000000").await.unwrap();
    assert_eq!(submission, CodeSubmission::Rejected);
    assert_eq!(controller.active_screen().await, Screen::Verification);
    assert!(observer.contains(&Notice::CodeRejected));

    // Malformed code is bounced locally with a validation notice
    let submission = controller.submit_code("12").await.unwrap();
    assert_eq!(submission, CodeSubmission::Rejected);

    // The right code still works afterwards
    let submission = controller.submit_code("123456").await.unwrap();
    assert_eq!(submission, CodeSubmission::Accepted);
}

#[tokio::test(start_paused = true)]
async fn invalid_auth_form_never_reaches_backend_and_autoclears() {
    let observer = Arc::new(RecordingObserver::default());
    let auth = Arc::new(CountingAuth::default());
    init_tracing();
    let controller = FlowController::new(
        test_config(),
        Arc::clone(&auth) as Arc<dyn AuthService>,
        Arc::new(SimulatedVerification::new(Duration::ZERO)),
        Arc::new(SimulatedSubmission::new(Duration::ZERO)),
        Arc::clone(&observer) as Arc<dyn PresentationObserver>,
    );

    let attempt = controller.submit_login().await.unwrap();
    assert_eq!(attempt, AuthAttempt::Invalid);
    assert_eq!(auth.login_calls.load(Ordering::SeqCst), 0);
    assert_eq!(controller.active_screen().await, Screen::Auth);

    let errors = controller.auth_errors().await;
    assert_eq!(errors["email"], "Email is required");
    assert!(observer.contains(&Notice::ValidationFailed {
        field: "email".into(),
        message: "Email is required".into(),
    }));

    // Errors auto-clear after the display window
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(controller.auth_errors().await.is_empty());
}

#[tokio::test]
async fn late_verification_result_is_discarded_after_back() {
    let observer = Arc::new(RecordingObserver::default());
    let verification = GatedVerification::new();
    init_tracing();
    let controller = Arc::new(FlowController::new(
        test_config(),
        Arc::new(SimulatedAuth::new(Duration::ZERO)),
        Arc::clone(&verification) as Arc<dyn VerificationService>,
        Arc::new(SimulatedSubmission::new(Duration::ZERO)),
        Arc::clone(&observer) as Arc<dyn PresentationObserver>,
    ));

    fill_signup_form(&controller).await;
    controller.submit_signup().await.unwrap();

    let in_flight = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.submit_code("123456").await }
    });
    verification.started.notified().await;

    // Abandon the verification while the check is still in flight
    controller.verification_back().await.unwrap();
    assert_eq!(controller.active_screen().await, Screen::Auth);

    verification.release.notify_one();
    let result = in_flight.await.unwrap().unwrap();
    assert_eq!(result, CodeSubmission::Discarded);

    // The late success did not resurrect the flow
    assert_eq!(controller.active_screen().await, Screen::Auth);
    assert!(controller.session().await.is_none());
}

#[tokio::test]
async fn second_verification_call_rejected_while_in_flight() {
    let verification = GatedVerification::new();
    init_tracing();
    let controller = Arc::new(FlowController::new(
        test_config(),
        Arc::new(SimulatedAuth::new(Duration::ZERO)),
        Arc::clone(&verification) as Arc<dyn VerificationService>,
        Arc::new(SimulatedSubmission::new(Duration::ZERO)),
        Arc::new(RecordingObserver::default()),
    ));

    fill_signup_form(&controller).await;
    controller.submit_signup().await.unwrap();

    let in_flight = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.submit_code("123456").await }
    });
    verification.started.notified().await;

    let err = controller.submit_code("123456").await.unwrap_err();
    assert!(matches!(err, Error::Flow(FlowError::RequestInFlight)));

    verification.release.notify_one();
    let result = in_flight.await.unwrap().unwrap();
    assert_eq!(result, CodeSubmission::Accepted);
}

#[tokio::test(start_paused = true)]
async fn resend_gated_by_cooldown() {
    let observer = Arc::new(RecordingObserver::default());
    let controller = simulated_controller(Arc::clone(&observer));

    fill_signup_form(&controller).await;
    controller.submit_signup().await.unwrap();
    assert!(!controller.resend_gate_open().await);

    // Too early: the gate is still closed
    let err = controller.resend_code().await.unwrap_err();
    assert!(matches!(
        err,
        Error::Timer(TimerError::RearmWhileClosed { .. })
    ));

    // Wait out the cooldown; the gate opens
    tokio::time::sleep(Duration::from_millis(3500)).await;
    assert!(controller.resend_gate_open().await);
    assert_eq!(controller.resend_remaining_secs().await, 0);

    controller.resend_code().await.unwrap();
    assert!(observer.contains(&Notice::CodeResent {
        destination: "alex@example.com".into()
    }));

    // Re-armed: gate closed, countdown ticking again
    assert!(!controller.resend_gate_open().await);
    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(controller.resend_remaining_secs().await, 2);

    // Leaving the screen freezes the countdown for good
    controller.verification_back().await.unwrap();
    let frozen = controller.resend_remaining_secs().await;
    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(controller.resend_remaining_secs().await, frozen);
    assert!(!controller.resend_gate_open().await);
}

#[tokio::test]
async fn invalid_events_for_screen_are_reported() {
    let controller = simulated_controller(Arc::new(RecordingObserver::default()));

    let err = controller.choose_role(Role::Admin).await.unwrap_err();
    assert!(matches!(err, Error::Flow(FlowError::InvalidEvent { .. })));

    let err = controller.submit_code("123456").await.unwrap_err();
    assert!(matches!(err, Error::Flow(FlowError::InvalidEvent { .. })));

    let err = controller.open_profile().await.unwrap_err();
    assert!(matches!(err, Error::Flow(FlowError::InvalidEvent { .. })));

    let err = controller.logout().await.unwrap_err();
    assert!(matches!(err, Error::Flow(FlowError::InvalidEvent { .. })));

    assert_eq!(controller.active_screen().await, Screen::Auth);
}

// ── Profile tests ────────────────────────────────────────────────────

#[tokio::test]
async fn profile_edit_save_and_cancel() {
    let observer = Arc::new(RecordingObserver::default());
    let controller = simulated_controller(Arc::clone(&observer));

    fill_login_form(&controller).await;
    controller.submit_login().await.unwrap();

    // Profile edits are only valid on the profile screen
    let err = controller
        .begin_profile_edit(ProfileField::FullName)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Flow(FlowError::InvalidEvent { .. })));

    controller.open_profile().await.unwrap();
    controller
        .begin_profile_edit(ProfileField::FullName)
        .await
        .unwrap();
    controller.set_profile_draft("Alex Thompson").await.unwrap();
    let saved = controller.save_profile_edit().await.unwrap();
    assert_eq!(saved, Some(ProfileField::FullName));
    assert_eq!(controller.profile().await.full_name, "Alex Thompson");
    assert!(observer.contains(&Notice::ProfileFieldUpdated {
        field: ProfileField::FullName
    }));

    controller
        .begin_profile_edit(ProfileField::Email)
        .await
        .unwrap();
    controller.set_profile_draft("new@example.com").await.unwrap();
    controller.cancel_profile_edit().await.unwrap();
    // Cancelled edit leaves the stored value untouched
    assert_eq!(controller.profile().await.email, "");

    controller.close_profile().await.unwrap();
    assert_eq!(controller.active_screen().await, Screen::Dashboard);

    controller.request_logout();
    assert!(observer.contains(&Notice::LogoutConfirmationRequested));
}

// ── Logout teardown ──────────────────────────────────────────────────

#[tokio::test]
async fn logout_tears_down_session_and_wizard() {
    let observer = Arc::new(RecordingObserver::default());
    let controller = simulated_controller(Arc::clone(&observer));

    fill_login_form(&controller).await;
    controller.submit_login().await.unwrap();

    let wizard = controller.challenge_wizard().await.unwrap();
    wizard
        .update_field(fields::TITLE, serde_json::json!("Run Streak"))
        .await;
    assert_eq!(
        wizard.snapshot().await.data[fields::TITLE],
        serde_json::json!("Run Streak")
    );

    controller.logout().await.unwrap();
    assert_eq!(controller.active_screen().await, Screen::Auth);
    assert!(controller.session().await.is_none());
    assert!(observer.contains(&Notice::LoggedOut));

    // The wizard is gone with the session; a new login starts fresh
    let err = controller.challenge_wizard().await.unwrap_err();
    assert!(matches!(err, Error::Flow(FlowError::InvalidEvent { .. })));

    fill_login_form(&controller).await;
    controller.submit_login().await.unwrap();
    let fresh = controller.challenge_wizard().await.unwrap();
    assert!(!fresh.snapshot().await.data.contains_key(fields::TITLE));
}

// ── Wizard through the controller ────────────────────────────────────

#[tokio::test]
async fn wizard_full_run_publishes_captured_payload() {
    let observer = Arc::new(RecordingObserver::default());
    let submission = Arc::new(CapturingSubmission::default());
    init_tracing();
    let controller = FlowController::new(
        test_config(),
        Arc::new(SimulatedAuth::new(Duration::ZERO)),
        Arc::new(SimulatedVerification::new(Duration::ZERO)),
        Arc::clone(&submission) as Arc<dyn SubmissionTarget>,
        Arc::clone(&observer) as Arc<dyn PresentationObserver>,
    );

    fill_login_form(&controller).await;
    controller.submit_login().await.unwrap();
    let wizard = controller.challenge_wizard().await.unwrap();

    // Step 1: basics. An early advance is rejected field by field.
    let outcome = wizard.attempt_advance().await.unwrap();
    assert!(matches!(outcome, AdvanceOutcome::Rejected { .. }));
    assert!(observer.contains(&Notice::ValidationFailed {
        field: "title".into(),
        message: "Please enter a challenge title".into(),
    }));

    wizard
        .update_field(fields::TITLE, serde_json::json!("30-Day Run Streak"))
        .await;
    wizard
        .update_field(fields::DESCRIPTION, serde_json::json!("Run 5k every day"))
        .await;
    wizard
        .update_field(fields::CATEGORY, serde_json::json!("running"))
        .await;
    assert_eq!(
        wizard.attempt_advance().await.unwrap(),
        AdvanceOutcome::Advanced { step: 1 }
    );
    assert!(observer.contains(&Notice::StepCompleted { step: 1 }));

    // Step 2: settings and stages
    wizard
        .update_field(fields::MODE, serde_json::json!("team"))
        .await;
    wizard
        .update_field(fields::TEAM_SIZE, serde_json::json!(5))
        .await;
    wizard
        .update_field(fields::DIFFICULTY, serde_json::json!("hard"))
        .await;
    wizard.set_multi_stage(true).await;
    let second = wizard.add_stage().await;
    let third = wizard.add_stage().await;
    assert_eq!((second, third), (2, 3));
    assert!(wizard.remove_stage(second).await);
    assert_eq!(wizard.add_stage().await, 4);
    wizard
        .update_stage(1, StageField::Name, "Qualifiers")
        .await;
    assert_eq!(
        wizard.attempt_advance().await.unwrap(),
        AdvanceOutcome::Advanced { step: 2 }
    );

    // Step 3: rewards, then publish
    wizard.toggle_reward("badges").await;
    wizard.toggle_reward("points").await;
    let outcome = wizard.finalize().await.unwrap();
    assert!(matches!(outcome, FinalizeOutcome::Published { .. }));
    assert_eq!(wizard.phase().await, WizardPhase::Completed);
    assert!(observer.contains(&Notice::ChallengePublished {
        title: "30-Day Run Streak".into()
    }));

    let payloads = submission.payloads.lock().unwrap();
    assert_eq!(payloads.len(), 1);
    let payload = &payloads[0];
    assert_eq!(payload.fields[fields::TITLE], "30-Day Run Streak");
    assert_eq!(payload.fields[fields::TEAM_SIZE], 5);
    assert!(payload.multi_stage);
    let ids: Vec<u32> = payload.stages.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![1, 3, 4]);
    assert_eq!(payload.stages[0].name, "Qualifiers");
    drop(payloads);

    // "Create another" starts a fresh instance with stage ids back at 1
    wizard.reset().await.unwrap();
    let snapshot = wizard.snapshot().await;
    assert_eq!(snapshot.step_index, 0);
    assert_eq!(snapshot.phase, WizardPhase::InProgress);
    assert_eq!(snapshot.stages.len(), 1);
    assert_eq!(snapshot.stages[0].id, 1);
    assert_eq!(wizard.add_stage().await, 2);
}

#[tokio::test]
async fn draft_save_notifies_without_validating() {
    let observer = Arc::new(RecordingObserver::default());
    let controller = simulated_controller(Arc::clone(&observer));

    fill_login_form(&controller).await;
    controller.submit_login().await.unwrap();
    let wizard = controller.challenge_wizard().await.unwrap();

    // Nothing filled in: a draft save still goes through
    wizard.save_draft().await;
    assert!(observer.contains(&Notice::DraftSaved));
    assert_eq!(wizard.snapshot().await.step_index, 0);
}
