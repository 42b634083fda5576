//! Presentation notifications — fire-and-forget fan-out to the UI layer.
//!
//! The orchestration core never blocks on the presentation layer: every
//! notification is one-way and best-effort. The [`BroadcastObserver`] fans
//! notices out to any number of subscribers (e.g. WebView bridges); the
//! [`NullObserver`] swallows them for headless use.

use tokio::sync::broadcast;

use crate::profile::ProfileField;

/// Default broadcast channel capacity.
const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// A one-way notification to the presentation layer.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notice {
    /// A single field failed validation. One notice per failing field.
    ValidationFailed { field: String, message: String },
    /// A wizard step passed validation and the wizard advanced.
    StepCompleted { step: usize },
    /// The wizard submission was accepted.
    ChallengePublished { title: String },
    /// The in-progress wizard data was saved as a draft.
    DraftSaved,
    /// A verification code was sent to the destination.
    CodeSent { destination: String },
    /// A fresh verification code was sent after the cooldown opened.
    CodeResent { destination: String },
    /// The submitted verification code was accepted.
    CodeAccepted,
    /// The submitted verification code was rejected; the user may retry.
    CodeRejected,
    /// Login completed.
    Welcome { returning: bool },
    /// A profile field edit was saved.
    ProfileFieldUpdated { field: ProfileField },
    /// The user asked to log out; the presentation layer should confirm.
    LogoutConfirmationRequested,
    /// Logout completed and the flow returned to the auth screen.
    LoggedOut,
}

/// Receives fire-and-forget notifications from the orchestration core.
///
/// Implementations must not block: the core calls `notify` from inside its
/// own state transitions.
pub trait PresentationObserver: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Observer backed by a broadcast channel for fan-out to UI subscribers.
pub struct BroadcastObserver {
    tx: broadcast::Sender<Notice>,
}

impl BroadcastObserver {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        Self { tx }
    }

    /// Subscribe to notices. Each UI client calls this.
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl PresentationObserver for BroadcastObserver {
    fn notify(&self, notice: Notice) {
        // Ok if no receivers are listening yet
        let _ = self.tx.send(notice);
    }
}

/// Observer that discards all notices.
pub struct NullObserver;

impl PresentationObserver for NullObserver {
    fn notify(&self, _notice: Notice) {}
}
