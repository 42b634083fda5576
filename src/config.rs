//! Configuration types.

use std::time::Duration;

/// Flow orchestration configuration.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Cooldown before a verification code may be resent, in whole seconds.
    pub resend_cooldown_secs: u32,
    /// Expected length of a verification code.
    pub code_length: usize,
    /// How long form validation errors stay visible before auto-clearing.
    pub error_display_window: Duration,
    /// Simulated auth backend latency.
    pub auth_latency: Duration,
    /// Simulated verification backend latency.
    pub verification_latency: Duration,
    /// Simulated submission target latency.
    pub submission_latency: Duration,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            resend_cooldown_secs: 300, // 5 minutes
            code_length: 6,
            error_display_window: Duration::from_secs(3),
            auth_latency: Duration::from_millis(1000),
            verification_latency: Duration::from_millis(1500),
            submission_latency: Duration::from_millis(300),
        }
    }
}
