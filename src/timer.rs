//! Countdown gate for resend-style cooldowns.
//!
//! [`TimerGate`] is a pure, pollable state machine: one `tick()` per second
//! is driven externally, so the gate is testable without a runtime and
//! independent of any rendering lifecycle. [`CountdownTask`] is the async
//! driver: a tokio task ticking the gate once per real second until it
//! opens or is stopped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::error::TimerError;

/// A countdown-driven gate: closed while the countdown runs, open at zero.
///
/// Invariant: `gate_open` is true exactly when the countdown has reached
/// zero through ticking (or was armed with zero seconds). Stopping early
/// leaves the gate closed with the remaining seconds intact.
#[derive(Debug, Clone)]
pub struct TimerGate {
    remaining_seconds: u32,
    gate_open: bool,
    ticking: bool,
}

impl TimerGate {
    /// Create an unarmed gate. `start()` arms it.
    pub fn new() -> Self {
        Self {
            remaining_seconds: 0,
            gate_open: true,
            ticking: false,
        }
    }

    /// (Re)arm the countdown: gate closes and ticking begins.
    ///
    /// Arming with zero seconds opens the gate immediately.
    pub fn start(&mut self, seconds: u32) {
        self.remaining_seconds = seconds;
        if seconds == 0 {
            self.gate_open = true;
            self.ticking = false;
        } else {
            self.gate_open = false;
            self.ticking = true;
        }
    }

    /// Advance the countdown by one second.
    ///
    /// No-op once the gate has opened or after `stop()`: no negative time,
    /// no further effects after reaching zero.
    pub fn tick(&mut self) {
        if !self.ticking {
            return;
        }
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            self.gate_open = true;
            self.ticking = false;
        }
    }

    /// Re-arm for a fresh countdown. Only valid once the gate has opened;
    /// re-arming a closed gate is rejected.
    pub fn rearm(&mut self, seconds: u32) -> Result<(), TimerError> {
        if !self.gate_open {
            return Err(TimerError::RearmWhileClosed {
                remaining: self.remaining_seconds,
            });
        }
        self.start(seconds);
        Ok(())
    }

    /// Halt ticking without resetting the remaining seconds.
    ///
    /// Idempotent: safe to call repeatedly or after the gate opened.
    pub fn stop(&mut self) {
        self.ticking = false;
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn gate_open(&self) -> bool {
        self.gate_open
    }

    pub fn is_ticking(&self) -> bool {
        self.ticking
    }
}

impl Default for TimerGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Async driver ticking a shared gate once per second.
///
/// The task ends on its own when the gate opens; `stop()` aborts it early.
/// Dropping the handle also aborts, so an exited screen can never leak a
/// ticking timer.
#[derive(Debug)]
pub struct CountdownTask {
    handle: JoinHandle<()>,
}

impl CountdownTask {
    /// Spawn the ticker for an already-armed gate.
    pub fn spawn(gate: Arc<RwLock<TimerGate>>) -> Self {
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(1)).await;
                let mut gate = gate.write().await;
                gate.tick();
                if !gate.is_ticking() {
                    break;
                }
            }
        });
        Self { handle }
    }

    /// Abort the ticker. Idempotent; safe after the task already finished.
    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for CountdownTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
