//! Cooperative cancellation for in-flight evaluation runs

use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Reason a run was interrupted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptReason {
    /// User pressed Ctrl+C
    UserInterrupt,
    /// System shutdown
    Shutdown,
    /// Manual cancellation
    Manual,
}

/// Interrupt manager shared between the signal handler and the driver.
///
/// The driver checks the token between attempts and races it against retry
/// delays, so a run stops without waiting out a sleep. An interrupted chunk
/// is never checkpointed.
#[derive(Debug, Clone, Default)]
pub struct InterruptManager {
    token: CancellationToken,
    reason: Arc<Mutex<Option<InterruptReason>>>,
}

impl InterruptManager {
    /// Create a new interrupt manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the cancellation token for select-based waits
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Request cancellation with the given reason
    pub fn interrupt(&self, reason: InterruptReason) {
        if let Ok(mut stored) = self.reason.lock() {
            stored.get_or_insert(reason);
        }
        self.token.cancel();
    }

    /// Check whether cancellation has been requested
    pub fn is_interrupted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The first interrupt reason, if any
    pub fn reason(&self) -> Option<InterruptReason> {
        self.reason.lock().ok().and_then(|stored| *stored)
    }
}
