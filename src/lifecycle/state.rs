//! Server lifecycle state machine.
//!
//! # States
//! ```text
//! Starting → Serving → ShuttingDown → Stopped
//! ```
//!
//! Transitions only move forward; no state is revisited.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LifecycleState {
    Starting = 0,
    Serving = 1,
    ShuttingDown = 2,
    Stopped = 3,
}

impl LifecycleState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Starting,
            1 => Self::Serving,
            2 => Self::ShuttingDown,
            _ => Self::Stopped,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Starting => "starting",
            Self::Serving => "serving",
            Self::ShuttingDown => "shutting_down",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Shared, observable lifecycle state.
#[derive(Debug, Clone)]
pub struct LifecycleStatus {
    state: Arc<AtomicU8>,
}

impl LifecycleStatus {
    pub fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(LifecycleState::Starting as u8)),
        }
    }

    pub fn get(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Move to `next` if it lies ahead of the current state.
    ///
    /// Returns `false` when the state is already at or past `next`.
    pub fn advance(&self, next: LifecycleState) -> bool {
        let advanced = self
            .state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (current < next as u8).then_some(next as u8)
            });

        match advanced {
            Ok(previous) => {
                tracing::debug!(
                    from = %LifecycleState::from_u8(previous),
                    to = %next,
                    "Lifecycle transition"
                );
                true
            }
            Err(_) => false,
        }
    }
}

impl Default for LifecycleStatus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_starting() {
        assert_eq!(LifecycleStatus::new().get(), LifecycleState::Starting);
    }

    #[test]
    fn moves_forward_only() {
        let status = LifecycleStatus::new();
        assert!(status.advance(LifecycleState::Serving));
        assert!(status.advance(LifecycleState::ShuttingDown));
        assert!(!status.advance(LifecycleState::ShuttingDown));
        assert!(!status.advance(LifecycleState::Serving));
        assert_eq!(status.get(), LifecycleState::ShuttingDown);

        assert!(status.advance(LifecycleState::Stopped));
        assert!(!status.advance(LifecycleState::Starting));
        assert_eq!(status.get(), LifecycleState::Stopped);
    }

    #[test]
    fn clones_share_state() {
        let status = LifecycleStatus::new();
        let observer = status.clone();
        status.advance(LifecycleState::Serving);
        assert_eq!(observer.get(), LifecycleState::Serving);
    }
}
