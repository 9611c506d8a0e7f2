//! Cancellation for the wait helpers
//!
//! A [`CancelToken`] bounds how long a wait helper blocks: never, until a
//! deadline, or after a timeout. The token is a plain channel end, so wait
//! loops can `select` over it alongside their event subscription without
//! spawning anything.

use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;

/// Bounds a blocking wait. Firing the token cancels the wait with
/// [`DaemonError::WaitCancelled`](crate::error::DaemonError::WaitCancelled).
pub struct CancelToken {
    rx: Receiver<Instant>,
}

impl CancelToken {
    /// A token that never fires; the wait blocks until its event arrives.
    pub fn never() -> Self {
        CancelToken {
            rx: crossbeam_channel::never(),
        }
    }

    /// A token firing once `timeout` has elapsed.
    pub fn after(timeout: Duration) -> Self {
        CancelToken {
            rx: crossbeam_channel::after(timeout),
        }
    }

    /// A token firing at `deadline`.
    pub fn at(deadline: Instant) -> Self {
        CancelToken {
            rx: crossbeam_channel::at(deadline),
        }
    }

    pub(crate) fn receiver(&self) -> &Receiver<Instant> {
        &self.rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_does_not_fire() {
        let token = CancelToken::never();
        assert!(token
            .receiver()
            .recv_timeout(Duration::from_millis(20))
            .is_err());
    }

    #[test]
    fn test_after_fires_once_elapsed() {
        let token = CancelToken::after(Duration::from_millis(5));
        assert!(token.receiver().recv_timeout(Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn test_at_fires_at_deadline() {
        let token = CancelToken::at(Instant::now() + Duration::from_millis(5));
        assert!(token.receiver().recv_timeout(Duration::from_secs(1)).is_ok());
    }
}
