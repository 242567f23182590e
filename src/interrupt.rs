//! Operator interrupt (Ctrl-C) handling.

use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Exit status after an operator interrupt.
pub const INTERRUPTED_EXIT: i32 = 130;

/// Shared flag raised once the operator asks the run to stop.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    raised: Arc<AtomicBool>,
}

impl Interrupt {
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// Waits for `signal`, raises the flag, then runs `exit`.
    ///
    /// `exit` must not touch the progress bar: an open prompt holds its lock
    /// until the operator answers.
    pub async fn watch<S, F>(self, signal: S, exit: F)
    where
        S: Future<Output = io::Result<()>>,
        F: FnOnce(),
    {
        match signal.await {
            Ok(()) => {
                self.raised.store(true, Ordering::SeqCst);
                exit();
            }
            Err(e) => log::warn!("cannot listen for interrupts: {e}"),
        }
    }
}
