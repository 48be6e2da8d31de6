//! Cooperative cancellation for long-running batches.
//!
//! A [`CancelFlag`] is a cheap, clonable handle around a shared atomic.
//! The orchestrator checks it between files; the reducer checks it between
//! iterations, so even a pathological reduction loop can be aborted from
//! outside (e.g. the Ctrl-C handler in `main`).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent; safe from signal handlers.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
