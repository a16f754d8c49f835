//! Process-wide transport runtime.
//!
//! The entry point calls [`init_transport_runtime`] once before opening any
//! session and [`shutdown_transport_runtime`] once on exit. Sessions borrow
//! settings from the runtime and register themselves so shutdown can report
//! sessions that were never closed.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::core::output;

const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_MAX_REDIRECTS: u32 = 10;

#[derive(Debug)]
pub struct TransportRuntime {
    user_agent: String,
    poll_interval: Duration,
    max_redirects: u32,
    live_sessions: Arc<AtomicUsize>,
}

/// Initialize transport settings for this process.
pub fn init_transport_runtime() -> TransportRuntime {
    TransportRuntime {
        user_agent: format!("pkg-fetch/{}", env!("CARGO_PKG_VERSION")),
        poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        max_redirects: DEFAULT_MAX_REDIRECTS,
        live_sessions: Arc::new(AtomicUsize::new(0)),
    }
}

/// Tear the runtime down. Returns the number of sessions still open.
pub fn shutdown_transport_runtime(runtime: TransportRuntime) -> usize {
    let open = runtime.live_sessions();
    if open > 0 {
        output::warning(&format!(
            "transport runtime shut down with {open} session(s) still open"
        ));
    }
    open
}

impl TransportRuntime {
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn max_redirects(&self) -> u32 {
        self.max_redirects
    }

    /// Override how often progress is reported during a transfer.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn live_sessions(&self) -> usize {
        self.live_sessions.load(Ordering::SeqCst)
    }

    pub(crate) fn register_session(&self) -> SessionTicket {
        self.live_sessions.fetch_add(1, Ordering::SeqCst);
        SessionTicket(Arc::clone(&self.live_sessions))
    }
}

/// Held by a session; decrements the runtime's live count when dropped.
#[derive(Debug)]
pub(crate) struct SessionTicket(Arc<AtomicUsize>);

impl Drop for SessionTicket {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
