//! Latest-request-wins bookkeeping for callers that display live results.
//!
//! Service calls are independent and may resolve out of order: a slow first
//! `predict_daily` can land after a fast second one. A caller takes a ticket
//! before issuing each request and keeps a response only while its ticket is
//! still the newest.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestTicket(u64);

/// Issues monotonically increasing tickets. Clones share one counter.
#[derive(Debug, Clone, Default)]
pub struct RequestSequencer {
    latest: Arc<AtomicU64>,
}

impl RequestSequencer {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticket for a request about to be issued; supersedes all earlier ones.
    pub fn issue(&self) -> RequestTicket {
        RequestTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_latest(&self, ticket: RequestTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// Keep `value` only if `ticket` has not been superseded.
    pub fn accept<T>(&self, ticket: RequestTicket, value: T) -> Option<T> {
        // ---
        if self.is_latest(ticket) {
            Some(value)
        } else {
            tracing::debug!("Discarding stale response for ticket {}", ticket.0);
            None
        }
    }
}
