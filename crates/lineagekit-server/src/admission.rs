//! Per-client admission control using a sliding window log.
//!
//! Every client identity keeps the exact timestamps of the requests admitted
//! within the trailing window. A request is admitted while fewer than `limit`
//! timestamps remain after pruning.
//!
//! ## Response Headers
//!
//! - `X-RateLimit-Limit`: the configured limit
//! - `X-RateLimit-Remaining`: slots left after this request
//! - `X-RateLimit-Reset`: `now + window` as epoch seconds. This is an upper
//!   bound on when a slot frees up, not the expiry of the oldest slot.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;

/// Path that is never subject to admission control.
pub const EXEMPT_PATH: &str = "/health";

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionDecision {
    pub permitted: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Epoch seconds.
    pub reset_at: u64,
}

/// Body returned to a caller that exceeded its budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitedBody {
    pub error: &'static str,
    pub limit: u32,
    pub window: String,
    pub message: String,
}

/// Sliding-window-log rate limiter shared by every request.
#[derive(Debug)]
pub struct AdmissionController {
    limit: u32,
    window: Duration,
    /// Admitted timestamps per identity, as offsets from the Unix epoch.
    records: Mutex<HashMap<String, VecDeque<Duration>>>,
}

impl AdmissionController {
    #[must_use]
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            records: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn is_exempt(path: &str) -> bool {
        path == EXEMPT_PATH
    }

    /// Checks and, when permitted, records one request from `identity`.
    ///
    /// Pruning, counting and appending happen under one lock, so concurrent
    /// requests from the same identity cannot both take the last slot. A
    /// denied request leaves the record untouched.
    pub fn allow(&self, identity: &str, now: SystemTime) -> AdmissionDecision {
        let now = since_epoch(now);
        let reset_at = (now + self.window).as_secs();
        let cutoff = now.saturating_sub(self.window);

        let mut records = self.lock();
        let log = records.entry(identity.to_string()).or_default();
        prune(log, cutoff);

        let permitted = log.len() < self.limit as usize;
        if permitted {
            log.push_back(now);
        }
        let count = u32::try_from(log.len()).unwrap_or(u32::MAX);
        if log.is_empty() {
            records.remove(identity);
        }

        AdmissionDecision {
            permitted,
            limit: self.limit,
            remaining: self.limit.saturating_sub(count),
            reset_at,
        }
    }

    /// Prunes every record and drops the ones left empty. Returns the number
    /// of identities removed.
    pub fn sweep(&self, now: SystemTime) -> usize {
        let cutoff = since_epoch(now).saturating_sub(self.window);
        let mut records = self.lock();
        let before = records.len();
        records.retain(|_, log| {
            prune(log, cutoff);
            !log.is_empty()
        });
        before - records.len()
    }

    /// Number of identities currently holding a record.
    pub fn tracked_identities(&self) -> usize {
        self.lock().len()
    }

    /// Human-readable window length, e.g. `1 minute` or `30 seconds`.
    pub fn window_label(&self) -> String {
        match self.window.as_secs() {
            60 => "1 minute".to_string(),
            1 => "1 second".to_string(),
            secs if secs % 60 == 0 => format!("{} minutes", secs / 60),
            secs => format!("{secs} seconds"),
        }
    }

    pub fn denial_body(&self) -> RateLimitedBody {
        let per = match self.window.as_secs() {
            60 => "per minute".to_string(),
            _ => format!("per {}", self.window_label()),
        };
        RateLimitedBody {
            error: "Rate limit exceeded",
            limit: self.limit,
            window: self.window_label(),
            message: format!(
                "Too many requests. Maximum {} requests {per} allowed.",
                self.limit
            ),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, VecDeque<Duration>>> {
        // A panic while holding the lock cannot leave a log half-written.
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Drops timestamps older than `cutoff` from the front of a log.
fn prune(log: &mut VecDeque<Duration>, cutoff: Duration) {
    while log.front().is_some_and(|ts| *ts < cutoff) {
        log.pop_front();
    }
}

fn since_epoch(now: SystemTime) -> Duration {
    now.duration_since(UNIX_EPOCH).unwrap_or_default()
}
