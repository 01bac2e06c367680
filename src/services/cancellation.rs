//! Cancellation Tokens and Registry
//!
//! One [`CancellationToken`] per running analysis, held in a process-wide
//! [`CancellationRegistry`].
//!
//! The cancelled flag is a plain atomic so the coordinator's hot loop can
//! poll it without touching the registry lock. Each token also owns an
//! abort signal (`tokio_util::sync::CancellationToken`) that is fired on
//! cancel; provider streams hold child signals of it and wake immediately
//! even while suspended in network I/O.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken as AbortSignal;

use anr_analyzer_core::{AnalysisError, AnalysisResult, CancelReason};

/// Single-use cancellation flag for one analysis.
#[derive(Debug)]
pub struct CancellationToken {
    analysis_id: String,
    cancelled: AtomicBool,
    created_at: DateTime<Utc>,
    cancellation: OnceLock<(DateTime<Utc>, CancelReason)>,
    abort: AbortSignal,
}

impl CancellationToken {
    fn new(analysis_id: impl Into<String>) -> Self {
        Self {
            analysis_id: analysis_id.into(),
            cancelled: AtomicBool::new(false),
            created_at: Utc::now(),
            cancellation: OnceLock::new(),
            abort: AbortSignal::new(),
        }
    }

    pub fn analysis_id(&self) -> &str {
        &self.analysis_id
    }

    /// Non-blocking read of the flag.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Flip the flag. Returns false if it was already cancelled, in which
    /// case the original timestamp and reason are kept.
    pub fn cancel(&self, reason: CancelReason) -> bool {
        if self
            .cancelled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        // Only the winning caller reaches this point.
        let _ = self.cancellation.set((Utc::now(), reason));
        self.abort.cancel();
        true
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancellation.get().map(|(at, _)| *at)
    }

    pub fn reason(&self) -> Option<CancelReason> {
        self.cancellation.get().map(|(_, reason)| *reason)
    }

    /// Signal fired when this token is cancelled. Provider streams take a
    /// `child_token()` of it.
    pub fn abort_signal(&self) -> &AbortSignal {
        &self.abort
    }
}

/// Non-blocking check used at every cancellation point.
pub fn check_cancelled(token: &CancellationToken) -> bool {
    token.is_cancelled()
}

/// Process-wide table of active analyses.
#[derive(Debug, Default)]
pub struct CancellationRegistry {
    tokens: Mutex<HashMap<String, Arc<CancellationToken>>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A poisoned lock only means another thread panicked mid-operation;
    /// every operation leaves the map consistent, so keep using it.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<CancellationToken>>> {
        self.tokens.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a fresh token for `analysis_id`.
    pub fn create(&self, analysis_id: &str) -> AnalysisResult<Arc<CancellationToken>> {
        let mut tokens = self.lock();
        if tokens.contains_key(analysis_id) {
            return Err(AnalysisError::DuplicateAnalysisId(analysis_id.to_string()));
        }
        let token = Arc::new(CancellationToken::new(analysis_id));
        tokens.insert(analysis_id.to_string(), Arc::clone(&token));
        tracing::debug!(analysis_id, active = tokens.len(), "cancellation token created");
        Ok(token)
    }

    /// Cancel on behalf of a caller.
    pub fn cancel(&self, analysis_id: &str) -> bool {
        self.cancel_with(analysis_id, CancelReason::UserCancelled)
    }

    /// Returns true only if a registered, not-yet-cancelled token was flipped.
    pub fn cancel_with(&self, analysis_id: &str, reason: CancelReason) -> bool {
        let token = self.lock().get(analysis_id).cloned();
        match token {
            Some(token) => {
                let flipped = token.cancel(reason);
                if flipped {
                    tracing::info!(analysis_id, reason = %reason, "analysis cancellation requested");
                }
                flipped
            }
            None => false,
        }
    }

    /// Idempotent removal.
    pub fn remove(&self, analysis_id: &str) {
        if self.lock().remove(analysis_id).is_some() {
            tracing::debug!(analysis_id, "cancellation token removed");
        }
    }

    /// Remove `token` only if it is still the one registered under its id.
    ///
    /// Returns false when the id is absent or now belongs to a newer
    /// analysis that reused it.
    pub fn release(&self, token: &Arc<CancellationToken>) -> bool {
        let mut tokens = self.lock();
        let owned = tokens
            .get(token.analysis_id())
            .is_some_and(|current| Arc::ptr_eq(current, token));
        if owned {
            tokens.remove(token.analysis_id());
            tracing::debug!(analysis_id = token.analysis_id(), "cancellation token released");
        }
        owned
    }

    /// Cancel every active token; returns how many were flipped.
    pub fn cancel_all(&self, reason: CancelReason) -> usize {
        let tokens: Vec<Arc<CancellationToken>> = self.lock().values().cloned().collect();
        let flipped = tokens.iter().filter(|t| t.cancel(reason)).count();
        if flipped > 0 {
            tracing::info!(count = flipped, reason = %reason, "cancelled all active analyses");
        }
        flipped
    }

    pub fn get(&self, analysis_id: &str) -> Option<Arc<CancellationToken>> {
        self.lock().get(analysis_id).cloned()
    }

    pub fn contains(&self, analysis_id: &str) -> bool {
        self.lock().contains_key(analysis_id)
    }

    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    /// Registered tokens that have been cancelled but not yet removed.
    pub fn cancelled_count(&self) -> usize {
        self.lock().values().filter(|t| t.is_cancelled()).count()
    }
}
