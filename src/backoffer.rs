// Copyright 2026 TiKV Project Authors. Licensed under Apache-2.0.

//! Per-category retry budgets.
//!
//! A [`Backoffer`] is created for each top-level call and threaded through every internal retry
//! of that call. Each category (routing miss, lock contention) keeps its own attempt counter,
//! delay state and cumulative sleep ceiling; exhausting one category never charges another.

use std::collections::HashMap;
use std::time::Duration;

use log::debug;
use log::warn;
use rand::thread_rng;
use rand::Rng;
use thiserror::Error;

use crate::stats::observe_backoff_sleep;
use crate::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Jitter {
    NoJitter,
    EqualJitter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BackoffFnCfg {
    base_ms: u64,
    cap_ms: u64,
    jitter: Jitter,
}

impl BackoffFnCfg {
    pub(crate) const fn new(base_ms: u64, cap_ms: u64, jitter: Jitter) -> Self {
        Self {
            base_ms,
            cap_ms,
            jitter,
        }
    }
}

/// What kind of condition a retry budget was covering when it ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackoffErrorKind {
    RegionUnavailable,
    ResolveLockTimeout,
}

impl std::fmt::Display for BackoffErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BackoffErrorKind::RegionUnavailable => "region unavailable",
            BackoffErrorKind::ResolveLockTimeout => "resolve lock timeout",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackofferError {
    /// The category's cumulative sleep reached its ceiling.
    #[error("{kind} after sleeping {total_sleep_ms}ms: {last_error}")]
    MaxSleepExceeded {
        kind: BackoffErrorKind,
        total_sleep_ms: u64,
        last_error: String,
    },

    /// Retries are disabled for this call.
    #[error("{message}")]
    Disabled { message: String },
}

impl BackofferError {
    pub fn kind(&self) -> Option<BackoffErrorKind> {
        match self {
            BackofferError::MaxSleepExceeded { kind, .. } => Some(*kind),
            BackofferError::Disabled { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BackoffConfig {
    name: &'static str,
    fn_cfg: BackoffFnCfg,
    err_kind: BackoffErrorKind,
}

impl BackoffConfig {
    pub(crate) const fn new(
        name: &'static str,
        fn_cfg: BackoffFnCfg,
        err_kind: BackoffErrorKind,
    ) -> Self {
        Self {
            name,
            fn_cfg,
            err_kind,
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }
}

/// Stale region, leader or store.
pub(crate) const BO_REGION_MISS: BackoffConfig = BackoffConfig::new(
    "regionMiss",
    BackoffFnCfg::new(2, 500, Jitter::NoJitter),
    BackoffErrorKind::RegionUnavailable,
);

/// A lock whose transaction is still undecided.
pub(crate) const BO_TXN_LOCK_FAST: BackoffConfig = BackoffConfig::new(
    "txnLockFast",
    BackoffFnCfg::new(10, 3000, Jitter::EqualJitter),
    BackoffErrorKind::ResolveLockTimeout,
);

#[derive(Debug)]
struct BackoffFnState {
    base_ms: u64,
    cap_ms: u64,
    jitter: Jitter,
    attempts: u32,
    total_sleep_ms: u64,
}

impl BackoffFnState {
    fn new(fn_cfg: BackoffFnCfg) -> Self {
        // Keep jitter helpers' ranges non-empty.
        let base_ms = fn_cfg.base_ms.max(2);
        let cap_ms = fn_cfg.cap_ms.max(base_ms);
        Self {
            base_ms,
            cap_ms,
            jitter: fn_cfg.jitter,
            attempts: 0,
            total_sleep_ms: 0,
        }
    }

    fn next_sleep_ms(&self) -> u64 {
        let v = expo(self.base_ms, self.cap_ms, self.attempts);
        match self.jitter {
            Jitter::NoJitter => v,
            Jitter::EqualJitter => {
                let half = v / 2;
                half + thread_rng().gen_range(0..half)
            }
        }
    }

    fn charge(&mut self, sleep_ms: u64) {
        self.attempts += 1;
        self.total_sleep_ms += sleep_ms;
    }
}

fn expo(base_ms: u64, cap_ms: u64, attempts: u32) -> u64 {
    let mul = 1u64.checked_shl(attempts).unwrap_or(u64::MAX);
    base_ms.saturating_mul(mul).min(cap_ms)
}

/// Retry budget for one top-level call.
#[derive(Debug)]
pub struct Backoffer {
    max_sleep_ms: HashMap<&'static str, u64>,
    noop: bool,
    errors: Vec<String>,
    fns: HashMap<&'static str, BackoffFnState>,
}

impl Backoffer {
    /// Budgets taken from `config`.
    pub fn new(config: &Config) -> Self {
        Self::with_max_sleep(
            duration_to_ms(config.region_miss_max_backoff),
            duration_to_ms(config.txn_lock_max_backoff),
        )
    }

    /// Explicit ceilings, in milliseconds, for the routing-miss and lock-contention categories.
    pub fn with_max_sleep(region_miss_ms: u64, txn_lock_ms: u64) -> Self {
        let mut max_sleep_ms = HashMap::new();
        max_sleep_ms.insert(BO_REGION_MISS.name, region_miss_ms);
        max_sleep_ms.insert(BO_TXN_LOCK_FAST.name, txn_lock_ms);
        Self {
            max_sleep_ms,
            noop: false,
            errors: Vec::new(),
            fns: HashMap::new(),
        }
    }

    /// A budget that refuses every retry.
    pub fn no_backoff() -> Self {
        Self {
            max_sleep_ms: HashMap::new(),
            noop: true,
            errors: Vec::new(),
            fns: HashMap::new(),
        }
    }

    /// Charges one retry to `cfg`'s category and returns how long to wait before it.
    pub(crate) fn next_delay(
        &mut self,
        cfg: &BackoffConfig,
        err_message: impl Into<String>,
    ) -> Result<Duration, BackofferError> {
        let err_message = err_message.into();
        if self.noop {
            return Err(BackofferError::Disabled {
                message: err_message,
            });
        }

        let max_sleep_ms = self.max_sleep_ms.get(cfg.name).copied().unwrap_or(0);
        let state = self
            .fns
            .entry(cfg.name)
            .or_insert_with(|| BackoffFnState::new(cfg.fn_cfg));
        // A delay is never shortened to fit the budget; one that does not fit ends the retries.
        let sleep_ms = state.next_sleep_ms();
        if state.total_sleep_ms.saturating_add(sleep_ms) > max_sleep_ms {
            warn!(
                "{} backoff exhausted after {} attempts ({}ms): {}",
                cfg.name, state.attempts, state.total_sleep_ms, err_message
            );
            return Err(BackofferError::MaxSleepExceeded {
                kind: cfg.err_kind,
                total_sleep_ms: state.total_sleep_ms,
                last_error: err_message,
            });
        }

        state.charge(sleep_ms);
        debug!(
            "{} backoff #{}: sleep {}ms, cause: {}",
            cfg.name, state.attempts, sleep_ms, err_message
        );
        self.errors.push(err_message);
        Ok(Duration::from_millis(sleep_ms))
    }

    /// Charges one retry to `cfg`'s category and sleeps for the computed delay.
    pub(crate) async fn backoff(
        &mut self,
        cfg: &BackoffConfig,
        err_message: impl Into<String>,
    ) -> Result<(), BackofferError> {
        let delay = self.next_delay(cfg, err_message)?;
        observe_backoff_sleep(cfg.name, delay);
        tokio::time::sleep(delay).await;
        Ok(())
    }

    /// Cumulative sleep charged to `cfg`'s category so far.
    #[cfg(test)]
    pub(crate) fn total_sleep_ms(&self, cfg: &BackoffConfig) -> u64 {
        self.fns.get(cfg.name).map_or(0, |s| s.total_sleep_ms)
    }

    #[cfg(test)]
    pub(crate) fn attempts(&self, cfg: &BackoffConfig) -> u32 {
        self.fns.get(cfg.name).map_or(0, |s| s.attempts)
    }

    /// Every error message that caused a retry, oldest first.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}

fn duration_to_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
