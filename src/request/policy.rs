// Copyright 2021 TiKV Project Authors. Licensed under Apache-2.0.

use crate::kv::Key;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum OnRegionError {
    /// React, back off on the routing budget and send again.
    Retry,
    /// React, then hand the routing error to the caller without resending.
    Propagate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum OnLocks {
    ResolveAndRetry,
    /// Resolve every lock of the batch once and report contention; never resend.
    ResolveOnce,
}

/// Where to re-resolve the bound region when a leader swap is not enough.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Refresh {
    ByKey(Key),
    ById,
    /// The request is tied to the current boundaries; a boundary change is surfaced.
    Never,
}

/// How one operation's retry loop treats each non-success outcome.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RetryPolicy {
    pub on_region_error: OnRegionError,
    pub on_locks: OnLocks,
    pub refresh: Refresh,
    /// Re-fetch the owning region before every resend, not only after a failed rebind.
    pub refresh_every_attempt: bool,
}

impl RetryPolicy {
    /// Point reads follow their key wherever it moves.
    pub fn point_read(key: Key) -> RetryPolicy {
        RetryPolicy {
            refresh_every_attempt: true,
            ..RetryPolicy::keyed(key)
        }
    }

    pub fn keyed(key: Key) -> RetryPolicy {
        RetryPolicy {
            on_region_error: OnRegionError::Retry,
            on_locks: OnLocks::ResolveAndRetry,
            refresh: Refresh::ByKey(key),
            refresh_every_attempt: false,
        }
    }

    /// Requests addressed to the region itself rather than to a key.
    pub fn region_bound() -> RetryPolicy {
        RetryPolicy {
            refresh: Refresh::ById,
            ..RetryPolicy::keyed(Key::new())
        }
    }

    /// Keys already grouped for this region by the caller.
    pub fn batch_read() -> RetryPolicy {
        RetryPolicy {
            on_region_error: OnRegionError::Retry,
            on_locks: OnLocks::ResolveOnce,
            refresh: Refresh::Never,
            refresh_every_attempt: false,
        }
    }

    pub fn scan(start_key: Key) -> RetryPolicy {
        RetryPolicy {
            refresh: Refresh::ByKey(start_key),
            ..RetryPolicy::batch_read()
        }
    }

    /// Prewrite, commit and rollback: the key set is only valid for the current boundaries.
    pub fn two_phase() -> RetryPolicy {
        RetryPolicy {
            on_region_error: OnRegionError::Propagate,
            on_locks: OnLocks::ResolveAndRetry,
            refresh: Refresh::Never,
            refresh_every_attempt: false,
        }
    }

    /// Raw responses never carry locks, so only the routing part matters.
    pub fn raw(key: Key) -> RetryPolicy {
        RetryPolicy::keyed(key)
    }

    pub fn raw_batch() -> RetryPolicy {
        RetryPolicy {
            on_locks: OnLocks::ResolveAndRetry,
            ..RetryPolicy::batch_read()
        }
    }
}
