// Copyright 2019 TiKV Project Authors. Licensed under Apache-2.0.

use std::time::Duration;

use serde_derive::Deserialize;
use serde_derive::Serialize;

/// The configuration shared by every [`RegionStoreClient`](crate::RegionStoreClient) built from
/// one [`RegionStoreClientBuilder`](crate::RegionStoreClientBuilder).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Deadline of a single network attempt.
    pub timeout: Duration,
    /// Maximum number of pairs returned by one scan request.
    pub scan_batch_size: u32,
    /// Cumulative sleep allowed for stale region, leader or store signals within one call.
    pub region_miss_max_backoff: Duration,
    /// Cumulative sleep allowed while waiting for undecided locks within one call.
    pub txn_lock_max_backoff: Duration,
    /// How long a store stays marked as failed after an unusable response.
    pub store_fail_backoff: Duration,
}

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);
const DEFAULT_SCAN_BATCH_SIZE: u32 = 256;
const DEFAULT_REGION_MISS_MAX_BACKOFF: Duration = Duration::from_secs(20);
const DEFAULT_TXN_LOCK_MAX_BACKOFF: Duration = Duration::from_secs(20);
const DEFAULT_STORE_FAIL_BACKOFF: Duration = Duration::from_secs(30);

impl Default for Config {
    fn default() -> Self {
        Config {
            timeout: DEFAULT_REQUEST_TIMEOUT,
            scan_batch_size: DEFAULT_SCAN_BATCH_SIZE,
            region_miss_max_backoff: DEFAULT_REGION_MISS_MAX_BACKOFF,
            txn_lock_max_backoff: DEFAULT_TXN_LOCK_MAX_BACKOFF,
            store_fail_backoff: DEFAULT_STORE_FAIL_BACKOFF,
        }
    }
}

impl Config {
    /// Set the timeout for a single request attempt.
    ///
    /// If a store does not answer within the timeout, the attempt is abandoned, the store is
    /// marked as failed and an error is returned to the caller without retrying.
    ///
    /// The default timeout is two seconds.
    ///
    /// # Examples
    /// ```rust
    /// # use tikv_region_client::Config;
    /// # use std::time::Duration;
    /// let config = Config::default().with_timeout(Duration::from_secs(10));
    /// ```
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_scan_batch_size(mut self, scan_batch_size: u32) -> Self {
        self.scan_batch_size = scan_batch_size;
        self
    }

    #[must_use]
    pub fn with_region_miss_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.region_miss_max_backoff = max_backoff;
        self
    }

    #[must_use]
    pub fn with_txn_lock_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.txn_lock_max_backoff = max_backoff;
        self
    }

    #[must_use]
    pub fn with_store_fail_backoff(mut self, duration: Duration) -> Self {
        self.store_fail_backoff = duration;
        self
    }
}
