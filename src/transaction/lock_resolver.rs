// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

use std::collections::HashMap;
use std::collections::HashSet;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use log::info;
use tokio::sync::RwLock;

use super::Lock;
use crate::backoffer::Backoffer;
use crate::backoffer::BO_REGION_MISS;
use crate::proto::kvrpcpb;
use crate::region::RegionVerId;
use crate::region::RegionWithLeader;
use crate::stats::observe_lock_resolve;
use crate::store::dispatch_with_timeout;
use crate::store::HasRegionError;
use crate::store::KvConnect;
use crate::store::KvRequest;
use crate::topology::RegionManager;
use crate::Result;

/// How many transactions the resolver remembers, per cache.
pub(crate) const RESOLVED_TXN_CACHE_SIZE: usize = 2048;

/// The final state of a transaction, as recorded on its primary key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxnStatus {
    Committed(u64),
    RolledBack,
}

impl TxnStatus {
    /// The commit version to roll secondaries forward to; `0` means roll back.
    pub fn commit_version(self) -> u64 {
        match self {
            TxnStatus::Committed(version) => version,
            TxnStatus::RolledBack => 0,
        }
    }
}

/// Per-transaction entries keyed by start ts. Past `capacity` the oldest transaction is
/// forgotten first.
struct TxnCache<V> {
    capacity: usize,
    entries: HashMap<u64, V>,
    order: VecDeque<u64>,
}

impl<V> TxnCache<V> {
    fn new(capacity: usize) -> TxnCache<V> {
        TxnCache {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn get(&self, ts: u64) -> Option<&V> {
        self.entries.get(&ts)
    }

    fn insert(&mut self, ts: u64, value: V) {
        if self.entries.insert(ts, value).is_none() {
            self.order.push_back(ts);
            self.evict();
        }
    }

    fn get_or_insert_with(&mut self, ts: u64, default: impl FnOnce() -> V) -> &mut V {
        if !self.entries.contains_key(&ts) {
            self.order.push_back(ts);
            self.evict();
        }
        self.entries.entry(ts).or_insert_with(default)
    }

    fn evict(&mut self) {
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Resolves locks left by other transactions.
///
/// Cloning is cheap; clones share the caches of decided transactions and of regions that
/// were already cleaned, so resolving the same lock again sends nothing. Both caches keep
/// the most recent 2048 transactions.
#[derive(Clone)]
pub struct LockResolver {
    region_manager: Arc<dyn RegionManager>,
    connector: Arc<dyn KvConnect>,
    timeout: Duration,
    resolved: Arc<RwLock<TxnCache<TxnStatus>>>,
    cleaned: Arc<RwLock<TxnCache<HashSet<RegionVerId>>>>,
}

impl LockResolver {
    pub fn new(
        region_manager: Arc<dyn RegionManager>,
        connector: Arc<dyn KvConnect>,
        timeout: Duration,
    ) -> LockResolver {
        LockResolver::with_cache_capacity(
            region_manager,
            connector,
            timeout,
            RESOLVED_TXN_CACHE_SIZE,
        )
    }

    fn with_cache_capacity(
        region_manager: Arc<dyn RegionManager>,
        connector: Arc<dyn KvConnect>,
        timeout: Duration,
        capacity: usize,
    ) -> LockResolver {
        LockResolver {
            region_manager,
            connector,
            timeout,
            resolved: Arc::new(RwLock::new(TxnCache::new(capacity))),
            cleaned: Arc::new(RwLock::new(TxnCache::new(capacity))),
        }
    }

    /// Resolves every lock whose transaction is decided.
    ///
    /// Returns `true` only if all `locks` were resolved. A lock whose primary is still held
    /// within its TTL is skipped; the caller must back off and retry.
    pub async fn resolve_locks(&self, bo: &mut Backoffer, locks: Vec<Lock>) -> Result<bool> {
        let mut all_resolved = true;
        for lock in locks {
            let cached = self.resolved.read().await.get(lock.ts).copied();
            let status = match cached {
                Some(status) => status,
                None => match self.get_txn_status(bo, &lock).await? {
                    Some(status) => {
                        self.resolved.write().await.insert(lock.ts, status);
                        status
                    }
                    None => {
                        debug!(
                            "txn {} is still alive, lock on primary {:?} has ttl {}",
                            lock.ts, lock.primary, lock.ttl
                        );
                        observe_lock_resolve("pending");
                        all_resolved = false;
                        continue;
                    }
                },
            };
            self.resolve_lock(bo, &lock, status).await?;
        }
        Ok(all_resolved)
    }

    /// Cached status of transaction `ts`, if it was resolved before.
    pub async fn txn_status(&self, ts: u64) -> Option<TxnStatus> {
        self.resolved.read().await.get(ts).copied()
    }

    /// Asks the primary key's region for the outcome of the lock's transaction.
    ///
    /// The store rolls back a primary whose TTL expired; `None` means the primary is still
    /// locked.
    async fn get_txn_status(&self, bo: &mut Backoffer, lock: &Lock) -> Result<Option<TxnStatus>> {
        let (mut resp, _) = self
            .send_to_key_region(bo, &lock.primary, || kvrpcpb::CleanupRequest {
                context: None,
                key: lock.primary.clone(),
                start_version: lock.ts,
            })
            .await?;
        if let Some(mut error) = resp.error.take() {
            if error.locked.take().is_some() {
                return Ok(None);
            }
            return Err(error.into());
        }
        if resp.commit_version > 0 {
            Ok(Some(TxnStatus::Committed(resp.commit_version)))
        } else {
            Ok(Some(TxnStatus::RolledBack))
        }
    }

    async fn resolve_lock(&self, bo: &mut Backoffer, lock: &Lock, status: TxnStatus) -> Result<()> {
        let region = self.region_manager.region_for_key(&lock.key).await?;
        if self.is_cleaned(lock.ts, &region.ver_id()).await {
            return Ok(());
        }

        let (mut resp, region) = self
            .send_to_key_region(bo, &lock.key, || kvrpcpb::ResolveLockRequest {
                context: None,
                start_version: lock.ts,
                commit_version: status.commit_version(),
            })
            .await?;
        if let Some(error) = resp.error.take() {
            return Err(error.into());
        }

        info!(
            "resolved locks of txn {} in region {} as {:?}",
            lock.ts,
            region.id(),
            status
        );
        observe_lock_resolve(match status {
            TxnStatus::Committed(_) => "committed",
            TxnStatus::RolledBack => "rolled_back",
        });
        self.cleaned
            .write()
            .await
            .get_or_insert_with(lock.ts, HashSet::new)
            .insert(region.ver_id());
        Ok(())
    }

    async fn is_cleaned(&self, ts: u64, ver_id: &RegionVerId) -> bool {
        self.cleaned
            .read()
            .await
            .get(ts)
            .is_some_and(|regions| regions.contains(ver_id))
    }

    /// Sends to the leader of the region owning `key`, re-locating it on region errors.
    async fn send_to_key_region<R, F>(
        &self,
        bo: &mut Backoffer,
        key: &[u8],
        build: F,
    ) -> Result<(R::Response, RegionWithLeader)>
    where
        R: KvRequest,
        F: Fn() -> R,
    {
        loop {
            let region = self.region_manager.region_for_key(key).await?;
            let store = self
                .region_manager
                .store_for_id(region.get_store_id()?)
                .await?;
            let client = self.connector.connect(&store.address).await?;

            let mut request = build();
            request.set_leader(&region)?;
            let mut resp =
                match dispatch_with_timeout(client.as_ref(), &request, self.timeout, &store.address)
                    .await
                {
                    Ok(resp) => resp,
                    Err(e) => {
                        self.region_manager.on_request_fail(&region).await;
                        return Err(e);
                    }
                };

            match resp.region_error() {
                Some(e) => {
                    debug!("{} hit region error: {:?}", request.label(), e);
                    self.region_manager.invalidate_region(region.ver_id()).await;
                    bo.backoff(&BO_REGION_MISS, format!("{e:?}")).await?;
                }
                None => return Ok((resp, region)),
            }
        }
    }
}
