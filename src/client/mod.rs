// Copyright 2019 TiKV Project Authors. Licensed under Apache-2.0.

//! The per-region request dispatcher.

mod coprocessor;

use std::sync::Arc;

use log::debug;
use log::info;
use log::warn;

pub use self::coprocessor::REQ_TYPE_ANALYZE;
pub use self::coprocessor::REQ_TYPE_BATCH_ROW_COUNT;
pub use self::coprocessor::REQ_TYPE_DAG;
pub use self::coprocessor::REQ_TYPE_INDEX;
pub use self::coprocessor::REQ_TYPE_SELECT;
use crate::backoffer::Backoffer;
use crate::backoffer::BO_REGION_MISS;
use crate::backoffer::BO_TXN_LOCK_FAST;
use crate::kv::Key;
use crate::kv::KvPair;
use crate::kv::Value;
use crate::proto::errorpb;
use crate::proto::kvrpcpb;
use crate::proto::metapb;
use crate::request::classify;
use crate::request::Classified;
use crate::request::OnLocks;
use crate::request::OnRegionError;
use crate::request::Refresh;
use crate::request::RetryPolicy;
use crate::store::dispatch_with_timeout;
use crate::store::KvConnect;
use crate::store::KvRequest;
use crate::store::RegionStore;
use crate::store::RegionWithLeader;
use crate::topology::RangeSplitter;
use crate::topology::RegionManager;
use crate::transaction::Lock;
use crate::transaction::LockResolver;
use crate::Config;
use crate::Error;
use crate::Result;

/// Builds [`RegionStoreClient`]s that share one topology, one connector and one lock resolver.
#[derive(Clone)]
pub struct RegionStoreClientBuilder {
    config: Config,
    region_manager: Arc<dyn RegionManager>,
    range_splitter: Arc<dyn RangeSplitter>,
    connector: Arc<dyn KvConnect>,
    lock_resolver: LockResolver,
}

impl RegionStoreClientBuilder {
    pub fn new(
        config: Config,
        region_manager: Arc<dyn RegionManager>,
        range_splitter: Arc<dyn RangeSplitter>,
        connector: Arc<dyn KvConnect>,
    ) -> RegionStoreClientBuilder {
        let lock_resolver =
            LockResolver::new(region_manager.clone(), connector.clone(), config.timeout);
        RegionStoreClientBuilder {
            config,
            region_manager,
            range_splitter,
            connector,
            lock_resolver,
        }
    }

    /// A client bound to `region` and the store hosting its leader.
    pub async fn build(&self, region: RegionWithLeader) -> Result<RegionStoreClient> {
        let store = self
            .region_manager
            .store_for_id(region.get_store_id()?)
            .await?;
        let client = self.connector.connect(&store.address).await?;
        Ok(RegionStoreClient {
            config: self.config.clone(),
            region_store: RegionStore::new(region, store, client),
            region_manager: self.region_manager.clone(),
            range_splitter: self.range_splitter.clone(),
            connector: self.connector.clone(),
            lock_resolver: self.lock_resolver.clone(),
        })
    }

    /// A client bound to the region currently owning `key`.
    pub async fn build_for_key(&self, key: &[u8]) -> Result<RegionStoreClient> {
        let region = self.region_manager.region_for_key(key).await?;
        self.build(region).await
    }
}

/// Sends requests to one region's leader and drives their retries.
///
/// Every operation takes `&mut self`: a routing error may rebind the client to another leader
/// or region in place, so a client belongs to one task at a time. Build one client per task.
///
/// A [`Backoffer`] passed to an operation bounds the total wait of that call, including time
/// spent resolving locks. Pass the same one through all the calls of one logical request.
pub struct RegionStoreClient {
    config: Config,
    region_store: RegionStore,
    region_manager: Arc<dyn RegionManager>,
    range_splitter: Arc<dyn RangeSplitter>,
    connector: Arc<dyn KvConnect>,
    lock_resolver: LockResolver,
}

impl RegionStoreClient {
    /// The region this client is currently bound to.
    pub fn region(&self) -> &RegionWithLeader {
        &self.region_store.region_with_leader
    }

    /// The store this client currently sends to.
    pub fn store(&self) -> &metapb::Store {
        &self.region_store.store
    }

    pub async fn get(
        &mut self,
        bo: &mut Backoffer,
        key: Key,
        version: u64,
    ) -> Result<Option<Value>> {
        let policy = RetryPolicy::point_read(key.clone());
        let resp = self
            .send_with_retry(
                bo,
                || kvrpcpb::GetRequest {
                    context: None,
                    key: key.clone(),
                    version,
                },
                &policy,
            )
            .await?;
        Ok((!resp.not_found).then_some(resp.value))
    }

    /// Reads `keys`, all of which must belong to the bound region.
    ///
    /// Locks found anywhere in the batch are resolved together once, after which the call
    /// fails with [`Error::ResolveLockError`] and the caller retries the whole batch.
    pub async fn batch_get(
        &mut self,
        bo: &mut Backoffer,
        keys: Vec<Key>,
        version: u64,
    ) -> Result<Vec<KvPair>> {
        let resp = self
            .send_with_retry(
                bo,
                || kvrpcpb::BatchGetRequest {
                    context: None,
                    keys: keys.clone(),
                    version,
                },
                &RetryPolicy::batch_read(),
            )
            .await?;
        Ok(resp.pairs.into_iter().map(KvPair::from).collect())
    }

    /// Scans forward from `start_key` for at most `scan_batch_size` pairs.
    ///
    /// Locks are handled like in [`batch_get`](Self::batch_get).
    pub async fn scan(
        &mut self,
        bo: &mut Backoffer,
        start_key: Key,
        version: u64,
        key_only: bool,
    ) -> Result<Vec<KvPair>> {
        let limit = self.config.scan_batch_size;
        let policy = RetryPolicy::scan(start_key.clone());
        let resp = self
            .send_with_retry(
                bo,
                || kvrpcpb::ScanRequest {
                    context: None,
                    start_key: start_key.clone(),
                    limit,
                    version,
                    key_only,
                },
                &policy,
            )
            .await?;
        Ok(resp.pairs.into_iter().map(KvPair::from).collect())
    }

    pub async fn raw_get(&mut self, bo: &mut Backoffer, key: Key) -> Result<Option<Value>> {
        let policy = RetryPolicy::raw(key.clone());
        let resp = self
            .send_with_retry(
                bo,
                || kvrpcpb::RawGetRequest {
                    context: None,
                    key: key.clone(),
                },
                &policy,
            )
            .await?;
        Ok((!resp.not_found).then_some(resp.value))
    }

    pub async fn raw_put(&mut self, bo: &mut Backoffer, key: Key, value: Value) -> Result<()> {
        let policy = RetryPolicy::raw(key.clone());
        self.send_with_retry(
            bo,
            || kvrpcpb::RawPutRequest {
                context: None,
                key: key.clone(),
                value: value.clone(),
            },
            &policy,
        )
        .await?;
        Ok(())
    }

    pub async fn raw_delete(&mut self, bo: &mut Backoffer, key: Key) -> Result<()> {
        let policy = RetryPolicy::raw(key.clone());
        self.send_with_retry(
            bo,
            || kvrpcpb::RawDeleteRequest {
                context: None,
                key: key.clone(),
            },
            &policy,
        )
        .await?;
        Ok(())
    }

    /// Writes `pairs`, all of which must belong to the bound region. An empty batch is a no-op.
    pub async fn raw_batch_put(&mut self, bo: &mut Backoffer, pairs: Vec<KvPair>) -> Result<()> {
        if pairs.is_empty() {
            return Ok(());
        }
        let pairs: Vec<kvrpcpb::KvPair> = pairs.into_iter().map(Into::into).collect();
        self.send_with_retry(
            bo,
            || kvrpcpb::RawBatchPutRequest {
                context: None,
                pairs: pairs.clone(),
            },
            &RetryPolicy::raw_batch(),
        )
        .await?;
        Ok(())
    }

    /// Scans raw pairs from `start_key`; `limit` defaults to the configured scan batch size.
    pub async fn raw_scan(
        &mut self,
        bo: &mut Backoffer,
        start_key: Key,
        limit: Option<u32>,
        key_only: bool,
    ) -> Result<Vec<KvPair>> {
        let limit = limit.unwrap_or(self.config.scan_batch_size);
        let policy = RetryPolicy::raw(start_key.clone());
        let resp = self
            .send_with_retry(
                bo,
                || kvrpcpb::RawScanRequest {
                    context: None,
                    start_key: start_key.clone(),
                    limit,
                    key_only,
                },
                &policy,
            )
            .await?;
        Ok(resp.kvs.into_iter().map(KvPair::from).collect())
    }

    /// Deletes `[start_key, end_key)` within the bound region.
    pub async fn delete_range(
        &mut self,
        bo: &mut Backoffer,
        start_key: Key,
        end_key: Key,
    ) -> Result<()> {
        let policy = RetryPolicy::keyed(start_key.clone());
        self.send_with_retry(
            bo,
            || kvrpcpb::DeleteRangeRequest {
                context: None,
                start_key: start_key.clone(),
                end_key: end_key.clone(),
            },
            &policy,
        )
        .await?;
        Ok(())
    }

    /// First phase of two-phase commit.
    ///
    /// A routing error is returned as [`Error::RegionError`] after a single attempt: the
    /// mutations were grouped against the old region boundaries and must be regrouped by the
    /// caller.
    pub async fn prewrite(
        &mut self,
        bo: &mut Backoffer,
        primary_lock: Key,
        mutations: Vec<kvrpcpb::Mutation>,
        start_version: u64,
        lock_ttl: u64,
        skip_constraint_check: bool,
    ) -> Result<()> {
        self.send_with_retry(
            bo,
            || kvrpcpb::PrewriteRequest {
                context: None,
                mutations: mutations.clone(),
                primary_lock: primary_lock.clone(),
                start_version,
                lock_ttl,
                skip_constraint_check,
            },
            &RetryPolicy::two_phase(),
        )
        .await?;
        Ok(())
    }

    /// Second phase of two-phase commit. Routing errors are handled like in
    /// [`prewrite`](Self::prewrite).
    pub async fn commit(
        &mut self,
        bo: &mut Backoffer,
        keys: Vec<Key>,
        start_version: u64,
        commit_version: u64,
    ) -> Result<()> {
        self.send_with_retry(
            bo,
            || kvrpcpb::CommitRequest {
                context: None,
                start_version,
                keys: keys.clone(),
                commit_version,
            },
            &RetryPolicy::two_phase(),
        )
        .await?;
        Ok(())
    }

    /// Rolls back `key` of transaction `start_ts`, or learns its commit version.
    ///
    /// Returns the commit version, `0` if the transaction is rolled back.
    pub async fn cleanup(&mut self, bo: &mut Backoffer, key: Key, start_ts: u64) -> Result<u64> {
        let policy = RetryPolicy::keyed(key.clone());
        let resp = self
            .send_with_retry(
                bo,
                || kvrpcpb::CleanupRequest {
                    context: None,
                    key: key.clone(),
                    start_version: start_ts,
                },
                &policy,
            )
            .await?;
        Ok(resp.commit_version)
    }

    pub async fn batch_rollback(
        &mut self,
        bo: &mut Backoffer,
        keys: Vec<Key>,
        start_version: u64,
    ) -> Result<()> {
        self.send_with_retry(
            bo,
            || kvrpcpb::BatchRollbackRequest {
                context: None,
                start_version,
                keys: keys.clone(),
            },
            &RetryPolicy::two_phase(),
        )
        .await?;
        Ok(())
    }

    /// Removes MVCC versions older than `safe_point` in the bound region.
    pub async fn gc(&mut self, bo: &mut Backoffer, safe_point: u64) -> Result<()> {
        self.send_with_retry(
            bo,
            || kvrpcpb::GcRequest {
                context: None,
                safe_point,
            },
            &RetryPolicy::region_bound(),
        )
        .await?;
        Ok(())
    }

    /// Lists locks with a start version at or below `max_version`, starting at `start_key`.
    pub async fn scan_lock(
        &mut self,
        bo: &mut Backoffer,
        start_key: Key,
        max_version: u64,
        limit: u32,
    ) -> Result<Vec<Lock>> {
        let policy = RetryPolicy::keyed(start_key.clone());
        let resp = self
            .send_with_retry(
                bo,
                || kvrpcpb::ScanLockRequest {
                    context: None,
                    max_version,
                    start_key: start_key.clone(),
                    limit,
                },
                &policy,
            )
            .await?;
        Ok(resp.locks.into_iter().map(Lock::from).collect())
    }

    /// Sends the request built by `build` until it succeeds, following `policy`.
    ///
    /// `build` runs once per attempt so every attempt carries the routing context current at
    /// send time.
    pub(crate) async fn send_with_retry<R, F>(
        &mut self,
        bo: &mut Backoffer,
        build: F,
        policy: &RetryPolicy,
    ) -> Result<R::Response>
    where
        R: KvRequest,
        F: Fn() -> R,
    {
        loop {
            let mut request = build();
            self.region_store.apply_to_request(&mut request)?;
            let resp = self.dispatch(&request).await?;

            match classify(resp) {
                Classified::Success(resp) => return Ok(resp),
                Classified::KeyError(e) => return Err(e),
                Classified::RegionError(e) => {
                    let rebound = self.on_region_error(&e).await?;
                    let needs_refresh = !rebound || policy.refresh_every_attempt;
                    if policy.on_region_error == OnRegionError::Propagate
                        || (needs_refresh && policy.refresh == Refresh::Never)
                    {
                        return Err(Error::RegionError(Box::new(e)));
                    }
                    bo.backoff(&BO_REGION_MISS, format!("{e:?}")).await?;
                    if needs_refresh {
                        self.refresh(&policy.refresh).await?;
                    }
                }
                Classified::Locked(locks) => {
                    let resolved = self
                        .lock_resolver
                        .resolve_locks(bo, locks.clone())
                        .await?;
                    if !resolved {
                        bo.backoff(
                            &BO_TXN_LOCK_FAST,
                            format!("{} lock(s) not resolvable yet", locks.len()),
                        )
                        .await?;
                    }
                    match policy.on_locks {
                        OnLocks::ResolveOnce => return Err(Error::ResolveLockError(locks)),
                        OnLocks::ResolveAndRetry => {
                            if policy.refresh_every_attempt {
                                self.refresh(&policy.refresh).await?;
                            }
                        }
                    }
                }
            }
        }
    }

    /// One attempt. A failed or timed out send marks the store as failed and is never retried.
    async fn dispatch<R: KvRequest>(&self, request: &R) -> Result<R::Response> {
        let result = dispatch_with_timeout(
            self.region_store.client.as_ref(),
            request,
            self.config.timeout,
            &self.region_store.store.address,
        )
        .await;
        if let Err(e) = &result {
            warn!(
                "{} to store {} failed: {}",
                request.label(),
                self.region_store.store.address,
                e
            );
            self.region_manager
                .on_request_fail(&self.region_store.region_with_leader)
                .await;
        }
        result
    }

    // Returns
    // 1. Ok(true): the client has been rebound in place, retry against it
    // 2. Ok(false): the bound region must be re-resolved before retrying
    // 3. Err(Error): the reaction itself failed
    async fn on_region_error(&mut self, e: &errorpb::Error) -> Result<bool> {
        debug!("region {} hit region error: {:?}", self.region().id(), e);
        self.region_manager
            .invalidate_region(self.region().ver_id())
            .await;
        if let Some(not_leader) = &e.not_leader {
            self.on_not_leader(not_leader).await
        } else if let Some(store_not_match) = &e.store_not_match {
            self.on_store_not_match(store_not_match).await
        } else {
            Ok(false)
        }
    }

    async fn on_not_leader(&mut self, not_leader: &errorpb::NotLeader) -> Result<bool> {
        let Some(leader) = not_leader.leader.clone() else {
            // Election in progress; nobody knows the leader yet.
            return Ok(false);
        };
        let region = match self.region_manager.region_for_id(self.region().id()).await {
            Ok(region) => region,
            Err(e) => {
                debug!("cannot reload region {}: {}", self.region().id(), e);
                return Ok(false);
            }
        };
        if !region.same_range(self.region()) {
            return Ok(false);
        }

        info!(
            "region {} leader moved to store {}",
            region.id(),
            leader.store_id
        );
        self.rebind(region.with_leader(leader)).await?;
        Ok(true)
    }

    async fn on_store_not_match(&mut self, error: &errorpb::StoreNotMatch) -> Result<bool> {
        let store = self
            .region_manager
            .store_for_id(error.actual_store_id)
            .await?;
        info!(
            "store {} does not match, reconnecting to {}",
            error.request_store_id, store.address
        );
        self.region_store.client = self.connector.connect(&store.address).await?;
        self.region_store.store = store;
        self.region_manager
            .invalidate_store(error.request_store_id)
            .await;
        Ok(true)
    }

    /// Re-resolves the bound region. `Refresh::Never` keeps the current binding.
    async fn refresh(&mut self, refresh: &Refresh) -> Result<()> {
        let region = match refresh {
            Refresh::ByKey(key) => self.region_manager.region_for_key(key).await?,
            Refresh::ById => self.region_manager.region_for_id(self.region().id()).await?,
            Refresh::Never => return Ok(()),
        };
        self.rebind(region).await
    }

    async fn rebind(&mut self, region: RegionWithLeader) -> Result<()> {
        let store = self
            .region_manager
            .store_for_id(region.get_store_id()?)
            .await?;
        if store.address != self.region_store.store.address {
            self.region_store.client = self.connector.connect(&store.address).await?;
        }
        self.region_store.region_with_leader = region;
        self.region_store.store = store;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::any::Any;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::backoffer::BackoffErrorKind;
    use crate::mock::mock_builder;
    use crate::mock::MockKvClient;
    use crate::mock::MockRegionManager;
    use crate::store::KvClient;
    use crate::store::Request;

    fn lock_error(key: &[u8]) -> kvrpcpb::KeyError {
        kvrpcpb::KeyError {
            locked: Some(kvrpcpb::LockInfo {
                primary_lock: b"primary".to_vec(),
                lock_version: 10,
                key: key.to_vec(),
                lock_ttl: 3000,
            }),
            ..Default::default()
        }
    }

    fn boxed<T: Any + Send>(resp: T) -> Result<Box<dyn Any + Send>> {
        Ok(Box::new(resp) as Box<dyn Any + Send>)
    }

    async fn client_for(client: MockKvClient) -> (RegionStoreClient, Arc<MockRegionManager>) {
        let manager = Arc::new(MockRegionManager::region1());
        let (builder, _) = mock_builder(Config::default(), manager.clone(), client);
        (builder.build_for_key(b"k").await.unwrap(), manager)
    }

    #[tokio::test]
    async fn test_get_without_contention_takes_one_attempt() {
        let calls = Arc::new(AtomicUsize::new(0));
        let captured = calls.clone();
        let client = MockKvClient::with_dispatch_hook(move |req: &dyn Any| {
            captured.fetch_add(1, Ordering::SeqCst);
            let req = req.downcast_ref::<kvrpcpb::GetRequest>().unwrap();
            assert_eq!(req.version, 50);
            assert_eq!(req.context.as_ref().unwrap().region_id, 1);
            boxed(kvrpcpb::GetResponse {
                value: b"v1".to_vec(),
                ..Default::default()
            })
        });
        let (mut client, _) = client_for(client).await;
        let mut bo = Backoffer::new(&Config::default());

        let value = client.get(&mut bo, b"k".to_vec(), 50).await.unwrap();
        assert_eq!(value, Some(b"v1".to_vec()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(bo.errors().is_empty());
    }

    #[tokio::test]
    async fn test_get_not_found() {
        let client = MockKvClient::with_dispatch_hook(|_: &dyn Any| {
            boxed(kvrpcpb::GetResponse {
                not_found: true,
                ..Default::default()
            })
        });
        let (mut client, _) = client_for(client).await;
        let mut bo = Backoffer::no_backoff();
        assert_eq!(client.get(&mut bo, b"k".to_vec(), 1).await.unwrap(), None);
    }

    fn lock_then_value(
        commit_version: u64,
        value_after: &'static [u8],
    ) -> (MockKvClient, Arc<AtomicUsize>) {
        let gets = Arc::new(AtomicUsize::new(0));
        let captured = gets.clone();
        let client = MockKvClient::with_dispatch_hook(move |req: &dyn Any| {
            if req.downcast_ref::<kvrpcpb::GetRequest>().is_some() {
                if captured.fetch_add(1, Ordering::SeqCst) == 0 {
                    return boxed(kvrpcpb::GetResponse {
                        error: Some(lock_error(b"k")),
                        ..Default::default()
                    });
                }
                boxed(kvrpcpb::GetResponse {
                    value: value_after.to_vec(),
                    ..Default::default()
                })
            } else if req.downcast_ref::<kvrpcpb::CleanupRequest>().is_some() {
                boxed(kvrpcpb::CleanupResponse {
                    commit_version,
                    ..Default::default()
                })
            } else if let Some(req) = req.downcast_ref::<kvrpcpb::ResolveLockRequest>() {
                assert_eq!(req.start_version, 10);
                assert_eq!(req.commit_version, commit_version);
                boxed(kvrpcpb::ResolveLockResponse::default())
            } else {
                unreachable!()
            }
        });
        (client, gets)
    }

    #[tokio::test]
    async fn test_get_reads_value_after_primary_committed() {
        let (client, gets) = lock_then_value(20, b"committed");
        let (mut client, _) = client_for(client).await;
        let mut bo = Backoffer::new(&Config::default());

        let value = client.get(&mut bo, b"k".to_vec(), 30).await.unwrap();
        assert_eq!(value, Some(b"committed".to_vec()));
        assert_eq!(gets.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_get_reads_old_value_after_primary_rolled_back() {
        let (client, gets) = lock_then_value(0, b"before");
        let (mut client, _) = client_for(client).await;
        let mut bo = Backoffer::new(&Config::default());

        let value = client.get(&mut bo, b"k".to_vec(), 30).await.unwrap();
        assert_eq!(value, Some(b"before".to_vec()));
        assert_eq!(gets.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_routing_errors_exhaust_region_miss_budget() {
        let calls = Arc::new(AtomicUsize::new(0));
        let captured = calls.clone();
        let client = MockKvClient::with_dispatch_hook(move |_: &dyn Any| {
            captured.fetch_add(1, Ordering::SeqCst);
            boxed(kvrpcpb::GetResponse {
                region_error: Some(errorpb::Error {
                    epoch_not_match: Some(errorpb::EpochNotMatch::default()),
                    ..Default::default()
                }),
                ..Default::default()
            })
        });
        let (mut client, manager) = client_for(client).await;
        let mut bo = Backoffer::with_max_sleep(100, 100);

        let err = client.get(&mut bo, b"k".to_vec(), 1).await.unwrap_err();
        match err {
            Error::BackoffExhausted(e) => {
                assert_eq!(e.kind(), Some(BackoffErrorKind::RegionUnavailable))
            }
            other => panic!("unexpected {other:?}"),
        }
        // 2 + 4 + 8 + 16 + 32ms, then 64ms no longer fits in the 100ms ceiling.
        assert_eq!(calls.load(Ordering::SeqCst), 6);
        assert_eq!(manager.invalidated(), 6);
        assert_eq!(bo.total_sleep_ms(&BO_REGION_MISS), 62);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_against_live_primary_exhausts_lock_budget() {
        let gets = Arc::new(AtomicUsize::new(0));
        let captured = gets.clone();
        let client = MockKvClient::with_dispatch_hook(move |req: &dyn Any| {
            if req.downcast_ref::<kvrpcpb::GetRequest>().is_some() {
                captured.fetch_add(1, Ordering::SeqCst);
                boxed(kvrpcpb::GetResponse {
                    error: Some(lock_error(b"k")),
                    ..Default::default()
                })
            } else if req.downcast_ref::<kvrpcpb::CleanupRequest>().is_some() {
                boxed(kvrpcpb::CleanupResponse {
                    error: Some(lock_error(b"primary")),
                    ..Default::default()
                })
            } else {
                panic!("a lock of a live transaction must not be resolved")
            }
        });
        let (mut client, _) = client_for(client).await;
        let mut bo = Backoffer::with_max_sleep(1000, 200);

        let err = client.get(&mut bo, b"k".to_vec(), 30).await.unwrap_err();
        match err {
            Error::BackoffExhausted(e) => {
                assert_eq!(e.kind(), Some(BackoffErrorKind::ResolveLockTimeout))
            }
            other => panic!("unexpected {other:?}"),
        }
        let attempts = bo.attempts(&BO_TXN_LOCK_FAST) as usize;
        assert!(attempts >= 1);
        assert_eq!(gets.load(Ordering::SeqCst), attempts + 1);
        assert!(bo.total_sleep_ms(&BO_TXN_LOCK_FAST) <= 200);
        assert_eq!(bo.total_sleep_ms(&BO_REGION_MISS), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_get_surfaces_unbindable_routing_error_without_sleeping() {
        let calls = Arc::new(AtomicUsize::new(0));
        let captured = calls.clone();
        let client = MockKvClient::with_dispatch_hook(move |_: &dyn Any| {
            captured.fetch_add(1, Ordering::SeqCst);
            boxed(kvrpcpb::BatchGetResponse {
                region_error: Some(errorpb::Error {
                    not_leader: Some(errorpb::NotLeader {
                        region_id: 1,
                        leader: None,
                    }),
                    ..Default::default()
                }),
                pairs: Vec::new(),
            })
        });
        let (mut client, manager) = client_for(client).await;
        let mut bo = Backoffer::new(&Config::default());
        let start = tokio::time::Instant::now();

        let err = client
            .batch_get(&mut bo, vec![b"a".to_vec()], 30)
            .await
            .unwrap_err();
        assert!(err.is_region_error());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(manager.invalidated(), 1);
        assert!(bo.errors().is_empty());
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_raw_scan_limit_defaults_to_scan_batch_size() {
        let limits = Arc::new(std::sync::Mutex::new(Vec::new()));
        let captured = limits.clone();
        let client = MockKvClient::with_dispatch_hook(move |req: &dyn Any| {
            let req = req.downcast_ref::<kvrpcpb::RawScanRequest>().unwrap();
            captured.lock().unwrap().push(req.limit);
            boxed(kvrpcpb::RawScanResponse {
                region_error: None,
                kvs: vec![kvrpcpb::KvPair {
                    error: None,
                    key: b"a".to_vec(),
                    value: b"1".to_vec(),
                }],
            })
        });
        let manager = Arc::new(MockRegionManager::region1());
        let config = Config::default().with_scan_batch_size(32);
        let (builder, _) = mock_builder(config, manager, client);
        let mut client = builder.build_for_key(b"a").await.unwrap();
        let mut bo = Backoffer::no_backoff();

        let pairs = client
            .raw_scan(&mut bo, b"a".to_vec(), None, false)
            .await
            .unwrap();
        assert_eq!(pairs, vec![KvPair::new(b"a".to_vec(), b"1".to_vec())]);
        client
            .raw_scan(&mut bo, b"a".to_vec(), Some(5), true)
            .await
            .unwrap();
        assert_eq!(*limits.lock().unwrap(), vec![32, 5]);
    }

    #[tokio::test]
    async fn test_empty_raw_batch_put_sends_nothing() {
        let client = MockKvClient::with_dispatch_hook(|_: &dyn Any| {
            panic!("an empty batch must not reach the store")
        });
        let (mut client, _) = client_for(client).await;
        let mut bo = Backoffer::no_backoff();
        client.raw_batch_put(&mut bo, Vec::new()).await.unwrap();
    }

    #[tokio::test]
    async fn test_raw_batch_put_converts_pairs() {
        let client = MockKvClient::with_dispatch_hook(|req: &dyn Any| {
            let req = req.downcast_ref::<kvrpcpb::RawBatchPutRequest>().unwrap();
            assert_eq!(req.pairs.len(), 2);
            assert_eq!(req.pairs[1].key, b"b".to_vec());
            boxed(kvrpcpb::RawBatchPutResponse::default())
        });
        let (mut client, _) = client_for(client).await;
        let mut bo = Backoffer::no_backoff();
        client
            .raw_batch_put(
                &mut bo,
                vec![
                    KvPair::new(b"a".to_vec(), b"1".to_vec()),
                    KvPair::new(b"b".to_vec(), b"2".to_vec()),
                ],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_prewrite_surfaces_routing_error_without_retry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let captured = calls.clone();
        let client = MockKvClient::with_dispatch_hook(move |_: &dyn Any| {
            captured.fetch_add(1, Ordering::SeqCst);
            boxed(kvrpcpb::PrewriteResponse {
                region_error: Some(errorpb::Error {
                    epoch_not_match: Some(errorpb::EpochNotMatch::default()),
                    ..Default::default()
                }),
                errors: Vec::new(),
            })
        });
        let (mut client, manager) = client_for(client).await;
        let mut bo = Backoffer::new(&Config::default());

        let mutation = kvrpcpb::Mutation {
            op: kvrpcpb::Op::Put.into(),
            key: b"k".to_vec(),
            value: b"v".to_vec(),
        };
        let err = client
            .prewrite(&mut bo, b"k".to_vec(), vec![mutation], 5, 3000, false)
            .await
            .unwrap_err();
        assert!(err.is_region_error());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(manager.invalidated(), 1);
        assert!(bo.errors().is_empty());
    }

    #[tokio::test]
    async fn test_prewrite_resolves_lock_and_retries_in_place() {
        let prewrites = Arc::new(AtomicUsize::new(0));
        let captured = prewrites.clone();
        let client = MockKvClient::with_dispatch_hook(move |req: &dyn Any| {
            if req.downcast_ref::<kvrpcpb::PrewriteRequest>().is_some() {
                let errors = if captured.fetch_add(1, Ordering::SeqCst) == 0 {
                    vec![lock_error(b"k")]
                } else {
                    Vec::new()
                };
                boxed(kvrpcpb::PrewriteResponse {
                    region_error: None,
                    errors,
                })
            } else if req.downcast_ref::<kvrpcpb::CleanupRequest>().is_some() {
                boxed(kvrpcpb::CleanupResponse::default())
            } else {
                boxed(kvrpcpb::ResolveLockResponse::default())
            }
        });
        let (mut client, _) = client_for(client).await;
        let mut bo = Backoffer::new(&Config::default());
        client
            .prewrite(&mut bo, b"k".to_vec(), Vec::new(), 5, 3000, false)
            .await
            .unwrap();
        assert_eq!(prewrites.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_batch_rollback_surfaces_routing_error_after_one_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let captured = calls.clone();
        let client = MockKvClient::with_dispatch_hook(move |req: &dyn Any| {
            captured.fetch_add(1, Ordering::SeqCst);
            let req = req.downcast_ref::<kvrpcpb::BatchRollbackRequest>().unwrap();
            assert_eq!(req.start_version, 5);
            assert_eq!(req.keys, vec![b"a".to_vec(), b"b".to_vec()]);
            boxed(kvrpcpb::BatchRollbackResponse {
                region_error: Some(errorpb::Error {
                    epoch_not_match: Some(errorpb::EpochNotMatch::default()),
                    ..Default::default()
                }),
                error: None,
            })
        });
        let (mut client, manager) = client_for(client).await;
        let mut bo = Backoffer::new(&Config::default());

        let err = client
            .batch_rollback(&mut bo, vec![b"a".to_vec(), b"b".to_vec()], 5)
            .await
            .unwrap_err();
        assert!(err.is_region_error());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(manager.invalidated(), 1);
        assert!(bo.errors().is_empty());
    }

    #[tokio::test]
    async fn test_commit_conflict_is_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let captured = calls.clone();
        let client = MockKvClient::with_dispatch_hook(move |_: &dyn Any| {
            captured.fetch_add(1, Ordering::SeqCst);
            boxed(kvrpcpb::CommitResponse {
                region_error: None,
                error: Some(kvrpcpb::KeyError {
                    conflict: Some(kvrpcpb::WriteConflict {
                        start_ts: 5,
                        conflict_ts: 6,
                        key: b"k".to_vec(),
                        primary: b"k".to_vec(),
                        conflict_commit_ts: 7,
                    }),
                    ..Default::default()
                }),
            })
        });
        let (mut client, _) = client_for(client).await;
        let mut bo = Backoffer::new(&Config::default());
        let err = client
            .commit(&mut bo, vec![b"k".to_vec()], 5, 8)
            .await
            .unwrap_err();
        assert!(err.is_write_conflict());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_not_leader_rebinds_to_new_leader() {
        let client = MockKvClient::with_dispatch_hook(|req: &dyn Any| {
            let req = req.downcast_ref::<kvrpcpb::RawPutRequest>().unwrap();
            let peer = req.context.as_ref().unwrap().peer.clone().unwrap();
            if peer.store_id == 41 {
                return boxed(kvrpcpb::RawPutResponse {
                    region_error: Some(errorpb::Error {
                        not_leader: Some(errorpb::NotLeader {
                            region_id: 1,
                            leader: Some(metapb::Peer {
                                id: 142,
                                store_id: 42,
                            }),
                        }),
                        ..Default::default()
                    }),
                    ..Default::default()
                });
            }
            assert_eq!(peer.id, 142);
            boxed(kvrpcpb::RawPutResponse::default())
        });
        let manager = Arc::new(MockRegionManager::region1());
        let (builder, connect) = mock_builder(Config::default(), manager.clone(), client);
        let mut client = builder.build_for_key(b"k").await.unwrap();
        let mut bo = Backoffer::new(&Config::default());

        client
            .raw_put(&mut bo, b"k".to_vec(), b"v".to_vec())
            .await
            .unwrap();
        assert_eq!(client.store().id, 42);
        assert_eq!(client.region().get_store_id().unwrap(), 42);
        assert_eq!(
            connect.connected(),
            vec!["mock://store41".to_owned(), "mock://store42".to_owned()]
        );
        assert_eq!(manager.invalidated(), 1);
    }

    #[tokio::test]
    async fn test_store_not_match_reconnects() {
        let client = MockKvClient::with_dispatch_hook(|_: &dyn Any| {
            boxed(kvrpcpb::RawDeleteResponse::default())
        });
        let manager = Arc::new(MockRegionManager::region1());
        let (builder, connect) = mock_builder(Config::default(), manager.clone(), client);
        let mut client = builder.build_for_key(b"k").await.unwrap();

        let error = errorpb::Error {
            store_not_match: Some(errorpb::StoreNotMatch {
                request_store_id: 41,
                actual_store_id: 43,
            }),
            ..Default::default()
        };
        assert!(client.on_region_error(&error).await.unwrap());
        assert_eq!(client.store().id, 43);
        assert_eq!(connect.connected().last().unwrap(), "mock://store43");

        let mut bo = Backoffer::no_backoff();
        client.raw_delete(&mut bo, b"k".to_vec()).await.unwrap();
    }

    #[tokio::test]
    async fn test_not_leader_after_split_is_not_rebound() {
        let client = MockKvClient::with_dispatch_hook(|_: &dyn Any| {
            boxed(kvrpcpb::RawGetResponse::default())
        });
        let (mut client, manager) = client_for(client).await;
        manager.set_regions(vec![crate::mock::mock_region(1, b"", b"m", 41)]);

        let error = errorpb::Error {
            not_leader: Some(errorpb::NotLeader {
                region_id: 1,
                leader: Some(metapb::Peer {
                    id: 142,
                    store_id: 42,
                }),
            }),
            ..Default::default()
        };
        assert!(!client.on_region_error(&error).await.unwrap());
        assert_eq!(client.store().id, 41);
    }

    #[tokio::test]
    async fn test_batch_get_reports_locks_after_resolving_once() {
        let batch_gets = Arc::new(AtomicUsize::new(0));
        let resolves = Arc::new(AtomicUsize::new(0));
        let batch_captured = batch_gets.clone();
        let resolve_captured = resolves.clone();
        let client = MockKvClient::with_dispatch_hook(move |req: &dyn Any| {
            if req.downcast_ref::<kvrpcpb::BatchGetRequest>().is_some() {
                batch_captured.fetch_add(1, Ordering::SeqCst);
                boxed(kvrpcpb::BatchGetResponse {
                    region_error: None,
                    pairs: vec![
                        kvrpcpb::KvPair {
                            error: Some(lock_error(b"a")),
                            key: b"a".to_vec(),
                            value: Vec::new(),
                        },
                        kvrpcpb::KvPair {
                            error: Some(lock_error(b"b")),
                            key: b"b".to_vec(),
                            value: Vec::new(),
                        },
                    ],
                })
            } else if req.downcast_ref::<kvrpcpb::CleanupRequest>().is_some() {
                boxed(kvrpcpb::CleanupResponse {
                    commit_version: 11,
                    ..Default::default()
                })
            } else {
                resolve_captured.fetch_add(1, Ordering::SeqCst);
                boxed(kvrpcpb::ResolveLockResponse::default())
            }
        });
        let (mut client, _) = client_for(client).await;
        let mut bo = Backoffer::new(&Config::default());

        let err = client
            .batch_get(&mut bo, vec![b"a".to_vec(), b"b".to_vec()], 30)
            .await
            .unwrap_err();
        match err {
            Error::ResolveLockError(locks) => assert_eq!(locks.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(batch_gets.load(Ordering::SeqCst), 1);
        // Both locks live in the same region and transaction.
        assert_eq!(resolves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_scan_uses_configured_batch_size() {
        let client = MockKvClient::with_dispatch_hook(|req: &dyn Any| {
            let req = req.downcast_ref::<kvrpcpb::ScanRequest>().unwrap();
            assert_eq!(req.limit, 16);
            assert!(req.key_only);
            boxed(kvrpcpb::ScanResponse {
                region_error: None,
                pairs: vec![kvrpcpb::KvPair {
                    error: None,
                    key: b"a".to_vec(),
                    value: Vec::new(),
                }],
            })
        });
        let manager = Arc::new(MockRegionManager::region1());
        let config = Config::default().with_scan_batch_size(16);
        let (builder, _) = mock_builder(config, manager, client);
        let mut client = builder.build_for_key(b"a").await.unwrap();
        let mut bo = Backoffer::no_backoff();

        let pairs = client.scan(&mut bo, b"a".to_vec(), 9, true).await.unwrap();
        assert_eq!(pairs, vec![KvPair::new(b"a".to_vec(), Vec::new())]);
    }

    #[tokio::test]
    async fn test_scan_lock_returns_locks() {
        let client = MockKvClient::with_dispatch_hook(|_: &dyn Any| {
            boxed(kvrpcpb::ScanLockResponse {
                locks: vec![lock_error(b"x").locked.unwrap()],
                ..Default::default()
            })
        });
        let (mut client, _) = client_for(client).await;
        let mut bo = Backoffer::no_backoff();
        let locks = client
            .scan_lock(&mut bo, Vec::new(), 100, 10)
            .await
            .unwrap();
        assert_eq!(locks.len(), 1);
        assert_eq!(locks[0].primary, b"primary".to_vec());
        assert_eq!(locks[0].ts, 10);
    }

    #[tokio::test]
    async fn test_cleanup_and_gc_retry_routing_errors() {
        let calls = Arc::new(AtomicUsize::new(0));
        let captured = calls.clone();
        let region_error = || errorpb::Error {
            region_not_found: Some(errorpb::RegionNotFound { region_id: 1 }),
            ..Default::default()
        };
        let client = MockKvClient::with_dispatch_hook(move |req: &dyn Any| {
            let first = captured.fetch_add(1, Ordering::SeqCst) % 2 == 0;
            if req.downcast_ref::<kvrpcpb::CleanupRequest>().is_some() {
                boxed(kvrpcpb::CleanupResponse {
                    region_error: first.then(region_error),
                    commit_version: if first { 0 } else { 15 },
                    ..Default::default()
                })
            } else {
                boxed(kvrpcpb::GcResponse {
                    region_error: first.then(region_error),
                    ..Default::default()
                })
            }
        });
        let (mut client, manager) = client_for(client).await;
        let mut bo = Backoffer::new(&Config::default());

        assert_eq!(client.cleanup(&mut bo, b"k".to_vec(), 3).await.unwrap(), 15);
        client.gc(&mut bo, 100).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(manager.invalidated(), 2);
        assert_eq!(bo.attempts(&BO_REGION_MISS), 2);
    }

    #[tokio::test]
    async fn test_delete_range_retries_routing_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let captured = calls.clone();
        let client = MockKvClient::with_dispatch_hook(move |req: &dyn Any| {
            let req = req.downcast_ref::<kvrpcpb::DeleteRangeRequest>().unwrap();
            assert_eq!(req.start_key, b"a".to_vec());
            assert_eq!(req.end_key, b"b".to_vec());
            let region_error = (captured.fetch_add(1, Ordering::SeqCst) == 0).then(|| {
                errorpb::Error {
                    epoch_not_match: Some(errorpb::EpochNotMatch::default()),
                    ..Default::default()
                }
            });
            boxed(kvrpcpb::DeleteRangeResponse {
                region_error,
                ..Default::default()
            })
        });
        let (mut client, manager) = client_for(client).await;
        let mut bo = Backoffer::new(&Config::default());

        client
            .delete_range(&mut bo, b"a".to_vec(), b"b".to_vec())
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(manager.invalidated(), 1);
        assert_eq!(bo.attempts(&BO_REGION_MISS), 1);
    }

    #[tokio::test]
    async fn test_cleanup_resolves_lock_then_retries() {
        let cleanups = Arc::new(AtomicUsize::new(0));
        let resolves = Arc::new(AtomicUsize::new(0));
        let cleanups_captured = cleanups.clone();
        let resolves_captured = resolves.clone();
        let client = MockKvClient::with_dispatch_hook(move |req: &dyn Any| {
            if let Some(req) = req.downcast_ref::<kvrpcpb::CleanupRequest>() {
                if req.key == b"primary".to_vec() {
                    // Status of the lock owner.
                    assert_eq!(req.start_version, 10);
                    return boxed(kvrpcpb::CleanupResponse {
                        commit_version: 12,
                        ..Default::default()
                    });
                }
                assert_eq!(req.start_version, 3);
                if cleanups_captured.fetch_add(1, Ordering::SeqCst) == 0 {
                    return boxed(kvrpcpb::CleanupResponse {
                        error: Some(lock_error(b"k")),
                        ..Default::default()
                    });
                }
                boxed(kvrpcpb::CleanupResponse {
                    commit_version: 9,
                    ..Default::default()
                })
            } else if let Some(req) = req.downcast_ref::<kvrpcpb::ResolveLockRequest>() {
                resolves_captured.fetch_add(1, Ordering::SeqCst);
                assert_eq!(req.start_version, 10);
                assert_eq!(req.commit_version, 12);
                boxed(kvrpcpb::ResolveLockResponse::default())
            } else {
                unreachable!()
            }
        });
        let (mut client, _) = client_for(client).await;
        let mut bo = Backoffer::new(&Config::default());

        assert_eq!(client.cleanup(&mut bo, b"k".to_vec(), 3).await.unwrap(), 9);
        assert_eq!(cleanups.load(Ordering::SeqCst), 2);
        assert_eq!(resolves.load(Ordering::SeqCst), 1);
        assert_eq!(bo.attempts(&BO_TXN_LOCK_FAST), 0);
    }

    #[tokio::test]
    async fn test_transport_error_marks_store_failed() {
        let client = MockKvClient::with_dispatch_hook(|_: &dyn Any| {
            Err(Error::Transport {
                message: "connection reset".to_owned(),
            })
        });
        let (mut client, manager) = client_for(client).await;
        let mut bo = Backoffer::new(&Config::default());
        let err = client.raw_get(&mut bo, b"k".to_vec()).await.unwrap_err();
        assert!(matches!(err, Error::Transport { .. }));
        assert_eq!(manager.failed(), 1);
    }

    #[tokio::test]
    async fn test_unexpected_response_type_is_fatal() {
        let client = MockKvClient::with_dispatch_hook(|_: &dyn Any| {
            boxed(kvrpcpb::GetResponse::default())
        });
        let (mut client, manager) = client_for(client).await;
        let mut bo = Backoffer::new(&Config::default());
        let err = client
            .delete_range(&mut bo, b"a".to_vec(), b"b".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport { .. }));
        assert_eq!(manager.failed(), 1);
    }

    struct StalledClient;

    #[async_trait]
    impl KvClient for StalledClient {
        async fn dispatch(&self, _req: &dyn Request) -> Result<Box<dyn Any + Send>> {
            futures::future::pending().await
        }
    }

    struct StalledConnect;

    #[async_trait]
    impl KvConnect for StalledConnect {
        async fn connect(&self, _address: &str) -> Result<Arc<dyn KvClient + Send + Sync>> {
            Ok(Arc::new(StalledClient))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_marks_store_failed() {
        let manager = Arc::new(MockRegionManager::region1());
        let builder = RegionStoreClientBuilder::new(
            Config::default().with_timeout(Duration::from_millis(500)),
            manager.clone(),
            manager.clone(),
            Arc::new(StalledConnect),
        );
        let mut client = builder.build_for_key(b"k").await.unwrap();
        let mut bo = Backoffer::new(&Config::default());

        let err = client.raw_get(&mut bo, b"k".to_vec()).await.unwrap_err();
        assert!(matches!(err, Error::Timeout { address } if address == "mock://store41"));
        assert_eq!(manager.failed(), 1);
    }

    #[tokio::test]
    async fn test_build_without_leader_fails() {
        let client = MockKvClient::with_dispatch_hook(|_: &dyn Any| unreachable!());
        let manager = Arc::new(MockRegionManager::region1());
        let (builder, connect) = mock_builder(Config::default(), manager, client);
        let mut region = crate::mock::mock_region(9, b"", b"", 1);
        region.leader = None;

        assert!(matches!(
            builder.build(region).await,
            Err(Error::LeaderNotFound { .. })
        ));
        assert!(connect.connected().is_empty());
    }
}
