// Copyright 2021 TiKV Project Authors. Licensed under Apache-2.0.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::HashSet;
use std::ops::Bound;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use log::info;
use tokio::sync::RwLock;

use crate::proto::coprocessor::KeyRange;
use crate::proto::metapb;
use crate::region::RegionId;
use crate::region::RegionVerId;
use crate::region::RegionWithLeader;
use crate::region::StoreId;
use crate::store::StoreHealthMap;
use crate::topology::group_ranges_by_region;
use crate::topology::RangeSplitter;
use crate::topology::RegionManager;
use crate::topology::RegionTask;
use crate::Key;
use crate::Result;

/// The authoritative source of region and store metadata (the placement driver).
#[async_trait]
pub trait RegionProvider: Send + Sync + 'static {
    async fn get_region(&self, key: Key) -> Result<RegionWithLeader>;

    async fn get_region_by_id(&self, id: RegionId) -> Result<RegionWithLeader>;

    async fn get_store(&self, id: StoreId) -> Result<metapb::Store>;
}

struct RegionCacheMap {
    /// RegionVerID -> Region. It stores the concrete region caches.
    /// RegionVerID is the unique identifer of a region *across time*.
    ver_id_to_region: HashMap<RegionVerId, RegionWithLeader>,
    /// Start_key -> RegionVerID
    ///
    /// Invariant: there are no intersecting regions in the map at any time.
    key_to_ver_id: BTreeMap<Key, RegionVerId>,
    /// RegionID -> RegionVerID. Note: regions with identical ID doesn't necessarily
    /// mean they are the same, they can be different regions across time.
    id_to_ver_id: HashMap<RegionId, RegionVerId>,
}

impl RegionCacheMap {
    fn new() -> RegionCacheMap {
        RegionCacheMap {
            ver_id_to_region: HashMap::new(),
            key_to_ver_id: BTreeMap::new(),
            id_to_ver_id: HashMap::new(),
        }
    }
}

/// A read-through region and store cache shared by every client of a cluster.
pub struct RegionCache<P> {
    region_cache: RwLock<RegionCacheMap>,
    store_cache: RwLock<HashMap<StoreId, metapb::Store>>,
    inner_client: Arc<P>,
    store_health: StoreHealthMap,
    store_fail_backoff: Duration,
}

impl<P> RegionCache<P> {
    pub fn new(inner_client: Arc<P>, store_fail_backoff: Duration) -> RegionCache<P> {
        RegionCache {
            region_cache: RwLock::new(RegionCacheMap::new()),
            store_cache: RwLock::new(HashMap::new()),
            inner_client,
            store_health: StoreHealthMap::default(),
            store_fail_backoff,
        }
    }

    #[cfg(test)]
    pub(crate) fn store_health(&self) -> &StoreHealthMap {
        &self.store_health
    }
}

impl<P: RegionProvider> RegionCache<P> {
    // Retrieve cache entry by key. If there's no entry, query PD and update cache.
    pub async fn get_region_by_key(&self, key: &[u8]) -> Result<RegionWithLeader> {
        {
            let region_cache_guard = self.region_cache.read().await;
            if let Some((_, candidate_ver_id)) = region_cache_guard
                .key_to_ver_id
                .range::<[u8], _>((Bound::Unbounded, Bound::Included(key)))
                .next_back()
            {
                if let Some(region) = region_cache_guard.ver_id_to_region.get(candidate_ver_id) {
                    if region.contains(key) {
                        return Ok(region.clone());
                    }
                }
            }
        }
        self.read_through_region_by_key(key.to_vec()).await
    }

    // Retrieve cache entry by RegionId. If there's no entry, query PD and update cache.
    pub async fn get_region_by_id(&self, id: RegionId) -> Result<RegionWithLeader> {
        {
            let region_cache_guard = self.region_cache.read().await;
            if let Some(ver_id) = region_cache_guard.id_to_ver_id.get(&id) {
                if let Some(region) = region_cache_guard.ver_id_to_region.get(ver_id) {
                    return Ok(region.clone());
                }
            }
        }
        let region = self.inner_client.get_region_by_id(id).await?;
        self.add_region(region.clone()).await;
        Ok(region)
    }

    // A store marked as failed is always read through: it may come back at another address.
    pub async fn get_store_by_id(&self, id: StoreId) -> Result<metapb::Store> {
        if !self.store_health.is_failed(id) {
            if let Some(store) = self.store_cache.read().await.get(&id).cloned() {
                return Ok(store);
            }
        }
        self.read_through_store_by_id(id).await
    }

    /// Force read through (query from PD) and update cache
    pub async fn read_through_region_by_key(&self, key: Key) -> Result<RegionWithLeader> {
        let region = self.inner_client.get_region(key).await?;
        self.add_region(region.clone()).await;
        Ok(region)
    }

    async fn read_through_store_by_id(&self, id: StoreId) -> Result<metapb::Store> {
        let store = self.inner_client.get_store(id).await?;
        self.store_cache.write().await.insert(id, store.clone());
        Ok(store)
    }

    pub async fn add_region(&self, region: RegionWithLeader) {
        let mut cache = self.region_cache.write().await;

        let end_key = region.end_key();
        let mut to_be_removed: HashSet<RegionVerId> = HashSet::new();

        if let Some(ver_id) = cache.id_to_ver_id.get(&region.id()) {
            if ver_id != &region.ver_id() {
                to_be_removed.insert(ver_id.clone());
            }
        }

        // Scan backwards from `end_key`; cached regions are non-overlapping and ordered by
        // start key, so the first non-overlapping entry ends the search.
        let region_start_key = region.region.start_key.as_slice();
        let mut search_range = if end_key.is_empty() {
            cache.key_to_ver_id.range::<Key, _>(..)
        } else {
            cache.key_to_ver_id.range::<Key, _>(..end_key)
        };
        while let Some((_, ver_id_in_cache)) = search_range.next_back() {
            let Some(cached) = cache.ver_id_to_region.get(ver_id_in_cache) else {
                continue;
            };
            let end_key_in_cache = cached.region.end_key.as_slice();
            if end_key_in_cache.is_empty() || end_key_in_cache > region_start_key {
                to_be_removed.insert(ver_id_in_cache.clone());
            } else {
                break;
            }
        }

        for ver_id in to_be_removed {
            let Some(region_to_remove) = cache.ver_id_to_region.remove(&ver_id) else {
                continue;
            };
            cache.key_to_ver_id.remove(&region_to_remove.start_key());
            cache.id_to_ver_id.remove(&region_to_remove.id());
        }
        let ver_id = region.ver_id();
        cache
            .key_to_ver_id
            .insert(region.start_key(), ver_id.clone());
        cache.id_to_ver_id.insert(region.id(), ver_id.clone());
        cache.ver_id_to_region.insert(ver_id, region);
    }

    pub async fn invalidate_region_cache(&self, ver_id: RegionVerId) {
        let mut cache = self.region_cache.write().await;
        if let Some(region) = cache.ver_id_to_region.remove(&ver_id) {
            cache.id_to_ver_id.remove(&region.id());
            cache.key_to_ver_id.remove(&region.start_key());
        }
    }

    pub async fn invalidate_store_cache(&self, store_id: StoreId) {
        let mut cache = self.store_cache.write().await;
        cache.remove(&store_id);
    }
}

#[async_trait]
impl<P: RegionProvider> RegionManager for RegionCache<P> {
    async fn region_for_key(&self, key: &[u8]) -> Result<RegionWithLeader> {
        self.get_region_by_key(key).await
    }

    async fn region_for_id(&self, id: RegionId) -> Result<RegionWithLeader> {
        self.get_region_by_id(id).await
    }

    async fn store_for_id(&self, id: StoreId) -> Result<metapb::Store> {
        self.get_store_by_id(id).await
    }

    async fn invalidate_region(&self, ver_id: RegionVerId) {
        debug!("invalidate region cache of {ver_id:?}");
        self.invalidate_region_cache(ver_id).await;
    }

    async fn invalidate_store(&self, id: StoreId) {
        self.invalidate_store_cache(id).await;
    }

    async fn on_request_fail(&self, region: &RegionWithLeader) {
        self.invalidate_region_cache(region.ver_id()).await;
        if let Ok(store_id) = region.get_store_id() {
            info!(
                "mark store {store_id} as failed for {:?} after request to region {} failed",
                self.store_fail_backoff,
                region.id()
            );
            self.store_health.mark_failed_for(store_id, self.store_fail_backoff);
            self.invalidate_store_cache(store_id).await;
        }
    }
}

#[async_trait]
impl<P: RegionProvider> RangeSplitter for RegionCache<P> {
    async fn split_ranges(&self, ranges: Vec<KeyRange>) -> Result<Vec<RegionTask>> {
        group_ranges_by_region(self, ranges).await
    }
}
