// Copyright 2026 TiKV Project Authors. Licensed under Apache-2.0.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;
use std::time::Duration;

use tokio::time::Instant;

use crate::region::StoreId;

/// Stores that recently gave no usable answer, shared by every client of one topology cache.
///
/// Entries expire on their own; the map only answers whether a store is still suspect.
#[derive(Clone, Default, Debug)]
pub struct StoreHealthMap {
    failed_until: Arc<RwLock<HashMap<StoreId, Instant>>>,
}

impl StoreHealthMap {
    /// Marks `store_id` as failed for `duration`. A shorter mark never shortens an existing one.
    pub fn mark_failed_for(&self, store_id: StoreId, duration: Duration) {
        let until = Instant::now() + duration;
        let mut failed = self
            .failed_until
            .write()
            .unwrap_or_else(|poison| poison.into_inner());
        failed
            .entry(store_id)
            .and_modify(|current| *current = (*current).max(until))
            .or_insert(until);
    }

    pub fn is_failed(&self, store_id: StoreId) -> bool {
        let failed = self
            .failed_until
            .read()
            .unwrap_or_else(|poison| poison.into_inner());
        failed
            .get(&store_id)
            .is_some_and(|until| *until > Instant::now())
    }
}
