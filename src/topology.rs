// Copyright 2019 TiKV Project Authors. Licensed under Apache-2.0.

//! The seams between the dispatch layer and the cluster topology.

use async_trait::async_trait;
use derive_new::new;

use crate::internal_err;
use crate::proto::coprocessor::KeyRange;
use crate::proto::metapb;
use crate::region::RegionId;
use crate::region::RegionVerId;
use crate::region::RegionWithLeader;
use crate::region::StoreId;
use crate::Result;

/// Maps keys and region ids to the current region layout.
///
/// Implementations are shared by many clients at once and must tolerate concurrent reads and
/// invalidations.
#[async_trait]
pub trait RegionManager: Send + Sync + 'static {
    async fn region_for_key(&self, key: &[u8]) -> Result<RegionWithLeader>;

    async fn region_for_id(&self, id: RegionId) -> Result<RegionWithLeader>;

    async fn store_for_id(&self, id: StoreId) -> Result<metapb::Store>;

    /// Drops the cached entry of a region that a store reported as stale.
    async fn invalidate_region(&self, ver_id: RegionVerId);

    async fn invalidate_store(&self, id: StoreId);

    /// Called when the leader store of `region` gave no usable answer.
    async fn on_request_fail(&self, region: &RegionWithLeader);
}

/// A list of key ranges owned by one region.
#[derive(new, Clone, Debug, PartialEq)]
pub struct RegionTask {
    pub region: RegionWithLeader,
    pub ranges: Vec<KeyRange>,
}

/// Partitions key ranges into per-region tasks against the current topology.
#[async_trait]
pub trait RangeSplitter: Send + Sync + 'static {
    async fn split_ranges(&self, ranges: Vec<KeyRange>) -> Result<Vec<RegionTask>>;
}

/// Cuts every range at region boundaries and groups the pieces by owning region.
///
/// Tasks are returned in the order their regions are first met. An empty `end` is unbounded.
pub async fn group_ranges_by_region<M: RegionManager + ?Sized>(
    manager: &M,
    ranges: Vec<KeyRange>,
) -> Result<Vec<RegionTask>> {
    let mut tasks: Vec<RegionTask> = Vec::new();
    for range in ranges {
        if !range.end.is_empty() && range.start >= range.end {
            continue;
        }
        let mut start = range.start;
        loop {
            let region = manager.region_for_key(&start).await?;
            let region_end = region.end_key();
            if !region_end.is_empty() && region_end <= start {
                return Err(internal_err!(
                    "region {} ends before key {:?}",
                    region.id(),
                    start
                ));
            }
            let finished =
                region_end.is_empty() || (!range.end.is_empty() && range.end <= region_end);
            let end = if finished {
                range.end.clone()
            } else {
                region_end.clone()
            };

            let piece = KeyRange { start, end };
            match tasks
                .iter_mut()
                .find(|task| task.region.ver_id() == region.ver_id())
            {
                Some(task) => task.ranges.push(piece),
                None => tasks.push(RegionTask::new(region, vec![piece])),
            }

            if finished {
                break;
            }
            start = region_end;
        }
    }
    Ok(tasks)
}
