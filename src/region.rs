// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

use derive_new::new;

use crate::proto::metapb;
use crate::Error;
use crate::Key;
use crate::Result;

/// The ID of a region
pub type RegionId = u64;
/// The ID of a store
pub type StoreId = u64;

/// The ID and version information of a region.
///
/// Two regions with the same id but different `conf_ver`/`ver` are different regions across
/// time: the older one has been split, merged or had its membership changed.
#[derive(new, Clone, Default, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionVerId {
    /// The ID of the region
    pub id: RegionId,
    /// Conf change version, auto increment when add or remove peer
    pub conf_ver: u64,
    /// Region version, auto increment when split or merge
    pub ver: u64,
}

/// Information about a TiKV region and its leader.
///
/// In TiKV all data is partitioned by range. Each partition is called a region.
#[derive(new, Clone, Default, Debug, PartialEq)]
pub struct RegionWithLeader {
    pub region: metapb::Region,
    pub leader: Option<metapb::Peer>,
}

impl RegionWithLeader {
    pub fn contains(&self, key: &[u8]) -> bool {
        let start_key = self.region.start_key.as_slice();
        let end_key = self.region.end_key.as_slice();
        key >= start_key && (key < end_key || end_key.is_empty())
    }

    pub fn start_key(&self) -> Key {
        self.region.start_key.clone()
    }

    pub fn end_key(&self) -> Key {
        self.region.end_key.clone()
    }

    /// Whether `other` covers exactly the same key range.
    pub fn same_range(&self, other: &RegionWithLeader) -> bool {
        self.region.start_key == other.region.start_key
            && self.region.end_key == other.region.end_key
    }

    pub fn ver_id(&self) -> RegionVerId {
        let region = &self.region;
        let epoch = region.region_epoch.as_ref();
        RegionVerId {
            id: region.id,
            conf_ver: epoch.map_or(0, |e| e.conf_ver),
            ver: epoch.map_or(0, |e| e.version),
        }
    }

    pub fn id(&self) -> RegionId {
        self.region.id
    }

    pub fn get_store_id(&self) -> Result<StoreId> {
        self.leader
            .as_ref()
            .cloned()
            .ok_or_else(|| Error::LeaderNotFound {
                region: self.ver_id(),
            })
            .map(|s| s.store_id)
    }

    /// Replaces the leader, keeping the region metadata.
    pub fn with_leader(mut self, leader: metapb::Peer) -> RegionWithLeader {
        self.leader = Some(leader);
        self
    }
}
