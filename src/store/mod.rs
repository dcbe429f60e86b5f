// Copyright 2019 TiKV Project Authors. Licensed under Apache-2.0.

mod client;
mod errors;
mod health;
mod request;

use std::sync::Arc;

use derive_new::new;

pub use self::client::KvClient;
pub use self::client::KvConnect;
pub(crate) use self::client::dispatch_with_timeout;
pub use self::errors::HasKeyErrors;
pub use self::errors::HasLocks;
pub use self::errors::HasRegionError;
pub use self::health::StoreHealthMap;
pub use self::request::KvRequest;
pub use self::request::Request;
use crate::proto::metapb;
pub use crate::region::RegionWithLeader;
use crate::Result;

/// A region bound to the store hosting its leader, plus an open connection to that store.
#[derive(new, Clone)]
pub struct RegionStore {
    pub region_with_leader: RegionWithLeader,
    pub store: metapb::Store,
    pub client: Arc<dyn KvClient + Send + Sync>,
}

impl RegionStore {
    pub(crate) fn apply_to_request<R: Request>(&self, request: &mut R) -> Result<()> {
        request.set_leader(&self.region_with_leader)
    }
}
