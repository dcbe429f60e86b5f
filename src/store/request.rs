// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

use std::any::Any;

use crate::proto::coprocessor;
use crate::proto::kvrpcpb;
use crate::store::HasKeyErrors;
use crate::store::HasLocks;
use crate::store::HasRegionError;
use crate::store::RegionWithLeader;
use crate::Error;
use crate::Result;

/// A request that can be sent to the leader of a region.
pub trait Request: Any + Sync + Send + 'static {
    fn label(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
    fn context_mut(&mut self) -> &mut kvrpcpb::Context;
    /// Stamps the routing context (region id, epoch and leader peer) into the request.
    fn set_leader(&mut self, leader: &RegionWithLeader) -> Result<()>;
}

/// A request with a statically known response type.
pub trait KvRequest: Request + Clone {
    type Response: HasRegionError + HasLocks + HasKeyErrors + Send + 'static;
}

macro_rules! impl_request {
    ($name: ty, $response: ty, $label: literal) => {
        impl Request for $name {
            fn label(&self) -> &'static str {
                $label
            }

            fn as_any(&self) -> &dyn Any {
                self
            }

            fn context_mut(&mut self) -> &mut kvrpcpb::Context {
                self.context.get_or_insert(kvrpcpb::Context::default())
            }

            fn set_leader(&mut self, leader: &RegionWithLeader) -> Result<()> {
                let ctx = self.context_mut();
                let leader_peer = leader.leader.as_ref().ok_or(Error::LeaderNotFound {
                    region: leader.ver_id(),
                })?;
                ctx.region_id = leader.region.id;
                ctx.region_epoch = leader.region.region_epoch.clone();
                ctx.peer = Some(leader_peer.clone());
                Ok(())
            }
        }

        impl KvRequest for $name {
            type Response = $response;
        }
    };
}

impl_request!(kvrpcpb::GetRequest, kvrpcpb::GetResponse, "kv_get");
impl_request!(kvrpcpb::ScanRequest, kvrpcpb::ScanResponse, "kv_scan");
impl_request!(
    kvrpcpb::BatchGetRequest,
    kvrpcpb::BatchGetResponse,
    "kv_batch_get"
);
impl_request!(
    kvrpcpb::PrewriteRequest,
    kvrpcpb::PrewriteResponse,
    "kv_prewrite"
);
impl_request!(kvrpcpb::CommitRequest, kvrpcpb::CommitResponse, "kv_commit");
impl_request!(
    kvrpcpb::CleanupRequest,
    kvrpcpb::CleanupResponse,
    "kv_cleanup"
);
impl_request!(
    kvrpcpb::BatchRollbackRequest,
    kvrpcpb::BatchRollbackResponse,
    "kv_batch_rollback"
);
impl_request!(
    kvrpcpb::ScanLockRequest,
    kvrpcpb::ScanLockResponse,
    "kv_scan_lock"
);
impl_request!(
    kvrpcpb::ResolveLockRequest,
    kvrpcpb::ResolveLockResponse,
    "kv_resolve_lock"
);
impl_request!(kvrpcpb::GcRequest, kvrpcpb::GcResponse, "kv_gc");
impl_request!(
    kvrpcpb::DeleteRangeRequest,
    kvrpcpb::DeleteRangeResponse,
    "kv_delete_range"
);
impl_request!(kvrpcpb::RawGetRequest, kvrpcpb::RawGetResponse, "raw_get");
impl_request!(kvrpcpb::RawPutRequest, kvrpcpb::RawPutResponse, "raw_put");
impl_request!(
    kvrpcpb::RawDeleteRequest,
    kvrpcpb::RawDeleteResponse,
    "raw_delete"
);
impl_request!(
    kvrpcpb::RawBatchPutRequest,
    kvrpcpb::RawBatchPutResponse,
    "raw_batch_put"
);
impl_request!(kvrpcpb::RawScanRequest, kvrpcpb::RawScanResponse, "raw_scan");
impl_request!(
    coprocessor::Request,
    coprocessor::Response,
    "coprocessor"
);
