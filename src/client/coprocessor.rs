// Copyright 2019 TiKV Project Authors. Licensed under Apache-2.0.

//! Pushdown computation against the bound region.

use std::collections::VecDeque;

use futures::stream::BoxStream;
use futures::StreamExt;
use log::debug;
use log::warn;
use prost::Message;

use super::RegionStoreClient;
use crate::backoffer::Backoffer;
use crate::backoffer::BO_REGION_MISS;
use crate::backoffer::BO_TXN_LOCK_FAST;
use crate::proto::coprocessor;
use crate::proto::coprocessor::KeyRange;
use crate::proto::tipb;
use crate::request::classify;
use crate::request::Classified;
use crate::topology::RegionTask;
use crate::Error;
use crate::Result;

pub const REQ_TYPE_SELECT: i64 = 101;
pub const REQ_TYPE_INDEX: i64 = 102;
pub const REQ_TYPE_DAG: i64 = 103;
pub const REQ_TYPE_ANALYZE: i64 = 104;
pub const REQ_TYPE_BATCH_ROW_COUNT: i64 = 64;

impl RegionStoreClient {
    /// Runs `dag` over `ranges` in the bound region.
    ///
    /// On success the partial result is pushed to `sink` and no tasks are returned. When the
    /// region moved or a lock was in the way, nothing is pushed and `ranges` come back split
    /// against the current topology, to be dispatched by the caller.
    pub async fn coprocess(
        &mut self,
        bo: &mut Backoffer,
        dag: &tipb::DagRequest,
        ranges: &[KeyRange],
        sink: &mut VecDeque<tipb::SelectResponse>,
    ) -> Result<Vec<RegionTask>> {
        let request = self.coprocessor_request(dag, ranges)?;
        let resp = self.dispatch(&request).await?;

        match classify(resp) {
            Classified::Success(resp) => {
                sink.push_back(decode_select_response(&resp.data)?);
                Ok(Vec::new())
            }
            Classified::RegionError(e) => {
                self.on_region_error(&e).await?;
                bo.backoff(&BO_REGION_MISS, format!("{e:?}")).await?;
                self.split(ranges).await
            }
            Classified::Locked(locks) => {
                let count = locks.len();
                if !self.lock_resolver.resolve_locks(bo, locks).await? {
                    bo.backoff(
                        &BO_TXN_LOCK_FAST,
                        format!("{count} lock(s) not resolvable yet"),
                    )
                    .await?;
                }
                self.split(ranges).await
            }
            Classified::KeyError(e) => Err(e),
        }
    }

    /// Streams partial results of `dag` over `ranges` as the store produces them.
    ///
    /// The stream is not repaired when the region moves: the first frame carrying a routing
    /// error, a lock or a plan error ends it with that error. Opening the stream and waiting
    /// for each frame are both bounded by the configured timeout.
    pub async fn coprocess_streaming(
        &self,
        dag: &tipb::DagRequest,
        ranges: &[KeyRange],
    ) -> Result<BoxStream<'static, Result<tipb::SelectResponse>>> {
        let request = self.coprocessor_request(dag, ranges)?;
        let timeout = self.config.timeout;
        let address = self.region_store.store.address.clone();
        let opened = match tokio::time::timeout(
            timeout,
            self.region_store.client.coprocessor_stream(request),
        )
        .await
        {
            Ok(opened) => opened,
            Err(_) => Err(Error::Timeout {
                address: address.clone(),
            }),
        };
        let frames = match opened {
            Ok(frames) => frames,
            Err(e) => {
                warn!("coprocessor stream to store {} failed: {}", address, e);
                self.region_manager.on_request_fail(self.region()).await;
                return Err(e);
            }
        };

        Ok(futures::stream::unfold(Some(frames), move |frames| {
            let address = address.clone();
            async move {
                let mut frames = frames?;
                let frame = match tokio::time::timeout(timeout, frames.next()).await {
                    Ok(frame) => frame?,
                    Err(_) => {
                        warn!("coprocessor stream from store {} stalled", address);
                        Err(Error::Timeout { address })
                    }
                };
                match frame.and_then(stream_frame) {
                    Ok(select) => Some((Ok(select), Some(frames))),
                    Err(e) => Some((Err(e), None)),
                }
            }
        })
        .boxed())
    }

    fn coprocessor_request(
        &self,
        dag: &tipb::DagRequest,
        ranges: &[KeyRange],
    ) -> Result<coprocessor::Request> {
        if dag.executors.is_empty() {
            return Err(Error::InvalidArgument {
                message: "coprocessor plan has no executors".to_owned(),
            });
        }
        let mut request = coprocessor::Request {
            context: None,
            tp: REQ_TYPE_DAG,
            data: dag.encode_to_vec(),
            ranges: ranges.to_vec(),
        };
        self.region_store.apply_to_request(&mut request)?;
        Ok(request)
    }

    async fn split(&self, ranges: &[KeyRange]) -> Result<Vec<RegionTask>> {
        let tasks = self.range_splitter.split_ranges(ranges.to_vec()).await?;
        debug!(
            "coprocessor ranges of region {} re-split into {} task(s)",
            self.region().id(),
            tasks.len()
        );
        Ok(tasks)
    }
}

fn stream_frame(resp: coprocessor::Response) -> Result<tipb::SelectResponse> {
    match classify(resp) {
        Classified::Success(resp) => decode_select_response(&resp.data),
        Classified::RegionError(e) => Err(Error::RegionError(Box::new(e))),
        Classified::Locked(locks) => Err(Error::ResolveLockError(locks)),
        Classified::KeyError(e) => Err(e),
    }
}

fn decode_select_response(data: &[u8]) -> Result<tipb::SelectResponse> {
    let mut select = tipb::SelectResponse::decode(data)?;
    match select.error.take() {
        Some(e) => Err(Error::SelectError {
            code: e.code,
            message: e.msg,
        }),
        None => Ok(select),
    }
}
