// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;

use super::KvRequest;
use super::Request;
use crate::proto::coprocessor;
use crate::stats::tikv_stats;
use crate::Error;
use crate::Result;

/// A trait for connecting to TiKV stores.
#[async_trait]
pub trait KvConnect: Send + Sync + 'static {
    async fn connect(&self, address: &str) -> Result<Arc<dyn KvClient + Send + Sync>>;
}

/// The transport to a single store.
///
/// Deadlines are enforced by the caller; an implementation only has to deliver the request and
/// hand back the decoded response (boxed as the request's response type).
#[async_trait]
pub trait KvClient: Send + Sync {
    async fn dispatch(&self, req: &dyn Request) -> Result<Box<dyn Any + Send>>;

    /// Opens a server-streaming coprocessor call.
    async fn coprocessor_stream(
        &self,
        _req: coprocessor::Request,
    ) -> Result<BoxStream<'static, Result<coprocessor::Response>>> {
        Err(Error::Unimplemented)
    }
}

/// Sends `request` through `client`, bounded by `timeout`, and downcasts the response.
///
/// An elapsed deadline and a response of the wrong type are both reported as transport
/// failures.
pub(crate) async fn dispatch_with_timeout<R: KvRequest>(
    client: &(dyn KvClient + Send + Sync),
    request: &R,
    timeout: Duration,
    address: &str,
) -> Result<R::Response> {
    let stats = tikv_stats(request.label());
    let result = match tokio::time::timeout(timeout, client.dispatch(request)).await {
        Err(_) => Err(Error::Timeout {
            address: address.to_owned(),
        }),
        Ok(Err(e)) => Err(e),
        Ok(Ok(resp)) => resp
            .downcast::<R::Response>()
            .map(|resp| *resp)
            .map_err(|_| Error::Transport {
                message: format!("unexpected response type for {}", request.label()),
            }),
    };
    stats.done(result)
}
