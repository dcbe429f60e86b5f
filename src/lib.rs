// Copyright 2018 TiKV Project Authors. Licensed under Apache-2.0.

//! The per-region request layer of a [TiKV](https://github.com/tikv/tikv) client.
//!
//! A [`RegionStoreClient`] is bound to one region and the store hosting its leader. It sends
//! transactional, raw and coprocessor requests there and keeps retrying until it gets an
//! answer: stale routing is repaired through the [`RegionManager`], locks left by other
//! transactions are cleaned up by the [`LockResolver`], and every wait is charged to a
//! [`Backoffer`] so a call never retries forever.
//!
//! The cluster itself stays behind traits. [`RegionManager`] and [`RangeSplitter`] describe the
//! topology ([`RegionCache`] is a ready-made one on top of a [`RegionProvider`]), and
//! [`KvConnect`]/[`KvClient`] are the transport.
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use tikv_region_client::*;
//! # async fn example(
//! #     topology: Arc<dyn RegionManager>,
//! #     splitter: Arc<dyn RangeSplitter>,
//! #     connector: Arc<dyn KvConnect>,
//! # ) -> Result<()> {
//! let config = Config::default();
//! let builder = RegionStoreClientBuilder::new(config.clone(), topology, splitter, connector);
//! let mut client = builder.build_for_key(b"key").await?;
//! let mut bo = Backoffer::new(&config);
//! let _value = client.get(&mut bo, b"key".to_vec(), 42).await?;
//! # Ok(())
//! # }
//! ```
//!
//! The crate is async and runs on Tokio.

mod backoffer;
mod client;
mod common;
mod config;
mod kv;
pub mod proto;
mod region;
mod region_cache;
mod request;
mod stats;
mod store;
mod topology;
mod transaction;

#[cfg(test)]
mod mock;

#[doc(inline)]
pub use common::Error;
#[doc(inline)]
pub use common::Result;
#[doc(inline)]
pub use common::WriteConflictError;
#[doc(inline)]
pub use config::Config;

#[doc(inline)]
pub use crate::backoffer::BackoffErrorKind;
#[doc(inline)]
pub use crate::backoffer::Backoffer;
#[doc(inline)]
pub use crate::backoffer::BackofferError;
#[doc(inline)]
pub use crate::client::RegionStoreClient;
#[doc(inline)]
pub use crate::client::RegionStoreClientBuilder;
#[doc(inline)]
pub use crate::client::REQ_TYPE_ANALYZE;
#[doc(inline)]
pub use crate::client::REQ_TYPE_BATCH_ROW_COUNT;
#[doc(inline)]
pub use crate::client::REQ_TYPE_DAG;
#[doc(inline)]
pub use crate::client::REQ_TYPE_INDEX;
#[doc(inline)]
pub use crate::client::REQ_TYPE_SELECT;
#[doc(inline)]
pub use crate::kv::Key;
#[doc(inline)]
pub use crate::kv::KvPair;
#[doc(inline)]
pub use crate::kv::Value;
#[doc(inline)]
pub use crate::region::RegionId;
#[doc(inline)]
pub use crate::region::RegionVerId;
#[doc(inline)]
pub use crate::region::RegionWithLeader;
#[doc(inline)]
pub use crate::region::StoreId;
#[doc(inline)]
pub use crate::region_cache::RegionCache;
#[doc(inline)]
pub use crate::region_cache::RegionProvider;
#[doc(inline)]
pub use crate::store::HasKeyErrors;
#[doc(inline)]
pub use crate::store::HasLocks;
#[doc(inline)]
pub use crate::store::HasRegionError;
#[doc(inline)]
pub use crate::store::KvClient;
#[doc(inline)]
pub use crate::store::KvConnect;
#[doc(inline)]
pub use crate::store::KvRequest;
#[doc(inline)]
pub use crate::store::Request;
#[doc(inline)]
pub use crate::topology::group_ranges_by_region;
#[doc(inline)]
pub use crate::topology::RangeSplitter;
#[doc(inline)]
pub use crate::topology::RegionManager;
#[doc(inline)]
pub use crate::topology::RegionTask;
#[doc(inline)]
pub use crate::transaction::Lock;
#[doc(inline)]
pub use crate::transaction::LockResolver;
#[doc(inline)]
pub use crate::transaction::TxnStatus;
