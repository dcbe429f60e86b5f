// Copyright 2019 TiKV Project Authors. Licensed under Apache-2.0.

//! Various mock versions of the various clients and other objects.
//!
//! The goal is to be able to test functionality independently of the rest of
//! the system, in particular without requiring a TiKV or PD server.

use std::any::Any;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;

use crate::proto::coprocessor;
use crate::proto::coprocessor::KeyRange;
use crate::proto::metapb;
use crate::region::RegionId;
use crate::region::RegionVerId;
use crate::region::RegionWithLeader;
use crate::region::StoreId;
use crate::store::KvClient;
use crate::store::KvConnect;
use crate::store::Request;
use crate::topology::group_ranges_by_region;
use crate::topology::RangeSplitter;
use crate::topology::RegionManager;
use crate::topology::RegionTask;
use crate::Config;
use crate::Error;
use crate::RegionStoreClientBuilder;
use crate::Result;

type DispatchHook = dyn Fn(&dyn Any) -> Result<Box<dyn Any + Send>> + Send + Sync;
type StreamHook = dyn Fn(&coprocessor::Request) -> Vec<Result<coprocessor::Response>> + Send + Sync;

/// A region `[start, end)` whose leader peer lives on `store_id`.
pub fn mock_region(id: RegionId, start: &[u8], end: &[u8], store_id: StoreId) -> RegionWithLeader {
    let leader = metapb::Peer {
        id: id * 100 + store_id,
        store_id,
    };
    RegionWithLeader::new(
        metapb::Region {
            id,
            start_key: start.to_vec(),
            end_key: end.to_vec(),
            region_epoch: Some(metapb::RegionEpoch {
                conf_ver: 1,
                version: 1,
            }),
            peers: vec![leader.clone()],
        },
        Some(leader),
    )
}

pub fn mock_store(id: StoreId) -> metapb::Store {
    metapb::Store {
        id,
        address: format!("mock://store{id}"),
        state: metapb::StoreState::Up.into(),
    }
}

#[derive(Clone)]
pub struct MockKvClient {
    pub addr: String,
    dispatch: Option<Arc<DispatchHook>>,
    stream: Option<Arc<StreamHook>>,
}

impl MockKvClient {
    pub fn with_dispatch_hook<F>(dispatch: F) -> MockKvClient
    where
        F: Fn(&dyn Any) -> Result<Box<dyn Any + Send>> + Send + Sync + 'static,
    {
        MockKvClient {
            addr: String::new(),
            dispatch: Some(Arc::new(dispatch)),
            stream: None,
        }
    }

    pub fn with_stream_hook<F>(stream: F) -> MockKvClient
    where
        F: Fn(&coprocessor::Request) -> Vec<Result<coprocessor::Response>> + Send + Sync + 'static,
    {
        MockKvClient {
            addr: String::new(),
            dispatch: None,
            stream: Some(Arc::new(stream)),
        }
    }
}

#[async_trait]
impl KvClient for MockKvClient {
    async fn dispatch(&self, req: &dyn Request) -> Result<Box<dyn Any + Send>> {
        match &self.dispatch {
            Some(f) => f(req.as_any()),
            None => panic!("no dispatch hook set"),
        }
    }

    async fn coprocessor_stream(
        &self,
        req: coprocessor::Request,
    ) -> Result<BoxStream<'static, Result<coprocessor::Response>>> {
        match &self.stream {
            Some(f) => Ok(futures::stream::iter(f(&req)).boxed()),
            None => Err(Error::Unimplemented),
        }
    }
}

/// Hands out clones of one [`MockKvClient`] and records every address connected to.
pub struct MockKvConnect {
    client: MockKvClient,
    pub connected: Mutex<Vec<String>>,
}

impl MockKvConnect {
    pub fn new(client: MockKvClient) -> MockKvConnect {
        MockKvConnect {
            client,
            connected: Mutex::new(Vec::new()),
        }
    }

    pub fn connected(&self) -> Vec<String> {
        self.connected.lock().unwrap().clone()
    }
}

#[async_trait]
impl KvConnect for MockKvConnect {
    async fn connect(&self, address: &str) -> Result<Arc<dyn KvClient + Send + Sync>> {
        self.connected.lock().unwrap().push(address.to_owned());
        let mut client = self.client.clone();
        client.addr = address.to_owned();
        Ok(Arc::new(client))
    }
}

/// An in-memory topology. Every store id resolves to [`mock_store`].
#[derive(Default)]
pub struct MockRegionManager {
    regions: Mutex<Vec<RegionWithLeader>>,
    pub invalidated: AtomicUsize,
    pub failed: AtomicUsize,
}

impl MockRegionManager {
    pub fn new(regions: Vec<RegionWithLeader>) -> MockRegionManager {
        MockRegionManager {
            regions: Mutex::new(regions),
            ..Default::default()
        }
    }

    /// One region covering the whole key space, led by store 41.
    pub fn region1() -> MockRegionManager {
        MockRegionManager::new(vec![mock_region(1, b"", b"", 41)])
    }

    pub fn set_regions(&self, regions: Vec<RegionWithLeader>) {
        *self.regions.lock().unwrap() = regions;
    }

    pub fn invalidated(&self) -> usize {
        self.invalidated.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RegionManager for MockRegionManager {
    async fn region_for_key(&self, key: &[u8]) -> Result<RegionWithLeader> {
        self.regions
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.contains(key))
            .cloned()
            .ok_or_else(|| Error::RegionForKeyNotFound { key: key.to_vec() })
    }

    async fn region_for_id(&self, id: RegionId) -> Result<RegionWithLeader> {
        self.regions
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id() == id)
            .cloned()
            .ok_or(Error::RegionNotFound { region_id: id })
    }

    async fn store_for_id(&self, id: StoreId) -> Result<metapb::Store> {
        Ok(mock_store(id))
    }

    async fn invalidate_region(&self, _ver_id: RegionVerId) {
        self.invalidated.fetch_add(1, Ordering::SeqCst);
    }

    async fn invalidate_store(&self, _id: StoreId) {}

    async fn on_request_fail(&self, _region: &RegionWithLeader) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RangeSplitter for MockRegionManager {
    async fn split_ranges(&self, ranges: Vec<KeyRange>) -> Result<Vec<RegionTask>> {
        group_ranges_by_region(self, ranges).await
    }
}

/// A builder wired to `manager` and a connector serving `client`.
pub fn mock_builder(
    config: Config,
    manager: Arc<MockRegionManager>,
    client: MockKvClient,
) -> (RegionStoreClientBuilder, Arc<MockKvConnect>) {
    let connect = Arc::new(MockKvConnect::new(client));
    let builder = RegionStoreClientBuilder::new(config, manager.clone(), manager, connect.clone());
    (builder, connect)
}
