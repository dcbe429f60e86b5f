// Copyright 2019 TiKV Project Authors. Licensed under Apache-2.0.

use crate::proto::kvrpcpb;
use crate::Key;

/// A lock left by an in-flight transaction.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Lock {
    pub key: Key,
    /// The primary key of the owning transaction; its state decides this lock's fate.
    pub primary: Key,
    /// Start timestamp of the owning transaction.
    pub ts: u64,
    pub ttl: u64,
}

impl From<kvrpcpb::LockInfo> for Lock {
    fn from(info: kvrpcpb::LockInfo) -> Self {
        Lock {
            key: info.key,
            primary: info.primary_lock,
            ts: info.lock_version,
            ttl: info.lock_ttl,
        }
    }
}
