// Copyright 2019 TiKV Project Authors. Licensed under Apache-2.0.

use crate::proto::coprocessor;
use crate::proto::errorpb;
use crate::proto::kvrpcpb;
use crate::Error;

// Those that can have a single region error
pub trait HasRegionError {
    fn region_error(&mut self) -> Option<errorpb::Error>;
}

/// Extracts key errors that report a blocking lock, leaving every other key error in place.
pub trait HasLocks {
    fn take_locks(&mut self) -> Vec<kvrpcpb::LockInfo> {
        Vec::new()
    }
}

pub trait HasKeyErrors {
    fn key_errors(&mut self) -> Option<Vec<Error>>;
}

fn take_if_locked(error: &mut Option<kvrpcpb::KeyError>) -> Option<kvrpcpb::LockInfo> {
    if error.as_ref().is_some_and(|e| e.locked.is_some()) {
        error.take().and_then(|e| e.locked)
    } else {
        None
    }
}

macro_rules! has_region_error {
    ($type:ty) => {
        impl HasRegionError for $type {
            fn region_error(&mut self) -> Option<errorpb::Error> {
                self.region_error.take()
            }
        }
    };
}

has_region_error!(kvrpcpb::GetResponse);
has_region_error!(kvrpcpb::ScanResponse);
has_region_error!(kvrpcpb::BatchGetResponse);
has_region_error!(kvrpcpb::PrewriteResponse);
has_region_error!(kvrpcpb::CommitResponse);
has_region_error!(kvrpcpb::CleanupResponse);
has_region_error!(kvrpcpb::BatchRollbackResponse);
has_region_error!(kvrpcpb::ScanLockResponse);
has_region_error!(kvrpcpb::ResolveLockResponse);
has_region_error!(kvrpcpb::GcResponse);
has_region_error!(kvrpcpb::DeleteRangeResponse);
has_region_error!(kvrpcpb::RawGetResponse);
has_region_error!(kvrpcpb::RawPutResponse);
has_region_error!(kvrpcpb::RawDeleteResponse);
has_region_error!(kvrpcpb::RawBatchPutResponse);
has_region_error!(kvrpcpb::RawScanResponse);
has_region_error!(coprocessor::Response);

macro_rules! has_key_error {
    ($type:ty) => {
        impl HasKeyErrors for $type {
            fn key_errors(&mut self) -> Option<Vec<Error>> {
                self.error.take().map(|e| vec![e.into()])
            }
        }
    };
}

has_key_error!(kvrpcpb::GetResponse);
has_key_error!(kvrpcpb::CommitResponse);
has_key_error!(kvrpcpb::CleanupResponse);
has_key_error!(kvrpcpb::BatchRollbackResponse);
has_key_error!(kvrpcpb::ScanLockResponse);
has_key_error!(kvrpcpb::ResolveLockResponse);
has_key_error!(kvrpcpb::GcResponse);

macro_rules! has_str_error {
    ($type:ty) => {
        impl HasKeyErrors for $type {
            fn key_errors(&mut self) -> Option<Vec<Error>> {
                if self.error.is_empty() {
                    None
                } else {
                    Some(vec![Error::KvError {
                        message: std::mem::take(&mut self.error),
                    }])
                }
            }
        }
    };
}

has_str_error!(kvrpcpb::DeleteRangeResponse);
has_str_error!(kvrpcpb::RawGetResponse);
has_str_error!(kvrpcpb::RawPutResponse);
has_str_error!(kvrpcpb::RawDeleteResponse);
has_str_error!(kvrpcpb::RawBatchPutResponse);

macro_rules! pair_key_errors {
    ($type:ty, $pairs:ident) => {
        impl HasKeyErrors for $type {
            fn key_errors(&mut self) -> Option<Vec<Error>> {
                let errors: Vec<Error> = self
                    .$pairs
                    .iter_mut()
                    .filter_map(|pair| pair.error.take())
                    .map(Error::from)
                    .collect();
                if errors.is_empty() {
                    None
                } else {
                    Some(errors)
                }
            }
        }
    };
}

pair_key_errors!(kvrpcpb::ScanResponse, pairs);
pair_key_errors!(kvrpcpb::BatchGetResponse, pairs);
// Raw pairs never carry MVCC locks.
pair_key_errors!(kvrpcpb::RawScanResponse, kvs);

impl HasKeyErrors for kvrpcpb::PrewriteResponse {
    fn key_errors(&mut self) -> Option<Vec<Error>> {
        if self.errors.is_empty() {
            None
        } else {
            Some(self.errors.drain(..).map(Error::from).collect())
        }
    }
}

impl HasKeyErrors for coprocessor::Response {
    fn key_errors(&mut self) -> Option<Vec<Error>> {
        if self.other_error.is_empty() {
            None
        } else {
            Some(vec![Error::Coprocessor {
                message: std::mem::take(&mut self.other_error),
            }])
        }
    }
}

macro_rules! error_locks {
    ($type:ty) => {
        impl HasLocks for $type {
            fn take_locks(&mut self) -> Vec<kvrpcpb::LockInfo> {
                take_if_locked(&mut self.error).into_iter().collect()
            }
        }
    };
}

macro_rules! pair_locks {
    ($type:ty) => {
        impl HasLocks for $type {
            fn take_locks(&mut self) -> Vec<kvrpcpb::LockInfo> {
                self.pairs
                    .iter_mut()
                    .filter_map(|pair| take_if_locked(&mut pair.error))
                    .collect()
            }
        }
    };
}

error_locks!(kvrpcpb::GetResponse);
error_locks!(kvrpcpb::CommitResponse);
error_locks!(kvrpcpb::CleanupResponse);
error_locks!(kvrpcpb::BatchRollbackResponse);
// Only the response's own error; `locks` is the scan result.
error_locks!(kvrpcpb::ScanLockResponse);
error_locks!(kvrpcpb::ResolveLockResponse);
error_locks!(kvrpcpb::GcResponse);
pair_locks!(kvrpcpb::ScanResponse);
pair_locks!(kvrpcpb::BatchGetResponse);

impl HasLocks for kvrpcpb::PrewriteResponse {
    fn take_locks(&mut self) -> Vec<kvrpcpb::LockInfo> {
        let (locked, others): (Vec<_>, Vec<_>) = std::mem::take(&mut self.errors)
            .into_iter()
            .partition(|e| e.locked.is_some());
        self.errors = others;
        locked.into_iter().filter_map(|e| e.locked).collect()
    }
}

impl HasLocks for coprocessor::Response {
    fn take_locks(&mut self) -> Vec<kvrpcpb::LockInfo> {
        self.locked.take().into_iter().collect()
    }
}

impl HasLocks for kvrpcpb::DeleteRangeResponse {}
impl HasLocks for kvrpcpb::RawGetResponse {}
impl HasLocks for kvrpcpb::RawPutResponse {}
impl HasLocks for kvrpcpb::RawDeleteResponse {}
impl HasLocks for kvrpcpb::RawBatchPutResponse {}
impl HasLocks for kvrpcpb::RawScanResponse {}
