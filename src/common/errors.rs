// Copyright 2018 TiKV Project Authors. Licensed under Apache-2.0.

use std::fmt;
use std::result;

use thiserror::Error;

use crate::backoffer::BackofferError;
use crate::proto::errorpb;
use crate::proto::kvrpcpb;
use crate::region::RegionId;
use crate::region::RegionVerId;
use crate::transaction::Lock;

/// A write conflict returned by TiKV.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WriteConflictError {
    pub start_ts: u64,
    pub conflict_ts: u64,
    pub conflict_commit_ts: u64,
    pub key: Vec<u8>,
    pub primary: Vec<u8>,
}

impl From<kvrpcpb::WriteConflict> for WriteConflictError {
    fn from(conflict: kvrpcpb::WriteConflict) -> Self {
        Self {
            start_ts: conflict.start_ts,
            conflict_ts: conflict.conflict_ts,
            conflict_commit_ts: conflict.conflict_commit_ts,
            key: conflict.key,
            primary: conflict.primary,
        }
    }
}

impl fmt::Display for WriteConflictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "start_ts={}, conflict_ts={}, conflict_commit_ts={}, key_len={}",
            self.start_ts,
            self.conflict_ts,
            self.conflict_commit_ts,
            self.key.len()
        )
    }
}

/// An error originating from the region client or its collaborators.
#[derive(Debug, Error)]
#[allow(clippy::large_enum_variant)]
pub enum Error {
    /// Feature is not implemented by the transport.
    #[error("Unimplemented feature")]
    Unimplemented,
    /// Errors caused by changes of region information
    #[error("Region error: {0:?}")]
    RegionError(Box<errorpb::Error>),
    /// A retry budget ran out before the request could succeed.
    #[error("Backoff exhausted: {0}")]
    BackoffExhausted(#[from] BackofferError),
    /// Locks were found blocking a batch read; the caller should retry the batch.
    #[error("Failed to resolve lock: {} lock(s) blocked the request", .0.len())]
    ResolveLockError(Vec<Lock>),
    /// Write conflict returned by TiKV.
    #[error("Write conflict: {0}")]
    WriteConflict(WriteConflictError),
    /// Retryable error returned by TiKV.
    #[error("Retryable error: {message}")]
    Retryable { message: String },
    /// TiKV aborts the transaction with a reason.
    #[error("TiKV aborts txn: {message}")]
    TxnAborted { message: String },
    /// Wraps `crate::proto::kvrpcpb::KeyError`
    #[error("{0:?}")]
    KeyError(Box<kvrpcpb::KeyError>),
    /// Multiple key errors
    #[error("Multiple key errors: {0:?}")]
    MultipleKeyErrors(Vec<Error>),
    /// A string error returned by TiKV server
    #[error("Kv error. {}", message)]
    KvError { message: String },
    /// The store did not answer with a usable response.
    #[error("Transport error: {message}")]
    Transport { message: String },
    /// The store did not answer within the request deadline.
    #[error("Request to {address} timed out")]
    Timeout { address: String },
    /// The caller passed a structurally invalid request.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },
    /// Plan execution failed on the store, unrelated to routing or locking.
    #[error("Coprocessor error: {message}")]
    Coprocessor { message: String },
    /// The decoded coprocessor result carried an execution error.
    #[error("Select error {code}: {message}")]
    SelectError { code: i32, message: String },
    #[error("Failed to decode response: {0}")]
    Decode(#[from] prost::DecodeError),
    /// No leader is found for the given id.
    #[error("Leader of region {} is not found", region.id)]
    LeaderNotFound { region: RegionVerId },
    /// No region is found for the given key.
    #[error("Region is not found for key: {:?}", key)]
    RegionForKeyNotFound { key: Vec<u8> },
    /// No region is found for the given id. note: distinguish it with the RegionNotFound error in errorpb.
    #[error("Region {} is not found", region_id)]
    RegionNotFound { region_id: RegionId },
    #[error("{}", message)]
    InternalError { message: String },
}

impl From<errorpb::Error> for Error {
    fn from(e: errorpb::Error) -> Error {
        Error::RegionError(Box::new(e))
    }
}

impl From<kvrpcpb::KeyError> for Error {
    fn from(mut e: kvrpcpb::KeyError) -> Error {
        if let Some(conflict) = e.conflict.take() {
            return Error::WriteConflict(conflict.into());
        }
        if !e.retryable.is_empty() {
            return Error::Retryable {
                message: std::mem::take(&mut e.retryable),
            };
        }
        if !e.abort.is_empty() {
            return Error::TxnAborted {
                message: std::mem::take(&mut e.abort),
            };
        }
        Error::KeyError(Box::new(e))
    }
}

/// A result holding an [`Error`](enum@Error).
pub type Result<T> = result::Result<T, Error>;

impl Error {
    pub fn is_region_error(&self) -> bool {
        matches!(self, Error::RegionError(_))
    }

    pub fn is_backoff_exhausted(&self) -> bool {
        matches!(self, Error::BackoffExhausted(_))
    }

    pub fn is_write_conflict(&self) -> bool {
        match self {
            Error::WriteConflict(_) => true,
            Error::MultipleKeyErrors(errors) => errors.iter().any(Error::is_write_conflict),
            _ => false,
        }
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! internal_err {
    ($e:expr) => ({
        $crate::Error::InternalError {
            message: format!("[{}:{}]: {}", file!(), line!(),  $e)
        }
    });
    ($f:tt, $($arg:expr),+) => ({
        $crate::internal_err!(format!($f, $($arg),+))
    });
}
