// Copyright 2019 TiKV Project Authors. Licensed under Apache-2.0.

use crate::proto::errorpb;
use crate::store::HasKeyErrors;
use crate::store::HasLocks;
use crate::store::HasRegionError;
use crate::transaction::Lock;
use crate::Error;

/// The single outcome a response resolves to.
#[derive(Debug)]
pub(crate) enum Classified<Resp> {
    Success(Resp),
    RegionError(errorpb::Error),
    Locked(Vec<Lock>),
    KeyError(Error),
}

/// Routing errors win over key errors, and a decided key error wins over a lock sharing the
/// same response: retrying past the lock could not change the outcome.
pub(crate) fn classify<Resp>(mut resp: Resp) -> Classified<Resp>
where
    Resp: HasRegionError + HasLocks + HasKeyErrors,
{
    if let Some(e) = resp.region_error() {
        return Classified::RegionError(e);
    }

    let locks = resp.take_locks();
    if let Some(mut errors) = resp.key_errors() {
        let error = if errors.len() == 1 {
            errors.remove(0)
        } else {
            Error::MultipleKeyErrors(errors)
        };
        return Classified::KeyError(error);
    }

    if locks.is_empty() {
        Classified::Success(resp)
    } else {
        Classified::Locked(locks.into_iter().map(Lock::from).collect())
    }
}
