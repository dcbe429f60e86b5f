// Copyright 2019 TiKV Project Authors. Licensed under Apache-2.0.

//! How a single response is judged, and what a retry loop does about it.

mod classify;
mod policy;

pub(crate) use self::classify::classify;
pub(crate) use self::classify::Classified;
pub(crate) use self::policy::OnLocks;
pub(crate) use self::policy::OnRegionError;
pub(crate) use self::policy::Refresh;
pub(crate) use self::policy::RetryPolicy;
