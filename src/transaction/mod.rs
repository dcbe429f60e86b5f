// Copyright 2019 TiKV Project Authors. Licensed under Apache-2.0.

//! Lock resolution for the two-phase commit protocol.

mod lock;
mod lock_resolver;

pub use lock::Lock;
pub use lock_resolver::LockResolver;
pub use lock_resolver::TxnStatus;
