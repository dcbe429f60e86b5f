// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

//! Wire messages exchanged with TiKV stores.
//!
//! Only the fields read or written by the region dispatch layer are modelled; field tags follow
//! kvproto so that encoded messages stay wire compatible.

#![allow(clippy::large_enum_variant)]
#![allow(clippy::enum_variant_names)]

pub mod coprocessor;
pub mod errorpb;
pub mod kvrpcpb;
pub mod metapb;
pub mod tipb;
