// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

//! Pushdown plan and result messages carried opaquely inside coprocessor requests.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ExecType {
    TypeTableScan = 0,
    TypeIndexScan = 1,
    TypeSelection = 2,
    TypeAggregation = 3,
    TypeTopN = 4,
    TypeLimit = 5,
    TypeStreamAgg = 6,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Executor {
    #[prost(enumeration = "ExecType", tag = "1")]
    pub tp: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DagRequest {
    #[prost(uint64, tag = "1")]
    pub start_ts: u64,
    #[prost(message, repeated, tag = "2")]
    pub executors: ::prost::alloc::vec::Vec<Executor>,
    #[prost(uint32, repeated, tag = "3")]
    pub output_offsets: ::prost::alloc::vec::Vec<u32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Error {
    #[prost(int32, tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub msg: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Chunk {
    #[prost(bytes = "vec", tag = "3")]
    pub rows_data: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SelectResponse {
    #[prost(message, optional, tag = "1")]
    pub error: ::core::option::Option<Error>,
    #[prost(message, repeated, tag = "3")]
    pub chunks: ::prost::alloc::vec::Vec<Chunk>,
}
