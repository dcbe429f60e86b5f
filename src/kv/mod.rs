// Copyright 2019 TiKV Project Authors. Licensed under Apache-2.0.
use std::fmt;

mod kvpair;

pub use kvpair::KvPair;

/// The key part of a key/value pair.
pub type Key = Vec<u8>;
/// The value part of a key/value pair.
pub type Value = Vec<u8>;

struct HexRepr<'a>(pub &'a [u8]);

impl fmt::Display for HexRepr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}
