//! Token payload serialization.
//!
//! JSON object keys are strings, but the token map is keyed by integer
//! peer id, so it travels as a list of `[id, timestamp]` pairs and is
//! reconstructed into a map on receipt.

use std::collections::HashMap;

pub type Token = HashMap<u64, u64>;

pub fn to_wire(token: &Token) -> Vec<(u64, u64)> {
    let mut pairs: Vec<(u64, u64)> = token.iter().map(|(&k, &v)| (k, v)).collect();
    pairs.sort_by_key(|&(k, _)| k);
    pairs
}

pub fn from_wire(pairs: Vec<(u64, u64)>) -> Token {
    pairs.into_iter().collect()
}
