//! Shared utilities for the `server` and `cli` crates.

pub mod util;

use std::error::Error;

/// A generic result type for places that don't need a dedicated error enum.
pub type TResult<T> = Result<T, Box<dyn Error>>;

/// The starting size of a per-connection read buffer, in bytes.
pub const BUF_CAP: usize = 1024;

use std::str::FromStr;

lazy_static::lazy_static! {
    static ref RE: regex::Regex = regex::Regex::from_str(r#"("[^"]*"|'[^']*'|[\S]+)+"#).unwrap();
}

/// Split a line of input into whitespace-separated arguments, honoring single
/// and double quotes as grouping (but not escaping).
pub fn split_into_args(line: &str) -> Vec<String> {
    RE.find_iter(line)
        .map(|val| val.as_str().replace('\'', "").replace('"', ""))
        .collect()
}
