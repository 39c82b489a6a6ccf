//! The top-level keyspace: name -> value, where a value is either a string
//! or a sorted set.
//!
//! Grounded on `examples/original_source/Redis/server.c`'s `g_data.db`, a
//! single hash table from key to a tagged-union `Entry`. The tagged union
//! becomes a plain Rust sum type here; the table itself is the same
//! [`RehashMap`](crate::rehash::RehashMap) used for sorted-set member
//! indices.

use crate::rehash::RehashMap;
use crate::zset::ZSet;

pub enum Value {
    Str(Vec<u8>),
    ZSet(ZSet),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::ZSet(_) => "zset",
        }
    }
}

pub struct Keyspace {
    entries: RehashMap<Box<[u8]>, Value>,
}

impl Default for Keyspace {
    fn default() -> Self {
        Self::new()
    }
}

impl Keyspace {
    pub fn new() -> Self {
        Self {
            entries: RehashMap::new(),
        }
    }

    pub fn get(&mut self, key: &[u8]) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &[u8]) -> Option<&mut Value> {
        self.entries.get_mut(key)
    }

    pub fn set(&mut self, key: &[u8], value: Value) {
        self.entries.insert(key.to_vec().into_boxed_slice(), value);
    }

    pub fn delete(&mut self, key: &[u8]) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Get the zset at `key`, creating an empty one if the key is absent.
    /// Returns an error description if `key` holds a non-zset value.
    pub fn zset_entry_or_insert(&mut self, key: &[u8]) -> Result<&mut ZSet, &'static str> {
        if !self.entries.contains_key(key) {
            self.entries.insert(key.to_vec().into_boxed_slice(), Value::ZSet(ZSet::new()));
        }
        match self.entries.get_mut(key) {
            Some(Value::ZSet(z)) => Ok(z),
            Some(Value::Str(_)) => Err("string"),
            None => unreachable!("just inserted"),
        }
    }

    /// Get the zset at `key` without creating one. `Ok(None)` if the key is
    /// absent, `Err` if it holds a non-zset value.
    pub fn zset_entry(&mut self, key: &[u8]) -> Result<Option<&mut ZSet>, &'static str> {
        match self.entries.get_mut(key) {
            Some(Value::ZSet(z)) => Ok(Some(z)),
            Some(Value::Str(_)) => Err("string"),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_delete_roundtrip() {
        let mut ks = Keyspace::new();
        ks.set(b"k", Value::Str(b"v".to_vec()));
        match ks.get(b"k") {
            Some(Value::Str(v)) => assert_eq!(v, b"v"),
            _ => panic!("expected string value"),
        }
        assert!(ks.delete(b"k"));
        assert!(ks.get(b"k").is_none());
    }

    #[test]
    fn zset_entry_or_insert_rejects_type_mismatch() {
        let mut ks = Keyspace::new();
        ks.set(b"k", Value::Str(b"v".to_vec()));
        assert_eq!(ks.zset_entry_or_insert(b"k").unwrap_err(), "string");
    }

    #[test]
    fn zset_entry_or_insert_creates_on_first_use() {
        let mut ks = Keyspace::new();
        let z = ks.zset_entry_or_insert(b"scores").unwrap();
        z.insert(b"alice", 10.0);
        assert_eq!(ks.zset_entry_or_insert(b"scores").unwrap().cardinality(), 1);
    }
}
