//! Sorted-set engine: an order-statistic AVL tree paired with a hash index
//! for O(1) member lookup.
//!
//! Grounded on `examples/original_source/Redis/zset.c` and `zset.h`, which
//! bind the same two structures (`AVLTree` + `HMap`) together under a `ZSet`
//! and keep them in sync on every mutation. The hash index here is our own
//! [`RehashMap`](crate::rehash::RehashMap) rather than the reference's
//! intrusive `HTab`, for the same reason the keyspace uses it: no
//! self-referential pointers.

pub mod avl;

use avl::{AvlTree, MemberId};

use crate::rehash::RehashMap;

pub struct ZSet {
    tree: AvlTree,
    index: RehashMap<Box<[u8]>, MemberId>,
}

impl Default for ZSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ZSet {
    pub fn new() -> Self {
        Self {
            tree: AvlTree::new(),
            index: RehashMap::new(),
        }
    }

    pub fn cardinality(&self) -> u64 {
        self.tree.cardinality()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn clear(&mut self) {
        self.tree.clear();
        self.index.clear();
    }

    pub fn lookup(&mut self, member: &[u8]) -> Option<f64> {
        let id = *self.index.get(member)?;
        Some(self.tree.score(id))
    }

    /// Insert or update `member`'s score. Returns `true` if `member` is new
    /// to the set, `false` if it already existed (and was re-scored).
    pub fn insert(&mut self, member: &[u8], score: f64) -> bool {
        if let Some(&id) = self.index.get(member) {
            if self.tree.score(id) == score {
                return false;
            }
            self.tree.delete(id);
            let new_id = self.tree.insert(score, member.to_vec().into_boxed_slice());
            self.index.insert(member.to_vec().into_boxed_slice(), new_id);
            false
        } else {
            let id = self.tree.insert(score, member.to_vec().into_boxed_slice());
            self.index.insert(member.to_vec().into_boxed_slice(), id);
            true
        }
    }

    pub fn delete(&mut self, member: &[u8]) -> bool {
        match self.index.remove(member) {
            Some(id) => {
                self.tree.delete(id);
                true
            }
            None => false,
        }
    }

    /// 0-based rank in ascending (score, member) order (rank 0 = lowest
    /// score), or `None` if `member` is not a member of this set.
    pub fn rank(&mut self, member: &[u8]) -> Option<u64> {
        let id = *self.index.get(member)?;
        Some(self.tree.rank_ascend(self.tree.score(id), self.tree.member(id)))
    }

    /// `(member, score)` pairs at ascending ranks `lo..=hi`, inclusive.
    ///
    /// Either bound may be negative, interpreted as an offset from the end
    /// (`-1` is the last member). After resolving negative offsets against
    /// the set's cardinality, `lo` is clamped to 0 and `hi` to
    /// `cardinality - 1`; an empty set or `lo > hi` after clamping yields an
    /// empty sequence.
    pub fn range(&self, lo: i64, hi: i64) -> Vec<(Vec<u8>, f64)> {
        let card = self.cardinality() as i64;
        if card == 0 {
            return Vec::new();
        }
        let resolve = |i: i64| if i < 0 { card + i } else { i };
        let lo = resolve(lo).max(0);
        let hi = resolve(hi).min(card - 1);
        if lo > hi {
            return Vec::new();
        }
        self.tree
            .rank_range(lo as u64, hi as u64)
            .into_iter()
            .map(|id| (self.tree.member(id).to_vec(), self.tree.score(id)))
            .collect()
    }

    /// The least member whose `(score, key)` is `>= (score, member)` in the
    /// total order, or `None` if no such member exists.
    pub fn seek_ge(&self, score: f64, member: &[u8]) -> Option<(Vec<u8>, f64)> {
        let id = self.tree.seek_ge(score, member)?;
        Some((self.tree.member(id).to_vec(), self.tree.score(id)))
    }
}
