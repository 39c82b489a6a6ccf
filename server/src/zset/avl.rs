//! An order-statistic AVL tree keyed by `(score, member)`.
//!
//! Grounded on `examples/original_source/Redis/avltree.c` and `avltree.h`,
//! which thread the tree through intrusive `parent`/`left`/`right` pointers
//! embedded in each zset member and expose `avl_fix`, `avl_del` and
//! `avl_offset`. Raw self-referential pointers don't translate to safe Rust,
//! so nodes live in a `Vec`-backed arena and every link is a [`MemberId`]
//! handle into that arena instead of a pointer -- the redesign the
//! specification's own design notes call for. The rebalancing algorithm
//! itself (subtree-size-augmented AVL, `fix_from` walking parent links up to
//! the root, `rank_ascend`/`select_by_ascend_rank` as the order-statistic
//! pair) is otherwise a direct port.

use std::cmp::Ordering;

/// A stable handle to a node in the arena. Remains valid across rotations;
/// only invalidated by deleting the member it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberId(u32);

struct Node {
    score: f64,
    member: Box<[u8]>,
    parent: Option<MemberId>,
    left: Option<MemberId>,
    right: Option<MemberId>,
    height: u32,
    cnt: u32,
}

fn cmp_key(a_score: f64, a_member: &[u8], b_score: f64, b_member: &[u8]) -> Ordering {
    a_score.total_cmp(&b_score).then_with(|| a_member.cmp(b_member))
}

/// An arena-backed, order-statistic AVL tree. Ties on score break on the
/// member's byte ordering, so the tree's in-order walk is always a strict
/// total order -- no two distinct members ever compare equal.
#[derive(Default)]
pub struct AvlTree {
    arena: Vec<Option<Node>>,
    free: Vec<MemberId>,
    root: Option<MemberId>,
}

impl AvlTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.arena.clear();
        self.free.clear();
        self.root = None;
    }

    pub fn cardinality(&self) -> u64 {
        self.cnt(self.root) as u64
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn score(&self, id: MemberId) -> f64 {
        self.node(id).score
    }

    pub fn member(&self, id: MemberId) -> &[u8] {
        &self.node(id).member
    }

    fn node(&self, id: MemberId) -> &Node {
        self.arena[id.0 as usize].as_ref().expect("dangling MemberId")
    }

    fn node_mut(&mut self, id: MemberId) -> &mut Node {
        self.arena[id.0 as usize].as_mut().expect("dangling MemberId")
    }

    fn height(&self, id: Option<MemberId>) -> u32 {
        id.map_or(0, |i| self.node(i).height)
    }

    fn cnt(&self, id: Option<MemberId>) -> u32 {
        id.map_or(0, |i| self.node(i).cnt)
    }

    fn alloc(&mut self, node: Node) -> MemberId {
        if let Some(id) = self.free.pop() {
            self.arena[id.0 as usize] = Some(node);
            id
        } else {
            let id = MemberId(self.arena.len() as u32);
            self.arena.push(Some(node));
            id
        }
    }

    fn free_node(&mut self, id: MemberId) {
        self.arena[id.0 as usize] = None;
        self.free.push(id);
    }

    fn update(&mut self, id: MemberId) {
        let (l, r) = (self.node(id).left, self.node(id).right);
        let height = 1 + self.height(l).max(self.height(r));
        let cnt = 1 + self.cnt(l) + self.cnt(r);
        let node = self.node_mut(id);
        node.height = height;
        node.cnt = cnt;
    }

    fn set_left(&mut self, id: MemberId, child: Option<MemberId>) {
        self.node_mut(id).left = child;
        if let Some(c) = child {
            self.node_mut(c).parent = Some(id);
        }
    }

    fn set_right(&mut self, id: MemberId, child: Option<MemberId>) {
        self.node_mut(id).right = child;
        if let Some(c) = child {
            self.node_mut(c).parent = Some(id);
        }
    }

    fn rot_left(&mut self, a: MemberId) -> MemberId {
        let b = self.node(a).right.expect("rot_left needs a right child");
        let b_left = self.node(b).left;
        self.set_right(a, b_left);
        self.set_left(b, Some(a));
        self.update(a);
        self.update(b);
        b
    }

    fn rot_right(&mut self, a: MemberId) -> MemberId {
        let b = self.node(a).left.expect("rot_right needs a left child");
        let b_right = self.node(b).right;
        self.set_left(a, b_right);
        self.set_right(b, Some(a));
        self.update(a);
        self.update(b);
        b
    }

    fn fix_left(&mut self, node: MemberId) -> MemberId {
        let left = self.node(node).left.expect("fix_left needs a left child");
        if self.height(self.node(left).left) < self.height(self.node(left).right) {
            let new_left = self.rot_left(left);
            self.set_left(node, Some(new_left));
        }
        self.rot_right(node)
    }

    fn fix_right(&mut self, node: MemberId) -> MemberId {
        let right = self.node(node).right.expect("fix_right needs a right child");
        if self.height(self.node(right).right) < self.height(self.node(right).left) {
            let new_right = self.rot_right(right);
            self.set_right(node, Some(new_right));
        }
        self.rot_left(node)
    }

    /// Rebalance from `node` up to the root, returning the new root.
    fn fix_from(&mut self, mut node: MemberId) -> MemberId {
        loop {
            let parent = self.node(node).parent;
            let l = self.height(self.node(node).left);
            let r = self.height(self.node(node).right);
            let new_node = if l == r + 2 {
                self.fix_left(node)
            } else if r == l + 2 {
                self.fix_right(node)
            } else {
                self.update(node);
                node
            };
            match parent {
                None => return new_node,
                Some(p) => {
                    if self.node(p).left == Some(node) {
                        self.set_left(p, Some(new_node));
                    } else {
                        self.set_right(p, Some(new_node));
                    }
                    node = p;
                }
            }
        }
    }

    fn subtree_min(&self, mut id: MemberId) -> MemberId {
        while let Some(l) = self.node(id).left {
            id = l;
        }
        id
    }

    fn transplant(&mut self, old: MemberId, new: Option<MemberId>) {
        match self.node(old).parent {
            None => {
                self.root = new;
                if let Some(n) = new {
                    self.node_mut(n).parent = None;
                }
            }
            Some(p) => {
                if self.node(p).left == Some(old) {
                    self.set_left(p, new);
                } else {
                    self.set_right(p, new);
                }
            }
        }
    }

    pub fn insert(&mut self, score: f64, member: Box<[u8]>) -> MemberId {
        let new_id = self.alloc(Node {
            score,
            member,
            parent: None,
            left: None,
            right: None,
            height: 1,
            cnt: 1,
        });
        let Some(root) = self.root else {
            self.root = Some(new_id);
            return new_id;
        };
        let mut cur = root;
        loop {
            let go_left = cmp_key(
                self.node(new_id).score,
                &self.node(new_id).member,
                self.node(cur).score,
                &self.node(cur).member,
            ) == Ordering::Less;
            let next = if go_left { self.node(cur).left } else { self.node(cur).right };
            match next {
                Some(n) => cur = n,
                None => {
                    if go_left {
                        self.set_left(cur, Some(new_id));
                    } else {
                        self.set_right(cur, Some(new_id));
                    }
                    break;
                }
            }
        }
        self.root = Some(self.fix_from(new_id));
        new_id
    }

    pub fn delete(&mut self, id: MemberId) {
        let left = self.node(id).left;
        let right = self.node(id).right;
        let rebalance_from = match (left, right) {
            (None, other) => {
                let parent = self.node(id).parent;
                self.transplant(id, other);
                parent
            }
            (Some(_), None) => {
                let parent = self.node(id).parent;
                self.transplant(id, left);
                parent
            }
            (Some(l), Some(r)) => {
                let succ = self.subtree_min(r);
                let succ_parent = self.node(succ).parent;
                let rebalance_from = if succ_parent == Some(id) {
                    Some(succ)
                } else {
                    let succ_right = self.node(succ).right;
                    self.transplant(succ, succ_right);
                    self.set_right(succ, Some(r));
                    succ_parent
                };
                self.transplant(id, Some(succ));
                self.set_left(succ, Some(l));
                rebalance_from
            }
        };
        self.free_node(id);
        if let Some(start) = rebalance_from {
            self.root = Some(self.fix_from(start));
        }
    }

    /// Count of members whose key sorts strictly before `(score, member)`,
    /// i.e. the 0-based rank of that key in ascending order.
    pub fn rank_ascend(&self, score: f64, member: &[u8]) -> u64 {
        let mut rank = 0u64;
        let mut cur = self.root;
        while let Some(id) = cur {
            match cmp_key(score, member, self.node(id).score, &self.node(id).member) {
                Ordering::Greater => {
                    rank += 1 + self.cnt(self.node(id).left) as u64;
                    cur = self.node(id).right;
                }
                Ordering::Less => {
                    cur = self.node(id).left;
                }
                Ordering::Equal => {
                    rank += self.cnt(self.node(id).left) as u64;
                    break;
                }
            }
        }
        rank
    }

    /// The member at ascending rank `k` (0 = lowest score), if `k` is in range.
    pub fn select_by_ascend_rank(&self, mut k: u64) -> Option<MemberId> {
        let mut cur = self.root;
        while let Some(id) = cur {
            let l = self.cnt(self.node(id).left) as u64;
            match k.cmp(&l) {
                Ordering::Less => cur = self.node(id).left,
                Ordering::Equal => return Some(id),
                Ordering::Greater => {
                    k -= l + 1;
                    cur = self.node(id).right;
                }
            }
        }
        None
    }

    /// Smallest member whose key is `>= (score, member)`.
    pub fn seek_ge(&self, score: f64, member: &[u8]) -> Option<MemberId> {
        let mut cur = self.root;
        let mut result = None;
        while let Some(id) = cur {
            if cmp_key(score, member, self.node(id).score, &self.node(id).member) == Ordering::Greater {
                cur = self.node(id).right;
            } else {
                result = Some(id);
                cur = self.node(id).left;
            }
        }
        result
    }

    /// The member immediately after `id` in ascending (score, member) order.
    pub fn successor(&self, id: MemberId) -> Option<MemberId> {
        if let Some(r) = self.node(id).right {
            return Some(self.subtree_min(r));
        }
        let mut cur = id;
        while let Some(p) = self.node(cur).parent {
            if self.node(p).left == Some(cur) {
                return Some(p);
            }
            cur = p;
        }
        None
    }

    /// Members at ascending ranks `lo..=hi` (inclusive, both already
    /// normalised and clamped by the caller), in ascending (score, member)
    /// order. O(log n + (hi - lo)).
    pub fn rank_range(&self, lo: u64, hi: u64) -> Vec<MemberId> {
        let mut out = Vec::new();
        if lo > hi {
            return out;
        }
        let Some(mut cur) = self.select_by_ascend_rank(lo) else {
            return out;
        };
        out.push(cur);
        let want = (hi - lo) as usize;
        while out.len() <= want {
            match self.successor(cur) {
                Some(s) => {
                    out.push(s);
                    cur = s;
                }
                None => break,
            }
        }
        out
    }

    #[cfg(test)]
    fn check_invariants(&self) {
        fn walk(tree: &AvlTree, id: Option<MemberId>) -> (u32, u32) {
            let Some(id) = id else { return (0, 0) };
            let node = tree.node(id);
            if let Some(l) = node.left {
                assert_eq!(tree.node(l).parent, Some(id));
            }
            if let Some(r) = node.right {
                assert_eq!(tree.node(r).parent, Some(id));
            }
            let (lh, lc) = walk(tree, node.left);
            let (rh, rc) = walk(tree, node.right);
            assert!((lh as i64 - rh as i64).abs() <= 1, "AVL balance violated at node");
            assert_eq!(node.height, 1 + lh.max(rh));
            assert_eq!(node.cnt, 1 + lc + rc);
            (node.height, node.cnt)
        }
        walk(self, self.root);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mem(s: &str) -> Box<[u8]> {
        s.as_bytes().to_vec().into_boxed_slice()
    }

    #[test]
    fn insert_keeps_avl_balance_under_ascending_insertion() {
        let mut t = AvlTree::new();
        for i in 0..2000 {
            t.insert(i as f64, mem(&format!("m{i:05}")));
            t.check_invariants();
        }
        assert_eq!(t.cardinality(), 2000);
    }

    #[test]
    fn rank_ascend_matches_naive_count() {
        let mut t = AvlTree::new();
        let mut scores = Vec::new();
        for i in 0..500 {
            let score = ((i * 37) % 500) as f64;
            t.insert(score, mem(&format!("m{i:05}")));
            scores.push((score, format!("m{i:05}")));
        }
        for (score, member) in &scores {
            let naive = scores
                .iter()
                .filter(|(s, m)| (*s, m.as_str()) < (*score, member.as_str()))
                .count() as u64;
            assert_eq!(t.rank_ascend(*score, member.as_bytes()), naive);
        }
    }

    #[test]
    fn rank_range_returns_ascending_inclusive_window() {
        let mut t = AvlTree::new();
        for i in 0..100 {
            t.insert(i as f64, mem(&format!("m{i:05}")));
        }
        let window = t.rank_range(10, 14);
        let scores: Vec<f64> = window.iter().map(|id| t.score(*id)).collect();
        assert_eq!(scores, vec![10.0, 11.0, 12.0, 13.0, 14.0]);
    }

    #[test]
    fn rank_range_empty_when_lo_exceeds_hi() {
        let mut t = AvlTree::new();
        for i in 0..10 {
            t.insert(i as f64, mem(&format!("m{i:05}")));
        }
        assert!(t.rank_range(5, 3).is_empty());
    }

    #[test]
    fn delete_preserves_remaining_members_and_balance() {
        let mut t = AvlTree::new();
        let mut ids = Vec::new();
        for i in 0..1000 {
            ids.push(t.insert(i as f64, mem(&format!("m{i:05}"))));
        }
        for (i, id) in ids.into_iter().enumerate() {
            if i % 2 == 0 {
                t.delete(id);
            }
        }
        t.check_invariants();
        assert_eq!(t.cardinality(), 500);
        for i in (1..1000).step_by(2) {
            assert!(t.seek_ge(i as f64, mem(&format!("m{i:05}")).as_ref()).is_some());
        }
    }

    #[test]
    fn seek_ge_finds_boundary_and_successor_walks_ascending() {
        let mut t = AvlTree::new();
        for i in (0..100).step_by(2) {
            t.insert(i as f64, mem(&format!("m{i:05}")));
        }
        let hit = t.seek_ge(7.0, b"anything").unwrap();
        assert_eq!(t.score(hit), 8.0);

        let mut cur = t.seek_ge(0.0, b"").unwrap();
        let mut seen = vec![t.score(cur)];
        while let Some(next) = t.successor(cur) {
            seen.push(t.score(next));
            cur = next;
        }
        let expected: Vec<f64> = (0..100).step_by(2).map(|i| i as f64).collect();
        assert_eq!(seen, expected);
    }
}
