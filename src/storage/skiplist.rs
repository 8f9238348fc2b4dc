//! Skip list implementation for sorted sets
//!
//! Provides a probabilistic data structure with expected O(log n)
//! insertion, removal, rank lookup and range positioning for scored
//! members kept in (score, member) order.
//!
//! Uses dual indexing: the linked levels for order-based operations and a
//! HashMap for member-based lookups. Nodes live in an arena and link to
//! each other by slot index; every forward link records its span (how many
//! level-0 steps it skips) so ranks can be computed while descending.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Maximum number of levels in the skip list
pub const MAX_LEVEL: usize = 32;

/// Probability of promoting a node to the next level
const PROBABILITY: f64 = 0.25;

/// Arena slot of the sentinel head node
const HEAD: usize = 0;

#[derive(Debug, Clone, Copy, Default)]
struct Link {
    next: Option<usize>,
    span: usize,
}

#[derive(Debug, Clone)]
struct Node {
    member: Vec<u8>,
    score: f64,
    levels: Vec<Link>,
    /// Predecessor on level 0; `None` for the first node
    backward: Option<usize>,
}

/// Ordered index of unique members keyed by (score, member)
///
/// Scores must not be NaN. The randomness source used for level selection
/// is a type parameter so tests can run with a seeded generator.
#[derive(Clone)]
pub struct SkipList<R = StdRng> {
    nodes: Vec<Node>,
    free: Vec<usize>,
    tail: Option<usize>,
    /// Number of levels in use, at least 1
    level: usize,
    length: usize,
    /// Member-to-score lookup table for O(1) member operations
    index: HashMap<Vec<u8>, f64>,
    rng: R,
}

impl SkipList<StdRng> {
    /// Create a new empty skip list seeded from the OS
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Create a new empty skip list with reproducible level selection
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl Default for SkipList<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RngCore> SkipList<R> {
    /// Create a new empty skip list drawing levels from `rng`
    pub fn with_rng(rng: R) -> Self {
        let head = Node {
            member: Vec::new(),
            score: 0.0,
            levels: vec![Link::default(); MAX_LEVEL],
            backward: None,
        };

        SkipList {
            nodes: vec![head],
            free: Vec::new(),
            tail: None,
            level: 1,
            length: 0,
            index: HashMap::new(),
            rng,
        }
    }

    /// Insert a member or move it to a new score
    ///
    /// Returns true only if the member was not present before. A member
    /// whose score changes is unlinked and relinked at its new position.
    pub fn insert(&mut self, score: f64, member: Vec<u8>) -> bool {
        debug_assert!(!score.is_nan(), "NaN scores cannot be ordered");

        match self.index.get(&member).copied() {
            Some(old) if old == score => false,
            Some(old) => {
                self.unlink(old, &member);
                self.link(score, member.clone());
                self.index.insert(member, score);
                false
            }
            None => {
                self.link(score, member.clone());
                self.index.insert(member, score);
                true
            }
        }
    }

    /// Remove the node holding exactly (score, member)
    pub fn delete(&mut self, score: f64, member: &[u8]) -> bool {
        match self.index.get(member) {
            Some(&current) if current == score => {
                self.unlink(current, member);
                self.index.remove(member);
                true
            }
            _ => false,
        }
    }

    /// Remove a member whatever its score, returning that score
    pub fn remove(&mut self, member: &[u8]) -> Option<f64> {
        let score = self.score(member)?;
        self.delete(score, member).then_some(score)
    }

    /// Score of a member - O(1)
    pub fn score(&self, member: &[u8]) -> Option<f64> {
        self.index.get(member).copied()
    }

    /// 0-based position of a member in ascending order - O(log n)
    pub fn rank(&self, member: &[u8]) -> Option<usize> {
        let score = self.score(member)?;
        let mut traversed = 0;
        let mut x = HEAD;

        for i in (0..self.level).rev() {
            while let Some(next) = self.nodes[x].levels[i].next {
                if self.compare(next, score, member) == Ordering::Greater {
                    break;
                }
                traversed += self.nodes[x].levels[i].span;
                x = next;
            }
            if x != HEAD && self.nodes[x].member == member {
                return Some(traversed - 1);
            }
        }

        None
    }

    /// Elements between two ranks, inclusive, in ascending order
    ///
    /// Negative ranks count from the end (`-1` is the last element). The
    /// start is clamped to 0 and the stop to the last rank; if the start
    /// then lies past the stop the result is empty.
    pub fn range_by_rank(&self, start: i64, stop: i64) -> Vec<(&[u8], f64)> {
        match self.resolve_ranks(start, stop) {
            Some((start, stop)) => self.iter_from_rank(start).take(stop - start + 1).collect(),
            None => Vec::new(),
        }
    }

    /// Turn signed, possibly out-of-range ranks into a valid inclusive
    /// window, or `None` if the window is empty
    pub fn resolve_ranks(&self, start: i64, stop: i64) -> Option<(usize, usize)> {
        let len = self.length as i64;
        let mut start = if start < 0 { len + start } else { start };
        let mut stop = if stop < 0 { len + stop } else { stop };

        if start < 0 {
            start = 0;
        }
        if stop >= len {
            stop = len - 1;
        }
        if start > stop {
            return None;
        }
        Some((start as usize, stop as usize))
    }

    /// Ascending iterator starting at the given 0-based rank
    pub fn iter_from_rank(&self, rank: usize) -> Iter<'_> {
        Iter {
            nodes: &self.nodes,
            cursor: self.node_at(rank),
            reverse: false,
        }
    }

    /// Descending iterator starting at the given 0-based rank
    pub fn iter_rev_from_rank(&self, rank: usize) -> Iter<'_> {
        Iter {
            nodes: &self.nodes,
            cursor: self.node_at(rank),
            reverse: true,
        }
    }

    /// Ascending iterator starting at the first element for which `below`
    /// is false
    ///
    /// `below` must hold for a prefix of the ordering and fail for the
    /// rest, as "lies under the lower bound" does.
    pub fn iter_from<F>(&self, below: F) -> Iter<'_>
    where
        F: Fn(f64, &[u8]) -> bool,
    {
        let mut x = HEAD;
        for i in (0..self.level).rev() {
            while let Some(next) = self.nodes[x].levels[i].next {
                let node = &self.nodes[next];
                if !below(node.score, &node.member) {
                    break;
                }
                x = next;
            }
        }

        Iter {
            nodes: &self.nodes,
            cursor: self.nodes[x].levels[0].next,
            reverse: false,
        }
    }

    /// Descending iterator starting at the last element for which `above`
    /// is false
    ///
    /// `above` must fail for a prefix of the ordering and hold for the
    /// rest, as "lies over the upper bound" does.
    pub fn iter_rev_from<F>(&self, above: F) -> Iter<'_>
    where
        F: Fn(f64, &[u8]) -> bool,
    {
        let mut x = HEAD;
        for i in (0..self.level).rev() {
            while let Some(next) = self.nodes[x].levels[i].next {
                let node = &self.nodes[next];
                if above(node.score, &node.member) {
                    break;
                }
                x = next;
            }
        }

        Iter {
            nodes: &self.nodes,
            cursor: if x == HEAD { None } else { Some(x) },
            reverse: true,
        }
    }

    /// All elements in ascending order
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            nodes: &self.nodes,
            cursor: self.nodes[HEAD].levels[0].next,
            reverse: false,
        }
    }

    /// All elements in descending order, walking the backward links
    pub fn iter_rev(&self) -> Iter<'_> {
        Iter {
            nodes: &self.nodes,
            cursor: self.tail,
            reverse: true,
        }
    }

    /// Get the number of elements
    pub fn len(&self) -> usize {
        self.length
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    // Helper methods

    /// Order of the node at `idx` relative to (score, member)
    fn compare(&self, idx: usize, score: f64, member: &[u8]) -> Ordering {
        let node = &self.nodes[idx];
        node.score
            .partial_cmp(&score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| node.member.as_slice().cmp(member))
    }

    /// Node at a 0-based rank - O(log n)
    fn node_at(&self, rank: usize) -> Option<usize> {
        if rank >= self.length {
            return None;
        }

        let target = rank + 1;
        let mut traversed = 0;
        let mut x = HEAD;

        for i in (0..self.level).rev() {
            while let Some(next) = self.nodes[x].levels[i].next {
                let span = self.nodes[x].levels[i].span;
                if traversed + span > target {
                    break;
                }
                traversed += span;
                x = next;
            }
            if traversed == target {
                return Some(x);
            }
        }

        None
    }

    /// Link a new node; the member must not already be linked
    fn link(&mut self, score: f64, member: Vec<u8>) {
        let mut update = [HEAD; MAX_LEVEL];
        let mut rank = [0usize; MAX_LEVEL];
        let mut x = HEAD;

        for i in (0..self.level).rev() {
            rank[i] = if i == self.level - 1 { 0 } else { rank[i + 1] };
            while let Some(next) = self.nodes[x].levels[i].next {
                if self.compare(next, score, &member) != Ordering::Less {
                    break;
                }
                rank[i] += self.nodes[x].levels[i].span;
                x = next;
            }
            update[i] = x;
        }

        let new_level = self.random_level();
        if new_level > self.level {
            for i in self.level..new_level {
                rank[i] = 0;
                update[i] = HEAD;
                self.nodes[HEAD].levels[i].span = self.length;
            }
            self.level = new_level;
        }

        let new = self.alloc(Node {
            member,
            score,
            levels: vec![Link::default(); new_level],
            backward: None,
        });

        for i in 0..new_level {
            let prev = update[i];
            let skipped = rank[0] - rank[i];
            let prev_link = self.nodes[prev].levels[i];

            self.nodes[new].levels[i] = Link {
                next: prev_link.next,
                span: prev_link.span - skipped,
            };
            self.nodes[prev].levels[i] = Link {
                next: Some(new),
                span: skipped + 1,
            };
        }

        for i in new_level..self.level {
            self.nodes[update[i]].levels[i].span += 1;
        }

        self.nodes[new].backward = if update[0] == HEAD { None } else { Some(update[0]) };
        match self.nodes[new].levels[0].next {
            Some(next) => self.nodes[next].backward = Some(new),
            None => self.tail = Some(new),
        }

        self.length += 1;
    }

    /// Unlink the node holding (score, member), if any
    fn unlink(&mut self, score: f64, member: &[u8]) -> bool {
        let mut update = [HEAD; MAX_LEVEL];
        let mut x = HEAD;

        for i in (0..self.level).rev() {
            while let Some(next) = self.nodes[x].levels[i].next {
                if self.compare(next, score, member) != Ordering::Less {
                    break;
                }
                x = next;
            }
            update[i] = x;
        }

        let target = match self.nodes[x].levels[0].next {
            Some(t) if self.compare(t, score, member) == Ordering::Equal => t,
            _ => return false,
        };

        for i in 0..self.level {
            let prev = update[i];
            if self.nodes[prev].levels[i].next == Some(target) {
                let removed = self.nodes[target].levels[i];
                let link = &mut self.nodes[prev].levels[i];
                link.span = link.span + removed.span - 1;
                link.next = removed.next;
            } else {
                self.nodes[prev].levels[i].span -= 1;
            }
        }

        let backward = self.nodes[target].backward;
        match self.nodes[target].levels[0].next {
            Some(next) => self.nodes[next].backward = backward,
            None => self.tail = backward,
        }

        while self.level > 1 && self.nodes[HEAD].levels[self.level - 1].next.is_none() {
            self.level -= 1;
        }

        self.release(target);
        self.length -= 1;
        true
    }

    /// Generate random level for new node
    fn random_level(&mut self) -> usize {
        let mut level = 1;
        while level < MAX_LEVEL && self.rng.gen::<f64>() < PROBABILITY {
            level += 1;
        }
        level
    }

    fn alloc(&mut self, node: Node) -> usize {
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = node;
                slot
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, slot: usize) {
        let node = &mut self.nodes[slot];
        node.member = Vec::new();
        node.levels = Vec::new();
        node.backward = None;
        self.free.push(slot);
    }
}

/// Iterator over (member, score) pairs in either direction
pub struct Iter<'a> {
    nodes: &'a [Node],
    cursor: Option<usize>,
    reverse: bool,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a [u8], f64);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.cursor?;
        let node = &self.nodes[idx];
        self.cursor = if self.reverse {
            node.backward
        } else {
            node.levels[0].next
        };
        Some((node.member.as_slice(), node.score))
    }
}

impl<R> fmt::Debug for SkipList<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries = Vec::with_capacity(self.length);
        let mut cursor = self.nodes[HEAD].levels[0].next;
        while let Some(idx) = cursor {
            let node = &self.nodes[idx];
            entries.push((String::from_utf8_lossy(&node.member), node.score));
            cursor = node.levels[0].next;
        }
        f.debug_struct("SkipList")
            .field("length", &self.length)
            .field("level", &self.level)
            .field("entries", &entries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    /// Walk every level and check links, spans and backward pointers
    fn assert_consistent<R: RngCore>(list: &SkipList<R>) {
        // Level-0 order and ranks
        let mut order = Vec::new();
        let mut prev: Option<usize> = None;
        let mut cursor = list.nodes[HEAD].levels[0].next;
        while let Some(idx) = cursor {
            assert_eq!(list.nodes[idx].backward, prev);
            order.push(idx);
            prev = Some(idx);
            cursor = list.nodes[idx].levels[0].next;
        }
        assert_eq!(order.len(), list.len());
        assert_eq!(list.tail, order.last().copied());
        assert_eq!(list.index.len(), list.len());

        for pair in order.windows(2) {
            let (a, b) = (&list.nodes[pair[0]], &list.nodes[pair[1]]);
            assert!((a.score, &a.member) < (b.score, &b.member));
        }

        let position: HashMap<usize, usize> =
            order.iter().enumerate().map(|(rank, &idx)| (idx, rank + 1)).collect();

        for i in 0..list.level {
            let mut x = HEAD;
            let mut at = 0;
            while let Some(next) = list.nodes[x].levels[i].next {
                let expected = position[&next] - at;
                assert_eq!(list.nodes[x].levels[i].span, expected, "span at level {}", i);
                at = position[&next];
                x = next;
            }
        }
    }

    fn members<R: RngCore>(list: &SkipList<R>) -> Vec<Vec<u8>> {
        list.iter().map(|(m, _)| m.to_vec()).collect()
    }

    #[test]
    fn test_basic_operations() {
        let mut list = SkipList::with_seed(7);

        assert!(list.insert(1.0, b"one".to_vec()));
        assert!(list.insert(2.0, b"two".to_vec()));
        assert!(list.insert(3.0, b"three".to_vec()));
        assert_eq!(list.len(), 3);

        assert_eq!(list.score(b"two"), Some(2.0));
        assert_eq!(list.score(b"four"), None);

        // Same score again is not a new member
        assert!(!list.insert(2.0, b"two".to_vec()));
        assert_eq!(list.len(), 3);
        assert_consistent(&list);
    }

    #[test]
    fn test_score_update_moves_member() {
        let mut list = SkipList::with_seed(1);
        list.insert(1.0, b"a".to_vec());
        list.insert(2.0, b"b".to_vec());
        list.insert(3.0, b"c".to_vec());

        assert!(!list.insert(10.0, b"a".to_vec()));
        assert_eq!(members(&list), vec![b"b".to_vec(), b"c".to_vec(), b"a".to_vec()]);
        assert_eq!(list.len(), 3);
        assert_eq!(list.rank(b"a"), Some(2));
        assert_consistent(&list);
    }

    #[test]
    fn test_ranking() {
        let mut list = SkipList::with_seed(3);
        list.insert(10.0, b"a".to_vec());
        list.insert(20.0, b"b".to_vec());
        list.insert(30.0, b"c".to_vec());
        list.insert(40.0, b"d".to_vec());

        assert_eq!(list.rank(b"a"), Some(0));
        assert_eq!(list.rank(b"c"), Some(2));
        assert_eq!(list.rank(b"d"), Some(3));
        assert_eq!(list.rank(b"zz"), None);
    }

    #[test]
    fn test_range_by_rank() {
        let mut list = SkipList::with_seed(11);
        for (i, m) in ["a", "b", "c", "d", "e"].iter().enumerate() {
            list.insert(i as f64, m.as_bytes().to_vec());
        }

        let names = |r: Vec<(&[u8], f64)>| -> Vec<String> {
            r.into_iter().map(|(m, _)| String::from_utf8_lossy(m).into_owned()).collect()
        };

        assert_eq!(names(list.range_by_rank(0, -1)), vec!["a", "b", "c", "d", "e"]);
        assert_eq!(names(list.range_by_rank(1, 2)), vec!["b", "c"]);
        assert_eq!(names(list.range_by_rank(-2, -1)), vec!["d", "e"]);
        assert_eq!(names(list.range_by_rank(-100, 0)), vec!["a"]);
        assert_eq!(names(list.range_by_rank(3, 100)), vec!["d", "e"]);
        assert!(list.range_by_rank(5, 10).is_empty());
        assert!(list.range_by_rank(3, 1).is_empty());
        assert!(list.range_by_rank(0, -10).is_empty());
    }

    #[test]
    fn test_removal() {
        let mut list = SkipList::with_seed(5);
        list.insert(1.0, b"a".to_vec());
        list.insert(2.0, b"b".to_vec());
        list.insert(3.0, b"c".to_vec());

        assert!(!list.delete(9.0, b"b"));
        assert!(list.delete(2.0, b"b"));
        assert!(!list.delete(2.0, b"b"));
        assert_eq!(list.remove(b"c"), Some(3.0));
        assert_eq!(list.remove(b"c"), None);
        assert_eq!(members(&list), vec![b"a".to_vec()]);
        assert_consistent(&list);

        assert!(list.delete(1.0, b"a"));
        assert!(list.is_empty());
        assert_eq!(list.iter_rev().count(), 0);
        assert_consistent(&list);
    }

    #[test]
    fn test_same_scores() {
        let mut list = SkipList::with_seed(9);
        list.insert(1.0, b"c".to_vec());
        list.insert(1.0, b"a".to_vec());
        list.insert(1.0, b"b".to_vec());

        assert_eq!(members(&list), vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
        assert_eq!(list.rank(b"b"), Some(1));
    }

    #[test]
    fn test_reverse_iteration() {
        let mut list = SkipList::with_seed(2);
        for i in 0..50 {
            list.insert(i as f64, format!("m{:02}", i).into_bytes());
        }
        let forward: Vec<f64> = list.iter().map(|(_, s)| s).collect();
        let mut backward: Vec<f64> = list.iter_rev().map(|(_, s)| s).collect();
        backward.reverse();
        assert_eq!(forward, backward);

        let from_rank: Vec<f64> = list.iter_rev_from_rank(10).map(|(_, s)| s).collect();
        assert_eq!(from_rank.len(), 11);
        assert_eq!(from_rank[0], 10.0);
    }

    #[test]
    fn test_bounded_seek() {
        let mut list = SkipList::with_seed(4);
        for i in 0..100 {
            list.insert(i as f64, format!("{:03}", i).into_bytes());
        }

        let first = list.iter_from(|score, _| score < 42.5).next();
        assert_eq!(first.map(|(_, s)| s), Some(43.0));

        let last = list.iter_rev_from(|score, _| score > 17.0).next();
        assert_eq!(last.map(|(_, s)| s), Some(17.0));

        assert!(list.iter_from(|score, _| score < 1000.0).next().is_none());
        assert!(list.iter_rev_from(|score, _| score > -1.0).next().is_none());
    }

    #[test]
    fn test_matches_ordered_model() {
        let mut list = SkipList::with_seed(42);
        let mut model: BTreeSet<(i64, Vec<u8>)> = BTreeSet::new();
        let mut scores: HashMap<Vec<u8>, i64> = HashMap::new();
        let mut rng = StdRng::seed_from_u64(99);

        for _ in 0..2000 {
            let member = format!("k{}", rng.gen_range(0..200)).into_bytes();
            let score = rng.gen_range(-50..50);
            if rng.gen_bool(0.7) {
                let fresh = list.insert(score as f64, member.clone());
                let previous = scores.insert(member.clone(), score);
                assert_eq!(fresh, previous.is_none());
                if let Some(old) = previous {
                    model.remove(&(old, member.clone()));
                }
                model.insert((score, member));
            } else {
                let removed = list.remove(&member);
                let expected = scores.remove(&member);
                assert_eq!(removed, expected.map(|s| s as f64));
                if let Some(old) = expected {
                    model.remove(&(old, member));
                }
            }
        }

        assert_consistent(&list);
        let expected: Vec<Vec<u8>> = model.iter().map(|(_, m)| m.clone()).collect();
        assert_eq!(members(&list), expected);
        for (rank, (_, member)) in model.iter().enumerate() {
            assert_eq!(list.rank(member), Some(rank));
        }
    }

    #[test]
    fn test_levels_stay_bounded() {
        let mut list = SkipList::with_seed(8);
        for i in 0..10_000 {
            list.insert(i as f64, i.to_string().into_bytes());
        }
        assert!(list.level <= MAX_LEVEL);
        // With p = 0.25 the expected height for 10k elements is about 7
        assert!(list.level < 16);
        assert_eq!(list.iter_from_rank(9_999).next().map(|(_, s)| s), Some(9_999.0));
    }
}
