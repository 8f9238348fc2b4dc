//! Sorted set value type
//!
//! A sorted set pairs the skip list (ordering) with its member index
//! (membership and score lookups). All three range shapes position
//! themselves with a skip list descent and then walk only the elements
//! they return.

use crate::error::{CommandError, StorageError};
use crate::options::{Limit, RangeKind, ZAddOptions, ZRangeOptions};
use crate::storage::skiplist::SkipList;

/// A member together with its score, as returned by range queries
#[derive(Debug, Clone, PartialEq)]
pub struct ZMember {
    pub member: Vec<u8>,
    pub score: f64,
}

impl ZMember {
    fn from_entry((member, score): (&[u8], f64)) -> Self {
        ZMember {
            member: member.to_vec(),
            score,
        }
    }
}

/// What an add did to a single member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The member was new
    Added,
    /// The member existed and its score changed
    Updated,
    /// Nothing changed, either because a guard skipped the member or
    /// because the score was already the same
    Unchanged,
}

/// One end of a score interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreBound {
    Inclusive(f64),
    Exclusive(f64),
}

/// Score interval for BYSCORE queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreRange {
    pub min: ScoreBound,
    pub max: ScoreBound,
}

impl ScoreRange {
    /// Parse `min` and `max` as written on the wire: a float, optionally
    /// prefixed with `(` for an exclusive end; `-inf` and `+inf` allowed
    pub fn parse(min: &[u8], max: &[u8]) -> Result<Self, CommandError> {
        Ok(ScoreRange {
            min: parse_score_bound(min)?,
            max: parse_score_bound(max)?,
        })
    }

    pub fn inclusive(min: f64, max: f64) -> Self {
        ScoreRange {
            min: ScoreBound::Inclusive(min),
            max: ScoreBound::Inclusive(max),
        }
    }

    fn below_min(&self, score: f64) -> bool {
        match self.min {
            ScoreBound::Inclusive(min) => score < min,
            ScoreBound::Exclusive(min) => score <= min,
        }
    }

    fn above_max(&self, score: f64) -> bool {
        match self.max {
            ScoreBound::Inclusive(max) => score > max,
            ScoreBound::Exclusive(max) => score >= max,
        }
    }
}

/// One end of a lexicographic interval
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexBound {
    /// `-`, before every member
    Min,
    /// `+`, after every member
    Max,
    Inclusive(Vec<u8>),
    Exclusive(Vec<u8>),
}

/// Member interval for BYLEX queries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexRange {
    pub min: LexBound,
    pub max: LexBound,
}

impl LexRange {
    /// Parse `min` and `max` as written on the wire: `[x` inclusive,
    /// `(x` exclusive, `-` and `+` unbounded; a bare value is inclusive
    pub fn parse(min: &[u8], max: &[u8]) -> Result<Self, CommandError> {
        Ok(LexRange {
            min: parse_lex_bound(min)?,
            max: parse_lex_bound(max)?,
        })
    }

    fn below_min(&self, member: &[u8]) -> bool {
        match &self.min {
            LexBound::Min => false,
            LexBound::Max => true,
            LexBound::Inclusive(min) => member < min.as_slice(),
            LexBound::Exclusive(min) => member <= min.as_slice(),
        }
    }

    fn above_max(&self, member: &[u8]) -> bool {
        match &self.max {
            LexBound::Max => false,
            LexBound::Min => true,
            LexBound::Inclusive(max) => member > max.as_slice(),
            LexBound::Exclusive(max) => member >= max.as_slice(),
        }
    }

    fn contains(&self, member: &[u8]) -> bool {
        !self.below_min(member) && !self.above_max(member)
    }
}

/// A decoded ZRANGE `start stop` pair
#[derive(Debug, Clone, PartialEq)]
pub enum RangeSpec {
    Rank(i64, i64),
    Score(ScoreRange),
    Lex(LexRange),
}

impl RangeSpec {
    /// Interpret the raw arguments according to the range kind
    pub fn parse(kind: RangeKind, start: &[u8], stop: &[u8]) -> Result<Self, CommandError> {
        match kind {
            RangeKind::Rank => Ok(RangeSpec::Rank(parse_rank(start)?, parse_rank(stop)?)),
            RangeKind::Score => ScoreRange::parse(start, stop).map(RangeSpec::Score),
            RangeKind::Lex => LexRange::parse(start, stop).map(RangeSpec::Lex),
        }
    }
}

/// Parse a score argument, rejecting NaN
pub fn parse_score(raw: &[u8]) -> Option<f64> {
    let text = std::str::from_utf8(raw).ok()?;
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|score| !score.is_nan())
}

fn parse_rank(raw: &[u8]) -> Result<i64, CommandError> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or(CommandError::NotInteger)
}

fn parse_score_bound(raw: &[u8]) -> Result<ScoreBound, CommandError> {
    match raw.split_first() {
        Some((b'(', rest)) => parse_score(rest)
            .map(ScoreBound::Exclusive)
            .ok_or(CommandError::InvalidScoreRange),
        _ => parse_score(raw)
            .map(ScoreBound::Inclusive)
            .ok_or(CommandError::InvalidScoreRange),
    }
}

fn parse_lex_bound(raw: &[u8]) -> Result<LexBound, CommandError> {
    match raw {
        b"-" => Ok(LexBound::Min),
        b"+" => Ok(LexBound::Max),
        [b'[', rest @ ..] => Ok(LexBound::Inclusive(rest.to_vec())),
        [b'(', rest @ ..] => Ok(LexBound::Exclusive(rest.to_vec())),
        [] => Err(CommandError::InvalidLexRange),
        bare => Ok(LexBound::Inclusive(bare.to_vec())),
    }
}

/// Sorted set: unique members ordered by (score, member)
#[derive(Debug, Clone)]
pub struct SortedSet {
    entries: SkipList,
}

impl Default for SortedSet {
    fn default() -> Self {
        Self::new()
    }
}

impl SortedSet {
    pub fn new() -> Self {
        SortedSet {
            entries: SkipList::new(),
        }
    }

    /// Sorted set whose skip list levels are drawn from a seeded generator
    pub fn with_seed(seed: u64) -> Self {
        SortedSet {
            entries: SkipList::with_seed(seed),
        }
    }

    /// Unconditionally upsert a member
    pub fn add(&mut self, member: Vec<u8>, score: f64) -> AddOutcome {
        match self.entries.score(&member) {
            Some(old) if old == score => AddOutcome::Unchanged,
            Some(_) => {
                self.entries.insert(score, member);
                AddOutcome::Updated
            }
            None => {
                self.entries.insert(score, member);
                AddOutcome::Added
            }
        }
    }

    /// Upsert a member honoring the NX / XX / GT / LT guards
    pub fn add_with(&mut self, member: Vec<u8>, score: f64, opts: &ZAddOptions) -> AddOutcome {
        match self.entries.score(&member) {
            Some(_) if opts.is_nx() => AddOutcome::Unchanged,
            None if opts.is_xx() => AddOutcome::Unchanged,
            Some(old) if opts.is_gt() && score <= old => AddOutcome::Unchanged,
            Some(old) if opts.is_lt() && score >= old => AddOutcome::Unchanged,
            _ => self.add(member, score),
        }
    }

    pub fn score(&self, member: &[u8]) -> Option<f64> {
        self.entries.score(member)
    }

    pub fn rank(&self, member: &[u8]) -> Option<usize> {
        self.entries.rank(member)
    }

    pub fn remove(&mut self, member: &[u8]) -> bool {
        self.entries.remove(member).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run a ZRANGE-shaped query
    pub fn range(&self, spec: &RangeSpec, opts: &ZRangeOptions) -> Result<Vec<ZMember>, StorageError> {
        match spec {
            RangeSpec::Rank(start, stop) => Ok(self.range_by_rank(*start, *stop, opts.is_rev())),
            RangeSpec::Score(range) => self.range_by_score(range, opts.is_rev(), opts.limit()),
            RangeSpec::Lex(range) => self.range_by_lex(range, opts.is_rev(), opts.limit()),
        }
    }

    /// Members between two ranks; with `rev`, rank 0 is the highest member
    pub fn range_by_rank(&self, start: i64, stop: i64, rev: bool) -> Vec<ZMember> {
        if !rev {
            return self
                .entries
                .range_by_rank(start, stop)
                .into_iter()
                .map(ZMember::from_entry)
                .collect();
        }

        let (start, stop) = match self.entries.resolve_ranks(start, stop) {
            Some(window) => window,
            None => return Vec::new(),
        };
        let from = self.entries.len() - 1 - start;
        self.entries
            .iter_rev_from_rank(from)
            .take(stop - start + 1)
            .map(ZMember::from_entry)
            .collect()
    }

    /// Members with a score inside `range`, ascending or descending
    pub fn range_by_score(
        &self,
        range: &ScoreRange,
        rev: bool,
        limit: Option<Limit>,
    ) -> Result<Vec<ZMember>, StorageError> {
        if rev {
            let hits = self
                .entries
                .iter_rev_from(|score, _| range.above_max(score))
                .take_while(|&(_, score)| !range.below_min(score));
            apply_limit(hits, limit)
        } else {
            let hits = self
                .entries
                .iter_from(|score, _| range.below_min(score))
                .take_while(|&(_, score)| !range.above_max(score));
            apply_limit(hits, limit)
        }
    }

    /// Members inside a byte-wise interval, ascending or descending
    ///
    /// Members are only byte-ordered within one score, so a set holding
    /// several distinct scores is filtered in full instead of seeked.
    pub fn range_by_lex(
        &self,
        range: &LexRange,
        rev: bool,
        limit: Option<Limit>,
    ) -> Result<Vec<ZMember>, StorageError> {
        if !self.has_single_score() {
            let mut hits: Vec<_> = self
                .entries
                .iter()
                .filter(|&(member, _)| range.contains(member))
                .collect();
            hits.sort_by(|a, b| a.0.cmp(b.0));
            if rev {
                hits.reverse();
            }
            return apply_limit(hits.into_iter(), limit);
        }

        if rev {
            let hits = self
                .entries
                .iter_rev_from(|_, member| range.above_max(member))
                .take_while(|&(member, _)| !range.below_min(member));
            apply_limit(hits, limit)
        } else {
            let hits = self
                .entries
                .iter_from(|_, member| range.below_min(member))
                .take_while(|&(member, _)| !range.above_max(member));
            apply_limit(hits, limit)
        }
    }

    /// True when the lowest and highest scores coincide
    fn has_single_score(&self) -> bool {
        match (self.entries.iter().next(), self.entries.iter_rev().next()) {
            (Some((_, low)), Some((_, high))) => low == high,
            _ => true,
        }
    }
}

fn apply_limit<'a, I>(hits: I, limit: Option<Limit>) -> Result<Vec<ZMember>, StorageError>
where
    I: Iterator<Item = (&'a [u8], f64)>,
{
    let (offset, count) = match limit {
        None => (0, usize::MAX),
        Some(Limit { offset, .. }) if offset < 0 => {
            return Err(StorageError::InvalidArgument(
                "LIMIT offset must not be negative".into(),
            ))
        }
        Some(Limit { offset, count }) if count < 0 => (offset as usize, usize::MAX),
        Some(Limit { offset, count }) => (offset as usize, count as usize),
    };

    Ok(hits.skip(offset).take(count).map(ZMember::from_entry).collect())
}
