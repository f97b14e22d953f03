//! Double-array trie: a compact, array-backed encoding of a byte-keyed set
//! that supports O(key length) common-prefix search.
//!
//! This is a from-scratch implementation of the classic Aoe double-array
//! construction algorithm (base/check arrays, dynamic conflict resolution
//! by relocating a state's whole outgoing-edge set). It stores no payload
//! per key — see `dictionary::lexicon::SurfaceIndex` for the surface → entry-id
//! mapping that sits on top of it.
use std::fmt;

use rkyv::{Archive, Deserialize, Serialize};

use crate::errors::{Result, ComugiError};

/// Cell value meaning "this cell is free."
const UNUSED: i64 = 0;
/// Sentinel `base` value for a terminal state with no outgoing edges.
const END: i64 = i64::MIN;

/// One block of newly allocated cells when the arrays need to grow.
const BLOCK_SIZE: usize = 0xFFFF;
/// Growth is triggered once `|base[s]| + 255` approaches this fraction of capacity.
const GROWTH_THRESHOLD: f64 = 0.9;

/// A byte-keyed double-array trie supporting common-prefix search.
///
/// Index 0 is unused; the root state is index 1.
#[derive(Archive, Serialize, Deserialize, Debug)]
pub struct DoubleArray {
    base: Vec<i64>,
    check: Vec<i64>,
    /// Smallest index ever considered a candidate free-cell base. Monotonically
    /// advances during `build` and is never rewound, since cells behind it are
    /// in practice never reclaimed and rescanning them is wasted work.
    start_point: usize,
}

impl Default for DoubleArray {
    fn default() -> Self {
        Self {
            base: vec![UNUSED; BLOCK_SIZE],
            check: vec![UNUSED; BLOCK_SIZE],
            start_point: 1,
        }
    }
}

impl DoubleArray {
    /// Creates an empty trie.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the trie from a key set. Keys need not be sorted; inserting
    /// a duplicate key is a no-op.
    pub fn build<K, I>(&mut self, keys: I)
    where
        K: AsRef<[u8]>,
        I: IntoIterator<Item = K>,
    {
        for key in keys {
            self.insert(key.as_ref());
        }
    }

    fn extend_by_block(&mut self) {
        self.base.resize(self.base.len() + BLOCK_SIZE, UNUSED);
        self.check.resize(self.check.len() + BLOCK_SIZE, UNUSED);
    }

    fn ensure_capacity(&mut self, cell: usize) {
        while (cell as f64) >= GROWTH_THRESHOLD * (self.base.len() as f64) {
            self.extend_by_block();
        }
    }

    /// Inserts a single key. Idempotent for duplicate keys.
    pub fn insert(&mut self, key: &[u8]) {
        let mut s: usize = 1;
        for &byte in key {
            let b = byte as i64;
            let cur_base = self.base[s];

            if cur_base == UNUSED || cur_base == END {
                // s has no outgoing edges yet: only byte `b` needs a home.
                let x = self.search_free_position(&[b]);
                self.base[s] = if cur_base == END { -x } else { x };
                self.check[(x + b) as usize] = s as i64;
                s = (x + b) as usize;
                continue;
            }

            let check_pos = (cur_base.abs() + b) as usize;
            self.ensure_capacity(check_pos);

            match self.check[check_pos] {
                UNUSED => {
                    self.check[check_pos] = s as i64;
                    s = check_pos;
                }
                c if c == s as i64 => {
                    // Edge already exists.
                    s = check_pos;
                }
                _ => {
                    // Conflict: relocate every outgoing edge of `s` (including `b`)
                    // to a base that can host the whole set.
                    let (conflict_indices, conflict_bytes) = self.collect_conflict(s, b);
                    let x = self.search_free_position(&conflict_bytes);
                    self.resolve_conflict(s, x, &conflict_indices, &conflict_bytes);
                    s = (self.base[s].abs() + b) as usize;
                }
            }
        }

        if self.base[s] == UNUSED {
            self.base[s] = END;
        } else if self.base[s] != END {
            // END is already terminal with no outgoing edges; `.abs()` would
            // overflow on i64::MIN, and re-marking it terminal is a no-op anyway.
            self.base[s] = -self.base[s].abs();
        }
    }

    /// Scans the full byte range to find every byte currently outgoing from
    /// `s` (state `base[s]`'s children whose `check` points back at `s`),
    /// plus the new byte `new_byte` that triggered the conflict.
    fn collect_conflict(&mut self, s: usize, new_byte: i64) -> (Vec<usize>, Vec<i64>) {
        let cur_base = self.base[s].abs() as usize;
        self.ensure_capacity(cur_base + 255);

        let mut indices = Vec::new();
        let mut bytes = vec![new_byte];
        for byte in 0..256i64 {
            let idx = cur_base + byte as usize;
            if self.check[idx] == s as i64 {
                indices.push(idx);
                bytes.push(byte);
            }
        }
        (indices, bytes)
    }

    /// Finds a base `x` such that `x + b` is free for every `b` in `bytes`.
    fn search_free_position(&mut self, bytes: &[i64]) -> i64 {
        let max_byte = *bytes.iter().max().unwrap_or(&0);
        let mut x = self.start_point as i64;
        loop {
            self.ensure_capacity((x + max_byte) as usize);
            if bytes.iter().all(|&b| self.check[(x + b) as usize] == UNUSED) {
                break;
            }
            x += 1;
        }
        self.start_point = x as usize;
        x
    }

    /// Relocates state `s`'s whole outgoing-edge set (currently rooted at
    /// `base[s]`) to the new base `x`, rewriting every grandchild's `check`
    /// to point at the relocated child cell, then frees the old cells.
    fn resolve_conflict(&mut self, s: usize, x: i64, indices: &[usize], bytes: &[i64]) {
        self.base[s] = if self.base[s] < 0 { -x } else { x };

        for &b in bytes {
            self.check[(x + b) as usize] = s as i64;
        }

        // bytes[0] is the newly-conflicting byte, which has no prior grandchild
        // state to migrate; bytes[1..] line up with `indices`.
        for (&old_idx, &b) in indices.iter().zip(bytes[1..].iter()) {
            let new_idx = (x + b) as usize;
            self.base[new_idx] = self.base[old_idx];

            if self.base[old_idx] != END {
                let grandchild_base = self.base[old_idx].abs() as usize;
                let scan_hi = grandchild_base + 255;
                if scan_hi < self.check.len() {
                    for gc in grandchild_base..=scan_hi {
                        if self.check[gc] == old_idx as i64 {
                            self.check[gc] = new_idx as i64;
                        }
                    }
                }
            }
        }

        for &old_idx in indices {
            self.base[old_idx] = UNUSED;
            self.check[old_idx] = UNUSED;
        }
    }

    /// Returns every prefix of `query` that is a stored key, in increasing
    /// length order, as UTF-8 decoded strings.
    pub fn search(&self, query: &[u8]) -> Vec<String> {
        let mut result = Vec::new();
        let mut s: usize = 1;
        for (i, &byte) in query.iter().enumerate() {
            let b = byte as i64;
            let t = match self.base.get(s) {
                Some(&base) if base != UNUSED && base != END => (base.abs() + b) as usize,
                _ => break,
            };
            if self.check.get(t).copied() != Some(s as i64) {
                break;
            }
            s = t;
            if self.base[s] < 0 {
                // SAFETY-free: query is valid input bytes (caller guarantees UTF-8),
                // and a terminal hit always lands on a UTF-8 character boundary
                // since only valid UTF-8 keys were ever inserted.
                if let Ok(text) = std::str::from_utf8(&query[..=i]) {
                    result.push(text.to_string());
                }
                if self.base[s] == END {
                    break;
                }
            }
        }
        result
    }

    /// Serializes the trie to the stable, bit-exact text format: two lines,
    /// each a comma-separated decimal integer list (`base` then `check`).
    pub fn save_text<W: std::fmt::Write>(&self, mut w: W) -> Result<()> {
        let base_line = self
            .base
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let check_line = self
            .check
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        writeln!(w, "{base_line}").map_err(|e| ComugiError::invalid_state("writing double array", e.to_string()))?;
        write!(w, "{check_line}").map_err(|e| ComugiError::invalid_state("writing double array", e.to_string()))?;
        Ok(())
    }

    /// Loads a trie previously produced by `save_text`.
    pub fn load_text(text: &str) -> Result<Self> {
        let mut lines = text.lines();
        let base_line = lines
            .next()
            .ok_or_else(|| ComugiError::invalid_format("double_array", "missing base line"))?;
        let check_line = lines
            .next()
            .ok_or_else(|| ComugiError::invalid_format("double_array", "missing check line"))?;

        let parse = |line: &str| -> Result<Vec<i64>> {
            if line.is_empty() {
                return Ok(Vec::new());
            }
            line.split(',')
                .map(|tok| {
                    tok.trim()
                        .parse::<i64>()
                        .map_err(|e| ComugiError::invalid_format("double_array", e.to_string()))
                })
                .collect()
        };

        let base = parse(base_line)?;
        let check = parse(check_line)?;
        if base.len() != check.len() {
            return Err(ComugiError::invalid_format(
                "double_array",
                "base/check length mismatch",
            ));
        }
        let start_point = 1;
        Ok(Self { base, check, start_point })
    }
}

impl fmt::Display for DoubleArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DoubleArray(len={})", self.base.len())
    }
}

impl ArchivedDoubleArray {
    /// Returns every prefix of `query` that is a stored key, in increasing
    /// length order, as UTF-8 decoded strings. Mirrors `DoubleArray::search`
    /// for the zero-copy archived representation.
    pub fn search(&self, query: &[u8]) -> Vec<String> {
        let mut result = Vec::new();
        let mut s: usize = 1;
        for (i, &byte) in query.iter().enumerate() {
            let b = byte as i64;
            let t = match self.base.get(s) {
                Some(base) => {
                    let base = base.to_native();
                    if base == UNUSED || base == END {
                        break;
                    }
                    (base.abs() + b) as usize
                }
                None => break,
            };
            match self.check.get(t) {
                Some(c) if c.to_native() == s as i64 => {}
                _ => break,
            }
            s = t;
            let base_s = self.base[s].to_native();
            if base_s < 0 {
                if let Ok(text) = std::str::from_utf8(&query[..=i]) {
                    result.push(text.to_string());
                }
                if base_s == END {
                    break;
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(keys: &[&str]) -> DoubleArray {
        let mut da = DoubleArray::new();
        da.build(keys.iter().map(|k| k.as_bytes()));
        da
    }

    #[test]
    fn prefix_chain_ascii() {
        let da = build(&["a", "ab", "abc"]);
        assert_eq!(da.search(b"abcd"), vec!["a", "ab", "abc"]);
    }

    #[test]
    fn prefix_chain_multibyte() {
        let da = build(&["東京", "東京都", "京都"]);
        assert_eq!(da.search("東京都".as_bytes()), vec!["東京", "東京都"]);
        assert_eq!(da.search("京都".as_bytes()), vec!["京都"]);
    }

    #[test]
    fn duplicate_insert_is_idempotent() {
        let once = build(&["x"]);
        let twice = build(&["x", "x"]);
        // Compare up to the shared length; trailing growth blocks may differ
        // in length but must agree on content where both are defined.
        let n = once.base.len().min(twice.base.len());
        assert_eq!(once.base[..n], twice.base[..n]);
        assert_eq!(once.check[..n], twice.check[..n]);
        assert_eq!(once.search(b"x"), twice.search(b"x"));
    }

    #[test]
    fn no_spurious_prefixes() {
        let da = build(&["a", "abc"]);
        // "ab" is not a key; must not appear even though it's a prefix of "abcd".
        assert_eq!(da.search(b"abcd"), vec!["a", "abc"]);
    }

    #[test]
    fn empty_query_and_miss() {
        let da = build(&["a", "ab"]);
        assert!(da.search(b"").is_empty());
        assert!(da.search(b"zzz").is_empty());
    }

    #[test]
    fn completeness_and_soundness_on_larger_set() {
        let keys = ["自然", "言語", "処理", "自然言語", "言語処理", "自然言語処理"];
        let da = build(&keys);
        for k in keys {
            let hits = da.search(k.as_bytes());
            assert!(hits.contains(&k.to_string()), "missing {k} in {hits:?}");
        }
        let hits = da.search("自然言語処理extra".as_bytes());
        for h in &hits {
            assert!(keys.contains(&h.as_str()));
        }
    }

    #[test]
    fn save_load_roundtrip() {
        let da = build(&["a", "ab", "abc", "東京", "東京都"]);
        let mut text = String::new();
        da.save_text(&mut text).unwrap();
        let loaded = DoubleArray::load_text(&text).unwrap();
        for q in ["abcd", "東京都", "京都", "zzz"] {
            assert_eq!(da.search(q.as_bytes()), loaded.search(q.as_bytes()));
        }
    }

    #[test]
    fn many_keys_conflict_heavy() {
        // Deliberately share first bytes across a wide fan-out to exercise
        // the relocation path repeatedly.
        let mut keys = Vec::new();
        for c in 0u8..64 {
            keys.push(format!("prefix{}", c as char));
            keys.push(format!("prefix{}{}", c as char, c as char));
        }
        let mut da = DoubleArray::new();
        da.build(keys.iter().map(|s| s.as_bytes()));
        for k in &keys {
            let hits = da.search(k.as_bytes());
            assert!(hits.contains(k), "missing {k}");
        }
    }
}
