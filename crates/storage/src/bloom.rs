//! Per-column term bloom filters published with a split.
//!
//! Tokenized columns index the lowercase alphanumeric tokens produced by
//! [`tokenize`]; other string columns index whole values. False positives are
//! possible, false negatives are not.

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64_with_seed;

const SEED1: u64 = 0x9e37_79b9_7f4a_7c15;
const SEED2: u64 = 0xd1b5_4a32_d192_ed03;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermBloomFilter {
    bits: Vec<u64>,
    hash_count: u8,
}

impl TermBloomFilter {
    /// Empty filter of `2^log2_bits` bits (clamped to `6..=26`).
    pub fn new(log2_bits: u8, hash_count: u8) -> Self {
        let bit_count = 1usize << log2_bits.clamp(6, 26);
        Self {
            bits: vec![0_u64; bit_count.div_ceil(64)],
            hash_count: hash_count.max(1),
        }
    }

    pub fn from_terms<I, S>(terms: I, log2_bits: u8) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filter = Self::new(log2_bits, 3);
        for term in terms {
            filter.insert(term.as_ref());
        }
        filter
    }

    pub fn insert(&mut self, term: &str) {
        let bit_count = self.bit_count();
        if bit_count == 0 {
            return;
        }
        for bit in bit_positions(term, self.hash_count, bit_count) {
            self.bits[(bit / 64) as usize] |= 1_u64 << (bit % 64);
        }
    }

    /// `false` only when `term` was never inserted.
    ///
    /// A filter without bits (for example a truncated log entry) answers `true`.
    pub fn may_contain(&self, term: &str) -> bool {
        let bit_count = self.bit_count();
        if bit_count == 0 {
            return true;
        }
        bit_positions(term, self.hash_count, bit_count)
            .all(|bit| self.bits[(bit / 64) as usize] & (1_u64 << (bit % 64)) != 0)
    }

    fn bit_count(&self) -> u64 {
        self.bits.len() as u64 * 64
    }
}

fn bit_positions(term: &str, hash_count: u8, bit_count: u64) -> impl Iterator<Item = u64> {
    let h1 = xxh3_64_with_seed(term.as_bytes(), SEED1);
    let h2 = xxh3_64_with_seed(term.as_bytes(), SEED2) | 1;
    (0..u64::from(hash_count.max(1))).map(move |i| h1.wrapping_add(i.wrapping_mul(h2)) % bit_count)
}

/// Splits free text into lowercase alphanumeric tokens, the way tokenized
/// columns are indexed.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}
