use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::{GenomeError, Result};

/// A short regulatory sequence, stored as its index in the lexicographically
/// ordered space of all sequences of a given length over a given alphabet.
///
/// Sequences are plain values: copying an element copies its sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ShortSeq(pub u32);

/// The space all short sequences of a run live in.
#[derive(Clone, Debug)]
pub struct ShortSeqSpace {
    alphabet: Vec<u8>,
    length: usize,
    size: u32,
    /// Probability that a sequence receives a point mutation in one call.
    mutation_rate: f64,
    max_hamming: usize,
}

impl ShortSeqSpace {
    /// `point_rate` is the per-symbol rate; it is folded into a
    /// per-sequence probability `1 - (1 - point_rate)^length`.
    pub fn new(alphabet: &str, length: usize, point_rate: f64, max_hamming: usize) -> Result<Self> {
        let mut symbols: Vec<u8> = alphabet.bytes().collect();
        symbols.sort_unstable();
        symbols.dedup();
        if symbols.len() < 2 {
            return Err(GenomeError::ShortSeqSpace(format!(
                "alphabet {alphabet:?} needs at least two distinct symbols"
            )));
        }
        if !alphabet.is_ascii() {
            return Err(GenomeError::ShortSeqSpace(format!(
                "alphabet {alphabet:?} must be ascii"
            )));
        }
        if length == 0 {
            return Err(GenomeError::ShortSeqSpace("length must be positive".into()));
        }
        if !(0.0..=1.0).contains(&point_rate) {
            return Err(GenomeError::InvalidRate {
                name: "point_mut",
                value: point_rate,
            });
        }
        let size = (symbols.len() as u64)
            .checked_pow(length as u32)
            .filter(|n| *n <= u32::MAX as u64)
            .ok_or_else(|| {
                GenomeError::ShortSeqSpace(format!(
                    "{} symbols of length {length} do not fit the sequence space",
                    symbols.len()
                ))
            })? as u32;
        Ok(Self {
            alphabet: symbols,
            length,
            size,
            mutation_rate: 1.0 - (1.0 - point_rate).powi(length as i32),
            max_hamming,
        })
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Number of distinct sequences in the space.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn max_hamming(&self) -> usize {
        self.max_hamming
    }

    /// Draw a sequence uniformly from the space.
    pub fn random(&self, rng: &mut dyn RngCore) -> ShortSeq {
        ShortSeq(rng.gen_range(0..self.size))
    }

    /// Possibly apply one point mutation. Returns the (new) sequence and the
    /// number of point mutations applied.
    pub fn mutate(&self, seq: ShortSeq, rng: &mut dyn RngCore) -> (ShortSeq, u32) {
        if self.mutation_rate <= f64::EPSILON {
            return (seq, 0);
        }
        if rng.gen::<f64>() >= self.mutation_rate {
            return (seq, 0);
        }
        let mut digits = self.digits(seq);
        let pos = rng.gen_range(0..self.length);
        let k = self.alphabet.len();
        // always a different symbol
        let offset = rng.gen_range(1..k);
        digits[pos] = (digits[pos] + offset) % k;
        (self.encode(&digits), 1)
    }

    /// Two sequences are similar when their Hamming distance does not
    /// exceed `max_hamming`.
    pub fn similar(&self, a: ShortSeq, b: ShortSeq) -> bool {
        self.hamming(a, b) <= self.max_hamming
    }

    pub fn hamming(&self, a: ShortSeq, b: ShortSeq) -> usize {
        self.digits(a)
            .iter()
            .zip(self.digits(b).iter())
            .filter(|(x, y)| x != y)
            .count()
    }

    pub fn render(&self, seq: ShortSeq) -> String {
        self.digits(seq)
            .into_iter()
            .map(|d| self.alphabet[d] as char)
            .collect()
    }

    pub fn parse(&self, text: &str) -> Result<ShortSeq> {
        if text.len() != self.length {
            return Err(GenomeError::ShortSeqLength {
                seq: text.to_string(),
                expected: self.length,
            });
        }
        let mut digits = Vec::with_capacity(self.length);
        for c in text.chars() {
            let d = self
                .alphabet
                .iter()
                .position(|s| *s as char == c)
                .ok_or_else(|| GenomeError::UnknownSymbol {
                    symbol: c,
                    alphabet: String::from_utf8_lossy(&self.alphabet).into_owned(),
                })?;
            digits.push(d);
        }
        Ok(self.encode(&digits))
    }

    // Most significant digit first, so index order is lexicographic order.
    fn digits(&self, seq: ShortSeq) -> Vec<usize> {
        let k = self.alphabet.len() as u32;
        let mut out = vec![0usize; self.length];
        let mut rest = seq.0 % self.size;
        for d in out.iter_mut().rev() {
            *d = (rest % k) as usize;
            rest /= k;
        }
        out
    }

    fn encode(&self, digits: &[usize]) -> ShortSeq {
        let k = self.alphabet.len() as u32;
        ShortSeq(digits.iter().fold(0u32, |acc, d| acc * k + *d as u32))
    }
}

impl Default for ShortSeqSpace {
    fn default() -> Self {
        Self {
            alphabet: b"acgt".to_vec(),
            length: 4,
            size: 256,
            mutation_rate: 1.0 - (1.0 - 1e-5f64).powi(4),
            max_hamming: 0,
        }
    }
}
