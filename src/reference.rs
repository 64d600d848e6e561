use std::fmt;

/// Expected accumulator values at one logical iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expected {
    pub a: i64,
    pub b: i64,
    pub c: i64,
    pub d: i64,
    pub iteration: u64,
}

impl Expected {
    /// The implicit first iteration: every accumulator at zero.
    pub fn origin() -> Self {
        Self {
            a: 0,
            b: 0,
            c: 0,
            d: 0,
            iteration: 0,
        }
    }

    /// Closed form for iteration `k` of a single-level loop.
    pub fn at(k: u64, iter_stride: i64, one_stride: i64) -> Self {
        let k_signed = k as i64;
        Self {
            a: k_signed.wrapping_mul(iter_stride),
            b: k_signed.wrapping_mul(iter_stride),
            c: k_signed.wrapping_mul(one_stride),
            d: k_signed.wrapping_mul(one_stride),
            iteration: k,
        }
    }

    pub fn accumulators(&self) -> [i64; 4] {
        [self.a, self.b, self.c, self.d]
    }
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a={} b={} c={} d={}", self.a, self.b, self.c, self.d)
    }
}

/// High-level model of a single loop of `nb_iter` iterations.
///
/// Yields the second through last iterations; the all-zero first iteration
/// is the starting state and is not emitted. Once exhausted it stays
/// exhausted.
#[derive(Debug, Clone)]
pub struct Reference {
    current: Expected,
    remaining: u64,
    iter_stride: i64,
    one_stride: i64,
}

impl Reference {
    pub fn new(nb_iter: u32, iter_stride: i64, one_stride: i64) -> Self {
        Self {
            current: Expected::origin(),
            remaining: u64::from(nb_iter.saturating_sub(1)),
            iter_stride,
            one_stride,
        }
    }
}

impl Iterator for Reference {
    type Item = Expected;

    fn next(&mut self) -> Option<Expected> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let prev = self.current;
        self.current = Expected {
            a: prev.a.wrapping_add(self.iter_stride),
            b: prev.b.wrapping_add(self.iter_stride),
            c: prev.c.wrapping_add(self.one_stride),
            d: prev.d.wrapping_add(self.one_stride),
            iteration: prev.iteration + 1,
        };
        Some(self.current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining as usize;
        (n, Some(n))
    }
}

impl std::iter::FusedIterator for Reference {}
