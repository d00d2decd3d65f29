//! Per-goroutine fast PRNG.
//!
//! Xorshift over two 32-bit words, with Lemire's multiply-shift to map into a range.
//! https://www.jstatsoft.org/article/view/v008i14/xorshift.pdf
//! https://lemire.me/blog/2016/06/27/a-fast-alternative-to-the-modulo-reduction/

use std::sync::atomic::{AtomicU64, Ordering};

/// Source of unique seeds, never repeats within a process.
static SEED: AtomicU64 = AtomicU64::new(0x9E37_79B9_7F4A_7C15);

#[derive(Debug, Clone)]
pub(crate) struct FastRand {
    x: u32,
    y: u32,
}

impl FastRand {
    /// Seeds from a process-wide counter.
    pub(crate) fn new() -> Self {
        let seed = SEED.fetch_add(0x9E37_79B9_7F4A_7C15, Ordering::Relaxed);
        Self::from_seed(seed)
    }

    pub(crate) fn from_seed(seed: u64) -> Self {
        let seed = splitmix64(seed);
        let x = (seed >> 32) as u32;
        let y = seed as u32;

        // xorshift is stuck at zero
        if x | y == 0 {
            return FastRand { x: 0, y: 1 };
        }

        FastRand { x, y }
    }

    /// Uniform value in `0..n`.
    pub(crate) fn below(&mut self, n: u32) -> u32 {
        let mut x = self.x;
        let y = self.y;
        x ^= x << 17;
        x = x ^ y ^ (x >> 7) ^ (y >> 16);
        self.x = y;
        self.y = x;

        ((u64::from(self.x.wrapping_add(self.y)) * u64::from(n)) >> 32) as u32
    }

    /// Random permutation of `0..count` (inside-out Fisher-Yates).
    pub(crate) fn permutation(&mut self, count: usize) -> Vec<usize> {
        let mut indices = vec![0; count];
        for i in 1..count {
            let j = self.below(i as u32 + 1) as usize;
            indices[i] = indices[j];
            indices[j] = i;
        }
        indices
    }
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
