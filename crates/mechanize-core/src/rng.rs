//! Deterministic PRNG for the disposal-bin loot sequence.
//!
//! [`NetRandom`] reproduces the .NET Framework `System.Random` generator
//! bit-for-bit: Knuth's subtractive lagged-Fibonacci algorithm with a
//! 56-entry seed array and two cursors. The disposal machine's reference
//! sequence was produced by that generator, so every detail here is
//! load-bearing, including the `ret == MBIG` decrement and the truncating
//! float-to-int conversions.

const MBIG: i32 = i32::MAX;
const MSEED: i32 = 161_803_398;

/// A .NET-compatible subtractive pseudo-random number generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetRandom {
    seed_array: [i32; 56],
    inext: usize,
    inextp: usize,
}

impl NetRandom {
    pub fn new(seed: i32) -> Self {
        let mut arr = [0i32; 56];
        let subtraction = if seed == i32::MIN {
            i32::MAX
        } else {
            seed.abs()
        };
        let mut mj = MSEED - subtraction;
        arr[55] = mj;
        let mut mk = 1i32;
        for i in 1..55 {
            let ii = (21 * i) % 55;
            arr[ii] = mk;
            mk = mj.wrapping_sub(mk);
            if mk < 0 {
                mk += MBIG;
            }
            mj = arr[ii];
        }
        for _ in 1..5 {
            for i in 1..56 {
                arr[i] = arr[i].wrapping_sub(arr[1 + (i + 30) % 55]);
                if arr[i] < 0 {
                    arr[i] += MBIG;
                }
            }
        }
        Self {
            seed_array: arr,
            inext: 0,
            inextp: 21,
        }
    }

    fn internal_sample(&mut self) -> i32 {
        let mut i = self.inext + 1;
        if i >= 56 {
            i = 1;
        }
        let mut j = self.inextp + 1;
        if j >= 56 {
            j = 1;
        }
        let mut ret = self.seed_array[i] - self.seed_array[j];
        if ret == MBIG {
            ret -= 1;
        }
        if ret < 0 {
            ret += MBIG;
        }
        self.seed_array[i] = ret;
        self.inext = i;
        self.inextp = j;
        ret
    }

    fn sample(&mut self) -> f64 {
        self.internal_sample() as f64 * (1.0 / MBIG as f64)
    }

    fn sample_for_large_range(&mut self) -> f64 {
        let mut result = self.internal_sample();
        if self.internal_sample() % 2 == 0 {
            result = -result;
        }
        let mut d = result as f64;
        d += (i32::MAX - 1) as f64;
        d /= (2u64 * i32::MAX as u64 - 1) as f64;
        d
    }

    /// Non-negative pseudo-random integer in `[0, i32::MAX)`.
    pub fn next(&mut self) -> i32 {
        self.internal_sample()
    }

    /// Pseudo-random integer in `[0, max)`.
    pub fn next_max(&mut self, max: i32) -> i32 {
        (self.sample() * max as f64) as i32
    }

    /// Pseudo-random integer in `[lo, hi)`.
    pub fn next_range(&mut self, lo: i32, hi: i32) -> i32 {
        let range = hi as i64 - lo as i64;
        if range <= i32::MAX as i64 {
            lo.wrapping_add((self.sample() * range as f64) as i32)
        } else {
            ((self.sample_for_large_range() * range as f64) as i64 + lo as i64) as i32
        }
    }

    /// Pseudo-random float in `[0.0, 1.0)`.
    pub fn next_f64(&mut self) -> f64 {
        self.sample()
    }
}
