//! Random sample sources for Monte Carlo integration.
//!
//! Every stochastic decision in the renderer (BRDF sampling, Russian
//! roulette, pixel jitter) draws from a [`Sampler`]. One sampler is created
//! per pixel, so no sampler is ever shared between threads.

use lumen_math::Vec2;
use rand::{Rng, RngCore};

/// Source of uniform samples in `[0, 1)`.
pub trait Sampler {
    /// Draw the next uniform sample in `[0, 1)`; never returns 1.0 or NaN.
    fn sample(&mut self) -> f32;

    /// Uniform sample in `[min, max)`.
    #[inline]
    fn sample_range(&mut self, min: f32, max: f32) -> f32 {
        (max - min) * self.sample() + min
    }

    /// Two independent uniform samples.
    #[inline]
    fn sample_2d(&mut self) -> Vec2 {
        let x = self.sample();
        let y = self.sample();
        Vec2::new(x, y)
    }
}

/// xorshift32 has a fixed point at zero, so a zero seed is replaced by this.
const ZERO_SEED_REPLACEMENT: u32 = 0x9E37_79B9;

/// Scale mapping a 24-bit integer onto `[0, 1)`.
const INV_2_POW_24: f32 = 1.0 / 16_777_216.0;

/// Fast white-noise sampler backed by xorshift32.
///
/// Deterministic for a given seed; pixel samplers are seeded from a hash of the
/// pixel index and a frame constant so neighboring pixels are decorrelated.
#[derive(Debug, Clone)]
pub struct WhiteNoiseSampler {
    state: u32,
}

impl WhiteNoiseSampler {
    /// Create a sampler from a raw seed.
    pub fn new(seed: u32) -> Self {
        let state = if seed == 0 { ZERO_SEED_REPLACEMENT } else { seed };
        Self { state }
    }

    /// Create the sampler owned by pixel `(x, y)` of a `width`-wide image.
    pub fn for_pixel(x: u32, y: u32, width: u32, frame_seed: u32) -> Self {
        let index = y.wrapping_mul(width).wrapping_add(x);
        Self::new(pcg_hash(index ^ pcg_hash(frame_seed)))
    }

    #[inline]
    fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }
}

impl Sampler for WhiteNoiseSampler {
    #[inline]
    fn sample(&mut self) -> f32 {
        // Top 24 bits fit an f32 mantissa exactly, keeping the result below 1.0
        (self.next_u32() >> 8) as f32 * INV_2_POW_24
    }
}

/// Adapter driving the renderer from any `rand` generator.
#[derive(Debug, Clone)]
pub struct RngSampler<R> {
    rng: R,
}

impl<R: RngCore> RngSampler<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    pub fn into_inner(self) -> R {
        self.rng
    }
}

impl<R: RngCore> Sampler for RngSampler<R> {
    #[inline]
    fn sample(&mut self) -> f32 {
        self.rng.gen::<f32>()
    }
}

/// PCG-style integer hash used for seeding.
#[inline]
pub fn pcg_hash(input: u32) -> u32 {
    let state = input.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277_803_737);
    (word >> 22) ^ word
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_samples_in_unit_range() {
        let mut sampler = WhiteNoiseSampler::new(1);
        for _ in 0..100_000 {
            let s = sampler.sample();
            assert!((0.0..1.0).contains(&s), "sample {} out of range", s);
        }
    }

    #[test]
    fn test_deterministic_for_seed() {
        let mut a = WhiteNoiseSampler::new(1234);
        let mut b = WhiteNoiseSampler::new(1234);
        for _ in 0..64 {
            assert_eq!(a.sample(), b.sample());
        }
    }

    #[test]
    fn test_state_advances() {
        let mut sampler = WhiteNoiseSampler::new(42);
        let first = sampler.sample();
        let second = sampler.sample();
        assert_ne!(first, second);
    }

    #[test]
    fn test_zero_seed_is_not_stuck() {
        let mut sampler = WhiteNoiseSampler::new(0);
        let draws: Vec<f32> = (0..8).map(|_| sampler.sample()).collect();
        assert!(draws.iter().any(|&d| d > 0.0));
    }

    #[test]
    fn test_mean_is_roughly_half() {
        let mut sampler = WhiteNoiseSampler::for_pixel(3, 7, 64, 0x1234);
        let n = 200_000;
        let mean: f32 = (0..n).map(|_| sampler.sample()).sum::<f32>() / n as f32;
        assert!((mean - 0.5).abs() < 0.01, "mean = {}", mean);
    }

    #[test]
    fn test_neighboring_pixels_decorrelated() {
        let mut a = WhiteNoiseSampler::for_pixel(10, 10, 128, 7);
        let mut b = WhiteNoiseSampler::for_pixel(11, 10, 128, 7);
        let same = (0..32).filter(|_| a.sample() == b.sample()).count();
        assert!(same < 2);

        // Frame seed changes the sequence of the same pixel
        let mut c = WhiteNoiseSampler::for_pixel(10, 10, 128, 8);
        let mut d = WhiteNoiseSampler::for_pixel(10, 10, 128, 7);
        assert_ne!(c.sample(), d.sample());
    }

    #[test]
    fn test_sample_range_and_2d() {
        let mut sampler = WhiteNoiseSampler::new(99);
        for _ in 0..1000 {
            let s = sampler.sample_range(-1.0, 1.0);
            assert!((-1.0..1.0).contains(&s));

            let p = sampler.sample_2d();
            assert!((0.0..1.0).contains(&p.x) && (0.0..1.0).contains(&p.y));
        }
    }

    #[test]
    fn test_rng_sampler() {
        let mut sampler = RngSampler::new(StdRng::seed_from_u64(5));
        for _ in 0..1000 {
            let s = sampler.sample();
            assert!((0.0..1.0).contains(&s));
        }
    }
}
