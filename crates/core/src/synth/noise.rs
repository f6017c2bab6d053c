use rand::{rngs::StdRng, Rng, SeedableRng};

/// Largest jitter the limb-chain synthesizer ever adds to a coordinate.
pub const MAX_JITTER: f32 = 0.02;

/// Source of the small cosmetic perturbations applied to limb-chain poses.
pub trait NoiseSource: Send {
    /// Next perturbation, bounded by `±MAX_JITTER`.
    fn next_perturbation(&mut self) -> f32;
}

/// Production noise backed by a thread-local generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomNoise;

impl NoiseSource for RandomNoise {
    fn next_perturbation(&mut self) -> f32 {
        rand::thread_rng().gen_range(-MAX_JITTER..=MAX_JITTER)
    }
}

/// Reproducible noise for tests and offline rendering.
#[derive(Debug, Clone)]
pub struct SeededNoise {
    rng: StdRng,
}

impl SeededNoise {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl NoiseSource for SeededNoise {
    fn next_perturbation(&mut self) -> f32 {
        self.rng.gen_range(-MAX_JITTER..=MAX_JITTER)
    }
}

/// Always zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNoise;

impl NoiseSource for SilentNoise {
    fn next_perturbation(&mut self) -> f32 {
        0.0
    }
}
