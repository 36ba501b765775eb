use rand::rngs::SmallRng;
use rand::{Rng as _, SeedableRng};

/// Emoji shown while the mascot sits on an anchor.
pub const SIT_EMOJIS: &[&str] = &["😊", "😎", "🤗", "😄", "🥳", "😌", "🤩", "😺"];

/// Emoji burst shown when the mascot is picked up.
pub const CELEBRATION_EMOJIS: &[&str] = &["🎉", "✨", "💫", "🌟", "🎈"];

/// Source of randomness for decorative picks and drop positions.
pub trait Randomness {
    /// Uniform value in `[0, 1)`.
    fn unit(&mut self) -> f32;

    fn pick<'a>(&mut self, options: &[&'a str]) -> Option<&'a str> {
        if options.is_empty() {
            return None;
        }
        let idx = ((self.unit() * options.len() as f32) as usize).min(options.len() - 1);
        Some(options[idx])
    }
}

pub struct SeededRandom(SmallRng);

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self(SmallRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self(SmallRng::from_entropy())
    }
}

impl Randomness for SeededRandom {
    fn unit(&mut self) -> f32 {
        self.0.gen()
    }
}

/// Always returns the same value.
#[derive(Clone, Copy, Debug, Default)]
pub struct FixedRandom(pub f32);

impl Randomness for FixedRandom {
    fn unit(&mut self) -> f32 {
        self.0.clamp(0.0, 0.999_999)
    }
}
