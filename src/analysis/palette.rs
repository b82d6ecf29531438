//! Deterministic color assignment for clustering results.
//!
//! Both clustering algorithms color newly created groupings from the same
//! running hue sequence: advance by the golden-ratio conjugate, wrap into
//! [0, 1), convert through HSV at fixed saturation and value. Spacing hues by
//! the golden-ratio conjugate keeps consecutive colors visually distinct no
//! matter how many groups the search creates.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::core::Color;

/// Fractional part of the golden ratio.
pub const GOLDEN_RATIO_CONJUGATE: f64 = 0.618_033_988_749_894_9;

const SATURATION: f64 = 0.5;
const VALUE: f64 = 0.95;

/// A running hue stream. Share one sequence across algorithm runs to keep
/// hues spaced across their combined output.
#[derive(Debug, Clone)]
pub struct ColorSequence {
    hue: f64,
}

impl ColorSequence {
    /// Start the sequence from a seed-derived hue.
    pub fn seeded(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        ColorSequence {
            hue: rng.random::<f64>(),
        }
    }

    /// Start the sequence from an explicit hue in [0, 1).
    pub fn starting_at(hue: f64) -> Self {
        ColorSequence {
            hue: hue.rem_euclid(1.0),
        }
    }

    /// Advance the hue and produce the next grouping color.
    pub fn next_color(&mut self) -> Color {
        self.hue = (self.hue + GOLDEN_RATIO_CONJUGATE).rem_euclid(1.0);
        Color::from_hsv(self.hue * 360.0, SATURATION, VALUE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_deterministic_per_seed() {
        let mut a = ColorSequence::seeded(7);
        let mut b = ColorSequence::seeded(7);
        for _ in 0..16 {
            assert_eq!(a.next_color(), b.next_color());
        }
        let mut c = ColorSequence::seeded(8);
        let first_a = ColorSequence::seeded(7).next_color();
        assert_ne!(first_a, c.next_color());
    }

    #[test]
    fn test_hue_wraps_into_unit_interval() {
        let mut seq = ColorSequence::starting_at(0.9);
        // 0.9 + 0.618... wraps below 1.0
        let color = seq.next_color();
        let expected = (0.9f64 + GOLDEN_RATIO_CONJUGATE).rem_euclid(1.0);
        assert_eq!(color, Color::from_hsv(expected * 360.0, 0.5, 0.95));
    }

    #[test]
    fn test_consecutive_colors_differ() {
        let mut seq = ColorSequence::starting_at(0.0);
        let a = seq.next_color();
        let b = seq.next_color();
        let c = seq.next_color();
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
    }
}
