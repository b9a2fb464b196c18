//! Typing-delay estimator.
//!
//! Maps a reply to how long the "typing" indicator stays up before the reply
//! is revealed. Longer replies take longer, within fixed bounds, with a
//! random jitter so consecutive replies do not feel mechanical.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Parameters of the typing-delay curve, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypingDelayConfig {
    pub base_ms: u64,
    pub per_char_ms: u64,
    pub min_ms: u64,
    pub max_ms: u64,
    /// Symmetric jitter as a fraction of the clamped delay (0.25 = ±25%).
    pub jitter: f64,
}

impl Default for TypingDelayConfig {
    fn default() -> Self {
        Self {
            base_ms: 800,
            per_char_ms: 50,
            min_ms: 1000,
            max_ms: 6000,
            jitter: 0.25,
        }
    }
}

impl TypingDelayConfig {
    /// Delay before jitter: `clamp(base + chars * per_char, min, max)`.
    pub fn nominal_ms(&self, text: &str) -> u64 {
        let chars = text.chars().count() as u64;
        self.base_ms
            .saturating_add(chars.saturating_mul(self.per_char_ms))
            .clamp(self.min_ms, self.max_ms)
    }

    /// Typing delay for `text`, drawing the jitter from `rng`.
    ///
    /// The jittered value is clamped again, so the result always lies in
    /// `[min_ms, max_ms]`.
    pub fn delay_with<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> Duration {
        let nominal = self.nominal_ms(text) as f64;
        let jitter = self.jitter.abs();
        let factor = if jitter > 0.0 {
            1.0 + rng.gen_range(-jitter..=jitter)
        } else {
            1.0
        };
        let jittered = (nominal * factor).round().max(0.0) as u64;
        Duration::from_millis(jittered.clamp(self.min_ms, self.max_ms))
    }

    /// Typing delay for `text` using the thread-local RNG.
    pub fn delay(&self, text: &str) -> Duration {
        self.delay_with(text, &mut rand::thread_rng())
    }
}

/// Typing delay for `text` with the default curve.
pub fn typing_delay(text: &str) -> Duration {
    TypingDelayConfig::default().delay(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_delay_always_within_bounds() {
        let config = TypingDelayConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        for len in (0..400).chain([1_000, 10_000]) {
            let text = "a".repeat(len);
            for _ in 0..20 {
                let delay = config.delay_with(&text, &mut rng).as_millis() as u64;
                assert!(
                    (1000..=6000).contains(&delay),
                    "len {len} produced {delay}ms"
                );
            }
        }
    }

    #[test]
    fn test_nominal_curve() {
        let config = TypingDelayConfig::default();
        assert_eq!(config.nominal_ms(""), 1000);
        assert_eq!(config.nominal_ms("abcd"), 1000);
        assert_eq!(config.nominal_ms(&"x".repeat(40)), 2800);
        assert_eq!(config.nominal_ms(&"x".repeat(500)), 6000);
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let config = TypingDelayConfig::default();
        // Devanagari is three bytes per scalar
        let text = "नमस्तेदोस्त";
        assert_eq!(config.nominal_ms(text), 800 + text.chars().count() as u64 * 50);
    }

    #[test]
    fn test_zero_jitter_is_deterministic() {
        let config = TypingDelayConfig {
            jitter: 0.0,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let text = "x".repeat(60);
        let first = config.delay_with(&text, &mut rng);
        let second = config.delay_with(&text, &mut rng);
        assert_eq!(first, Duration::from_millis(3800));
        assert_eq!(first, second);
    }

    #[test]
    fn test_jitter_varies_mid_range_delays() {
        let config = TypingDelayConfig::default();
        let mut rng = StdRng::seed_from_u64(42);
        let text = "x".repeat(60);
        let draws: std::collections::HashSet<_> =
            (0..50).map(|_| config.delay_with(&text, &mut rng)).collect();
        assert!(draws.len() > 1);
        assert!(draws.iter().all(|d| {
            let ms = d.as_millis() as u64;
            (2850..=4750).contains(&ms)
        }));
    }

    #[test]
    fn test_default_helper_in_bounds() {
        let ms = typing_delay("kya kar rahe ho?").as_millis() as u64;
        assert!((1000..=6000).contains(&ms));
    }
}
