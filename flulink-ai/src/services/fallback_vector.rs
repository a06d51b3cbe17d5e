//! Fallback vector generator
//!
//! Rule-based embedding substitute used whenever the primary model is not
//! usable. No external dependency, bounded-time, deterministic for a given
//! input and dimension.
//!
//! Layout of the produced vector (slots past `dimension` are skipped):
//! - slot 0: normalized text length
//! - slots 1..=10: frequency of the ten most frequent distinct characters
//! - slots 11..=18: keyword membership flags
//! - remaining slots: small jitter seeded from the input
//!
//! The result is unit-norm, or the zero vector for empty input.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Characters counted for slot 0 normalization
const LENGTH_NORMALIZER: f32 = 1000.0;

/// Number of character-frequency slots
const CHAR_FREQ_SLOTS: usize = 10;

/// First keyword flag slot
const KEYWORD_SLOT_OFFSET: usize = 1 + CHAR_FREQ_SLOTS;

/// Keyword flags, one slot each
const KEYWORDS: [&str; 8] = ["好", "棒", "喜欢", "爱", "开心", "快乐", "美丽", "优秀"];

/// First slot that receives jitter
const JITTER_SLOT_OFFSET: usize = KEYWORD_SLOT_OFFSET + KEYWORDS.len();

/// Jitter is uniform in `[-JITTER_AMPLITUDE, JITTER_AMPLITUDE]`
///
/// Kept small so the feature slots dominate similarity between inputs.
const JITTER_AMPLITUDE: f32 = 0.02;

/// Rule-based embedding generator
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackVectorGenerator;

impl FallbackVectorGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generate a vector with jitter seeded from the text itself
    pub fn generate(&self, text: &str, dimension: usize) -> Vec<f32> {
        let mut rng = StdRng::seed_from_u64(seed_for(text));
        self.generate_with_rng(text, dimension, &mut rng)
    }

    /// Generate a vector drawing jitter from `rng`
    pub fn generate_with_rng<R: Rng + ?Sized>(
        &self,
        text: &str,
        dimension: usize,
        rng: &mut R,
    ) -> Vec<f32> {
        let mut vector = vec![0.0f32; dimension];
        if dimension == 0 || text.is_empty() {
            return vector;
        }

        let lowered = text.to_lowercase();
        let char_count = lowered.chars().count();

        // Slot 0: length
        vector[0] = (text.chars().count() as f32 / LENGTH_NORMALIZER).min(1.0);

        // Slots 1..=10: character frequency
        for (i, freq) in top_char_frequencies(&lowered, char_count).into_iter().enumerate() {
            if let Some(slot) = vector.get_mut(1 + i) {
                *slot = freq;
            }
        }

        // Slots 11..=18: keyword flags
        for (i, keyword) in KEYWORDS.iter().enumerate() {
            if lowered.contains(keyword) {
                if let Some(slot) = vector.get_mut(KEYWORD_SLOT_OFFSET + i) {
                    *slot = 1.0;
                }
            }
        }

        // Remaining slots: jitter
        for slot in vector.iter_mut().skip(JITTER_SLOT_OFFSET) {
            *slot = rng.gen_range(-JITTER_AMPLITUDE..=JITTER_AMPLITUDE);
        }

        normalize(&mut vector);
        vector
    }
}

/// Frequencies of the most frequent distinct characters, in first-occurrence order
fn top_char_frequencies(lowered: &str, char_count: usize) -> Vec<f32> {
    // char -> (first occurrence index, count)
    let mut counts: HashMap<char, (usize, usize)> = HashMap::new();
    for (idx, ch) in lowered.chars().enumerate() {
        counts.entry(ch).or_insert((idx, 0)).1 += 1;
    }

    let mut ranked: Vec<(char, usize, usize)> = counts
        .into_iter()
        .map(|(ch, (first, count))| (ch, first, count))
        .collect();

    // Most frequent first; ties go to the earlier character
    ranked.sort_by(|a, b| b.2.cmp(&a.2).then(a.1.cmp(&b.1)));
    ranked.truncate(CHAR_FREQ_SLOTS);

    // Slot order follows first occurrence
    ranked.sort_by_key(|&(_, first, _)| first);

    ranked
        .into_iter()
        .map(|(_, _, count)| (count as f32 / char_count as f32).min(1.0))
        .collect()
}

/// Divide by the Euclidean norm; a zero vector is left unchanged
fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

/// Stable per-input seed
fn seed_for(text: &str) -> u64 {
    let digest = Sha256::digest(text.as_bytes());
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed)
}
