use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::batch::default_features;
use crate::player::{PlayerRecord, StatLine};
use crate::stats::{ALL_POSITIONS, Position, StatName};

/// Generating weights per position, aligned with `default_features(position)`.
pub fn true_weights(position: Position) -> &'static [f64] {
    match position {
        Position::Gk => &[0.22, 0.21, 0.05, 0.21, 0.31],
        Position::Cb => &[0.05, 0.0, 0.05, 0.05, 0.55, 0.30],
        Position::Lb | Position::Rb => &[0.20, 0.0, 0.15, 0.15, 0.35, 0.15],
        Position::Cdm => &[0.0, 0.05, 0.25, 0.10, 0.35, 0.25],
        Position::Cm => &[0.05, 0.10, 0.35, 0.30, 0.10, 0.10],
        Position::Cam => &[0.05, 0.20, 0.35, 0.40, 0.0, 0.0],
        Position::Lw | Position::Rw => &[0.25, 0.20, 0.15, 0.40, 0.0, 0.0],
        Position::Lm | Position::Rm => &[0.25, 0.10, 0.25, 0.35, 0.0, 0.05],
        Position::St => &[0.20, 0.50, 0.0, 0.20, 0.0, 0.10],
    }
}

fn random_stats(rng: &mut StdRng) -> StatLine {
    let mut stats = StatLine::default();
    for stat in StatName::ALL {
        stats.set(*stat, rng.gen_range(30..=99) as f64);
    }
    stats
}

fn synthetic_player(rng: &mut StdRng, idx: usize, position: Position, noise: f64) -> PlayerRecord {
    let stats = random_stats(rng);
    let exact: f64 = default_features(position)
        .iter()
        .zip(true_weights(position))
        .map(|(stat, w)| w * stats.get(*stat))
        .sum();
    let jitter = if noise > 0.0 {
        rng.gen_range(-noise..=noise)
    } else {
        0.0
    };
    PlayerRecord {
        name: Some(format!("Synthetic {} {}", position, idx + 1)),
        position,
        overall_rating: exact * (1.0 + jitter),
        stats,
    }
}

/// `count` players spread round-robin over every position, with overall
/// ratings that are exact convex combinations of the default features.
pub fn generate(count: usize, seed: u64) -> Vec<PlayerRecord> {
    generate_with_noise(count, seed, 0.0)
}

/// Like [`generate`] but each rating is scaled by a uniform relative error in
/// `[-noise, noise]`.
pub fn generate_with_noise(count: usize, seed: u64, noise: f64) -> Vec<PlayerRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = noise.abs();
    (0..count)
        .map(|idx| {
            let position = ALL_POSITIONS[idx % ALL_POSITIONS.len()];
            synthetic_player(&mut rng, idx, position, noise)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_line_up_with_features_and_sum_to_one() {
        for position in ALL_POSITIONS {
            let w = true_weights(position);
            assert_eq!(w.len(), default_features(position).len(), "{position}");
            assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12, "{position}");
        }
    }

    #[test]
    fn same_seed_same_population() {
        let a = generate(48, 11);
        let b = generate(48, 11);
        assert_eq!(a, b);
        assert_ne!(a, generate(48, 12));
        assert_eq!(a.iter().filter(|p| p.position == Position::Gk).count(), 4);
    }

    #[test]
    fn noiseless_ratings_are_exact_combinations() {
        let players = generate(12, 3);
        let st = players
            .iter()
            .find(|p| p.position == Position::St)
            .expect("striker");
        let expected: f64 = default_features(Position::St)
            .iter()
            .zip(true_weights(Position::St))
            .map(|(s, w)| w * st.stats.get(*s))
            .sum();
        assert_eq!(st.overall_rating, expected);
    }
}
