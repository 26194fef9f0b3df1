//! Random draw engine.
//!
//! Rarity is chosen from an explicit cumulative-weight table built once from the
//! catalog, then a unit is picked uniformly within the tier and the shiny flag is
//! rolled independently. All randomness comes from the caller's [`Rng`], so a seeded
//! generator gives reproducible draws.

use rand::Rng;

use super::catalog::Catalog;
use super::types::{DrawResult, Rarity};

#[derive(Debug, Clone)]
pub struct DrawEngine {
    /// (rarity, running total of weights up to and including this tier)
    cumulative: Vec<(Rarity, f64)>,
    total: f64,
    units: Vec<Vec<String>>,
    shiny_chance: f64,
}

impl DrawEngine {
    pub fn new(catalog: &Catalog) -> Self {
        let mut running = 0.0;
        let cumulative = Rarity::ALL
            .iter()
            .map(|&rarity| {
                running += catalog.weight(rarity);
                (rarity, running)
            })
            .collect();
        let units = Rarity::ALL
            .iter()
            .map(|&rarity| catalog.units(rarity).to_vec())
            .collect();
        Self {
            cumulative,
            total: running,
            units,
            shiny_chance: catalog.shiny_chance,
        }
    }

    /// Map a uniform sample in `[0, 1)` to a rarity.
    ///
    /// The first tier whose cumulative weight reaches `sample * total` wins. Zero-weight
    /// tiers never win. If round-off leaves nothing matched, the last tier is returned.
    pub fn rarity_for(&self, sample: f64) -> Rarity {
        let target = sample * self.total;
        let mut previous = 0.0;
        for &(rarity, cumulative) in &self.cumulative {
            if cumulative > previous && target <= cumulative {
                return rarity;
            }
            previous = cumulative;
        }
        Rarity::Celestial
    }

    pub fn roll_rarity<R: Rng + ?Sized>(&self, rng: &mut R) -> Rarity {
        self.rarity_for(rng.gen::<f64>())
    }

    /// One complete draw: rarity, unit, shiny and celestial flags.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> DrawResult {
        let rarity = self.roll_rarity(rng);
        let pool = &self.units[rarity.index()];
        let unit_name = pool[rng.gen_range(0..pool.len())].clone();
        let shiny = rarity.allows_shiny() && rng.gen::<f64>() < self.shiny_chance;
        DrawResult {
            unit_name,
            rarity,
            shiny,
            celestial: rarity.is_celestial(),
        }
    }

    /// Configured probability of each tier (weight / total).
    pub fn rates(&self) -> Vec<(Rarity, f64)> {
        let mut previous = 0.0;
        self.cumulative
            .iter()
            .map(|&(rarity, cumulative)| {
                let weight = cumulative - previous;
                previous = cumulative;
                (rarity, weight / self.total)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn only(rarity: Rarity) -> Catalog {
        let mut catalog = Catalog::standard();
        for t in catalog.tiers.iter_mut() {
            t.weight = if t.rarity == rarity { 1.0 } else { 0.0 };
        }
        catalog
    }

    #[test]
    fn cumulative_table_boundaries() {
        let mut catalog = Catalog::standard();
        let weights = [1.0, 1.0, 0.0, 1.0, 0.0, 1.0];
        for (t, w) in catalog.tiers.iter_mut().zip(weights) {
            t.weight = w;
        }
        let engine = DrawEngine::new(&catalog);
        assert_eq!(engine.rarity_for(0.0), Rarity::Common);
        assert_eq!(engine.rarity_for(0.25), Rarity::Common);
        assert_eq!(engine.rarity_for(0.26), Rarity::Rare);
        // Ultra has zero weight, so the boundary at 0.5 stays with Rare and past it goes to Mythical
        assert_eq!(engine.rarity_for(0.5), Rarity::Rare);
        assert_eq!(engine.rarity_for(0.51), Rarity::Mythical);
        assert_eq!(engine.rarity_for(0.99), Rarity::Celestial);
    }

    #[test]
    fn round_off_falls_back_to_last_tier() {
        let engine = DrawEngine::new(&Catalog::standard());
        assert_eq!(engine.rarity_for(1.0 + 1e-9), Rarity::Celestial);
    }

    #[test]
    fn zero_weight_first_tier_never_wins() {
        let engine = DrawEngine::new(&only(Rarity::Ultra));
        assert_eq!(engine.rarity_for(0.0), Rarity::Ultra);
    }

    #[test]
    fn celestial_flag_tracks_top_tier() {
        let mut rng = StdRng::seed_from_u64(7);
        let engine = DrawEngine::new(&Catalog::standard());
        for _ in 0..5_000 {
            let d = engine.draw(&mut rng);
            assert_eq!(d.celestial, d.rarity == Rarity::Celestial);
        }
        let engine = DrawEngine::new(&only(Rarity::Celestial));
        let d = engine.draw(&mut rng);
        assert!(d.celestial);
        assert!(d.unit_name == "admin Zy" || d.unit_name == "Alex");
    }

    #[test]
    fn secret_never_shiny_even_at_certain_shiny_rate() {
        let mut catalog = only(Rarity::Secret);
        catalog.shiny_chance = 1.0;
        let engine = DrawEngine::new(&catalog);
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..2_000 {
            let d = engine.draw(&mut rng);
            assert_eq!(d.rarity, Rarity::Secret);
            assert!(!d.shiny);
        }

        let mut catalog = only(Rarity::Rare);
        catalog.shiny_chance = 1.0;
        let engine = DrawEngine::new(&catalog);
        assert!(engine.draw(&mut rng).shiny);
    }

    #[test]
    fn large_samples_converge_to_configured_rates() {
        let mut catalog = Catalog::standard();
        let weights = [4.0, 3.0, 1.5, 1.0, 0.3, 0.2];
        for (t, w) in catalog.tiers.iter_mut().zip(weights) {
            t.weight = w;
        }
        let engine = DrawEngine::new(&catalog);
        let mut rng = StdRng::seed_from_u64(2024);
        let trials = 200_000;
        let mut counts = [0usize; 6];
        for _ in 0..trials {
            counts[engine.roll_rarity(&mut rng).index()] += 1;
        }
        for (rarity, expected) in engine.rates() {
            let observed = counts[rarity.index()] as f64 / trials as f64;
            assert!(
                (observed - expected).abs() < 0.01,
                "{} observed {:.4} expected {:.4}",
                rarity,
                observed,
                expected
            );
        }
    }

    #[test]
    fn rates_sum_to_one() {
        let engine = DrawEngine::new(&Catalog::standard());
        let sum: f64 = engine.rates().iter().map(|(_, p)| p).sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }
}
