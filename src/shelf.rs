//! Adaptive shelf assortment generator.

use rand::{Rng, distr::weighted::Error as WeightError, seq::index::sample_weighted};
use thiserror::Error;

/// Upper bound of an item's exposure portion once it reaches its fair share.
const MAX_PORTION: f64 = 0.999;

#[derive(Debug, Error)]
pub enum ShelfError {
    #[error("number of shopping trips exceeds the configured {num_trips}")]
    TripBudgetExceeded { num_trips: usize },
    #[error("failed to draw shelf items")]
    InvalidWeights(#[from] WeightError),
}

/// Items shown on the shelf during one trip.
#[derive(Debug, Clone, PartialEq)]
pub struct Shelf {
    /// Indices of the shown items, in increasing order.
    pub items: Vec<usize>,
    /// Indicator of the shown items (`num_items` entries).
    pub shown: Vec<u8>,
}

/// Per-shopper shelf generator.
///
/// Draws `shelf_size` distinct items per trip and, after every trip, lowers the
/// draw weight of items whose exposure is running ahead of their fair share.
#[derive(Debug, Clone)]
pub struct ShelfGenerator {
    n_items: usize,
    n_trips: usize,
    shelf_size: usize,
    seen_counts: Vec<usize>,
    n_trips_done: usize,
    draw_probs: Vec<f64>,
}

impl ShelfGenerator {
    /// Create a generator already in its reset state.
    pub fn new(n_items: usize, n_trips: usize, shelf_size: usize) -> Self {
        Self {
            n_items,
            n_trips,
            shelf_size,
            seen_counts: vec![0; n_items],
            n_trips_done: 0,
            draw_probs: uniform_probs(n_items),
        }
    }

    /// Forget all exposure history. Must be called before each new shopper.
    pub fn reset(&mut self) {
        self.seen_counts.iter_mut().for_each(|cnt| *cnt = 0);
        self.n_trips_done = 0;
        self.draw_probs = uniform_probs(self.n_items);
    }

    /// Draw probabilities that the next call to [`Self::next_shelf`] will use.
    #[cfg(test)]
    pub fn draw_probs(&self) -> &[f64] {
        &self.draw_probs
    }

    pub fn seen_counts(&self) -> &[usize] {
        &self.seen_counts
    }

    pub fn trips_completed(&self) -> usize {
        self.n_trips_done
    }

    /// Generate the shelf of the next trip and update the draw probabilities.
    pub fn next_shelf<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Shelf, ShelfError> {
        if self.n_trips_done >= self.n_trips {
            return Err(ShelfError::TripBudgetExceeded {
                num_trips: self.n_trips,
            });
        }

        let draw_probs = &self.draw_probs;
        let mut items =
            sample_weighted(rng, self.n_items, |i_item| draw_probs[i_item], self.shelf_size)?
                .into_vec();
        items.sort_unstable();

        let mut shown = vec![0; self.n_items];
        for &i_item in &items {
            shown[i_item] = 1;
            self.seen_counts[i_item] += 1;
        }
        self.n_trips_done += 1;

        self.draw_probs = rebalance_probs(&self.seen_counts, self.n_trips_done, self.shelf_size);

        Ok(Shelf { items, shown })
    }
}

/// Compute draw probabilities that favor under-exposed items.
///
/// Each item's exposure count is compared with the ideal count it would have
/// after `n_trips_done` perfectly balanced trips. Items at or above the ideal
/// keep a small residual weight so they are never excluded.
pub fn rebalance_probs(seen_counts: &[usize], n_trips_done: usize, shelf_size: usize) -> Vec<f64> {
    let n_items = seen_counts.len();
    if n_trips_done == 0 {
        return uniform_probs(n_items);
    }

    let fair_share = shelf_size as f64 / n_items as f64;
    let ideal_count = fair_share * n_trips_done as f64;

    let mut weights: Vec<f64> = seen_counts
        .iter()
        .map(|&cnt| {
            let mut portion = cnt as f64 / ideal_count;
            if portion >= 1.0 {
                portion = MAX_PORTION;
            }
            1.0 - portion
        })
        .collect();

    if weights.iter().all(|&w| w == 0.0) {
        return uniform_probs(n_items);
    }
    let sum: f64 = weights.iter().sum();
    weights.iter_mut().for_each(|w| *w /= sum);
    weights
}

fn uniform_probs(n_items: usize) -> Vec<f64> {
    vec![1.0 / n_items as f64; n_items]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    fn assert_close(a: &[f64], b: &[f64], tol: f64) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < tol, "{a:?} != {b:?}");
        }
    }

    #[test]
    fn shelves_have_distinct_items_of_fixed_size() {
        let mut rng = ChaCha12Rng::seed_from_u64(7);
        for (n_items, n_trips, shelf_size) in [(3, 4, 2), (12, 18, 6), (5, 10, 5), (8, 30, 1)] {
            let mut shelf_gen = ShelfGenerator::new(n_items, n_trips, shelf_size);
            for _ in 0..n_trips {
                let shelf = shelf_gen.next_shelf(&mut rng).unwrap();
                assert_eq!(shelf.items.len(), shelf_size);
                assert!(shelf.items.windows(2).all(|pair| pair[0] < pair[1]));
                assert!(shelf.items.iter().all(|&i_item| i_item < n_items));
                let n_shown: usize = shelf.shown.iter().map(|&x| x as usize).sum();
                assert_eq!(n_shown, shelf_size);
                for &i_item in &shelf.items {
                    assert_eq!(shelf.shown[i_item], 1);
                }
            }
            let total: usize = shelf_gen.seen_counts().iter().sum();
            assert_eq!(total, n_trips * shelf_size);
            assert_eq!(shelf_gen.trips_completed(), n_trips);
        }
    }

    #[test]
    fn exceeding_trip_budget_fails() {
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        let mut shelf_gen = ShelfGenerator::new(4, 3, 2);
        for _ in 0..3 {
            shelf_gen.next_shelf(&mut rng).unwrap();
        }
        let err = shelf_gen.next_shelf(&mut rng).unwrap_err();
        assert!(matches!(err, ShelfError::TripBudgetExceeded { num_trips: 3 }));
        assert_eq!(shelf_gen.trips_completed(), 3);
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut rng = ChaCha12Rng::seed_from_u64(2);
        let mut shelf_gen = ShelfGenerator::new(5, 4, 2);
        for _ in 0..4 {
            shelf_gen.next_shelf(&mut rng).unwrap();
        }
        assert!(shelf_gen.draw_probs().iter().any(|&p| p != 0.2));

        shelf_gen.reset();
        assert_eq!(shelf_gen.draw_probs(), &[0.2; 5]);
        assert_eq!(shelf_gen.seen_counts(), &[0; 5]);
        assert_eq!(shelf_gen.trips_completed(), 0);

        let shelf = shelf_gen.next_shelf(&mut rng).unwrap();
        assert_eq!(shelf.items.len(), 2);
        assert_eq!(shelf_gen.trips_completed(), 1);
    }

    #[test]
    fn simultaneous_saturation_falls_back_to_uniform() {
        let probs = rebalance_probs(&[3, 2, 2], 3, 2);
        assert_close(&probs, &[1.0 / 3.0; 3], 1e-12);
    }

    #[test]
    fn under_exposed_items_are_favored() {
        // ideal count = 0.5 * 2 = 1
        let probs = rebalance_probs(&[2, 2, 0, 0], 2, 2);
        let w_sat = 1.0 - MAX_PORTION;
        let sum = 2.0 * w_sat + 2.0;
        assert_close(&probs, &[w_sat / sum, w_sat / sum, 1.0 / sum, 1.0 / sum], 1e-12);

        // ideal count = 0.5 * 4 = 2
        let probs = rebalance_probs(&[1, 2, 3, 2], 4, 2);
        let sum = 0.5 + 3.0 * w_sat;
        assert_close(&probs, &[0.5 / sum, w_sat / sum, w_sat / sum, w_sat / sum], 1e-12);
    }

    #[test]
    fn rebalanced_probs_stay_positive_and_normalized() {
        let mut rng = ChaCha12Rng::seed_from_u64(3);
        let mut shelf_gen = ShelfGenerator::new(7, 25, 3);
        for _ in 0..25 {
            shelf_gen.next_shelf(&mut rng).unwrap();
            let probs = shelf_gen.draw_probs();
            assert!(probs.iter().all(|&p| p > 0.0));
            assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn exposure_stays_close_to_fair_share() {
        let mut rng = ChaCha12Rng::seed_from_u64(4);
        let (n_items, n_trips, shelf_size) = (6, 60, 3);
        let mut shelf_gen = ShelfGenerator::new(n_items, n_trips, shelf_size);
        for _ in 0..n_trips {
            shelf_gen.next_shelf(&mut rng).unwrap();
        }
        let ideal = (n_trips * shelf_size / n_items) as f64;
        for &cnt in shelf_gen.seen_counts() {
            assert!((cnt as f64 - ideal).abs() <= 0.2 * ideal, "{cnt} vs {ideal}");
        }
    }
}
