//! Zipf-like popularity model over a fixed resource population.

use rand::Rng;

/// Weighted selector over the resource population.
///
/// Rank `i` (1-indexed) gets weight proportional to `1 / i^alpha`, normalized
/// so the weights sum to 1. Selection is inverse-CDF sampling over a
/// precomputed cumulative array with a binary search per draw. All state is
/// read-only after construction, so the selector can be shared between any
/// number of sessions without synchronization.
#[derive(Debug)]
pub struct PopularitySelector {
    names: Vec<String>,
    cumulative: Vec<f64>,
}

impl PopularitySelector {
    /// Builds the population and its popularity distribution.
    pub fn new(total: usize, alpha: f64) -> Self {
        let normalizer: f64 = (1..=total)
            .map(|rank| 1.0 / (rank as f64).powf(alpha))
            .sum();

        let mut sum = 0.0;
        let cumulative = (1..=total)
            .map(|rank| {
                sum += 1.0 / (rank as f64).powf(alpha) / normalizer;
                sum
            })
            .collect();

        let names = (0..total).map(|index| format!("file{index:03}.txt")).collect();

        Self { names, cumulative }
    }

    /// Number of resources in the population.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the population is empty.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Weight assigned to the resource at `index`.
    pub fn weight(&self, index: usize) -> f64 {
        let prev = if index == 0 {
            0.0
        } else {
            self.cumulative[index - 1]
        };
        self.cumulative[index] - prev
    }

    /// Draws one resource name according to the popularity distribution.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        &self.names[self.index_for(rng.random())]
    }

    // First index whose cumulative weight reaches `x`, clamped to the last
    // resource when rounding leaves the running sum fractionally below 1.
    fn index_for(&self, x: f64) -> usize {
        self.cumulative
            .partition_point(|&cum| cum < x)
            .min(self.names.len() - 1)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    #[test]
    fn weights_are_normalized() {
        for (total, alpha) in [(1, 1.0), (10, 0.5), (250, 2.0), (1000, 1.0)] {
            let selector = PopularitySelector::new(total, alpha);
            let sum: f64 = (0..total).map(|i| selector.weight(i)).sum();
            assert!((sum - 1.0).abs() < 1e-9, "sum {sum} for N={total} α={alpha}");
        }
    }

    #[test]
    fn weights_decrease_with_rank() {
        let selector = PopularitySelector::new(100, 1.0);
        for i in 1..selector.len() {
            assert!(selector.weight(i) < selector.weight(i - 1));
        }
    }

    #[test]
    fn names_are_zero_padded() {
        let selector = PopularitySelector::new(1000, 1.0);
        assert_eq!(selector.index_for(0.0), 0);
        assert_eq!(selector.names[0], "file000.txt");
        assert_eq!(selector.names[42], "file042.txt");
        assert_eq!(selector.names[999], "file999.txt");
    }

    #[test]
    fn clamps_to_last_resource() {
        let selector = PopularitySelector::new(100, 1.0);
        // 1.0 can exceed the rounded cumulative sum but must still resolve
        assert_eq!(selector.index_for(1.0), selector.len() - 1);
    }

    #[test]
    fn selection_is_deterministic() {
        let selector = PopularitySelector::new(1000, 1.0);
        let mut a = SmallRng::seed_from_u64(42);
        let mut b = SmallRng::seed_from_u64(42);
        for _ in 0..100 {
            assert_eq!(selector.choose(&mut a), selector.choose(&mut b));
        }
    }

    #[test]
    fn frequencies_follow_the_distribution() {
        let selector = PopularitySelector::new(100, 1.0);
        let mut rng = SmallRng::seed_from_u64(7);

        let draws = 100_000;
        let mut counts = vec![0u64; selector.len()];
        for _ in 0..draws {
            let name = selector.choose(&mut rng);
            let index: usize = name[4..7].parse().unwrap();
            counts[index] += 1;
        }

        let top_frequency = counts[0] as f64 / draws as f64;
        assert!((top_frequency - selector.weight(0)).abs() < 0.01);
        assert!(counts[0] > counts[50]);
    }
}
