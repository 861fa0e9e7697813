//! Weighted random selection through a cumulative-probability table.
use loadcheck_core::ConfigError;
use rand::Rng;

/// Entries with integer weights, selected in declaration order.
///
/// With weights `[30, 40, 15, 15]` a sample in `[0, 0.3)` selects the first entry, `[0.3, 0.7)`
/// the second, `[0.7, 0.85)` the third and `[0.85, 1)` the last.
#[derive(Clone, Debug)]
pub struct WeightedTable<T> {
    entries: Vec<(f64, T)>,
}

impl<T> WeightedTable<T> {
    pub fn new(entries: impl IntoIterator<Item = (u32, T)>) -> Result<Self, ConfigError> {
        let entries: Vec<(u32, T)> = entries.into_iter().filter(|(w, _)| *w > 0).collect();
        let total: u32 = entries.iter().map(|(w, _)| *w).sum();
        if total == 0 {
            return Err(ConfigError::EmptyWeights);
        }

        let mut cumulative = 0;
        let entries = entries
            .into_iter()
            .map(|(weight, value)| {
                cumulative += weight;
                (cumulative as f64 / total as f64, value)
            })
            .collect();

        Ok(Self { entries })
    }

    /// The entry whose cumulative bucket contains `sample`, a value in `[0, 1)`.
    ///
    /// Samples outside the range are clamped to the first or last entry.
    pub fn select(&self, sample: f64) -> &T {
        self.entries
            .iter()
            .find(|(upper, _)| sample < *upper)
            .or(self.entries.last())
            .map(|(_, value)| value)
            .unwrap_or_else(|| unreachable!("WeightedTable always holds at least one entry"))
    }

    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> &T {
        self.select(rng.gen::<f64>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::SmallRng, SeedableRng};
    use std::collections::HashMap;

    fn table() -> WeightedTable<&'static str> {
        WeightedTable::new([(30, "health"), (40, "calculate"), (15, "items"), (15, "create")])
            .unwrap()
    }

    #[test]
    fn test_boundaries() {
        let table = table();
        assert_eq!(*table.select(0.), "health");
        assert_eq!(*table.select(0.29), "health");
        assert_eq!(*table.select(0.3), "calculate");
        assert_eq!(*table.select(0.69), "calculate");
        assert_eq!(*table.select(0.7), "items");
        assert_eq!(*table.select(0.84), "items");
        assert_eq!(*table.select(0.85), "create");
        assert_eq!(*table.select(0.999), "create");
        assert_eq!(*table.select(1.5), "create");
        assert_eq!(*table.select(-1.), "health");
    }

    #[test]
    fn test_distribution_converges() {
        let table = table();
        let mut rng = SmallRng::seed_from_u64(7);
        let n = 100_000;
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for _ in 0..n {
            *counts.entry(*table.choose(&mut rng)).or_default() += 1;
        }

        for (name, expected) in [
            ("health", 0.30),
            ("calculate", 0.40),
            ("items", 0.15),
            ("create", 0.15),
        ] {
            let share = counts[name] as f64 / n as f64;
            assert!(
                (share - expected).abs() < 0.01,
                "{name}: {share} vs {expected}"
            );
        }
    }

    #[test]
    fn test_zero_weights_skipped() {
        let table = WeightedTable::new([(0, "never"), (1, "always")]).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(*table.select(0.), "always");
    }

    #[test]
    fn test_empty() {
        assert_eq!(
            WeightedTable::<()>::new([]).unwrap_err(),
            ConfigError::EmptyWeights
        );
        assert!(WeightedTable::new([(0, ())]).is_err());
    }
}
