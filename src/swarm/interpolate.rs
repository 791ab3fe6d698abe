use crate::model::Model;
use log::trace;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;
use std::hash::{DefaultHasher, Hash, Hasher};

/// Generates new seed states from the states sampled by a generational thread.
///
/// Seeds need not be reachable. Valuations with a wrong number of values are ignored.
pub trait Interpolate: Sync {
    fn interpolate(&self, samples: &[Vec<i32>]) -> Vec<Vec<i32>>;
}

impl<F> Interpolate for F
where
    F: Fn(&[Vec<i32>]) -> Vec<Vec<i32>> + Sync,
{
    fn interpolate(&self, samples: &[Vec<i32>]) -> Vec<Vec<i32>> {
        self(samples)
    }
}

/// Which generated states are kept, comparing their successor count with the mean
/// successor count of the samples.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Fitness {
    /// Exactly the (rounded) mean.
    Equal,
    /// Fewer successors than the mean. Favours states close to deadlocks.
    #[default]
    LessThan,
    /// At least the mean.
    GreaterThan,
    /// More than the mean.
    GreaterStrict,
    /// More than the mean, but at most twice the mean.
    GreaterBounded,
}

impl Fitness {
    pub fn accepts(self, successors: usize, mean: f64) -> bool {
        let count = successors as f64;
        match self {
            Fitness::Equal => count == mean.round(),
            Fitness::LessThan => count < mean,
            Fitness::GreaterThan => count >= mean,
            Fitness::GreaterStrict => count > mean,
            Fitness::GreaterBounded => count > mean && count <= 2.0 * mean,
        }
    }
}

/// Crossover and mutation over sampled valuations.
///
/// Every child combines a prefix of one sample with the suffix of another, and each of its
/// values is replaced with probability `mutation_rate` by the value at the same position in
/// a random sample. The generator is seeded from `seed` and the samples, so the same samples
/// always give the same seeds.
pub struct GeneticInterpolation<'m, M: Model + ?Sized> {
    model: &'m M,
    pub fitness: Fitness,
    /// Maximal number of generated states per call.
    pub offspring: usize,
    /// Probability of mutating one value; values outside `[0, 1]` are clamped.
    pub mutation_rate: f64,
    pub seed: u64,
}

impl<'m, M: Model + ?Sized> GeneticInterpolation<'m, M> {
    pub fn new(model: &'m M) -> GeneticInterpolation<'m, M> {
        GeneticInterpolation {
            model,
            fitness: Fitness::default(),
            offspring: 100,
            mutation_rate: 0.1,
            seed: 0,
        }
    }

    pub fn with_fitness(mut self, fitness: Fitness) -> Self {
        self.fitness = fitness;
        self
    }

    pub fn with_offspring(mut self, offspring: usize) -> Self {
        self.offspring = offspring;
        self
    }

    pub fn with_mutation_rate(mut self, mutation_rate: f64) -> Self {
        self.mutation_rate = mutation_rate;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn rng(&self, samples: &[Vec<i32>]) -> ChaCha8Rng {
        let mut hasher = DefaultHasher::new();
        samples.hash(&mut hasher);
        ChaCha8Rng::seed_from_u64(self.seed ^ hasher.finish())
    }

    fn child(&self, rng: &mut ChaCha8Rng, samples: &[Vec<i32>]) -> Vec<i32> {
        let first = &samples[rng.gen_range(0..samples.len())];
        let second = &samples[rng.gen_range(0..samples.len())];
        let cut = rng.gen_range(0..=first.len());
        let mutation_rate = if self.mutation_rate.is_nan() {
            0.0
        } else {
            self.mutation_rate.clamp(0.0, 1.0)
        };
        let mut child: Vec<i32> = first[..cut].iter().chain(&second[cut..]).copied().collect();
        for i in 0..child.len() {
            if rng.gen_bool(mutation_rate) {
                child[i] = samples[rng.gen_range(0..samples.len())][i];
            }
        }
        child
    }
}

impl<M: Model + ?Sized> Interpolate for GeneticInterpolation<'_, M> {
    fn interpolate(&self, samples: &[Vec<i32>]) -> Vec<Vec<i32>> {
        let state_size = self.model.state_size();
        let samples: Vec<Vec<i32>> = samples
            .iter()
            .filter(|s| s.len() == state_size)
            .cloned()
            .collect();
        if samples.is_empty() || self.offspring == 0 {
            return Vec::new();
        }

        let total: usize = samples
            .iter()
            .map(|s| self.model.count_successors(s))
            .sum();
        let mean = total as f64 / samples.len() as f64;
        let mut seen: HashSet<Vec<i32>> = samples.iter().cloned().collect();

        let mut rng = self.rng(&samples);
        let mut result = Vec::new();
        let mut attempts = 0;
        while result.len() < self.offspring && attempts < self.offspring * 4 {
            attempts += 1;
            let child = self.child(&mut rng, &samples);
            if seen.contains(&child) {
                continue;
            }
            if self.fitness.accepts(self.model.count_successors(&child), mean) {
                seen.insert(child.clone());
                result.push(child);
            }
        }
        trace!(
            "Generated {} seeds in {} attempts (mean successors {:.2}).",
            result.len(),
            attempts,
            mean
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::{Fitness, GeneticInterpolation, Interpolate};
    use crate::model::{CounterModel, Model};

    #[test]
    fn fitness_relations() {
        assert!(Fitness::Equal.accepts(2, 2.4));
        assert!(!Fitness::Equal.accepts(3, 2.4));
        assert!(Fitness::LessThan.accepts(1, 1.5));
        assert!(!Fitness::LessThan.accepts(2, 1.5));
        assert!(Fitness::GreaterThan.accepts(2, 2.0));
        assert!(!Fitness::GreaterStrict.accepts(2, 2.0));
        assert!(Fitness::GreaterBounded.accepts(4, 2.0));
        assert!(!Fitness::GreaterBounded.accepts(5, 2.0));
    }

    #[test]
    fn genetic_seeds_are_fit_and_new() {
        let model = CounterModel::new(4, 3);
        let samples = vec![vec![0, 0, 0, 0], vec![3, 3, 0, 1], vec![1, 3, 2, 3], vec![3, 0, 3, 2]];
        let mean = samples
            .iter()
            .map(|s| model.count_successors(s))
            .sum::<usize>() as f64
            / samples.len() as f64;

        let genetic = GeneticInterpolation::new(&model).with_offspring(20).with_seed(7);
        let seeds = genetic.interpolate(&samples);
        assert!(seeds.len() <= 20);
        for seed in &seeds {
            assert_eq!(seed.len(), 4);
            assert!(!samples.contains(seed));
            assert!(Fitness::LessThan.accepts(model.count_successors(seed), mean));
            assert!(seed.iter().all(|v| (0..=3).contains(v)));
        }
        // Deterministic for the same samples.
        assert_eq!(seeds, genetic.interpolate(&samples));
    }

    #[test]
    fn mutation_rate_is_clamped() {
        let model = CounterModel::new(3, 2);
        let samples = vec![vec![0, 0, 0], vec![2, 1, 0], vec![1, 2, 2]];
        for rate in [-1.0, 7.5, f64::NAN, f64::INFINITY] {
            let genetic = GeneticInterpolation::new(&model)
                .with_mutation_rate(rate)
                .with_fitness(Fitness::GreaterThan)
                .with_offspring(5);
            let seeds = genetic.interpolate(&samples);
            assert!(seeds.len() <= 5);
            assert!(seeds.iter().flatten().all(|v| (0..=2).contains(v)));
        }
    }

    #[test]
    fn closures_are_interpolations() {
        let shift = |samples: &[Vec<i32>]| -> Vec<Vec<i32>> {
            samples.iter().map(|s| s.iter().map(|v| v + 1).collect()).collect()
        };
        assert_eq!(shift.interpolate(&[vec![1, 2]]), vec![vec![2, 3]]);
        let model = CounterModel::new(2, 1);
        let genetic = GeneticInterpolation::new(&model);
        assert!(genetic.interpolate(&[]).is_empty());
        assert!(genetic.interpolate(&[vec![1, 2, 3]]).is_empty());
    }
}
