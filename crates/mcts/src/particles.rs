//! Particle approximations of a belief.
//!
//! [`ParticleSet`] keeps every sampled state, duplicates included, and is
//! what POMCP stores at each belief node. [`ParticleCounts`] folds duplicates
//! into `(state, count)` pairs and is what rPOMCP samples its root from.

use mcplan_core::{Belief, FiniteStates};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use std::collections::hash_map::{DefaultHasher, Entry};
use std::collections::HashMap;
use std::hash::{BuildHasherDefault, Hash};

/// Unweighted multiset of states.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleSet<S> {
    particles: Vec<S>,
}

impl<S> Default for ParticleSet<S> {
    fn default() -> Self {
        Self {
            particles: Vec::new(),
        }
    }
}

impl<S> ParticleSet<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap already-sampled states.
    pub fn from_states(particles: Vec<S>) -> Self {
        Self { particles }
    }

    /// Draw `n` states from `belief` and map them through `model`.
    ///
    /// # Panics
    /// Panics if `belief` does not have one entry per model state.
    pub fn from_belief<M, R>(model: &M, belief: &Belief, n: usize, rng: &mut R) -> Self
    where
        M: FiniteStates<State = S>,
        R: Rng + ?Sized,
    {
        assert_eq!(
            belief.len(),
            model.num_states(),
            "belief has {} entries but the model has {} states",
            belief.len(),
            model.num_states()
        );
        let particles = belief
            .sample_n(n, rng)
            .into_iter()
            .map(|index| model.state(index))
            .collect();
        Self { particles }
    }

    #[inline]
    pub fn push(&mut self, state: S) {
        self.particles.push(state);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Uniformly pick one particle. `None` if the set is empty.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&S> {
        if self.particles.is_empty() {
            return None;
        }
        Some(&self.particles[rng.gen_range(0..self.particles.len())])
    }

    pub fn iter(&self) -> impl Iterator<Item = &S> {
        self.particles.iter()
    }

    pub fn as_slice(&self) -> &[S] {
        &self.particles
    }
}

impl<S: PartialEq> ParticleSet<S> {
    /// How many particles equal `state`.
    pub fn count(&self, state: &S) -> usize {
        self.particles.iter().filter(|s| *s == state).count()
    }
}

impl<S> FromIterator<S> for ParticleSet<S> {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            particles: iter.into_iter().collect(),
        }
    }
}

/// Distinct states with their multiplicities, sampled proportionally.
#[derive(Clone, Debug)]
pub struct ParticleCounts<S> {
    entries: Vec<(S, u32)>,
    total: u64,
    sampler: Option<WeightedIndex<u32>>,
}

impl<S: Eq + Hash + Clone> ParticleCounts<S> {
    /// Aggregate `states`, keeping first-seen order.
    pub fn from_states<I: IntoIterator<Item = S>>(states: I) -> Self {
        let mut index: HashMap<S, usize, BuildHasherDefault<DefaultHasher>> = HashMap::default();
        let mut entries: Vec<(S, u32)> = Vec::new();
        for state in states {
            match index.entry(state) {
                Entry::Occupied(slot) => entries[*slot.get()].1 += 1,
                Entry::Vacant(slot) => {
                    entries.push((slot.key().clone(), 1));
                    slot.insert(entries.len() - 1);
                }
            }
        }
        Self::from_counts(entries)
    }
}

impl<S> ParticleCounts<S> {
    /// Build from explicit `(state, count)` pairs. Zero counts are dropped.
    pub fn from_counts(entries: Vec<(S, u32)>) -> Self {
        let entries: Vec<(S, u32)> = entries.into_iter().filter(|(_, n)| *n > 0).collect();
        let total = entries.iter().map(|(_, n)| u64::from(*n)).sum();
        let sampler = if entries.is_empty() {
            None
        } else {
            Some(
                WeightedIndex::new(entries.iter().map(|(_, n)| *n))
                    .expect("BUG: positive counts rejected by WeightedIndex"),
            )
        };
        Self {
            entries,
            total,
            sampler,
        }
    }

    /// Number of distinct states.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all multiplicities.
    #[inline]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Draw a state with probability proportional to its count.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&S> {
        let sampler = self.sampler.as_ref()?;
        Some(&self.entries[sampler.sample(rng)].0)
    }

    /// The state with the highest count; the first one wins ties.
    pub fn most_common(&self) -> Option<&S> {
        let mut best: Option<&(S, u32)> = None;
        for entry in &self.entries {
            if best.map_or(true, |b| entry.1 > b.1) {
                best = Some(entry);
            }
        }
        best.map(|(s, _)| s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&S, u32)> {
        self.entries.iter().map(|(s, n)| (s, *n))
    }
}

impl<S> Default for ParticleCounts<S> {
    fn default() -> Self {
        Self::from_counts(Vec::new())
    }
}
