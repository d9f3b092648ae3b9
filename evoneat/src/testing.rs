//! A one-dimensional genome for exercising the
//! population machinery without a real encoding.
use crate::{Genome, InnovationHistory, Phenotype};

use rand::Rng;
use std::convert::Infallible;

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Scalar {
    pub(crate) value: f32,
    pub(crate) fitness: f32,
}

impl Scalar {
    pub(crate) fn with_value(value: f32) -> Scalar {
        Scalar {
            value,
            fitness: 0.0,
        }
    }
}

/// Counts structural changes so tests can
/// observe cache resets.
#[derive(Debug, Default)]
pub(crate) struct ScalarHistory {
    pub(crate) resets: usize,
}

impl InnovationHistory for ScalarHistory {
    type Config = ();

    fn new(_: &()) -> ScalarHistory {
        ScalarHistory::default()
    }

    fn reset_generation_cache(&mut self) {
        self.resets += 1;
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Gain(f32);

impl Phenotype for Gain {
    type Error = Infallible;

    fn activate(&mut self, inputs: &[f32]) -> Result<Vec<f32>, Infallible> {
        Ok(inputs.iter().map(|i| i * self.0).collect())
    }
}

impl Genome for Scalar {
    type Config = ();
    type InnovationHistory = ScalarHistory;
    type Phenotype = Gain;

    fn new<R: Rng + ?Sized>(_: &(), rng: &mut R) -> Scalar {
        Scalar::with_value(rng.gen_range(0.0..10.0))
    }

    fn genetic_distance(first: &Scalar, second: &Scalar, _: &()) -> f32 {
        (first.value - second.value).abs()
    }

    fn mate<R: Rng + ?Sized>(parent1: &Scalar, parent2: &Scalar, _: &(), _: &mut R) -> Scalar {
        Scalar::with_value((parent1.value + parent2.value) / 2.0)
    }

    fn mutate<R: Rng + ?Sized>(&mut self, _: &mut ScalarHistory, _: &(), rng: &mut R) {
        self.value += rng.gen_range(-0.5..0.5);
    }

    fn express(&self, _: &()) -> Result<Gain, Infallible> {
        Ok(Gain(self.value))
    }

    fn conforms_to(&self, _: &()) -> bool {
        self.value.is_finite()
    }

    fn advance_history(&self, _: &mut ScalarHistory) {}

    fn set_fitness(&mut self, fitness: f32) {
        self.fitness = fitness;
    }

    fn fitness(&self) -> f32 {
        self.fitness
    }
}
