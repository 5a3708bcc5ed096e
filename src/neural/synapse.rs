//! Directed, weighted edge between two neurons of adjacent layers.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{Neuron, NeuronId, SynapseRole};

/// Upper bound (exclusive before rounding) of a freshly drawn weight
pub const MAX_INITIAL_WEIGHT: f64 = 0.9;

/// Momentum-based weight update coefficients
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UpdateRule {
    /// Scale applied to the gradient
    pub learning_rate: f64,
    /// Fraction of the previous update carried into the next one
    pub momentum: f64,
}

impl Default for UpdateRule {
    fn default() -> Self {
        UpdateRule {
            learning_rate: 0.1,
            momentum: 0.9,
        }
    }
}

/// A synapse between `source` and `destination`.
///
/// Creating a synapse does not register it with its endpoints, the network
/// attaches it to both neurons explicitly.
#[derive(Debug, Clone)]
pub struct Synapse {
    role: SynapseRole,
    source: NeuronId,
    destination: NeuronId,
    weight: f64,
    gradient: f64,
    previous_update: f64,
}

impl Synapse {
    /// Creates a synapse with a weight drawn from `rng`.
    pub fn new<R: Rng + ?Sized>(
        role: SynapseRole,
        source: NeuronId,
        destination: NeuronId,
        rng: &mut R,
    ) -> Self {
        Self::with_weight(role, source, destination, initial_weight(rng))
    }

    /// Creates a synapse with an explicit starting weight.
    pub fn with_weight(
        role: SynapseRole,
        source: NeuronId,
        destination: NeuronId,
        weight: f64,
    ) -> Self {
        Synapse {
            role,
            source,
            destination,
            weight,
            gradient: 0.0,
            previous_update: 0.0,
        }
    }

    /// Role fixed at creation
    pub fn role(&self) -> SynapseRole {
        self.role
    }

    /// Neuron the signal comes from
    pub fn source(&self) -> NeuronId {
        self.source
    }

    /// Neuron the signal flows into
    pub fn destination(&self) -> NeuronId {
        self.destination
    }

    /// Current weight
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Value flowing across this edge: the source activation.
    pub fn input_value(&self, neurons: &[Neuron]) -> f64 {
        neurons[self.source.0].activation()
    }

    /// Sets the per-step gradient.
    pub fn set_gradient(&mut self, gradient: f64) {
        self.gradient = gradient;
    }

    /// Gradient computed by the latest backward pass
    pub fn gradient(&self) -> f64 {
        self.gradient
    }

    /// Momentum accumulator
    pub fn previous_update(&self) -> f64 {
        self.previous_update
    }

    /// Applies `learning_rate * gradient + momentum * previous_update` to the
    /// weight and remembers it as the next previous update.
    pub fn adjust_weight(&mut self, rule: &UpdateRule) {
        let update = (rule.learning_rate * self.gradient) + (rule.momentum * self.previous_update);
        self.previous_update = update;
        self.weight += update;
    }
}

/// Draws a weight uniformly from `[0, 0.9)` and rounds it to four decimals.
pub fn initial_weight<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let raw: f64 = rng.random_range(0.0..MAX_INITIAL_WEIGHT);
    (raw * 10_000.0).round() / 10_000.0
}
