//! Atomic computational unit of the network.

use super::activation::{sigmoid, sigmoid_derivative};
use super::{NeuronRole, SynapseId};

/// A single neuron.
///
/// Input neurons are clamped with [`Neuron::set_value`]. Hidden and output
/// neurons receive the weighted sum of their incoming synapses from the
/// owning network and squash it through the sigmoid.
#[derive(Debug, Clone)]
pub struct Neuron {
    role: NeuronRole,
    activation: f64,
    delta: Option<f64>,
    error: Option<f64>,
    synapses: Vec<SynapseId>,
}

impl Neuron {
    /// Creates a neuron with zero activation and no attached synapses.
    pub fn new(role: NeuronRole) -> Self {
        Neuron {
            role,
            activation: 0.0,
            delta: None,
            error: None,
            synapses: Vec::new(),
        }
    }

    /// Role fixed at creation
    pub fn role(&self) -> NeuronRole {
        self.role
    }

    /// Current output value
    pub fn activation(&self) -> f64 {
        self.activation
    }

    /// Overwrites the activation directly. Only used to clamp input neurons.
    pub fn set_value(&mut self, value: f64) {
        self.activation = value;
    }

    /// Sets the activation to `sigmoid(weighted_sum)`.
    pub fn compute_value(&mut self, weighted_sum: f64) {
        self.activation = sigmoid(weighted_sum);
    }

    /// Output-layer delta against the desired value.
    pub fn compute_delta(&mut self, desired: f64) {
        self.delta = Some((desired - self.activation) * sigmoid_derivative(self.activation));
    }

    /// Overwrites the delta with a backpropagated error signal.
    pub fn set_delta(&mut self, delta: f64) {
        self.delta = Some(delta);
    }

    /// Adds to the delta, treating an unset delta as zero.
    pub fn add_delta(&mut self, delta: f64) {
        self.delta = Some(self.delta.unwrap_or_default() + delta);
    }

    /// Error signal from the latest backward pass, `None` before the first one.
    pub fn delta(&self) -> Option<f64> {
        self.delta
    }

    /// Diagnostic squared error against the desired value. Has no effect on training.
    pub fn compute_error(&mut self, desired: f64) {
        self.error = Some((desired - self.activation).powi(2));
    }

    /// Squared error from the latest training example, output neurons only.
    pub fn error(&self) -> Option<f64> {
        self.error
    }

    /// Attaches a synapse this neuron is either the source or destination of.
    pub fn add_synapse(&mut self, synapse: SynapseId) {
        self.synapses.push(synapse);
    }

    /// Attached synapses in insertion order
    pub fn synapses(&self) -> &[SynapseId] {
        &self.synapses
    }
}
