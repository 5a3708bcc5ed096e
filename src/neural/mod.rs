//! Neural engine for Segnet
//!
//! This module provides a fully connected feedforward network with a single
//! hidden layer. Neurons and synapses live in arenas owned by [`Network`] and
//! refer to each other through stable indices.
pub mod activation;
pub mod config;
pub mod network;
pub mod neuron;
pub mod synapse;

pub use config::{HiddenDeltaRule, LayerSizes, NetworkConfig, TrainingConfig};
pub use network::{Network, TrainingObserver, TrainingState};
pub use neuron::Neuron;
pub use synapse::{Synapse, UpdateRule};

use serde::{Deserialize, Serialize};

/// Role of a neuron inside the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NeuronRole {
    /// Clamped to the presented sample
    Input,
    /// Computed from `InputToHidden` synapses
    Hidden,
    /// Computed from `HiddenToOutput` synapses
    Output,
    /// Reserved, never populated by the current topology
    Bias,
}

/// Which pair of adjacent layers a synapse connects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SynapseRole {
    /// Input layer to hidden layer
    InputToHidden,
    /// Reserved, never populated by the current topology
    HiddenToHidden,
    /// Hidden layer to output layer
    HiddenToOutput,
}

/// Stable index of a neuron in the network arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NeuronId(pub usize);

/// Stable index of a synapse in the network arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SynapseId(pub usize);

/// Neural network error types
#[derive(Debug, Clone, PartialEq)]
pub enum NeuralError {
    /// Invalid network or training configuration
    Configuration(String),
    /// A vector length disagrees with the network shape
    ShapeMismatch {
        /// What was being checked (e.g. "input sample")
        what: &'static str,
        /// Observed length
        got: usize,
        /// Expected length
        expected: usize,
    },
}

impl std::fmt::Display for NeuralError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            NeuralError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            NeuralError::ShapeMismatch { what, got, expected } => {
                write!(f, "Shape mismatch for {}: got {}, expected {}", what, got, expected)
            }
        }
    }
}

impl std::error::Error for NeuralError {}
