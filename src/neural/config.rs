// src/neural/config.rs
// Layer sizes and training parameters for the network.

use serde::{Deserialize, Serialize};

use super::{NeuralError, UpdateRule};

/// Sizes of the three populated layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerSizes {
    /// Number of input neurons
    pub input: usize,
    /// Number of hidden neurons
    pub hidden: usize,
    /// Number of output neurons
    pub output: usize,
}

impl Default for LayerSizes {
    fn default() -> Self {
        LayerSizes {
            input: 15,
            hidden: 20,
            output: 10,
        }
    }
}

impl LayerSizes {
    /// Every layer needs at least one neuron.
    pub fn validate(&self) -> Result<(), NeuralError> {
        for (name, size) in [("input", self.input), ("hidden", self.hidden), ("output", self.output)] {
            if size == 0 {
                return Err(NeuralError::Configuration(format!(
                    "{} layer size must be at least 1",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// How a hidden neuron's delta is formed from its outgoing synapses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HiddenDeltaRule {
    /// Each outgoing synapse overwrites the delta; the last one processed wins.
    #[default]
    Overwrite,
    /// Deltas from all outgoing synapses are summed.
    Accumulate,
}

/// Training loop parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of full passes over the training set
    pub epochs: usize,
    /// Gradient scale of the update rule
    pub learning_rate: f64,
    /// Momentum of the update rule
    pub momentum: f64,
    /// Hidden-layer delta aggregation
    pub hidden_delta_rule: HiddenDeltaRule,
    /// Report progress every this many epochs, 0 reports only the last one
    pub log_interval: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        let rule = UpdateRule::default();
        TrainingConfig {
            epochs: 400_000,
            learning_rate: rule.learning_rate,
            momentum: rule.momentum,
            hidden_delta_rule: HiddenDeltaRule::default(),
            log_interval: 10_000,
        }
    }
}

impl TrainingConfig {
    /// Update rule built from the configured coefficients
    pub fn update_rule(&self) -> UpdateRule {
        UpdateRule {
            learning_rate: self.learning_rate,
            momentum: self.momentum,
        }
    }

    /// Coefficients must be finite.
    pub fn validate(&self) -> Result<(), NeuralError> {
        if !self.learning_rate.is_finite() {
            return Err(NeuralError::Configuration(format!(
                "learning rate must be finite, got {}",
                self.learning_rate
            )));
        }
        if !self.momentum.is_finite() {
            return Err(NeuralError::Configuration(format!(
                "momentum must be finite, got {}",
                self.momentum
            )));
        }
        Ok(())
    }

    /// Whether progress should be reported after `epoch`.
    pub fn reports_epoch(&self, epoch: usize) -> bool {
        epoch == self.epochs || (self.log_interval > 0 && epoch % self.log_interval == 0)
    }
}

/// Network configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Layer sizes
    pub layers: LayerSizes,
    /// Training parameters
    pub training: TrainingConfig,
    /// Seed for weight initialisation, `None` draws from the OS
    pub seed: Option<u64>,
}

impl NetworkConfig {
    /// Configuration with the given layer sizes and default training parameters.
    pub fn new(input: usize, hidden: usize, output: usize) -> Self {
        NetworkConfig {
            layers: LayerSizes {
                input,
                hidden,
                output,
            },
            ..Default::default()
        }
    }

    /// Sets the weight initialisation seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the epoch budget.
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.training.epochs = epochs;
        self
    }

    /// Sets the hidden delta rule.
    pub fn with_hidden_delta_rule(mut self, rule: HiddenDeltaRule) -> Self {
        self.training.hidden_delta_rule = rule;
        self
    }

    /// Sets the progress reporting interval.
    pub fn with_log_interval(mut self, interval: usize) -> Self {
        self.training.log_interval = interval;
        self
    }

    /// Validates layer sizes and training parameters.
    pub fn validate(&self) -> Result<(), NeuralError> {
        self.layers.validate()?;
        self.training.validate()
    }
}
