//! Segnet - Seven-Segment Digit Network
//!
//! This library provides a fully connected feedforward network with one
//! hidden layer, trained online by backpropagation with momentum, together
//! with the digit glyph training set and YAML configuration loading.

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

pub mod dataset;
pub mod neural;

use std::path::{Path, PathBuf};

// Re-export commonly used items for easier access
pub use dataset::TrainingSet;
pub use neural::{
    HiddenDeltaRule, LayerSizes, Network, NetworkConfig, NeuralError, NeuronRole, SynapseRole,
    TrainingConfig, TrainingObserver, TrainingState, UpdateRule,
};

/// Main configuration structure for Segnet
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SegnetConfig {
    /// Network and training configuration
    pub network: NetworkConfig,
    /// Training set file; the digit glyphs are used when absent
    pub dataset: Option<PathBuf>,
}

impl SegnetConfig {
    /// Loads the configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SegnetError> {
        let path = path.as_ref();
        log::info!("Loading configuration from: {}", path.display());

        let data = std::fs::read_to_string(path)
            .map_err(|e| SegnetError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml_str(&data)
    }

    /// Parses and validates the configuration.
    pub fn from_yaml_str(data: &str) -> Result<Self, SegnetError> {
        let config: SegnetConfig =
            serde_yaml::from_str(data).map_err(|e| SegnetError::Parse(e.to_string()))?;
        config.network.validate()?;
        Ok(config)
    }

    /// The configured training set, checked against the layer sizes.
    pub fn training_set(&self) -> Result<TrainingSet, SegnetError> {
        let set = match &self.dataset {
            Some(path) => TrainingSet::load(path)?,
            None => TrainingSet::seven_segment(),
        };

        let layers = self.network.layers;
        if let Some(width) = set.input_width().filter(|&w| w != layers.input) {
            return Err(NeuralError::ShapeMismatch {
                what: "input vector",
                got: width,
                expected: layers.input,
            }
            .into());
        }
        if let Some(width) = set.target_width().filter(|&w| w != layers.output) {
            return Err(NeuralError::ShapeMismatch {
                what: "target vector",
                got: width,
                expected: layers.output,
            }
            .into());
        }
        Ok(set)
    }
}

/// Segnet error types
#[derive(Debug)]
pub enum SegnetError {
    /// Network construction, training or inference error
    Neural(NeuralError),
    /// File could not be read
    Io(String),
    /// File could not be parsed
    Parse(String),
}

impl std::fmt::Display for SegnetError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SegnetError::Neural(err) => write!(f, "Neural error: {}", err),
            SegnetError::Io(msg) => write!(f, "I/O error: {}", msg),
            SegnetError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for SegnetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SegnetError::Neural(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NeuralError> for SegnetError {
    fn from(err: NeuralError) -> Self {
        SegnetError::Neural(err)
    }
}
