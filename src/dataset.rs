//! Training sets
//!
//! A training set pairs feature vectors with target vectors of uniform
//! widths. The built-in sets are the 15-cell digit glyphs (five rows of
//! three cells, one-hot targets over ten classes) and XOR.

use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::SegnetError;
use crate::neural::NeuralError;

/// Cells of the ten digit glyphs, row-major 5x3
pub const DIGIT_GLYPHS: [[u8; 15]; 10] = [
    [1, 1, 1, 1, 0, 1, 1, 0, 1, 1, 0, 1, 1, 1, 1],
    [0, 1, 1, 1, 0, 1, 0, 0, 1, 0, 0, 1, 0, 0, 1],
    [1, 1, 1, 0, 0, 1, 0, 1, 0, 1, 0, 0, 1, 1, 1],
    [1, 1, 1, 0, 0, 1, 1, 1, 1, 0, 0, 1, 1, 1, 1],
    [1, 0, 1, 1, 0, 1, 1, 1, 1, 0, 0, 1, 0, 0, 1],
    [1, 1, 1, 1, 0, 0, 1, 1, 1, 0, 0, 1, 1, 1, 1],
    [1, 1, 1, 1, 0, 0, 1, 1, 1, 1, 0, 1, 1, 1, 1],
    [1, 1, 1, 0, 0, 1, 0, 1, 0, 0, 1, 0, 1, 0, 0],
    [1, 1, 1, 1, 0, 1, 1, 1, 1, 1, 0, 1, 1, 1, 1],
    [1, 1, 1, 1, 0, 1, 1, 1, 1, 0, 0, 1, 1, 1, 1],
];

/// Paired feature and target vectors
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingSet {
    inputs: Vec<Vec<f64>>,
    targets: Vec<Vec<f64>>,
}

#[derive(Deserialize)]
struct RawTrainingSet {
    inputs: Vec<Vec<f64>>,
    targets: Vec<Vec<f64>>,
}

impl TrainingSet {
    /// Pairs inputs with targets. Both lists must have the same length and
    /// every vector within a list the same width.
    pub fn new(inputs: Vec<Vec<f64>>, targets: Vec<Vec<f64>>) -> Result<Self, NeuralError> {
        if targets.len() != inputs.len() {
            return Err(NeuralError::ShapeMismatch {
                what: "training targets",
                got: targets.len(),
                expected: inputs.len(),
            });
        }
        check_uniform("input vector", &inputs)?;
        check_uniform("target vector", &targets)?;

        Ok(TrainingSet { inputs, targets })
    }

    /// The ten digit glyphs with one-hot targets.
    pub fn seven_segment() -> Self {
        let inputs = DIGIT_GLYPHS
            .iter()
            .map(|glyph| glyph.iter().map(|&cell| f64::from(cell)).collect())
            .collect();
        let targets = (0..DIGIT_GLYPHS.len())
            .map(|digit| one_hot(digit, DIGIT_GLYPHS.len()))
            .collect();
        TrainingSet { inputs, targets }
    }

    /// Two-input XOR.
    pub fn xor() -> Self {
        TrainingSet {
            inputs: vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 1.0], vec![0.0, 0.0]],
            targets: vec![vec![1.0], vec![1.0], vec![0.0], vec![0.0]],
        }
    }

    /// Loads a set from a YAML file with `inputs` and `targets` lists.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SegnetError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .map_err(|e| SegnetError::Io(format!("{}: {}", path.display(), e)))?;
        let set = Self::from_yaml_str(&data)?;
        info!("Loaded {} training examples from {}", set.len(), path.display());
        Ok(set)
    }

    /// Parses a set from YAML.
    pub fn from_yaml_str(data: &str) -> Result<Self, SegnetError> {
        let raw: RawTrainingSet =
            serde_yaml::from_str(data).map_err(|e| SegnetError::Parse(e.to_string()))?;
        Ok(Self::new(raw.inputs, raw.targets)?)
    }

    /// Feature vectors
    pub fn inputs(&self) -> &[Vec<f64>] {
        &self.inputs
    }

    /// Target vectors
    pub fn targets(&self) -> &[Vec<f64>] {
        &self.targets
    }

    /// Number of examples
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Whether the set has no examples
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Width of the feature vectors, `None` for an empty set
    pub fn input_width(&self) -> Option<usize> {
        self.inputs.first().map(Vec::len)
    }

    /// Width of the target vectors, `None` for an empty set
    pub fn target_width(&self) -> Option<usize> {
        self.targets.first().map(Vec::len)
    }

    /// Iterates over `(input, target)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&[f64], &[f64])> {
        self.inputs
            .iter()
            .zip(&self.targets)
            .map(|(input, target)| (input.as_slice(), target.as_slice()))
    }
}

fn one_hot(index: usize, width: usize) -> Vec<f64> {
    (0..width).map(|i| if i == index { 1.0 } else { 0.0 }).collect()
}

fn check_uniform(what: &'static str, vectors: &[Vec<f64>]) -> Result<(), NeuralError> {
    let Some(expected) = vectors.first().map(Vec::len) else {
        return Ok(());
    };
    if let Some(vector) = vectors.iter().find(|v| v.len() != expected) {
        return Err(NeuralError::ShapeMismatch {
            what,
            got: vector.len(),
            expected,
        });
    }
    Ok(())
}
