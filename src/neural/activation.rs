//! Logistic activation used by every computed neuron.

/// Logistic sigmoid, `1 / (1 + e^-x)`.
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Sigmoid derivative expressed through an already activated value `y = sigmoid(x)`.
pub fn sigmoid_derivative(y: f64) -> f64 {
    (1.0 - y) * y
}
