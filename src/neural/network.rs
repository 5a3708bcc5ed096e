//! Network construction, training and inference
//!
//! Neurons and synapses are stored in flat arenas. Each synapse records the
//! ids of its two endpoints, each neuron records the ids of every synapse
//! attached to it, and the network keeps per-role adjacency from a
//! destination neuron to its incoming synapses for the forward pass.

use std::collections::HashMap;
use std::time::Instant;

use log::{debug, info};
use rand::{Rng, SeedableRng, rngs::StdRng};

use super::activation::sigmoid_derivative;
use super::{
    HiddenDeltaRule, NetworkConfig, NeuralError, Neuron, NeuronId, NeuronRole, Synapse, SynapseId,
    SynapseRole, UpdateRule,
};

/// Progress of the training loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingState {
    /// No training has been started
    Idle,
    /// Currently inside the given epoch (1-based)
    Running {
        /// Current epoch
        epoch: usize,
    },
    /// The epoch budget has been spent
    Complete {
        /// Number of epochs run
        epochs: usize,
    },
}

/// Receives training progress and the completion hand-off.
#[cfg_attr(test, mockall::automock)]
pub trait TrainingObserver {
    /// Called on reporting epochs with the mean squared error over the training set.
    fn on_epoch(&mut self, _epoch: usize, _mean_squared_error: f64) {}

    /// Called exactly once after the final epoch.
    fn on_complete(&mut self, network: &mut Network);
}

impl<F> TrainingObserver for F
where
    F: FnMut(&mut Network),
{
    fn on_complete(&mut self, network: &mut Network) {
        self(network)
    }
}

/// Fully connected network with one hidden layer
#[derive(Debug, Clone)]
pub struct Network {
    config: NetworkConfig,
    neurons: Vec<Neuron>,
    synapses: Vec<Synapse>,
    layers: HashMap<NeuronRole, Vec<NeuronId>>,
    synapses_by_role: HashMap<SynapseRole, Vec<SynapseId>>,
    incoming: HashMap<SynapseRole, Vec<Vec<SynapseId>>>,
    state: TrainingState,
}

impl Network {
    /// Builds a network, seeding weights from `config.seed` or the OS.
    pub fn new(config: NetworkConfig) -> Result<Self, NeuralError> {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::with_rng(config, &mut rng)
    }

    /// Builds a network drawing initial weights from `rng`.
    pub fn with_rng<R: Rng + ?Sized>(config: NetworkConfig, rng: &mut R) -> Result<Self, NeuralError> {
        config.validate()?;

        let mut network = Network {
            config,
            neurons: Vec::new(),
            synapses: Vec::new(),
            layers: HashMap::new(),
            synapses_by_role: HashMap::new(),
            incoming: HashMap::new(),
            state: TrainingState::Idle,
        };

        let sizes = network.config.layers;
        network.create_layer(NeuronRole::Input, sizes.input);
        network.create_layer(NeuronRole::Hidden, sizes.hidden);
        network.create_layer(NeuronRole::Output, sizes.output);
        network.create_synapses(rng);

        info!(
            "Created network {}-{}-{} with {} synapses",
            sizes.input,
            sizes.hidden,
            sizes.output,
            network.synapses.len()
        );

        Ok(network)
    }

    fn create_layer(&mut self, role: NeuronRole, size: usize) {
        let ids = self.create_neurons(role, size);
        self.layers.insert(role, ids);
    }

    fn create_neurons(&mut self, role: NeuronRole, size: usize) -> Vec<NeuronId> {
        (0..size)
            .map(|_| {
                self.neurons.push(Neuron::new(role));
                NeuronId(self.neurons.len() - 1)
            })
            .collect()
    }

    // Weights are drawn per hidden neuron: its inputs first, then its outputs.
    fn create_synapses<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for role in [SynapseRole::InputToHidden, SynapseRole::HiddenToOutput] {
            self.synapses_by_role.insert(role, Vec::new());
            self.incoming.insert(role, vec![Vec::new(); self.neurons.len()]);
        }

        let inputs = self.layer(NeuronRole::Input).to_vec();
        let hidden = self.layer(NeuronRole::Hidden).to_vec();
        let outputs = self.layer(NeuronRole::Output).to_vec();

        for &h in &hidden {
            for &i in &inputs {
                self.make_reference(SynapseRole::InputToHidden, i, h, rng);
            }
            for &o in &outputs {
                self.make_reference(SynapseRole::HiddenToOutput, h, o, rng);
            }
        }
    }

    fn make_reference<R: Rng + ?Sized>(
        &mut self,
        role: SynapseRole,
        source: NeuronId,
        destination: NeuronId,
        rng: &mut R,
    ) {
        let id = SynapseId(self.synapses.len());
        self.synapses.push(Synapse::new(role, source, destination, rng));

        if let Some(ids) = self.synapses_by_role.get_mut(&role) {
            ids.push(id);
        }
        if let Some(adjacency) = self.incoming.get_mut(&role) {
            adjacency[destination.0].push(id);
        }
        self.neurons[source.0].add_synapse(id);
        self.neurons[destination.0].add_synapse(id);
    }

    /// Configuration the network was built from
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Current training state
    pub fn state(&self) -> TrainingState {
        self.state
    }

    /// Neurons of a layer in creation order. Empty for unpopulated roles.
    pub fn layer(&self, role: NeuronRole) -> &[NeuronId] {
        self.layers.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Synapses of a role in creation order. Empty for unpopulated roles.
    pub fn synapses(&self, role: SynapseRole) -> &[SynapseId] {
        self.synapses_by_role.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Incoming synapses of `role` terminating at `neuron`
    pub fn incoming(&self, role: SynapseRole, neuron: NeuronId) -> &[SynapseId] {
        self.incoming
            .get(&role)
            .and_then(|adjacency| adjacency.get(neuron.0))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Neuron by id
    pub fn neuron(&self, id: NeuronId) -> &Neuron {
        &self.neurons[id.0]
    }

    /// Synapse by id
    pub fn synapse(&self, id: SynapseId) -> &Synapse {
        &self.synapses[id.0]
    }

    /// Squared errors of the output neurons from the latest training example
    pub fn output_errors(&self) -> Vec<Option<f64>> {
        self.layer(NeuronRole::Output)
            .iter()
            .map(|&id| self.neurons[id.0].error())
            .collect()
    }

    /// Trains online over `inputs`/`targets` for the configured epoch budget
    /// and hands the trained network to `observer` when done.
    pub fn train<O>(
        &mut self,
        inputs: &[Vec<f64>],
        targets: &[Vec<f64>],
        observer: &mut O,
    ) -> Result<(), NeuralError>
    where
        O: TrainingObserver + ?Sized,
    {
        self.check_training_set(inputs, targets)?;

        let epochs = self.config.training.epochs;
        let rule = self.config.training.update_rule();
        info!(
            "Training on {} examples for {} epochs ({:?} hidden deltas)",
            inputs.len(),
            epochs,
            self.config.training.hidden_delta_rule
        );

        let start_time = Instant::now();
        for epoch in 1..=epochs {
            self.state = TrainingState::Running { epoch };
            for (sample, target) in inputs.iter().zip(targets) {
                self.train_example(sample, target, &rule);
            }

            if self.config.training.reports_epoch(epoch) {
                let mse = self.mean_squared_error_unchecked(inputs, targets);
                debug!("Epoch {}/{}: mean squared error {:.6}", epoch, epochs, mse);
                observer.on_epoch(epoch, mse);
            }
        }
        self.state = TrainingState::Complete { epochs };
        info!("Training finished in {:?}", start_time.elapsed());

        observer.on_complete(self);
        Ok(())
    }

    /// Runs one forward pass and returns the output activations.
    pub fn run(&mut self, sample: &[f64]) -> Result<Vec<f64>, NeuralError> {
        self.check_sample(sample)?;

        let start_time = Instant::now();
        self.set_input(sample);
        self.forward();
        let outputs = self.output_values();
        debug!("Inference time: {:?}", start_time.elapsed());

        Ok(outputs)
    }

    /// Index of the output neuron with the highest activation for `sample`.
    pub fn predict(&mut self, sample: &[f64]) -> Result<usize, NeuralError> {
        let outputs = self.run(sample)?;
        Ok(outputs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(index, _)| index)
            .unwrap_or_default())
    }

    /// Mean over the examples of the mean squared output error. Weights are untouched.
    pub fn mean_squared_error(
        &mut self,
        inputs: &[Vec<f64>],
        targets: &[Vec<f64>],
    ) -> Result<f64, NeuralError> {
        self.check_training_set(inputs, targets)?;
        Ok(self.mean_squared_error_unchecked(inputs, targets))
    }

    fn mean_squared_error_unchecked(&mut self, inputs: &[Vec<f64>], targets: &[Vec<f64>]) -> f64 {
        if inputs.is_empty() {
            return 0.0;
        }

        let total: f64 = inputs
            .iter()
            .zip(targets)
            .map(|(sample, target)| {
                self.set_input(sample);
                self.forward();
                let squared: f64 = self
                    .output_values()
                    .iter()
                    .zip(target)
                    .map(|(actual, desired)| (desired - actual).powi(2))
                    .sum();
                squared / target.len() as f64
            })
            .sum();

        total / inputs.len() as f64
    }

    fn train_example(&mut self, sample: &[f64], target: &[f64], rule: &UpdateRule) {
        self.set_input(sample);
        self.compute_layer(NeuronRole::Hidden, SynapseRole::InputToHidden);

        for index in 0..self.layer(NeuronRole::Output).len() {
            let id = self.layers[&NeuronRole::Output][index];
            self.compute_value(id, SynapseRole::HiddenToOutput);

            let neuron = &mut self.neurons[id.0];
            neuron.compute_error(target[index]);
            neuron.compute_delta(target[index]);
        }

        // Every hidden delta must be final before the input side reads it.
        self.backpropagate_output(rule);
        self.backpropagate_hidden(rule);
    }

    fn backpropagate_output(&mut self, rule: &UpdateRule) {
        let accumulate = self.config.training.hidden_delta_rule == HiddenDeltaRule::Accumulate;
        let Network {
            neurons,
            synapses,
            layers,
            synapses_by_role,
            ..
        } = self;

        if accumulate {
            for id in &layers[&NeuronRole::Hidden] {
                neurons[id.0].set_delta(0.0);
            }
        }

        for id in &synapses_by_role[&SynapseRole::HiddenToOutput] {
            let synapse = &mut synapses[id.0];
            let source_value = neurons[synapse.source().0].activation();
            let destination_delta = neurons[synapse.destination().0].delta().unwrap_or_default();

            let backpropagated = sigmoid_derivative(source_value) * (synapse.weight() * destination_delta);
            let source = &mut neurons[synapse.source().0];
            if accumulate {
                source.add_delta(backpropagated);
            } else {
                source.set_delta(backpropagated);
            }

            synapse.set_gradient(source_value * destination_delta);
            synapse.adjust_weight(rule);
        }
    }

    fn backpropagate_hidden(&mut self, rule: &UpdateRule) {
        let Network {
            neurons,
            synapses,
            synapses_by_role,
            ..
        } = self;

        for id in &synapses_by_role[&SynapseRole::InputToHidden] {
            let synapse = &mut synapses[id.0];
            let gradient = neurons[synapse.source().0].activation()
                * neurons[synapse.destination().0].delta().unwrap_or_default();
            synapse.set_gradient(gradient);
            synapse.adjust_weight(rule);
        }
    }

    fn set_input(&mut self, sample: &[f64]) {
        for (index, &value) in sample.iter().enumerate() {
            let id = self.layers[&NeuronRole::Input][index];
            self.neurons[id.0].set_value(value);
        }
    }

    fn forward(&mut self) {
        self.compute_layer(NeuronRole::Hidden, SynapseRole::InputToHidden);
        self.compute_layer(NeuronRole::Output, SynapseRole::HiddenToOutput);
    }

    fn compute_layer(&mut self, layer: NeuronRole, role: SynapseRole) {
        for index in 0..self.layer(layer).len() {
            let id = self.layers[&layer][index];
            self.compute_value(id, role);
        }
    }

    fn compute_value(&mut self, id: NeuronId, role: SynapseRole) {
        let weighted_sum: f64 = self
            .incoming(role, id)
            .iter()
            .map(|&s| {
                let synapse = &self.synapses[s.0];
                synapse.weight() * synapse.input_value(&self.neurons)
            })
            .sum();
        self.neurons[id.0].compute_value(weighted_sum);
    }

    fn output_values(&self) -> Vec<f64> {
        self.layer(NeuronRole::Output)
            .iter()
            .map(|&id| self.neurons[id.0].activation())
            .collect()
    }

    fn check_sample(&self, sample: &[f64]) -> Result<(), NeuralError> {
        let expected = self.config.layers.input;
        if sample.len() != expected {
            return Err(NeuralError::ShapeMismatch {
                what: "input sample",
                got: sample.len(),
                expected,
            });
        }
        Ok(())
    }

    fn check_training_set(&self, inputs: &[Vec<f64>], targets: &[Vec<f64>]) -> Result<(), NeuralError> {
        if targets.len() != inputs.len() {
            return Err(NeuralError::ShapeMismatch {
                what: "training targets",
                got: targets.len(),
                expected: inputs.len(),
            });
        }
        for sample in inputs {
            self.check_sample(sample)?;
        }
        let expected = self.config.layers.output;
        if let Some(target) = targets.iter().find(|t| t.len() != expected) {
            return Err(NeuralError::ShapeMismatch {
                what: "target vector",
                got: target.len(),
                expected,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neural::activation::sigmoid;
    use crate::neural::synapse::initial_weight;
    use mockall::predicate::eq;
    use rstest::rstest;
    use std::collections::HashSet;

    fn network(input: usize, hidden: usize, output: usize) -> Network {
        Network::new(NetworkConfig::new(input, hidden, output).with_seed(7)).unwrap()
    }

    #[rstest]
    #[case(1, 1, 1)]
    #[case(2, 2, 1)]
    #[case(3, 4, 2)]
    #[case(15, 20, 10)]
    fn topology_is_complete_bipartite(#[case] i: usize, #[case] h: usize, #[case] o: usize) {
        let net = network(i, h, o);
        assert_eq!(net.layer(NeuronRole::Input).len(), i);
        assert_eq!(net.layer(NeuronRole::Hidden).len(), h);
        assert_eq!(net.layer(NeuronRole::Output).len(), o);
        assert!(net.layer(NeuronRole::Bias).is_empty());
        assert!(net.synapses(SynapseRole::HiddenToHidden).is_empty());

        for (role, from, to) in [
            (SynapseRole::InputToHidden, NeuronRole::Input, NeuronRole::Hidden),
            (SynapseRole::HiddenToOutput, NeuronRole::Hidden, NeuronRole::Output),
        ] {
            let pairs: HashSet<_> = net
                .synapses(role)
                .iter()
                .map(|&id| {
                    let s = net.synapse(id);
                    assert_eq!(s.role(), role);
                    assert_eq!(net.neuron(s.source()).role(), from);
                    assert_eq!(net.neuron(s.destination()).role(), to);
                    (s.source(), s.destination())
                })
                .collect();
            let expected = net.layer(from).len() * net.layer(to).len();
            assert_eq!(net.synapses(role).len(), expected);
            assert_eq!(pairs.len(), expected, "duplicate pair for {:?}", role);
        }
    }

    #[test]
    fn neurons_are_attached_to_both_ends() {
        let net = network(3, 4, 2);
        for &id in net.layer(NeuronRole::Input) {
            assert_eq!(net.neuron(id).synapses().len(), 4);
        }
        for &id in net.layer(NeuronRole::Hidden) {
            assert_eq!(net.neuron(id).synapses().len(), 3 + 2);
            assert_eq!(net.incoming(SynapseRole::InputToHidden, id).len(), 3);
            assert!(net.incoming(SynapseRole::HiddenToOutput, id).is_empty());
        }
        for &id in net.layer(NeuronRole::Output) {
            assert_eq!(net.neuron(id).synapses().len(), 4);
            assert_eq!(net.incoming(SynapseRole::HiddenToOutput, id).len(), 4);
        }
    }

    #[test]
    fn weights_are_drawn_per_hidden_neuron_in_creation_order() {
        let net = Network::with_rng(NetworkConfig::new(2, 2, 3), &mut StdRng::seed_from_u64(3)).unwrap();

        let mut rng = StdRng::seed_from_u64(3);
        let mut input_side = Vec::new();
        let mut output_side = Vec::new();
        for _ in 0..2 {
            input_side.extend((0..2).map(|_| initial_weight(&mut rng)));
            output_side.extend((0..3).map(|_| initial_weight(&mut rng)));
        }

        let weights = |role| -> Vec<f64> {
            net.synapses(role).iter().map(|&id| net.synapse(id).weight()).collect()
        };
        assert_eq!(weights(SynapseRole::InputToHidden), input_side);
        assert_eq!(weights(SynapseRole::HiddenToOutput), output_side);
    }

    #[test]
    fn same_seed_builds_same_network() {
        let a = network(4, 5, 3);
        let b = network(4, 5, 3);
        let weights = |net: &Network| -> Vec<f64> {
            net.synapses.iter().map(Synapse::weight).collect()
        };
        assert_eq!(weights(&a), weights(&b));
    }

    #[test]
    fn zero_sized_layer_is_a_configuration_error() {
        let result = Network::new(NetworkConfig::new(0, 2, 1));
        assert!(matches!(result, Err(NeuralError::Configuration(_))));
    }

    #[test]
    fn run_is_deterministic_and_in_range() {
        let mut net = network(3, 4, 2);
        let first = net.run(&[1.0, 0.0, 1.0]).unwrap();
        net.run(&[0.0, 1.0, 0.0]).unwrap();
        let second = net.run(&[1.0, 0.0, 1.0]).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert!(first.iter().all(|&v| v > 0.0 && v < 1.0));
    }

    #[test]
    fn run_matches_hand_computed_forward_pass() {
        let mut net = network(2, 1, 1);
        let w_in: Vec<f64> = net
            .synapses(SynapseRole::InputToHidden)
            .iter()
            .map(|&id| net.synapse(id).weight())
            .collect();
        let w_out = net.synapse(net.synapses(SynapseRole::HiddenToOutput)[0]).weight();

        let hidden = sigmoid(w_in[0] * 1.0 + w_in[1] * 0.5);
        let expected = sigmoid(w_out * hidden);
        let output = net.run(&[1.0, 0.5]).unwrap();
        assert!((output[0] - expected).abs() < 1e-12);
    }

    #[rstest]
    #[case(vec![1.0, 0.0])]
    #[case(vec![1.0, 0.0, 1.0, 1.0])]
    #[case(vec![])]
    fn run_rejects_wrong_sample_length(#[case] sample: Vec<f64>) {
        let mut net = network(3, 2, 1);
        assert_eq!(
            net.run(&sample),
            Err(NeuralError::ShapeMismatch {
                what: "input sample",
                got: sample.len(),
                expected: 3
            })
        );
    }

    fn set_weight(net: &mut Network, id: SynapseId, weight: f64) {
        let old = net.synapse(id);
        let replacement = Synapse::with_weight(old.role(), old.source(), old.destination(), weight);
        net.synapses[id.0] = replacement;
    }

    fn configure(net: &mut Network, input_to_hidden: f64, hidden_to_output: &[f64]) {
        let ih = net.synapses(SynapseRole::InputToHidden)[0];
        set_weight(net, ih, input_to_hidden);
        for (index, &weight) in hidden_to_output.iter().enumerate() {
            let id = net.synapses(SynapseRole::HiddenToOutput)[index];
            set_weight(net, id, weight);
        }
    }

    #[rstest]
    #[case(HiddenDeltaRule::Overwrite)]
    #[case(HiddenDeltaRule::Accumulate)]
    fn single_training_step_follows_update_order(#[case] rule: HiddenDeltaRule) {
        let config = NetworkConfig::new(1, 1, 2)
            .with_seed(1)
            .with_epochs(1)
            .with_hidden_delta_rule(rule);
        let mut net = Network::new(config).unwrap();
        configure(&mut net, 0.5, &[0.3, -0.2]);

        net.train(&[vec![1.0]], &[vec![1.0, 0.0]], &mut |_: &mut Network| {})
            .unwrap();

        let h = sigmoid(0.5);
        let o0 = sigmoid(0.3 * h);
        let o1 = sigmoid(-0.2 * h);
        let d0 = (1.0 - o0) * o0 * (1.0 - o0);
        let d1 = (0.0 - o1) * o1 * (1.0 - o1);
        let hidden_delta = match rule {
            HiddenDeltaRule::Overwrite => h * (1.0 - h) * (-0.2 * d1),
            HiddenDeltaRule::Accumulate => h * (1.0 - h) * (0.3 * d0) + h * (1.0 - h) * (-0.2 * d1),
        };

        let out = net.synapses(SynapseRole::HiddenToOutput).to_vec();
        assert!((net.synapse(out[0]).weight() - (0.3 + 0.1 * h * d0)).abs() < 1e-12);
        assert!((net.synapse(out[1]).weight() - (-0.2 + 0.1 * h * d1)).abs() < 1e-12);

        let ih = net.synapses(SynapseRole::InputToHidden)[0];
        assert!((net.synapse(ih).gradient() - hidden_delta).abs() < 1e-12);
        assert!((net.synapse(ih).weight() - (0.5 + 0.1 * hidden_delta)).abs() < 1e-12);

        let hidden = net.layer(NeuronRole::Hidden)[0];
        assert!((net.neuron(hidden).delta().unwrap() - hidden_delta).abs() < 1e-12);
        assert_eq!(net.output_errors(), vec![Some((1.0 - o0).powi(2)), Some(o1.powi(2))]);
    }

    #[test]
    fn train_rejects_mismatched_sets_without_touching_weights() {
        let mut net = network(2, 2, 1);
        let before: Vec<f64> = net.synapses.iter().map(Synapse::weight).collect();
        let mut observer = MockTrainingObserver::new();
        observer.expect_on_complete().never();
        observer.expect_on_epoch().never();

        let err = net
            .train(&[vec![0.0, 1.0], vec![1.0, 1.0]], &[vec![1.0]], &mut observer)
            .unwrap_err();
        assert_eq!(
            err,
            NeuralError::ShapeMismatch {
                what: "training targets",
                got: 1,
                expected: 2
            }
        );

        let err = net
            .train(&[vec![0.0, 1.0]], &[vec![1.0, 0.0]], &mut observer)
            .unwrap_err();
        assert!(matches!(err, NeuralError::ShapeMismatch { what: "target vector", .. }));

        let after: Vec<f64> = net.synapses.iter().map(Synapse::weight).collect();
        assert_eq!(before, after);
        assert_eq!(net.state(), TrainingState::Idle);
    }

    #[test]
    fn observer_sees_reporting_epochs_and_one_completion() {
        let config = NetworkConfig::new(2, 2, 1)
            .with_seed(5)
            .with_epochs(25)
            .with_log_interval(10);
        let mut net = Network::new(config).unwrap();

        let mut observer = MockTrainingObserver::new();
        for epoch in [10, 20, 25] {
            observer
                .expect_on_epoch()
                .with(eq(epoch), mockall::predicate::always())
                .times(1)
                .return_const(());
        }
        observer
            .expect_on_complete()
            .times(1)
            .returning(|network| {
                assert_eq!(network.state(), TrainingState::Complete { epochs: 25 });
            });

        net.train(&[vec![0.0, 1.0], vec![1.0, 0.0]], &[vec![1.0], vec![0.0]], &mut observer)
            .unwrap();
        assert_eq!(net.state(), TrainingState::Complete { epochs: 25 });
    }

    #[test]
    fn zero_epochs_still_completes() {
        let mut net = Network::new(NetworkConfig::new(1, 1, 1).with_seed(2).with_epochs(0)).unwrap();
        let mut calls = 0;
        net.train(&[vec![1.0]], &[vec![1.0]], &mut |_: &mut Network| calls += 1)
            .unwrap();
        assert_eq!(calls, 1);
        assert_eq!(net.state(), TrainingState::Complete { epochs: 0 });
    }
}
