// src/main.rs
// Entry point for Segnet: trains the network and prints its answers for every training sample.

use log::{error, info};
use segnet::{Network, NeuralError, SegnetConfig, TrainingObserver};
use std::error::Error;

/// Prints progress while training and runs every sample once training completes.
struct ConsoleReport {
    samples: Vec<Vec<f64>>,
    failure: Option<NeuralError>,
}

impl TrainingObserver for ConsoleReport {
    fn on_epoch(&mut self, epoch: usize, mean_squared_error: f64) {
        info!("Epoch {}: mean squared error {:.6}", epoch, mean_squared_error);
    }

    fn on_complete(&mut self, network: &mut Network) {
        for (row, sample) in self.samples.iter().enumerate() {
            let outputs = match network.run(sample) {
                Ok(outputs) => outputs,
                Err(e) => {
                    error!("Inference failed for sample {}: {}", row, e);
                    self.failure = Some(e);
                    return;
                }
            };

            println!("sample {}", row);
            for (index, value) in outputs.iter().enumerate() {
                println!("{} = {}", index, value);
            }
            if let Ok(class) = network.predict(sample) {
                println!("predicted class: {}", class);
            }
            println!();
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logging for debugging
    env_logger::init();
    info!("Starting Segnet...");

    // Optional first argument: YAML configuration file
    let config = match std::env::args().nth(1) {
        Some(path) => SegnetConfig::load(path)?,
        None => SegnetConfig::default(),
    };

    let training_set = config.training_set()?;
    let mut network = Network::new(config.network.clone())?;

    let mut report = ConsoleReport {
        samples: training_set.inputs().to_vec(),
        failure: None,
    };
    network.train(training_set.inputs(), training_set.targets(), &mut report)?;

    if let Some(e) = report.failure {
        return Err(e.into());
    }

    info!("Segnet completed");
    Ok(())
}
