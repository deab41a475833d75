//! Dense feed-forward regressor
//!
//! Fully connected network with ReLU hidden layers and a single linear
//! output, trained on mean squared error with Adam over shuffled mini-batches.
//! Built on burn: the autodiff NdArray backend for training and the plain
//! NdArray backend for serving.

use super::{Predictor, TrainOutcome, Trainer};
use crate::features::TrainingSet;
use crate::models::FeatureVector;
use anyhow::{bail, Result};
use burn::backend::ndarray::NdArrayDevice;
use burn::backend::{Autodiff, NdArray};
use burn::module::{AutodiffModule, Module, Param};
use burn::nn::loss::{MseLoss, Reduction};
use burn::nn::{Initializer, Linear, LinearConfig};
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::activation::relu;
use burn::tensor::TensorData;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;
use tracing::debug;

type ServeBackend = NdArray;
type TrainBackend = Autodiff<ServeBackend>;

/// Hidden layer widths
pub const DEFAULT_HIDDEN_LAYERS: [usize; 2] = [64, 32];

/// Passes over the training set
pub const DEFAULT_EPOCHS: usize = 50;

pub const DEFAULT_BATCH_SIZE: usize = 32;

pub const DEFAULT_LEARNING_RATE: f32 = 0.001;

const ADAM_BETA1: f32 = 0.9;
const ADAM_BETA2: f32 = 0.999;
const ADAM_EPSILON: f32 = 1e-7;

/// Hyperparameters for [`DenseTrainer`]
#[derive(Debug, Clone, PartialEq)]
pub struct TrainerConfig {
    pub hidden_layers: Vec<usize>,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
    /// Fixed seed for weight initialisation and shuffling
    pub seed: Option<u64>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            hidden_layers: DEFAULT_HIDDEN_LAYERS.to_vec(),
            epochs: DEFAULT_EPOCHS,
            batch_size: DEFAULT_BATCH_SIZE,
            learning_rate: DEFAULT_LEARNING_RATE,
            seed: None,
        }
    }
}

impl TrainerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            bail!("epochs must be at least 1");
        }
        if self.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            bail!("learning_rate must be a positive number, got {}", self.learning_rate);
        }
        if self.hidden_layers.contains(&0) {
            bail!("hidden layer widths must be non-zero");
        }
        Ok(())
    }
}

/// Hidden ReLU layers followed by a single linear output
#[derive(Module, Debug)]
struct Regressor<B: Backend> {
    hidden: Vec<Linear<B>>,
    output: Linear<B>,
}

impl<B: Backend> Regressor<B> {
    fn new(
        input_width: usize,
        hidden_layers: &[usize],
        rng: &mut StdRng,
        device: &B::Device,
    ) -> Self {
        let mut inputs = input_width;
        let mut hidden = Vec::with_capacity(hidden_layers.len());
        for &outputs in hidden_layers {
            hidden.push(dense(inputs, outputs, rng, device));
            inputs = outputs;
        }

        Self {
            hidden,
            output: dense(inputs, 1, rng, device),
        }
    }

    /// [batch, features] -> [batch, 1]
    fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self
            .hidden
            .iter()
            .fold(x, |x, layer| relu(layer.forward(x)));
        self.output.forward(x)
    }
}

/// Linear layer with He-uniform weights drawn from `rng` and zero bias
fn dense<B: Backend>(
    inputs: usize,
    outputs: usize,
    rng: &mut StdRng,
    device: &B::Device,
) -> Linear<B> {
    let limit = (6.0 / inputs.max(1) as f32).sqrt();
    let weights: Vec<f32> = (0..inputs * outputs)
        .map(|_| rng.gen_range(-limit..limit))
        .collect();

    let mut layer = LinearConfig::new(inputs, outputs)
        .with_initializer(Initializer::Zeros)
        .init(device);
    layer.weight = Param::from_tensor(Tensor::from_data(
        TensorData::new(weights, [inputs, outputs]),
        device,
    ));
    layer
}

/// Stack the selected rows into feature and target tensors
fn batch<B: Backend>(
    set: &TrainingSet,
    rows: &[usize],
    device: &B::Device,
) -> (Tensor<B, 2>, Tensor<B, 2>) {
    let width = set.profile().width();
    let mut features = Vec::with_capacity(rows.len() * width);
    let mut targets = Vec::with_capacity(rows.len());
    for &idx in rows {
        features.extend_from_slice(set.features()[idx].as_slice());
        targets.push(set.targets()[idx]);
    }

    (
        Tensor::from_data(TensorData::new(features, [rows.len(), width]), device),
        Tensor::from_data(TensorData::new(targets, [rows.len(), 1]), device),
    )
}

/// Trained feed-forward regressor
#[derive(Debug)]
pub struct DenseNetwork {
    model: Mutex<Regressor<ServeBackend>>,
    input_width: usize,
    device: NdArrayDevice,
}

impl Predictor for DenseNetwork {
    fn predict(&self, features: &FeatureVector) -> Result<f32> {
        if features.len() != self.input_width {
            bail!(
                "model expects {} features, got {}",
                self.input_width,
                features.len()
            );
        }

        let input = Tensor::from_data(
            TensorData::new(features.as_slice().to_vec(), [1, self.input_width]),
            &self.device,
        );
        let model = self.model.lock().unwrap_or_else(PoisonError::into_inner);
        let value: f32 = model.forward(input).into_scalar();
        Ok(value)
    }

    fn input_width(&self) -> usize {
        self.input_width
    }
}

/// Mini-batch Adam trainer for [`DenseNetwork`]
#[derive(Debug, Clone, Default)]
pub struct DenseTrainer {
    config: TrainerConfig,
}

impl DenseTrainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }
}

impl Trainer for DenseTrainer {
    fn train(&self, set: &TrainingSet) -> Result<TrainOutcome> {
        self.config.validate()?;
        if set.is_empty() {
            bail!("cannot train on an empty training set");
        }

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let start = Instant::now();
        let device = NdArrayDevice::default();
        let width = set.profile().width();
        let mut model: Regressor<TrainBackend> =
            Regressor::new(width, &self.config.hidden_layers, &mut rng, &device);
        let mut optim = AdamConfig::new()
            .with_beta_1(ADAM_BETA1)
            .with_beta_2(ADAM_BETA2)
            .with_epsilon(ADAM_EPSILON)
            .init();
        let mse = MseLoss::new();
        let learning_rate = f64::from(self.config.learning_rate);

        let mut order: Vec<usize> = (0..set.len()).collect();
        let mut loss = f32::NAN;

        for epoch in 1..=self.config.epochs {
            order.shuffle(&mut rng);
            let mut total = 0.0;

            for rows in order.chunks(self.config.batch_size) {
                let (inputs, targets) = batch::<TrainBackend>(set, rows, &device);
                let batch_loss = mse.forward(model.forward(inputs), targets, Reduction::Mean);

                let value: f32 = batch_loss.clone().into_scalar();
                total += value * rows.len() as f32;

                let grads = GradientsParams::from_grads(batch_loss.backward(), &model);
                model = optim.step(learning_rate, model, grads);
            }

            loss = total / set.len() as f32;
            if !loss.is_finite() {
                bail!("training diverged at epoch {epoch}");
            }
            debug!(epoch = epoch, loss = loss, "Epoch complete");
        }

        debug!(
            epochs = self.config.epochs,
            rows = set.len(),
            loss = loss,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Training finished"
        );

        let network = DenseNetwork {
            model: Mutex::new(model.valid()),
            input_width: width,
            device,
        };

        Ok(TrainOutcome {
            predictor: Box::new(network),
            loss,
        })
    }
}
