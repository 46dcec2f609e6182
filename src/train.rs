//! Sliding-window training sets and the output-layer training loop.
//!
//! The update rule here is deliberately simple: after each prediction the
//! scaled error `(target - prediction) * learning_rate` is multiplied by the
//! transposed final hidden state and added to the output weights. Gate
//! weights, gate biases and the output bias are never touched. This is not
//! gradient descent through the recurrent cell.

use crate::data::WeatherDataset;
use crate::error::{LstmError, Result};
use crate::logging::{format_epoch_loss, Callback, NoCallback};
use crate::math::Matrix;
use crate::metrics::mean_squared_error;
use crate::models::LstmNetwork;

/// One input window and the observation that follows it.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingPair {
    pub input: Vec<Matrix>,
    pub target: Matrix,
}

/// Ordered training pairs that all share one window length.
#[derive(Clone, Debug)]
pub struct TrainingData {
    pairs: Vec<TrainingPair>,
    sequence_length: usize,
}

impl TrainingData {
    /// Build pairs from an ordered series with a stride-1 sliding window:
    /// pair `i` uses elements `i..i + sequence_length` as input and element
    /// `i + sequence_length` as target, giving `len - sequence_length` pairs.
    pub fn from_series(series: &[Matrix], sequence_length: usize) -> Result<Self> {
        if sequence_length == 0 {
            return Err(LstmError::InsufficientData(
                "sequence length must be positive".into(),
            ));
        }
        if series.len() <= sequence_length {
            return Err(LstmError::InsufficientData(format!(
                "need at least {} data points for sequence length {}, got {}",
                sequence_length + 1,
                sequence_length,
                series.len()
            )));
        }
        let pairs = (0..series.len() - sequence_length)
            .map(|i| TrainingPair {
                input: series[i..i + sequence_length].to_vec(),
                target: series[i + sequence_length].clone(),
            })
            .collect();
        Ok(Self {
            pairs,
            sequence_length,
        })
    }

    pub fn from_dataset(dataset: &WeatherDataset, sequence_length: usize) -> Result<Self> {
        Self::from_series(&dataset.to_matrices()?, sequence_length)
    }

    /// Use explicit pairs. Every input must hold the same non-zero number
    /// of steps.
    pub fn from_pairs(pairs: Vec<TrainingPair>) -> Result<Self> {
        let sequence_length = pairs
            .first()
            .map(|p| p.input.len())
            .ok_or_else(|| LstmError::InsufficientData("no training pairs".into()))?;
        if sequence_length == 0 {
            return Err(LstmError::InsufficientData(
                "sequence length must be positive".into(),
            ));
        }
        if let Some(bad) = pairs.iter().position(|p| p.input.len() != sequence_length) {
            return Err(LstmError::InvalidArgument(format!(
                "pair {bad} has {} steps, expected {sequence_length}",
                pairs[bad].input.len()
            )));
        }
        Ok(Self {
            pairs,
            sequence_length,
        })
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    pub fn pairs(&self) -> &[TrainingPair] {
        &self.pairs
    }

    pub fn get(&self, idx: usize) -> Option<&TrainingPair> {
        self.pairs.get(idx)
    }

    pub fn last(&self) -> Option<&TrainingPair> {
        self.pairs.last()
    }
}

/// Summary of one epoch.
#[derive(Clone, Debug, PartialEq)]
pub struct EpochMetrics {
    /// Zero-based epoch index.
    pub epoch: usize,
    /// Mean loss over the pairs that trained, `None` if every pair failed.
    pub average_loss: Option<f64>,
    /// Pairs that contributed a loss and an update.
    pub sequences: usize,
    pub skipped: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrainingReport {
    pub epoch_losses: Vec<Option<f64>>,
    /// Number of output-weight updates applied.
    pub updates: usize,
    /// Number of pair visits skipped because prediction or loss failed.
    pub skipped: usize,
}

impl TrainingReport {
    pub fn final_loss(&self) -> Option<f64> {
        self.epoch_losses.last().copied().flatten()
    }
}

pub fn train(network: &mut LstmNetwork, data: &TrainingData, epochs: usize) -> Result<TrainingReport> {
    train_with_callback(network, data, epochs, NoCallback)
}

/// Run `epochs` passes over `data`, updating only the output weights.
///
/// A pair whose prediction or loss fails is logged and skipped; it adds
/// neither loss nor update, and the epoch average covers the remaining
/// pairs.
pub fn train_with_callback<C: Callback>(
    network: &mut LstmNetwork,
    data: &TrainingData,
    epochs: usize,
    mut callback: C,
) -> Result<TrainingReport> {
    if epochs == 0 {
        return Err(LstmError::InvalidArgument("epochs must be positive".into()));
    }
    log::info!(
        "Starting training for {} epochs over {} sequences",
        epochs,
        data.len()
    );
    callback.on_train_begin(epochs, data.len());

    let mut report = TrainingReport::default();
    for epoch in 0..epochs {
        let mut total_loss = 0.0;
        let mut sequences = 0usize;
        let mut skipped = 0usize;
        for (idx, pair) in data.pairs().iter().enumerate() {
            match train_step(network, pair) {
                Ok(loss) => {
                    total_loss += loss;
                    sequences += 1;
                }
                Err(e) => {
                    log::warn!("epoch {}: skipping sequence {idx}: {e}", epoch + 1);
                    skipped += 1;
                }
            }
        }
        let average_loss = (sequences > 0).then(|| total_loss / sequences as f64);
        if epoch % 10 == 0 {
            log::info!("{}", format_epoch_loss(epoch, average_loss));
        } else {
            log::debug!("{}", format_epoch_loss(epoch, average_loss));
        }
        report.epoch_losses.push(average_loss);
        report.updates += sequences;
        report.skipped += skipped;
        callback.on_epoch_end(&EpochMetrics {
            epoch,
            average_loss,
            sequences,
            skipped,
        });
    }

    log::info!("Training completed: {} updates, {} skipped", report.updates, report.skipped);
    callback.on_train_end(&report);
    Ok(report)
}

fn train_step(network: &mut LstmNetwork, pair: &TrainingPair) -> Result<f64> {
    let prediction = network.predict(&pair.input)?;
    let loss = mean_squared_error(&prediction, &pair.target)?;

    let mut error = pair.target.sub(&prediction)?;
    error.scale(network.learning_rate());
    let hidden_t = network.cell().hidden_state().transpose()?;
    let delta = Matrix::matmul(&error, &hidden_t)?;
    network.update_output_weights(&delta)?;
    Ok(loss)
}

/// Mean loss over `data` without changing any weights.
pub fn evaluate(network: &mut LstmNetwork, data: &TrainingData) -> Result<f64> {
    if data.is_empty() {
        return Err(LstmError::InsufficientData("no sequences to evaluate".into()));
    }
    let mut total = 0.0;
    for pair in data.pairs() {
        let prediction = network.predict(&pair.input)?;
        total += mean_squared_error(&prediction, &pair.target)?;
    }
    Ok(total / data.len() as f64)
}
