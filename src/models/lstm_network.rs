use rand::Rng;

use crate::data::{NormalizationParams, WeatherDataset, WeatherPoint};
use crate::error::{LstmError, Result};
use crate::layers::LstmCell;
use crate::math::Matrix;

pub const DEFAULT_LEARNING_RATE: f64 = 0.001;
pub const DEFAULT_SEQUENCE_LENGTH: usize = 10;

/// Sequence-to-vector network: one LSTM cell followed by a linear
/// projection of the final hidden state.
///
/// `w_output` is stored as `output_size x hidden_size` so the projection is
/// `w_output · h + b_output`.
#[derive(Clone, Debug)]
pub struct LstmNetwork {
    cell: LstmCell,
    w_output: Matrix,
    b_output: Matrix,
    input_size: usize,
    hidden_size: usize,
    output_size: usize,
    learning_rate: f64,
    sequence_length: usize,
    norm_params: Option<NormalizationParams>,
}

impl LstmNetwork {
    /// Create a network with randomly initialised weights drawn from `rng`.
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        hidden_size: usize,
        output_size: usize,
        rng: &mut R,
    ) -> Result<Self> {
        check_output(output_size)?;
        let cell = LstmCell::new(input_size, hidden_size, rng)?;
        let mut w_output = Matrix::zeros(output_size, hidden_size)?;
        w_output.xavier_init(1.0, rng)?;
        Self::assemble(cell, w_output, output_size)
    }

    /// Create a network whose gate and output weights are all zero.
    pub fn zeros(input_size: usize, hidden_size: usize, output_size: usize) -> Result<Self> {
        check_output(output_size)?;
        let cell = LstmCell::zeros(input_size, hidden_size)?;
        let w_output = Matrix::zeros(output_size, hidden_size)?;
        Self::assemble(cell, w_output, output_size)
    }

    fn assemble(cell: LstmCell, w_output: Matrix, output_size: usize) -> Result<Self> {
        Ok(Self {
            input_size: cell.input_size(),
            hidden_size: cell.hidden_size(),
            output_size,
            b_output: Matrix::zeros(output_size, 1)?,
            w_output,
            cell,
            learning_rate: DEFAULT_LEARNING_RATE,
            sequence_length: DEFAULT_SEQUENCE_LENGTH,
            norm_params: None,
        })
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn set_learning_rate(&mut self, lr: f64) -> Result<()> {
        if !(lr.is_finite() && lr > 0.0) {
            return Err(LstmError::InvalidArgument(format!(
                "learning rate must be positive, got {lr}"
            )));
        }
        self.learning_rate = lr;
        Ok(())
    }

    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    pub fn set_sequence_length(&mut self, len: usize) -> Result<()> {
        if len == 0 {
            return Err(LstmError::InvalidArgument(
                "sequence length must be positive".into(),
            ));
        }
        self.sequence_length = len;
        Ok(())
    }

    pub fn normalization(&self) -> Option<&NormalizationParams> {
        self.norm_params.as_ref()
    }

    pub fn set_normalization(&mut self, params: Option<NormalizationParams>) {
        self.norm_params = params;
    }

    pub fn cell(&self) -> &LstmCell {
        &self.cell
    }

    pub fn output_weights(&self) -> &Matrix {
        &self.w_output
    }

    pub fn output_bias(&self) -> &Matrix {
        &self.b_output
    }

    /// Replace the output projection. Shapes must match the network.
    pub fn set_output_layer(&mut self, w_output: Matrix, b_output: Matrix) -> Result<()> {
        if w_output.shape() != self.w_output.shape() {
            return Err(LstmError::shape("output_weights", w_output.shape(), self.w_output.shape()));
        }
        if b_output.shape() != self.b_output.shape() {
            return Err(LstmError::shape("output_bias", b_output.shape(), self.b_output.shape()));
        }
        self.w_output = w_output;
        self.b_output = b_output;
        Ok(())
    }

    /// Add `delta` to the output weights in place.
    pub(crate) fn update_output_weights(&mut self, delta: &Matrix) -> Result<()> {
        self.w_output.add_assign(delta)
    }

    pub fn reset(&mut self) {
        self.cell.reset_state();
    }

    /// Run `sequence` through the cell from a zero state and project the
    /// final hidden state to an `output_size x 1` column.
    pub fn predict(&mut self, sequence: &[Matrix]) -> Result<Matrix> {
        if sequence.is_empty() {
            return Err(LstmError::InsufficientData(
                "cannot predict from an empty sequence".into(),
            ));
        }
        self.reset();
        let mut hidden = None;
        for x in sequence {
            hidden = Some(self.cell.forward(x)?);
        }
        let hidden = hidden.ok_or_else(|| LstmError::InsufficientData("no hidden state".into()))?;
        Matrix::matmul(&self.w_output, &hidden)?.add(&self.b_output)
    }

    /// Predict the observation following the last `sequence_length` points
    /// of `recent`. Values are passed through unchanged, so `recent` must
    /// already be normalized the same way as the training data.
    pub fn predict_next(&mut self, recent: &WeatherDataset) -> Result<WeatherPoint> {
        let window = recent.tail(self.sequence_length)?;
        let sequence = window
            .iter()
            .map(WeatherPoint::to_matrix)
            .collect::<Result<Vec<_>>>()?;
        let prediction = self.predict(&sequence)?;
        WeatherPoint::from_matrix(&prediction)
    }
}

fn check_output(output_size: usize) -> Result<()> {
    if output_size == 0 {
        return Err(LstmError::InvalidArgument("output size must be positive".into()));
    }
    Ok(())
}
