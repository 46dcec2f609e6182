use rand::Rng;

use crate::error::{LstmError, Result};
use crate::math::Matrix;

/// Parameters of one LSTM gate: input weights `w` (`hidden x input`),
/// recurrent weights `u` (`hidden x hidden`) and bias `b` (`hidden x 1`).
#[derive(Clone, Debug, PartialEq)]
pub struct GateWeights {
    pub w: Matrix,
    pub u: Matrix,
    pub b: Matrix,
}

impl GateWeights {
    fn zeros(input_size: usize, hidden_size: usize) -> Result<Self> {
        Ok(Self {
            w: Matrix::zeros(hidden_size, input_size)?,
            u: Matrix::zeros(hidden_size, hidden_size)?,
            b: Matrix::zeros(hidden_size, 1)?,
        })
    }

    fn xavier<R: Rng + ?Sized>(input_size: usize, hidden_size: usize, rng: &mut R) -> Result<Self> {
        let mut g = Self::zeros(input_size, hidden_size)?;
        g.w.xavier_init(1.0, rng)?;
        g.u.xavier_init(1.0, rng)?;
        Ok(g)
    }

    /// `w·x + u·h + b`
    fn pre_activation(&self, x: &Matrix, h: &Matrix) -> Result<Matrix> {
        Matrix::matmul(&self.w, x)?
            .add(&Matrix::matmul(&self.u, h)?)?
            .add(&self.b)
    }
}

/// All trainable parameters of an [`LstmCell`].
#[derive(Clone, Debug, PartialEq)]
pub struct LstmWeights {
    pub forget: GateWeights,
    pub input: GateWeights,
    pub candidate: GateWeights,
    pub output: GateWeights,
}

impl LstmWeights {
    pub fn gates(&self) -> [&GateWeights; 4] {
        [&self.forget, &self.input, &self.candidate, &self.output]
    }
}

/// Gate activations from the most recent forward step.
#[derive(Clone, Debug, PartialEq)]
pub struct GateActivations {
    pub forget: Matrix,
    pub input: Matrix,
    pub candidate: Matrix,
    pub output: Matrix,
}

/// A single LSTM cell with its own cell and hidden state.
///
/// The state is mutated in place by [`LstmCell::forward`], so a cell must
/// not be shared between sequences that are processed concurrently. Call
/// [`LstmCell::reset_state`] before each unrelated sequence.
#[derive(Clone, Debug)]
pub struct LstmCell {
    input_size: usize,
    hidden_size: usize,
    weights: LstmWeights,
    cell_state: Matrix,
    hidden_state: Matrix,
    last_gates: GateActivations,
}

impl LstmCell {
    /// Create a cell with Xavier-initialised `W`/`U` matrices drawn from
    /// `rng`. Biases are zero except the forget gate bias, which is `1.0`.
    pub fn new<R: Rng + ?Sized>(input_size: usize, hidden_size: usize, rng: &mut R) -> Result<Self> {
        check_sizes(input_size, hidden_size)?;
        let weights = LstmWeights {
            forget: GateWeights::xavier(input_size, hidden_size, rng)?,
            input: GateWeights::xavier(input_size, hidden_size, rng)?,
            candidate: GateWeights::xavier(input_size, hidden_size, rng)?,
            output: GateWeights::xavier(input_size, hidden_size, rng)?,
        };
        Self::from_weights(input_size, hidden_size, weights)
    }

    /// Create a cell whose `W`/`U` matrices are all zero. Biases follow the
    /// same rule as [`LstmCell::new`].
    pub fn zeros(input_size: usize, hidden_size: usize) -> Result<Self> {
        check_sizes(input_size, hidden_size)?;
        let weights = LstmWeights {
            forget: GateWeights::zeros(input_size, hidden_size)?,
            input: GateWeights::zeros(input_size, hidden_size)?,
            candidate: GateWeights::zeros(input_size, hidden_size)?,
            output: GateWeights::zeros(input_size, hidden_size)?,
        };
        Self::from_weights(input_size, hidden_size, weights)
    }

    fn from_weights(input_size: usize, hidden_size: usize, mut weights: LstmWeights) -> Result<Self> {
        // forget bias starts at 1.0 so early steps keep their cell state
        weights.forget.b.fill(1.0);
        let zero = Matrix::zeros(hidden_size, 1)?;
        Ok(Self {
            input_size,
            hidden_size,
            weights,
            cell_state: zero.clone(),
            hidden_state: zero.clone(),
            last_gates: GateActivations {
                forget: zero.clone(),
                input: zero.clone(),
                candidate: zero.clone(),
                output: zero,
            },
        })
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    pub fn weights(&self) -> &LstmWeights {
        &self.weights
    }

    pub fn cell_state(&self) -> &Matrix {
        &self.cell_state
    }

    pub fn hidden_state(&self) -> &Matrix {
        &self.hidden_state
    }

    pub fn last_gates(&self) -> &GateActivations {
        &self.last_gates
    }

    pub fn reset_state(&mut self) {
        self.cell_state.zero();
        self.hidden_state.zero();
    }

    /// Advance the cell by one time step and return a copy of the new
    /// hidden state. `x` must be an `input_size x 1` column.
    pub fn forward(&mut self, x: &Matrix) -> Result<Matrix> {
        if x.shape() != (self.input_size, 1) {
            return Err(LstmError::shape("lstm_forward", x.shape(), (self.input_size, 1)));
        }
        let h_prev = &self.hidden_state;

        let mut f = self.weights.forget.pre_activation(x, h_prev)?;
        f.apply_sigmoid();
        let mut i = self.weights.input.pre_activation(x, h_prev)?;
        i.apply_sigmoid();
        let mut g = self.weights.candidate.pre_activation(x, h_prev)?;
        g.apply_tanh();
        let mut o = self.weights.output.pre_activation(x, h_prev)?;
        o.apply_sigmoid();

        let c = f.hadamard(&self.cell_state)?.add(&i.hadamard(&g)?)?;
        let mut c_tanh = c.clone();
        c_tanh.apply_tanh();
        let h = o.hadamard(&c_tanh)?;

        self.cell_state = c;
        self.hidden_state = h;
        self.last_gates = GateActivations {
            forget: f,
            input: i,
            candidate: g,
            output: o,
        };
        Ok(self.hidden_state.clone())
    }
}

fn check_sizes(input_size: usize, hidden_size: usize) -> Result<()> {
    if input_size == 0 || hidden_size == 0 {
        return Err(LstmError::InvalidArgument(format!(
            "LSTM sizes must be positive (input_size={input_size}, hidden_size={hidden_size})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::sigmoid::sigmoid;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    type Gate = ([f64; 2], [[f64; 2]; 2], [f64; 2]);

    fn gate((w, u, b): Gate) -> GateWeights {
        GateWeights {
            w: Matrix::from_vec(2, 1, w.to_vec()).unwrap(),
            u: Matrix::from_vec(2, 2, vec![u[0][0], u[0][1], u[1][0], u[1][1]]).unwrap(),
            b: Matrix::column(&b).unwrap(),
        }
    }

    /// `w·x + u·h + b` for one hidden unit, written out by hand.
    fn pre((w, u, b): Gate, x: f64, h: [f64; 2], r: usize) -> f64 {
        w[r] * x + (u[r][0] * h[0] + u[r][1] * h[1]) + b[r]
    }

    #[test]
    fn new_cell_has_expected_shapes_and_biases() {
        let mut rng = StdRng::seed_from_u64(1);
        let cell = LstmCell::new(6, 32, &mut rng).unwrap();
        for gate in cell.weights().gates() {
            assert_eq!(gate.w.shape(), (32, 6));
            assert_eq!(gate.u.shape(), (32, 32));
            assert_eq!(gate.b.shape(), (32, 1));
        }
        assert!(cell.weights().forget.b.as_slice().iter().all(|&b| b == 1.0));
        assert!(cell.weights().input.b.as_slice().iter().all(|&b| b == 0.0));
        assert!(cell.hidden_state().as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn forward_output_is_bounded() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut cell = LstmCell::new(6, 32, &mut rng).unwrap();
        let x = Matrix::column(&[0.5; 6]).unwrap();
        let h = cell.forward(&x).unwrap();
        assert_eq!(h.shape(), (32, 1));
        assert!(h.as_slice().iter().all(|v| v.abs() < 1.0));
    }

    #[test]
    fn forward_returns_independent_copy() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut cell = LstmCell::new(2, 4, &mut rng).unwrap();
        let x = Matrix::column(&[1.0, -1.0]).unwrap();
        let mut h = cell.forward(&x).unwrap();
        h.fill(42.0);
        assert_ne!(cell.hidden_state(), &h);
    }

    #[test]
    fn forward_rejects_wrong_input_shape() {
        let mut cell = LstmCell::zeros(3, 2).unwrap();
        let x = Matrix::column(&[1.0, 2.0]).unwrap();
        assert!(matches!(cell.forward(&x), Err(LstmError::ShapeMismatch { .. })));
    }

    #[test]
    fn zero_cell_with_zero_input_keeps_zero_state() {
        let mut cell = LstmCell::zeros(3, 2).unwrap();
        let x = Matrix::zeros(3, 1).unwrap();
        let h = cell.forward(&x).unwrap();
        assert!(h.as_slice().iter().all(|&v| v == 0.0));
        assert!(cell.cell_state().as_slice().iter().all(|&v| v == 0.0));
        // forget gate sees only its bias
        let f = sigmoid(1.0);
        assert!(cell.last_gates().forget.as_slice().iter().all(|&v| v == f));
    }

    #[test]
    fn two_steps_match_hand_computed_gates() {
        let forget: Gate = ([0.5, -0.2], [[0.25, -0.5], [0.1, 0.3]], [1.0, 1.0]);
        let input: Gate = ([-0.3, 0.6], [[0.8, 0.2], [-0.4, 0.5]], [0.1, -0.1]);
        let candidate: Gate = ([0.7, -0.9], [[-0.6, 0.35], [0.45, -0.15]], [0.2, 0.05]);
        let output: Gate = ([0.4, 0.3], [[0.9, -0.7], [0.2, 0.6]], [-0.1, 0.15]);
        let weights = LstmWeights {
            forget: gate(forget),
            input: gate(input),
            candidate: gate(candidate),
            output: gate(output),
        };
        let mut cell = LstmCell::from_weights(1, 2, weights).unwrap();

        let mut h = [0.0; 2];
        let mut c = [0.0; 2];
        // the second input sees a non-zero h_prev, so U is exercised
        for x in [1.0, -0.5] {
            let got = cell.forward(&Matrix::column(&[x]).unwrap()).unwrap();
            let mut next_h = [0.0; 2];
            for r in 0..2 {
                let f = sigmoid(pre(forget, x, h, r));
                let i = sigmoid(pre(input, x, h, r));
                let g = pre(candidate, x, h, r).tanh();
                let o = sigmoid(pre(output, x, h, r));
                c[r] = f * c[r] + i * g;
                next_h[r] = o * c[r].tanh();
                assert!((cell.last_gates().output.get(r, 0).unwrap() - o).abs() < 1e-12);
            }
            h = next_h;
            for r in 0..2 {
                assert!((cell.cell_state().get(r, 0).unwrap() - c[r]).abs() < 1e-12);
                assert!((got.get(r, 0).unwrap() - h[r]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn reset_state_zeroes_both_states() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut cell = LstmCell::new(2, 3, &mut rng).unwrap();
        cell.forward(&Matrix::column(&[0.3, 0.9]).unwrap()).unwrap();
        cell.reset_state();
        assert!(cell.cell_state().as_slice().iter().all(|&v| v == 0.0));
        assert!(cell.hidden_state().as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn rejects_zero_sizes() {
        let mut rng = StdRng::seed_from_u64(5);
        assert!(matches!(LstmCell::new(0, 3, &mut rng), Err(LstmError::InvalidArgument(_))));
        assert!(matches!(LstmCell::zeros(3, 0), Err(LstmError::InvalidArgument(_))));
    }
}
