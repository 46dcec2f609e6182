pub mod lstm;
pub mod relu;
pub mod sigmoid;
pub mod tanh;

pub use lstm::{GateActivations, GateWeights, LstmCell, LstmWeights};
