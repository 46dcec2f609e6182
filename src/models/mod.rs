pub mod lstm_network;

pub use lstm_network::{LstmNetwork, DEFAULT_LEARNING_RATE, DEFAULT_SEQUENCE_LENGTH};
