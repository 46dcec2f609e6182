pub mod config;
pub mod data;
pub mod error;
pub mod layers;
pub mod logging;
pub mod math;
pub mod metrics;
pub mod models;
pub mod rng;
pub mod train;
pub mod weights;

pub use error::{LstmError, Result};
pub use layers::LstmCell;
pub use math::Matrix;
pub use models::LstmNetwork;
