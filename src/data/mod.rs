//! Weather observations: point and dataset types, CSV I/O and min-max
//! normalization.

pub mod csv_io;
pub mod normalize;
pub mod weather;

pub use csv_io::{load_csv, read_csv, save_csv, write_csv};
pub use normalize::{NormalizationParams, NORM_PARAMS_LEN};
pub use weather::{WeatherDataset, WeatherPoint, FEATURES, FEATURE_NAMES};
