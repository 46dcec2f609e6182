use serde::{Deserialize, Serialize};

use crate::error::{LstmError, Result};
use crate::math::Matrix;

/// Number of features in a [`WeatherPoint`].
pub const FEATURES: usize = 6;

/// Feature names in the fixed order used by matrices, CSV files and the
/// model file.
pub const FEATURE_NAMES: [&str; FEATURES] = [
    "temperature",
    "pressure",
    "humidity",
    "wind_speed",
    "wind_direction",
    "precipitation",
];

/// One weather observation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherPoint {
    /// Degrees Fahrenheit.
    pub temperature: f64,
    /// Inches of mercury.
    pub pressure: f64,
    /// Relative humidity, percent.
    pub humidity: f64,
    /// Miles per hour.
    pub wind_speed: f64,
    /// Degrees.
    pub wind_direction: f64,
    /// Inches.
    pub precipitation: f64,
}

impl WeatherPoint {
    pub fn from_array(v: [f64; FEATURES]) -> Self {
        WeatherPoint {
            temperature: v[0],
            pressure: v[1],
            humidity: v[2],
            wind_speed: v[3],
            wind_direction: v[4],
            precipitation: v[5],
        }
    }

    pub fn to_array(&self) -> [f64; FEATURES] {
        [
            self.temperature,
            self.pressure,
            self.humidity,
            self.wind_speed,
            self.wind_direction,
            self.precipitation,
        ]
    }

    /// Column matrix (`6 x 1`) in feature order.
    pub fn to_matrix(&self) -> Result<Matrix> {
        Matrix::column(&self.to_array())
    }

    /// Inverse of [`WeatherPoint::to_matrix`]; `m` must be `6 x 1`.
    pub fn from_matrix(m: &Matrix) -> Result<Self> {
        if m.shape() != (FEATURES, 1) {
            return Err(LstmError::shape("weather_point", m.shape(), (FEATURES, 1)));
        }
        let mut v = [0.0; FEATURES];
        v.copy_from_slice(m.as_slice());
        Ok(WeatherPoint::from_array(v))
    }
}

/// Ordered series of weather observations.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WeatherDataset {
    points: Vec<WeatherPoint>,
}

impl WeatherDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, point: WeatherPoint) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&WeatherPoint> {
        self.points.get(idx)
    }

    pub fn points(&self) -> &[WeatherPoint] {
        &self.points
    }

    pub fn points_mut(&mut self) -> &mut [WeatherPoint] {
        &mut self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WeatherPoint> {
        self.points.iter()
    }

    pub fn last(&self) -> Option<&WeatherPoint> {
        self.points.last()
    }

    /// The most recent point, provided it lies before the last `window`
    /// points rather than inside them. `None` when `len() <= window`.
    pub fn latest_outside_window(&self, window: usize) -> Option<&WeatherPoint> {
        if self.points.len() > window {
            self.points.last()
        } else {
            None
        }
    }

    /// The last `n` points, oldest first.
    pub fn tail(&self, n: usize) -> Result<&[WeatherPoint]> {
        if n > self.points.len() {
            return Err(LstmError::InsufficientData(format!(
                "need at least {n} data points, got {}",
                self.points.len()
            )));
        }
        Ok(&self.points[self.points.len() - n..])
    }

    /// Split into a leading training part of `floor(len * train_ratio)`
    /// points and the remaining test part. Order is preserved.
    pub fn split(&self, train_ratio: f64) -> Result<(WeatherDataset, WeatherDataset)> {
        if !(0.0..=1.0).contains(&train_ratio) {
            return Err(LstmError::InvalidArgument(format!(
                "train ratio must be within [0, 1], got {train_ratio}"
            )));
        }
        let n = (self.points.len() as f64 * train_ratio) as usize;
        let (train, test) = self.points.split_at(n);
        Ok((train.iter().copied().collect(), test.iter().copied().collect()))
    }

    /// Column matrices for every point, in order.
    pub fn to_matrices(&self) -> Result<Vec<Matrix>> {
        self.points.iter().map(WeatherPoint::to_matrix).collect()
    }
}

impl FromIterator<WeatherPoint> for WeatherDataset {
    fn from_iter<I: IntoIterator<Item = WeatherPoint>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<WeatherPoint>> for WeatherDataset {
    fn from(points: Vec<WeatherPoint>) -> Self {
        Self { points }
    }
}

impl<'a> IntoIterator for &'a WeatherDataset {
    type Item = &'a WeatherPoint;
    type IntoIter = std::slice::Iter<'a, WeatherPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
