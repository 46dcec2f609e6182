use serde::{Deserialize, Serialize};

use crate::error::{LstmError, Result};
use super::weather::{WeatherDataset, WeatherPoint, FEATURES};

/// Per-feature min/max used for min-max scaling into `[0, 1]`.
///
/// Field order matches the on-disk layout written by
/// [`crate::weights::save_model`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizationParams {
    pub temp_min: f64,
    pub temp_max: f64,
    pub pressure_min: f64,
    pub pressure_max: f64,
    pub humidity_min: f64,
    pub humidity_max: f64,
    pub wind_speed_min: f64,
    pub wind_speed_max: f64,
    pub wind_dir_min: f64,
    pub wind_dir_max: f64,
    pub precip_min: f64,
    pub precip_max: f64,
}

/// Number of `f64` values in serialized [`NormalizationParams`].
pub const NORM_PARAMS_LEN: usize = 2 * FEATURES;

impl NormalizationParams {
    /// Compute per-feature bounds over the whole dataset.
    pub fn from_dataset(dataset: &WeatherDataset) -> Result<Self> {
        let first = dataset.get(0).ok_or_else(|| {
            LstmError::InsufficientData("cannot compute normalization of an empty dataset".into())
        })?;
        let mut mins = first.to_array();
        let mut maxs = mins;
        for p in dataset.iter().skip(1) {
            for (k, v) in p.to_array().into_iter().enumerate() {
                mins[k] = mins[k].min(v);
                maxs[k] = maxs[k].max(v);
            }
        }
        Ok(Self::from_bounds(mins, maxs))
    }

    fn from_bounds(mins: [f64; FEATURES], maxs: [f64; FEATURES]) -> Self {
        let mut flat = [0.0; NORM_PARAMS_LEN];
        for k in 0..FEATURES {
            flat[2 * k] = mins[k];
            flat[2 * k + 1] = maxs[k];
        }
        Self::from_array(flat)
    }

    /// `(min, max)` per feature in feature order.
    pub fn bounds(&self) -> [(f64, f64); FEATURES] {
        [
            (self.temp_min, self.temp_max),
            (self.pressure_min, self.pressure_max),
            (self.humidity_min, self.humidity_max),
            (self.wind_speed_min, self.wind_speed_max),
            (self.wind_dir_min, self.wind_dir_max),
            (self.precip_min, self.precip_max),
        ]
    }

    pub fn to_array(&self) -> [f64; NORM_PARAMS_LEN] {
        [
            self.temp_min,
            self.temp_max,
            self.pressure_min,
            self.pressure_max,
            self.humidity_min,
            self.humidity_max,
            self.wind_speed_min,
            self.wind_speed_max,
            self.wind_dir_min,
            self.wind_dir_max,
            self.precip_min,
            self.precip_max,
        ]
    }

    pub fn from_array(v: [f64; NORM_PARAMS_LEN]) -> Self {
        Self {
            temp_min: v[0],
            temp_max: v[1],
            pressure_min: v[2],
            pressure_max: v[3],
            humidity_min: v[4],
            humidity_max: v[5],
            wind_speed_min: v[6],
            wind_speed_max: v[7],
            wind_dir_min: v[8],
            wind_dir_max: v[9],
            precip_min: v[10],
            precip_max: v[11],
        }
    }

    /// Scale a point into `[0, 1]`. Features with a zero range map to `0.5`.
    pub fn normalize_point(&self, point: &WeatherPoint) -> WeatherPoint {
        let mut v = point.to_array();
        for (x, (min, max)) in v.iter_mut().zip(self.bounds()) {
            let range = max - min;
            *x = if range > 0.0 { (*x - min) / range } else { 0.5 };
        }
        WeatherPoint::from_array(v)
    }

    /// Map a normalized point back to physical units. Features with a zero
    /// range map to their minimum.
    pub fn denormalize_point(&self, point: &WeatherPoint) -> WeatherPoint {
        let mut v = point.to_array();
        for (x, (min, max)) in v.iter_mut().zip(self.bounds()) {
            let range = max - min;
            *x = if range > 0.0 { *x * range + min } else { min };
        }
        WeatherPoint::from_array(v)
    }

    pub fn normalize_dataset(&self, dataset: &mut WeatherDataset) {
        for p in dataset.points_mut() {
            *p = self.normalize_point(p);
        }
    }
}
