use crate::data::{NormalizationParams, WeatherPoint};
use crate::error::{LstmError, Result};
use crate::math::Matrix;

/// Mean of squared elementwise differences between `pred` and `target`.
pub fn mean_squared_error(pred: &Matrix, target: &Matrix) -> Result<f64> {
    if pred.shape() != target.shape() {
        return Err(LstmError::shape("mse", pred.shape(), target.shape()));
    }
    let sum: f64 = pred
        .as_slice()
        .iter()
        .zip(target.as_slice())
        .map(|(p, t)| (p - t) * (p - t))
        .sum();
    Ok(sum / pred.as_slice().len() as f64)
}

/// Absolute prediction error per weather feature.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeatureErrors {
    pub temperature: f64,
    pub pressure: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub wind_direction: f64,
    pub precipitation: f64,
}

impl FeatureErrors {
    pub fn between(predicted: &WeatherPoint, actual: &WeatherPoint) -> Self {
        Self {
            temperature: (predicted.temperature - actual.temperature).abs(),
            pressure: (predicted.pressure - actual.pressure).abs(),
            humidity: (predicted.humidity - actual.humidity).abs(),
            wind_speed: (predicted.wind_speed - actual.wind_speed).abs(),
            wind_direction: (predicted.wind_direction - actual.wind_direction).abs(),
            precipitation: (predicted.precipitation - actual.precipitation).abs(),
        }
    }

    /// Sum of all absolute errors. Units differ per feature, so this is only
    /// useful for comparing runs on the same data.
    pub fn total(&self) -> f64 {
        self.temperature
            + self.pressure
            + self.humidity
            + self.wind_speed
            + self.wind_direction
            + self.precipitation
    }

    pub fn report(&self) -> String {
        format!(
            "Temperature: {:.2}°F\nPressure: {:.2} inHg\nHumidity: {:.2}%\n\
             Wind Speed: {:.2} mph\nWind Direction: {:.0}°\nPrecipitation: {:.4} in\n\
             Total Absolute Error: {:.4}",
            self.temperature,
            self.pressure,
            self.humidity,
            self.wind_speed,
            self.wind_direction,
            self.precipitation,
            self.total()
        )
    }
}

pub fn format_weather_point(p: &WeatherPoint) -> String {
    format!(
        "Temperature: {:.2}°F, Pressure: {:.2} inHg, Humidity: {:.2}%, \
         Wind: {:.2} mph @ {:.0}°, Precipitation: {:.4} in",
        p.temperature, p.pressure, p.humidity, p.wind_speed, p.wind_direction, p.precipitation
    )
}

pub fn format_normalization_params(p: &NormalizationParams) -> String {
    format!(
        "Normalization Parameters:\n  Temperature: [{:.2}, {:.2}]\n  Pressure: [{:.2}, {:.2}]\n  \
         Humidity: [{:.2}, {:.2}]\n  Wind Speed: [{:.2}, {:.2}]\n  \
         Wind Direction: [{:.2}, {:.2}]\n  Precipitation: [{:.4}, {:.4}]",
        p.temp_min,
        p.temp_max,
        p.pressure_min,
        p.pressure_max,
        p.humidity_min,
        p.humidity_max,
        p.wind_speed_min,
        p.wind_speed_max,
        p.wind_dir_min,
        p.wind_dir_max,
        p.precip_min,
        p.precip_max
    )
}
