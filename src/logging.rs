use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use csv::Writer;
use serde::Serialize;

use crate::error::Result;
use crate::train::{EpochMetrics, TrainingReport};

/// Appends training metrics to `metrics.jsonl` and `metrics.csv` inside
/// `<log_dir>/<experiment>/`.
pub struct Logger {
    dir: PathBuf,
    json: File,
    csv: Writer<File>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricRecord {
    pub epoch: usize,
    pub loss: Option<f64>,
    pub lr: f64,
    pub sequences: usize,
    pub skipped: usize,
    pub kind: &'static str,
}

impl MetricRecord {
    pub fn from_epoch(m: &EpochMetrics, lr: f64) -> Self {
        Self {
            epoch: m.epoch,
            loss: m.average_loss,
            lr,
            sequences: m.sequences,
            skipped: m.skipped,
            kind: "epoch",
        }
    }
}

impl Logger {
    /// Open `<log_dir>/<experiment>/`, defaulting to `runs/` and the current
    /// Unix time. Existing metric files are appended to.
    pub fn new(log_dir: Option<String>, experiment: Option<String>) -> Result<Self> {
        let experiment = experiment.unwrap_or_else(|| {
            let secs = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |d| d.as_secs());
            secs.to_string()
        });
        let dir = PathBuf::from(log_dir.as_deref().unwrap_or("runs")).join(experiment);
        std::fs::create_dir_all(&dir)?;
        let json = append_to(&dir, "metrics.jsonl")?;
        let csv = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(append_to(&dir, "metrics.csv")?);
        log::debug!("writing metrics to {}", dir.display());
        Ok(Logger { dir, json, csv })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn log<T: Serialize>(&mut self, metrics: &T) {
        match serde_json::to_string(metrics) {
            Ok(line) => {
                if let Err(e) = writeln!(self.json, "{}", line) {
                    log::warn!("failed to append metrics.jsonl: {e}");
                }
            }
            Err(e) => log::warn!("failed to serialise metrics: {e}"),
        }
        if let Err(e) = self.csv.serialize(metrics) {
            log::warn!("failed to append metrics.csv: {e}");
        } else if let Err(e) = self.csv.flush() {
            log::warn!("failed to flush metrics.csv: {e}");
        }
    }
}

fn append_to(dir: &Path, name: &str) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(dir.join(name))
}

/// Hooks into the training loop. All methods default to no-ops.
pub trait Callback {
    fn on_train_begin(&mut self, _epochs: usize, _sequences: usize) {}

    fn on_epoch_end(&mut self, _metrics: &EpochMetrics) {}

    fn on_train_end(&mut self, _report: &TrainingReport) {}
}

/// Callback that records one [`MetricRecord`] per epoch.
pub struct MetricsCallback {
    logger: Logger,
    lr: f64,
}

impl MetricsCallback {
    pub fn new(logger: Logger, lr: f64) -> Self {
        Self { logger, lr }
    }
}

impl Callback for MetricsCallback {
    fn on_epoch_end(&mut self, metrics: &EpochMetrics) {
        self.logger.log(&MetricRecord::from_epoch(metrics, self.lr));
    }
}

impl<A: Callback, B: Callback> Callback for (A, B) {
    fn on_train_begin(&mut self, epochs: usize, sequences: usize) {
        self.0.on_train_begin(epochs, sequences);
        self.1.on_train_begin(epochs, sequences);
    }

    fn on_epoch_end(&mut self, metrics: &EpochMetrics) {
        self.0.on_epoch_end(metrics);
        self.1.on_epoch_end(metrics);
    }

    fn on_train_end(&mut self, report: &TrainingReport) {
        self.0.on_train_end(report);
        self.1.on_train_end(report);
    }
}

impl<C: Callback + ?Sized> Callback for &mut C {
    fn on_train_begin(&mut self, epochs: usize, sequences: usize) {
        (**self).on_train_begin(epochs, sequences);
    }

    fn on_epoch_end(&mut self, metrics: &EpochMetrics) {
        (**self).on_epoch_end(metrics);
    }

    fn on_train_end(&mut self, report: &TrainingReport) {
        (**self).on_train_end(report);
    }
}

/// Callback that does nothing.
pub struct NoCallback;

impl Callback for NoCallback {}

impl<C: Callback> Callback for Option<C> {
    fn on_train_begin(&mut self, epochs: usize, sequences: usize) {
        if let Some(c) = self {
            c.on_train_begin(epochs, sequences);
        }
    }

    fn on_epoch_end(&mut self, metrics: &EpochMetrics) {
        if let Some(c) = self {
            c.on_epoch_end(metrics);
        }
    }

    fn on_train_end(&mut self, report: &TrainingReport) {
        if let Some(c) = self {
            c.on_train_end(report);
        }
    }
}

/// Format the per-epoch training line.
pub fn format_epoch_loss(epoch: usize, loss: Option<f64>) -> String {
    match loss {
        Some(l) => format!("Epoch {}: Average Loss = {:.6}", epoch + 1, l),
        None => format!("Epoch {}: no sequence produced a loss", epoch + 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_lines_are_one_based() {
        assert_eq!(format_epoch_loss(0, Some(0.1234567)), "Epoch 1: Average Loss = 0.123457");
        assert_eq!(format_epoch_loss(9, None), "Epoch 10: no sequence produced a loss");
    }

    #[test]
    fn logger_writes_both_files() {
        let base = std::env::temp_dir().join(format!("weather-lstm-log-{}", std::process::id()));
        let mut logger = Logger::new(
            Some(base.to_string_lossy().into_owned()),
            Some("unit".to_string()),
        )
        .unwrap();
        logger.log(&MetricRecord {
            epoch: 0,
            loss: Some(0.5),
            lr: 0.001,
            sequences: 4,
            skipped: 0,
            kind: "epoch",
        });
        let json = std::fs::read_to_string(logger.dir().join("metrics.jsonl")).unwrap();
        assert!(json.contains("\"loss\":0.5"));
        let csv = std::fs::read_to_string(logger.dir().join("metrics.csv")).unwrap();
        assert!(csv.starts_with("0,0.5,0.001,4,0,epoch"));
        let _ = std::fs::remove_dir_all(base);
    }
}
