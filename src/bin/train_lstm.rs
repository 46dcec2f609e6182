use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use weather_lstm::config::Config;
use weather_lstm::data::{load_csv, NormalizationParams, WeatherPoint, FEATURES};
use weather_lstm::logging::{format_epoch_loss, Callback, Logger, MetricsCallback};
use weather_lstm::metrics::{format_normalization_params, format_weather_point, FeatureErrors};
use weather_lstm::rng;
use weather_lstm::train::{evaluate, train_with_callback, EpochMetrics, TrainingData, TrainingReport};
use weather_lstm::weights::save_model;
use weather_lstm::{LstmError, LstmNetwork, Result};

#[derive(Parser, Debug)]
#[command(author, version, about = "Train an LSTM weather predictor on a CSV series")]
struct Args {
    /// Training CSV with a header row.
    #[arg(long)]
    data: PathBuf,
    /// Where to write the trained model.
    #[arg(long)]
    output: PathBuf,
    #[arg(long)]
    epochs: Option<usize>,
    #[arg(long)]
    hidden: Option<usize>,
    #[arg(long)]
    sequence: Option<usize>,
    #[arg(long)]
    learning_rate: Option<f64>,
    /// TOML or JSON file with training settings. Flags take precedence.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u64>,
    /// Fraction of the series used for training; the rest is held out.
    #[arg(long)]
    train_ratio: Option<f64>,
}

impl Args {
    fn resolve(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_path(path)?,
            None => Config::default(),
        };
        if let Some(v) = self.epochs {
            config.epochs = v;
        }
        if let Some(v) = self.hidden {
            config.hidden_size = v;
        }
        if let Some(v) = self.sequence {
            config.sequence_length = v;
        }
        if let Some(v) = self.learning_rate {
            config.learning_rate = v;
        }
        if let Some(v) = self.train_ratio {
            config.train_ratio = v;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Advances a progress bar once per epoch.
struct ProgressCallback {
    pb: ProgressBar,
}

impl Callback for ProgressCallback {
    fn on_train_begin(&mut self, epochs: usize, _sequences: usize) {
        self.pb.set_length(epochs as u64);
    }

    fn on_epoch_end(&mut self, metrics: &EpochMetrics) {
        self.pb.set_message(format_epoch_loss(metrics.epoch, metrics.average_loss));
        self.pb.inc(1);
    }

    fn on_train_end(&mut self, report: &TrainingReport) {
        match report.final_loss() {
            Some(loss) => self.pb.finish_with_message(format!("training done, loss {loss:.6}")),
            None => self.pb.finish_with_message("training done"),
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let config = args.resolve()?;
    log::info!(
        "epochs {}, hidden {}, sequence {}, learning rate {}",
        config.epochs,
        config.hidden_size,
        config.sequence_length,
        config.learning_rate
    );

    let mut dataset = load_csv(&args.data)?;
    if dataset.len() <= config.sequence_length {
        return Err(LstmError::InsufficientData(format!(
            "need more than {} data points, got {}",
            config.sequence_length,
            dataset.len()
        )));
    }

    let norm = NormalizationParams::from_dataset(&dataset)?;
    println!("{}", format_normalization_params(&norm));
    norm.normalize_dataset(&mut dataset);

    let (train_set, held_out) = if config.train_ratio < 1.0 {
        dataset.split(config.train_ratio)?
    } else {
        (dataset, Default::default())
    };
    let data = TrainingData::from_dataset(&train_set, config.sequence_length)?;
    log::info!("Created {} training sequences", data.len());

    let mut rng = rng::seeded(config.seed);
    let mut network = LstmNetwork::new(FEATURES, config.hidden_size, FEATURES, &mut rng)?;
    network.set_learning_rate(config.learning_rate)?;
    network.set_sequence_length(config.sequence_length)?;

    let metrics = match &config.log_dir {
        Some(dir) => Some(MetricsCallback::new(
            Logger::new(Some(dir.clone()), config.experiment.clone())?,
            config.learning_rate,
        )),
        None => None,
    };
    let progress = ProgressCallback {
        pb: ProgressBar::new(config.epochs as u64),
    };
    if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}") {
        progress.pb.set_style(style);
    }
    let report = train_with_callback(&mut network, &data, config.epochs, (progress, metrics))?;
    if report.skipped > 0 {
        log::warn!("{} sequence visits were skipped during training", report.skipped);
    }

    if held_out.len() > config.sequence_length {
        let test = TrainingData::from_dataset(&held_out, config.sequence_length)?;
        let loss = evaluate(&mut network, &test)?;
        println!("Held-out loss over {} sequences: {loss:.6}", test.len());
    } else if !held_out.is_empty() {
        log::warn!(
            "held-out split has {} points, too few for sequence length {}",
            held_out.len(),
            config.sequence_length
        );
    }

    if let Some(pair) = data.last() {
        let prediction = network.predict(&pair.input)?;
        let predicted = norm.denormalize_point(&WeatherPoint::from_matrix(&prediction)?);
        let actual = norm.denormalize_point(&WeatherPoint::from_matrix(&pair.target)?);
        println!("Last training sequence:");
        println!("  Predicted: {}", format_weather_point(&predicted));
        println!("  Actual:    {}", format_weather_point(&actual));
        println!("{}", FeatureErrors::between(&predicted, &actual).report());
    }

    network.set_normalization(Some(norm));
    save_model(&args.output, &network)?;
    println!("Model saved to {}", args.output.display());
    Ok(())
}
