use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use weather_lstm::data::{load_csv, save_csv, WeatherDataset, FEATURES};
use weather_lstm::metrics::{format_weather_point, FeatureErrors};
use weather_lstm::rng;
use weather_lstm::weights::load_model;
use weather_lstm::{LstmError, Result};

#[derive(Parser, Debug)]
#[command(author, version, about = "Predict the next weather observation from recent data")]
struct Args {
    /// Model written by train_lstm.
    #[arg(long)]
    model: PathBuf,
    /// CSV with at least one window of recent observations.
    #[arg(long)]
    input: PathBuf,
    /// Write the prediction as a one-row CSV.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Seed for the recurrent cell, which is not stored in the model file.
    #[arg(long)]
    seed: Option<u64>,
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
    let mut rng = rng::seeded(args.seed);
    let mut network = load_model(&args.model, &mut rng)?;
    if network.input_size() != FEATURES || network.output_size() != FEATURES {
        return Err(LstmError::InvalidArgument(format!(
            "model maps {} inputs to {} outputs, weather data has {FEATURES} features",
            network.input_size(),
            network.output_size()
        )));
    }

    let raw = load_csv(&args.input)?;
    let window_len = network.sequence_length();
    if raw.len() < window_len {
        return Err(LstmError::InsufficientData(format!(
            "need at least {window_len} data points, got {}",
            raw.len()
        )));
    }

    let norm = network.normalization().copied();
    let mut recent = raw.clone();
    match &norm {
        Some(params) => params.normalize_dataset(&mut recent),
        None => log::warn!("model has no normalization parameters, using raw values"),
    }

    let normalized = network.predict_next(&recent)?;
    let predicted = match &norm {
        Some(params) => params.denormalize_point(&normalized),
        None => normalized,
    };

    println!("Predicted next observation:");
    println!("  {}", format_weather_point(&predicted));

    if let Some(actual) = raw.latest_outside_window(window_len) {
        println!("Compared with the most recent observation:");
        println!("{}", FeatureErrors::between(&predicted, actual).report());
    }

    if let Some(path) = &args.output {
        let single: WeatherDataset = std::iter::once(predicted).collect();
        save_csv(path, &single)?;
        println!("Prediction written to {}", path.display());
    }

    println!("Input window ({window_len} points):");
    for (i, point) in raw.tail(window_len)?.iter().enumerate() {
        println!("  {:>3}: {}", i + 1, format_weather_point(point));
    }
    Ok(())
}
