use rand::rngs::StdRng;
use rand::SeedableRng;
use weather_lstm::data::{WeatherDataset, WeatherPoint};
use weather_lstm::math::Matrix;
use weather_lstm::train::{train, TrainingData, TrainingPair};
use weather_lstm::LstmNetwork;

fn temperature_series() -> WeatherDataset {
    (45..=52)
        .map(|t| WeatherPoint::from_array([t as f64, 30.0, 60.0, 5.0, 180.0, 0.0]))
        .collect()
}

fn normalized_series(n: usize) -> Vec<Matrix> {
    (0..n)
        .map(|i| {
            let x = i as f64 / n as f64;
            Matrix::column(&[x, 1.0 - x, 0.5, x * x, 0.25, 0.0]).unwrap()
        })
        .collect()
}

#[test]
fn sliding_window_over_temperatures() {
    let data = TrainingData::from_dataset(&temperature_series(), 3).unwrap();
    assert_eq!(data.len(), 5);
    assert_eq!(data.sequence_length(), 3);
    let first = data.get(0).unwrap();
    assert_eq!(first.input[0].get(0, 0).unwrap(), 45.0);
    assert_eq!(first.target.get(0, 0).unwrap(), 48.0);
    assert_eq!(data.last().unwrap().target.get(0, 0).unwrap(), 52.0);
}

#[test]
fn training_updates_only_output_weights() {
    let mut rng = StdRng::seed_from_u64(5);
    let mut net = LstmNetwork::new(6, 8, 6, &mut rng).unwrap();
    net.set_learning_rate(0.05).unwrap();
    let data = TrainingData::from_series(&normalized_series(12), 4).unwrap();

    let gates_before = net.cell().weights().clone();
    let bias_before = net.output_bias().clone();
    let w_before = net.output_weights().clone();

    let epochs = 3;
    let report = train(&mut net, &data, epochs).unwrap();
    assert_eq!(report.updates, epochs * data.len());
    assert_eq!(report.skipped, 0);
    assert_eq!(report.epoch_losses.len(), epochs);
    assert!(report.final_loss().unwrap() >= 0.0);

    assert_eq!(net.cell().weights(), &gates_before);
    assert_eq!(net.output_bias(), &bias_before);
    assert_ne!(net.output_weights(), &w_before);
}

#[test]
fn one_update_is_scaled_error_times_final_hidden_state() {
    let mut rng = StdRng::seed_from_u64(9);
    let mut net = LstmNetwork::new(6, 5, 6, &mut rng).unwrap();
    let lr = 0.5;
    net.set_learning_rate(lr).unwrap();
    let data = TrainingData::from_series(&normalized_series(4), 3).unwrap();
    assert_eq!(data.len(), 1);
    let pair = data.get(0).unwrap();

    let w0 = net.output_weights().clone();
    let p = net.predict(&pair.input).unwrap();
    let h = net.cell().hidden_state().clone();

    let report = train(&mut net, &data, 1).unwrap();
    assert_eq!(report.updates, 1);

    let w1 = net.output_weights();
    for r in 0..6 {
        let err = (pair.target.get(r, 0).unwrap() - p.get(r, 0).unwrap()) * lr;
        for c in 0..5 {
            let expected = w0.get(r, c).unwrap() + err * h.get(c, 0).unwrap();
            let got = w1.get(r, c).unwrap();
            assert!((got - expected).abs() < 1e-14, "w[{r}][{c}] = {got}, expected {expected}");
        }
    }
}

#[test]
fn loss_decreases_on_a_constant_target() {
    let mut rng = StdRng::seed_from_u64(6);
    let mut net = LstmNetwork::new(6, 8, 6, &mut rng).unwrap();
    net.set_learning_rate(0.1).unwrap();
    let series: Vec<Matrix> = (0..10)
        .map(|_| Matrix::column(&[0.3, 0.6, 0.5, 0.2, 0.7, 0.1]).unwrap())
        .collect();
    let data = TrainingData::from_series(&series, 3).unwrap();
    let report = train(&mut net, &data, 30).unwrap();
    let first = report.epoch_losses[0].unwrap();
    let last = report.final_loss().unwrap();
    assert!(last < first, "loss went from {first} to {last}");
}

#[test]
fn failing_pairs_are_skipped() {
    let mut rng = StdRng::seed_from_u64(8);
    let mut net = LstmNetwork::new(6, 4, 6, &mut rng).unwrap();
    let s = normalized_series(5);
    let pairs = vec![
        TrainingPair {
            input: s[0..2].to_vec(),
            target: s[2].clone(),
        },
        TrainingPair {
            input: s[1..3].to_vec(),
            target: Matrix::column(&[0.0; 3]).unwrap(),
        },
    ];
    let data = TrainingData::from_pairs(pairs).unwrap();
    let report = train(&mut net, &data, 2).unwrap();
    assert_eq!(report.updates, 2);
    assert_eq!(report.skipped, 2);
    assert!(report.final_loss().is_some());
}
