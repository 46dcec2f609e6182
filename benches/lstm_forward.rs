use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use weather_lstm::math::Matrix;
use weather_lstm::train::{train, TrainingData};
use weather_lstm::LstmNetwork;

fn sequence(len: usize, rng: &mut StdRng) -> Vec<Matrix> {
    (0..len)
        .map(|_| {
            let v: Vec<f64> = (0..6).map(|_| rng.gen()).collect();
            Matrix::column(&v).unwrap()
        })
        .collect()
}

fn bench_predict(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(1);
    let mut net = LstmNetwork::new(6, 64, 6, &mut rng).unwrap();
    let seq = sequence(10, &mut rng);
    c.bench_function("predict_h64_l10", |bencher| {
        bencher.iter(|| black_box(net.predict(black_box(&seq)).unwrap()));
    });
}

fn bench_train_epoch(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(2);
    let series = sequence(60, &mut rng);
    let data = TrainingData::from_series(&series, 10).unwrap();
    let mut net = LstmNetwork::new(6, 32, 6, &mut rng).unwrap();
    c.bench_function("train_epoch_h32_50_pairs", |bencher| {
        bencher.iter(|| black_box(train(&mut net, black_box(&data), 1).unwrap()));
    });
}

criterion_group!(benches, bench_predict, bench_train_epoch);
criterion_main!(benches);
