use pinn_bs::pricing::black_scholes_call;
use pinn_bs::{EuropeanPinn, PinnStrategy, TrainConfig};

fn scenario(seed: u64) -> TrainConfig {
    TrainConfig {
        min_s: 0.0,
        max_s: 100.0,
        k: 50.0,
        t: 1.0,
        r: 0.05,
        sigma: 0.2,
        n_data: 256,
        epochs: 200,
        lr: 1e-3,
        hidden_layers: vec![32, 32],
        log_interval: 50,
        seed: Some(seed),
        ..TrainConfig::default()
    }
}

/// Coarse sanity check of full European training runs, averaged over seeds
/// so a single initialization does not decide the outcome.
#[test]
fn european_call_lands_near_closed_form() {
    let seeds = [0, 1, 2];
    let mut predictions = Vec::with_capacity(seeds.len());
    for &seed in &seeds {
        let mut pinn = EuropeanPinn::new(scenario(seed)).unwrap();
        let record = pinn.train().unwrap();
        assert!(record.is_finite(), "seed {seed}: {record}");
        predictions.push(pinn.predict(&[50.0], &[0.0]).unwrap()[0]);
    }

    let config = scenario(0);
    let exact = black_scholes_call(50.0, config.k, config.t, config.r, config.sigma);
    let mean = predictions.iter().sum::<f64>() / predictions.len() as f64;
    assert!((mean - exact).abs() < 5.0, "{predictions:?} (mean {mean}) vs {exact}");
}
