//! Training-domain sampling for both option styles.
//!
//! Every batch is drawn once from a validated [`TrainConfig`]. Prices are
//! uniform on `[min_s, max_s)` and times uniform on `[0, T)`.

use log::debug;
use rand::Rng;

use crate::error::ConfigError;
use crate::math::matrix::Matrix;
use crate::sampler::batch::{BatchKind, SampleBatch};
use crate::sampler::noise::LabelNoise;
use crate::train::train_config::TrainConfig;

/// Slope target on the upper boundary of a call, compared against `∂C/∂S`.
///
/// Deep in the money a call's delta tends to 1, yet the value carried here is
/// 0; the loss treats it as a Neumann target as-is.
pub const CALL_UPPER_SLOPE_TARGET: f64 = 0.0;

/// Slope target on the lower boundary of a put (deep in the money).
pub const PUT_LOWER_SLOPE_TARGET: f64 = -1.0;

fn uniform_column<R: Rng + ?Sized>(n: usize, low: f64, high: f64, rng: &mut R) -> Matrix {
    let values: Vec<f64> = (0..n).map(|_| rng.gen_range(low..high)).collect();
    Matrix::column(&values)
}

fn noise(config: &TrainConfig) -> Result<LabelNoise, ConfigError> {
    LabelNoise::new(config.bias, config.noise_variance)
}

fn terminal_batch<R, F>(
    config: &TrainConfig,
    payoff: F,
    rng: &mut R,
) -> Result<SampleBatch, ConfigError>
where
    R: Rng + ?Sized,
    F: Fn(f64) -> f64,
{
    let s = uniform_column(config.n_data, config.min_s, config.max_s, rng);
    let t = Matrix::filled(config.n_data, 1, config.t);
    let target = noise(config)?.perturb(&s.map(payoff), rng);
    Ok(SampleBatch {
        kind: BatchKind::Terminal,
        s,
        t,
        target: Some(target),
        tracked: false,
    })
}

/// Stacks a lower curve at `min_s` over an upper curve at the upper reference
/// level, `n_data` points each, with the given targets.
fn boundary_batch<R: Rng + ?Sized>(
    config: &TrainConfig,
    lower_target: Matrix,
    upper_target: Matrix,
    rng: &mut R,
) -> SampleBatch {
    let n = config.n_data;
    let s = Matrix::filled(n, 1, config.min_s)
        .concat_rows(&Matrix::filled(n, 1, config.upper_boundary_s()));
    let t = uniform_column(n, 0.0, config.t, rng).concat_rows(&uniform_column(n, 0.0, config.t, rng));
    SampleBatch {
        kind: BatchKind::Boundary,
        s,
        t,
        target: Some(lower_target.concat_rows(&upper_target)),
        tracked: false,
    }
}

/// Call payoff at maturity: `max(S − K, 0)` plus label noise.
pub fn terminal_call_batch<R: Rng + ?Sized>(
    config: &TrainConfig,
    rng: &mut R,
) -> Result<SampleBatch, ConfigError> {
    let strike = config.k;
    terminal_batch(config, |s| (s - strike).max(0.0), rng)
}

/// Put payoff at maturity: `max(K − S, 0)` plus label noise.
pub fn terminal_put_batch<R: Rng + ?Sized>(
    config: &TrainConfig,
    rng: &mut R,
) -> Result<SampleBatch, ConfigError> {
    let strike = config.k;
    terminal_batch(config, |s| (strike - s).max(0.0), rng)
}

/// Call boundary: `C(min_s, t) = 0` plus noise (Dirichlet) on the lower
/// half, the slope target on the upper half (Neumann).
pub fn boundary_call_batch<R: Rng + ?Sized>(
    config: &TrainConfig,
    rng: &mut R,
) -> Result<SampleBatch, ConfigError> {
    let n = config.n_data;
    let lower = noise(config)?.perturb(&Matrix::zeros(n, 1), rng);
    let upper = Matrix::filled(n, 1, CALL_UPPER_SLOPE_TARGET);
    Ok(boundary_batch(config, lower, upper, rng))
}

/// Put boundary: `∂C/∂S(min_s, t) = −1` (Neumann) on the lower half,
/// `C = 0` (Dirichlet) on the upper half.
pub fn boundary_put_batch<R: Rng + ?Sized>(
    config: &TrainConfig,
    rng: &mut R,
) -> Result<SampleBatch, ConfigError> {
    let n = config.n_data;
    let lower = Matrix::filled(n, 1, PUT_LOWER_SLOPE_TARGET);
    let upper = Matrix::zeros(n, 1);
    Ok(boundary_batch(config, lower, upper, rng))
}

/// Unlabeled interior points, tracked so the PDE operator can differentiate
/// with respect to both coordinates.
pub fn collocation_batch<R: Rng + ?Sized>(config: &TrainConfig, rng: &mut R) -> SampleBatch {
    let n = config.n_data;
    let batch = SampleBatch {
        kind: BatchKind::Collocation,
        s: uniform_column(n, config.min_s, config.max_s, rng),
        t: uniform_column(n, 0.0, config.t, rng),
        target: None,
        tracked: true,
    };
    debug!("sampled {} collocation points", batch.len());
    batch
}

/// `points` evenly spaced prices over `[min_s, max_s]`, all at `time`.
pub fn evaluation_grid(config: &TrainConfig, time: f64, points: usize) -> (Vec<f64>, Vec<f64>) {
    let step = if points > 1 {
        (config.max_s - config.min_s) / (points - 1) as f64
    } else {
        0.0
    };
    let s = (0..points).map(|i| config.min_s + step * i as f64).collect();
    (s, vec![time; points])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config() -> TrainConfig {
        TrainConfig {
            n_data: 64,
            seed: Some(5),
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_terminal_targets_are_noiseless_payoffs() {
        let config = config();
        let mut rng = config.rng();
        let call = terminal_call_batch(&config, &mut rng).unwrap();
        let put = terminal_put_batch(&config, &mut rng).unwrap();

        for batch in [&call, &put] {
            assert_eq!(batch.kind, BatchKind::Terminal);
            assert!(!batch.tracked);
            assert!(batch.t.data.iter().all(|&t| t == config.t));
            assert!(batch.s.data.iter().all(|&s| (config.min_s..config.max_s).contains(&s)));
        }
        let call_target = call.target.unwrap();
        for (i, &s) in call.s.data.iter().enumerate() {
            assert_eq!(call_target.data[i], (s - config.k).max(0.0));
        }
        let put_target = put.target.unwrap();
        for (i, &s) in put.s.data.iter().enumerate() {
            assert_eq!(put_target.data[i], (config.k - s).max(0.0));
        }
    }

    #[test]
    fn test_terminal_noise_is_bounded() {
        let config = TrainConfig {
            noise_variance: 0.1,
            bias: 0.05,
            ..config()
        };
        let mut rng = config.rng();
        let batch = terminal_call_batch(&config, &mut rng).unwrap();
        let target = batch.target.unwrap();
        for (i, &s) in batch.s.data.iter().enumerate() {
            let deviation = target.data[i] - (s - config.k).max(0.0);
            // Six standard deviations around the bias.
            assert!((deviation - 0.05).abs() < 0.6, "deviation {deviation}");
        }
    }

    #[test]
    fn test_boundary_layout_for_every_style() {
        for n_data in [1, 7, 64] {
            let config = TrainConfig { n_data, ..config() };
            let mut rng = StdRng::seed_from_u64(n_data as u64);
            let call = boundary_call_batch(&config, &mut rng).unwrap();
            let put = boundary_put_batch(&config, &mut rng).unwrap();

            for batch in [&call, &put] {
                assert_eq!(batch.len(), 2 * n_data);
                let (lower, upper) = batch.split_half();
                assert!(lower.s.data.iter().all(|&s| s == config.min_s));
                assert!(upper.s.data.iter().all(|&s| s == 2.0 * config.max_s));
                assert!(batch.t.data.iter().all(|&t| (0.0..config.t).contains(&t)));
            }

            let (lower, upper) = put.split_half();
            assert!(lower.target.unwrap().data.iter().all(|&c| c == -1.0));
            assert!(upper.target.unwrap().data.iter().all(|&c| c == 0.0));
            assert!(call.target.unwrap().data.iter().all(|&c| c == 0.0));
        }
    }

    #[test]
    fn test_collocation_is_tracked_and_unlabeled() {
        let config = config();
        let batch = collocation_batch(&config, &mut config.rng());
        assert_eq!(batch.kind, BatchKind::Collocation);
        assert!(batch.tracked);
        assert!(batch.target.is_none());
        assert_eq!(batch.len(), config.n_data);
    }

    #[test]
    fn test_evaluation_grid_spans_domain() {
        let config = config();
        let (s, t) = evaluation_grid(&config, 0.25, 200);
        assert_eq!(s.len(), 200);
        assert_eq!(s[0], config.min_s);
        assert!((s[199] - config.max_s).abs() < 1e-9);
        assert!(t.iter().all(|&t| t == 0.25));
        assert_eq!(evaluation_grid(&config, 0.0, 1).0, vec![config.min_s]);
    }

    #[test]
    fn test_seeded_sampling_is_reproducible() {
        let config = config();
        let a = terminal_call_batch(&config, &mut config.rng()).unwrap();
        let b = terminal_call_batch(&config, &mut config.rng()).unwrap();
        assert_eq!(a, b);
    }
}
