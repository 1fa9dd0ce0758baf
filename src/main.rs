//! Command-line entry point: train a PINN from a JSON configuration, or
//! evaluate a saved model against reference prices.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use pinn_bs::pricing::ReferencePricer;
use pinn_bs::sampler::evaluation_grid;
use pinn_bs::{OptionStyle, PinnStrategy, Strategy, TrainConfig};

#[derive(Parser)]
#[command(name = "pinn-bs")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model and export it
    Train {
        /// JSON configuration file
        #[arg(short, long)]
        config: String,

        #[arg(short, long, value_enum, default_value = "european")]
        style: OptionStyle,

        /// Overrides `model_path` from the configuration
        #[arg(short, long)]
        model_path: Option<String>,
    },

    /// Compare a saved model with reference prices on a price grid
    Evaluate {
        /// JSON configuration file the model was trained with
        #[arg(short, long)]
        config: String,

        #[arg(short, long, value_enum, default_value = "european")]
        style: OptionStyle,

        /// Saved model
        #[arg(short, long)]
        model: String,

        /// Evaluation time in years
        #[arg(short, long, default_value = "0")]
        time: f64,

        /// Number of grid points over [min_s, max_s]
        #[arg(short, long, default_value = "200")]
        points: usize,

        /// Continuous dividend yield for American reference prices
        #[arg(short = 'q', long, default_value = "0")]
        dividend_yield: f64,
    },
}

fn load_config(path: &str) -> Result<TrainConfig> {
    TrainConfig::load_json(path).with_context(|| format!("failed to load configuration {path}"))
}

fn train(config: &str, style: OptionStyle, model_path: Option<String>) -> Result<()> {
    let mut config = load_config(config)?;
    if let Some(path) = model_path {
        config.model_path = path;
    }

    let mut strategy = Strategy::new(style, config)?;
    let record = strategy.train()?;
    info!("finished {style}: {record}");
    strategy
        .export_default()
        .with_context(|| format!("failed to export to {}", strategy.config().model_path))?;
    Ok(())
}

fn evaluate(
    config: &str,
    style: OptionStyle,
    model: &str,
    time: f64,
    points: usize,
    dividend_yield: f64,
) -> Result<()> {
    let config = load_config(config)?;
    let mut strategy = Strategy::new(style, config.clone())?;
    strategy
        .load(model)
        .with_context(|| format!("failed to load model {model}"))?;

    let (s, t) = evaluation_grid(&config, time, points);
    let predicted = strategy.predict(&s, &t)?;
    let pricer = ReferencePricer::new(config.bias, config.noise_variance)?.with_dividend_yield(dividend_yield);
    let mut rng = config.rng();

    println!("S,predicted,reference,error");
    let mut squared = 0.0;
    for (&spot, &value) in s.iter().zip(&predicted) {
        let reference = pricer.price(style, spot, time, &config, &mut rng)?;
        squared += (value - reference).powi(2);
        println!("{spot:.4},{value:.6},{reference:.6},{:.6}", value - reference);
    }
    if !s.is_empty() {
        info!("RMSE over {} points: {:.6}", s.len(), (squared / s.len() as f64).sqrt());
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Train {
            config,
            style,
            model_path,
        } => train(&config, style, model_path),
        Commands::Evaluate {
            config,
            style,
            model,
            time,
            points,
            dividend_yield,
        } => evaluate(&config, style, &model, time, points, dividend_yield),
    }
}
