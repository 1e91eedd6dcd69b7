//! Volscope CLI - volatility, VaR and stationarity reports for price CSVs.
//!
//! Command results are printed to stdout as a JSON `ApiResponse`; logs go to stderr.

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use volscope_core::{
    compute_risk_metrics, load_price_series, run_stationarity, run_volatility, ApiResponse,
    Config,
};

#[derive(Parser)]
#[command(name = "volscope")]
#[command(about = "Volatility, Value-at-Risk and stationarity reports for price series")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $VOLSCOPE_CONFIG, then ~/.volscope/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write volatility reports, charts and unusual-day exports for every input CSV
    Analyze {
        #[command(flatten)]
        paths: PathArgs,
        /// Skip chart rendering
        #[arg(long)]
        no_plots: bool,
    },
    /// Write ADF stationarity reports for every input CSV
    Stationarity {
        #[command(flatten)]
        paths: PathArgs,
    },
    /// Print risk metrics for a single CSV
    Metrics {
        /// Price CSV with a Date column and Close or Adj Close
        file: PathBuf,
    },
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Args)]
struct PathArgs {
    /// Directory of input CSVs
    #[arg(long)]
    input_dir: Option<PathBuf>,
    /// Directory for reports
    #[arg(long)]
    reports_dir: Option<PathBuf>,
    /// Directory for charts and unusual-day exports
    #[arg(long)]
    plots_dir: Option<PathBuf>,
}

impl PathArgs {
    fn apply(self, config: &mut Config) {
        if let Some(dir) = self.input_dir {
            config.paths.input_dir = dir;
        }
        if let Some(dir) = self.reports_dir {
            config.paths.reports_dir = dir;
        }
        if let Some(dir) = self.plots_dir {
            config.paths.plots_dir = dir;
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze { paths, no_plots } => {
            paths.apply(&mut config);
            if no_plots {
                config.plot.enabled = false;
            }
            respond(run_volatility(&config))
        }
        Commands::Stationarity { paths } => {
            paths.apply(&mut config);
            respond(run_stationarity(&config))
        }
        Commands::Metrics { file } => respond(
            load_price_series(&file).and_then(|data| compute_risk_metrics(&data, &config.analysis)),
        ),
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn load_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    let config = match explicit {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Config::load_from_path(path)?
        }
        None => Config::load()?,
    };
    Ok(config)
}

/// Print the result as a JSON envelope; a failed command exits non-zero.
fn respond<T: Serialize>(result: volscope_core::Result<T>) -> anyhow::Result<()> {
    let failed = result.is_err();
    let response = match result {
        Ok(data) => ApiResponse::ok(data),
        Err(e) => ApiResponse::<T>::err(e.to_string()),
    };
    println!("{}", serde_json::to_string_pretty(&response)?);

    if failed {
        std::process::exit(1);
    }
    Ok(())
}
