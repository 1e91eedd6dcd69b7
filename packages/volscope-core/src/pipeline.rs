//! Batch processing over a directory of price CSVs.
//!
//! Each input is handled independently: a file that fails to load or analyze is logged
//! and recorded in the [`RunSummary`], and the run moves on to the next file.

use crate::config::Config;
use crate::loader::load_price_series;
use crate::metrics::{compute_risk_metrics, unusual_days};
use crate::plot::render_charts;
use crate::report::{
    render_stationarity_report, render_volatility_report, write_stationarity_report,
    write_volatility_report,
};
use crate::stationarity::stationarity_report;
use crate::types::{DailyMove, FailedFile, FileOutputs, RunSummary};
use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// List the `*.csv` files in `dir`, sorted by file name.
///
/// A missing directory or one without CSV files is an error, since there is
/// nothing to run.
pub fn discover_inputs(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::InvalidOperation(format!(
            "Input directory not found: {}",
            dir.display()
        )));
    }

    let mut inputs = Vec::new();
    let mut skipped = 0usize;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_csv(&path) {
            inputs.push(path);
        } else {
            skipped += 1;
        }
    }

    if skipped > 0 {
        tracing::warn!("Skipped {} non-CSV entries in {}", skipped, dir.display());
    }
    if inputs.is_empty() {
        return Err(Error::InvalidOperation(format!(
            "No CSV files found in {}",
            dir.display()
        )));
    }

    inputs.sort();
    Ok(inputs)
}

/// Load, analyze and report on a single file.
///
/// Writes the markdown report and, when plotting is enabled, the charts and the
/// unusual-days CSV. Nothing is written if the file fails to load.
pub fn process_file(path: &Path, config: &Config) -> Result<FileOutputs> {
    let data = load_price_series(path)?;
    tracing::info!(
        "Loaded {} ({} rows, column '{}')",
        data.name,
        data.prices.len(),
        data.price_column
    );

    let metrics = compute_risk_metrics(&data, &config.analysis)?;

    let mut outputs = FileOutputs {
        name: data.name.clone(),
        report: PathBuf::new(),
        plots: Vec::new(),
        unusual_days: None,
    };

    if config.plot.enabled {
        let plots_dir = &config.paths.plots_dir;
        outputs.plots = render_charts(&data, &config.analysis, &config.plot, plots_dir)?;

        let unusual = unusual_days(&data.returns, config.analysis.outlier_threshold);
        let csv_path = unusual_days_path(plots_dir, &data.name);
        write_unusual_days(&csv_path, &unusual)?;
        tracing::info!(
            "{}: {} unusual days saved to {}",
            data.name,
            unusual.len(),
            csv_path.display()
        );
        outputs.unusual_days = Some(csv_path);
    }

    let text = render_volatility_report(&data.name, &metrics, &config.analysis, &config.report);
    outputs.report = write_volatility_report(&config.paths.reports_dir, &data.name, &text)?;
    tracing::info!("Report saved to {}", outputs.report.display());

    Ok(outputs)
}

/// Run the volatility report over every input file.
pub fn run_volatility(config: &Config) -> Result<RunSummary> {
    config.validate()?;
    fs::create_dir_all(&config.paths.reports_dir)?;
    if config.plot.enabled {
        fs::create_dir_all(&config.paths.plots_dir)?;
    }

    run_each(config, process_file)
}

/// Run the stationarity report over every input file.
pub fn run_stationarity(config: &Config) -> Result<RunSummary> {
    config.validate()?;
    fs::create_dir_all(&config.paths.reports_dir)?;

    run_each(config, stationarity_file)
}

fn stationarity_file(path: &Path, config: &Config) -> Result<FileOutputs> {
    let data = load_price_series(path)?;
    let report = stationarity_report(&data, config.analysis.significance)?;
    let text = render_stationarity_report(&report);
    let report_path = write_stationarity_report(&config.paths.reports_dir, &data.name, &text)?;
    tracing::info!(
        "{}: price stationary={}, returns stationary={}; saved to {}",
        data.name,
        report.price.stationary,
        report.returns.stationary,
        report_path.display()
    );

    Ok(FileOutputs {
        name: data.name,
        report: report_path,
        plots: Vec::new(),
        unusual_days: None,
    })
}

fn run_each<F>(config: &Config, mut process: F) -> Result<RunSummary>
where
    F: FnMut(&Path, &Config) -> Result<FileOutputs>,
{
    let inputs = discover_inputs(&config.paths.input_dir)?;
    tracing::info!(
        "Processing {} files from {}",
        inputs.len(),
        config.paths.input_dir.display()
    );

    let mut summary = RunSummary::default();
    for path in inputs {
        match process(&path, config) {
            Ok(outputs) => summary.processed.push(outputs),
            Err(e) => {
                tracing::error!("Failed to process {}: {}", path.display(), e);
                summary.failed.push(FailedFile {
                    name: file_name(&path),
                    error: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        "Done: {} processed, {} failed",
        summary.processed.len(),
        summary.failed.len()
    );
    Ok(summary)
}

/// Path of the unusual-days export for an instrument.
pub fn unusual_days_path(plots_dir: &Path, name: &str) -> PathBuf {
    plots_dir.join(format!("{}_unusual_days.csv", name))
}

/// Write unusual days as a `Date,Return` CSV.
pub fn write_unusual_days(path: &Path, days: &[DailyMove]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["Date", "Return"])?;
    for day in days {
        writer.write_record([day.date.to_string(), day.ret.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

fn file_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
