//! PNG chart rendering.
//!
//! Three charts per instrument: price with a rolling mean, rolling volatility of
//! returns, and a return histogram with VaR markers. Titles, axis labels and legends
//! need a TrueType font; when none can be found the charts are drawn without text.

use crate::config::{AnalysisConfig, PlotConfig};
use crate::metrics::{histogram, historical_var, rolling_mean, rolling_std};
use crate::report::format_percent;
use crate::types::PriceData;
use crate::{Error, Result};
use chrono::{Duration, NaiveDate};
use plotters::prelude::*;
use plotters::style::FontStyle;
use std::collections::BTreeMap;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const PRICE_SIZE: (u32, u32) = (1100, 600);
const VOLATILITY_SIZE: (u32, u32) = (1100, 500);
const HISTOGRAM_SIZE: (u32, u32) = (1000, 500);

const FONT_FAMILY: &str = "sans-serif";

/// Fonts tried when `plot.font_path` is unset.
const SYSTEM_FONTS: [&str; 6] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

const VAR_COLORS: [RGBColor; 4] = [RED, MAGENTA, RGBColor(255, 140, 0), GREEN];

/// Leading bytes of TrueType, OpenType and TrueType collection files.
const FONT_SIGNATURES: [[u8; 4]; 4] = [*b"\x00\x01\x00\x00", *b"true", *b"OTTO", *b"ttcf"];

/// Fonts read so far, keyed by path, and the one currently registered.
///
/// Registered bytes must live for the rest of the process, so each file is read and
/// leaked at most once; `None` marks a path that is missing or not a usable font.
#[derive(Default)]
struct FontCache {
    loaded: BTreeMap<PathBuf, Option<&'static [u8]>>,
    active: Option<PathBuf>,
}

static FONT_CACHE: Mutex<FontCache> = Mutex::new(FontCache {
    loaded: BTreeMap::new(),
    active: None,
});

/// Output paths of the three charts for an instrument.
pub fn plot_paths(plots_dir: &Path, name: &str) -> [PathBuf; 3] {
    [
        plots_dir.join(format!("{}_price_rolling_mean.png", name)),
        plots_dir.join(format!("{}_rolling_volatility.png", name)),
        plots_dir.join(format!("{}_returns_hist_var.png", name)),
    ]
}

/// Render all three charts into `plots_dir`, creating it if needed.
pub fn render_charts(
    data: &PriceData,
    analysis: &AnalysisConfig,
    plot: &PlotConfig,
    plots_dir: &Path,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(plots_dir)?;
    let labels = font_available(plot);
    let [price_path, volatility_path, histogram_path] = plot_paths(plots_dir, &data.name);

    plot_price_rolling_mean(&price_path, data, analysis.rolling_window, labels)?;
    plot_rolling_volatility(&volatility_path, data, analysis.rolling_window, labels)?;
    plot_returns_histogram(
        &histogram_path,
        data,
        &analysis.var_levels,
        plot.histogram_bins,
        labels,
    )?;

    Ok(vec![price_path, volatility_path, histogram_path])
}

/// Price with its rolling mean overlaid.
pub fn plot_price_rolling_mean(
    path: &Path,
    data: &PriceData,
    window: usize,
    labels: bool,
) -> Result<()> {
    let dates = &data.prices.dates;
    let prices = &data.prices.prices;
    let rolling = rolling_mean(prices, window);

    let y_range = padded_range(prices.iter().copied().chain(rolling.iter().flatten().copied()));

    let root = BitMapBackend::new(path, PRICE_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut builder = ChartBuilder::on(&root);
    builder.margin(15);
    if labels {
        builder
            .caption(
                format!("{} — Price with {}D Rolling Mean", data.name, window),
                (FONT_FAMILY, 24),
            )
            .x_label_area_size(40)
            .y_label_area_size(70);
    }
    let mut chart = builder
        .build_cartesian_2d(date_range(dates), y_range)
        .map_err(plot_err)?;

    let mut mesh = chart.configure_mesh();
    if labels {
        mesh.x_desc("Date")
            .y_desc("Price")
            .x_label_formatter(&format_month);
    } else {
        mesh.x_labels(0).y_labels(0);
    }
    mesh.draw().map_err(plot_err)?;

    chart
        .draw_series(LineSeries::new(
            dates.iter().copied().zip(prices.iter().copied()),
            BLUE.stroke_width(1),
        ))
        .map_err(plot_err)?
        .label("Price")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));

    chart
        .draw_series(LineSeries::new(
            dates
                .iter()
                .zip(&rolling)
                .filter_map(|(d, v)| v.map(|v| (*d, v))),
            RED.stroke_width(2),
        ))
        .map_err(plot_err)?
        .label(format!("{}D Rolling Mean", window))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));

    if labels {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(plot_err)?;
    }

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Rolling standard deviation of daily returns.
pub fn plot_rolling_volatility(
    path: &Path,
    data: &PriceData,
    window: usize,
    labels: bool,
) -> Result<()> {
    let dates = &data.returns.dates;
    let rolling = rolling_std(&data.returns.values, window);
    let y_range = padded_range(rolling.iter().flatten().copied().chain([0.0]));

    let root = BitMapBackend::new(path, VOLATILITY_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut builder = ChartBuilder::on(&root);
    builder.margin(15);
    if labels {
        builder
            .caption(
                format!("{} — {}D Rolling Volatility (Std of Returns)", data.name, window),
                (FONT_FAMILY, 24),
            )
            .x_label_area_size(40)
            .y_label_area_size(70);
    }
    let mut chart = builder
        .build_cartesian_2d(date_range(dates), y_range)
        .map_err(plot_err)?;

    let mut mesh = chart.configure_mesh();
    if labels {
        mesh.x_desc("Date")
            .y_desc("Rolling Std (daily)")
            .x_label_formatter(&format_month)
            .y_label_formatter(&format_axis_percent);
    } else {
        mesh.x_labels(0).y_labels(0);
    }
    mesh.draw().map_err(plot_err)?;

    chart
        .draw_series(LineSeries::new(
            dates
                .iter()
                .zip(&rolling)
                .filter_map(|(d, v)| v.map(|v| (*d, v))),
            BLUE.stroke_width(1),
        ))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Histogram of daily returns with a vertical marker at each VaR level.
pub fn plot_returns_histogram(
    path: &Path,
    data: &PriceData,
    var_levels: &[f64],
    bins: usize,
    labels: bool,
) -> Result<()> {
    let returns = &data.returns.values;
    let bars = histogram(returns, bins);
    let vars: Vec<(f64, f64)> = var_levels
        .iter()
        .map(|&c| (c, historical_var(returns, c)))
        .filter(|(_, v)| v.is_finite())
        .collect();

    let x_range = padded_range(
        bars.iter()
            .flat_map(|b| [b.lower, b.upper])
            .chain(vars.iter().map(|(_, v)| *v)),
    );
    let max_count = bars.iter().map(|b| b.count).max().unwrap_or(0).max(1) as f64;
    let y_top = max_count * 1.1;

    let root = BitMapBackend::new(path, HISTOGRAM_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut builder = ChartBuilder::on(&root);
    builder.margin(15);
    if labels {
        builder
            .caption(
                format!("{} — Daily Returns Histogram with VaR", data.name),
                (FONT_FAMILY, 24),
            )
            .x_label_area_size(40)
            .y_label_area_size(60);
    }
    let mut chart = builder
        .build_cartesian_2d(x_range, 0.0..y_top)
        .map_err(plot_err)?;

    let mut mesh = chart.configure_mesh();
    if labels {
        mesh.x_desc("Daily Return")
            .y_desc("Frequency")
            .x_label_formatter(&format_axis_percent)
            .y_label_formatter(&format_count);
    } else {
        mesh.x_labels(0).y_labels(0);
    }
    mesh.draw().map_err(plot_err)?;

    chart
        .draw_series(bars.iter().map(|b| {
            Rectangle::new(
                [(b.lower, 0.0), (b.upper, b.count as f64)],
                BLUE.mix(0.6).filled(),
            )
        }))
        .map_err(plot_err)?;

    for (i, (confidence, value)) in vars.iter().enumerate() {
        let color = VAR_COLORS[i % VAR_COLORS.len()];
        chart
            .draw_series(LineSeries::new(
                [(*value, 0.0), (*value, y_top)],
                color.stroke_width(2),
            ))
            .map_err(plot_err)?
            .label(format!(
                "VaR {}: {}",
                format_percent(*confidence, 0),
                format_percent(*value, 2)
            ))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    if labels {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(plot_err)?;
    }

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Register a TrueType font with plotters for chart text.
///
/// Tries `plot.font_path` first, then common system fonts. A different font path on a
/// later call replaces the registered font. Returns whether text can be drawn.
pub fn font_available(plot: &PlotConfig) -> bool {
    let mut cache = FONT_CACHE.lock().unwrap_or_else(|e| e.into_inner());
    let candidates = plot
        .font_path
        .iter()
        .cloned()
        .chain(SYSTEM_FONTS.iter().map(PathBuf::from));

    for path in candidates {
        if cache.activate(&path) {
            return true;
        }
    }

    tracing::warn!("No TrueType font found; charts will be rendered without text");
    false
}

impl FontCache {
    /// Make `path` the registered chart font.
    fn activate(&mut self, path: &Path) -> bool {
        if self.active.as_deref() == Some(path) {
            return true;
        }

        let bytes = match self.loaded.get(path) {
            Some(cached) => *cached,
            None => {
                let bytes = read_font(path);
                self.loaded.insert(path.to_path_buf(), bytes);
                bytes
            }
        };
        let Some(bytes) = bytes else {
            return false;
        };

        match plotters::style::register_font(FONT_FAMILY, FontStyle::Normal, bytes) {
            Ok(()) => {
                tracing::debug!("Using chart font {}", path.display());
                self.active = Some(path.to_path_buf());
                true
            }
            Err(_) => {
                tracing::warn!("Unusable font {}", path.display());
                self.loaded.insert(path.to_path_buf(), None);
                false
            }
        }
    }
}

/// Read a font file, keeping its bytes for the life of the process.
///
/// Files without a font signature are rejected before anything is leaked.
fn read_font(path: &Path) -> Option<&'static [u8]> {
    let bytes = fs::read(path).ok()?;
    if !has_font_signature(&bytes) {
        tracing::warn!("Not a TrueType or OpenType font: {}", path.display());
        return None;
    }
    Some(Box::leak(bytes.into_boxed_slice()))
}

fn has_font_signature(bytes: &[u8]) -> bool {
    bytes
        .get(..4)
        .is_some_and(|head| FONT_SIGNATURES.iter().any(|sig| head == sig))
}

fn plot_err<E: std::fmt::Display>(e: E) -> Error {
    Error::Plot(e.to_string())
}

/// Date axis covering the series; widened by a day when it has a single date.
fn date_range(dates: &[NaiveDate]) -> Range<NaiveDate> {
    let start = dates.first().copied().unwrap_or_default();
    let end = dates.last().copied().unwrap_or(start);
    if end > start {
        start..end
    } else {
        start..start + Duration::days(1)
    }
}

/// Range of the finite values with 5% headroom on both sides.
fn padded_range(values: impl IntoIterator<Item = f64>) -> Range<f64> {
    let (min, max) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });

    if !min.is_finite() {
        return 0.0..1.0;
    }
    let span = max - min;
    let pad = if span > 0.0 {
        span * 0.05
    } else {
        min.abs().max(1.0) * 0.05
    };
    (min - pad)..(max + pad)
}

fn format_month(date: &NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

fn format_axis_percent(value: &f64) -> String {
    format_percent(*value, 1)
}

fn format_count(value: &f64) -> String {
    format!("{:.0}", value)
}
