//! Report rendering and writing.
//!
//! Rendering is pure string formatting over already computed metrics; writing puts the
//! text at a fixed path derived from the instrument name. Reports carry no timestamps,
//! so identical input always produces identical files.

use crate::config::{AnalysisConfig, ReportConfig};
use crate::types::{AdfResult, DailyMove, RiskMetrics, StationarityReport};
use crate::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Path of the volatility report for an instrument.
pub fn volatility_report_path(reports_dir: &Path, name: &str) -> PathBuf {
    reports_dir.join(format!("{}_volatility_report.md", name))
}

/// Path of the stationarity report for an instrument.
pub fn stationarity_report_path(reports_dir: &Path, name: &str) -> PathBuf {
    reports_dir.join(format!("{}_stationarity_report.txt", name))
}

/// Render the markdown volatility and risk report.
pub fn render_volatility_report(
    name: &str,
    metrics: &RiskMetrics,
    analysis: &AnalysisConfig,
    report: &ReportConfig,
) -> String {
    let rf = format_percent(metrics.risk_free_rate, 2);
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!("# Volatility & Risk Report — {}", name));
    lines.push(String::new());
    lines.push(format!(
        "**Period:** {} → {}  ",
        metrics.start_date, metrics.end_date
    ));
    lines.push(format!(
        "**Observations:** {} trading days",
        group_thousands(metrics.observations)
    ));
    lines.push(String::new());

    lines.push("## Price Direction".to_string());
    lines.push(format!(
        "- **CAGR:** {}  ({})",
        format_percent(metrics.cagr, 2),
        direction(metrics.cagr)
    ));
    lines.push(format!(
        "- **Total Price Change:** {}",
        format_percent(metrics.total_change, 2)
    ));
    lines.push(String::new());

    lines.push("## Return & Volatility (Daily / Annualized)".to_string());
    lines.push(format!(
        "- **Mean Daily Return:** {}",
        format_percent(metrics.mean_daily, 4)
    ));
    lines.push(format!(
        "- **Daily Volatility (σ):** {}",
        format_percent(metrics.std_daily, 4)
    ));
    lines.push(format!(
        "- **Annualized Return:** {}",
        format_percent(metrics.mean_annual, 2)
    ));
    lines.push(format!(
        "- **Annualized Volatility:** {}",
        format_percent(metrics.std_annual, 2)
    ));
    lines.push(format!(
        "- **Sharpe Ratio (annualized, rf={}):** {}",
        rf,
        format_number(metrics.sharpe_ratio, 2)
    ));
    lines.push(String::new());

    lines.push("## Risk — Historical VaR (based on daily returns)".to_string());
    for var in &metrics.var {
        lines.push(format!(
            "- **VaR {} (≈ {} percentile):** {} (daily)",
            format_level(var.confidence),
            ordinal(var.percentile),
            format_percent(var.value, 2)
        ));
    }
    if let Some(var) = metrics
        .var
        .iter()
        .min_by(|a, b| a.confidence.total_cmp(&b.confidence))
    {
        lines.push(String::new());
        lines.push(format!(
            "Interpretation: A **VaR {level} of {value}** means that on {level} of days, losses \
             are not expected to exceed this magnitude. On ~{tail} of days, losses may be worse.",
            level = format_level(var.confidence),
            value = format_percent(var.value, 2),
            tail = format_level(1.0 - var.confidence),
        ));
    }
    lines.push(String::new());

    lines.push("## Max Drawdown".to_string());
    lines.push(format!(
        "- **Max Drawdown:** {}",
        format_percent(metrics.drawdown.max_drawdown, 2)
    ));
    if metrics.drawdown.max_drawdown < 0.0 {
        lines.push(format!(
            "- **Peak → Trough:** {} → {}",
            metrics.drawdown.peak_date, metrics.drawdown.trough_date
        ));
    }
    lines.push(String::new());

    lines.push("## Notable Daily Moves".to_string());
    lines.push(format!("**Top {} gains**", metrics.top_gains.len()));
    lines.push(String::new());
    lines.extend(moves_table(&metrics.top_gains));
    lines.push(String::new());
    lines.push(format!("**Top {} losses**", metrics.top_losses.len()));
    lines.push(String::new());
    lines.extend(moves_table(&metrics.top_losses));
    lines.push(String::new());

    if let Some(note) = report.note_for(name) {
        lines.push(note.to_string());
        lines.push(String::new());
    }

    lines.push("## Rolling Behavior (Short-Term Trends)".to_string());
    lines.push(format!(
        "- We computed a **{w}-day rolling mean** of price and **{w}-day rolling standard \
         deviation** of returns.",
        w = analysis.rolling_window
    ));
    lines.push(
        "- Rising rolling mean with falling rolling std usually indicates **steady uptrends**; \
         spikes in rolling std indicate **volatility shocks**."
            .to_string(),
    );
    lines.push(String::new());

    lines.push("---".to_string());
    lines.push(String::new());
    lines.push("**Notes:**  ".to_string());
    lines.push(
        "- VaR here is *historical* (non-parametric) and does not assume normality.  ".to_string(),
    );
    lines.push("- Percentiles use linear interpolation between closest ranks.  ".to_string());
    lines.push(format!(
        "- Sharpe uses a constant annual risk-free rate of {}; adjust if needed.  ",
        rf
    ));
    lines.push("- Past performance does not guarantee future results.".to_string());

    let mut text = lines.join("\n");
    text.push('\n');
    text
}

/// Render the plain-text stationarity report.
pub fn render_stationarity_report(report: &StationarityReport) -> String {
    let mut text = format!("Instrument: {}\n\n", report.name);
    text.push_str(&adf_section("Closing Prices", &report.price));
    text.push('\n');
    text.push_str(&adf_section("Daily Returns", &report.returns));
    text
}

fn adf_section(subject: &str, result: &AdfResult) -> String {
    let cv = &result.critical_values;
    format!(
        "Augmented Dickey-Fuller Test on {subject}:\n\
         ADF Statistic: {stat:.6}\n\
         p-value: {p:.6}\n\
         Lags Used: {lags}\n\
         Observations: {nobs}\n\
         Critical Values: 1%: {c1:.4}, 5%: {c5:.4}, 10%: {c10:.4}\n\
         Stationary: {stationary}\n",
        subject = subject,
        stat = result.statistic,
        p = result.p_value,
        lags = result.used_lag,
        nobs = result.nobs,
        c1 = cv.one_percent,
        c5 = cv.five_percent,
        c10 = cv.ten_percent,
        stationary = if result.stationary { "yes" } else { "no" },
    )
}

/// Write the volatility report, creating the directory if needed.
pub fn write_volatility_report(reports_dir: &Path, name: &str, text: &str) -> Result<PathBuf> {
    write_text(volatility_report_path(reports_dir, name), text)
}

/// Write the stationarity report, creating the directory if needed.
pub fn write_stationarity_report(reports_dir: &Path, name: &str, text: &str) -> Result<PathBuf> {
    write_text(stationarity_report_path(reports_dir, name), text)
}

fn write_text(path: PathBuf, text: &str) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, text)?;
    Ok(path)
}

fn moves_table(moves: &[DailyMove]) -> Vec<String> {
    let mut rows = vec!["| Date | Return |".to_string(), "|------|-------:|".to_string()];
    rows.extend(
        moves
            .iter()
            .map(|m| format!("| {} | {} |", m.date, format_percent(m.ret, 2))),
    );
    rows
}

fn direction(cagr: f64) -> &'static str {
    if cagr.is_nan() {
        "n/a"
    } else if cagr > 0.0 {
        "uptrend"
    } else if cagr < 0.0 {
        "downtrend"
    } else {
        "flat"
    }
}

/// `0.0123` -> `1.23%`; non-finite values render as `n/a`.
pub fn format_percent(value: f64, decimals: usize) -> String {
    if value.is_finite() {
        format!("{:.*}%", decimals, value * 100.0)
    } else {
        "n/a".to_string()
    }
}

fn format_number(value: f64, decimals: usize) -> String {
    if value.is_finite() {
        format!("{:.*}", decimals, value)
    } else {
        "n/a".to_string()
    }
}

/// Confidence level as a short percentage: `0.95` -> `95%`, `0.975` -> `97.5%`.
fn format_level(level: f64) -> String {
    let pct = level * 100.0;
    if (pct - pct.round()).abs() < 1e-9 {
        format!("{:.0}%", pct)
    } else {
        let text = format!("{:.2}", pct);
        format!("{}%", text.trim_end_matches('0').trim_end_matches('.'))
    }
}

/// `5.0` -> `5th`, `1.0` -> `1st`, `2.5` -> `2.5th`.
fn ordinal(value: f64) -> String {
    let rounded = value.round();
    if (value - rounded).abs() >= 1e-9 {
        let text = format!("{:.2}", value);
        return format!("{}th", text.trim_end_matches('0').trim_end_matches('.'));
    }

    let n = rounded as i64;
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}

/// `2516` -> `2,516`.
fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
