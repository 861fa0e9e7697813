//! End-of-run reporting: a text report on stdout and the JSON snapshot on disk.
use crate::error::RunError;
use loadcheck_core::{builtin, MetricsSnapshot, RunStatistics};
use std::fmt::Write;
use std::path::Path;
#[allow(unused)]
use tracing::{debug, info};

/// Renders the scenario-specific part of the text report.
pub type TextSummary = fn(&MetricsSnapshot) -> String;

/// Report used when a scenario does not supply its own.
pub fn default_text_summary(snapshot: &MetricsSnapshot) -> String {
    let mut summary = String::new();
    let _ = writeln!(
        summary,
        "Total Requests: {}",
        count(snapshot, builtin::HTTP_REQS, "count")
    );
    let _ = writeln!(
        summary,
        "Failed Requests: {}",
        count(snapshot, builtin::HTTP_REQ_FAILED, "passes")
    );
    let _ = writeln!(summary, "Iterations: {}", count(snapshot, builtin::ITERATIONS, "count"));
    let _ = writeln!(summary, "\nResponse Times:");
    for (label, value) in [
        ("Average", "avg"),
        ("Median", "med"),
        ("P90", "p(90)"),
        ("P95", "p(95)"),
        ("Max", "max"),
    ] {
        let _ = writeln!(
            summary,
            "  {label}: {}",
            millis(snapshot, builtin::HTTP_REQ_DURATION, value)
        );
    }
    let _ = writeln!(
        summary,
        "\nThroughput: {:.2} req/s",
        snapshot.value_or_zero(builtin::HTTP_REQS, "rate")
    );
    let _ = writeln!(
        summary,
        "Checks Passed: {}",
        percent(snapshot, builtin::CHECKS, "rate")
    );
    summary
}

/// A whole-number value, zero when absent.
pub fn count(snapshot: &MetricsSnapshot, metric: &str, value: &str) -> u64 {
    snapshot.value_or_zero(metric, value).max(0.).round() as u64
}

/// A millisecond value with two decimals, `0.00ms` when absent.
pub fn millis(snapshot: &MetricsSnapshot, metric: &str, value: &str) -> String {
    format!("{:.2}ms", snapshot.value_or_zero(metric, value))
}

/// A rate as a percentage with two decimals, `0.00%` when absent.
pub fn percent(snapshot: &MetricsSnapshot, metric: &str, value: &str) -> String {
    format!("{:.2}%", snapshot.value_or_zero(metric, value) * 100.)
}

/// One line per threshold, marked `✓` or `✗`.
pub fn threshold_report(stats: &RunStatistics) -> String {
    let mut report = String::new();
    if stats.thresholds.is_empty() {
        return report;
    }

    let _ = writeln!(report, "\nThresholds:");
    for outcome in &stats.thresholds {
        let mark = if outcome.ok { '✓' } else { '✗' };
        let observed = outcome
            .observed
            .map(|v| format!("{v:.4}"))
            .unwrap_or_else(|| "no data".to_string());
        let _ = writeln!(
            report,
            "  {mark} {} {} (observed {observed})",
            outcome.metric, outcome.expression
        );
    }
    report
}

/// Print the text report and write the snapshot to `export`, creating parent directories.
pub async fn handle_summary(
    stats: &RunStatistics,
    text_summary: TextSummary,
    export: Option<&Path>,
) -> Result<(), RunError> {
    println!(
        "{}{}",
        text_summary(&stats.snapshot),
        threshold_report(stats)
    );

    if let Some(path) = export {
        export_summary(stats, path).await?;
        info!("Summary written to {}", path.display());
    }

    Ok(())
}

pub async fn export_summary(stats: &RunStatistics, path: &Path) -> Result<(), RunError> {
    let json = serde_json::to_vec_pretty(stats)?;
    let io_err = |source| RunError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    tokio::fs::write(path, json).await.map_err(io_err)?;
    Ok(())
}
