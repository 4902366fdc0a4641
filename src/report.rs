use std::fmt::Write;

use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;

use crate::data::aggregate::{CorrelationMatrix, MonthlyMean};
use crate::data::filter::{FilteredView, SCATTER_FIELDS};
use crate::data::model::{DatasetSummary, Observation};
use crate::error::StationError;
use crate::state::DashboardState;

// ---------------------------------------------------------------------------
// Headless rendering of the current view
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct JsonReport<'a> {
    /// Set when the last request could not be honoured, e.g. an unknown station.
    status: Option<&'a str>,
    summary: &'a DatasetSummary,
    /// `None` when the station has no rows to bound a range.
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    row_count: usize,
    preview: &'a [Observation],
    monthly_mean_series: &'a [MonthlyMean],
    correlation_matrix: Option<&'a CorrelationMatrix>,
}

#[derive(Serialize)]
struct JsonUnavailable<'a> {
    status: Option<&'a str>,
    station: Option<&'a str>,
    error: String,
}

/// Render the selected station's view as text or JSON.
///
/// A pending status message (such as a rejected station id) is always shown
/// alongside whatever station remains selected.
pub fn render(state: &DashboardState, preview: usize, json: bool) -> Result<String> {
    if state.catalog.is_empty() {
        return Ok("No stations configured.\n".to_string());
    }
    let status = state.status_message.as_deref();

    let (summary, view) = match (state.summary(), state.view()) {
        (Some(Ok(summary)), Some(Ok(view))) => (summary, view),
        (_, Some(Err(e))) | (Some(Err(e)), _) => {
            return render_unavailable(state.selected.as_deref(), &e, status, json)
        }
        _ => return Ok("No station selected.\n".to_string()),
    };

    if json {
        let report = JsonReport {
            status,
            summary: &summary,
            start: state.date_range.map(|(start, _)| start),
            end: state.date_range.map(|(_, end)| end),
            row_count: view.len(),
            preview: view.head(preview),
            monthly_mean_series: &view.monthly_mean_series,
            correlation_matrix: view.correlation_matrix.as_ref(),
        };
        return Ok(serde_json::to_string_pretty(&report)? + "\n");
    }

    let mut out = String::new();
    if let Some(note) = status {
        let _ = writeln!(out, "Note: {note}");
    }
    out.push_str(&render_text(&summary, &view, state.date_range, preview));
    Ok(out)
}

fn render_unavailable(
    station: Option<&str>,
    err: &StationError,
    status: Option<&str>,
    json: bool,
) -> Result<String> {
    let error = err.to_string();
    // The unavailable station's own error is already the status; don't repeat it.
    let status = status.filter(|s| *s != error);
    if json {
        let body = JsonUnavailable {
            status,
            station,
            error,
        };
        return Ok(serde_json::to_string_pretty(&body)? + "\n");
    }
    let mut out = String::new();
    if let Some(note) = status {
        let _ = writeln!(out, "Note: {note}");
    }
    let _ = writeln!(out, "No data: {error}");
    Ok(out)
}

/// Plain-text report: dataset info, preview rows, scatter and correlation
/// summaries, monthly trend.
pub fn render_text(
    summary: &DatasetSummary,
    view: &FilteredView<'_>,
    range: Option<(NaiveDate, NaiveDate)>,
    preview: usize,
) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Station: {}", summary.location);
    let _ = writeln!(out, "Rows: {}", summary.row_count);
    if let Some(b) = &summary.date_bounds {
        let _ = writeln!(out, "Available: {} .. {}", b.min, b.max);
    }
    let _ = writeln!(
        out,
        "Dropped while cleaning: {} bad timestamps, {} incomplete rows",
        summary.cleaning.rejected_timestamp, summary.cleaning.rejected_missing
    );
    match range {
        Some((start, end)) => {
            let _ = writeln!(out, "Range: {start} .. {end} ({} rows)", view.len());
        }
        None => {
            let _ = writeln!(out, "Range: none, station has no rows");
        }
    }

    if view.is_empty() {
        let _ = writeln!(out, "\nNo rows in range.");
    } else {
        let _ = writeln!(out, "\nFirst {} rows:", view.head(preview).len());
    }
    for obs in view.head(preview) {
        let _ = write!(out, "  {}", obs.timestamp);
        for field in view.fields {
            match obs.get(*field) {
                Some(v) => {
                    let _ = write!(out, "  {field}={v}");
                }
                None => {
                    let _ = write!(out, "  {field}=NA");
                }
            }
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "\nScatter against PM2.5:");
    for field in SCATTER_FIELDS {
        match view.scatter(field) {
            Some(points) => {
                let _ = writeln!(out, "  {field}: {} points", points.len());
            }
            None => {
                let _ = writeln!(out, "  {field}: not available");
            }
        }
    }

    let _ = writeln!(out, "\nCorrelation:");
    match &view.correlation_matrix {
        Some(matrix) => write_matrix(&mut out, matrix),
        None => {
            let _ = writeln!(out, "  not available (needs TEMP, HUMI, WSPM and PM2.5)");
        }
    }

    let _ = writeln!(out, "\nMonthly mean PM2.5:");
    if view.monthly_mean_series.is_empty() {
        let _ = writeln!(out, "  (empty)");
    }
    for m in &view.monthly_mean_series {
        let _ = writeln!(out, "  {}  {:>8.2}  (n={})", m.month, m.mean, m.count);
    }

    out
}

fn write_matrix(out: &mut String, matrix: &CorrelationMatrix) {
    let _ = write!(out, "  {:>6}", "");
    for f in &matrix.fields {
        let _ = write!(out, " {:>6}", f.column_name());
    }
    let _ = writeln!(out);
    for &a in &matrix.fields {
        let _ = write!(out, "  {:>6}", a.column_name());
        for &b in &matrix.fields {
            match matrix.get(a, b) {
                Some(r) => {
                    let _ = write!(out, " {r:>6.2}");
                }
                None => {
                    let _ = write!(out, " {:>6}", "NaN");
                }
            }
        }
        let _ = writeln!(out);
    }
}
