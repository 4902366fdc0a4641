use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDateTime};
use serde::Serialize;

use super::model::{Field, Observation};

/// Fields of the correlation matrix, in row/column order.
pub const CORRELATION_FIELDS: [Field; 4] = [Field::Temp, Field::Humi, Field::Wspm, Field::Pm25];

// ---------------------------------------------------------------------------
// Monthly resampling
// ---------------------------------------------------------------------------

/// A calendar month, ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(ts: &NaiveDateTime) -> Self {
        YearMonth {
            year: ts.year(),
            month: ts.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// One bucket of the monthly trend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyMean {
    pub month: YearMonth,
    pub mean: f64,
    /// Observations that went into the mean.
    pub count: usize,
}

/// Arithmetic mean of `field` per calendar month, chronological.
/// Months without a value are absent rather than zero or null.
pub fn monthly_mean(records: &[Observation], field: Field) -> Vec<MonthlyMean> {
    let mut buckets: BTreeMap<YearMonth, (f64, usize)> = BTreeMap::new();
    for obs in records {
        if let Some(v) = obs.get(field) {
            let (sum, count) = buckets.entry(YearMonth::of(&obs.timestamp)).or_default();
            *sum += v;
            *count += 1;
        }
    }
    buckets
        .into_iter()
        .map(|(month, (sum, count))| MonthlyMean {
            month,
            mean: sum / count as f64,
            count,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Correlation
// ---------------------------------------------------------------------------

/// Pairwise Pearson coefficients. `None` marks an undefined coefficient
/// (fewer than two rows, or a constant series).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub fields: Vec<Field>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: Field, b: Field) -> Option<f64> {
        let i = self.fields.iter().position(|f| *f == a)?;
        let j = self.fields.iter().position(|f| *f == b)?;
        self.values[i][j]
    }
}

/// Correlate `fields` over the rows where every one of them has a value.
pub fn correlation_matrix(records: &[Observation], fields: &[Field]) -> CorrelationMatrix {
    let mut columns: Vec<Vec<f64>> = vec![Vec::with_capacity(records.len()); fields.len()];
    for obs in records {
        let row: Option<Vec<f64>> = fields.iter().map(|f| obs.get(*f)).collect();
        if let Some(row) = row {
            for (col, v) in columns.iter_mut().zip(row) {
                col.push(v);
            }
        }
    }

    let values: Vec<Vec<Option<f64>>> = columns
        .iter()
        .map(|x| columns.iter().map(|y| pearson(x, y)).collect())
        .collect();

    CorrelationMatrix {
        fields: fields.to_vec(),
        values,
    }
}

/// Pearson correlation coefficient of two equally long series.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}
