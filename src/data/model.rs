use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

// ---------------------------------------------------------------------------
// CellValue – a single raw cell from a station source
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring common Pandas dtypes.
///
/// Measurement and time columns are coerced out of these during cleaning;
/// every other column is carried on the [`Observation`] as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => write!(f, "NA"),
        }
    }
}

impl CellValue {
    /// Numeric coercion with `errors="coerce"` semantics: anything that is
    /// not a finite-or-infinite number becomes `None`. NaN counts as missing.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            CellValue::Float(v) => *v,
            CellValue::Integer(i) => *i as f64,
            CellValue::String(s) => s.trim().parse::<f64>().ok()?,
            CellValue::Bool(_) | CellValue::Null => return None,
        };
        (!value.is_nan()).then_some(value)
    }

    /// Interpret the cell as a whole number (used for year/month/day/hour).
    /// Integral floats such as `2013.0` are accepted.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Integer(i) => Some(*i),
            CellValue::Float(v) => integral(*v),
            CellValue::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(integral))
            }
            CellValue::Bool(_) | CellValue::Null => None,
        }
    }
}

fn integral(v: f64) -> Option<i64> {
    (v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64).then_some(v as i64)
}

// ---------------------------------------------------------------------------
// Field – the measurement columns that get validated
// ---------------------------------------------------------------------------

/// Measurement columns that are coerced to numbers and must be non-null
/// after cleaning, whenever the source carries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Field {
    #[serde(rename = "PM2.5")]
    Pm25,
    #[serde(rename = "TEMP")]
    Temp,
    #[serde(rename = "HUMI")]
    Humi,
    #[serde(rename = "WSPM")]
    Wspm,
}

impl Field {
    /// Canonical order used for `StationDataset::fields`.
    pub const ALL: [Field; 4] = [Field::Pm25, Field::Temp, Field::Humi, Field::Wspm];

    /// Column header as it appears in PRSA files.
    pub fn column_name(self) -> &'static str {
        match self {
            Field::Pm25 => "PM2.5",
            Field::Temp => "TEMP",
            Field::Humi => "HUMI",
            Field::Wspm => "WSPM",
        }
    }

    /// Match a raw header, ignoring surrounding whitespace and ASCII case.
    pub fn from_header(header: &str) -> Option<Field> {
        let header = header.trim();
        Field::ALL
            .into_iter()
            .find(|f| header.eq_ignore_ascii_case(f.column_name()))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

// ---------------------------------------------------------------------------
// RawTable – a parsed but uncleaned source
// ---------------------------------------------------------------------------

/// Column-oriented header plus row-oriented cells, as read from a source.
/// Rows may be shorter than `columns`; missing trailing cells are null.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    /// Header names, already trimmed of surrounding whitespace.
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let columns = columns.into_iter().map(|c| c.trim().to_string()).collect();
        RawTable { columns, rows }
    }

    /// Position of the first column whose name matches case-insensitively.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }
}

// ---------------------------------------------------------------------------
// Observation – one hourly row
// ---------------------------------------------------------------------------

/// A single hourly measurement (one row of the cleaned table).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub timestamp: NaiveDateTime,
    #[serde(rename = "PM2.5")]
    pub pm25: Option<f64>,
    #[serde(rename = "TEMP")]
    pub temp: Option<f64>,
    #[serde(rename = "HUMI")]
    pub humi: Option<f64>,
    #[serde(rename = "WSPM")]
    pub wspm: Option<f64>,
    /// Passthrough columns: column_name → value.
    #[serde(flatten)]
    pub extra: BTreeMap<String, CellValue>,
}

impl Observation {
    /// Keys the observation serializes itself; passthrough columns never reuse them.
    pub const RESERVED_KEYS: [&'static str; 5] = ["timestamp", "PM2.5", "TEMP", "HUMI", "WSPM"];

    pub fn new(timestamp: NaiveDateTime) -> Self {
        Observation {
            timestamp,
            pm25: None,
            temp: None,
            humi: None,
            wspm: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn get(&self, field: Field) -> Option<f64> {
        match field {
            Field::Pm25 => self.pm25,
            Field::Temp => self.temp,
            Field::Humi => self.humi,
            Field::Wspm => self.wspm,
        }
    }

    pub fn set(&mut self, field: Field, value: Option<f64>) {
        let slot = match field {
            Field::Pm25 => &mut self.pm25,
            Field::Temp => &mut self.temp,
            Field::Humi => &mut self.humi,
            Field::Wspm => &mut self.wspm,
        };
        *slot = value;
    }
}

// ---------------------------------------------------------------------------
// StationDataset – the complete cleaned dataset of one station
// ---------------------------------------------------------------------------

/// Row accounting gathered while cleaning a source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleaningStats {
    pub rows_read: usize,
    /// Rows whose year/month/day/hour did not form a valid timestamp.
    pub rejected_timestamp: usize,
    /// Rows with a missing value in a present measurement field.
    pub rejected_missing: usize,
}

impl CleaningStats {
    pub fn rows_kept(&self) -> usize {
        self.rows_read - self.rejected_timestamp - self.rejected_missing
    }
}

/// Earliest and latest timestamp of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateBounds {
    pub min: NaiveDateTime,
    pub max: NaiveDateTime,
}

/// Cleaned, timestamp-ordered observations of one station. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationDataset {
    pub location: String,
    /// Normalized header names of the source, in source order.
    pub columns: Vec<String>,
    /// Measurement fields present in the source, in [`Field::ALL`] order.
    pub fields: Vec<Field>,
    /// Observations sorted by timestamp.
    pub records: Vec<Observation>,
    pub cleaning: CleaningStats,
}

impl StationDataset {
    /// Number of observations.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_field(&self, field: Field) -> bool {
        self.fields.contains(&field)
    }

    /// Records are sorted, so the bounds are the first and last timestamps.
    pub fn date_bounds(&self) -> Option<DateBounds> {
        let first = self.records.first()?;
        let last = self.records.last()?;
        Some(DateBounds {
            min: first.timestamp,
            max: last.timestamp,
        })
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            location: self.location.clone(),
            row_count: self.len(),
            date_bounds: self.date_bounds(),
            fields: self.fields.clone(),
            cleaning: self.cleaning,
        }
    }
}

/// What a range picker needs to know about a station before any query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub location: String,
    pub row_count: usize,
    pub date_bounds: Option<DateBounds>,
    pub fields: Vec<Field>,
    pub cleaning: CleaningStats,
}
