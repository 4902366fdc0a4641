use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};

use super::model::{CellValue, CleaningStats, Field, Observation, RawTable, StationDataset};

/// Columns a source must carry to derive the timestamp key.
pub const TIME_COLUMNS: [&str; 4] = ["year", "month", "day", "hour"];

// ---------------------------------------------------------------------------
// Cleaning: RawTable → StationDataset
// ---------------------------------------------------------------------------

/// Turn a raw table into a cleaned station dataset.
///
/// * every row gets a timestamp from `year, month, day, hour`; rows where
///   that fails are dropped
/// * measurement fields present in the header are coerced to numbers; a row
///   missing any of them is dropped (never filled)
/// * all other columns are kept untouched on the observation
/// * surviving rows are stably sorted by timestamp
///
/// Only a source lacking one of the time columns is an error.
pub fn clean_table(location: &str, table: RawTable) -> Result<StationDataset> {
    let mut time_idx = [0usize; 4];
    for (slot, name) in time_idx.iter_mut().zip(TIME_COLUMNS) {
        *slot = table
            .column_index(name)
            .with_context(|| format!("source has no '{name}' column"))?;
    }

    let present: Vec<(Field, usize)> = Field::ALL
        .into_iter()
        .filter_map(|f| {
            table
                .columns
                .iter()
                .position(|c| Field::from_header(c) == Some(f))
                .map(|i| (f, i))
        })
        .collect();

    let RawTable { columns, rows } = table;

    let mut taken: HashSet<String> = Observation::RESERVED_KEYS
        .iter()
        .map(|k| k.to_string())
        .collect();
    let passthrough: Vec<(usize, String)> = columns
        .iter()
        .enumerate()
        .filter(|(i, _)| !time_idx.contains(i) && !present.iter().any(|(_, p)| p == i))
        .map(|(i, name)| (i, unique_key(name, &mut taken)))
        .collect();

    let mut stats = CleaningStats::default();
    let mut records = Vec::with_capacity(rows.len());

    for row in &rows {
        stats.rows_read += 1;

        let Some(timestamp) = row_timestamp(row, &time_idx) else {
            stats.rejected_timestamp += 1;
            continue;
        };

        let mut obs = Observation::new(timestamp);
        let mut complete = true;
        for &(field, idx) in &present {
            match row.get(idx).and_then(CellValue::as_f64) {
                Some(v) => obs.set(field, Some(v)),
                None => {
                    complete = false;
                    break;
                }
            }
        }
        if !complete {
            stats.rejected_missing += 1;
            continue;
        }

        for (idx, key) in &passthrough {
            let value = row.get(*idx).cloned().unwrap_or(CellValue::Null);
            obs.extra.insert(key.clone(), value);
        }
        records.push(obs);
    }

    records.sort_by_key(|o| o.timestamp);

    log::debug!(
        "{location}: read {} rows, dropped {} with bad timestamps and {} with missing {:?}",
        stats.rows_read,
        stats.rejected_timestamp,
        stats.rejected_missing,
        present.iter().map(|(f, _)| f.column_name()).collect::<Vec<_>>(),
    );

    Ok(StationDataset {
        location: location.to_string(),
        fields: present.iter().map(|(f, _)| *f).collect(),
        columns,
        records,
        cleaning: stats,
    })
}

/// `name`, or `name.1`, `name.2`, ... if already taken, the way pandas
/// mangles duplicate headers.
fn unique_key(name: &str, taken: &mut HashSet<String>) -> String {
    let mut key = name.to_string();
    let mut n = 1;
    while taken.contains(&key) {
        key = format!("{name}.{n}");
        n += 1;
    }
    taken.insert(key.clone());
    key
}

/// Build the hourly timestamp of a row, or `None` for any invalid component.
fn row_timestamp(row: &[CellValue], idx: &[usize; 4]) -> Option<NaiveDateTime> {
    let part = |i: usize| row.get(idx[i]).and_then(CellValue::as_i64);

    let year = i32::try_from(part(0)?).ok()?;
    let month = u32::try_from(part(1)?).ok()?;
    let day = u32::try_from(part(2)?).ok()?;
    let hour = u32::try_from(part(3)?).ok()?;

    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, 0, 0)
}
