use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

use super::aggregate::{
    correlation_matrix, monthly_mean, CorrelationMatrix, MonthlyMean, CORRELATION_FIELDS,
};
use super::model::{Field, Observation, StationDataset};

/// Weather fields plotted against `PM2.5`.
pub const SCATTER_FIELDS: [Field; 3] = [Field::Temp, Field::Humi, Field::Wspm];

// ---------------------------------------------------------------------------
// FilteredView – one query result
// ---------------------------------------------------------------------------

/// The date-restricted slice of a station plus its derived aggregates.
/// Borrowed from the dataset and recomputed on every query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilteredView<'a> {
    pub location: &'a str,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Measurement fields carried by the underlying dataset.
    pub fields: &'a [Field],
    pub records: &'a [Observation],
    pub monthly_mean_series: Vec<MonthlyMean>,
    /// Present only when every field of [`CORRELATION_FIELDS`] is.
    pub correlation_matrix: Option<CorrelationMatrix>,
}

impl<'a> FilteredView<'a> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_field(&self, field: Field) -> bool {
        self.fields.contains(&field)
    }

    /// First `n` observations in range.
    pub fn head(&self, n: usize) -> &'a [Observation] {
        let records = self.records;
        &records[..n.min(records.len())]
    }

    /// `(x, PM2.5)` pairs, or `None` if either column is missing.
    pub fn scatter(&self, x: Field) -> Option<Vec<(f64, f64)>> {
        if !self.has_field(x) || !self.has_field(Field::Pm25) {
            return None;
        }
        Some(
            self.records
                .iter()
                .filter_map(|o| Some((o.get(x)?, o.pm25?)))
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Restrict `dataset` to `[start, end]`, both days inclusive, and derive the
/// monthly `PM2.5` trend and correlation matrix for the window.
///
/// `start > end` gives an empty view. Pure: no I/O, no mutation.
pub fn filter(dataset: &StationDataset, start: NaiveDate, end: NaiveDate) -> FilteredView<'_> {
    let records = date_range(&dataset.records, start, end);

    let monthly_mean_series = if dataset.has_field(Field::Pm25) {
        monthly_mean(records, Field::Pm25)
    } else {
        Vec::new()
    };

    let correlation = CORRELATION_FIELDS
        .iter()
        .all(|f| dataset.has_field(*f))
        .then(|| correlation_matrix(records, &CORRELATION_FIELDS));

    FilteredView {
        location: &dataset.location,
        start,
        end,
        fields: &dataset.fields,
        records,
        monthly_mean_series,
        correlation_matrix: correlation,
    }
}

/// Contiguous run of timestamp-sorted `records` falling on `start..=end`.
pub fn date_range(records: &[Observation], start: NaiveDate, end: NaiveDate) -> &[Observation] {
    if start > end {
        return &records[..0];
    }
    let lower = start.and_time(NaiveTime::MIN);
    let lo = records.partition_point(|o| o.timestamp < lower);
    let hi = match end.succ_opt() {
        Some(next) => {
            let upper = next.and_time(NaiveTime::MIN);
            records.partition_point(|o| o.timestamp < upper)
        }
        None => records.len(),
    };
    &records[lo..hi.max(lo)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::CleaningStats;
    use chrono::{Duration, NaiveDateTime};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dataset(fields: Vec<Field>, records: Vec<Observation>) -> StationDataset {
        StationDataset {
            location: "Aotizhongxin".into(),
            columns: vec![],
            fields,
            records,
            cleaning: CleaningStats::default(),
        }
    }

    /// Every 6 hours from 2013-03-01 to 2017-02-28, PM2.5 cycling with the hour.
    fn prsa_span() -> StationDataset {
        let first: NaiveDateTime = date(2013, 3, 1).and_time(NaiveTime::MIN);
        let last: NaiveDateTime = date(2017, 2, 28).and_hms_opt(18, 0, 0).unwrap();
        let mut records = Vec::new();
        let mut ts = first;
        let mut i = 0u32;
        while ts <= last {
            let mut o = Observation::new(ts);
            o.pm25 = Some(f64::from(i % 10) * 5.0);
            o.temp = Some(f64::from(i % 7));
            records.push(o);
            ts += Duration::hours(6);
            i += 1;
        }
        dataset(vec![Field::Pm25, Field::Temp], records)
    }

    #[test]
    fn january_2014_window() {
        let ds = prsa_span();

        let view = filter(&ds, date(2014, 1, 1), date(2014, 1, 31));

        assert_eq!(view.len(), 31 * 4);
        assert!(view
            .records
            .iter()
            .all(|o| o.timestamp.format("%Y-%m").to_string() == "2014-01"));
        assert_eq!(view.monthly_mean_series.len(), 1);
        let expected = view.records.iter().filter_map(|o| o.pm25).sum::<f64>() / view.len() as f64;
        assert!((view.monthly_mean_series[0].mean - expected).abs() < 1e-9);
    }

    #[test]
    fn end_date_includes_the_whole_day() {
        let ds = prsa_span();
        let view = filter(&ds, date(2014, 1, 31), date(2014, 1, 31));
        let hours: Vec<String> = view
            .records
            .iter()
            .map(|o| o.timestamp.format("%H").to_string())
            .collect();
        assert_eq!(hours, vec!["00", "06", "12", "18"]);
    }

    #[test]
    fn reversed_range_is_empty() {
        let ds = prsa_span();
        let view = filter(&ds, date(2015, 6, 2), date(2015, 6, 1));
        assert!(view.is_empty());
        assert!(view.monthly_mean_series.is_empty());
    }

    #[test]
    fn full_range_is_identity() {
        let ds = prsa_span();
        let bounds = ds.date_bounds().unwrap();
        let view = filter(&ds, bounds.min.date(), bounds.max.date());
        assert_eq!(view.records, ds.records.as_slice());
    }

    #[test]
    fn filtering_is_idempotent() {
        let ds = prsa_span();
        let a = filter(&ds, date(2014, 5, 3), date(2015, 8, 20));
        let b = filter(&ds, date(2014, 5, 3), date(2015, 8, 20));
        assert_eq!(a, b);
    }

    #[test]
    fn ranges_outside_the_data_clamp_naturally() {
        let ds = prsa_span();
        let before = filter(&ds, date(2000, 1, 1), date(2001, 1, 1));
        assert!(before.is_empty());

        let wide = filter(&ds, NaiveDate::MIN, NaiveDate::MAX);
        assert_eq!(wide.len(), ds.len());
    }

    #[test]
    fn monthly_series_has_one_entry_per_non_empty_month() {
        let ds = prsa_span();
        let view = filter(&ds, date(2013, 3, 15), date(2013, 6, 10));
        let months: Vec<String> = view
            .monthly_mean_series
            .iter()
            .map(|m| m.month.to_string())
            .collect();
        assert_eq!(months, vec!["2013-03", "2013-04", "2013-05", "2013-06"]);
        let total: usize = view.monthly_mean_series.iter().map(|m| m.count).sum();
        assert_eq!(total, view.len());
    }

    #[test]
    fn gap_months_are_absent_from_series() {
        let mk = |y, m, pm| {
            let mut o = Observation::new(date(y, m, 1).and_time(NaiveTime::MIN));
            o.pm25 = Some(pm);
            o
        };
        let ds = dataset(
            vec![Field::Pm25],
            vec![mk(2014, 1, 10.0), mk(2014, 4, 20.0)],
        );

        let view = filter(&ds, date(2014, 1, 1), date(2014, 4, 30));

        assert_eq!(view.monthly_mean_series.len(), 2);
    }

    #[test]
    fn correlation_requires_all_four_fields() {
        let ds = prsa_span();
        let view = filter(&ds, date(2014, 1, 1), date(2014, 12, 31));
        assert!(view.correlation_matrix.is_none());

        let mut full = prsa_span();
        full.fields = Field::ALL.to_vec();
        for (i, o) in full.records.iter_mut().enumerate() {
            o.humi = Some((i % 11) as f64);
            o.wspm = Some((i % 3) as f64 + 0.5);
        }
        let view = filter(&full, date(2014, 1, 1), date(2014, 12, 31));
        let matrix = view.correlation_matrix.unwrap();
        assert_eq!(matrix.fields.len(), 4);
        assert!(matrix.values.iter().flatten().all(Option::is_some));
    }

    #[test]
    fn empty_window_degrades_gracefully() {
        let mut full = prsa_span();
        full.fields = Field::ALL.to_vec();
        let view = filter(&full, date(2020, 1, 1), date(2020, 2, 1));
        assert!(view.monthly_mean_series.is_empty());
        let matrix = view.correlation_matrix.unwrap();
        assert!(matrix.values.iter().flatten().all(Option::is_none));
    }

    #[test]
    fn scatter_pairs_follow_present_fields() {
        let ds = prsa_span();
        let view = filter(&ds, date(2014, 1, 1), date(2014, 1, 2));
        let temp = view.scatter(Field::Temp).unwrap();
        assert_eq!(temp.len(), view.len());
        assert_eq!(temp[0], (view.records[0].temp.unwrap(), view.records[0].pm25.unwrap()));
        assert!(view.scatter(Field::Humi).is_none());
        assert_eq!(view.head(3).len(), 3);
        assert_eq!(view.head(1000).len(), view.len());
    }
}
