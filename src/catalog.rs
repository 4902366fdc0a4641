use chrono::NaiveDate;

use crate::config::StationSource;
use crate::data::filter::{filter, FilteredView};
use crate::data::loader::load_file;
use crate::data::model::{DatasetSummary, StationDataset};
use crate::error::StationError;

// ---------------------------------------------------------------------------
// Station catalog
// ---------------------------------------------------------------------------

/// One configured station and the outcome of loading it.
#[derive(Debug, Clone)]
pub struct StationEntry {
    pub id: String,
    pub dataset: Result<StationDataset, StationError>,
}

/// Every configured station, loaded once at startup and read-only after.
#[derive(Debug, Clone, Default)]
pub struct StationCatalog {
    entries: Vec<StationEntry>,
}

impl StationCatalog {
    /// Load each source in configuration order. A station that fails to
    /// load is kept as `SourceUnavailable`; the others are unaffected.
    pub fn load(sources: &[StationSource]) -> Self {
        let entries = sources
            .iter()
            .map(|src| {
                let dataset = match load_file(&src.id, &src.path) {
                    Ok(ds) => {
                        log::info!(
                            "Loaded {}: kept {} of {} rows (fields {:?})",
                            src.id,
                            ds.cleaning.rows_kept(),
                            ds.cleaning.rows_read,
                            ds.fields,
                        );
                        if ds.is_empty() {
                            log::warn!("{}: no rows survived cleaning", src.id);
                        }
                        Ok(ds)
                    }
                    Err(e) => {
                        log::error!("Failed to load station {}: {e:#}", src.id);
                        Err(StationError::SourceUnavailable {
                            station: src.id.clone(),
                            path: src.path.clone(),
                            reason: format!("{e:#}"),
                        })
                    }
                };
                StationEntry {
                    id: src.id.clone(),
                    dataset,
                }
            })
            .collect();
        StationCatalog { entries }
    }

    /// Build a catalog from datasets already in memory.
    pub fn from_datasets(datasets: Vec<StationDataset>) -> Self {
        let entries = datasets
            .into_iter()
            .map(|ds| StationEntry {
                id: ds.location.clone(),
                dataset: Ok(ds),
            })
            .collect();
        StationCatalog { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Identifiers in configuration order, available or not.
    pub fn station_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|e| e.id.as_str())
    }

    /// Successfully loaded datasets, in configuration order.
    pub fn available(&self) -> impl Iterator<Item = &StationDataset> + '_ {
        self.entries.iter().filter_map(|e| e.dataset.as_ref().ok())
    }

    pub fn dataset(&self, id: &str) -> Result<&StationDataset, StationError> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| StationError::UnknownStation(id.to_string()))?;
        entry.dataset.as_ref().map_err(Clone::clone)
    }

    pub fn summary(&self, id: &str) -> Result<DatasetSummary, StationError> {
        self.dataset(id).map(StationDataset::summary)
    }

    /// Date-range query against one station.
    pub fn query(
        &self,
        id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FilteredView<'_>, StationError> {
        self.dataset(id).map(|ds| filter(ds, start, end))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use tempfile::TempDir;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn write_station(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(
            &path,
            "No,year,month,day,hour,PM2.5,TEMP,WSPM,station\n\
             1,2013,3,1,0,4,-0.7,4.4,X\n\
             2,2013,3,1,1,8,-1.1,4.7,X\n\
             3,2013,4,1,0,12,5.0,2.0,X\n",
        )
        .unwrap();
        path
    }

    #[test]
    fn missing_source_is_unavailable_while_sibling_loads() {
        let dir = TempDir::new().unwrap();
        let good = write_station(&dir, "changping.csv");
        let sources = vec![
            StationSource {
                id: "Aotizhongxin".into(),
                path: dir.path().join("missing.csv"),
            },
            StationSource {
                id: "Changping".into(),
                path: good,
            },
        ];

        let catalog = StationCatalog::load(&sources);

        assert_eq!(catalog.len(), 2);
        assert_eq!(
            catalog.station_ids().collect::<Vec<_>>(),
            vec!["Aotizhongxin", "Changping"]
        );
        match catalog.dataset("Aotizhongxin") {
            Err(StationError::SourceUnavailable { station, .. }) => {
                assert_eq!(station, "Aotizhongxin")
            }
            other => panic!("expected SourceUnavailable, got {other:?}"),
        }
        let changping = catalog.dataset("Changping").unwrap();
        assert_eq!(changping.len(), 3);
        assert_eq!(catalog.available().count(), 1);
    }

    #[test]
    fn unknown_station_is_reported() {
        let catalog = StationCatalog::default();
        assert_eq!(
            catalog.summary("Nowhere"),
            Err(StationError::UnknownStation("Nowhere".into()))
        );
    }

    #[test]
    fn summary_and_query_come_from_the_loaded_dataset() {
        let dir = TempDir::new().unwrap();
        let path = write_station(&dir, "dongsi.csv");
        let catalog = StationCatalog::load(&[StationSource {
            id: "Dongsi".into(),
            path,
        }]);

        let summary = catalog.summary("Dongsi").unwrap();
        assert_eq!(summary.row_count, 3);
        let bounds = summary.date_bounds.unwrap();
        assert_eq!(bounds.min.date(), date(2013, 3, 1));
        assert_eq!(bounds.max.date(), date(2013, 4, 1));

        let view = catalog.query("Dongsi", date(2013, 3, 1), date(2013, 3, 31)).unwrap();
        assert_eq!(view.len(), 2);
        assert_eq!(view.monthly_mean_series.len(), 1);
        assert!((view.monthly_mean_series[0].mean - 6.0).abs() < 1e-9);
        assert!(view.correlation_matrix.is_none());
    }
}
