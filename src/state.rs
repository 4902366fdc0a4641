use chrono::NaiveDate;

use crate::catalog::StationCatalog;
use crate::data::filter::FilteredView;
use crate::data::model::DatasetSummary;
use crate::error::StationError;

// ---------------------------------------------------------------------------
// Dashboard state
// ---------------------------------------------------------------------------

/// The interaction state, independent of rendering.
///
/// Views are never cached: [`DashboardState::view`] filters afresh every
/// time it is asked.
pub struct DashboardState {
    /// All stations, loaded at startup.
    pub catalog: StationCatalog,

    /// Station currently shown.
    pub selected: Option<String>,

    /// Inclusive date range; defaults to the selected station's bounds.
    pub date_range: Option<(NaiveDate, NaiveDate)>,

    /// Status / error message for the user.
    pub status_message: Option<String>,
}

impl DashboardState {
    /// Wrap a catalog and select its first station.
    pub fn new(catalog: StationCatalog) -> Self {
        let first = catalog.station_ids().next().map(str::to_string);
        let mut state = Self {
            catalog,
            selected: None,
            date_range: None,
            status_message: None,
        };
        if let Some(id) = first {
            state.select_station(&id);
        }
        state
    }

    /// Switch station and reset the date range to its full extent.
    ///
    /// An unavailable station stays selected so the caller can show "no
    /// data"; an unknown one leaves the selection untouched.
    pub fn select_station(&mut self, id: &str) {
        match self.catalog.summary(id) {
            Ok(summary) => {
                self.selected = Some(id.to_string());
                self.date_range = summary
                    .date_bounds
                    .map(|b| (b.min.date(), b.max.date()));
                self.status_message = None;
            }
            Err(e @ StationError::SourceUnavailable { .. }) => {
                log::warn!("{e}");
                self.selected = Some(id.to_string());
                self.date_range = None;
                self.status_message = Some(e.to_string());
            }
            Err(e @ StationError::UnknownStation(_)) => {
                log::warn!("{e}");
                self.status_message = Some(e.to_string());
            }
        }
    }

    /// Set the inclusive range as given; a reversed range is allowed and
    /// simply selects nothing.
    pub fn set_date_range(&mut self, start: NaiveDate, end: NaiveDate) {
        self.date_range = Some((start, end));
    }

    pub fn summary(&self) -> Option<Result<DatasetSummary, StationError>> {
        let id = self.selected.as_deref()?;
        Some(self.catalog.summary(id))
    }

    /// Recompute the filtered view for the current selection.
    pub fn view(&self) -> Option<Result<FilteredView<'_>, StationError>> {
        let id = self.selected.as_deref()?;
        let (start, end) = self
            .date_range
            .unwrap_or((NaiveDate::MIN, NaiveDate::MAX));
        Some(self.catalog.query(id, start, end))
    }
}
