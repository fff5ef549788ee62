use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::color::ColorMap;
use crate::config::DashboardConfig;
use crate::data::aggregate::{MetricsSnapshot, summarize};
use crate::data::filter::{self, FilterState};
use crate::data::loader::{DatasetCache, LoadOptions, load_file};
use crate::data::model::{DateRange, Dataset, Dimension, Record};
use crate::error::{EmptyResultWarning, LoadError};

// ---------------------------------------------------------------------------
// Session: one loaded dataset plus the derived results for the current filters
// ---------------------------------------------------------------------------

pub struct Session {
    pub dataset: Arc<Dataset>,
    pub filters: FilterState,
    /// Indices of records passing the current filters.
    pub visible_indices: Vec<usize>,
    pub metrics: MetricsSnapshot,
    pub warning: Option<EmptyResultWarning>,
}

impl Session {
    fn new(dataset: Arc<Dataset>) -> Self {
        let filters = FilterState::full(&dataset);
        let mut session = Session {
            dataset,
            filters,
            visible_indices: Vec::new(),
            metrics: MetricsSnapshot::default(),
            warning: None,
        };
        session.recompute();
        session
    }

    /// Full filter → aggregate pass from the immutable dataset.
    fn recompute(&mut self) {
        let view = filter::apply(&self.dataset, &self.filters);
        self.metrics = summarize(&view);
        self.warning = view.empty_warning();
        self.visible_indices = view.into_indices();
        log::debug!(
            "Recomputed: {} of {} records visible",
            self.visible_indices.len(),
            self.dataset.len()
        );
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Loaded dataset and derived results (None until a load succeeds).
    pub session: Option<Session>,

    /// Chart colours per dimension value, rebuilt on every load.
    pub color_maps: BTreeMap<Dimension, ColorMap>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    /// How many filtered rows the preview table shows.
    pub preview_rows: usize,

    /// Options used for File → Open.
    pub load_options: LoadOptions,
}

impl AppState {
    pub fn new(config: &DashboardConfig) -> Self {
        AppState {
            session: None,
            color_maps: BTreeMap::new(),
            status_message: None,
            preview_rows: config.preview_rows,
            load_options: config.load_options,
        }
    }

    /// Start from the cached dataset. A load failure is fatal for the
    /// dashboard and is surfaced as the status message.
    pub fn from_cache(config: &DashboardConfig, cache: &DatasetCache) -> Self {
        let mut state = AppState::new(config);
        match cache.get_or_load() {
            Ok(dataset) => state.set_dataset(dataset),
            Err(e) => state.report_load_error(cache.path(), &e),
        }
        state
    }

    /// Ingest a newly loaded dataset, reset filters and colours.
    pub fn set_dataset(&mut self, dataset: Arc<Dataset>) {
        self.color_maps = Dimension::ALL
            .into_iter()
            .map(|dim| (dim, ColorMap::new(&dataset.universes().labels(dim))))
            .collect();
        self.session = Some(Session::new(dataset));
        self.status_message = None;
    }

    /// Load another file (File → Open). The current session survives a
    /// failed load.
    pub fn open_path(&mut self, path: &Path) {
        match load_file(path, &self.load_options) {
            Ok(loaded) => self.set_dataset(Arc::new(loaded.dataset)),
            Err(e) => self.report_load_error(path, &e),
        }
    }

    fn report_load_error(&mut self, path: &Path, err: &LoadError) {
        log::error!("Failed to load {}: {err}", path.display());
        self.status_message = Some(format!("Error loading {}: {err}", path.display()));
    }

    /// Replace the filters wholesale and recompute everything.
    pub fn set_filters(&mut self, filters: FilterState) {
        let Some(session) = &mut self.session else {
            return;
        };
        for (dim, value) in filters.unknown_values(&session.dataset) {
            log::warn!("Ignoring unknown {dim} selection '{value}'");
        }
        session.filters = filters.retain_known(&session.dataset);
        session.recompute();
    }

    fn update_filters(&mut self, change: impl FnOnce(FilterState) -> FilterState) {
        if let Some(session) = &self.session {
            let next = change(session.filters.clone());
            self.set_filters(next);
        }
    }

    pub fn set_date_range(&mut self, range: DateRange) {
        self.update_filters(|f| f.with_date_range(range));
    }

    /// Toggle a single value in a dimension's filter.
    pub fn toggle_filter_value(&mut self, dim: Dimension, label: &str) {
        self.update_filters(|f| f.toggled(dim, label));
    }

    /// Select all values in a dimension.
    pub fn select_all(&mut self, dim: Dimension) {
        let Some(session) = &self.session else {
            return;
        };
        let dataset = Arc::clone(&session.dataset);
        self.update_filters(|f| f.with_all(dim, dataset.universes()));
    }

    /// Deselect all values in a dimension.
    pub fn select_none(&mut self, dim: Dimension) {
        self.update_filters(|f| f.with_none(dim));
    }

    /// Back to the full date range and every value selected.
    pub fn reset_filters(&mut self) {
        if let Some(session) = &self.session {
            let full = FilterState::full(&session.dataset);
            self.set_filters(full);
        }
    }

    /// The first `preview_rows` visible records.
    pub fn preview(&self) -> Vec<&Record> {
        let Some(session) = &self.session else {
            return Vec::new();
        };
        let records = session.dataset.records();
        session
            .visible_indices
            .iter()
            .take(self.preview_rows)
            .map(|&i| &records[i])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::data::model::tests::{date, record, three_records};
    use crate::error::EmptyReason;

    fn state_with(dataset: Dataset) -> AppState {
        let mut state = AppState::new(&DashboardConfig::default());
        state.set_dataset(Arc::new(dataset));
        state
    }

    fn session(state: &AppState) -> &Session {
        state.session.as_ref().unwrap()
    }

    #[test]
    fn new_dataset_starts_unfiltered() {
        let state = state_with(three_records());
        let s = session(&state);
        assert_eq!(s.visible_indices, [0, 1, 2]);
        assert_eq!(s.metrics.kpis.total_sales, 35.0);
        assert!(s.warning.is_none());
        assert_eq!(state.color_maps.len(), Dimension::ALL.len());
    }

    #[test]
    fn every_filter_change_recomputes_metrics() {
        let mut state = state_with(three_records());

        state.toggle_filter_value(Dimension::Category, "B");
        assert_eq!(session(&state).visible_indices, [0, 2]);
        assert_eq!(session(&state).metrics.kpis.average_order_value, 7.5);

        state.set_date_range(DateRange::new(date(2023, 2, 1), date(2023, 2, 28)));
        assert_eq!(session(&state).visible_indices, [2]);
        assert_eq!(session(&state).metrics.kpis.total_sales, 5.0);

        state.reset_filters();
        assert_eq!(session(&state).visible_indices, [0, 1, 2]);
    }

    #[test]
    fn deselecting_everything_shows_nothing_without_failing() {
        let mut state = state_with(three_records());
        state.select_none(Dimension::PaymentMethod);

        let s = session(&state);
        assert!(s.visible_indices.is_empty());
        assert!(s.metrics.is_empty());
        assert_eq!(
            s.warning.map(|w| w.reason),
            Some(EmptyReason::EmptySelection(Dimension::PaymentMethod))
        );
        assert!(state.preview().is_empty());

        state.select_all(Dimension::PaymentMethod);
        assert_eq!(session(&state).visible_indices.len(), 3);
    }

    #[test]
    fn unknown_selections_are_dropped_on_replace() {
        let mut state = state_with(three_records());
        let filters = session(&state)
            .filters
            .clone()
            .with_selection(Dimension::Category, ["A", "Discontinued"]);
        state.set_filters(filters);

        let s = session(&state);
        assert!(s.filters.unknown_values(&s.dataset).is_empty());
        assert_eq!(s.visible_indices, [0, 2]);
    }

    #[test]
    fn preview_is_capped_by_config() {
        let recs = (1..=5)
            .map(|d| record(date(2023, 1, d), "A", d as f64))
            .collect();
        let mut state = AppState::new(&DashboardConfig {
            preview_rows: 2,
            ..DashboardConfig::default()
        });
        state.set_dataset(Arc::new(Dataset::from_records(recs).unwrap()));

        let preview = state.preview();
        assert_eq!(preview.len(), 2);
        assert_eq!(preview[1].total_price, 2.0);
    }

    #[test]
    fn filter_changes_without_a_dataset_are_ignored() {
        let mut state = AppState::new(&DashboardConfig::default());
        state.toggle_filter_value(Dimension::Category, "A");
        state.reset_filters();
        assert!(state.session.is_none());
        assert!(state.preview().is_empty());
    }

    #[test]
    fn startup_load_failure_is_reported() {
        let cache = DatasetCache::new("/nonexistent/data.json", LoadOptions::default());
        let state = AppState::from_cache(&DashboardConfig::default(), &cache);
        assert!(state.session.is_none());
        assert!(state.status_message.unwrap().contains("/nonexistent/data.json"));
    }

    #[test]
    fn failed_open_keeps_the_current_session() {
        let mut state = state_with(three_records());
        let mut bad = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        bad.write_all(b"[{}]").unwrap();

        state.open_path(bad.path());
        assert!(state.status_message.is_some());
        assert_eq!(session(&state).dataset.len(), 3);
    }
}
