use std::collections::BTreeSet;

use log::debug;

use crate::data::filter::{
    describe_active_filters, filtered_indices, has_active_filters, DateRange, Extractors, FilterState,
};
use crate::data::model::{Dimension, Timestamp};

// ---------------------------------------------------------------------------
// View state
// ---------------------------------------------------------------------------

/// Loaded records plus the current filter selection, independent of rendering.
pub struct ViewState<'a, T> {
    records: Vec<T>,

    extractors: Extractors<'a, T>,

    /// Current selection. Replaced wholesale on every change.
    filters: FilterState,

    /// Indices of records passing the current filters (cached).
    visible_indices: Vec<usize>,
}

impl<'a, T> ViewState<'a, T> {
    pub fn new(records: Vec<T>, extractors: Extractors<'a, T>) -> Self {
        let visible_indices = (0..records.len()).collect();
        Self {
            records,
            extractors,
            filters: FilterState::default(),
            visible_indices,
        }
    }

    /// Swap in a new record set, keeping the current selection.
    pub fn set_records(&mut self, records: Vec<T>) {
        self.records = records;
        self.refilter();
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn set_filters(&mut self, filters: FilterState) {
        self.filters = filters;
        self.refilter();
    }

    /// Recompute `visible_indices` after a filter change.
    pub fn refilter(&mut self) {
        self.visible_indices = filtered_indices(&self.records, &self.filters, &self.extractors);
        debug!(
            "{} of {} records visible ({})",
            self.visible_indices.len(),
            self.records.len(),
            describe_active_filters(&self.filters)
        );
    }

    pub fn visible_indices(&self) -> &[usize] {
        &self.visible_indices
    }

    pub fn visible(&self) -> impl Iterator<Item = &T> + '_ {
        self.visible_indices.iter().map(move |&i| &self.records[i])
    }

    pub fn visible_count(&self) -> usize {
        self.visible_indices.len()
    }

    /// Toggle a single value in a dimension's selection.
    pub fn toggle_filter_value(&mut self, dimension: Dimension, value: &str) {
        let next = self.filters.with_toggled(dimension, value);
        self.set_filters(next);
    }

    /// Deselect all values in a dimension, which lifts its constraint.
    pub fn select_none(&mut self, dimension: Dimension) {
        let next = self.filters.with_cleared(dimension);
        self.set_filters(next);
    }

    pub fn set_date_range(&mut self, from: Option<Timestamp>, to: Option<Timestamp>) {
        let next = self.filters.with_date_range(DateRange::new(from, to));
        self.set_filters(next);
    }

    pub fn reset_filters(&mut self) {
        self.set_filters(FilterState::default());
    }

    pub fn has_active_filters(&self) -> bool {
        has_active_filters(&self.filters)
    }

    pub fn describe_filters(&self) -> String {
        describe_active_filters(&self.filters)
    }

    /// Distinct values of a dimension across all records, for building pickers.
    ///
    /// Empty when no extractor is registered for the dimension.
    pub fn unique_values(&self, dimension: Dimension) -> BTreeSet<String> {
        match self.extractors.get(dimension) {
            Some(extract) => self
                .records
                .iter()
                .map(|rec| extract(rec).to_string())
                .collect(),
            None => BTreeSet::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::KpiRecord;

    fn cell(vendor: &str, country: &str, date: &str) -> KpiRecord {
        KpiRecord {
            vendor: vendor.into(),
            country: country.into(),
            date: Timestamp::parse(date),
            ..Default::default()
        }
    }

    fn view() -> ViewState<'static, KpiRecord> {
        ViewState::new(
            vec![
                cell("Ericsson", "SE", "2024-01-01"),
                cell("Nokia", "FI", "2024-01-02"),
                cell("Ericsson", "FI", "2024-01-03"),
            ],
            KpiRecord::extractors(),
        )
    }

    #[test]
    fn starts_with_everything_visible() {
        let v = view();
        assert_eq!(v.visible_indices(), &[0, 1, 2]);
        assert!(!v.has_active_filters());
    }

    #[test]
    fn toggles_update_cache() {
        let mut v = view();
        v.toggle_filter_value(Dimension::Vendor, "Ericsson");
        assert_eq!(v.visible_indices(), &[0, 2]);
        v.toggle_filter_value(Dimension::Country, "FI");
        assert_eq!(v.visible().map(|r| r.country.as_str()).collect::<Vec<_>>(), vec!["FI"]);
        v.select_none(Dimension::Vendor);
        assert_eq!(v.visible_count(), 2);
        v.reset_filters();
        assert_eq!(v.visible_count(), 3);
    }

    #[test]
    fn date_range_narrows_view() {
        let mut v = view();
        v.set_date_range(Some(Timestamp::parse("2024-01-02")), None);
        assert_eq!(v.visible_indices(), &[1, 2]);
        assert!(!v.has_active_filters());
        v.set_date_range(Some(Timestamp::parse("2024-01-02")), Some(Timestamp::parse("2024-01-02")));
        assert_eq!(v.visible_indices(), &[1]);
        assert_eq!(v.describe_filters(), "Date: 2024-01-02 to 2024-01-02");
    }

    #[test]
    fn set_records_keeps_selection() {
        let mut v = view();
        v.toggle_filter_value(Dimension::Vendor, "Nokia");
        v.set_records(vec![cell("Nokia", "FI", "2024-02-01"), cell("Huawei", "CN", "2024-02-01")]);
        assert_eq!(v.visible_indices(), &[0]);
        assert_eq!(v.records().len(), 2);
    }

    #[test]
    fn unique_values_follow_extractors() {
        let v = view();
        let vendors: Vec<_> = v.unique_values(Dimension::Vendor).into_iter().collect();
        assert_eq!(vendors, vec!["Ericsson", "Nokia"]);

        let partial = ViewState::new(
            vec![cell("Nokia", "FI", "2024-01-01")],
            Extractors::new().with(Dimension::Vendor, |r: &KpiRecord| r.vendor.as_str()),
        );
        assert!(partial.unique_values(Dimension::Country).is_empty());
    }
}
