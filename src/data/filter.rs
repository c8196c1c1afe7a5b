use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use super::model::{Dimension, Timestamp};

/// Summary returned by [`describe_active_filters`] when nothing constrains the view.
pub const NO_FILTERS_LABEL: &str = "No filters applied";

// ---------------------------------------------------------------------------
// Filter predicate: which values are selected per dimension
// ---------------------------------------------------------------------------

/// Inclusive date bounds; either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateRange {
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
}

impl DateRange {
    pub fn new(from: Option<Timestamp>, to: Option<Timestamp>) -> Self {
        Self { from, to }
    }

    /// Neither bound is set.
    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// Both bounds are set.
    pub fn is_complete(&self) -> bool {
        self.from.is_some() && self.to.is_some()
    }

    /// Bounds are inclusive. An invalid timestamp on either side fails the check.
    pub fn contains(&self, date: Timestamp) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

/// The selection the UI layer hands over on every filter change.
///
/// An empty set for a dimension means "no constraint" (show all), never
/// "match nothing". Values are treated as a snapshot: the `with_*` helpers
/// return a new state instead of editing this one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterState {
    pub vendors: BTreeSet<String>,
    pub technologies: BTreeSet<String>,
    pub regions: BTreeSet<String>,
    pub clusters: BTreeSet<String>,
    pub countries: BTreeSet<String>,
    pub date_range: DateRange,
}

impl FilterState {
    pub fn selected(&self, dimension: Dimension) -> &BTreeSet<String> {
        match dimension {
            Dimension::Vendor => &self.vendors,
            Dimension::Technology => &self.technologies,
            Dimension::Region => &self.regions,
            Dimension::Cluster => &self.clusters,
            Dimension::Country => &self.countries,
        }
    }

    fn selected_mut(&mut self, dimension: Dimension) -> &mut BTreeSet<String> {
        match dimension {
            Dimension::Vendor => &mut self.vendors,
            Dimension::Technology => &mut self.technologies,
            Dimension::Region => &mut self.regions,
            Dimension::Cluster => &mut self.clusters,
            Dimension::Country => &mut self.countries,
        }
    }

    /// Copy with `value` added to, or removed from, the dimension's selection.
    pub fn with_toggled(&self, dimension: Dimension, value: &str) -> Self {
        let mut next = self.clone();
        let selected = next.selected_mut(dimension);
        if !selected.remove(value) {
            selected.insert(value.to_string());
        }
        next
    }

    /// Copy with every value in `values` added to the dimension's selection.
    pub fn with_values<I, S>(&self, dimension: Dimension, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut next = self.clone();
        next.selected_mut(dimension)
            .extend(values.into_iter().map(Into::into));
        next
    }

    /// Copy with the dimension's selection emptied.
    pub fn with_cleared(&self, dimension: Dimension) -> Self {
        let mut next = self.clone();
        next.selected_mut(dimension).clear();
        next
    }

    pub fn with_date_range(&self, date_range: DateRange) -> Self {
        Self {
            date_range,
            ..self.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Extractors: how to read each dimension off a record
// ---------------------------------------------------------------------------

pub type DimensionExtractor<'a, T> = Box<dyn Fn(&T) -> &str + 'a>;
pub type DateExtractor<'a, T> = Box<dyn Fn(&T) -> Timestamp + 'a>;

/// Caller-supplied accessors, one per dimension plus one for the record date.
///
/// A dimension without an extractor is never checked, even when the filter
/// has values selected for it.
pub struct Extractors<'a, T> {
    dimensions: BTreeMap<Dimension, DimensionExtractor<'a, T>>,
    date: Option<DateExtractor<'a, T>>,
}

impl<T> Default for Extractors<'_, T> {
    fn default() -> Self {
        Self {
            dimensions: BTreeMap::new(),
            date: None,
        }
    }
}

impl<'a, T> Extractors<'a, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the accessor for one dimension, replacing any earlier one.
    pub fn with(mut self, dimension: Dimension, extract: impl Fn(&T) -> &str + 'a) -> Self {
        self.dimensions.insert(dimension, Box::new(extract));
        self
    }

    pub fn with_date(mut self, extract: impl Fn(&T) -> Timestamp + 'a) -> Self {
        self.date = Some(Box::new(extract));
        self
    }

    pub fn get(&self, dimension: Dimension) -> Option<&(dyn Fn(&T) -> &str + 'a)> {
        self.dimensions.get(&dimension).map(|f| &**f)
    }

    pub fn date(&self) -> Option<&(dyn Fn(&T) -> Timestamp + 'a)> {
        self.date.as_deref()
    }
}

impl<T> fmt::Debug for Extractors<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extractors")
            .field("dimensions", &self.dimensions.keys().collect::<Vec<_>>())
            .field("date", &self.date.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Whether `record` passes every dimension that is both constrained and extractable.
pub fn matches_dimensions<T>(record: &T, filters: &FilterState, extractors: &Extractors<'_, T>) -> bool {
    Dimension::ALL.into_iter().all(|dim| {
        let selected = filters.selected(dim);
        if selected.is_empty() {
            return true;
        }
        match extractors.get(dim) {
            Some(extract) => selected.contains(extract(record)),
            None => true,
        }
    })
}

fn matches_date<T>(
    record: &T,
    date_range: &DateRange,
    date_extractor: Option<&dyn Fn(&T) -> Timestamp>,
) -> bool {
    if date_range.is_unbounded() {
        return true;
    }
    match date_extractor {
        Some(extract) => date_range.contains(extract(record)),
        None => true,
    }
}

/// Keep the records whose dimension values are all selected. Order is preserved.
pub fn apply_dimension_filters<'r, T>(
    records: &'r [T],
    filters: &FilterState,
    extractors: &Extractors<'_, T>,
) -> Vec<&'r T> {
    records
        .iter()
        .filter(|rec| matches_dimensions(*rec, filters, extractors))
        .collect()
}

/// Keep the records whose date lies inside `date_range`.
///
/// Everything passes when the range has no bounds or no date extractor is given.
pub fn apply_date_range_filter<'r, T>(
    records: &'r [T],
    date_range: &DateRange,
    date_extractor: Option<&dyn Fn(&T) -> Timestamp>,
) -> Vec<&'r T> {
    records
        .iter()
        .filter(|rec| matches_date(*rec, date_range, date_extractor))
        .collect()
}

/// Dimension filters AND the date range, in that order.
pub fn apply_all_filters<'r, T>(
    records: &'r [T],
    filters: &FilterState,
    extractors: &Extractors<'_, T>,
) -> Vec<&'r T> {
    let kept: Vec<&T> = records
        .iter()
        .filter(|rec| passes(*rec, filters, extractors))
        .collect();
    debug!("filters kept {} of {} records", kept.len(), records.len());
    kept
}

/// Return indices of records that pass all active filters.
pub fn filtered_indices<T>(records: &[T], filters: &FilterState, extractors: &Extractors<'_, T>) -> Vec<usize> {
    records
        .iter()
        .enumerate()
        .filter(|(_, rec)| passes(*rec, filters, extractors))
        .map(|(i, _)| i)
        .collect()
}

fn passes<T>(record: &T, filters: &FilterState, extractors: &Extractors<'_, T>) -> bool {
    matches_dimensions(record, filters, extractors)
        && matches_date(record, &filters.date_range, extractors.date())
}

/// True when any dimension has a selection or both date bounds are set.
///
/// A lone `from` or `to` does not count, although it still narrows
/// [`apply_date_range_filter`].
pub fn has_active_filters(filters: &FilterState) -> bool {
    Dimension::ALL
        .into_iter()
        .any(|dim| !filters.selected(dim).is_empty())
        || filters.date_range.is_complete()
}

/// One-line summary such as `Vendor: Ericsson, Nokia | Tech: 5G`.
pub fn describe_active_filters(filters: &FilterState) -> String {
    let mut clauses: Vec<String> = Dimension::ALL
        .into_iter()
        .filter_map(|dim| {
            let selected = filters.selected(dim);
            if selected.is_empty() {
                return None;
            }
            let values: Vec<&str> = selected.iter().map(String::as_str).collect();
            Some(format!("{}: {}", dim.label(), values.join(", ")))
        })
        .collect();

    if let DateRange {
        from: Some(from),
        to: Some(to),
    } = filters.date_range
    {
        clauses.push(format!("Date: {from} to {to}"));
    }

    if clauses.is_empty() {
        NO_FILTERS_LABEL.to_string()
    } else {
        clauses.join(" | ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::KpiRecord;

    fn record(vendor: &str, tech: &str, region: &str, date: &str) -> KpiRecord {
        KpiRecord {
            vendor: vendor.into(),
            technology: tech.into(),
            region: region.into(),
            cluster: "C1".into(),
            country: "SE".into(),
            date: Timestamp::parse(date),
            ..Default::default()
        }
    }

    fn sample() -> Vec<KpiRecord> {
        vec![
            record("Ericsson", "5G", "North", "2024-01-01"),
            record("Nokia", "4G", "South", "2024-01-05"),
            record("Huawei", "5G", "North", "2024-01-10"),
            record("Ericsson", "4G", "East", "2024-01-15"),
        ]
    }

    fn vendors(records: &[&KpiRecord]) -> Vec<String> {
        records.iter().map(|r| r.vendor.clone()).collect()
    }

    #[test]
    fn empty_state_keeps_everything() {
        let records = sample();
        let kept = apply_all_filters(&records, &FilterState::default(), &KpiRecord::extractors());
        assert_eq!(kept.len(), records.len());
    }

    #[test]
    fn dimensions_combine_with_and() {
        let records = sample();
        let filters = FilterState::default()
            .with_values(Dimension::Vendor, ["Ericsson", "Huawei"])
            .with_values(Dimension::Technology, ["5G"]);
        let kept = apply_dimension_filters(&records, &filters, &KpiRecord::extractors());
        assert_eq!(vendors(&kept), vec!["Ericsson", "Huawei"]);
        assert_eq!(kept[0].region, "North");
    }

    #[test]
    fn missing_extractor_skips_dimension() {
        let records = sample();
        let filters = FilterState::default().with_values(Dimension::Vendor, ["nobody"]);
        let extractors = Extractors::new().with(Dimension::Region, |r: &KpiRecord| r.region.as_str());
        let kept = apply_dimension_filters(&records, &filters, &extractors);
        assert_eq!(kept.len(), 4);
    }

    #[test]
    fn date_range_is_inclusive() {
        let records = sample();
        let range = DateRange::new(
            Some(Timestamp::parse("2024-01-05")),
            Some(Timestamp::parse("2024-01-10")),
        );
        let extractors = KpiRecord::extractors();
        let kept = apply_date_range_filter(&records, &range, extractors.date());
        assert_eq!(vendors(&kept), vec!["Nokia", "Huawei"]);
    }

    #[test]
    fn single_date_bound_still_filters() {
        let records = sample();
        let range = DateRange::new(Some(Timestamp::parse("2024-01-10")), None);
        let extractors = KpiRecord::extractors();
        let kept = apply_date_range_filter(&records, &range, extractors.date());
        assert_eq!(vendors(&kept), vec!["Huawei", "Ericsson"]);
    }

    #[test]
    fn date_range_without_extractor_is_ignored() {
        let records = sample();
        let range = DateRange::new(Some(Timestamp::parse("2030-01-01")), None);
        let kept = apply_date_range_filter(&records, &range, None);
        assert_eq!(kept.len(), 4);
    }

    #[test]
    fn invalid_dates_are_excluded() {
        let mut records = sample();
        records[0].date = Timestamp::parse("not a date");
        let range = DateRange::new(Some(Timestamp::parse("2023-01-01")), None);
        let extractors = KpiRecord::extractors();
        let kept = apply_date_range_filter(&records, &range, extractors.date());
        assert_eq!(kept.len(), 3);

        let broken = DateRange::new(Some(Timestamp::parse("garbage")), None);
        assert!(apply_date_range_filter(&records, &broken, extractors.date()).is_empty());
    }

    #[test]
    fn indices_match_filtered_records() {
        let records = sample();
        let filters = FilterState::default()
            .with_values(Dimension::Technology, ["4G"])
            .with_date_range(DateRange::new(None, Some(Timestamp::parse("2024-01-10"))));
        let idx = filtered_indices(&records, &filters, &KpiRecord::extractors());
        assert_eq!(idx, vec![1]);
    }

    #[test]
    fn active_filter_detection() {
        let empty = FilterState::default();
        assert!(!has_active_filters(&empty));
        assert!(has_active_filters(&empty.with_values(Dimension::Country, ["SE"])));

        let from_only = empty.with_date_range(DateRange::new(Some(Timestamp::parse("2024-01-01")), None));
        assert!(!has_active_filters(&from_only));
        let to_only = empty.with_date_range(DateRange::new(None, Some(Timestamp::parse("2024-01-01"))));
        assert!(!has_active_filters(&to_only));

        let both = empty.with_date_range(DateRange::new(
            Some(Timestamp::parse("2024-01-01")),
            Some(Timestamp::parse("2024-01-31")),
        ));
        assert!(has_active_filters(&both));
    }

    #[test]
    fn description_lists_clauses_in_fixed_order() {
        let filters = FilterState::default()
            .with_values(Dimension::Country, ["SE"])
            .with_values(Dimension::Technology, ["5G"])
            .with_values(Dimension::Vendor, ["Nokia", "Ericsson"])
            .with_date_range(DateRange::new(
                Some(Timestamp::parse("2024-01-01")),
                Some(Timestamp::parse("2024-01-31")),
            ));
        assert_eq!(
            describe_active_filters(&filters),
            "Vendor: Ericsson, Nokia | Tech: 5G | Country: SE | Date: 2024-01-01 to 2024-01-31"
        );
        assert_eq!(describe_active_filters(&FilterState::default()), NO_FILTERS_LABEL);
    }

    #[test]
    fn toggling_replaces_state() {
        let base = FilterState::default();
        let on = base.with_toggled(Dimension::Region, "North");
        assert!(base.regions.is_empty());
        assert!(on.regions.contains("North"));
        let off = on.with_toggled(Dimension::Region, "North");
        assert!(off.regions.is_empty());
        assert!(on.with_cleared(Dimension::Region).regions.is_empty());
    }

    #[test]
    fn deserializes_ui_shape() {
        let json = r#"{"vendors":["Nokia"],"dateRange":{"from":"2024-01-01","to":null}}"#;
        let filters: FilterState = serde_json::from_str(json).unwrap();
        assert!(filters.vendors.contains("Nokia"));
        assert!(filters.technologies.is_empty());
        assert_eq!(filters.date_range.from, Some(Timestamp::parse("2024-01-01")));
        assert!(filters.date_range.to.is_none());
    }
}
