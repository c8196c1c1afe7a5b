//! Filtering and time-granularity rules behind a network-operations KPI dashboard.
//!
//! [`data::filter`] narrows any record type by vendor, technology, region,
//! cluster, country and date through caller-supplied extractors.
//! [`granularity`] decides which data resolutions a time range allows.
//! [`state::ViewState`] ties a loaded record set to the current selection.

pub mod data;
pub mod granularity;
pub mod state;

pub use data::filter::{
    apply_all_filters, apply_date_range_filter, apply_dimension_filters, describe_active_filters,
    filtered_indices, has_active_filters, DateRange, Extractors, FilterState,
};
pub use data::model::{Dimension, KpiDataset, KpiRecord, Timestamp};
pub use granularity::{
    days_between, granularity_warning, is_valid_granularity, recommended_granularity, validate,
    valid_granularities, Granularity, GranularityError, TimeRange, ValidationResult,
};
pub use state::ViewState;
