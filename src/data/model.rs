use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::filter::Extractors;

// ---------------------------------------------------------------------------
// Dimension – a facet records can be filtered on
// ---------------------------------------------------------------------------

/// The five filterable facets of a KPI record, in summary order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Vendor,
    Technology,
    Region,
    Cluster,
    Country,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Vendor,
        Dimension::Technology,
        Dimension::Region,
        Dimension::Cluster,
        Dimension::Country,
    ];

    /// Label used in the active-filter summary.
    pub fn label(self) -> &'static str {
        match self {
            Dimension::Vendor => "Vendor",
            Dimension::Technology => "Tech",
            Dimension::Region => "Region",
            Dimension::Cluster => "Cluster",
            Dimension::Country => "Country",
        }
    }

    /// Column / field name in loaded datasets.
    pub fn key(self) -> &'static str {
        match self {
            Dimension::Vendor => "vendor",
            Dimension::Technology => "technology",
            Dimension::Region => "region",
            Dimension::Cluster => "cluster",
            Dimension::Country => "country",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.key() == key)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// ---------------------------------------------------------------------------
// Timestamp – a date-time that may be invalid
// ---------------------------------------------------------------------------

const DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// A point in time read from user input or a dataset.
///
/// Unparseable text produces an *invalid* timestamp instead of an error.
/// Every ordering comparison that involves an invalid timestamp is `false`,
/// and an invalid timestamp is not even equal to itself, so range checks
/// against it quietly exclude rather than fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct Timestamp(Option<NaiveDateTime>);

impl Timestamp {
    pub const INVALID: Timestamp = Timestamp(None);

    /// Parse `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM[:SS[.fff]]`, `YYYY-MM-DD HH:MM:SS`
    /// or RFC 3339 (normalised to UTC).
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Timestamp(Some(dt.naive_utc()));
        }
        for fmt in DATETIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
                return Timestamp(Some(dt));
            }
        }
        match NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            Ok(date) => Timestamp::from(date),
            Err(_) => Timestamp::INVALID,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.0.is_some()
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        self.0
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(dt: NaiveDateTime) -> Self {
        Timestamp(Some(dt))
    }
}

impl From<NaiveDate> for Timestamp {
    fn from(date: NaiveDate) -> Self {
        Timestamp(date.and_hms_opt(0, 0, 0))
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        matches!((self.0, other.0), (Some(a), Some(b)) if a == b)
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self.0, other.0) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => None,
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(dt) if dt.num_seconds_from_midnight() == 0 && dt.nanosecond() == 0 => {
                write!(f, "{}", dt.format("%Y-%m-%d"))
            }
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
            None => f.write_str("Invalid Date"),
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(Timestamp::parse(&text))
    }
}

// ---------------------------------------------------------------------------
// KpiRecord – one row of a KPI export
// ---------------------------------------------------------------------------

/// KPI samples for one network element at one point in time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KpiRecord {
    pub vendor: String,
    pub technology: String,
    pub region: String,
    pub cluster: String,
    pub country: String,
    pub date: Timestamp,
    /// KPI name → value (e.g. `availability`, `drop_rate`).
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
}

impl KpiRecord {
    pub fn dimension(&self, dimension: Dimension) -> &str {
        match dimension {
            Dimension::Vendor => &self.vendor,
            Dimension::Technology => &self.technology,
            Dimension::Region => &self.region,
            Dimension::Cluster => &self.cluster,
            Dimension::Country => &self.country,
        }
    }

    pub fn dimension_mut(&mut self, dimension: Dimension) -> &mut String {
        match dimension {
            Dimension::Vendor => &mut self.vendor,
            Dimension::Technology => &mut self.technology,
            Dimension::Region => &mut self.region,
            Dimension::Cluster => &mut self.cluster,
            Dimension::Country => &mut self.country,
        }
    }

    /// Extractors covering every dimension and the record date.
    pub fn extractors<'a>() -> Extractors<'a, KpiRecord> {
        Extractors::new()
            .with(Dimension::Vendor, |r: &KpiRecord| r.vendor.as_str())
            .with(Dimension::Technology, |r: &KpiRecord| r.technology.as_str())
            .with(Dimension::Region, |r: &KpiRecord| r.region.as_str())
            .with(Dimension::Cluster, |r: &KpiRecord| r.cluster.as_str())
            .with(Dimension::Country, |r: &KpiRecord| r.country.as_str())
            .with_date(|r: &KpiRecord| r.date)
    }
}

// ---------------------------------------------------------------------------
// KpiDataset – the complete loaded dataset
// ---------------------------------------------------------------------------

/// All loaded records with pre-computed picker values.
#[derive(Debug, Clone, Default)]
pub struct KpiDataset {
    pub records: Vec<KpiRecord>,
    /// For each dimension the sorted set of distinct values.
    pub unique_values: BTreeMap<Dimension, BTreeSet<String>>,
    /// Every metric name seen in any record.
    pub metric_names: BTreeSet<String>,
}

impl KpiDataset {
    /// Build the value indices from the loaded records.
    pub fn from_records(records: Vec<KpiRecord>) -> Self {
        let mut unique_values: BTreeMap<Dimension, BTreeSet<String>> = BTreeMap::new();
        let mut metric_names = BTreeSet::new();

        for rec in &records {
            for dim in Dimension::ALL {
                let values = unique_values.entry(dim).or_default();
                let value = rec.dimension(dim);
                // missing columns load as ""
                if !value.is_empty() {
                    values.insert(value.to_string());
                }
            }
            metric_names.extend(rec.metrics.keys().cloned());
        }

        KpiDataset {
            records,
            unique_values,
            metric_names,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_formats() {
        let day = Timestamp::parse("2024-01-01");
        assert!(day.is_valid());
        assert_eq!(day.to_string(), "2024-01-01");

        let with_time = Timestamp::parse("2024-01-01T05:00:00");
        assert_eq!(with_time.to_string(), "2024-01-01T05:00:00");
        assert_eq!(Timestamp::parse("2024-01-01 05:00:00"), with_time);
        assert_eq!(Timestamp::parse("2024-01-01T05:00"), with_time);
        assert_eq!(Timestamp::parse("2024-01-01T07:00:00+02:00"), with_time);
        assert!(Timestamp::parse("2024-01-01T05:00:00.250").is_valid());
    }

    #[test]
    fn invalid_timestamp_never_compares() {
        let bad = Timestamp::parse("last tuesday");
        let good = Timestamp::parse("2024-01-01");
        assert!(!bad.is_valid());
        assert_eq!(bad.to_string(), "Invalid Date");
        assert!(!(bad >= good));
        assert!(!(bad <= good));
        assert!(!(good >= bad));
        assert_ne!(bad, bad);
    }

    #[test]
    fn serde_round_trips_through_text() {
        let ts: Timestamp = serde_json::from_str("\"2024-03-05\"").unwrap();
        assert_eq!(serde_json::to_string(&ts).unwrap(), "\"2024-03-05\"");
        let bad: Timestamp = serde_json::from_str("\"nope\"").unwrap();
        assert!(!bad.is_valid());
    }

    #[test]
    fn dataset_collects_unique_values() {
        let mut a = KpiRecord {
            vendor: "Nokia".into(),
            technology: "5G".into(),
            ..Default::default()
        };
        a.metrics.insert("availability".into(), 99.9);
        let b = KpiRecord {
            vendor: "Ericsson".into(),
            technology: "5G".into(),
            ..Default::default()
        };
        let ds = KpiDataset::from_records(vec![a, b]);
        assert_eq!(ds.len(), 2);
        let vendors: Vec<_> = ds.unique_values[&Dimension::Vendor].iter().cloned().collect();
        assert_eq!(vendors, vec!["Ericsson", "Nokia"]);
        assert_eq!(ds.unique_values[&Dimension::Technology].len(), 1);
        assert!(ds.unique_values[&Dimension::Region].is_empty());
        assert!(ds.metric_names.contains("availability"));
    }

    #[test]
    fn dimension_keys_round_trip() {
        for dim in Dimension::ALL {
            assert_eq!(Dimension::from_key(dim.key()), Some(dim));
        }
        assert_eq!(Dimension::from_key("site"), None);
    }
}
