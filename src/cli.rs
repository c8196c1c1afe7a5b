use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::warn;

use netops_filter::{DateRange, Dimension, FilterState, Timestamp};

/// Filter a KPI dataset and check a time granularity against its date range.
#[derive(Debug, Parser)]
#[command(name = "netops-filter", version, about)]
pub struct Args {
    /// KPI dataset (.parquet, .json or .csv)
    pub input: PathBuf,

    /// Filter preset as a JSON FilterState; flags below are merged on top
    #[arg(long, value_name = "FILE")]
    pub preset: Option<PathBuf>,

    /// Keep only these vendors (repeatable)
    #[arg(long = "vendor", value_name = "NAME")]
    pub vendors: Vec<String>,

    /// Keep only these technologies (repeatable)
    #[arg(long = "technology", value_name = "NAME")]
    pub technologies: Vec<String>,

    /// Keep only these regions (repeatable)
    #[arg(long = "region", value_name = "NAME")]
    pub regions: Vec<String>,

    /// Keep only these clusters (repeatable)
    #[arg(long = "cluster", value_name = "NAME")]
    pub clusters: Vec<String>,

    /// Keep only these countries (repeatable)
    #[arg(long = "country", value_name = "NAME")]
    pub countries: Vec<String>,

    /// Inclusive start date (YYYY-MM-DD or ISO 8601)
    #[arg(long, value_name = "DATE")]
    pub from: Option<String>,

    /// Inclusive end date (YYYY-MM-DD or ISO 8601)
    #[arg(long, value_name = "DATE")]
    pub to: Option<String>,

    /// Granularity to validate against the date range (15m, 1h, 1d, 1w, 1mo)
    #[arg(long, short = 'g', value_name = "ID")]
    pub granularity: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Print the distinct values of every dimension and exit
    #[arg(long)]
    pub list_values: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl Args {
    /// Preset (if any) with the command-line selections merged on top.
    pub fn filter_state(&self) -> Result<FilterState> {
        let base = match &self.preset {
            Some(path) => load_preset(path)?,
            None => FilterState::default(),
        };

        let state = base
            .with_values(Dimension::Vendor, self.vendors.iter().cloned())
            .with_values(Dimension::Technology, self.technologies.iter().cloned())
            .with_values(Dimension::Region, self.regions.iter().cloned())
            .with_values(Dimension::Cluster, self.clusters.iter().cloned())
            .with_values(Dimension::Country, self.countries.iter().cloned());

        let mut range: DateRange = state.date_range;
        if let Some(from) = &self.from {
            range.from = Some(parse_bound("--from", from));
        }
        if let Some(to) = &self.to {
            range.to = Some(parse_bound("--to", to));
        }

        Ok(state.with_date_range(range))
    }
}

fn parse_bound(flag: &str, text: &str) -> Timestamp {
    let ts = Timestamp::parse(text);
    if !ts.is_valid() {
        warn!("{flag} '{text}' is not a valid date; no record will match it");
    }
    ts
}

fn load_preset(path: &Path) -> Result<FilterState> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading preset {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing preset {}", path.display()))
}
