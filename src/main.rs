mod cli;

use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::Parser;
use log::info;
use serde::Serialize;
use serde_json::json;

use cli::{Args, OutputFormat};
use netops_filter::data::loader::load_file;
use netops_filter::{
    recommended_granularity, valid_granularities, validate, Dimension, FilterState, KpiRecord,
    TimeRange, ValidationResult, ViewState,
};

/// Granularity check for the selected date range.
#[derive(Debug, Serialize)]
struct GranularityReport {
    range_days: Option<i64>,
    requested: String,
    recommended: &'static str,
    allowed: Vec<&'static str>,
    result: ValidationResult,
}

fn main() -> ExitCode {
    env_logger::init();

    match run(&Args::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<ExitCode> {
    let dataset = load_file(&args.input)?;

    if args.list_values {
        for dim in Dimension::ALL {
            let values: Vec<&str> = dataset
                .unique_values
                .get(&dim)
                .map(|vals| vals.iter().map(String::as_str).collect())
                .unwrap_or_default();
            println!("{}: {}", dim.label(), values.join(", "));
        }
        return Ok(ExitCode::SUCCESS);
    }

    let filters = args.filter_state()?;
    let report = granularity_report(args, &filters)?;

    let total = dataset.len();
    let mut view = ViewState::new(dataset.records, KpiRecord::extractors());
    view.set_filters(filters);
    info!("{} of {} records pass the filters", view.visible_count(), total);

    match args.format {
        OutputFormat::Text => print_text(&view, total, report.as_ref()),
        OutputFormat::Json => {
            let visible: Vec<&KpiRecord> = view.visible().collect();
            let out = json!({
                "filters": view.describe_filters(),
                "active": view.has_active_filters(),
                "total": total,
                "matched": visible.len(),
                "records": visible,
                "granularity": report,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }

    match report {
        Some(r) if !r.result.valid => Ok(ExitCode::from(2)),
        _ => Ok(ExitCode::SUCCESS),
    }
}

fn granularity_report(args: &Args, filters: &FilterState) -> Result<Option<GranularityReport>> {
    let (from, to) = match (filters.date_range.from, filters.date_range.to) {
        (Some(from), Some(to)) => (from, to),
        _ => {
            if args.granularity.is_some() {
                bail!("--granularity needs a date range with both --from and --to");
            }
            return Ok(None);
        }
    };

    let range = TimeRange::new(from, to);
    let recommended = recommended_granularity(&range);
    let requested = args
        .granularity
        .clone()
        .unwrap_or_else(|| recommended.id().to_string());

    Ok(Some(GranularityReport {
        range_days: range.days(),
        result: validate(&range, &requested),
        requested,
        recommended: recommended.id(),
        allowed: valid_granularities(&range).into_iter().map(|g| g.id()).collect(),
    }))
}

fn print_text(view: &ViewState<'_, KpiRecord>, total: usize, report: Option<&GranularityReport>) {
    println!("Filters: {}", view.describe_filters());
    println!("Matched {} of {} records", view.visible_count(), total);

    for rec in view.visible() {
        let metrics: Vec<String> = rec
            .metrics
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        println!(
            "  {:<19} {:<10} {:<5} {:<10} {:<10} {:<4} {}",
            rec.date.to_string(),
            rec.vendor,
            rec.technology,
            rec.region,
            rec.cluster,
            rec.country,
            metrics.join(" ")
        );
    }

    let Some(report) = report else {
        return;
    };
    println!(
        "Granularity: {} (recommended {}, allowed: {})",
        report.requested,
        report.recommended,
        report.allowed.join(", ")
    );
    match (&report.result.error, &report.result.warning) {
        (Some(err), _) => println!("  error: {err}"),
        (None, Some(warning)) => println!("  warning: {warning}"),
        (None, None) => println!("  ok"),
    }
}
