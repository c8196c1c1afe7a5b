use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, AsArray, Date32Array, Date64Array, Float32Array, Float64Array, Int32Array, Int64Array,
    StringArray, TimestampMicrosecondArray, TimestampMillisecondArray, TimestampNanosecondArray,
    TimestampSecondArray,
};
use arrow::datatypes::{DataType, TimeUnit};
use log::{debug, info};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Dimension, KpiDataset, KpiRecord, Timestamp};

const DATE_COLUMN: &str = "date";

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a KPI dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – one row per record, typed columns (recommended)
/// * `.json`    – `[{ "vendor": "...", "date": "2024-01-01", "availability": 99.1, ... }, ...]`
/// * `.csv`     – header row, same column names as JSON
///
/// Columns named after a [`Dimension`] or `date` are read as such; every other
/// numeric column becomes a KPI metric. Missing dimension columns load as
/// empty strings and a missing `date` as an invalid timestamp.
pub fn load_file(path: &Path) -> Result<KpiDataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let records = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    info!("loaded {} records from {}", records.len(), path.display());
    Ok(KpiDataset::from_records(records))
}

fn is_text_column(column: &str) -> bool {
    column == DATE_COLUMN || Dimension::from_key(column).is_some()
}

/// Route one named text cell into the record. Returns `false` if the column is not a
/// dimension or the date.
fn assign_text(record: &mut KpiRecord, column: &str, value: &str) -> bool {
    if column == DATE_COLUMN {
        record.date = Timestamp::parse(value);
        return true;
    }
    match Dimension::from_key(column) {
        Some(dim) => {
            *record.dimension_mut(dim) = value.to_string();
            true
        }
        None => false,
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON:
///
/// ```json
/// [
///   {
///     "vendor": "Ericsson",
///     "technology": "5G",
///     "region": "North",
///     "cluster": "N-01",
///     "country": "SE",
///     "date": "2024-01-01T00:15:00",
///     "availability": 99.2,
///     "drop_rate": 0.4
///   },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<Vec<KpiRecord>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let rows = root.as_array().context("Expected top-level JSON array")?;

    let mut records = Vec::with_capacity(rows.len());

    for (i, row) in rows.iter().enumerate() {
        let obj = row
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let mut record = KpiRecord::default();
        for (key, val) in obj {
            match val {
                JsonValue::String(s) => {
                    if !assign_text(&mut record, key, s) {
                        debug!("row {i}: ignoring text field '{key}'");
                    }
                }
                JsonValue::Number(n) if !is_text_column(key) => {
                    if let Some(v) = n.as_f64() {
                        record.metrics.insert(key.clone(), v);
                    }
                }
                JsonValue::Null => {}
                other => {
                    if is_text_column(key) {
                        bail!("Row {i}: '{key}' must be a string, got {other}");
                    }
                }
            }
        }

        records.push(record);
    }

    Ok(records)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names.
/// Dimension columns and `date` are text; every other non-empty cell must be a number.
fn load_csv(path: &Path) -> Result<Vec<KpiRecord>> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut records = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let row = result.with_context(|| format!("CSV row {row_no}"))?;

        let mut record = KpiRecord::default();
        for (col_name, value) in headers.iter().zip(row.iter()) {
            if assign_text(&mut record, col_name, value) {
                continue;
            }
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let metric = value
                .parse::<f64>()
                .with_context(|| format!("Row {row_no}, {col_name}: '{value}' is not a number"))?;
            record.metrics.insert(col_name.clone(), metric);
        }

        records.push(record);
    }

    Ok(records)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet KPI export.
///
/// Expected schema:
/// - dimension columns: Utf8 or LargeUtf8
/// - `date`: Utf8, Date32, Date64 or Timestamp (any unit)
/// - any Int32/Int64/Float32/Float64 column is a metric; other types are skipped
fn load_parquet(path: &Path) -> Result<Vec<KpiRecord>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let columns: Vec<(String, &Arc<dyn Array>)> = schema
            .fields()
            .iter()
            .zip(batch.columns())
            .map(|(f, col)| (f.name().clone(), col))
            .collect();

        for row in 0..batch.num_rows() {
            let mut record = KpiRecord::default();

            for (name, col) in &columns {
                if col.is_null(row) {
                    continue;
                }
                if name == DATE_COLUMN {
                    record.date = extract_timestamp(col, row)
                        .with_context(|| format!("Row {row}: failed to read '{name}'"))?;
                } else if let Some(dim) = Dimension::from_key(name) {
                    *record.dimension_mut(dim) = extract_string(col, row)
                        .with_context(|| format!("Row {row}: failed to read '{name}'"))?;
                } else if let Some(value) = extract_f64(col, row) {
                    record.metrics.insert(name.clone(), value);
                }
            }

            records.push(record);
        }
    }

    Ok(records)
}

// -- Parquet / Arrow helpers --

fn extract_string(col: &Arc<dyn Array>, row: usize) -> Result<String> {
    match col.data_type() {
        DataType::Utf8 => {
            let arr = col
                .as_any()
                .downcast_ref::<StringArray>()
                .context("expected StringArray")?;
            Ok(arr.value(row).to_string())
        }
        DataType::LargeUtf8 => Ok(col.as_string::<i64>().value(row).to_string()),
        other => bail!("Expected a string column, got {other:?}"),
    }
}

fn extract_timestamp(col: &Arc<dyn Array>, row: usize) -> Result<Timestamp> {
    let any = col.as_any();
    let datetime = match col.data_type() {
        DataType::Utf8 | DataType::LargeUtf8 => {
            return extract_string(col, row).map(|s| Timestamp::parse(&s));
        }
        DataType::Date32 => any
            .downcast_ref::<Date32Array>()
            .context("expected Date32Array")?
            .value_as_datetime(row),
        DataType::Date64 => any
            .downcast_ref::<Date64Array>()
            .context("expected Date64Array")?
            .value_as_datetime(row),
        DataType::Timestamp(TimeUnit::Second, _) => any
            .downcast_ref::<TimestampSecondArray>()
            .context("expected TimestampSecondArray")?
            .value_as_datetime(row),
        DataType::Timestamp(TimeUnit::Millisecond, _) => any
            .downcast_ref::<TimestampMillisecondArray>()
            .context("expected TimestampMillisecondArray")?
            .value_as_datetime(row),
        DataType::Timestamp(TimeUnit::Microsecond, _) => any
            .downcast_ref::<TimestampMicrosecondArray>()
            .context("expected TimestampMicrosecondArray")?
            .value_as_datetime(row),
        DataType::Timestamp(TimeUnit::Nanosecond, _) => any
            .downcast_ref::<TimestampNanosecondArray>()
            .context("expected TimestampNanosecondArray")?
            .value_as_datetime(row),
        other => bail!("Expected a date, timestamp or string column, got {other:?}"),
    };
    Ok(datetime.map(Timestamp::from).unwrap_or(Timestamp::INVALID))
}

/// Numeric cell as `f64`; `None` for non-numeric columns.
fn extract_f64(col: &Arc<dyn Array>, row: usize) -> Option<f64> {
    let any = col.as_any();
    match col.data_type() {
        DataType::Int32 => any.downcast_ref::<Int32Array>().map(|a| a.value(row) as f64),
        DataType::Int64 => any.downcast_ref::<Int64Array>().map(|a| a.value(row) as f64),
        DataType::Float32 => any.downcast_ref::<Float32Array>().map(|a| a.value(row) as f64),
        DataType::Float64 => any.downcast_ref::<Float64Array>().map(|a| a.value(row)),
        _ => None,
    }
}
