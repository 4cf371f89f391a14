//! Readers that turn JSON and CSV files into measurement records.
//!
//! Values are coerced leniently: numbers and numeric strings become readings,
//! everything else (null, empty cells, free text) becomes an explicit missing
//! marker so the engine can skip it per parameter.

use crate::engine::{MeasurementSet, Record};
use crate::utils::fs::{self as fs_utils, normalize_key};
use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::fs;
use std::io::Read;
use std::path::Path;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Json,
    Csv,
}

impl InputFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_string_lossy().to_ascii_lowercase();
        match extension.as_str() {
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

pub fn coerce_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64().filter(|number| number.is_finite()),
        Value::String(text) => coerce_field(text),
        _ => None,
    }
}

fn coerce_field(field: &str) -> Option<f64> {
    field
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
}

pub fn measurement_set_from_json(value: &Value) -> Result<MeasurementSet> {
    let Value::Object(object) = value else {
        bail!("expected a JSON object of parameter values");
    };

    Ok(object
        .iter()
        .map(|(key, value)| (normalize_key(key), coerce_value(value)))
        .collect())
}

/// Reads a single measurement set from a JSON file, or stdin for `-`.
pub fn read_measurement_set(path: &Path) -> Result<MeasurementSet> {
    let content = if path.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("failed reading measurements from stdin")?;
        buffer
    } else {
        fs::read_to_string(path)
            .with_context(|| format!("failed reading {}", path.display()))?
    };

    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("failed parsing JSON from {}", path.display()))?;
    if value.is_array() {
        bail!(
            "{} holds a list of records; use `eai batch` for bulk input",
            path.display()
        );
    }
    measurement_set_from_json(&value)
}

pub fn records_from_json(content: &str, source: &str) -> Vec<Record> {
    let value: Value = match serde_json::from_str(content) {
        Ok(value) => value,
        Err(err) => {
            return vec![Record::malformed(
                Some(source.to_string()),
                format!("invalid JSON: {err}"),
            )];
        }
    };

    match value {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                let item_source = Some(format!("{source}[{idx}]"));
                match measurement_set_from_json(item) {
                    Ok(set) => Record::new(item_source, set),
                    Err(err) => Record::malformed(item_source, err.to_string()),
                }
            })
            .collect(),
        other => vec![match measurement_set_from_json(&other) {
            Ok(set) => Record::new(Some(source.to_string()), set),
            Err(err) => Record::malformed(Some(source.to_string()), err.to_string()),
        }],
    }
}

pub fn records_from_csv(content: &str, source: &str) -> Vec<Record> {
    let Some(table) = fs_utils::parse_csv(content) else {
        return Vec::new();
    };

    table
        .rows
        .into_iter()
        .map(|row| {
            let row_source = Some(format!("{source}:{}", row.line));
            if row.fields.len() != table.header.len() {
                return Record::malformed(
                    row_source,
                    format!(
                        "expected {} fields, found {}",
                        table.header.len(),
                        row.fields.len()
                    ),
                );
            }

            let set = table
                .header
                .iter()
                .zip(row.fields)
                .map(|(key, field)| (key.clone(), coerce_field(&field)))
                .collect();
            Record::new(row_source, set)
        })
        .collect()
}

/// Reads every record from a JSON/CSV file or, for a directory, from every
/// JSON/CSV file below it. Unreadable files become malformed records.
pub fn read_records(path: &Path) -> Result<Vec<Record>> {
    if !path.exists() {
        bail!("input does not exist: {}", path.display());
    }

    if path.is_file() {
        let format = InputFormat::from_path(path).unwrap_or(InputFormat::Json);
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed reading {}", path.display()))?;
        let source = path.to_string_lossy().replace('\\', "/");
        return Ok(parse_records(&content, &source, format));
    }

    let mut records = Vec::new();
    let mut files: Vec<_> = WalkDir::new(path)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            InputFormat::from_path(entry.path()).map(|format| (entry.into_path(), format))
        })
        .collect();
    files.sort_by(|a, b| a.0.cmp(&b.0));

    for (file, format) in files {
        let source = fs_utils::relative_path(path, &file);
        match fs::read_to_string(&file) {
            Ok(content) => records.extend(parse_records(&content, &source, format)),
            Err(err) => {
                log::warn!("failed reading {}: {err}", file.display());
                records.push(Record::malformed(Some(source), format!("unreadable file: {err}")));
            }
        }
    }

    log::debug!("read {} record(s) from {}", records.len(), path.display());
    Ok(records)
}

fn parse_records(content: &str, source: &str, format: InputFormat) -> Vec<Record> {
    match format {
        InputFormat::Json => records_from_json(content, source),
        InputFormat::Csv => records_from_csv(content, source),
    }
}
