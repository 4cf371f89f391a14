use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static KEY_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s\-]+").expect("valid key separator regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRow {
    pub fields: Vec<String>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvTable {
    pub header: Vec<String>,
    pub rows: Vec<CsvRow>,
}

pub fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Canonical parameter key: trimmed, lower-cased, inner whitespace and
/// hyphens collapsed to `_`.
pub fn normalize_key(raw: &str) -> String {
    KEY_SEPARATOR_RE
        .replace_all(raw.trim(), "_")
        .to_ascii_lowercase()
}

/// Minimal comma-separated reader: first non-blank record is the header.
/// Double-quoted fields may contain commas, line breaks and `""` escapes;
/// each row keeps the line number it starts on.
pub fn parse_csv(content: &str) -> Option<CsvTable> {
    let mut records = split_csv_records(content.trim_start_matches('\u{feff}'))
        .into_iter()
        .filter(|row| !is_blank_record(&row.fields));

    let header = records
        .next()?
        .fields
        .iter()
        .map(|field| normalize_key(field))
        .collect();

    Some(CsvTable {
        header,
        rows: records.collect(),
    })
}

fn is_blank_record(fields: &[String]) -> bool {
    fields.len() == 1 && fields[0].is_empty()
}

fn split_csv_records(content: &str) -> Vec<CsvRow> {
    let mut rows = Vec::new();
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut row_start = 1;
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(take_field(&mut current)),
            '\r' if !in_quotes && chars.peek() == Some(&'\n') => {}
            '\n' if !in_quotes => {
                fields.push(take_field(&mut current));
                rows.push(CsvRow {
                    fields: std::mem::take(&mut fields),
                    line: row_start,
                });
                line += 1;
                row_start = line;
            }
            '\n' => {
                current.push(ch);
                line += 1;
            }
            _ => current.push(ch),
        }
    }

    if !current.is_empty() || !fields.is_empty() {
        fields.push(take_field(&mut current));
        rows.push(CsvRow {
            fields,
            line: row_start,
        });
    }

    rows
}

fn take_field(current: &mut String) -> String {
    std::mem::take(current).trim().to_string()
}
