use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use deck_audit_core::calculator::SourceRecord;
use deck_audit_core::config::AuditConfig;
use deck_audit_core::types::Period;
use deck_audit_core::{AuditError, AuditResult};

/// Read a JSON file and deserialise into a typed struct.
pub fn read_json<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    let value: T = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?;
    Ok(value)
}

/// Read an audit configuration; `.yaml`/`.yml` as YAML, anything else as JSON.
pub fn read_config(path: &str) -> Result<AuditConfig, Box<dyn std::error::Error>> {
    if has_extension(path, &["yaml", "yml"]) {
        let canonical = resolve_path(path)?;
        let contents = fs::read_to_string(&canonical)
            .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
        let config: AuditConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?;
        Ok(config)
    } else {
        read_json(path)
    }
}

/// Load source records from a `.csv` file or a JSON array.
pub fn read_records(path: &str) -> AuditResult<Vec<SourceRecord>> {
    if has_extension(path, &["csv"]) {
        read_records_csv(path)
    } else {
        read_json(path).map_err(|e| load_error(path, e))
    }
}

/// Load an extracted deck grid from JSON.
pub fn read_grid<T: DeserializeOwned>(path: &str) -> AuditResult<T> {
    read_json(path).map_err(|e| load_error(path, e))
}

/// One CSV line as written; numbers stay text until parsed as decimals.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    entity: String,
    #[serde(default)]
    channel: String,
    period: String,
    spend: Option<String>,
    impressions: Option<String>,
    grps: Option<String>,
    reach: Option<String>,
}

fn read_records_csv(path: &str) -> AuditResult<Vec<SourceRecord>> {
    let canonical = resolve_path(path).map_err(|e| load_error(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(&canonical)
        .map_err(|e| load_error(path, e))?;

    let mut records = Vec::new();
    for (i, row) in reader.deserialize::<CsvRecord>().enumerate() {
        // header is line 1
        let line = i + 2;
        let row = row.map_err(|e| load_error(path, format!("line {line}: {e}")))?;
        let period = Period::from_str(&row.period)
            .map_err(|e| load_error(path, format!("line {line}: {e}")))?;
        records.push(SourceRecord {
            entity: row.entity,
            channel: row.channel,
            period,
            spend: decimal_field(path, line, "spend", row.spend)?,
            impressions: decimal_field(path, line, "impressions", row.impressions)?,
            grps: decimal_field(path, line, "grps", row.grps)?,
            reach: decimal_field(path, line, "reach", row.reach)?,
        });
    }
    Ok(records)
}

fn decimal_field(
    path: &str,
    line: usize,
    column: &str,
    text: Option<String>,
) -> AuditResult<Option<Decimal>> {
    match text.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(t) => Decimal::from_str(t)
            .map(Some)
            .map_err(|e| load_error(path, format!("line {line}, {column} '{t}': {e}"))),
    }
}

fn load_error(path: &str, reason: impl ToString) -> AuditError {
    AuditError::Load {
        source_name: path.to_string(),
        reason: reason.to_string(),
    }
}

fn has_extension(path: &str, extensions: &[&str]) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

/// Resolve and validate the path, preventing directory traversal.
fn resolve_path(path: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    let canonical = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !canonical.exists() {
        return Err(format!("File not found: {}", canonical.display()).into());
    }

    if !canonical.is_file() {
        return Err(format!("Not a file: {}", canonical.display()).into());
    }

    Ok(canonical)
}
