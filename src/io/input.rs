use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDateTime;
use tracing::debug;

use crate::error::{Result, SimError};

/// Required column holding the slack series (MW).
pub const SLACK_COLUMN: &str = "Slack";
/// Optional column whose first value seeds the power limit (MW).
pub const POWER_COLUMN: &str = "MW";
/// Optional column whose first value seeds the energy capacity (MWh).
pub const CAPACITY_COLUMN: &str = "MWh";
/// Optional per-row timestamp column.
pub const TIMESTAMP_COLUMN: &str = "Timestamp";

const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Slack series and optional defaults read from a CSV table.
#[derive(Debug, Clone, PartialEq)]
pub struct SlackTable {
    /// Ordered slack values (MW; positive = deficit, negative = surplus).
    pub slack_mw: Vec<f64>,
    /// First-row `MW` value, if the column exists and the cell is non-empty.
    pub power_mw: Option<f64>,
    /// First-row `MWh` value, if the column exists and the cell is non-empty.
    pub capacity_mwh: Option<f64>,
    /// One timestamp per row, if a `Timestamp` column exists.
    pub timestamps: Option<Vec<NaiveDateTime>>,
}

/// Reads a slack table from a CSV file.
///
/// # Errors
///
/// Returns [`SimError::Io`] if the file cannot be opened and
/// [`SimError::InputValidation`] if the table is malformed.
pub fn read_slack_csv(path: &Path) -> Result<SlackTable> {
    let file = File::open(path).map_err(|e| SimError::io(path, e))?;
    let table = parse_slack_csv(file)?;
    debug!(path = %path.display(), rows = table.slack_mw.len(), "read slack table");
    Ok(table)
}

/// Parses a slack table from any CSV reader.
///
/// The `Slack` column is required; `MW`, `MWh`, and `Timestamp` are optional.
/// Column order does not matter and surrounding whitespace is ignored.
///
/// # Errors
///
/// Returns [`SimError::InputValidation`] if the `Slack` column is missing,
/// a value cannot be parsed, or the table has no rows.
pub fn parse_slack_csv(reader: impl Read) -> Result<SlackTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h == name);
    let slack_idx = column(SLACK_COLUMN).ok_or_else(|| {
        SimError::InputValidation(format!("the CSV must have a '{SLACK_COLUMN}' column"))
    })?;
    let power_idx = column(POWER_COLUMN);
    let capacity_idx = column(CAPACITY_COLUMN);
    let timestamp_idx = column(TIMESTAMP_COLUMN);

    let mut slack_mw = Vec::new();
    let mut timestamps = timestamp_idx.map(|_| Vec::new());
    let mut power_mw = None;
    let mut capacity_mwh = None;

    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        // Row numbers in messages count the header as line 1.
        let line = row + 2;

        let value = parse_number(record.get(slack_idx), SLACK_COLUMN, line)?.ok_or_else(|| {
            SimError::InputValidation(format!("line {line}: '{SLACK_COLUMN}' is empty"))
        })?;
        slack_mw.push(value);

        if row == 0 {
            if let Some(i) = power_idx {
                power_mw = parse_number(record.get(i), POWER_COLUMN, line)?;
            }
            if let Some(i) = capacity_idx {
                capacity_mwh = parse_number(record.get(i), CAPACITY_COLUMN, line)?;
            }
        }

        if let (Some(i), Some(stamps)) = (timestamp_idx, timestamps.as_mut()) {
            stamps.push(parse_timestamp(record.get(i).unwrap_or(""), line)?);
        }
    }

    if slack_mw.is_empty() {
        return Err(SimError::InputValidation(
            "the CSV contains no slack rows".to_string(),
        ));
    }

    Ok(SlackTable {
        slack_mw,
        power_mw,
        capacity_mwh,
        timestamps,
    })
}

fn parse_number(cell: Option<&str>, column: &str, line: usize) -> Result<Option<f64>> {
    let Some(cell) = cell.filter(|c| !c.is_empty()) else {
        return Ok(None);
    };
    match cell.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(SimError::InputValidation(format!(
            "line {line}: '{column}' value \"{cell}\" is not a finite number"
        ))),
    }
}

fn parse_timestamp(cell: &str, line: usize) -> Result<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(cell, fmt).ok())
        .ok_or_else(|| {
            SimError::InputValidation(format!(
                "line {line}: '{TIMESTAMP_COLUMN}' value \"{cell}\" is not a recognised date-time"
            ))
        })
}
