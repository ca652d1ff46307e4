//! CSV export for dispatch trajectories.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::error::{Result, SimError};
use crate::sim::types::DispatchResult;

/// Column header for the per-step export.
pub const HEADER: &str = "state_of_charge_mwh,energy_flow_mwh,slack_mw,month";

/// Exports one row per step to a CSV file at the given path.
///
/// # Arguments
///
/// * `slack_mw` - Input slack series
/// * `result` - Dispatch trajectories for `slack_mw`
/// * `month_of` - Month label for each step index
/// * `path` - Output file path
///
/// # Errors
///
/// Returns an error if file creation or writing fails.
pub fn export_csv(
    slack_mw: &[f64],
    result: &DispatchResult,
    month_of: impl Fn(usize) -> u32,
    path: &Path,
) -> Result<()> {
    let file = File::create(path).map_err(|e| SimError::io(path, e))?;
    let buf = io::BufWriter::new(file);
    write_csv(slack_mw, result, month_of, buf)
}

/// Writes the per-step table as CSV to any writer.
///
/// Output is deterministic for identical inputs.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_csv(
    slack_mw: &[f64],
    result: &DispatchResult,
    month_of: impl Fn(usize) -> u32,
    writer: impl Write,
) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(','))?;

    let rows = result
        .state_of_charge_mwh
        .iter()
        .zip(&result.energy_flow_mwh)
        .zip(slack_mw);
    for (i, ((soc, flow), slack)) in rows.enumerate() {
        wtr.write_record(&[
            format!("{soc:.6}"),
            format!("{flow:.6}"),
            format!("{slack:.6}"),
            month_of(i).to_string(),
        ])?;
    }

    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_result(n: usize) -> DispatchResult {
        DispatchResult {
            state_of_charge_mwh: (0..n).map(|i| 7.5 + i as f64).collect(),
            energy_flow_mwh: vec![-1.0; n],
            full_cycle_count: 0,
            cycle_completion_steps: Vec::new(),
            unmet_deficit_mwh: 0.0,
            unabsorbed_surplus_mwh: 0.0,
        }
    }

    #[test]
    fn header_and_row_count() {
        let slack = vec![-1.0; 24];
        let mut buf = Vec::new();
        write_csv(&slack, &make_result(24), |_| 1, &mut buf).unwrap();
        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], HEADER);
        assert_eq!(lines.len(), 25);
        assert_eq!(lines[1], "7.500000,-1.000000,-1.000000,1");
    }

    #[test]
    fn month_labels_follow_assignment() {
        let slack = vec![-1.0; 4];
        let mut buf = Vec::new();
        write_csv(&slack, &make_result(4), |i| (i / 2) as u32 + 1, &mut buf).unwrap();
        let mut rdr = csv::ReaderBuilder::new().from_reader(buf.as_slice());
        let months: Vec<u32> = rdr
            .records()
            .map(|r| r.unwrap()[3].parse().unwrap())
            .collect();
        assert_eq!(months, vec![1, 1, 2, 2]);
    }

    #[test]
    fn deterministic_output() {
        let slack = vec![0.25; 5];
        let mut buf1 = Vec::new();
        let mut buf2 = Vec::new();
        write_csv(&slack, &make_result(5), |_| 1, &mut buf1).unwrap();
        write_csv(&slack, &make_result(5), |_| 1, &mut buf2).unwrap();
        assert_eq!(buf1, buf2);
    }
}
