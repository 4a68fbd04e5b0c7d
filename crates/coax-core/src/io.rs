//! Flat numeric text files: attenuation tables in, sweep results out.

use std::io::{BufRead, Write};

use crate::attenuation::InterpolationTable;
use crate::dispersion::Dispersion;
use crate::error::{CoaxError, Result};
use crate::frequency_response::Sweep;

fn parse_number(text: &str, line: usize) -> Result<f64> {
    text.trim().parse::<f64>().map_err(|e| CoaxError::Parse {
        line,
        message: format!("'{}': {e}", text.trim()),
    })
}

/// One number per non-blank line.
pub fn read_column<R: BufRead>(reader: R) -> Result<Vec<f64>> {
    let mut values = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        values.push(parse_number(&line, index + 1)?);
    }
    Ok(values)
}

/// Table stored as alternating lines: frequency (Hz), attenuation (Np/m),
/// frequency, attenuation, ...
pub fn read_alternating_table<R: BufRead>(reader: R) -> Result<InterpolationTable> {
    let mut frequencies = Vec::new();
    let mut values = Vec::new();
    let mut last_line = 0;
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        last_line = index + 1;
        let number = parse_number(&line, last_line)?;
        if frequencies.len() == values.len() {
            frequencies.push(number);
        } else {
            values.push(number);
        }
    }
    if frequencies.len() != values.len() {
        return Err(CoaxError::Parse {
            line: last_line,
            message: "frequency without a matching attenuation".to_string(),
        });
    }
    InterpolationTable::from_frequencies(&frequencies, values)
}

/// Split a table row into fields. Rows containing `;` use it as the only
/// separator and may write decimals with a comma (`1000000;0,004`); other
/// rows split on commas, tabs and spaces.
fn split_row(row: &str) -> Vec<String> {
    if row.contains(';') {
        row.split(';')
            .map(|f| f.trim().replace(',', "."))
            .filter(|f| !f.is_empty())
            .collect()
    } else {
        row.split(|c: char| c == ',' || c.is_whitespace())
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Two-column table, frequency (Hz) then attenuation (Np/m). Blank lines
/// and `#` comments are skipped, and so is a first line in which no field
/// is a number (a header). Every other row must hold exactly two numbers.
pub fn read_delimited_table<R: BufRead>(reader: R) -> Result<InterpolationTable> {
    let mut frequencies = Vec::new();
    let mut values = Vec::new();
    let mut seen_content = false;
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let fields = split_row(trimmed);
        let first = !seen_content;
        seen_content = true;
        if first && fields.iter().all(|f| f.parse::<f64>().is_err()) {
            continue;
        }
        if fields.len() != 2 {
            let hint = if fields.len() == 3 {
                " (input/output amplitude columns belong in an `amplitudes` attenuation)"
            } else {
                ""
            };
            return Err(CoaxError::Parse {
                line: index + 1,
                message: format!(
                    "expected two columns (frequency, attenuation), found {}{hint}",
                    fields.len()
                ),
            });
        }
        frequencies.push(parse_number(&fields[0], index + 1)?);
        values.push(parse_number(&fields[1], index + 1)?);
    }
    InterpolationTable::from_frequencies(&frequencies, values)
}

const CSV_HEADER: &str = "frequency_hz,pulsation,t_re,t_im,t_abs,r_abs,phase,phase_shift,index,wave_number,group_velocity";

/// Write one CSV row per sweep point. Dispersion stages that are missing
/// (or the whole `dispersion`) leave their columns empty.
pub fn write_sweep_csv<W: Write>(
    mut writer: W,
    sweep: &Sweep,
    dispersion: Option<&Dispersion>,
) -> Result<()> {
    writeln!(writer, "{CSV_HEADER}")?;
    let stage = |pick: fn(&Dispersion) -> Option<&[f64]>| dispersion.and_then(pick);
    let columns = [
        stage(Dispersion::phases),
        stage(Dispersion::phase_shifts),
        stage(Dispersion::refractive_indexes),
        stage(Dispersion::wave_numbers),
        stage(Dispersion::group_velocities),
    ];

    for (i, ((&w, t), r)) in sweep
        .pulsations
        .iter()
        .zip(&sweep.transmission)
        .zip(&sweep.reflection)
        .enumerate()
    {
        write!(
            writer,
            "{},{},{},{},{},{}",
            crate::constants::frequency(w),
            w,
            t.re,
            t.im,
            t.norm(),
            r.norm()
        )?;
        for column in &columns {
            match column.and_then(|c| c.get(i)) {
                Some(v) => write!(writer, ",{v}")?,
                None => write!(writer, ",")?,
            }
        }
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}
