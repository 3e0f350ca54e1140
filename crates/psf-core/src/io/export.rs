use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::error::Result;

pub const CSV_SEPARATOR: char = ';';
pub const CSV_HEADER: &str = "x;averaged;fit";

/// Write the averaged line and fitted curve as semicolon separated text.
///
/// Rows are keyed by x: the union of both curves' x values in ascending
/// order, one row per distinct value. A curve without a point at that x
/// leaves its column empty.
pub fn write_curves_csv(
    w: &mut impl Write,
    line_x: &[f64],
    line_y: &[f64],
    fit_x: &[f64],
    fit_y: &[f64],
) -> Result<usize> {
    let mut points: Vec<(f64, usize, f64)> = line_x
        .iter()
        .zip(line_y)
        .map(|(&x, &y)| (x, 0, y))
        .chain(fit_x.iter().zip(fit_y).map(|(&x, &y)| (x, 1, y)))
        .collect();
    points.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    writeln!(w, "{CSV_HEADER}")?;
    let mut rows = 0;
    let mut i = 0;
    while i < points.len() {
        let key = points[i].0;
        let mut values: [Option<f64>; 2] = [None, None];
        while i < points.len() && points[i].0 == key {
            values[points[i].1] = Some(points[i].2);
            i += 1;
        }
        let cell = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
        writeln!(
            w,
            "{key}{CSV_SEPARATOR}{}{CSV_SEPARATOR}{}",
            cell(values[0]),
            cell(values[1])
        )?;
        rows += 1;
    }
    Ok(rows)
}

/// [`write_curves_csv`] into a new file at `path`.
pub fn save_curves_csv(
    path: &Path,
    line_x: &[f64],
    line_y: &[f64],
    fit_x: &[f64],
    fit_y: &[f64],
) -> Result<usize> {
    let mut writer = BufWriter::new(File::create(path)?);
    let rows = write_curves_csv(&mut writer, line_x, line_y, fit_x, fit_y)?;
    writer.flush()?;
    info!(path = %path.display(), rows, "Curves saved");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_merge_on_shared_x() {
        let mut out = Vec::new();
        let rows = write_curves_csv(&mut out, &[0.0, 1.0], &[3.0, 4.0], &[0.0, 0.5], &[3.5, 3.75]).unwrap();
        assert_eq!(rows, 3);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec![CSV_HEADER, "0;3;3.5", "0.5;;3.75", "1;4;"]);
    }
}
