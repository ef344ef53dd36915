//! Elastic ASCII tables for terminal output. Numeric cells are right-aligned
//! so averages line up on the decimal point.

use std::fmt::Write as _;

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths = headers.iter().map(|h| h.chars().count()).collect::<Vec<_>>();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(widths.len()) {
            widths[idx] = widths[idx].max(cell.chars().count());
        }
    }
    let numeric = (0..widths.len())
        .map(|idx| {
            let mut cells = rows.iter().filter_map(|row| row.get(idx)).peekable();
            cells.peek().is_some() && cells.all(|cell| cell.is_empty() || is_numeric(cell))
        })
        .collect::<Vec<_>>();

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths, &[]));
    let rule = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&rule, &widths, &[]));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths, &numeric));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

/// Two decimal places, or blank for a missing value.
pub fn format_mark(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_default()
}

fn is_numeric(cell: &str) -> bool {
    cell.parse::<f64>().is_ok()
}

fn format_row(values: &[String], widths: &[usize], right_align: &[bool]) -> String {
    let cells = values
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(idx, (value, &width))| {
            let value = value.replace(['\n', '\r', '\t'], " ");
            if right_align.get(idx).copied().unwrap_or(false) {
                format!("{value:>width$}")
            } else {
                format!("{value:<width$}")
            }
        })
        .collect::<Vec<_>>();
    cells.join("  ").trim_end().to_string()
}
