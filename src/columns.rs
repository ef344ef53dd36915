//! Column listing for one mark category.
//!
//! Resolves the header and marker rows the same way `analyze` does and
//! renders each column's role as an ASCII table, so a sheet whose layout
//! does not match the configuration can be diagnosed before a full run.

use anyhow::{Context, Result};
use log::info;

use crate::{
    cli::ColumnsArgs,
    config::AnalysisConfig,
    dedup::deduplicate,
    header::{Category, ColumnRole, resolve_category},
    io_utils,
    sheet::RawSheet,
    table,
};

pub fn execute(args: &ColumnsArgs) -> Result<()> {
    let config = match &args.sheet.config {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };
    config.validate()?;
    let delimiter = io_utils::resolve_input_delimiter(&args.sheet.input, args.sheet.delimiter);
    let encoding = io_utils::resolve_encoding(args.sheet.input_encoding.as_deref())?;
    let sheet = io_utils::read_sheet(&args.sheet.input, delimiter, encoding)
        .with_context(|| format!("Reading result sheet {:?}", args.sheet.input))?;
    sheet.check_layout(&config.layout)?;

    let category = Category::from(args.category);
    let marker = config.markers.token(category);
    let schema = resolve_category(&sheet, &config.layout, category, marker)?;
    let deduplicated = deduplicate(&schema);

    let rows = describe_columns(
        &sheet,
        &config,
        deduplicated.schema.roles(),
        &deduplicated.dropped,
    );
    let headers = ["#", "header", "marker", "role"]
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
    info!(
        "{category}: {} course column(s), {} duplicate(s) dropped",
        deduplicated.schema.course_columns().len(),
        deduplicated.dropped.len()
    );
    Ok(())
}

fn describe_columns(
    sheet: &RawSheet,
    config: &AnalysisConfig,
    roles: &[ColumnRole],
    dropped: &[usize],
) -> Vec<Vec<String>> {
    roles
        .iter()
        .enumerate()
        .map(|(index, role)| {
            let role = if dropped.contains(&index) {
                "duplicate (dropped)".to_string()
            } else {
                role.to_string()
            };
            vec![
                (index + 1).to_string(),
                sheet.cell(config.layout.header_row, index).trim().to_string(),
                sheet.cell(config.layout.marker_row, index).trim().to_string(),
                role,
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(rows: &[&[&str]]) -> RawSheet {
        RawSheet::from_rows(
            rows.iter()
                .map(|row| row.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn duplicates_are_flagged_in_listing() {
        let sheet = sheet(&[
            &["Name", "CS101", "CS101"],
            &["", "E", "E"],
            &["Asha", "80", "81"],
        ]);
        let config = AnalysisConfig::default();
        let schema = resolve_category(&sheet, &config.layout, Category::External, "E").unwrap();
        let deduplicated = deduplicate(&schema);
        let rows = describe_columns(
            &sheet,
            &config,
            deduplicated.schema.roles(),
            &deduplicated.dropped,
        );
        assert_eq!(rows[0], vec!["1", "Name", "", "meta (Name)"]);
        assert_eq!(rows[1][3], "E mark (CS101)");
        assert_eq!(rows[2][3], "duplicate (dropped)");
    }
}
