//! End-to-end analysis of one parsed sheet.
//!
//! The sheet is parsed once by the caller. The three categories are resolved
//! and cleaned on scoped threads sharing that parse; distribution, ranking
//! and category counts then fan out over the cleaned tables, and the report
//! is assembled once every stage has joined.

use std::thread::{self, ScopedJoinHandle};

use log::info;

use crate::{
    aggregate::category_averages,
    cleaner::{CleanedTable, clean_category},
    config::AnalysisConfig,
    counts::{count_categories, count_cpi_bands},
    dedup::deduplicate,
    distribution::{DistributionMatrix, bin_category},
    error::AnalysisError,
    header::{Category, resolve_category},
    ranking::{Rankings, rank_students},
    report::{
        CategoryDiagnostics, Outcome, Report, ReportMetadata, Stage, StageResults, assemble,
    },
    sheet::RawSheet,
    students::{StudentFields, StudentRoster},
};

/// The report plus the intermediate tables callers may want to persist.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub report: Report,
    pub roster: StudentRoster,
    pub tables: Vec<CleanedTable>,
}

impl Analysis {
    pub fn table(&self, category: Category) -> Option<&CleanedTable> {
        self.tables.iter().find(|table| table.category == category)
    }
}

struct PreparedCategory {
    table: CleanedTable,
    duplicates_dropped: usize,
}

/// Fails only when the sheet itself is unusable; every other problem is
/// reported as an issue inside the returned report.
pub fn run(
    sheet: &RawSheet,
    config: &AnalysisConfig,
    metadata: ReportMetadata,
) -> Result<Analysis, AnalysisError> {
    config.validate()?;
    sheet.check_layout(&config.layout)?;
    let patterns = config.columns.compile()?;
    let fields = StudentFields::locate(sheet, &config.layout, &patterns)?;
    let roster = StudentRoster::extract(sheet, &config.layout, fields, &config.annotation_chars);
    info!(
        "Read {} student record(s) across {} column(s)",
        roster.len(),
        sheet.width()
    );

    let roster_ref = &roster;
    let prepared: Vec<Outcome<PreparedCategory>> = thread::scope(|scope| {
        let handles = Category::ALL
            .iter()
            .map(|&category| {
                let handle =
                    scope.spawn(move || prepare_category(sheet, config, roster_ref, category));
                (category, handle)
            })
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|(category, handle)| {
                join_stage(handle, "category preparation").unwrap_or_else(|err| {
                    Outcome::new(Stage::HeaderResolution, Some(category), Err(err))
                })
            })
            .collect()
    });

    let mut diagnostics = Vec::new();
    let mut tables = Vec::new();
    let mut category_failures = Vec::new();
    for outcome in prepared {
        match outcome.result {
            Ok(prepared) => {
                diagnostics.push(Outcome::new(
                    Stage::Cleaning,
                    outcome.category,
                    Ok(diagnose(&prepared)),
                ));
                tables.push(prepared.table);
            }
            Err(err) => {
                if let Some(category) = outcome.category {
                    category_failures.push((category, err.clone()));
                }
                diagnostics.push(Outcome::new(outcome.stage, outcome.category, Err(err)));
            }
        }
    }

    let averages = tables
        .iter()
        .map(|table| {
            Outcome::new(
                Stage::Aggregation,
                Some(table.category),
                category_averages(table),
            )
        })
        .collect();

    let total = tables.iter().find(|table| table.category == Category::Total);
    let total_failure = category_failures
        .iter()
        .find(|(category, _)| *category == Category::Total)
        .map(|(_, err)| err.clone());

    let (distributions, rankings, counts, cpi_bands) = thread::scope(|scope| {
        let distributions = scope.spawn(|| bin_categories(&tables, config));
        let rankings = scope.spawn(|| -> Result<Rankings, AnalysisError> {
            match total {
                Some(total) => rank_students(
                    roster_ref,
                    total,
                    config.top_n,
                    config.high_performer_cpi,
                ),
                None => Err(total_failure.unwrap_or(AnalysisError::EmptyCategoryDataset {
                    category: Category::Total,
                })),
            }
        });
        let counts = scope.spawn(|| count_categories(roster_ref));
        let cpi_bands = scope.spawn(|| count_cpi_bands(roster_ref));
        (
            join_stage(distributions, "distribution").unwrap_or_else(|err| {
                vec![Outcome::new(Stage::Distribution, None, Err(err))]
            }),
            join_stage(rankings, "ranking").and_then(|result| result),
            join_stage(counts, "category counts").and_then(|result| result),
            join_stage(cpi_bands, "cpi bands").and_then(|result| result),
        )
    });

    let records = roster.len();
    let report = assemble(
        metadata,
        StageResults {
            records,
            diagnostics,
            averages,
            distributions,
            rankings: Outcome::new(Stage::Ranking, None, rankings),
            counts: Outcome::new(Stage::CategoryCounts, None, counts),
            cpi_bands: Outcome::new(Stage::CategoryCounts, None, cpi_bands),
        },
    );
    info!(
        "Assembled report: {} course(s), {} issue(s)",
        report.courses.len(),
        report.issues.len()
    );
    Ok(Analysis {
        report,
        roster,
        tables,
    })
}

fn prepare_category(
    sheet: &RawSheet,
    config: &AnalysisConfig,
    roster: &StudentRoster,
    category: Category,
) -> Outcome<PreparedCategory> {
    let marker = config.markers.token(category);
    let schema = match resolve_category(sheet, &config.layout, category, marker) {
        Ok(schema) => schema,
        Err(err) => return Outcome::new(Stage::HeaderResolution, Some(category), Err(err)),
    };
    let deduplicated = deduplicate(&schema);
    let result = clean_category(
        sheet,
        &deduplicated.schema,
        roster,
        &config.annotation_chars,
        config.exclusion,
    )
    .map(|table| {
        info!(
            "{category}: {} course(s), {} of {} record(s) admissible",
            table.courses.len(),
            table.admissible_count(),
            table.rows.len()
        );
        PreparedCategory {
            table,
            duplicates_dropped: deduplicated.dropped.len(),
        }
    });
    Outcome::new(Stage::Cleaning, Some(category), result)
}

fn diagnose(prepared: &PreparedCategory) -> CategoryDiagnostics {
    let table = &prepared.table;
    CategoryDiagnostics {
        category: table.category,
        courses: table.courses.len(),
        duplicate_columns_dropped: prepared.duplicates_dropped,
        records: table.rows.len(),
        admissible_records: table.admissible_count(),
        coercion_failures: table.failures.clone(),
    }
}

fn bin_categories(
    tables: &[CleanedTable],
    config: &AnalysisConfig,
) -> Vec<Outcome<DistributionMatrix>> {
    tables
        .iter()
        .filter_map(|table| {
            config.bands.for_category(table.category).map(|bands| {
                Outcome::new(
                    Stage::Distribution,
                    Some(table.category),
                    bin_category(table, bands),
                )
            })
        })
        .collect()
}

fn join_stage<T>(handle: ScopedJoinHandle<'_, T>, stage: &str) -> Result<T, AnalysisError> {
    handle
        .join()
        .map_err(|_| AnalysisError::StagePanicked(stage.to_string()))
}
