//! The `analyze` command: request validation, the pipeline run, and the
//! report artifacts.
//!
//! Output mirrors the web service the tool was built for: stdout carries a
//! JSON response with the course table and the generated file list, or a
//! structured error naming the stage that failed.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;
use serde::Serialize;

use crate::{
    cli::AnalyzeArgs,
    config::AnalysisConfig,
    counts::CategoryCounts,
    error::AnalysisError,
    header::Category,
    io_utils,
    pipeline::{self, Analysis},
    report::{CourseRow, Report, ReportMetadata},
    table::{self, format_mark},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryStage {
    Request,
    Config,
    Input,
    Pipeline,
    Artifacts,
}

#[derive(Debug)]
pub struct Failure {
    pub stage: BoundaryStage,
    pub error: anyhow::Error,
}

trait AtStage<T> {
    fn at(self, stage: BoundaryStage) -> Result<T, Failure>;
}

impl<T, E> AtStage<T> for Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn at(self, stage: BoundaryStage) -> Result<T, Failure> {
        self.map_err(|err| Failure {
            stage,
            error: err.into(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub result: Vec<CourseRow>,
    pub generated_files: Vec<PathBuf>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub stage: BoundaryStage,
    pub details: String,
}

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub input: PathBuf,
    pub delimiter: Option<u8>,
    pub input_encoding: Option<String>,
    pub config: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub metadata: ReportMetadata,
}

impl AnalysisRequest {
    pub fn from_args(args: &AnalyzeArgs) -> Self {
        Self {
            input: args.sheet.input.clone(),
            delimiter: args.sheet.delimiter,
            input_encoding: args.sheet.input_encoding.clone(),
            config: args.sheet.config.clone(),
            output_dir: args.output_dir.clone(),
            metadata: ReportMetadata {
                institution: args.institution.clone(),
                program: args.program.clone(),
                batch: args.batch.clone(),
                semester: args.semester.clone(),
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !io_utils::is_dash(&self.input) && !self.input.is_file() {
            return Err(AnalysisError::InvalidRequest(format!(
                "File not found at path: {}",
                self.input.display()
            ))
            .into());
        }
        self.metadata.validate()?;
        Ok(())
    }
}

pub fn execute(args: &AnalyzeArgs) -> Result<()> {
    let request = AnalysisRequest::from_args(args);
    match handle(&request) {
        Ok((analysis, response)) => {
            if args.table {
                print_course_table(&analysis.report);
            } else {
                println!("{}", serde_json::to_string_pretty(&response)?);
            }
            info!(
                "Wrote {} file(s) to {:?}",
                response.generated_files.len(),
                request.output_dir
            );
            Ok(())
        }
        Err(failure) => {
            let response = ErrorResponse {
                error: "Analysis failed",
                stage: failure.stage,
                details: format!("{:#}", failure.error),
            };
            println!("{}", serde_json::to_string_pretty(&response)?);
            Err(failure.error.context(format!("{:?} stage failed", failure.stage)))
        }
    }
}

/// Runs one request end to end. Nothing is written until the pipeline has
/// produced a complete report.
pub fn handle(request: &AnalysisRequest) -> Result<(Analysis, AnalysisResponse), Failure> {
    request.validate().at(BoundaryStage::Request)?;

    let config = match &request.config {
        Some(path) => AnalysisConfig::load(path).at(BoundaryStage::Config)?,
        None => AnalysisConfig::default(),
    };

    let delimiter = io_utils::resolve_input_delimiter(&request.input, request.delimiter);
    let encoding =
        io_utils::resolve_encoding(request.input_encoding.as_deref()).at(BoundaryStage::Input)?;
    let sheet = io_utils::read_sheet(&request.input, delimiter, encoding).at(BoundaryStage::Input)?;

    let analysis =
        pipeline::run(&sheet, &config, request.metadata.clone()).at(BoundaryStage::Pipeline)?;

    let generated_files =
        write_artifacts(&analysis, &request.output_dir).at(BoundaryStage::Artifacts)?;
    let message = if analysis.report.is_complete() {
        "Analysis completed successfully".to_string()
    } else {
        format!(
            "Analysis completed with {} skipped stage(s)",
            analysis.report.issues.len()
        )
    };
    let response = AnalysisResponse {
        result: analysis.report.courses.clone(),
        generated_files,
        message,
    };
    Ok((analysis, response))
}

pub fn write_artifacts(analysis: &Analysis, dir: &Path) -> Result<Vec<PathBuf>> {
    io_utils::ensure_dir(dir)?;
    let report = &analysis.report;
    let mut files = Vec::new();

    files.push(io_utils::write_json_artifact(dir, "report.json", report)?);
    files.push(write_course_averages(dir, &report.courses)?);

    for matrix in &report.distributions {
        let mut headers = vec!["range".to_string()];
        headers.extend(matrix.courses.iter().cloned());
        let rows = matrix
            .labels
            .iter()
            .zip(&matrix.counts)
            .map(|(label, counts)| {
                std::iter::once(label.clone())
                    .chain(counts.iter().map(usize::to_string))
                    .collect::<Vec<String>>()
            })
            .collect::<Vec<_>>();
        let name = format!("{}_marks_distribution.csv", matrix.category.short_code());
        files.push(io_utils::write_csv_artifact(dir, &name, &headers, &rows)?);
    }

    if let Some(top) = &report.top_students {
        let headers = strings(&[
            "Sl. No.",
            "Enrollment No.",
            "Student Name",
            "Maximum Mark",
            "Obtained Marks",
            "CPI",
        ]);
        let rows = top
            .iter()
            .map(|student| {
                vec![
                    student.rank.to_string(),
                    student.enrollment_no.clone().unwrap_or_default(),
                    student.name.clone(),
                    student.max_marks.to_string(),
                    format_number(student.obtained_marks),
                    format_number(Some(student.cpi)),
                ]
            })
            .collect::<Vec<_>>();
        files.push(io_utils::write_csv_artifact(
            dir,
            "top_five_students.csv",
            &headers,
            &rows,
        )?);
    }

    if let Some(subjects) = &report.subject_toppers {
        let headers = strings(&[
            "Course Code",
            "Rank",
            "Enrollment No.",
            "Student Name",
            "Marks Obtained",
            "CPI",
        ]);
        let rows = subjects
            .iter()
            .flat_map(|subject| {
                subject.toppers.iter().map(move |topper| {
                    vec![
                        subject.course_code.clone(),
                        topper.rank.to_string(),
                        topper.enrollment_no.clone().unwrap_or_default(),
                        topper.name.clone(),
                        format_number(Some(topper.marks_obtained)),
                        format_number(topper.cpi),
                    ]
                })
            })
            .collect::<Vec<_>>();
        files.push(io_utils::write_csv_artifact(
            dir,
            "subject_wise_toppers.csv",
            &headers,
            &rows,
        )?);
    }

    if let Some(performers) = &report.high_performers {
        let headers = strings(&[
            "Rank",
            "Enrollment No.",
            "Student Name",
            "Total Marks",
            "Maximum Marks",
            "CPI",
        ]);
        let rows = performers
            .iter()
            .map(|student| {
                vec![
                    student.rank.to_string(),
                    student.enrollment_no.clone().unwrap_or_default(),
                    student.name.clone(),
                    format_number(student.total_marks),
                    student.max_marks.to_string(),
                    format_number(Some(student.cpi)),
                ]
            })
            .collect::<Vec<_>>();
        files.push(io_utils::write_csv_artifact(
            dir,
            "high_performers.csv",
            &headers,
            &rows,
        )?);
    }

    if let Some(counts) = &report.category_counts {
        files.push(write_category_counts(dir, counts)?);
    }

    for table in &analysis.tables {
        files.push(write_complete_marks(dir, analysis, table.category)?);
    }

    Ok(files)
}

fn write_course_averages(dir: &Path, courses: &[CourseRow]) -> Result<PathBuf> {
    let headers = strings(&[
        "Course_Code",
        "I_Average",
        "E_Average",
        "T_Average",
        "T_Source",
        "Faculty_Name",
    ]);
    let rows = courses
        .iter()
        .map(|row| {
            vec![
                row.course_code.clone(),
                format_mark(row.internal_avg),
                format_mark(row.external_avg),
                format_mark(row.total_avg),
                row.total_source.label().to_string(),
                row.faculty_name.clone(),
            ]
        })
        .collect::<Vec<_>>();
    io_utils::write_csv_artifact(dir, "average_marks.csv", &headers, &rows)
}

fn write_category_counts(dir: &Path, counts: &CategoryCounts) -> Result<PathBuf> {
    let headers = strings(&["Category", "Number of Students"]);
    let mut rows = vec![
        vec!["TOTAL STUDENTS APPEARED".to_string(), counts.total_appeared.to_string()],
        vec!["TOTAL NO. OF PASS STUDENTS".to_string(), counts.passed.to_string()],
        vec!["TOTAL NO. OF REAPPEAR STUDENTS".to_string(), counts.reappeared.to_string()],
        vec!["HOLD STUDENTS".to_string(), counts.held.to_string()],
    ];
    rows.extend(
        counts
            .cpi_band_counts
            .iter()
            .flatten()
            .map(|entry| vec![format!("CPI {}", entry.band.label()), entry.count.to_string()]),
    );
    rows.push(vec![
        "PASS PERCENTAGE".to_string(),
        format!("{:.2}", counts.pass_percentage),
    ]);
    io_utils::write_csv_artifact(dir, "analysis_report.csv", &headers, &rows)
}

/// Every record with its cleaned marks for one category, before exclusion.
fn write_complete_marks(dir: &Path, analysis: &Analysis, category: Category) -> Result<PathBuf> {
    let table = analysis
        .table(category)
        .with_context(|| format!("No cleaned table for {category}"))?;
    let mut headers = strings(&["Enrollment No.", "Student Name"]);
    headers.extend(table.courses.iter().cloned());
    headers.extend(strings(&["Remarks", "CPI", "Grand Total"]));
    let rows = table
        .rows
        .iter()
        .map(|row| {
            let record = &analysis.roster.records[row.student];
            let mut cells = vec![
                record.enrollment_no.clone().unwrap_or_default(),
                record.name.clone(),
            ];
            cells.extend(row.marks.iter().map(|mark| format_number(*mark)));
            cells.push(record.remarks.clone().unwrap_or_default());
            cells.push(format_number(record.cpi));
            cells.push(format_number(record.grand_total));
            cells
        })
        .collect::<Vec<_>>();
    let name = format!("{}_total_marks.csv", category.short_code());
    io_utils::write_csv_artifact(dir, &name, &headers, &rows)
}

fn print_course_table(report: &Report) {
    let headers = strings(&["course", "internal", "external", "total", "faculty"]);
    let rows = report
        .courses
        .iter()
        .map(|row| {
            vec![
                row.course_code.clone(),
                format_mark(row.internal_avg),
                format_mark(row.external_avg),
                format_mark(row.total_avg),
                row.faculty_name.clone(),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
}

fn format_number(value: Option<f64>) -> String {
    match value {
        Some(v) if v.fract() == 0.0 => format!("{v:.0}"),
        Some(v) => v.to_string(),
        None => String::new(),
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}
