use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::header::Category;

#[derive(Debug, Parser)]
#[command(author, version, about = "Consolidated statistics from academic result sheets", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Analyze a result sheet and write the consolidated report artifacts
    Analyze(AnalyzeArgs),
    /// Show how the header rows resolve for one mark category
    Columns(ColumnsArgs),
}

#[derive(Debug, Args)]
pub struct SheetArgs {
    /// Result sheet exported as CSV/TSV (`-` reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Optional YAML file overriding layout, markers, bands and thresholds
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub sheet: SheetArgs,
    /// Directory receiving the generated report files
    #[arg(short = 'o', long = "output-dir", default_value = "report")]
    pub output_dir: PathBuf,
    /// Institution name printed on the report
    #[arg(long)]
    pub institution: String,
    /// Program, e.g. B.Tech (CSE)
    #[arg(long)]
    pub program: String,
    /// Batch, e.g. 2022-2026
    #[arg(long)]
    pub batch: String,
    /// Semester the sheet covers
    #[arg(long)]
    pub semester: String,
    /// Print the course averages as a table instead of the JSON response
    #[arg(long = "table")]
    pub table: bool,
}

#[derive(Debug, Args)]
pub struct ColumnsArgs {
    #[command(flatten)]
    pub sheet: SheetArgs,
    /// Mark category to resolve
    #[arg(long, value_enum, default_value = "total")]
    pub category: CategoryArg,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum CategoryArg {
    Internal,
    External,
    Total,
}

impl From<CategoryArg> for Category {
    fn from(value: CategoryArg) -> Self {
        match value {
            CategoryArg::Internal => Category::Internal,
            CategoryArg::External => Category::External,
            CategoryArg::Total => Category::Total,
        }
    }
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
