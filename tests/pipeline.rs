mod common;

use common::{fixture_path, metadata, sheet};
use markstat::{
    aggregate::TotalSource,
    cleaner::ExclusionPolicy,
    config::AnalysisConfig,
    counts::CpiBand,
    distribution::BandSet,
    error::AnalysisError,
    header::Category,
    io_utils,
    pipeline::{self, Analysis},
    report::Stage,
};

fn analyze_fixture(config: &AnalysisConfig) -> Analysis {
    let path = fixture_path("result_sheet.csv");
    let encoding = io_utils::resolve_encoding(None).expect("utf-8");
    let raw = io_utils::read_sheet(&path, b',', encoding).expect("read fixture");
    pipeline::run(&raw, config, metadata()).expect("pipeline runs")
}

#[test]
fn fixture_averages_per_category() {
    let analysis = analyze_fixture(&AnalysisConfig::default());
    let report = &analysis.report;
    assert!(report.is_complete(), "issues: {:?}", report.issues);
    assert_eq!(report.records, 4);

    let cs101 = report.course("CS101").expect("CS101 row");
    assert_eq!(cs101.total_avg, Some(78.33));
    assert_eq!(cs101.external_avg, Some(49.33));
    assert_eq!(cs101.internal_avg, Some(25.5));
    assert_eq!(cs101.total_source, TotalSource::Direct);
    assert_eq!(cs101.faculty_name, "");

    let cs102 = report.course("CS102").expect("CS102 row");
    assert_eq!(cs102.total_avg, Some(78.67));
    assert_eq!(cs102.external_avg, Some(49.0));
    assert_eq!(cs102.internal_avg, Some(24.75));
}

#[test]
fn unparseable_marks_are_diagnosed_not_zeroed() {
    let analysis = analyze_fixture(&AnalysisConfig::default());
    let total = analysis
        .report
        .diagnostics
        .iter()
        .find(|d| d.category == Category::Total)
        .expect("total diagnostics");
    assert_eq!(total.records, 4);
    assert_eq!(total.admissible_records, 3);
    assert_eq!(total.coercion_failures.len(), 1);
    assert_eq!(total.coercion_failures[0].raw, "AB");
    assert_eq!(total.coercion_failures[0].course_code, "CS102");

    let internal = analysis.table(Category::Internal).expect("internal table");
    assert_eq!(internal.admissible_count(), 4);
}

#[test]
fn distributions_count_every_present_mark() {
    let analysis = analyze_fixture(&AnalysisConfig::default());
    let report = &analysis.report;
    assert!(report.distribution(Category::Internal).is_none());

    let external = report.distribution(Category::External).expect("E distribution");
    assert_eq!(external.labels.len(), 6);
    assert_eq!(external.count("40-50", "CS101"), Some(2));
    assert_eq!(external.count("50-60", "CS101"), Some(2));
    assert_eq!(external.count("40-50", "CS102"), Some(2));

    let total = report.distribution(Category::Total).expect("T distribution");
    assert_eq!(total.count("90-100", "CS101"), Some(1));
    assert_eq!(total.count("80-90", "CS101"), Some(2));
    assert_eq!(total.count("70-80", "CS102"), Some(1));
    assert_eq!(total.count("30-40", "CS101"), Some(1));
}

#[test]
fn rankings_follow_cpi() {
    let analysis = analyze_fixture(&AnalysisConfig::default());
    let report = &analysis.report;

    let top = report.top_students.as_ref().expect("top students");
    let names = top.iter().map(|s| s.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["Dana", "Asha", "Bilal", "Chen"]);
    assert!(top.iter().all(|s| s.max_marks == 200));
    assert_eq!(top[0].obtained_marks, Some(171.0));
    assert_eq!(top[0].rank, 1);

    let toppers = report.subject_toppers.as_ref().expect("subject toppers");
    let cs101 = toppers.iter().find(|t| t.course_code == "CS101").unwrap();
    assert_eq!(cs101.max_mark, 90.0);
    assert_eq!(cs101.toppers.len(), 1);
    assert_eq!(cs101.toppers[0].name, "Dana");
    let cs102 = toppers.iter().find(|t| t.course_code == "CS102").unwrap();
    assert_eq!(cs102.toppers[0].name, "Bilal");
    assert_eq!(cs102.toppers[0].marks_obtained, 82.0);

    let high = report.high_performers.as_ref().expect("high performers");
    let names = high.iter().map(|s| s.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["Dana", "Asha"]);
}

#[test]
fn category_counts_use_complete_dataset() {
    let analysis = analyze_fixture(&AnalysisConfig::default());
    let counts = analysis
        .report
        .category_counts
        .as_ref()
        .expect("category counts");
    assert_eq!(counts.total_appeared, 4);
    assert_eq!(counts.passed, 2);
    assert_eq!(counts.reappeared, 1);
    assert_eq!(counts.held, 1);
    assert_eq!(counts.pass_percentage, 50.0);
    assert_eq!(counts.band(CpiBand::Above75), Some(2));
    assert_eq!(counts.band(CpiBand::From69_51To75), Some(1));
    assert_eq!(counts.band(CpiBand::Below45), Some(1));
    assert_eq!(counts.band(CpiBand::From45To49_50), Some(0));
}

#[test]
fn config_file_overrides_bands_and_thresholds() {
    let config = AnalysisConfig::load(&fixture_path("twenty_point.yaml")).expect("config loads");
    assert_eq!(config.bands.total, BandSet::total_twenty_point());
    let analysis = analyze_fixture(&config);
    let report = &analysis.report;
    assert_eq!(report.top_students.as_ref().unwrap().len(), 2);
    assert_eq!(report.high_performers.as_ref().unwrap().len(), 2);
    let total = report.distribution(Category::Total).unwrap();
    assert_eq!(total.labels.first().map(String::as_str), Some("0-20"));
    assert_eq!(total.count("80-100", "CS101"), Some(2));
}

#[test]
fn per_cell_policy_keeps_partial_records() {
    let config = AnalysisConfig {
        exclusion: ExclusionPolicy::PerCell,
        ..AnalysisConfig::default()
    };
    let analysis = analyze_fixture(&config);
    let cs101 = analysis.report.course("CS101").unwrap();
    // (80 + 65 + 35 + 90) / 4
    assert_eq!(cs101.total_avg, Some(67.5));
    let cs102 = analysis.report.course("CS102").unwrap();
    assert_eq!(cs102.total_avg, Some(78.67));
}

#[test]
fn per_cell_policy_keeps_courses_without_any_mark() {
    let raw = sheet(&[
        &["Enrollment No.", "Name", "CS101", "", "", "CS102", "", "", "Remarks", "CPI"],
        &["", "", "", "", "T", "", "", "T", "", ""],
        &["A1", "Asha", "", "", "80", "", "", "AB", "Pass", "82"],
        &["A2", "Bilal", "", "", "70", "", "", "", "Pass", "71"],
    ]);
    let config = AnalysisConfig {
        exclusion: ExclusionPolicy::PerCell,
        ..AnalysisConfig::default()
    };
    let analysis = pipeline::run(&raw, &config, metadata()).unwrap();
    let report = &analysis.report;
    let codes = report
        .courses
        .iter()
        .map(|row| row.course_code.as_str())
        .collect::<Vec<_>>();
    assert_eq!(codes, vec!["CS101", "CS102"]);
    assert_eq!(report.course("CS101").unwrap().total_avg, Some(75.0));
    let cs102 = report.course("CS102").unwrap();
    assert_eq!(cs102.total_avg, None);
    assert_eq!(cs102.internal_avg, None);
    assert_eq!(cs102.external_avg, None);
    assert_eq!(cs102.total_source, TotalSource::Absent);
}

#[test]
fn single_course_average_rounds_to_two_places() {
    let raw = sheet(&[
        &["Enrollment No.", "Name", "CS101", "", "", "Remarks", "CPI"],
        &["", "", "", "", "T", "", ""],
        &["A1", "Asha", "", "", "45", "Pass", "60"],
        &["A2", "Bilal", "", "", "78", "Pass", "70"],
        &["A3", "Chen", "", "", "92", "Pass", "80"],
    ]);
    let analysis = pipeline::run(&raw, &AnalysisConfig::default(), metadata()).unwrap();
    let row = analysis.report.course("CS101").unwrap();
    assert_eq!(row.total_avg, Some(71.67));
    let total = analysis.report.distribution(Category::Total).unwrap();
    assert_eq!(total.count("90-100", "CS101"), Some(1));
}

#[test]
fn missing_category_marker_only_drops_that_category() {
    let raw = sheet(&[
        &["Enrollment No.", "Name", "CS101", "", "", "Remarks", "CPI"],
        &["", "", "", "I", "T", "", ""],
        &["A1", "Asha", "", "30", "80", "Pass", "82"],
    ]);
    let analysis = pipeline::run(&raw, &AnalysisConfig::default(), metadata()).unwrap();
    let report = &analysis.report;
    let row = report.course("CS101").unwrap();
    assert_eq!(row.internal_avg, Some(30.0));
    assert_eq!(row.total_avg, Some(80.0));
    assert_eq!(row.external_avg, None);
    assert!(report.distribution(Category::External).is_none());
    assert!(report.top_students.is_some());
    let issue = report
        .issues
        .iter()
        .find(|issue| issue.category == Some(Category::External))
        .expect("external issue");
    assert_eq!(issue.stage, Stage::HeaderResolution);
}

#[test]
fn missing_cpi_column_skips_ranking_and_cpi_bands_only() {
    let raw = sheet(&[
        &["Enrollment No.", "Name", "CS101", "", "", "Remarks"],
        &["", "", "", "", "T", ""],
        &["A1", "Asha", "", "", "80", "Pass"],
    ]);
    let analysis = pipeline::run(&raw, &AnalysisConfig::default(), metadata()).unwrap();
    let report = &analysis.report;
    assert_eq!(report.course("CS101").unwrap().total_avg, Some(80.0));
    assert!(report.top_students.is_none());
    let counts = report.category_counts.as_ref().expect("status counts");
    assert_eq!(counts.total_appeared, 1);
    assert_eq!(counts.passed, 1);
    assert_eq!(counts.pass_percentage, 100.0);
    assert!(counts.cpi_band_counts.is_none());
    assert_eq!(counts.band(CpiBand::Above75), None);
    let stages = report.issues.iter().map(|i| i.stage).collect::<Vec<_>>();
    assert!(stages.contains(&Stage::Ranking));
    assert!(stages.contains(&Stage::CategoryCounts));
}

#[test]
fn sheet_without_identity_columns_is_fatal() {
    let raw = sheet(&[&["CS101"], &["T"], &["80"]]);
    let err = pipeline::run(&raw, &AnalysisConfig::default(), metadata()).unwrap_err();
    assert!(matches!(err, AnalysisError::SheetStructure(_)));
}
