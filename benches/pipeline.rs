use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use encoding_rs::UTF_8;
use markstat::config::AnalysisConfig;
use markstat::report::ReportMetadata;
use markstat::{io_utils, pipeline};
use tempfile::TempDir;

const COURSES: usize = 8;

fn generate_sheet(students: usize) -> (TempDir, PathBuf) {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let csv_path = temp_dir.path().join("result_sheet.csv");
    let mut file = File::create(&csv_path).expect("create csv");

    let mut header = vec!["Enrollment No.".to_string(), "Student Name".to_string()];
    let mut markers = vec![String::new(), String::new()];
    for course in 0..COURSES {
        header.extend([format!("CS{:03}", 101 + course), String::new(), String::new()]);
        markers.extend(["E", "I", "T"].map(String::from));
    }
    header.extend(["Remarks", "CPI", "Grand Total"].map(String::from));
    markers.extend([String::new(), String::new(), String::new()]);
    writeln!(file, "{}", header.join(",")).expect("header");
    writeln!(file, "{}", markers.join(",")).expect("markers");

    for i in 0..students {
        let mut row = vec![format!("E{i:06}"), format!("Student {i}")];
        let mut grand = 0;
        for course in 0..COURSES {
            let external = (i * 7 + course * 13) % 61;
            let internal = (i * 3 + course * 5) % 41;
            let total = external + internal;
            grand += total;
            let external = if i % 97 == 0 { "AB".to_string() } else { external.to_string() };
            row.extend([external, internal.to_string(), total.to_string()]);
        }
        let remarks = match i % 10 {
            0 => "Re-appear",
            1 => "Result Hold",
            _ => "Pass",
        };
        row.push(remarks.to_string());
        row.push(format!("{:.1}", 40.0 + (i % 600) as f64 / 10.0));
        row.push(grand.to_string());
        writeln!(file, "{}", row.join(",")).expect("row");
    }
    (temp_dir, csv_path)
}

fn metadata() -> ReportMetadata {
    ReportMetadata {
        institution: "Bench Institute".into(),
        program: "B.Tech".into(),
        batch: "2022-2026".into(),
        semester: "5".into(),
    }
}

fn bench_pipeline(c: &mut Criterion) {
    let (temp_dir, csv_path) = generate_sheet(5_000);
    let config = AnalysisConfig::default();
    let sheet = io_utils::read_sheet(&csv_path, b',', UTF_8).expect("read sheet");

    let mut group = c.benchmark_group("analysis");

    group.bench_function("read_sheet", |b| {
        b.iter(|| io_utils::read_sheet(&csv_path, b',', UTF_8).expect("read sheet"));
    });

    group.bench_function("pipeline_run", |b| {
        b.iter_batched(
            metadata,
            |metadata| pipeline::run(&sheet, &config, metadata).expect("pipeline"),
            BatchSize::SmallInput,
        );
    });

    drop(temp_dir);
    group.finish();
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
