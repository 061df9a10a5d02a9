//! Integration tests for the metrics pipeline
//!
//! These tests drive whole runs: gzip logs on disk, a catalog snapshot in
//! `;`-separated CSV files, and the artifacts written for the loader.

use catalog_metrics::execution::MANIFEST_FILE;
use catalog_metrics::{DecodePolicy, Error, MetricTable, Pipeline, PipelineConfig};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

fn access_line(timestamp: &str, path: &str) -> String {
    format!(
        "Mar  1 10:00:00 lb-1 haproxy[812]: 10.1.2.3:51234 [{}] DATAGOUVFR_RGS~ www/web-2 0/0/1/12/13 200 5123 - - ---- 12/12/0/0/0 0/0 \"GET {} HTTP/1.1\"",
        timestamp, path
    )
}

fn write_gz(path: &Path, lines: &[String]) {
    let mut encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
    for line in lines {
        writeln!(encoder, "{}", line).unwrap();
    }
    encoder.finish().unwrap();
}

fn write_catalog(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    fs::write(
        dir.join("catalog_datasets.csv"),
        "id;title;slug;organization_id\nD1;Dataset one;abc123;O1\nD2;Dataset two;other;O9\n",
    )
    .unwrap();
    fs::write(dir.join("catalog_organizations.csv"), "id;name;slug\nO9;Org nine;org1\nO1;Org one;org-one\n")
        .unwrap();
    fs::write(dir.join("catalog_reuses.csv"), "id;title;slug;organization_id\nRU1;A reuse;my-reuse;O1\n")
        .unwrap();
    fs::write(
        dir.join("catalog_resources.csv"),
        "id;url;dataset.id;dataset.organization_id\n\
         R1;https://static.data.gouv.fr/resources/dataset-one/data.csv;D1;O1\n\
         R2;https://api.example.org/data.json;D2;O9\n",
    )
    .unwrap();
}

struct Workspace {
    _root: tempfile::TempDir,
    root: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().to_path_buf();
        write_catalog(&path.join("catalog"));
        Self { _root: root, root: path }
    }

    fn config(&self) -> PipelineConfig {
        PipelineConfig {
            catalog_dir: self.root.join("catalog"),
            work_dir: self.root.join("work"),
            output_dir: self.root.join("outputs"),
            ..Default::default()
        }
    }

    fn log(&self, name: &str, lines: &[String]) -> PathBuf {
        let path = self.root.join(name);
        write_gz(&path, lines);
        path
    }

    fn output(&self, name: &str) -> String {
        fs::read_to_string(self.root.join("outputs").join(name)).unwrap()
    }
}

const TS: &str = "01/Mar/2024:10:00:00.123456";

#[test]
fn test_three_line_scenario() {
    let ws = Workspace::new();
    let log = ws.log(
        "haproxy.log.gz",
        &[
            access_line(TS, "/fr/datasets/abc123"),
            access_line(TS, "/fr/datasets/abc123"),
            access_line(TS, "/en/organizations/org1"),
        ],
    );

    let pipeline = Pipeline::from_config(ws.config()).unwrap();
    let report = pipeline.run(&[log], &AtomicBool::new(false)).unwrap();

    assert!(report.is_success());
    assert_eq!(ws.output("datasets-1.csv"), "2024-03-01,D1,O1,2\n");
    assert_eq!(ws.output("organizations-1.csv"), "2024-03-01,O9,1\n");
    assert!(!ws.root.join("outputs/reuses-1.csv").exists());
    // spool files are gone once the file is done
    assert!(!ws.root.join("work/found/1").exists());
}

#[test]
fn test_unresolved_slugs_are_dropped() {
    let ws = Workspace::new();
    let log = ws.log(
        "haproxy.log.gz",
        &[
            access_line(TS, "/fr/datasets/abc123"),
            access_line(TS, "/fr/datasets/not-in-catalog"),
            access_line(TS, "/fr/reuses/my-reuse/"),
        ],
    );

    let pipeline = Pipeline::from_config(ws.config()).unwrap();
    let report = pipeline.run(&[log], &AtomicBool::new(false)).unwrap();

    let file = &report.files[0];
    let datasets = file.tables.iter().find(|t| t.table == MetricTable::Datasets).unwrap();
    assert_eq!(datasets.resolve.resolved, 1);
    assert_eq!(datasets.resolve.unresolved, 1);
    assert_eq!(ws.output("datasets-1.csv"), "2024-03-01,D1,O1,1\n");
    assert_eq!(ws.output("reuses-1.csv"), "2024-03-01,RU1,O1,1\n");
}

#[test]
fn test_files_are_counted_separately() {
    let ws = Workspace::new();
    let first = ws.log("a.log.gz", &vec![access_line(TS, "/fr/datasets/abc123"); 3]);
    let second = ws.log("b.log.gz", &[access_line("02/Mar/2024:08:00:00.000001", "/es/datasets/D1/")]);

    let config = PipelineConfig { spool_threshold: 2, ..ws.config() };
    let pipeline = Pipeline::from_config(config).unwrap();
    let report = pipeline.run(&[first, second], &AtomicBool::new(false)).unwrap();

    assert_eq!(report.files.len(), 2);
    assert_eq!(report.files[0].classify.spool.flushes, 2);
    assert_eq!(ws.output("datasets-1.csv"), "2024-03-01,D1,O1,3\n");
    assert_eq!(ws.output("datasets-2.csv"), "2024-03-02,D1,O1,1\n");
}

#[test]
fn test_rows_sorted_by_visits() {
    let ws = Workspace::new();
    let mut lines = vec![access_line(TS, "/fr/datasets/abc123")];
    lines.extend(vec![access_line(TS, "/fr/datasets/other"); 4]);
    lines.push(access_line("02/Mar/2024:00:00:01.000000", "/fr/datasets/abc123"));
    let log = ws.log("haproxy.log.gz", &lines);

    let pipeline = Pipeline::from_config(ws.config()).unwrap();
    pipeline.run(&[log], &AtomicBool::new(false)).unwrap();

    assert_eq!(
        ws.output("datasets-1.csv"),
        "2024-03-01,D2,O9,4\n2024-03-01,D1,O1,1\n2024-03-02,D1,O1,1\n"
    );
}

#[test]
fn test_run_is_idempotent() {
    let ws = Workspace::new();
    let lines: Vec<String> = (0..50)
        .map(|i| match i % 4 {
            0 => access_line(TS, "/fr/datasets/abc123"),
            1 => access_line("02/Mar/2024:00:00:01.000000", "/fr/datasets/other"),
            2 => access_line(TS, "/fr/organizations/org-one"),
            _ => access_line(TS, "/en/organizations/org1"),
        })
        .collect();
    let log = ws.log("haproxy.log.gz", &lines);

    let pipeline = Pipeline::from_config(ws.config()).unwrap();
    pipeline.run(&[log.clone()], &AtomicBool::new(false)).unwrap();
    let first = (ws.output("datasets-1.csv"), ws.output("organizations-1.csv"));

    pipeline.run(&[log], &AtomicBool::new(false)).unwrap();
    let second = (ws.output("datasets-1.csv"), ws.output("organizations-1.csv"));

    assert_eq!(first, second);
}

#[test]
fn test_resources_when_enabled() {
    let ws = Workspace::new();
    let log = ws.log(
        "haproxy.log.gz",
        &[
            access_line(TS, "/resources/dataset-one/data.csv"),
            access_line(TS, "/fr/datasets/r/R2"),
            // static-hosted resources only count through their file URL
            access_line(TS, "/fr/datasets/r/R1"),
        ],
    );

    let config = PipelineConfig { enable_resources: true, ..ws.config() };
    let pipeline = Pipeline::from_config(config).unwrap();
    pipeline.run(&[log], &AtomicBool::new(false)).unwrap();

    assert_eq!(ws.output("resources-1.csv"), "2024-03-01,R1,D1,O1,1\n2024-03-01,R2,D2,O9,1\n");
}

#[test]
fn test_resources_disabled_by_default() {
    let ws = Workspace::new();
    let log = ws.log("haproxy.log.gz", &[access_line(TS, "/fr/datasets/r/R2")]);

    let pipeline = Pipeline::from_config(ws.config()).unwrap();
    pipeline.run(&[log], &AtomicBool::new(false)).unwrap();

    assert!(!ws.root.join("outputs/resources-1.csv").exists());
}

#[test]
fn test_failed_file_does_not_block_the_run() {
    let ws = Workspace::new();
    let good = ws.log("good.log.gz", &[access_line(TS, "/fr/datasets/abc123")]);
    let bad = ws.root.join("bad.log.gz");
    let mut encoder = GzEncoder::new(File::create(&bad).unwrap(), Compression::default());
    encoder.write_all(b"[01/Mar/2024:10:00:00.1] DATAGOUVFR_RGS~ /fr/datasets/\xff\xfe\n").unwrap();
    encoder.finish().unwrap();

    let pipeline = Pipeline::from_config(ws.config()).unwrap();
    let report = pipeline.run(&[bad, good], &AtomicBool::new(false)).unwrap();

    assert!(!report.is_success());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0.sequence, 1);
    assert!(!ws.root.join("outputs/datasets-1.csv").exists());
    assert_eq!(ws.output("datasets-2.csv"), "2024-03-01,D1,O1,1\n");
}

#[test]
fn test_failed_rerun_removes_previous_artifacts() {
    let ws = Workspace::new();
    let good = ws.log(
        "good.log.gz",
        &[access_line(TS, "/fr/datasets/abc123"), access_line(TS, "/fr/reuses/my-reuse")],
    );
    let pipeline = Pipeline::from_config(ws.config()).unwrap();
    pipeline.run(&[good], &AtomicBool::new(false)).unwrap();
    assert_eq!(ws.output("datasets-1.csv"), "2024-03-01,D1,O1,1\n");

    let bad = ws.root.join("bad.log.gz");
    let mut encoder = GzEncoder::new(File::create(&bad).unwrap(), Compression::default());
    writeln!(encoder, "{}", access_line(TS, "/fr/datasets/abc123")).unwrap();
    encoder.write_all(b"\xff\n").unwrap();
    encoder.finish().unwrap();

    let report = pipeline.run(&[bad], &AtomicBool::new(false)).unwrap();
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0.sequence, 1);
    assert!(!ws.root.join("outputs/datasets-1.csv").exists());
    assert!(!ws.root.join("outputs/reuses-1.csv").exists());

    let manifest: serde_json::Value = serde_json::from_str(&ws.output(MANIFEST_FILE)).unwrap();
    assert!(manifest["artifacts"].as_array().unwrap().is_empty());
}

#[test]
fn test_tolerant_policy_keeps_partial_results() {
    let ws = Workspace::new();
    let log = ws.root.join("mixed.log.gz");
    let mut encoder = GzEncoder::new(File::create(&log).unwrap(), Compression::default());
    for _ in 0..9 {
        writeln!(encoder, "{}", access_line(TS, "/fr/datasets/abc123")).unwrap();
    }
    encoder.write_all(b"\xff broken\n").unwrap();
    encoder.finish().unwrap();

    let config = PipelineConfig {
        decode_policy: DecodePolicy::Tolerant { max_failure_ratio: 0.2 },
        ..ws.config()
    };
    let pipeline = Pipeline::from_config(config).unwrap();
    let report = pipeline.run(&[log], &AtomicBool::new(false)).unwrap();

    assert!(report.is_success());
    assert_eq!(report.files[0].classify.failed_lines, 1);
    assert_eq!(ws.output("datasets-1.csv"), "2024-03-01,D1,O1,9\n");
}

#[test]
fn test_stop_flag_skips_remaining_files() {
    let ws = Workspace::new();
    let log = ws.log("haproxy.log.gz", &[access_line(TS, "/fr/datasets/abc123")]);

    let pipeline = Pipeline::from_config(ws.config()).unwrap();
    let report = pipeline.run(&[log], &AtomicBool::new(true)).unwrap();

    assert!(report.stopped);
    assert!(report.files.is_empty());
    assert!(!ws.root.join("outputs/datasets-1.csv").exists());
}

#[test]
fn test_manifest_describes_outputs() {
    let ws = Workspace::new();
    let log = ws.log(
        "haproxy.log.gz",
        &[access_line(TS, "/fr/datasets/abc123"), access_line(TS, "/fr/reuses/my-reuse")],
    );

    let pipeline = Pipeline::from_config(ws.config()).unwrap();
    let report = pipeline.run(&[log], &AtomicBool::new(false)).unwrap();
    assert_eq!(report.manifest.as_deref(), Some(ws.root.join("outputs").join(MANIFEST_FILE).as_path()));

    let manifest: serde_json::Value = serde_json::from_str(&ws.output(MANIFEST_FILE)).unwrap();
    let tables: Vec<&str> =
        manifest["artifacts"].as_array().unwrap().iter().map(|a| a["table"].as_str().unwrap()).collect();
    assert_eq!(tables, vec!["metrics_datasets", "metrics_reuses"]);
}

#[test]
fn test_missing_catalog_is_fatal() {
    let ws = Workspace::new();
    fs::remove_file(ws.root.join("catalog/catalog_organizations.csv")).unwrap();

    match Pipeline::from_config(ws.config()) {
        Err(Error::MissingCatalog(path)) => assert!(path.ends_with("catalog_organizations.csv")),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("pipeline built without a complete catalog"),
    }
}
