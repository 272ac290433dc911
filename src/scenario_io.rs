// src/scenario_io.rs
//
// Scenario discovery, CSV ingestion and result files.

use crate::analysis::ScenarioResult;
use crate::pipeline::frame_context::FrameDiagnostics;
use crate::pipeline::scenario::FrameOutput;
use crate::types::{BodyColumns, BodySample, ColumnConfig, Kinematics, MetricKind};
use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim, Writer};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

const PROCESSED_MARKER: &str = "_processed_";
const AGGREGATE_SUFFIX: &str = "_DA_Scores";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("missing required column '{0}'")]
    MissingColumn(String),

    #[error("row {row}: column '{column}' has malformed value '{value}'")]
    MalformedValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("row {row}: timestamp {current} does not increase past {previous}")]
    NonIncreasingTimestamp {
        row: usize,
        previous: f64,
        current: f64,
    },

    #[error("scenario has no data rows")]
    EmptyScenario,

    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
}

// ============================================================================
// DISCOVERY
// ============================================================================

fn is_scenario_file(path: &Path) -> bool {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    is_csv && !stem.contains(PROCESSED_MARKER) && !stem.ends_with(AGGREGATE_SUFFIX)
}

/// Every `*.csv` under `dir`, sorted. Our own result files are skipped.
pub fn find_scenario_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        anyhow::bail!("input directory {} does not exist", dir.display());
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_scenario_file(p))
        .collect();
    files.sort();

    info!("Found {} scenario files in {}", files.len(), dir.display());
    Ok(files)
}

/// Path of the scenario relative to `root`, extension dropped, `/`-separated.
/// `day1/run.csv` under `root` becomes `day1/run`.
pub fn scenario_id(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path).with_extension("");
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        path.display().to_string()
    } else {
        parts.join("/")
    }
}

// ============================================================================
// INGESTION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScenarioRow {
    pub timestamp: f64,
    pub ego: BodySample,
    pub challenger: BodySample,
}

/// Parsed scenario plus the raw records, kept for the augmented output.
#[derive(Debug, Clone)]
pub struct ScenarioTable {
    pub headers: StringRecord,
    pub records: Vec<StringRecord>,
    pub rows: Vec<ScenarioRow>,
}

impl ScenarioTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

struct BodyIndex {
    x: usize,
    y: usize,
    heading: usize,
    speed: usize,
    speed_lon: usize,
    speed_lat: usize,
    accel: Option<usize>,
    accel_lon: usize,
    accel_lat: usize,
}

fn column_index(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

fn require(headers: &StringRecord, name: &str) -> Result<usize, IngestError> {
    column_index(headers, name).ok_or_else(|| IngestError::MissingColumn(name.to_string()))
}

impl BodyIndex {
    fn resolve(headers: &StringRecord, columns: &BodyColumns) -> Result<Self, IngestError> {
        Ok(Self {
            x: require(headers, &columns.x)?,
            y: require(headers, &columns.y)?,
            heading: require(headers, &columns.heading)?,
            speed: require(headers, &columns.speed)?,
            speed_lon: require(headers, &columns.speed_lon)?,
            speed_lat: require(headers, &columns.speed_lat)?,
            accel: column_index(headers, &columns.accel),
            accel_lon: require(headers, &columns.accel_lon)?,
            accel_lat: require(headers, &columns.accel_lat)?,
        })
    }

    fn sample(&self, cells: &Cells<'_>) -> Result<BodySample, IngestError> {
        let accel_lon = cells.get(self.accel_lon)?;
        let accel_lat = cells.get(self.accel_lat)?;
        let accel = match self.accel {
            Some(i) => cells.get(i)?,
            None => derived_total_accel(accel_lon, accel_lat),
        };
        Ok(BodySample {
            x: cells.get(self.x)?,
            y: cells.get(self.y)?,
            heading: cells.get(self.heading)?,
            kinematics: Kinematics {
                speed: cells.get(self.speed)?,
                speed_lon: cells.get(self.speed_lon)?,
                speed_lat: cells.get(self.speed_lat)?,
                accel,
                accel_lon,
                accel_lat,
            },
        })
    }
}

/// Signed magnitude of the acceleration vector, sign taken from the
/// longitudinal component.
pub fn derived_total_accel(accel_lon: f64, accel_lat: f64) -> f64 {
    let magnitude = accel_lon.hypot(accel_lat);
    if accel_lon < 0.0 {
        -magnitude
    } else {
        magnitude
    }
}

struct Cells<'a> {
    row: usize,
    headers: &'a StringRecord,
    record: &'a StringRecord,
}

impl Cells<'_> {
    fn get(&self, index: usize) -> Result<f64, IngestError> {
        let raw = self.record.get(index).unwrap_or("");
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| IngestError::MalformedValue {
                row: self.row,
                column: self.headers.get(index).unwrap_or("?").to_string(),
                value: raw.to_string(),
            })
    }
}

/// Rows are numbered from 1, counting data rows only.
pub fn parse_scenario<R: Read>(
    reader: R,
    columns: &ColumnConfig,
) -> Result<ScenarioTable, IngestError> {
    let mut csv = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = csv.headers()?.clone();
    let timestamp_index = require(&headers, &columns.timestamp)?;
    let ego_index = BodyIndex::resolve(&headers, &columns.ego)?;
    let challenger_index = BodyIndex::resolve(&headers, &columns.challenger)?;

    let mut records = Vec::new();
    let mut rows = Vec::new();
    let mut previous: Option<f64> = None;

    for (i, record) in csv.records().enumerate() {
        let record = record?;
        let cells = Cells {
            row: i + 1,
            headers: &headers,
            record: &record,
        };

        let timestamp = cells.get(timestamp_index)?;
        if let Some(previous) = previous {
            if timestamp <= previous {
                return Err(IngestError::NonIncreasingTimestamp {
                    row: i + 1,
                    previous,
                    current: timestamp,
                });
            }
        }
        previous = Some(timestamp);

        rows.push(ScenarioRow {
            timestamp,
            ego: ego_index.sample(&cells)?,
            challenger: challenger_index.sample(&cells)?,
        });
        records.push(record);
    }

    if rows.is_empty() {
        return Err(IngestError::EmptyScenario);
    }

    debug!("Parsed {} rows", rows.len());
    Ok(ScenarioTable {
        headers,
        records,
        rows,
    })
}

pub fn read_scenario(path: &Path, columns: &ColumnConfig) -> Result<ScenarioTable> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let table = parse_scenario(file, columns)
        .with_context(|| format!("parsing scenario {}", path.display()))?;
    Ok(table)
}

// ============================================================================
// OUTPUT
// ============================================================================

pub fn timestamp_tag() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Mirrors the scenario's relative directory under `output_dir`.
pub fn processed_path(output_dir: &Path, scenario_id: &str, tag: &str, scenario_folders: bool) -> PathBuf {
    let (parent, stem) = match scenario_id.rsplit_once('/') {
        Some((parent, stem)) => (output_dir.join(parent), stem),
        None => (output_dir.to_path_buf(), scenario_id),
    };
    let dir = if scenario_folders {
        parent.join(stem)
    } else {
        parent
    };
    dir.join(format!("{stem}{PROCESSED_MARKER}{tag}.csv"))
}

pub fn aggregate_paths(output_dir: &Path, tag: &str) -> (PathBuf, PathBuf) {
    (
        output_dir.join(format!("{tag}{AGGREGATE_SUFFIX}.csv")),
        output_dir.join(format!("{tag}{AGGREGATE_SUFFIX}.json")),
    )
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    Ok(())
}

fn flag(value: bool) -> String {
    u8::from(value).to_string()
}

pub fn augmented_headers(input: &StringRecord) -> Vec<String> {
    let mut headers: Vec<String> = input.iter().map(str::to_string).collect();
    headers.extend(FrameDiagnostics::COLUMNS.iter().map(|c| c.to_string()));
    for kind in MetricKind::ALL {
        headers.push(kind.code().to_string());
        headers.push(kind.magnitude_column());
    }
    headers
}

/// Input columns, then diagnostics, then `<KIND>` / `<KIND>M` per metric kind.
pub fn write_augmented(path: &Path, table: &ScenarioTable, frames: &[FrameOutput]) -> Result<()> {
    ensure_parent(path)?;
    let mut writer =
        Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;

    writer.write_record(augmented_headers(&table.headers))?;
    for (record, frame) in table.records.iter().zip(frames) {
        let mut fields: Vec<String> = record.iter().map(str::to_string).collect();
        fields.extend(frame.diagnostics.to_fields());
        for metric in &frame.metrics.records {
            fields.push(flag(metric.violation));
            fields.push(metric.magnitude.to_string());
        }
        writer.write_record(&fields)?;
    }
    writer.flush()?;

    debug!("Wrote {}", path.display());
    Ok(())
}

pub fn aggregate_headers() -> Vec<String> {
    let mut headers = vec!["scenario_id".to_string(), "DA score".to_string()];
    for kind in MetricKind::ALL {
        headers.push(kind.code().to_string());
        headers.push(kind.magnitude_column());
    }
    headers.extend(
        ["rows", "SEI episodes", "SEV episodes", "SERTV firings", "ERTV firings", "PET"]
            .iter()
            .map(|h| h.to_string()),
    );
    headers
}

pub fn write_aggregate_csv(path: &Path, results: &[ScenarioResult]) -> Result<()> {
    ensure_parent(path)?;
    let mut writer =
        Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;

    writer.write_record(aggregate_headers())?;
    for result in results {
        let mut fields = vec![result.scenario_id.clone(), result.da_score.to_string()];
        for peak in &result.peaks {
            fields.push(flag(peak.violation));
            fields.push(peak.magnitude.to_string());
        }
        let c = &result.counts;
        fields.extend([
            result.rows.to_string(),
            c.sei_episodes.to_string(),
            c.sev_episodes.to_string(),
            c.sertv_firings.to_string(),
            c.ertv_firings.to_string(),
            result.pet.map(|p| p.to_string()).unwrap_or_default(),
        ]);
        writer.write_record(&fields)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_aggregate_json(path: &Path, results: &[ScenarioResult]) -> Result<()> {
    ensure_parent(path)?;
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, results)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "timestamp,VUT x,VUT y,VUT heading,VUT sp,VUT lon sp,VUT lat sp,VUT lon acc,VUT lat acc,\
challenger x,challenger y,challenger heading,challenger sp,challenger lon sp,challenger lat sp,challenger lon acc,challenger lat acc";

    fn csv_text(rows: &[&str]) -> String {
        let mut text = HEADER.to_string();
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        text
    }

    #[test]
    fn test_parse_valid_scenario() {
        let text = csv_text(&[
            "0.0, 0,0,0,10,10,0,-3,4, 20,0,0,5,5,0,0,0",
            "0.1, 1,0,0,10,10,0,1,0, 20.5,0,0,5,5,0,0,0",
        ]);
        let table = parse_scenario(text.as_bytes(), &ColumnConfig::default()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[1].ego.x, 1.0);
        assert_eq!(table.rows[0].challenger.x, 20.0);
        // derived: -hypot(3, 4)
        assert_eq!(table.rows[0].ego.kinematics.accel, -5.0);
        assert_eq!(table.rows[1].ego.kinematics.accel, 1.0);
    }

    #[test]
    fn test_explicit_total_accel_column_is_used() {
        let text = "timestamp,VUT x,VUT y,VUT heading,VUT sp,VUT lon sp,VUT lat sp,VUT acc,VUT lon acc,VUT lat acc,\
challenger x,challenger y,challenger heading,challenger sp,challenger lon sp,challenger lat sp,challenger lon acc,challenger lat acc
0,0,0,0,10,10,0,2.5,1,0,20,0,0,5,5,0,0,0";
        let table = parse_scenario(text.as_bytes(), &ColumnConfig::default()).unwrap();
        assert_eq!(table.rows[0].ego.kinematics.accel, 2.5);
    }

    #[test]
    fn test_missing_column() {
        let text = "timestamp,VUT x\n0,1";
        let err = parse_scenario(text.as_bytes(), &ColumnConfig::default()).unwrap_err();
        assert!(matches!(err, IngestError::MissingColumn(c) if c == "VUT y"));
    }

    #[test]
    fn test_malformed_value() {
        let text = csv_text(&["0.0, 0,0,0,fast,10,0,0,0, 20,0,0,5,5,0,0,0"]);
        let err = parse_scenario(text.as_bytes(), &ColumnConfig::default()).unwrap_err();
        match err {
            IngestError::MalformedValue { row, column, value } => {
                assert_eq!(row, 1);
                assert_eq!(column, "VUT sp");
                assert_eq!(value, "fast");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_increasing_timestamp() {
        let text = csv_text(&[
            "0.1, 0,0,0,10,10,0,0,0, 20,0,0,5,5,0,0,0",
            "0.1, 0,0,0,10,10,0,0,0, 20,0,0,5,5,0,0,0",
        ]);
        let err = parse_scenario(text.as_bytes(), &ColumnConfig::default()).unwrap_err();
        assert!(matches!(err, IngestError::NonIncreasingTimestamp { row: 2, .. }));
    }

    #[test]
    fn test_empty_scenario() {
        let err = parse_scenario(HEADER.as_bytes(), &ColumnConfig::default()).unwrap_err();
        assert!(matches!(err, IngestError::EmptyScenario));
    }

    #[test]
    fn test_find_scenario_files_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir_all(&nested).unwrap();
        for name in ["b.csv", "a.CSV", "notes.txt", "a_processed_20240101_000000.csv"] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        fs::write(nested.join("c.csv"), "x").unwrap();
        fs::write(dir.path().join("20240101_000000_DA_Scores.csv"), "x").unwrap();

        let files = find_scenario_files(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().display().to_string())
            .collect();
        assert_eq!(names, vec!["a.CSV", "b.csv", "nested/c.csv"]);
    }

    #[test]
    fn test_scenario_id_keeps_relative_directories() {
        let root = Path::new("/data/input");
        assert_eq!(scenario_id(Path::new("/data/input/cut_in.csv"), root), "cut_in");
        assert_eq!(scenario_id(Path::new("/data/input/day1/run.csv"), root), "day1/run");
        assert_ne!(
            scenario_id(Path::new("/data/input/day1/run.csv"), root),
            scenario_id(Path::new("/data/input/day2/run.csv"), root)
        );
        // outside the root only the extension is dropped
        assert_eq!(scenario_id(Path::new("other/run.csv"), root), "other/run");
    }

    #[test]
    fn test_missing_input_dir_is_error() {
        assert!(find_scenario_files("/definitely/not/here").is_err());
    }

    #[test]
    fn test_output_paths() {
        let out = Path::new("/out");
        assert_eq!(
            processed_path(out, "cut_in", "20240102_030405", true),
            PathBuf::from("/out/cut_in/cut_in_processed_20240102_030405.csv")
        );
        assert_eq!(
            processed_path(out, "cut_in", "20240102_030405", false),
            PathBuf::from("/out/cut_in_processed_20240102_030405.csv")
        );
        assert_eq!(
            processed_path(out, "day1/run", "20240102_030405", true),
            PathBuf::from("/out/day1/run/run_processed_20240102_030405.csv")
        );
        assert_eq!(
            processed_path(out, "day1/run", "20240102_030405", false),
            PathBuf::from("/out/day1/run_processed_20240102_030405.csv")
        );
        let (csv, json) = aggregate_paths(out, "20240102_030405");
        assert_eq!(csv, PathBuf::from("/out/20240102_030405_DA_Scores.csv"));
        assert_eq!(json, PathBuf::from("/out/20240102_030405_DA_Scores.json"));
    }

    #[test]
    fn test_aggregate_csv_carries_pet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.csv");
        let mut met = crate::analysis::aggregate("met", Vec::new());
        met.pet = Some(1.5);
        let apart = crate::analysis::aggregate("apart", Vec::new());
        write_aggregate_csv(&path, &[met, apart]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].ends_with(",PET"));
        assert!(lines[1].starts_with("met,100,"));
        assert!(lines[1].ends_with(",1.5"));
        assert!(lines[2].ends_with(','));
    }

    #[test]
    fn test_augmented_header_layout() {
        let input = StringRecord::from(vec!["timestamp", "VUT x"]);
        let headers = augmented_headers(&input);
        assert_eq!(headers[0], "timestamp");
        assert_eq!(headers[2], "orientation");
        assert_eq!(headers.len(), 2 + FrameDiagnostics::COLUMNS.len() + 2 * MetricKind::COUNT);
        assert_eq!(headers[headers.len() - 2], "ERTV");
        assert_eq!(headers[headers.len() - 1], "ERTVM");
    }
}
