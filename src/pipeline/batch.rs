// src/pipeline/batch.rs
//
// Batch driver. Scenarios are independent, so each one is a separate
// rayon job with its own processor; only the counters are shared.

use super::metrics::{BatchMetrics, BatchSummary};
use super::scenario::score_scenario;
use crate::analysis::ScenarioResult;
use crate::scenario_io::{
    aggregate_paths, find_scenario_files, processed_path, read_scenario, scenario_id,
    timestamp_tag, write_aggregate_csv, write_aggregate_json, write_augmented,
};
use crate::types::{Config, MetricKind};
use anyhow::Result;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Debug)]
pub struct BatchReport {
    pub results: Vec<ScenarioResult>,
    pub failed: Vec<(PathBuf, String)>,
    pub aggregate_csv: PathBuf,
    pub aggregate_json: PathBuf,
    pub summary: BatchSummary,
}

fn process_file(
    path: &Path,
    config: &Config,
    output_dir: &Path,
    tag: &str,
    metrics: &BatchMetrics,
) -> Result<ScenarioResult> {
    let id = scenario_id(path, Path::new(&config.io.input_dir));
    info!("📄 Scoring {}", path.display());

    let table = read_scenario(path, &config.columns)?;
    let output = score_scenario(&id, &table, config);

    let out_path = processed_path(output_dir, &id, tag, config.io.scenario_folders);
    write_augmented(&out_path, &table, &output.frames)?;

    metrics.inc(&metrics.scenarios_processed);
    metrics.add(&metrics.rows_scored, output.result.rows as u64);
    metrics.add(
        &metrics.envelope_violations,
        u64::from(output.result.counts.sev_episodes),
    );
    if output.result.collision {
        metrics.inc(&metrics.collisions);
    }

    Ok(output.result)
}

/// Scores every scenario under `config.io.input_dir`. Fails only when no
/// scenario files exist or the aggregate files cannot be written.
pub fn run_batch(config: &Config) -> Result<BatchReport> {
    let files = find_scenario_files(&config.io.input_dir)?;
    if files.is_empty() {
        anyhow::bail!("no scenario files found in {}", config.io.input_dir);
    }

    let output_dir = PathBuf::from(&config.io.output_dir);
    let tag = timestamp_tag();
    let metrics = BatchMetrics::new();

    let run = |path: &PathBuf| {
        let outcome = process_file(path, config, &output_dir, &tag, &metrics);
        if outcome.is_err() {
            metrics.inc(&metrics.scenarios_failed);
        }
        (path.clone(), outcome)
    };

    let outcomes: Vec<(PathBuf, Result<ScenarioResult>)> = if config.io.parallel {
        files.par_iter().map(run).collect()
    } else {
        files.iter().map(run).collect()
    };

    let mut results = Vec::new();
    let mut failed = Vec::new();
    for (path, outcome) in outcomes {
        match outcome {
            Ok(result) => results.push(result),
            Err(e) => {
                error!("Skipping {}: {:#}", path.display(), e);
                failed.push((path, format!("{e:#}")));
            }
        }
    }

    let (aggregate_csv, aggregate_json) = aggregate_paths(&output_dir, &tag);
    write_aggregate_csv(&aggregate_csv, &results)?;
    write_aggregate_json(&aggregate_json, &results)?;

    for result in &results {
        let violated: Vec<&str> = MetricKind::ALL
            .iter()
            .filter(|k| result.peak(**k).violation)
            .map(|k| k.code())
            .collect();
        info!(
            "  {:<32} DA {:>6.1}  [{}]",
            result.scenario_id,
            result.da_score,
            violated.join(", ")
        );
    }

    let summary = metrics.summary();
    info!(
        "✓ Batch complete: {} scored, {} failed, {} rows ({:.0} rows/s), {} collisions",
        summary.scenarios_processed,
        summary.scenarios_failed,
        summary.rows_scored,
        summary.rows_per_sec,
        summary.collisions
    );
    info!("✓ Aggregate written to {}", aggregate_csv.display());

    Ok(BatchReport {
        results,
        failed,
        aggregate_csv,
        aggregate_json,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const HEADER: &str = "timestamp,VUT x,VUT y,VUT heading,VUT sp,VUT lon sp,VUT lat sp,VUT lon acc,VUT lat acc,\
challenger x,challenger y,challenger heading,challenger sp,challenger lon sp,challenger lat sp,challenger lon acc,challenger lat acc";

    fn write_scenario(dir: &Path, name: &str, rows: &[&str]) {
        let mut text = HEADER.to_string();
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        fs::write(dir.join(name), text).unwrap();
    }

    fn config_for(input: &Path, output: &Path, parallel: bool) -> Config {
        let mut config = Config::default();
        config.io.input_dir = input.display().to_string();
        config.io.output_dir = output.display().to_string();
        config.io.parallel = parallel;
        config
    }

    #[test]
    fn test_batch_scores_and_skips_bad_files() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_scenario(
            input.path(),
            "clear.csv",
            &[
                "0.0,0,0,0,10,10,0,0,0,500,0,0,10,10,0,0,0",
                "0.1,1,0,0,10,10,0,0,0,501,0,0,10,10,0,0,0",
            ],
        );
        write_scenario(
            input.path(),
            "crash.csv",
            &[
                "0.0,0,0,0,10,10,0,0,0,500,0,0,10,10,0,0,0",
                "0.1,0,0,0,10,10,0,0,0,4,0,0,2,2,0,0,0",
            ],
        );
        write_scenario(input.path(), "broken.csv", &["0.0,0,0,0,oops,10,0,0,0,500,0,0,10,10,0,0,0"]);

        let report = run_batch(&config_for(input.path(), output.path(), true)).unwrap();
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].0.ends_with("broken.csv"));
        assert_eq!(report.summary.scenarios_processed, 2);
        assert_eq!(report.summary.scenarios_failed, 1);
        assert_eq!(report.summary.collisions, 1);

        // sorted discovery order survives the parallel map
        assert_eq!(report.results[0].scenario_id, "clear");
        assert_eq!(report.results[0].da_score, 100.0);
        assert_eq!(report.results[1].scenario_id, "crash");
        assert_eq!(report.results[1].da_score, 0.0);

        assert!(report.aggregate_csv.exists());
        let json = fs::read_to_string(&report.aggregate_json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.as_array().map(|a| a.len()), Some(2));

        let processed: Vec<_> = fs::read_dir(output.path().join("clear"))
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        assert_eq!(processed.len(), 1);
        let text = fs::read_to_string(processed[0].path()).unwrap();
        let header = text.lines().next().unwrap();
        assert!(header.starts_with("timestamp,VUT x"));
        assert!(header.ends_with("ERTV,ERTVM"));
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let input = tempfile::tempdir().unwrap();
        write_scenario(
            input.path(),
            "follow.csv",
            &[
                "0.0,0,0,0,20,20,0,0,0,12,0,0,20,20,0,0,0",
                "0.5,10,0,0,20,20,0,-2,0,22,0,0,20,20,0,0,0",
                "1.0,20,0,0,19,19,0,-2,0,200,0,0,20,20,0,0,0",
            ],
        );
        let out_a = tempfile::tempdir().unwrap();
        let out_b = tempfile::tempdir().unwrap();
        let a = run_batch(&config_for(input.path(), out_a.path(), true)).unwrap();
        let b = run_batch(&config_for(input.path(), out_b.path(), false)).unwrap();
        assert_eq!(a.results, b.results);
    }

    #[test]
    fn test_same_stem_in_subfolders_kept_apart() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        for day in ["day1", "day2"] {
            let dir = input.path().join(day);
            fs::create_dir_all(&dir).unwrap();
            write_scenario(
                &dir,
                "run.csv",
                &["0.0,0,0,0,10,10,0,0,0,500,0,0,10,10,0,0,0"],
            );
        }

        let report = run_batch(&config_for(input.path(), output.path(), true)).unwrap();
        let ids: Vec<&str> = report
            .results
            .iter()
            .map(|r| r.scenario_id.as_str())
            .collect();
        assert_eq!(ids, vec!["day1/run", "day2/run"]);

        for day in ["day1", "day2"] {
            let written: Vec<_> = fs::read_dir(output.path().join(day).join("run"))
                .unwrap()
                .filter_map(|e| e.ok())
                .collect();
            assert_eq!(written.len(), 1);
        }
    }

    #[test]
    fn test_empty_input_is_fatal() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let err = run_batch(&config_for(input.path(), output.path(), true)).unwrap_err();
        assert!(err.to_string().contains("no scenario files"));
    }
}
