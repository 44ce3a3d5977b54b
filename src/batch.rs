use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stemsplit_engine::{
    process_file_with_rules, record_rule_warnings, RunLog, SplitReport, SplitterConfig,
};
use stemsplit_rules::RuleIndex;
use tokio::sync::Semaphore;

use crate::loggerbridge::Logger;

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub output_dir: PathBuf,
    /// Files processed at once; 0 is treated as 1
    pub jobs: usize,
    /// Stream run log entries as JSON lines on stdout
    pub json_log: bool,
}

#[derive(Debug)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub result: std::result::Result<SplitReport, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub written: usize,
    pub failed: usize,
    pub tracks: usize,
    /// File warnings plus rule table warnings
    pub warnings: usize,
    pub rule_warnings: usize,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[FileOutcome]) -> Self {
        outcomes
            .iter()
            .fold(Self::default(), |mut summary, outcome| {
                match &outcome.result {
                    Ok(report) => {
                        summary.written += 1;
                        summary.tracks += report.tracks_written;
                        summary.warnings += report.warnings;
                    }
                    Err(_) => summary.failed += 1,
                }
                summary
            })
    }

    /// Count rule table warnings, which are reported once per batch
    pub fn with_rule_warnings(mut self, count: usize) -> Self {
        self.rule_warnings += count;
        self.warnings += count;
        self
    }
}

fn run_log(json_log: bool, file: &Path) -> RunLog {
    if json_log {
        RunLog::with_sink(Logger::new(file.display().to_string()).into_sink())
    } else {
        RunLog::new()
    }
}

/// Report the row warnings of the rule table once for the whole batch.
///
/// Returns the number of warnings reported.
pub fn report_rule_warnings(rules: &RuleIndex, rules_path: &Path, json_log: bool) -> usize {
    let mut log = run_log(json_log, rules_path);
    record_rule_warnings(rules, &mut log);
    log.warnings()
}

fn is_midi_file(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("mid") || ext.eq_ignore_ascii_case("midi"))
        .unwrap_or(false)
}

/// Explicit input files followed by every MIDI file in `input_dir`, sorted by name
pub fn collect_inputs(files: &[PathBuf], input_dir: Option<&Path>) -> Result<Vec<PathBuf>> {
    let mut inputs = files.to_vec();
    if let Some(dir) = input_dir {
        let entries = fs::read_dir(dir)
            .with_context(|| format!("Failed to read input folder {}", dir.display()))?;
        let mut found = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && is_midi_file(&path) {
                found.push(path);
            }
        }
        found.sort();
        inputs.extend(found);
    }
    if inputs.is_empty() {
        anyhow::bail!("No MIDI files to process");
    }
    Ok(inputs)
}

pub fn prepare_output_dir(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output folder {}", dir.display()))?;
        log::info!("Created output folder {}", dir.display());
    }
    Ok(())
}

/// Split every input, up to `options.jobs` at a time.
///
/// Each file gets its own run state; only the rule index and the config are
/// shared. Outcomes come back in input order.
pub async fn run_batch(
    inputs: Vec<PathBuf>,
    rules: Arc<RuleIndex>,
    config: Arc<SplitterConfig>,
    options: &BatchOptions,
) -> Vec<FileOutcome> {
    let permits = Arc::new(Semaphore::new(options.jobs.max(1)));
    let mut handles = Vec::with_capacity(inputs.len());

    for input in inputs {
        let rules = Arc::clone(&rules);
        let config = Arc::clone(&config);
        let permits = Arc::clone(&permits);
        let output_dir = options.output_dir.clone();
        let json_log = options.json_log;
        let task_input = input.clone();

        let handle = tokio::spawn(async move {
            let _permit = permits.acquire_owned().await;
            tokio::task::spawn_blocking(move || {
                let mut log = run_log(json_log, &task_input);
                process_file_with_rules(&task_input, &output_dir, &rules, &config, &mut log)
                    .map_err(String::from)
            })
            .await
        });
        handles.push((input, handle));
    }

    let mut outcomes = Vec::with_capacity(handles.len());
    for (input, handle) in handles {
        let result = match handle.await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) | Err(e) => Err(format!("Task error: {}", e)),
        };
        match &result {
            Ok(report) => log::info!(
                "{} -> {} ({} tracks, {} warnings)",
                input.display(),
                report.output_path.display(),
                report.tracks_written,
                report.warnings
            ),
            Err(e) => log::error!("{}: {}", input.display(), e),
        }
        outcomes.push(FileOutcome { input, result });
    }
    outcomes
}
