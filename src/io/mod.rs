pub mod writer;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{error, info, warn};

use crate::correction::JoinPoints;
use crate::errors::{PrepError, Result};
use crate::loader::{read_spectrum, FitsLayout, SpectrumKind};

pub use writer::{write_csv, write_csv_to};

pub const DEFAULT_OUTPUT_SUFFIX: &str = "_processed";

#[derive(Debug, Clone)]
pub struct ProcessOptions {
    pub overwrite: bool,
    pub correct_txt_offsets: bool,
    pub joins: JoinPoints,
    pub layout: FitsLayout,
    pub output_suffix: String,
    /// Worker threads; `None` uses rayon's global pool.
    pub jobs: Option<usize>,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            overwrite: false,
            correct_txt_offsets: true,
            joins: JoinPoints::default(),
            layout: FitsLayout::default(),
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
            jobs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Converted { output: PathBuf, rows: usize },
    SkippedExisting { output: PathBuf },
    SkippedUnrecognized,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub input: PathBuf,
    pub outcome: FileOutcome,
}

#[derive(Debug, Clone)]
pub struct ProcessReport {
    pub output_dir: PathBuf,
    pub files: Vec<FileReport>,
}

impl ProcessReport {
    fn count(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|f| pred(&f.outcome)).count()
    }

    pub fn converted(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Converted { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| {
            matches!(
                o,
                FileOutcome::SkippedExisting { .. } | FileOutcome::SkippedUnrecognized
            )
        })
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Failed { .. }))
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }
}

/// `<parent>/<name><suffix>` for an input folder `<parent>/<name>`.
pub fn output_dir_for(input_dir: &Path, suffix: &str) -> Result<PathBuf> {
    let resolved;
    let dir = if input_dir.file_name().is_some() {
        input_dir
    } else {
        resolved = input_dir
            .canonicalize()
            .map_err(|e| PrepError::io("canonicalize", e).with_context("path", input_dir.display().to_string()))?;
        resolved.as_path()
    };
    let name = dir.file_name().ok_or_else(|| {
        PrepError::validation("input folder has no name").with_context("path", dir.display().to_string())
    })?;
    let mut out_name = name.to_os_string();
    out_name.push(suffix);
    Ok(dir.parent().unwrap_or_else(|| Path::new("")).join(out_name))
}

/// `<output_dir>/<stem>.csv`; the stem drops only the last extension.
pub fn output_path_for(input: &Path, output_dir: &Path) -> Option<PathBuf> {
    let stem = input.file_stem()?;
    let mut name = stem.to_os_string();
    name.push(".csv");
    Some(output_dir.join(name))
}

#[derive(Debug)]
enum Plan {
    Convert { kind: SpectrumKind, output: PathBuf },
    Existing(PathBuf),
    Unrecognized,
    Collision(PathBuf),
}

fn sorted_entries(input_dir: &Path) -> Result<Vec<PathBuf>> {
    let with_dir = |e: PrepError| {
        e.with_context("operation", "preprocess_folder")
            .with_context("path", input_dir.display().to_string())
    };
    let mut paths = fs::read_dir(input_dir)
        .map_err(|e| with_dir(PrepError::io("read_dir", e)))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| with_dir(PrepError::io("read_dir", e)))?;
    paths.sort();
    Ok(paths)
}

fn plan_files(paths: Vec<PathBuf>, output_dir: &Path, overwrite: bool) -> Vec<(PathBuf, Plan)> {
    let mut claimed = HashSet::new();
    paths
        .into_iter()
        .map(|path| {
            let kind = path
                .is_file()
                .then(|| SpectrumKind::from_path(&path))
                .flatten();
            let plan = match (kind, output_path_for(&path, output_dir)) {
                (Some(kind), Some(output)) => {
                    if !claimed.insert(output.clone()) {
                        Plan::Collision(output)
                    } else if output.exists() && !overwrite {
                        Plan::Existing(output)
                    } else {
                        Plan::Convert { kind, output }
                    }
                }
                _ => Plan::Unrecognized,
            };
            (path, plan)
        })
        .collect()
}

fn execute(input: PathBuf, plan: Plan, options: &ProcessOptions) -> FileReport {
    let file = input.display().to_string();
    let outcome = match plan {
        Plan::Unrecognized => {
            warn!(file = %file, "skipping file with unrecognized suffix");
            FileOutcome::SkippedUnrecognized
        }
        Plan::Existing(output) => {
            warn!(
                file = %file,
                output = %output.display(),
                "output already exists, not overwriting (use --overwrite)"
            );
            FileOutcome::SkippedExisting { output }
        }
        Plan::Collision(output) => {
            let error = format!(
                "output {} is already produced by another input in this folder",
                output.display()
            );
            error!(file = %file, "{}", error);
            FileOutcome::Failed { error }
        }
        Plan::Convert { kind, output } => {
            let correction = options.correct_txt_offsets.then_some(&options.joins);
            let converted = read_spectrum(&input, kind, &options.layout, correction)
                .and_then(|df| write_csv(&df, &output).map(|_| df.height()));
            match converted {
                Ok(rows) => {
                    info!(file = %file, output = %output.display(), rows, "converted");
                    FileOutcome::Converted { output, rows }
                }
                Err(e) => {
                    error!(file = %file, error = %e, "failed to convert");
                    FileOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            }
        }
    };
    FileReport { input, outcome }
}

/// Converts every `.fits` and `.txt` file directly inside `input_dir` into a
/// CSV in the sibling output folder.
///
/// Per-file failures are logged and recorded in the report; only problems
/// with the folders themselves are returned as errors.
pub fn preprocess_folder(input_dir: &Path, options: &ProcessOptions) -> Result<ProcessReport> {
    if !input_dir.exists() {
        return Err(
            PrepError::not_found(format!("Directory not found: {}", input_dir.display()))
                .with_context("operation", "preprocess_folder"),
        );
    }
    if !input_dir.is_dir() {
        return Err(
            PrepError::validation(format!("Not a directory: {}", input_dir.display()))
                .with_context("operation", "preprocess_folder"),
        );
    }

    let output_dir = output_dir_for(input_dir, &options.output_suffix)?;
    fs::create_dir_all(&output_dir).map_err(|e| {
        PrepError::io("create_dir", e).with_context("path", output_dir.display().to_string())
    })?;
    info!(input = %input_dir.display(), output = %output_dir.display(), "processing folder");

    let plans = plan_files(sorted_entries(input_dir)?, &output_dir, options.overwrite);
    let run = || {
        plans
            .into_par_iter()
            .map(|(input, plan)| execute(input, plan, options))
            .collect::<Vec<_>>()
    };
    let files = match options.jobs {
        Some(n) => rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build()
            .map_err(|e| PrepError::validation(format!("cannot start {n} workers: {e}")))?
            .install(run),
        None => run(),
    };

    let report = ProcessReport { output_dir, files };
    info!(
        converted = report.converted(),
        skipped = report.skipped(),
        failed = report.failed(),
        "folder done"
    );
    Ok(report)
}
