//! Input discovery and batch conversion.

use crate::convert::{convert_file, Conversion};
use crate::options::ConvertOptions;
use heic_core::file_scanner::FileScanner;
use heic_core::fs::output_path;
use heic_core::{Error, Result};
use heic_image::{DecoderRegistry, TargetEncoder};
use std::collections::hash_map::{Entry, HashMap};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Resolve a file or directory argument to the source files it names.
///
/// A single file must have a registered extension. Directories are walked
/// recursively; an empty directory yields an empty list.
pub fn collect_inputs(
    path: &Path,
    registry: &DecoderRegistry,
    skip_hidden: bool,
) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        return Err(Error::not_found(path));
    }

    if path.is_file() {
        return match registry.decoder_for(path) {
            Some(_) => Ok(vec![path.to_path_buf()]),
            None => Err(Error::unsupported_format(path, &registry.extensions())),
        };
    }

    FileScanner::new(path)
        .with_extensions(&registry.extensions())
        .skip_hidden(skip_hidden)
        .scan()
}

/// Outcome of one file in a batch.
#[derive(Debug)]
pub struct FileOutcome {
    /// Source file
    pub input: PathBuf,
    /// Conversion or the error that stopped it
    pub result: Result<Conversion>,
}

/// Outcomes of a batch, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Per-file outcomes
    pub outcomes: Vec<FileOutcome>,
    /// Wall time of the whole batch
    pub elapsed: Duration,
}

impl BatchReport {
    /// Number of files converted.
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    /// Number of files that failed.
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Total files attempted.
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Failed files with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (&Path, &Error)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.input.as_path(), e)))
    }

    /// Whether every file converted.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

/// For each input, the earlier input that already maps to the same output.
fn output_conflicts<'a>(inputs: &'a [PathBuf], extension: &str) -> Vec<Option<&'a Path>> {
    let mut claimed: HashMap<PathBuf, &Path> = HashMap::new();
    inputs
        .iter()
        .map(|input| match claimed.entry(output_path(input, extension)) {
            Entry::Occupied(first) => Some(*first.get()),
            Entry::Vacant(slot) => {
                slot.insert(input.as_path());
                None
            }
        })
        .collect()
}

/// Convert every input, continuing past failures.
///
/// Inputs that would overwrite the output of an earlier input fail without
/// being decoded. `on_done` is called once per file as it finishes, possibly
/// from several threads when `options.parallel` is set.
pub fn convert_batch<F>(
    inputs: &[PathBuf],
    registry: &DecoderRegistry,
    encoder: &dyn TargetEncoder,
    options: &ConvertOptions,
    on_done: F,
) -> BatchReport
where
    F: Fn(&FileOutcome) + Sync,
{
    let start = Instant::now();

    let conflicts = output_conflicts(inputs, encoder.extension());
    let jobs: Vec<(&PathBuf, Option<&Path>)> = inputs.iter().zip(conflicts).collect();

    let run = |&(input, conflict): &(&PathBuf, Option<&Path>)| {
        let result = match conflict {
            Some(first) => Err(Error::output_conflict(
                input,
                output_path(input, encoder.extension()),
                first,
            )),
            None => convert_file(input, registry, encoder, options),
        };
        let outcome = FileOutcome {
            input: input.clone(),
            result,
        };
        if let Err(e) = &outcome.result {
            warn!(path = %input.display(), code = %e.code, error = %e.message, "conversion failed");
        }
        on_done(&outcome);
        outcome
    };

    #[cfg(feature = "parallel")]
    let outcomes: Vec<FileOutcome> = if options.parallel {
        jobs.par_iter().map(run).collect()
    } else {
        jobs.iter().map(run).collect()
    };

    #[cfg(not(feature = "parallel"))]
    let outcomes: Vec<FileOutcome> = jobs.iter().map(run).collect();

    let report = BatchReport {
        outcomes,
        elapsed: start.elapsed(),
    };
    info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        elapsed_ms = report.elapsed.as_millis() as u64,
        "batch finished"
    );
    report
}
