//! Parallel processing of many recordings.

use std::fmt;
use std::path::Path;

use log::{info, warn};
use rayon::prelude::*;

use crate::io::{load_recording, RecordingFiles};
use crate::pipeline::{Pipeline, PipelineConfig, Recording, RecordingReport};
use crate::{Error, Result};

/// A recording that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecording {
    pub name: String,
    pub reason: String,
}

/// Result for one input, processed or skipped.
#[derive(Debug, Clone)]
pub enum BatchEntry {
    Processed(RecordingReport),
    Skipped(SkippedRecording),
}

/// Results of a batch run in input order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub entries: Vec<BatchEntry>,
}

impl BatchReport {
    pub fn processed(&self) -> impl Iterator<Item = &RecordingReport> {
        self.entries.iter().filter_map(|e| match e {
            BatchEntry::Processed(report) => Some(report),
            BatchEntry::Skipped(_) => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = &SkippedRecording> {
        self.entries.iter().filter_map(|e| match e {
            BatchEntry::Skipped(skipped) => Some(skipped),
            BatchEntry::Processed(_) => None,
        })
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            processed: self.processed().count(),
            skipped: self.skipped().cloned().collect(),
        }
    }
}

/// Processed and skipped counts of a batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub skipped: Vec<SkippedRecording>,
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} processed, {} skipped", self.processed, self.skipped.len())?;
        for s in &self.skipped {
            write!(f, "\n  {}: {}", s.name, s.reason)?;
        }
        Ok(())
    }
}

/// Runs the pipeline over many recordings on a worker pool.
///
/// Each worker loads and processes one recording at a time. A failing
/// recording is reported as skipped and never affects the others.
pub struct BatchRunner {
    pipeline: Pipeline,
    pool: rayon::ThreadPool,
}

impl BatchRunner {
    /// Create a runner with `config.workers` threads.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let workers = config.workers;
        let pipeline = Pipeline::new(config)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to start {} workers: {}", workers, e)))?;

        Ok(Self { pipeline, pool })
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Load and process every input.
    ///
    /// # Arguments
    /// * `inputs` - One entry per recording; its path form names skipped entries
    /// * `load` - Turns an input into a recording
    pub fn run<I, F>(&self, inputs: &[I], load: F) -> BatchReport
    where
        I: AsRef<Path> + Sync,
        F: Fn(&I) -> Result<Recording> + Sync,
    {
        let entries: Vec<BatchEntry> = self.pool.install(|| {
            inputs
                .par_iter()
                .map(|input| match load(input).and_then(|rec| self.pipeline.process(rec)) {
                    Ok(report) => BatchEntry::Processed(report),
                    Err(e) => {
                        let name = input.as_ref().display().to_string();
                        warn!("skipping {}: {}", name, e);
                        BatchEntry::Skipped(SkippedRecording {
                            name,
                            reason: e.to_string(),
                        })
                    }
                })
                .collect()
        });

        let report = BatchReport { entries };
        info!("batch finished: {}", report.summary());
        report
    }

    /// Process recordings stored as CSV files.
    pub fn run_files(&self, inputs: &[RecordingFiles]) -> BatchReport {
        self.run(inputs, load_recording)
    }
}
