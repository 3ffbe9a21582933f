//! Per-stage latency and size samples for one harness run.

use serde::Serialize;
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Pipeline stages that record a sample on every invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    InitializeTemplate,
    AddImage,
    FinalizeTemplate,
    ReadImage,
    FreeImage,
    Verify,
    TemplateSize,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::InitializeTemplate,
        Stage::AddImage,
        Stage::FinalizeTemplate,
        Stage::ReadImage,
        Stage::FreeImage,
        Stage::Verify,
        Stage::TemplateSize,
    ];

    fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::InitializeTemplate => "initialize_template",
            Stage::AddImage => "add_image",
            Stage::FinalizeTemplate => "finalize_template",
            Stage::ReadImage => "read_image",
            Stage::FreeImage => "free_image",
            Stage::Verify => "verify",
            Stage::TemplateSize => "template_size",
        }
    }

    /// Unit of the recorded samples: milliseconds, or kilobytes for sizes.
    pub fn unit(self) -> &'static str {
        match self {
            Stage::TemplateSize => "KB",
            _ => "ms",
        }
    }
}

/// Count, mean and population standard deviation of one stage's samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StageSummary {
    pub stage: Stage,
    pub count: usize,
    /// NaN when `count == 0` (serialized as `null`).
    pub mean: f64,
    pub stddev: f64,
}

impl StageSummary {
    pub fn from_samples(stage: Stage, samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self {
                stage,
                count: 0,
                mean: f64::NAN,
                stddev: f64::NAN,
            };
        }
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        Self {
            stage,
            count: samples.len(),
            mean,
            stddev: variance.sqrt(),
        }
    }
}

/// Append-only sample lists, one per [`Stage`].
///
/// Shared by reference between the enrollment and matrix passes of a run.
/// Appends are serialized internally, so a `&Metrics` may cross threads.
#[derive(Debug, Default)]
pub struct Metrics {
    samples: Mutex<[Vec<f64>; 7]>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, [Vec<f64>; 7]> {
        self.samples.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, stage: Stage, value: f64) {
        self.lock()[stage.index()].push(value);
    }

    /// Run `f` and record its wall time in milliseconds, whatever it returns.
    pub fn time<T>(&self, stage: Stage, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.record(stage, start.elapsed().as_secs_f64() * 1000.0);
        out
    }

    pub fn samples(&self, stage: Stage) -> Vec<f64> {
        self.lock()[stage.index()].clone()
    }

    pub fn summary(&self, stage: Stage) -> StageSummary {
        StageSummary::from_samples(stage, &self.lock()[stage.index()])
    }

    pub fn summaries(&self) -> Vec<StageSummary> {
        let samples = self.lock();
        Stage::ALL
            .iter()
            .map(|&stage| StageSummary::from_samples(stage, &samples[stage.index()]))
            .collect()
    }

    /// Render a fixed-column table of every stage that has samples.
    pub fn write_summary<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(
            out,
            "{:<20} {:>8} {:>12} {:>12}  {}",
            "Stage", "Count", "Mean", "StdDev", "Unit"
        )?;
        for summary in self.summaries().iter().filter(|s| s.count > 0) {
            writeln!(
                out,
                "{:<20} {:>8} {:>12.3} {:>12.3}  {}",
                summary.stage.label(),
                summary.count,
                summary.mean,
                summary.stddev,
                summary.stage.unit()
            )?;
        }
        Ok(())
    }

    pub fn print_summary(&self) -> io::Result<()> {
        self.write_summary(&mut io::stdout().lock())
    }

    /// All seven stage summaries as a JSON array.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.summaries())
    }
}
