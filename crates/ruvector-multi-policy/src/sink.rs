//! Metric sinks for front snapshots.
//!
//! The training loop hands one [`FrontRecord`] per iteration to a
//! [`MetricsSink`]. [`TracingSink`] is the default; [`JsonLinesSink`] keeps a
//! newline-delimited JSON file for offline analysis, and [`MemorySink`]
//! collects records behind a shared handle.

use crate::error::Result;
use crate::metrics::FrontMetrics;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Front snapshot after one training iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontRecord {
    /// Run label.
    pub experiment: String,
    /// Zero-based iteration index.
    pub iteration: usize,
    /// Environment steps consumed so far.
    pub global_step: u64,
    /// Whether `front` was obtained by evaluating the GPI policy.
    pub gpi: bool,
    /// The evaluated front.
    pub front: Vec<Vec<f64>>,
    /// Indicators over `front`.
    pub metrics: FrontMetrics,
}

/// Destination for front records.
pub trait MetricsSink: Send {
    /// Record one snapshot.
    fn emit(&mut self, record: &FrontRecord) -> Result<()>;

    /// Flush buffered output.
    fn flush(&mut self) -> Result<()>;
}

/// Emits each record as an `info` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl MetricsSink for TracingSink {
    fn emit(&mut self, record: &FrontRecord) -> Result<()> {
        let m = &record.metrics;
        info!(
            experiment = %record.experiment,
            iteration = record.iteration,
            global_step = record.global_step,
            gpi = record.gpi,
            hypervolume = m.hypervolume,
            sparsity = m.sparsity,
            cardinality = m.cardinality,
            expected_utility = m.expected_utility,
            igd = ?m.igd,
            maximum_utility_loss = ?m.maximum_utility_loss,
            "front metrics"
        );
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Newline-delimited JSON file, one record per line.
pub struct JsonLinesSink {
    writer: BufWriter<File>,
}

impl JsonLinesSink {
    /// Create (or truncate) the file at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl MetricsSink for JsonLinesSink {
    fn emit(&mut self, record: &FrontRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

impl Drop for JsonLinesSink {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

/// In-memory sink. Clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<FrontRecord>>>,
}

impl MemorySink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every record emitted so far.
    pub fn records(&self) -> Vec<FrontRecord> {
        self.records.lock().clone()
    }

    /// Number of records emitted so far.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether nothing was emitted.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl MetricsSink for MemorySink {
    fn emit(&mut self, record: &FrontRecord) -> Result<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Compute front metrics and forward the snapshot to `sink`.
#[allow(clippy::too_many_arguments)]
pub fn emit_metrics(
    sink: &mut dyn MetricsSink,
    experiment: &str,
    iteration: usize,
    global_step: u64,
    gpi: bool,
    front: Vec<Vec<f64>>,
    reference_point: &[f64],
    eval_weights: &[Vec<f64>],
    known_front: Option<&[Vec<f64>]>,
) -> Result<FrontMetrics> {
    let metrics = FrontMetrics::compute(&front, reference_point, eval_weights, known_front)?;
    let record = FrontRecord {
        experiment: experiment.to_string(),
        iteration,
        global_step,
        gpi,
        front,
        metrics: metrics.clone(),
    };
    sink.emit(&record)?;
    Ok(metrics)
}
