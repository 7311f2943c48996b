//! Real-time per-layer collection with asynchronous analysis.
//!
//! The acquisition loop feeds samples into a per-layer buffer; finishing
//! a layer freezes the buffer into a [`SampleRecord`] and hands it to a
//! single background worker over a bounded queue. The print loop never
//! blocks on analysis: when the queue is full the oldest pending job is
//! dropped and a diagnostic counter incremented, because liveness of
//! acquisition outranks completeness of analysis. Metrics reach the sink
//! in layer-finish order.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};
use vatpeel_core::{
    CoreError, CoreResult, LayerBoundaries, LayerMetadata, LayerMetrics, PipelineConfig, Sample,
    SampleRecord,
};
use vatpeel_signal::MetricsCalculator;

/// Callback receiving finished metrics on the worker thread.
pub type MetricsSink = Box<dyn Fn(LayerMetrics) + Send + 'static>;

/// Configuration for the live collector.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Analysis pipeline configuration
    pub pipeline: PipelineConfig,
    /// Nominal acquisition rate (Hz)
    pub nominal_rate_hz: f64,
    /// Per-layer buffer is sized for this duration (s)
    pub max_layer_duration_s: f64,
    /// Bounded analysis queue depth (layers)
    pub queue_capacity: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            nominal_rate_hz: 50.0,
            max_layer_duration_s: 120.0,
            queue_capacity: 16,
        }
    }
}

/// Monotonic overflow counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectorDiagnostics {
    /// Samples evicted from a full per-layer buffer
    pub dropped_samples: u64,
    /// Pending analysis jobs evicted from a full queue
    pub dropped_jobs: u64,
}

enum Job {
    Analyze(Box<LayerJob>),
    Shutdown,
}

struct LayerJob {
    record: SampleRecord,
    layer_number: i64,
    metadata: LayerMetadata,
}

struct SharedQueue {
    jobs: Mutex<VecDeque<Job>>,
    ready: Condvar,
}

/// Per-layer sample collector with a background analysis worker.
///
/// Single-producer by design: the acquisition loop owns the collector and
/// calls [`add_sample`](Self::add_sample) from one thread. The snapshot
/// handed to the worker is exclusively owned by the worker.
pub struct LiveCollector {
    config: CollectorConfig,
    queue: Arc<SharedQueue>,
    worker: Option<JoinHandle<()>>,
    buffer: Vec<Sample>,
    buffer_capacity: usize,
    active_layer: Option<(i64, LayerMetadata)>,
    diagnostics: CollectorDiagnostics,
}

impl LiveCollector {
    /// Creates a collector and spawns its analysis worker.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the pipeline config is invalid
    /// or the worker thread cannot be spawned.
    pub fn new(config: CollectorConfig, sink: MetricsSink) -> CoreResult<Self> {
        let calculator = MetricsCalculator::new(config.pipeline.clone())?;
        let queue = Arc::new(SharedQueue {
            jobs: Mutex::new(VecDeque::new()),
            ready: Condvar::new(),
        });
        let worker_queue = Arc::clone(&queue);
        let worker = thread::Builder::new()
            .name("vatpeel-analysis".into())
            .spawn(move || worker_loop(&worker_queue, &calculator, &sink))
            .map_err(|e| {
                CoreError::configuration(format!("failed to spawn analysis worker: {e}"))
            })?;

        let buffer_capacity =
            ((config.max_layer_duration_s * config.nominal_rate_hz).ceil() as usize).max(64);
        Ok(Self {
            config,
            queue,
            worker: Some(worker),
            buffer: Vec::with_capacity(buffer_capacity),
            buffer_capacity,
            active_layer: None,
            diagnostics: CollectorDiagnostics::default(),
        })
    }

    /// Begins collecting a new layer, resetting the buffer.
    pub fn start_layer(&mut self, layer_number: i64, metadata: LayerMetadata) {
        if let Some((previous, _)) = &self.active_layer {
            warn!(previous, layer_number, "start_layer while a layer was active; discarding it");
        }
        self.buffer.clear();
        self.active_layer = Some((layer_number, metadata));
    }

    /// Appends one sample to the active layer; discarded when no layer is
    /// active. A full buffer evicts its oldest sample.
    pub fn add_sample(&mut self, time_s: f64, position_mm: f64, force_n: f64) {
        if self.active_layer.is_none() {
            return;
        }
        if self.buffer.len() >= self.buffer_capacity {
            self.buffer.remove(0);
            self.diagnostics.dropped_samples += 1;
        }
        self.buffer.push(Sample::new(time_s, position_mm, force_n));
    }

    /// Freezes the active buffer and queues it for analysis.
    ///
    /// # Errors
    ///
    /// Returns a structural error when the buffered samples have
    /// non-monotone timestamps (a sensor-clock bug upstream).
    pub fn finish_layer(&mut self) -> CoreResult<()> {
        let Some((layer_number, metadata)) = self.active_layer.take() else {
            warn!("finish_layer without an active layer");
            return Ok(());
        };
        if self.buffer.len() < 2 {
            warn!(layer_number, samples = self.buffer.len(), "layer too short; dropping");
            self.buffer.clear();
            return Ok(());
        }
        let record = SampleRecord::from_samples(&self.buffer, self.config.nominal_rate_hz)?;
        self.buffer.clear();
        self.enqueue(Job::Analyze(Box::new(LayerJob {
            record,
            layer_number,
            metadata,
        })));
        Ok(())
    }

    /// Stops the worker. With `discard = false` all pending jobs are
    /// analyzed first; with `discard = true` they are dropped. Returns
    /// once the worker has exited.
    pub fn shutdown(&mut self, discard: bool) {
        let Some(handle) = self.worker.take() else {
            return;
        };
        {
            let mut jobs = self.queue.jobs.lock().expect("analysis queue poisoned");
            if discard {
                let pending = jobs.len() as u64;
                jobs.clear();
                self.diagnostics.dropped_jobs += pending;
            }
            jobs.push_back(Job::Shutdown);
            self.queue.ready.notify_one();
        }
        if handle.join().is_err() {
            warn!("analysis worker panicked");
        }
    }

    /// Current overflow counters.
    #[must_use]
    pub fn diagnostics(&self) -> CollectorDiagnostics {
        self.diagnostics
    }

    /// Whether a layer is currently being collected.
    #[must_use]
    pub fn is_collecting(&self) -> bool {
        self.active_layer.is_some()
    }

    /// Samples buffered for the active layer.
    #[must_use]
    pub fn buffered_samples(&self) -> usize {
        self.buffer.len()
    }

    fn enqueue(&mut self, job: Job) {
        let mut jobs = self.queue.jobs.lock().expect("analysis queue poisoned");
        while jobs.len() >= self.config.queue_capacity {
            if jobs.pop_front().is_some() {
                self.diagnostics.dropped_jobs += 1;
                warn!("analysis queue full; dropped oldest pending layer");
            }
        }
        jobs.push_back(job);
        self.queue.ready.notify_one();
    }
}

impl Drop for LiveCollector {
    fn drop(&mut self) {
        self.shutdown(true);
    }
}

fn worker_loop(queue: &SharedQueue, calculator: &MetricsCalculator, sink: &MetricsSink) {
    loop {
        let job = {
            let mut jobs = queue.jobs.lock().expect("analysis queue poisoned");
            loop {
                if let Some(job) = jobs.pop_front() {
                    break job;
                }
                jobs = queue.ready.wait(jobs).expect("analysis queue poisoned");
            }
        };
        match job {
            Job::Analyze(layer) => {
                let bounds = match LayerBoundaries::whole(layer.record.len()) {
                    Ok(bounds) => bounds,
                    Err(err) => {
                        warn!(%err, layer = layer.layer_number, "skipping malformed layer buffer");
                        continue;
                    }
                };
                match calculator.analyze(
                    &layer.record,
                    &bounds,
                    layer.layer_number,
                    &layer.metadata,
                ) {
                    Ok(metrics) => sink(metrics),
                    Err(err) => {
                        // live mode drops the one bad layer and keeps serving
                        warn!(%err, layer = layer.layer_number, "analysis failed; layer dropped");
                    }
                }
            }
            Job::Shutdown => {
                debug!("analysis worker exiting");
                break;
            }
        }
    }
}
