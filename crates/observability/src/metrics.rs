//! Telemetry metrics
//!
//! Thin wrappers over the `metrics` facade plus an in-memory aggregator
//! used for the end-of-run summary.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use metrics::{counter, gauge, histogram};

/// Record one acquisition cycle and how many readings it published
pub fn record_cycle(readings: usize, elapsed: Duration) {
    let productive = if readings > 0 { "true" } else { "false" };
    counter!("pycosworth_acquisition_cycles_total", "productive" => productive).increment(1);
    histogram!("pycosworth_acquisition_cycle_ms").record(elapsed.as_secs_f64() * 1000.0);
    gauge!("pycosworth_acquisition_readings_per_cycle").set(readings as f64);
}

pub fn record_sample_counter(counter: u64) {
    gauge!("pycosworth_sample_counter").set(counter as f64);
}

/// Published reading, with the acquisition time of the source
pub fn record_reading(sensor_id: &str, acquisition_ms: f64) {
    counter!(
        "pycosworth_readings_published_total",
        "sensor_id" => sensor_id.to_string()
    )
    .increment(1);
    histogram!(
        "pycosworth_acquisition_ms",
        "sensor_id" => sensor_id.to_string()
    )
    .record(acquisition_ms);
}

/// Connectivity of a monitored hardware link (1 = up)
pub fn record_link_status(link: &str, ok: bool) {
    gauge!("pycosworth_link_up", "link" => link.to_string()).set(if ok { 1.0 } else { 0.0 });
}

pub fn record_link_reconnect(link: &str, ok: bool) {
    let status = if ok { "success" } else { "failure" };
    counter!(
        "pycosworth_link_reconnects_total",
        "link" => link.to_string(),
        "status" => status
    )
    .increment(1);
}

pub fn record_demo_mode(enabled: bool) {
    gauge!("pycosworth_demo_mode").set(if enabled { 1.0 } else { 0.0 });
}

pub fn record_logger_recording(recording: bool) {
    gauge!("pycosworth_logger_recording").set(if recording { 1.0 } else { 0.0 });
}

pub fn record_logger_row() {
    counter!("pycosworth_logger_rows_total").increment(1);
}

pub fn record_logger_file_size_mb(size_mb: f64) {
    gauge!("pycosworth_logger_file_size_mb").set(size_mb);
}

pub fn record_logger_error(stage: &'static str) {
    counter!("pycosworth_logger_errors_total", "stage" => stage).increment(1);
}

/// Queue depth and delivery counters of a bus or outbound queue
pub fn record_queue(queue: &str, queue_len: usize, delivered: u64, dropped: u64) {
    gauge!("pycosworth_queue_len", "queue" => queue.to_string()).set(queue_len as f64);
    gauge!("pycosworth_queue_delivered", "queue" => queue.to_string()).set(delivered as f64);
    gauge!("pycosworth_queue_dropped", "queue" => queue.to_string()).set(dropped as f64);
}

/// Aggregates acquisition cycles in memory for the run summary
#[derive(Debug, Clone, Default)]
pub struct CycleStatsAggregator {
    pub total_cycles: u64,
    /// Cycles that published at least one reading
    pub productive_cycles: u64,
    pub total_readings: u64,
    pub cycle_ms: RunningStats,
    pub readings_by_sensor: BTreeMap<String, u64>,
}

impl CycleStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update<'a, I>(&mut self, published: I, elapsed: Duration)
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.total_cycles += 1;
        let mut readings = 0u64;
        for sensor_id in published {
            readings += 1;
            *self
                .readings_by_sensor
                .entry(sensor_id.to_string())
                .or_insert(0) += 1;
        }
        if readings > 0 {
            self.productive_cycles += 1;
        }
        self.total_readings += readings;
        self.cycle_ms.push(elapsed.as_secs_f64() * 1000.0);
    }

    pub fn summary(&self) -> CycleSummary {
        CycleSummary {
            total_cycles: self.total_cycles,
            productive_cycles: self.productive_cycles,
            total_readings: self.total_readings,
            productive_rate: if self.total_cycles > 0 {
                self.productive_cycles as f64 / self.total_cycles as f64 * 100.0
            } else {
                0.0
            },
            cycle_ms: StatsSummary::from(&self.cycle_ms),
            readings_by_sensor: self.readings_by_sensor.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Default)]
pub struct CycleSummary {
    pub total_cycles: u64,
    pub productive_cycles: u64,
    pub total_readings: u64,
    pub productive_rate: f64,
    pub cycle_ms: StatsSummary,
    pub readings_by_sensor: BTreeMap<String, u64>,
}

impl fmt::Display for CycleSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Acquisition Summary ===")?;
        writeln!(f, "Cycles: {}", self.total_cycles)?;
        writeln!(
            f,
            "Productive cycles: {} ({:.2}%)",
            self.productive_cycles, self.productive_rate
        )?;
        writeln!(f, "Readings published: {}", self.total_readings)?;
        writeln!(f, "Cycle time (ms): {}", self.cycle_ms)?;

        if !self.readings_by_sensor.is_empty() {
            writeln!(f, "Readings per sensor:")?;
            for (sensor, count) in &self.readings_by_sensor {
                writeln!(f, "  {}: {}", sensor, count)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 0 {
            return write!(f, "N/A");
        }
        write!(
            f,
            "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
            self.min, self.max, self.mean, self.std_dev, self.count
        )
    }
}

/// Online mean and variance (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
