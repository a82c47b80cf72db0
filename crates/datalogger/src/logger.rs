//! DataLogger - records the shared sensor store to CSV files
//!
//! Idle --toggle-recording--> Recording --toggle-recording--> Idle
//!
//! One cycle:
//! 1. while recording, append a row when the sample counter moved
//! 2. apply pending commands from the inbox
//! 3. emit the logger heartbeat when due

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use contracts::{
    Clock, Command, ControlMessage, LoggerSettings, SensorId, SensorStore, StatusKind,
    StatusReport,
};
use control_bus::{Inbox, OutboundSender};
use tracing::{debug, error, info, instrument, trace};

use crate::error::{LoggerError, Result};
use crate::file_name::next_log_file_name;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggerOutcome {
    Continue,
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub dir: PathBuf,
    pub prefix: String,
    pub suffix: String,
    pub heartbeat_interval: Duration,
    /// Sleep between cycles while recording
    pub active_interval: Duration,
    /// Sleep between cycles while idle
    pub idle_interval: Duration,
}

impl LoggerConfig {
    pub fn from_settings(settings: &LoggerSettings) -> Self {
        Self {
            dir: settings.dir.clone(),
            prefix: settings.prefix.clone(),
            suffix: settings.suffix.clone(),
            heartbeat_interval: settings.heartbeat_interval(),
            active_interval: settings.active_interval(),
            idle_interval: settings.idle_interval(),
        }
    }
}

struct Recording {
    writer: BufWriter<File>,
    path: PathBuf,
    file_name: String,
    sensor_ids: Vec<SensorId>,
    started: Instant,
    last_counter: Option<u64>,
    rows: u64,
}

impl Recording {
    fn write_header(&mut self) -> io::Result<()> {
        let mut header = String::from("Counter,Time");
        for id in &self.sensor_ids {
            header.push(',');
            header.push_str(id);
        }
        header.push('\n');
        self.writer.write_all(header.as_bytes())
    }

    /// Flush and report the file size in megabytes
    fn file_size_mb(&mut self) -> io::Result<f64> {
        self.writer.flush()?;
        let len = fs::metadata(&self.path)?.len();
        Ok(len as f64 / BYTES_PER_MB)
    }
}

enum LoggerState {
    Idle,
    Recording(Box<Recording>),
}

pub struct DataLogger {
    config: LoggerConfig,
    store: Arc<dyn SensorStore>,
    outbound: OutboundSender,
    inbox: Inbox,
    clock: Arc<dyn Clock>,
    state: LoggerState,
    heartbeat_deadline: Instant,
}

impl DataLogger {
    pub fn new(
        config: LoggerConfig,
        store: Arc<dyn SensorStore>,
        outbound: OutboundSender,
        inbox: Inbox,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let heartbeat_deadline = clock.now() + config.heartbeat_interval;
        info!(dir = %config.dir.display(), "Data logger initialised");
        observability::record_logger_recording(false);
        Self {
            config,
            store,
            outbound,
            inbox,
            clock,
            state: LoggerState::Idle,
            heartbeat_deadline,
        }
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, LoggerState::Recording(_))
    }

    /// Name of the file being written, if recording
    pub fn file_name(&self) -> Option<&str> {
        match &self.state {
            LoggerState::Recording(rec) => Some(rec.file_name.as_str()),
            LoggerState::Idle => None,
        }
    }

    /// Path of the file being written, if recording
    pub fn file_path(&self) -> Option<&PathBuf> {
        match &self.state {
            LoggerState::Recording(rec) => Some(&rec.path),
            LoggerState::Idle => None,
        }
    }

    pub fn sleep_interval(&self) -> Duration {
        if self.is_recording() {
            self.config.active_interval
        } else {
            self.config.idle_interval
        }
    }

    pub fn run_cycle(&mut self) -> LoggerOutcome {
        if let Err(e) = self.write_row() {
            error!(error = %e, "Unable to write log row, stopping recording");
            observability::record_logger_error(e.stage());
            self.state = LoggerState::Idle;
            observability::record_logger_recording(false);
        }

        for message in self.inbox.drain() {
            if self.handle_command(&message) == LoggerOutcome::Shutdown {
                self.stop_recording();
                return LoggerOutcome::Shutdown;
            }
        }

        if self.clock.now() >= self.heartbeat_deadline {
            self.heartbeat();
            self.heartbeat_deadline = self.clock.now() + self.config.heartbeat_interval;
        }

        LoggerOutcome::Continue
    }

    fn handle_command(&mut self, message: &ControlMessage) -> LoggerOutcome {
        debug!(command = ?message.command(), "Got a control message");
        match message.command() {
            Command::Shutdown => {
                info!("Shutting down data logger");
                return LoggerOutcome::Shutdown;
            }
            Command::ToggleRecording => {
                self.toggle_recording();
            }
            other => debug!(command = ?other, "Command not handled by data logger"),
        }
        LoggerOutcome::Continue
    }

    /// Start when idle, stop when recording; returns whether recording afterwards
    pub fn toggle_recording(&mut self) -> bool {
        if self.is_recording() {
            self.stop_recording();
        } else if let Err(e) = self.start_recording() {
            error!(error = %e, "Unable to open logfile");
            observability::record_logger_error(e.stage());
        }
        self.is_recording()
    }

    /// Open the next log file and write its header
    #[instrument(name = "logger_start_recording", skip(self), fields(dir = %self.config.dir.display()))]
    pub fn start_recording(&mut self) -> Result<()> {
        if self.is_recording() {
            return Ok(());
        }

        let mut sensor_ids = self.store.sensor_ids();
        sensor_ids.sort();
        let file_name =
            next_log_file_name(&self.config.dir, &self.config.prefix, &self.config.suffix)?;
        let path = self.config.dir.join(&file_name);
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| LoggerError::open(&path, e))?;

        let mut recording = Recording {
            writer: BufWriter::new(file),
            path,
            file_name,
            sensor_ids,
            started: self.clock.now(),
            last_counter: None,
            rows: 0,
        };
        recording
            .write_header()
            .map_err(|e| LoggerError::write(&recording.path, e))?;

        info!(
            file = %recording.file_name,
            sensors = recording.sensor_ids.len(),
            "Start logging"
        );
        self.state = LoggerState::Recording(Box::new(recording));
        observability::record_logger_recording(true);
        Ok(())
    }

    /// Flush and close the current file; no-op when idle
    pub fn stop_recording(&mut self) {
        let LoggerState::Recording(mut recording) =
            std::mem::replace(&mut self.state, LoggerState::Idle)
        else {
            return;
        };
        if let Err(e) = recording.writer.flush() {
            error!(file = %recording.file_name, error = %e, "Unable to flush logfile");
            observability::record_logger_error("flush");
        }
        info!(file = %recording.file_name, rows = recording.rows, "Stop logging");
        observability::record_logger_recording(false);
    }

    /// Append one row when the sample counter moved; returns whether a row was written
    pub fn write_row(&mut self) -> Result<bool> {
        let LoggerState::Recording(recording) = &mut self.state else {
            return Ok(false);
        };

        let counter = self.store.counter();
        if recording.last_counter == Some(counter) {
            return Ok(false);
        }

        let elapsed = self
            .clock
            .now()
            .saturating_duration_since(recording.started)
            .as_secs_f64();
        let mut line = format!("{counter},{elapsed:.3}");
        for id in &recording.sensor_ids {
            match self.store.get_data(id) {
                Some(stored) => line.push_str(&format!(",{}", stored.value)),
                None => line.push_str(",0"),
            }
        }
        line.push('\n');

        recording
            .writer
            .write_all(line.as_bytes())
            .map_err(|e| LoggerError::write(&recording.path, e))?;
        recording.last_counter = Some(counter);
        recording.rows += 1;
        trace!(counter, "Wrote log row");
        observability::record_logger_row();
        Ok(true)
    }

    /// Current logger status, flushing the open file to measure it
    pub fn status_report(&mut self) -> StatusReport {
        match &mut self.state {
            LoggerState::Idle => StatusReport::new(StatusKind::Logger, false, "Logger stopped."),
            LoggerState::Recording(recording) => {
                let mut report = StatusReport::new(StatusKind::Logger, true, "Logger started.");
                report.file_name = Some(recording.file_name.clone());
                match recording.file_size_mb() {
                    Ok(size_mb) => {
                        observability::record_logger_file_size_mb(size_mb);
                        report.file_size_mb = Some(size_mb);
                    }
                    Err(e) => {
                        debug!(file = %recording.file_name, error = %e, "Unable to stat logfile")
                    }
                }
                report
            }
        }
    }

    pub fn heartbeat(&mut self) {
        let report = self.status_report();
        trace!(recording = report.ok, "Sending logger heartbeat");
        self.outbound.status(report);
    }

    /// Cycle until shutdown
    pub fn run(mut self) {
        info!("Data logger running");
        loop {
            match self.run_cycle() {
                LoggerOutcome::Shutdown => break,
                LoggerOutcome::Continue => thread::sleep(self.sleep_interval()),
            }
        }
        info!("Data logger stopped");
    }

    /// Run on a dedicated thread
    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("data-logger".to_string())
            .spawn(move || self.run())
    }
}
