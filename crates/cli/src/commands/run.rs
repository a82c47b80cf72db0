//! `run` command implementation.

use std::sync::Arc;
use std::thread::JoinHandle;

use acquisition::{AcquisitionConfig, SensorAcquisitionLoop};
use anyhow::{Context, Result};
use contracts::{
    Clock, Command, Destination, MonotonicClock, SensorStore, Settings, SharedSensorStore,
    StatusKind,
};
use control_bus::{outbound, ControlBusBuilder, MonitorSnapshot, StatusMonitor};
use datalogger::{DataLogger, LoggerConfig};
use observability::CycleSummary;
use sensors::BackendFactory;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::console::{forward_commands, spawn_stdin_reader, ConsoleExit};

/// Execute the `run` command
pub async fn run_telemetry(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let mut settings = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    apply_overrides(&mut settings, args);

    info!(
        sensors = settings.sensors.len(),
        ecu = settings.ecu.enabled,
        wideband = settings.wideband.enabled,
        demo = settings.demo.enabled,
        logger = settings.logger.enabled,
        "Configuration loaded"
    );

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let clock: Arc<dyn Clock> = Arc::new(MonotonicClock);
    let store = Arc::new(SharedSensorStore::new(settings.sensor_ids()));
    let (tx, rx) = outbound(settings.bus.outbound_capacity);

    let mut builder = ControlBusBuilder::new();
    let sensor_inbox = builder.register(Destination::SensorIo)?;
    let logger_inbox = if settings.logger.enabled {
        Some(builder.register(Destination::DataLogger)?)
    } else {
        None
    };
    let bus = builder.build();

    let factory = BackendFactory::new(settings.clone(), Arc::clone(&clock));
    let acquisition = SensorAcquisitionLoop::new(
        AcquisitionConfig::from_settings(&settings),
        factory.build_hardware(None),
        factory.demo_factory(),
        store.clone(),
        tx.clone(),
        sensor_inbox,
        Arc::clone(&clock),
    );
    let acquisition_thread = acquisition
        .spawn()
        .context("Failed to start sensor acquisition thread")?;

    let logger_thread = match logger_inbox {
        Some(inbox) => {
            let logger = DataLogger::new(
                LoggerConfig::from_settings(&settings.logger),
                store.clone(),
                tx.clone(),
                inbox,
                Arc::clone(&clock),
            );
            Some(logger.spawn().context("Failed to start data logger thread")?)
        }
        None => None,
    };
    // Component threads hold the remaining senders; the monitor ends with them
    drop(tx);

    let monitor = StatusMonitor::new(rx);
    let monitor_handle = monitor.handle();
    let monitor_task = monitor.spawn();

    if args.record {
        if settings.logger.enabled {
            bus.send(Command::ToggleRecording);
        } else {
            warn!("--record ignored, logger is disabled");
        }
    }

    let console_lines = if args.no_console {
        None
    } else {
        Some(spawn_stdin_reader().context("Failed to start console reader")?)
    };
    let console = {
        let bus = bus.clone();
        async move {
            let Some(lines) = console_lines else {
                return std::future::pending::<ConsoleExit>().await;
            };
            println!("Commands: d (demo), r (reset link), l (logging), q (quit)");
            match forward_commands(lines, bus).await {
                ConsoleExit::Quit => ConsoleExit::Quit,
                // Keep running headless until a signal arrives
                ConsoleExit::Closed => std::future::pending().await,
            }
        }
    };

    info!("Telemetry running");
    tokio::select! {
        _ = console => {
            info!("Stopping on console request");
        }
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, stopping...");
        }
    }

    let delivered = bus.send(Command::Shutdown);
    info!(delivered, "Shutdown broadcast");

    let summary = join_thread(acquisition_thread, "sensor-io")
        .await?
        .unwrap_or_default();
    if let Some(handle) = logger_thread {
        join_thread(handle, "data-logger").await?;
    }
    if let Err(e) = monitor_task.await {
        warn!(error = %e, "Status monitor task failed");
    }

    let bus_metrics = bus.metrics().snapshot();
    observability::record_queue(
        "control",
        bus_metrics.queue_len,
        bus_metrics.delivered,
        bus_metrics.dropped,
    );

    print_summary(&summary, &monitor_handle.snapshot(), store.counter());
    info!("PyCosworth finished");
    Ok(())
}

fn apply_overrides(settings: &mut Settings, args: &RunArgs) {
    if let Some(demo) = args.demo_override() {
        info!(demo, "Overriding demo mode from CLI");
        settings.demo.enabled = demo;
    }
    if let Some(ref dir) = args.log_dir {
        info!(dir = %dir.display(), "Overriding log directory from CLI");
        settings.logger.dir = dir.clone();
    }
}

/// Join a component thread without blocking the runtime
async fn join_thread<T: Send + 'static>(
    handle: JoinHandle<T>,
    name: &'static str,
) -> Result<Option<T>> {
    let joined = tokio::task::spawn_blocking(move || handle.join())
        .await
        .with_context(|| format!("Failed to join {name} thread"))?;
    match joined {
        Ok(value) => Ok(Some(value)),
        Err(_) => {
            warn!(thread = name, "Component thread panicked");
            Ok(None)
        }
    }
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn print_summary(summary: &CycleSummary, monitor: &MonitorSnapshot, counter: u64) {
    println!();
    print!("{summary}");
    println!("Final sample counter: {counter}");
    println!(
        "Outbound messages: {} data, {} status",
        monitor.data_messages, monitor.status_messages
    );
    for kind in [
        StatusKind::EcuLink,
        StatusKind::WidebandLink,
        StatusKind::DemoMode,
        StatusKind::Logger,
    ] {
        if let Some(report) = monitor.latest.get(&kind) {
            println!("  {:?}: {}", kind, report.description);
        }
    }
    println!();
}
