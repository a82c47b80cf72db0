//! Console command forwarding
//!
//! One command per line: `d` toggle demo, `r` reset link, `l` toggle
//! recording, `q` quit.

use std::io::{self, BufRead};
use std::thread;

use contracts::Command;
use control_bus::ControlBus;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleExit {
    /// User asked to quit
    Quit,
    /// Input closed (EOF or read error)
    Closed,
}

pub fn parse_command(line: &str) -> Option<Command> {
    match line.trim().to_ascii_lowercase().as_str() {
        "d" => Some(Command::ToggleDemo),
        "r" => Some(Command::ResetLink),
        "l" => Some(Command::ToggleRecording),
        "q" => Some(Command::Shutdown),
        _ => None,
    }
}

/// Read stdin lines on a detached thread so a pending read never blocks
/// runtime shutdown.
pub fn spawn_stdin_reader() -> io::Result<mpsc::UnboundedReceiver<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    thread::Builder::new()
        .name("console".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Console read failed");
                        break;
                    }
                }
            }
        })?;
    Ok(rx)
}

/// Forward console commands onto the bus until quit or end of input.
///
/// `q` is reported to the caller instead of being published.
pub async fn forward_commands(
    mut lines: mpsc::UnboundedReceiver<String>,
    bus: ControlBus,
) -> ConsoleExit {
    loop {
        let Some(line) = lines.recv().await else {
            debug!("Console input closed");
            return ConsoleExit::Closed;
        };

        match parse_command(&line) {
            Some(Command::Shutdown) => {
                info!("Quit requested from console");
                return ConsoleExit::Quit;
            }
            Some(command) => {
                let delivered = bus.send(command);
                info!(command = ?command, delivered, "Console command sent");
            }
            None if line.trim().is_empty() => {}
            None => {
                println!("Unknown command '{}'. Use d (demo), r (reset link), l (logging), q (quit)", line.trim());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Destination;
    use control_bus::ControlBusBuilder;

    fn lines(input: &[&str]) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        for line in input {
            tx.send(line.to_string()).unwrap();
        }
        rx
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("d"), Some(Command::ToggleDemo));
        assert_eq!(parse_command(" R \n"), Some(Command::ResetLink));
        assert_eq!(parse_command("l"), Some(Command::ToggleRecording));
        assert_eq!(parse_command("q"), Some(Command::Shutdown));
        assert_eq!(parse_command("x"), None);
    }

    #[tokio::test]
    async fn test_forward_until_quit() {
        let mut builder = ControlBusBuilder::new();
        let sensor_io = builder.register(Destination::SensorIo).unwrap();
        let logger = builder.register(Destination::DataLogger).unwrap();
        let bus = builder.build();

        let input = lines(&["d", "", "l", "x", "q", "r"]);
        assert_eq!(forward_commands(input, bus).await, ConsoleExit::Quit);

        let commands: Vec<Command> = sensor_io.drain().iter().map(|m| m.command()).collect();
        assert_eq!(commands, vec![Command::ToggleDemo]);
        assert_eq!(logger.drain().len(), 1);
    }

    #[tokio::test]
    async fn test_end_of_input() {
        let bus = ControlBusBuilder::new().build();
        let input = lines(&["d"]);
        assert_eq!(forward_commands(input, bus).await, ConsoleExit::Closed);
    }
}
