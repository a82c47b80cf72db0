//! Scripted in-memory serial link
//!
//! Writes of a control code queue its configured response byte; reads drain
//! the queue and time out when it is empty, like a port with a read timeout.

use std::collections::{HashMap, VecDeque};
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{Result, SensorError};
use crate::link::{LinkOpener, SerialLink};

#[derive(Debug, Default)]
struct MockState {
    responses: HashMap<u8, u8>,
    pending: VecDeque<u8>,
    written: Vec<u8>,
    failing: bool,
}

/// Cloneable handle; all clones share one device state.
#[derive(Debug, Clone, Default)]
pub struct MockLink {
    state: Arc<Mutex<MockState>>,
}

impl MockLink {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answer `byte` whenever `code` is written
    pub fn respond(&self, code: u8, byte: u8) {
        self.state().responses.insert(code, byte);
    }

    /// Queue bytes for the next reads
    pub fn push_input(&self, bytes: &[u8]) {
        self.state().pending.extend(bytes.iter().copied());
    }

    pub fn push_line(&self, line: &str) {
        let mut state = self.state();
        state.pending.extend(line.bytes());
        state.pending.push_back(b'\n');
    }

    /// Every byte written so far
    pub fn written(&self) -> Vec<u8> {
        self.state().written.clone()
    }

    /// Make every read and write fail with `BrokenPipe`
    pub fn set_failing(&self, failing: bool) {
        self.state().failing = failing;
    }
}

impl Read for MockLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state();
        if state.failing {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock link failure"));
        }
        if state.pending.is_empty() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "mock read timeout"));
        }
        let mut n = 0;
        while n < buf.len() {
            match state.pending.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

impl Write for MockLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state();
        if state.failing {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock link failure"));
        }
        for &b in buf {
            state.written.push(b);
            if let Some(&reply) = state.responses.get(&b) {
                state.pending.push_back(reply);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Hands out clones of one [`MockLink`] while the device is "plugged in"
#[derive(Debug, Clone)]
pub struct MockOpener {
    link: MockLink,
    available: Arc<AtomicBool>,
    opens: Arc<AtomicUsize>,
}

impl MockOpener {
    pub fn new(link: MockLink) -> Self {
        Self {
            link,
            available: Arc::new(AtomicBool::new(true)),
            opens: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Opener whose device is missing
    pub fn unavailable() -> Self {
        let opener = Self::new(MockLink::new());
        opener.set_available(false);
        opener
    }

    pub fn link(&self) -> &MockLink {
        &self.link
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of `open()` attempts
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl LinkOpener for MockOpener {
    fn device(&self) -> &str {
        "mock"
    }

    fn open(&self) -> Result<Box<dyn SerialLink>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if !self.available.load(Ordering::SeqCst) {
            return Err(SensorError::connection_failed("mock", "device unavailable"));
        }
        Ok(Box::new(self.link.clone()))
    }
}
