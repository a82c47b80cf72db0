//! Log file sequence naming

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{LoggerError, Result};

const SEQUENCE_DIGITS: usize = 3;
const SEQUENCE_MAX: u32 = 999;

/// Next free `<prefix><NNN><suffix>` name in `dir`, creating `dir` when missing.
///
/// Only names with exactly three digits between prefix and suffix count
/// towards the sequence. Once `<prefix>999<suffix>` exists the sequence is
/// exhausted and no name is handed out.
pub fn next_log_file_name(dir: &Path, prefix: &str, suffix: &str) -> Result<String> {
    if dir.is_dir() {
        debug!(dir = %dir.display(), "Log directory already exists");
    } else {
        info!(dir = %dir.display(), "Log directory is missing, creating");
        fs::create_dir_all(dir).map_err(|e| LoggerError::directory(dir, e))?;
    }

    let entries = fs::read_dir(dir).map_err(|e| LoggerError::directory(dir, e))?;
    let latest = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter_map(|name| sequence_number(&name, prefix, suffix))
        .max();

    let next = match latest {
        Some(n) if n >= SEQUENCE_MAX => {
            return Err(LoggerError::sequence_exhausted(dir, SEQUENCE_MAX));
        }
        Some(n) => n + 1,
        None => 0,
    };
    Ok(format!("{prefix}{next:0width$}{suffix}", width = SEQUENCE_DIGITS))
}

fn sequence_number(name: &str, prefix: &str, suffix: &str) -> Option<u32> {
    let digits = name.strip_prefix(prefix)?.strip_suffix(suffix)?;
    if digits.len() != SEQUENCE_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
