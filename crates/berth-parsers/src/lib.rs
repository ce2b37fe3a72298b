//! Shared parsing utilities for scheduler limits and command output.
//!
//! This crate provides the time-limit grammar, memory strings and subprocess
//! helpers used by berth-partitions and berth-slurm.

pub mod command;
pub mod memory;
pub mod time;

pub use command::{run_command, run_command_with_timeout, tool_available, CommandError};
pub use memory::parse_memory_mb;
pub use time::{minutes_from_number, parse_time_minutes, round_half_up, TimeParseError};

use thiserror::Error;

/// Trimmed text, or None for blanks and the placeholders SLURM prints for
/// unset fields.
pub fn non_empty_string(s: &str) -> Option<String> {
    let trimmed = s.trim();
    match trimmed {
        "" | "-" | "N/A" | "(null)" => None,
        _ => Some(trimmed.to_string()),
    }
}

/// A `|`-separated row with fewer fields than expected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("expected {expected} fields, got {found}: {line}")]
pub struct ShortRow {
    pub expected: usize,
    pub found: usize,
    pub line: String,
}

/// Split a `--parsable2` style row, requiring at least `min_fields` fields.
pub fn split_delimited(line: &str, min_fields: usize) -> Result<Vec<&str>, ShortRow> {
    let fields: Vec<&str> = line.split('|').collect();
    if fields.len() < min_fields {
        return Err(ShortRow {
            expected: min_fields,
            found: fields.len(),
            line: line.to_string(),
        });
    }
    Ok(fields)
}
