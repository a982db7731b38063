// Instance selection (pure; no I/O)

use std::collections::BTreeSet;
use std::num::IntErrorKind;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("'{input}' is not a number")]
    NotANumber { input: String },
    #[error("selection '{input}' is out of range (expected 1-{count})")]
    OutOfRange { input: String, count: usize },
    #[error("instance '{name}' was not discovered on this host")]
    UnknownInstance { name: String },
}

/// Resolve a 1-based index typed by the operator against the sorted candidates.
pub fn select(candidates: &BTreeSet<String>, raw: &str) -> Result<String, SelectionError> {
    let input = raw.trim();
    let out_of_range = || SelectionError::OutOfRange {
        input: input.to_string(),
        count: candidates.len(),
    };

    let number = input.parse::<i64>().map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => out_of_range(),
        _ => SelectionError::NotANumber {
            input: input.to_string(),
        },
    })?;

    if number < 1 {
        return Err(out_of_range());
    }
    let index = usize::try_from(number - 1).map_err(|_| out_of_range())?;
    candidates.iter().nth(index).cloned().ok_or_else(out_of_range)
}

/// Resolve an instance given by name (case-insensitive) to its discovered spelling.
pub fn select_by_name(candidates: &BTreeSet<String>, name: &str) -> Result<String, SelectionError> {
    let wanted = name.trim();
    candidates
        .iter()
        .find(|c| c.eq_ignore_ascii_case(wanted))
        .cloned()
        .ok_or_else(|| SelectionError::UnknownInstance {
            name: wanted.to_string(),
        })
}
