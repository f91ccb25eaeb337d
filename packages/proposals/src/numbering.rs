// ABOUTME: Document numbering rules for SOW prefixes and sequences
// ABOUTME: Prefix validation and display formatting; allocation lives in storage

use crate::types::Proposal;
use thiserror::Error;

/// Prefixes are short numeric strings chosen once per account
pub const MIN_PREFIX_LEN: usize = 1;
pub const MAX_PREFIX_LEN: usize = 10;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NumberingError {
    #[error("invalid prefix '{0}': must be 1-10 ASCII digits")]
    InvalidPrefix(String),
}

/// Validate a candidate prefix: 1-10 ASCII digits, nothing else.
pub fn validate_prefix(candidate: &str) -> Result<(), NumberingError> {
    let len = candidate.len();
    if len < MIN_PREFIX_LEN || len > MAX_PREFIX_LEN {
        return Err(NumberingError::InvalidPrefix(candidate.to_string()));
    }
    if !candidate.bytes().all(|b| b.is_ascii_digit()) {
        return Err(NumberingError::InvalidPrefix(candidate.to_string()));
    }
    Ok(())
}

/// Render a document number: prefix and sequence concatenated with no
/// separator, e.g. prefix "031" + sequence 5 -> "0315".
pub fn format_sow_number(prefix: &str, sequence: i64) -> String {
    format!("{prefix}{sequence}")
}

impl Proposal {
    /// Display form of this proposal's document number, if it has one.
    /// Templates never carry a number.
    pub fn sow_display(&self, prefix: &str) -> Option<String> {
        self.sow_number
            .map(|sequence| format_sow_number(prefix, sequence))
    }
}
