use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    /// Input ended while an `e` or `:` was still expected.
    #[error("Unterminated value at byte {position}: expected '{expected}' before end of input")]
    UnterminatedValue { position: usize, expected: char },

    #[error("Invalid character {found:#04x} at byte {position}")]
    InvalidCharacter { position: usize, found: u8 },

    #[error("Truncated byte string at byte {position}: declared {declared} bytes, {available} available")]
    TruncatedByteString {
        position: usize,
        declared: usize,
        available: usize,
    },

    #[error("Invalid dictionary key at byte {position}")]
    InvalidDictionaryKey { position: usize },

    #[error("Structure too deep (max depth {max_depth})")]
    StructureTooDeep { max_depth: usize },

    #[error("Unreadable input {}: {source}", .path.display())]
    UnreadableInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Root value must be a dictionary, found {found:#04x}")]
    NotADictionary { found: u8 },

    #[error("Non-canonical integer at byte {position}")]
    NonCanonicalInteger { position: usize },

    #[error("Integer overflow at byte {position}")]
    IntegerOverflow { position: usize },

    #[error("Trailing data at byte {position}")]
    TrailingData { position: usize },
}

impl DecodeError {
    /// Byte offset into the input where the error was detected, if any.
    pub fn position(&self) -> Option<usize> {
        match self {
            DecodeError::UnterminatedValue { position, .. }
            | DecodeError::InvalidCharacter { position, .. }
            | DecodeError::TruncatedByteString { position, .. }
            | DecodeError::InvalidDictionaryKey { position }
            | DecodeError::NonCanonicalInteger { position }
            | DecodeError::IntegerOverflow { position }
            | DecodeError::TrailingData { position } => Some(*position),
            DecodeError::StructureTooDeep { .. }
            | DecodeError::UnreadableInput { .. }
            | DecodeError::NotADictionary { .. } => None,
        }
    }
}
