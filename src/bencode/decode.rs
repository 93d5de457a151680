use std::path::Path;

use bytes::Bytes;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use super::error::DecodeError;
use crate::bencode::bvalue::{BValue, Dictionary};

/// Nesting limit used when no other is configured. The root container counts as depth 1.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// How the decoder reacts to input that is malformed but locally recoverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodeMode {
    /// Any deviation from the grammar aborts the parse.
    #[default]
    Strict,
    /// Stray characters are skipped, short strings are accepted as-is and
    /// unparseable container entries end the container early.
    Relaxed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    pub mode: DecodeMode,
    pub max_depth: usize,
}

impl DecodeOptions {
    pub fn new(mode: DecodeMode) -> Self {
        Self {
            mode,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self::new(DecodeMode::Strict)
    }
}

/// Decodes a dictionary-rooted bencode document.
pub fn decode(input: &[u8], mode: DecodeMode) -> Result<Dictionary, DecodeError> {
    decode_with(input, DecodeOptions::new(mode))
}

pub fn decode_with(input: &[u8], options: DecodeOptions) -> Result<Dictionary, DecodeError> {
    decode_bytes(Bytes::copy_from_slice(input), options)
}

/// Like [`decode_with`], but shares `input` with the decoded dictionaries instead of copying it.
pub fn decode_bytes(input: Bytes, options: DecodeOptions) -> Result<Dictionary, DecodeError> {
    Decoder::new(input, options).decode_root()
}

/// Reads `path` as raw bytes and decodes it.
pub fn decode_file<P: AsRef<Path>>(path: P, mode: DecodeMode) -> Result<Dictionary, DecodeError> {
    decode_file_with(path, DecodeOptions::new(mode))
}

pub fn decode_file_with<P: AsRef<Path>>(
    path: P,
    options: DecodeOptions,
) -> Result<Dictionary, DecodeError> {
    let path = path.as_ref();
    let buf = std::fs::read(path).map_err(|source| DecodeError::UnreadableInput {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Read {} bytes from {}", buf.len(), path.display());

    decode_bytes(Bytes::from(buf), options)
}

/// Decodes a single value of any kind.
///
/// Unlike [`decode`] the root does not have to be a dictionary.
pub fn decode_value(input: &[u8], mode: DecodeMode) -> Result<BValue, DecodeError> {
    decode_value_with(input, DecodeOptions::new(mode))
}

pub fn decode_value_with(input: &[u8], options: DecodeOptions) -> Result<BValue, DecodeError> {
    Decoder::new(Bytes::copy_from_slice(input), options).decode_single()
}

struct Decoder {
    input: Bytes,
    mode: DecodeMode,
    max_depth: usize,
}

impl Decoder {
    fn new(input: Bytes, options: DecodeOptions) -> Self {
        Self {
            input,
            mode: options.mode,
            max_depth: options.max_depth,
        }
    }

    fn data(&self) -> &[u8] {
        &self.input
    }

    fn is_strict(&self) -> bool {
        self.mode == DecodeMode::Strict
    }

    fn decode_root(&self) -> Result<Dictionary, DecodeError> {
        let data = self.data();
        let first = *data.first().ok_or(DecodeError::UnterminatedValue {
            position: 0,
            expected: 'e',
        })?;
        if first != b'd' {
            return Err(DecodeError::NotADictionary { found: first });
        }

        let (mut pos, mut root) = self.decode_dict(0, 1)?;

        // Concatenated dictionaries after the root are folded into it.
        while pos < data.len() {
            if data[pos] != b'd' {
                self.trailing(pos)?;
                break;
            }
            debug!("Merging concatenated dictionary at byte {}", pos);
            let (next, extra) = self.decode_dict(pos, 1)?;
            for (key, value) in extra {
                if !root.insert(key, value) {
                    debug!("Duplicate key in dictionary at byte {} ignored", pos);
                }
            }
            pos = next;
        }

        Ok(root)
    }

    fn decode_single(&self) -> Result<BValue, DecodeError> {
        let data = self.data();
        if data.is_empty() {
            return Err(DecodeError::UnterminatedValue {
                position: 0,
                expected: 'e',
            });
        }

        let (pos, value) = match self.decode_element(0, 0)? {
            Some(parsed) => parsed,
            None => {
                return Err(DecodeError::InvalidCharacter {
                    position: 0,
                    found: data[0],
                })
            }
        };
        if pos < data.len() {
            self.trailing(pos)?;
        }
        Ok(value)
    }

    fn trailing(&self, pos: usize) -> Result<(), DecodeError> {
        if self.is_strict() {
            return Err(DecodeError::TrailingData { position: pos });
        }
        debug!(
            "Ignoring {} trailing bytes at byte {}",
            self.data().len() - pos,
            pos
        );
        Ok(())
    }

    fn check_depth(&self, depth: usize) -> Result<(), DecodeError> {
        if depth > self.max_depth {
            return Err(DecodeError::StructureTooDeep {
                max_depth: self.max_depth,
            });
        }
        Ok(())
    }

    /// Decodes whatever value starts at `pos` inside a container at `depth`.
    ///
    /// Returns `Ok(None)` in relaxed mode when no value kind starts there.
    /// `pos` must be in bounds.
    fn decode_element(
        &self,
        pos: usize,
        depth: usize,
    ) -> Result<Option<(usize, BValue)>, DecodeError> {
        let parsed = match self.data()[pos] {
            b'i' => {
                let (next, i) = self.decode_integer(pos)?;
                (next, BValue::Integer(i))
            }
            b'0'..=b'9' => {
                let (next, bytes) = self.decode_byte_string(pos)?;
                (next, BValue::ByteString(bytes))
            }
            b'l' => {
                let (next, items) = self.decode_list(pos, depth + 1)?;
                (next, BValue::List(items))
            }
            b'd' => {
                let (next, dict) = self.decode_dict(pos, depth + 1)?;
                (next, BValue::Dict(dict))
            }
            found => {
                if self.is_strict() {
                    return Err(DecodeError::InvalidCharacter {
                        position: pos,
                        found,
                    });
                }
                return Ok(None);
            }
        };
        Ok(Some(parsed))
    }

    /// Decodes `i<digits>e` starting at the `i` in `pos`.
    fn decode_integer(&self, pos: usize) -> Result<(usize, i64), DecodeError> {
        let data = self.data();
        let start = pos + 1;
        let end = data[start..]
            .iter()
            .position(|&b| b == b'e')
            .map(|offset| start + offset)
            .ok_or(DecodeError::UnterminatedValue {
                position: pos,
                expected: 'e',
            })?;

        let negative = data[start] == b'-';
        let digits_at = if negative { start + 1 } else { start };

        let mut magnitude: u64 = 0;
        let mut digits = 0usize;
        for (at, &b) in data[..end].iter().enumerate().skip(digits_at) {
            if !b.is_ascii_digit() {
                if self.is_strict() {
                    return Err(DecodeError::InvalidCharacter { position: at, found: b });
                }
                trace!("Skipping {:#04x} in integer at byte {}", b, at);
                continue;
            }
            magnitude = magnitude
                .checked_mul(10)
                .and_then(|m| m.checked_add(u64::from(b - b'0')))
                .ok_or(DecodeError::IntegerOverflow { position: pos })?;
            digits += 1;
        }

        if self.is_strict() {
            if digits == 0 {
                return Err(DecodeError::InvalidCharacter {
                    position: end,
                    found: b'e',
                });
            }
            // Only the literal `i0e` may start with a zero.
            if data[digits_at] == b'0' && (digits > 1 || negative) {
                return Err(DecodeError::NonCanonicalInteger { position: pos });
            }
        } else if digits == 0 {
            debug!("Integer without digits at byte {} read as 0", pos);
        }

        let value = if negative {
            match magnitude {
                m if m == i64::MIN.unsigned_abs() => i64::MIN,
                m => -i64::try_from(m).map_err(|_| DecodeError::IntegerOverflow { position: pos })?,
            }
        } else {
            i64::try_from(magnitude).map_err(|_| DecodeError::IntegerOverflow { position: pos })?
        };

        // add 1 to account for 'e'
        Ok((end + 1, value))
    }

    /// Decodes `<length>:<bytes>` starting at the first length digit in `pos`.
    fn decode_byte_string(&self, pos: usize) -> Result<(usize, Vec<u8>), DecodeError> {
        let data = self.data();
        let mut idx = pos;
        let mut length: usize = 0;

        loop {
            let b = *data.get(idx).ok_or(DecodeError::UnterminatedValue {
                position: pos,
                expected: ':',
            })?;
            match b {
                b':' => break,
                b'0'..=b'9' => {
                    // Saturate: an absurd length is reported as truncation below.
                    length = length.saturating_mul(10).saturating_add(usize::from(b - b'0'));
                }
                _ if self.is_strict() => {
                    return Err(DecodeError::InvalidCharacter { position: idx, found: b });
                }
                _ => trace!("Skipping {:#04x} in string length at byte {}", b, idx),
            }
            idx += 1;
        }

        let start = idx + 1;
        let available = data.len() - start;
        if length > available {
            if self.is_strict() {
                return Err(DecodeError::TruncatedByteString {
                    position: pos,
                    declared: length,
                    available,
                });
            }
            debug!(
                "Byte string at byte {} declares {} bytes, keeping the {} available",
                pos, length, available
            );
            return Ok((data.len(), data[start..].to_vec()));
        }

        let end = start + length;
        Ok((end, data[start..end].to_vec()))
    }

    /// Decodes `l<values>e` starting at the `l` in `pos`.
    fn decode_list(&self, pos: usize, depth: usize) -> Result<(usize, Vec<BValue>), DecodeError> {
        self.check_depth(depth)?;
        let data = self.data();
        let mut idx = pos + 1; // skip 'l'
        let mut items = Vec::new();

        loop {
            match data.get(idx) {
                None => {
                    return Err(DecodeError::UnterminatedValue {
                        position: pos,
                        expected: 'e',
                    })
                }
                // add 1 to account for 'e'
                Some(b'e') => return Ok((idx + 1, items)),
                Some(_) => match self.decode_element(idx, depth)? {
                    Some((next, value)) => {
                        idx = next;
                        items.push(value);
                    }
                    None => {
                        debug!(
                            "Stopping list at byte {} after {} items",
                            idx,
                            items.len()
                        );
                        return Ok((idx, items));
                    }
                },
            }
        }
    }

    /// Decodes `d(<key><value>)*e` starting at the `d` in `pos`.
    fn decode_dict(&self, pos: usize, depth: usize) -> Result<(usize, Dictionary), DecodeError> {
        self.check_depth(depth)?;
        let data = self.data();
        let mut idx = pos + 1; // skip 'd'
        let mut dict = Dictionary::with_source(self.input.clone(), pos);

        loop {
            let b = *data.get(idx).ok_or(DecodeError::UnterminatedValue {
                position: pos,
                expected: 'e',
            })?;
            if b == b'e' {
                dict.set_end(idx + 1);
                return Ok((idx + 1, dict));
            }

            // Keys must be byte strings
            if !b.is_ascii_digit() {
                if self.is_strict() {
                    return Err(DecodeError::InvalidDictionaryKey { position: idx });
                }
                debug!("Stopping dictionary at byte {}: no key", idx);
                dict.set_end(idx);
                return Ok((idx, dict));
            }
            let (value_at, key) = self.decode_byte_string(idx)?;

            if value_at >= data.len() {
                return Err(DecodeError::UnterminatedValue {
                    position: pos,
                    expected: 'e',
                });
            }
            match self.decode_element(value_at, depth)? {
                Some((next, value)) => {
                    if !dict.insert(key, value) {
                        debug!("Duplicate key at byte {} ignored", idx);
                    }
                    idx = next;
                }
                // A key directly followed by the terminator: drop the key, keep the dictionary.
                None if data[value_at] == b'e' => {
                    debug!(
                        "Dropping key {:?} without value at byte {}",
                        String::from_utf8_lossy(&key),
                        value_at
                    );
                    dict.set_end(value_at + 1);
                    return Ok((value_at + 1, dict));
                }
                None => {
                    debug!(
                        "Stopping dictionary at byte {}: no value for key {:?}",
                        value_at,
                        String::from_utf8_lossy(&key)
                    );
                    dict.set_end(value_at);
                    return Ok((value_at, dict));
                }
            }
        }
    }
}
