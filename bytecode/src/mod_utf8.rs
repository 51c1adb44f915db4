/*
    This file is part of Stubify.

    Stubify is free software: you can redistribute it and/or modify
    it under the terms of the GNU Lesser General Public License as published by
    the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    Stubify is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU General Public License for more details.

    You should have received a copy of the GNU Lesser General Public License
    along with Stubify. (LICENSE.md)  If not, see <https://www.gnu.org/licenses/>.
*/

//! Module for converting between Java's Modified UTF-8 and UTF-8.
//!
//! Class files store strings as UTF-16 code units, each written as 1, 2 or 3 bytes.
//! Supplementary characters therefore take two 3-byte surrogates (6 bytes) instead of
//! the 4 bytes UTF-8 uses, and NUL is written as `C0 80` so a string never contains a zero byte.
//!
//! Refer to the [JVM Spec](https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.4.7) for more info.

use thiserror::Error;

/// An error encountered during conversion.
#[derive(Debug, Error)]
pub enum MUTFError {
    /// A multi-byte code unit was cut off by the end of the buffer.
    #[error("Malformed Input: Partial character at end")]
    PartialCharacterAtEnd,

    /// The code unit at index is invalid.
    #[error("Malformed Input around byte: {0}")]
    AroundByte(usize),

    /// A surrogate has no partner, which a rust string cannot represent.
    #[error("Malformed Input: unpaired surrogate")]
    UnpairedSurrogate,
}

fn continuation(buf: &[u8], idx: usize) -> Result<u16, MUTFError> {
    match buf.get(idx) {
        Some(&b) if b & 0xC0 == 0x80 => Ok((b & 0x3F) as u16),
        Some(_) => Err(MUTFError::AroundByte(idx)),
        None => Err(MUTFError::PartialCharacterAtEnd),
    }
}

/// Converts a modified utf-8 sequence to an owned rust string.
pub fn modified_utf8_to_string(buf: &[u8]) -> Result<String, MUTFError> {
    let mut units = Vec::with_capacity(buf.len());
    let mut i = 0;
    while i < buf.len() {
        let b = buf[i];
        let unit = match b {
            0x01..=0x7F => {
                i += 1;
                b as u16
            }
            0xC0..=0xDF => {
                let b2 = continuation(buf, i + 1)?;
                i += 2;
                ((b as u16 & 0x1F) << 6) | b2
            }
            0xE0..=0xEF => {
                let b2 = continuation(buf, i + 1)?;
                let b3 = continuation(buf, i + 2)?;
                i += 3;
                ((b as u16 & 0x0F) << 12) | (b2 << 6) | b3
            }
            _ => return Err(MUTFError::AroundByte(i)),
        };
        units.push(unit);
    }
    String::from_utf16(&units).map_err(|_| MUTFError::UnpairedSurrogate)
}

/// Converts a rust string to a modified utf-8 sequence.
pub fn string_to_modified_utf8(str: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(str.len());
    for unit in str.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | (unit >> 6) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}
