//! Big-endian primitive encoders and decoders for the on-disk format.
//!
//! All multi-byte integers and floats in the heap file are big-endian and
//! fixed-width. Strings are length-prefixed: a single `u8` byte count
//! followed by UTF-8 bytes, which caps encoded strings at 255 bytes.
//!
//! Decoders take a byte window and return `(value, consumed)`; any read
//! that would overrun the window fails with [`CodecError::BufferTooSmall`]
//! rather than panicking, so corrupt pages surface as errors.

use std::fmt;
use std::string::FromUtf8Error;

use bytes::BufMut;

/// Maximum encoded byte length of a string value.
pub const MAX_STRING_LEN: usize = u8::MAX as usize;

/// Errors from primitive encoding/decoding.
#[derive(Debug)]
pub enum CodecError {
    /// Buffer window too small for the requested read.
    BufferTooSmall {
        /// Bytes required.
        required: usize,
        /// Bytes available.
        available: usize,
    },
    /// String exceeds the one-byte length prefix.
    StringTooLong(usize),
    /// Decoded string bytes are not valid UTF-8.
    InvalidUtf8(FromUtf8Error),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::BufferTooSmall {
                required,
                available,
            } => {
                write!(
                    f,
                    "buffer too small: need {} bytes, have {}",
                    required, available
                )
            }
            CodecError::StringTooLong(len) => {
                write!(
                    f,
                    "string of {} bytes exceeds the {}-byte limit",
                    len, MAX_STRING_LEN
                )
            }
            CodecError::InvalidUtf8(err) => write!(f, "invalid utf-8: {}", err),
        }
    }
}

impl std::error::Error for CodecError {}

impl From<FromUtf8Error> for CodecError {
    fn from(err: FromUtf8Error) -> Self {
        CodecError::InvalidUtf8(err)
    }
}

/// Returns `CodecError::BufferTooSmall` if the window is too small.
macro_rules! ensure_window {
    ($buf:expr, $required:expr) => {
        if $buf.len() < $required {
            return Err(CodecError::BufferTooSmall {
                required: $required,
                available: $buf.len(),
            });
        }
    };
}

/// Appends a big-endian `u16`.
pub fn put_u16(dst: &mut impl BufMut, v: u16) {
    dst.put_u16(v);
}

/// Appends a big-endian `i32`.
pub fn put_i32(dst: &mut impl BufMut, v: i32) {
    dst.put_i32(v);
}

/// Appends a big-endian IEEE-754 `f32`.
pub fn put_f32(dst: &mut impl BufMut, v: f32) {
    dst.put_f32(v);
}

/// Appends a length-prefixed UTF-8 string.
///
/// # Errors
///
/// Returns `CodecError::StringTooLong` if the string encodes to more than
/// [`MAX_STRING_LEN`] bytes.
pub fn put_string(dst: &mut impl BufMut, s: &str) -> Result<(), CodecError> {
    let data = s.as_bytes();
    if data.len() > MAX_STRING_LEN {
        return Err(CodecError::StringTooLong(data.len()));
    }
    dst.put_u8(data.len() as u8);
    dst.put_slice(data);
    Ok(())
}

/// Reads a big-endian `u16` from the start of `buf`.
pub fn get_u16(buf: &[u8]) -> Result<(u16, usize), CodecError> {
    ensure_window!(buf, 2);
    Ok((u16::from_be_bytes([buf[0], buf[1]]), 2))
}

/// Reads a big-endian `i32` from the start of `buf`.
pub fn get_i32(buf: &[u8]) -> Result<(i32, usize), CodecError> {
    ensure_window!(buf, 4);
    Ok((i32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]), 4))
}

/// Reads a big-endian `f32` from the start of `buf`.
pub fn get_f32(buf: &[u8]) -> Result<(f32, usize), CodecError> {
    ensure_window!(buf, 4);
    Ok((f32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]), 4))
}

/// Reads a length-prefixed UTF-8 string from the start of `buf`.
pub fn get_string(buf: &[u8]) -> Result<(String, usize), CodecError> {
    ensure_window!(buf, 1);
    let len = buf[0] as usize;
    let required = 1 + len;
    ensure_window!(buf, required);
    let s = String::from_utf8(buf[1..required].to_vec())?;
    Ok((s, required))
}
