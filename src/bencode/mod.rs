//! Module for the bencoding wire format: a tagged value type, a
//! recursive-descent decoder, and a canonical encoder.
//!
//! Byte strings (including dictionary keys) stay raw byte sequences
//! throughout; they are never converted to a distinct text type. Piece-hash
//! blobs and compact peer lists are stored this way.

use itertools::Itertools;
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use thiserror::Error;

#[macro_use]
mod macros;
mod read;
pub mod write;

const DICTIONARY_PREFIX: u8 = b'd';
const DICTIONARY_POSTFIX: u8 = b'e';
const LIST_PREFIX: u8 = b'l';
const LIST_POSTFIX: u8 = b'e';
const INTEGER_PREFIX: u8 = b'i';
const INTEGER_POSTFIX: u8 = b'e';
const STRING_DELIMITER: u8 = b':';

/// A bencode element.
///
/// Technically a bencode integer has no size limit, but it is bounded to
/// `i64` in the current implementation; decoding an integer outside that
/// range fails with [`DecodeError::MalformedInteger`].
///
/// Dictionary keys are raw byte sequences sorted by byte value, which makes
/// re-encoding canonical (ascending key order, exact length prefixes,
/// minimal integers).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BencodeElem {
    Bytes(Vec<u8>),
    Integer(i64),
    List(Vec<BencodeElem>),
    Dictionary(BTreeMap<Vec<u8>, BencodeElem>),
}

/// Error decoding bencode bytes.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("expected more bytes at offset {offset}, but none found")]
    UnexpectedEof { offset: usize },
    #[error("unexpected character {byte:#04x} at offset {offset}")]
    UnexpectedCharacter { byte: u8, offset: usize },
    #[error("malformed integer: {0}")]
    MalformedInteger(String),
    #[error("malformed string length: {0}")]
    MalformedLength(String),
    #[error("dictionary key at offset {offset} is not a string")]
    NonStringKey { offset: usize },
    #[error("dictionary keys are not sorted (offending key: \"{0}\")")]
    UnsortedKeys(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Error encoding a [`BencodeElem`]. The four supported shapes and
/// byte-string dictionary keys are enforced by the type itself, so only the
/// output sink can fail.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl From<u8> for BencodeElem {
    fn from(val: u8) -> BencodeElem {
        BencodeElem::Integer(i64::from(val))
    }
}

impl From<u16> for BencodeElem {
    fn from(val: u16) -> BencodeElem {
        BencodeElem::Integer(i64::from(val))
    }
}

impl From<u32> for BencodeElem {
    fn from(val: u32) -> BencodeElem {
        BencodeElem::Integer(i64::from(val))
    }
}

impl From<i8> for BencodeElem {
    fn from(val: i8) -> BencodeElem {
        BencodeElem::Integer(i64::from(val))
    }
}

impl From<i16> for BencodeElem {
    fn from(val: i16) -> BencodeElem {
        BencodeElem::Integer(i64::from(val))
    }
}

impl From<i32> for BencodeElem {
    fn from(val: i32) -> BencodeElem {
        BencodeElem::Integer(i64::from(val))
    }
}

impl From<i64> for BencodeElem {
    fn from(val: i64) -> BencodeElem {
        BencodeElem::Integer(val)
    }
}

impl<'a> From<&'a str> for BencodeElem {
    fn from(val: &'a str) -> BencodeElem {
        BencodeElem::Bytes(val.as_bytes().to_vec())
    }
}

impl From<String> for BencodeElem {
    fn from(val: String) -> BencodeElem {
        BencodeElem::Bytes(val.into_bytes())
    }
}

impl<'a> From<&'a [u8]> for BencodeElem {
    fn from(val: &'a [u8]) -> BencodeElem {
        BencodeElem::Bytes(val.to_vec())
    }
}

impl From<Vec<u8>> for BencodeElem {
    fn from(val: Vec<u8>) -> BencodeElem {
        BencodeElem::Bytes(val)
    }
}

impl fmt::Display for BencodeElem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            BencodeElem::Bytes(ref bytes) => match std::str::from_utf8(bytes) {
                Ok(string) => write!(f, "\"{}\"", string),
                Err(_) => write!(f, "[{:#02x}]", bytes.iter().format(", ")),
            },
            BencodeElem::Integer(ref int) => write!(f, "{}", int),
            BencodeElem::List(ref list) => write!(f, "[{}]", itertools::join(list, ", ")),
            BencodeElem::Dictionary(ref dict) => write!(
                f,
                "{{ {} }}",
                dict.iter().format_with(", ", |(k, v), f| f(&format_args!(
                    "(\"{}\", {})",
                    String::from_utf8_lossy(k),
                    v
                ))),
            ),
        }
    }
}
