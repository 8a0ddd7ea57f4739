use super::*;
use crate::util;
use crate::util::ByteBuffer;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

impl BencodeElem {
    /// Parse `bytes` and return all `BencodeElem` found.
    ///
    /// Dictionaries are accepted with their keys in any order (tracker
    /// responses are not guaranteed sorted); a duplicate key keeps the
    /// last value.
    ///
    /// If `bytes` is empty, then `Ok(vec)` will be returned, but
    /// `vec` would be empty as well.
    ///
    /// If `bytes` contains any malformed bencode, or if any other
    /// error is encountered (e.g. `IOError`), then `Err(error)`
    /// will be returned.
    pub fn from_bytes<B>(bytes: B) -> Result<Vec<BencodeElem>, DecodeError>
    where
        B: AsRef<[u8]>,
    {
        Self::parse_all(bytes.as_ref(), false)
    }

    /// Like [`from_bytes()`](#method.from_bytes), but additionally
    /// requires dictionary keys to appear in strictly ascending
    /// byte-lexicographic order.
    pub fn from_bytes_strict<B>(bytes: B) -> Result<Vec<BencodeElem>, DecodeError>
    where
        B: AsRef<[u8]>,
    {
        Self::parse_all(bytes.as_ref(), true)
    }

    /// Parse the content of the file at `path` and return all
    /// `BencodeElem` found.
    pub fn from_file<P>(path: P) -> Result<Vec<BencodeElem>, DecodeError>
    where
        P: AsRef<Path>,
    {
        let file = File::open(&path)?;
        let mut bytes = Vec::new();

        BufReader::new(file).read_to_end(&mut bytes)?;
        Self::from_bytes(bytes)
    }

    fn parse_all(bytes: &[u8], strict: bool) -> Result<Vec<BencodeElem>, DecodeError> {
        let mut bytes = ByteBuffer::new(bytes);
        let mut elements = Vec::new();

        while !bytes.is_empty() {
            elements.push(Self::parse(&mut bytes, strict)?);
        }

        Ok(elements)
    }

    fn peek_byte(bytes: &ByteBuffer) -> Result<u8, DecodeError> {
        match bytes.peek() {
            Some(&byte) => Ok(byte),
            None => Err(DecodeError::UnexpectedEof {
                offset: bytes.pos(),
            }),
        }
    }

    fn parse(bytes: &mut ByteBuffer, strict: bool) -> Result<BencodeElem, DecodeError> {
        match Self::peek_byte(bytes)? {
            DICTIONARY_PREFIX => {
                bytes.advance(1);
                Self::decode_dictionary(bytes, strict)
            }
            LIST_PREFIX => {
                bytes.advance(1);
                Self::decode_list(bytes, strict)
            }
            INTEGER_PREFIX => {
                bytes.advance(1);
                Self::decode_integer(bytes)
            }
            byte if byte.is_ascii_digit() => Ok(BencodeElem::Bytes(Self::decode_bytes(bytes)?)),
            byte => Err(DecodeError::UnexpectedCharacter {
                byte,
                offset: bytes.pos(),
            }),
        }
    }

    fn decode_dictionary(bytes: &mut ByteBuffer, strict: bool) -> Result<BencodeElem, DecodeError> {
        let mut entries = Vec::new();

        while Self::peek_byte(bytes)? != DICTIONARY_POSTFIX {
            // more to parse
            if !Self::peek_byte(bytes)?.is_ascii_digit() {
                return Err(DecodeError::NonStringKey {
                    offset: bytes.pos(),
                });
            }
            let key = Self::decode_bytes(bytes)?;
            entries.push((key, Self::parse(bytes, strict)?));
        }
        bytes.advance(1); // consume the postfix

        // "Keys must be strings and appear in sorted order
        // (sorted as raw strings, not alphanumerics)."
        if strict {
            for window in entries.windows(2) {
                if window[0].0 >= window[1].0 {
                    return Err(DecodeError::UnsortedKeys(
                        String::from_utf8_lossy(&window[1].0).into_owned(),
                    ));
                }
            }
        }

        Ok(BencodeElem::Dictionary(entries.into_iter().collect()))
    }

    fn decode_list(bytes: &mut ByteBuffer, strict: bool) -> Result<BencodeElem, DecodeError> {
        let mut list = Vec::new();

        while Self::peek_byte(bytes)? != LIST_POSTFIX {
            // more to parse
            list.push(Self::parse(bytes, strict)?);
        }
        bytes.advance(1); // consume the postfix

        Ok(BencodeElem::List(list))
    }

    fn decode_integer(bytes: &mut ByteBuffer) -> Result<BencodeElem, DecodeError> {
        let read = Self::read_until(bytes, INTEGER_POSTFIX)?;
        let int_string = match String::from_utf8(read) {
            Ok(string) => string,
            Err(e) => return Err(Self::malformed_integer(e.as_bytes())),
        };

        if int_string.starts_with("-0")
            || (int_string.starts_with('0') && int_string.len() != 1)
        {
            return Err(DecodeError::MalformedInteger(int_string));
        }

        // `parse()` also rejects values outside the range of `i64`
        match int_string.parse() {
            Ok(int) => Ok(BencodeElem::Integer(int)),
            Err(_) => Err(DecodeError::MalformedInteger(int_string)),
        }
    }

    fn decode_bytes(bytes: &mut ByteBuffer) -> Result<Vec<u8>, DecodeError> {
        let read = Self::read_until(bytes, STRING_DELIMITER)?;
        let len_string = match String::from_utf8(read) {
            Ok(string) => string,
            Err(e) => {
                return Err(DecodeError::MalformedLength(
                    String::from_utf8_lossy(e.as_bytes()).into_owned(),
                ));
            }
        };

        if len_string.is_empty()
            || !len_string.bytes().all(|byte| byte.is_ascii_digit())
            || (len_string.starts_with('0') && len_string.len() != 1)
        {
            return Err(DecodeError::MalformedLength(len_string));
        }

        let len = match len_string.parse().ok().and_then(util::i64_to_usize) {
            Some(len) => len,
            None => return Err(DecodeError::MalformedLength(len_string)),
        };

        // a string must contain exactly as many bytes as declared
        if bytes.remaining() < len {
            return Err(DecodeError::UnexpectedEof {
                offset: bytes.pos(),
            });
        }
        Ok(bytes.take(len).cloned().collect())
    }

    // reads up to (and consumes) `delimiter`, returning the bytes before it
    fn read_until(bytes: &mut ByteBuffer, delimiter: u8) -> Result<Vec<u8>, DecodeError> {
        let mut read = Vec::new();
        loop {
            match bytes.next() {
                Some(&byte) if byte == delimiter => return Ok(read),
                Some(&byte) => read.push(byte),
                None => {
                    return Err(DecodeError::UnexpectedEof {
                        offset: bytes.pos(),
                    });
                }
            }
        }
    }

    fn malformed_integer(bytes: &[u8]) -> DecodeError {
        DecodeError::MalformedInteger(String::from_utf8_lossy(bytes).into_owned())
    }
}
