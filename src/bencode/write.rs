//! Module for bencode-related encoding.
//!
//! Output is canonical: dictionary keys are emitted in ascending byte
//! order (`BTreeMap` iteration order), string lengths are exact, and
//! integers are minimal. Encoding the same element twice yields
//! byte-identical output, which is what makes info-hashes stable.

use super::*;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Encode `bytes` and write the result to `dst`.
pub fn write_bytes<W>(bytes: &[u8], dst: &mut W) -> Result<(), EncodeError>
where
    W: Write,
{
    dst.write_all(&bytes.len().to_string().into_bytes())?;
    dst.write_all(&[STRING_DELIMITER])?;
    dst.write_all(bytes)?;
    Ok(())
}

/// Encode `int` and write the result to `dst`.
pub fn write_integer<W>(int: i64, dst: &mut W) -> Result<(), EncodeError>
where
    W: Write,
{
    dst.write_all(&[INTEGER_PREFIX])?;
    dst.write_all(int.to_string().as_bytes())?;
    dst.write_all(&[INTEGER_POSTFIX])?;
    Ok(())
}

/// Encode `list` and write the result to `dst`.
pub fn write_list<W>(list: &[BencodeElem], dst: &mut W) -> Result<(), EncodeError>
where
    W: Write,
{
    dst.write_all(&[LIST_PREFIX])?;
    for item in list {
        item.write_into(dst)?;
    }
    dst.write_all(&[LIST_POSTFIX])?;
    Ok(())
}

/// Encode `dict` and write the result to `dst`.
///
/// "Keys must be strings and appear in sorted order
/// (sorted as raw strings, not alphanumerics)."
/// `BTreeMap` iterates keys in exactly that order.
pub fn write_dictionary<W>(
    dict: &BTreeMap<Vec<u8>, BencodeElem>,
    dst: &mut W,
) -> Result<(), EncodeError>
where
    W: Write,
{
    dst.write_all(&[DICTIONARY_PREFIX])?;
    for (key, val) in dict {
        write_bytes(key, dst)?;
        val.write_into(dst)?;
    }
    dst.write_all(&[DICTIONARY_POSTFIX])?;
    Ok(())
}

/// Encode `bytes` and return the result in a `Vec`.
pub fn encode_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut encoded = Vec::with_capacity(bytes.len() + 2);
    write_bytes(bytes, &mut encoded).expect("Write to vec failed!");
    encoded
}

/// Encode `int` and return the result in a `Vec`.
pub fn encode_integer(int: i64) -> Vec<u8> {
    let mut encoded = Vec::new();
    write_integer(int, &mut encoded).expect("Write to vec failed!");
    encoded
}

/// Encode `list` and return the result in a `Vec`.
pub fn encode_list(list: &[BencodeElem]) -> Vec<u8> {
    let mut encoded = Vec::new();
    write_list(list, &mut encoded).expect("Write to vec failed!");
    encoded
}

/// Encode `dict` and return the result in a `Vec`.
pub fn encode_dictionary(dict: &BTreeMap<Vec<u8>, BencodeElem>) -> Vec<u8> {
    let mut encoded = Vec::new();
    write_dictionary(dict, &mut encoded).expect("Write to vec failed!");
    encoded
}

impl BencodeElem {
    /// Encode `self` and write the result to `dst`.
    pub fn write_into<W>(&self, dst: &mut W) -> Result<(), EncodeError>
    where
        W: Write,
    {
        match *self {
            BencodeElem::Bytes(ref bytes) => write_bytes(bytes, dst),
            BencodeElem::Integer(int) => write_integer(int, dst),
            BencodeElem::List(ref list) => write_list(list, dst),
            BencodeElem::Dictionary(ref dict) => write_dictionary(dict, dst),
        }
    }

    /// Encode `self` and write the result to `path`.
    ///
    /// `path` must be the path to a file.
    ///
    /// "This function will create a file if it does
    /// not exist, and will truncate it if it does."
    pub fn write_into_file<P>(&self, path: P) -> Result<(), EncodeError>
    where
        P: AsRef<Path>,
    {
        let file = File::create(&path)?;
        self.write_into(&mut BufWriter::new(&file))?;
        file.sync_all()?;
        Ok(())
    }

    /// Encode `self` and return the result in a `Vec`.
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            BencodeElem::Bytes(ref bytes) => encode_bytes(bytes),
            BencodeElem::Integer(int) => encode_integer(int),
            BencodeElem::List(ref list) => encode_list(list),
            BencodeElem::Dictionary(ref dict) => encode_dictionary(dict),
        }
    }
}
