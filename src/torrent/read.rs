use super::*;
use crate::bencode::BencodeElem;
use crate::util;
use sha1::{Digest, Sha1};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

type Dict = BTreeMap<Vec<u8>, BencodeElem>;

fn required_string(dict: &mut Dict, field: &'static str) -> Result<String, MetadataError> {
    match dict.remove(field.as_bytes()) {
        Some(BencodeElem::Bytes(bytes)) => {
            String::from_utf8(bytes).map_err(|_| MetadataError::WrongType(field))
        }
        Some(_) => Err(MetadataError::WrongType(field)),
        None => Err(MetadataError::MissingField(field)),
    }
}

fn optional_string(dict: &mut Dict, field: &'static str) -> Result<Option<String>, MetadataError> {
    match dict.remove(field.as_bytes()) {
        Some(BencodeElem::Bytes(bytes)) => String::from_utf8(bytes)
            .map(Some)
            .map_err(|_| MetadataError::WrongType(field)),
        Some(_) => Err(MetadataError::WrongType(field)),
        None => Ok(None),
    }
}

fn optional_integer(dict: &mut Dict, field: &'static str) -> Result<Option<i64>, MetadataError> {
    match dict.remove(field.as_bytes()) {
        Some(BencodeElem::Integer(int)) => Ok(Some(int)),
        Some(_) => Err(MetadataError::WrongType(field)),
        None => Ok(None),
    }
}

impl File {
    fn extract_file(
        elem: BencodeElem,
        piece_length: i64,
        cursor: &mut usize,
    ) -> Result<File, MetadataError> {
        let mut dict = match elem {
            BencodeElem::Dictionary(dict) => dict,
            _ => {
                return Err(MetadataError::MalformedFileList(Cow::Borrowed(
                    "\"files\" contains a non-dictionary element",
                )));
            }
        };

        let length = Self::extract_file_length(&mut dict)?;
        let path = Self::extract_file_path(&mut dict)?;
        let md5sum = optional_string(&mut dict, "md5sum")?;
        let piece_span = Self::take_piece_span(length, piece_length, cursor)?;

        Ok(File {
            length,
            path,
            md5sum,
            piece_span,
        })
    }

    fn extract_file_length(dict: &mut Dict) -> Result<i64, MetadataError> {
        match dict.remove("length".as_bytes()) {
            Some(BencodeElem::Integer(len)) => {
                if len > 0 {
                    Ok(len)
                } else {
                    Err(MetadataError::MalformedFileList(Cow::Borrowed(
                        "\"length\" is not positive",
                    )))
                }
            }
            Some(_) => Err(MetadataError::WrongType("length")),
            None => Err(MetadataError::MissingField("length")),
        }
    }

    fn extract_file_path(dict: &mut Dict) -> Result<PathBuf, MetadataError> {
        let list = match dict.remove("path".as_bytes()) {
            Some(BencodeElem::List(list)) => list,
            Some(_) => return Err(MetadataError::WrongType("path")),
            None => return Err(MetadataError::MissingField("path")),
        };
        if list.is_empty() {
            return Err(MetadataError::MalformedFileList(Cow::Borrowed(
                "\"path\" maps to a 0-length list",
            )));
        }

        let mut path = PathBuf::new();
        for component in list {
            let component = match component {
                BencodeElem::Bytes(bytes) => String::from_utf8(bytes).map_err(|_| {
                    MetadataError::MalformedFileList(Cow::Borrowed(
                        "\"path\" contains a non-UTF-8 component",
                    ))
                })?,
                _ => {
                    return Err(MetadataError::MalformedFileList(Cow::Borrowed(
                        "\"path\" contains a non-string element",
                    )));
                }
            };
            // "Path components exactly matching '.' and '..'
            // must be sanitized."
            if component.is_empty() || (component == ".") || (component == "..") {
                return Err(MetadataError::MalformedFileList(Cow::Borrowed(
                    "\"path\" contains an empty, \".\", or \"..\" component",
                )));
            }
            path.push(component);
        }
        Ok(path)
    }

    // each file takes `ceil(length / piece_length)` slots off a cursor
    // shared by all files of the torrent
    fn take_piece_span(
        length: i64,
        piece_length: i64,
        cursor: &mut usize,
    ) -> Result<std::ops::Range<usize>, MetadataError> {
        let slots = length
            .checked_add(piece_length - 1)
            .map(|n| n / piece_length)
            .and_then(util::i64_to_usize)
            .ok_or(MetadataError::MalformedFileList(Cow::Borrowed(
                "file piece span overflowed",
            )))?;
        let end = cursor
            .checked_add(slots)
            .ok_or(MetadataError::MalformedFileList(Cow::Borrowed(
                "file piece span overflowed",
            )))?;

        let span = *cursor..end;
        *cursor = end;
        Ok(span)
    }
}

impl Torrent {
    /// Parse `bytes` and return the extracted `Torrent`.
    ///
    /// Decoding is strict: a torrent file whose dictionaries are not
    /// canonically sorted would re-encode to different bytes and hence
    /// to a different info-hash, so such input is rejected outright.
    ///
    /// If `bytes` is missing any required field (e.g. `info`), or if any
    /// other error is encountered (e.g. `IOError`), then `Err(error)`
    /// will be returned.
    pub fn read_from_bytes<B>(bytes: B) -> Result<Torrent, MetadataError>
    where
        B: AsRef<[u8]>,
    {
        Self::from_parsed(BencodeElem::from_bytes_strict(bytes)?)
    }

    /// Parse the content of the file at `path` and return the extracted
    /// `Torrent`.
    ///
    /// If the file at `path` is missing any required field (e.g. `info`),
    /// or if any other error is encountered (e.g. `IOError`), then
    /// `Err(error)` will be returned.
    pub fn read_from_file<P>(path: P) -> Result<Torrent, MetadataError>
    where
        P: AsRef<Path>,
    {
        Self::from_parsed(BencodeElem::from_file(path)?)
    }

    /// Extract a `Torrent` from an already-decoded element, which must
    /// be a dictionary with the layout of a *.torrent* file.
    pub fn from_value(elem: BencodeElem) -> Result<Torrent, MetadataError> {
        let mut dict = match elem {
            BencodeElem::Dictionary(dict) => dict,
            _ => return Err(MetadataError::WrongType("torrent")),
        };

        // 2nd-level items
        let announce = required_string(&mut dict, "announce")?;
        let backup_trackers = Self::extract_backup_trackers(&mut dict)?;
        let creation_date = optional_integer(&mut dict, "creation date")?.unwrap_or(0);
        let comment = optional_string(&mut dict, "comment")?;
        let created_by = optional_string(&mut dict, "created by")?;

        // the original `info` element is kept whole: the info-hash is
        // computed over its canonical encoding, never over a
        // reconstruction
        let mut fields = match dict.remove("info".as_bytes()) {
            Some(BencodeElem::Dictionary(fields)) => fields,
            Some(_) => return Err(MetadataError::WrongType("info")),
            None => return Err(MetadataError::MissingField("info")),
        };
        let info = BencodeElem::Dictionary(fields.clone());
        let info_hash: [u8; 20] = Sha1::digest(&info.encode()).into();

        // 3rd-level items
        let name = required_string(&mut fields, "name")?;
        let piece_length = Self::extract_piece_length(&mut fields)?;
        let pieces = Self::extract_pieces(&mut fields)?;
        let private = match fields.remove("private".as_bytes()) {
            Some(BencodeElem::Integer(val)) => val == 1,
            _ => false,
        };
        let (layout, length) = Self::extract_layout(&mut fields, piece_length)?;

        Torrent {
            announce,
            backup_trackers,
            creation_date,
            comment,
            created_by,
            name,
            piece_length,
            pieces,
            private,
            layout,
            length,
            info,
            info_hash,
        }
        .validate()
    }

    // @note: Most of validation is done when extracting individual
    // fields, so there's not much going on here.
    fn validate(self) -> Result<Torrent, MetadataError> {
        if self.length <= 0 {
            return Err(MetadataError::MalformedFileList(Cow::Borrowed(
                "torrent's length is not positive",
            )));
        }

        let capacity = util::i64_to_usize(self.piece_length)
            .and_then(|len| len.checked_mul(self.pieces.len()))
            .ok_or(MetadataError::MalformedPieces(Cow::Borrowed(
                "total piece capacity overflowed in usize",
            )))?;
        match util::i64_to_usize(self.length) {
            Some(length) if capacity >= length => Ok(self),
            _ => Err(MetadataError::MalformedPieces(Cow::Owned(format!(
                "total piece capacity {} < torrent's length {}",
                capacity, self.length,
            )))),
        }
    }

    fn from_parsed(mut parsed: Vec<BencodeElem>) -> Result<Torrent, MetadataError> {
        // a torrent file contains 1 and only 1 top-level element
        match parsed.len() {
            0 => Err(MetadataError::MissingField("torrent")),
            1 => Self::from_value(parsed.remove(0)),
            _ => Err(MetadataError::WrongType("torrent")),
        }
    }

    fn extract_backup_trackers(dict: &mut Dict) -> Result<Vec<String>, MetadataError> {
        // tiers are flattened in file order; tier boundaries carry no
        // meaning here because failover policy is left to the caller
        let tiers = match dict.remove("announce-list".as_bytes()) {
            Some(BencodeElem::List(tiers)) => tiers,
            Some(_) => return Err(MetadataError::WrongType("announce-list")),
            // Since BEP 12 is an extension,
            // the existence of `announce-list` is not guaranteed.
            None => return Ok(Vec::new()),
        };

        let mut backups = Vec::new();
        for tier in tiers {
            let urls = match tier {
                BencodeElem::List(urls) => urls,
                _ => return Err(MetadataError::WrongType("announce-list")),
            };
            for url in urls {
                match url {
                    BencodeElem::Bytes(url) => backups.push(
                        String::from_utf8(url)
                            .map_err(|_| MetadataError::WrongType("announce-list"))?,
                    ),
                    _ => return Err(MetadataError::WrongType("announce-list")),
                }
            }
        }
        Ok(backups)
    }

    fn extract_piece_length(dict: &mut Dict) -> Result<i64, MetadataError> {
        match dict.remove("piece length".as_bytes()) {
            Some(BencodeElem::Integer(len)) => {
                if len > 0 {
                    Ok(len)
                } else {
                    Err(MetadataError::MalformedPieces(Cow::Borrowed(
                        "\"piece length\" is not positive",
                    )))
                }
            }
            Some(_) => Err(MetadataError::WrongType("piece length")),
            None => Err(MetadataError::MissingField("piece length")),
        }
    }

    fn extract_pieces(dict: &mut Dict) -> Result<Vec<Piece>, MetadataError> {
        match dict.remove("pieces".as_bytes()) {
            Some(BencodeElem::Bytes(bytes)) => {
                if bytes.is_empty() {
                    Err(MetadataError::MalformedPieces(Cow::Borrowed(
                        "\"pieces\" maps to an empty sequence",
                    )))
                } else if (bytes.len() % PIECE_STRING_LENGTH) != 0 {
                    Err(MetadataError::MalformedPieces(Cow::Owned(format!(
                        "\"pieces\"' length is not a multiple of {}",
                        PIECE_STRING_LENGTH,
                    ))))
                } else {
                    Ok(bytes
                        .chunks_exact(PIECE_STRING_LENGTH)
                        .map(|chunk| {
                            let mut piece = [0; PIECE_STRING_LENGTH];
                            piece.copy_from_slice(chunk);
                            piece
                        })
                        .collect())
                }
            }
            Some(_) => Err(MetadataError::WrongType("pieces")),
            None => Err(MetadataError::MissingField("pieces")),
        }
    }

    fn extract_layout(
        dict: &mut Dict,
        piece_length: i64,
    ) -> Result<(FileLayout, i64), MetadataError> {
        let list = match dict.remove("files".as_bytes()) {
            Some(BencodeElem::List(list)) => list,
            Some(_) => return Err(MetadataError::WrongType("files")),
            None => {
                // single-file layout
                let length = match dict.remove("length".as_bytes()) {
                    Some(BencodeElem::Integer(len)) => len,
                    Some(_) => return Err(MetadataError::WrongType("length")),
                    None => return Err(MetadataError::MissingField("length")),
                };
                let md5sum = optional_string(dict, "md5sum")?;
                return Ok((FileLayout::Single { md5sum }, length));
            }
        };

        if dict.contains_key("length".as_bytes()) {
            return Err(MetadataError::MalformedFileList(Cow::Borrowed(
                "both \"length\" and \"files\" exist",
            )));
        }
        if list.is_empty() {
            return Err(MetadataError::MalformedFileList(Cow::Borrowed(
                "\"files\" maps to an empty list",
            )));
        }

        let mut files = Vec::new();
        let mut cursor = 0;
        let mut length: i64 = 0;
        for entry in list {
            let file = File::extract_file(entry, piece_length, &mut cursor)?;
            length = length
                .checked_add(file.length)
                .ok_or(MetadataError::MalformedFileList(Cow::Borrowed(
                    "torrent's length overflowed in i64",
                )))?;
            files.push(file);
        }
        Ok((FileLayout::Multiple { files }, length))
    }
}

#[cfg(test)]
mod file_read_tests {
    use super::*;

    #[test]
    fn extract_file_ok() {
        let file = bencode_elem!({
            ("length", 42),
            ("path", ["root", "file"]),
        });
        let mut cursor = 0;

        assert_eq!(
            File::extract_file(file, 16, &mut cursor).unwrap(),
            File {
                length: 42,
                path: PathBuf::from("root/file"),
                md5sum: None,
                piece_span: 0..3,
            }
        );
        assert_eq!(cursor, 3);
    }

    #[test]
    fn extract_file_with_md5sum() {
        let file = bencode_elem!({
            ("length", 16),
            ("md5sum", "d41d8cd98f00b204e9800998ecf8427e"),
            ("path", ["file"]),
        });
        let mut cursor = 2;

        let file = File::extract_file(file, 16, &mut cursor).unwrap();
        assert_eq!(
            file.md5sum.as_deref(),
            Some("d41d8cd98f00b204e9800998ecf8427e")
        );
        assert_eq!(file.piece_span, 2..3);
    }

    #[test]
    fn extract_file_not_dictionary() {
        let mut cursor = 0;
        match File::extract_file(bencode_elem!([]), 16, &mut cursor) {
            Err(MetadataError::MalformedFileList(_)) => (),
            _ => panic!(),
        }
    }

    #[test]
    fn extract_file_length_not_positive() {
        let mut dict = bencode_dict(vec![("length", bencode_elem!(0))]);
        match File::extract_file_length(&mut dict) {
            Err(MetadataError::MalformedFileList(_)) => (),
            _ => panic!(),
        }
    }

    #[test]
    fn extract_file_length_not_integer() {
        let mut dict = bencode_dict(vec![("length", bencode_elem!("42"))]);
        match File::extract_file_length(&mut dict) {
            Err(MetadataError::WrongType(field)) => assert_eq!(field, "length"),
            _ => panic!(),
        }
    }

    #[test]
    fn extract_file_length_missing() {
        let mut dict = Dict::new();
        match File::extract_file_length(&mut dict) {
            Err(MetadataError::MissingField(field)) => assert_eq!(field, "length"),
            _ => panic!(),
        }
    }

    #[test]
    fn extract_file_path_ok() {
        let mut dict = bencode_dict(vec![("path", bencode_elem!(["root", ".bashrc"]))]);
        assert_eq!(
            File::extract_file_path(&mut dict).unwrap(),
            PathBuf::from("root/.bashrc")
        );
    }

    #[test]
    fn extract_file_path_not_list() {
        let mut dict = bencode_dict(vec![("path", bencode_elem!("root/.bashrc"))]);
        match File::extract_file_path(&mut dict) {
            Err(MetadataError::WrongType(field)) => assert_eq!(field, "path"),
            _ => panic!(),
        }
    }

    #[test]
    fn extract_file_path_empty_list() {
        let mut dict = bencode_dict(vec![("path", bencode_elem!([]))]);
        match File::extract_file_path(&mut dict) {
            Err(MetadataError::MalformedFileList(_)) => (),
            _ => panic!(),
        }
    }

    #[test]
    fn extract_file_path_component_invalid() {
        for component in &[".", "..", ""] {
            let mut dict = bencode_dict(vec![(
                "path",
                BencodeElem::List(vec![
                    BencodeElem::from("root"),
                    BencodeElem::from(*component),
                ]),
            )]);
            match File::extract_file_path(&mut dict) {
                Err(MetadataError::MalformedFileList(_)) => (),
                _ => panic!(),
            }
        }
    }

    #[test]
    fn take_piece_span_exact_multiple() {
        let mut cursor = 0;
        assert_eq!(File::take_piece_span(32, 16, &mut cursor).unwrap(), 0..2);
        assert_eq!(cursor, 2);
    }

    fn bencode_dict(entries: Vec<(&str, BencodeElem)>) -> Dict {
        entries
            .into_iter()
            .map(|(key, val)| (key.as_bytes().to_vec(), val))
            .collect()
    }
}

#[cfg(test)]
mod torrent_read_tests {
    // @note: `read_from_bytes()` and `read_from_file()` are not tested
    // as they are best left to integration tests (in `tests/`).
    use super::*;

    fn sample_info() -> BencodeElem {
        bencode_elem!({
            ("length", 2),
            ("name", "sample"),
            ("piece length", 2),
            (
                "pieces",
                (0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09,
                    0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f, 0x10, 0x11, 0x12, 0x13)
            ),
        })
    }

    #[test]
    fn from_value_ok() {
        let torrent = Torrent::from_value(bencode_elem!({
            ("announce", "url"),
            ("info", {
                ("length", 2),
                ("name", "sample"),
                ("piece length", 2),
                (
                    "pieces",
                    (0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09,
                        0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f, 0x10, 0x11, 0x12, 0x13)
                ),
            }),
        }))
        .unwrap();

        assert_eq!(torrent.announce, "url");
        assert_eq!(torrent.backup_trackers, Vec::<String>::new());
        assert_eq!(torrent.creation_date, 0);
        assert_eq!(torrent.comment, None);
        assert_eq!(torrent.created_by, None);
        assert_eq!(torrent.name, "sample");
        assert_eq!(torrent.piece_length, 2);
        assert_eq!(
            torrent.pieces,
            vec![[
                0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c,
                0x0d, 0x0e, 0x0f, 0x10, 0x11, 0x12, 0x13,
            ]]
        );
        assert!(!torrent.private);
        assert_eq!(torrent.layout, FileLayout::Single { md5sum: None });
        assert_eq!(torrent.length, 2);
        assert_eq!(torrent.info(), &sample_info());
    }

    #[test]
    fn from_value_with_optional_fields() {
        let torrent = Torrent::from_value(bencode_elem!({
            ("announce", "url"),
            ("announce-list", [["url1"], ["url2", "url3"]]),
            ("comment", "no comment"),
            ("created by", "pyrite"),
            ("creation date", 100),
            ("info", {
                ("length", 2),
                ("name", "sample"),
                ("piece length", 2),
                ("private", 1),
                (
                    "pieces",
                    (0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09,
                        0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f, 0x10, 0x11, 0x12, 0x13)
                ),
            }),
        }))
        .unwrap();

        assert_eq!(
            torrent.backup_trackers,
            vec!["url1".to_owned(), "url2".to_owned(), "url3".to_owned()]
        );
        assert_eq!(torrent.comment.as_deref(), Some("no comment"));
        assert_eq!(torrent.created_by.as_deref(), Some("pyrite"));
        assert_eq!(torrent.creation_date, 100);
        assert!(torrent.private);
    }

    #[test]
    fn from_value_multi_file_piece_spans() {
        // piece length 16, file lengths 20 and 10:
        // ceil(20 / 16) = 2 slots, then ceil(10 / 16) = 1 slot
        let torrent = Torrent::from_value(bencode_elem!({
            ("announce", "url"),
            ("info", {
                ("files", [
                    { ("length", 20), ("path", ["a"]) },
                    { ("length", 10), ("path", ["dir", "b"]) },
                ]),
                ("name", "sample"),
                ("piece length", 16),
                (
                    "pieces",
                    (0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09,
                        0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f, 0x10, 0x11, 0x12, 0x13,
                        0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09,
                        0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f, 0x10, 0x11, 0x12, 0x13)
                ),
            }),
        }))
        .unwrap();

        assert_eq!(torrent.length, 30);
        match torrent.layout {
            FileLayout::Multiple { ref files } => {
                assert_eq!(files.len(), 2);
                assert_eq!(files[0].piece_span, 0..2);
                assert_eq!(files[0].path, PathBuf::from("a"));
                assert_eq!(files[1].piece_span, 2..3);
                assert_eq!(files[1].path, PathBuf::from("dir/b"));
            }
            _ => panic!(),
        }
    }

    #[test]
    fn from_value_length_and_files_conflict() {
        match Torrent::from_value(bencode_elem!({
            ("announce", "url"),
            ("info", {
                ("files", [{ ("length", 2), ("path", ["a"]) }]),
                ("length", 2),
                ("name", "sample"),
                ("piece length", 2),
                (
                    "pieces",
                    (0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09,
                        0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f, 0x10, 0x11, 0x12, 0x13)
                ),
            }),
        })) {
            Err(MetadataError::MalformedFileList(_)) => (),
            _ => panic!(),
        }
    }

    #[test]
    fn from_value_info_missing() {
        match Torrent::from_value(bencode_elem!({ ("announce", "url") })) {
            Err(MetadataError::MissingField(field)) => assert_eq!(field, "info"),
            _ => panic!(),
        }
    }

    #[test]
    fn from_value_info_not_dict() {
        match Torrent::from_value(bencode_elem!({ ("announce", "url"), ("info", []) })) {
            Err(MetadataError::WrongType(field)) => assert_eq!(field, "info"),
            _ => panic!(),
        }
    }

    #[test]
    fn from_value_announce_missing() {
        match Torrent::from_value(bencode_elem!({})) {
            Err(MetadataError::MissingField(field)) => assert_eq!(field, "announce"),
            _ => panic!(),
        }
    }

    #[test]
    fn from_value_not_dict() {
        match Torrent::from_value(bencode_elem!([])) {
            Err(MetadataError::WrongType(field)) => assert_eq!(field, "torrent"),
            _ => panic!(),
        }
    }

    #[test]
    fn from_value_pieces_not_multiple_of_20() {
        match Torrent::from_value(bencode_elem!({
            ("announce", "url"),
            ("info", {
                ("length", 2),
                ("name", "sample"),
                ("piece length", 2),
                ("pieces", (0x00, 0x01, 0x02)),
            }),
        })) {
            Err(MetadataError::MalformedPieces(_)) => (),
            _ => panic!(),
        }
    }

    #[test]
    fn from_value_piece_capacity_too_small() {
        match Torrent::from_value(bencode_elem!({
            ("announce", "url"),
            ("info", {
                ("length", 100),
                ("name", "sample"),
                ("piece length", 2),
                (
                    "pieces",
                    (0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09,
                        0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f, 0x10, 0x11, 0x12, 0x13)
                ),
            }),
        })) {
            Err(MetadataError::MalformedPieces(_)) => (),
            _ => panic!(),
        }
    }

    #[test]
    fn from_value_piece_length_not_positive() {
        match Torrent::from_value(bencode_elem!({
            ("announce", "url"),
            ("info", {
                ("length", 2),
                ("name", "sample"),
                ("piece length", 0),
                (
                    "pieces",
                    (0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09,
                        0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f, 0x10, 0x11, 0x12, 0x13)
                ),
            }),
        })) {
            Err(MetadataError::MalformedPieces(_)) => (),
            _ => panic!(),
        }
    }

    #[test]
    fn info_hash_is_stable() {
        let build = || {
            Torrent::from_value(bencode_elem!({
                ("announce", "url"),
                ("info", {
                    ("length", 2),
                    ("name", "sample"),
                    ("piece length", 2),
                    (
                        "pieces",
                        (0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09,
                            0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f, 0x10, 0x11, 0x12, 0x13)
                    ),
                }),
            }))
            .unwrap()
        };

        assert_eq!(build().info_hash(), build().info_hash());
    }

    #[test]
    fn info_hash_ignores_fields_outside_info() {
        let with_comment = Torrent::from_value(bencode_elem!({
            ("announce", "url"),
            ("comment", "no comment"),
            ("info", {
                ("length", 2),
                ("name", "sample"),
                ("piece length", 2),
                (
                    "pieces",
                    (0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09,
                        0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f, 0x10, 0x11, 0x12, 0x13)
                ),
            }),
        }))
        .unwrap();
        let without_comment = Torrent::from_value(bencode_elem!({
            ("announce", "other url"),
            ("info", {
                ("length", 2),
                ("name", "sample"),
                ("piece length", 2),
                (
                    "pieces",
                    (0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09,
                        0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f, 0x10, 0x11, 0x12, 0x13)
                ),
            }),
        }))
        .unwrap();

        assert_eq!(with_comment.info_hash(), without_comment.info_hash());
    }

    #[test]
    fn info_hash_tracks_fields_inside_info() {
        let build = |name: &'static str| {
            Torrent::from_value(bencode_elem!({
                ("announce", "url"),
                ("info", {
                    ("length", 2),
                    ("name", name),
                    ("piece length", 2),
                    (
                        "pieces",
                        (0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09,
                            0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f, 0x10, 0x11, 0x12, 0x13)
                    ),
                }),
            }))
            .unwrap()
        };

        assert_ne!(build("sample").info_hash(), build("other").info_hash());
    }

    #[test]
    fn info_hash_covers_unknown_info_fields() {
        // extension fields inside `info` take part in identity
        let plain = Torrent::from_value(bencode_elem!({
            ("announce", "url"),
            ("info", {
                ("length", 2),
                ("name", "sample"),
                ("piece length", 2),
                (
                    "pieces",
                    (0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09,
                        0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f, 0x10, 0x11, 0x12, 0x13)
                ),
            }),
        }))
        .unwrap();
        let extended = Torrent::from_value(bencode_elem!({
            ("announce", "url"),
            ("info", {
                ("length", 2),
                ("name", "sample"),
                ("piece length", 2),
                (
                    "pieces",
                    (0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09,
                        0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f, 0x10, 0x11, 0x12, 0x13)
                ),
                ("source", "somewhere"),
            }),
        }))
        .unwrap();

        assert_ne!(plain.info_hash(), extended.info_hash());
    }
}
