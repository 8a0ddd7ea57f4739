//! Module for *.torrent* metadata
//! ([v1](http://bittorrent.org/beps/bep_0003.html)): parsing, the
//! canonical info-hash, and magnet links.

use crate::bencode::{BencodeElem, DecodeError};
use itertools::Itertools;
use std::borrow::Cow;
use std::fmt;
use std::ops::Range;
use std::path::PathBuf;
use thiserror::Error;

mod read;

const PIECE_STRING_LENGTH: usize = 20;

/// A piece in `pieces`, the SHA1 hash of a torrent block.
pub type Piece = [u8; PIECE_STRING_LENGTH];
/// Corresponds to a bencode integer. The underlying type is `i64`.
/// Technically a bencode integer has no size limit, but it is not
/// so in the current implementation. By using a type alias it is
/// easier to change the underlying type in the future.
pub type Integer = i64;

/// A file contained in a multi-file torrent.
///
/// Modeled after the specifications
/// in [BEP 3](http://bittorrent.org/beps/bep_0003.html).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct File {
    /// File size in bytes.
    pub length: Integer,
    /// File path, relative to [`Torrent`](struct.Torrent.html)'s `name` field.
    pub path: PathBuf,
    /// MD5 checksum of the file, if the torrent carries one.
    pub md5sum: Option<String>,
    /// Indices into [`Torrent`](struct.Torrent.html)'s `pieces` that cover
    /// this file's data. Each file is given `ceil(length / piece_length)`
    /// slots from a cursor that advances in file order, so spans are
    /// contiguous and non-overlapping. They are not required to exhaust
    /// the piece list.
    pub piece_span: Range<usize>,
}

/// How a torrent's payload maps to the file system.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FileLayout {
    /// A single file named after the torrent's `name`.
    Single {
        /// MD5 checksum of the file, if the torrent carries one.
        md5sum: Option<String>,
    },
    /// Multiple files under a root directory named after the torrent's
    /// `name`. Guaranteed non-empty.
    Multiple { files: Vec<File> },
}

/// Everything found in a *.torrent* file.
///
/// Modeled after the specifications
/// in [BEP 3](http://bittorrent.org/beps/bep_0003.html) and
/// [BEP 12](http://bittorrent.org/beps/bep_0012.html).
///
/// The decoded `info` dictionary is retained as-is, and the info-hash is
/// computed over its canonical encoding exactly once, at construction.
/// It is deliberately not reconstructed from the extracted fields:
/// rebuilding would drop unknown extension fields and change the hash.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Torrent {
    /// URL of the torrent's tracker.
    pub announce: String,
    /// Flattened `announce-list`
    /// ([BEP 12](http://bittorrent.org/beps/bep_0012.html)), tiers
    /// concatenated in file order. Empty if the torrent has none.
    pub backup_trackers: Vec<String>,
    /// Creation time in seconds since the Unix epoch, `0` if absent.
    pub creation_date: Integer,
    /// Free-form comment.
    pub comment: Option<String>,
    /// Name and version of the program that created the torrent.
    pub created_by: Option<String>,
    /// If the torrent contains only 1 file then `name` is the file name.
    /// Otherwise it's the suggested root directory's name. Advisory only;
    /// it takes no part in identity.
    pub name: String,
    /// Block size in bytes. Always positive.
    pub piece_length: Integer,
    /// SHA1 hashes of each block.
    pub pieces: Vec<Piece>,
    /// The `private` flag as defined in
    /// [BEP 27](http://bittorrent.org/beps/bep_0027.html).
    pub private: bool,
    /// Single-file or multi-file payload.
    pub layout: FileLayout,
    /// Total torrent size in bytes (i.e. sum of all files' sizes).
    pub length: Integer,
    info: BencodeElem,
    info_hash: [u8; 20],
}

/// Error extracting a [`Torrent`](struct.Torrent.html) from bencode.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("\"{0}\" does not exist")]
    MissingField(&'static str),
    #[error("\"{0}\" does not map to the expected type")]
    WrongType(&'static str),
    #[error("malformed \"pieces\": {0}")]
    MalformedPieces(Cow<'static, str>),
    #[error("malformed file list: {0}")]
    MalformedFileList(Cow<'static, str>),
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}

impl Torrent {
    /// The 20-byte info-hash, computed over the canonical encoding of
    /// the torrent's original `info` dictionary.
    pub fn info_hash(&self) -> [u8; 20] {
        self.info_hash
    }

    /// The info-hash as a lowercase hex string.
    pub fn info_hash_hex(&self) -> String {
        format!("{:02x}", self.info_hash.iter().format(""))
    }

    /// The torrent's original `info` element, exactly as decoded.
    pub fn info(&self) -> &BencodeElem {
        &self.info
    }

    /// Check if this torrent is private as defined in
    /// [BEP 27](http://bittorrent.org/beps/bep_0027.html).
    ///
    /// Returns `true` if `private` maps to a bencode integer `1`.
    pub fn is_private(&self) -> bool {
        self.private
    }

    /// Calculate the `Torrent`'s magnet link as defined in
    /// [BEP 9](http://bittorrent.org/beps/bep_0009.html).
    ///
    /// The `dn` parameter is set to `self.name`. One `tr` entry is
    /// emitted for `self.announce` and one for each backup tracker.
    pub fn magnet_link(&self) -> String {
        format!(
            "magnet:?xt=urn:btih:{}&dn={}&tr={}{}",
            self.info_hash_hex(),
            self.name,
            self.announce,
            self.backup_trackers
                .iter()
                .format_with("", |url, f| f(&format_args!("&tr={}", url))),
        )
    }
}

impl fmt::Display for File {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "{}\n\
             -size: {} bytes",
            self.path.as_path().display(),
            self.length
        )?;
        if let Some(ref md5sum) = self.md5sum {
            writeln!(f, "-md5sum: {}", md5sum)?;
        }
        writeln!(f, "-pieces: [{}, {})", self.piece_span.start, self.piece_span.end)?;
        writeln!(f, "========================================")
    }
}

impl fmt::Display for Torrent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}.torrent", self.name)?;
        writeln!(f, "-announce: {}", self.announce)?;
        if !self.backup_trackers.is_empty() {
            writeln!(
                f,
                "-backup trackers: [{}]",
                itertools::join(&self.backup_trackers, ", ")
            )?;
        }
        writeln!(f, "-size: {} bytes", self.length)?;
        writeln!(f, "-piece length: {} bytes", self.piece_length)?;
        if self.private {
            writeln!(f, "-private")?;
        }
        if self.creation_date != 0 {
            writeln!(f, "-creation date: {}", self.creation_date)?;
        }
        if let Some(ref comment) = self.comment {
            writeln!(f, "-comment: {}", comment)?;
        }
        if let Some(ref created_by) = self.created_by {
            writeln!(f, "-created by: {}", created_by)?;
        }

        if let FileLayout::Multiple { ref files } = self.layout {
            writeln!(f, "-files:")?;
            for (counter, file) in files.iter().enumerate() {
                writeln!(f, "[{}] {}", counter + 1, file)?;
            }
        }

        writeln!(
            f,
            "-pieces: [{}]",
            self.pieces.iter().format_with(", ", |piece, f| {
                f(&format_args!("[{:02x}]", piece.iter().format("")))
            }),
        )
    }
}
