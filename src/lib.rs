//! `pyrite` is the tracker-facing side of a BitTorrent client: a bencode
//! codec, a *.torrent* metadata model (including the canonical info-hash),
//! a blocking HTTP tracker announce client, and a small session lifecycle
//! state machine tying them together.
//!
//! # *Quick Start*
//! Read a torrent and print it and its info hash.
//!
//! ```no_run
//! use pyrite::torrent::Torrent;
//!
//! let torrent = Torrent::read_from_file("sample.torrent").unwrap();
//! println!("{}", torrent);
//! println!("Info hash: {}", torrent.info_hash_hex());
//! ```
//!
//! Announce to the torrent's tracker and walk the session lifecycle.
//!
//! ```no_run
//! use pyrite::client::Client;
//! use pyrite::torrent::Torrent;
//!
//! let torrent = Torrent::read_from_file("sample.torrent").unwrap();
//! let mut client = Client::new(torrent, 6881, None).unwrap();
//! client.start().unwrap();
//! println!("{} peers", client.session().peers.len());
//! client.stop().unwrap();
//! ```
//!
//! # *Overview*
//! - Methods for parsing and encoding are generally bound to structs (i.e.
//!   they are "associated methods"). Methods that are general enough are
//!   placed at the module-level (e.g.
//!   [`pyrite::bencode::write::encode_bytes()`](bencode/write/fn.encode_bytes.html)).
//! - The peer-wire protocol (handshakes, piece exchange, choking), disk
//!   I/O, and piece verification are out of scope. Callers that implement
//!   them drive [`Client`](client/struct.Client.html) and feed its
//!   counters.
//! - Errors are explicit per concern:
//!   [`DecodeError`](bencode/enum.DecodeError.html) /
//!   [`EncodeError`](bencode/enum.EncodeError.html) for the codec,
//!   [`MetadataError`](torrent/enum.MetadataError.html) for torrent files,
//!   [`TrackerError`](tracker/enum.TrackerError.html) for announces.
//!
//! # *Known Issues*
//! 1. [BEP 3](http://bittorrent.org/beps/bep_0003.html) specifies that a
//!    bencode integer has no size limit. Using a 64-bit signed integer to
//!    represent a bencode integer is more-than sufficient in practice, so
//!    `i64` is used in the current implementation. If a bencode integer
//!    outside the range of `i64` is found, an `Err` will be returned.
//! 2. A few private methods will panic if something that "just won't
//!    happen" happens (e.g. a write into a `Vec<u8>` failing). For the
//!    purpose of full disclosure this behavior is mentioned here, but in
//!    reality panic should never be triggered.

pub(crate) mod util;
#[macro_use]
pub mod bencode;
pub mod client;
pub mod torrent;
pub mod tracker;

pub use crate::client::{Client, ClientError, ClientProfile, ClientState};
pub use crate::torrent::Torrent;
pub use crate::tracker::{Peer, TrackerSession};
