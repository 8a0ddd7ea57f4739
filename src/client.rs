//! Module for the announce lifecycle of a single torrent: a small
//! state machine around [`TrackerSession`](../tracker/struct.TrackerSession.html)
//! plus peer-id generation.
//!
//! The peer-wire protocol is out of scope. Callers that implement it
//! drive the state machine and feed the transfer counters; this module
//! only decides what to tell the tracker and when.

use crate::torrent::Torrent;
use crate::tracker::{TrackerError, TrackerSession};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::fmt;
use thiserror::Error;

const PEER_ID_LENGTH: usize = 20;
const DEFAULT_NUM_WANT: i64 = 25;

/// Where a client is in its lifecycle.
///
/// `Scraping` is only ever observable from another thread: it is set
/// for the duration of a blocking announce and replaced before the
/// announce method returns. `Error` is terminal.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ClientState {
    /// Not associated with a torrent yet.
    None,
    /// Constructed, nothing announced.
    Ready,
    /// Announced, waiting for a download slot.
    Queued,
    /// A blocking announce is in flight.
    Scraping,
    /// Transferring pieces.
    Downloading,
    /// Waiting between transfer rounds.
    Waiting,
    /// Download finished, uploading to the swarm.
    Seeding,
    /// Download finished and reported to the tracker.
    Done,
    /// Waiting for a seeding slot.
    SeedQueued,
    /// Left the swarm.
    Stopped,
    /// A tracker exchange failed. No further transitions.
    Error,
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match *self {
            ClientState::None => "none",
            ClientState::Ready => "ready",
            ClientState::Queued => "queued",
            ClientState::Scraping => "scraping",
            ClientState::Downloading => "downloading",
            ClientState::Waiting => "waiting",
            ClientState::Seeding => "seeding",
            ClientState::Done => "done",
            ClientState::SeedQueued => "seed-queued",
            ClientState::Stopped => "stopped",
            ClientState::Error => "error",
        };
        write!(f, "{}", name)
    }
}

/// Client emulation profiles: the peer-id prefix and user agent of
/// well-known clients, for trackers that gate on identification.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ClientProfile {
    /// This library's own identity.
    Default,
    Deluge,
    Transmission,
    UTorrent,
}

/// Error driving a [`Client`](struct.Client.html).
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("cannot {1} while {0}")]
    InvalidState(ClientState, &'static str),
    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

/// The announce lifecycle of one torrent.
///
/// Transfer counters only ever grow, and `left` is recomputed from
/// them at every announce; a failed announce leaves them untouched.
pub struct Client {
    torrent: Torrent,
    session: TrackerSession,
    state: ClientState,
    total_uploaded: i64,
    total_downloaded: i64,
    num_want: i64,
}

/// Generate a peer id in the Azureus style
/// ([BEP 20](http://bittorrent.org/beps/bep_0020.html)):
/// `-<2-byte client id><4-byte version>-` followed by 12 random
/// alphanumerics. Inputs are truncated or padded with `0` to fit,
/// as raw bytes.
pub fn new_peer_id(client_id: &str, version: &str) -> [u8; 20] {
    let mut bytes = Vec::with_capacity(PEER_ID_LENGTH);
    bytes.push(b'-');
    bytes.extend(client_id.bytes().chain(std::iter::repeat(b'0')).take(2));
    bytes.extend(version.bytes().chain(std::iter::repeat(b'0')).take(4));
    bytes.push(b'-');

    let mut rng = rand::thread_rng();
    while bytes.len() < PEER_ID_LENGTH {
        bytes.push(rng.sample(Alphanumeric));
    }

    let mut peer_id = [0; PEER_ID_LENGTH];
    peer_id.copy_from_slice(&bytes);
    peer_id
}

impl Client {
    /// Create a client for `torrent` in the `Ready` state. `port` is
    /// the port the caller listens on. If `peer_id` is `None` a fresh
    /// default-profile id is generated.
    pub fn new(
        torrent: Torrent,
        port: u16,
        peer_id: Option<[u8; 20]>,
    ) -> Result<Client, ClientError> {
        let peer_id = peer_id.unwrap_or_else(|| new_peer_id("PY", "0100"));
        let mut session = TrackerSession::new(torrent.announce.clone(), peer_id, port)?;
        session.backup_trackers = torrent.backup_trackers.clone();

        Ok(Client {
            torrent,
            session,
            state: ClientState::Ready,
            total_uploaded: 0,
            total_downloaded: 0,
            num_want: DEFAULT_NUM_WANT,
        })
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn torrent(&self) -> &Torrent {
        &self.torrent
    }

    /// The underlying tracker session, including the peer list and
    /// interval from the last committed announce.
    pub fn session(&self) -> &TrackerSession {
        &self.session
    }

    pub fn total_uploaded(&self) -> i64 {
        self.total_uploaded
    }

    pub fn total_downloaded(&self) -> i64 {
        self.total_downloaded
    }

    /// Bytes still missing, as reported to the tracker.
    pub fn remaining(&self) -> i64 {
        (self.torrent.length - self.total_downloaded).max(0)
    }

    /// How many peers to ask the tracker for.
    pub fn set_num_want(&mut self, num_want: i64) {
        self.num_want = num_want;
    }

    pub fn set_peer_id(&mut self, peer_id: [u8; 20]) {
        self.session.set_peer_id(peer_id);
    }

    pub fn set_user_agent(&mut self, user_agent: String) {
        self.session.set_user_agent(user_agent);
    }

    /// Present this client to trackers as `profile`: sets both the
    /// peer-id prefix and the user agent.
    pub fn emulate(&mut self, profile: ClientProfile) {
        let (client_id, version, user_agent) = match profile {
            ClientProfile::Default => ("PY", "0100", concat!("pyrite/", env!("CARGO_PKG_VERSION"))),
            ClientProfile::Deluge => ("DE", "2110", "Deluge/2.1.1"),
            ClientProfile::Transmission => ("TR", "4000", "Transmission/4.00"),
            ClientProfile::UTorrent => ("UT", "3550", "uTorrent/3.5.5"),
        };

        self.session.set_peer_id(new_peer_id(client_id, version));
        self.session.set_user_agent(user_agent.to_owned());
    }

    /// Record bytes received from peers. Non-positive amounts are
    /// ignored; the counter never decreases.
    pub fn record_downloaded(&mut self, bytes: i64) {
        if bytes > 0 {
            self.total_downloaded = self.total_downloaded.saturating_add(bytes);
        }
    }

    /// Record bytes sent to peers. Non-positive amounts are ignored;
    /// the counter never decreases.
    pub fn record_uploaded(&mut self, bytes: i64) {
        if bytes > 0 {
            self.total_uploaded = self.total_uploaded.saturating_add(bytes);
        }
    }

    /// Announce `started`. On success the client is `Queued`; on
    /// failure it enters the terminal `Error` state with its counters
    /// unchanged.
    pub fn start(&mut self) -> Result<(), ClientError> {
        match self.state {
            ClientState::Ready => (),
            state => return Err(ClientError::InvalidState(state, "start")),
        }

        self.state = ClientState::Scraping;
        match self.session.announce_start(
            self.torrent.info_hash(),
            self.total_uploaded,
            self.total_downloaded,
            self.remaining(),
            Some(self.num_want),
        ) {
            Ok(()) => {
                self.state = ClientState::Queued;
                Ok(())
            }
            Err(e) => {
                self.state = ClientState::Error;
                Err(e.into())
            }
        }
    }

    /// Periodic keep-alive announce. On success the client returns to
    /// the state it was in before the call.
    pub fn update(&mut self) -> Result<(), ClientError> {
        let resumed = match self.state {
            ClientState::None
            | ClientState::Ready
            | ClientState::Stopped
            | ClientState::Error => {
                return Err(ClientError::InvalidState(self.state, "update"));
            }
            state => state,
        };

        self.state = ClientState::Scraping;
        match self.session.announce_update(
            self.torrent.info_hash(),
            self.total_uploaded,
            self.total_downloaded,
            self.remaining(),
            Some(self.num_want),
        ) {
            Ok(()) => {
                self.state = resumed;
                Ok(())
            }
            Err(e) => {
                self.state = ClientState::Error;
                Err(e.into())
            }
        }
    }

    /// Announce `stopped` and leave the swarm. On success the client
    /// is `Stopped` and the session's swarm state is cleared.
    pub fn stop(&mut self) -> Result<(), ClientError> {
        match self.state {
            ClientState::None | ClientState::Ready | ClientState::Error => {
                return Err(ClientError::InvalidState(self.state, "stop"));
            }
            _ => (),
        }

        self.state = ClientState::Scraping;
        match self.session.announce_stop(
            self.torrent.info_hash(),
            self.total_uploaded,
            self.total_downloaded,
            self.remaining(),
        ) {
            Ok(()) => {
                self.state = ClientState::Stopped;
                Ok(())
            }
            Err(e) => {
                self.state = ClientState::Error;
                Err(e.into())
            }
        }
    }

    /// Announce `completed`: the whole payload has been downloaded and
    /// verified. Reports `downloaded` as the torrent's full length and
    /// `left` as zero; on success the client is `Done`.
    pub fn complete(&mut self) -> Result<(), ClientError> {
        match self.state {
            ClientState::None
            | ClientState::Ready
            | ClientState::Stopped
            | ClientState::Done
            | ClientState::Error => {
                return Err(ClientError::InvalidState(self.state, "complete"));
            }
            _ => (),
        }

        self.state = ClientState::Scraping;
        match self.session.announce_complete(
            self.torrent.info_hash(),
            self.total_uploaded,
            self.torrent.length,
            Some(self.num_want),
        ) {
            Ok(()) => {
                self.total_downloaded = self.torrent.length;
                self.state = ClientState::Done;
                Ok(())
            }
            Err(e) => {
                self.state = ClientState::Error;
                Err(e.into())
            }
        }
    }

    /// Hand the state machine to the transfer layer: states like
    /// `Downloading`, `Waiting`, `Seeding` and the queued states are
    /// entered by the caller, not by this module. The `Error` state is
    /// terminal and cannot be left or entered this way.
    pub fn set_state(&mut self, state: ClientState) -> Result<(), ClientError> {
        if self.state == ClientState::Error || state == ClientState::Error {
            return Err(ClientError::InvalidState(self.state, "change state"));
        }
        self.state = state;
        Ok(())
    }
}
