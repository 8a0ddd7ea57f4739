//! Module for HTTP tracker announces
//! ([BEP 3](http://bittorrent.org/beps/bep_0003.html)): request URL
//! construction, the four announce operations, and response parsing.
//!
//! Everything here is synchronous. One announce is one blocking HTTP
//! round trip with a bounded timeout; there is no retry, no backoff,
//! and no tracker failover (backup URLs are carried as data only).

use crate::bencode::{BencodeElem, DecodeError};
use conv::ValueFrom;
use percent_encoding::{percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const COMPACT_PEER_LENGTH: usize = 6;
const DEFAULT_USER_AGENT: &str = concat!("pyrite/", env!("CARGO_PKG_VERSION"));

// "Unreserved" bytes pass through; everything else (including the
// bytes of a binary info-hash) is %-escaped byte-for-byte.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

type Dict = BTreeMap<Vec<u8>, BencodeElem>;

/// A peer returned in a tracker response.
///
/// Compact responses carry no peer ids, so `id` is `None` for them.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Peer {
    pub id: Option<String>,
    pub addr: SocketAddr,
}

/// Announce event as defined in
/// [BEP 3](http://bittorrent.org/beps/bep_0003.html). Regular
/// keep-alive announces carry no event at all.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Event {
    Started,
    Stopped,
    Completed,
}

impl Event {
    fn as_str(self) -> &'static str {
        match self {
            Event::Started => "started",
            Event::Stopped => "stopped",
            Event::Completed => "completed",
        }
    }
}

/// Error announcing to a tracker.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("network failure: {0}")]
    NetworkFailure(reqwest::Error),
    #[error("tracker request timed out")]
    Timeout,
    #[error("tracker returned HTTP status {0}")]
    HttpStatus(u16),
    #[error("tracker response is not valid bencode: {0}")]
    DecodeFailure(#[from] DecodeError),
    #[error("tracker failure: {0}")]
    FailureReason(String),
    #[error("malformed peer list")]
    MalformedPeerList,
    #[error("malformed tracker response: {0}")]
    MalformedResponse(Cow<'static, str>),
}

impl From<reqwest::Error> for TrackerError {
    fn from(e: reqwest::Error) -> TrackerError {
        if e.is_timeout() {
            TrackerError::Timeout
        } else {
            TrackerError::NetworkFailure(e)
        }
    }
}

/// An announce session against a single tracker.
///
/// The session accumulates what the tracker last said (`interval`,
/// swarm counts, the peer list) and what the caller should know about
/// the last exchange (`last_warning`, `last_failure`). Response-derived
/// fields are only committed after a response parses in full, so a
/// failed announce never clobbers the previous peer list.
#[derive(Debug)]
pub struct TrackerSession {
    /// Announce URL queried by every operation.
    pub announce: String,
    /// Backup tracker URLs in file order. Carried as data only; no
    /// failover is performed.
    pub backup_trackers: Vec<String>,
    /// Announce interval in seconds, from the last committed response.
    pub interval: Option<i64>,
    /// Minimum announce interval, if the tracker sent one.
    pub min_interval: Option<i64>,
    /// Number of seeders, if the tracker sent it.
    pub complete: Option<i64>,
    /// Number of leechers, if the tracker sent it.
    pub incomplete: Option<i64>,
    /// Peers from the last committed response.
    pub peers: Vec<Peer>,
    /// Warning message from the last response that carried one.
    pub last_warning: Option<String>,
    /// Why the last announce failed, if it did.
    pub last_failure: Option<String>,
    peer_id: [u8; 20],
    port: u16,
    ip: Option<IpAddr>,
    key: Option<String>,
    user_agent: String,
    tracker_id: Option<String>,
    client: reqwest::blocking::Client,
}

impl TrackerSession {
    /// Create a session for `announce` with no swarm state yet.
    ///
    /// `port` is the port the caller listens on, forwarded verbatim to
    /// the tracker.
    pub fn new(
        announce: String,
        peer_id: [u8; 20],
        port: u16,
    ) -> Result<TrackerSession, TrackerError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .gzip(true)
            .build()?;

        Ok(TrackerSession {
            announce,
            backup_trackers: Vec::new(),
            interval: None,
            min_interval: None,
            complete: None,
            incomplete: None,
            peers: Vec::new(),
            last_warning: None,
            last_failure: None,
            peer_id,
            port,
            ip: None,
            key: None,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            tracker_id: None,
            client,
        })
    }

    pub fn peer_id(&self) -> &[u8; 20] {
        &self.peer_id
    }

    pub fn set_peer_id(&mut self, peer_id: [u8; 20]) {
        self.peer_id = peer_id;
    }

    /// Set the external IP reported to the tracker via the optional
    /// `ip` parameter.
    pub fn set_ip(&mut self, ip: Option<IpAddr>) {
        self.ip = ip;
    }

    /// Set the `key` parameter, an opaque value that lets the tracker
    /// recognize this session across IP changes.
    pub fn set_key(&mut self, key: Option<String>) {
        self.key = key;
    }

    pub fn set_user_agent(&mut self, user_agent: String) {
        self.user_agent = user_agent;
    }

    /// The tracker id echoed back to the tracker once received.
    pub fn tracker_id(&self) -> Option<&str> {
        self.tracker_id.as_deref()
    }

    /// Announce that a download is starting (`event=started`).
    pub fn announce_start(
        &mut self,
        info_hash: [u8; 20],
        uploaded: i64,
        downloaded: i64,
        left: i64,
        numwant: Option<i64>,
    ) -> Result<(), TrackerError> {
        self.announce(
            info_hash,
            Some(Event::Started),
            uploaded,
            downloaded,
            left,
            numwant,
        )
    }

    /// Periodic keep-alive announce. Carries no event.
    pub fn announce_update(
        &mut self,
        info_hash: [u8; 20],
        uploaded: i64,
        downloaded: i64,
        left: i64,
        numwant: Option<i64>,
    ) -> Result<(), TrackerError> {
        self.announce(info_hash, None, uploaded, downloaded, left, numwant)
    }

    /// Announce that this client is leaving the swarm
    /// (`event=stopped`). On success the session's swarm state
    /// (interval, counts, peers) is cleared; trackers send minimal
    /// responses to a stop, so nothing from it is committed.
    pub fn announce_stop(
        &mut self,
        info_hash: [u8; 20],
        uploaded: i64,
        downloaded: i64,
        left: i64,
    ) -> Result<(), TrackerError> {
        self.announce(
            info_hash,
            Some(Event::Stopped),
            uploaded,
            downloaded,
            left,
            None,
        )
    }

    /// Announce that the download finished (`event=completed`,
    /// `left=0`).
    pub fn announce_complete(
        &mut self,
        info_hash: [u8; 20],
        uploaded: i64,
        downloaded: i64,
        numwant: Option<i64>,
    ) -> Result<(), TrackerError> {
        self.announce(
            info_hash,
            Some(Event::Completed),
            uploaded,
            downloaded,
            0,
            numwant,
        )
    }

    fn announce(
        &mut self,
        info_hash: [u8; 20],
        event: Option<Event>,
        uploaded: i64,
        downloaded: i64,
        left: i64,
        numwant: Option<i64>,
    ) -> Result<(), TrackerError> {
        let url = self.request_url(info_hash, event, uploaded, downloaded, left, numwant);
        let result = match self.exchange(&url) {
            Ok(dict) => self.absorb(dict, event),
            Err(e) => Err(e),
        };

        if let Err(ref e) = result {
            self.last_failure = Some(e.to_string());
        }
        result
    }

    fn request_url(
        &self,
        info_hash: [u8; 20],
        event: Option<Event>,
        uploaded: i64,
        downloaded: i64,
        left: i64,
        numwant: Option<i64>,
    ) -> String {
        // announce URLs may already carry query parameters
        let separator = if self.announce.contains('?') { '&' } else { '?' };

        let mut url = format!(
            "{}{}info_hash={}&peer_id={}&port={}&uploaded={}&downloaded={}&left={}\
             &compact=1&no_peer_id=1",
            self.announce,
            separator,
            percent_encode(&info_hash, QUERY_ENCODE_SET),
            percent_encode(&self.peer_id, QUERY_ENCODE_SET),
            self.port,
            uploaded,
            downloaded,
            left,
        );

        if let Some(event) = event {
            url.push_str(&format!("&event={}", event.as_str()));
        }
        if let Some(ref ip) = self.ip {
            url.push_str(&format!("&ip={}", ip));
        }
        if let Some(numwant) = numwant {
            url.push_str(&format!("&numwant={}", numwant));
        }
        if let Some(ref key) = self.key {
            url.push_str(&format!(
                "&key={}",
                percent_encode(key.as_bytes(), QUERY_ENCODE_SET)
            ));
        }
        if let Some(ref tracker_id) = self.tracker_id {
            url.push_str(&format!(
                "&trackerid={}",
                percent_encode(tracker_id.as_bytes(), QUERY_ENCODE_SET)
            ));
        }

        url
    }

    // one blocking round trip; returns the response's top-level
    // dictionary without interpreting it
    fn exchange(&self, url: &str) -> Result<Dict, TrackerError> {
        debug!(url, "tracker announce");

        let response = self
            .client
            .get(url)
            .header(header::USER_AGENT, &self.user_agent)
            .header(header::ACCEPT, "text/plain")
            .header(header::CONNECTION, "close")
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrackerError::HttpStatus(status.as_u16()));
        }

        let body = response.bytes()?;
        debug!(len = body.len(), "tracker response");

        // trackers are not required to sort their dictionaries
        let mut parsed = BencodeElem::from_bytes(&body)?;
        if parsed.len() != 1 {
            return Err(TrackerError::MalformedResponse(Cow::Borrowed(
                "expected a single top-level element",
            )));
        }
        match parsed.remove(0) {
            BencodeElem::Dictionary(dict) => Ok(dict),
            _ => Err(TrackerError::MalformedResponse(Cow::Borrowed(
                "top-level element is not a dictionary",
            ))),
        }
    }

    fn absorb(&mut self, mut dict: Dict, event: Option<Event>) -> Result<(), TrackerError> {
        if let Some(reason) = remove_string(&mut dict, "failure reason") {
            return Err(TrackerError::FailureReason(reason));
        }
        if let Some(warning) = remove_string(&mut dict, "warning message") {
            warn!(warning = %warning, "tracker warning");
            self.last_warning = Some(warning);
        }

        if event == Some(Event::Stopped) {
            self.clear_swarm_state();
            Ok(())
        } else {
            self.commit(dict)
        }
    }

    // parse everything before assigning anything, so a malformed
    // response leaves the previous swarm state intact
    fn commit(&mut self, dict: Dict) -> Result<(), TrackerError> {
        let announce = Announce::parse(dict)?;

        self.interval = Some(announce.interval);
        self.min_interval = announce.min_interval;
        self.complete = announce.complete;
        self.incomplete = announce.incomplete;
        if announce.tracker_id.is_some() {
            self.tracker_id = announce.tracker_id;
        }
        self.peers = announce.peers;
        Ok(())
    }

    fn clear_swarm_state(&mut self) {
        self.interval = None;
        self.min_interval = None;
        self.complete = None;
        self.incomplete = None;
        self.peers.clear();
    }
}

// a fully parsed announce response, assembled before any of it is
// committed to the session
struct Announce {
    interval: i64,
    min_interval: Option<i64>,
    complete: Option<i64>,
    incomplete: Option<i64>,
    tracker_id: Option<String>,
    peers: Vec<Peer>,
}

impl Announce {
    fn parse(mut dict: Dict) -> Result<Announce, TrackerError> {
        let interval = match remove_integer(&mut dict, "interval") {
            Some(interval) => interval,
            None => {
                return Err(TrackerError::MalformedResponse(Cow::Borrowed(
                    "\"interval\" is missing or not an integer",
                )));
            }
        };

        Ok(Announce {
            interval,
            min_interval: remove_integer(&mut dict, "min interval"),
            complete: remove_integer(&mut dict, "complete"),
            incomplete: remove_integer(&mut dict, "incomplete"),
            tracker_id: remove_string(&mut dict, "tracker id"),
            peers: Self::parse_peers(dict.remove("peers".as_bytes()))?,
        })
    }

    // `peers` is polymorphic: a byte string of compact records, or a
    // list of per-peer dictionaries
    fn parse_peers(elem: Option<BencodeElem>) -> Result<Vec<Peer>, TrackerError> {
        match elem {
            Some(BencodeElem::Bytes(bytes)) => Self::parse_compact_peers(&bytes),
            Some(BencodeElem::List(list)) => {
                list.into_iter().map(Self::parse_peer_dictionary).collect()
            }
            Some(_) => Err(TrackerError::MalformedResponse(Cow::Borrowed(
                "\"peers\" is neither a string nor a list",
            ))),
            None => Ok(Vec::new()),
        }
    }

    fn parse_compact_peers(bytes: &[u8]) -> Result<Vec<Peer>, TrackerError> {
        // 4-byte big-endian IPv4 address, then 2-byte big-endian port
        if bytes.len() % COMPACT_PEER_LENGTH != 0 {
            return Err(TrackerError::MalformedPeerList);
        }

        Ok(bytes
            .chunks_exact(COMPACT_PEER_LENGTH)
            .map(|chunk| {
                let ip = Ipv4Addr::new(chunk[0], chunk[1], chunk[2], chunk[3]);
                let port = u16::from_be_bytes([chunk[4], chunk[5]]);
                Peer {
                    id: None,
                    addr: SocketAddr::from((ip, port)),
                }
            })
            .collect())
    }

    fn parse_peer_dictionary(elem: BencodeElem) -> Result<Peer, TrackerError> {
        let mut dict = match elem {
            BencodeElem::Dictionary(dict) => dict,
            _ => return Err(TrackerError::MalformedPeerList),
        };

        let id = remove_string(&mut dict, "peer id");
        let ip = remove_string(&mut dict, "ip")
            .and_then(|ip| ip.parse::<IpAddr>().ok())
            .ok_or(TrackerError::MalformedPeerList)?;
        let port = remove_integer(&mut dict, "port")
            .and_then(|port| u16::value_from(port).ok())
            .ok_or(TrackerError::MalformedPeerList)?;

        Ok(Peer {
            id,
            addr: SocketAddr::new(ip, port),
        })
    }
}

fn remove_string(dict: &mut Dict, field: &str) -> Option<String> {
    match dict.remove(field.as_bytes()) {
        Some(BencodeElem::Bytes(bytes)) => {
            Some(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => None,
    }
}

fn remove_integer(dict: &mut Dict, field: &str) -> Option<i64> {
    match dict.remove(field.as_bytes()) {
        Some(BencodeElem::Integer(int)) => Some(int),
        _ => None,
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.id {
            Some(ref id) => write!(f, "{} ({})", self.addr, id),
            None => write!(f, "{}", self.addr),
        }
    }
}
