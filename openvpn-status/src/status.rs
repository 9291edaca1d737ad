use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The parsed state of the OpenVPN daemon at one point in time.
///
/// A snapshot is produced fresh for every scrape and never mutated in
/// place. Client and route ordering follows the source file; no
/// deduplication is performed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Whether the status file was present, well-formed, and usable.
    pub is_up: bool,

    /// The time the status report claims to have been generated.
    pub updated_at: DateTime<Utc>,

    /// Counters from the GLOBAL STATS section.
    pub global_stats: GlobalStats,

    /// Connected clients, in source order.
    pub clients: Vec<ClientRecord>,

    /// Routing table entries, in source order.
    pub routes: Vec<RouteRecord>,
}

impl Snapshot {
    /// The snapshot substituted when the status file could not be read
    /// or parsed. Carries no clients or routes.
    pub fn down() -> Self {
        Self {
            is_up: false,
            updated_at: DateTime::UNIX_EPOCH,
            global_stats: GlobalStats::default(),
            clients: Vec::new(),
            routes: Vec::new(),
        }
    }
}

/// Counters from the GLOBAL STATS section of the report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalStats {
    pub max_bcast_mcast_queue_len: u64,
}

/// One row of the CLIENT LIST section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRecord {
    /// The identity string the peer presented to the daemon. Not
    /// guaranteed unique in malformed input.
    pub common_name: String,

    /// Network-level address of the peer (host:port).
    pub real_address: String,

    /// Decimal digits as emitted by the daemon; may fail numeric parse.
    pub bytes_received: String,

    /// Decimal digits as emitted by the daemon; may fail numeric parse.
    pub bytes_sent: String,

    pub connected_since: DateTime<Utc>,
}

/// One row of the ROUTING TABLE section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRecord {
    pub common_name: String,

    /// Address assigned inside the tunnel.
    pub virtual_address: String,

    pub real_address: String,

    /// Last time this route was used.
    pub last_ref: DateTime<Utc>,
}
