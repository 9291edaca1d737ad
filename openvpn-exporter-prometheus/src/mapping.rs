//! Mapping from parsed OpenVPN status snapshots to Prometheus metrics.

use openvpn_status::Snapshot;
use tracing::warn;

pub const OPENVPN_UP: &str = "openvpn_up";
pub const CONNECTED_CLIENTS: &str = "openvpn_connected_clients";
pub const MAX_BCAST_MCAST_QUEUE_LEN: &str = "openvpn_global_stats_max_bcast_mcast_queue_len";
pub const LAST_UPDATED: &str = "openvpn_last_updated";
pub const CLIENT_CONNECTED_SINCE: &str = "openvpn_client_connected_since";
pub const CLIENT_BYTES_RECEIVED: &str = "openvpn_client_bytes_received";
pub const CLIENT_BYTES_SENT: &str = "openvpn_client_bytes_sent";
pub const ROUTING_LAST_REF: &str = "openvpn_routing_last_ref";

/// Prometheus metric kind. Everything this exporter emits is a gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Gauge,
}

impl MetricKind {
    /// Get the TYPE comment string for Prometheus exposition format.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
        }
    }
}

/// Descriptor for one exported metric name: HELP text and kind.
#[derive(Debug, Clone, Copy)]
pub struct MetricDesc {
    pub name: &'static str,
    pub help: &'static str,
    pub kind: MetricKind,
}

/// Process-wide read-only table of metric descriptors.
///
/// Built once at startup and shared by reference into the collector.
/// One entry per exported metric name; iteration order is the exposition
/// grouping order.
#[derive(Debug, Clone)]
pub struct Registry {
    descs: Vec<MetricDesc>,
}

impl Registry {
    /// The descriptor table for the OpenVPN exporter.
    pub fn openvpn() -> Self {
        let gauge = |name, help| MetricDesc {
            name,
            help,
            kind: MetricKind::Gauge,
        };

        Self {
            descs: vec![
                gauge(
                    OPENVPN_UP,
                    "Whether scraping OpenVPN's metrics was successful.",
                ),
                gauge(CONNECTED_CLIENTS, "Number of connected clients."),
                gauge(
                    MAX_BCAST_MCAST_QUEUE_LEN,
                    "Maximum broadcast/multicast queue length.",
                ),
                gauge(
                    LAST_UPDATED,
                    "Unix timestamp of the last status report update.",
                ),
                gauge(
                    CLIENT_CONNECTED_SINCE,
                    "Unix timestamp when the client connected.",
                ),
                gauge(CLIENT_BYTES_RECEIVED, "Bytes received from the client."),
                gauge(CLIENT_BYTES_SENT, "Bytes sent to the client."),
                gauge(
                    ROUTING_LAST_REF,
                    "Unix timestamp when the route was last referenced.",
                ),
            ],
        }
    }

    /// Iterate descriptors in exposition order.
    pub fn descriptors(&self) -> impl Iterator<Item = &MetricDesc> {
        self.descs.iter()
    }

    /// Whether a metric name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.descs.iter().any(|d| d.name == name)
    }
}

/// One emitted metric instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// The metric name; always one of the registry's descriptors.
    pub name: &'static str,
    pub value: f64,
    /// Label key-value pairs, in emission order.
    pub labels: Vec<(&'static str, String)>,
}

impl Sample {
    fn gauge(name: &'static str, value: f64) -> Self {
        Self {
            name,
            value,
            labels: Vec::new(),
        }
    }

    fn with_labels(name: &'static str, value: f64, labels: Vec<(&'static str, String)>) -> Self {
        Self {
            name,
            value,
            labels,
        }
    }
}

/// Convert a snapshot into the flat ordered sample list for one scrape.
///
/// `openvpn_up` always comes first. When the snapshot is down it is the
/// only sample; no per-client or per-route data is emitted even if partial
/// fields were recovered.
pub fn to_samples(snapshot: &Snapshot) -> Vec<Sample> {
    let mut samples =
        Vec::with_capacity(4 + snapshot.clients.len() * 3 + snapshot.routes.len());

    samples.push(Sample::gauge(
        OPENVPN_UP,
        if snapshot.is_up { 1.0 } else { 0.0 },
    ));
    if !snapshot.is_up {
        return samples;
    }

    samples.push(Sample::gauge(
        CONNECTED_CLIENTS,
        snapshot.clients.len() as f64,
    ));
    samples.push(Sample::gauge(
        MAX_BCAST_MCAST_QUEUE_LEN,
        snapshot.global_stats.max_bcast_mcast_queue_len as f64,
    ));
    samples.push(Sample::gauge(
        LAST_UPDATED,
        snapshot.updated_at.timestamp() as f64,
    ));

    for client in &snapshot.clients {
        samples.push(Sample::with_labels(
            CLIENT_CONNECTED_SINCE,
            client.connected_since.timestamp() as f64,
            vec![
                ("name", client.common_name.clone()),
                ("real_address", client.real_address.clone()),
            ],
        ));
        samples.push(Sample::with_labels(
            CLIENT_BYTES_RECEIVED,
            parse_byte_count(&client.common_name, &client.bytes_received),
            vec![("name", client.common_name.clone())],
        ));
        samples.push(Sample::with_labels(
            CLIENT_BYTES_SENT,
            parse_byte_count(&client.common_name, &client.bytes_sent),
            vec![("name", client.common_name.clone())],
        ));
    }

    for route in &snapshot.routes {
        samples.push(Sample::with_labels(
            ROUTING_LAST_REF,
            route.last_ref.timestamp() as f64,
            vec![
                ("name", route.common_name.clone()),
                ("virtual_address", route.virtual_address.clone()),
                ("real_address", route.real_address.clone()),
            ],
        ));
    }

    samples
}

/// Byte counts arrive as the decimal text the daemon wrote. A value that
/// fails numeric parse degrades to zero; the record is still emitted.
fn parse_byte_count(common_name: &str, value: &str) -> f64 {
    match value.parse() {
        Ok(v) => v,
        Err(err) => {
            warn!(client = common_name, value, %err, "unparsable byte count, using 0");
            0.0
        }
    }
}
