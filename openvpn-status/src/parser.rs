//! Line-oriented parser for the OpenVPN v1 status report.
//!
//! The daemon rewrites the report periodically; a typical file looks like:
//!
//! ```text
//! OpenVPN CLIENT LIST
//! Updated,Thu Jun 18 04:23:03 2015
//! Common Name,Real Address,Bytes Received,Bytes Sent,Connected Since
//! alice,10.0.0.5:1194,3871,3924,Thu Jun 18 04:23:03 2015
//! ROUTING TABLE
//! Virtual Address,Common Name,Real Address,Last Ref
//! 192.168.255.6,alice,10.0.0.5:1194,Thu Jun 18 04:23:03 2015
//! GLOBAL STATS
//! Max bcast/mcast queue length,0
//! END
//! ```
//!
//! The parser walks the file once as a section state machine. Rows with an
//! unexpected field count are skipped (logged, counted), so one corrupt row
//! never costs the whole scrape. Structural problems are fatal: a missing
//! title marker means the file is not a v1 report, and a missing `END`
//! trailer means the read raced the daemon's rewrite.

use std::fs;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{debug, warn};

use crate::error::{Result, StatusError};
use crate::status::{ClientRecord, GlobalStats, RouteRecord, Snapshot};

/// Title line opening a v1 status report.
const CLIENT_LIST_MARKER: &str = "OpenVPN CLIENT LIST";
/// Section marker starting the routing table.
const ROUTING_TABLE_MARKER: &str = "ROUTING TABLE";
/// Section marker starting the global stats block.
const GLOBAL_STATS_MARKER: &str = "GLOBAL STATS";
/// Trailer line closing the report.
const END_MARKER: &str = "END";

const UPDATED_PREFIX: &str = "Updated,";
const MAX_QUEUE_PREFIX: &str = "Max bcast/mcast queue length,";

/// Column header rows the daemon emits ahead of each section's data.
const CLIENT_COLUMNS: &str = "Common Name,Real Address,Bytes Received,Bytes Sent,Connected Since";
const ROUTE_COLUMNS: &str = "Virtual Address,Common Name,Real Address,Last Ref";

const CLIENT_FIELDS: usize = 5;
const ROUTE_FIELDS: usize = 4;

/// Timestamps in the report use the daemon's ctime-style format,
/// locale-independent English names, e.g. `Thu Jun 18 04:23:03 2015`.
const TIMESTAMP_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// Read and parse the status file at `path`.
///
/// The file is read in full with a single read; there is no retry or
/// locking. A read racing the daemon's rewrite may observe a truncated
/// file, surfaced as [`StatusError::Truncated`] for that call only.
pub fn parse_file(path: impl AsRef<Path>) -> Result<Snapshot> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| StatusError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&content)
}

/// Which section of the report the state machine is currently in.
enum Section {
    ClientList,
    RoutingTable,
    GlobalStats,
    Done,
}

/// Parse a status report from a string.
///
/// Returns a [`Snapshot`] with `is_up = true` on success. Client and route
/// ordering follows the file; rows with an unexpected field count are
/// skipped rather than failing the parse.
pub fn parse(input: &str) -> Result<Snapshot> {
    let mut lines = input.lines().enumerate();

    // The first non-blank line decides whether this is a v1 report at all.
    let title = loop {
        match lines.next() {
            Some((_, line)) if line.trim().is_empty() => continue,
            Some((_, line)) => break line.trim_end(),
            None => return Err(StatusError::Empty),
        }
    };
    if title != CLIENT_LIST_MARKER {
        return Err(StatusError::UnrecognizedFormat(title.to_string()));
    }

    let mut snapshot = Snapshot {
        is_up: true,
        updated_at: DateTime::UNIX_EPOCH,
        global_stats: GlobalStats::default(),
        clients: Vec::new(),
        routes: Vec::new(),
    };
    let mut section = Section::ClientList;
    let mut skipped = 0usize;

    for (idx, raw) in lines {
        let line = raw.trim_end();
        if line.is_empty() {
            continue;
        }

        // Section transitions are recognized from any active section; a
        // well-formed report only ever moves forward through them.
        match line {
            ROUTING_TABLE_MARKER => {
                section = Section::RoutingTable;
                continue;
            }
            GLOBAL_STATS_MARKER => {
                section = Section::GlobalStats;
                continue;
            }
            END_MARKER => {
                section = Section::Done;
                continue;
            }
            _ => {}
        }

        match section {
            Section::ClientList => {
                if let Some(value) = line.strip_prefix(UPDATED_PREFIX) {
                    snapshot.updated_at = parse_timestamp(value);
                } else if line == CLIENT_COLUMNS {
                    // column header, no data
                } else {
                    let fields: Vec<&str> = line.split(',').collect();
                    if fields.len() == CLIENT_FIELDS {
                        snapshot.clients.push(ClientRecord {
                            common_name: fields[0].to_string(),
                            real_address: fields[1].to_string(),
                            bytes_received: fields[2].to_string(),
                            bytes_sent: fields[3].to_string(),
                            connected_since: parse_timestamp(fields[4]),
                        });
                    } else {
                        debug!(line = idx + 1, "skipping malformed client row");
                        skipped += 1;
                    }
                }
            }
            Section::RoutingTable => {
                if line == ROUTE_COLUMNS {
                    // column header, no data
                } else {
                    let fields: Vec<&str> = line.split(',').collect();
                    if fields.len() == ROUTE_FIELDS {
                        // File order is virtual address, common name,
                        // real address, last ref.
                        snapshot.routes.push(RouteRecord {
                            common_name: fields[1].to_string(),
                            virtual_address: fields[0].to_string(),
                            real_address: fields[2].to_string(),
                            last_ref: parse_timestamp(fields[3]),
                        });
                    } else {
                        debug!(line = idx + 1, "skipping malformed route row");
                        skipped += 1;
                    }
                }
            }
            Section::GlobalStats => {
                if let Some(value) = line.strip_prefix(MAX_QUEUE_PREFIX) {
                    snapshot.global_stats.max_bcast_mcast_queue_len = parse_counter(value);
                } else {
                    debug!(line = idx + 1, "skipping unrecognized global stat");
                    skipped += 1;
                }
            }
            Section::Done => {
                // Trailing content after END is ignored.
            }
        }
    }

    if skipped > 0 {
        warn!(skipped, "skipped malformed rows in status report");
    }

    if !matches!(section, Section::Done) {
        return Err(StatusError::Truncated);
    }

    Ok(snapshot)
}

/// Convert a report timestamp, degrading to the epoch on failure.
///
/// The record carrying the field is still emitted; only the one field
/// degrades.
fn parse_timestamp(value: &str) -> DateTime<Utc> {
    let value = value.trim();
    match NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT) {
        Ok(dt) => dt.and_utc(),
        Err(err) => {
            warn!(value, %err, "unparsable timestamp in status report, using epoch");
            DateTime::UNIX_EPOCH
        }
    }
}

/// Convert a decimal counter, degrading to zero on failure.
fn parse_counter(value: &str) -> u64 {
    match value.trim().parse() {
        Ok(n) => n,
        Err(err) => {
            warn!(value, %err, "unparsable counter in status report, using 0");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_STATUS: &str = "\
OpenVPN CLIENT LIST
Updated,Thu Jun 18 04:23:03 2015
Common Name,Real Address,Bytes Received,Bytes Sent,Connected Since
alice,10.0.0.5:1194,3871,3924,Thu Jun 18 04:23:03 2015
bob,10.0.0.6:49502,11811,17456,Thu Jun 18 04:08:39 2015
ROUTING TABLE
Virtual Address,Common Name,Real Address,Last Ref
192.168.255.6,alice,10.0.0.5:1194,Thu Jun 18 04:23:03 2015
192.168.255.10,bob,10.0.0.6:49502,Thu Jun 18 04:22:50 2015
GLOBAL STATS
Max bcast/mcast queue length,3
END
";

    #[test]
    fn test_parse_valid_report() {
        let snapshot = parse(VALID_STATUS).unwrap();

        assert!(snapshot.is_up);
        assert_eq!(snapshot.clients.len(), 2);
        assert_eq!(snapshot.routes.len(), 2);
        assert_eq!(snapshot.global_stats.max_bcast_mcast_queue_len, 3);

        let alice = &snapshot.clients[0];
        assert_eq!(alice.common_name, "alice");
        assert_eq!(alice.real_address, "10.0.0.5:1194");
        assert_eq!(alice.bytes_received, "3871");
        assert_eq!(alice.bytes_sent, "3924");
        assert_eq!(
            alice.connected_since.timestamp(),
            snapshot.updated_at.timestamp()
        );

        let route = &snapshot.routes[1];
        assert_eq!(route.common_name, "bob");
        assert_eq!(route.virtual_address, "192.168.255.10");
        assert_eq!(route.real_address, "10.0.0.6:49502");
    }

    #[test]
    fn test_parse_updated_timestamp() {
        let snapshot = parse(VALID_STATUS).unwrap();

        // Thu Jun 18 04:23:03 2015 UTC
        assert_eq!(snapshot.updated_at.timestamp(), 1_434_601_383);
    }

    #[test]
    fn test_parse_preserves_source_order_and_duplicates() {
        let input = "\
OpenVPN CLIENT LIST
Updated,Thu Jun 18 04:23:03 2015
Common Name,Real Address,Bytes Received,Bytes Sent,Connected Since
carol,10.0.0.7:1194,1,2,Thu Jun 18 04:23:03 2015
alice,10.0.0.5:1194,3,4,Thu Jun 18 04:23:03 2015
alice,10.0.0.5:1194,3,4,Thu Jun 18 04:23:03 2015
ROUTING TABLE
Virtual Address,Common Name,Real Address,Last Ref
GLOBAL STATS
Max bcast/mcast queue length,0
END
";
        let snapshot = parse(input).unwrap();

        let names: Vec<&str> = snapshot
            .clients
            .iter()
            .map(|c| c.common_name.as_str())
            .collect();
        assert_eq!(names, ["carol", "alice", "alice"]);
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(matches!(parse(""), Err(StatusError::Empty)));
        assert!(matches!(parse("\n\n  \n"), Err(StatusError::Empty)));
    }

    #[test]
    fn test_parse_unrecognized_format() {
        let err = parse("something else entirely\n").unwrap_err();
        match err {
            StatusError::UnrecognizedFormat(line) => {
                assert_eq!(line, "something else entirely");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_truncated_report() {
        // Cut off mid-rewrite: no GLOBAL STATS, no END.
        let input = "\
OpenVPN CLIENT LIST
Updated,Thu Jun 18 04:23:03 2015
Common Name,Real Address,Bytes Received,Bytes Sent,Connected Since
alice,10.0.0.5:1194,3871,3924,Thu Jun 18 04:23:03 2015
";
        assert!(matches!(parse(input), Err(StatusError::Truncated)));
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let input = "\
OpenVPN CLIENT LIST
Updated,Thu Jun 18 04:23:03 2015
Common Name,Real Address,Bytes Received,Bytes Sent,Connected Since
alice,10.0.0.5:1194,3871,3924,Thu Jun 18 04:23:03 2015
this row has,too few fields
ROUTING TABLE
Virtual Address,Common Name,Real Address,Last Ref
192.168.255.6,alice,10.0.0.5:1194,Thu Jun 18 04:23:03 2015
garbage
GLOBAL STATS
Max bcast/mcast queue length,0
END
";
        let snapshot = parse(input).unwrap();

        assert!(snapshot.is_up);
        assert_eq!(snapshot.clients.len(), 1);
        assert_eq!(snapshot.routes.len(), 1);
    }

    #[test]
    fn test_unparsable_timestamp_degrades_to_epoch() {
        let input = "\
OpenVPN CLIENT LIST
Updated,not a timestamp
Common Name,Real Address,Bytes Received,Bytes Sent,Connected Since
alice,10.0.0.5:1194,3871,3924,also not a timestamp
ROUTING TABLE
Virtual Address,Common Name,Real Address,Last Ref
GLOBAL STATS
Max bcast/mcast queue length,0
END
";
        let snapshot = parse(input).unwrap();

        assert!(snapshot.is_up);
        assert_eq!(snapshot.updated_at, DateTime::UNIX_EPOCH);
        assert_eq!(snapshot.clients.len(), 1);
        assert_eq!(snapshot.clients[0].connected_since, DateTime::UNIX_EPOCH);
    }

    #[test]
    fn test_unparsable_queue_length_degrades_to_zero() {
        let input = "\
OpenVPN CLIENT LIST
Updated,Thu Jun 18 04:23:03 2015
ROUTING TABLE
GLOBAL STATS
Max bcast/mcast queue length,many
END
";
        let snapshot = parse(input).unwrap();

        assert!(snapshot.is_up);
        assert_eq!(snapshot.global_stats.max_bcast_mcast_queue_len, 0);
    }

    #[test]
    fn test_parse_single_digit_day_timestamp() {
        // ctime pads single-digit days with a space.
        let input = "\
OpenVPN CLIENT LIST
Updated,Thu Jun  4 04:23:03 2015
ROUTING TABLE
GLOBAL STATS
Max bcast/mcast queue length,0
END
";
        let snapshot = parse(input).unwrap();

        assert_eq!(snapshot.updated_at.timestamp(), 1_433_391_783);
    }

    #[test]
    fn test_parse_crlf_line_endings() {
        let input = VALID_STATUS.replace('\n', "\r\n");
        let snapshot = parse(&input).unwrap();

        assert!(snapshot.is_up);
        assert_eq!(snapshot.clients.len(), 2);
        assert_eq!(snapshot.clients[0].common_name, "alice");
    }

    #[test]
    fn test_parse_is_idempotent() {
        let first = parse(VALID_STATUS).unwrap();
        let second = parse(VALID_STATUS).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_content_after_end_is_ignored() {
        let input = format!("{VALID_STATUS}leftover,from,previous,rewrite\n");
        let snapshot = parse(&input).unwrap();

        assert_eq!(snapshot.clients.len(), 2);
        assert_eq!(snapshot.routes.len(), 2);
    }
}
