//! OpenVPN Status File Parser
//!
//! This crate parses the status report that an OpenVPN server daemon
//! periodically rewrites on disk (the v1 `--status` format) into a
//! structured, immutable [`Snapshot`]:
//!
//! - [`status`] - Parsed data model (`Snapshot`, `ClientRecord`, `RouteRecord`)
//! - [`parser`] - Line-oriented state machine over the status format
//! - [`error`] - Error types
//!
//! Parsing is tolerant: individual malformed rows are skipped rather than
//! failing the whole report, so a partially corrupt file still yields a
//! usable snapshot. Only structural failures (missing file, empty input,
//! unrecognized header, truncated trailer) produce an error.

pub mod error;
pub mod parser;
pub mod status;

// Re-export commonly used types at the crate root
pub use error::{Result, StatusError};
pub use parser::{parse, parse_file};
pub use status::{ClientRecord, GlobalStats, RouteRecord, Snapshot};
