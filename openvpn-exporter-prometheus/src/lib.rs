//! Prometheus metrics exporter for OpenVPN status reports.
//!
//! This crate serves a `/metrics` endpoint that, on every scrape, re-reads
//! the status file the OpenVPN daemon rewrites on disk and exposes its
//! contents as gauge metrics.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │   Status File   │────>│    Collector    │────>│   HTTP Server   │
//! │ (daemon-written)│     │ (parse + map)   │     │   (/metrics)    │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! Each scrape is independent: the collector parses a fresh [`Snapshot`]
//! per request and nothing is cached between scrapes. A missing or corrupt
//! status file never fails the HTTP response; it is reported through the
//! `openvpn_up` gauge instead.
//!
//! # Usage
//!
//! Run the exporter binary, optionally with a configuration file:
//!
//! ```bash
//! openvpn-exporter-prometheus --status-path /var/run/openvpn/server.status
//! ```
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for configuration options.
//!
//! [`Snapshot`]: openvpn_status::Snapshot

pub mod collector;
pub mod config;
pub mod http;
pub mod mapping;

pub use collector::{OpenVpnCollector, ScrapeStats, SharedCollector};
pub use config::ExporterConfig;
pub use http::HttpServer;
pub use mapping::{Registry, Sample, to_samples};
