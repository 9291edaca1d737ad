//! Per-scrape collector: parse the status file, map it, render the
//! exposition text.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use openvpn_status::{Snapshot, parse_file};

use crate::mapping::{Registry, Sample, to_samples};

/// Collector statistics.
#[derive(Debug, Clone, Default)]
pub struct ScrapeStats {
    /// Total scrape requests served.
    pub scrapes_total: u64,
    /// Scrapes for which the status file could not be read or parsed.
    pub parse_failures: u64,
}

/// Orchestrates one scrape per inbound request.
///
/// Every invocation re-reads the status file and produces a fresh
/// snapshot; nothing is cached between scrapes, so concurrent scrapes are
/// independent. A read or parse failure never fails the scrape: the
/// response degrades to `openvpn_up 0` and the error goes to the log.
pub struct OpenVpnCollector {
    status_path: PathBuf,
    registry: Arc<Registry>,
    stats: RwLock<ScrapeStats>,
}

/// Create a shareable collector handle.
pub type SharedCollector = Arc<OpenVpnCollector>;

impl OpenVpnCollector {
    /// Create a new collector reading the status file at `status_path`.
    pub fn new(status_path: impl Into<PathBuf>, registry: Arc<Registry>) -> Self {
        Self {
            status_path: status_path.into(),
            registry,
            stats: RwLock::new(ScrapeStats::default()),
        }
    }

    /// The status file this collector reads.
    pub fn status_path(&self) -> &Path {
        &self.status_path
    }

    /// Serve one scrape: parse, map, render.
    ///
    /// Identical file contents produce byte-identical output, including
    /// under concurrent scrapes.
    pub fn scrape(&self) -> String {
        let snapshot = match parse_file(&self.status_path) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(path = %self.status_path.display(), %err, "status scrape failed");
                let mut stats = self.stats.write();
                stats.parse_failures += 1;
                drop(stats);
                Snapshot::down()
            }
        };

        {
            let mut stats = self.stats.write();
            stats.scrapes_total += 1;
        }

        let samples = to_samples(&snapshot);
        debug!(
            samples = samples.len(),
            up = snapshot.is_up,
            "rendering scrape"
        );
        self.render(&samples)
    }

    /// Get collector statistics.
    pub fn stats(&self) -> ScrapeStats {
        self.stats.read().clone()
    }

    /// Render samples in Prometheus exposition format.
    ///
    /// Metric names are grouped in registry order, one HELP/TYPE pair per
    /// name; within a name, samples keep their emission order.
    fn render(&self, samples: &[Sample]) -> String {
        let mut output = Vec::with_capacity(samples.len() * 100);

        for desc in self.registry.descriptors() {
            let series: Vec<&Sample> = samples.iter().filter(|s| s.name == desc.name).collect();
            if series.is_empty() {
                continue;
            }

            writeln!(output, "# HELP {} {}", desc.name, desc.help).ok();
            writeln!(output, "# TYPE {} {}", desc.name, desc.kind.as_str()).ok();

            for sample in series {
                writeln!(
                    output,
                    "{}{} {}",
                    sample.name,
                    format_labels(&sample.labels),
                    format_value(sample.value)
                )
                .ok();
            }
        }

        String::from_utf8(output).unwrap_or_default()
    }
}

/// Escape special characters in label values.
fn escape_label_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

/// Format a floating point value for Prometheus.
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

/// Format labels for Prometheus exposition format.
fn format_labels(labels: &[(&'static str, String)]) -> String {
    if labels.is_empty() {
        return String::new();
    }

    let parts: Vec<String> = labels
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
        .collect();

    format!("{{{}}}", parts.join(","))
}
