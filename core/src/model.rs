//! # Audit Model
//!
//! The relational view of one audit run: segments own hosts, hosts own open
//! ports, and a category index lists every finding once.
//!
//! [`ModelBuilder`] folds the finding stream with hashed lookups and drops
//! duplicate (host, port) pairs. [`ModelBuilder::finish`] freezes the result
//! into an [`AuditModel`] whose segments, hosts and ports are sorted, so every
//! exporter walks the same order.

use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;

use tracing::debug;

use crate::criticality::Criticality;
use crate::finding::{Finding, SegmentKey};
use crate::knowledge_base::{self, Category};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenPort {
    pub port: u16,
    pub service: &'static str,
    pub category: Category,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    pub ip: Ipv4Addr,
    /// Ascending by port number, no duplicates.
    pub ports: Vec<OpenPort>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub network: SegmentKey,
    /// Ascending by address.
    pub hosts: Vec<Host>,
}

impl Segment {
    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    pub fn port_count(&self) -> usize {
        self.hosts.iter().map(|h| h.ports.len()).sum()
    }

    pub fn criticality(&self) -> Criticality {
        Criticality::for_host_count(self.host_count())
    }
}

/// Aggregate figures, computed once when the model is frozen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditStats {
    /// Supplied by the range plan; includes segments without any host.
    pub total_segments_scanned: usize,
    pub active_segments: usize,
    pub active_hosts: usize,
    pub total_findings: usize,
    /// Findings per category, every category present, in [`Category::ALL`] order.
    pub category_counts: Vec<(Category, usize)>,
}

impl AuditStats {
    /// Active segments over scanned segments, `0.0` when nothing was scanned.
    pub fn activity_rate(&self) -> f64 {
        if self.total_segments_scanned == 0 {
            return 0.0;
        }
        self.active_segments as f64 / self.total_segments_scanned as f64
    }

    pub fn activity_percent(&self) -> f64 {
        self.activity_rate() * 100.0
    }

    pub fn category_count(&self, category: Category) -> usize {
        self.category_counts
            .iter()
            .find(|(c, _)| *c == category)
            .map_or(0, |(_, count)| *count)
    }
}

/// Accumulates findings. Lookups are hashed; ordering is applied on `finish`.
#[derive(Debug, Default)]
pub struct ModelBuilder {
    segments: HashMap<SegmentKey, HashMap<Ipv4Addr, HashSet<u16>>>,
    categories: HashMap<Category, Vec<Finding>>,
    duplicates: usize,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a finding. Returns `false` if the (host, port) pair was already known.
    pub fn insert(&mut self, finding: Finding) -> bool {
        let ports = self
            .segments
            .entry(finding.segment)
            .or_default()
            .entry(finding.ip)
            .or_default();

        if !ports.insert(finding.port) {
            self.duplicates += 1;
            return false;
        }

        self.categories
            .entry(finding.category)
            .or_default()
            .push(finding);
        true
    }

    pub fn finish(self, total_segments_scanned: usize) -> AuditModel {
        if self.duplicates > 0 {
            debug!("Dropped {} duplicate host/port pairs", self.duplicates);
        }

        let mut segments: Vec<Segment> = self
            .segments
            .into_iter()
            .map(|(network, hosts)| {
                let mut hosts: Vec<Host> = hosts
                    .into_iter()
                    .map(|(ip, ports)| {
                        let mut ports: Vec<u16> = ports.into_iter().collect();
                        ports.sort_unstable();
                        let ports = ports
                            .into_iter()
                            .map(|port| {
                                let (service, category) = knowledge_base::classify(port);
                                OpenPort {
                                    port,
                                    service,
                                    category,
                                }
                            })
                            .collect();
                        Host { ip, ports }
                    })
                    .collect();
                hosts.sort_unstable_by_key(|h| h.ip);
                Segment { network, hosts }
            })
            .collect();
        segments.sort_unstable_by_key(|s| s.network);

        let mut categories = self.categories;
        let categories: Vec<(Category, Vec<Finding>)> = Category::ALL
            .into_iter()
            .map(|category| {
                let mut findings = categories.remove(&category).unwrap_or_default();
                findings.sort_unstable();
                (category, findings)
            })
            .collect();

        let stats = AuditStats {
            total_segments_scanned,
            active_segments: segments.len(),
            active_hosts: segments.iter().map(Segment::host_count).sum(),
            total_findings: categories.iter().map(|(_, f)| f.len()).sum(),
            category_counts: categories.iter().map(|(c, f)| (*c, f.len())).collect(),
        };

        AuditModel {
            segments,
            categories,
            stats,
        }
    }
}

/// Frozen, read-only result of one audit run.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditModel {
    segments: Vec<Segment>,
    categories: Vec<(Category, Vec<Finding>)>,
    stats: AuditStats,
}

impl AuditModel {
    /// Folds `findings` into a frozen model.
    pub fn build<I>(findings: I, total_segments_scanned: usize) -> Self
    where
        I: IntoIterator<Item = Finding>,
    {
        let mut builder = ModelBuilder::new();
        for finding in findings {
            builder.insert(finding);
        }
        builder.finish(total_segments_scanned)
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn stats(&self) -> &AuditStats {
        &self.stats
    }

    /// Active segments, ascending by network address.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Category index, every category present, in [`Category::ALL`] order.
    pub fn categories(&self) -> &[(Category, Vec<Finding>)] {
        &self.categories
    }

    pub fn category(&self, category: Category) -> &[Finding] {
        self.categories
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, findings)| findings.as_slice())
            .unwrap_or(&[])
    }

    /// Every finding in segment, host, port order.
    pub fn findings(&self) -> impl Iterator<Item = Finding> + '_ {
        self.segments.iter().flat_map(|segment| {
            segment.hosts.iter().flat_map(move |host| {
                host.ports.iter().map(move |p| Finding {
                    segment: segment.network,
                    ip: host.ip,
                    port: p.port,
                    service: p.service,
                    category: p.category,
                })
            })
        })
    }

    /// Segments by descending host count, ties by ascending network, at most `limit`.
    pub fn top_segments(&self, limit: usize) -> Vec<&Segment> {
        let mut ranked: Vec<&Segment> = self.segments.iter().collect();
        ranked.sort_by(|a, b| {
            b.host_count()
                .cmp(&a.host_count())
                .then_with(|| a.network.cmp(&b.network))
        });
        ranked.truncate(limit);
        ranked
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(a: u8, b: u8, c: u8, d: u8, port: u16) -> Finding {
        Finding::new(Ipv4Addr::new(a, b, c, d), port)
    }

    fn scenario() -> AuditModel {
        AuditModel::build(
            vec![
                finding(192, 168, 10, 1, 22),
                finding(192, 168, 10, 1, 443),
                finding(192, 168, 10, 5, 3389),
            ],
            256,
        )
    }

    #[test]
    fn end_to_end_scenario_statistics() {
        let model = scenario();
        let stats = model.stats();

        assert_eq!(stats.active_segments, 1);
        assert_eq!(stats.active_hosts, 2);
        assert_eq!(stats.total_findings, 3);
        assert_eq!(model.segments()[0].network.to_string(), "192.168.10.0/24");
        assert!((stats.activity_percent() - 0.390625).abs() < 1e-9);

        assert_eq!(stats.category_count(Category::Administration), 2);
        assert_eq!(stats.category_count(Category::Web), 1);
        assert_eq!(stats.category_count(Category::Database), 0);
        assert_eq!(stats.category_counts.len(), Category::ALL.len());
    }

    #[test]
    fn duplicates_are_dropped() {
        let mut builder = ModelBuilder::new();
        assert!(builder.insert(finding(10, 0, 0, 1, 22)));
        assert!(!builder.insert(finding(10, 0, 0, 1, 22)));
        assert!(builder.insert(finding(10, 0, 0, 1, 23)));

        let model = builder.finish(1);
        assert_eq!(model.stats().total_findings, 2);
        assert_eq!(model.segments()[0].hosts[0].ports.len(), 2);
    }

    #[test]
    fn ordering_is_numeric_everywhere() {
        let model = AuditModel::build(
            vec![
                finding(10, 0, 10, 1, 80),
                finding(10, 0, 2, 20, 443),
                finding(10, 0, 2, 3, 8080),
                finding(10, 0, 2, 3, 22),
            ],
            10,
        );

        let networks: Vec<String> = model.segments().iter().map(|s| s.network.to_string()).collect();
        assert_eq!(networks, vec!["10.0.2.0/24", "10.0.10.0/24"]);

        let hosts: Vec<String> = model.segments()[0].hosts.iter().map(|h| h.ip.to_string()).collect();
        assert_eq!(hosts, vec!["10.0.2.3", "10.0.2.20"]);

        let ports: Vec<u16> = model.segments()[0].hosts[0].ports.iter().map(|p| p.port).collect();
        assert_eq!(ports, vec![22, 8080]);
    }

    #[test]
    fn categories_partition_findings() {
        let model = AuditModel::build(
            vec![
                finding(10, 0, 0, 1, 22),
                finding(10, 0, 0, 1, 3306),
                finding(10, 0, 1, 1, 9999),
                finding(10, 0, 1, 2, 53),
                finding(10, 0, 1, 2, 53),
            ],
            2,
        );

        let sum: usize = model.stats().category_counts.iter().map(|(_, n)| n).sum();
        assert_eq!(sum, model.stats().total_findings);
        assert_eq!(sum, model.findings().count());
        assert_eq!(model.category(Category::Other).len(), 1);
    }

    #[test]
    fn zero_scanned_segments_is_guarded() {
        let model = AuditModel::build(vec![finding(10, 0, 0, 1, 22)], 0);
        assert_eq!(model.stats().activity_rate(), 0.0);

        let empty = AuditModel::build(Vec::new(), 0);
        assert!(empty.is_empty());
        assert_eq!(empty.stats().activity_rate(), 0.0);
    }

    #[test]
    fn top_segments_breaks_ties_by_network() {
        let model = AuditModel::build(
            vec![
                finding(10, 0, 3, 1, 22),
                finding(10, 0, 1, 1, 22),
                finding(10, 0, 2, 1, 22),
                finding(10, 0, 2, 2, 22),
            ],
            4,
        );

        let top: Vec<String> = model.top_segments(2).iter().map(|s| s.network.to_string()).collect();
        assert_eq!(top, vec!["10.0.2.0/24", "10.0.1.0/24"]);
    }
}
