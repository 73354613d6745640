//! # Audit Targets
//!
//! Parsing and representation of the ranges handed to the scanner.
//!
//! A target line can be:
//! * A single IPv4 address (host).
//! * An IPv4 range (e.g., `192.168.1.1-100` or `10.0.0.1-10.0.3.254`).
//! * A CIDR block (e.g., `192.168.1.0/24`).
//!
//! The [`RangePlan`] built from a list of targets also carries the number of
//! /24 segments under audit, which is the denominator of the activity rate.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;
use std::str::FromStr;

use tracing::{info, warn};

use crate::error::ConfigError;
use crate::network::range::{self, Ipv4Range, SEGMENT_PREFIX};

/// A distinct target to be scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Target {
    /// Scan a single specific host.
    Host { target_addr: Ipv4Addr },
    /// Scan a network block. `network` is always normalized.
    Cidr { network: Ipv4Addr, prefix: u8 },
    /// Scan an arbitrary range of IPv4 addresses.
    Range { ipv4_range: Ipv4Range },
}

impl Target {
    pub fn as_range(&self) -> Ipv4Range {
        match *self {
            Target::Host { target_addr } => Ipv4Range::new(target_addr, target_addr),
            Target::Cidr { network, prefix } => range::cidr_range(network, prefix)
                .unwrap_or_else(|_| Ipv4Range::new(network, network)),
            Target::Range { ipv4_range } => ipv4_range,
        }
    }

    /// Target specifications in the form the scanner's input list accepts.
    ///
    /// Arbitrary ranges are split on /24 boundaries into octet ranges.
    pub fn scan_specs(&self) -> Vec<String> {
        let Target::Range { ipv4_range } = self else {
            return vec![self.to_string()];
        };

        let start: u32 = u32::from(ipv4_range.start_addr);
        let end: u32 = u32::from(ipv4_range.end_addr);
        let mut specs = Vec::new();
        let mut cursor = start;

        while cursor <= end {
            let block_end = (cursor | 0xFF).min(end);
            let first = Ipv4Addr::from(cursor);
            let last_octet = Ipv4Addr::from(block_end).octets()[3];
            if cursor == block_end {
                specs.push(first.to_string());
            } else {
                specs.push(format!("{first}-{last_octet}"));
            }
            match block_end.checked_add(1) {
                Some(next) => cursor = next,
                None => break,
            }
        }

        specs
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Host { target_addr } => write!(f, "{target_addr}"),
            Target::Cidr { network, prefix } => write!(f, "{network}/{prefix}"),
            Target::Range { ipv4_range } => {
                write!(f, "{}-{}", ipv4_range.start_addr, ipv4_range.end_addr)
            }
        }
    }
}

impl FromStr for Target {
    type Err = String;

    /// Parses a string into a `Target`.
    ///
    /// Supported formats:
    /// * **Host**: Single IPv4 address (e.g., "192.168.1.5").
    /// * **Range**: "Start-End" (e.g., "192.168.1.1-50", "192.168.1.1-192.168.1.50").
    /// * **CIDR**: "Network/Prefix" (e.g., "192.168.1.0/24").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if let Some(target) = parse_host(s) {
            return Ok(target);
        }

        if let Some(target) = parse_ip_range(s)? {
            return Ok(target);
        }

        if let Some(target) = parse_cidr_range(s)? {
            return Ok(target);
        }

        Err(format!("invalid target: {s}"))
    }
}

/// Deduplicated targets plus the number of /24 segments they cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangePlan {
    pub targets: Vec<Target>,
    pub total_segments: usize,
}

impl RangePlan {
    pub fn new(targets: impl IntoIterator<Item = Target>) -> Self {
        let targets: Vec<Target> = targets
            .into_iter()
            .collect::<BTreeSet<Target>>()
            .into_iter()
            .collect();
        let ranges: Vec<Ipv4Range> = targets.iter().map(Target::as_range).collect();
        let total_segments = range::count_segments(&ranges);

        Self {
            targets,
            total_segments,
        }
    }

    /// One scanner target specification per line.
    pub fn scan_specs(&self) -> Vec<String> {
        self.targets.iter().flat_map(Target::scan_specs).collect()
    }
}

/// Loads the targets listed in a custom range file.
///
/// Blank lines and `#` comments are ignored. Malformed lines are warned
/// about and skipped; the load only fails if nothing valid remains.
pub fn load_range_file(path: &Path) -> Result<RangePlan, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    if content.trim().is_empty() {
        return Err(ConfigError::EmptyFile {
            path: path.to_path_buf(),
        });
    }

    let mut targets = Vec::new();
    let mut invalid: usize = 0;

    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match Target::from_str(line) {
            Ok(target) => targets.push(target),
            Err(e) => {
                invalid += 1;
                warn!("Skipping line {} of {}: {e}", idx + 1, path.display());
            }
        }
    }

    if targets.is_empty() {
        return Err(ConfigError::NoValidRanges {
            path: path.to_path_buf(),
            invalid,
        });
    }

    let plan = RangePlan::new(targets);
    info!(
        "Loaded {} unique ranges ({} segments) from {}",
        plan.targets.len(),
        plan.total_segments,
        path.display()
    );
    Ok(plan)
}

/// Default RFC 1918 audit plan.
///
/// Every /24 of 192.168.0.0/16 and 10.0.0.0/16, plus the first sixteen /24s
/// of each 172.16-31.x.x block.
pub fn default_plan() -> RangePlan {
    let mut targets = Vec::with_capacity(768);

    for third in 0..=255u8 {
        targets.push(segment_target(Ipv4Addr::new(192, 168, third, 0)));
    }
    for third in 0..=255u8 {
        targets.push(segment_target(Ipv4Addr::new(10, 0, third, 0)));
    }
    for second in 16..32u8 {
        for third in 0..16u8 {
            targets.push(segment_target(Ipv4Addr::new(172, second, third, 0)));
        }
    }

    let plan = RangePlan::new(targets);
    info!("Generated {} RFC 1918 segments", plan.total_segments);
    plan
}

fn segment_target(network: Ipv4Addr) -> Target {
    Target::Cidr {
        network,
        prefix: SEGMENT_PREFIX,
    }
}

/// Parses a single IP address.
fn parse_host(s: &str) -> Option<Target> {
    s.parse::<Ipv4Addr>()
        .ok()
        .map(|target_addr| Target::Host { target_addr })
}

/// Parses a range string like "1.1.1.1-2.2.2.2" or "1.1.1.1-50".
fn parse_ip_range(s: &str) -> Result<Option<Target>, String> {
    let Some((start_str, end_str)) = s.split_once('-') else {
        return Ok(None);
    };

    let start_addr = start_str
        .trim()
        .parse::<Ipv4Addr>()
        .map_err(|e| format!("Invalid start IP in range '{start_str}': {e}"))?;

    let end_addr = parse_range_end_addr(end_str.trim(), &start_addr, s)?;

    if u32::from(end_addr) < u32::from(start_addr) {
        return Err(format!("Range end is before range start: {s}"));
    }

    let ipv4_range = Ipv4Range::new(start_addr, end_addr);
    Ok(Some(Target::Range { ipv4_range }))
}

/// Helper to parse the end address of a range.
///
/// Handles abbreviated forms like "192.168.1.1-50" (implies 192.168.1.50)
/// and full forms like "192.168.1.1-192.168.1.255".
fn parse_range_end_addr(
    end_str: &str,
    start_addr: &Ipv4Addr,
    original_s: &str,
) -> Result<Ipv4Addr, String> {
    if let Ok(full_addr) = end_str.parse::<Ipv4Addr>() {
        return Ok(full_addr);
    }

    if end_str.is_empty() {
        return Err(format!("End range cannot be empty: {original_s}"));
    }

    let mut end_octets = start_addr.octets();
    let partial_octets: Vec<u8> = end_str
        .split('.')
        .map(|octet_str| octet_str.parse::<u8>())
        .collect::<Result<Vec<u8>, _>>()
        .map_err(|e| format!("Invalid end range '{end_str}': {e}"))?;

    if partial_octets.len() > 4 {
        return Err(format!("End range has too many octets: {end_str}"));
    }

    let start_index = 4 - partial_octets.len();
    end_octets[start_index..].copy_from_slice(&partial_octets);

    Ok(Ipv4Addr::from(end_octets))
}

/// Parses CIDR notation like "192.168.1.0/24".
fn parse_cidr_range(s: &str) -> Result<Option<Target>, String> {
    let Some((ip_str, prefix_str)) = s.split_once('/') else {
        return Ok(None);
    };

    let ipv4_addr = ip_str
        .parse::<Ipv4Addr>()
        .map_err(|e| format!("Invalid IP in CIDR '{ip_str}': {e}"))?;

    let prefix = prefix_str
        .parse::<u8>()
        .map_err(|e| format!("Invalid prefix in CIDR '{prefix_str}': {e}"))?;

    let block = range::cidr_range(ipv4_addr, prefix).map_err(|e| e.to_string())?;

    Ok(Some(Target::Cidr {
        network: block.start_addr,
        prefix,
    }))
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
    use std::io::Write;

    #[test]
    fn test_parse_range_end_addr_helper() {
        let start = Ipv4Addr::new(192, 168, 1, 10);
        let s = "192.168.1.10-255";

        assert_eq!(
            parse_range_end_addr("192.168.1.50", &start, s),
            Ok(Ipv4Addr::new(192, 168, 1, 50))
        );
        assert_eq!(
            parse_range_end_addr("50", &start, s),
            Ok(Ipv4Addr::new(192, 168, 1, 50))
        );
        assert_eq!(
            parse_range_end_addr("2.66", &start, s),
            Ok(Ipv4Addr::new(192, 168, 2, 66))
        );

        assert!(parse_range_end_addr("2.256", &start, s).is_err());
        assert!(parse_range_end_addr("1.2.3.4.5", &start, s).is_err());
        assert!(parse_range_end_addr("", &start, s).is_err());
    }

    #[test]
    fn test_from_str_full_parsing() {
        assert!(matches!(
            Target::from_str("1.1.1.1"),
            Ok(Target::Host { .. })
        ));
        assert!(matches!(
            Target::from_str("192.168.1.1-255"),
            Ok(Target::Range { .. })
        ));
        assert_eq!(
            Target::from_str("10.0.0.77/24"),
            Ok(Target::Cidr {
                network: Ipv4Addr::new(10, 0, 0, 0),
                prefix: 24
            })
        );

        assert!(Target::from_str("not-an-ip").is_err());
        assert!(Target::from_str("10.0.0.1/33").is_err());
        assert!(Target::from_str("10.0.0.256-1.1.1.1").is_err());
        assert!(Target::from_str("10.0.0.50-10").is_err());
        assert!(Target::from_str("::1").is_err());
    }

    #[test]
    fn test_scan_specs_split_on_segment_boundary() {
        let target = Target::from_str("10.0.0.250-10.0.2.3").unwrap();
        assert_eq!(
            target.scan_specs(),
            vec!["10.0.0.250-255", "10.0.1.0-255", "10.0.2.0-3"]
        );

        let cidr = Target::from_str("172.16.0.0/12").unwrap();
        assert_eq!(cidr.scan_specs(), vec!["172.16.0.0/12"]);
    }

    #[test]
    fn test_default_plan_segment_count() {
        let plan = default_plan();
        assert_eq!(plan.total_segments, 768);
        assert_eq!(plan.targets.len(), 768);
        assert!(plan.scan_specs().contains(&"172.31.15.0/24".to_string()));
    }

    #[test]
    fn test_load_range_file_skips_invalid_and_dedups() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# corporate ranges").unwrap();
        writeln!(file, "192.168.1.0/24").unwrap();
        writeln!(file, "192.168.1.9/24").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "garbage line").unwrap();
        writeln!(file, "10.0.0.1-10.0.1.254").unwrap();

        let plan = load_range_file(file.path()).unwrap();
        assert_eq!(plan.targets.len(), 2);
        assert_eq!(plan.total_segments, 3);
    }

    #[test]
    fn test_load_range_file_errors() {
        let missing = load_range_file(Path::new("/definitely/not/here.txt"));
        assert!(matches!(missing, Err(ConfigError::Unreadable { .. })));

        let empty = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            load_range_file(empty.path()),
            Err(ConfigError::EmptyFile { .. })
        ));

        let mut junk = tempfile::NamedTempFile::new().unwrap();
        writeln!(junk, "nope").unwrap();
        writeln!(junk, "# only a comment").unwrap();
        assert!(matches!(
            load_range_file(junk.path()),
            Err(ConfigError::NoValidRanges { invalid: 1, .. })
        ));
    }
}
