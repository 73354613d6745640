//! # IPv4 Range Model
//!
//! Continuous ranges of IPv4 addresses and the /24 segment arithmetic the
//! audit is built around.

use std::net::Ipv4Addr;

/// Prefix length of an audited segment.
pub const SEGMENT_PREFIX: u8 = 24;

/// Represents a continuous range of IPv4 addresses, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ipv4Range {
    pub start_addr: Ipv4Addr,
    pub end_addr: Ipv4Addr,
}

impl Ipv4Range {
    pub fn new(start_addr: Ipv4Addr, end_addr: Ipv4Addr) -> Self {
        Self {
            start_addr,
            end_addr,
        }
    }

    /// Index range of the /24 blocks touched by this range (`ip >> 8`).
    ///
    /// Returns `None` for an inverted range.
    pub fn segment_span(&self) -> Option<(u32, u32)> {
        let start: u32 = u32::from(self.start_addr);
        let end: u32 = u32::from(self.end_addr);
        if start > end {
            return None;
        }
        Some((start >> 8, end >> 8))
    }
}

/// Creates a range from an IP and a CIDR prefix (e.g., 192.168.1.0/24).
///
/// Returns the range covering the entire network block.
pub fn cidr_range(ip: Ipv4Addr, prefix: u8) -> anyhow::Result<Ipv4Range> {
    if prefix > 32 {
        anyhow::bail!("Invalid prefix: {prefix} > 32");
    }
    let ip_u32 = u32::from(ip);
    let mask = if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - prefix)
    };
    let network = ip_u32 & mask;
    let broadcast = network | !mask;
    Ok(Ipv4Range::new(
        Ipv4Addr::from(network),
        Ipv4Addr::from(broadcast),
    ))
}

/// Network address of the /24 segment holding `ip`.
pub fn segment_network(ip: Ipv4Addr) -> Ipv4Addr {
    Ipv4Addr::from(u32::from(ip) & 0xFFFF_FF00)
}

/// Counts the distinct /24 segments covered by `ranges`.
///
/// Overlapping and adjacent ranges are merged first, so a segment listed
/// twice is only counted once.
pub fn count_segments(ranges: &[Ipv4Range]) -> usize {
    let mut spans: Vec<(u32, u32)> = ranges.iter().filter_map(Ipv4Range::segment_span).collect();
    spans.sort_unstable();

    let mut total: u64 = 0;
    let mut current: Option<(u32, u32)> = None;

    for (start, end) in spans {
        match current {
            Some((cur_start, cur_end)) if start <= cur_end.saturating_add(1) => {
                current = Some((cur_start, cur_end.max(end)));
            }
            Some((cur_start, cur_end)) => {
                total += u64::from(cur_end - cur_start) + 1;
                current = Some((start, end));
            }
            None => current = Some((start, end)),
        }
    }

    if let Some((cur_start, cur_end)) = current {
        total += u64::from(cur_end - cur_start) + 1;
    }

    total as usize
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
