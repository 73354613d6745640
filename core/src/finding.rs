use std::fmt;
use std::net::Ipv4Addr;

use segmentor_common::network::range::{SEGMENT_PREFIX, segment_network};
use serde::{Serialize, Serializer};

use crate::knowledge_base::{self, Category};

/// A /24 network, identified by its network address.
///
/// Ordering follows the numeric value of the address, so `10.0.2.0/24`
/// sorts before `10.0.10.0/24`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentKey(Ipv4Addr);

impl SegmentKey {
    pub fn of(ip: Ipv4Addr) -> Self {
        Self(segment_network(ip))
    }

    pub fn network(&self) -> Ipv4Addr {
        self.0
    }
}

impl fmt::Display for SegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.0, SEGMENT_PREFIX)
    }
}

impl Serialize for SegmentKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One confirmed open (host, port) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Finding {
    pub segment: SegmentKey,
    pub ip: Ipv4Addr,
    pub port: u16,
    pub service: &'static str,
    pub category: Category,
}

impl Finding {
    /// Classifies `port` and derives the segment of `ip`.
    pub fn new(ip: Ipv4Addr, port: u16) -> Self {
        let (service, category) = knowledge_base::classify(port);
        Self {
            segment: SegmentKey::of(ip),
            ip,
            port,
            service,
            category,
        }
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
