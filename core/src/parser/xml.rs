//! Parser for the scanner's XML report (`-oX`).
//!
//! Only the parts needed to build findings are modelled: host status,
//! IPv4 address and the state of each port.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use serde::Deserialize;

use crate::finding::Finding;
use crate::parser::{ScanResultSource, SourceError, read_lossy};

#[derive(Debug, Deserialize)]
struct NmapRun {
    #[serde(rename = "host", default)]
    hosts: Vec<Host>,
}

#[derive(Debug, Deserialize)]
struct Host {
    #[serde(rename = "address", default)]
    addresses: Vec<Address>,

    #[serde(default)]
    status: Option<Status>,

    #[serde(default)]
    ports: Option<Ports>,
}

#[derive(Debug, Deserialize)]
struct Address {
    #[serde(rename = "@addr")]
    addr: String,
    #[serde(rename = "@addrtype")]
    addr_type: String,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(rename = "@state")]
    state: String,
}

#[derive(Debug, Deserialize)]
struct Ports {
    #[serde(rename = "port", default)]
    ports: Vec<Port>,
}

#[derive(Debug, Deserialize)]
struct Port {
    #[serde(rename = "@portid")]
    portid: u32,
    state: PortState,
}

#[derive(Debug, Deserialize)]
struct PortState {
    #[serde(rename = "@state")]
    state: String,
}

impl Host {
    fn ipv4(&self) -> Option<Ipv4Addr> {
        self.addresses
            .iter()
            .filter(|a| a.addr_type == "ipv4")
            .find_map(|a| a.addr.parse().ok())
    }

    fn is_up(&self) -> bool {
        self.status.as_ref().is_none_or(|s| s.state == "up")
    }

    fn open_ports(&self) -> impl Iterator<Item = u16> + '_ {
        self.ports
            .iter()
            .flat_map(|p| p.ports.iter())
            .filter(|p| p.state.state == "open")
            .filter_map(|p| u16::try_from(p.portid).ok())
            .filter(|port| *port != 0)
    }
}

/// Parses a complete XML report.
pub fn parse(xml: &str) -> Result<Vec<Finding>, quick_xml::DeError> {
    let run: NmapRun = quick_xml::de::from_str(xml)?;

    let findings = run
        .hosts
        .iter()
        .filter(|host| host.is_up())
        .filter_map(|host| host.ipv4().map(|ip| (ip, host)))
        .flat_map(|(ip, host)| host.open_ports().map(move |port| Finding::new(ip, port)))
        .collect();

    Ok(findings)
}

/// An XML report on disk.
pub struct XmlSource {
    path: PathBuf,
}

impl XmlSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ScanResultSource for XmlSource {
    fn describe(&self) -> String {
        format!("XML report {}", self.path.display())
    }

    fn load(&self) -> Result<Vec<Finding>, SourceError> {
        let content = read_lossy(&self.path)?;
        if !content.contains("<nmaprun") {
            return Err(SourceError::Malformed {
                path: self.path.clone(),
                reason: "no <nmaprun> element".to_string(),
            });
        }
        parse(&content).map_err(|e| SourceError::Malformed {
            path: self.path.clone(),
            reason: e.to_string(),
        })
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
