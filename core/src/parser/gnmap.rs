//! Parser for the scanner's grepable (`-oG`) output.
//!
//! Only host lines carrying a `Ports:` field are relevant:
//!
//! ```text
//! Host: 192.168.1.10 ()	Ports: 22/open/tcp//ssh///, 80/closed/tcp//http///	Ignored State: filtered (20)
//! ```
//!
//! Every other line (comments, `Status: Up` lines, scan banners) is skipped
//! silently.

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::finding::Finding;
use crate::parser::{ScanResultSource, SourceError, read_lossy};

static HOST_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Host:\s+(?P<ip>\d{1,3}(?:\.\d{1,3}){3})\s.*?Ports:\s*(?P<ports>[^\t]*)")
        .expect("host line pattern is valid")
});

const IGNORED_STATE: &str = "Ignored State:";

/// Lazily parses grepable output, one finding per open (host, port) pair.
///
/// Single pass: call again on the same input to restart.
pub fn parse<'a, I>(lines: I) -> impl Iterator<Item = Finding> + 'a
where
    I: IntoIterator<Item = &'a str>,
    I::IntoIter: 'a,
{
    lines.into_iter().flat_map(parse_line)
}

/// Parses one line. Returns nothing for non-host lines and hosts without open ports.
pub fn parse_line(line: &str) -> Vec<Finding> {
    let Some(caps) = HOST_LINE.captures(line) else {
        return Vec::new();
    };

    let Ok(ip) = caps["ip"].parse::<Ipv4Addr>() else {
        debug!("Skipping host line with invalid address: {line}");
        return Vec::new();
    };

    let mut ports_field = &caps["ports"];
    if let Some(idx) = ports_field.find(IGNORED_STATE) {
        ports_field = &ports_field[..idx];
    }

    ports_field
        .split(',')
        .filter_map(open_port)
        .map(|port| Finding::new(ip, port))
        .collect()
}

/// Extracts the port number of a `port/state/proto/...` entry if the state is `open`.
fn open_port(entry: &str) -> Option<u16> {
    let mut fields = entry.trim().split('/');
    let port = fields.next()?.trim().parse::<u16>().ok()?;
    if port == 0 {
        return None;
    }
    match fields.next() {
        Some("open") => Some(port),
        _ => None,
    }
}

/// A grepable output file on disk.
pub struct GnmapSource {
    path: PathBuf,
}

impl GnmapSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ScanResultSource for GnmapSource {
    fn describe(&self) -> String {
        format!("grepable output {}", self.path.display())
    }

    fn load(&self) -> Result<Vec<Finding>, SourceError> {
        let content = read_lossy(&self.path)?;
        Ok(parse(content.lines()).collect())
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
    use crate::knowledge_base::Category;

    const SAMPLE: &str = "\
# Nmap 7.94 scan initiated Mon May  6 10:00:00 2024 as: nmap -n -sS --open -oG out.gnmap 192.168.10.0/24
Host: 192.168.10.1 ()\tStatus: Up
Host: 192.168.10.1 ()\tPorts: 22/open/tcp//ssh///, 443/open/tcp//https///\tIgnored State: filtered (20)
Host: 192.168.10.5 ()\tPorts: 3389/open/tcp//ms-wbt-server///, 80/closed/tcp//http///
Host: 192.168.10.9 ()\tPorts: 80/filtered/tcp//http///
# Nmap done at Mon May  6 10:05:00 2024 -- 256 IP addresses (3 hosts up) scanned in 300.00 seconds
";

    #[test]
    fn parses_open_ports_only() {
        let findings: Vec<Finding> = parse(SAMPLE.lines()).collect();
        let pairs: Vec<(String, u16)> = findings.iter().map(|f| (f.ip.to_string(), f.port)).collect();

        assert_eq!(
            pairs,
            vec![
                ("192.168.10.1".to_string(), 22),
                ("192.168.10.1".to_string(), 443),
                ("192.168.10.5".to_string(), 3389),
            ]
        );
        assert_eq!(findings[2].category, Category::Administration);
    }

    #[test]
    fn skips_non_host_and_malformed_lines() {
        assert!(parse_line("Status: Up").is_empty());
        assert!(parse_line("Host: 999.1.1.1 ()\tPorts: 22/open/tcp////").is_empty());
        assert!(parse_line("Host: 10.0.0.1 ()\tStatus: Up").is_empty());
        assert!(parse_line("Host: 10.0.0.1 ()\tPorts: ").is_empty());
        assert!(parse_line("Host: 10.0.0.1 ()\tPorts: abc/open/tcp//, 70000/open/tcp//").is_empty());
    }

    #[test]
    fn tolerates_spacing_and_extra_metadata() {
        let line = "Host: 10.0.0.7 (db.local)   Ports: 5432/open/tcp//postgresql//PostgreSQL DB 9.6/,3306/open/tcp//mysql/// Ignored State: closed (20)";
        let findings = parse_line(line);
        let ports: Vec<u16> = findings.iter().map(|f| f.port).collect();
        assert_eq!(ports, vec![5432, 3306]);
        assert_eq!(findings[0].service, "PostgreSQL");
    }

    #[test]
    fn unknown_port_is_classified_other() {
        let findings = parse_line("Host: 10.0.0.7 ()\tPorts: 9999/open/tcp//abyss///");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].service, "Unknown");
        assert_eq!(findings[0].category, Category::Other);
    }

    #[test]
    fn parse_is_restartable() {
        let first: Vec<Finding> = parse(SAMPLE.lines()).collect();
        let second: Vec<Finding> = parse(SAMPLE.lines()).collect();
        assert_eq!(first, second);
    }
}
