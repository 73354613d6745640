//! Static knowledge about the critical-service ports the audit looks for.
//!
//! Every port maps to exactly one service name and one [`Category`]. The same
//! table drives the scanner's port list, so the audit never reports a port it
//! did not ask about without also being able to classify it.

use std::fmt;

use serde::Serialize;

/// Business criticality class of an exposed service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Administration,
    Database,
    MailFtp,
    Web,
    Dns,
    WindowsServices,
    Other,
}

impl Category {
    /// Every category, in report order.
    pub const ALL: [Category; 7] = [
        Category::Administration,
        Category::Database,
        Category::MailFtp,
        Category::Web,
        Category::Dns,
        Category::WindowsServices,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Administration => "ADMINISTRATION",
            Category::Database => "DATABASE",
            Category::MailFtp => "MAIL_FTP",
            Category::Web => "WEB",
            Category::Dns => "DNS",
            Category::WindowsServices => "WINDOWS_SERVICES",
            Category::Other => "OTHER",
        }
    }

    pub fn from_name(name: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the knowledge base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortInfo {
    pub port: u16,
    pub service: &'static str,
    pub category: Category,
}

/// Service name used for ports missing from [`PORTS`].
pub const UNKNOWN_SERVICE: &str = "Unknown";

/// The knowledge base. Sorted by port so lookups can binary search.
pub static PORTS: &[PortInfo] = &[
    PortInfo { port: 21, service: "FTP", category: Category::MailFtp },
    PortInfo { port: 22, service: "SSH", category: Category::Administration },
    PortInfo { port: 23, service: "Telnet", category: Category::Administration },
    PortInfo { port: 25, service: "SMTP", category: Category::MailFtp },
    PortInfo { port: 53, service: "DNS", category: Category::Dns },
    PortInfo { port: 80, service: "HTTP", category: Category::Web },
    PortInfo { port: 110, service: "POP3", category: Category::MailFtp },
    PortInfo { port: 135, service: "RPC", category: Category::WindowsServices },
    PortInfo { port: 139, service: "NetBIOS", category: Category::WindowsServices },
    PortInfo { port: 143, service: "IMAP", category: Category::MailFtp },
    PortInfo { port: 443, service: "HTTPS", category: Category::Web },
    PortInfo { port: 445, service: "SMB", category: Category::WindowsServices },
    PortInfo { port: 993, service: "IMAPS", category: Category::MailFtp },
    PortInfo { port: 995, service: "POP3S", category: Category::MailFtp },
    PortInfo { port: 1433, service: "MSSQL", category: Category::Database },
    PortInfo { port: 1521, service: "Oracle", category: Category::Database },
    PortInfo { port: 3306, service: "MySQL", category: Category::Database },
    PortInfo { port: 3389, service: "RDP", category: Category::Administration },
    PortInfo { port: 5432, service: "PostgreSQL", category: Category::Database },
    PortInfo { port: 5900, service: "VNC", category: Category::Administration },
    PortInfo { port: 8080, service: "HTTP-Alt", category: Category::Web },
    PortInfo { port: 8443, service: "HTTPS-Alt", category: Category::Web },
];

/// Looks up the service name and category of `port`.
///
/// Never fails: unmapped ports come back as `("Unknown", Other)`.
pub fn classify(port: u16) -> (&'static str, Category) {
    match PORTS.binary_search_by_key(&port, |info| info.port) {
        Ok(idx) => (PORTS[idx].service, PORTS[idx].category),
        Err(_) => (UNKNOWN_SERVICE, Category::Other),
    }
}

/// Comma separated port list for the scanner's `-p` argument.
pub fn target_ports() -> String {
    PORTS
        .iter()
        .map(|info| info.port.to_string())
        .collect::<Vec<String>>()
        .join(",")
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

    #[test]
    fn table_has_22_sorted_unique_entries() {
        assert_eq!(PORTS.len(), 22);
        assert!(PORTS.windows(2).all(|w| w[0].port < w[1].port));
    }

    #[test]
    fn classify_known_and_unknown_ports() {
        assert_eq!(classify(3389), ("RDP", Category::Administration));
        assert_eq!(classify(5432), ("PostgreSQL", Category::Database));
        assert_eq!(classify(445), ("SMB", Category::WindowsServices));
        assert_eq!(classify(9999), ("Unknown", Category::Other));
        assert_eq!(classify(0), ("Unknown", Category::Other));
    }

    #[test]
    fn category_names_round_trip() {
        for category in Category::ALL {
            assert_eq!(Category::from_name(category.as_str()), Some(category));
        }
        assert_eq!(Category::from_name("BASE_DATOS"), None);
        assert_eq!(
            serde_json::to_string(&Category::WindowsServices).unwrap(),
            "\"WINDOWS_SERVICES\""
        );
    }

    #[test]
    fn target_ports_lists_every_entry() {
        let ports = target_ports();
        assert!(ports.starts_with("21,22,23,"));
        assert!(ports.ends_with(",8080,8443"));
        assert_eq!(ports.split(',').count(), PORTS.len());
    }
}
