//! Turns the external scanner's output into a stream of [`Finding`]s.
//!
//! Two artifact formats are understood: the grepable line format ([`gnmap`])
//! and the structured XML report ([`xml`]). Both implement
//! [`ScanResultSource`]; [`PreferredSource`] reads the XML report when one is
//! available and falls back to the line format otherwise.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::finding::Finding;

pub mod gnmap;
pub mod xml;

pub use gnmap::GnmapSource;
pub use xml::XmlSource;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("scan results {path} could not be read: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("scan results {path} are malformed: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

/// Anything that can produce the findings of one finished scan.
pub trait ScanResultSource {
    /// Short human readable description, used in logs.
    fn describe(&self) -> String;

    /// Reads the artifact and returns one finding per open (host, port) pair.
    ///
    /// Duplicates are allowed here; the audit model removes them.
    fn load(&self) -> Result<Vec<Finding>, SourceError>;
}

/// Prefers the XML report, falls back to the grepable output.
pub struct PreferredSource {
    xml: Option<XmlSource>,
    gnmap: GnmapSource,
}

impl PreferredSource {
    pub fn new(gnmap: impl Into<PathBuf>, xml: Option<PathBuf>) -> Self {
        Self {
            xml: xml.map(XmlSource::new),
            gnmap: GnmapSource::new(gnmap),
        }
    }
}

impl ScanResultSource for PreferredSource {
    fn describe(&self) -> String {
        match &self.xml {
            Some(xml) => format!("{} (fallback: {})", xml.describe(), self.gnmap.describe()),
            None => self.gnmap.describe(),
        }
    }

    fn load(&self) -> Result<Vec<Finding>, SourceError> {
        if let Some(xml) = &self.xml {
            match xml.load() {
                Ok(findings) => {
                    debug!("Read {} findings from {}", findings.len(), xml.describe());
                    return Ok(findings);
                }
                Err(e) => warn!("{e}; falling back to {}", self.gnmap.describe()),
            }
        }
        self.gnmap.load()
    }
}

/// Reads an artifact, replacing invalid UTF-8 instead of failing on it.
fn read_lossy(path: &Path) -> Result<String, SourceError> {
    let bytes = fs::read(path).map_err(|source| SourceError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
