use segmentor_common::error::ConfigError;
use thiserror::Error;

use crate::audit::AuditStage;
use crate::parser::SourceError;
use crate::scanner::UpstreamToolError;

/// A fatal audit failure. Nothing has been exported when one of these is returned.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Upstream(#[from] UpstreamToolError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("scanner work directory could not be created: {0}")]
    WorkDir(#[source] std::io::Error),
}

impl AuditError {
    /// The stage the run was in when it failed.
    pub fn stage(&self) -> AuditStage {
        match self {
            AuditError::Config(_) => AuditStage::Init,
            AuditError::Upstream(_) | AuditError::WorkDir(_) => AuditStage::ScanRunning,
            AuditError::Source(_) => AuditStage::Parsing,
        }
    }
}
