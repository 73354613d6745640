//! Shared building blocks for the segmentor workspace: run configuration,
//! IPv4 range handling and the audit range plan.

pub mod config;
pub mod error;
pub mod network;

/// Logs a success message. Rendered with the success symbol by the CLI formatter.
#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {
        tracing::info!(target: "segmentor::success", $($arg)*)
    };
}
