//! Segmentation audit engine: port knowledge base, scan-result parsing, the
//! audit model, exporters and the orchestrator that ties them together.

pub mod audit;
pub mod criticality;
pub mod error;
pub mod export;
pub mod finding;
pub mod knowledge_base;
pub mod model;
pub mod parser;
pub mod scanner;
