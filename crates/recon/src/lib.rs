//! `stockback-recon` - dead-stock redistribution engine.
//!
//! Pure engine crate: receives decoded tables, returns the finalized rows and a
//! structured per-organization report. No CLI or IO dependencies.

pub mod config;
pub mod error;
pub mod finalize;
pub mod merge;
pub mod model;
pub mod partition;
pub mod pipeline;
pub mod resolver;
pub mod schema;
pub mod sink;
pub mod summary;
pub mod table;
pub mod validate;

pub use config::ReconConfig;
pub use error::{ReconError, Stage, TableKind};
pub use model::{MergedRow, PipelineInput};
pub use partition::{sheet_identifier, Report, ReportSheet};
pub use pipeline::{run, PipelineOutput};
pub use sink::ResultSink;
pub use summary::RunSummary;
pub use table::Table;
