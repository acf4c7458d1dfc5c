//! CLI Exit Code Registry
//!
//! Every exit code the `stockback` binary can return. Scripts that schedule
//! the monthly report run rely on these values.
//!
//! # Exit Code Ranges
//!
//! | Code | Meaning                                                   |
//! |------|-----------------------------------------------------------|
//! | 0    | Success (report and requested outputs written)            |
//! | 1    | General error (unspecified)                               |
//! | 2    | Usage error (bad arguments)                               |
//! | 10   | Config file unreadable or invalid                         |
//! | 11   | An input file could not be read or decoded                |
//! | 12   | Structural pipeline failure (missing required column)     |
//! | 13   | The XLSX report could not be rendered or written          |
//! | 14   | A result sink or summary file could not be written        |
//!
//! Row-level problems (unparseable quantities, unmatched drug names) never
//! change the exit code; they are counted in the run summary.

use stockback_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
/// clap exits with this code on its own parse errors.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Run (10-19)
// =============================================================================

/// Config file could not be read, parsed, or validated.
pub const EXIT_INVALID_CONFIG: u8 = 10;

/// An input table could not be read (missing file, unsupported extension,
/// malformed CSV, unreadable workbook).
pub const EXIT_INPUT_LOAD: u8 = 11;

/// The pipeline rejected its input (required column absent, table in the
/// wrong slot).
pub const EXIT_PIPELINE: u8 = 12;

/// Every planned sheet failed, or the workbook could not be saved or written.
pub const EXIT_RENDER: u8 = 13;

/// CSV/JSON result or summary output failed.
pub const EXIT_SINK: u8 = 14;

/// Map a pipeline error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        ReconError::TableParse { .. } => EXIT_INPUT_LOAD,
        ReconError::MissingColumn { .. } => EXIT_PIPELINE,
        ReconError::Sink(_) => EXIT_SINK,
    }
}
