use std::fmt;

/// Which input dataset an error or log line concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Inventory,
    PurchaseHistory,
    CodeMapping,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inventory => write!(f, "inventory"),
            Self::PurchaseHistory => write!(f, "purchase_history"),
            Self::CodeMapping => write!(f, "code_mapping"),
        }
    }
}

/// Pipeline stage in which a structural failure was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Ingest,
    Resolve,
    Validate,
    Merge,
    Finalize,
    Partition,
    Render,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ingest => write!(f, "ingest"),
            Self::Resolve => write!(f, "resolve"),
            Self::Validate => write!(f, "validate"),
            Self::Merge => write!(f, "merge"),
            Self::Finalize => write!(f, "finalize"),
            Self::Partition => write!(f, "partition"),
            Self::Render => write!(f, "render"),
            Self::Persist => write!(f, "persist"),
        }
    }
}

/// Structural failure of a run. Rows that fail validation are filtered, never
/// reported through this type.
#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (blank column name, bad layout value, etc.).
    ConfigValidation(String),
    /// A required column is absent from an input table's header.
    MissingColumn {
        stage: Stage,
        table: TableKind,
        column: String,
    },
    /// The input table itself could not be parsed.
    TableParse { table: TableKind, detail: String },
    /// The result sink rejected the finalized rows.
    Sink(String),
}

impl ReconError {
    /// Stage the failure belongs to.
    pub fn stage(&self) -> Stage {
        match self {
            Self::ConfigParse(_) | Self::ConfigValidation(_) | Self::TableParse { .. } => Stage::Ingest,
            Self::MissingColumn { stage, .. } => *stage,
            Self::Sink(_) => Stage::Persist,
        }
    }
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { stage, table, column } => {
                write!(f, "{stage}: table '{table}' is missing required column '{column}'")
            }
            Self::TableParse { table, detail } => {
                write!(f, "ingest: cannot parse table '{table}': {detail}")
            }
            Self::Sink(msg) => write!(f, "persist: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
