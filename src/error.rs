use thiserror::Error;

// Unified error type for kryst-amg

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MgError {
    #[error("invalid sparsity pattern: {0}")]
    InvalidPattern(String),
    #[error("aggregation made no progress within {iterations} sweeps (malformed graph?)")]
    AggregationFailed { iterations: usize },
    #[error("no value for `{key}` generated by {factory}")]
    MissingKey { key: String, factory: String },
    #[error("logic error: {0}")]
    LogicError(String),
    #[error("dimension mismatch in {op}: expected {expected}, found {found}")]
    DimensionMismatch {
        op: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("coloring needs more than {max_colors} colors")]
    ColoringOverflow { max_colors: usize },
    #[error("`{key}` holds a {found}, requested as {expected}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("no default factory available for building `{0}`")]
    NoDefaultFactory(String),
    #[error("setup of level {level} failed in {factory}: {source}")]
    LevelSetup {
        level: usize,
        factory: String,
        #[source]
        source: Box<MgError>,
    },
    #[error("communicator error: {0}")]
    Comm(String),
}

impl MgError {
    /// The innermost error, skipping any `LevelSetup` wrapping.
    pub fn root_cause(&self) -> &MgError {
        match self {
            MgError::LevelSetup { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
