use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StructureError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: StructureParseErrorKind,
    },
    #[error("Missing required record: {0}")]
    MissingRecord(String),
    #[error("Inconsistent data: {0}")]
    Inconsistency(String),
    #[error("Unsupported structure format for '{0}'")]
    UnsupportedFormat(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum StructureParseErrorKind {
    #[error("Invalid integer '{value}' for {field}")]
    InvalidInt { field: &'static str, value: String },
    #[error("Invalid float '{value}' for {field}")]
    InvalidFloat { field: &'static str, value: String },
    #[error("Expected at least {expected} fields, found {found}")]
    TooFewFields { expected: usize, found: usize },
    #[error("Lattice is singular or non-finite")]
    InvalidLattice,
}

impl StructureError {
    pub(crate) fn parse(line: usize, kind: StructureParseErrorKind) -> Self {
        Self::Parse { line, kind }
    }
}

pub(crate) fn parse_float(
    value: &str,
    field: &'static str,
    line: usize,
) -> Result<f64, StructureError> {
    value.parse().map_err(|_| {
        StructureError::parse(
            line,
            StructureParseErrorKind::InvalidFloat {
                field,
                value: value.to_string(),
            },
        )
    })
}

pub(crate) fn parse_count(
    value: &str,
    field: &'static str,
    line: usize,
) -> Result<usize, StructureError> {
    value.parse().map_err(|_| {
        StructureError::parse(
            line,
            StructureParseErrorKind::InvalidInt {
                field,
                value: value.to_string(),
            },
        )
    })
}
