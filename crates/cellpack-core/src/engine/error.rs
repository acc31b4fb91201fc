use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use super::config::ConfigError;
use super::stage::PipelineStage;
use crate::core::catalog::CatalogError;
use crate::core::io::error::StructureError;
use crate::core::models::species::SpeciesError;

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid species '{name}': {reason}")]
    InvalidSpecies { name: String, reason: String },

    #[error("Packing engine did not finish within {timeout:?}")]
    PackingTimeout { timeout: Duration },

    #[error("Packing engine produced no usable output: {0}")]
    PackingFailure(String),

    #[error("Packed structure holds {found} atoms but the request expects {expected}")]
    PartitionMismatch { expected: usize, found: usize },

    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Structure file '{path}': {source}")]
    Structure {
        path: PathBuf,
        source: StructureError,
    },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Realization {index} failed during '{stage}': {source}")]
    Realization {
        index: usize,
        stage: PipelineStage,
        source: Box<AssemblyError>,
    },
}

impl AssemblyError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn structure(path: impl Into<PathBuf>, source: StructureError) -> Self {
        Self::Structure {
            path: path.into(),
            source,
        }
    }

    /// Attributes this error to a realization and the stage it failed in.
    pub fn in_realization(self, index: usize, stage: PipelineStage) -> Self {
        Self::Realization {
            index,
            stage,
            source: Box::new(self),
        }
    }

    /// The stage a realization failed in, if this error came from one.
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            Self::Realization { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl From<ConfigError> for AssemblyError {
    fn from(err: ConfigError) -> Self {
        Self::InvalidConfiguration(err.to_string())
    }
}

impl From<SpeciesError> for AssemblyError {
    fn from(err: SpeciesError) -> Self {
        let name = match &err {
            SpeciesError::EmptyTemplate { name }
            | SpeciesError::UnknownElement { name, .. }
            | SpeciesError::NonPositiveMass { name, .. } => name.clone(),
        };
        Self::InvalidSpecies {
            name,
            reason: err.to_string(),
        }
    }
}
