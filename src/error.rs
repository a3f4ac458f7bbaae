use std::path::PathBuf;

use simple_error::SimpleError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid parameter specification: {0}")]
    InvalidParameterSpec(String),

    #[error("size mismatch: expected {expected} values, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("connection probability must be in [0, 1], got {0}")]
    InvalidProbability(f64),

    #[error("destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    #[error("cell type {0} has no declared parameter schema")]
    UnsupportedCellType(String),

    #[error("manifest not found: {}", .0.display())]
    ManifestNotFound(PathBuf),

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("corrupt data: {0}")]
    CorruptData(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("population not found: {0}")]
    PopulationNotFound(String),

    #[error("duplicate label: {0}")]
    DuplicateLabel(String),

    #[error("population {0} must contain at least one cell")]
    EmptyPopulation(String),

    #[error("index {index} out of bounds for population {label} of size {size}")]
    IndexOutOfBounds {
        label: String,
        index: usize,
        size: usize,
    },

    #[error("cell type {cell_type} has no receptor type {receptor_type}")]
    UnknownReceptorType {
        cell_type: String,
        receptor_type: String,
    },

    #[error("conflicting synapse models in edge group {0}")]
    ConflictingEdgeGroup(String),

    #[error("invalid synapse parameters: {0}")]
    InvalidSynapseParameters(#[from] SimpleError),

    #[error("invalid network config: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
