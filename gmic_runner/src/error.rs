use std::ffi::NulError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("No input buffer provided")]
    MissingInput,

    #[error("G'MIC library not found: {0}")]
    LibraryNotFound(PathBuf),

    #[error("G'MIC library load error: {0}")]
    LibraryLoad(#[from] libloading::Error),

    #[error("Command contains an interior NUL byte")]
    InvalidCommand(#[from] NulError),

    #[error("G'MIC error: {0}")]
    Engine(String),

    #[error("G'MIC changed the image size from {expected:?} to {actual:?}")]
    SizeChanged {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Buffer holds {actual} samples, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    #[error("Unknown filter: {0}")]
    UnknownFilter(String),

    #[error("Filter {filter} has no parameter named {name}")]
    UnknownParameter { filter: String, name: String },

    #[error("Parameter {name} expects a {expected} value")]
    ParameterType { name: String, expected: &'static str },

    #[error("Parameter {name} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),
}

pub type RunnerResult<T> = Result<T, RunnerError>;
