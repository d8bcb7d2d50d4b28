use gmic_runner::RunnerError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Input image not found: {0}")]
    InputImageNotFound(PathBuf),

    #[error("Aux image not found: {0}")]
    AuxImageNotFound(PathBuf),

    #[error("Params file not found: {0}")]
    ParamsFileNotFound(PathBuf),

    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("Failed to load or save image: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid params file: {0}")]
    Params(#[from] serde_json::Error),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error("Result buffer does not match its extent")]
    InvalidBuffer,
}
