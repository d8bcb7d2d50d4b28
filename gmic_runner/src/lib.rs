//! Runs G'MIC filters over host pixel buffers.
//!
//! A filter's parameters are encoded into a G'MIC command
//! ([`filters`], [`params`], [`command`]); [`bridge::process_buffer`] copies
//! the host buffer into the engine's representation, calls the engine
//! ([`engine::Engine`], implemented for the G'MIC C library by
//! [`gmic::GmicLibrary`]) and writes the requested region of the result
//! back, or an annotated copy of the input when G'MIC reports an error.

pub mod bridge;
pub mod buffer;
pub mod command;
pub mod engine;
pub mod error;
pub mod fallback;
pub mod filters;
pub mod format;
pub mod gmic;
pub mod params;
pub mod region;

pub use bridge::{Outcome, process_buffer, run_rgba_in_place};
pub use buffer::{HostBuffer, PixelBuffer};
pub use command::FilterCommand;
pub use engine::{Engine, EngineImage, EngineOptions, EngineRun, PixelStorage};
pub use error::{RunnerError, RunnerResult};
pub use filters::FilterSchema;
pub use format::{PixelFormat, input_format, output_format};
pub use gmic::GmicLibrary;
pub use params::{ParamValue, ParamValues};
pub use region::Rect;
