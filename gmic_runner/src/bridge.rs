//! Moves host pixels through G'MIC and back.
//!
//! The whole input extent is handed to the engine (most G'MIC filters are
//! not region separable); only the requested region is written back.

use std::ffi::CString;

use tracing::{debug, info, warn};

use crate::buffer::HostBuffer;
use crate::command::FilterCommand;
use crate::engine::{ENGINE_WHITE, Engine, EngineImage, EngineOptions, EngineRun};
use crate::error::{RunnerError, RunnerResult};
use crate::fallback;
use crate::format::{input_format, output_format};
use crate::region::Rect;

const INV_255: f32 = 1.0 / ENGINE_WHITE;

/// Written for region pixels outside the produced image.
pub const OUT_OF_BOUNDS_PIXEL: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// How a successful [`process_buffer`] call ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The transformed image was written; its size may differ from the input.
    Processed { width: u32, height: u32 },
    /// The engine failed; the input was written with the error drawn on it.
    EngineFailed { message: String },
}

/// Runs `command` over the whole `input` (and `aux`) and writes `roi` of
/// the result into `output`.
///
/// `roi` is clipped to the output extent after it follows a size change,
/// so [`Rect::UNBOUNDED`] writes the whole result.
///
/// Engine failures are not errors: they produce [`Outcome::EngineFailed`]
/// and a visible annotation. So does a result holding fewer samples than
/// its size declares. `level` is accepted for host compatibility
/// and has no effect.
pub fn process_buffer(
    engine: &dyn Engine,
    input: Option<&dyn HostBuffer>,
    aux: Option<&dyn HostBuffer>,
    output: &mut dyn HostBuffer,
    roi: Rect,
    level: i32,
    command: &FilterCommand,
) -> RunnerResult<Outcome> {
    let Some(input) = input else {
        warn!("no input buffer provided");
        return Err(RunnerError::MissingInput);
    };

    let cmd = command.assemble();
    CString::new(cmd.as_str())?;

    let full = input.extent();
    let source = read_scaled("input", input);
    debug!(?full, ?roi, level, spectrum = source.spectrum, "read input");

    if command.is_empty() {
        write_region(output, full, &source, roi);
        return Ok(Outcome::Processed {
            width: source.width,
            height: source.height,
        });
    }

    let mut images = vec![source];
    if let Some(aux) = aux {
        let aux = read_scaled("aux", aux);
        debug!(width = aux.width, height = aux.height, spectrum = aux.spectrum, "read aux");
        images.push(aux);
    }

    info!(command = %cmd, "running G'MIC command");
    let EngineRun { images, error } = engine.run(&cmd, images, &EngineOptions::default());

    let mut images = images.into_iter();
    let checked = match error {
        Some(message) => Err(message),
        None => first_complete(images.next()),
    };
    drop(images);
    let result = match checked {
        Ok(image) => image,
        Err(message) => {
            warn!(%message, "G'MIC error");
            write_fallback(input, output, full, roi, &message);
            return Ok(Outcome::EngineFailed { message });
        }
    };

    if (result.width as i32, result.height as i32) != (full.width, full.height) {
        let extent = Rect::new(full.x, full.y, result.width as i32, result.height as i32);
        debug!(?extent, "output size changed");
        output.set_extent(extent);
    }
    write_region(output, full, &result, roi);

    Ok(Outcome::Processed {
        width: result.width,
        height: result.height,
    })
}

/// Runs `command` over an interleaved, normalized RGBA image in place.
///
/// The image keeps its size: a command that resizes it is reported as
/// [`RunnerError::SizeChanged`] and, like an engine error, leaves `rgba`
/// untouched.
pub fn run_rgba_in_place(
    engine: &dyn Engine,
    rgba: &mut [f32],
    width: u32,
    height: u32,
    command: &str,
) -> RunnerResult<()> {
    let expected = width as usize * height as usize * 4;
    if rgba.len() != expected {
        return Err(RunnerError::BufferSize {
            expected,
            actual: rgba.len(),
        });
    }
    if command.trim().is_empty() {
        return Ok(());
    }
    CString::new(command)?;

    let data = rgba.iter().map(|v| v * ENGINE_WHITE).collect();
    let image = EngineImage::from_host("input", width, height, 4, data);
    info!(command, "running G'MIC command");
    let run = engine.run(command, vec![image], &EngineOptions::default());
    if let Some(message) = run.error {
        warn!(%message, "G'MIC error");
        return Err(RunnerError::Engine(message));
    }
    let result = first_complete(run.images.into_iter().next()).map_err(RunnerError::Engine)?;
    if (result.width, result.height) != (width, height) {
        return Err(RunnerError::SizeChanged {
            expected: (width, height),
            actual: (result.width, result.height),
        });
    }

    for (i, px) in rgba.chunks_exact_mut(4).enumerate() {
        let x = (i % width as usize) as u32;
        let y = (i / width as usize) as u32;
        let out = result.rgba(x, y).map_or(OUT_OF_BOUNDS_PIXEL, |p| p.map(|v| v * INV_255));
        px.copy_from_slice(&out);
    }
    Ok(())
}

/// The image to write back, or the reason there is none: no image at all,
/// or fewer samples than its geometry declares.
fn first_complete(image: Option<EngineImage<'_>>) -> Result<EngineImage<'_>, String> {
    let image = image.ok_or_else(|| "engine returned no images".to_owned())?;
    if image.samples().len() < image.sample_count() {
        return Err(format!(
            "engine returned {} samples for a {}x{}x{} image",
            image.samples().len(),
            image.width,
            image.height,
            image.spectrum
        ));
    }
    Ok(image)
}

/// Reads the whole buffer in its input format, scaled to engine units.
fn read_scaled(name: &str, buffer: &dyn HostBuffer) -> EngineImage<'static> {
    let extent = buffer.extent();
    let format = input_format(buffer.format().components());
    let mut data = buffer.get(extent, format);
    for v in &mut data {
        *v *= ENGINE_WHITE;
    }
    EngineImage::from_host(
        name,
        extent.width.max(0) as u32,
        extent.height.max(0) as u32,
        format.components() as u32,
        data,
    )
}

fn write_fallback(
    input: &dyn HostBuffer,
    output: &mut dyn HostBuffer,
    full: Rect,
    roi: Rect,
    message: &str,
) {
    let source = read_scaled("input", input);
    let annotated = fallback::render_error(&source, message);
    if output.extent() != full {
        output.set_extent(full);
    }
    write_region(output, full, &annotated, roi);
}

/// Writes `roi` of `image` into `output` row by row.
///
/// `roi` is clipped to the output extent first. `origin` is the extent the
/// image was produced from; image pixel `(0, 0)` sits at its top-left
/// corner. Rows outside the image are skipped, columns outside it are
/// written as [`OUT_OF_BOUNDS_PIXEL`].
fn write_region(output: &mut dyn HostBuffer, origin: Rect, image: &EngineImage<'_>, roi: Rect) {
    let Some(roi) = roi.intersect(&output.extent()) else {
        return;
    };
    let format = output_format();
    let mut line = vec![0.0f32; roi.width as usize * 4];

    for sy in roi.y..roi.bottom() {
        let iy = i64::from(sy) - i64::from(origin.y);
        if iy < 0 || iy >= i64::from(image.height) {
            continue;
        }
        for (col, px) in line.chunks_exact_mut(4).enumerate() {
            let ix = i64::from(roi.x) + col as i64 - i64::from(origin.x);
            let rgba = if ix < 0 || ix > i64::from(u32::MAX) {
                None
            } else {
                image.rgba(ix as u32, iy as u32)
            };
            let out = rgba.map_or(OUT_OF_BOUNDS_PIXEL, |p| p.map(|v| v * INV_255));
            px.copy_from_slice(&out);
        }
        output.set(roi.row(sy), format, &line);
    }
}
