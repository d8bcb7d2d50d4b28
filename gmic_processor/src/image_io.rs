use gmic_runner::buffer::from_rgba;
use gmic_runner::{HostBuffer, PixelBuffer, Rect, input_format, output_format};
use image::{DynamicImage, GenericImageView, ImageBuffer, ImageFormat, Rgba};
use std::path::Path;

use crate::error::AppError;

/// Loads an image file keeping its channel count (gray, gray + alpha, RGB
/// or RGBA).
pub fn load(path: &Path) -> Result<PixelBuffer, AppError> {
    let img = image::open(path)?;
    let (width, height) = img.dimensions();
    let format = input_format(img.color().channel_count() as usize);
    let n = format.components();

    let rgba = img.to_rgba32f();
    let mut data = Vec::with_capacity(width as usize * height as usize * n);
    let mut px = [0.0f32; 4];
    for p in rgba.pixels() {
        from_rgba(p.0, format.layout, &mut px);
        data.extend_from_slice(&px[..n]);
    }

    let extent = Rect::new(0, 0, width as i32, height as i32);
    Ok(PixelBuffer::from_samples(extent, format, data)?)
}

/// Saves the buffer as 8-bit RGBA, or RGB for formats without alpha.
pub fn save(buffer: &PixelBuffer, path: &Path) -> Result<(), AppError> {
    let extent = buffer.extent();
    let data = buffer.get(extent, output_format());
    let img: ImageBuffer<Rgba<f32>, _> =
        ImageBuffer::from_raw(extent.width as u32, extent.height as u32, data)
            .ok_or(AppError::InvalidBuffer)?;

    let img = DynamicImage::ImageRgba32F(img);
    match ImageFormat::from_path(path) {
        Ok(ImageFormat::Jpeg) => DynamicImage::ImageRgb8(img.to_rgb8()).save(path)?,
        _ => DynamicImage::ImageRgba8(img.to_rgba8()).save(path)?,
    }
    Ok(())
}
