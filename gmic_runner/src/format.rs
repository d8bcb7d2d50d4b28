//! Pixel format tags used when reading from and writing to host buffers.

/// Channel layout of interleaved float samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layout {
    /// Gray.
    Y,
    /// Gray + alpha.
    Ya,
    /// Red, green, blue.
    Rgb,
    /// Red, green, blue, alpha.
    Rgba,
}

impl Layout {
    /// Number of interleaved samples per pixel.
    pub fn components(self) -> usize {
        match self {
            Layout::Y => 1,
            Layout::Ya => 2,
            Layout::Rgb => 3,
            Layout::Rgba => 4,
        }
    }
}

/// Transfer curve the samples are expressed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transfer {
    /// Linear light (`RGB`).
    Linear,
    /// Gamma encoded (`R'G'B'`).
    Perceptual,
}

/// A float pixel format: layout plus transfer tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelFormat {
    pub layout: Layout,
    pub transfer: Transfer,
}

impl PixelFormat {
    pub const fn new(layout: Layout, transfer: Transfer) -> Self {
        Self { layout, transfer }
    }

    pub fn components(&self) -> usize {
        self.layout.components()
    }

    /// babl-style name, e.g. `R'G'B'A float`.
    pub fn name(&self) -> String {
        let prime = match self.transfer {
            Transfer::Linear => "",
            Transfer::Perceptual => "'",
        };
        let body = match self.layout {
            Layout::Y => format!("Y{prime}"),
            Layout::Ya => format!("Y{prime}A"),
            Layout::Rgb => format!("R{prime}G{prime}B{prime}"),
            Layout::Rgba => format!("R{prime}G{prime}B{prime}A"),
        };
        format!("{body} float")
    }
}

/// Format used to read a buffer with `channels` components.
///
/// G'MIC filters expect gamma encoded samples, so every input is read in
/// the perceptual variant. Unexpected channel counts fall back to RGB.
pub fn input_format(channels: usize) -> PixelFormat {
    let layout = match channels {
        1 => Layout::Y,
        2 => Layout::Ya,
        4 => Layout::Rgba,
        _ => Layout::Rgb,
    };
    PixelFormat::new(layout, Transfer::Perceptual)
}

/// Format every result is written back in.
pub fn output_format() -> PixelFormat {
    PixelFormat::new(Layout::Rgba, Transfer::Perceptual)
}
