//! The narrow interface to the image-processing engine.
//!
//! Pixel data crossing the engine boundary is either owned by Rust
//! ([`PixelStorage::Host`]) or allocated by the engine
//! ([`PixelStorage::Engine`]). Engine allocations hand themselves back to
//! the engine's own release entry point when dropped and never reach the
//! Rust allocator.

use std::fmt;
use std::ptr::NonNull;

/// Options passed along with every engine call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineOptions {
    /// Return interleaved samples.
    pub interleave_output: bool,
    /// Never write into the caller's input buffers.
    pub no_inplace_processing: bool,
    /// Skip loading the engine's standard library.
    pub ignore_stdlib: bool,
    /// Extra command definitions loaded before the call.
    pub custom_commands: Option<String>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            interleave_output: true,
            no_inplace_processing: true,
            ignore_stdlib: false,
            custom_commands: None,
        }
    }
}

/// A synchronous image-processing engine.
pub trait Engine {
    /// Runs `command` over `images` and blocks until the engine returns.
    ///
    /// The returned images may reuse the input storage or be new engine
    /// allocations tied to `self`.
    fn run<'e>(
        &'e self,
        command: &str,
        images: Vec<EngineImage<'e>>,
        options: &EngineOptions,
    ) -> EngineRun<'e>;

    /// Returns an engine allocation to the engine.
    ///
    /// # Safety
    ///
    /// `data` must have been allocated by this engine and not released yet.
    unsafe fn release(&self, data: NonNull<f32>);
}

/// Result of one engine call.
pub struct EngineRun<'e> {
    pub images: Vec<EngineImage<'e>>,
    /// Non-empty engine diagnostic when the call failed.
    pub error: Option<String>,
}

impl<'e> EngineRun<'e> {
    pub fn ok(images: Vec<EngineImage<'e>>) -> Self {
        Self {
            images,
            error: None,
        }
    }

    /// Builds a run from the raw error text; an empty text means success.
    pub fn with_error_text(images: Vec<EngineImage<'e>>, text: &str) -> Self {
        let error = (!text.is_empty()).then(|| text.to_owned());
        Self { images, error }
    }
}

/// A block of samples allocated by an engine.
pub struct EngineBuffer<'e> {
    data: NonNull<f32>,
    len: usize,
    engine: &'e dyn Engine,
}

impl<'e> EngineBuffer<'e> {
    /// Takes ownership of an engine allocation.
    ///
    /// # Safety
    ///
    /// - `data` must point to `len` initialized `f32` values allocated by
    ///   `engine`.
    /// - Nothing else may release `data`; it is released exactly once when
    ///   the returned value is dropped.
    pub unsafe fn new(engine: &'e dyn Engine, data: NonNull<f32>, len: usize) -> Self {
        Self { data, len, engine }
    }

    pub fn as_ptr(&self) -> *const f32 {
        self.data.as_ptr()
    }

    pub fn as_slice(&self) -> &[f32] {
        unsafe { std::slice::from_raw_parts(self.data.as_ptr(), self.len) }
    }
}

impl Drop for EngineBuffer<'_> {
    fn drop(&mut self) {
        unsafe { self.engine.release(self.data) }
    }
}

impl fmt::Debug for EngineBuffer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineBuffer")
            .field("data", &self.data)
            .field("len", &self.len)
            .finish()
    }
}

/// Who owns the samples of an [`EngineImage`].
#[derive(Debug)]
pub enum PixelStorage<'e> {
    Host(Vec<f32>),
    Engine(EngineBuffer<'e>),
}

impl PixelStorage<'_> {
    pub fn as_slice(&self) -> &[f32] {
        match self {
            PixelStorage::Host(data) => data,
            PixelStorage::Engine(buf) => buf.as_slice(),
        }
    }

    pub fn as_ptr(&self) -> *const f32 {
        self.as_slice().as_ptr()
    }

    pub fn is_engine_owned(&self) -> bool {
        matches!(self, PixelStorage::Engine(_))
    }
}

/// One named image in engine representation: interleaved, `[0, 255]`.
#[derive(Debug)]
pub struct EngineImage<'e> {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Channel count.
    pub spectrum: u32,
    pub pixels: PixelStorage<'e>,
}

impl<'e> EngineImage<'e> {
    pub fn from_host(
        name: impl Into<String>,
        width: u32,
        height: u32,
        spectrum: u32,
        data: Vec<f32>,
    ) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            spectrum,
            pixels: PixelStorage::Host(data),
        }
    }

    pub fn samples(&self) -> &[f32] {
        self.pixels.as_slice()
    }

    /// Expected number of samples for the declared geometry.
    pub fn sample_count(&self) -> usize {
        self.width as usize * self.height as usize * self.spectrum as usize
    }

    /// Samples of pixel `(x, y)`; `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[f32]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let n = self.spectrum as usize;
        let idx = (y as usize * self.width as usize + x as usize) * n;
        self.samples().get(idx..idx + n)
    }

    /// Pixel `(x, y)` expanded to RGBA, still in engine units.
    ///
    /// One channel is gray, two are gray + alpha; missing color channels
    /// repeat red and a missing alpha is opaque. Extra channels are ignored.
    pub fn rgba(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        let p = self.pixel(x, y)?;
        Some(match *p {
            [] => [0.0, 0.0, 0.0, ENGINE_WHITE],
            [v] => [v, v, v, ENGINE_WHITE],
            [v, a] => [v, v, v, a],
            [r, g, b] => [r, g, b, ENGINE_WHITE],
            [r, g, b, a, ..] => [r, g, b, a],
        })
    }
}

/// Full-scale sample value in engine representation.
pub const ENGINE_WHITE: f32 = 255.0;

#[cfg(test)]
pub(crate) mod fake {
    //! Scripted engine used by the bridge tests.

    use super::*;
    use std::cell::{Cell, RefCell};

    pub(crate) enum Response {
        /// Hand the inputs back untouched.
        Echo,
        /// Replace everything with one freshly allocated image.
        Replace {
            width: u32,
            height: u32,
            spectrum: u32,
            data: Vec<f32>,
        },
        /// Report an error and allocate a result anyway.
        Fail(String),
        /// Succeed with no images at all.
        Empty,
    }

    pub(crate) struct FakeEngine {
        pub response: Response,
        pub commands: RefCell<Vec<String>>,
        pub inputs: RefCell<Vec<(String, u32, u32, u32)>>,
        pub released: Cell<usize>,
        live: RefCell<Vec<(usize, usize)>>,
    }

    impl FakeEngine {
        pub(crate) fn new(response: Response) -> Self {
            Self {
                response,
                commands: RefCell::new(Vec::new()),
                inputs: RefCell::new(Vec::new()),
                released: Cell::new(0),
                live: RefCell::new(Vec::new()),
            }
        }

        pub(crate) fn live_allocations(&self) -> usize {
            self.live.borrow().len()
        }

        pub(crate) fn allocate<'e>(&'e self, data: Vec<f32>) -> EngineBuffer<'e> {
            let len = data.len();
            let raw = Box::into_raw(data.into_boxed_slice()) as *mut f32;
            self.live.borrow_mut().push((raw as usize, len));
            let ptr = NonNull::new(raw).unwrap_or(NonNull::dangling());
            unsafe { EngineBuffer::new(self, ptr, len) }
        }
    }

    impl Engine for FakeEngine {
        fn run<'e>(
            &'e self,
            command: &str,
            images: Vec<EngineImage<'e>>,
            _options: &EngineOptions,
        ) -> EngineRun<'e> {
            self.commands.borrow_mut().push(command.to_owned());
            self.inputs.borrow_mut().extend(
                images
                    .iter()
                    .map(|img| (img.name.clone(), img.width, img.height, img.spectrum)),
            );
            match &self.response {
                Response::Echo => EngineRun::ok(images),
                Response::Replace {
                    width,
                    height,
                    spectrum,
                    data,
                } => {
                    let out = EngineImage {
                        name: "output".into(),
                        width: *width,
                        height: *height,
                        spectrum: *spectrum,
                        pixels: PixelStorage::Engine(self.allocate(data.clone())),
                    };
                    EngineRun::ok(vec![out])
                }
                Response::Fail(msg) => {
                    let junk = EngineImage {
                        name: "partial".into(),
                        width: 1,
                        height: 1,
                        spectrum: 1,
                        pixels: PixelStorage::Engine(self.allocate(vec![7.0])),
                    };
                    EngineRun::with_error_text(vec![junk], msg)
                }
                Response::Empty => EngineRun::ok(Vec::new()),
            }
        }

        unsafe fn release(&self, data: NonNull<f32>) {
            self.released.set(self.released.get() + 1);
            let mut live = self.live.borrow_mut();
            let addr = data.as_ptr() as usize;
            if let Some(pos) = live.iter().position(|(a, _)| *a == addr) {
                let (_, len) = live.swap_remove(pos);
                let slice = std::ptr::slice_from_raw_parts_mut(data.as_ptr(), len);
                drop(unsafe { Box::from_raw(slice) });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::{FakeEngine, Response};
    use super::*;

    #[test]
    fn default_options_match_bridge_requirements() {
        let opt = EngineOptions::default();
        assert!(opt.interleave_output);
        assert!(opt.no_inplace_processing);
        assert!(!opt.ignore_stdlib);
        assert_eq!(opt.custom_commands, None);
    }

    #[test]
    fn empty_error_text_is_success() {
        let run = EngineRun::with_error_text(Vec::new(), "");
        assert!(run.error.is_none());
        let run = EngineRun::with_error_text(Vec::new(), "boom");
        assert_eq!(run.error.as_deref(), Some("boom"));
    }

    #[test]
    fn engine_buffer_releases_once_on_drop() {
        let engine = FakeEngine::new(Response::Replace {
            width: 1,
            height: 1,
            spectrum: 3,
            data: vec![1.0, 2.0, 3.0],
        });
        {
            let run = engine.run("noop", Vec::new(), &EngineOptions::default());
            assert!(run.images[0].pixels.is_engine_owned());
            assert_eq!(run.images[0].samples(), &[1.0, 2.0, 3.0]);
            assert_eq!(engine.released.get(), 0);
        }
        assert_eq!(engine.released.get(), 1);
        assert_eq!(engine.live_allocations(), 0);
    }

    #[test]
    fn host_storage_never_reaches_release() {
        let engine = FakeEngine::new(Response::Echo);
        let img = EngineImage::from_host("input", 1, 1, 1, vec![4.0]);
        let run = engine.run("noop", vec![img], &EngineOptions::default());
        drop(run);
        assert_eq!(engine.released.get(), 0);
    }

    #[test]
    fn pixel_lookup_is_bounds_checked() {
        let img = EngineImage::from_host("input", 2, 1, 2, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(img.pixel(1, 0), Some(&[3.0, 4.0][..]));
        assert_eq!(img.pixel(2, 0), None);
        assert_eq!(img.pixel(0, 1), None);
    }

    #[test]
    fn rgba_promotes_gray_and_defaults_alpha() {
        let gray = EngineImage::from_host("g", 1, 1, 1, vec![51.0]);
        assert_eq!(gray.rgba(0, 0), Some([51.0, 51.0, 51.0, 255.0]));

        let gray_alpha = EngineImage::from_host("ga", 1, 1, 2, vec![51.0, 102.0]);
        assert_eq!(gray_alpha.rgba(0, 0), Some([51.0, 51.0, 51.0, 102.0]));

        let rgb = EngineImage::from_host("rgb", 1, 1, 3, vec![1.0, 2.0, 3.0]);
        assert_eq!(rgb.rgba(0, 0), Some([1.0, 2.0, 3.0, 255.0]));

        let wide = EngineImage::from_host("w", 1, 1, 5, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(wide.rgba(0, 0), Some([1.0, 2.0, 3.0, 4.0]));
    }
}
