//! [`Engine`] backed by the G'MIC C interface (`gmic_libc`), loaded at
//! runtime.

use libloading::Library;
use std::ffi::{CStr, CString, c_void};
use std::os::raw::{c_char, c_int, c_uint};
use std::path::Path;
use std::ptr::{self, NonNull};

use crate::engine::{Engine, EngineBuffer, EngineImage, EngineOptions, EngineRun, PixelStorage};
use crate::error::{RunnerError, RunnerResult};

const NAME_LEN: usize = 255;
const ERROR_BUFFER_LEN: usize = 4096;
/// Slots handed to `gmic_call`; it writes every output image back into the
/// caller's array.
const IMAGE_SLOTS: usize = 64;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SampleFormat {
    Float = 0,
}

#[repr(C)]
struct InterfaceImage {
    name: [c_char; NAME_LEN],
    data: *mut c_void,
    width: c_uint,
    height: c_uint,
    depth: c_uint,
    spectrum: c_uint,
    is_interleaved: bool,
    format: SampleFormat,
}

impl InterfaceImage {
    fn zeroed() -> Self {
        Self {
            name: [0; NAME_LEN],
            data: ptr::null_mut(),
            width: 0,
            height: 0,
            depth: 0,
            spectrum: 0,
            is_interleaved: false,
            format: SampleFormat::Float,
        }
    }

    fn set_name(&mut self, name: &str) {
        for (dst, src) in self.name.iter_mut().zip(name.bytes().take(NAME_LEN - 1)) {
            *dst = src as c_char;
        }
    }

    fn name(&self) -> String {
        let bytes: Vec<u8> = self
            .name
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8)
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    fn sample_count(&self) -> usize {
        self.width as usize
            * self.height as usize
            * self.depth.max(1) as usize
            * self.spectrum as usize
    }
}

#[repr(C)]
struct InterfaceOptions {
    custom_commands: *const c_char,
    ignore_stdlib: bool,
    p_is_abort: *mut bool,
    p_progress: *mut f32,
    interleave_output: bool,
    no_inplace_processing: bool,
    output_format: SampleFormat,
    error_message_buffer: *mut c_char,
}

pub type GmicCallFn = unsafe extern "C" fn(
    cmd: *const c_char,
    nof_images: *mut c_uint,
    images: *mut c_void,
    options: *mut c_void,
) -> c_int;

pub type GmicDeleteExternalFn = unsafe extern "C" fn(p: *mut f32);

pub type GmicVersionFn = unsafe extern "C" fn() -> *const c_char;

/// Platform file name of a shared library called `name`.
pub fn platform_library_name(name: &str) -> String {
    if cfg!(target_os = "windows") {
        format!("{name}.dll")
    } else if cfg!(target_os = "macos") {
        format!("lib{name}.dylib")
    } else {
        format!("lib{name}.so")
    }
}

/// The G'MIC shared library and its entry points.
pub struct GmicLibrary {
    _lib: Library,
    call: GmicCallFn,
    delete_external: GmicDeleteExternalFn,
    version: Option<GmicVersionFn>,
}

impl GmicLibrary {
    /// Loads `name` (e.g. `gmic`) from `dir`.
    pub fn load(dir: &Path, name: &str) -> RunnerResult<Self> {
        let path = dir.join(platform_library_name(name));
        if !path.exists() {
            return Err(RunnerError::LibraryNotFound(path));
        }
        Self::open(&path)
    }

    /// Loads the library at `path`.
    pub fn open(path: &Path) -> RunnerResult<Self> {
        let lib = unsafe { Library::new(path)? };

        let (call, delete_external, version) = unsafe {
            let call: libloading::Symbol<GmicCallFn> = lib.get(b"gmic_call\0")?;
            let delete: libloading::Symbol<GmicDeleteExternalFn> =
                lib.get(b"gmic_delete_external\0")?;
            let version = lib
                .get::<GmicVersionFn>(b"gmic_version_string\0")
                .ok()
                .map(|symbol| *symbol);
            (*call, *delete, version)
        };

        tracing::debug!(path = %path.display(), "loaded G'MIC library");
        Ok(Self {
            _lib: lib,
            call,
            delete_external,
            version,
        })
    }

    /// Version string, when the library exports one.
    pub fn version(&self) -> Option<String> {
        let f = self.version?;
        let raw = unsafe { f() };
        if raw.is_null() {
            return None;
        }
        Some(unsafe { CStr::from_ptr(raw) }.to_string_lossy().into_owned())
    }
}

impl Engine for GmicLibrary {
    fn run<'e>(
        &'e self,
        command: &str,
        images: Vec<EngineImage<'e>>,
        options: &EngineOptions,
    ) -> EngineRun<'e> {
        let cmd = match CString::new(command) {
            Ok(c) => c,
            Err(_) => return EngineRun::with_error_text(images, "command contains a NUL byte"),
        };
        let custom = match options.custom_commands.as_deref().map(CString::new).transpose() {
            Ok(c) => c,
            Err(_) => {
                return EngineRun::with_error_text(images, "custom commands contain a NUL byte");
            }
        };
        if images.len() > IMAGE_SLOTS {
            return EngineRun::with_error_text(images, "too many input images");
        }

        let mut slots: Vec<InterfaceImage> =
            (0..IMAGE_SLOTS).map(|_| InterfaceImage::zeroed()).collect();
        let mut inputs: Vec<Option<PixelStorage<'e>>> = Vec::with_capacity(images.len());
        for (slot, mut img) in slots.iter_mut().zip(images) {
            slot.set_name(&img.name);
            slot.data = match &mut img.pixels {
                PixelStorage::Host(data) => data.as_mut_ptr() as *mut c_void,
                // Read-only for the engine: in-place processing is disabled.
                PixelStorage::Engine(buf) => buf.as_ptr() as *mut c_void,
            };
            slot.width = img.width;
            slot.height = img.height;
            slot.depth = 1;
            slot.spectrum = img.spectrum;
            slot.is_interleaved = true;
            slot.format = SampleFormat::Float;
            inputs.push(Some(img.pixels));
        }

        let mut error_buffer = vec![0 as c_char; ERROR_BUFFER_LEN];
        let mut opt = InterfaceOptions {
            custom_commands: custom.as_ref().map_or(ptr::null(), |c| c.as_ptr()),
            ignore_stdlib: options.ignore_stdlib,
            p_is_abort: ptr::null_mut(),
            p_progress: ptr::null_mut(),
            interleave_output: options.interleave_output,
            no_inplace_processing: options.no_inplace_processing,
            output_format: SampleFormat::Float,
            error_message_buffer: error_buffer.as_mut_ptr(),
        };

        let mut count = inputs.len() as c_uint;
        let status = unsafe {
            (self.call)(
                cmd.as_ptr(),
                &mut count,
                slots.as_mut_ptr() as *mut c_void,
                &mut opt as *mut InterfaceOptions as *mut c_void,
            )
        };

        let returned = &slots[..(count as usize).min(IMAGE_SLOTS)];
        let outputs = collect_outputs(self, returned, &mut inputs);

        let mut error = unsafe { CStr::from_ptr(error_buffer.as_ptr()) }
            .to_string_lossy()
            .into_owned();
        if error.is_empty() && status != 0 {
            error = format!("gmic_call returned {status}");
        }
        EngineRun::with_error_text(outputs, &error)
    }

    unsafe fn release(&self, data: NonNull<f32>) {
        unsafe { (self.delete_external)(data.as_ptr()) }
    }
}

/// Turns the slots filled by `gmic_call` into images.
///
/// A slot pointing at one of `inputs` takes that storage back. Any other
/// pointer was allocated by the engine and is released through it. A second
/// slot aliasing an input that was already taken is dropped: its memory
/// belongs to the Rust allocator and must never reach the engine.
fn collect_outputs<'e>(
    engine: &'e dyn Engine,
    slots: &[InterfaceImage],
    inputs: &mut [Option<PixelStorage<'e>>],
) -> Vec<EngineImage<'e>> {
    let input_ptrs: Vec<*const f32> = inputs
        .iter()
        .map(|input| input.as_ref().map_or(ptr::null(), |p| p.as_ptr()))
        .collect();

    let mut outputs = Vec::with_capacity(slots.len());
    for slot in slots {
        let Some(data) = NonNull::new(slot.data as *mut f32) else {
            continue;
        };
        let is_input = |p: &*const f32| ptr::eq(*p, data.as_ptr());
        let pixels = if input_ptrs.iter().any(is_input) {
            let untaken = input_ptrs
                .iter()
                .zip(inputs.iter_mut())
                .find(|(p, input)| is_input(*p) && input.is_some())
                .and_then(|(_, input)| input.take());
            match untaken {
                Some(storage) => storage,
                None => {
                    tracing::warn!(name = %slot.name(), "dropping output that repeats an input buffer");
                    continue;
                }
            }
        } else {
            // SAFETY: not one of our inputs, so gmic_call allocated it.
            PixelStorage::Engine(unsafe { EngineBuffer::new(engine, data, slot.sample_count()) })
        };
        outputs.push(EngineImage {
            name: slot.name(),
            width: slot.width,
            height: slot.height,
            spectrum: slot.spectrum,
            pixels,
        });
    }
    outputs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fake::{FakeEngine, Response};

    fn slot(data: *const f32, width: u32, height: u32, spectrum: u32) -> InterfaceImage {
        let mut img = InterfaceImage::zeroed();
        img.set_name("out");
        img.data = data as *mut c_void;
        img.width = width;
        img.height = height;
        img.depth = 1;
        img.spectrum = spectrum;
        img
    }

    fn host_inputs<'e>(data: Vec<f32>) -> Vec<Option<PixelStorage<'e>>> {
        vec![Some(PixelStorage::Host(data))]
    }

    #[test]
    fn slot_on_input_pointer_takes_host_storage_back() {
        let engine = FakeEngine::new(Response::Echo);
        let mut inputs = host_inputs(vec![1.0, 2.0]);
        let data = inputs[0].as_ref().unwrap().as_ptr();

        let outputs = collect_outputs(&engine, &[slot(data, 2, 1, 1)], &mut inputs);
        assert_eq!(outputs.len(), 1);
        assert!(!outputs[0].pixels.is_engine_owned());
        assert_eq!(outputs[0].samples(), &[1.0, 2.0]);
        assert!(inputs[0].is_none());

        drop(outputs);
        assert_eq!(engine.released.get(), 0);
    }

    #[test]
    fn foreign_pointer_is_adopted_and_released_by_the_engine() {
        let engine = FakeEngine::new(Response::Echo);
        let buf = engine.allocate(vec![5.0; 3]);
        let data = buf.as_ptr();
        std::mem::forget(buf);
        let mut inputs = host_inputs(vec![1.0]);

        let outputs = collect_outputs(&engine, &[slot(data, 1, 1, 3)], &mut inputs);
        assert!(outputs[0].pixels.is_engine_owned());
        assert_eq!(outputs[0].samples(), &[5.0, 5.0, 5.0]);
        assert!(inputs[0].is_some());

        drop(outputs);
        assert_eq!(engine.released.get(), 1);
        assert_eq!(engine.live_allocations(), 0);
    }

    #[test]
    fn repeated_input_pointer_is_never_handed_to_the_engine() {
        let engine = FakeEngine::new(Response::Echo);
        let mut inputs = host_inputs(vec![3.0]);
        let data = inputs[0].as_ref().unwrap().as_ptr();

        let slots = [slot(data, 1, 1, 1), slot(data, 1, 1, 1)];
        let outputs = collect_outputs(&engine, &slots, &mut inputs);
        assert_eq!(outputs.len(), 1);
        assert!(!outputs[0].pixels.is_engine_owned());

        drop(outputs);
        assert_eq!(engine.released.get(), 0);
    }

    #[test]
    fn empty_slots_are_skipped() {
        let engine = FakeEngine::new(Response::Echo);
        let mut inputs = host_inputs(vec![3.0]);
        let outputs = collect_outputs(&engine, &[InterfaceImage::zeroed()], &mut inputs);
        assert!(outputs.is_empty());
        assert!(inputs[0].is_some());
    }

    #[test]
    fn library_name_follows_platform_convention() {
        let name = platform_library_name("gmic");
        if cfg!(target_os = "windows") {
            assert_eq!(name, "gmic.dll");
        } else if cfg!(target_os = "macos") {
            assert_eq!(name, "libgmic.dylib");
        } else {
            assert_eq!(name, "libgmic.so");
        }
    }

    #[test]
    fn missing_library_is_reported_with_path() {
        let dir = Path::new("/nonexistent/gmic_runner");
        match GmicLibrary::load(dir, "gmic") {
            Err(RunnerError::LibraryNotFound(path)) => assert!(path.starts_with(dir)),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("library should not load"),
        }
    }

    #[test]
    fn image_names_are_truncated_and_terminated() {
        let mut img = InterfaceImage::zeroed();
        img.set_name(&"x".repeat(400));
        assert_eq!(img.name().len(), NAME_LEN - 1);
        assert_eq!(img.name[NAME_LEN - 1], 0);
    }

    #[test]
    fn depth_zero_counts_as_one_plane() {
        let mut img = InterfaceImage::zeroed();
        img.width = 3;
        img.height = 2;
        img.spectrum = 4;
        assert_eq!(img.sample_count(), 24);
    }
}
