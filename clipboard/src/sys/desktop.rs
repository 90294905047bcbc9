//! Desktop clipboard backend (Windows, Linux, macOS) built on arboard.
//!
//! Images cross the native surface as RGBA and are exchanged with callers as
//! PNG. Windows and macOS expose a native change counter; on Linux change
//! detection compares content.

use std::borrow::Cow;
use std::fmt;
use std::io::Cursor;
#[cfg(target_os = "linux")]
use std::sync::{Mutex, PoisonError};

use arboard::{Clipboard, ImageData};
use image::{ImageFormat, RgbaImage};

use crate::backend::Backend;
use crate::{ClipboardError, ClipboardResult, Format};

/// The system clipboard on desktop platforms.
#[derive(Default)]
pub struct DesktopBackend {
    // X11 only serves a selection while its owner is alive, so the
    // connection is kept for the lifetime of the backend.
    #[cfg(target_os = "linux")]
    owner: Mutex<Option<Clipboard>>,
}

impl fmt::Debug for DesktopBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DesktopBackend").finish_non_exhaustive()
    }
}

impl DesktopBackend {
    /// Create a backend. No connection is made until first use.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(target_os = "linux")]
    fn with_clipboard<T>(
        &self,
        f: impl FnOnce(&mut Clipboard) -> Result<T, arboard::Error>,
    ) -> Result<T, arboard::Error> {
        let mut owner = self.owner.lock().unwrap_or_else(PoisonError::into_inner);
        let clipboard = match owner.take() {
            Some(clipboard) => clipboard,
            None => Clipboard::new()?,
        };
        f(owner.insert(clipboard))
    }

    #[cfg(not(target_os = "linux"))]
    #[allow(clippy::unused_self)]
    fn with_clipboard<T>(
        &self,
        f: impl FnOnce(&mut Clipboard) -> Result<T, arboard::Error>,
    ) -> Result<T, arboard::Error> {
        let mut clipboard = Clipboard::new()?;
        f(&mut clipboard)
    }
}

impl Backend for DesktopBackend {
    fn init(&self) -> ClipboardResult<()> {
        self.with_clipboard(|_| Ok(())).map_err(map_error)
    }

    fn read(&self, format: &Format) -> ClipboardResult<Option<Vec<u8>>> {
        match format {
            Format::Text => {
                let text = absent_as_none(self.with_clipboard(Clipboard::get_text))?;
                Ok(text.map(String::into_bytes))
            }
            Format::Image => absent_as_none(self.with_clipboard(Clipboard::get_image))?
                .map(encode_png)
                .transpose(),
            Format::Custom(_) => Err(unsupported(format)),
        }
    }

    fn write(&self, format: &Format, data: &[u8]) -> ClipboardResult<()> {
        match format {
            Format::Text => {
                let text = std::str::from_utf8(data).map_err(|e| {
                    ClipboardError::invalid_operation(format!("text is not UTF-8: {e}"))
                })?;
                self.with_clipboard(|clipboard| clipboard.set_text(text))
                    .map_err(map_error)
            }
            Format::Image if data.is_empty() => {
                self.with_clipboard(Clipboard::clear).map_err(map_error)
            }
            Format::Image => {
                let image = decode_png(data)?;
                self.with_clipboard(|clipboard| clipboard.set_image(image))
                    .map_err(map_error)
            }
            Format::Custom(_) => Err(unsupported(format)),
        }
    }

    #[cfg(target_os = "windows")]
    fn sequence(&self) -> Option<u64> {
        // SAFETY: takes no arguments and only reads window station state.
        let sequence = unsafe { windows::Win32::System::DataExchange::GetClipboardSequenceNumber() };
        // Zero means the window station is not accessible.
        (sequence != 0).then_some(u64::from(sequence))
    }

    #[cfg(target_os = "macos")]
    #[allow(unused_unsafe, clippy::cast_sign_loss)]
    fn sequence(&self) -> Option<u64> {
        use objc2_app_kit::NSPasteboard;

        let count = unsafe { NSPasteboard::generalPasteboard().changeCount() };
        Some(count as u64)
    }
}

fn unsupported(format: &Format) -> ClipboardError {
    ClipboardError::unsupported(format!("{format} is not supported on this platform"))
}

fn absent_as_none<T>(result: Result<T, arboard::Error>) -> ClipboardResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(arboard::Error::ContentNotAvailable) => Ok(None),
        Err(err) => Err(map_error(err)),
    }
}

fn map_error(err: arboard::Error) -> ClipboardError {
    match err {
        arboard::Error::ClipboardOccupied | arboard::Error::ConversionFailure => {
            ClipboardError::invalid_operation(err.to_string())
        }
        _ => ClipboardError::unavailable(err.to_string()),
    }
}

fn decode_png(data: &[u8]) -> ClipboardResult<ImageData<'static>> {
    let image = image::load_from_memory_with_format(data, ImageFormat::Png)
        .map_err(|e| ClipboardError::invalid_operation(format!("input is not PNG encoded: {e}")))?
        .into_rgba8();
    let (width, height) = image.dimensions();
    Ok(ImageData {
        width: width as usize,
        height: height as usize,
        bytes: Cow::Owned(image.into_raw()),
    })
}

fn encode_png(image: ImageData<'_>) -> ClipboardResult<Vec<u8>> {
    let too_large = |_| ClipboardError::invalid_operation("clipboard image is too large");
    let width = u32::try_from(image.width).map_err(too_large)?;
    let height = u32::try_from(image.height).map_err(too_large)?;
    let buffer = RgbaImage::from_raw(width, height, image.bytes.into_owned()).ok_or_else(|| {
        ClipboardError::invalid_operation("clipboard image does not match its dimensions")
    })?;

    let mut png = Vec::new();
    buffer
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| ClipboardError::invalid_operation(format!("PNG encoding failed: {e}")))?;
    Ok(png)
}
