//! Cross-platform clipboard access with change notification.
//!
//! This crate reads and writes the system clipboard in two formats, UTF-8
//! text and PNG encoded images, and reports when the clipboard changes.
//!
//! # Usage
//!
//! ```ignore
//! use clipkit_clipboard::{CancelHandle, Format};
//!
//! clipkit_clipboard::init()?;
//!
//! // Write, then learn when someone else overwrites it
//! if let Some(changed) = clipkit_clipboard::write(&Format::Text, b"text data") {
//!     changed.recv().await;
//!     println!("\"text data\" is no longer on the clipboard");
//! }
//!
//! // Or follow every change until the handle is dropped
//! use futures::StreamExt;
//! let (handle, token) = CancelHandle::new();
//! let mut changes = clipkit_clipboard::watch(token, Format::Text);
//! while let Some(data) = changes.next().await {
//!     println!("{}", String::from_utf8_lossy(&data));
//! }
//! ```
//!
//! No platform offers a portable push notification for clipboard changes.
//! Both notifications are driven by background detectors that sample the
//! clipboard every [`ClipboardConfig::poll_interval`] (one second by
//! default), so changes that revert within one interval go unnoticed.

#![warn(missing_docs)]

mod backend;
mod cancel;
mod clipboard;
mod detector;
mod error;
mod format;
mod guard;
/// Platform-specific implementations.
pub mod sys;

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

pub use backend::{Backend, MemoryBackend};
pub use cancel::{CancelHandle, CancelToken};
pub use clipboard::{Changed, Clipboard, ClipboardBuilder, ClipboardConfig, WatchStream};
pub use detector::Generation;
pub use error::{ClipboardError, ClipboardResult};
pub use format::{Format, FormatRegistry, IMAGE_TAG, TEXT_TAG};
pub use guard::Guard;
pub use sys::SystemBackend;

static DEBUG: AtomicBool = AtomicBool::new(false);

/// Log swallowed read, write and watch failures at error level.
///
/// Failures are recorded for [`last_error`] either way.
pub fn set_debug(enabled: bool) {
    DEBUG.store(enabled, Ordering::Relaxed);
}

/// Whether [`set_debug`] is on.
#[must_use]
pub fn debug_enabled() -> bool {
    DEBUG.load(Ordering::Relaxed)
}

/// The process-wide system clipboard.
#[must_use]
pub fn system() -> &'static Clipboard<SystemBackend> {
    static SYSTEM: OnceLock<Clipboard<SystemBackend>> = OnceLock::new();
    SYSTEM.get_or_init(|| Clipboard::new(SystemBackend::new()))
}

/// Check that the system clipboard can be used.
///
/// # Errors
/// Returns [`ClipboardError::Unavailable`] if the platform clipboard cannot
/// be reached, for example when no display server is running.
pub fn init() -> ClipboardResult<()> {
    system().init()
}

/// Read the system clipboard in `format`. See [`Clipboard::read`].
#[must_use]
pub fn read(format: &Format) -> Option<Vec<u8>> {
    system().read(format)
}

/// Write to the system clipboard in `format`. See [`Clipboard::write`].
pub fn write(format: &Format, data: &[u8]) -> Option<Changed> {
    system().write(format, data)
}

/// Watch the system clipboard. See [`Clipboard::watch`].
pub fn watch(cancel: CancelToken, format: Format) -> WatchStream {
    system().watch(cancel, format)
}

/// Allow a custom format on the system clipboard. See [`Clipboard::register`].
///
/// # Errors
/// Returns [`ClipboardError::Unsupported`] if the platform cannot carry it.
pub fn register(id: &str) -> ClipboardResult<Format> {
    system().register(id)
}

/// The most recent failure swallowed by the system clipboard.
#[must_use]
pub fn last_error() -> Option<ClipboardError> {
    system().last_error()
}
