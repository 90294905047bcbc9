//! Platform-specific clipboard backend implementations.

#[cfg(any(target_os = "windows", target_os = "linux", target_os = "macos"))]
/// Desktop platform backend.
pub mod desktop;
#[cfg(any(target_os = "windows", target_os = "linux", target_os = "macos"))]
pub use desktop::DesktopBackend as SystemBackend;

// Fallback for platforms without a backend
#[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
mod fallback {
    use crate::backend::Backend;
    use crate::{ClipboardError, ClipboardResult, Format};

    /// Placeholder for platforms without clipboard support.
    #[derive(Debug, Default)]
    pub struct UnsupportedBackend;

    impl UnsupportedBackend {
        /// Create the placeholder backend.
        #[must_use]
        pub const fn new() -> Self {
            Self
        }
    }

    fn unavailable() -> ClipboardError {
        ClipboardError::unavailable("no clipboard backend for this platform")
    }

    impl Backend for UnsupportedBackend {
        fn init(&self) -> ClipboardResult<()> {
            Err(unavailable())
        }

        fn read(&self, _format: &Format) -> ClipboardResult<Option<Vec<u8>>> {
            Err(unavailable())
        }

        fn write(&self, _format: &Format, _data: &[u8]) -> ClipboardResult<()> {
            Err(unavailable())
        }
    }
}

#[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
pub use fallback::UnsupportedBackend as SystemBackend;
