//! The native clipboard capability consumed by [`Clipboard`](crate::Clipboard).

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use crate::{ClipboardError, ClipboardResult, Format};

/// Raw access to a clipboard surface.
///
/// Implementations only translate between [`Format`] and the platform's
/// native representation. Locking, change detection and error reporting live
/// in [`Clipboard`](crate::Clipboard), which never calls a backend from two
/// threads at once.
pub trait Backend: Send + Sync + fmt::Debug + 'static {
    /// Check that the clipboard can be used at all.
    ///
    /// # Errors
    /// Returns [`ClipboardError::Unavailable`] if the platform clipboard
    /// cannot be reached.
    fn init(&self) -> ClipboardResult<()> {
        Ok(())
    }

    /// Read the clipboard in `format`.
    ///
    /// Returns `Ok(None)` when the clipboard holds nothing convertible to
    /// `format`.
    ///
    /// # Errors
    /// Returns an error if the platform read fails.
    fn read(&self, format: &Format) -> ClipboardResult<Option<Vec<u8>>>;

    /// Replace the clipboard content with `data` in `format`.
    ///
    /// # Errors
    /// Returns an error if the platform rejects the write.
    fn write(&self, format: &Format, data: &[u8]) -> ClipboardResult<()>;

    /// The platform's clipboard change counter, if it has one.
    ///
    /// Any change of the value, in either direction, means the clipboard was
    /// written. Backends without a counter return `None` and change detection
    /// falls back to comparing content.
    fn sequence(&self) -> Option<u64> {
        None
    }

    /// Prepare the backend to carry a custom format.
    ///
    /// # Errors
    /// Returns [`ClipboardError::Unsupported`] if the backend cannot carry it.
    fn register(&self, format: &Format) -> ClipboardResult<()> {
        Err(ClipboardError::unsupported(format!(
            "{format} is not supported by this clipboard"
        )))
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    content: Option<(String, Vec<u8>)>,
    sequence: u64,
    unavailable: Option<String>,
    rejected_writes: Option<String>,
    failing_reads: usize,
}

/// An in-process clipboard.
///
/// Holds at most one entry at a time, keyed by native tag, and bumps a change
/// counter on every write. Useful for tests and headless hosts.
#[derive(Debug)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    native_sequence: bool,
    latency: Duration,
    in_flight: AtomicUsize,
    overlaps: AtomicUsize,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Create an empty clipboard that exposes a change counter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::default(),
            native_sequence: true,
            latency: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            overlaps: AtomicUsize::new(0),
        }
    }

    /// Create an empty clipboard without a change counter, forcing content
    /// comparison for change detection.
    #[must_use]
    pub fn without_sequence() -> Self {
        Self {
            native_sequence: false,
            ..Self::new()
        }
    }

    /// Make every read and write take at least `latency`.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make the clipboard unreachable (`Some(reason)`) or reachable again.
    pub fn set_unavailable(&self, reason: Option<&str>) {
        self.lock().unavailable = reason.map(str::to_owned);
    }

    /// Make writes fail (`Some(reason)`) or succeed again.
    pub fn reject_writes(&self, reason: Option<&str>) {
        self.lock().rejected_writes = reason.map(str::to_owned);
    }

    /// Make the next `count` reads fail as unavailable.
    pub fn fail_reads(&self, count: usize) {
        self.lock().failing_reads = count;
    }

    /// Drop the current entry. Counts as a change.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.content = None;
        state.sequence = state.sequence.wrapping_add(1);
    }

    /// The native tag and bytes currently stored.
    #[must_use]
    pub fn contents(&self) -> Option<(String, Vec<u8>)> {
        self.lock().content.clone()
    }

    /// How many times a call entered while another was still running.
    #[must_use]
    pub fn overlapping_calls(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enter<T>(&self, f: impl FnOnce() -> T) -> T {
        if self.in_flight.fetch_add(1, Ordering::SeqCst) != 0 {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        let result = f();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn check_available(state: &MemoryState) -> ClipboardResult<()> {
        match &state.unavailable {
            Some(reason) => Err(ClipboardError::unavailable(reason.clone())),
            None => Ok(()),
        }
    }
}

impl Backend for MemoryBackend {
    fn init(&self) -> ClipboardResult<()> {
        Self::check_available(&self.lock())
    }

    fn read(&self, format: &Format) -> ClipboardResult<Option<Vec<u8>>> {
        self.enter(|| {
            let mut state = self.lock();
            Self::check_available(&state)?;
            if state.failing_reads > 0 {
                state.failing_reads -= 1;
                return Err(ClipboardError::unavailable("read failed"));
            }
            Ok(state
                .content
                .as_ref()
                .filter(|(tag, _)| tag == format.native_tag())
                .map(|(_, data)| data.clone()))
        })
    }

    fn write(&self, format: &Format, data: &[u8]) -> ClipboardResult<()> {
        self.enter(|| {
            let mut state = self.lock();
            Self::check_available(&state)?;
            if let Some(reason) = &state.rejected_writes {
                return Err(ClipboardError::invalid_operation(reason.clone()));
            }
            state.content = Some((format.native_tag().to_owned(), data.to_vec()));
            state.sequence = state.sequence.wrapping_add(1);
            Ok(())
        })
    }

    fn sequence(&self) -> Option<u64> {
        self.native_sequence.then(|| self.lock().sequence)
    }

    fn register(&self, _format: &Format) -> ClipboardResult<()> {
        Ok(())
    }
}
