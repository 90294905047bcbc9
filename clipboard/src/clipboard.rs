//! The clipboard entry point.

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;

use async_channel::Receiver;
use futures::{Stream, stream};
use log::{debug, error};

use crate::backend::Backend;
use crate::cancel::CancelToken;
use crate::detector::{self, Baseline, Generation, Sample, Source, WatchState};
use crate::format::FormatRegistry;
use crate::guard::Guard;
use crate::{ClipboardError, ClipboardResult, Format};

/// A boxed stream of clipboard snapshots produced by [`Clipboard::watch`].
pub type WatchStream = Pin<Box<dyn Stream<Item = Vec<u8>> + Send>>;

/// Tuning for change detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardConfig {
    /// How often detectors sample the clipboard.
    pub poll_interval: Duration,
    /// How many snapshots a watch stream buffers before the watcher waits
    /// for the consumer.
    pub watch_buffer: usize,
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            watch_buffer: 1,
        }
    }
}

impl ClipboardConfig {
    /// Set the sampling interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set the watch stream buffer. Values below one are raised to one.
    #[must_use]
    pub fn with_watch_buffer(mut self, watch_buffer: usize) -> Self {
        self.watch_buffer = watch_buffer.max(1);
        self
    }
}

/// Signal that a value written by [`Clipboard::write`] is no longer on the
/// clipboard.
///
/// Yields exactly one `()` once the clipboard is overwritten, by this process
/// or any other, and is closed afterwards. The background detector keeps
/// sampling until that happens; dropping the `Changed` stops it at its next
/// tick.
#[derive(Debug)]
pub struct Changed {
    receiver: Receiver<()>,
}

impl Changed {
    /// Wait for the overwrite. Returns `None` once the signal has already
    /// been taken.
    pub async fn recv(&self) -> Option<()> {
        self.receiver.recv().await.ok()
    }

    /// Wait for the overwrite (blocking).
    ///
    /// Use this in non-async contexts.
    pub fn recv_blocking(&self) -> Option<()> {
        self.receiver.recv_blocking().ok()
    }

    /// Take the signal if it has fired, without waiting.
    #[must_use]
    pub fn try_recv(&self) -> Option<()> {
        self.receiver.try_recv().ok()
    }

    /// Whether the detector has finished. The signal may still be pending
    /// in the channel.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.receiver.is_closed()
    }
}

#[derive(Debug)]
struct Inner<B> {
    backend: Arc<B>,
    guard: Arc<Guard>,
    registry: FormatRegistry,
    config: ClipboardConfig,
    ready: OnceLock<ClipboardResult<()>>,
    last_error: Mutex<Option<ClipboardError>>,
    writes: AtomicU64,
}

impl<B: Backend> Inner<B> {
    fn report(&self, operation: &str, err: &ClipboardError) {
        if crate::debug_enabled() {
            error!("{operation} clipboard err: {err}");
        }
        *self
            .last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(err.clone());
    }
}

impl<B: Backend> Source for Inner<B> {
    fn sample(&self, format: &Format, baseline: Option<&Generation>, reread: bool) -> Sample {
        self.guard
            .run(|| detector::sample(&*self.backend, format, baseline, reread))
            .unwrap_or_else(|err| {
                self.report("sample", &err);
                Sample::Unknown
            })
    }

    fn probe(&self, format: &Format) -> ClipboardResult<Option<Generation>> {
        self.guard
            .run(|| detector::generation(&*self.backend, format))
            .inspect_err(|err| self.report("probe", err))
    }

    fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }
}

/// Builder for [`Clipboard`].
#[derive(Debug)]
pub struct ClipboardBuilder<B> {
    backend: Arc<B>,
    guard: Option<Arc<Guard>>,
    config: ClipboardConfig,
}

impl<B: Backend> ClipboardBuilder<B> {
    /// Serialize backend calls with `guard` instead of [`Guard::global`].
    #[must_use]
    pub fn guard(mut self, guard: Arc<Guard>) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: ClipboardConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the detector sampling interval.
    #[must_use]
    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.config.poll_interval = poll_interval;
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> Clipboard<B> {
        Clipboard {
            inner: Arc::new(Inner {
                backend: self.backend,
                guard: self.guard.unwrap_or_else(Guard::global),
                registry: FormatRegistry::new(),
                config: self.config,
                ready: OnceLock::new(),
                last_error: Mutex::new(None),
                writes: AtomicU64::new(0),
            }),
        }
    }
}

/// Clipboard access with change notification.
///
/// Reads and writes go through a [`Guard`] so at most one backend call runs
/// at a time. Failures never reach the caller of [`read`](Self::read),
/// [`write`](Self::write) or [`watch`](Self::watch): they degrade to "no
/// data", and the detail is kept in [`last_error`](Self::last_error) and
/// logged when [`set_debug`](crate::set_debug) is on. The `try_*` variants
/// return the error instead.
///
/// Cloning is cheap; clones share the backend, registry and error slot.
#[derive(Debug)]
pub struct Clipboard<B> {
    inner: Arc<Inner<B>>,
}

impl<B> Clone for Clipboard<B> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<B: Backend> Clipboard<B> {
    /// Create a clipboard over `backend` with the process-wide guard and
    /// default configuration.
    pub fn new(backend: B) -> Self {
        Self::builder(backend).build()
    }

    /// Start building a clipboard over `backend`.
    pub fn builder(backend: B) -> ClipboardBuilder<B> {
        Self::builder_shared(Arc::new(backend))
    }

    /// Start building a clipboard over a backend that is also used elsewhere.
    #[must_use]
    pub fn builder_shared(backend: Arc<B>) -> ClipboardBuilder<B> {
        ClipboardBuilder {
            backend,
            guard: None,
            config: ClipboardConfig::default(),
        }
    }

    /// Create a clipboard that serializes its calls with `guard`.
    pub fn with_guard(backend: B, guard: Arc<Guard>) -> Self {
        Self::builder(backend).guard(guard).build()
    }

    /// The backend this clipboard drives.
    #[must_use]
    pub fn backend(&self) -> &Arc<B> {
        &self.inner.backend
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &ClipboardConfig {
        &self.inner.config
    }

    /// Check that the clipboard can be used.
    ///
    /// The check runs once; later calls return the cached outcome. Other
    /// operations run it implicitly.
    ///
    /// # Errors
    /// Returns [`ClipboardError::Unavailable`] if the platform clipboard
    /// cannot be reached.
    pub fn init(&self) -> ClipboardResult<()> {
        self.inner
            .ready
            .get_or_init(|| {
                let result = self.inner.guard.run(|| self.inner.backend.init());
                match &result {
                    Ok(()) => debug!("clipboard ready"),
                    Err(err) => debug!("clipboard not ready: {err}"),
                }
                result
            })
            .clone()
    }

    /// The most recent failure swallowed by this clipboard.
    #[must_use]
    pub fn last_error(&self) -> Option<ClipboardError> {
        self.inner
            .last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Take and clear the most recent swallowed failure.
    pub fn take_last_error(&self) -> Option<ClipboardError> {
        self.inner
            .last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Allow `id` to be used as [`Format::Custom`].
    ///
    /// # Errors
    /// Returns [`ClipboardError::Unsupported`] if the id is invalid or the
    /// backend cannot carry it, or the [`init`](Self::init) error.
    pub fn register(&self, id: &str) -> ClipboardResult<Format> {
        FormatRegistry::validate(id)?;
        self.init()?;
        let format = Format::custom(id);
        self.inner
            .guard
            .run(|| self.inner.backend.register(&format))?;
        if self.inner.registry.insert(id)? {
            debug!("registered clipboard format {id}");
        }
        Ok(format)
    }

    /// Read the clipboard in `format`.
    ///
    /// Returns `None` if the clipboard holds nothing in `format` or the read
    /// failed. An empty value that is present is returned as an empty `Vec`.
    #[must_use]
    pub fn read(&self, format: &Format) -> Option<Vec<u8>> {
        self.try_read(format).unwrap_or_else(|err| {
            self.inner.report("read", &err);
            None
        })
    }

    /// Read the clipboard in `format`, reporting failures.
    ///
    /// # Errors
    /// Returns the [`init`](Self::init) error, [`ClipboardError::Unsupported`]
    /// for an unregistered custom format, or the backend's read error.
    pub fn try_read(&self, format: &Format) -> ClipboardResult<Option<Vec<u8>>> {
        self.init()?;
        self.inner.registry.check(format)?;
        self.inner.guard.run(|| self.inner.backend.read(format))
    }

    /// Read the clipboard as UTF-8 text.
    #[must_use]
    pub fn read_text(&self) -> Option<String> {
        let bytes = self.read(&Format::Text)?;
        String::from_utf8(bytes)
            .map_err(|err| {
                self.inner
                    .report("read", &ClipboardError::invalid_operation(err.to_string()));
            })
            .ok()
    }

    /// Write `data` to the clipboard in `format`.
    ///
    /// Image data must be PNG encoded. Returns `None` if the write failed;
    /// otherwise a fresh [`Changed`] that fires once the written value is
    /// overwritten. A later write through this clipboard, or any clone of
    /// it, always counts as an overwrite, even with identical data.
    pub fn write(&self, format: &Format, data: &[u8]) -> Option<Changed> {
        self.try_write(format, data)
            .map_err(|err| self.inner.report("write", &err))
            .ok()
    }

    /// Write `data` to the clipboard in `format`, reporting failures.
    ///
    /// # Errors
    /// Returns the [`init`](Self::init) error, [`ClipboardError::Unsupported`]
    /// for an unregistered custom format, the backend's write error, or
    /// [`ClipboardError::Unavailable`] if the change detector could not be
    /// started.
    pub fn try_write(&self, format: &Format, data: &[u8]) -> ClipboardResult<Changed> {
        self.init()?;
        self.inner.registry.check(format)?;

        // The baseline is taken before the guard is released so no other
        // write from this process can slip in between.
        let (written, baseline) = self.inner.guard.run(|| -> ClipboardResult<_> {
            self.inner.backend.write(format, data)?;
            let written = self.inner.writes.fetch_add(1, Ordering::SeqCst).wrapping_add(1);
            Ok((written, detector::generation(&*self.inner.backend, format)))
        })?;
        if let Err(err) = &baseline {
            self.inner.report("probe", err);
        }

        let (sender, receiver) = async_channel::bounded(1);
        detector::spawn_detached(
            "clipboard-notify",
            detector::notify_on_change(
                self.inner.clone(),
                format.clone(),
                written,
                Baseline::from(baseline),
                self.inner.config.poll_interval,
                sender,
            ),
        )
        .map_err(|err| {
            ClipboardError::unavailable(format!("cannot start change detector: {err}"))
        })?;
        Ok(Changed { receiver })
    }

    /// Write UTF-8 text to the clipboard.
    pub fn write_text(&self, text: &str) -> Option<Changed> {
        self.write(&Format::Text, text.as_bytes())
    }

    /// Watch the clipboard for new values in `format`.
    ///
    /// The stream yields the clipboard content each time it changes to
    /// something readable in `format`, and ends once `cancel` fires, at most
    /// one poll interval later. Failing to start yields an already finished
    /// stream.
    pub fn watch(&self, cancel: CancelToken, format: Format) -> WatchStream {
        self.try_watch(cancel, format).unwrap_or_else(|err| {
            self.inner.report("watch", &err);
            Box::pin(stream::empty())
        })
    }

    /// Watch the clipboard for new values in `format`, reporting failures to
    /// start.
    ///
    /// # Errors
    /// Returns the [`init`](Self::init) error, [`ClipboardError::Unsupported`]
    /// for an unregistered custom format, or [`ClipboardError::Unavailable`]
    /// if the watcher could not be started.
    pub fn try_watch(&self, cancel: CancelToken, format: Format) -> ClipboardResult<WatchStream> {
        self.init()?;
        self.inner.registry.check(&format)?;

        let baseline = Baseline::from(self.inner.probe(&format));
        let (sender, receiver) = async_channel::bounded(self.inner.config.watch_buffer.max(1));
        detector::spawn_detached(
            "clipboard-watch",
            detector::watch_changes(
                self.inner.clone(),
                format,
                WatchState::new(baseline),
                self.inner.config.poll_interval,
                sender,
                cancel,
            ),
        )
        .map_err(|err| ClipboardError::unavailable(format!("cannot start watcher: {err}")))?;
        Ok(Box::pin(receiver))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    fn clipboard() -> Clipboard<MemoryBackend> {
        Clipboard::builder(MemoryBackend::new())
            .guard(Arc::new(Guard::new()))
            .poll_interval(Duration::from_millis(10))
            .build()
    }

    #[test]
    fn config_defaults_to_one_second() {
        let config = ClipboardConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.watch_buffer, 1);
        assert_eq!(config.with_watch_buffer(0).watch_buffer, 1);
    }

    #[test]
    fn init_result_is_cached() {
        let clipboard = clipboard();
        clipboard.backend().set_unavailable(Some("no display"));
        assert!(matches!(
            clipboard.init(),
            Err(ClipboardError::Unavailable(_))
        ));

        clipboard.backend().set_unavailable(None);
        assert!(clipboard.init().is_err());
        assert_eq!(clipboard.read(&Format::Text), None);
    }

    #[test]
    fn write_then_read_text() {
        let clipboard = clipboard();
        assert!(clipboard.write_text("hello").is_some());
        assert_eq!(clipboard.read_text().as_deref(), Some("hello"));
        assert_eq!(clipboard.last_error(), None);
    }

    #[test]
    fn invalid_utf8_is_reported() {
        let clipboard = clipboard();
        clipboard.write(&Format::Text, &[0xff, 0xfe]).unwrap();
        assert_eq!(clipboard.read_text(), None);
        assert!(matches!(
            clipboard.take_last_error(),
            Some(ClipboardError::InvalidOperation(_))
        ));
        assert_eq!(clipboard.last_error(), None);
    }

    #[test]
    fn clones_share_state() {
        let clipboard = clipboard();
        let other = clipboard.clone();
        other.register("application/x-demo").unwrap();
        assert!(
            clipboard
                .write(&Format::custom("application/x-demo"), b"x")
                .is_some()
        );
    }
}
