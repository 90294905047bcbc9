//! Clipboard change detection.
//!
//! No platform offers a portable push notification for clipboard changes, so
//! detectors sample a *generation* on a fixed interval and compare it with a
//! baseline. The generation is the platform change counter when the backend
//! has one, otherwise the content of the watched format itself.
//!
//! Write notifications also count the writes made through the same
//! [`Clipboard`](crate::Clipboard), and treat the watched format vanishing
//! from the clipboard as an overwrite.
//!
//! Sampling misses a change that reverts before the next tick, and the
//! content fallback cannot see an external change that leaves the same bytes
//! behind (copy A, copy B, copy A within one interval).

use std::future::Future;
use std::io;
use std::pin::pin;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use async_channel::Sender;
use futures::future::{Either, select};
use futures_timer::Delay;
use log::{debug, trace};

use crate::backend::Backend;
use crate::cancel::CancelToken;
use crate::{ClipboardResult, Format};

/// Opaque clipboard version. Two equal generations mean no write happened in
/// between; any write produces a different one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    /// Platform change counter.
    Sequence(u64),
    /// Content of the watched format, for platforms without a counter.
    Content(Vec<u8>),
}

/// Outcome of one detector tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Sample {
    /// Nothing could be learned; the baseline must not move.
    Unknown,
    /// The generation equals the baseline.
    Unchanged,
    /// The watched format was present at the baseline and is gone now.
    Absent,
    /// The generation diverged. `content` is the re-read value, if requested
    /// and present in the watched format.
    Changed {
        generation: Generation,
        content: Option<Vec<u8>>,
    },
}

/// Read the current generation of `format`.
pub(crate) fn generation<B: Backend + ?Sized>(
    backend: &B,
    format: &Format,
) -> ClipboardResult<Option<Generation>> {
    if let Some(sequence) = backend.sequence() {
        return Ok(Some(Generation::Sequence(sequence)));
    }
    Ok(backend.read(format)?.map(Generation::Content))
}

/// Compare the clipboard against `baseline`, re-reading `format` on change
/// when `reread` is set.
///
/// Callers hold the guard across the whole call, so the generation and the
/// content belong to the same clipboard state.
pub(crate) fn sample<B: Backend + ?Sized>(
    backend: &B,
    format: &Format,
    baseline: Option<&Generation>,
    reread: bool,
) -> ClipboardResult<Sample> {
    let Some(current) = generation(backend, format)? else {
        return Ok(if baseline.is_some() {
            Sample::Absent
        } else {
            Sample::Unknown
        });
    };
    if baseline == Some(&current) {
        return Ok(Sample::Unchanged);
    }
    let content = match (&current, reread) {
        (_, false) => None,
        (Generation::Content(bytes), true) => Some(bytes.clone()),
        (Generation::Sequence(_), true) => backend.read(format)?,
    };
    Ok(Sample::Changed {
        generation: current,
        content,
    })
}

/// Where detectors take their samples from.
pub(crate) trait Source: Send + Sync + 'static {
    /// Take one sample. Failures are reported as [`Sample::Unknown`].
    fn sample(&self, format: &Format, baseline: Option<&Generation>, reread: bool) -> Sample;

    /// Read the current generation of `format`.
    fn probe(&self, format: &Format) -> ClipboardResult<Option<Generation>>;

    /// How many writes have succeeded through this source.
    fn writes(&self) -> u64;
}

/// What a detector compares samples against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Baseline {
    /// The first probe failed. The detector probes again before it arms.
    Pending,
    /// The probed generation; `None` when the format was absent.
    Known(Option<Generation>),
}

impl From<ClipboardResult<Option<Generation>>> for Baseline {
    fn from(probed: ClipboardResult<Option<Generation>>) -> Self {
        probed.map_or(Self::Pending, Self::Known)
    }
}

/// Baseline tracking for a watcher.
#[derive(Debug, Clone)]
pub(crate) struct WatchState {
    baseline: Baseline,
}

impl WatchState {
    pub(crate) const fn new(baseline: Baseline) -> Self {
        Self { baseline }
    }

    pub(crate) const fn is_armed(&self) -> bool {
        matches!(self.baseline, Baseline::Known(_))
    }

    pub(crate) const fn baseline(&self) -> Option<&Generation> {
        match &self.baseline {
            Baseline::Known(known) => known.as_ref(),
            Baseline::Pending => None,
        }
    }

    pub(crate) fn arm(&mut self, probed: Option<Generation>) {
        self.baseline = Baseline::Known(probed);
    }

    /// Decide what a sample means for the watcher. Returns the value to emit
    /// and the generation to adopt once it has been delivered.
    ///
    /// A change whose re-read yields nothing in the watched format emits
    /// nothing and leaves the baseline where it was.
    pub(crate) fn observe(&self, sample: Sample) -> Option<(Generation, Vec<u8>)> {
        if !self.is_armed() {
            return None;
        }
        match sample {
            Sample::Changed {
                generation,
                content: Some(content),
            } if self.baseline() != Some(&generation) => Some((generation, content)),
            Sample::Changed { .. } | Sample::Absent | Sample::Unknown | Sample::Unchanged => {
                None
            }
        }
    }

    pub(crate) fn advance(&mut self, generation: Generation) {
        self.arm(Some(generation));
    }
}

/// Fire `sender` once the clipboard diverges from `baseline`, or once the
/// source has seen a write after the `written`th.
///
/// Stops early, without firing, once every receiver has been dropped.
pub(crate) async fn notify_on_change<S: Source>(
    source: Arc<S>,
    format: Format,
    written: u64,
    mut baseline: Baseline,
    interval: Duration,
    sender: Sender<()>,
) {
    loop {
        Delay::new(interval).await;
        if sender.is_closed() {
            debug!("change notification for {format} abandoned");
            return;
        }
        if source.writes() != written {
            debug!("{format} write replaced by a later local write");
            fire(&sender);
            return;
        }
        let known = match &baseline {
            Baseline::Known(known) => known.as_ref(),
            Baseline::Pending => {
                if let Ok(probed) = source.probe(&format) {
                    debug!("change notification for {format} armed late");
                    baseline = Baseline::Known(probed);
                }
                continue;
            }
        };
        match source.sample(&format, known, false) {
            Sample::Changed { .. } | Sample::Absent => {
                debug!("clipboard overwritten after {format} write");
                fire(&sender);
                return;
            }
            Sample::Unchanged | Sample::Unknown => {}
        }
    }
}

fn fire(sender: &Sender<()>) {
    // Capacity is one and nothing else sends, so this cannot fail unless the
    // receivers are already gone.
    let _ = sender.try_send(());
}

/// Forward every retrievable change of `format` to `sender` until `cancel`
/// fires or the receiving side goes away.
pub(crate) async fn watch_changes<S: Source>(
    source: Arc<S>,
    format: Format,
    mut state: WatchState,
    interval: Duration,
    sender: Sender<Vec<u8>>,
    cancel: CancelToken,
) {
    loop {
        let tick = Delay::new(interval);
        if let Either::Right(_) = select(tick, pin!(cancel.cancelled())).await {
            debug!("watch for {format} cancelled");
            break;
        }
        if sender.is_closed() {
            debug!("watch for {format} dropped by receiver");
            break;
        }
        if !state.is_armed() {
            if let Ok(probed) = source.probe(&format) {
                debug!("watch for {format} armed late");
                state.arm(probed);
            }
            continue;
        }

        let sample = source.sample(&format, state.baseline(), true);
        trace!("watch for {format} sampled {sample:?}");
        let Some((generation, content)) = state.observe(sample) else {
            continue;
        };

        match select(pin!(sender.send(content)), pin!(cancel.cancelled())).await {
            Either::Left((Ok(()), _)) => state.advance(generation),
            Either::Left((Err(_), _)) => {
                debug!("watch for {format} dropped by receiver");
                break;
            }
            Either::Right(_) => {
                debug!("watch for {format} cancelled");
                break;
            }
        }
    }
    sender.close();
}

/// Drive `task` to completion on its own named thread.
pub(crate) fn spawn_detached(
    name: &str,
    task: impl Future<Output = ()> + Send + 'static,
) -> io::Result<()> {
    thread::Builder::new()
        .name(name.to_owned())
        .spawn(move || futures::executor::block_on(task))
        .map(drop)
}
