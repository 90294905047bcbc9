//! Serialized access to the native clipboard.
//!
//! Some platform clipboard APIs crash when entered from two threads at once,
//! so every backend call, reads included, runs under one exclusive lock.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

/// Exclusive lock serializing backend calls.
///
/// Clipboards created with [`Clipboard::new`](crate::Clipboard::new) share
/// [`Guard::global`]. Tests can hand a private guard to
/// [`Clipboard::with_guard`](crate::Clipboard::with_guard).
#[derive(Debug, Default)]
pub struct Guard {
    lock: Mutex<()>,
}

impl Guard {
    /// Create an independent guard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The guard shared by the whole process.
    #[must_use]
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<Guard>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(Self::new())).clone()
    }

    /// Run `f` while holding the guard.
    ///
    /// A panic inside a previous holder does not poison the guard; the lock
    /// protects no data of its own.
    pub fn run<T>(&self, f: impl FnOnce() -> T) -> T {
        let _held = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn global_guard_is_shared() {
        assert!(Arc::ptr_eq(&Guard::global(), &Guard::global()));
    }

    #[test]
    fn holders_never_overlap() {
        let guard = Arc::new(Guard::new());
        let active = Arc::new(AtomicUsize::new(0));
        let overlaps = Arc::new(AtomicUsize::new(0));

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let guard = guard.clone();
                let active = active.clone();
                let overlaps = overlaps.clone();
                thread::spawn(move || {
                    for _ in 0..20 {
                        guard.run(|| {
                            if active.fetch_add(1, Ordering::SeqCst) != 0 {
                                overlaps.fetch_add(1, Ordering::SeqCst);
                            }
                            thread::sleep(Duration::from_micros(50));
                            active.fetch_sub(1, Ordering::SeqCst);
                        });
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn survives_panicking_holder() {
        let guard = Arc::new(Guard::new());
        let cloned = guard.clone();
        let result = thread::spawn(move || {
            let _: () = cloned.run(|| panic!("boom"));
        })
        .join();
        assert!(result.is_err());
        assert_eq!(guard.run(|| 7), 7);
    }
}
