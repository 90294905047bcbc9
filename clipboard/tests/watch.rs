//! Watch stream behaviour.

use std::sync::Arc;
use std::time::Duration;

use clipkit_clipboard::{
    Backend, CancelHandle, Clipboard, ClipboardError, Format, Guard, MemoryBackend,
};
use futures::StreamExt;
use tokio::time::timeout;

const TICK: Duration = Duration::from_millis(20);

fn clipboard_over(backend: MemoryBackend) -> Clipboard<MemoryBackend> {
    Clipboard::builder(backend)
        .guard(Arc::new(Guard::new()))
        .poll_interval(TICK)
        .build()
}

fn clipboard() -> Clipboard<MemoryBackend> {
    clipboard_over(MemoryBackend::new())
}

#[tokio::test]
async fn emits_nothing_without_changes() {
    let clipboard = clipboard();
    clipboard.write(&Format::Text, b"").unwrap();

    let (handle, token) = CancelHandle::new();
    let changes = clipboard.watch(token, Format::Text);
    tokio::time::sleep(TICK * 6).await;
    handle.cancel();

    let seen = timeout(Duration::from_secs(1), changes.collect::<Vec<_>>())
        .await
        .expect("stream did not close");
    assert!(seen.is_empty());
}

#[tokio::test]
async fn emits_each_new_value() {
    let clipboard = clipboard();
    let (_handle, token) = CancelHandle::new();
    let mut changes = clipboard.watch(token, Format::Text);

    for want in ["clipkit/clipboard", "second", "third"] {
        clipboard.write_text(want).unwrap();
        let got = timeout(Duration::from_secs(2), changes.next())
            .await
            .expect("no watch notification");
        assert_eq!(got.as_deref(), Some(want.as_bytes()));
    }
}

#[tokio::test]
async fn sees_external_writes() {
    let clipboard = clipboard();
    let (_handle, token) = CancelHandle::new();
    let mut changes = clipboard.watch(token, Format::Text);

    clipboard
        .backend()
        .write(&Format::Text, b"from elsewhere")
        .unwrap();
    let got = timeout(Duration::from_secs(2), changes.next()).await;
    assert_eq!(got.unwrap(), Some(b"from elsewhere".to_vec()));
}

#[tokio::test]
async fn ignores_changes_to_other_formats() {
    let clipboard = clipboard();
    let (_handle, token) = CancelHandle::new();
    let mut changes = clipboard.watch(token, Format::Text);

    clipboard.write(&Format::Image, b"\x89PNG").unwrap();
    assert!(timeout(TICK * 6, changes.next()).await.is_err());

    clipboard.write_text("back to text").unwrap();
    let got = timeout(Duration::from_secs(2), changes.next()).await;
    assert_eq!(got.unwrap(), Some(b"back to text".to_vec()));
}

#[tokio::test]
async fn content_fallback_keeps_baseline_across_other_formats() {
    let clipboard = clipboard_over(MemoryBackend::without_sequence());
    clipboard.write_text("same").unwrap();

    let (_handle, token) = CancelHandle::new();
    let mut changes = clipboard.watch(token, Format::Text);

    clipboard.write(&Format::Image, b"\x89PNG").unwrap();
    tokio::time::sleep(TICK * 4).await;
    clipboard.write_text("same").unwrap();
    assert!(timeout(TICK * 6, changes.next()).await.is_err());

    clipboard.write_text("different").unwrap();
    let got = timeout(Duration::from_secs(2), changes.next()).await;
    assert_eq!(got.unwrap(), Some(b"different".to_vec()));
}

#[tokio::test]
async fn failed_baseline_probe_does_not_replay_current_value() {
    let clipboard = clipboard_over(MemoryBackend::without_sequence());
    clipboard
        .backend()
        .write(&Format::Text, b"already there")
        .unwrap();

    clipboard.backend().fail_reads(1);
    let (_handle, token) = CancelHandle::new();
    let mut changes = clipboard.watch(token, Format::Text);
    assert!(timeout(TICK * 6, changes.next()).await.is_err());

    clipboard.write_text("new").unwrap();
    let got = timeout(Duration::from_secs(2), changes.next()).await;
    assert_eq!(got.unwrap(), Some(b"new".to_vec()));
}

#[tokio::test]
async fn closes_within_one_interval_of_cancel() {
    let clipboard = Clipboard::builder(MemoryBackend::new())
        .guard(Arc::new(Guard::new()))
        .poll_interval(Duration::from_millis(200))
        .build();
    let (handle, token) = CancelHandle::new();
    let mut changes = clipboard.watch(token, Format::Text);

    tokio::time::sleep(Duration::from_millis(50)).await;
    drop(handle);
    let end = timeout(Duration::from_millis(250), changes.next())
        .await
        .expect("stream outlived its scope");
    assert_eq!(end, None);
}

#[tokio::test]
async fn cancelled_scope_closes_immediately() {
    let clipboard = clipboard();
    let (handle, token) = CancelHandle::new();
    handle.cancel();

    let mut changes = clipboard.watch(token, Format::Text);
    let end = timeout(Duration::from_secs(1), changes.next()).await;
    assert_eq!(end.unwrap(), None);
}

#[tokio::test]
async fn unusable_clipboard_yields_closed_stream() {
    let backend = MemoryBackend::new();
    backend.set_unavailable(Some("no display"));
    let clipboard = clipboard_over(backend);

    let (_handle, token) = CancelHandle::new();
    let mut changes = clipboard.watch(token.clone(), Format::Text);
    assert_eq!(changes.next().await, None);
    assert!(matches!(
        clipboard.last_error(),
        Some(ClipboardError::Unavailable(_))
    ));
    assert!(clipboard.try_watch(token, Format::Text).is_err());
}

#[tokio::test]
async fn unregistered_custom_format_cannot_be_watched() {
    let clipboard = clipboard();
    let (_handle, token) = CancelHandle::new();
    let result = clipboard.try_watch(token, Format::custom("application/pdf"));
    assert!(matches!(result, Err(ClipboardError::Unsupported(_))));
}

#[tokio::test]
async fn watchers_are_independent() {
    let clipboard = clipboard();
    let (first_handle, first_token) = CancelHandle::new();
    let (_second_handle, second_token) = CancelHandle::new();
    let mut first = clipboard.watch(first_token, Format::Text);
    let mut second = clipboard.watch(second_token, Format::Text);

    clipboard.write_text("both").unwrap();
    assert_eq!(
        timeout(Duration::from_secs(2), first.next()).await.unwrap(),
        Some(b"both".to_vec())
    );
    assert_eq!(
        timeout(Duration::from_secs(2), second.next()).await.unwrap(),
        Some(b"both".to_vec())
    );

    drop(first_handle);
    assert_eq!(
        timeout(Duration::from_secs(1), first.next()).await.unwrap(),
        None
    );

    clipboard.write_text("only second").unwrap();
    assert_eq!(
        timeout(Duration::from_secs(2), second.next()).await.unwrap(),
        Some(b"only second".to_vec())
    );
}
