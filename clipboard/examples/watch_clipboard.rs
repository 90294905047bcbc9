//! Prints clipboard text whenever it changes, for ten seconds.
use std::time::Duration;

use clipkit_clipboard::{CancelHandle, Format};
use futures::StreamExt;

fn main() {
    if let Err(err) = clipkit_clipboard::init() {
        eprintln!("Clipboard unavailable: {err}");
        return;
    }

    let (handle, token) = CancelHandle::new();
    let mut changes = clipkit_clipboard::watch(token, Format::Text);

    std::thread::spawn(move || {
        std::thread::sleep(Duration::from_secs(10));
        println!("stop watch!");
        drop(handle);
    });

    println!("start watch!");
    futures::executor::block_on(async {
        while let Some(data) = changes.next().await {
            println!("read: {}", String::from_utf8_lossy(&data));
        }
    });
}
