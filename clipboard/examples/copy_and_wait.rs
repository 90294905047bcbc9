//! Copies a file (or stdin) to the clipboard and stays alive until something
//! else replaces it. Files ending in `.png` are copied as images.
use std::io::Read;
use std::path::Path;

use clipkit_clipboard::Format;

fn main() {
    if let Err(err) = clipkit_clipboard::init() {
        eprintln!("Clipboard unavailable: {err}");
        std::process::exit(1);
    }
    clipkit_clipboard::set_debug(true);

    let path = std::env::args().nth(1);
    let format = match path.as_deref().map(Path::new).and_then(Path::extension) {
        Some(ext) if ext.eq_ignore_ascii_case("png") => Format::Image,
        _ => Format::Text,
    };

    let data = match &path {
        Some(path) => std::fs::read(path),
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf).map(|_| buf)
        }
    };
    let data = match data {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Failed to read input: {e}");
            std::process::exit(1);
        }
    };

    let Some(changed) = clipkit_clipboard::write(&format, &data) else {
        eprintln!("Failed to write clipboard: {:?}", clipkit_clipboard::last_error());
        std::process::exit(1);
    };

    // Serving the clipboard until it is overwritten keeps the data available
    // on platforms where the owner must stay alive.
    changed.recv_blocking();
    println!("Clipboard content replaced, exiting.");
}
