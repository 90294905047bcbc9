//! Clipboard reading demo.
fn main() {
    if let Err(err) = clipkit_clipboard::init() {
        eprintln!("Clipboard unavailable: {err}");
        return;
    }

    println!("Reading clipboard...");
    match clipkit_clipboard::read(&clipkit_clipboard::Format::Text) {
        Some(text) => println!(
            "Clipboard text content:\n{}",
            String::from_utf8_lossy(&text)
        ),
        None => println!("Clipboard does not contain text."),
    }

    match clipkit_clipboard::read(&clipkit_clipboard::Format::Image) {
        Some(png) => {
            println!("Clipboard contains image: {} bytes of PNG", png.len());

            // Save to file for preview
            match std::fs::write("clipboard_preview.png", &png) {
                Ok(()) => println!("Image saved to clipboard_preview.png"),
                Err(e) => println!("Failed to save image: {e}"),
            }
        }
        None => println!("Clipboard does not contain image."),
    }
}
