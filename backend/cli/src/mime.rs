//! Image MIME detection by file extension.
//!
//! Doubles as the picker's type filter: anything that is not a known image
//! type is refused before upload.

use std::path::Path;

/// Used when an upload carries no content type and no usable file name.
pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// Detect an image MIME type from a path's extension.
pub fn image_mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "avif" => Some("image/avif"),
        "bmp" => Some("image/bmp"),
        "tiff" | "tif" => Some("image/tiff"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        _ => None,
    }
}

/// Whether a MIME type is for an image.
pub fn is_image(mime: &str) -> bool {
    mime.starts_with("image/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn detects_common_photo_types() {
        assert_eq!(image_mime_for_path(&PathBuf::from("label.JPG")), Some("image/jpeg"));
        assert_eq!(image_mime_for_path(&PathBuf::from("label.heic")), Some("image/heic"));
    }

    #[test]
    fn non_images_are_refused() {
        assert_eq!(image_mime_for_path(&PathBuf::from("notes.txt")), None);
        assert_eq!(image_mime_for_path(&PathBuf::from("no_extension")), None);
        assert!(!is_image("application/pdf"));
        assert!(is_image("image/webp"));
    }
}
