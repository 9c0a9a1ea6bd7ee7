//! Upload checks for profile images

use crate::domain::DomainError;

/// Message shown when an upload is not a usable image
pub const INVALID_IMAGE_MESSAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// Decode an uploaded image, returning its dimensions
pub fn decode_image(content: &[u8]) -> Result<(u32, u32), DomainError> {
    let img = image::load_from_memory(content)
        .map_err(|e| DomainError::validation(format!("Failed to load image: {}", e)))?;

    Ok((img.width(), img.height()))
}

/// Whether an upload is named as an image and decodes as one
pub fn is_valid_image(filename: &str, content: &[u8]) -> bool {
    let guessed = mime_guess::from_path(filename).first();
    let named_as_image = guessed.is_some_and(|mime| mime.type_() == mime_guess::mime::IMAGE);

    named_as_image && decode_image(content).is_ok()
}

/// Encode a small PNG for tests
#[cfg(test)]
pub(crate) fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let mut buffer = std::io::Cursor::new(Vec::new());
    image::RgbImage::new(width, height)
        .write_to(&mut buffer, image::ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_reports_dimensions() {
        assert_eq!(decode_image(&sample_png(3, 2)).unwrap(), (3, 2));
    }

    #[test]
    fn test_valid_image_needs_name_and_content() {
        let png = sample_png(1, 1);

        assert!(is_valid_image("avatar.png", &png));
        assert!(is_valid_image("avatar.JPG", &png));
        assert!(!is_valid_image("notes.txt", &png));
        assert!(!is_valid_image("no_extension", &png));
        assert!(!is_valid_image("avatar.png", b"not really a png"));
    }

    #[test]
    fn test_header_without_image_data_is_rejected() {
        let mut truncated = b"\x89PNG\r\n\x1a\n".to_vec();
        truncated.extend_from_slice(b"this is not image data at all");

        assert!(!is_valid_image("avatar.png", &truncated));
        assert!(!is_valid_image("a.bmp", b"BM hello"));
        assert!(!is_valid_image("a.gif", b"GIF89a"));
        assert!(decode_image(b"").is_err());
    }

    #[test]
    fn test_truncated_png_is_rejected() {
        let png = sample_png(8, 8);

        assert!(!is_valid_image("avatar.png", &png[..png.len() / 2]));
    }
}
