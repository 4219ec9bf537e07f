//! Image validation and upload naming.
//!
//! Uploads are checked here before anything touches storage: the format is
//! sniffed from the bytes (never trusted from the client) and the image must
//! decode completely.

use std::io::Cursor;

use image::{ImageFormat, ImageReader};
use thiserror::Error;
use uuid::Uuid;

/// Allowed image formats for recipe photos.
pub const ALLOWED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Gif,
    ImageFormat::WebP,
];

/// Maximum file size for images (10MB).
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Directory (relative to the media root) that recipe images live under.
pub const RECIPE_UPLOAD_DIR: &str = "uploads/recipe";

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Upload a valid image. The file you uploaded was empty.")]
    Empty,

    #[error("File too large: {0} bytes (max {max})", max = MAX_FILE_SIZE)]
    TooLarge(usize),

    #[error("Upload a valid image. Could not detect image format.")]
    UnknownFormat,

    #[error("Unsupported image format: {0:?}. Allowed: JPEG, PNG, GIF, WebP")]
    Unsupported(ImageFormat),

    #[error("Upload a valid image. {0}")]
    Corrupt(String),
}

/// An upload that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedImage {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl ValidatedImage {
    /// Content type such as `image/jpeg`.
    pub fn content_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    /// Canonical file extension for the detected format.
    pub fn extension(&self) -> &'static str {
        self.format.extensions_str().first().copied().unwrap_or("img")
    }
}

/// Validate image data: size, allowed format and a full decode.
pub fn validate_image(data: &[u8]) -> Result<ValidatedImage, ImageError> {
    if data.is_empty() {
        return Err(ImageError::Empty);
    }
    if data.len() > MAX_FILE_SIZE {
        return Err(ImageError::TooLarge(data.len()));
    }

    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ImageError::Corrupt(e.to_string()))?;

    let format = reader.format().ok_or(ImageError::UnknownFormat)?;

    if !ALLOWED_FORMATS.contains(&format) {
        return Err(ImageError::Unsupported(format));
    }

    let decoded = reader
        .decode()
        .map_err(|e| ImageError::Corrupt(e.to_string()))?;

    Ok(ValidatedImage {
        format,
        width: decoded.width(),
        height: decoded.height(),
    })
}

/// Storage path for a new recipe image: `uploads/recipe/<uuid>.<ext>`.
///
/// Every call yields a fresh v4 UUID so uploads never overwrite each other.
pub fn recipe_image_path(image: &ValidatedImage) -> String {
    format!(
        "{}/{}.{}",
        RECIPE_UPLOAD_DIR,
        Uuid::new_v4(),
        image.extension()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    fn encode(format: ImageFormat) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::new(10, 10));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_validate_jpeg() {
        let validated = validate_image(&encode(ImageFormat::Jpeg)).unwrap();
        assert_eq!(validated.format, ImageFormat::Jpeg);
        assert_eq!(validated.content_type(), "image/jpeg");
        assert_eq!((validated.width, validated.height), (10, 10));
    }

    #[test]
    fn test_validate_png() {
        let validated = validate_image(&encode(ImageFormat::Png)).unwrap();
        assert_eq!(validated.extension(), "png");
    }

    #[test]
    fn test_truncated_jpeg_rejected() {
        // Sniffs as JPEG but cannot decode
        let jpeg_header = [0xFF, 0xD8, 0xFF, 0xE0];
        assert!(validate_image(&jpeg_header).is_err());
    }

    #[test]
    fn test_validate_invalid_format() {
        let result = validate_image(b"notimage");
        assert!(matches!(result, Err(ImageError::UnknownFormat)));
    }

    #[test]
    fn test_unsupported_format() {
        let result = validate_image(&encode(ImageFormat::Bmp));
        assert!(matches!(
            result,
            Err(ImageError::Unsupported(ImageFormat::Bmp))
        ));
    }

    #[test]
    fn test_empty_rejected() {
        assert!(matches!(validate_image(&[]), Err(ImageError::Empty)));
    }

    #[test]
    fn test_recipe_image_paths_are_unique() {
        let validated = validate_image(&encode(ImageFormat::Jpeg)).unwrap();
        let first = recipe_image_path(&validated);
        let second = recipe_image_path(&validated);
        assert!(first.starts_with("uploads/recipe/"));
        assert!(first.ends_with(".jpg"));
        assert_ne!(first, second);
    }
}
