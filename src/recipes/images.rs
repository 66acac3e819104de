use bytes::Bytes;
use image::ImageFormat;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Prefix under which recipe images are stored.
pub const IMAGE_PREFIX: &str = "uploads/recipe";

/// A payload that decoded as an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckedImage {
    pub ext: &'static str,
    pub content_type: &'static str,
    pub width: u32,
    pub height: u32,
}

fn describe(format: ImageFormat) -> Option<(&'static str, &'static str)> {
    match format {
        ImageFormat::Jpeg => Some(("jpg", "image/jpeg")),
        ImageFormat::Png => Some(("png", "image/png")),
        ImageFormat::Gif => Some(("gif", "image/gif")),
        ImageFormat::WebP => Some(("webp", "image/webp")),
        ImageFormat::Bmp => Some(("bmp", "image/bmp")),
        _ => None,
    }
}

/// Detects the format and fully decodes the payload; anything that fails is a validation error.
pub fn inspect_image(data: &Bytes) -> AppResult<CheckedImage> {
    if data.is_empty() {
        return Err(AppError::validation("The submitted file is empty"));
    }

    let format = image::guess_format(data).map_err(|_| {
        AppError::validation("Upload a valid image. The file you uploaded was either not an image or a corrupted image")
    })?;
    let (ext, content_type) = describe(format)
        .ok_or_else(|| AppError::validation(format!("Unsupported image format {format:?}")))?;

    let decoded = image::load_from_memory_with_format(data, format)
        .map_err(|e| AppError::validation(format!("Invalid image: {e}")))?;

    Ok(CheckedImage {
        ext,
        content_type,
        width: decoded.width(),
        height: decoded.height(),
    })
}

/// Fresh object key; the original file name is never reused.
pub fn image_key(ext: &str) -> String {
    format!("{}/{}.{}", IMAGE_PREFIX, Uuid::new_v4(), ext)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use std::io::Cursor;

    pub(crate) fn png_bytes() -> Bytes {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(10, 10, Rgb([200, 10, 10]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        Bytes::from(buf.into_inner())
    }

    #[test]
    fn accepts_real_png() {
        let checked = inspect_image(&png_bytes()).unwrap();
        assert_eq!(checked.ext, "png");
        assert_eq!(checked.content_type, "image/png");
        assert_eq!((checked.width, checked.height), (10, 10));
    }

    #[test]
    fn rejects_non_image_payload() {
        let err = inspect_image(&Bytes::from_static(b"notanimage")).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn rejects_truncated_png() {
        let full = png_bytes();
        let truncated = full.slice(0..full.len() / 2);
        assert!(matches!(inspect_image(&truncated), Err(AppError::Validation(_))));
    }

    #[test]
    fn rejects_empty_payload() {
        assert!(inspect_image(&Bytes::new()).is_err());
    }

    #[test]
    fn key_is_uuid_under_prefix() {
        let key = image_key("jpg");
        let name = key.strip_prefix("uploads/recipe/").unwrap();
        let stem = name.strip_suffix(".jpg").unwrap();
        assert!(Uuid::parse_str(stem).is_ok());
        assert_ne!(image_key("jpg"), key);
    }
}
