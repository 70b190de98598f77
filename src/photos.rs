//! Photo upload handling.
//!
//! Photos arrive as data URLs. Anything that is not already a small JPEG is
//! decoded, scaled to fit the configured box and re-encoded as JPEG. An
//! activity stores its photos as one string joined with [`PHOTO_DELIMITER`].

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage, ImageFormat};
use thiserror::Error;
use tracing::debug;

use crate::config::PhotoLimits;

pub const PHOTO_DELIMITER: &str = "|||";

const PROCESS_FAILED: &str = "Failed to process image. Please try again.";

#[derive(Debug, Error, PartialEq)]
pub enum PhotoError {
    #[error("HEIC files are not supported by web browsers. Please convert your image to JPEG or PNG format.")]
    Heic,

    #[error("\"{0}\" is not a supported image file. Please select a JPEG, PNG, GIF, or WebP file.")]
    Unsupported(String),

    #[error("{}", PROCESS_FAILED)]
    Malformed,

    #[error("{}", PROCESS_FAILED)]
    Encode,
}

#[derive(Debug, PartialEq)]
pub struct CompressedPhoto {
    pub data_url: String,
    pub width: u32,
    pub height: u32,
}

struct DataUrl<'a> {
    mime: String,
    payload: &'a str,
}

/// Splits a stored photo string. Older rows used `,` or held one bare data URL.
pub fn split_photos(photos: &str) -> Vec<String> {
    let entries: Vec<&str> = if photos.contains(PHOTO_DELIMITER) {
        photos.split(PHOTO_DELIMITER).collect()
    } else if photos.trim_start().starts_with("data:") {
        vec![photos]
    } else {
        photos.split(',').collect()
    };

    entries
        .into_iter()
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Splits a photo string being written. Only `|||` separates entries, so a URL
/// containing commas stays whole.
pub fn split_submitted(photos: &str) -> Vec<String> {
    photos
        .split(PHOTO_DELIMITER)
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn join_photos(photos: &[String]) -> String {
    photos.join(PHOTO_DELIMITER)
}

/// Fits `(width, height)` into the limits, keeping the aspect ratio.
/// Landscape images are bounded by width, everything else by height.
pub fn scaled_dimensions(width: u32, height: u32, limits: PhotoLimits) -> (u32, u32) {
    let (w, h) = (width as f64, height as f64);
    let (w, h) = if width > height {
        if width > limits.max_width {
            (limits.max_width as f64, h * limits.max_width as f64 / w)
        } else {
            (w, h)
        }
    } else if height > limits.max_height {
        (w * limits.max_height as f64 / h, limits.max_height as f64)
    } else {
        (w, h)
    };

    ((w.round() as u32).max(1), (h.round() as u32).max(1))
}

fn parse_data_url(input: &str) -> Result<DataUrl<'_>, PhotoError> {
    let rest = input.trim().strip_prefix("data:").ok_or(PhotoError::Malformed)?;
    let (header, payload) = rest.split_once(',').ok_or(PhotoError::Malformed)?;

    let mut parts = header.split(';');
    let mime = parts.next().unwrap_or_default().trim().to_ascii_lowercase();
    if !parts.any(|param| param.trim().eq_ignore_ascii_case("base64")) {
        return Err(PhotoError::Malformed);
    }

    Ok(DataUrl { mime, payload })
}

fn check_type(mime: &str, file_name: Option<&str>) -> Result<(), PhotoError> {
    let lower_name = file_name.map(str::to_ascii_lowercase);
    let heic_name = lower_name
        .as_deref()
        .is_some_and(|name| name.ends_with(".heic") || name.ends_with(".heif"));

    if heic_name || mime == "image/heic" || mime == "image/heif" {
        return Err(PhotoError::Heic);
    }
    if !mime.starts_with("image/") {
        let name = file_name.unwrap_or("file").to_string();
        return Err(PhotoError::Unsupported(name));
    }
    Ok(())
}

/// Validates, scales and re-encodes one data URL.
pub fn compress(
    data_url: &str,
    file_name: Option<&str>,
    limits: PhotoLimits,
) -> Result<CompressedPhoto, PhotoError> {
    let parsed = parse_data_url(data_url)?;
    check_type(&parsed.mime, file_name)?;

    let bytes = STANDARD
        .decode(parsed.payload.trim())
        .map_err(|_| PhotoError::Malformed)?;
    let img = image::load_from_memory(&bytes).map_err(|e| {
        debug!("image decode failed: {e}");
        PhotoError::Malformed
    })?;

    let (width, height) = scaled_dimensions(img.width(), img.height(), limits);
    // A JPEG that already fits is kept byte-for-byte; the label alone is not trusted.
    let is_jpeg = matches!(image::guess_format(&bytes), Ok(ImageFormat::Jpeg));
    if is_jpeg && (width, height) == (img.width(), img.height()) {
        return Ok(CompressedPhoto {
            data_url: format!("data:image/jpeg;base64,{}", parsed.payload.trim()),
            width,
            height,
        });
    }

    let resized = if (width, height) == (img.width(), img.height()) {
        img
    } else {
        img.resize_exact(width, height, FilterType::Triangle)
    };

    let jpeg = encode_jpeg(&resized, limits.jpeg_quality)?;
    Ok(CompressedPhoto {
        data_url: format!("data:image/jpeg;base64,{}", STANDARD.encode(jpeg)),
        width,
        height,
    })
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, PhotoError> {
    let rgb = img.to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
        .encode_image(&rgb)
        .map_err(|e| {
            debug!("jpeg encode failed: {e}");
            PhotoError::Encode
        })?;
    Ok(out)
}

/// Compresses every data-URL entry of a stored photo string; URLs pass through.
pub fn normalize_photos(photos: &str, limits: PhotoLimits) -> Result<String, PhotoError> {
    let entries = split_submitted(photos)
        .into_iter()
        .map(|entry| {
            if entry.starts_with("data:") {
                compress(&entry, None, limits).map(|photo| photo.data_url)
            } else {
                Ok(entry)
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(join_photos(&entries))
}
