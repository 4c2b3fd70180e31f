//! Turning uploaded image bytes into PDF image XObjects.

use std::io::{Cursor, Write};

use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::codecs::jpeg::JpegDecoder;
use image::{ExtendedColorType, ImageDecoder, ImageError, ImageFormat};

use crate::error::{Result, ServiceError};

/// Pixel data and the dictionary entries that describe it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ImageXObject {
    pub width: u32,
    pub height: u32,
    pub color_space: &'static str,
    pub filter: &'static str,
    pub data: Vec<u8>,
}

fn image_error(err: ImageError) -> ServiceError {
    match err {
        ImageError::Unsupported(e) => ServiceError::Unsupported(e.to_string()),
        other => ServiceError::InvalidData(format!("unable to decode image: {}", other)),
    }
}

/// Decoder format for an extension such as `.png`, ignoring case.
pub(crate) fn format_for(extension: &str) -> Result<ImageFormat> {
    ImageFormat::from_extension(extension.trim_start_matches('.')).ok_or_else(|| {
        ServiceError::Unsupported(format!("cannot convert {} images to PDF", extension))
    })
}

/// Embeds an 8-bit gray or RGB JPEG as is. Other JPEGs (CMYK, YCCK) return
/// `None` and go through [`rasterize`].
pub(crate) fn passthrough_jpeg(bytes: &[u8]) -> Result<Option<ImageXObject>> {
    let decoder = JpegDecoder::new(Cursor::new(bytes)).map_err(image_error)?;
    let (width, height) = decoder.dimensions();
    let color_space = match decoder.original_color_type() {
        ExtendedColorType::L8 => "DeviceGray",
        ExtendedColorType::Rgb8 => "DeviceRGB",
        _ => return Ok(None),
    };

    Ok(Some(ImageXObject {
        width,
        height,
        color_space,
        filter: "DCTDecode",
        data: bytes.to_vec(),
    }))
}

/// Decodes any supported image to 8-bit samples and deflates them.
///
/// Images without color become `DeviceGray`, everything else `DeviceRGB`.
/// Alpha is dropped.
pub(crate) fn rasterize(bytes: &[u8], format: ImageFormat) -> Result<ImageXObject> {
    let image = image::load_from_memory_with_format(bytes, format).map_err(image_error)?;

    let (width, height) = (image.width(), image.height());
    let (color_space, samples) = if image.color().has_color() {
        ("DeviceRGB", image.to_rgb8().into_raw())
    } else {
        ("DeviceGray", image.to_luma8().into_raw())
    };

    let data = deflate(&samples)
        .map_err(|e| ServiceError::InvalidData(format!("unable to compress image: {}", e)))?;

    Ok(ImageXObject {
        width,
        height,
        color_space,
        filter: "FlateDecode",
        data,
    })
}

pub(crate) fn deflate(samples: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(samples)?;
    encoder.finish()
}
