//! Document processing for uploaded files: image to PDF conversion and
//! redaction of four-digit groups in PDF text.

mod pdf;
mod raster;
mod redact;

pub use pdf::{PageLayout, A4_LAYOUT};
pub use redact::{redact_pdf, Redaction, REDACTION_MARKER};

use image::ImageFormat;

use crate::error::Result;

/// Converts an image into a one-page PDF laid out on an A4 page.
///
/// Gray and RGB JPEGs are embedded as they are. Every other image is decoded
/// and stored as deflated 8-bit samples. Fails with
/// [`ServiceError::Unsupported`](crate::ServiceError::Unsupported) for
/// extensions no decoder handles.
pub fn image_to_pdf(extension: &str, image: &[u8]) -> Result<Vec<u8>> {
    let format = raster::format_for(extension)?;

    let passthrough = match format {
        ImageFormat::Jpeg => raster::passthrough_jpeg(image)?,
        _ => None,
    };
    let xobject = match passthrough {
        Some(xobject) => xobject,
        None => raster::rasterize(image, format)?,
    };

    pdf::write_single_image(xobject, &A4_LAYOUT)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::io::Cursor;

    use image::{DynamicImage, ImageBuffer, ImageFormat, Luma, Rgb, Rgba};

    pub fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, format).unwrap();
        bytes.into_inner()
    }

    pub fn rgb(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, Rgb([200, 40, 10])))
    }

    pub fn gray16(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageLuma16(ImageBuffer::from_pixel(width, height, Luma([40_000u16])))
    }

    pub fn rgba(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(ImageBuffer::from_pixel(width, height, Rgba([0, 90, 180, 255])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServiceError;
    use lopdf::{Document, Stream};

    /// The image XObject of a converted document.
    fn embedded_image(pdf: &[u8]) -> Stream {
        let doc = Document::load_mem(pdf).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
        doc.objects
            .values()
            .filter_map(|object| object.as_stream().ok())
            .find(|stream| stream.dict.has(b"Width"))
            .cloned()
            .unwrap()
    }

    fn name(stream: &Stream, key: &[u8]) -> String {
        String::from_utf8(stream.dict.get(key).unwrap().as_name().unwrap().to_vec()).unwrap()
    }

    fn size(stream: &Stream) -> (i64, i64) {
        (
            stream.dict.get(b"Width").unwrap().as_i64().unwrap(),
            stream.dict.get(b"Height").unwrap().as_i64().unwrap(),
        )
    }

    #[test]
    fn test_jpeg_is_embedded_as_is() {
        let jpeg = fixtures::encode(fixtures::rgb(32, 16), ImageFormat::Jpeg);
        let image = embedded_image(&image_to_pdf(".jpeg", &jpeg).unwrap());

        assert_eq!(name(&image, b"Filter"), "DCTDecode");
        assert_eq!(name(&image, b"ColorSpace"), "DeviceRGB");
        assert_eq!(size(&image), (32, 16));
        assert_eq!(image.content, jpeg);
    }

    #[test]
    fn test_png_to_pdf() {
        let png = fixtures::encode(fixtures::rgba(3, 2), ImageFormat::Png);
        let image = embedded_image(&image_to_pdf(".PNG", &png).unwrap());

        assert_eq!(name(&image, b"Filter"), "FlateDecode");
        assert_eq!(name(&image, b"ColorSpace"), "DeviceRGB");
        assert_eq!(image.decompressed_content().unwrap().len(), 3 * 2 * 3);
    }

    #[test]
    fn test_sixteen_bit_gray_png() {
        let png = fixtures::encode(fixtures::gray16(4, 4), ImageFormat::Png);
        let image = embedded_image(&image_to_pdf(".png", &png).unwrap());

        assert_eq!(name(&image, b"ColorSpace"), "DeviceGray");
        assert_eq!(size(&image), (4, 4));
        let samples = image.decompressed_content().unwrap();
        assert_eq!(samples.len(), 16);
        // 40000 of 65535 scaled to 8 bits
        assert!(samples.iter().all(|sample| (155..=156).contains(sample)));
    }

    #[test]
    fn test_gif_to_pdf() {
        let gif = fixtures::encode(fixtures::rgba(1, 1), ImageFormat::Gif);
        assert!(gif.starts_with(b"GIF89a"));
        let image = embedded_image(&image_to_pdf(".gif", &gif).unwrap());

        assert_eq!(name(&image, b"Filter"), "FlateDecode");
        assert_eq!(size(&image), (1, 1));
    }

    #[test]
    fn test_tiff_to_pdf() {
        let tiff = fixtures::encode(fixtures::rgb(5, 5), ImageFormat::Tiff);
        let image = embedded_image(&image_to_pdf(".tiff", &tiff).unwrap());
        assert_eq!(size(&image), (5, 5));
    }

    #[test]
    fn test_unknown_extension() {
        assert!(matches!(
            image_to_pdf(".xyz", b"anything"),
            Err(ServiceError::Unsupported(_))
        ));
    }

    #[test]
    fn test_corrupt_image() {
        assert!(matches!(
            image_to_pdf(".jpg", b"not a jpeg"),
            Err(ServiceError::InvalidData(_))
        ));
        assert!(matches!(
            image_to_pdf(".gif", b"GIF89a"),
            Err(ServiceError::InvalidData(_))
        ));
    }
}
