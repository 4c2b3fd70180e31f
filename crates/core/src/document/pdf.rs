//! One-page documents showing a single image.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::error::{Result, ServiceError};

use super::raster::ImageXObject;

/// Resource name the page content uses for the image.
const IMAGE_RESOURCE: &str = "Im0";

/// Page size and margin, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

/// A4 portrait with half-inch margins.
pub const A4_LAYOUT: PageLayout = PageLayout {
    width: 595.0,
    height: 842.0,
    margin: 36.0,
};

impl PageLayout {
    /// Where an image of `width`x`height` pixels is drawn: `(x, y, w, h)`.
    ///
    /// Images are drawn at one point per pixel from the top-left margin and
    /// scaled down, keeping the aspect ratio, when they do not fit.
    pub fn place(&self, width: u32, height: u32) -> (f32, f32, f32, f32) {
        let available_w = self.width - 2.0 * self.margin;
        let available_h = self.height - 2.0 * self.margin;
        let (w, h) = (width.max(1) as f32, height.max(1) as f32);
        let scale = (available_w / w).min(available_h / h).min(1.0);
        let (w, h) = (w * scale, h * scale);
        (self.margin, self.height - self.margin - h, w, h)
    }
}

pub(crate) fn pdf_error(context: &str, err: lopdf::Error) -> ServiceError {
    ServiceError::InvalidData(format!("{}: {}", context, err))
}

/// Writes a one-page document showing `image`.
pub(crate) fn write_single_image(image: ImageXObject, layout: &PageLayout) -> Result<Vec<u8>> {
    let (x, y, w, h) = layout.place(image.width, image.height);
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(image.width),
        "Height" => i64::from(image.height),
        "ColorSpace" => image.color_space,
        "BitsPerComponent" => 8,
        "Filter" => image.filter,
    };
    let image_id = doc.add_object(Stream::new(image_dict, image.data));

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![w.into(), 0.into(), 0.into(), h.into(), x.into(), y.into()],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_RESOURCE.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content = content
        .encode()
        .map_err(|e| pdf_error("unable to encode page content", e))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, content));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), layout.width.into(), layout.height.into()],
        "Resources" => dictionary! {
            "XObject" => dictionary! { IMAGE_RESOURCE => image_id },
        },
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| pdf_error("unable to write document", e))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> ImageXObject {
        ImageXObject {
            width: 100,
            height: 50,
            color_space: "DeviceRGB",
            filter: "DCTDecode",
            data: vec![0xFF, 0xD8, 0xFF, 0xD9],
        }
    }

    #[test]
    fn test_place_small_image() {
        let (x, y, w, h) = A4_LAYOUT.place(100, 50);
        assert_eq!((x, y, w, h), (36.0, 842.0 - 36.0 - 50.0, 100.0, 50.0));
    }

    #[test]
    fn test_place_scales_large_image() {
        let (_, y, w, h) = A4_LAYOUT.place(1046, 400);
        assert_eq!(w, 523.0);
        assert_eq!(h, 200.0);
        assert_eq!(y, 842.0 - 36.0 - 200.0);
    }

    #[test]
    fn test_written_document_loads_back() {
        let pdf = write_single_image(image(), &A4_LAYOUT).unwrap();
        assert!(pdf.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&pdf).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1);

        let page_id = *pages.values().next().unwrap();
        let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
        let operators: Vec<&str> = content
            .operations
            .iter()
            .map(|op| op.operator.as_str())
            .collect();
        assert_eq!(operators, vec!["q", "cm", "Do", "Q"]);
    }

    #[test]
    fn test_image_stream_is_kept_verbatim() {
        let pdf = write_single_image(image(), &A4_LAYOUT).unwrap();
        let doc = Document::load_mem(&pdf).unwrap();

        let stream = doc
            .objects
            .values()
            .filter_map(|object| object.as_stream().ok())
            .find(|stream| stream.dict.has(b"Width"))
            .unwrap();
        assert_eq!(stream.content, vec![0xFF, 0xD8, 0xFF, 0xD9]);
        assert_eq!(
            stream.dict.get(b"Filter").unwrap().as_name().unwrap(),
            b"DCTDecode"
        );
        assert_eq!(stream.dict.get(b"Width").unwrap().as_i64().unwrap(), 100);
    }
}
