//! Embedded-image extraction from uploaded PDFs using lopdf.
//!
//! Lab reports are usually scanned pages, so each page carries one or more
//! image XObjects. Every image is normalized to PNG for the vision model.

use image::ImageOutputFormat;
use lopdf::{Dictionary, Document, Object, ObjectId};

use super::ModelError;

/// One image found in a PDF. Page and index are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfImage {
    pub page: usize,
    pub index: usize,
    pub png: Vec<u8>,
}

impl PdfImage {
    pub fn label(&self) -> String {
        format!("page{}_img{}.png", self.page, self.index)
    }
}

/// Extract every decodable image, page by page, in resource order.
///
/// Pages without images contribute nothing; images that cannot be decoded
/// are skipped but still consume an index.
pub fn extract_embedded_images(pdf_bytes: &[u8]) -> Result<Vec<PdfImage>, ModelError> {
    let doc = Document::load_mem(pdf_bytes)
        .map_err(|e| ModelError::Pdf(format!("Failed to parse PDF: {e}")))?;

    let mut images = Vec::new();
    for (page_idx, page_id) in doc.page_iter().enumerate() {
        let page = page_idx + 1;
        for (image_idx, stream) in page_image_streams(&doc, page_id).into_iter().enumerate() {
            let index = image_idx + 1;
            match image_to_png(&doc, stream) {
                Ok(png) => images.push(PdfImage { page, index, png }),
                Err(e) => {
                    tracing::debug!(page, index, error = %e, "Skipping undecodable PDF image");
                }
            }
        }
    }

    tracing::debug!(
        pages = doc.get_pages().len(),
        images = images.len(),
        "Extracted embedded PDF images"
    );
    Ok(images)
}

/// Image XObject streams of one page. Missing resources mean no images.
fn page_image_streams(doc: &Document, page_id: ObjectId) -> Vec<&lopdf::Stream> {
    let Ok(page_dict) = doc.get_object(page_id).and_then(Object::as_dict) else {
        return Vec::new();
    };
    let Some(resources) = resolve_dict_entry(doc, page_dict, b"Resources") else {
        return Vec::new();
    };
    let Some(xobjects) = resolve_dict_entry(doc, resources, b"XObject") else {
        return Vec::new();
    };

    xobjects
        .iter()
        .filter_map(|(_name, obj)| match resolve_object(doc, obj) {
            Object::Stream(stream) if is_image_subtype(&stream.dict) => Some(stream),
            _ => None,
        })
        .collect()
}

fn is_image_subtype(dict: &Dictionary) -> bool {
    dict.get(b"Subtype")
        .map(|obj| matches!(obj, Object::Name(ref n) if n == b"Image"))
        .unwrap_or(false)
}

/// Decode one image stream and re-encode it as PNG.
fn image_to_png(doc: &Document, stream: &lopdf::Stream) -> Result<Vec<u8>, ModelError> {
    // A DCT stream is a complete JPEG file; other filters unwrap to either an
    // image file or raw samples.
    let content = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    let img = match image::load_from_memory(&content) {
        Ok(img) => img,
        Err(_) => raw_pixels_to_image(doc, &stream.dict, &content)?,
    };

    let mut png = std::io::Cursor::new(Vec::new());
    img.write_to(&mut png, ImageOutputFormat::Png)
        .map_err(|e| ModelError::Image(format!("PNG encode failed: {e}")))?;
    Ok(png.into_inner())
}

/// Rebuild an image from raw 8-bit samples using /Width, /Height and /ColorSpace.
fn raw_pixels_to_image(
    doc: &Document,
    dict: &Dictionary,
    raw: &[u8],
) -> Result<image::DynamicImage, ModelError> {
    let width = get_u32(dict, b"Width")?;
    let height = get_u32(dict, b"Height")?;
    let bpc = dict
        .get(b"BitsPerComponent")
        .and_then(Object::as_i64)
        .unwrap_or(8);
    if bpc != 8 {
        return Err(ModelError::Image(format!("Unsupported bits per component: {bpc}")));
    }

    let channels = color_channels(doc, dict);
    let expected = width as usize * height as usize * channels;
    if raw.len() < expected {
        return Err(ModelError::Image(format!(
            "Raw pixel buffer too small: {} bytes, expected {expected}",
            raw.len()
        )));
    }
    let pixels = raw[..expected].to_vec();

    let img = match channels {
        1 => image::GrayImage::from_raw(width, height, pixels).map(image::DynamicImage::ImageLuma8),
        3 => image::RgbImage::from_raw(width, height, pixels).map(image::DynamicImage::ImageRgb8),
        _ => None,
    };
    img.ok_or_else(|| ModelError::Image(format!("Unsupported channel count: {channels}")))
}

/// Channel count from /ColorSpace. CMYK and unknown spaces are rejected
/// by the caller through the channel count.
fn color_channels(doc: &Document, dict: &Dictionary) -> usize {
    let Ok(cs) = dict.get(b"ColorSpace") else {
        return 3;
    };
    match resolve_object(doc, cs) {
        Object::Name(n) => match n.as_slice() {
            b"DeviceGray" | b"CalGray" => 1,
            b"DeviceRGB" | b"CalRGB" => 3,
            b"DeviceCMYK" => 4,
            _ => 3,
        },
        Object::Array(arr) => match arr.first() {
            Some(Object::Name(n)) if n == b"ICCBased" => arr
                .get(1)
                .map(|r| resolve_object(doc, r))
                .and_then(|o| o.as_stream().ok())
                .and_then(|s| s.dict.get(b"N").and_then(Object::as_i64).ok())
                .map(|n| n as usize)
                .unwrap_or(3),
            Some(Object::Name(n)) if n == b"Indexed" => 1,
            _ => 3,
        },
        _ => 3,
    }
}

fn resolve_object<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn resolve_dict_entry<'a>(
    doc: &'a Document,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Dictionary> {
    dict.get(key)
        .ok()
        .map(|obj| resolve_object(doc, obj))
        .and_then(|obj| obj.as_dict().ok())
}

fn get_u32(dict: &Dictionary, key: &[u8]) -> Result<u32, ModelError> {
    dict.get(key)
        .and_then(Object::as_i64)
        .ok()
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| {
            ModelError::Pdf(format!(
                "Missing or invalid /{} in image dictionary",
                String::from_utf8_lossy(key)
            ))
        })
}
