//! First-page images of PDF files.
//!
//! Scanned comics exported to PDF are one full-page raster image per page,
//! so the largest image XObject on page one is the cover. No rendering is
//! attempted.

use std::io::Cursor;
use std::path::Path;

use image::{GrayImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use super::{Thumbnail, ThumbnailError};

/// Bound on the `Parent` chain followed when looking for inherited resources.
const MAX_PAGE_TREE_DEPTH: usize = 32;

fn pdf_err(path: &Path, message: impl ToString) -> ThumbnailError {
    ThumbnailError::Archive {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

fn deref<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn dict_int(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<i64> {
    match deref(doc, dict.get(key).ok()?) {
        Object::Integer(i) => Some(*i),
        _ => None,
    }
}

fn dict_name<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a [u8]> {
    match deref(doc, dict.get(key).ok()?) {
        Object::Name(name) => Some(name.as_slice()),
        _ => None,
    }
}

fn filters(doc: &Document, dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter").map(|o| deref(doc, o)) {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|o| match deref(doc, o) {
                Object::Name(name) => Some(name.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Resources of a page, following inheritance through the page tree.
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut dict = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_PAGE_TREE_DEPTH {
        if let Ok(res) = dict.get(b"Resources") {
            if let Object::Dictionary(d) = deref(doc, res) {
                return Some(d);
            }
        }
        let parent = match dict.get(b"Parent").ok()? {
            Object::Reference(id) => *id,
            _ => return None,
        };
        dict = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn image_streams<'a>(doc: &'a Document, resources: &'a Dictionary) -> Vec<&'a Stream> {
    let Some(Object::Dictionary(xobjects)) = resources.get(b"XObject").ok().map(|o| deref(doc, o)) else {
        return Vec::new();
    };
    xobjects
        .iter()
        .filter_map(|(_, obj)| match deref(doc, obj) {
            Object::Stream(stream) => Some(stream),
            _ => None,
        })
        .filter(|stream| dict_name(doc, &stream.dict, b"Subtype") == Some(b"Image".as_slice()))
        .collect()
}

fn area(doc: &Document, stream: &Stream) -> i64 {
    let w = dict_int(doc, &stream.dict, b"Width").unwrap_or(0);
    let h = dict_int(doc, &stream.dict, b"Height").unwrap_or(0);
    w.saturating_mul(h)
}

/// Turn an image XObject into encoded bytes.
fn encode(doc: &Document, path: &Path, stream: &Stream) -> Result<Thumbnail, ThumbnailError> {
    let filters = filters(doc, &stream.dict);
    match filters.last().map(Vec::as_slice) {
        Some(b"DCTDecode") if filters.len() == 1 => {
            return Ok(Thumbnail::with_mime(stream.content.clone(), "image/jpeg"));
        }
        Some(b"JPXDecode") if filters.len() == 1 => {
            return Ok(Thumbnail::with_mime(stream.content.clone(), "image/jp2"));
        }
        Some(b"FlateDecode") | None => {}
        Some(other) => {
            return Err(ThumbnailError::Unsupported(format!(
                "PDF image filter {}",
                String::from_utf8_lossy(other)
            )));
        }
    }

    let raw = if filters.is_empty() {
        stream.content.clone()
    } else {
        stream.decompressed_content().map_err(|e| pdf_err(path, e))?
    };
    let width = u32::try_from(dict_int(doc, &stream.dict, b"Width").unwrap_or(0)).unwrap_or(0);
    let height = u32::try_from(dict_int(doc, &stream.dict, b"Height").unwrap_or(0)).unwrap_or(0);
    let bits = dict_int(doc, &stream.dict, b"BitsPerComponent").unwrap_or(8);
    if bits != 8 {
        return Err(ThumbnailError::Unsupported(format!("{bits}-bit PDF image")));
    }

    let mut png = Cursor::new(Vec::new());
    let written = match dict_name(doc, &stream.dict, b"ColorSpace") {
        Some(b"DeviceRGB") => RgbImage::from_raw(width, height, raw)
            .map(|img| img.write_to(&mut png, ImageFormat::Png)),
        Some(b"DeviceGray") => GrayImage::from_raw(width, height, raw)
            .map(|img| img.write_to(&mut png, ImageFormat::Png)),
        _ => return Err(ThumbnailError::Unsupported("PDF image color space".to_string())),
    };
    match written {
        Some(Ok(())) => Ok(Thumbnail::with_mime(png.into_inner(), "image/png")),
        Some(Err(e)) => Err(pdf_err(path, e)),
        None => Err(pdf_err(path, "image data shorter than its dimensions")),
    }
}

/// Largest raster image on the first page of the PDF at `path`.
pub fn extract_first_page_image(path: &Path) -> Result<Thumbnail, ThumbnailError> {
    extract_page_image(path, 1)
}

/// Largest raster image on page `page_no` (1-based).
pub fn extract_page_image(path: &Path, page_no: u32) -> Result<Thumbnail, ThumbnailError> {
    let doc = Document::load(path).map_err(|e| pdf_err(path, e))?;
    let no_image = || ThumbnailError::NoImage(format!("{} page {}", path.display(), page_no));

    let page_id = *doc.get_pages().get(&page_no).ok_or_else(no_image)?;
    let resources = page_resources(&doc, page_id).ok_or_else(no_image)?;
    let best = image_streams(&doc, resources)
        .into_iter()
        .rev()
        .max_by_key(|stream| area(&doc, stream))
        .ok_or_else(no_image)?;

    log::debug!("Using page {} image of {}", page_no, path.display());
    encode(&doc, path, best)
}

/// Number of pages in the PDF at `path`.
pub fn page_count(path: &Path) -> Result<usize, ThumbnailError> {
    let doc = Document::load(path).map_err(|e| pdf_err(path, e))?;
    Ok(doc.get_pages().len())
}
