//! Burn a signature image into one or more pages of a PDF
//!
//! The document is loaded once and threaded through the placements as an
//! owned value: each step takes the document, draws one stamp and hands it
//! to the next. Any failing step aborts the whole batch, so callers either
//! get a fully stamped document or an error.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

use crate::error::CoreError;
use crate::fit::fit_centered;
use crate::placement::Placement;
use crate::raster::SignatureImage;

/// Guard against malformed page trees whose Parent links form a cycle
const MAX_TREE_DEPTH: usize = 64;

/// An embedded signature image that placements can reference
#[derive(Debug, Clone, Copy)]
pub struct SignatureStamp {
    pub image_id: ObjectId,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl SignatureStamp {
    /// Embed `image` into `doc` once; every placement reuses the same XObject
    pub fn embed(doc: &mut Document, image: &SignatureImage) -> Self {
        Self {
            image_id: image.embed(doc),
            pixel_width: image.width as f64,
            pixel_height: image.height as f64,
        }
    }
}

/// Where a dictionary we are about to extend lives
enum DictSlot {
    Inline,
    Indirect(ObjectId),
}

/// Composite `signature_image` into `document` at every placement, in order
///
/// The image is decoded as PNG, or as JPEG if that fails. Placement page
/// numbers are 1-based; numbers outside the document fall back to the first
/// page. The caller's buffers are never modified.
pub fn burn_signature(
    document: &[u8],
    signature_image: &[u8],
    placements: &[Placement],
) -> Result<Vec<u8>, CoreError> {
    if placements.is_empty() {
        return Ok(document.to_vec());
    }

    let mut doc =
        Document::load_mem(document).map_err(|e| CoreError::ParseError(e.to_string()))?;
    if doc.get_pages().is_empty() {
        return Err(CoreError::ParseError("Document has no pages".into()));
    }

    let image = SignatureImage::decode(signature_image)?;
    debug!(
        format = ?image.format,
        width = image.width,
        height = image.height,
        "Decoded signature image"
    );

    let stamp = SignatureStamp::embed(&mut doc, &image);
    let mut doc = placements
        .iter()
        .try_fold(doc, |doc, placement| apply_placement(doc, &stamp, placement))?;

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| CoreError::SerializationError(e.to_string()))?;
    Ok(output)
}

/// Resolve a 1-based page number, falling back to the first page when out of range
pub fn resolve_page(doc: &Document, page: u32) -> Result<(u32, ObjectId), CoreError> {
    let pages = doc.get_pages();
    if let Some(id) = pages.get(&page) {
        return Ok((page, *id));
    }
    pages
        .iter()
        .next()
        .map(|(number, id)| (*number, *id))
        .ok_or_else(|| CoreError::ParseError("Document has no pages".into()))
}

/// Draw one stamp and return the updated document
pub fn apply_placement(
    mut doc: Document,
    stamp: &SignatureStamp,
    placement: &Placement,
) -> Result<Document, CoreError> {
    let (page_number, page_id) = resolve_page(&doc, placement.page)?;
    if page_number != placement.page {
        debug!(
            requested = placement.page,
            "Page out of range, stamping first page"
        );
    }

    let fitted = fit_centered(stamp.pixel_width, stamp.pixel_height, &placement.rect())?;
    let name = register_xobject(&mut doc, page_id, stamp.image_id)?;

    let draw = format!(
        "\nQ\nq\n{:.4} 0 0 {:.4} {:.4} {:.4} cm\n/{} Do\nQ\n",
        fitted.width, fitted.height, fitted.x, fitted.y, name
    );
    append_page_content(&mut doc, page_id, draw.into_bytes())?;

    debug!(
        page = page_number,
        x = fitted.x,
        y = fitted.y,
        width = fitted.width,
        height = fitted.height,
        "Placed signature"
    );
    Ok(doc)
}

fn inherited_resources(doc: &Document, page: &Dictionary) -> Option<Dictionary> {
    let mut parent = page.get(b"Parent").and_then(|p| p.as_reference()).ok();
    let mut depth = 0;

    while let Some(node_id) = parent {
        if depth >= MAX_TREE_DEPTH {
            break;
        }
        let node = doc.get_dictionary(node_id).ok()?;
        match node.get(b"Resources") {
            Ok(Object::Reference(id)) => return doc.get_dictionary(*id).ok().cloned(),
            Ok(Object::Dictionary(dict)) => return Some(dict.clone()),
            _ => {}
        }
        parent = node.get(b"Parent").and_then(|p| p.as_reference()).ok();
        depth += 1;
    }
    None
}

fn page_resources(doc: &Document, page_id: ObjectId) -> Result<(Dictionary, DictSlot), CoreError> {
    let page = doc.get_dictionary(page_id)?;
    match page.get(b"Resources") {
        Ok(Object::Reference(id)) => Ok((doc.get_dictionary(*id)?.clone(), DictSlot::Indirect(*id))),
        Ok(Object::Dictionary(dict)) => Ok((dict.clone(), DictSlot::Inline)),
        // Inherited resources are copied onto the page so extending them
        // does not leak into sibling pages
        _ => Ok((
            inherited_resources(doc, page).unwrap_or_else(Dictionary::new),
            DictSlot::Inline,
        )),
    }
}

fn fresh_xobject_name(xobjects: &Dictionary) -> Vec<u8> {
    let mut n = 0usize;
    loop {
        let name = format!("SigImg{}", n).into_bytes();
        if !xobjects.has(&name) {
            return name;
        }
        n += 1;
    }
}

/// Add `image_id` to the page's XObject resources under an unused name
fn register_xobject(
    doc: &mut Document,
    page_id: ObjectId,
    image_id: ObjectId,
) -> Result<String, CoreError> {
    let (mut resources, resources_slot) = page_resources(doc, page_id)?;

    let (mut xobjects, xobjects_slot) = match resources.get(b"XObject") {
        Ok(Object::Reference(id)) => (doc.get_dictionary(*id)?.clone(), DictSlot::Indirect(*id)),
        Ok(Object::Dictionary(dict)) => (dict.clone(), DictSlot::Inline),
        _ => (Dictionary::new(), DictSlot::Inline),
    };

    let name = fresh_xobject_name(&xobjects);
    xobjects.set(name.clone(), Object::Reference(image_id));

    match xobjects_slot {
        DictSlot::Indirect(id) => *doc.get_object_mut(id)? = Object::Dictionary(xobjects),
        DictSlot::Inline => resources.set("XObject", Object::Dictionary(xobjects)),
    }

    match resources_slot {
        DictSlot::Indirect(id) => *doc.get_object_mut(id)? = Object::Dictionary(resources),
        DictSlot::Inline => doc
            .get_dictionary_mut(page_id)?
            .set("Resources", Object::Dictionary(resources)),
    }

    String::from_utf8(name).map_err(|e| CoreError::OperationError(e.to_string()))
}

/// Wrap existing content in `q`/`Q` and append `draw` after it
fn append_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    draw: Vec<u8>,
) -> Result<(), CoreError> {
    let current = doc.get_dictionary(page_id)?.get(b"Contents").ok().cloned();
    let existing = match current {
        Some(Object::Reference(id)) => match doc.get_object(id)? {
            Object::Array(items) => items.clone(),
            _ => vec![Object::Reference(id)],
        },
        Some(Object::Array(items)) => items,
        // Content streams must be indirect; move an inline one out first
        Some(Object::Stream(stream)) => vec![Object::Reference(doc.add_object(stream))],
        _ => Vec::new(),
    };

    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let draw_id = doc.add_object(Stream::new(Dictionary::new(), draw));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(save_id));
    contents.extend(existing);
    contents.push(Object::Reference(draw_id));

    doc.get_dictionary_mut(page_id)?
        .set("Contents", Object::Array(contents));
    Ok(())
}
