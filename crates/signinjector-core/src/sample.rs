//! Demo documents: the A4 sample served by default and blank multi-page files

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::coords::{PagePoints, PdfRect};
use crate::error::CoreError;

/// Guide box drawn on the sample page where a signature is expected
pub const SAMPLE_SIGNATURE_BOX: PdfRect = PdfRect {
    x: 50.0,
    y: 500.0,
    width: 250.0,
    height: 60.0,
};

fn escape_pdf_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)")
}

fn real(v: f64) -> Object {
    Object::Real(v as f32)
}

fn text(x: f64, y: f64, size: f64, gray: f64, line: &str) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("rg", vec![real(gray), real(gray), real(gray)]),
        Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), real(size)]),
        Operation::new("Td", vec![real(x), real(y)]),
        Operation::new(
            "Tj",
            vec![Object::String(
                escape_pdf_string(line).into_bytes(),
                StringFormat::Literal,
            )],
        ),
        Operation::new("ET", vec![]),
    ]
}

/// Builds a document from per-page content operations
///
/// All pages share one Helvetica font resource (`/F1`) through the page tree.
fn build_document(size: PagePoints, pages: Vec<Vec<Operation>>) -> Result<Vec<u8>, CoreError> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => Object::Reference(font_id) },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations }
            .encode()
            .map_err(|e| CoreError::SerializationError(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id: ObjectId = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "Contents" => Object::Reference(content_id),
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => Object::Reference(resources_id),
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                real(size.width_pts),
                real(size.height_pts),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| CoreError::SerializationError(e.to_string()))?;
    Ok(buffer)
}

/// One-page A4 document with instructions and a "Sign here" guide box
pub fn sample_document() -> Result<Vec<u8>, CoreError> {
    let mut ops = Vec::new();
    ops.extend(text(50.0, 780.0, 18.0, 0.1, "Sample Signature Test Document"));
    ops.extend(text(
        50.0,
        740.0,
        12.0,
        0.0,
        "This is a demo PDF used to test digital signing.",
    ));
    ops.extend(text(50.0, 700.0, 14.0, 0.0, "Instructions:"));

    let steps = [
        "1. Click 'Signature' to place a signature box.",
        "2. Open the signature pad and draw.",
        "3. Click 'Sign & Burn' to embed the signature.",
    ];
    for (i, step) in steps.iter().enumerate() {
        ops.extend(text(50.0, 660.0 - 16.0 * i as f64, 11.0, 0.0, step));
    }

    let guide = SAMPLE_SIGNATURE_BOX;
    ops.extend([
        Operation::new("q", vec![]),
        Operation::new("RG", vec![real(0.2), real(0.6), real(0.9)]),
        Operation::new("w", vec![Object::Integer(1)]),
        Operation::new(
            "re",
            vec![
                real(guide.x),
                real(guide.y),
                real(guide.width),
                real(guide.height),
            ],
        ),
        Operation::new("S", vec![]),
        Operation::new("Q", vec![]),
    ]);
    ops.extend(text(60.0, 525.0, 10.0, 0.4, "Sign here"));

    build_document(PagePoints::a4(), vec![ops])
}

/// Document with `page_count` pages, each labelled with its page number
pub fn blank_document(page_count: u32, size: PagePoints) -> Result<Vec<u8>, CoreError> {
    let pages = (1..=page_count)
        .map(|n| text(72.0, size.height_pts - 72.0, 12.0, 0.0, &format!("Page {}", n)))
        .collect();
    build_document(size, pages)
}
