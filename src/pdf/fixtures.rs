//! Generated PDFs for tests. Every page carries a `MARK:<tag>` text operator
//! so tests can read back which source page ended up where.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};

pub const MARKER_PREFIX: &str = "MARK:";

/// A PDF with one page per tag. Pages inherit `MediaBox` and `Resources`
/// from the page tree node, which exercises attribute flattening on merge.
pub fn marked_pdf(tags: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });

    let mut kids = Vec::new();
    for tag in tags {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), Object::Integer(12)]),
                Operation::new("Td", vec![Object::Integer(72), Object::Integer(720)]),
                Operation::new(
                    "Tj",
                    vec![Object::string_literal(format!("{MARKER_PREFIX}{tag}"))],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
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
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Every text string shown on each page, in page order.
pub fn page_texts(bytes: &[u8]) -> Vec<Vec<String>> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .into_values()
        .map(|page_id| {
            let raw = doc.get_page_content(page_id).unwrap();
            Content::decode(&raw)
                .unwrap()
                .operations
                .into_iter()
                .filter(|op| op.operator == "Tj")
                .flat_map(|op| op.operands)
                .filter_map(|operand| match operand {
                    Object::String(bytes, _) => {
                        Some(bytes.iter().map(|&b| b as char).collect::<String>())
                    }
                    _ => None,
                })
                .collect()
        })
        .collect()
}

/// The marker tag of each page, or `None` for pages without one (cover pages).
pub fn page_markers(bytes: &[u8]) -> Vec<Option<String>> {
    page_texts(bytes)
        .into_iter()
        .map(|texts| {
            texts
                .into_iter()
                .find_map(|t| t.strip_prefix(MARKER_PREFIX).map(str::to_string))
        })
        .collect()
}
