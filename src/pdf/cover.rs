//! Cover page listing the selected questions.
//!
//! Drawn directly as content streams using the standard Helvetica fonts, so
//! no font files are embedded. Long lists continue onto further A4 pages with
//! the banner repeated and numbering carried over.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const BANNER_HEIGHT: f32 = 80.0;
const LIST_X: f32 = 60.0;
const RIGHT_MARGIN: f32 = 40.0;
const LINE_STEP: f32 = 18.0;
const BOTTOM_MARGIN: f32 = 60.0;
const ITEM_SIZE: f32 = 12.0;

const REGULAR: &str = "F1";
const BOLD: &str = "F2";

#[derive(Debug, Clone, Copy)]
struct Rgb(f32, f32, f32);

const MINT_DARK: Rgb = Rgb(0.216, 0.588, 0.514); // #379683
const GRAY: Rgb = Rgb(0.5, 0.5, 0.5);
const WHITE: Rgb = Rgb(1.0, 1.0, 1.0);
const BLACK: Rgb = Rgb(0.0, 0.0, 0.0);

#[derive(Debug, Clone)]
pub struct CoverStyle {
    pub heading: String,
    pub generated_at: DateTime<Local>,
}

impl CoverStyle {
    pub fn new(heading: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            generated_at: Local::now(),
        }
    }
}

/// Render the cover: banner, timestamp and a numbered list of `titles`.
///
/// Always yields at least one page, even for an empty list.
pub fn render_cover(titles: &[String], style: &CoverStyle) -> Result<Document> {
    let mut pages = vec![first_page(style)];
    let mut y = PAGE_HEIGHT - 155.0;

    for (i, title) in titles.iter().enumerate() {
        if y < BOTTOM_MARGIN {
            pages.push(continuation_page());
            y = PAGE_HEIGHT - 110.0;
        }
        let line = format!("{}. {}", i + 1, title);
        let max_width = PAGE_WIDTH - LIST_X - RIGHT_MARGIN;
        let current = pages.last_mut().context("cover has no pages")?;
        show_text(
            current,
            REGULAR,
            ITEM_SIZE,
            LIST_X,
            y,
            BLACK,
            &fit_to_width(&line, ITEM_SIZE, max_width),
        );
        y -= LINE_STEP;
    }

    build_document(pages)
}

fn first_page(style: &CoverStyle) -> Vec<Operation> {
    let mut ops = Vec::new();
    banner(&mut ops);

    let heading = fit_to_width(&style.heading, 22.0, PAGE_WIDTH - 2.0 * RIGHT_MARGIN);
    show_centred(&mut ops, BOLD, 22.0, PAGE_HEIGHT - 50.0, WHITE, &heading);

    let stamp = format!(
        "Generated on {}",
        style.generated_at.format("%d %b %Y, %H:%M")
    );
    show_centred(&mut ops, REGULAR, 11.0, PAGE_HEIGHT - 95.0, GRAY, &stamp);

    show_text(
        &mut ops,
        BOLD,
        14.0,
        40.0,
        PAGE_HEIGHT - 130.0,
        MINT_DARK,
        "Included Questions:",
    );
    ops
}

fn continuation_page() -> Vec<Operation> {
    let mut ops = Vec::new();
    banner(&mut ops);
    ops
}

fn banner(ops: &mut Vec<Operation>) {
    ops.push(fill(MINT_DARK));
    ops.push(Operation::new(
        "re",
        vec![
            Object::Real(0.0),
            Object::Real(PAGE_HEIGHT - BANNER_HEIGHT),
            Object::Real(PAGE_WIDTH),
            Object::Real(BANNER_HEIGHT),
        ],
    ));
    ops.push(Operation::new("f", vec![]));
}

fn fill(color: Rgb) -> Operation {
    Operation::new(
        "rg",
        vec![
            Object::Real(color.0),
            Object::Real(color.1),
            Object::Real(color.2),
        ],
    )
}

fn show_text(
    ops: &mut Vec<Operation>,
    font: &str,
    size: f32,
    x: f32,
    y: f32,
    color: Rgb,
    text: &str,
) {
    ops.push(fill(color));
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new("Tf", vec![font.into(), Object::Real(size)]));
    ops.push(Operation::new("Td", vec![Object::Real(x), Object::Real(y)]));
    ops.push(Operation::new(
        "Tj",
        vec![Object::String(win_ansi(text), StringFormat::Literal)],
    ));
    ops.push(Operation::new("ET", vec![]));
}

fn show_centred(ops: &mut Vec<Operation>, font: &str, size: f32, y: f32, color: Rgb, text: &str) {
    let width = estimate_width(text, size, font == BOLD);
    let x = ((PAGE_WIDTH - width) / 2.0).max(0.0);
    show_text(ops, font, size, x, y, color, text);
}

/// Rough Helvetica advance: good enough for centring and truncation.
fn estimate_width(text: &str, size: f32, bold: bool) -> f32 {
    let em = if bold { 0.58 } else { 0.52 };
    text.chars().count() as f32 * size * em
}

fn fit_to_width(text: &str, size: f32, max_width: f32) -> String {
    if estimate_width(text, size, false) <= max_width {
        return text.to_string();
    }
    let keep = ((max_width / (size * 0.52)) as usize).saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// Encode for the standard fonts' WinAnsiEncoding. Characters outside it become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            c if c.is_control() => b' ',
            c if (c as u32) < 0x80 => c as u8,
            c if (0xA0..=0xFF).contains(&(c as u32)) => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

fn font(base: &str) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base,
        "Encoding" => "WinAnsiEncoding",
    }
}

fn build_document(pages: Vec<Vec<Operation>>) -> Result<Document> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let regular_id = doc.add_object(font("Helvetica"));
    let bold_id = doc.add_object(font("Helvetica-Bold"));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            REGULAR => regular_id,
            BOLD => bold_id,
        },
    });

    let mut kids: Vec<ObjectId> = Vec::new();
    for operations in pages {
        let content = Content { operations };
        let encoded = content.encode().context("Failed to encode cover content")?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), encoded));
        kids.push(doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(PAGE_WIDTH),
                Object::Real(PAGE_HEIGHT),
            ],
            "Resources" => resources_id,
            "Contents" => content_id,
        }));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids.into_iter().map(Object::Reference).collect::<Vec<_>>(),
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    Ok(doc)
}
