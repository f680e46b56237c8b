use chrono::Local;
use lopdf::{
    content::{Content, Operation},
    dictionary, Document, Object, Stream, StringFormat,
};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

use crate::models::employee::{format_amount, EmployeeRecord};

pub const ORGANIZATION: &str = "GWAVAVA ENTERPRISE";
const CAPTION: &str = "Payslip for the Month";

// A4 in points.
const PAGE_WIDTH: f32 = 595.28;
const PAGE_HEIGHT: f32 = 841.89;
const MM: f32 = 72.0 / 25.4;
const MARGIN: f32 = 10.0 * MM;

// Courier advances are 600/1000 em for every glyph.
const COURIER_ADVANCE: f32 = 0.6;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("failed to build PDF: {0}")]
    Lopdf(#[from] lopdf::Error),

    #[error("failed to write PDF: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Regular,
    Bold,
    Italic,
}

impl FontStyle {
    fn resource_name(self) -> &'static str {
        match self {
            FontStyle::Regular => "F1",
            FontStyle::Bold => "F2",
            FontStyle::Italic => "F3",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// One vertical slot of the page, laid out top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Text {
        text: String,
        style: FontStyle,
        size: f32,
        color: (f32, f32, f32),
        align: Align,
        height: f32,
    },
    Rule {
        height: f32,
    },
    Gap(f32),
}

const BLACK: (f32, f32, f32) = (0.0, 0.0, 0.0);
const NAVY: (f32, f32, f32) = (0.0, 0.2, 0.4);
const GREY: (f32, f32, f32) = (0.5, 0.5, 0.5);

fn text(
    text: impl Into<String>,
    style: FontStyle,
    size: f32,
    align: Align,
    height_mm: f32,
) -> Block {
    Block::Text {
        text: text.into(),
        style,
        size,
        color: BLACK,
        align,
        height: height_mm * MM,
    }
}

fn header_blocks() -> Vec<Block> {
    vec![
        Block::Text {
            text: ORGANIZATION.to_string(),
            style: FontStyle::Bold,
            size: 18.0,
            color: NAVY,
            align: Align::Center,
            height: 10.0 * MM,
        },
        Block::Text {
            text: CAPTION.to_string(),
            style: FontStyle::Italic,
            size: 12.0,
            color: NAVY,
            align: Align::Center,
            height: 10.0 * MM,
        },
        Block::Gap(5.0 * MM),
        Block::Rule { height: 2.0 * MM },
        Block::Gap(5.0 * MM),
    ]
}

/// The body of a payslip: identity block, salary block and net line.
pub fn payslip_blocks(record: &EmployeeRecord, net_salary: f64) -> Vec<Block> {
    let mut blocks = header_blocks();
    blocks.extend([
        text("Employee Details:", FontStyle::Bold, 12.0, Align::Left, 10.0),
        text(
            format!("Employee ID   : {}", record.id),
            FontStyle::Regular,
            12.0,
            Align::Left,
            8.0,
        ),
        text(
            format!("Name          : {}", record.name),
            FontStyle::Regular,
            12.0,
            Align::Left,
            8.0,
        ),
        Block::Rule { height: 8.0 * MM },
        text("Salary Details:", FontStyle::Bold, 12.0, Align::Left, 10.0),
        text(
            format!("Basic Salary  : {}", format_amount(record.basic_salary)),
            FontStyle::Regular,
            12.0,
            Align::Left,
            8.0,
        ),
        text(
            format!("Allowance     : {}", format_amount(record.allowance)),
            FontStyle::Regular,
            12.0,
            Align::Left,
            8.0,
        ),
        text(
            format!("Deductions    : {}", format_amount(record.deductions)),
            FontStyle::Regular,
            12.0,
            Align::Left,
            8.0,
        ),
        Block::Rule { height: 2.0 * MM },
        text(
            format!("Net Salary    : {}", format_amount(net_salary)),
            FontStyle::Bold,
            12.0,
            Align::Right,
            10.0,
        ),
    ]);
    blocks
}

fn footer_block(page_no: usize) -> Block {
    Block::Text {
        text: format!("Page {}", page_no),
        style: FontStyle::Italic,
        size: 10.0,
        color: GREY,
        align: Align::Center,
        height: 10.0 * MM,
    }
}

/// Builtin fonts use WinAnsiEncoding (Windows-1252): one byte per glyph.
/// Characters with no cp1252 glyph, including the C1 controls, become '?'.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80, // euro
            '\u{201A}' => 0x82, // single low-9 quote
            '\u{0192}' => 0x83, // florin
            '\u{201E}' => 0x84, // double low-9 quote
            '\u{2026}' => 0x85, // ellipsis
            '\u{2020}' => 0x86, // dagger
            '\u{2021}' => 0x87, // double dagger
            '\u{02C6}' => 0x88, // circumflex
            '\u{2030}' => 0x89, // per mille
            '\u{0160}' => 0x8A, // S caron
            '\u{2039}' => 0x8B, // single left angle quote
            '\u{0152}' => 0x8C, // OE ligature
            '\u{017D}' => 0x8E, // Z caron
            '\u{2018}' => 0x91, // left single quote
            '\u{2019}' => 0x92, // right single quote
            '\u{201C}' => 0x93, // left double quote
            '\u{201D}' => 0x94, // right double quote
            '\u{2022}' => 0x95, // bullet
            '\u{2013}' => 0x96, // en-dash
            '\u{2014}' => 0x97, // em-dash
            '\u{02DC}' => 0x98, // small tilde
            '\u{2122}' => 0x99, // trademark
            '\u{0161}' => 0x9A, // s caron
            '\u{203A}' => 0x9B, // single right angle quote
            '\u{0153}' => 0x9C, // oe ligature
            '\u{017E}' => 0x9E, // z caron
            '\u{0178}' => 0x9F, // Y diaeresis
            '\u{0080}'..='\u{009F}' => b'?',
            c if (c as u32) < 256 => c as u8,
            _ => b'?',
        })
        .collect()
}

/// Info dictionary text: plain literal for ASCII, UTF-16BE with a BOM otherwise.
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

fn real(value: f32) -> Object {
    Object::Real(value)
}

fn paint_block(ops: &mut Vec<Operation>, block: &Block, top: f32) {
    let content_width = PAGE_WIDTH - 2.0 * MARGIN;

    match block {
        Block::Text {
            text,
            style,
            size,
            color,
            align,
            height,
        } => {
            let bytes = encode_win_ansi(text);
            let width = bytes.len() as f32 * size * COURIER_ADVANCE;
            let x = match align {
                Align::Left => MARGIN,
                Align::Center => MARGIN + (content_width - width) / 2.0,
                Align::Right => PAGE_WIDTH - MARGIN - width,
            };
            // Vertically centre the baseline inside the slot.
            let baseline = top - (height + size * 0.6) / 2.0;

            ops.push(Operation::new("BT", vec![]));
            ops.push(Operation::new(
                "Tf",
                vec![Object::Name(style.resource_name().as_bytes().to_vec()), real(*size)],
            ));
            ops.push(Operation::new("rg", vec![real(color.0), real(color.1), real(color.2)]));
            ops.push(Operation::new("Td", vec![real(x), real(baseline)]));
            ops.push(Operation::new(
                "Tj",
                vec![Object::String(bytes, StringFormat::Literal)],
            ));
            ops.push(Operation::new("ET", vec![]));
        }
        Block::Rule { height } => {
            let y = top - height / 2.0;
            ops.push(Operation::new("w", vec![real(0.5)]));
            ops.push(Operation::new("RG", vec![real(0.0), real(0.0), real(0.0)]));
            ops.push(Operation::new("m", vec![real(MARGIN), real(y)]));
            ops.push(Operation::new("l", vec![real(PAGE_WIDTH - MARGIN), real(y)]));
            ops.push(Operation::new("S", vec![]));
        }
        Block::Gap(_) => {}
    }
}

fn block_height(block: &Block) -> f32 {
    match block {
        Block::Text { height, .. } | Block::Rule { height } | Block::Gap(height) => *height,
    }
}

fn font_object(base_font: &str) -> Object {
    Object::Dictionary(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => Object::Name(base_font.as_bytes().to_vec()),
        "Encoding" => "WinAnsiEncoding",
    })
}

/// Renders the one-page payslip for `record` and returns the PDF bytes.
pub fn render_payslip(record: &EmployeeRecord, net_salary: f64) -> Result<Vec<u8>, PdfError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(font_object("Courier"));
    let bold_id = doc.add_object(font_object("Courier-Bold"));
    let italic_id = doc.add_object(font_object("Courier-Oblique"));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
            "F3" => italic_id,
        },
    });

    let mut operations = Vec::new();
    let mut cursor = PAGE_HEIGHT - MARGIN;
    for block in payslip_blocks(record, net_salary) {
        paint_block(&mut operations, &block, cursor);
        cursor -= block_height(&block);
    }

    let page_no = 1;
    paint_block(&mut operations, &footer_block(page_no), 15.0 * MM);

    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), real(PAGE_WIDTH), real(PAGE_HEIGHT)],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let created = Local::now().format("D:%Y%m%d%H%M%S").to_string();
    let info_id = doc.add_object(dictionary! {
        "Title" => text_string(&format!("Payslip - {}", record.name)),
        "Producer" => Object::string_literal(ORGANIZATION),
        "CreationDate" => Object::string_literal(created),
    });
    doc.trailer.set("Info", info_id);

    let mut output_buffer: Vec<u8> = Vec::new();
    doc.save_to(&mut output_buffer)?;
    info!(
        "Rendered payslip for employee '{}', size: {} bytes",
        record.id,
        output_buffer.len()
    );
    Ok(output_buffer)
}

/// `<name with spaces as underscores>_Payslip.pdf`. Path separators are
/// replaced too so the file always lands in the output directory.
pub fn payslip_file_name(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            other => other,
        })
        .collect();
    format!("{}_Payslip.pdf", stem)
}

/// Renders the payslip and writes it into `dir`, returning the file path.
pub fn write_payslip(
    dir: &Path,
    record: &EmployeeRecord,
    net_salary: f64,
) -> Result<PathBuf, PdfError> {
    let path = dir.join(payslip_file_name(&record.name));
    let bytes = render_payslip(record, net_salary)?;

    match fs::write(&path, &bytes) {
        Ok(()) => {
            info!("Saved payslip to {}", path.display());
            Ok(path)
        }
        Err(e) => {
            error!("Failed to write payslip {}: {}", path.display(), e);
            Err(e.into())
        }
    }
}

/// Text drawn on the first page, in paint order.
#[cfg(test)]
pub(crate) fn page_text(pdf: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(pdf).unwrap();
    let pages = doc.get_pages();
    let page_id = *pages.values().next().unwrap();
    let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();

    content
        .operations
        .iter()
        .filter(|op| op.operator == "Tj")
        .filter_map(|op| match op.operands.first() {
            Some(Object::String(bytes, _)) => Some(String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        })
        .collect()
}
