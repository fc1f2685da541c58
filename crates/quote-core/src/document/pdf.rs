//! A4 page painter built directly on lopdf
//!
//! Text uses the standard Helvetica and Helvetica-Bold Type1 fonts with
//! WinAnsi encoding, so no font files are embedded.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use super::{Block, RenderError, DOCUMENT_TITLE};

const PAGE_WIDTH: f32 = 595.28;
const PAGE_HEIGHT: f32 = 841.89;
const MARGIN: f32 = 48.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const TITLE_SIZE: f32 = 21.0;
const HEADING_SIZE: f32 = 13.0;
const BODY_SIZE: f32 = 10.0;
const LEADING: f32 = 1.2;
const BODY_LINE: f32 = BODY_SIZE * LEADING;

const REGULAR: &str = "F1";
const BOLD: &str = "F2";

type Rgb = (f32, f32, f32);

const INK: Rgb = (0.067, 0.067, 0.067); // #111111
const MUTED: Rgb = (0.420, 0.447, 0.502); // #6b7280
const ACCENT: Rgb = (0.106, 0.184, 0.420); // #1b2f6b

/// Paint blocks onto as many A4 pages as needed and serialize the PDF
pub fn paint(blocks: &[Block]) -> Result<Vec<u8>, RenderError> {
    let mut painter = Painter::new();
    for block in blocks {
        painter.block(block);
    }
    build_document(painter.pages)
}

struct Painter {
    pages: Vec<Vec<Operation>>,
    /// Top of the next line, in PDF user space
    y: f32,
}

impl Painter {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn block(&mut self, block: &Block) {
        match block {
            Block::Title(text) => {
                self.paragraph(REGULAR, TITLE_SIZE, INK, text);
                self.gap(0.25);
            }
            Block::Meta(text) => self.paragraph(REGULAR, BODY_SIZE, MUTED, text),
            Block::Heading(text) => {
                self.paragraph(BOLD, HEADING_SIZE, ACCENT, text);
                self.gap(0.35);
            }
            Block::Field { label, value } => self.field(label, value),
            Block::Text(text) => self.paragraph(REGULAR, BODY_SIZE, INK, text),
            Block::Gap(lines) => self.gap(f32::from(*lines)),
        }
    }

    fn gap(&mut self, lines: f32) {
        self.y -= lines * BODY_LINE;
    }

    /// Reserve one line of `size` and return its baseline
    fn next_line(&mut self, size: f32) -> f32 {
        let height = size * LEADING;
        if self.y - height < MARGIN {
            self.pages.push(Vec::new());
            self.y = PAGE_HEIGHT - MARGIN;
        }
        let baseline = self.y - size;
        self.y -= height;
        baseline
    }

    fn paragraph(&mut self, font: &str, size: f32, color: Rgb, text: &str) {
        for line in text.split('\n') {
            for wrapped in wrap(line, CONTENT_WIDTH, CONTENT_WIDTH, size, font == BOLD) {
                let baseline = self.next_line(size);
                self.show(font, size, color, MARGIN, baseline, &wrapped);
            }
        }
    }

    /// Bold `"Label: "` with the value continuing on the same line
    fn field(&mut self, label: &str, value: &str) {
        let label = format!("{label}: ");
        let indent = text_width(&label, BODY_SIZE, true);

        let baseline = self.next_line(BODY_SIZE);
        self.show(BOLD, BODY_SIZE, INK, MARGIN, baseline, &label);

        let mut first = true;
        for paragraph in value.split('\n') {
            let first_width = if first {
                CONTENT_WIDTH - indent
            } else {
                CONTENT_WIDTH
            };
            for wrapped in wrap(paragraph, first_width, CONTENT_WIDTH, BODY_SIZE, false) {
                if first {
                    self.show(REGULAR, BODY_SIZE, INK, MARGIN + indent, baseline, &wrapped);
                    first = false;
                } else {
                    let next = self.next_line(BODY_SIZE);
                    self.show(REGULAR, BODY_SIZE, INK, MARGIN, next, &wrapped);
                }
            }
        }
    }

    fn show(&mut self, font: &str, size: f32, color: Rgb, x: f32, baseline: f32, text: &str) {
        if text.is_empty() {
            return;
        }
        let ops = [
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(font.as_bytes().to_vec()), size.into()]),
            Operation::new("rg", vec![color.0.into(), color.1.into(), color.2.into()]),
            Operation::new("Td", vec![x.into(), baseline.into()]),
            Operation::new(
                "Tj",
                vec![Object::String(win_ansi(text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ];
        if let Some(page) = self.pages.last_mut() {
            page.extend(ops);
        }
    }
}

fn build_document(pages: Vec<Vec<Operation>>) -> Result<Vec<u8>, RenderError> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(font("Helvetica"));
    let bold_id = doc.add_object(font("Helvetica-Bold"));
    let fonts = Dictionary::from_iter(vec![
        (REGULAR, Object::Reference(regular_id)),
        (BOLD, Object::Reference(bold_id)),
    ]);
    let resources_id = doc.add_object(Dictionary::from_iter(vec![(
        "Font",
        Object::Dictionary(fonts),
    )]));

    let mut page_ids: Vec<ObjectId> = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations }
            .encode()
            .map_err(|e| RenderError::Pdf(format!("Content encoding failed: {}", e)))?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content));

        let page = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    PAGE_WIDTH.into(),
                    PAGE_HEIGHT.into(),
                ]),
            ),
            ("Contents", Object::Reference(content_id)),
            ("Resources", Object::Reference(resources_id)),
        ]);
        page_ids.push(doc.add_object(page));
    }

    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(page_ids.len() as i64)),
        (
            "Kids",
            Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
        ),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    let info_id = doc.add_object(Dictionary::from_iter(vec![
        (
            "Title",
            Object::String(DOCUMENT_TITLE.as_bytes().to_vec(), StringFormat::Literal),
        ),
        (
            "Producer",
            Object::String(
                format!("quote-core {}", crate::VERSION).into_bytes(),
                StringFormat::Literal,
            ),
        ),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc.trailer.set("Info", Object::Reference(info_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| RenderError::Pdf(format!("Save failed: {}", e)))?;

    Ok(buffer)
}

fn font(base: &str) -> Dictionary {
    Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(base.as_bytes().to_vec())),
        ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
    ])
}

/// Encode text for a WinAnsi simple font. Unmappable characters become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\t' | '\r' => b' ',
            '€' => 0x80,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            c if (' '..='~').contains(&c) || ('\u{a0}'..='\u{ff}').contains(&c) => c as u8,
            _ => b'?',
        })
        .collect()
}

/// Approximate Helvetica advance width in em units
fn char_em(c: char) -> f32 {
    match c {
        'i' | 'j' | 'l' | '\'' | '|' => 0.22,
        ' ' | '.' | ',' | ':' | ';' | '!' | 'I' | 'f' | 't' | 'r' | '/' | '(' | ')' | '-' => 0.3,
        'm' | 'w' | 'M' | 'W' | '@' | '%' => 0.85,
        'A'..='Z' => 0.68,
        _ => 0.56,
    }
}

fn text_width(text: &str, size: f32, bold: bool) -> f32 {
    let em: f32 = text.chars().map(char_em).sum();
    let weight = if bold { 1.06 } else { 1.0 };
    em * size * weight
}

/// Greedy word wrap. Words wider than a whole line are broken by character.
fn wrap(text: &str, first_width: f32, width: f32, size: f32, bold: bool) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut limit = first_width;

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if text_width(&candidate, size, bold) <= limit {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            limit = width;
        }

        if text_width(word, size, bold) <= limit {
            current = word.to_string();
            continue;
        }

        for c in word.chars() {
            current.push(c);
            if text_width(&current, size, bold) > limit && current.chars().count() > 1 {
                current.pop();
                lines.push(std::mem::replace(&mut current, c.to_string()));
                limit = width;
            }
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}
