//! Content stream interpretation.
//!
//! Walks a page's operators keeping just enough graphics and text state to
//! place text runs and image draws on the page. Glyph widths are estimated
//! rather than read from font metrics, so boxes are approximate.

use crate::cmap::{ByteEncoding, FontDecoder, ToUnicodeMap};
use crate::layout::{BBox, PageLayout, TextBlock, TextSpan};
use crate::objects::{self, as_dict, as_stream, get, inherited, name, number, numbers};
use crate::text::estimate_advance;
use deck_core::{Error, Result};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashMap;
use std::rc::Rc;

/// Nesting limit for form XObjects.
const MAX_FORM_DEPTH: usize = 8;

/// US Letter, used when a page has no usable `MediaBox`.
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// TJ adjustments below this (in thousandths of an em) read as a word gap.
const SPACE_ADJUSTMENT: f64 = -250.0;

/// Glyph box extent relative to the baseline, in ems.
const ASCENT: f64 = 0.8;
const DESCENT: f64 = 0.2;

/// Line height in ems, for measuring baseline jumps.
const LINE_HEIGHT: f64 = 1.2;

/// A new line further than this many line heights away starts a new block.
const BLOCK_GAP: f64 = 1.5;

/// A new line whose font size differs by more than this factor starts a new block.
const SIZE_CHANGE: f64 = 1.3;

type Matrix = [f64; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// `a` applied first, then `b`.
fn multiply(a: &Matrix, b: &Matrix) -> Matrix {
    [
        a[0] * b[0] + a[1] * b[2],
        a[0] * b[1] + a[1] * b[3],
        a[2] * b[0] + a[3] * b[2],
        a[2] * b[1] + a[3] * b[3],
        a[4] * b[0] + a[5] * b[2] + b[4],
        a[4] * b[1] + a[5] * b[3] + b[5],
    ]
}

fn transform(m: &Matrix, x: f64, y: f64) -> (f64, f64) {
    (x * m[0] + y * m[2] + m[4], x * m[1] + y * m[3] + m[5])
}

fn translation(tx: f64, ty: f64) -> Matrix {
    [1.0, 0.0, 0.0, 1.0, tx, ty]
}

fn matrix_from(values: &[f64]) -> Option<Matrix> {
    match values {
        [a, b, c, d, e, f] => Some([*a, *b, *c, *d, *e, *f]),
        _ => None,
    }
}

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    font: Option<Rc<FontDecoder>>,
    font_size: f64,
    char_spacing: f64,
    word_spacing: f64,
    /// Horizontal scaling as a fraction.
    horizontal_scale: f64,
    leading: f64,
    rise: f64,
}

impl GraphicsState {
    fn new(ctm: Matrix) -> Self {
        Self {
            ctm,
            font: None,
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

/// Block under construction inside a `BT` ... `ET` text object.
///
/// One text object can hold a whole page, so a line that jumps far from the
/// previous baseline or changes size sharply closes the block and opens a
/// new one.
#[derive(Debug, Default)]
struct OpenBlock {
    spans: Vec<TextSpan>,
    bbox: Option<BBox>,
    line_break: bool,
    /// Page-space baseline and device font size of the last span.
    last_line: Option<(f64, f64)>,
}

impl OpenBlock {
    fn breaks_before(&self, baseline: f64, size: f64) -> bool {
        if !self.line_break {
            return false;
        }
        let Some((last_baseline, last_size)) = self.last_line else {
            return false;
        };

        let gap = (baseline - last_baseline).abs();
        let larger = size.max(last_size);
        let smaller = size.min(last_size);
        gap > BLOCK_GAP * LINE_HEIGHT * larger || (smaller > 0.0 && larger / smaller > SIZE_CHANGE)
    }
}

/// Reads the text blocks and image placements of pages.
pub struct PageReader<'a> {
    doc: &'a Document,
    fonts: HashMap<ObjectId, Rc<FontDecoder>>,
}

impl<'a> PageReader<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            fonts: HashMap::new(),
        }
    }

    /// Read the layout of the page object `page_id`.
    pub fn read_page(&mut self, page_id: ObjectId) -> Result<PageLayout> {
        let doc = self.doc;
        let page = doc
            .get_dictionary(page_id)
            .map_err(|e| Error::Pdf(format!("page {:?}: {}", page_id, e)))?;

        let media_box = inherited(doc, page, b"MediaBox")
            .and_then(|obj| numbers(doc, obj))
            .filter(|values| values.len() == 4)
            .map(|v| [v[0].min(v[2]), v[1].min(v[3]), v[0].max(v[2]), v[1].max(v[3])])
            .unwrap_or(DEFAULT_MEDIA_BOX);

        let bytes = doc
            .get_page_content(page_id)
            .map_err(|e| Error::Pdf(format!("page {:?} content: {}", page_id, e)))?;
        let content =
            Content::decode(&bytes).map_err(|e| Error::Pdf(format!("page {:?}: {}", page_id, e)))?;

        let empty = Dictionary::new();
        let resources = inherited(doc, page, b"Resources")
            .and_then(|obj| as_dict(doc, obj))
            .unwrap_or(&empty);

        let mut run = PageRun {
            reader: self,
            layout: PageLayout::new(media_box[2] - media_box[0], media_box[3] - media_box[1]),
            origin: (media_box[0], media_box[3]),
        };
        run.execute(&content.operations, resources, IDENTITY, 0);

        Ok(run.layout)
    }

    fn font(&mut self, resources: &Dictionary, font_name: &[u8]) -> Option<Rc<FontDecoder>> {
        let doc = self.doc;
        let fonts = get(doc, resources, b"Font").and_then(|f| as_dict(doc, f))?;
        let entry = fonts.get(font_name).ok()?;

        let id = match entry {
            Object::Reference(id) => Some(*id),
            _ => None,
        };
        if let Some(cached) = id.and_then(|id| self.fonts.get(&id)) {
            return Some(Rc::clone(cached));
        }

        let font = as_dict(doc, entry)?;
        let composite = get(doc, font, b"Subtype").and_then(name) == Some(&b"Type0"[..]);
        let to_unicode = font
            .get(b"ToUnicode")
            .ok()
            .and_then(|obj| as_stream(doc, obj))
            .and_then(objects::stream_bytes)
            .map(|data| ToUnicodeMap::parse(&data));

        // `/Encoding` is a name, or a dictionary with a `/BaseEncoding`.
        // `/Differences` arrays are not applied.
        let encoding = get(doc, font, b"Encoding")
            .and_then(|obj| match as_dict(doc, obj) {
                Some(dict) => get(doc, dict, b"BaseEncoding").and_then(name),
                None => name(obj),
            })
            .and_then(|encoding_name| ByteEncoding::named(doc, encoding_name));

        let decoder = Rc::new(FontDecoder::new(to_unicode, composite).with_encoding(encoding));
        if let Some(id) = id {
            self.fonts.insert(id, Rc::clone(&decoder));
        }
        Some(decoder)
    }
}

/// State of one page walk.
struct PageRun<'r, 'a> {
    reader: &'r mut PageReader<'a>,
    layout: PageLayout,
    /// Top-left corner of the media box in user space.
    origin: (f64, f64),
}

impl<'r, 'a> PageRun<'r, 'a> {
    fn to_page(&self, x: f64, y: f64) -> (f64, f64) {
        (x - self.origin.0, self.origin.1 - y)
    }

    /// Page box covering a parallelogram given by its corners in user space.
    fn page_box(&self, corners: &[(f64, f64)]) -> BBox {
        let points: Vec<(f64, f64)> = corners.iter().map(|(x, y)| self.to_page(*x, *y)).collect();
        let min_x = points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
        let max_x = points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
        let min_y = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
        let max_y = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
        BBox::new(min_x, min_y, max_x, max_y)
    }

    fn execute(&mut self, operations: &[Operation], resources: &Dictionary, ctm: Matrix, depth: usize) {
        let mut state = GraphicsState::new(ctm);
        let mut stack: Vec<GraphicsState> = Vec::new();
        let mut text_matrix = IDENTITY;
        let mut line_matrix = IDENTITY;
        let mut block: Option<OpenBlock> = None;

        for op in operations {
            let operands = &op.operands;
            let num = |i: usize| operands.get(i).and_then(number).unwrap_or(0.0);

            match op.operator.as_str() {
                "q" => stack.push(state.clone()),
                "Q" => {
                    if let Some(saved) = stack.pop() {
                        state = saved;
                    }
                }
                "cm" => {
                    let values: Vec<f64> = operands.iter().filter_map(number).collect();
                    if let Some(m) = matrix_from(&values) {
                        state.ctm = multiply(&m, &state.ctm);
                    }
                }
                "BT" => {
                    text_matrix = IDENTITY;
                    line_matrix = IDENTITY;
                    block = Some(OpenBlock::default());
                }
                "ET" => {
                    if let Some(done) = block.take() {
                        self.close_block(done);
                    }
                }
                "Tf" => {
                    state.font = operands
                        .first()
                        .and_then(name)
                        .and_then(|font_name| self.reader.font(resources, font_name));
                    state.font_size = num(1);
                }
                "Tc" => state.char_spacing = num(0),
                "Tw" => state.word_spacing = num(0),
                "Tz" => state.horizontal_scale = num(0) / 100.0,
                "TL" => state.leading = num(0),
                "Ts" => state.rise = num(0),
                "Tm" => {
                    let values: Vec<f64> = operands.iter().filter_map(number).collect();
                    if let Some(m) = matrix_from(&values) {
                        text_matrix = m;
                        line_matrix = m;
                        mark_line_break(&mut block);
                    }
                }
                "Td" | "TD" => {
                    let (tx, ty) = (num(0), num(1));
                    if op.operator == "TD" {
                        state.leading = -ty;
                    }
                    line_matrix = multiply(&translation(tx, ty), &line_matrix);
                    text_matrix = line_matrix;
                    mark_line_break(&mut block);
                }
                "T*" => {
                    line_matrix = multiply(&translation(0.0, -state.leading), &line_matrix);
                    text_matrix = line_matrix;
                    mark_line_break(&mut block);
                }
                "Tj" | "'" | "\"" | "TJ" => {
                    if op.operator == "'" || op.operator == "\"" {
                        if op.operator == "\"" {
                            state.word_spacing = num(0);
                            state.char_spacing = num(1);
                        }
                        line_matrix = multiply(&translation(0.0, -state.leading), &line_matrix);
                        text_matrix = line_matrix;
                        mark_line_break(&mut block);
                    }
                    let (text, advance) = self.shown_text(op, &state);
                    let open = block.get_or_insert_with(OpenBlock::default);
                    self.push_span(open, &state, &text_matrix, text, advance);
                    text_matrix = multiply(&translation(advance, 0.0), &text_matrix);
                }
                "Do" => {
                    if let Some(xobject) = operands.first().and_then(name) {
                        self.draw_xobject(resources, xobject, &state.ctm, depth);
                    }
                }
                _ => {}
            }
        }

        if let Some(unclosed) = block.take() {
            self.close_block(unclosed);
        }
    }

    /// Decoded text and horizontal advance in unscaled text space.
    fn shown_text(&self, op: &Operation, state: &GraphicsState) -> (String, f64) {
        let size = state.font_size;
        let scale = state.horizontal_scale;
        let mut text = String::new();
        let mut advance = 0.0;

        let show = |bytes: &[u8], text: &mut String, advance: &mut f64| {
            let decoded = match &state.font {
                Some(font) => font.decode(bytes),
                None => FontDecoder::default().decode(bytes),
            };
            let glyphs = decoded.chars().count() as f64;
            let spaces = decoded.chars().filter(|c| *c == ' ').count() as f64;
            *advance += (estimate_advance(&decoded) * size
                + glyphs * state.char_spacing
                + spaces * state.word_spacing)
                * scale;
            text.push_str(&decoded);
        };

        match op.operator.as_str() {
            "TJ" => {
                let items = match op.operands.first() {
                    Some(Object::Array(items)) => items.as_slice(),
                    _ => &[],
                };
                for item in items {
                    match item {
                        Object::String(bytes, _) => show(bytes, &mut text, &mut advance),
                        other => {
                            if let Some(adjust) = number(other) {
                                advance -= adjust / 1000.0 * size * scale;
                                if adjust < SPACE_ADJUSTMENT && !text.ends_with(' ') {
                                    text.push(' ');
                                }
                            }
                        }
                    }
                }
            }
            _ => {
                if let Some(Object::String(bytes, _)) = op.operands.last() {
                    show(bytes, &mut text, &mut advance);
                }
            }
        }

        (text, advance)
    }

    fn push_span(
        &mut self,
        block: &mut OpenBlock,
        state: &GraphicsState,
        text_matrix: &Matrix,
        text: String,
        advance: f64,
    ) {
        if text.is_empty() {
            return;
        }

        let device = multiply(text_matrix, &state.ctm);
        let size = state.font_size * (device[2].powi(2) + device[3].powi(2)).sqrt();

        let (origin_x, origin_y) = transform(&device, 0.0, state.rise);
        let (_, baseline) = self.to_page(origin_x, origin_y);
        if block.breaks_before(baseline, size) {
            let done = std::mem::take(block);
            self.close_block(done);
        }

        let top = state.rise + ASCENT * state.font_size;
        let bottom = state.rise - DESCENT * state.font_size;
        let corners = [
            transform(&device, 0.0, bottom),
            transform(&device, advance, bottom),
            transform(&device, 0.0, top),
            transform(&device, advance, top),
        ];
        let bbox = self.page_box(&corners);

        block.bbox = Some(match block.bbox {
            Some(existing) => existing.union(&bbox),
            None => bbox,
        });
        block.spans.push(TextSpan {
            text,
            size,
            new_line: block.line_break && !block.spans.is_empty(),
        });
        block.line_break = false;
        block.last_line = Some((baseline, size));
    }

    fn close_block(&mut self, block: OpenBlock) {
        if let Some(bbox) = block.bbox {
            if !block.spans.is_empty() {
                self.layout.blocks.push(TextBlock {
                    bbox,
                    spans: block.spans,
                });
            }
        }
    }

    fn draw_xobject(&mut self, resources: &Dictionary, xobject: &[u8], ctm: &Matrix, depth: usize) {
        let doc = self.reader.doc;
        let Some(entry) = get(doc, resources, b"XObject")
            .and_then(|x| as_dict(doc, x))
            .and_then(|x| x.get(xobject).ok())
        else {
            log::debug!("Unknown XObject /{}", String::from_utf8_lossy(xobject));
            return;
        };
        let Some(stream) = as_stream(doc, entry) else {
            return;
        };

        match get(doc, &stream.dict, b"Subtype").and_then(name) {
            Some(b"Image") => {
                let Object::Reference(id) = entry else {
                    log::debug!("Skipping inline image XObject");
                    return;
                };
                let corners = [
                    transform(ctm, 0.0, 0.0),
                    transform(ctm, 1.0, 0.0),
                    transform(ctm, 0.0, 1.0),
                    transform(ctm, 1.0, 1.0),
                ];
                let bbox = self.page_box(&corners);
                self.layout.place_image(*id, bbox);
            }
            Some(b"Form") => {
                if depth >= MAX_FORM_DEPTH {
                    log::warn!("Form XObjects nested too deeply; skipping");
                    return;
                }
                let matrix = get(doc, &stream.dict, b"Matrix")
                    .and_then(|m| numbers(doc, m))
                    .and_then(|m| matrix_from(&m))
                    .unwrap_or(IDENTITY);
                let form_resources = get(doc, &stream.dict, b"Resources")
                    .and_then(|r| as_dict(doc, r))
                    .unwrap_or(resources);
                let Some(operations) = objects::stream_bytes(stream)
                    .and_then(|bytes| Content::decode(&bytes).ok())
                    .map(|content| content.operations)
                else {
                    log::warn!("Cannot decode form XObject /{}", String::from_utf8_lossy(xobject));
                    return;
                };
                self.execute(&operations, form_resources, multiply(&matrix, ctm), depth + 1);
            }
            _ => {}
        }
    }
}

fn mark_line_break(block: &mut Option<OpenBlock>) {
    if let Some(open) = block {
        open.line_break = true;
    }
}
