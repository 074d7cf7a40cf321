//! Deck to Markdown serialization.
//!
//! Produces text that [`parse`](super::parse) reads back into the same
//! slides. Charts and diagrams are not written.

use super::parser::escape_content_line;
use crate::types::{Deck, Element, ElementKind, Slide};
use std::fmt::Write;

/// Writer for the Markdown deck dialect.
#[derive(Debug, Clone)]
pub struct DeckWriter {
    /// Decimal places used for element rectangles.
    rect_precision: usize,
}

impl Default for DeckWriter {
    fn default() -> Self {
        Self { rect_precision: 4 }
    }
}

impl DeckWriter {
    /// Create a writer with 4-decimal rectangles.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of decimal places for rectangles.
    pub fn with_rect_precision(mut self, places: usize) -> Self {
        self.rect_precision = places;
        self
    }

    /// Render the deck as Markdown.
    pub fn write(&self, deck: &Deck) -> String {
        let mut out = String::new();

        for (i, slide) in deck.slides.iter().enumerate() {
            if i > 0 {
                out.push_str("\n---\n\n");
            }
            self.write_slide(&mut out, slide);
        }

        out
    }

    fn write_slide(&self, out: &mut String, slide: &Slide) {
        if slide.chart.is_some() || !slide.diagrams.is_empty() {
            log::debug!("Charts and diagrams are not written to Markdown");
        }

        let _ = writeln!(out, "<!-- layout: {} -->", slide.slide_type.layout_name());

        if let Some(title) = &slide.title {
            let _ = writeln!(out, "# {}", title);
        }
        if let Some(subtitle) = &slide.subtitle {
            let _ = writeln!(out, "## {}", subtitle);
        }
        out.push('\n');

        if let Some(body) = &slide.body {
            let _ = writeln!(out, "{}\n", body);
        }

        for element in &slide.elements {
            self.write_element(out, element);
        }
    }

    fn write_element(&self, out: &mut String, element: &Element) {
        // Element content is a single line.
        let content = element.content.lines().collect::<Vec<_>>().join(" ");
        let content = content.trim();
        if content.is_empty() {
            log::debug!("Skipping element without content");
            return;
        }

        let mut params = vec![format!("type={}", element.kind.as_str())];
        if let Some(rect) = &element.rect {
            let p = self.rect_precision;
            params.push(format!(
                "rect=[{:.p$}, {:.p$}, {:.p$}, {:.p$}]",
                rect.x, rect.y, rect.w, rect.h
            ));
        }
        if let Some(size) = element.font_size {
            params.push(format!("size={}", size));
        }
        if let Some(color) = &element.color {
            params.push(format!("color=[{}, {}, {}]", color.r, color.g, color.b));
        }

        let _ = writeln!(out, "<!-- element: {} -->", params.join(", "));
        match element.kind {
            ElementKind::Text => {
                let _ = writeln!(out, "{}\n", escape_content_line(content));
            }
            ElementKind::Image => {
                let caption = element.caption.as_deref().unwrap_or_default();
                let _ = writeln!(out, "![{}]({})\n", caption, content);
            }
        }
    }
}

/// Serialize a deck with the default writer.
pub fn serialize(deck: &Deck) -> String {
    DeckWriter::new().write(deck)
}
