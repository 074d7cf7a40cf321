//! Deck render driver.
//!
//! Maps each slide onto a template layout and issues drawing calls to a
//! [`PresentationRenderer`]. Problems with a single slide or unit (missing
//! layout, missing placeholder, rejected call) are logged and skipped;
//! only saving the result can fail the render.

use crate::diagram::{diagram_shapes, Shape};
use crate::style::{StyleConfig, TextRole, TextStyle};
use crate::template::{EmuRect, TemplateCatalog, TemplateLayout};
use deck_core::markdown::DEFAULT_IMAGE_RECT;
use deck_core::{Chart, Deck, Element, ElementKind, Error, Rect, Result, Slide, SlideType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Placeholder idx of the main body / object area.
pub const BODY_PLACEHOLDER: u32 = 1;

/// Placeholder idx of the subtitle text on content layouts.
pub const CONTENT_SUBTITLE_PLACEHOLDER: u32 = 13;

/// Font size of text elements that carry none, in points.
pub const DEFAULT_ELEMENT_FONT_SIZE: f64 = 12.0;

/// Handle of a slide created by a renderer.
pub type SlideId = usize;

/// Target presentation being written.
pub trait PresentationRenderer {
    /// Layouts of the template the presentation is built on.
    fn catalog(&self) -> &TemplateCatalog;

    /// Append a slide using layout `layout`.
    fn add_slide(&mut self, layout: usize) -> Result<SlideId>;

    /// Replace the text of placeholder `idx`, one paragraph per entry.
    fn set_placeholder_text(
        &mut self,
        slide: SlideId,
        idx: u32,
        paragraphs: &[String],
        style: &TextStyle,
    ) -> Result<()>;

    fn add_chart(&mut self, slide: SlideId, chart: &Chart, rect: EmuRect) -> Result<()>;

    fn add_picture(&mut self, slide: SlideId, path: &Path, rect: EmuRect) -> Result<()>;

    fn add_text_box(&mut self, slide: SlideId, text: &str, rect: EmuRect, style: &TextStyle) -> Result<()>;

    fn add_shape(&mut self, slide: SlideId, shape: &Shape) -> Result<()>;

    /// Write the presentation to `path`.
    fn save(&mut self, path: &Path) -> Result<()>;
}

/// A layout given by position or by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LayoutRef {
    Index(usize),
    Name(String),
}

/// Which template layout each slide type uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutMapping {
    entries: HashMap<SlideType, LayoutRef>,
}

impl Default for LayoutMapping {
    fn default() -> Self {
        Self {
            entries: SlideType::ALL
                .iter()
                .map(|t| (*t, LayoutRef::Index(t.default_layout_index())))
                .collect(),
        }
    }
}

impl LayoutMapping {
    /// Parse a JSON object such as `{"cover": 0, "content": "Title and Content"}`.
    ///
    /// Slide types left out keep their default layout.
    pub fn from_json(json: &str) -> Result<Self> {
        let overrides: HashMap<SlideType, LayoutRef> = serde_json::from_str(json)?;
        let mut mapping = Self::default();
        mapping.entries.extend(overrides);
        Ok(mapping)
    }

    /// Read a mapping file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn with_layout(mut self, slide_type: SlideType, layout: LayoutRef) -> Self {
        self.entries.insert(slide_type, layout);
        self
    }

    pub fn get(&self, slide_type: SlideType) -> Option<&LayoutRef> {
        self.entries.get(&slide_type)
    }

    /// Layout index for `slide_type`, if the catalog has the mapped layout.
    pub fn resolve(&self, slide_type: SlideType, catalog: &TemplateCatalog) -> Option<usize> {
        match self.get(slide_type)? {
            LayoutRef::Index(index) => catalog.layout(*index).map(|l| l.index),
            LayoutRef::Name(name) => catalog.find_layout(name).map(|l| l.index),
        }
    }
}

/// Counts from one render.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderSummary {
    pub slides_rendered: usize,
    pub slides_skipped: usize,
    pub units_skipped: usize,
}

/// Drives a renderer from a deck.
#[derive(Debug, Clone, Default)]
pub struct DeckRenderer {
    mapping: LayoutMapping,
    styles: StyleConfig,
}

impl DeckRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mapping(mut self, mapping: LayoutMapping) -> Self {
        self.mapping = mapping;
        self
    }

    pub fn with_styles(mut self, styles: StyleConfig) -> Self {
        self.styles = styles;
        self
    }

    /// Render every slide of `deck`, then save to `output`.
    pub fn render<R: PresentationRenderer + ?Sized>(
        &self,
        deck: &Deck,
        renderer: &mut R,
        output: &Path,
    ) -> Result<RenderSummary> {
        let mut summary = RenderSummary::default();

        for (number, slide) in deck.slides.iter().enumerate().map(|(i, s)| (i + 1, s)) {
            let Some(layout_index) = self.mapping.resolve(slide.slide_type, renderer.catalog()) else {
                log::warn!(
                    "Slide {}: no layout for {:?}, skipping",
                    number,
                    slide.slide_type
                );
                summary.slides_skipped += 1;
                continue;
            };

            let slide_id = match renderer.add_slide(layout_index) {
                Ok(id) => id,
                Err(e) => {
                    log::warn!("Slide {}: could not add slide: {}", number, e);
                    summary.slides_skipped += 1;
                    continue;
                }
            };

            let Some(layout) = renderer.catalog().layout(layout_index).cloned() else {
                summary.slides_skipped += 1;
                continue;
            };
            let mut run = SlideRun {
                renderer: &mut *renderer,
                slide: slide_id,
                number,
                skipped: 0,
            };
            self.render_slide(&mut run, slide, &layout);

            summary.units_skipped += run.skipped;
            summary.slides_rendered += 1;
        }

        renderer.save(output)?;
        log::debug!(
            "Rendered {} slides ({} skipped)",
            summary.slides_rendered,
            summary.slides_skipped
        );
        Ok(summary)
    }

    fn render_slide<R: PresentationRenderer + ?Sized>(
        &self,
        run: &mut SlideRun<'_, R>,
        slide: &Slide,
        layout: &TemplateLayout,
    ) {
        if let Some(title) = &slide.title {
            let role = if slide.slide_type == SlideType::Cover {
                TextRole::MainTitle
            } else {
                TextRole::SlideTitle
            };
            match layout.title_placeholder() {
                Some(placeholder) => {
                    let style = self.styles.style(role);
                    run.attempt("title", |r, id| {
                        r.set_placeholder_text(id, placeholder.idx, &[title.clone()], &style)
                    });
                }
                None => run.skip(&format!("layout '{}' has no title placeholder", layout.name)),
            }
        }

        match slide.slide_type {
            SlideType::Cover | SlideType::Section => {
                if let Some(subtitle) = &slide.subtitle {
                    self.fill_placeholder(run, layout, BODY_PLACEHOLDER, subtitle, TextRole::Subtitle);
                }
            }
            SlideType::Content => {
                if let Some(body) = slide.body_text() {
                    self.fill_placeholder(run, layout, BODY_PLACEHOLDER, &body, TextRole::Body);
                }
                if let Some(subtitle) = &slide.subtitle {
                    self.fill_placeholder(
                        run,
                        layout,
                        CONTENT_SUBTITLE_PLACEHOLDER,
                        subtitle,
                        TextRole::Subtitle,
                    );
                }
            }
            SlideType::TableOfContents => {
                if let Some(body) = slide.body_text() {
                    self.fill_placeholder(run, layout, BODY_PLACEHOLDER, &body, TextRole::Body);
                }
            }
            SlideType::BackCover => {}
        }

        if let Some(chart) = &slide.chart {
            let rect = layout
                .placeholder(BODY_PLACEHOLDER)
                .and_then(|p| p.rect)
                .unwrap_or_else(|| EmuRect::from_inches(1.0, 2.0, 8.0, 4.5));
            run.attempt("chart", |r, id| r.add_chart(id, chart, rect));
        }

        let diagram_area = EmuRect::from_inches(1.0, 4.0, 8.0, 2.5);
        for diagram in &slide.diagrams {
            for shape in diagram_shapes(diagram, diagram_area) {
                run.attempt("diagram shape", |r, id| r.add_shape(id, &shape));
            }
        }

        for element in &slide.elements {
            self.render_element(run, element);
        }
    }

    fn fill_placeholder<R: PresentationRenderer + ?Sized>(
        &self,
        run: &mut SlideRun<'_, R>,
        layout: &TemplateLayout,
        idx: u32,
        text: &str,
        role: TextRole,
    ) {
        if layout.placeholder(idx).is_none() {
            run.skip(&format!("layout '{}' has no placeholder {}", layout.name, idx));
            return;
        }
        let paragraphs: Vec<String> = text.lines().map(str::to_string).collect();
        let style = self.styles.style(role);
        run.attempt("placeholder text", |r, id| {
            r.set_placeholder_text(id, idx, &paragraphs, &style)
        });
    }

    fn render_element<R: PresentationRenderer + ?Sized>(&self, run: &mut SlideRun<'_, R>, element: &Element) {
        let (width, height) = {
            let catalog = run.renderer.catalog();
            (catalog.slide_width, catalog.slide_height)
        };

        match element.kind {
            ElementKind::Text => {
                let Some(rect) = element.rect else {
                    run.skip("text element without a rect");
                    return;
                };
                let style = self
                    .styles
                    .style(TextRole::Caption)
                    .with_size(element.font_size.unwrap_or(DEFAULT_ELEMENT_FONT_SIZE))
                    .with_color(element.color.unwrap_or(self.styles.main_text));
                let rect = to_emu(&rect, width, height);
                run.attempt("text box", |r, id| r.add_text_box(id, &element.content, rect, &style));
            }
            ElementKind::Image => {
                let path = Path::new(&element.content);
                if !path.exists() {
                    run.skip(&format!("image not found: {}", element.content));
                    return;
                }
                let rect = to_emu(&element.rect.unwrap_or(DEFAULT_IMAGE_RECT), width, height);
                run.attempt("picture", |r, id| r.add_picture(id, path, rect));
            }
        }
    }
}

/// Scale a page-fraction rectangle to the slide size.
pub fn to_emu(rect: &Rect, slide_width: i64, slide_height: i64) -> EmuRect {
    let scale = |v: f64, size: i64| (v * size as f64).round() as i64;
    EmuRect::new(
        scale(rect.x, slide_width),
        scale(rect.y, slide_height),
        scale(rect.w, slide_width),
        scale(rect.h, slide_height),
    )
}

/// Drawing calls for one slide; failures are counted and logged.
struct SlideRun<'r, R: PresentationRenderer + ?Sized> {
    renderer: &'r mut R,
    slide: SlideId,
    number: usize,
    skipped: usize,
}

impl<R: PresentationRenderer + ?Sized> SlideRun<'_, R> {
    fn attempt<F>(&mut self, what: &str, call: F)
    where
        F: FnOnce(&mut R, SlideId) -> Result<()>,
    {
        if let Err(e) = call(&mut *self.renderer, self.slide) {
            self.skip(&format!("{} failed: {}", what, e));
        }
    }

    fn skip(&mut self, reason: &str) {
        log::warn!("Slide {}: {}", self.number, reason);
        self.skipped += 1;
    }
}
