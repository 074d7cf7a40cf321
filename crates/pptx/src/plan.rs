//! A renderer that records drawing calls instead of writing a `.pptx`.

use crate::diagram::Shape;
use crate::render::{PresentationRenderer, SlideId};
use crate::style::TextStyle;
use crate::template::{EmuRect, TemplateCatalog};
use deck_core::{Chart, Error, Result};
use serde::Serialize;
use std::path::Path;

/// One recorded drawing call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PlanOp {
    PlaceholderText {
        idx: u32,
        paragraphs: Vec<String>,
        style: TextStyle,
    },
    Chart {
        chart: Chart,
        rect: EmuRect,
    },
    Picture {
        path: String,
        rect: EmuRect,
    },
    TextBox {
        text: String,
        rect: EmuRect,
        style: TextStyle,
    },
    Shape {
        shape: Shape,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedSlide {
    pub layout: usize,
    pub layout_name: String,
    pub ops: Vec<PlanOp>,
}

/// Records every call and writes the plan as JSON on save.
#[derive(Debug, Clone)]
pub struct RenderPlan {
    catalog: TemplateCatalog,
    slides: Vec<PlannedSlide>,
}

#[derive(Serialize)]
struct PlanDocument<'a> {
    slide_width: i64,
    slide_height: i64,
    slides: &'a [PlannedSlide],
}

impl RenderPlan {
    pub fn new(catalog: TemplateCatalog) -> Self {
        Self {
            catalog,
            slides: Vec::new(),
        }
    }

    pub fn slides(&self) -> &[PlannedSlide] {
        &self.slides
    }

    /// The plan as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        let document = PlanDocument {
            slide_width: self.catalog.slide_width,
            slide_height: self.catalog.slide_height,
            slides: &self.slides,
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }

    fn record(&mut self, slide: SlideId, op: PlanOp) -> Result<()> {
        let planned = self
            .slides
            .get_mut(slide)
            .ok_or_else(|| Error::Render(format!("unknown slide {}", slide)))?;
        planned.ops.push(op);
        Ok(())
    }
}

impl PresentationRenderer for RenderPlan {
    fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    fn add_slide(&mut self, layout: usize) -> Result<SlideId> {
        let layout_name = self
            .catalog
            .layout(layout)
            .map(|l| l.name.clone())
            .ok_or_else(|| Error::Render(format!("unknown layout {}", layout)))?;

        self.slides.push(PlannedSlide {
            layout,
            layout_name,
            ops: Vec::new(),
        });
        Ok(self.slides.len() - 1)
    }

    fn set_placeholder_text(
        &mut self,
        slide: SlideId,
        idx: u32,
        paragraphs: &[String],
        style: &TextStyle,
    ) -> Result<()> {
        let has_placeholder = self
            .slides
            .get(slide)
            .and_then(|s| self.catalog.layout(s.layout))
            .is_some_and(|l| l.placeholder(idx).is_some());
        if !has_placeholder {
            return Err(Error::Render(format!("slide {} has no placeholder {}", slide, idx)));
        }

        self.record(
            slide,
            PlanOp::PlaceholderText {
                idx,
                paragraphs: paragraphs.to_vec(),
                style: style.clone(),
            },
        )
    }

    fn add_chart(&mut self, slide: SlideId, chart: &Chart, rect: EmuRect) -> Result<()> {
        self.record(
            slide,
            PlanOp::Chart {
                chart: chart.clone(),
                rect,
            },
        )
    }

    fn add_picture(&mut self, slide: SlideId, path: &Path, rect: EmuRect) -> Result<()> {
        self.record(
            slide,
            PlanOp::Picture {
                path: path.display().to_string(),
                rect,
            },
        )
    }

    fn add_text_box(&mut self, slide: SlideId, text: &str, rect: EmuRect, style: &TextStyle) -> Result<()> {
        self.record(
            slide,
            PlanOp::TextBox {
                text: text.to_string(),
                rect,
                style: style.clone(),
            },
        )
    }

    fn add_shape(&mut self, slide: SlideId, shape: &Shape) -> Result<()> {
        self.record(slide, PlanOp::Shape { shape: shape.clone() })
    }

    fn save(&mut self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
