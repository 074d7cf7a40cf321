//! Shape geometry for diagram hints.

use crate::template::{inches, EmuRect};
use deck_core::{Diagram, DiagramType};
use serde::Serialize;
use std::f64::consts::PI;

/// Preset geometry of an auto shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    RoundedRectangle,
    RightArrow,
    Oval,
}

/// An auto shape to draw, with optional text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Shape {
    pub kind: ShapeKind,
    pub rect: EmuRect,
    pub text: Option<String>,
}

/// Lay out a diagram inside `area`.
///
/// Process and list diagrams flow left to right with an arrow between
/// boxes; cycles place ovals on a circle starting at the top.
pub fn diagram_shapes(diagram: &Diagram, area: EmuRect) -> Vec<Shape> {
    if diagram.items.is_empty() {
        return Vec::new();
    }

    match diagram.kind {
        DiagramType::Process | DiagramType::List => process_flow(&diagram.items, area),
        DiagramType::Cycle => cycle(&diagram.items, area),
    }
}

fn process_flow(items: &[String], area: EmuRect) -> Vec<Shape> {
    let gap = inches(0.2);
    let box_height = inches(1.0);
    let arrow_height = inches(0.3);

    let count = items.len() as i64;
    let box_width = (area.cx - gap * (count - 1)) / count;

    let mut shapes = Vec::new();
    let mut left = area.x;
    for (i, text) in items.iter().enumerate() {
        shapes.push(Shape {
            kind: ShapeKind::RoundedRectangle,
            rect: EmuRect::new(left, area.y, box_width, box_height),
            text: Some(text.clone()),
        });

        if i + 1 < items.len() {
            shapes.push(Shape {
                kind: ShapeKind::RightArrow,
                rect: EmuRect::new(
                    left + box_width,
                    area.y + box_height / 2 - arrow_height / 2,
                    gap,
                    arrow_height,
                ),
                text: None,
            });
        }

        left += box_width + gap;
    }

    shapes
}

fn cycle(items: &[String], area: EmuRect) -> Vec<Shape> {
    let width = inches(1.5);
    let height = inches(0.8);

    let center_x = area.x as f64 + area.cx as f64 / 2.0;
    let center_y = area.y as f64 + area.cy as f64 / 2.0;
    let radius = area.cx.min(area.cy) as f64 / 3.0;
    let count = items.len() as f64;

    items
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let angle = 2.0 * PI * i as f64 / count - PI / 2.0;
            let x = center_x + radius * angle.cos() - width as f64 / 2.0;
            let y = center_y + radius * angle.sin() - height as f64 / 2.0;
            Shape {
                kind: ShapeKind::Oval,
                rect: EmuRect::new(x.round() as i64, y.round() as i64, width, height),
                text: Some(text.clone()),
            }
        })
        .collect()
}
