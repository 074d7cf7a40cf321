//! Presentation rendering on top of `.pptx` templates.
//!
//! A [`TemplateCatalog`] describes the layouts and placeholders a template
//! offers. [`DeckRenderer`] maps a deck onto those layouts and drives any
//! [`PresentationRenderer`]; [`RenderPlan`] is a renderer that records the
//! resulting drawing calls as JSON.

pub mod diagram;
pub mod plan;
pub mod render;
pub mod style;
pub mod template;

pub use diagram::{diagram_shapes, Shape, ShapeKind};
pub use plan::{PlanOp, PlannedSlide, RenderPlan};
pub use render::{DeckRenderer, LayoutMapping, LayoutRef, PresentationRenderer, RenderSummary, SlideId};
pub use style::{StyleConfig, TextRole, TextStyle};
pub use template::{EmuRect, Placeholder, TemplateCatalog, TemplateLayout};
