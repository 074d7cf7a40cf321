//! Domain types for representing a slide deck.
//!
//! All types are plain values: they are assembled field by field while a
//! parser or extractor runs and are not mutated afterwards.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Deck title used when the first slide has no title.
pub const DEFAULT_DECK_TITLE: &str = "Untitled Presentation";

/// Represents an entire deck with its slides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    /// Deck title.
    pub title: String,

    /// Optional author.
    pub author: Option<String>,

    /// Optional date string, kept as written.
    pub date: Option<String>,

    /// Slides in presentation order.
    pub slides: Vec<Slide>,
}

impl Deck {
    /// Create an empty deck with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: None,
            date: None,
            slides: Vec::new(),
        }
    }

    /// Build a deck whose title is taken from the first slide.
    pub fn from_slides(slides: Vec<Slide>) -> Self {
        let title = slides
            .first()
            .and_then(|s| s.title.clone())
            .unwrap_or_else(|| DEFAULT_DECK_TITLE.to_string());

        Self {
            title,
            author: None,
            date: None,
            slides,
        }
    }

    /// Add a slide to the deck.
    pub fn add_slide(&mut self, slide: Slide) {
        self.slides.push(slide);
    }
}

/// The template layout a slide binds to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlideType {
    Cover,
    TableOfContents,
    Section,
    #[default]
    Content,
    BackCover,
}

impl SlideType {
    /// Every slide type, in template layout order.
    pub const ALL: [SlideType; 5] = [
        SlideType::Cover,
        SlideType::TableOfContents,
        SlideType::Section,
        SlideType::Content,
        SlideType::BackCover,
    ];

    /// Look up a slide type by its layout directive name.
    pub fn from_layout_name(name: &str) -> Option<Self> {
        match name.trim() {
            "表紙" => Some(Self::Cover),
            "目次" => Some(Self::TableOfContents),
            "中見出し" => Some(Self::Section),
            "コンテンツ" => Some(Self::Content),
            "裏表紙" => Some(Self::BackCover),
            _ => None,
        }
    }

    /// The layout directive name for this slide type.
    pub fn layout_name(&self) -> &'static str {
        match self {
            Self::Cover => "表紙",
            Self::TableOfContents => "目次",
            Self::Section => "中見出し",
            Self::Content => "コンテンツ",
            Self::BackCover => "裏表紙",
        }
    }

    /// Position of the layout in the default template.
    pub fn default_layout_index(&self) -> usize {
        match self {
            Self::Cover => 0,
            Self::TableOfContents => 1,
            Self::Section => 2,
            Self::Content => 3,
            Self::BackCover => 4,
        }
    }
}

/// A single slide.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    /// Layout the slide binds to.
    #[serde(rename = "type")]
    pub slide_type: SlideType,

    pub title: Option<String>,

    pub subtitle: Option<String>,

    /// Free text, one paragraph per line.
    pub body: Option<String>,

    /// Bullet lines of the body with their leading marker stripped.
    pub bullets: Vec<String>,

    /// Absolutely positioned overrides, in discovery order.
    pub elements: Vec<Element>,

    pub chart: Option<Chart>,

    /// Diagram hints for the renderer.
    pub diagrams: Vec<Diagram>,
}

impl Slide {
    /// Create an empty slide of the given type.
    pub fn new(slide_type: SlideType) -> Self {
        Self {
            slide_type,
            ..Default::default()
        }
    }

    /// Literal text of the slide.
    ///
    /// Prefers `body`; falls back to the bullet list joined by newlines
    /// only when no body is present.
    pub fn body_text(&self) -> Option<Cow<'_, str>> {
        match &self.body {
            Some(body) => Some(Cow::Borrowed(body.as_str())),
            None if !self.bullets.is_empty() => Some(Cow::Owned(self.bullets.join("\n"))),
            None => None,
        }
    }

    /// Flat list of items for list-style placeholders.
    ///
    /// Prefers `bullets`; falls back to the non-empty body lines only when
    /// there are no bullets.
    pub fn bullet_items(&self) -> Vec<&str> {
        if !self.bullets.is_empty() {
            return self.bullets.iter().map(String::as_str).collect();
        }

        self.body
            .as_deref()
            .map(|b| b.lines().filter(|l| !l.trim().is_empty()).collect())
            .unwrap_or_default()
    }
}

/// Kind of an absolutely positioned element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Text,
    Image,
}

impl ElementKind {
    /// Parse the `type=` value of an element directive.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
        }
    }
}

/// Rectangle in page-fraction coordinates, origin top-left.
///
/// Values are not clamped: `x + w` or `y + h` may exceed 1.0 for content
/// that overflows the page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Build a rectangle from exactly four values.
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        match values {
            [x, y, w, h] => Some(Self::new(*x, *y, *w, *h)),
            _ => None,
        }
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.x, self.y, self.w, self.h]
    }
}

/// 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// An absolutely positioned text or image override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub kind: ElementKind,

    /// Literal text, or the image file path.
    pub content: String,

    pub rect: Option<Rect>,

    /// Font size in points.
    pub font_size: Option<f64>,

    pub color: Option<Rgb>,

    /// Alt text of an image reference.
    pub caption: Option<String>,
}

impl Element {
    /// Create a text element.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            kind: ElementKind::Text,
            content: content.into(),
            rect: None,
            font_size: None,
            color: None,
            caption: None,
        }
    }

    /// Create an image element pointing at a file.
    pub fn image(path: impl Into<String>) -> Self {
        Self {
            kind: ElementKind::Image,
            ..Self::text(path)
        }
    }

    pub fn with_rect(mut self, rect: Rect) -> Self {
        self.rect = Some(rect);
        self
    }

    pub fn with_font_size(mut self, size: f64) -> Self {
        self.font_size = Some(size);
        self
    }

    pub fn with_color(mut self, color: Rgb) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }
}

/// Chart rendering type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartType {
    BarClustered,
    #[default]
    ColumnClustered,
    Line,
    Pie,
}

/// One named data series of a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
}

/// Category chart: one value per category in every series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub title: Option<String>,

    #[serde(rename = "type")]
    pub chart_type: ChartType,

    /// X-axis labels in display order.
    pub categories: Vec<String>,

    /// Series in header column order.
    pub series: Vec<Series>,
}

impl Chart {
    /// Values of the named series.
    pub fn series_values(&self, name: &str) -> Option<&[f64]> {
        self.series
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.values.as_slice())
    }

    /// Whether every series has exactly one value per category.
    pub fn is_consistent(&self) -> bool {
        self.series
            .iter()
            .all(|s| s.values.len() == self.categories.len())
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Diagram rendering type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagramType {
    #[default]
    Process,
    Cycle,
    List,
}

impl DiagramType {
    /// Look up a diagram type by fence tag suffix. Unknown tags render as a process flow.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "cycle" => Self::Cycle,
            "list" => Self::List,
            _ => Self::Process,
        }
    }
}

/// A diagram hint: one shape per item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagram {
    pub kind: DiagramType,
    pub items: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_names_round_trip() {
        for slide_type in SlideType::ALL {
            assert_eq!(
                SlideType::from_layout_name(slide_type.layout_name()),
                Some(slide_type)
            );
        }
        assert_eq!(SlideType::from_layout_name("unknown"), None);
    }

    #[test]
    fn test_default_slide_type_is_content() {
        assert_eq!(SlideType::default(), SlideType::Content);
        assert_eq!(Slide::default().slide_type, SlideType::Content);
    }

    #[test]
    fn test_deck_title_from_first_slide() {
        let mut first = Slide::new(SlideType::Cover);
        first.title = Some("Kickoff".to_string());
        let deck = Deck::from_slides(vec![first, Slide::default()]);
        assert_eq!(deck.title, "Kickoff");

        let deck = Deck::from_slides(vec![Slide::default()]);
        assert_eq!(deck.title, DEFAULT_DECK_TITLE);
    }

    #[test]
    fn test_body_text_prefers_body() {
        let mut slide = Slide::default();
        slide.body = Some("Intro\n- a".to_string());
        slide.bullets = vec!["a".to_string()];
        assert_eq!(slide.body_text().as_deref(), Some("Intro\n- a"));

        slide.body = None;
        assert_eq!(slide.body_text().as_deref(), Some("a"));

        slide.bullets.clear();
        assert_eq!(slide.body_text(), None);
    }

    #[test]
    fn test_bullet_items_falls_back_to_body_lines() {
        let mut slide = Slide::default();
        slide.body = Some("One\n\nTwo".to_string());
        assert_eq!(slide.bullet_items(), vec!["One", "Two"]);

        slide.bullets = vec!["x".to_string()];
        assert_eq!(slide.bullet_items(), vec!["x"]);
    }

    #[test]
    fn test_rect_from_slice_requires_four_values() {
        assert_eq!(
            Rect::from_slice(&[0.1, 0.2, 0.3, 0.4]),
            Some(Rect::new(0.1, 0.2, 0.3, 0.4))
        );
        assert_eq!(Rect::from_slice(&[0.1, 0.2, 0.3]), None);
        assert_eq!(Rect::from_slice(&[]), None);
    }

    #[test]
    fn test_chart_consistency() {
        let chart = Chart {
            categories: vec!["Q1".to_string(), "Q2".to_string()],
            series: vec![Series {
                name: "Japan".to_string(),
                values: vec![1.0, 2.0],
            }],
            ..Default::default()
        };
        assert!(chart.is_consistent());
        assert_eq!(chart.series_values("Japan"), Some(&[1.0, 2.0][..]));
        assert_eq!(chart.series_values("Global"), None);
    }

    #[test]
    fn test_diagram_type_from_tag() {
        assert_eq!(DiagramType::from_tag("cycle"), DiagramType::Cycle);
        assert_eq!(DiagramType::from_tag("PROCESS"), DiagramType::Process);
        assert_eq!(DiagramType::from_tag("pyramid"), DiagramType::Process);
    }
}
