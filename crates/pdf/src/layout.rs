//! Page layout model and promotion of a page layout into a slide.

use crate::text::clean_text;
use deck_core::{Element, Rect, Slide, SlideType};
use lopdf::ObjectId;
use std::path::PathBuf;

/// Title used when no block qualifies in the top band.
pub const NO_TITLE: &str = "No Title";

/// Blocks whose normalized top is above this line may become the title.
pub const TITLE_BAND: f64 = 0.2;

/// Axis-aligned box in page space, origin at the top-left corner, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BBox {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    /// Smallest box covering both.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Express the box as fractions of the page size.
    pub fn normalize(&self, width: f64, height: f64) -> Rect {
        if width <= 0.0 || height <= 0.0 {
            return Rect::new(0.0, 0.0, 0.0, 0.0);
        }
        Rect::new(
            self.x0 / width,
            self.y0 / height,
            (self.x1 - self.x0) / width,
            (self.y1 - self.y0) / height,
        )
    }
}

/// One run of text drawn by a single show operator.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,

    /// Effective font size in points.
    pub size: f64,

    /// The span starts on a new line within its block.
    pub new_line: bool,
}

/// Text drawn inside one text object.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub bbox: BBox,
    pub spans: Vec<TextSpan>,
}

impl TextBlock {
    /// Concatenated text of the block's spans, cleaned.
    pub fn text(&self) -> String {
        let mut joined = String::new();
        for span in self.spans.iter().filter(|s| !s.text.trim().is_empty()) {
            if span.new_line && !joined.is_empty() {
                joined.push(' ');
            }
            joined.push_str(&span.text);
        }
        clean_text(&joined)
    }

    /// Largest font size among the spans that carry text.
    pub fn max_size(&self) -> f64 {
        self.spans
            .iter()
            .filter(|s| !s.text.trim().is_empty())
            .map(|s| s.size)
            .fold(0.0, f64::max)
    }
}

/// An image XObject and every place it is drawn on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageImage {
    pub id: ObjectId,
    pub placements: Vec<BBox>,
}

/// Everything read from one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub width: f64,
    pub height: f64,
    pub blocks: Vec<TextBlock>,

    /// Images in the order they are first drawn.
    pub images: Vec<PageImage>,
}

impl PageLayout {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Record a placement of image `id`, keeping first-draw order.
    pub fn place_image(&mut self, id: ObjectId, bbox: BBox) {
        match self.images.iter_mut().find(|img| img.id == id) {
            Some(image) => image.placements.push(bbox),
            None => self.images.push(PageImage {
                id,
                placements: vec![bbox],
            }),
        }
    }
}

/// Turn one page layout into a slide.
///
/// `image_paths` is parallel to `layout.images`; images that could not be
/// saved are `None` and produce no elements. Text elements come first, in
/// block order, followed by one image element per placement.
pub fn promote_page(page_index: usize, layout: &PageLayout, image_paths: &[Option<PathBuf>]) -> Slide {
    let slide_type = if page_index == 0 {
        SlideType::Cover
    } else {
        SlideType::Content
    };
    let mut slide = Slide::new(slide_type);

    let blocks: Vec<(String, Rect, f64)> = layout
        .blocks
        .iter()
        .map(|b| (b.text(), b.bbox.normalize(layout.width, layout.height), b.max_size()))
        .filter(|(text, _, _)| !text.is_empty())
        .collect();

    // Running max over the top band; the first block to reach a size keeps it.
    let mut title: Option<(usize, f64)> = None;
    for (i, (_, rect, size)) in blocks.iter().enumerate() {
        if rect.y >= TITLE_BAND {
            continue;
        }
        if title.map_or(true, |(_, best)| *size > best) {
            title = Some((i, *size));
        }
    }

    slide.title = Some(match title {
        Some((i, _)) => blocks[i].0.clone(),
        None => NO_TITLE.to_string(),
    });

    for (i, (text, rect, size)) in blocks.into_iter().enumerate() {
        if title.map(|(t, _)| t) == Some(i) {
            continue;
        }
        let mut element = Element::text(text).with_rect(rect);
        if size > 0.0 {
            element = element.with_font_size(size);
        }
        slide.elements.push(element);
    }

    for (image, path) in layout.images.iter().zip(image_paths) {
        let Some(path) = path else { continue };
        for bbox in &image.placements {
            slide.elements.push(
                Element::image(path.display().to_string())
                    .with_rect(bbox.normalize(layout.width, layout.height)),
            );
        }
    }

    slide
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_core::ElementKind;

    fn block(text: &str, top: f64, size: f64) -> TextBlock {
        TextBlock {
            bbox: BBox::new(72.0, top, 300.0, top + size),
            spans: vec![TextSpan {
                text: text.to_string(),
                size,
                new_line: false,
            }],
        }
    }

    fn page(blocks: Vec<TextBlock>) -> PageLayout {
        PageLayout {
            blocks,
            ..PageLayout::new(1000.0, 1000.0)
        }
    }

    #[test]
    fn test_bbox_normalize() {
        let rect = BBox::new(100.0, 50.0, 600.0, 250.0).normalize(1000.0, 500.0);
        assert_eq!(rect, Rect::new(0.1, 0.1, 0.5, 0.4));
    }

    #[test]
    fn test_larger_top_block_wins_title() {
        let layout = page(vec![block("Small", 100.0, 18.0), block("Big", 50.0, 24.0)]);
        let slide = promote_page(1, &layout, &[]);

        assert_eq!(slide.slide_type, SlideType::Content);
        assert_eq!(slide.title.as_deref(), Some("Big"));
        // The displaced candidate stays as an element.
        assert_eq!(slide.elements.len(), 1);
        assert_eq!(slide.elements[0].content, "Small");
        assert_eq!(slide.elements[0].font_size, Some(18.0));
    }

    #[test]
    fn test_first_block_keeps_title_on_tie() {
        let layout = page(vec![block("First", 50.0, 24.0), block("Second", 100.0, 24.0)]);
        let slide = promote_page(0, &layout, &[]);

        assert_eq!(slide.slide_type, SlideType::Cover);
        assert_eq!(slide.title.as_deref(), Some("First"));
        assert_eq!(slide.elements[0].content, "Second");
    }

    #[test]
    fn test_blocks_below_band_never_become_title() {
        let layout = page(vec![block("Huge body", 500.0, 48.0), block("Header", 150.0, 12.0)]);
        let slide = promote_page(2, &layout, &[]);

        assert_eq!(slide.title.as_deref(), Some("Header"));

        let layout = page(vec![block("Body", 200.0, 48.0)]);
        let slide = promote_page(2, &layout, &[]);
        assert_eq!(slide.title.as_deref(), Some(NO_TITLE));
        assert_eq!(slide.elements.len(), 1);
    }

    #[test]
    fn test_block_text_joins_lines() {
        let block = TextBlock {
            bbox: BBox::new(0.0, 0.0, 10.0, 10.0),
            spans: vec![
                TextSpan { text: "Hello".into(), size: 12.0, new_line: false },
                TextSpan { text: "  ".into(), size: 40.0, new_line: false },
                TextSpan { text: "world".into(), size: 14.0, new_line: true },
            ],
        };
        assert_eq!(block.text(), "Hello world");
        assert_eq!(block.max_size(), 14.0);
    }

    #[test]
    fn test_images_follow_text_and_share_files() {
        let mut layout = page(vec![block("Caption", 800.0, 10.0)]);
        layout.place_image((5, 0), BBox::new(0.0, 0.0, 500.0, 500.0));
        layout.place_image((6, 0), BBox::new(0.0, 0.0, 100.0, 100.0));
        layout.place_image((5, 0), BBox::new(500.0, 500.0, 1000.0, 1000.0));
        assert_eq!(layout.images.len(), 2);

        let paths = vec![Some(PathBuf::from("img/im_p0_0.png")), None];
        let slide = promote_page(0, &layout, &paths);

        let kinds: Vec<_> = slide.elements.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ElementKind::Text, ElementKind::Image, ElementKind::Image]);
        assert_eq!(slide.elements[1].content, slide.elements[2].content);
        assert_eq!(slide.elements[2].rect, Some(Rect::new(0.5, 0.5, 0.5, 0.5)));
    }
}
