//! Markdown deck parser.
//!
//! Each slide segment is scanned once, line by line, by a small state
//! machine. Malformed markup never fails the parse: a directive that does
//! not parse is treated as an ordinary line.

use crate::chart::{parse_chart_block, TableParser};
use crate::types::{
    Deck, Diagram, DiagramType, Element, ElementKind, Rect, Rgb, Slide, SlideType,
};
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

/// Slide separator: a line of three or more dashes.
static SEPARATOR_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-{3,}\s*$").unwrap());

static LAYOUT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*<!--\s*layout:\s*(.*?)\s*-->\s*$").unwrap());

static ELEMENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*<!--\s*element:\s*(.*?)\s*-->\s*$").unwrap());

/// `![alt](path)`; the path may contain one level of balanced parentheses.
static IMAGE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[(.*?)\]\(((?:[^()]|\([^()]*\))*)\)").unwrap());

static TYPE_PARAM_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|,)\s*type\s*=\s*([^,\s]*)").unwrap());

static RECT_PARAM_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|,)\s*rect\s*=\s*\[([^\]]*)\]").unwrap());

static SIZE_PARAM_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|,)\s*size\s*=\s*([^,\s]*)").unwrap());

static COLOR_PARAM_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|,)\s*color\s*=\s*\[([^\]]*)\]").unwrap());

/// Leads an element content line that would otherwise read as markup.
const CONTENT_ESCAPE: char = '\\';

/// Placement of an inline image reference that carries no element directive.
pub const DEFAULT_IMAGE_RECT: Rect = Rect {
    x: 0.525,
    y: 0.2667,
    w: 0.45,
    h: 0.5333,
};

/// Parser for the Markdown deck dialect.
#[derive(Debug, Clone, Default)]
pub struct DeckParser {
    tables: TableParser,
}

impl DeckParser {
    /// Create a parser with the default chart table policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific table parser for chart blocks.
    pub fn with_table_parser(mut self, tables: TableParser) -> Self {
        self.tables = tables;
        self
    }

    /// Parse a whole document into a deck.
    pub fn parse(&self, text: &str) -> Deck {
        let slides = split_slides(text)
            .into_iter()
            .map(|segment| self.parse_slide(&segment))
            .collect();

        Deck::from_slides(slides)
    }

    /// Parse one slide segment.
    ///
    /// Segments carry no state between each other, so callers may parse
    /// them independently.
    pub fn parse_slide(&self, segment: &str) -> Slide {
        let mut builder = SlideBuilder::new(&self.tables);
        for line in segment.lines() {
            builder.feed(line);
        }
        builder.finish()
    }
}

/// Parse a document with the default parser.
pub fn parse(text: &str) -> Deck {
    DeckParser::new().parse(text)
}

/// Split a document into slide segments, dropping whitespace-only ones.
pub fn split_slides(text: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        if SEPARATOR_REGEX.is_match(line) {
            segments.push(std::mem::take(&mut current));
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    segments.push(current);

    segments
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .collect()
}

/// Escape an element content line so it reads back as content.
///
/// Separators and directives get a leading backslash, as do lines that
/// already start with one.
pub(crate) fn escape_content_line(line: &str) -> Cow<'_, str> {
    if line.starts_with(CONTENT_ESCAPE)
        || SEPARATOR_REGEX.is_match(line)
        || LAYOUT_REGEX.is_match(line)
        || ELEMENT_REGEX.is_match(line)
    {
        Cow::Owned(format!("{}{}", CONTENT_ESCAPE, line))
    } else {
        Cow::Borrowed(line)
    }
}

/// A parsed `<!-- element: ... -->` directive waiting for its content line.
#[derive(Debug, Clone, PartialEq)]
struct ElementDirective {
    kind: ElementKind,
    rect: Option<Rect>,
    font_size: Option<f64>,
    color: Option<Rgb>,
}

impl ElementDirective {
    /// Parse the parameter list of an element directive.
    ///
    /// Returns `None` when the type is missing or any present parameter is
    /// malformed.
    fn parse(params: &str) -> Option<Self> {
        let kind = TYPE_PARAM_REGEX
            .captures(params)
            .and_then(|c| ElementKind::from_name(&c[1]))?;

        let rect = match RECT_PARAM_REGEX.captures(params) {
            Some(c) if c[1].trim().is_empty() => None,
            Some(c) => Some(Rect::from_slice(&parse_floats(&c[1])?)?),
            None => None,
        };

        let font_size = match SIZE_PARAM_REGEX.captures(params) {
            Some(c) => Some(c[1].parse::<f64>().ok()?),
            None => None,
        };

        let color = match COLOR_PARAM_REGEX.captures(params) {
            Some(c) => Some(parse_color(&c[1])?),
            None => None,
        };

        Some(Self {
            kind,
            rect,
            font_size,
            color,
        })
    }

    /// Attach the content line and produce the element.
    fn into_element(self, line: &str) -> Element {
        let line = line.trim();
        let (content, caption) = match self.kind {
            ElementKind::Image => match IMAGE_REGEX.captures(line) {
                Some(c) => (c[2].trim().to_string(), non_empty(&c[1])),
                None => (line.to_string(), None),
            },
            ElementKind::Text => (line.to_string(), None),
        };

        Element {
            kind: self.kind,
            content,
            rect: self.rect,
            font_size: self.font_size,
            color: self.color,
            caption,
        }
    }
}

fn parse_floats(list: &str) -> Option<Vec<f64>> {
    list.split(',').map(|v| v.trim().parse::<f64>().ok()).collect()
}

fn parse_color(list: &str) -> Option<Rgb> {
    let channels: Vec<u8> = list
        .split(',')
        .map(|v| v.trim().parse::<u8>().ok())
        .collect::<Option<_>>()?;

    match channels.as_slice() {
        [r, g, b] => Some(Rgb::new(*r, *g, *b)),
        _ => None,
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Line scanner state.
#[derive(Debug)]
enum State {
    Normal,
    InCodeBlock { tag: String, lines: Vec<String> },
    AwaitingElementContent(ElementDirective),
}

/// Assembles one slide from its lines.
struct SlideBuilder<'a> {
    tables: &'a TableParser,
    state: State,
    slide: Slide,
    layout_seen: bool,
    body_lines: Vec<String>,
}

impl<'a> SlideBuilder<'a> {
    fn new(tables: &'a TableParser) -> Self {
        Self {
            tables,
            state: State::Normal,
            slide: Slide::default(),
            layout_seen: false,
            body_lines: Vec::new(),
        }
    }

    fn feed(&mut self, line: &str) {
        match std::mem::replace(&mut self.state, State::Normal) {
            State::Normal => self.feed_normal(line),
            State::InCodeBlock { tag, mut lines } => {
                if is_fence(line) {
                    self.close_code_block(&tag, &lines);
                } else {
                    lines.push(line.to_string());
                    self.state = State::InCodeBlock { tag, lines };
                }
            }
            State::AwaitingElementContent(pending) => self.feed_element_content(pending, line),
        }
    }

    fn feed_normal(&mut self, line: &str) {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            return;
        }

        if let Some(c) = LAYOUT_REGEX.captures(line) {
            self.apply_layout(&c[1]);
            return;
        }

        if is_fence(line) {
            let tag = trimmed
                .trim_start_matches('`')
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_string();
            self.state = State::InCodeBlock {
                tag,
                lines: Vec::new(),
            };
            return;
        }

        if let Some(directive) = parse_element_directive(line) {
            self.state = State::AwaitingElementContent(directive);
            return;
        }

        if self.slide.title.is_none() {
            if let Some(title) = trimmed.strip_prefix("# ") {
                self.slide.title = Some(title.trim().to_string());
                return;
            }
        }

        if self.slide.subtitle.is_none() {
            if let Some(subtitle) = trimmed.strip_prefix("## ") {
                self.slide.subtitle = Some(subtitle.trim().to_string());
                return;
            }
        }

        if let Some(c) = IMAGE_REGEX.captures(line) {
            let path = c[2].trim();
            if !path.is_empty() {
                let mut element = Element::image(path).with_rect(DEFAULT_IMAGE_RECT);
                element.caption = non_empty(&c[1]);
                self.slide.elements.push(element);
                return;
            }
        }

        self.body_lines.push(line.to_string());
    }

    fn feed_element_content(&mut self, pending: ElementDirective, line: &str) {
        if line.trim().is_empty() {
            self.state = State::AwaitingElementContent(pending);
            return;
        }

        if let Some(escaped) = line.trim_start().strip_prefix(CONTENT_ESCAPE) {
            self.slide.elements.push(pending.into_element(escaped));
            return;
        }

        if let Some(c) = LAYOUT_REGEX.captures(line) {
            self.apply_layout(&c[1]);
            self.state = State::AwaitingElementContent(pending);
            return;
        }

        if let Some(directive) = parse_element_directive(line) {
            log::debug!("Element directive without content replaced: {:?}", pending);
            self.state = State::AwaitingElementContent(directive);
            return;
        }

        self.slide.elements.push(pending.into_element(line));
    }

    /// Only the first layout directive of a slide is honoured.
    fn apply_layout(&mut self, name: &str) {
        if self.layout_seen {
            log::debug!("Ignoring repeated layout directive '{}'", name);
            return;
        }
        self.layout_seen = true;
        self.slide.slide_type = SlideType::from_layout_name(name).unwrap_or_else(|| {
            log::debug!("Unknown layout '{}', using content layout", name);
            SlideType::Content
        });
    }

    fn close_code_block(&mut self, tag: &str, lines: &[String]) {
        if let Some(subtype) = tag.strip_prefix("chart:") {
            if self.slide.chart.is_some() {
                log::debug!("Dropping additional chart block '{}'", tag);
                return;
            }
            self.slide.chart = parse_chart_block(subtype, &lines.join("\n"), self.tables);
        } else if let Some(subtype) = tag.strip_prefix("diagram:") {
            let items: Vec<String> = lines
                .iter()
                .map(|l| l.trim())
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect();
            if !items.is_empty() {
                self.slide.diagrams.push(Diagram {
                    kind: DiagramType::from_tag(subtype),
                    items,
                });
            }
        } else {
            log::debug!("Ignoring fenced block with tag '{}'", tag);
        }
    }

    fn finish(mut self) -> Slide {
        match self.state {
            State::InCodeBlock { ref tag, .. } => {
                log::warn!("Unterminated fenced block '{}' dropped", tag);
            }
            State::AwaitingElementContent(ref pending) => {
                log::debug!("Element directive without content dropped: {:?}", pending);
            }
            State::Normal => {}
        }

        if !self.body_lines.is_empty() {
            self.slide.bullets = self
                .body_lines
                .iter()
                .filter_map(|l| strip_bullet(l))
                .collect();
            self.slide.body = Some(self.body_lines.join("\n"));
        }

        self.slide
    }
}

fn is_fence(line: &str) -> bool {
    line.trim_start().starts_with("```")
}

fn parse_element_directive(line: &str) -> Option<ElementDirective> {
    let c = ELEMENT_REGEX.captures(line)?;
    let directive = ElementDirective::parse(&c[1]);
    if directive.is_none() {
        log::debug!("Malformed element directive treated as text: {}", line.trim());
    }
    directive
}

/// Strip a leading `*` or `-` bullet marker.
fn strip_bullet(line: &str) -> Option<String> {
    let trimmed = line.trim_start();
    let rest = trimmed
        .strip_prefix("* ")
        .or_else(|| trimmed.strip_prefix("- "))?;
    Some(rest.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChartType;

    #[test]
    fn test_split_slides_drops_empty_segments() {
        let segments = split_slides("\n---\n# A\n----\n   \n---   \n# B\n---\n");
        assert_eq!(segments.len(), 2);
        assert!(segments[0].contains("# A"));
        assert!(segments[1].contains("# B"));
    }

    #[test]
    fn test_separator_requires_three_dashes() {
        let deck = parse("# A\n--\nstill A");
        assert_eq!(deck.slides.len(), 1);
        assert_eq!(deck.slides[0].body.as_deref(), Some("--\nstill A"));
    }

    #[test]
    fn test_layout_directive() {
        let deck = parse("<!-- layout: 表紙 -->\n# Cover\n---\n<!-- layout: 中見出し -->\n# S");
        assert_eq!(deck.slides[0].slide_type, SlideType::Cover);
        assert_eq!(deck.slides[1].slide_type, SlideType::Section);
    }

    #[test]
    fn test_unknown_layout_is_content() {
        let deck = parse("<!-- layout: 謎 -->\n# X");
        assert_eq!(deck.slides[0].slide_type, SlideType::Content);
    }

    #[test]
    fn test_second_layout_directive_is_ignored() {
        let deck = parse("<!-- layout: 目次 -->\n<!-- layout: 裏表紙 -->\n# X");
        assert_eq!(deck.slides[0].slide_type, SlideType::TableOfContents);
        assert_eq!(deck.slides[0].body, None);
    }

    #[test]
    fn test_first_title_and_subtitle_win() {
        let slide = DeckParser::new().parse_slide("# One\n## Sub\n# Two\n## Sub2");
        assert_eq!(slide.title.as_deref(), Some("One"));
        assert_eq!(slide.subtitle.as_deref(), Some("Sub"));
        assert_eq!(slide.body.as_deref(), Some("# Two\n## Sub2"));
    }

    #[test]
    fn test_no_title_is_none() {
        let slide = DeckParser::new().parse_slide("Just text");
        assert_eq!(slide.title, None);
        assert_eq!(slide.body.as_deref(), Some("Just text"));
    }

    #[test]
    fn test_body_and_bullets() {
        let slide = DeckParser::new().parse_slide("# T\nIntro\n\n- first\n  * second\n-dash");
        assert_eq!(
            slide.body.as_deref(),
            Some("Intro\n- first\n  * second\n-dash")
        );
        assert_eq!(slide.bullets, vec!["first", "second"]);
    }

    #[test]
    fn test_chart_block() {
        let slide = DeckParser::new()
            .parse_slide("```chart:bar\nSales\nItem, A\nx, 1\n```\nAfter chart");
        let chart = slide.chart.unwrap();
        assert_eq!(chart.chart_type, ChartType::BarClustered);
        assert_eq!(chart.title.as_deref(), Some("Sales"));
        assert_eq!(chart.categories, vec!["x"]);
        assert_eq!(slide.body.as_deref(), Some("After chart"));
    }

    #[test]
    fn test_second_chart_is_dropped() {
        let slide = DeckParser::new()
            .parse_slide("```chart:line\nh, a\nx, 1\n```\n```chart:pie\nh, b\ny, 2\n```");
        let chart = slide.chart.unwrap();
        assert_eq!(chart.chart_type, ChartType::Line);
        assert_eq!(chart.categories, vec!["x"]);
    }

    #[test]
    fn test_diagram_block() {
        let slide = DeckParser::new().parse_slide("```diagram:cycle\nPlan\n\nDo\nCheck\n```");
        assert_eq!(slide.diagrams.len(), 1);
        assert_eq!(slide.diagrams[0].kind, DiagramType::Cycle);
        assert_eq!(slide.diagrams[0].items, vec!["Plan", "Do", "Check"]);
    }

    #[test]
    fn test_other_code_blocks_are_ignored() {
        let slide = DeckParser::new().parse_slide("```python\nprint('# not a title')\n```");
        assert_eq!(slide.title, None);
        assert_eq!(slide.body, None);
    }

    #[test]
    fn test_unterminated_code_block_is_dropped() {
        let slide = DeckParser::new().parse_slide("# T\n```chart:bar\nh, a\nx, 1");
        assert_eq!(slide.title.as_deref(), Some("T"));
        assert!(slide.chart.is_none());
    }

    #[test]
    fn test_text_element_directive() {
        let slide = DeckParser::new().parse_slide(
            "<!-- element: type=text, rect=[0.1, 0.2, 0.3, 0.4], size=18.5, color=[255, 0, 10] -->\n\nHello there",
        );
        assert_eq!(slide.elements.len(), 1);
        let element = &slide.elements[0];
        assert_eq!(element.kind, ElementKind::Text);
        assert_eq!(element.content, "Hello there");
        assert_eq!(element.rect, Some(Rect::new(0.1, 0.2, 0.3, 0.4)));
        assert_eq!(element.font_size, Some(18.5));
        assert_eq!(element.color, Some(Rgb::new(255, 0, 10)));
        assert_eq!(slide.body, None);
    }

    #[test]
    fn test_image_element_directive() {
        let slide = DeckParser::new().parse_slide(
            "<!-- element: type=image, rect=[0, 0, 1, 1] -->\n![logo](img/logo.png)\n<!-- element: type=image -->\nimg/raw.png",
        );
        assert_eq!(slide.elements.len(), 2);
        assert_eq!(slide.elements[0].kind, ElementKind::Image);
        assert_eq!(slide.elements[0].content, "img/logo.png");
        assert_eq!(slide.elements[0].caption.as_deref(), Some("logo"));
        assert_eq!(slide.elements[1].content, "img/raw.png");
        assert_eq!(slide.elements[1].rect, None);
    }

    #[test]
    fn test_element_consumes_single_line() {
        let slide = DeckParser::new()
            .parse_slide("<!-- element: type=text -->\n# Not a title\nSecond line");
        assert_eq!(slide.elements[0].content, "# Not a title");
        assert_eq!(slide.title, None);
        assert_eq!(slide.body.as_deref(), Some("Second line"));
    }

    #[test]
    fn test_malformed_element_directive_becomes_body() {
        for line in [
            "<!-- element: type=text, rect=[0.1, 0.2] -->",
            "<!-- element: type=text, color=[red, 0, 0] -->",
            "<!-- element: type=video -->",
            "<!-- element: size=12 -->",
            "<!-- element: type=text, size=big -->",
        ] {
            let slide = DeckParser::new().parse_slide(&format!("{line}\ncontent"));
            assert!(slide.elements.is_empty(), "{line}");
            assert_eq!(slide.body.as_deref(), Some(format!("{line}\ncontent").as_str()));
        }
    }

    #[test]
    fn test_inline_image_reference() {
        let slide = DeckParser::new().parse_slide("# T\n![A chart](out/chart.png)");
        assert_eq!(slide.elements.len(), 1);
        let element = &slide.elements[0];
        assert_eq!(element.kind, ElementKind::Image);
        assert_eq!(element.content, "out/chart.png");
        assert_eq!(element.caption.as_deref(), Some("A chart"));
        assert_eq!(element.rect, Some(DEFAULT_IMAGE_RECT));
        assert_eq!(slide.body, None);
    }

    #[test]
    fn test_escaped_element_content() {
        let deck = parse(
            "# T\n<!-- element: type=text -->\n\\-----\n<!-- element: type=text -->\n\\<!-- layout: 裏表紙 -->\n<!-- element: type=text -->\n\\\\server\nAfter",
        );
        assert_eq!(deck.slides.len(), 1);

        let slide = &deck.slides[0];
        assert_eq!(slide.slide_type, SlideType::Content);
        let contents: Vec<_> = slide.elements.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["-----", "<!-- layout: 裏表紙 -->", "\\server"]);
        assert_eq!(slide.body.as_deref(), Some("After"));
    }

    #[test]
    fn test_escape_content_line() {
        assert_eq!(escape_content_line("plain text"), "plain text");
        assert_eq!(escape_content_line("---"), "\\---");
        assert_eq!(escape_content_line("<!-- element: type=image -->"), "\\<!-- element: type=image -->");
        assert_eq!(escape_content_line("\\n"), "\\\\n");
        assert_eq!(escape_content_line("- bullet"), "- bullet");
    }

    #[test]
    fn test_image_path_with_parentheses() {
        let slide = DeckParser::new()
            .parse_slide("![shot](out (1)/extracted_images/im_p0_0.png) (see notes)");
        assert_eq!(slide.elements[0].content, "out (1)/extracted_images/im_p0_0.png");

        let slide = DeckParser::new()
            .parse_slide("<!-- element: type=image -->\n![](decks (v2)/a.png)");
        assert_eq!(slide.elements[0].content, "decks (v2)/a.png");
    }

    #[test]
    fn test_deck_title() {
        assert_eq!(parse("# First\n---\n# Second").title, "First");
        assert_eq!(parse("no title").title, "Untitled Presentation");
        assert_eq!(parse("").slides.len(), 0);
    }
}
