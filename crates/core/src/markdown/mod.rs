//! The intermediate Markdown deck dialect.
//!
//! Slides are separated by horizontal rules. Inside a slide:
//!
//! ~~~text
//! <!-- layout: コンテンツ -->
//! # Title
//! ## Subtitle
//! Body line
//! - bullet
//! ```chart:column
//! Optional title
//! Category, Series A, Series B
//! Q1, 1, 2
//! ```
//! <!-- element: type=text, rect=[0.1, 0.1, 0.5, 0.1], size=12, color=[0, 0, 0] -->
//! Absolutely positioned text
//! ![caption](path/to/image.png)
//! ~~~

pub mod parser;
pub mod writer;

pub use parser::{parse, split_slides, DeckParser, DEFAULT_IMAGE_RECT};
pub use writer::{serialize, DeckWriter};
