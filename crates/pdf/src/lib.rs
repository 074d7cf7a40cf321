//! Heuristic extraction of slide layouts from PDF files.
//!
//! Each page is read into text blocks and image placements, then promoted
//! into a [`deck_core::Slide`]: the largest block in the top fifth of the
//! page becomes the title, the rest become positioned elements.

pub mod cmap;
pub mod content;
pub mod extractor;
pub mod images;
pub mod layout;
mod objects;
pub mod text;

pub use content::PageReader;
pub use extractor::{extract, PdfExtractor};
pub use images::{DirectorySink, ImageData, ImageSink};
pub use layout::{promote_page, BBox, PageLayout, TextBlock, TextSpan, NO_TITLE, TITLE_BAND};
