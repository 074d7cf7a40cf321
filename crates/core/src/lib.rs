//! Core slide deck model, the Markdown deck dialect, and chart table
//! parsing for deck conversion.

pub mod chart;
pub mod error;
pub mod markdown;
pub mod provider;
pub mod types;

pub use chart::{parse_table, ShortRowPolicy, TableData, TableParser};
pub use error::{Error, Result};
pub use markdown::{parse, serialize, DeckParser, DeckWriter};
pub use provider::{ContentProvider, GenerationConfig};
pub use types::{
    Chart, ChartType, Deck, Diagram, DiagramType, Element, ElementKind, Rect, Rgb, Series, Slide,
    SlideType,
};
