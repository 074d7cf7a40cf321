//! Chart table parsing.
//!
//! Chart blocks carry comma-separated rows: a header naming the category
//! column and each series, then one row per category. Parsing never fails;
//! unparseable cells become `0.0` and a header with fewer than two columns
//! yields an empty table.

use crate::types::{Chart, ChartType, Series};

/// Fence tag suffixes and the chart type they select.
const CHART_TAGS: &[(&str, ChartType)] = &[
    ("bar", ChartType::BarClustered),
    ("bar_clustered", ChartType::BarClustered),
    ("column", ChartType::ColumnClustered),
    ("column_clustered", ChartType::ColumnClustered),
    ("line", ChartType::Line),
    ("line_markers", ChartType::Line),
    ("pie", ChartType::Pie),
];

/// Look up the chart type for a `chart:<subtype>` fence tag suffix.
///
/// Unknown subtypes fall back to a clustered column chart.
pub fn chart_type_from_tag(subtype: &str) -> ChartType {
    let key = subtype.trim().to_lowercase();
    CHART_TAGS
        .iter()
        .find(|(tag, _)| *tag == key)
        .map(|(_, chart_type)| *chart_type)
        .unwrap_or_else(|| {
            log::debug!("Unknown chart subtype '{}', using column chart", subtype);
            ChartType::default()
        })
}

/// What to do with a row that has fewer fields than the header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShortRowPolicy {
    /// Pad on the right with empty cells (which parse as `0.0`).
    #[default]
    Pad,
    /// Skip the row entirely.
    Drop,
}

/// Categories and series parsed from a chart table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableData {
    pub categories: Vec<String>,
    pub series: Vec<Series>,
}

impl TableData {
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Parser for comma-separated chart tables.
#[derive(Debug, Clone, Default)]
pub struct TableParser {
    short_rows: ShortRowPolicy,
}

impl TableParser {
    /// Create a parser that pads short rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the short-row policy.
    pub fn with_short_rows(mut self, policy: ShortRowPolicy) -> Self {
        self.short_rows = policy;
        self
    }

    /// Parse a table into categories and series.
    pub fn parse(&self, text: &str) -> TableData {
        let mut rows = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(split_row);

        let header = match rows.next() {
            Some(header) if header.len() >= 2 => header,
            _ => return TableData::default(),
        };

        let mut series: Vec<Series> = header[1..]
            .iter()
            .map(|name| Series {
                name: name.trim().to_string(),
                values: Vec::new(),
            })
            .collect();
        let mut categories = Vec::new();

        for mut row in rows {
            if row.len() < header.len() {
                match self.short_rows {
                    ShortRowPolicy::Pad => row.resize(header.len(), String::new()),
                    ShortRowPolicy::Drop => {
                        log::debug!("Dropping short chart row: {:?}", row);
                        continue;
                    }
                }
            }

            categories.push(row[0].trim().to_string());
            for (s, cell) in series.iter_mut().zip(&row[1..]) {
                s.values.push(parse_number(cell));
            }
        }

        TableData { categories, series }
    }
}

/// Parse a table with the default short-row policy.
pub fn parse_table(text: &str) -> TableData {
    TableParser::new().parse(text)
}

/// Parse a numeric cell.
///
/// Surrounding whitespace and thousands separators are removed; anything
/// that still does not parse becomes `0.0`.
pub fn parse_number(cell: &str) -> f64 {
    let cleaned: String = cell.trim().chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().unwrap_or(0.0)
}

/// Build a chart from the body of a `chart:<subtype>` block.
///
/// A first line without a comma is the chart title. Returns `None` when
/// the remaining table has no series.
pub fn parse_chart_block(subtype: &str, content: &str, parser: &TableParser) -> Option<Chart> {
    let content = content.trim();
    let (title, table) = match content.split_once('\n') {
        Some((first, rest)) if !first.contains(',') => (Some(first.trim()), rest),
        None if !content.contains(',') => (Some(content), ""),
        _ => (None, content),
    };

    let data = parser.parse(table);
    if data.is_empty() {
        log::debug!("Chart block without a usable table, ignoring");
        return None;
    }

    Some(Chart {
        title: title.filter(|t| !t.is_empty()).map(str::to_string),
        chart_type: chart_type_from_tag(subtype),
        categories: data.categories,
        series: data.series,
    })
}

/// Split one row on commas, honouring double-quoted fields.
///
/// A field is quoted when its first non-blank character is `"`; a doubled
/// quote inside a quoted field is a literal quote.
fn split_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
            }
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);

    fields
}
