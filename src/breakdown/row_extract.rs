use std::sync::LazyLock;

use scraper::{ElementRef, Selector};
use tracing::debug;

use crate::document::Document;
use crate::error::{BreakdownError, Result};
use crate::model::Category;
use crate::util::element_text;

/// One data row of the source grid, cells trimmed, header already excluded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawRow {
    pub cells: Vec<String>,
}

impl RawRow {
    pub fn new<I, S>(cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cells: cells.into_iter().map(Into::into).collect(),
        }
    }

    pub fn cell(&self, index: usize) -> &str {
        self.cells.get(index).map(String::as_str).unwrap_or("")
    }
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid row selector")
}

static STYLE9_ROWS: LazyLock<Selector> = LazyLock::new(|| selector("table.S0ESTILO9 tr"));
static STYLE8_ROWS: LazyLock<Selector> = LazyLock::new(|| selector("table.S0ESTILO8 tr"));
static TABLE_HEADER: LazyLock<Selector> = LazyLock::new(|| selector("table > thead"));
static TABLE: LazyLock<Selector> = LazyLock::new(|| selector("table"));
static TR: LazyLock<Selector> = LazyLock::new(|| selector("tr"));
static TD: LazyLock<Selector> = LazyLock::new(|| selector("td"));
static SPAN: LazyLock<Selector> = LazyLock::new(|| selector("span"));
static BLOCK_ROWS: LazyLock<Selector> =
    LazyLock::new(|| selector("body > div > div:nth-child(3) > div:nth-child(2) > div"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowStrategy {
    /// 2008 generation style class.
    Style9Table,
    Style8Table,
    /// Auto-generated stylesheets (2014, 2018): find the table through its header.
    HeaderTable,
    /// Later generations drop tables for positioned div blocks.
    DivBlocks,
}

const ROW_STRATEGIES: &[RowStrategy] = &[
    RowStrategy::Style9Table,
    RowStrategy::Style8Table,
    RowStrategy::HeaderTable,
    RowStrategy::DivBlocks,
];

impl RowStrategy {
    fn as_str(self) -> &'static str {
        match self {
            RowStrategy::Style9Table => "style9_table",
            RowStrategy::Style8Table => "style8_table",
            RowStrategy::HeaderTable => "header_table",
            RowStrategy::DivBlocks => "div_blocks",
        }
    }

    fn rows(self, document: &Document) -> Vec<RawRow> {
        match self {
            RowStrategy::Style9Table => table_rows(document.select(&STYLE9_ROWS)),
            RowStrategy::Style8Table => table_rows(document.select(&STYLE8_ROWS)),
            RowStrategy::HeaderTable => {
                let Some(table) = document
                    .select(&TABLE_HEADER)
                    .next()
                    .and_then(|header| header.parent())
                    .and_then(ElementRef::wrap)
                else {
                    return Vec::new();
                };
                table_rows(table.select(&TR))
            }
            RowStrategy::DivBlocks => {
                if document.contains(&TABLE) {
                    return Vec::new();
                }
                document
                    .select(&BLOCK_ROWS)
                    .map(|block| RawRow {
                        cells: block.select(&SPAN).map(element_text).collect(),
                    })
                    .collect()
            }
        }
    }
}

fn table_rows<'a>(rows: impl Iterator<Item = ElementRef<'a>>) -> Vec<RawRow> {
    rows.skip(1)
        .map(|row| RawRow {
            cells: row.select(&TD).map(element_text).collect(),
        })
        .collect()
}

/// Known per-era layout artifacts, removed before column mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Calibration {
    DropLeadingCell,
}

struct CalibrationRule {
    categories: &'static [Category],
    first_year: u16,
    last_year: u16,
    calibration: Calibration,
}

const CALIBRATIONS: &[CalibrationRule] = &[CalibrationRule {
    categories: &[Category::StateEntity, Category::NonStateEntity],
    first_year: 2012,
    last_year: 2017,
    calibration: Calibration::DropLeadingCell,
}];

fn calibrations_for(category: Category, year: u16) -> impl Iterator<Item = Calibration> {
    CALIBRATIONS
        .iter()
        .filter(move |rule| {
            rule.categories.contains(&category)
                && (rule.first_year..=rule.last_year).contains(&year)
        })
        .map(|rule| rule.calibration)
}

fn apply_calibration(rows: &mut [RawRow], calibration: Calibration) {
    match calibration {
        Calibration::DropLeadingCell => {
            for row in rows {
                if !row.cells.is_empty() {
                    row.cells.remove(0);
                }
            }
        }
    }
}

/// Locates the data grid, trying each layout strategy in priority order, and
/// returns its rows calibrated for the document's era.
pub fn extract_rows(document: &Document, category: Category, year: u16) -> Result<Vec<RawRow>> {
    for strategy in ROW_STRATEGIES {
        let mut rows = strategy.rows(document);
        if rows.is_empty() {
            continue;
        }

        debug!(
            filename = %document.filename(),
            strategy = strategy.as_str(),
            rows = rows.len(),
            "located data rows"
        );
        for calibration in calibrations_for(category, year) {
            debug!(filename = %document.filename(), ?calibration, "applying layout calibration");
            apply_calibration(&mut rows, calibration);
        }
        return Ok(rows);
    }

    Err(BreakdownError::UnsupportedLayout {
        filename: document.filename().to_string(),
    })
}

/// Raw grid without era calibration, for positional lookups on documents
/// that are not fully parsed.
pub fn extract_uncalibrated_rows(document: &Document) -> Result<Vec<RawRow>> {
    ROW_STRATEGIES
        .iter()
        .map(|strategy| strategy.rows(document))
        .find(|rows| !rows.is_empty())
        .ok_or_else(|| BreakdownError::UnsupportedLayout {
            filename: document.filename().to_string(),
        })
}
