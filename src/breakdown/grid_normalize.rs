use rust_decimal::Decimal;
use tracing::debug;

use crate::breakdown::row_extract::RawRow;
use crate::config::ExtractionConfig;
use crate::error::{BreakdownError, Result};
use crate::model::{Category, HeaderName};
use crate::util::parse_amount;

/// A grid row mapped onto semantic fields. Blank hierarchy keys are empty
/// strings; service and programme already hold their carried values.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NormalizedRow {
    pub service: String,
    pub programme: String,
    pub expense_concept: String,
    pub description: String,
    pub amount: Option<Decimal>,
    /// The service cell was printed on this row rather than carried from the
    /// rows above.
    pub opens_service: bool,
    /// Same for the programme cell.
    pub opens_programme: bool,
    pub service_name: Option<String>,
    /// Description to emit for the subtotal of the context this row opens,
    /// when it differs from the row's own description.
    pub subtotal_label: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceColumn {
    Plain(usize),
    /// `SS.sss` section and service joined by a dot.
    SectionDotted(usize),
}

/// Positional column layout of a category's grid, after era calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub service: Option<ServiceColumn>,
    pub programme: Option<usize>,
    pub expense_concept: usize,
    pub description: usize,
    pub amounts: [usize; 2],
}

impl Category {
    pub fn column_map(self) -> ColumnMap {
        match self {
            Category::StateEntity => ColumnMap {
                service: Some(ServiceColumn::Plain(0)),
                programme: Some(1),
                expense_concept: 2,
                description: 3,
                amounts: [4, 5],
            },
            // Non-state grids lack the service column: the entity is the only service.
            Category::NonStateEntity => ColumnMap {
                service: None,
                programme: Some(0),
                expense_concept: 1,
                description: 2,
                amounts: [3, 4],
            },
            Category::Income => ColumnMap {
                service: None,
                programme: None,
                expense_concept: 0,
                description: 1,
                amounts: [2, 3],
            },
            Category::Programme => ColumnMap {
                service: Some(ServiceColumn::SectionDotted(0)),
                programme: None,
                expense_concept: 1,
                description: 2,
                amounts: [3, 4],
            },
        }
    }
}

pub struct GridContext<'a> {
    pub filename: &'a str,
    pub category: Category,
    pub year: u16,
    /// Service every row belongs to unless a row prints its own.
    pub fixed_service: Option<&'a str>,
    /// Document-wide programme of a programme breakdown.
    pub programme: Option<&'a HeaderName>,
    pub config: &'a ExtractionConfig,
}

pub fn normalize_rows(rows: &[RawRow], context: &GridContext<'_>) -> Result<Vec<NormalizedRow>> {
    let map = context.category.column_map();
    let mut last_service = context.fixed_service.unwrap_or_default().to_string();
    let mut last_programme = String::new();
    let mut normalized = Vec::<NormalizedRow>::with_capacity(rows.len());
    let mut filler_rows = 0usize;

    for raw in rows {
        let description = context
            .config
            .corrected_description(context.year, raw.cell(map.description))
            .to_string();
        if description.is_empty() {
            filler_rows += 1;
            continue;
        }

        let amount = read_amount(raw, &map, &description, context.filename)?;
        let mut row = NormalizedRow {
            expense_concept: raw.cell(map.expense_concept).to_string(),
            amount,
            ..NormalizedRow::default()
        };

        let service_cell = match map.service {
            Some(ServiceColumn::Plain(index)) => raw.cell(index),
            Some(ServiceColumn::SectionDotted(index)) => raw
                .cell(index)
                .split_once('.')
                .map(|(_, service)| service.trim())
                .unwrap_or_default(),
            None => "",
        };
        if service_cell.is_empty() {
            row.service = last_service.clone();
        } else {
            // A new service invalidates the programme carried from the previous one.
            last_service = service_cell.to_string();
            last_programme.clear();
            row.service = last_service.clone();
            row.opens_service = true;
            row.service_name = Some(description.clone());
        }

        let programme_cell = map.programme.map(|index| raw.cell(index)).unwrap_or_default();
        if programme_cell.is_empty() {
            row.programme = last_programme.clone();
        } else {
            last_programme = programme_cell.to_string();
            row.programme = last_programme.clone();
            row.opens_programme = true;
        }

        if context.category == Category::Programme {
            // Programme grids nest services inside the programme; their service
            // subtotals carry the programme name.
            if let Some(programme) = context.programme {
                row.programme = programme.id.clone();
                if row.opens_service {
                    row.subtotal_label = Some(programme.name.clone());
                }
            }
        }

        row.description = description;
        normalized.push(row);
    }

    debug!(
        filename = %context.filename,
        rows = normalized.len(),
        filler_rows,
        "normalized grid"
    );
    Ok(normalized)
}

fn read_amount(
    raw: &RawRow,
    map: &ColumnMap,
    description: &str,
    filename: &str,
) -> Result<Option<Decimal>> {
    let first = raw.cell(map.amounts[0]);
    let second = raw.cell(map.amounts[1]);

    let chosen = match (first.is_empty(), second.is_empty()) {
        (true, true) => return Ok(None),
        (false, true) => first,
        (true, false) => second,
        (false, false) => {
            return Err(BreakdownError::ConflictingAmounts {
                filename: filename.to_string(),
                row: description.to_string(),
                first: first.to_string(),
                second: second.to_string(),
            });
        }
    };

    parse_amount(chosen)
        .map(Some)
        .ok_or_else(|| BreakdownError::InvalidAmount {
            filename: filename.to_string(),
            raw: chosen.to_string(),
        })
}
