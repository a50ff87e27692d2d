use std::sync::LazyLock;

use regex::Regex;

use crate::breakdown::classifier::filename_year;
use crate::breakdown::row_extract::extract_uncalibrated_rows;
use crate::document::Document;
use crate::error::Result;

static STAGE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"N_(\d\d)_([ASE])_").expect("valid stage token regex"));

/// Public address of a breakdown page in the ministry's archive.
pub fn source_url(base_url: &str, year: u16, is_final: bool, base_name: &str) -> String {
    format!(
        "{}/PGE{}{}/MaestroDocumentos/PGE-ROM/doc/HTM/{}",
        base_url.trim_end_matches('/'),
        year,
        if is_final { "Ley" } else { "Proyecto" },
        base_name
    )
}

/// Lookups on breakdowns that are never fully reconciled, such as summary
/// pages read for a single figure.
#[derive(Debug)]
pub struct GenericBreakdown {
    document: Document,
}

impl GenericBreakdown {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn year(&self) -> Option<u16> {
        filename_year(self.document.base_name())
    }

    pub fn is_final(&self) -> bool {
        STAGE_TOKEN
            .captures(self.document.base_name())
            .and_then(|captures| captures.get(2))
            .map(|stage| stage.as_str() == "E")
            .unwrap_or(false)
    }

    /// Cell at a row/column position of the data grid. Negative positions
    /// count from the end, `-1` being the last.
    pub fn item_by_position(&self, row: isize, column: isize) -> Result<Option<String>> {
        let rows = extract_uncalibrated_rows(&self.document)?;
        let cell = resolve_index(rows.len(), row)
            .and_then(|index| rows.get(index))
            .and_then(|raw| {
                resolve_index(raw.cells.len(), column).map(|index| raw.cells[index].clone())
            });
        Ok(cell)
    }

    /// Right-most cell of the first row whose `description_column` cell
    /// equals `description`.
    pub fn value_by_description(
        &self,
        description: &str,
        description_column: usize,
    ) -> Result<Option<String>> {
        let rows = extract_uncalibrated_rows(&self.document)?;
        Ok(rows
            .iter()
            .find(|raw| raw.cell(description_column) == description)
            .and_then(|raw| raw.cells.last().cloned()))
    }

    pub fn url(&self, base_url: &str) -> Option<String> {
        let year = self.year()?;
        Some(source_url(
            base_url,
            year,
            self.is_final(),
            self.document.base_name(),
        ))
    }
}

fn resolve_index(len: usize, position: isize) -> Option<usize> {
    if position >= 0 {
        let index = position as usize;
        (index < len).then_some(index)
    } else {
        len.checked_sub(position.unsigned_abs())
    }
}
