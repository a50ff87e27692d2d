mod classifier;
mod generic;
mod grid_normalize;
mod institutions;
mod metadata_scrape;
mod reconcile;
mod row_extract;

pub use classifier::{
    classify, filename_year, is_entity_breakdown, is_income_breakdown, is_programme_breakdown,
};
pub use generic::{GenericBreakdown, source_url};
pub use grid_normalize::{ColumnMap, GridContext, NormalizedRow, ServiceColumn, normalize_rows};
pub use institutions::{InstitutionSource, collect_institutions};
pub use metadata_scrape::{HeaderLabel, match_label, scrape_header};
pub use reconcile::{ContextKeys, OpenContext, ReconcileScope, SubtotalReconciler, reconcile};
pub use row_extract::{RawRow, extract_rows, extract_uncalibrated_rows};

use tracing::debug;

use crate::config::ExtractionConfig;
use crate::document::Document;
use crate::error::{BreakdownError, Result};
use crate::model::{
    Category, Classification, EntityChild, HeaderName, Institution, Level, LineItem,
};

/// A classified breakdown page and the operations its category supports.
#[derive(Debug)]
pub struct Breakdown<'c> {
    document: Document,
    classification: Classification,
    config: &'c ExtractionConfig,
}

impl<'c> Breakdown<'c> {
    /// Classifies the document from its filename. The HTML is not parsed
    /// until an operation needs it.
    pub fn new(document: Document, config: &'c ExtractionConfig) -> Result<Self> {
        let classification = document.classification()?.clone();
        Ok(Self {
            document,
            classification,
            config,
        })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    pub fn category(&self) -> Category {
        self.classification.category
    }

    pub fn year(&self) -> u16 {
        self.classification.year
    }

    pub fn url(&self) -> String {
        source_url(
            &self.config.source_base_url,
            self.classification.year,
            self.classification.is_final(),
            self.document.base_name(),
        )
    }

    pub fn header(&self, label: HeaderLabel) -> Option<HeaderName> {
        scrape_header(&self.document, label)
    }

    /// Name of the section, agency, service or programme the page describes.
    pub fn name(&self) -> Option<String> {
        let label = match self.category() {
            Category::StateEntity => HeaderLabel::Section,
            Category::NonStateEntity => HeaderLabel::Agency,
            Category::Income => HeaderLabel::Entity,
            Category::Programme => HeaderLabel::Programme,
        };
        self.header(label).map(|header| header.name)
    }

    /// Expense line items of an entity or programme breakdown.
    pub fn expenses(&self) -> Result<Vec<LineItem>> {
        if self.category() == Category::Income {
            return Err(self.mismatch("expense"));
        }
        self.line_items()
    }

    pub fn income(&self) -> Result<Vec<LineItem>> {
        if self.category() != Category::Income {
            return Err(self.mismatch("income"));
        }
        self.line_items()
    }

    /// Leaf and subtotal items in document order, whatever the category.
    pub fn line_items(&self) -> Result<Vec<LineItem>> {
        let programme = self.programme_header();
        let section = self.section_id()?;
        let rows = self.normalize(programme.as_ref())?;

        let description = match (self.category(), &programme) {
            (Category::Programme, Some(programme)) => Some(programme.name.clone()),
            _ => self.name(),
        };
        let mut root = OpenContext::root(section.clone(), description);
        if let Some(entity) = self.fixed_service() {
            root = root.with_service(entity);
        }
        if let Some(programme) = &programme {
            root = root.with_programme(programme.id.clone());
        }

        reconcile(
            &rows,
            root,
            ReconcileScope {
                filename: self.document.filename(),
                year: self.year(),
                section: &section,
                validate_subtotals: self.config.validate_subtotals,
            },
        )
    }

    pub fn normalized_rows(&self) -> Result<Vec<NormalizedRow>> {
        self.normalize(self.programme_header().as_ref())
    }

    pub fn institutions(&self) -> Result<Vec<Institution>> {
        let section_header = self.header(HeaderLabel::Section);
        let section = match (&self.classification.section, &section_header) {
            (Some(section), _) => section.clone(),
            (None, Some(header)) => header.id.clone(),
            (None, None) => return Err(self.missing(HeaderLabel::Section)),
        };
        let entity_name = match self.category() {
            Category::NonStateEntity => self.header(HeaderLabel::Agency),
            Category::Income => self.header(HeaderLabel::Entity),
            Category::StateEntity | Category::Programme => None,
        };
        let rows = match self.category() {
            Category::StateEntity | Category::Programme => self.normalized_rows()?,
            Category::NonStateEntity | Category::Income => Vec::new(),
        };

        let source = InstitutionSource {
            category: self.category(),
            section: &section,
            section_name: section_header.map(|header| header.name),
            entity: self.fixed_service(),
            entity_name: entity_name.map(|header| header.name),
        };
        Ok(collect_institutions(&source, &rows))
    }

    /// Direct children of an entity breakdown: its services for a state
    /// entity, the entity itself otherwise.
    pub fn children(&self) -> Result<Vec<EntityChild>> {
        match self.category() {
            Category::StateEntity => Ok(self
                .line_items()?
                .into_iter()
                .filter(|item| item.level() == Some(Level::Service))
                .filter_map(|item| {
                    item.service.map(|id| EntityChild {
                        id,
                        name: Some(item.description),
                    })
                })
                .collect()),
            Category::NonStateEntity => Ok(self
                .classification
                .entity
                .clone()
                .map(|id| EntityChild {
                    id,
                    name: self.name(),
                })
                .into_iter()
                .collect()),
            Category::Income | Category::Programme => Err(self.mismatch("entity")),
        }
    }

    fn normalize(&self, programme: Option<&HeaderName>) -> Result<Vec<NormalizedRow>> {
        let raw = extract_rows(&self.document, self.category(), self.year())?;
        normalize_rows(
            &raw,
            &GridContext {
                filename: self.document.filename(),
                category: self.category(),
                year: self.year(),
                fixed_service: self.fixed_service(),
                programme,
                config: self.config,
            },
        )
    }

    fn programme_header(&self) -> Option<HeaderName> {
        if self.category() != Category::Programme {
            return None;
        }
        self.header(HeaderLabel::Programme)
    }

    /// Programme filenames carry no section, so it has to come from the page.
    fn section_id(&self) -> Result<String> {
        if let Some(section) = &self.classification.section {
            return Ok(section.clone());
        }
        let header = self
            .header(HeaderLabel::Section)
            .ok_or_else(|| self.missing(HeaderLabel::Section))?;
        debug!(
            filename = %self.document.filename(),
            section = %header.id,
            "section taken from header"
        );
        Ok(header.id)
    }

    fn fixed_service(&self) -> Option<&str> {
        match self.category() {
            Category::NonStateEntity | Category::Income => self.classification.entity.as_deref(),
            Category::StateEntity | Category::Programme => None,
        }
    }

    fn mismatch(&self, expected: &'static str) -> BreakdownError {
        BreakdownError::CategoryMismatch {
            filename: self.document.filename().to_string(),
            expected,
        }
    }

    fn missing(&self, label: HeaderLabel) -> BreakdownError {
        BreakdownError::MissingMetadata {
            filename: self.document.filename().to_string(),
            label: label.as_str(),
        }
    }
}
