use std::cell::OnceCell;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::breakdown::classify;
use crate::error::{BreakdownError, Result};
use crate::model::Classification;
use crate::util::base_name;

/// An already-materialized breakdown page. The HTML tree is parsed on first
/// structural access and the filename classification is computed once.
pub struct Document {
    filename: String,
    content: String,
    tree: OnceCell<Html>,
    classification: OnceCell<Option<Classification>>,
}

impl Document {
    pub fn new(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
            tree: OnceCell::new(),
            classification: OnceCell::new(),
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn base_name(&self) -> &str {
        base_name(&self.filename)
    }

    pub fn is_parsed(&self) -> bool {
        self.tree.get().is_some()
    }

    pub fn tree(&self) -> &Html {
        self.tree.get_or_init(|| {
            debug!(filename = %self.filename, bytes = self.content.len(), "parsing document");
            Html::parse_document(&self.content)
        })
    }

    pub fn classification(&self) -> Result<&Classification> {
        self.classification
            .get_or_init(|| classify(&self.filename).ok())
            .as_ref()
            .ok_or_else(|| BreakdownError::UnrecognizedFilename(self.filename.clone()))
    }

    pub fn select<'a>(&'a self, selector: &'a Selector) -> impl Iterator<Item = ElementRef<'a>> {
        self.tree().select(selector)
    }

    pub fn contains(&self, selector: &Selector) -> bool {
        self.select(selector).next().is_some()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("filename", &self.filename)
            .field("parsed", &self.is_parsed())
            .finish()
    }
}
