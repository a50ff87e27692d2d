use std::sync::LazyLock;

use regex::Regex;
use scraper::Selector;
use tracing::{debug, warn};

use crate::document::Document;
use crate::model::HeaderName;
use crate::util::element_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderLabel {
    /// `Sección: NN name`
    Section,
    /// `Organismo: NNN name`
    Agency,
    /// `Programa: NNNx name`
    Programme,
    /// `Servicio|Organismo|Entidad: N.. name`, the income breakdown's owner.
    Entity,
}

impl HeaderLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            HeaderLabel::Section => "Sección",
            HeaderLabel::Agency => "Organismo",
            HeaderLabel::Programme => "Programa",
            HeaderLabel::Entity => "Servicio/Organismo/Entidad",
        }
    }

    fn pattern(self) -> &'static Regex {
        match self {
            HeaderLabel::Section => &SECTION_RE,
            HeaderLabel::Agency => &AGENCY_RE,
            HeaderLabel::Programme => &PROGRAMME_RE,
            HeaderLabel::Entity => &ENTITY_RE,
        }
    }

    fn sources(self) -> &'static [ScanSource] {
        match self {
            HeaderLabel::Section => &[
                ScanSource::StyleClassFirst,
                ScanSource::Cells,
                ScanSource::Spans,
            ],
            HeaderLabel::Programme => &[
                ScanSource::StyleClassLast,
                ScanSource::Cells,
                ScanSource::Spans,
            ],
            HeaderLabel::Agency | HeaderLabel::Entity => &[ScanSource::Cells, ScanSource::Spans],
        }
    }
}

// Names carry accented characters, so they are matched with `.+` rather than `\w+`.
static SECTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Sección: (\d\d) (.+)$").expect("valid section regex"));
static AGENCY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Organismo: (\d\d\d) (.+)$").expect("valid agency regex"));
static PROGRAMME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Programa: (\d\d\d\w) (.+)$").expect("valid programme regex"));
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:Servicio|Organismo|Entidad): (\d+) (.+)$").expect("valid entity regex")
});

static STYLE3: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".S0ESTILO3").expect("valid style selector"));
static TD: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").expect("valid td selector"));
static SPAN: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span").expect("valid span selector"));

/// Where to look for a header label, in priority order. No structural anchor
/// survives every document generation, so the fallbacks scan every text cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanSource {
    /// The header style class; section first, programme last.
    StyleClassFirst,
    StyleClassLast,
    /// Table generations.
    Cells,
    /// Div-based generations.
    Spans,
}

impl ScanSource {
    fn as_str(self) -> &'static str {
        match self {
            ScanSource::StyleClassFirst => "style_class_first",
            ScanSource::StyleClassLast => "style_class_last",
            ScanSource::Cells => "cells",
            ScanSource::Spans => "spans",
        }
    }

    fn candidates(self, document: &Document) -> Vec<String> {
        match self {
            ScanSource::StyleClassFirst => document
                .select(&STYLE3)
                .next()
                .map(element_text)
                .into_iter()
                .collect(),
            ScanSource::StyleClassLast => document
                .select(&STYLE3)
                .last()
                .map(element_text)
                .into_iter()
                .collect(),
            ScanSource::Cells => document.select(&TD).map(element_text).collect(),
            ScanSource::Spans => document.select(&SPAN).map(element_text).collect(),
        }
    }
}

/// Finds the first text node matching the label pattern. `None` means the
/// name is unknown; callers carry on without it.
pub fn scrape_header(document: &Document, label: HeaderLabel) -> Option<HeaderName> {
    for source in label.sources() {
        let found = source
            .candidates(document)
            .iter()
            .find_map(|text| match_label(text, label));
        if let Some(header) = found {
            debug!(
                filename = %document.filename(),
                label = label.as_str(),
                source = source.as_str(),
                id = %header.id,
                "scraped header label"
            );
            return Some(header);
        }
    }

    warn!(filename = %document.filename(), label = label.as_str(), "header label not found");
    None
}

pub fn match_label(text: &str, label: HeaderLabel) -> Option<HeaderName> {
    let captures = label.pattern().captures(text)?;
    let id = captures.get(1)?.as_str().to_string();
    let name = captures.get(2)?.as_str().trim().to_string();
    if name.is_empty() {
        return None;
    }
    Some(HeaderName { id, name })
}
