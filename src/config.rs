use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SOURCE_BASE_URL: &str = "http://www.sepg.pap.minhap.gob.es/Presup";

/// Exact-match fix for a known transcription typo in one year's documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionCorrection {
    pub year: u16,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub description_corrections: Vec<DescriptionCorrection>,
    pub validate_subtotals: bool,
    pub source_base_url: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            // The 2017 proposal misspells this heading, which breaks matching the
            // subtotal row against the heading that opened it.
            description_corrections: vec![DescriptionCorrection {
                year: 2017,
                from: "Inversión nueva en infraestruras y bienes destinados al uso general"
                    .to_string(),
                to: "Inversión nueva en infraestructuras y bienes destinados al uso general"
                    .to_string(),
            }],
            validate_subtotals: true,
            source_base_url: DEFAULT_SOURCE_BASE_URL.to_string(),
        }
    }
}

impl ExtractionConfig {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("failed to parse extraction config")
    }

    pub fn from_json_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn corrected_description<'a>(&'a self, year: u16, description: &'a str) -> &'a str {
        self.description_corrections
            .iter()
            .find(|fix| fix.year == year && fix.from == description)
            .map(|fix| fix.to.as_str())
            .unwrap_or(description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_fixes_2017_typo_only_in_2017() {
        let config = ExtractionConfig::default();
        let typo = "Inversión nueva en infraestruras y bienes destinados al uso general";

        assert_eq!(
            config.corrected_description(2017, typo),
            "Inversión nueva en infraestructuras y bienes destinados al uso general"
        );
        assert_eq!(config.corrected_description(2016, typo), typo);
        assert_eq!(config.corrected_description(2017, "Gastos de personal"), "Gastos de personal");
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ExtractionConfig::from_json_str(r#"{"validate_subtotals": false}"#)
            .expect("config should parse");

        assert!(!config.validate_subtotals);
        assert_eq!(config.source_base_url, DEFAULT_SOURCE_BASE_URL);
        assert_eq!(config.description_corrections.len(), 1);
    }

    #[test]
    fn json_corrections_replace_the_builtin_table() {
        let config = ExtractionConfig::from_json_str(
            r#"{"description_corrections": [{"year": 2010, "from": "Persnal", "to": "Personal"}]}"#,
        )
        .expect("config should parse");

        assert_eq!(config.corrected_description(2010, "Persnal"), "Personal");
        assert!(config.validate_subtotals);
    }

    #[test]
    fn malformed_json_reports_context() {
        let error = ExtractionConfig::from_json_str("{").expect_err("should fail");
        assert!(error.to_string().contains("extraction config"));
    }
}
