use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::{BreakdownError, Result};
use crate::model::{Category, Classification};
use crate::util::base_name;

/// One row of the versioned filename grammar table. Rows are tried in order,
/// so state grammars sit before the non-state grammars of the same era.
struct GrammarRule {
    first_year: u16,
    last_year: u16,
    category: Category,
    pattern: &'static str,
}

const ANY_YEAR: (u16, u16) = (2000, 2099);

const LEGACY_STATE: &str = concat!(
    r"^N_(?P<year>\d\d)_(?P<stage>[ASE])_V_1_10(?P<kind>[1234])",
    r"_2_2_2_1(?P<section>\d\d)_1_[12]_1\.HTM$"
);
const LEGACY_NON_STATE: &str = concat!(
    r"^N_(?P<year>\d\d)_(?P<stage>[ASE])_V_1_10(?P<kind>[1234])",
    r"_2_2_2_1(?P<section>\d\d)_1_[12]_1(?P<entity>\d\d\d)_1\.HTM$"
);
const STATE_2012: &str = concat!(
    r"^N_(?P<year>\d\d)_(?P<stage>[AE])_V_1_10(?P<kind>[1234])",
    r"_1_1_2_2_[1234](?P<section>\d\d)_1_2\.HTM$"
);
const NON_STATE_2012: &str = concat!(
    r"^N_(?P<year>\d\d)_(?P<stage>[AE])_V_1_10(?P<kind>[1234])",
    r"_2_1_[1234](?P<section>\d\d)_1_1(?P<entity>\d\d\d)_2_2_1\.HTM$"
);
const NON_STATE_2017: &str = concat!(
    r"^N_(?P<year>\d\d)_(?P<stage>[AE])_V_1_(?:2_)?10(?P<kind>[1234])",
    r"_2_1_[1234](?P<section>\d\d)_1_1(?P<entity>\d\d\d)_2_2_1\.HTM$"
);
const INCOME: &str = concat!(
    r"^N_(?P<year>\d\d)_(?P<stage>[ASE])_R_2_10(?P<kind>\d)",
    r"_1_2_1(?P<section>\d\d)_1_1(?P<entity>\d\d+)_1\.HTM$"
);
const PROGRAMME: &str =
    r"^N_(?P<year>\d\d)_(?P<stage>[ASE])_R_31_2_1_G_1_1_(?:1\d\d\d\w_P|T_1)\.HTM$";

const GRAMMAR_TABLE: &[GrammarRule] = &[
    GrammarRule {
        first_year: 2000,
        last_year: 2011,
        category: Category::StateEntity,
        pattern: LEGACY_STATE,
    },
    GrammarRule {
        first_year: 2000,
        last_year: 2011,
        category: Category::NonStateEntity,
        pattern: LEGACY_NON_STATE,
    },
    GrammarRule {
        first_year: 2012,
        last_year: 2017,
        category: Category::StateEntity,
        pattern: STATE_2012,
    },
    GrammarRule {
        first_year: 2012,
        last_year: 2016,
        category: Category::NonStateEntity,
        pattern: NON_STATE_2012,
    },
    GrammarRule {
        first_year: 2017,
        last_year: 2017,
        category: Category::NonStateEntity,
        pattern: NON_STATE_2017,
    },
    GrammarRule {
        first_year: 2018,
        last_year: ANY_YEAR.1,
        category: Category::StateEntity,
        pattern: LEGACY_STATE,
    },
    GrammarRule {
        first_year: 2018,
        last_year: ANY_YEAR.1,
        category: Category::NonStateEntity,
        pattern: LEGACY_NON_STATE,
    },
    GrammarRule {
        first_year: ANY_YEAR.0,
        last_year: ANY_YEAR.1,
        category: Category::Income,
        pattern: INCOME,
    },
    GrammarRule {
        first_year: ANY_YEAR.0,
        last_year: ANY_YEAR.1,
        category: Category::Programme,
        pattern: PROGRAMME,
    },
];

static YEAR_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"N_(\d\d)_[ASE]").expect("valid year token regex"));

static COMPILED_GRAMMARS: LazyLock<Vec<(&'static GrammarRule, Regex)>> = LazyLock::new(|| {
    GRAMMAR_TABLE
        .iter()
        .map(|rule| (rule, Regex::new(rule.pattern).expect("valid filename grammar")))
        .collect()
});

/// Derives category and year (plus whatever identifiers the grammar captures)
/// from a breakdown filename. Directories and URL prefixes are ignored.
pub fn classify(filename: &str) -> Result<Classification> {
    let name = base_name(filename);
    let year = filename_year(name)
        .ok_or_else(|| BreakdownError::UnrecognizedFilename(filename.to_string()))?;

    for (rule, pattern) in COMPILED_GRAMMARS.iter() {
        if year < rule.first_year || year > rule.last_year {
            continue;
        }
        let Some(captures) = pattern.captures(name) else {
            continue;
        };

        let capture = |group: &str| captures.name(group).map(|value| value.as_str().to_string());
        let classification = Classification {
            category: rule.category,
            year,
            stage: capture("stage")
                .and_then(|value| value.chars().next())
                .unwrap_or('A'),
            entity_type: capture("kind").and_then(|value| value.parse().ok()),
            section: capture("section"),
            entity: capture("entity"),
        };
        debug!(
            filename = %name,
            category = classification.category.as_str(),
            year,
            "classified breakdown"
        );
        return Ok(classification);
    }

    Err(BreakdownError::UnrecognizedFilename(filename.to_string()))
}

pub fn filename_year(name: &str) -> Option<u16> {
    let captures = YEAR_TOKEN.captures(name)?;
    let two_digits = captures.get(1)?.as_str().parse::<u16>().ok()?;
    Some(2000 + two_digits)
}

pub fn is_entity_breakdown(filename: &str) -> bool {
    classify(filename)
        .map(|classification| classification.category.is_entity())
        .unwrap_or(false)
}

pub fn is_income_breakdown(filename: &str) -> bool {
    matches!(
        classify(filename),
        Ok(classification) if classification.category == Category::Income
    )
}

pub fn is_programme_breakdown(filename: &str) -> bool {
    matches!(
        classify(filename),
        Ok(classification) if classification.category == Category::Programme
    )
}
