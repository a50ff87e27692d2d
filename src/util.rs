use std::str::FromStr;

use rust_decimal::Decimal;
use scraper::ElementRef;

/// Collapses runs of whitespace (non-breaking spaces and line breaks included)
/// into single spaces and trims the ends.
pub fn collapse_whitespace(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for token in input.split(|ch: char| ch.is_whitespace() || ch == '\u{a0}') {
        if token.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(token);
    }
    out
}

pub fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Parses a Spanish-formatted amount (`1.234.567,89`). Returns `None` for
/// anything that is not a plain decimal once separators are removed.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let compact = raw
        .chars()
        .filter(|ch| !ch.is_whitespace() && *ch != '\u{a0}' && *ch != '.')
        .map(|ch| if ch == ',' { '.' } else { ch })
        .collect::<String>();

    if compact.is_empty() || compact.matches('.').count() > 1 {
        return None;
    }
    if !compact
        .chars()
        .all(|ch| ch.is_ascii_digit() || ch == '.' || ch == '-')
    {
        return None;
    }

    Decimal::from_str(&compact).ok()
}

/// Base name of a path-like string, without touching the filesystem.
pub fn base_name(filename: &str) -> &str {
    filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapse_whitespace_handles_nbsp_and_line_breaks() {
        assert_eq!(
            collapse_whitespace("  Sección:\u{a0}18\r\n  EDUCACIÓN \n"),
            "Sección: 18 EDUCACIÓN"
        );
        assert_eq!(collapse_whitespace("\n\t "), "");
    }

    #[test]
    fn parse_amount_reads_spanish_separators() {
        assert_eq!(parse_amount("1.234.567,89"), Some(Decimal::new(123456789, 2)));
        assert_eq!(parse_amount(" 30 "), Some(Decimal::from(30)));
        assert_eq!(parse_amount("-12,5"), Some(Decimal::new(-125, 1)));
    }

    #[test]
    fn parse_amount_rejects_text() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("Total"), None);
        assert_eq!(parse_amount("1,2,3"), None);
    }

    #[test]
    fn base_name_strips_directories_and_urls() {
        assert_eq!(base_name("cache/2013/N_13_E_V_1.HTM"), "N_13_E_V_1.HTM");
        assert_eq!(base_name("http://host/doc/HTM/N_14.HTM"), "N_14.HTM");
        assert_eq!(base_name("N_14.HTM"), "N_14.HTM");
    }
}
