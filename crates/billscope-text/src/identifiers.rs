//! Bill identifier derivation from congress.gov URLs and display numbers.

use std::sync::LazyLock;

use regex::Regex;

/// URL path segment -> canonical type code.
const SEGMENT_TYPES: &[(&str, &str)] = &[
    ("house-bill", "hr"),
    ("senate-bill", "s"),
    ("house-resolution", "hres"),
    ("senate-resolution", "sres"),
    ("house-concurrent-resolution", "hconres"),
    ("senate-concurrent-resolution", "sconres"),
    ("house-joint-resolution", "hjres"),
    ("senate-joint-resolution", "sjres"),
];

/// Display prefix -> canonical type code, dotted and plain spellings.
const DISPLAY_TYPES: &[(&str, &str)] = &[
    ("HR", "hr"),
    ("H.R.", "hr"),
    ("S", "s"),
    ("S.", "s"),
    ("HRES", "hres"),
    ("H.RES.", "hres"),
    ("HCONRES", "hconres"),
    ("H.CON.RES.", "hconres"),
    ("SCONRES", "sconres"),
    ("S.CON.RES.", "sconres"),
    ("HJRES", "hjres"),
    ("H.J.RES.", "hjres"),
    ("SJRES", "sjres"),
    ("S.J.RES.", "sjres"),
];

static URL_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)/(\d+)(?:st|nd|rd|th)-congress/([^/]+)/(\d+)").expect("valid regex")
});

static DISPLAY_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z.]+)\s*-?\s*(\d+)").expect("valid regex"));

static DISPLAY_CLEAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9.\s-]").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillIdentifiers {
    pub congress: Option<i64>,
    pub type_code: String,
    pub number: String,
}

/// Parse identifiers out of a congress.gov bill URL, e.g.
/// `https://www.congress.gov/bill/119th-congress/house-bill/4820/text`.
pub fn parse_from_url(url: &str) -> Option<BillIdentifiers> {
    let caps = URL_ID_RE.captures(url)?;
    let congress: i64 = caps[1].parse().ok()?;
    let segment = caps[2].to_lowercase();
    let number = caps[3].to_string();
    let type_code = SEGMENT_TYPES
        .iter()
        .find(|(seg, _)| *seg == segment)
        .map(|(_, code)| (*code).to_string())?;
    Some(BillIdentifiers {
        congress: Some(congress),
        type_code,
        number,
    })
}

/// Parse identifiers from a display number like `H.R. 4820` or `HR-4820`.
/// The congress number is not recoverable from this form.
pub fn parse_from_display_number(number: &str) -> Option<BillIdentifiers> {
    if number.is_empty() {
        return None;
    }
    let cleaned = DISPLAY_CLEAN_RE.replace_all(number, "");
    let caps = DISPLAY_ID_RE.captures(&cleaned)?;
    let prefix = caps[1].to_string();
    let type_code = DISPLAY_TYPES
        .iter()
        .find(|(display, _)| *display == prefix)
        .map(|(_, code)| (*code).to_string())?;
    Some(BillIdentifiers {
        congress: None,
        type_code,
        number: caps[2].to_string(),
    })
}

/// URL-derived identifiers win because they carry the congress number.
pub fn derive(full_text_url: Option<&str>, display_number: Option<&str>) -> Option<BillIdentifiers> {
    if let Some(found) = full_text_url.and_then(parse_from_url) {
        return Some(found);
    }
    display_number.and_then(parse_from_display_number)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_parsing_extracts_congress_type_and_number() {
        let ids = parse_from_url(
            "https://www.congress.gov/bill/119th-congress/house-bill/4820/text",
        )
        .expect("parsed");
        assert_eq!(ids.congress, Some(119));
        assert_eq!(ids.type_code, "hr");
        assert_eq!(ids.number, "4820");

        let joint = parse_from_url(
            "https://www.congress.gov/bill/118th-congress/senate-joint-resolution/12",
        )
        .expect("parsed");
        assert_eq!(joint.type_code, "sjres");
    }

    #[test]
    fn url_parsing_rejects_unknown_segments() {
        assert!(parse_from_url("https://www.congress.gov/bill/119th-congress/treaty/4").is_none());
        assert!(parse_from_url("https://www.congress.gov/search?q=climate").is_none());
    }

    #[test]
    fn display_number_parsing_handles_dotted_and_plain_prefixes() {
        let dotted = parse_from_display_number("H.R. 4820").expect("dotted");
        assert_eq!(dotted.type_code, "hr");
        assert_eq!(dotted.number, "4820");
        assert_eq!(dotted.congress, None);

        let dashed = parse_from_display_number("HCONRES-22").expect("dashed");
        assert_eq!(dashed.type_code, "hconres");
        assert_eq!(dashed.number, "22");

        let senate = parse_from_display_number("S.2291").expect("senate");
        assert_eq!(senate.type_code, "s");
    }

    #[test]
    fn display_number_parsing_rejects_garbage() {
        assert!(parse_from_display_number("").is_none());
        assert!(parse_from_display_number("Amendment 12").is_none());
        assert!(parse_from_display_number("XYZ99").is_none());
    }

    #[test]
    fn derive_prefers_the_url_form() {
        let ids = derive(
            Some("https://www.congress.gov/bill/119th-congress/senate-bill/2291"),
            Some("H.R. 1"),
        )
        .expect("derived");
        assert_eq!(ids.type_code, "s");
        assert_eq!(ids.congress, Some(119));

        let from_number = derive(Some("not a url"), Some("H.R. 1")).expect("derived");
        assert_eq!(from_number.type_code, "hr");
        assert_eq!(from_number.congress, None);
    }
}
