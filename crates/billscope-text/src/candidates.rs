//! Text-candidate collection and ranking over heterogeneous detail payloads.
//!
//! Detail responses have shipped text versions under several shapes over
//! time (`texts`, `textVersions`, wrapped `items` lists, nested `formats`
//! collections), so this module walks raw JSON rather than typed structs.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

/// Delivery format, ordered by preference for inline rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatMode {
    Text,
    Html,
    Xml,
    Pdf,
    Unknown,
}

impl FormatMode {
    pub fn priority(self) -> usize {
        match self {
            FormatMode::Text => 0,
            FormatMode::Html => 1,
            FormatMode::Xml => 2,
            FormatMode::Pdf => 3,
            FormatMode::Unknown => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FormatMode::Text => "text",
            FormatMode::Html => "html",
            FormatMode::Xml => "xml",
            FormatMode::Pdf => "pdf",
            FormatMode::Unknown => "unknown",
        }
    }

    /// Accept header for fetching this format inline.
    pub fn accept_header(self) -> &'static str {
        match self {
            FormatMode::Html => "text/html,application/xhtml+xml",
            FormatMode::Xml => "application/xml,text/xml",
            _ => "text/plain",
        }
    }

    /// Content type served when proxying a download of this format.
    pub fn content_type(self) -> Option<&'static str> {
        match self {
            FormatMode::Text => Some("text/plain; charset=utf-8"),
            FormatMode::Html => Some("text/html; charset=utf-8"),
            FormatMode::Xml => Some("application/xml"),
            FormatMode::Pdf => Some("application/pdf"),
            FormatMode::Unknown => None,
        }
    }

    pub fn extension(self) -> Option<&'static str> {
        match self {
            FormatMode::Text => Some("txt"),
            FormatMode::Html => Some("html"),
            FormatMode::Xml => Some("xml"),
            FormatMode::Pdf => Some("pdf"),
            FormatMode::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub url: String,
    pub label: Option<String>,
    pub mode: FormatMode,
}

#[derive(Debug, Clone)]
struct RawCandidate {
    url: String,
    label: Option<String>,
}

static EXTENSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.([a-z0-9]+)(?:\?|$)").expect("valid regex"));

fn pick_str<'a>(values: impl IntoIterator<Item = Option<&'a Value>>) -> Option<String> {
    values
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Flatten every text-version entry the detail payload carries, whichever
/// key and wrapping shape it uses.
fn collect_entries(detail: &Value) -> Vec<&Value> {
    let mut entries = Vec::new();
    let sources = [
        detail.get("texts"),
        detail.get("textVersions"),
        detail.get("bill").and_then(|bill| bill.get("texts")),
    ];
    for source in sources.into_iter().flatten() {
        if let Some(items) = source.as_array() {
            entries.extend(items);
        } else if let Some(items) = source.get("items").and_then(Value::as_array) {
            entries.extend(items);
        }
    }
    entries
}

fn extract_formats_from_entry(entry: &Value) -> Vec<RawCandidate> {
    let mut candidates = Vec::new();

    let direct_url = pick_str([
        entry.get("gpoUrl"),
        entry.get("htmlUrl"),
        entry.get("url"),
        entry.get("downloadUrl"),
        entry.get("link"),
        entry.get("pdfUrl"),
        entry.get("txtUrl"),
    ]);
    if let Some(url) = direct_url {
        candidates.push(RawCandidate {
            url,
            label: pick_str([
                entry.get("label"),
                entry.get("type"),
                entry.get("name"),
                entry.get("format"),
            ]),
        });
    }

    let nested = [
        entry.get("formats"),
        entry.get("files"),
        entry.get("documents"),
        entry.get("items"),
    ];
    for collection in nested.into_iter().flatten() {
        let Some(items) = collection.as_array() else {
            continue;
        };
        for format in items {
            let Some(url) = pick_str([
                format.get("url"),
                format.get("downloadUrl"),
                format.get("link"),
            ]) else {
                continue;
            };
            candidates.push(RawCandidate {
                url,
                label: pick_str([
                    format.get("type"),
                    format.get("label"),
                    format.get("format"),
                    format.get("name"),
                    format.get("description"),
                ]),
            });
        }
    }

    candidates
}

pub fn url_extension(url: &str) -> Option<String> {
    EXTENSION_RE
        .captures(&url.to_lowercase())
        .map(|caps| caps[1].to_string())
}

/// Classify a candidate by label and URL extension. Check order matters:
/// a "Formatted Text" label is text even when the URL ends in `.htm`.
fn normalize(raw: RawCandidate) -> Candidate {
    let label_lower = raw.label.as_deref().unwrap_or_default().to_lowercase();
    let extension = url_extension(&raw.url).unwrap_or_default();

    let mode = if label_lower.contains("html")
        || label_lower.contains("htm")
        || extension == "html"
        || extension == "htm"
    {
        FormatMode::Html
    } else if label_lower.contains("plain")
        || label_lower.contains("text")
        || label_lower.contains("txt")
        || extension == "txt"
    {
        FormatMode::Text
    } else if label_lower.contains("xml") || extension == "xml" {
        FormatMode::Xml
    } else if label_lower.contains("pdf") || extension == "pdf" {
        FormatMode::Pdf
    } else {
        FormatMode::Unknown
    };

    Candidate {
        url: raw.url,
        label: raw.label,
        mode,
    }
}

fn dedupe(candidates: Vec<RawCandidate>) -> Vec<RawCandidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|candidate| !candidate.url.is_empty() && seen.insert(candidate.url.clone()))
        .collect()
}

/// Pick the best renderable candidate from a detail payload, appending the
/// stored full-text URL as a last-resort entry.
pub fn select_best(detail: &Value, fallback_url: Option<&str>) -> Option<Candidate> {
    let mut raw = Vec::new();
    for entry in collect_entries(detail) {
        raw.extend(extract_formats_from_entry(entry));
    }
    if let Some(url) = fallback_url.filter(|u| !u.is_empty()) {
        raw.push(RawCandidate {
            url: url.to_string(),
            label: Some("Original link".to_string()),
        });
    }

    let mut normalized: Vec<Candidate> = dedupe(raw).into_iter().map(normalize).collect();
    if normalized.is_empty() {
        return None;
    }
    // Stable sort keeps payload order within the same format tier.
    normalized.sort_by_key(|candidate| candidate.mode.priority());
    normalized.into_iter().next()
}
