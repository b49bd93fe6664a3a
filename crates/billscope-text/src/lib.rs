//! Bill text resolution: derive identifiers, pick the best published
//! format, fetch it, and sanitize it for inline rendering.

use billscope_client::{ClientError, CongressClient};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

pub mod candidates;
pub mod identifiers;
pub mod sanitize;

pub use candidates::{Candidate, FormatMode};
pub use identifiers::BillIdentifiers;

pub const CRATE_NAME: &str = "billscope-text";

pub const UNAVAILABLE_DOWNLOAD_ONLY: &str =
    "Only a downloadable document is available for this bill.";

/// The stored facts a resolution starts from.
#[derive(Debug, Clone, Default)]
pub struct TextSource {
    pub id: Option<String>,
    pub display_number: Option<String>,
    pub full_text_url: Option<String>,
}

/// Outcome of a full inline-text resolution.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedText {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<FormatMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(rename = "sourceUrl", skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(rename = "downloadUrl", skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(rename = "fetchedAt", skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Candidate resolution without the document fetch, for download routes.
#[derive(Debug, Clone, Serialize)]
pub struct TextAsset {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<FormatMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(rename = "fallbackUrl", skip_serializing_if = "Option::is_none")]
    pub fallback_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

struct CandidateResolution {
    fallback_url: Option<String>,
    candidate: Option<Candidate>,
    reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TextResolver {
    client: CongressClient,
}

impl TextResolver {
    pub fn new(client: CongressClient) -> Self {
        Self { client }
    }

    async fn resolve_candidate(&self, source: &TextSource) -> CandidateResolution {
        let fallback_url = source.full_text_url.clone();

        let Some(mut ids) = identifiers::derive(
            source.full_text_url.as_deref(),
            source.display_number.as_deref(),
        ) else {
            return CandidateResolution {
                fallback_url,
                candidate: None,
                reason: Some("Missing bill identifiers".to_string()),
            };
        };

        if ids.congress.is_none() {
            ids.congress = fallback_url
                .as_deref()
                .and_then(identifiers::parse_from_url)
                .and_then(|inferred| inferred.congress);
            if ids.congress.is_none() {
                return CandidateResolution {
                    fallback_url,
                    candidate: None,
                    reason: Some("Unable to determine congress number for bill".to_string()),
                };
            }
        }

        let congress = ids.congress.unwrap_or_default().to_string();
        let detail = match self
            .client
            .fetch_bill_detail(&congress, &ids.type_code, &ids.number)
            .await
        {
            Ok(detail) => detail,
            Err(err) => {
                return CandidateResolution {
                    fallback_url,
                    candidate: None,
                    reason: Some(format!("Failed to load bill detail: {err}")),
                };
            }
        };

        match candidates::select_best(&detail.raw, fallback_url.as_deref()) {
            Some(candidate) => {
                debug!(url = %candidate.url, mode = candidate.mode.as_str(), "selected text candidate");
                CandidateResolution {
                    fallback_url,
                    candidate: Some(candidate),
                    reason: None,
                }
            }
            None => CandidateResolution {
                fallback_url,
                candidate: None,
                reason: Some("No text formats were returned for this bill.".to_string()),
            },
        }
    }

    /// Resolve the downloadable asset for a bill without fetching it.
    pub async fn resolve_asset(&self, source: &TextSource) -> TextAsset {
        let resolution = self.resolve_candidate(source).await;
        let Some(candidate) = resolution.candidate else {
            return TextAsset {
                available: false,
                url: None,
                mode: None,
                label: None,
                filename: None,
                fallback_url: resolution.fallback_url,
                reason: resolution
                    .reason
                    .or_else(|| Some("Bill text unavailable.".to_string())),
            };
        };

        TextAsset {
            available: true,
            filename: Some(build_filename(source, &candidate)),
            url: Some(candidate.url),
            mode: Some(candidate.mode),
            label: candidate.label,
            fallback_url: resolution.fallback_url,
            reason: None,
        }
    }

    /// Resolve and fetch a bill's text, sanitized for inline rendering.
    /// All failures surface as an unavailable result with a reason.
    pub async fn resolve_text(&self, source: &TextSource) -> ResolvedText {
        let resolution = self.resolve_candidate(source).await;
        let download_url = match &source.id {
            Some(id) => Some(format!("/bills/{id}/download")),
            None => resolution
                .candidate
                .as_ref()
                .map(|c| c.url.clone())
                .or_else(|| resolution.fallback_url.clone()),
        };

        let Some(candidate) = resolution.candidate else {
            return ResolvedText {
                available: false,
                format: None,
                html: None,
                source_url: resolution.fallback_url,
                download_url,
                fetched_at: None,
                reason: resolution
                    .reason
                    .or_else(|| Some("Bill text unavailable.".to_string())),
            };
        };

        if matches!(candidate.mode, FormatMode::Pdf | FormatMode::Unknown) {
            return ResolvedText {
                available: false,
                format: None,
                html: None,
                source_url: Some(candidate.url),
                download_url,
                fetched_at: Some(Utc::now()),
                reason: Some(UNAVAILABLE_DOWNLOAD_ONLY.to_string()),
            };
        }

        let document = match self
            .client
            .fetch_document(&candidate.url, candidate.mode.accept_header())
            .await
        {
            Ok(document) => document,
            Err(ClientError::HttpStatus { status, .. }) => {
                return ResolvedText {
                    available: false,
                    format: None,
                    html: None,
                    source_url: Some(candidate.url),
                    download_url,
                    fetched_at: None,
                    reason: Some(format!("Congress.gov returned {status}")),
                };
            }
            Err(err) => {
                return ResolvedText {
                    available: false,
                    format: None,
                    html: None,
                    source_url: Some(candidate.url),
                    download_url,
                    fetched_at: None,
                    reason: Some(format!("Failed to download bill text: {err}")),
                };
            }
        };

        let raw = String::from_utf8_lossy(&document.body);
        let html = if candidate.mode == FormatMode::Html {
            sanitize::html_to_paragraphs(sanitize::extract_body(&raw))
        } else {
            sanitize::plain_text_to_html(&raw)
        };

        ResolvedText {
            available: true,
            format: Some(candidate.mode),
            html: Some(html),
            source_url: Some(candidate.url),
            download_url,
            fetched_at: Some(Utc::now()),
            reason: None,
        }
    }
}

/// Attachment filename for a candidate: the sanitized display number (or
/// id), with the extension implied by the format.
pub fn build_filename(source: &TextSource, candidate: &Candidate) -> String {
    let raw = source
        .display_number
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .or(source.id.as_deref().filter(|s| !s.trim().is_empty()))
        .unwrap_or("bill");

    let mut base = String::new();
    let mut last_dash = true;
    for ch in raw.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            base.push(ch);
            last_dash = false;
        } else if !last_dash {
            base.push('-');
            last_dash = true;
        }
    }
    let base = base.trim_matches('-');
    let base = if base.is_empty() { "bill-text" } else { base };

    let extension = candidate
        .mode
        .extension()
        .map(ToString::to_string)
        .or_else(|| candidates::url_extension(&candidate.url))
        .unwrap_or_else(|| "txt".to_string());
    format!("{base}.{extension}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(url: &str, mode: FormatMode) -> Candidate {
        Candidate {
            url: url.to_string(),
            label: None,
            mode,
        }
    }

    #[test]
    fn filenames_come_from_the_display_number() {
        let source = TextSource {
            id: Some("hr4820".to_string()),
            display_number: Some("H.R. 4820".to_string()),
            full_text_url: None,
        };
        let name = build_filename(
            &source,
            &candidate("https://example.test/x.htm", FormatMode::Text),
        );
        assert_eq!(name, "h-r-4820.txt");
    }

    #[test]
    fn filenames_fall_back_to_id_then_generic() {
        let source = TextSource {
            id: Some("sjres12".to_string()),
            ..TextSource::default()
        };
        let name = build_filename(
            &source,
            &candidate("https://example.test/x.pdf", FormatMode::Pdf),
        );
        assert_eq!(name, "sjres12.pdf");

        let empty = TextSource::default();
        let name = build_filename(
            &empty,
            &candidate("https://example.test/blob.xyz", FormatMode::Unknown),
        );
        assert_eq!(name, "bill.xyz");
    }

    #[test]
    fn unknown_mode_without_extension_defaults_to_txt() {
        let empty = TextSource::default();
        let name = build_filename(
            &empty,
            &candidate("https://example.test/blob", FormatMode::Unknown),
        );
        assert_eq!(name, "bill.txt");
    }
}
