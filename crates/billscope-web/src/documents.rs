//! Document endpoints: inline bill text, download proxying with a fallback
//! chain, and the cached PDF proxy.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use billscope_core::format_bill_number;
use billscope_storage::BillRow;
use billscope_text::{FormatMode, ResolvedText, TextSource};
use serde::Deserialize;
use tracing::warn;

use crate::{ApiError, AppState};

pub const PDF_CACHE_CONTROL: &str = "public, max-age=86400";
pub const DOWNLOAD_CACHE_CONTROL: &str = "public, max-age=3600";

fn text_source(bill: &BillRow) -> TextSource {
    let display = format_bill_number(&bill.bill_number, bill.bill_type.as_deref());
    TextSource {
        id: Some(bill.id.clone()),
        display_number: Some(display).filter(|s| !s.is_empty()),
        // The congress.gov page URL carries the congress number; the API URL
        // does not.
        full_text_url: bill.legislation_url.clone().or_else(|| bill.url.clone()),
    }
}

/// `GET /bills/{id}/text` — resolve and sanitize the bill's best text
/// rendition. Successful text is persisted against its version row so the
/// next request can serve history without refetching.
pub async fn bill_text(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ResolvedText>, ApiError> {
    let Some(listing) = state.store.get_bill(&id).await? else {
        return Err(ApiError::not_found("Bill not found"));
    };

    let source = text_source(&listing.bill);
    let resolved = state.resolver.resolve_text(&source).await;

    if resolved.available {
        if let (Some(html), Some(url)) = (&resolved.html, &resolved.source_url) {
            if let Err(err) = state.store.save_text_content(&id, url, html).await {
                warn!(bill = %id, error = %err, "failed to persist fetched bill text");
            }
        }
    }

    Ok(Json(resolved))
}

/// `GET /bills/{id}/download` — proxy the source document with an
/// attachment disposition. Falls back to the stored full-text URL, and
/// finally to a redirect, when the proxy fetch fails.
pub async fn download_bill(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let Some(listing) = state.store.get_bill(&id).await? else {
        return Err(ApiError::not_found("Bill not found"));
    };

    let source = text_source(&listing.bill);
    let asset = state.resolver.resolve_asset(&source).await;
    let fallback = asset.fallback_url.clone();

    let Some(url) = asset.url else {
        if let Some(fb) = fallback.as_deref().filter(|fb| fb.starts_with("http")) {
            return Ok(Redirect::temporary(fb).into_response());
        }
        return Err(ApiError::not_found(
            asset.reason.unwrap_or_else(|| "Bill text unavailable.".to_string()),
        ));
    };

    let mode = asset.mode.unwrap_or(FormatMode::Unknown);
    let fetched = match state.client.fetch_document(&url, mode.accept_header()).await {
        Ok(document) => document,
        Err(err) => {
            warn!(bill = %id, url = %url, error = %err, "primary download failed");
            match fallback.as_deref().filter(|fb| *fb != url) {
                Some(fb) => match state.client.fetch_document(fb, mode.accept_header()).await {
                    Ok(document) => document,
                    Err(fallback_err) => {
                        if fb.starts_with("http") {
                            return Ok(Redirect::temporary(fb).into_response());
                        }
                        return Err(ApiError::internal(format!(
                            "Failed to download bill text: {fallback_err}"
                        )));
                    }
                },
                None => {
                    return Err(ApiError::internal(format!(
                        "Failed to download bill text: {err}"
                    )))
                }
            }
        }
    };

    let content_type = mode
        .content_type()
        .map(ToString::to_string)
        .or(fetched.content_type)
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let filename = asset
        .filename
        .unwrap_or_else(|| "bill-text.txt".to_string());

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
            (
                header::CACHE_CONTROL,
                DOWNLOAD_CACHE_CONTROL.to_string(),
            ),
        ],
        fetched.body,
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct PdfQuery {
    pub url: Option<String>,
}

/// `GET /pdf?url=` — fetch and cache a remote PDF, serving it inline.
pub async fn pdf_proxy(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PdfQuery>,
) -> Result<Response, ApiError> {
    let Some(url) = query.url.filter(|u| !u.trim().is_empty()) else {
        return Err(ApiError::bad_request("Missing url parameter"));
    };

    let body = match state.cache.load(&url, "pdf").await {
        Some(bytes) => bytes,
        None => {
            let document = state
                .client
                .fetch_document(&url, "application/pdf")
                .await
                .map_err(|err| ApiError::internal(format!("Failed to fetch PDF: {err}")))?;
            if let Err(err) = state.cache.store(&url, "pdf", &document.body).await {
                warn!(url = %url, error = %err, "failed to cache fetched PDF");
            }
            document.body
        }
    };

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                "inline; filename=\"bill.pdf\"".to_string(),
            ),
            (header::CACHE_CONTROL, PDF_CACHE_CONTROL.to_string()),
        ],
        body,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::offline_state;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tempfile::tempdir;
    use tower::ServiceExt;

    #[tokio::test]
    async fn pdf_proxy_requires_a_url() {
        let dir = tempdir().expect("tempdir");
        let state = offline_state(dir.path()).await;

        let response = crate::app(state)
            .oneshot(Request::builder().uri("/pdf").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Missing url parameter");
    }

    #[tokio::test]
    async fn pdf_proxy_serves_cached_documents_without_fetching() {
        let dir = tempdir().expect("tempdir");
        let state = offline_state(dir.path()).await;
        let url = "https://www.congress.gov/119/bills/hr4820/BILLS-119hr4820ih.pdf";
        state
            .cache
            .store(url, "pdf", b"%PDF-1.7 cached")
            .await
            .expect("seed cache");

        let response = crate::app(state)
            .oneshot(
                Request::builder()
                    .uri(format!(
                        "/pdf?url={}",
                        "https%3A%2F%2Fwww.congress.gov%2F119%2Fbills%2Fhr4820%2FBILLS-119hr4820ih.pdf"
                    ))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE].to_str().unwrap(),
            "application/pdf"
        );
        assert_eq!(
            response.headers()[header::CACHE_CONTROL].to_str().unwrap(),
            PDF_CACHE_CONTROL
        );
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(bytes.as_ref(), b"%PDF-1.7 cached");
    }

    #[tokio::test]
    async fn document_routes_404_for_unknown_bills() {
        let dir = tempdir().expect("tempdir");
        let state = offline_state(dir.path()).await;
        let app = crate::app(state);

        for uri in ["/bills/hr999/text", "/bills/hr999/download"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[test]
    fn text_source_prefers_the_legislation_page_url() {
        let bill = BillRow {
            id: "hr4820".to_string(),
            bill_number: "4820".to_string(),
            congress: 119,
            bill_type: Some("HR".to_string()),
            introduced_date: None,
            latest_action: None,
            status: None,
            origin_chamber: None,
            origin_chamber_code: None,
            title: None,
            update_date: None,
            update_date_including_text: None,
            url: Some("https://api.congress.gov/v3/bill/119/hr/4820".to_string()),
            legislation_url: Some(
                "https://www.congress.gov/bill/119th-congress/house-bill/4820".to_string(),
            ),
            policy_area: None,
            primary_committee_code: None,
            actions_count: None,
            actions_url: None,
            committees_count: None,
            committees_url: None,
            cosponsors_count: None,
            cosponsors_url: None,
            related_bills_count: None,
            related_bills_url: None,
            sponsors: None,
            subjects_count: None,
            subjects_url: None,
            summaries_count: None,
            summaries_url: None,
            text_versions_count: None,
            text_versions_url: None,
            titles_count: None,
            titles_url: None,
            primary_committee_name: None,
        };
        let source = text_source(&bill);
        assert_eq!(source.display_number.as_deref(), Some("H.R.4820"));
        assert_eq!(
            source.full_text_url.as_deref(),
            Some("https://www.congress.gov/bill/119th-congress/house-bill/4820")
        );
    }
}
