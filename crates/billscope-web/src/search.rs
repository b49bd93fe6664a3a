//! On-demand search against Congress.gov. Results are persisted to the
//! local store as a side effect, then formatted and filtered for the
//! caller. Supports a one-shot JSON envelope or NDJSON streaming.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use billscope_client::{ListQuery, DEFAULT_LIMIT, DETAIL_CONCURRENCY};
use billscope_core::{BillRecord, BillStatus};
use billscope_sync::build_record;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;

use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub search: Option<String>,
    pub status: Option<String>,
    pub chamber: Option<String>,
    pub sponsor: Option<String>,
    #[serde(rename = "dateFrom")]
    pub date_from: Option<String>,
    #[serde(rename = "dateTo")]
    pub date_to: Option<String>,
    pub stream: Option<String>,
}

fn sponsors_display(record: &BillRecord) -> String {
    record
        .sponsors
        .iter()
        .filter_map(|sponsor| sponsor.full_name.clone())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A filter value of `all` (or absence) matches everything; chamber and
/// status are exact matches, sponsor is a case-insensitive substring.
fn passes_filters(record: &BillRecord, params: &SearchParams) -> bool {
    if let Some(chamber) = params
        .chamber
        .as_deref()
        .filter(|c| !c.is_empty() && *c != "all")
    {
        if record.origin_chamber.as_deref() != Some(chamber) {
            return false;
        }
    }
    if let Some(sponsor) = params.sponsor.as_deref().filter(|s| !s.is_empty()) {
        if !sponsors_display(record)
            .to_lowercase()
            .contains(&sponsor.to_lowercase())
        {
            return false;
        }
    }
    if let Some(status) = params
        .status
        .as_deref()
        .filter(|s| !s.is_empty() && *s != "all")
    {
        // Unrecognized labels match nothing.
        match BillStatus::from_label(status) {
            Some(wanted) if record.status == Some(wanted) => {}
            _ => return false,
        }
    }
    true
}

fn format_item(record: &BillRecord) -> Value {
    json!({
        "id": record.id,
        "billNumber": format!(
            "{}.{}",
            record.bill_type.clone().unwrap_or_default(),
            record.bill_number
        ),
        "congress": record.congress,
        "type": record.bill_type,
        "introducedDate": record.introduced_date,
        "latestAction": record.latest_action_text().unwrap_or(""),
        "status": record.status.map(|s| s.as_str()).unwrap_or("Active"),
        "originChamber": record.origin_chamber,
        "originChamberCode": record.origin_chamber_code,
        "title": record.title,
        "updateDate": record.update_date,
        "url": record.url,
        "policyArea": record
            .policy_area
            .as_ref()
            .and_then(|area| area.name.clone())
            .unwrap_or_default(),
        "sponsors": sponsors_display(record),
    })
}

async fn run_search(state: &AppState, params: &SearchParams) -> anyhow::Result<Vec<Value>> {
    let bills = state
        .client
        .fetch_recent_bills(&ListQuery {
            limit: Some(DEFAULT_LIMIT),
            search: params.search.clone(),
            date_from: params.date_from.clone(),
            date_to: params.date_to.clone(),
        })
        .await?;

    let enriched = state
        .client
        .enrich_bills_with_detail(bills, DETAIL_CONCURRENCY)
        .await;

    let mut items = Vec::new();
    for entry in &enriched {
        if let Some(err) = &entry.error {
            warn!(bill = ?entry.bill.canonical_id(), error = %err, "detail enrichment failed");
        }
        // Persist what we found; search results double as a sync.
        if let Err(err) = state
            .synchronizer
            .save_prefetched(&entry.bill, entry.detail.as_ref())
            .await
        {
            warn!(bill = ?entry.bill.canonical_id(), error = %err, "failed to persist search result");
        }

        let Some(record) = build_record(&entry.bill, entry.detail.as_ref()) else {
            continue;
        };
        if passes_filters(&record, params) {
            items.push(format_item(&record));
        }
    }
    Ok(items)
}

fn ndjson_response(items: Vec<Value>) -> Response {
    let (tx, rx) = tokio::sync::mpsc::channel::<Result<String, std::convert::Infallible>>(16);
    tokio::spawn(async move {
        for item in items {
            let mut line = item.to_string();
            line.push('\n');
            if tx.send(Ok(line)).await.is_err() {
                break;
            }
        }
    });
    let mut response = Body::from_stream(ReceiverStream::new(rx)).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/x-ndjson"),
    );
    response
}

/// `GET /search-bills` — live upstream search. Failures come back as a 500
/// with an empty result envelope rather than a bare error, so clients can
/// always read `bills`.
pub async fn search_bills(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Response {
    match run_search(&state, &params).await {
        Ok(items) => {
            if params.stream.as_deref() == Some("true") {
                ndjson_response(items)
            } else {
                let count = items.len();
                Json(json!({
                    "bills": items,
                    "count": count,
                    "source": "congress.gov",
                }))
                .into_response()
            }
        }
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "bills": [], "count": 0, "error": err.to_string() })),
        )
            .into_response(),
    }
}
