//! Local read endpoints over the synced bill store.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use billscope_core::{format_bill_number, format_sponsor, Sponsor};
use billscope_storage::{BillListing, SponsorRow};
use serde_json::Value;

use crate::{ApiError, AppState};

/// Listing page size, matching the sync batch size.
pub const LIST_LIMIT: i64 = 100;

/// Columns stored as JSON text are re-inflated into structured values
/// before they leave the API.
fn parse_embedded_json(value: &mut Value, keys: &[&str]) {
    let Some(object) = value.as_object_mut() else {
        return;
    };
    for key in keys {
        let parsed = object
            .get(*key)
            .and_then(Value::as_str)
            .and_then(|raw| serde_json::from_str::<Value>(raw).ok());
        if let Some(parsed) = parsed {
            object.insert((*key).to_string(), parsed);
        }
    }
}

fn listing_json(listing: &BillListing) -> Result<Value, serde_json::Error> {
    let mut value = serde_json::to_value(listing)?;
    parse_embedded_json(&mut value, &["latestAction", "policyArea"]);
    Ok(value)
}

fn sponsor_display(rows: &[SponsorRow]) -> String {
    let sponsors: Vec<Sponsor> = rows
        .iter()
        .map(|row| Sponsor {
            bioguide_id: Some(row.bioguide_id.clone()),
            first_name: row.first_name.clone(),
            last_name: row.last_name.clone(),
            full_name: row.full_name.clone(),
            party: row.party.clone(),
            state: row.state.clone(),
            district: row.district.clone(),
            ..Sponsor::default()
        })
        .collect();
    format_sponsor(&sponsors)
}

/// `GET /bills` — most recently updated bills with sponsors and committees
/// inlined.
pub async fn list_bills(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let listings = state.store.list_bills(LIST_LIMIT).await?;
    let mut bills = Vec::with_capacity(listings.len());
    for listing in &listings {
        bills.push(listing_json(listing)?);
    }
    Ok(Json(bills))
}

/// `GET /bills/{id}` — one bill with display fields, text versions, and
/// action history.
pub async fn get_bill(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let Some(listing) = state.store.get_bill(&id).await? else {
        return Err(ApiError::not_found("Bill not found"));
    };

    let mut value = listing_json(&listing)?;
    if let Some(object) = value.as_object_mut() {
        object.insert(
            "formattedNumber".to_string(),
            Value::String(format_bill_number(
                &listing.bill.bill_number,
                listing.bill.bill_type.as_deref(),
            )),
        );
        object.insert(
            "sponsor".to_string(),
            Value::String(sponsor_display(&listing.sponsors)),
        );
        object.insert(
            "committee".to_string(),
            Value::String(
                listing
                    .bill
                    .primary_committee_name
                    .clone()
                    .unwrap_or_else(|| "Unassigned".to_string()),
            ),
        );
    }

    let versions = state.store.get_bill_text_versions(&id).await?;
    let actions = state.store.get_bill_actions(&id).await?;
    let mut action_values = Vec::with_capacity(actions.len());
    for action in &actions {
        let mut action_value = serde_json::to_value(action)?;
        parse_embedded_json(&mut action_value, &["sourceSystem"]);
        action_values.push(action_value);
    }
    if let Some(object) = value.as_object_mut() {
        object.insert("textVersions".to_string(), serde_json::to_value(&versions)?);
        object.insert("actions".to_string(), Value::Array(action_values));
    }

    Ok(Json(value))
}
