//! Normalization layer for Congress.gov payload shapes.
//!
//! The upstream API is inconsistent about nesting: list responses may wrap
//! the bill array under `data`, list entries may wrap each bill under `bill`,
//! and detail responses may nest under `data` and/or `bill`. All of that
//! variance is absorbed here so the rest of the workspace only ever sees
//! canonical records.

use billscope_core::{LatestAction, PolicyArea, ResourceRef, Sponsor};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Top-level list response. `data.bills` takes precedence over a flat
/// `bills` array when both are present.
#[derive(Debug, Clone, Deserialize)]
pub struct ListPayload {
    #[serde(default)]
    data: Option<ListData>,
    #[serde(default)]
    bills: Option<Vec<BillEntry>>,
}

#[derive(Debug, Clone, Deserialize)]
struct ListData {
    #[serde(default)]
    bills: Option<Vec<BillEntry>>,
}

impl ListPayload {
    pub fn into_entries(self) -> Vec<BillEntry> {
        self.data
            .and_then(|data| data.bills)
            .or(self.bills)
            .unwrap_or_default()
    }
}

/// One list entry, either `{ "bill": {...} }` or the bill object directly.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BillEntry {
    Wrapped { bill: BillSummary },
    Direct(BillSummary),
}

impl BillEntry {
    pub fn into_summary(self) -> BillSummary {
        match self {
            BillEntry::Wrapped { bill } => bill,
            BillEntry::Direct(bill) => bill,
        }
    }
}

/// Bill fields as they appear in list responses. Field-name drift across
/// API revisions is handled with aliases; numeric fields arrive as either
/// strings or numbers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BillSummary {
    #[serde(default, deserialize_with = "de_scalar_string")]
    pub congress: Option<String>,
    #[serde(
        default,
        rename = "type",
        alias = "billTypeCode",
        alias = "bill_type"
    )]
    pub bill_type: Option<String>,
    #[serde(
        default,
        alias = "billNumber",
        alias = "bill_number",
        deserialize_with = "de_scalar_string"
    )]
    pub number: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "introducedDate")]
    pub introduced_date: Option<String>,
    #[serde(default, rename = "latestAction")]
    pub latest_action: Option<LatestAction>,
    #[serde(default, rename = "originChamber")]
    pub origin_chamber: Option<String>,
    #[serde(default, rename = "originChamberCode")]
    pub origin_chamber_code: Option<String>,
    #[serde(default, rename = "updateDate")]
    pub update_date: Option<String>,
    #[serde(default, rename = "updateDateIncludingText")]
    pub update_date_including_text: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl BillSummary {
    /// Canonical lowercase id, `None` when type or number is missing.
    pub fn canonical_id(&self) -> Option<String> {
        let bill_type = self.bill_type.as_deref()?;
        let number = self.number.as_deref()?;
        if bill_type.is_empty() || number.is_empty() {
            return None;
        }
        Some(billscope_core::canonical_bill_id(bill_type, number))
    }
}

/// Parsed detail response. `raw` keeps the unwrapped object so the text
/// resolver can walk open-ended shapes (`texts`, `textVersions`, nested
/// format lists) that are not worth modeling as structs.
#[derive(Debug, Clone)]
pub struct BillDetail {
    pub fields: BillDetailFields,
    pub raw: Value,
}

impl BillDetail {
    pub fn from_payload(payload: Value) -> Result<Self, serde_json::Error> {
        let raw = unwrap_detail(payload);
        let fields = BillDetailFields::deserialize(&raw)?;
        Ok(Self { fields, raw })
    }
}

/// Peel `data` and `bill` wrappers off a detail payload, preferring the
/// innermost object that actually carries the bill fields.
pub fn unwrap_detail(payload: Value) -> Value {
    let inner = match payload {
        Value::Object(mut map) => match map.remove("data") {
            Some(data) => data,
            None => Value::Object(map),
        },
        other => other,
    };
    match inner {
        Value::Object(mut map) => match map.remove("bill") {
            Some(bill) => bill,
            None => Value::Object(map),
        },
        other => other,
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BillDetailFields {
    #[serde(default, deserialize_with = "de_scalar_string")]
    pub congress: Option<String>,
    #[serde(default, rename = "type")]
    pub bill_type: Option<String>,
    #[serde(default, deserialize_with = "de_scalar_string")]
    pub number: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "introducedDate")]
    pub introduced_date: Option<String>,
    #[serde(default, rename = "latestAction")]
    pub latest_action: Option<LatestAction>,
    #[serde(default, rename = "originChamber")]
    pub origin_chamber: Option<String>,
    #[serde(default, rename = "originChamberCode")]
    pub origin_chamber_code: Option<String>,
    #[serde(default, rename = "updateDate")]
    pub update_date: Option<String>,
    #[serde(default, rename = "updateDateIncludingText")]
    pub update_date_including_text: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, rename = "legislationUrl")]
    pub legislation_url: Option<String>,
    #[serde(default, rename = "policyArea")]
    pub policy_area: Option<PolicyArea>,
    #[serde(default)]
    pub sponsors: Vec<Sponsor>,
    #[serde(default)]
    pub actions: ResourceRef,
    #[serde(default)]
    pub committees: ResourceRef,
    #[serde(default)]
    pub cosponsors: ResourceRef,
    #[serde(default, rename = "relatedBills")]
    pub related_bills: ResourceRef,
    #[serde(default)]
    pub subjects: ResourceRef,
    #[serde(default)]
    pub summaries: ResourceRef,
    #[serde(default, rename = "textVersions")]
    pub text_versions: ResourceRef,
    #[serde(default)]
    pub titles: ResourceRef,
}

fn de_scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_payload_prefers_data_nested_bills() {
        let payload: ListPayload = serde_json::from_value(json!({
            "data": { "bills": [{ "type": "HR", "number": 4820 }] },
            "bills": [{ "type": "S", "number": "1" }]
        }))
        .unwrap();
        let entries = payload.into_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].clone().into_summary().canonical_id().as_deref(),
            Some("hr4820")
        );
    }

    #[test]
    fn list_payload_falls_back_to_flat_bills() {
        let payload: ListPayload = serde_json::from_value(json!({
            "bills": [{ "bill": { "type": "S", "number": "2291" } }]
        }))
        .unwrap();
        let entries = payload.into_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].clone().into_summary().canonical_id().as_deref(),
            Some("s2291")
        );
    }

    #[test]
    fn list_payload_with_neither_shape_is_empty() {
        let payload: ListPayload = serde_json::from_value(json!({ "pagination": {} })).unwrap();
        assert!(payload.into_entries().is_empty());
    }

    #[test]
    fn summary_accepts_aliased_type_and_number_fields() {
        let summary: BillSummary = serde_json::from_value(json!({
            "billTypeCode": "hr",
            "billNumber": "4820",
            "congress": 119
        }))
        .unwrap();
        assert_eq!(summary.bill_type.as_deref(), Some("hr"));
        assert_eq!(summary.number.as_deref(), Some("4820"));
        assert_eq!(summary.congress.as_deref(), Some("119"));
    }

    #[test]
    fn detail_unwraps_data_then_bill() {
        let doubly_nested = json!({
            "data": { "bill": { "type": "HR", "number": "4820", "title": "Example" } }
        });
        let detail = BillDetail::from_payload(doubly_nested).unwrap();
        assert_eq!(detail.fields.bill_type.as_deref(), Some("HR"));
        assert_eq!(detail.fields.title.as_deref(), Some("Example"));

        let flat = json!({ "type": "S", "number": "1" });
        let detail = BillDetail::from_payload(flat).unwrap();
        assert_eq!(detail.fields.bill_type.as_deref(), Some("S"));
    }

    #[test]
    fn detail_keeps_raw_value_for_open_ended_fields() {
        let payload = json!({
            "bill": {
                "type": "HR",
                "number": "4820",
                "textVersions": { "count": 2, "url": "https://example.test/text" },
                "texts": [{ "type": "Introduced", "url": "https://example.test/ih.htm" }]
            }
        });
        let detail = BillDetail::from_payload(payload).unwrap();
        assert_eq!(detail.fields.text_versions.count, Some(2));
        assert!(detail.raw.get("texts").is_some());
    }

    #[test]
    fn missing_identifier_yields_no_canonical_id() {
        let summary = BillSummary {
            bill_type: Some("HR".into()),
            ..BillSummary::default()
        };
        assert!(summary.canonical_id().is_none());
    }
}
