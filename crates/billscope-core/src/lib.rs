//! Core domain model for billscope: bills, people, committees, and the
//! status classification rules shared by the sync pipeline and the web API.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const CRATE_NAME: &str = "billscope-core";

/// Lifecycle status derived from a bill's latest recorded action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BillStatus {
    Enacted,
    Vetoed,
    Failed,
    PassedHouse,
    PassedSenate,
    InCommittee,
    Introduced,
    Active,
}

impl BillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillStatus::Enacted => "Enacted",
            BillStatus::Vetoed => "Vetoed",
            BillStatus::Failed => "Failed",
            BillStatus::PassedHouse => "Passed House",
            BillStatus::PassedSenate => "Passed Senate",
            BillStatus::InCommittee => "In Committee",
            BillStatus::Introduced => "Introduced",
            BillStatus::Active => "Active",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Enacted" => Some(BillStatus::Enacted),
            "Vetoed" => Some(BillStatus::Vetoed),
            "Failed" => Some(BillStatus::Failed),
            "Passed House" => Some(BillStatus::PassedHouse),
            "Passed Senate" => Some(BillStatus::PassedSenate),
            "In Committee" => Some(BillStatus::InCommittee),
            "Introduced" => Some(BillStatus::Introduced),
            "Active" => Some(BillStatus::Active),
            _ => None,
        }
    }
}

impl std::fmt::Display for BillStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// Classify a bill's status from its latest action text. First matching rule
/// wins; rule order is part of the behavioral contract.
///
/// Note: "passed senate" text maps to `Passed House` and "passed house" text
/// maps to `Passed Senate`. The pairing is kept as-is for compatibility with
/// rows already classified this way; see the pinned regression test before
/// changing it.
pub fn classify_status(latest_action_text: Option<&str>, has_introduced_date: bool) -> BillStatus {
    let text = latest_action_text.unwrap_or_default().to_lowercase();

    if contains_any(
        &text,
        &["became public law", "became private law", "signed by president"],
    ) {
        return BillStatus::Enacted;
    }
    if contains_any(&text, &["vetoed", "veto message"]) {
        return BillStatus::Vetoed;
    }
    if contains_any(&text, &["failed", "rejected", "motion to proceed rejected"]) {
        return BillStatus::Failed;
    }
    if contains_any(&text, &["passed senate", "received in the senate"]) {
        return BillStatus::PassedHouse;
    }
    if contains_any(&text, &["passed house", "received in the house"]) {
        return BillStatus::PassedSenate;
    }
    if contains_any(&text, &["referred to", "committee on"]) {
        return BillStatus::InCommittee;
    }
    if text.contains("introduced in") || has_introduced_date {
        return BillStatus::Introduced;
    }
    BillStatus::Active
}

/// Canonical bill id: lowercase type code + number, e.g. `hr4820`.
pub fn canonical_bill_id(type_code: &str, number: &str) -> String {
    format!(
        "{}{}",
        type_code.trim().to_lowercase(),
        number.trim().to_lowercase()
    )
}

const TYPE_PREFIXES: &[(&str, &str)] = &[
    ("HR", "H.R."),
    ("S", "S."),
    ("HRES", "H.RES."),
    ("SRES", "S.RES."),
    ("HJRES", "H.J.RES."),
    ("SJRES", "S.J.RES."),
    ("HCONRES", "H.CON.RES."),
    ("SCONRES", "S.CON.RES."),
];

/// Render a display bill number ("H.R.4820") from the stored type + number.
pub fn format_bill_number(bill_number: &str, bill_type: Option<&str>) -> String {
    if bill_number.is_empty() {
        return String::new();
    }
    let type_upper = bill_type.unwrap_or_default().to_uppercase();
    let prefix = TYPE_PREFIXES
        .iter()
        .find(|(code, _)| *code == type_upper)
        .map(|(_, prefix)| *prefix)
        .unwrap_or(bill_type.unwrap_or_default());
    format!("{prefix}{bill_number}")
}

/// Structured latest-action payload carried on a bill row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestAction {
    #[serde(default, rename = "actionDate")]
    pub action_date: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, rename = "actionTime")]
    pub action_time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyArea {
    #[serde(default)]
    pub name: Option<String>,
}

/// A legislator as reported in a bill's sponsor list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sponsor {
    #[serde(default, rename = "bioguideId")]
    pub bioguide_id: Option<String>,
    #[serde(default, rename = "firstName")]
    pub first_name: Option<String>,
    #[serde(default, rename = "lastName")]
    pub last_name: Option<String>,
    #[serde(default, rename = "fullName")]
    pub full_name: Option<String>,
    #[serde(default)]
    pub party: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "de_opt_display")]
    pub district: Option<String>,
    #[serde(default, rename = "isByRequest")]
    pub is_by_request: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Display string for a bill's lead sponsor.
pub fn format_sponsor(sponsors: &[Sponsor]) -> String {
    let Some(sponsor) = sponsors.first() else {
        return "Unknown".to_string();
    };
    let named = format!(
        "{} {}",
        sponsor.first_name.as_deref().unwrap_or_default(),
        sponsor.last_name.as_deref().unwrap_or_default()
    )
    .trim()
    .to_string();
    if !named.is_empty() {
        return named;
    }
    sponsor
        .full_name
        .clone()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Count + follow-up URL for a lazily-fetched sub-resource (actions,
/// committees, cosponsors, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    #[serde(default)]
    pub count: Option<i64>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Fully normalized bill record, ready for persistence. All upstream shape
/// variance has been resolved by the time one of these exists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BillRecord {
    pub id: String,
    pub bill_number: String,
    pub congress: i64,
    pub bill_type: Option<String>,
    pub introduced_date: Option<String>,
    pub latest_action: Option<LatestAction>,
    pub status: Option<BillStatus>,
    pub origin_chamber: Option<String>,
    pub origin_chamber_code: Option<String>,
    pub title: Option<String>,
    pub update_date: Option<String>,
    pub update_date_including_text: Option<String>,
    pub url: Option<String>,
    pub legislation_url: Option<String>,
    pub policy_area: Option<PolicyArea>,
    pub primary_committee_code: Option<String>,
    pub actions: ResourceRef,
    pub committees: ResourceRef,
    pub cosponsors: ResourceRef,
    pub related_bills: ResourceRef,
    pub sponsors: Vec<Sponsor>,
    pub subjects: ResourceRef,
    pub summaries: ResourceRef,
    pub text_versions: ResourceRef,
    pub titles: ResourceRef,
}

impl BillRecord {
    pub fn latest_action_text(&self) -> Option<&str> {
        self.latest_action.as_ref().and_then(|a| a.text.as_deref())
    }
}

/// A committee as reported by the committee sub-resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitteeRecord {
    #[serde(default, rename = "systemCode", alias = "committeeCode")]
    pub committee_code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub chamber: Option<String>,
    #[serde(default, rename = "type")]
    pub committee_type: Option<String>,
    #[serde(default, rename = "subcommitteeCode")]
    pub subcommittee_code: Option<String>,
    #[serde(default, rename = "parentCommitteeCode")]
    pub parent_committee_code: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// One dated procedural event in a bill's history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillAction {
    #[serde(default, rename = "actionDate")]
    pub action_date: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, rename = "type")]
    pub action_type: Option<String>,
    #[serde(default, rename = "actionCode")]
    pub action_code: Option<String>,
    #[serde(default, rename = "sourceSystem")]
    pub source_system: Option<serde_json::Value>,
}

/// Metadata for one published text version of a bill.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextVersionMeta {
    #[serde(default, rename = "type")]
    pub version_type: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    pub format_type: Option<String>,
    pub url: Option<String>,
}

/// Upstream payloads report some scalar fields as either strings or numbers.
fn de_opt_display<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Date helpers for the startup freshness window.
pub fn date_window_ending_today(days: i64) -> (NaiveDate, NaiveDate) {
    let today = chrono::Utc::now().date_naive();
    (today - chrono::Duration::days(days), today)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enacted_outranks_later_rules() {
        assert_eq!(
            classify_status(Some("Became Public Law No: 119-45"), true),
            BillStatus::Enacted
        );
        assert_eq!(
            classify_status(Some("Signed by President."), false),
            BillStatus::Enacted
        );
    }

    #[test]
    fn committee_referral_classifies_in_committee() {
        assert_eq!(
            classify_status(Some("Referred to the Committee on Energy and Commerce"), true),
            BillStatus::InCommittee
        );
        assert_eq!(
            classify_status(Some("Referred to the Subcommittee on Energy"), false),
            BillStatus::InCommittee
        );
    }

    #[test]
    fn introduced_falls_back_to_introduced_date() {
        assert_eq!(classify_status(None, true), BillStatus::Introduced);
        assert_eq!(classify_status(Some(""), true), BillStatus::Introduced);
        assert_eq!(
            classify_status(Some("Introduced in House"), false),
            BillStatus::Introduced
        );
    }

    #[test]
    fn no_signal_classifies_active() {
        assert_eq!(classify_status(None, false), BillStatus::Active);
        assert_eq!(
            classify_status(Some("Sponsor introductory remarks on measure."), false),
            BillStatus::Active
        );
    }

    // Pins the chamber/label pairing exactly as it ships today: senate-passage
    // text yields "Passed House" and house-passage text yields "Passed Senate".
    // Any future correction must update this test deliberately.
    #[test]
    fn passed_chamber_labels_keep_existing_pairing() {
        assert_eq!(
            classify_status(Some("Passed Senate without amendment by Unanimous Consent."), true),
            BillStatus::PassedHouse
        );
        assert_eq!(
            classify_status(Some("Received in the Senate."), true),
            BillStatus::PassedHouse
        );
        assert_eq!(
            classify_status(Some("Passed House by recorded vote."), true),
            BillStatus::PassedSenate
        );
        assert_eq!(
            classify_status(Some("Received in the House."), true),
            BillStatus::PassedSenate
        );
    }

    #[test]
    fn vetoed_and_failed_rules_match_before_passage() {
        assert_eq!(
            classify_status(Some("Vetoed by the President."), true),
            BillStatus::Vetoed
        );
        assert_eq!(
            classify_status(Some("Veto message received in the House."), true),
            BillStatus::Vetoed
        );
        assert_eq!(
            classify_status(Some("Motion to proceed rejected in Senate."), true),
            BillStatus::Failed
        );
        // "failed" outranks the passed-chamber rules by order.
        assert_eq!(
            classify_status(Some("Failed of passage in Senate."), true),
            BillStatus::Failed
        );
    }

    #[test]
    fn canonical_id_lowercases_type_and_number() {
        assert_eq!(canonical_bill_id("HR", "4820"), "hr4820");
        assert_eq!(canonical_bill_id("SJRES", "12"), "sjres12");
        assert_eq!(canonical_bill_id(" hr ", " 4820 "), "hr4820");
    }

    #[test]
    fn display_number_uses_dotted_prefix() {
        assert_eq!(format_bill_number("4820", Some("HR")), "H.R.4820");
        assert_eq!(format_bill_number("2291", Some("S")), "S.2291");
        assert_eq!(format_bill_number("7", Some("SCONRES")), "S.CON.RES.7");
        assert_eq!(format_bill_number("9", Some("XYZ")), "XYZ9");
        assert_eq!(format_bill_number("", Some("HR")), "");
    }

    #[test]
    fn sponsor_formatting_prefers_split_name_then_full_name() {
        let split = Sponsor {
            first_name: Some("Jordan".into()),
            last_name: Some("Miles".into()),
            ..Sponsor::default()
        };
        assert_eq!(format_sponsor(&[split]), "Jordan Miles");

        let full_only = Sponsor {
            full_name: Some("Rep. Jordan Miles [D-CA-12]".into()),
            ..Sponsor::default()
        };
        assert_eq!(format_sponsor(&[full_only]), "Rep. Jordan Miles [D-CA-12]");

        assert_eq!(format_sponsor(&[]), "Unknown");
        assert_eq!(format_sponsor(&[Sponsor::default()]), "Unknown");
    }

    #[test]
    fn sponsor_district_accepts_numeric_and_string_payloads() {
        let numeric: Sponsor = serde_json::from_str(r#"{"bioguideId":"M001234","district":12}"#)
            .expect("numeric district");
        assert_eq!(numeric.district.as_deref(), Some("12"));
        let string: Sponsor = serde_json::from_str(r#"{"bioguideId":"M001234","district":"12"}"#)
            .expect("string district");
        assert_eq!(string.district.as_deref(), Some("12"));
    }

    #[test]
    fn status_labels_round_trip() {
        for status in [
            BillStatus::Enacted,
            BillStatus::Vetoed,
            BillStatus::Failed,
            BillStatus::PassedHouse,
            BillStatus::PassedSenate,
            BillStatus::InCommittee,
            BillStatus::Introduced,
            BillStatus::Active,
        ] {
            assert_eq!(BillStatus::from_label(status.as_str()), Some(status));
        }
    }
}
