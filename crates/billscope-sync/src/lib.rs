//! Bill synchronization: reconcile upstream list/detail payloads into the
//! local store, with per-bill error isolation so one bad payload never
//! sinks a batch.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use billscope_client::{BillDetail, BillSummary, CongressClient, ListQuery, DEFAULT_LIMIT, DETAIL_CONCURRENCY};
use billscope_core::{
    classify_status, date_window_ending_today, BillAction, BillRecord, CommitteeRecord,
    TextVersionMeta,
};
use billscope_storage::Store;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

pub const CRATE_NAME: &str = "billscope-sync";

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub database_path: PathBuf,
    pub cache_dir: PathBuf,
    pub sync_limit: usize,
    pub detail_concurrency: usize,
    pub startup_window_days: i64,
}

impl SyncConfig {
    pub fn from_env() -> Self {
        Self {
            database_path: std::env::var("BILLSCOPE_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("db/billscope.sqlite")),
            cache_dir: std::env::var("BILLSCOPE_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".cache/documents")),
            sync_limit: std::env::var("BILLSCOPE_SYNC_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_LIMIT),
            detail_concurrency: std::env::var("BILLSCOPE_DETAIL_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DETAIL_CONCURRENCY),
            startup_window_days: std::env::var("BILLSCOPE_STARTUP_WINDOW_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
        }
    }
}

/// Parameters for one sync run. All fields optional; an empty options value
/// syncs the most recently updated bills.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub search_query: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub fetched: usize,
    pub stored: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Stored,
    Skipped,
}

/// Merge a list summary with its (optional) detail into a normalized record.
/// Detail fields win where both are present. Returns `None` when the summary
/// has no derivable canonical id.
pub fn build_record(summary: &BillSummary, detail: Option<&BillDetail>) -> Option<BillRecord> {
    let id = summary.canonical_id()?;
    let fields = detail.map(|d| &d.fields);

    let congress = fields
        .and_then(|f| f.congress.clone())
        .or_else(|| summary.congress.clone())
        .and_then(|s| s.parse::<i64>().ok())
        .unwrap_or_default();
    let latest_action = fields
        .and_then(|f| f.latest_action.clone())
        .or_else(|| summary.latest_action.clone());
    let introduced_date = fields
        .and_then(|f| f.introduced_date.clone())
        .or_else(|| summary.introduced_date.clone());

    let status = classify_status(
        latest_action.as_ref().and_then(|a| a.text.as_deref()),
        introduced_date.is_some(),
    );

    Some(BillRecord {
        id,
        bill_number: summary.number.clone().unwrap_or_default(),
        congress,
        bill_type: summary.bill_type.clone(),
        introduced_date,
        latest_action,
        status: Some(status),
        origin_chamber: fields
            .and_then(|f| f.origin_chamber.clone())
            .or_else(|| summary.origin_chamber.clone()),
        origin_chamber_code: fields
            .and_then(|f| f.origin_chamber_code.clone())
            .or_else(|| summary.origin_chamber_code.clone()),
        title: fields
            .and_then(|f| f.title.clone())
            .or_else(|| summary.title.clone()),
        update_date: summary
            .update_date
            .clone()
            .or_else(|| fields.and_then(|f| f.update_date.clone())),
        update_date_including_text: fields
            .and_then(|f| f.update_date_including_text.clone())
            .or_else(|| summary.update_date_including_text.clone()),
        url: summary
            .url
            .clone()
            .or_else(|| fields.and_then(|f| f.url.clone())),
        legislation_url: fields.and_then(|f| f.legislation_url.clone()),
        policy_area: fields.and_then(|f| f.policy_area.clone()),
        primary_committee_code: None,
        actions: fields.map(|f| f.actions.clone()).unwrap_or_default(),
        committees: fields.map(|f| f.committees.clone()).unwrap_or_default(),
        cosponsors: fields.map(|f| f.cosponsors.clone()).unwrap_or_default(),
        related_bills: fields.map(|f| f.related_bills.clone()).unwrap_or_default(),
        sponsors: fields.map(|f| f.sponsors.clone()).unwrap_or_default(),
        subjects: fields.map(|f| f.subjects.clone()).unwrap_or_default(),
        summaries: fields.map(|f| f.summaries.clone()).unwrap_or_default(),
        text_versions: fields.map(|f| f.text_versions.clone()).unwrap_or_default(),
        titles: fields.map(|f| f.titles.clone()).unwrap_or_default(),
    })
}

/// Sub-resource responses wrap their array under the resource key, sometimes
/// inside an extra `data` envelope.
fn resource_items<'a>(payload: &'a Value, key: &str) -> Vec<&'a Value> {
    payload
        .get(key)
        .or_else(|| payload.get("data").and_then(|data| data.get(key)))
        .and_then(Value::as_array)
        .map(|items| items.iter().collect())
        .unwrap_or_default()
}

#[derive(Debug, Deserialize)]
struct TextVersionEntry {
    #[serde(default, rename = "type")]
    version_type: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    formats: Vec<TextVersionFormat>,
}

#[derive(Debug, Deserialize)]
struct TextVersionFormat {
    #[serde(default, rename = "type")]
    format_type: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BillSynchronizer {
    client: CongressClient,
    store: Store,
}

impl BillSynchronizer {
    pub fn new(client: CongressClient, store: Store) -> Self {
        Self { client, store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Fetch a batch of bills and reconcile each into the store. Per-bill
    /// failures are counted and logged, never propagated.
    pub async fn sync_bills(&self, options: &SyncOptions) -> anyhow::Result<SyncSummary> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(%run_id, query = ?options.search_query, from = ?options.date_from, to = ?options.date_to, "starting bill sync");

        let bills = self
            .client
            .fetch_recent_bills(&ListQuery {
                limit: options.limit,
                search: options.search_query.clone(),
                date_from: options.date_from.clone(),
                date_to: options.date_to.clone(),
            })
            .await?;

        let fetched = bills.len();
        let mut stored = 0usize;
        let mut skipped = 0usize;
        let mut failed = 0usize;

        for bill in &bills {
            match self.save_bill(bill).await {
                Ok(SaveOutcome::Stored) => stored += 1,
                Ok(SaveOutcome::Skipped) => skipped += 1,
                Err(err) => {
                    failed += 1;
                    warn!(bill = ?bill.canonical_id(), error = %err, "failed to save bill");
                }
            }
        }

        let summary = SyncSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            fetched,
            stored,
            skipped,
            failed,
        };
        info!(
            %run_id,
            fetched = summary.fetched,
            stored = summary.stored,
            skipped = summary.skipped,
            failed = summary.failed,
            "bill sync finished"
        );
        Ok(summary)
    }

    /// Convenience wrapper for the startup freshness pass: sync bills
    /// updated within the trailing `days` window.
    pub async fn sync_recent_window(&self, days: i64) -> anyhow::Result<SyncSummary> {
        let (from, to) = date_window_ending_today(days);
        self.sync_bills(&SyncOptions {
            date_from: Some(from.format("%Y-%m-%d").to_string()),
            date_to: Some(to.format("%Y-%m-%d").to_string()),
            ..SyncOptions::default()
        })
        .await
    }

    /// Reconcile one bill. Skips when the stored row already carries the
    /// incoming `updateDate`; otherwise fetches detail best-effort, upserts
    /// the row, and enriches sponsors, committees, actions, and text-version
    /// metadata. Enrichment failures are logged and do not fail the bill.
    pub async fn save_bill(&self, summary: &BillSummary) -> anyhow::Result<SaveOutcome> {
        let Some(id) = summary.canonical_id() else {
            anyhow::bail!("bill entry carries no type/number identifier");
        };

        if let Some(stored_date) = self.store.bill_update_date(&id).await? {
            if stored_date.is_some() && stored_date.as_deref() == summary.update_date.as_deref() {
                return Ok(SaveOutcome::Skipped);
            }
        }

        let detail = match &summary.url {
            Some(url) => match self.client.fetch_detail_by_url(url).await {
                Ok(detail) => Some(detail),
                Err(err) => {
                    warn!(bill = %id, error = %err, "detail fetch failed; storing summary fields only");
                    None
                }
            },
            None => None,
        };

        self.persist(summary, detail.as_ref()).await
    }

    /// Like [`save_bill`](Self::save_bill), but for callers that already
    /// hold the detail payload (the search endpoint enriches in bulk).
    pub async fn save_prefetched(
        &self,
        summary: &BillSummary,
        detail: Option<&BillDetail>,
    ) -> anyhow::Result<SaveOutcome> {
        let Some(id) = summary.canonical_id() else {
            anyhow::bail!("bill entry carries no type/number identifier");
        };
        if let Some(stored_date) = self.store.bill_update_date(&id).await? {
            if stored_date.is_some() && stored_date.as_deref() == summary.update_date.as_deref() {
                return Ok(SaveOutcome::Skipped);
            }
        }
        self.persist(summary, detail).await
    }

    async fn persist(
        &self,
        summary: &BillSummary,
        detail: Option<&BillDetail>,
    ) -> anyhow::Result<SaveOutcome> {
        let Some(record) = build_record(summary, detail) else {
            anyhow::bail!("bill entry carries no type/number identifier");
        };
        self.store.upsert_bill(&record).await?;

        for sponsor in &record.sponsors {
            match self.store.upsert_person(sponsor).await {
                Ok(true) => {
                    let person_id = sponsor.bioguide_id.as_deref().unwrap_or_default();
                    if let Err(err) = self
                        .store
                        .link_bill_person(&record.id, person_id, "sponsor", sponsor.is_by_request.as_deref())
                        .await
                    {
                        warn!(bill = %record.id, person = %person_id, error = %err, "failed to link sponsor");
                    }
                }
                Ok(false) => {}
                Err(err) => warn!(bill = %record.id, error = %err, "failed to upsert sponsor"),
            }
        }

        self.enrich_committees(&record).await;
        self.enrich_actions(&record).await;
        self.enrich_text_versions(&record).await;

        Ok(SaveOutcome::Stored)
    }

    /// Upsert the bill's committee list. The first committee in API order is
    /// denormalized onto the bill as its primary committee.
    async fn enrich_committees(&self, record: &BillRecord) {
        let Some(url) = record.committees.url.as_deref() else {
            return;
        };
        let payload = match self.client.fetch_resource(url).await {
            Ok(payload) => payload,
            Err(err) => {
                warn!(bill = %record.id, error = %err, "committee fetch failed");
                return;
            }
        };

        let mut primary_set = false;
        for item in resource_items(&payload, "committees") {
            let committee: CommitteeRecord = match serde_json::from_value(item.clone()) {
                Ok(committee) => committee,
                Err(err) => {
                    warn!(bill = %record.id, error = %err, "skipping malformed committee entry");
                    continue;
                }
            };
            let Some(code) = committee.committee_code.clone().filter(|c| !c.is_empty()) else {
                continue;
            };
            match self.store.upsert_committee(&committee).await {
                Ok(true) => {
                    if let Err(err) = self.store.link_bill_committee(&record.id, &code).await {
                        warn!(bill = %record.id, committee = %code, error = %err, "failed to link committee");
                        continue;
                    }
                    if !primary_set {
                        primary_set = true;
                        if let Err(err) = self.store.set_primary_committee(&record.id, Some(&code)).await {
                            warn!(bill = %record.id, committee = %code, error = %err, "failed to set primary committee");
                        }
                    }
                }
                Ok(false) => {}
                Err(err) => warn!(bill = %record.id, error = %err, "failed to upsert committee"),
            }
        }
    }

    /// Replace the bill's action history with the freshly fetched set.
    async fn enrich_actions(&self, record: &BillRecord) {
        let Some(url) = record.actions.url.as_deref() else {
            return;
        };
        let payload = match self.client.fetch_resource(url).await {
            Ok(payload) => payload,
            Err(err) => {
                warn!(bill = %record.id, error = %err, "action fetch failed");
                return;
            }
        };

        let actions: Vec<BillAction> = resource_items(&payload, "actions")
            .into_iter()
            .filter_map(|item| match serde_json::from_value(item.clone()) {
                Ok(action) => Some(action),
                Err(err) => {
                    warn!(bill = %record.id, error = %err, "skipping malformed action entry");
                    None
                }
            })
            .collect();
        if actions.is_empty() {
            return;
        }
        match self.store.replace_bill_actions(&record.id, &actions).await {
            Ok(count) => info!(bill = %record.id, count, "replaced action history"),
            Err(err) => warn!(bill = %record.id, error = %err, "failed to replace actions"),
        }
    }

    /// Record text-version metadata rows. Content stays unfetched here; it
    /// is downloaded lazily when a reader first asks for the bill text.
    async fn enrich_text_versions(&self, record: &BillRecord) {
        let Some(url) = record.text_versions.url.as_deref() else {
            return;
        };
        let payload = match self.client.fetch_resource(url).await {
            Ok(payload) => payload,
            Err(err) => {
                warn!(bill = %record.id, error = %err, "text-version fetch failed");
                return;
            }
        };

        for item in resource_items(&payload, "textVersions") {
            let entry: TextVersionEntry = match serde_json::from_value(item.clone()) {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(bill = %record.id, error = %err, "skipping malformed text version");
                    continue;
                }
            };
            for format in entry.formats {
                let meta = TextVersionMeta {
                    version_type: entry.version_type.clone(),
                    date: entry.date.clone(),
                    format_type: format.format_type,
                    url: format.url,
                };
                if let Err(err) = self.store.upsert_text_version(&record.id, &meta).await {
                    warn!(bill = %record.id, error = %err, "failed to upsert text version");
                }
            }
        }
    }
}

/// One-shot guard for the background freshness sync triggered by the first
/// inbound request (or process start). Callers that win the race spawn the
/// sync; everyone else gets `false`.
#[derive(Debug, Default)]
pub struct StartupSync {
    started: AtomicBool,
}

impl StartupSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` exactly once across all callers.
    pub fn ensure_started(&self) -> bool {
        !self.started.swap(true, Ordering::SeqCst)
    }

    /// Fire-and-forget the trailing-window sync if this caller won the race.
    pub fn spawn_initial_sync(&self, synchronizer: Arc<BillSynchronizer>, window_days: i64) {
        if !self.ensure_started() {
            return;
        }
        tokio::spawn(async move {
            match synchronizer.sync_recent_window(window_days).await {
                Ok(summary) => info!(
                    run_id = %summary.run_id,
                    stored = summary.stored,
                    skipped = summary.skipped,
                    failed = summary.failed,
                    "startup sync finished"
                ),
                Err(err) => warn!(error = %err, "startup sync failed"),
            }
        });
    }
}
