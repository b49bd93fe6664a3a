//! Bill, person, committee, action, and text-version operations.
//!
//! Column names stay camelCase to match the wire format, so rows can be
//! serialized straight into API responses.

use billscope_core::{BillAction, BillRecord, CommitteeRecord, Sponsor, TextVersionMeta};
use serde::Serialize;
use sqlx::Row;

use crate::{StorageError, Store};

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct BillRow {
    pub id: String,
    #[sqlx(rename = "billNumber")]
    #[serde(rename = "billNumber")]
    pub bill_number: String,
    pub congress: i64,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub bill_type: Option<String>,
    #[sqlx(rename = "introducedDate")]
    #[serde(rename = "introducedDate")]
    pub introduced_date: Option<String>,
    /// JSON text, parsed at the API boundary.
    #[sqlx(rename = "latestAction")]
    #[serde(rename = "latestAction")]
    pub latest_action: Option<String>,
    pub status: Option<String>,
    #[sqlx(rename = "originChamber")]
    #[serde(rename = "originChamber")]
    pub origin_chamber: Option<String>,
    #[sqlx(rename = "originChamberCode")]
    #[serde(rename = "originChamberCode")]
    pub origin_chamber_code: Option<String>,
    pub title: Option<String>,
    #[sqlx(rename = "updateDate")]
    #[serde(rename = "updateDate")]
    pub update_date: Option<String>,
    #[sqlx(rename = "updateDateIncludingText")]
    #[serde(rename = "updateDateIncludingText")]
    pub update_date_including_text: Option<String>,
    pub url: Option<String>,
    #[sqlx(rename = "legislationUrl")]
    #[serde(rename = "legislationUrl")]
    pub legislation_url: Option<String>,
    /// JSON text, parsed at the API boundary.
    #[sqlx(rename = "policyArea")]
    #[serde(rename = "policyArea")]
    pub policy_area: Option<String>,
    #[sqlx(rename = "primaryCommitteeCode")]
    #[serde(rename = "primaryCommitteeCode")]
    pub primary_committee_code: Option<String>,
    #[sqlx(rename = "actionsCount")]
    #[serde(rename = "actionsCount")]
    pub actions_count: Option<i64>,
    #[sqlx(rename = "actionsUrl")]
    #[serde(rename = "actionsUrl")]
    pub actions_url: Option<String>,
    #[sqlx(rename = "committeesCount")]
    #[serde(rename = "committeesCount")]
    pub committees_count: Option<i64>,
    #[sqlx(rename = "committeesUrl")]
    #[serde(rename = "committeesUrl")]
    pub committees_url: Option<String>,
    #[sqlx(rename = "cosponsorsCount")]
    #[serde(rename = "cosponsorsCount")]
    pub cosponsors_count: Option<i64>,
    #[sqlx(rename = "cosponsorsUrl")]
    #[serde(rename = "cosponsorsUrl")]
    pub cosponsors_url: Option<String>,
    #[sqlx(rename = "relatedBillsCount")]
    #[serde(rename = "relatedBillsCount")]
    pub related_bills_count: Option<i64>,
    #[sqlx(rename = "relatedBillsUrl")]
    #[serde(rename = "relatedBillsUrl")]
    pub related_bills_url: Option<String>,
    /// Raw sponsors array as JSON text, kept alongside the normalized
    /// people/bill_people rows. Not serialized: `BillListing` exposes the
    /// joined sponsor rows under the same key.
    #[serde(skip_serializing)]
    pub sponsors: Option<String>,
    #[sqlx(rename = "subjectsCount")]
    #[serde(rename = "subjectsCount")]
    pub subjects_count: Option<i64>,
    #[sqlx(rename = "subjectsUrl")]
    #[serde(rename = "subjectsUrl")]
    pub subjects_url: Option<String>,
    #[sqlx(rename = "summariesCount")]
    #[serde(rename = "summariesCount")]
    pub summaries_count: Option<i64>,
    #[sqlx(rename = "summariesUrl")]
    #[serde(rename = "summariesUrl")]
    pub summaries_url: Option<String>,
    #[sqlx(rename = "textVersionsCount")]
    #[serde(rename = "textVersionsCount")]
    pub text_versions_count: Option<i64>,
    #[sqlx(rename = "textVersionsUrl")]
    #[serde(rename = "textVersionsUrl")]
    pub text_versions_url: Option<String>,
    #[sqlx(rename = "titlesCount")]
    #[serde(rename = "titlesCount")]
    pub titles_count: Option<i64>,
    #[sqlx(rename = "titlesUrl")]
    #[serde(rename = "titlesUrl")]
    pub titles_url: Option<String>,
    #[sqlx(rename = "primaryCommitteeName")]
    #[serde(rename = "primaryCommitteeName")]
    pub primary_committee_name: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct SponsorRow {
    #[sqlx(rename = "bioguideId")]
    #[serde(rename = "bioguideId")]
    pub bioguide_id: String,
    #[sqlx(rename = "firstName")]
    #[serde(rename = "firstName")]
    pub first_name: Option<String>,
    #[sqlx(rename = "lastName")]
    #[serde(rename = "lastName")]
    pub last_name: Option<String>,
    #[sqlx(rename = "fullName")]
    #[serde(rename = "fullName")]
    pub full_name: Option<String>,
    pub party: Option<String>,
    pub state: Option<String>,
    pub district: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct CommitteeRow {
    #[sqlx(rename = "committeeCode")]
    #[serde(rename = "committeeCode")]
    pub committee_code: String,
    pub name: Option<String>,
    pub chamber: Option<String>,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub committee_type: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct TextVersionRow {
    pub id: i64,
    #[sqlx(rename = "billId")]
    #[serde(rename = "billId")]
    pub bill_id: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub version_type: Option<String>,
    pub date: Option<String>,
    #[sqlx(rename = "formatType")]
    #[serde(rename = "formatType")]
    pub format_type: Option<String>,
    pub url: Option<String>,
    pub content: Option<String>,
    #[sqlx(rename = "contentFetched")]
    #[serde(rename = "contentFetched")]
    pub content_fetched: i64,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ActionRow {
    pub id: i64,
    #[sqlx(rename = "billId")]
    #[serde(rename = "billId")]
    pub bill_id: String,
    #[sqlx(rename = "actionDate")]
    #[serde(rename = "actionDate")]
    pub action_date: Option<String>,
    pub text: Option<String>,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub action_type: Option<String>,
    #[sqlx(rename = "actionCode")]
    #[serde(rename = "actionCode")]
    pub action_code: Option<String>,
    #[sqlx(rename = "sourceSystem")]
    #[serde(rename = "sourceSystem")]
    pub source_system: Option<String>,
}

/// A bill row with its joined sponsors and committees.
#[derive(Debug, Clone, Serialize)]
pub struct BillListing {
    #[serde(flatten)]
    pub bill: BillRow,
    pub sponsors: Vec<SponsorRow>,
    pub committees: Vec<CommitteeRow>,
}

const BILL_SELECT: &str = r#"
    SELECT b.*, pc.name AS primaryCommitteeName
    FROM bills b
    LEFT JOIN committees pc ON b.primaryCommitteeCode = pc.committeeCode
"#;

impl Store {
    /// Insert or fully replace a bill row, keyed by canonical id.
    pub async fn upsert_bill(&self, record: &BillRecord) -> Result<(), StorageError> {
        let latest_action = record
            .latest_action
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let policy_area = record
            .policy_area
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let sponsors = if record.sponsors.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&record.sponsors)?)
        };

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO bills
            (id, billNumber, congress, type, introducedDate, latestAction, status,
             originChamber, originChamberCode, title, updateDate, updateDateIncludingText,
             url, legislationUrl, policyArea, primaryCommitteeCode,
             actionsCount, actionsUrl, committeesCount, committeesUrl,
             cosponsorsCount, cosponsorsUrl, relatedBillsCount, relatedBillsUrl,
             sponsors, subjectsCount, subjectsUrl, summariesCount, summariesUrl,
             textVersionsCount, textVersionsUrl, titlesCount, titlesUrl)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                    ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, ?30,
                    ?31, ?32, ?33)
            "#,
        )
        .bind(&record.id)
        .bind(&record.bill_number)
        .bind(record.congress)
        .bind(&record.bill_type)
        .bind(&record.introduced_date)
        .bind(latest_action)
        .bind(record.status.map(|s| s.as_str()))
        .bind(&record.origin_chamber)
        .bind(&record.origin_chamber_code)
        .bind(&record.title)
        .bind(&record.update_date)
        .bind(&record.update_date_including_text)
        .bind(&record.url)
        .bind(&record.legislation_url)
        .bind(policy_area)
        .bind(&record.primary_committee_code)
        .bind(record.actions.count)
        .bind(&record.actions.url)
        .bind(record.committees.count)
        .bind(&record.committees.url)
        .bind(record.cosponsors.count)
        .bind(&record.cosponsors.url)
        .bind(record.related_bills.count)
        .bind(&record.related_bills.url)
        .bind(sponsors)
        .bind(record.subjects.count)
        .bind(&record.subjects.url)
        .bind(record.summaries.count)
        .bind(&record.summaries.url)
        .bind(record.text_versions.count)
        .bind(&record.text_versions.url)
        .bind(record.titles.count)
        .bind(&record.titles.url)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Stored `updateDate` for a bill: `None` when the row does not exist,
    /// `Some(None)` when it exists without a date.
    pub async fn bill_update_date(&self, id: &str) -> Result<Option<Option<String>>, StorageError> {
        let row = sqlx::query("SELECT updateDate FROM bills WHERE id = ?1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        match row {
            Some(row) => Ok(Some(row.try_get("updateDate")?)),
            None => Ok(None),
        }
    }

    /// Upsert a legislator. Returns `false` when the sponsor has no
    /// bioguide id to key on.
    pub async fn upsert_person(&self, sponsor: &Sponsor) -> Result<bool, StorageError> {
        let Some(bioguide_id) = sponsor.bioguide_id.as_deref().filter(|s| !s.is_empty()) else {
            return Ok(false);
        };
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO people
            (bioguideId, firstName, lastName, fullName, branch, party, state, district, donors, url)
            VALUES (?1, ?2, ?3, ?4, 'legislative', ?5, ?6, ?7, NULL, ?8)
            "#,
        )
        .bind(bioguide_id)
        .bind(&sponsor.first_name)
        .bind(&sponsor.last_name)
        .bind(&sponsor.full_name)
        .bind(&sponsor.party)
        .bind(&sponsor.state)
        .bind(&sponsor.district)
        .bind(&sponsor.url)
        .execute(self.pool())
        .await?;
        Ok(true)
    }

    pub async fn link_bill_person(
        &self,
        bill_id: &str,
        person_id: &str,
        relationship: &str,
        is_by_request: Option<&str>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO bill_people (billId, personId, relationship, isByRequest)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(bill_id)
        .bind(person_id)
        .bind(relationship)
        .bind(is_by_request)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Upsert a committee. Returns `false` when there is no committee code.
    pub async fn upsert_committee(&self, committee: &CommitteeRecord) -> Result<bool, StorageError> {
        let Some(code) = committee.committee_code.as_deref().filter(|s| !s.is_empty()) else {
            return Ok(false);
        };
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO committees
            (committeeCode, name, chamber, type, subcommitteeCode, parentCommitteeCode, url)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(code)
        .bind(&committee.name)
        .bind(&committee.chamber)
        .bind(&committee.committee_type)
        .bind(&committee.subcommittee_code)
        .bind(&committee.parent_committee_code)
        .bind(&committee.url)
        .execute(self.pool())
        .await?;
        Ok(true)
    }

    pub async fn link_bill_committee(
        &self,
        bill_id: &str,
        committee_code: &str,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT OR REPLACE INTO bill_committees (billId, committeeCode) VALUES (?1, ?2)",
        )
        .bind(bill_id)
        .bind(committee_code)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn set_primary_committee(
        &self,
        bill_id: &str,
        committee_code: Option<&str>,
    ) -> Result<(), StorageError> {
        sqlx::query("UPDATE bills SET primaryCommitteeCode = ?2 WHERE id = ?1")
            .bind(bill_id)
            .bind(committee_code)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Atomically replace the full action history of a bill. Any failure
    /// rolls the whole batch back, leaving the previous history intact.
    pub async fn replace_bill_actions(
        &self,
        bill_id: &str,
        actions: &[BillAction],
    ) -> Result<usize, StorageError> {
        let mut tx = self.pool().begin().await?;
        sqlx::query("DELETE FROM bill_actions WHERE billId = ?1")
            .bind(bill_id)
            .execute(&mut *tx)
            .await?;

        let mut inserted = 0usize;
        for action in actions {
            let source_system = action
                .source_system
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;
            sqlx::query(
                r#"
                INSERT INTO bill_actions (billId, actionDate, text, type, actionCode, sourceSystem)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(bill_id)
            .bind(&action.action_date)
            .bind(&action.text)
            .bind(&action.action_type)
            .bind(&action.action_code)
            .bind(source_system)
            .execute(&mut *tx)
            .await?;
            inserted += 1;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// Upsert text-version metadata without clobbering previously fetched
    /// content.
    pub async fn upsert_text_version(
        &self,
        bill_id: &str,
        version: &TextVersionMeta,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO bill_text_versions (billId, type, date, formatType, url)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(billId, type, formatType)
            DO UPDATE SET date = excluded.date, url = excluded.url
            "#,
        )
        .bind(bill_id)
        .bind(&version.version_type)
        .bind(&version.date)
        .bind(&version.format_type)
        .bind(&version.url)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Persist sanitized document content against the version row that
    /// carries `url`, inserting a bare row when none exists yet.
    pub async fn save_text_content(
        &self,
        bill_id: &str,
        url: &str,
        content: &str,
    ) -> Result<(), StorageError> {
        let updated = sqlx::query(
            "UPDATE bill_text_versions SET content = ?3, contentFetched = 1 WHERE billId = ?1 AND url = ?2",
        )
        .bind(bill_id)
        .bind(url)
        .bind(content)
        .execute(self.pool())
        .await?
        .rows_affected();

        if updated == 0 {
            sqlx::query(
                "INSERT INTO bill_text_versions (billId, url, content, contentFetched) VALUES (?1, ?2, ?3, 1)",
            )
            .bind(bill_id)
            .bind(url)
            .bind(content)
            .execute(self.pool())
            .await?;
        }
        Ok(())
    }

    pub async fn get_bill(&self, id: &str) -> Result<Option<BillListing>, StorageError> {
        let sql = format!("{BILL_SELECT} WHERE b.id = ?1");
        let row = sqlx::query_as::<_, BillRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        let Some(bill) = row else {
            return Ok(None);
        };
        let sponsors = self.fetch_bill_sponsors(id).await?;
        let committees = self.fetch_bill_committees(id).await?;
        Ok(Some(BillListing {
            bill,
            sponsors,
            committees,
        }))
    }

    /// Bills ordered by most recent update, with joined sponsors and
    /// committees inlined.
    pub async fn list_bills(&self, limit: i64) -> Result<Vec<BillListing>, StorageError> {
        let sql = format!("{BILL_SELECT} ORDER BY b.updateDate DESC LIMIT ?1");
        let rows = sqlx::query_as::<_, BillRow>(&sql)
            .bind(limit)
            .fetch_all(self.pool())
            .await?;

        let mut listings = Vec::with_capacity(rows.len());
        for bill in rows {
            let sponsors = self.fetch_bill_sponsors(&bill.id).await?;
            let committees = self.fetch_bill_committees(&bill.id).await?;
            listings.push(BillListing {
                bill,
                sponsors,
                committees,
            });
        }
        Ok(listings)
    }

    async fn fetch_bill_sponsors(&self, bill_id: &str) -> Result<Vec<SponsorRow>, StorageError> {
        Ok(sqlx::query_as::<_, SponsorRow>(
            r#"
            SELECT p.bioguideId, p.firstName, p.lastName, p.fullName, p.party, p.state, p.district
            FROM bill_people bp
            JOIN people p ON bp.personId = p.bioguideId
            WHERE bp.billId = ?1 AND bp.relationship = 'sponsor'
            "#,
        )
        .bind(bill_id)
        .fetch_all(self.pool())
        .await?)
    }

    async fn fetch_bill_committees(&self, bill_id: &str) -> Result<Vec<CommitteeRow>, StorageError> {
        Ok(sqlx::query_as::<_, CommitteeRow>(
            r#"
            SELECT c.committeeCode, c.name, c.chamber, c.type
            FROM bill_committees bc
            JOIN committees c ON bc.committeeCode = c.committeeCode
            WHERE bc.billId = ?1
            "#,
        )
        .bind(bill_id)
        .fetch_all(self.pool())
        .await?)
    }

    pub async fn get_bill_text_versions(
        &self,
        bill_id: &str,
    ) -> Result<Vec<TextVersionRow>, StorageError> {
        Ok(sqlx::query_as::<_, TextVersionRow>(
            r#"
            SELECT id, billId, type, date, formatType, url, content, contentFetched
            FROM bill_text_versions
            WHERE billId = ?1
            ORDER BY date DESC
            "#,
        )
        .bind(bill_id)
        .fetch_all(self.pool())
        .await?)
    }

    pub async fn get_bill_actions(&self, bill_id: &str) -> Result<Vec<ActionRow>, StorageError> {
        Ok(sqlx::query_as::<_, ActionRow>(
            r#"
            SELECT id, billId, actionDate, text, type, actionCode, sourceSystem
            FROM bill_actions
            WHERE billId = ?1
            ORDER BY actionDate DESC
            "#,
        )
        .bind(bill_id)
        .fetch_all(self.pool())
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billscope_core::{BillStatus, LatestAction, PolicyArea, ResourceRef};

    async fn init_store() -> Store {
        let store = Store::open_in_memory().await.expect("open");
        store.init_schema().await.expect("init");
        store
    }

    fn sample_bill(id: &str, number: &str, update_date: &str) -> BillRecord {
        BillRecord {
            id: id.to_string(),
            bill_number: number.to_string(),
            congress: 119,
            bill_type: Some("HR".to_string()),
            introduced_date: Some("2025-07-10".to_string()),
            latest_action: Some(LatestAction {
                action_date: Some("2025-07-11".to_string()),
                text: Some("Referred to the Committee on Energy and Commerce".to_string()),
                action_time: None,
            }),
            status: Some(BillStatus::InCommittee),
            origin_chamber: Some("House".to_string()),
            origin_chamber_code: Some("H".to_string()),
            title: Some("An example act".to_string()),
            update_date: Some(update_date.to_string()),
            policy_area: Some(PolicyArea {
                name: Some("Energy".to_string()),
            }),
            actions: ResourceRef {
                count: Some(4),
                url: Some("https://api.congress.gov/v3/bill/119/hr/1/actions".to_string()),
            },
            ..BillRecord::default()
        }
    }

    #[tokio::test]
    async fn bill_upsert_and_fetch_round_trip() {
        let store = init_store().await;
        store
            .upsert_bill(&sample_bill("hr4820", "4820", "2025-07-12"))
            .await
            .expect("upsert");

        let listing = store
            .get_bill("hr4820")
            .await
            .expect("get")
            .expect("present");
        assert_eq!(listing.bill.bill_number, "4820");
        assert_eq!(listing.bill.status.as_deref(), Some("In Committee"));
        assert_eq!(listing.bill.actions_count, Some(4));

        let latest: LatestAction =
            serde_json::from_str(listing.bill.latest_action.as_deref().expect("json")).expect("parse");
        assert_eq!(
            latest.text.as_deref(),
            Some("Referred to the Committee on Energy and Commerce")
        );
    }

    #[tokio::test]
    async fn update_date_distinguishes_missing_row_from_missing_date() {
        let store = init_store().await;
        assert_eq!(store.bill_update_date("hr1").await.expect("query"), None);

        store
            .upsert_bill(&sample_bill("hr1", "1", "2025-07-12"))
            .await
            .expect("upsert");
        assert_eq!(
            store.bill_update_date("hr1").await.expect("query"),
            Some(Some("2025-07-12".to_string()))
        );
    }

    #[tokio::test]
    async fn reupsert_replaces_the_row_in_place() {
        let store = init_store().await;
        store
            .upsert_bill(&sample_bill("hr2", "2", "2025-07-12"))
            .await
            .expect("first");
        let mut updated = sample_bill("hr2", "2", "2025-07-20");
        updated.title = Some("Renamed act".to_string());
        store.upsert_bill(&updated).await.expect("second");

        let listing = store.get_bill("hr2").await.expect("get").expect("present");
        assert_eq!(listing.bill.update_date.as_deref(), Some("2025-07-20"));
        assert_eq!(listing.bill.title.as_deref(), Some("Renamed act"));
    }

    #[tokio::test]
    async fn sponsors_join_through_bill_people() {
        let store = init_store().await;
        store
            .upsert_bill(&sample_bill("hr3", "3", "2025-07-12"))
            .await
            .expect("bill");

        let sponsor = Sponsor {
            bioguide_id: Some("M001234".to_string()),
            first_name: Some("Jordan".to_string()),
            last_name: Some("Miles".to_string()),
            full_name: Some("Rep. Jordan Miles [D-CA-12]".to_string()),
            party: Some("D".to_string()),
            state: Some("CA".to_string()),
            ..Sponsor::default()
        };
        assert!(store.upsert_person(&sponsor).await.expect("person"));
        store
            .link_bill_person("hr3", "M001234", "sponsor", None)
            .await
            .expect("link");

        let listing = store.get_bill("hr3").await.expect("get").expect("present");
        assert_eq!(listing.sponsors.len(), 1);
        assert_eq!(listing.sponsors[0].last_name.as_deref(), Some("Miles"));

        // no bioguide id -> skipped, not an error
        assert!(!store
            .upsert_person(&Sponsor::default())
            .await
            .expect("skip"));
    }

    #[tokio::test]
    async fn list_orders_by_update_date_desc() {
        let store = init_store().await;
        store
            .upsert_bill(&sample_bill("hr10", "10", "2025-07-01"))
            .await
            .expect("older");
        store
            .upsert_bill(&sample_bill("hr11", "11", "2025-07-15"))
            .await
            .expect("newer");

        let listings = store.list_bills(100).await.expect("list");
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].bill.id, "hr11");
        assert_eq!(listings[1].bill.id, "hr10");
    }

    #[tokio::test]
    async fn action_replace_is_atomic() {
        let store = init_store().await;
        store
            .upsert_bill(&sample_bill("hr5", "5", "2025-07-12"))
            .await
            .expect("bill");

        let first = vec![BillAction {
            action_date: Some("2025-07-10".to_string()),
            text: Some("Introduced in House".to_string()),
            ..BillAction::default()
        }];
        assert_eq!(
            store.replace_bill_actions("hr5", &first).await.expect("replace"),
            1
        );

        // A batch with an internal duplicate violates the unique constraint;
        // the previous history must survive the rollback.
        let duplicate = BillAction {
            action_date: Some("2025-07-11".to_string()),
            text: Some("Referred to committee".to_string()),
            action_code: Some("H11100".to_string()),
            ..BillAction::default()
        };
        let failing = vec![duplicate.clone(), duplicate];
        assert!(store.replace_bill_actions("hr5", &failing).await.is_err());

        let actions = store.get_bill_actions("hr5").await.expect("actions");
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].text.as_deref(), Some("Introduced in House"));
    }

    #[tokio::test]
    async fn text_version_metadata_refresh_keeps_content() {
        let store = init_store().await;
        store
            .upsert_bill(&sample_bill("hr6", "6", "2025-07-12"))
            .await
            .expect("bill");

        let meta = TextVersionMeta {
            version_type: Some("Introduced in House".to_string()),
            date: Some("2025-07-10".to_string()),
            format_type: Some("Formatted Text".to_string()),
            url: Some("https://www.congress.gov/119/bills/hr6/BILLS-119hr6ih.htm".to_string()),
        };
        store.upsert_text_version("hr6", &meta).await.expect("meta");
        store
            .save_text_content(
                "hr6",
                meta.url.as_deref().unwrap(),
                "<pre>SECTION 1.</pre>",
            )
            .await
            .expect("content");

        // Metadata refresh on the next sync must not wipe the cached text.
        let mut refreshed = meta.clone();
        refreshed.date = Some("2025-07-12".to_string());
        store
            .upsert_text_version("hr6", &refreshed)
            .await
            .expect("refresh");

        let versions = store.get_bill_text_versions("hr6").await.expect("versions");
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].date.as_deref(), Some("2025-07-12"));
        assert_eq!(versions[0].content.as_deref(), Some("<pre>SECTION 1.</pre>"));
        assert_eq!(versions[0].content_fetched, 1);
    }
}
