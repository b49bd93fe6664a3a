//! Declarative table definitions. Creation order respects foreign-key
//! dependencies; migrations are additive column checks only.

pub struct TableSpec {
    pub name: &'static str,
    pub create: &'static str,
    pub indexes: &'static [&'static str],
    pub migrations: &'static [Migration],
}

/// An additive migration: apply `alter` when `column` is missing from
/// `table`.
pub struct Migration {
    pub name: &'static str,
    pub table: &'static str,
    pub column: &'static str,
    pub alter: &'static str,
}

pub const TABLES: &[TableSpec] = &[
    TableSpec {
        name: "committees",
        create: r#"
            CREATE TABLE IF NOT EXISTS committees (
                committeeCode TEXT PRIMARY KEY,
                name TEXT,
                chamber TEXT,
                type TEXT,
                subcommitteeCode TEXT,
                parentCommitteeCode TEXT,
                url TEXT
            )
        "#,
        indexes: &[],
        migrations: &[],
    },
    TableSpec {
        name: "people",
        create: r#"
            CREATE TABLE IF NOT EXISTS people (
                bioguideId TEXT PRIMARY KEY,
                firstName TEXT,
                lastName TEXT,
                fullName TEXT,
                branch TEXT,
                party TEXT,
                state TEXT,
                district TEXT,
                donors TEXT,
                url TEXT
            )
        "#,
        indexes: &[],
        migrations: &[],
    },
    TableSpec {
        name: "bills",
        create: r#"
            CREATE TABLE IF NOT EXISTS bills (
                id TEXT PRIMARY KEY,
                billNumber TEXT NOT NULL,
                congress INTEGER NOT NULL,
                type TEXT,
                introducedDate TEXT,
                latestAction TEXT,
                status TEXT,
                originChamber TEXT,
                originChamberCode TEXT,
                title TEXT,
                updateDate TEXT,
                updateDateIncludingText TEXT,
                url TEXT,
                legislationUrl TEXT,
                policyArea TEXT,
                primaryCommitteeCode TEXT,
                actionsCount INTEGER,
                actionsUrl TEXT,
                committeesCount INTEGER,
                committeesUrl TEXT,
                cosponsorsCount INTEGER,
                cosponsorsUrl TEXT,
                relatedBillsCount INTEGER,
                relatedBillsUrl TEXT,
                sponsors TEXT,
                subjectsCount INTEGER,
                subjectsUrl TEXT,
                summariesCount INTEGER,
                summariesUrl TEXT,
                textVersionsCount INTEGER,
                textVersionsUrl TEXT,
                titlesCount INTEGER,
                titlesUrl TEXT,
                UNIQUE(billNumber, congress),
                FOREIGN KEY (primaryCommitteeCode) REFERENCES committees(committeeCode)
            )
        "#,
        indexes: &[],
        migrations: &[Migration {
            name: "add_status_column",
            table: "bills",
            column: "status",
            alter: "ALTER TABLE bills ADD COLUMN status TEXT",
        }],
    },
    TableSpec {
        name: "bill_people",
        create: r#"
            CREATE TABLE IF NOT EXISTS bill_people (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                billId TEXT NOT NULL,
                personId TEXT NOT NULL,
                relationship TEXT,
                isByRequest TEXT,
                FOREIGN KEY (billId) REFERENCES bills(id),
                FOREIGN KEY (personId) REFERENCES people(bioguideId),
                UNIQUE(billId, personId, relationship)
            )
        "#,
        indexes: &[],
        migrations: &[],
    },
    TableSpec {
        name: "committee_people",
        create: r#"
            CREATE TABLE IF NOT EXISTS committee_people (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                committeeCode TEXT NOT NULL,
                personId TEXT NOT NULL,
                role TEXT,
                FOREIGN KEY (committeeCode) REFERENCES committees(committeeCode),
                FOREIGN KEY (personId) REFERENCES people(bioguideId),
                UNIQUE(committeeCode, personId)
            )
        "#,
        indexes: &[],
        migrations: &[],
    },
    TableSpec {
        name: "bill_committees",
        create: r#"
            CREATE TABLE IF NOT EXISTS bill_committees (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                billId TEXT NOT NULL,
                committeeCode TEXT NOT NULL,
                FOREIGN KEY (billId) REFERENCES bills(id),
                FOREIGN KEY (committeeCode) REFERENCES committees(committeeCode),
                UNIQUE(billId, committeeCode)
            )
        "#,
        indexes: &[],
        migrations: &[],
    },
    TableSpec {
        name: "bill_actions",
        create: r#"
            CREATE TABLE IF NOT EXISTS bill_actions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                billId TEXT NOT NULL,
                actionDate TEXT,
                text TEXT,
                type TEXT,
                actionCode TEXT,
                sourceSystem TEXT,
                FOREIGN KEY (billId) REFERENCES bills(id),
                UNIQUE(billId, actionDate, text, actionCode)
            )
        "#,
        indexes: &[r#"
            CREATE INDEX IF NOT EXISTS idx_bill_actions_billId
            ON bill_actions(billId, actionDate DESC)
        "#],
        migrations: &[],
    },
    TableSpec {
        name: "bill_text_versions",
        create: r#"
            CREATE TABLE IF NOT EXISTS bill_text_versions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                billId TEXT NOT NULL,
                type TEXT,
                date TEXT,
                formatType TEXT,
                url TEXT,
                content TEXT,
                contentFetched INTEGER DEFAULT 0,
                FOREIGN KEY (billId) REFERENCES bills(id),
                UNIQUE(billId, type, formatType)
            )
        "#,
        indexes: &[],
        migrations: &[
            Migration {
                name: "add_content_column",
                table: "bill_text_versions",
                column: "content",
                alter: "ALTER TABLE bill_text_versions ADD COLUMN content TEXT",
            },
            Migration {
                name: "add_contentFetched_column",
                table: "bill_text_versions",
                column: "contentFetched",
                alter: "ALTER TABLE bill_text_versions ADD COLUMN contentFetched INTEGER DEFAULT 0",
            },
        ],
    },
];
