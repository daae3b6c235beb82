//! Defines the lead model and the database queries for loading leads.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::{
    OffsetDateTime, UtcOffset,
    format_description::{
        BorrowedFormatItem,
        well_known::{Iso8601, Rfc3339},
    },
    macros::format_description,
};

use crate::Error;

// ============================================================================
// MODELS
// ============================================================================

/// The identifier of a lead as assigned by the capture form.
///
/// Uniqueness is not enforced by the source, so two loaded leads may share an
/// ID. Every copy is counted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LeadId(String);

impl LeadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for LeadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One captured expression of interest, i.e. a web form submission tagged with
/// its UTM attribution.
///
/// Every attribute except the ID is optional. Profile fields may hold the
/// literal `"null"` when the visitor skipped the question, see
/// [crate::lead::LeadField::present_value].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub revenue_band: Option<String>,
    pub employee_band: Option<String>,
    pub region: Option<String>,
    pub unit: Option<String>,
    pub funnel_name: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_content: Option<String>,
    pub utm_term: Option<String>,
    /// The landing page the form was submitted from.
    pub page_url: Option<String>,
    /// The sales consultant the lead was routed to.
    pub consultant: Option<String>,
    /// When the lead was captured, as stored (ISO 8601 with offset).
    ///
    /// Kept as text so that malformed values survive loading. Use
    /// [Lead::registered_instant] to get the parsed value.
    pub registered_at: Option<String>,
}

impl Lead {
    /// Create a lead with the given ID and no other attributes.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: LeadId::new(id),
            name: None,
            email: None,
            phone: None,
            company: None,
            title: None,
            revenue_band: None,
            employee_band: None,
            region: None,
            unit: None,
            funnel_name: None,
            utm_source: None,
            utm_medium: None,
            utm_campaign: None,
            utm_content: None,
            utm_term: None,
            page_url: None,
            consultant: None,
            registered_at: None,
        }
    }

    /// The registration time, or `None` if it is missing or unparseable.
    pub fn registered_instant(&self) -> Option<OffsetDateTime> {
        self.registered_at.as_deref().and_then(parse_timestamp)
    }
}

const DISPLAY_FORMAT: &[BorrowedFormatItem<'_>] =
    format_description!("[day]/[month]/[year] [hour]:[minute]");

/// Parse a registration timestamp.
///
/// Accepts RFC 3339, the PostgreSQL text form (`2025-07-15 06:01:00+00`) and
/// ISO 8601. Returns `None` for anything else.
pub fn parse_timestamp(text: &str) -> Option<OffsetDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    OffsetDateTime::parse(text, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(&normalize_postgres_timestamp(text), &Rfc3339))
        .or_else(|_| OffsetDateTime::parse(text, &Iso8601::DEFAULT))
        .ok()
}

/// Rewrite `2025-07-15 06:01:00+00` as `2025-07-15T06:01:00+00:00`.
fn normalize_postgres_timestamp(text: &str) -> String {
    let mut normalized = text.replacen(' ', "T", 1);
    let bytes = normalized.as_bytes();
    let len = bytes.len();

    if len >= 4
        && (bytes[len - 3] == b'+' || bytes[len - 3] == b'-')
        && bytes[len - 2].is_ascii_digit()
        && bytes[len - 1].is_ascii_digit()
        && bytes[len - 4].is_ascii_digit()
    {
        normalized.push_str(":00");
    }

    normalized
}

/// Format an instant for display as `dd/mm/yyyy HH:MM` in `local_offset`.
pub fn format_timestamp(instant: OffsetDateTime, local_offset: UtcOffset) -> String {
    instant
        .to_offset(local_offset)
        .format(DISPLAY_FORMAT)
        .unwrap_or_else(|_| instant.to_string())
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

const LEAD_COLUMNS: &str = "id, name, email, phone, company, title, revenue_band, \
    employee_band, region, unit, funnel_name, utm_source, utm_medium, utm_campaign, \
    utm_content, utm_term, page_url, consultant, registered_at";

/// Create the lead table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_lead_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    // `id` is not unique: the capture form can submit the same lead twice.
    connection.execute(
        "CREATE TABLE IF NOT EXISTS lead (
                row_id INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL,
                name TEXT,
                email TEXT,
                phone TEXT,
                company TEXT,
                title TEXT,
                revenue_band TEXT,
                employee_band TEXT,
                region TEXT,
                unit TEXT,
                funnel_name TEXT,
                utm_source TEXT,
                utm_medium TEXT,
                utm_campaign TEXT,
                utm_content TEXT,
                utm_term TEXT,
                page_url TEXT,
                consultant TEXT,
                registered_at TEXT
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_lead_registered_at ON lead(registered_at);",
        (),
    )?;

    Ok(())
}

/// Insert `lead` into the database.
///
/// # Errors
/// Returns [Error::SqlError] if the row could not be inserted.
pub fn insert_lead(lead: &Lead, connection: &Connection) -> Result<(), Error> {
    connection.execute(
        &format!(
            "INSERT INTO lead ({LEAD_COLUMNS}) VALUES \
            (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)"
        ),
        rusqlite::params![
            lead.id.as_str(),
            lead.name,
            lead.email,
            lead.phone,
            lead.company,
            lead.title,
            lead.revenue_band,
            lead.employee_band,
            lead.region,
            lead.unit,
            lead.funnel_name,
            lead.utm_source,
            lead.utm_medium,
            lead.utm_campaign,
            lead.utm_content,
            lead.utm_term,
            lead.page_url,
            lead.consultant,
            lead.registered_at,
        ],
    )?;

    Ok(())
}

/// Load every lead in the database, in insertion order.
///
/// # Errors
/// Returns [Error::SqlError] if the query or row mapping fails. The caller
/// decides how to present the failure; no placeholder data is substituted.
pub fn get_all_leads(connection: &Connection) -> Result<Vec<Lead>, Error> {
    connection
        .prepare(&format!("SELECT {LEAD_COLUMNS} FROM lead ORDER BY row_id ASC"))?
        .query_map([], map_lead_row)?
        .map(|lead_result| lead_result.map_err(Error::from))
        .collect()
}

/// Get the total number of leads in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn count_leads(connection: &Connection) -> Result<i64, Error> {
    connection
        .query_row("SELECT COUNT(row_id) FROM lead;", [], |row| row.get(0))
        .map_err(|error| error.into())
}

/// Map a database row selected with `LEAD_COLUMNS` to a [Lead].
fn map_lead_row(row: &Row) -> Result<Lead, rusqlite::Error> {
    Ok(Lead {
        id: LeadId(row.get(0)?),
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        company: row.get(4)?,
        title: row.get(5)?,
        revenue_band: row.get(6)?,
        employee_band: row.get(7)?,
        region: row.get(8)?,
        unit: row.get(9)?,
        funnel_name: row.get(10)?,
        utm_source: row.get(11)?,
        utm_medium: row.get(12)?,
        utm_campaign: row.get(13)?,
        utm_content: row.get(14)?,
        utm_term: row.get(15)?,
        page_url: row.get(16)?,
        consultant: row.get(17)?,
        registered_at: row.get(18)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod timestamp_tests {
    use time::{UtcOffset, macros::datetime};

    use crate::lead::{Lead, format_timestamp, parse_timestamp};

    #[test]
    fn parses_rfc3339() {
        let got = parse_timestamp("2025-07-15T06:01:00-03:00");

        assert_eq!(got, Some(datetime!(2025-07-15 06:01:00 -3)));
    }

    #[test]
    fn parses_fractional_seconds() {
        let got = parse_timestamp("2025-07-15T06:01:00.250Z");

        assert_eq!(got, Some(datetime!(2025-07-15 06:01:00.250 UTC)));
    }

    #[test]
    fn parses_postgres_text_form() {
        assert_eq!(
            parse_timestamp("2025-07-15 06:01:00+00"),
            Some(datetime!(2025-07-15 06:01:00 UTC))
        );
        assert_eq!(
            parse_timestamp("2025-07-15 06:01:00-03:00"),
            Some(datetime!(2025-07-15 06:01:00 -3))
        );
    }

    #[test]
    fn rejects_malformed_values() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("   "), None);
        assert_eq!(parse_timestamp("15-07-2025 06:01"), None);
        assert_eq!(parse_timestamp("not a date"), None);
    }

    #[test]
    fn registered_instant_is_none_when_missing() {
        assert_eq!(Lead::new("1").registered_instant(), None);
    }

    #[test]
    fn formats_in_local_offset() {
        let offset = UtcOffset::from_hms(-3, 0, 0).unwrap();

        let got = format_timestamp(datetime!(2025-07-15 02:30:00 UTC), offset);

        assert_eq!(got, "14/07/2025 23:30");
    }
}
