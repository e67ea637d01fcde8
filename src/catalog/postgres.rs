//! Institutional-repository relational adapter.
//!
//! Reads pre-aggregated item rows from a Postgres store and synthesizes a
//! kernel-4 native XML payload per record, since the relational store does
//! not keep one. Pagination is a plain integer offset into a stable
//! `(updated, identifier)` ordering, stringified so the protocol layer can
//! treat it as an opaque cursor like any other.
//!
//! The protocol engine is synchronous; the adapter owns a small
//! current-thread runtime and blocks on each query.

use chrono::NaiveDateTime;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tokio::runtime::Runtime;

use super::{CatalogAdapter, ListFilter, RecordPage, SetEntry, SetPage};
use crate::config::Config;
use crate::error::{ProviderError, Result};
use crate::types::{DateEntry, NormalizedRecord, RightsEntry};
use crate::xml::XmlElement;

const KERNEL_NAMESPACE: &str = "http://datacite.org/schema/kernel-4";
const KERNEL_SCHEMA: &str = "http://schema.datacite.org/meta/kernel-4/metadata.xsd";

const ITEM_COLUMNS: &str = "identifier, title, creators, subjects, description, publisher, \
     publication_year, client_symbol, rights, rights_uris, geo_places, \
     created_at, updated_at, deleted";

/// Adapter over the institutional-repository Postgres store.
pub struct PostgresAdapter {
    pool: PgPool,
    runtime: Runtime,
}

impl PostgresAdapter {
    /// Connect to the configured database.
    pub fn new(config: &Config) -> Result<Self> {
        if config.database_url.is_empty() {
            return Err(ProviderError::Config(
                "DATABASE_URL is required for the postgres backend".to_string(),
            ));
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let pool = runtime.block_on(
            PgPoolOptions::new()
                .max_connections(5)
                .connect(&config.database_url),
        )?;

        Ok(Self { pool, runtime })
    }
}

/// Parse an offset cursor. A cursor this adapter did not mint is a client
/// error surfaced upstream as badResumptionToken via the empty page path.
fn parse_offset(cursor: Option<&str>) -> i64 {
    match cursor {
        None => 0,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(cursor = raw, "Non-numeric offset cursor, restarting from 0");
            0
        }),
    }
}

/// Map one aggregated item row into a normalized record.
fn row_to_record(row: &PgRow) -> std::result::Result<NormalizedRecord, sqlx::Error> {
    let identifier: String = row.try_get("identifier")?;
    let client: String = row.try_get("client_symbol")?;

    let mut record = NormalizedRecord::new(identifier, client);
    record.created_datetime = row.try_get::<NaiveDateTime, _>("created_at")?;
    record.updated_datetime = row.try_get::<NaiveDateTime, _>("updated_at")?;

    let title: Option<String> = row.try_get("title")?;
    record.titles = title.into_iter().collect();
    record.creators = row
        .try_get::<Option<Vec<String>>, _>("creators")?
        .unwrap_or_default();
    record.subjects = row
        .try_get::<Option<Vec<String>>, _>("subjects")?
        .unwrap_or_default();
    let description: Option<String> = row.try_get("description")?;
    record.descriptions = description.into_iter().collect();
    record.publisher = row.try_get("publisher")?;
    record.publication_year = row
        .try_get::<Option<i32>, _>("publication_year")?
        .map(|y| y.to_string());
    record.geo_locations = row
        .try_get::<Option<Vec<String>>, _>("geo_places")?
        .unwrap_or_default();

    let statements = row
        .try_get::<Option<Vec<String>>, _>("rights")?
        .unwrap_or_default();
    let uris = row
        .try_get::<Option<Vec<String>>, _>("rights_uris")?
        .unwrap_or_default();
    record.rights = statements
        .into_iter()
        .map(|s| RightsEntry {
            statement: Some(s),
            uri: None,
        })
        .chain(uris.into_iter().map(|u| RightsEntry {
            statement: None,
            uri: Some(u),
        }))
        .collect();

    record.dates = vec![DateEntry {
        date_type: "Updated".to_string(),
        date: record.updated_datetime.format("%Y-%m-%d").to_string(),
    }];

    let deleted: bool = row.try_get("deleted")?;
    record.active = !deleted;
    record.raw_xml = Some(synthesize_kernel_xml(&record));
    record.metadata_version = Some("4".to_string());

    Ok(record)
}

/// Build a kernel-4 resource document for a record that has no stored
/// native payload.
fn synthesize_kernel_xml(record: &NormalizedRecord) -> String {
    let mut resource = XmlElement::new("resource")
        .attr("xmlns", KERNEL_NAMESPACE)
        .attr("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance")
        .attr(
            "xsi:schemaLocation",
            format!("{KERNEL_NAMESPACE} {KERNEL_SCHEMA}"),
        )
        .child(
            XmlElement::new("identifier")
                .attr("identifierType", "DOI")
                .text(record.identifier.clone()),
        );

    if !record.creators.is_empty() {
        let mut creators = XmlElement::new("creators");
        for name in &record.creators {
            creators.push(
                XmlElement::new("creator")
                    .child(XmlElement::new("creatorName").text(name.clone())),
            );
        }
        resource.push(creators);
    }

    if !record.titles.is_empty() {
        let mut titles = XmlElement::new("titles");
        for title in &record.titles {
            titles.push(XmlElement::new("title").text(title.clone()));
        }
        resource.push(titles);
    }

    if let Some(publisher) = &record.publisher {
        resource.push(XmlElement::new("publisher").text(publisher.clone()));
    }
    if let Some(year) = &record.publication_year {
        resource.push(XmlElement::new("publicationYear").text(year.clone()));
    }

    if !record.subjects.is_empty() {
        let mut subjects = XmlElement::new("subjects");
        for subject in &record.subjects {
            subjects.push(XmlElement::new("subject").text(subject.clone()));
        }
        resource.push(subjects);
    }

    resource.push(
        XmlElement::new("resourceType")
            .attr("resourceTypeGeneral", "Dataset")
            .text("Dataset"),
    );

    if !record.descriptions.is_empty() {
        let mut descriptions = XmlElement::new("descriptions");
        for description in &record.descriptions {
            descriptions.push(
                XmlElement::new("description")
                    .attr("descriptionType", "Abstract")
                    .text(description.clone()),
            );
        }
        resource.push(descriptions);
    }

    if !record.rights.is_empty() {
        let mut rights_list = XmlElement::new("rightsList");
        for entry in &record.rights {
            let mut rights = XmlElement::new("rights");
            if let Some(uri) = &entry.uri {
                rights = rights.attr("rightsURI", uri.clone());
            }
            if let Some(statement) = &entry.statement {
                rights = rights.text(statement.clone());
            }
            rights_list.push(rights);
        }
        resource.push(rights_list);
    }

    if !record.geo_locations.is_empty() {
        let mut geo_locations = XmlElement::new("geoLocations");
        for place in &record.geo_locations {
            geo_locations.push(
                XmlElement::new("geoLocation")
                    .child(XmlElement::new("geoLocationPlace").text(place.clone())),
            );
        }
        resource.push(geo_locations);
    }

    resource.render()
}

/// Build the WHERE clause and bind values for a listing filter. Bind
/// placeholders start at $1 in the order the values are returned.
fn filter_conditions(filter: &ListFilter) -> (Vec<String>, Vec<String>) {
    let mut conditions = Vec::new();
    let mut binds = Vec::new();

    if let Some(client) = &filter.client_id {
        binds.push(client.clone());
        conditions.push(format!("lower(client_symbol) = ${}", binds.len()));
    } else if let Some(provider) = &filter.provider_id {
        binds.push(format!("{provider}.%"));
        conditions.push(format!("lower(client_symbol) LIKE ${}", binds.len()));
    }
    if !filter.query.is_empty() {
        binds.push(format!("%{}%", filter.query));
        let n = binds.len();
        conditions.push(format!("(title ILIKE ${n} OR description ILIKE ${n})"));
    }
    if let Some(from) = &filter.from {
        binds.push(from.clone());
        conditions.push(format!("updated_at >= ${}::timestamp", binds.len()));
    }
    if let Some(until) = &filter.until {
        binds.push(until.clone());
        conditions.push(format!("updated_at < ${}::timestamp", binds.len()));
    }

    (conditions, binds)
}

fn where_clause(conditions: &[String]) -> String {
    if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    }
}

impl CatalogAdapter for PostgresAdapter {
    fn fetch_by_id(&self, native_id: &str) -> Result<Option<NormalizedRecord>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE identifier = $1");
        let row = self.runtime.block_on(
            sqlx::query(&sql)
                .bind(native_id)
                .fetch_optional(&self.pool),
        )?;

        match row {
            Some(row) => Ok(Some(row_to_record(&row)?)),
            None => Ok(None),
        }
    }

    fn list_page(&self, filter: &ListFilter, cursor: Option<&str>) -> Result<RecordPage> {
        let offset = parse_offset(cursor);
        let (conditions, binds) = filter_conditions(filter);
        let where_sql = where_clause(&conditions);

        let count_sql = format!("SELECT COUNT(*) FROM items{where_sql}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        for bind in &binds {
            count_query = count_query.bind(bind);
        }
        let total = self.runtime.block_on(count_query.fetch_one(&self.pool))?;

        let list_sql = format!(
            "SELECT {ITEM_COLUMNS} FROM items{where_sql} \
             ORDER BY updated_at, identifier LIMIT ${} OFFSET ${}",
            binds.len() + 1,
            binds.len() + 2,
        );
        let mut list_query = sqlx::query(&list_sql);
        for bind in &binds {
            list_query = list_query.bind(bind);
        }
        list_query = list_query
            .bind(filter.page_size as i64)
            .bind(offset);
        let rows = self.runtime.block_on(list_query.fetch_all(&self.pool))?;

        let records = rows
            .iter()
            .map(row_to_record)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        // A full page means there may be more; the final short page (or an
        // exactly-exhausted full page, caught on the next call) ends the
        // sequence.
        let next_cursor = if records.len() == filter.page_size
            && (offset + records.len() as i64) < total
        {
            Some((offset + records.len() as i64).to_string())
        } else {
            None
        };

        Ok(RecordPage {
            records,
            total: Some(total as u64),
            next_cursor,
        })
    }

    fn list_sets(&self) -> Result<SetPage> {
        let rows = self.runtime.block_on(
            sqlx::query("SELECT symbol, name FROM clients ORDER BY symbol")
                .fetch_all(&self.pool),
        )?;

        let sets = rows
            .iter()
            .map(|row| {
                let id: String = row.try_get("symbol")?;
                let name: Option<String> = row.try_get("name")?;
                Ok(SetEntry {
                    name: name.unwrap_or_else(|| id.clone()),
                    id,
                })
            })
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()?;

        let total = sets.len() as u64;
        Ok(SetPage { sets, total })
    }
}
