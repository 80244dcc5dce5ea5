use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use dekho_common::{
    Ad, Collection, DekhoError, Lead, ListingQuery, NewLead, PageSeo, PageSource, Row,
};

use crate::Store;

#[derive(Default)]
struct Tables {
    ads: Vec<Ad>,
    rows: HashMap<Collection, Vec<Row>>,
    page_seo: HashMap<String, PageSeo>,
    leads: Vec<Lead>,
}

/// In-process store with the same query semantics as [`crate::PgStore`].
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with a database error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, AtomicOrdering::SeqCst);
    }

    fn check(&self) -> Result<(), DekhoError> {
        if self.failing.load(AtomicOrdering::SeqCst) {
            return Err(DekhoError::Database("memory store is failing".to_string()));
        }
        Ok(())
    }

    pub async fn put_ad(&self, ad: Ad) {
        self.tables.write().await.ads.push(ad);
    }

    pub async fn put_rows(&self, collection: Collection, rows: impl IntoIterator<Item = Row>) {
        self.tables
            .write()
            .await
            .rows
            .entry(collection)
            .or_default()
            .extend(rows);
    }

    pub async fn put_page_seo(&self, record: PageSeo) {
        self.tables
            .write()
            .await
            .page_seo
            .insert(record.page_path.clone(), record);
    }

    pub async fn leads(&self) -> Vec<Lead> {
        self.tables.read().await.leads.clone()
    }
}

/// Text form of a cell for equality and substring checks.
fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn is_active(row: &Row) -> bool {
    row.get("is_active").and_then(Value::as_bool).unwrap_or(true)
}

/// Order two cells the way Postgres would for `NULLS LAST`.
fn compare_cells(a: Option<&Value>, b: Option<&Value>, descending: bool) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());

    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let ord = match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                _ => cell_text(a).cmp(&cell_text(b)),
            };
            if descending {
                ord.reverse()
            } else {
                ord
            }
        }
    }
}

fn matches(query: &ListingQuery, row: &Row) -> bool {
    if !is_active(row) {
        return false;
    }

    let filters_ok = query.active_filters().all(|filter| {
        row.get(filter.column())
            .and_then(cell_text)
            .is_some_and(|cell| filter.accepts(&cell))
    });
    if !filters_ok {
        return false;
    }

    let searchable = query.collection.spec().searchable;
    match query.search_text() {
        Some(text) if !searchable.is_empty() => {
            let needle = text.to_lowercase();
            searchable.iter().any(|column| {
                row.get(*column)
                    .and_then(cell_text)
                    .is_some_and(|cell| cell.to_lowercase().contains(&needle))
            })
        }
        _ => true,
    }
}

#[async_trait]
impl PageSource for MemoryStore {
    async fn fetch_page(&self, query: &ListingQuery, offset: u64) -> Result<Vec<Row>, DekhoError> {
        self.check()?;
        query.validate()?;

        let tables = self.tables.read().await;
        let order = query.effective_order();

        let mut rows: Vec<&Row> = tables
            .rows
            .get(&query.collection)
            .map(|rows| rows.iter().filter(|row| matches(query, row)).collect())
            .unwrap_or_default();

        rows.sort_by(|a, b| {
            compare_cells(a.get(&order.field), b.get(&order.field), order.descending)
                .then_with(|| cell_text(&a["id"]).cmp(&cell_text(&b["id"])))
        });

        Ok(rows
            .into_iter()
            .skip(offset as usize)
            .take(query.page_size as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn active_ads(&self) -> Result<Vec<Ad>, DekhoError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables.ads.iter().filter(|ad| ad.is_active).cloned().collect())
    }

    async fn page_seo(&self, base_path: &str) -> Result<Option<PageSeo>, DekhoError> {
        self.check()?;
        Ok(self.tables.read().await.page_seo.get(base_path).cloned())
    }

    async fn insert_lead(&self, lead: &NewLead) -> Result<Uuid, DekhoError> {
        self.check()?;
        let id = Uuid::new_v4();
        self.tables
            .write()
            .await
            .leads
            .push(Lead::from_new(id, lead.clone(), Utc::now()));
        Ok(id)
    }

    async fn recent_leads(&self, limit: u32) -> Result<Vec<Lead>, DekhoError> {
        self.check()?;
        let tables = self.tables.read().await;
        let mut leads = tables.leads.clone();
        leads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        leads.truncate(limit as usize);
        Ok(leads)
    }
}
