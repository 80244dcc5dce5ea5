use async_trait::async_trait;
use serde::de::DeserializeOwned;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, warn};
use uuid::Uuid;

use dekho_common::{
    Ad, DekhoError, Filter, Lead, ListingQuery, NewLead, PageSeo, PageSource, Row,
};

use crate::Store;

fn db_err(e: sqlx::Error) -> DekhoError {
    DekhoError::Database(e.to_string())
}

/// Escape `%`, `_` and `\` so user text matches literally inside ILIKE.
fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Decode `to_jsonb` rows, skipping any that no longer match the type.
fn decode_rows<T: DeserializeOwned>(table: &str, rows: Vec<(serde_json::Value,)>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|(value,)| match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(table, error = %e, "Skipping malformed row");
                None
            }
        })
        .collect()
}

/// Build the SELECT for one listing window. The query must already be
/// validated: column names are pushed as identifiers.
pub(crate) fn build_page_query<'a>(
    query: &'a ListingQuery,
    offset: i64,
) -> QueryBuilder<'a, Postgres> {
    let spec = query.collection.spec();
    let order = query.effective_order();

    let mut qb = QueryBuilder::new("SELECT to_jsonb(t) FROM ");
    qb.push(spec.table);
    qb.push(" t WHERE t.is_active = true");

    for filter in query.active_filters() {
        match filter {
            Filter::Eq { column, value } => {
                qb.push(format!(" AND t.{column}::text = "));
                qb.push_bind(value.trim().to_string());
            }
            Filter::In { column, values } => {
                let values: Vec<String> = values
                    .iter()
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .collect();
                qb.push(format!(" AND t.{column}::text = ANY("));
                qb.push_bind(values);
                qb.push(")");
            }
        }
    }

    if let Some(text) = query.search_text() {
        if !spec.searchable.is_empty() {
            let pattern = format!("%{}%", escape_like(text));
            qb.push(" AND (");
            let mut any = qb.separated(" OR ");
            for column in spec.searchable {
                any.push(format!("t.{column} ILIKE "));
                any.push_bind_unseparated(pattern.clone());
            }
            qb.push(")");
        }
    }

    let direction = if order.descending { "DESC" } else { "ASC" };
    qb.push(format!(
        " ORDER BY t.{} {direction} NULLS LAST, t.id ASC",
        order.field
    ));
    qb.push(" LIMIT ");
    qb.push_bind(i64::from(query.page_size));
    qb.push(" OFFSET ");
    qb.push_bind(offset);

    qb
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl PageSource for PgStore {
    async fn fetch_page(&self, query: &ListingQuery, offset: u64) -> Result<Vec<Row>, DekhoError> {
        query.validate()?;

        let sql_offset = i64::try_from(offset)
            .map_err(|_| DekhoError::validation(format!("offset {offset} is out of range")))?;
        let mut qb = build_page_query(query, sql_offset);
        let rows: Vec<(serde_json::Value,)> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        debug!(
            collection = %query.collection,
            offset,
            rows = rows.len(),
            "Fetched listing page"
        );

        Ok(rows.into_iter().map(|(row,)| row).collect())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn active_ads(&self) -> Result<Vec<Ad>, DekhoError> {
        let rows = sqlx::query_as::<_, (serde_json::Value,)>(
            r#"
            SELECT to_jsonb(a)
            FROM ads a
            WHERE a.is_active = true
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(decode_rows("ads", rows))
    }

    async fn page_seo(&self, base_path: &str) -> Result<Option<PageSeo>, DekhoError> {
        let rows = sqlx::query_as::<_, (serde_json::Value,)>(
            r#"
            SELECT to_jsonb(p)
            FROM page_seo p
            WHERE p.page_path = $1 AND p.is_active = true
            LIMIT 1
            "#,
        )
        .bind(base_path)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(decode_rows("page_seo", rows).into_iter().next())
    }

    async fn insert_lead(&self, lead: &NewLead) -> Result<Uuid, DekhoError> {
        let (id,) = sqlx::query_as::<_, (Uuid,)>(
            r#"
            INSERT INTO leads (
                name, email, phone, current_situation, city, state, initial_query,
                source, interested_college_slug, interested_course_slug, interested_exam_slug
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id
            "#,
        )
        .bind(&lead.name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(&lead.current_situation)
        .bind(&lead.city)
        .bind(&lead.state)
        .bind(&lead.initial_query)
        .bind(&lead.source)
        .bind(&lead.interested_college_slug)
        .bind(&lead.interested_course_slug)
        .bind(&lead.interested_exam_slug)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(id)
    }

    async fn recent_leads(&self, limit: u32) -> Result<Vec<Lead>, DekhoError> {
        let rows = sqlx::query_as::<_, (serde_json::Value,)>(
            r#"
            SELECT to_jsonb(l)
            FROM leads l
            ORDER BY l.created_at DESC
            LIMIT $1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(decode_rows("leads", rows))
    }
}
