use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde_json::{json, Value};
use tracing::debug;

use dekho_common::listing::DEFAULT_PAGE_SIZE;
use dekho_common::{Collection, Filter, ListingQuery, Ordering};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

const RESERVED: [&str; 5] = ["offset", "limit", "search", "order", "direction"];

fn parse_number<T: std::str::FromStr>(
    params: &BTreeMap<String, String>,
    key: &str,
    default: T,
) -> ApiResult<T> {
    match params.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| ApiError::BadRequest(format!("{key} must be a non-negative integer"))),
    }
}

/// Offsets are bound as a Postgres BIGINT, so they must fit in `i64`.
fn parse_offset(params: &BTreeMap<String, String>) -> ApiResult<u64> {
    let offset: i64 = parse_number(params, "offset", 0)?;
    u64::try_from(offset)
        .map_err(|_| ApiError::BadRequest("offset must be a non-negative integer".to_string()))
}

/// Build the query for one page from the raw query string.
///
/// Every key that is not a paging or ordering control is treated as a
/// column filter; comma-separated values become an inclusion filter.
pub fn listing_query(
    collection: Collection,
    params: &BTreeMap<String, String>,
) -> ApiResult<ListingQuery> {
    let limit = parse_number(params, "limit", DEFAULT_PAGE_SIZE)?;

    let order = params
        .get("order")
        .map(|field| field.trim())
        .filter(|field| !field.is_empty())
        .map(|field| Ordering {
            field: field.to_string(),
            descending: params
                .get("direction")
                .is_some_and(|d| d.eq_ignore_ascii_case("desc")),
        });

    let filters = params
        .iter()
        .filter(|(key, _)| !RESERVED.contains(&key.as_str()))
        .map(|(column, raw)| Filter::from_param(column, raw))
        .collect();

    let query = ListingQuery::builder()
        .collection(collection)
        .page_size(limit)
        .order(order)
        .filters(filters)
        .search(params.get("search").cloned())
        .build();

    query.validate()?;
    Ok(query)
}

/// `GET /api/listings/{collection}`
///
/// Responds with `{items, offset, next_offset, has_more}`. A page shorter
/// than the page size means the listing is exhausted.
pub async fn api_listings(
    State(state): State<Arc<AppState>>,
    Path(collection): Path<String>,
    Query(params): Query<BTreeMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let collection: Collection = collection.parse()?;
    let offset = parse_offset(&params)?;
    let query = listing_query(collection, &params)?;

    let items = state.store.fetch_page(&query, offset).await?;
    let has_more = items.len() == query.page_size as usize;
    debug!(%collection, offset, count = items.len(), "Listing page served");

    Ok(Json(json!({
        "items": items,
        "offset": offset,
        "next_offset": has_more.then(|| offset + u64::from(query.page_size)),
        "has_more": has_more,
    })))
}
