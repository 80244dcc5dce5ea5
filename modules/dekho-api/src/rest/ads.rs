use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use dekho_common::{ads, AdContext, AdVariant};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Slot parameters as they arrive on the query string. Everything is taken
/// as text so blank and mixed-case values are handled here, not by serde.
#[derive(Debug, Default, Deserialize)]
pub struct AdParams {
    page: Option<String>,
    #[serde(alias = "item_slug")]
    item: Option<String>,
    city: Option<String>,
    variant: Option<String>,
    position: Option<String>,
}

impl AdParams {
    pub fn into_context(self) -> ApiResult<AdContext> {
        let variant = match self.variant.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<AdVariant>()
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?,
            ),
        };

        Ok(AdContext {
            page: self.page,
            item_slug: self.item,
            city: self.city,
            variant,
            position: self.position,
        })
    }
}

/// `GET /api/ads/resolve?page=&item=&city=&variant=&position=`
///
/// Returns `{"ad": <ad>}` or `{"ad": null}` when nothing targets the slot.
pub async fn api_resolve_ad(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AdParams>,
) -> ApiResult<Json<Value>> {
    let ctx = params.into_context()?;

    let store = state.store.clone();
    let snapshot = state
        .ads
        .get(|| async move { store.active_ads().await })
        .await?;

    let ad = ads::resolve(&snapshot.value, &ctx);
    Ok(Json(json!({ "ad": ad })))
}
