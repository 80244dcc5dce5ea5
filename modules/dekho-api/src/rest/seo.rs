use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use dekho_common::{seo, DocumentHead, SeoOverrides};

use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SeoParams {
    path: Option<String>,
    title: Option<String>,
    description: Option<String>,
    keywords: Option<String>,
}

/// `GET /api/seo?path=&title=&description=&keywords=`
///
/// Merges the page's own values with the stored record for the route's base
/// path and renders the resulting head tags. A failed record lookup is
/// treated as "no record".
pub async fn api_seo(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SeoParams>,
) -> Json<Value> {
    let base_path = seo::base_path(params.path.as_deref().unwrap_or("/"));

    let store = state.store.clone();
    let key = base_path.clone();
    let record = state
        .seo
        .get_or_try_insert_with(base_path.clone(), || async move { store.page_seo(&key).await })
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, base_path = %base_path, "SEO lookup failed");
            None
        });

    let overrides = SeoOverrides {
        title: params.title,
        description: params.description,
        keywords: params.keywords,
    };
    let resolved = seo::resolve(&overrides, record.as_ref());

    let mut head = DocumentHead::new(state.config.default_title.clone());
    head.apply(&resolved, &state.config.site_brand);

    Json(json!({
        "base_path": base_path,
        "resolved": resolved,
        "head": head.render(),
    }))
}
