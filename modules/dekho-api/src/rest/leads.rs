use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use dekho_common::LeadSubmission;

use crate::auth::{AdminSession, ClientIp, Session};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub const RATE_LIMIT_PER_HOUR: usize = 10;
/// Limiter size above which idle addresses are swept before recording.
pub const LIMITER_PRUNE_THRESHOLD: usize = 1000;
const RATE_WINDOW: Duration = Duration::from_secs(3600);
const DEFAULT_ADMIN_LIMIT: u32 = 50;
const MAX_ADMIN_LIMIT: u32 = 200;

/// Check rate limit for an IP. Returns true if the request is allowed.
/// Prunes expired entries and records the new request if allowed.
pub fn check_rate_limit(entries: &mut Vec<Instant>, now: Instant, max_per_hour: usize) -> bool {
    let cutoff = now.checked_sub(RATE_WINDOW);
    entries.retain(|t| cutoff.is_none_or(|cutoff| *t > cutoff));
    if entries.len() >= max_per_hour {
        return false;
    }
    entries.push(now);
    true
}

/// Drop addresses with no submissions inside the window.
pub fn prune_empty_entries(limiter: &mut HashMap<IpAddr, Vec<Instant>>, now: Instant) {
    let cutoff = now.checked_sub(RATE_WINDOW);
    limiter.retain(|_, entries| {
        entries.retain(|t| cutoff.is_none_or(|cutoff| *t > cutoff));
        !entries.is_empty()
    });
}

/// `POST /functions/v1/save-lead`
///
/// Responds `{"success": true, "id": ...}`. Validation problems are a 400,
/// a failed insert is a 500. Lead contents are never logged.
pub async fn api_save_lead(
    State(state): State<Arc<AppState>>,
    _session: Session,
    ClientIp(ip): ClientIp,
    body: Result<Json<LeadSubmission>, JsonRejection>,
) -> Response {
    let Json(submission) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return ApiError::BadRequest(rejection.body_text()).into_response();
        }
    };

    let lead = match submission.validate() {
        Ok(lead) => lead,
        Err(e) => return ApiError::from(e).into_response(),
    };

    if let Some(ip) = ip {
        let now = Instant::now();
        let mut limiter = state.lead_limiter.lock().await;
        if limiter.len() > LIMITER_PRUNE_THRESHOLD {
            prune_empty_entries(&mut limiter, now);
        }
        let entries = limiter.entry(ip).or_default();
        if !check_rate_limit(entries, now, RATE_LIMIT_PER_HOUR) {
            warn!(%ip, "Lead rate limit exceeded");
            return ApiError::TooManyRequests(
                "Too many submissions, please try again later.".to_string(),
            )
            .into_response();
        }
    }

    match state.store.insert_lead(&lead).await {
        Ok(id) => {
            info!(%id, source = %lead.source, "Lead saved");
            (StatusCode::OK, Json(json!({ "success": true, "id": id }))).into_response()
        }
        Err(e) => {
            warn!(error = %e, "Failed to save lead");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to save lead" })),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecentLeadsParams {
    limit: Option<u32>,
}

/// `GET /api/admin/leads?limit=`
pub async fn api_recent_leads(
    State(state): State<Arc<AppState>>,
    _admin: AdminSession,
    Query(params): Query<RecentLeadsParams>,
) -> ApiResult<Json<serde_json::Value>> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_ADMIN_LIMIT)
        .clamp(1, MAX_ADMIN_LIMIT);
    let leads = state.store.recent_leads(limit).await?;
    Ok(Json(json!({ "leads": leads })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_allows_up_to_max() {
        let mut entries = Vec::new();
        let now = Instant::now();
        for _ in 0..RATE_LIMIT_PER_HOUR {
            assert!(check_rate_limit(&mut entries, now, RATE_LIMIT_PER_HOUR));
        }
        assert!(!check_rate_limit(&mut entries, now, RATE_LIMIT_PER_HOUR));
    }

    #[test]
    fn rate_limit_forgets_old_entries() {
        let now = Instant::now();
        let Some(old) = now.checked_sub(Duration::from_secs(3601)) else {
            return;
        };
        let mut entries = vec![old; RATE_LIMIT_PER_HOUR];
        assert!(check_rate_limit(&mut entries, now, RATE_LIMIT_PER_HOUR));
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn prune_drops_idle_addresses_and_keeps_active_ones() {
        let now = Instant::now();
        let Some(old) = now.checked_sub(Duration::from_secs(3601)) else {
            return;
        };
        let mut limiter: HashMap<IpAddr, Vec<Instant>> = (0..2000u32)
            .map(|i| (IpAddr::from(i.to_be_bytes()), vec![old]))
            .collect();
        let active: IpAddr = "203.0.113.7".parse().unwrap();
        limiter.insert(active, vec![old, now]);

        prune_empty_entries(&mut limiter, now);

        assert_eq!(limiter.len(), 1);
        assert_eq!(limiter[&active], vec![now]);
    }
}
