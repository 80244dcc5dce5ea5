use std::collections::HashMap;

use axum::{
    extract::{Path, Query},
    response::Json,
};
use serde_json::{json, Value};

use dekho_common::calculators;

use crate::error::{ApiError, ApiResult};

fn number<T: std::str::FromStr>(params: &HashMap<String, String>, key: &str) -> ApiResult<T> {
    params
        .get(key)
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| ApiError::BadRequest(format!("{key} is required and must be a number")))
}

/// `GET /api/calculators/{kind}` where kind is `emi`, `sip`, `bmi` or `percentage`.
pub async fn api_calculate(
    Path(kind): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let result = match kind.as_str() {
        "emi" => json!(calculators::emi(
            number(&params, "principal")?,
            number(&params, "rate")?,
            number(&params, "months")?,
        )?),
        "sip" => json!(calculators::sip(
            number(&params, "monthly")?,
            number(&params, "rate")?,
            number(&params, "years")?,
        )?),
        "bmi" => json!(calculators::bmi(
            number(&params, "weight")?,
            number(&params, "height")?,
        )?),
        "percentage" => json!({
            "percentage": calculators::percentage(
                number(&params, "obtained")?,
                number(&params, "total")?,
            )?
        }),
        other => return Err(ApiError::NotFound(format!("Unknown calculator: {other}"))),
    };

    Ok(Json(result))
}
