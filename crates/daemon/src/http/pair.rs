//! `POST /v1/pair` — the only unauthenticated mutating route (spec §4.3).
//! Public; gated solely by the admission filter's tighter pairing-route
//! rate limit.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Json};
use serde::{Deserialize, Serialize};

use gd_domain::error::Result;

use crate::http::common::origin_header;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(tag = "step", rename_all = "lowercase")]
enum PairRequest {
    Start,
    Confirm { code: String },
}

#[derive(Serialize)]
struct StartResponse {
    code: String,
    #[serde(rename = "expiresAt")]
    expires_at: chrono::DateTime<chrono::Utc>,
    instructions: &'static str,
}

#[derive(Serialize)]
struct ConfirmResponse {
    #[serde(rename = "accessToken")]
    access_token: String,
    #[serde(rename = "tokenType")]
    token_type: &'static str,
    #[serde(rename = "expiresAt")]
    expires_at: chrono::DateTime<chrono::Utc>,
}

pub async fn pair(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<PairRequest>,
) -> Result<impl IntoResponse> {
    let origin = origin_header(&headers)?;

    let value = match body {
        PairRequest::Start => {
            let started = state.pairing.start(&origin);
            serde_json::to_value(StartResponse {
                code: started.code,
                expires_at: started.expires_at,
                instructions: started.instructions,
            })
        }
        PairRequest::Confirm { code } => {
            let ttl_days = state.config.read().pairing.token_ttl_days;
            let confirmed = state.pairing.confirm(&origin, &code, &state.tokens, ttl_days)?;
            serde_json::to_value(ConfirmResponse {
                access_token: confirmed.access_token,
                token_type: confirmed.token_type,
                expires_at: confirmed.expires_at,
            })
        }
    };
    Ok(Json(value.expect("response struct always serializes")))
}
