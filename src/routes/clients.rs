// ============================================================================
// Admin Client Listing
// ============================================================================
//
// GET /api/clients?key=<base64("SECRET_KEY:unix_expiry")>&skip=0&limit=100
//
// The key is minted out of band by whoever holds SECRET_KEY and stops working
// once the embedded expiry passes.
//
// ============================================================================

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use base64::{
    Engine as _,
    engine::general_purpose::{STANDARD as BASE64, URL_SAFE},
};
use chrono::Utc;
use intake_error::{AppError, AppResult};
use serde::Deserialize;
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::context::AppContext;
use crate::models::ClientListing;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1000;
const INVALID_KEY: &str = "Invalid secret key";

#[derive(Debug, Deserialize)]
pub struct ListClientsQuery {
    pub key: Option<String>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /api/clients
pub async fn list_clients(
    State(ctx): State<Arc<AppContext>>,
    query: Result<Query<ListClientsQuery>, QueryRejection>,
) -> AppResult<Json<Vec<ClientListing>>> {
    let Query(query) = query.map_err(|rejection| AppError::validation(rejection.body_text()))?;

    let key = query.key.as_deref().unwrap_or_default();
    let now = Utc::now().timestamp() as f64;
    verify_admin_key(key, &ctx.config.secret_key, now)?;

    let skip = query.skip.unwrap_or(0).max(0);
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let clients = ctx.store.list_clients(skip, limit).await?;
    tracing::info!(skip = skip, limit = limit, returned = clients.len(), "Admin client listing");

    Ok(Json(clients))
}

/// Accepts `base64("<secret>:<unix seconds>")` while the timestamp is not in
/// the past.
pub fn verify_admin_key(key: &str, secret: &str, now: f64) -> AppResult<()> {
    let invalid = || AppError::validation(INVALID_KEY);

    // An unescaped `+` arrives as a space after query decoding
    let key = key.replace(' ', "+");
    let key = key.trim();
    let decoded = BASE64
        .decode(key)
        .or_else(|_| URL_SAFE.decode(key))
        .map_err(|_| invalid())?;
    let decoded = String::from_utf8(decoded).map_err(|_| invalid())?;
    let (given_secret, expires_at) = decoded.rsplit_once(':').ok_or_else(invalid)?;

    if given_secret.is_empty() || secret.is_empty() {
        return Err(invalid());
    }

    let expires_at: f64 = expires_at.trim().parse().map_err(|_| invalid())?;

    let secret_matches: bool = given_secret.as_bytes().ct_eq(secret.as_bytes()).into();
    if !secret_matches || !expires_at.is_finite() || expires_at < now {
        return Err(invalid());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: f64 = 1_700_000_000.0;

    fn key(raw: &str) -> String {
        BASE64.encode(raw)
    }

    #[test]
    fn test_valid_key() {
        assert!(verify_admin_key(&key("s3cret:1700000600"), "s3cret", NOW).is_ok());
        // Expiry equal to now is still accepted
        assert!(verify_admin_key(&key("s3cret:1700000000"), "s3cret", NOW).is_ok());
        // Secrets may contain colons
        assert!(verify_admin_key(&key("a:b:c:1700000600"), "a:b:c", NOW).is_ok());
        // `+` mangled into a space by query decoding
        let mangled = key("s3cret>>>:1700000600").replace('+', " ");
        assert!(verify_admin_key(&mangled, "s3cret>>>", NOW).is_ok());
        assert!(verify_admin_key(&URL_SAFE.encode("s3cret>>>:1700000600"), "s3cret>>>", NOW).is_ok());
    }

    #[test]
    fn test_rejected_keys() {
        let cases = [
            key("wrong:1700000600"),
            key("s3cret:1699999999"),
            key("s3cret"),
            key(":1700000600"),
            key("s3cret:soon"),
            key("s3cret:inf"),
            "%%%not-base64%%%".to_string(),
            String::new(),
        ];
        for case in cases {
            let err = verify_admin_key(&case, "s3cret", NOW).unwrap_err();
            assert_eq!(err.detail(), "Invalid secret key", "case {:?}", case);
        }
    }
}
