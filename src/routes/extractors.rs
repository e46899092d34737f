// ============================================================================
// Axum Extractors
// ============================================================================
//
// - ClientIp: caller address from proxy headers or the socket peer
// - FormJson: JSON body whose rejections render as `{"detail": ...}` 400s
//
// ============================================================================

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequest, FromRequestParts, Json, Request, rejection::JsonRejection},
    http::request::Parts,
};
use intake_error::AppError;
use serde::de::DeserializeOwned;
use std::convert::Infallible;
use std::net::SocketAddr;

use crate::utils::extract_client_ip;

/// Caller IP as used for rate limiting and address tracking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        Ok(ClientIp(extract_client_ip(&parts.headers, peer)))
    }
}

/// `Json<T>` with the rejection mapped to a validation error
#[derive(Debug)]
pub struct FormJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for FormJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(FormJson(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            AppError::validation("Expected request with `Content-Type: application/json`")
        }
        other => AppError::validation(other.body_text()),
    }
}
