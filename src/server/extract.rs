//! Axum extractors that reject with the crate's error body

use crate::core::auth::{BearerToken, Session};
use crate::core::error::DyehouseError;
use crate::server::router::AppState;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

/// The caller's session, resolved from `Authorization: Bearer <token>`
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = DyehouseError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(BearerToken::from_header)
            .ok_or_else(|| DyehouseError::not_authenticated("missing bearer token"))?;

        state.store.session(&token).map(CurrentSession)
    }
}

/// JSON body; a malformed body is a `BAD_REQUEST`
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = DyehouseError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        axum::Json::<T>::from_request(req, state)
            .await
            .map(|axum::Json(value)| ApiJson(value))
            .map_err(|rejection| DyehouseError::BadRequest {
                message: rejection.body_text(),
            })
    }
}

/// Query string; a malformed query is a `BAD_REQUEST`
#[derive(Debug, Clone)]
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = DyehouseError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        axum::extract::Query::<T>::from_request_parts(parts, state)
            .await
            .map(|axum::extract::Query(value)| ApiQuery(value))
            .map_err(|rejection| DyehouseError::BadRequest {
                message: rejection.body_text(),
            })
    }
}
