/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `projects`: Project CRUD under `/api/projects`
/// - `tasks`: Task CRUD under `/api/tasks`
/// - `users`: User CRUD under `/api/users`
/// - `response`: The `{success, message, data}` envelope
///
/// Alongside the handlers live the extractors they share: body, query and
/// path extractors that reject with [`ApiError`], and the per-request
/// [`RequestCancellation`] token.

pub mod health;
pub mod projects;
pub mod response;
pub mod tasks;
pub mod users;

use crate::error::ApiError;
use async_trait::async_trait;
use axum::{
    extract::{FromRequest, FromRequestParts},
    http::request::Parts,
};
use serde::{Deserialize, Deserializer};
use std::{convert::Infallible, fmt::Display, str::FromStr};
use tokio_util::sync::{CancellationToken, DropGuard};

/// JSON body extractor that rejects with the API error body
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor that rejects with the API error body
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Path extractor that rejects with the API error body
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// Parses an optional query value, treating a blank value as absent
///
/// Use with `#[serde(default, deserialize_with = "blank_as_none")]`.
pub(crate) fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Cancellation token scoped to one request
///
/// The token is cancelled when this value is dropped. Axum drops the
/// handler future, and with it every extractor, when the client
/// disconnects, so persistence work still in flight stops.
#[derive(Debug)]
pub struct RequestCancellation {
    token: CancellationToken,
    _guard: DropGuard,
}

impl RequestCancellation {
    /// Creates a fresh, uncancelled token
    pub fn new() -> Self {
        let token = CancellationToken::new();
        let guard = token.clone().drop_guard();
        Self { token, _guard: guard }
    }

    /// Token to pass to handlers
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Default for RequestCancellation {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestCancellation
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(_parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::new())
    }
}
