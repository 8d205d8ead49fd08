//! Bearer token checks for routes marked `auth: true`.
//!
//! The gateway only verifies the header shape; the token itself is judged by
//! a pluggable [`TokenValidator`].

use axum::{
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::fmt;
use thiserror::Error;

use crate::http::response::ApiResponse;

/// Decides whether a bearer token is acceptable.
pub trait TokenValidator: Send + Sync + fmt::Debug {
    fn validate(&self, token: &str) -> bool;
}

/// Accepts any token longer than `min_len` characters.
#[derive(Debug, Clone)]
pub struct MinLengthValidator {
    min_len: usize,
}

impl MinLengthValidator {
    pub fn new(min_len: usize) -> Self {
        Self { min_len }
    }
}

impl Default for MinLengthValidator {
    fn default() -> Self {
        Self::new(10)
    }
}

impl TokenValidator for MinLengthValidator {
    fn validate(&self, token: &str) -> bool {
        token.chars().count() > self.min_len
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingHeader,

    #[error("Invalid authorization header format")]
    InvalidFormat,

    #[error("Empty token")]
    EmptyToken,

    #[error("Invalid or expired token")]
    Rejected,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = StatusCode::UNAUTHORIZED;
        (status, Json(ApiResponse::<()>::error(status, self.to_string()))).into_response()
    }
}

/// Check `Authorization: Bearer <token>` against `validator`.
pub fn authorize(headers: &HeaderMap, validator: &dyn TokenValidator) -> Result<(), AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidFormat)?;
    let token = value.strip_prefix("Bearer ").ok_or(AuthError::InvalidFormat)?.trim();
    if token.is_empty() {
        return Err(AuthError::EmptyToken);
    }
    if !validator.validate(token) {
        return Err(AuthError::Rejected);
    }
    Ok(())
}
