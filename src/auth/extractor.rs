// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for the forwarded caller identity.
//!
//! Extraction never rejects: JSON-RPC reports a missing identity as an
//! error object in a normal response, so the check happens in the handler:
//!
//! ```rust,ignore
//! async fn handler(caller: Caller) -> Result<Value, VaultError> {
//!     let user_id = caller.require_user()?;
//! }
//! ```

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::VaultError;

pub const AUTH_USER_HEADER: &str = "x-auth-user";
pub const SCOPE_HEADER: &str = "x-scope";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Option<String>,
    pub scope: Option<String>,
}

impl Caller {
    /// The caller's user id, or an auth error when none was forwarded.
    pub fn require_user(&self) -> Result<&str, VaultError> {
        self.user_id
            .as_deref()
            .ok_or_else(|| VaultError::auth("No userid is passed in"))
    }

    pub fn require_scope(&self, scope: &str) -> Result<(), VaultError> {
        match self.scope.as_deref() {
            Some(s) if s == scope => Ok(()),
            _ => Err(VaultError::auth(format!("scope {scope} required"))),
        }
    }
}

fn header_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Caller {
            user_id: header_value(parts, AUTH_USER_HEADER),
            scope: header_value(parts, SCOPE_HEADER),
        })
    }
}
