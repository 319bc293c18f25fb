// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Caller Identity
//!
//! The gateway sits behind an authenticating proxy that forwards the
//! resolved user in `X-Auth-User` and, for internal callers, a scope in
//! `X-Scope`. Nothing here verifies credentials; it only reads what the
//! proxy asserted.

pub mod extractor;

pub use extractor::{Caller, AUTH_USER_HEADER, SCOPE_HEADER};
