// ABOUTME: Secure HTTP cookie helpers for session management
// ABOUTME: Session cookies are httpOnly and SameSite=Lax; Secure outside development
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stillwater Recovery

use axum::http::{header, HeaderMap, HeaderValue};

/// Name of the session cookie set on login
pub const SESSION_COOKIE: &str = "session_token";

/// Extract a cookie value from request headers
#[must_use]
pub fn get_cookie_value(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get(header::COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .find_map(|cookie| {
            let mut parts = cookie.trim().splitn(2, '=');
            let name = parts.next()?.trim();
            let value = parts.next()?.trim();

            if name == cookie_name {
                Some(value.to_owned())
            } else {
                None
            }
        })
}

/// Build a Set-Cookie header value for the session cookie
#[must_use]
pub fn session_cookie_header(token: &str, max_age_secs: i64, secure: bool) -> Option<HeaderValue> {
    let secure_flag = if secure { "; Secure" } else { "" };
    let cookie = format!(
        "{SESSION_COOKIE}={token}; Max-Age={max_age_secs}; Path=/; HttpOnly; SameSite=Lax{secure_flag}"
    );
    HeaderValue::from_str(&cookie).ok()
}
