use axum::http::{
    header::{COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};
use serde::{Deserialize, Serialize};

use super::Subject;

pub const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";
pub const REFRESH_TOKEN_COOKIE: &str = "sb-refresh-token";

/// Refresh tokens outlive access tokens; the provider rotates them on use.
const REFRESH_TOKEN_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 30;

/// Session credentials carried by the caller's cookies
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionCookies {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl SessionCookies {
    /// Parse session cookies out of every `Cookie` header on the request
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut cookies = Self::default();

        for header in headers.get_all(COOKIE) {
            let Ok(raw) = header.to_str() else {
                continue;
            };
            for pair in raw.split(';') {
                let Some((name, value)) = pair.trim().split_once('=') else {
                    continue;
                };
                let value = value.trim().trim_matches('"');
                if value.is_empty() {
                    continue;
                }
                match name.trim() {
                    ACCESS_TOKEN_COOKIE => cookies.access_token = Some(value.to_string()),
                    REFRESH_TOKEN_COOKIE => cookies.refresh_token = Some(value.to_string()),
                    _ => {}
                }
            }
        }

        cookies
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// Token pair issued by the auth provider on login or refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    /// Unix timestamp at which the access token expires
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl SessionTokens {
    /// `Set-Cookie` values that persist this session in the browser
    pub fn set_cookie_headers(&self, secure: bool) -> Vec<HeaderValue> {
        [
            cookie(ACCESS_TOKEN_COOKIE, &self.access_token, self.expires_in, secure),
            cookie(
                REFRESH_TOKEN_COOKIE,
                &self.refresh_token,
                REFRESH_TOKEN_MAX_AGE_SECS,
                secure,
            ),
        ]
        .into_iter()
        .filter_map(|raw| match HeaderValue::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(error = %e, "Dropping session cookie with invalid characters");
                None
            }
        })
        .collect()
    }

    /// `Set-Cookie` values that expire both session cookies (logout)
    pub fn clear_cookie_headers(secure: bool) -> Vec<HeaderValue> {
        [ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE]
            .into_iter()
            .filter_map(|name| HeaderValue::from_str(&cookie(name, "", 0, secure)).ok())
            .collect()
    }

    /// Append this session's cookies to an outgoing response
    pub fn write_to(&self, headers: &mut HeaderMap, secure: bool) {
        for value in self.set_cookie_headers(secure) {
            headers.append(SET_COOKIE, value);
        }
    }
}

fn cookie(name: &str, value: &str, max_age: i64, secure: bool) -> String {
    let mut cookie = format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Outcome of validating a caller's session against the auth provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionResolution {
    pub subject: Option<Subject>,
    /// New tokens minted during validation. Callers must write these to the
    /// response or the browser keeps presenting the rotated-out tokens.
    pub refreshed: Option<SessionTokens>,
}

impl SessionResolution {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(subject: Subject) -> Self {
        Self {
            subject: Some(subject),
            refreshed: None,
        }
    }

    pub fn refreshed(subject: Subject, tokens: SessionTokens) -> Self {
        Self {
            subject: Some(subject),
            refreshed: Some(tokens),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> SessionTokens {
        SessionTokens {
            access_token: "access-abc".to_string(),
            refresh_token: "refresh-xyz".to_string(),
            expires_in: 3600,
            expires_at: None,
        }
    }

    #[test]
    fn test_parse_session_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; sb-access-token=abc; sb-refresh-token=\"def\""),
        );

        let cookies = SessionCookies::from_headers(&headers);
        assert_eq!(cookies.access_token.as_deref(), Some("abc"));
        assert_eq!(cookies.refresh_token.as_deref(), Some("def"));
    }

    #[test]
    fn test_parse_across_multiple_cookie_headers() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("sb-access-token=abc"));
        headers.append(COOKIE, HeaderValue::from_static("sb-refresh-token=def"));

        let cookies = SessionCookies::from_headers(&headers);
        assert_eq!(cookies.access_token.as_deref(), Some("abc"));
        assert_eq!(cookies.refresh_token.as_deref(), Some("def"));
    }

    #[test]
    fn test_empty_cookie_values_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("sb-access-token=; other=1"));

        assert!(SessionCookies::from_headers(&headers).is_empty());
    }

    #[test]
    fn test_set_cookie_headers() {
        let values = tokens().set_cookie_headers(true);
        assert_eq!(values.len(), 2);

        let access = values[0].to_str().unwrap();
        assert!(access.starts_with("sb-access-token=access-abc;"));
        assert!(access.contains("Max-Age=3600"));
        assert!(access.contains("HttpOnly"));
        assert!(access.ends_with("Secure"));

        let refresh = values[1].to_str().unwrap();
        assert!(refresh.starts_with("sb-refresh-token=refresh-xyz;"));
    }

    #[test]
    fn test_clear_cookie_headers() {
        let values = SessionTokens::clear_cookie_headers(false);
        assert_eq!(values.len(), 2);
        for value in values {
            let raw = value.to_str().unwrap();
            assert!(raw.contains("Max-Age=0"));
            assert!(!raw.contains("Secure"));
        }
    }

    #[test]
    fn test_write_to_appends() {
        let mut headers = HeaderMap::new();
        tokens().write_to(&mut headers, false);
        assert_eq!(headers.get_all(SET_COOKIE).iter().count(), 2);
    }
}
