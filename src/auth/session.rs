//! Session cookies and request-scoped context

use hyper::header::{HeaderMap, HeaderName, AUTHORIZATION, COOKIE};

/// Cookie carrying the auth provider access token
pub const ACCESS_TOKEN_COOKIE: &str = "anchor-access-token";

/// Cookie carrying the auth provider refresh token
pub const REFRESH_TOKEN_COOKIE: &str = "anchor-refresh-token";

/// Cookie holding the PKCE verifier between sign-in and callback
pub const CODE_VERIFIER_COOKIE: &str = "anchor-code-verifier";

/// Explicit per-request inputs to the gate and auth routes
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub path: String,
    pub cookie_header: Option<String>,
    pub authorization: Option<String>,
}

impl RequestContext {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Capture the relevant headers of an incoming request
    pub fn from_headers(path: &str, headers: &HeaderMap) -> Self {
        let header = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        };
        Self {
            path: path.to_string(),
            cookie_header: header(COOKIE),
            authorization: header(AUTHORIZATION),
        }
    }

    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        let pair = format!("{}={}", name, value);
        self.cookie_header = Some(match self.cookie_header.take() {
            Some(existing) => format!("{}; {}", existing, pair),
            None => pair,
        });
        self
    }

    pub fn with_authorization(mut self, value: &str) -> Self {
        self.authorization = Some(value.to_string());
        self
    }

    /// Value of a named cookie
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookie_header
            .as_deref()
            .and_then(|header| find_cookie(header, name))
    }

    /// Access token from the session cookie, falling back to a bearer header
    pub fn access_token(&self) -> Option<&str> {
        self.cookie(ACCESS_TOKEN_COOKIE)
            .or_else(|| {
                self.authorization
                    .as_deref()
                    .and_then(|h| h.strip_prefix("Bearer "))
                    .map(str::trim)
            })
            .filter(|t| !t.is_empty())
    }
}

/// Find a cookie in a `Cookie:` header value
pub fn find_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key.trim() == name).then(|| value.trim().trim_matches('"'))
    })
}

/// `Set-Cookie` value for a session cookie
pub fn session_cookie(name: &str, value: &str, max_age_secs: u64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        name, value, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that expires a cookie
pub fn clear_cookie(name: &str) -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", name)
}
