use axum::http::HeaderMap;
use axum::http::header::REFERER;

pub const ADMIN_ACCOUNTS_PATH: &str = "/admin/accounts";

/// Where to send the client after an admin action: back where it came from,
/// or the account listing.
///
/// Only same-origin paths are followed. Absolute and protocol-relative URLs
/// fall back so a forged `Referer` cannot bounce the client off-site.
#[derive(Debug, Clone)]
pub struct RedirectResolver {
    fallback: String,
}

impl RedirectResolver {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            fallback: fallback.into(),
        }
    }

    pub fn resolve(&self, referrer: Option<&str>) -> String {
        referrer
            .map(str::trim)
            .filter(|r| is_local_path(r))
            .map(str::to_string)
            .unwrap_or_else(|| self.fallback.clone())
    }

    pub fn from_headers(&self, headers: &HeaderMap) -> String {
        self.resolve(headers.get(REFERER).and_then(|v| v.to_str().ok()))
    }
}

fn is_local_path(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//") && !target.starts_with("/\\")
}

impl Default for RedirectResolver {
    fn default() -> Self {
        Self::new(ADMIN_ACCOUNTS_PATH)
    }
}
