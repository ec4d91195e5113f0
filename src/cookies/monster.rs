use crate::base::{SnapError, SnapResult};
use crate::cookies::canonical_cookie::CookieRecord;
use crate::cookies::mirror::CookieJar;
use dashmap::DashMap;
use futures::future::BoxFuture;
use std::sync::Arc;
use time::OffsetDateTime;
use url::Url;

/// Maximum cookies per domain (Chromium default).
const MAX_COOKIES_PER_DOMAIN: usize = 50;

/// In-process cookie jar.
///
/// Stands in for a browser's jar when the target context is an embedded or
/// headless engine, and in tests. Host-only cookies are stored under the host
/// of the URL they are written through, which is how a restored snapshot lands
/// on a different origin when the user chooses to proceed.
#[derive(Clone, Default)]
pub struct MemoryCookieJar {
    // Store: Map<Domain, List<Cookie>>
    store: Arc<DashMap<String, Vec<CookieRecord>>>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a cookie (same name, domain and path) without URL scoping.
    pub fn insert(&self, cookie: CookieRecord) {
        let key = cookie.bare_domain().to_lowercase();
        let mut entry = self.store.entry(key).or_default();

        entry.retain(|c| c.name != cookie.name || c.path != cookie.path);

        // Oldest insert goes first.
        while entry.len() >= MAX_COOKIES_PER_DOMAIN {
            entry.remove(0);
        }

        entry.push(cookie);
    }

    /// Parse and store a `Set-Cookie` line received for `url`.
    pub fn set_cookie_line(&self, url: &Url, line: &str) -> SnapResult<()> {
        self.insert(CookieRecord::from_set_cookie(url, line)?);
        Ok(())
    }

    /// Cookies visible to `url`: domain- and path-matched, unexpired.
    pub fn cookies_for_url(&self, url: &Url) -> Vec<CookieRecord> {
        let host = url.host_str().unwrap_or("");
        let now = OffsetDateTime::now_utc();
        let mut result = Vec::new();

        for domain in Self::get_matching_domains(host) {
            if let Some(entry) = self.store.get(&domain) {
                for cookie in entry.iter() {
                    if !Self::domain_matches(cookie.bare_domain(), host, cookie.host_only) {
                        continue;
                    }
                    if !Self::path_matches(&cookie.path, url.path()) {
                        continue;
                    }
                    if cookie.is_expired(now) {
                        continue;
                    }
                    result.push(cookie.clone());
                }
            }
        }

        result.sort_by(|a, b| a.name.cmp(&b.name));
        result
    }

    /// Check if cookie domain matches request host (RFC 6265 domain matching).
    fn domain_matches(cookie_domain: &str, request_host: &str, host_only: bool) -> bool {
        if host_only || request_host.eq_ignore_ascii_case(cookie_domain) {
            return cookie_domain.eq_ignore_ascii_case(request_host);
        }

        request_host.len() > cookie_domain.len()
            && request_host
                .to_ascii_lowercase()
                .ends_with(&format!(".{}", cookie_domain.to_ascii_lowercase()))
    }

    /// Check if request path matches cookie path (RFC 6265 path matching).
    fn path_matches(cookie_path: &str, request_path: &str) -> bool {
        if request_path == cookie_path {
            return true;
        }

        if let Some(rest) = request_path.strip_prefix(cookie_path) {
            return cookie_path.ends_with('/') || rest.starts_with('/');
        }

        false
    }

    /// The host itself and all of its parent domains.
    fn get_matching_domains(host: &str) -> Vec<String> {
        let host = host.to_lowercase();
        let parts: Vec<&str> = host.split('.').collect();
        let mut domains = vec![host.clone()];
        for i in 1..parts.len().saturating_sub(1) {
            domains.push(parts[i..].join("."));
        }
        domains
    }

    pub fn total_cookie_count(&self) -> usize {
        self.store.iter().map(|e| e.value().len()).sum()
    }

    pub fn clear(&self) {
        self.store.clear();
    }

    pub fn iter_all_cookies(&self) -> impl Iterator<Item = CookieRecord> + '_ {
        self.store.iter().flat_map(|entry| entry.value().clone())
    }
}

impl CookieJar for MemoryCookieJar {
    fn get_all<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, SnapResult<Vec<CookieRecord>>> {
        Box::pin(async move { Ok(self.cookies_for_url(url)) })
    }

    fn remove<'a>(&'a self, name: &'a str, url: &'a Url) -> BoxFuture<'a, SnapResult<()>> {
        Box::pin(async move {
            let host = url.host_str().unwrap_or("");
            let mut removed = false;
            for domain in Self::get_matching_domains(host) {
                if let Some(mut entry) = self.store.get_mut(&domain) {
                    let before = entry.len();
                    entry.retain(|c| {
                        c.name != name
                            || !Self::domain_matches(c.bare_domain(), host, c.host_only)
                            || !Self::path_matches(&c.path, url.path())
                    });
                    removed |= entry.len() != before;
                }
            }
            if removed {
                Ok(())
            } else {
                Err(SnapError::not_found(format!("cookie {name} for {url}")))
            }
        })
    }

    fn set<'a>(
        &'a self,
        mut cookie: CookieRecord,
        url: &'a Url,
    ) -> BoxFuture<'a, SnapResult<CookieRecord>> {
        Box::pin(async move {
            let host = url
                .host_str()
                .ok_or_else(|| SnapError::validation(format!("cannot set cookies for {url}")))?;
            if cookie.host_only {
                cookie.domain = host.to_lowercase();
            }
            self.insert(cookie.clone());
            Ok(cookie)
        })
    }
}
