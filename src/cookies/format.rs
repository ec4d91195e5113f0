//! Text formats for handing captured cookies to other tools.
//!
//! - Netscape `cookies.txt` (curl, wget, yt-dlp)
//! - a `Cookie:` request header value
//! - `Set-Cookie` response header lines (import only)
//! - the pretty-printed JSON array used inside snapshots

use crate::base::SnapResult;
use crate::cookies::canonical_cookie::CookieRecord;
use time::OffsetDateTime;
use url::Url;

const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

/// Render cookies in Netscape cookie file format.
///
/// Session cookies get expiry `0`. HttpOnly cookies use the `#HttpOnly_`
/// domain prefix curl understands.
pub fn to_netscape(cookies: &[CookieRecord]) -> String {
    let mut lines = vec![
        "# Netscape HTTP Cookie File".to_string(),
        "# https://curl.se/docs/http-cookies.html".to_string(),
        "# This file was generated by originsnap".to_string(),
        String::new(),
    ];

    for cookie in cookies {
        // Format: domain \t include_subdomains \t path \t secure \t expiry \t name \t value
        let include_subdomains = if cookie.host_only { "FALSE" } else { "TRUE" };
        let secure = if cookie.secure { "TRUE" } else { "FALSE" };
        let expiry = cookie
            .expiration_date
            .map(|t| t.unix_timestamp())
            .unwrap_or(0);

        // Domain should start with . for non-host-only cookies
        let mut domain = if !cookie.host_only && !cookie.domain.starts_with('.') {
            format!(".{}", cookie.domain)
        } else {
            cookie.domain.clone()
        };
        if cookie.http_only {
            domain.insert_str(0, HTTP_ONLY_PREFIX);
        }

        lines.push(format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            domain, include_subdomains, cookie.path, secure, expiry, cookie.name, cookie.value
        ));
    }

    lines.join("\n")
}

/// Parse Netscape cookie file content.
///
/// Malformed lines and cookies already expired are skipped.
pub fn from_netscape(content: &str) -> Vec<CookieRecord> {
    let now = OffsetDateTime::now_utc();
    let mut cookies = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        let (line, http_only) = match line.strip_prefix(HTTP_ONLY_PREFIX) {
            Some(rest) => (rest, true),
            None => (line, false),
        };

        // Skip comments and empty lines
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split('\t').collect();
        if parts.len() < 7 {
            continue;
        }

        let expiry: i64 = parts[4].parse().unwrap_or(0);
        let expiration_date = if expiry > 0 {
            OffsetDateTime::from_unix_timestamp(expiry).ok()
        } else {
            None
        };
        if expiration_date.is_some_and(|t| t < now) {
            continue;
        }

        let mut cookie = CookieRecord::new(parts[5], parts[6], parts[0]);
        cookie.host_only = parts[1].eq_ignore_ascii_case("FALSE");
        cookie.path = parts[2].to_string();
        cookie.secure = parts[3].eq_ignore_ascii_case("TRUE");
        cookie.http_only = http_only;
        cookie.session = expiration_date.is_none();
        cookie.expiration_date = expiration_date;
        cookies.push(cookie);
    }

    cookies
}

/// Parse `Set-Cookie` header lines as received from `url`, one per line.
///
/// Lines may carry a `Set-Cookie:` prefix, as copied from developer tools.
/// Unparseable lines and cookies already expired are skipped.
pub fn from_set_cookie_lines(url: &Url, content: &str) -> Vec<CookieRecord> {
    let now = OffsetDateTime::now_utc();
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.split_once(':')
                .filter(|(name, _)| name.trim().eq_ignore_ascii_case("set-cookie"))
                .map(|(_, rest)| rest.trim())
                .unwrap_or(line)
        })
        .filter_map(|line| CookieRecord::from_set_cookie(url, line).ok())
        .filter(|cookie| cookie.expiration_date.map_or(true, |t| t >= now))
        .collect()
}

/// `name=value; name2=value2`, as sent in a `Cookie:` request header.
pub fn to_header(cookies: &[CookieRecord]) -> String {
    cookies
        .iter()
        .map(|c| cookie::Cookie::new(c.name.as_str(), c.value.as_str()).stripped().to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn to_json(cookies: &[CookieRecord]) -> SnapResult<String> {
    Ok(serde_json::to_string_pretty(cookies)?)
}

pub fn from_json(content: &str) -> SnapResult<Vec<CookieRecord>> {
    let cookies: Vec<CookieRecord> = serde_json::from_str(content)?;
    Ok(cookies.into_iter().map(CookieRecord::normalized).collect())
}
