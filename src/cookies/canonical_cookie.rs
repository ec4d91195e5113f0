use crate::base::{SnapError, SnapResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::OffsetDateTime;
use url::Url;

/// A cookie as captured from, and written back to, a live cookie jar.
///
/// Field names and the `expirationDate` encoding (fractional seconds since the
/// Unix epoch) match the cookie objects browsers hand out to extensions, so
/// snapshots exported by other tools import unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieRecord {
    pub name: String,
    #[serde(default)]
    pub value: String,
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default, with = "epoch_seconds")]
    pub expiration_date: Option<OffsetDateTime>,
    #[serde(default)]
    pub same_site: SameSite,
    #[serde(default)]
    pub host_only: bool,
    #[serde(default)]
    pub session: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
    /// Cookie partition (container / store) the record belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SameSite {
    #[default]
    Unspecified,
    #[serde(alias = "none", alias = "None")]
    NoRestriction,
    #[serde(alias = "Lax")]
    Lax,
    #[serde(alias = "Strict")]
    Strict,
}

fn default_path() -> String {
    "/".to_string()
}

impl CookieRecord {
    /// A host-only session cookie at path `/`.
    pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: default_path(),
            expiration_date: None,
            same_site: SameSite::Unspecified,
            host_only: true,
            session: true,
            secure: false,
            http_only: false,
            store_id: None,
        }
    }

    /// Give the cookie an absolute expiry, making it persistent.
    pub fn expires_at(mut self, at: OffsetDateTime) -> Self {
        self.expiration_date = Some(at);
        self.session = false;
        self
    }

    /// Enforce the session/expiration invariant.
    ///
    /// A session cookie never carries an expiry, and a cookie without an expiry
    /// is a session cookie.
    pub fn normalized(mut self) -> Self {
        if self.session {
            self.expiration_date = None;
        } else if self.expiration_date.is_none() {
            self.session = true;
        }
        self
    }

    pub fn is_expired(&self, current_time: OffsetDateTime) -> bool {
        match self.expiration_date {
            Some(expiry) => expiry < current_time,
            None => false,
        }
    }

    /// Domain without the leading dot used for domain cookies.
    pub fn bare_domain(&self) -> &str {
        self.domain.trim_start_matches('.')
    }

    /// URL a browser would use to address this cookie.
    pub fn url(&self) -> SnapResult<Url> {
        let scheme = if self.secure { "https" } else { "http" };
        Url::parse(&format!("{}://{}{}", scheme, self.bare_domain(), self.path))
            .map_err(|e| SnapError::validation(format!("cookie {} has no usable URL: {e}", self.name)))
    }

    /// Reject records a cookie jar would refuse.
    ///
    /// Prefix rules follow RFC 6265bis:
    /// - `__Secure-` cookies MUST have the Secure attribute
    /// - `__Host-` cookies MUST be Secure, host-only, with Path="/"
    pub fn validate(&self, check_public_suffix: bool) -> SnapResult<()> {
        if self.session && self.expiration_date.is_some() {
            return Err(SnapError::validation(format!(
                "cookie {} is a session cookie with an expiration date",
                self.name
            )));
        }
        if self.bare_domain().is_empty() {
            return Err(SnapError::validation(format!("cookie {} has no domain", self.name)));
        }
        if self.name.contains(|c: char| c == '=' || c == ';' || c.is_control()) {
            return Err(SnapError::validation(format!("invalid cookie name {:?}", self.name)));
        }
        if self.value.contains(|c: char| c == ';' || c.is_control()) {
            return Err(SnapError::validation(format!("invalid value for cookie {}", self.name)));
        }
        if !self.path.starts_with('/') {
            return Err(SnapError::validation(format!(
                "cookie {} path {:?} is not absolute",
                self.name, self.path
            )));
        }
        if self.name.starts_with("__Secure-") && !self.secure {
            return Err(SnapError::validation(format!("{} requires Secure", self.name)));
        }
        if self.name.starts_with("__Host-") && (!self.secure || self.path != "/" || !self.host_only) {
            return Err(SnapError::validation(format!(
                "{} requires Secure, Path=/ and no Domain",
                self.name
            )));
        }
        if check_public_suffix {
            crate::cookies::psl::check_cookie_domain(&self.domain)?;
        }
        Ok(())
    }

    /// Parse a `Set-Cookie` line received for `url`.
    pub fn from_set_cookie(url: &Url, line: &str) -> SnapResult<Self> {
        use cookie::Cookie;

        let parsed = Cookie::parse(line)
            .map_err(|e| SnapError::validation(format!("unparseable Set-Cookie line: {e}")))?;
        let host = url.host_str().unwrap_or("").to_lowercase();

        // Explicit Domain attribute means a domain cookie, otherwise host-only.
        let (domain, host_only) = match parsed.domain() {
            Some(d) => (format!(".{}", d.trim_start_matches('.').to_lowercase()), false),
            None => (host, true),
        };

        let expiration_date = match parsed.max_age() {
            Some(max_age) => Some(OffsetDateTime::now_utc() + max_age),
            None => parsed.expires().and_then(|e| e.datetime()),
        };

        let same_site = match parsed.same_site() {
            Some(cookie::SameSite::Lax) => SameSite::Lax,
            Some(cookie::SameSite::Strict) => SameSite::Strict,
            Some(cookie::SameSite::None) => SameSite::NoRestriction,
            None => SameSite::Unspecified,
        };

        Ok(CookieRecord {
            name: parsed.name().to_string(),
            value: parsed.value().to_string(),
            domain,
            path: parsed.path().unwrap_or("/").to_string(),
            expiration_date,
            same_site,
            host_only,
            session: expiration_date.is_none(),
            secure: parsed.secure().unwrap_or(false),
            http_only: parsed.http_only().unwrap_or(false),
            store_id: None,
        })
    }
}

mod epoch_seconds {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<OffsetDateTime>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(t) => s.serialize_f64(t.unix_timestamp_nanos() as f64 / 1e9),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<OffsetDateTime>, D::Error> {
        let secs = Option::<f64>::deserialize(d)?;
        Ok(secs.filter(|s| s.is_finite() && *s > 0.0).and_then(|s| {
            OffsetDateTime::from_unix_timestamp_nanos((s * 1e9) as i128).ok()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalized_clears_expiry_on_session_cookie() {
        let mut cookie = CookieRecord::new("sid", "abc", "x.com");
        cookie.expiration_date = Some(OffsetDateTime::now_utc());
        cookie.session = true;

        let cookie = cookie.normalized();
        assert!(cookie.session);
        assert_eq!(cookie.expiration_date, None);
    }

    #[test]
    fn test_normalized_marks_expiryless_cookie_as_session() {
        let mut cookie = CookieRecord::new("sid", "abc", "x.com");
        cookie.session = false;
        assert!(cookie.normalized().session);
    }

    #[test]
    fn test_minimal_json_gets_defaults() {
        let cookie: CookieRecord =
            serde_json::from_value(json!({"name": "sid", "value": "abc", "domain": "x.com"})).unwrap();
        assert_eq!(cookie.path, "/");
        assert_eq!(cookie.same_site, SameSite::Unspecified);
        assert_eq!(cookie.expiration_date, None);
    }

    #[test]
    fn test_browser_cookie_shape_roundtrips() {
        let input = json!({
            "name": "pref",
            "value": "1",
            "domain": ".example.com",
            "path": "/",
            "expirationDate": 1767225600.5,
            "sameSite": "no_restriction",
            "hostOnly": false,
            "session": false,
            "secure": true,
            "httpOnly": true,
            "storeId": "0"
        });
        let cookie: CookieRecord = serde_json::from_value(input.clone()).unwrap();
        assert_eq!(cookie.same_site, SameSite::NoRestriction);
        assert_eq!(cookie.expiration_date.unwrap().unix_timestamp(), 1767225600);
        assert_eq!(serde_json::to_value(&cookie).unwrap(), input);
    }

    #[test]
    fn test_validate_prefixes() {
        let mut cookie = CookieRecord::new("__Host-id", "1", "example.com");
        assert!(cookie.validate(false).is_err());
        cookie.secure = true;
        assert!(cookie.validate(false).is_ok());
        cookie.path = "/app".into();
        assert!(cookie.validate(false).is_err());

        let secure = CookieRecord::new("__Secure-id", "1", "example.com");
        assert!(secure.validate(false).is_err());
    }

    #[test]
    fn test_validate_rejects_public_suffix_domain() {
        let mut cookie = CookieRecord::new("tracker", "1", ".com");
        cookie.host_only = false;
        assert!(matches!(cookie.validate(true), Err(SnapError::Validation { .. })));
        assert!(cookie.validate(false).is_ok());
    }

    #[test]
    fn test_from_set_cookie() {
        let url = Url::parse("https://a.example.com/login").unwrap();
        let cookie =
            CookieRecord::from_set_cookie(&url, "sid=xyz; Domain=example.com; Secure; SameSite=Lax")
                .unwrap();
        assert_eq!(cookie.domain, ".example.com");
        assert!(!cookie.host_only);
        assert!(cookie.secure);
        assert!(cookie.session);
        assert_eq!(cookie.same_site, SameSite::Lax);

        let host_only = CookieRecord::from_set_cookie(&url, "a=b; Max-Age=60").unwrap();
        assert_eq!(host_only.domain, "a.example.com");
        assert!(host_only.host_only);
        assert!(!host_only.session);
    }
}
