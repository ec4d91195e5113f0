//! Public Suffix List (PSL) checks for captured cookie domains.
//!
//! A snapshot is portable and may come from an untrusted file, so cookie
//! records are screened before being written into a live jar: a record
//! scoped to a public suffix like `.com` or `.github.io` would be a
//! supercookie.
//!
//! Uses Mozilla's Public Suffix List via the `psl` crate.

use crate::base::{SnapError, SnapResult};
use psl::{List, Psl};

/// True if `domain` itself is a listed public suffix ("com", "co.uk").
///
/// Names under an unlisted TLD (`localhost`, `intranet`) are not treated as
/// public suffixes.
pub fn is_public_suffix(domain: &str) -> bool {
    let domain = domain.trim_start_matches('.').to_lowercase();
    match List.suffix(domain.as_bytes()) {
        Some(suffix) => suffix.is_known() && suffix.as_bytes() == domain.as_bytes(),
        None => false,
    }
}

/// Registrable domain (eTLD+1), e.g. "example.co.uk" for "a.b.example.co.uk".
pub fn registrable_domain(domain: &str) -> Option<String> {
    let domain = domain.trim_start_matches('.').to_lowercase();
    psl::domain(domain.as_bytes())
        .and_then(|d| std::str::from_utf8(d.as_bytes()).ok())
        .map(str::to_string)
}

/// Whether two hosts share a registrable domain ("a.example.com" / "b.example.com").
pub fn same_site(a: &str, b: &str) -> bool {
    match (registrable_domain(a), registrable_domain(b)) {
        (Some(a), Some(b)) => a == b,
        _ => a.trim_start_matches('.').eq_ignore_ascii_case(b.trim_start_matches('.')),
    }
}

/// Reject a cookie domain that is a public suffix.
pub fn check_cookie_domain(domain: &str) -> SnapResult<()> {
    if is_public_suffix(domain) {
        return Err(SnapError::validation(format!(
            "cookie domain {domain} is a public suffix"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_suffixes() {
        assert!(is_public_suffix("com"));
        assert!(is_public_suffix(".CO.UK"));
        assert!(is_public_suffix("github.io"));
        assert!(!is_public_suffix("example.com"));
    }

    #[test]
    fn test_unlisted_tld_is_not_a_public_suffix() {
        assert!(!is_public_suffix("localhost"));
        assert!(check_cookie_domain("localhost").is_ok());
    }

    #[test]
    fn test_same_site() {
        assert!(same_site("a.example.com", "b.example.com"));
        assert!(same_site(".example.com", "example.com"));
        assert!(!same_site("example.com", "example.org"));
        assert!(same_site("localhost", "LOCALHOST"));
    }

    #[test]
    fn test_check_cookie_domain() {
        assert!(check_cookie_domain(".com").is_err());
        assert!(check_cookie_domain(".example.com").is_ok());
    }
}
