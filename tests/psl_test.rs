//! Public Suffix List (PSL) integration tests.

use originsnap::cookies::psl::{check_cookie_domain, is_public_suffix, registrable_domain, same_site};

#[test]
fn test_tld_is_public_suffix() {
    // Top-level domains are public suffixes
    assert!(is_public_suffix("com"));
    assert!(is_public_suffix("org"));
    assert!(is_public_suffix("net"));
    assert!(is_public_suffix("co.uk"));
    assert!(is_public_suffix("com.au"));
}

#[test]
fn test_domain_not_public_suffix() {
    assert!(!is_public_suffix("example.com"));
    assert!(!is_public_suffix("google.com"));
    assert!(!is_public_suffix("bbc.co.uk"));
}

#[test]
fn test_registrable_domain_extraction() {
    assert_eq!(
        registrable_domain("www.example.com"),
        Some("example.com".to_string())
    );
    assert_eq!(
        registrable_domain("a.b.example.co.uk"),
        Some("example.co.uk".to_string())
    );
    assert_eq!(registrable_domain("com"), None);
}

#[test]
fn test_private_suffixes() {
    // github.io is in the private section: each user site is its own site
    assert!(is_public_suffix("github.io"));
    assert!(!same_site("alice.github.io", "bob.github.io"));
}

#[test]
fn test_same_site_for_domain_mismatch() {
    assert!(same_site("app.example.com", "www.example.com"));
    assert!(!same_site("a.com", "b.com"));
}

#[test]
fn test_supercookie_domains_rejected() {
    assert!(check_cookie_domain(".co.uk").is_err());
    assert!(check_cookie_domain("github.io").is_err());
    assert!(check_cookie_domain(".example.co.uk").is_ok());
    assert!(check_cookie_domain("localhost").is_ok());
}
