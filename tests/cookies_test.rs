use originsnap::base::SnapError;
use originsnap::cookies::format;
use originsnap::cookies::{CookieMirror, CookieRecord, MemoryCookieJar};
use std::sync::Arc;
use time::OffsetDateTime;
use url::Url;

fn mirror_for(jar: &MemoryCookieJar, url: &str) -> CookieMirror {
    CookieMirror::new(Arc::new(jar.clone()), Url::parse(url).unwrap())
}

#[test]
fn test_parse_and_list() {
    let jar = MemoryCookieJar::new();
    let url = Url::parse("https://example.com/foo").unwrap();
    jar.set_cookie_line(&url, "foo=bar; Path=/").unwrap();

    let cookies = jar.cookies_for_url(&url);
    assert_eq!(cookies.len(), 1);
    assert_eq!(cookies[0].name, "foo");
    assert_eq!(cookies[0].value, "bar");
    assert_eq!(cookies[0].path, "/");
}

#[test]
fn test_domain_matching() {
    let jar = MemoryCookieJar::new();
    let url = Url::parse("https://a.example.com").unwrap();

    jar.set_cookie_line(&url, "host=val").unwrap();
    jar.set_cookie_line(&url, "domain=val; Domain=example.com").unwrap();

    let cookies = jar.cookies_for_url(&url);
    assert!(cookies.iter().any(|c| c.name == "host"));
    assert!(cookies.iter().any(|c| c.name == "domain"));

    // Host-only cookie does not leak to a sibling
    let sibling = Url::parse("https://b.example.com").unwrap();
    let cookies = jar.cookies_for_url(&sibling);
    assert_eq!(cookies.len(), 1);
    assert_eq!(cookies[0].name, "domain");
}

#[test]
fn test_expired_cookie_is_hidden() {
    let jar = MemoryCookieJar::new();
    let url = Url::parse("https://example.com/").unwrap();
    jar.insert(
        CookieRecord::new("old", "x", "example.com")
            .expires_at(OffsetDateTime::now_utc() - time::Duration::hours(1)),
    );
    assert!(jar.cookies_for_url(&url).is_empty());
}

#[tokio::test]
async fn test_write_enforces_session_invariant() {
    let jar = MemoryCookieJar::new();
    let mirror = mirror_for(&jar, "https://x.com/");

    let mut cookie = CookieRecord::new("sid", "abc", "x.com");
    cookie.expiration_date = Some(OffsetDateTime::now_utc() + time::Duration::days(1));
    cookie.session = true;

    let stored = mirror.write(cookie).await.unwrap();
    assert!(stored.session);
    assert_eq!(stored.expiration_date, None);
    assert_eq!(mirror.list_all().await.unwrap()[0].expiration_date, None);
}

#[tokio::test]
async fn test_write_rejects_invalid_records() {
    let jar = MemoryCookieJar::new();
    let mirror = mirror_for(&jar, "https://x.com/");

    let mut supercookie = CookieRecord::new("track", "1", ".com");
    supercookie.host_only = false;
    assert!(matches!(
        mirror.write(supercookie).await,
        Err(SnapError::Validation { .. })
    ));

    let bad_name = CookieRecord::new("a;b", "1", "x.com");
    assert!(mirror.write(bad_name).await.is_err());
    assert_eq!(jar.total_cookie_count(), 0);
}

#[tokio::test]
async fn test_write_repoints_partition() {
    let jar = MemoryCookieJar::new();
    let mirror = mirror_for(&jar, "https://x.com/").with_partition(Some("firefox-container-2".into()));

    let mut cookie = CookieRecord::new("sid", "abc", "x.com");
    cookie.store_id = Some("firefox-default".into());

    let stored = mirror.write(cookie).await.unwrap();
    assert_eq!(stored.store_id.as_deref(), Some("firefox-container-2"));
}

#[tokio::test]
async fn test_update_renamed_cookie_removes_old() {
    let jar = MemoryCookieJar::new();
    let mirror = mirror_for(&jar, "https://x.com/");
    mirror.write(CookieRecord::new("old", "1", "x.com")).await.unwrap();

    mirror
        .update("old", true, CookieRecord::new("new", "1", "x.com"))
        .await
        .unwrap();

    let names: Vec<_> = mirror.list_all().await.unwrap().into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["new"]);
}

#[tokio::test]
async fn test_remove_missing_cookie_is_not_found() {
    let jar = MemoryCookieJar::new();
    let mirror = mirror_for(&jar, "https://x.com/");
    assert!(matches!(
        mirror.remove("ghost").await,
        Err(SnapError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_replace_all_counts_failures_and_continues() {
    let jar = MemoryCookieJar::new();
    let mirror = mirror_for(&jar, "https://x.com/");
    mirror.write(CookieRecord::new("stale", "1", "x.com")).await.unwrap();

    let records = vec![
        CookieRecord::new("a", "1", "x.com"),
        CookieRecord::new("__Secure-b", "2", "x.com"),
        CookieRecord::new("c", "3", "x.com"),
    ];
    let replay = mirror.replace_all(&records).await.unwrap();

    assert_eq!(replay.removed, 1);
    assert_eq!(replay.restored, 2);
    assert_eq!(replay.failed, 1);
    assert_eq!(replay.failures[0].0, "__Secure-b");

    let names: Vec<_> = mirror.list_all().await.unwrap().into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["a", "c"]);
}

#[test]
fn test_export_import_netscape() {
    let jar = MemoryCookieJar::new();
    let url = Url::parse("https://example.com/").unwrap();
    jar.set_cookie_line(&url, "a=1; Max-Age=3600").unwrap();
    jar.set_cookie_line(&url, "b=2; HttpOnly").unwrap();

    let cookies = jar.cookies_for_url(&url);
    let text = format::to_netscape(&cookies);
    assert!(text.starts_with("# Netscape HTTP Cookie File"));

    let parsed = format::from_netscape(&text);
    assert_eq!(parsed.len(), 2);
    assert_eq!(format::to_header(&parsed), "a=1; b=2");
}

#[test]
fn test_json_format_uses_browser_field_names() {
    let cookies = vec![CookieRecord::new("sid", "abc", "x.com")];
    let json = format::to_json(&cookies).unwrap();
    assert!(json.contains("\"hostOnly\": true"));
    assert!(json.contains("\"httpOnly\": false"));
    assert_eq!(format::from_json(&json).unwrap(), cookies);
}
