use criterion::{black_box, criterion_group, criterion_main, Criterion};
use originsnap::cookies::format;
use originsnap::cookies::psl::is_public_suffix;
use originsnap::cookies::MemoryCookieJar;
use url::Url;

fn benchmark_cookie_insert(c: &mut Criterion) {
    let jar = MemoryCookieJar::new();
    let url = Url::parse("https://example.com").unwrap();

    c.bench_function("cookie_parse_and_save", |b| {
        b.iter(|| {
            jar.set_cookie_line(black_box(&url), black_box("foo=bar; Path=/; Secure"))
                .unwrap();
        })
    });
}

fn benchmark_cookie_get(c: &mut Criterion) {
    let jar = MemoryCookieJar::new();
    let url = Url::parse("https://example.com/foo/bar").unwrap();
    // Pre-populate
    for i in 0..40 {
        jar.set_cookie_line(&url, &format!("cookie{}=val; Path=/foo", i))
            .unwrap();
    }

    c.bench_function("cookie_get_for_url", |b| {
        b.iter(|| {
            black_box(jar.cookies_for_url(black_box(&url)));
        })
    });
}

fn benchmark_formats(c: &mut Criterion) {
    let jar = MemoryCookieJar::new();
    let url = Url::parse("https://example.com/").unwrap();
    for i in 0..40 {
        jar.set_cookie_line(&url, &format!("c{}=v{}; Max-Age=3600; HttpOnly", i, i))
            .unwrap();
    }
    let cookies = jar.cookies_for_url(&url);
    let netscape = format::to_netscape(&cookies);

    let mut group = c.benchmark_group("cookie_formats");
    group.bench_function("to_netscape_40", |b| {
        b.iter(|| black_box(format::to_netscape(black_box(&cookies))))
    });
    group.bench_function("from_netscape_40", |b| {
        b.iter(|| black_box(format::from_netscape(black_box(&netscape))))
    });
    group.bench_function("to_header_40", |b| {
        b.iter(|| black_box(format::to_header(black_box(&cookies))))
    });
    group.finish();
}

fn bench_psl_lookup(c: &mut Criterion) {
    let domains = ["com", "co.uk", "github.io", "example.com", "sub.example.com"];

    c.bench_function("psl_lookup_mixed_domains", |b| {
        b.iter(|| {
            for domain in &domains {
                black_box(is_public_suffix(domain));
            }
        });
    });
}

criterion_group!(
    benches,
    benchmark_cookie_insert,
    benchmark_cookie_get,
    benchmark_formats,
    bench_psl_lookup
);
criterion_main!(benches);
