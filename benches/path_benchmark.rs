use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use davserver::fs::LocalDir;
use davserver::path::{clean, resolve, url_path};
use davserver::serve::parse_range;

fn resolve_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");

    let cases = [
        ("root", "/", "/"),
        ("prefixed", "/dav/docs/a.txt", "/dav"),
        ("mismatch", "/other/docs/a.txt", "/dav"),
        ("deep", "/dav/a/b/c/d/e/f/g/h/i/j/k/l/m/n/file.bin/", "/dav"),
    ];

    for (name, raw, prefix) in cases.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(name), &(raw, prefix), |b, (raw, prefix)| {
            b.iter(|| resolve(black_box(raw), black_box(prefix)));
        });
    }

    group.finish();
}

fn clean_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("clean");

    let cases = [
        ("plain", "/docs/a.txt"),
        ("dots", "/docs/./a/../b/./c.txt"),
        ("traversal", "/../../../../etc/passwd"),
        ("slashes", "//docs///a////b.txt"),
    ];

    for (name, path) in cases.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(name), path, |b, path| {
            b.iter(|| clean(black_box(path)));
        });
    }

    group.finish();
}

fn sanitize_benchmark(c: &mut Criterion) {
    let dir = LocalDir::new("/srv/dav");
    c.bench_function("sanitize", |b| {
        b.iter(|| dir.sanitize(black_box("docs/../a/b/./c.txt")));
    });
}

fn url_path_benchmark(c: &mut Criterion) {
    c.bench_function("url_path", |b| {
        b.iter(|| url_path(black_box("http://example.com/dav/%E6%96%87%E6%A1%A3/a%20b.txt?x=1#top")));
    });
}

fn range_benchmark(c: &mut Criterion) {
    c.bench_function("parse_range", |b| {
        b.iter(|| parse_range(black_box("bytes=0-499, 1000-, -200"), black_box(1_000_000)));
    });
}

criterion_group!(
    benches,
    resolve_benchmark,
    clean_benchmark,
    sanitize_benchmark,
    url_path_benchmark,
    range_benchmark
);
criterion_main!(benches);
