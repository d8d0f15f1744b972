//! Benchmarks for meteor extraction performance.
//!
//! Run with: cargo bench

use std::path::PathBuf;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use meteor::{
    author, text, Candidate, Field, Metadata, Meteor, MeteorOptions, Origin, PersonName,
    ResourceCatalog,
};

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/alto_report")
}

/// Benchmark a full run over the ALTO fixture.
fn bench_alto_run(c: &mut Criterion) {
    let meteor = Meteor::new(MeteorOptions::default()).unwrap();
    let path = fixture();

    c.bench_function("alto_run", |b| {
        b.iter(|| meteor.run(black_box(&path)).unwrap());
    });
}

/// Benchmark resource loading, with and without the pattern cache.
fn bench_catalog(c: &mut Criterion) {
    let mut group = c.benchmark_group("catalog");

    group.bench_function("load_all_languages", |b| {
        b.iter(|| ResourceCatalog::load(None).unwrap());
    });

    group.bench_function("load_and_compile_cached", |b| {
        b.iter(|| {
            let catalog = ResourceCatalog::load(None).unwrap();
            catalog.patterns().unwrap();
        });
    });

    group.finish();
}

/// Benchmark the name heuristics on a typical front-page author line.
fn bench_names(c: &mut Criterion) {
    let catalog = ResourceCatalog::load(None).unwrap();
    let patterns = catalog.patterns().unwrap();
    let line =
        "Bjørnstjerne M. Bjørnson, Jacobine Camilla-Collett, Henrik J. Ibsen og Raymond McArthur";

    c.bench_function("find_names", |b| {
        b.iter(|| text::find_names(black_box(line)));
    });

    c.bench_function("extract_authors", |b| {
        b.iter(|| author::extract(black_box(line), patterns));
    });
}

/// Benchmark arbitration over a realistic candidate set.
fn bench_choose_best(c: &mut Criterion) {
    let catalog = ResourceCatalog::load(None).unwrap();
    let patterns = catalog.patterns().unwrap();

    let mut metadata = Metadata::new();
    for (i, year) in [2021i64, 2022, 2023].into_iter().enumerate() {
        let origin = [Origin::Llm, Origin::Pdfinfo, Origin::Copyright][i];
        metadata.add_candidate(Field::Year, Candidate::new(year, origin).on_page(2));
    }
    metadata.add_candidate(Field::Title, Candidate::new("Forsiden", Origin::FrontPage));
    for name in ["Kari Nordmann", "Ola Hansen", "Kari Nordmann"] {
        let person = author::split_name(name).unwrap_or_else(|| PersonName::new("", name));
        metadata.add_candidate(Field::Author, Candidate::new(person, Origin::FrontPage));
    }
    metadata.add_candidate(
        Field::Isbn,
        Candidate::new("9788217022985", Origin::Page)
            .on_page(2)
            .with_context(Some("isbn 978-82-17-02298-5 (elektronisk)".into())),
    );

    c.bench_function("choose_best", |b| {
        b.iter(|| black_box(&metadata).choose_best(patterns));
    });
}

criterion_group!(
    benches,
    bench_alto_run,
    bench_catalog,
    bench_names,
    bench_choose_best,
);
criterion_main!(benches);
