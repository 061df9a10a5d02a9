use catalog_metrics::storage::{ClassificationSpool, MemorySpoolStore};
use catalog_metrics::{LineClassifier, PipelineConfig};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

fn sample_lines(count: usize) -> Vec<String> {
    let paths = [
        "/fr/datasets/population-2024/",
        "/en/reuses/carte-des-ecoles",
        "/fr/organizations/insee/",
        "/fr/datasets/r/0b7e1d4f-aaaa-bbbb",
        "/resources/population/20240101-000000/pop.csv",
        "/fr/api/1/site/",
    ];
    (0..count)
        .map(|i| {
            let marker = if i % 10 == 0 { "DATAGOUVFR_API~" } else { "DATAGOUVFR_RGS~" };
            format!(
                "Mar  1 10:00:00 lb-1 haproxy[812]: 10.1.2.3:51234 [01/Mar/2024:10:00:{:02}.123456] {} www/web-2 0/0/1/12/13 200 5123 - - ---- 12/12/0/0/0 0/0 \"GET {} HTTP/1.1\"",
                i % 60,
                marker,
                paths[i % paths.len()]
            )
        })
        .collect()
}

fn bench_classify(c: &mut Criterion) {
    let classifier = LineClassifier::from_config(&PipelineConfig::default()).unwrap();
    let lines = sample_lines(10_000);

    let mut group = c.benchmark_group("classify");
    group.throughput(Throughput::Elements(lines.len() as u64));

    group.bench_function("lines", |b| {
        b.iter(|| {
            let mut matched = 0usize;
            for line in &lines {
                if classifier.classify(black_box(line)).unwrap().is_some() {
                    matched += 1;
                }
            }
            matched
        })
    });

    group.bench_function("lines_through_spool", |b| {
        b.iter(|| {
            let mut store = MemorySpoolStore::new();
            let mut spool = ClassificationSpool::new(&mut store, 1_000).unwrap();
            for line in &lines {
                if let Some(event) = classifier.classify(black_box(line)).unwrap() {
                    spool.add(event).unwrap();
                }
            }
            spool.finish().unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_classify);
criterion_main!(benches);
