use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use blockcsv::{parse_bytes, scanner::scan};

fn generate_csv(rows: usize, cols: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(rows * cols * 8);
    for r in 0..rows {
        for c in 0..cols {
            if c > 0 {
                out.push(b',');
            }
            out.extend_from_slice(format!("field-{r}-{c}").as_bytes());
        }
        out.push(b'\n');
    }
    out
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan");
    for rows in [100usize, 10_000, 100_000] {
        let data = generate_csv(rows, 8);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &data, |b, data| {
            b.iter(|| scan(black_box(data), b','));
        });
    }
    group.finish();
}

fn bench_parse_bytes(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_bytes");
    for rows in [100usize, 10_000, 100_000] {
        let data = generate_csv(rows, 8);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &data, |b, data| {
            b.iter(|| parse_bytes(black_box(data), b','));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_scan, bench_parse_bytes);
criterion_main!(benches);
