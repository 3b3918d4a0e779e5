//! Criterion benchmarks for the per-cycle hot paths.
//!
//! Benchmarks:
//! 1. Candidate filter (prescreen + execution screen)
//! 2. Rank and size
//! 3. Quote deduplication

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::{BTreeMap, HashMap};

use buylist_core::domain::{Candidate, ExecutionQuote, FactorRecord, SecurityMeta};
use buylist_core::execution::dedup_quotes;
use buylist_core::filter::{filter_candidates, FilterParams};
use buylist_core::sizing::{size_positions, SizingParams};
use chrono::NaiveDate;

// ── Helpers ──────────────────────────────────────────────────────────

fn t_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, 27).unwrap()
}

fn next_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
}

struct Universe {
    records: Vec<FactorRecord>,
    securities: HashMap<String, SecurityMeta>,
    quotes: BTreeMap<String, ExecutionQuote>,
}

fn make_universe(n: usize) -> Universe {
    let listed = NaiveDate::from_ymd_opt(2015, 1, 5).unwrap();
    let mut records = Vec::with_capacity(n);
    let mut securities = HashMap::with_capacity(n);
    let mut quotes = BTreeMap::new();
    for i in 0..n {
        let symbol = format!("{:06}", 600_000 + i);
        let close = 5.0 + (i % 200) as f64 * 0.5;
        let factor = (i as f64 * 0.37).sin();
        // every 50th name gaps up by 9.8%, every 70th is suspended
        let open = if i % 50 == 0 { close * 1.098 } else { close * 1.01 };
        let volume = if i % 70 == 0 { 0 } else { 10_000 };

        records.push(FactorRecord::new(symbol.clone(), t_date(), factor, close));
        securities.insert(
            symbol.clone(),
            SecurityMeta {
                symbol: symbol.clone(),
                name: format!("S{i}"),
                list_date: Some(listed),
            },
        );
        quotes.insert(
            symbol.clone(),
            ExecutionQuote {
                symbol,
                next_open: open,
                next_date: next_date(),
                next_volume: volume,
            },
        );
    }
    Universe {
        records,
        securities,
        quotes,
    }
}

fn make_candidates(n: usize) -> Vec<Candidate> {
    (0..n)
        .map(|i| {
            let price = 5.0 + (i % 200) as f64 * 0.5;
            Candidate {
                symbol: format!("{:06}", i),
                name: format!("S{i}"),
                factor: (i as f64 * 0.37).sin(),
                pre_close: price,
                cost_price: price,
                buy_date: next_date(),
            }
        })
        .collect()
}

// ── 1. Filter ────────────────────────────────────────────────────────

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter");
    let params = FilterParams::new(next_date());

    for &n in &[1_000, 5_000] {
        let u = make_universe(n);
        group.bench_with_input(BenchmarkId::new("filter_candidates", n), &n, |b, _| {
            b.iter(|| {
                filter_candidates(
                    black_box(&u.records),
                    black_box(&u.securities),
                    black_box(&u.quotes),
                    &params,
                )
            });
        });
    }

    group.finish();
}

// ── 2. Rank and size ─────────────────────────────────────────────────

fn bench_sizing(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank_and_size");
    let params = SizingParams::default();

    for &n in &[1_000, 5_000] {
        let candidates = make_candidates(n);
        group.bench_with_input(BenchmarkId::new("size_positions", n), &n, |b, _| {
            b.iter(|| size_positions(black_box(candidates.clone()), 1_000_000.0, &params));
        });
    }

    group.finish();
}

// ── 3. Quote dedup ───────────────────────────────────────────────────

fn bench_dedup(c: &mut Criterion) {
    let u = make_universe(5_000);
    // two forward rows per symbol, as a resolver without a LIMIT returns
    let raw: Vec<ExecutionQuote> = u
        .quotes
        .values()
        .flat_map(|q| {
            let mut later = q.clone();
            later.next_date = q.next_date.succ_opt().unwrap_or(q.next_date);
            [later, q.clone()]
        })
        .collect();

    c.bench_function("dedup_quotes_5000x2", |b| {
        b.iter(|| dedup_quotes(black_box(raw.clone())));
    });
}

criterion_group!(benches, bench_filter, bench_sizing, bench_dedup);
criterion_main!(benches);
