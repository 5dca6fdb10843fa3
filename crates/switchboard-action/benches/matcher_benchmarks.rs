//! Benchmarks for configuration parsing and component resolution.
//!
//! Configurations are reparsed on every dispatch, so both the parser and the
//! matcher sit on the hot path. The fixture is a large message: 5 rows of 25
//! select components, each with 25 options.

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::{json, Value};
use switchboard_action::{parse_configuration, resolve};

const ROWS: usize = 5;
const PER_ROW: usize = 25;
const OPTIONS: usize = 25;

/// Generate a configuration where every component is a select with options.
fn generate_configuration() -> Value {
    let rows: Vec<Value> = (0..ROWS)
        .map(|row| {
            let components: Vec<Value> = (0..PER_ROW)
                .map(|col| {
                    let options: Vec<Value> = (0..OPTIONS)
                        .map(|opt| {
                            json!({
                                "value": format!("opt-{}", opt),
                                "actions": [
                                    {"type": "toggle_capability", "capability": format!("cap-{}", opt)}
                                ]
                            })
                        })
                        .collect();
                    json!({
                        "custom_id": format!("sel-{}-{}", row, col),
                        "type": 3,
                        "actions": [{"type": "notify_actor", "message": "{user} picked {values}"}],
                        "options": options
                    })
                })
                .collect();
            Value::Array(components)
        })
        .collect();
    Value::Array(rows)
}

fn bench_parse(c: &mut Criterion) {
    let raw = generate_configuration();

    let mut group = c.benchmark_group("parse");
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("large_configuration", |b| {
        b.iter(|| parse_configuration(black_box(&raw)));
    });

    group.finish();
}

fn bench_resolve(c: &mut Criterion) {
    let config = parse_configuration(&generate_configuration()).configuration;
    let last = format!("sel-{}-{}", ROWS - 1, PER_ROW - 1);
    let selected: Vec<String> = (0..OPTIONS).rev().map(|o| format!("opt-{}", o)).collect();

    let mut group = c.benchmark_group("resolve");
    group.sample_size(200);

    group.bench_function("first_component", |b| {
        b.iter(|| resolve(black_box(&config), black_box("sel-0-0"), &[]).actions.len());
    });

    // Worst case: the match is the very last component.
    group.bench_function("last_component_all_options", |b| {
        b.iter(|| {
            resolve(black_box(&config), black_box(&last), black_box(&selected))
                .actions
                .len()
        });
    });

    group.bench_function("unmatched", |b| {
        b.iter(|| resolve(black_box(&config), black_box("missing"), &[]).matched);
    });

    group.finish();
}

criterion_group!(benches, bench_parse, bench_resolve);
criterion_main!(benches);
