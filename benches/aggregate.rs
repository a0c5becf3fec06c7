use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use surveyscope::core::{CombinedTable, FilterPredicate, SheetData, aggregate, classify, filter};
use surveyscope::ClassifierConfig;

const ROWS_PER_CLIENT: usize = 40_000;
const CLIENTS: [&str; 5] = ["Acme", "Globex", "Initech", "Umbrella", "Hooli"];
const REGIONS: [&str; 4] = ["EMEA", "APAC", "AMER", "LATAM"];
const TOOLS: [&str; 6] = ["Chat", "Search", "Code", "Images", "Meetings", "Docs"];

/// 200k responses across five clients.
fn synthetic_table() -> CombinedTable {
    let headers = vec![
        "Region".to_string(),
        "Do you use AI tools?".to_string(),
        "Which tools do you use?".to_string(),
        "Anything else? [Free Response]".to_string(),
    ];

    let mut table = CombinedTable::new();
    for (c, client) in CLIENTS.iter().enumerate() {
        let rows = (0..ROWS_PER_CLIENT)
            .map(|i| {
                let n = i + c * 7;
                vec![
                    REGIONS[n % REGIONS.len()].to_string(),
                    if n % 3 == 0 { "No" } else { "Yes" }.to_string(),
                    format!("{}, {}", TOOLS[n % TOOLS.len()], TOOLS[(n / 2) % TOOLS.len()]),
                    format!("Response number {} from {}", i, client),
                ]
            })
            .collect();
        table.append(
            client,
            &format!("{}__Survey.xlsx", client),
            SheetData {
                headers: headers.clone(),
                rows,
            },
        );
    }
    table
}

fn benchmark_classify(c: &mut Criterion) {
    let table = synthetic_table();
    let config = ClassifierConfig::default();

    c.bench_function("classify_200k", |b| {
        b.iter(|| classify(black_box(&table), black_box(&config)))
    });
}

fn benchmark_filter_aggregate(c: &mut Criterion) {
    let table = synthetic_table();
    let schema = classify(&table, &ClassifierConfig::default());
    let predicate = FilterPredicate::new()
        .with_clients(["Acme", "Globex"])
        .with_equals("Region", "EMEA");

    let mut group = c.benchmark_group("aggregate_200k");
    group.sample_size(20);

    group.bench_function("single_select_unfiltered", |b| {
        b.iter(|| {
            let view = filter(&table, &FilterPredicate::new()).unwrap();
            aggregate(&view, &schema, black_box("Do you use AI tools?")).unwrap()
        })
    });

    group.bench_function("multi_select_filtered", |b| {
        b.iter(|| {
            let view = filter(&table, black_box(&predicate)).unwrap();
            aggregate(&view, &schema, black_box("Which tools do you use?")).unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, benchmark_classify, benchmark_filter_aggregate);
criterion_main!(benches);
