use criterion::{criterion_group, criterion_main, Criterion};
use std::path::Path;
use std::sync::Arc;

use expedition_planner::challenge::SearchConfig;
use expedition_planner::grid::Grid;
use expedition_planner::map_format::load_map;
use expedition_planner::party::{PartyEffects, Role};
use expedition_planner::search::{parallel_search, Search};
use expedition_planner::simple_search::SimpleSearch;


fn make_map() -> Arc<Grid> {
    // Note this isn't great, we ideally shouldn't read from disk here.
    let grid = load_map(Path::new("./maps/map.txt"))
        .expect("Couldn't load map file");
    Arc::new(grid)
}

fn bench_search(c: &mut Criterion) {
    let grid = make_map();
    let config = SearchConfig::default();
    let parties = [
        ("no party", PartyEffects::default()),
        ("healer+gatherer", PartyEffects::derive([Role::Healer, Role::Gatherer])),
    ];
    for (label, effects) in parties {
        let mut group = c.benchmark_group(format!("search ({label})"));
        group.bench_function("simple search", |b| b.iter(|| {
            SimpleSearch::new(&grid, &effects, &config).run()
        }));
        group.bench_function("branch-and-bound", |b| b.iter(|| {
            Search::new(&grid, &effects, &config).run()
        }));
        group.bench_function("parallel branch-and-bound", |b| b.iter(|| {
            parallel_search(&grid, &effects, &config)
        }));
        group.finish();
    }
}

criterion_group!{
    name = benches;
    // Limit sample size given the slow processing. Results will be noisy.
    config = Criterion::default().sample_size(20);
    targets = bench_search,
}
criterion_main!(benches);
