// Criterion benchmarks for PupMatch Algo

use std::collections::HashSet;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pupmatch_algo::core::{
    distance::{calculate_bounding_box, haversine_distance},
    rank_candidates, GridIndex, RetrievalOptions,
};
use pupmatch_algo::models::{
    ActivityLevel, DistanceUnit, GeoPoint, NearbyProfile, Preferences, UserId,
};

fn create_nearby(id: usize) -> NearbyProfile {
    NearbyProfile {
        user_id: format!("user-{}", id),
        name: format!("User {}", id),
        age: 18 + (id % 20) as u8,
        bio: None,
        activity_level: Some(ActivityLevel::Medium),
        distance_m: ((id * 7919) % 40_000) as f64,
    }
}

fn create_preferences() -> Preferences {
    Preferences {
        user_id: "current_user".to_string(),
        min_age: 21,
        max_age: 35,
        max_distance: 50.0,
        distance_unit: DistanceUnit::Kilometers,
        activity_level: ActivityLevel::Medium,
    }
}

fn bench_haversine_distance(c: &mut Criterion) {
    c.bench_function("haversine_distance", |b| {
        b.iter(|| {
            haversine_distance(
                black_box(40.7128),
                black_box(-74.0060),
                black_box(40.72),
                black_box(-74.01),
            )
        });
    });
}

fn bench_bounding_box(c: &mut Criterion) {
    c.bench_function("bounding_box_calculation", |b| {
        b.iter(|| {
            calculate_bounding_box(
                black_box(40.7128),
                black_box(-74.0060),
                black_box(50_000.0),
            )
        });
    });
}

fn bench_grid_query(c: &mut Criterion) {
    let mut index = GridIndex::default();
    for i in 0..10_000 {
        let lat = 40.0 + (i % 100) as f64 * 0.02;
        let lon = -75.0 + (i / 100) as f64 * 0.02;
        index.insert(&format!("user-{}", i), GeoPoint::new(lat, lon));
    }
    let center = GeoPoint::new(41.0, -74.0);

    let mut group = c.benchmark_group("grid_query");
    for radius_km in [5.0, 25.0, 80.0] {
        group.bench_with_input(
            BenchmarkId::from_parameter(radius_km),
            &radius_km,
            |b, &radius_km| {
                b.iter(|| index.query(black_box(&center), black_box(radius_km * 1_000.0)));
            },
        );
    }
    group.finish();
}

fn bench_rank_candidates(c: &mut Criterion) {
    let preferences = create_preferences();
    let options = RetrievalOptions::default();
    let excluded: HashSet<UserId> = (0..200).map(|i| format!("user-{}", i * 3)).collect();

    let mut group = c.benchmark_group("rank_candidates");

    for candidate_count in [10, 100, 1000, 5000].iter() {
        let nearby: Vec<NearbyProfile> = (0..*candidate_count).map(create_nearby).collect();

        group.bench_with_input(
            BenchmarkId::new("first_page", candidate_count),
            candidate_count,
            |b, _| {
                b.iter(|| {
                    rank_candidates(
                        black_box(nearby.clone()),
                        black_box(&preferences),
                        black_box(&excluded),
                        &options,
                        None,
                        20,
                    )
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_haversine_distance,
    bench_bounding_box,
    bench_grid_query,
    bench_rank_candidates
);

criterion_main!(benches);
