// Unit tests for PupMatch Algo

use std::collections::HashSet;

use pupmatch_algo::core::{
    cursor::Cursor,
    distance::{calculate_bounding_box, haversine_distance, is_within_bounding_box},
    filters::{matches_activity, matches_age_range, ActivityFilter},
    rank_candidates, GridIndex, RetrievalOptions,
};
use pupmatch_algo::models::{
    ActivityLevel, DistanceUnit, GeoPoint, NearbyProfile, Preferences, UserId, UserPair,
};

fn create_nearby(id: &str, age: u8, distance_m: f64) -> NearbyProfile {
    NearbyProfile {
        user_id: id.to_string(),
        name: format!("User {}", id),
        age,
        bio: None,
        activity_level: None,
        distance_m,
    }
}

fn create_preferences(min_age: u8, max_age: u8, km: f64) -> Preferences {
    Preferences::new(
        "requester",
        min_age,
        max_age,
        km,
        DistanceUnit::Kilometers,
        ActivityLevel::Medium,
    )
    .unwrap()
}

#[test]
fn test_haversine_distance_zero() {
    let distance = haversine_distance(40.7128, -74.0060, 40.7128, -74.0060);
    assert!(distance < 0.01);
}

#[test]
fn test_haversine_distance_manhattan_to_brooklyn() {
    let distance = haversine_distance(40.7580, -73.9855, 40.6782, -73.9442);
    assert!(distance > 5_000.0 && distance < 15_000.0);
}

#[test]
fn test_haversine_is_symmetric() {
    let there = haversine_distance(51.5074, -0.1278, 48.8566, 2.3522);
    let back = haversine_distance(48.8566, 2.3522, 51.5074, -0.1278);
    assert_eq!(there, back);
}

#[test]
fn test_point_within_bbox() {
    let bbox = calculate_bounding_box(40.7128, -74.0060, 10_000.0);

    assert!(is_within_bounding_box(40.7128, -74.0060, &bbox));
    assert!(is_within_bounding_box(40.71, -74.0, &bbox));
    assert!(!is_within_bounding_box(50.0, -80.0, &bbox));
    assert!(!is_within_bounding_box(bbox.max_lat + 0.01, -74.0, &bbox));
}

#[test]
fn test_bounding_box_across_antimeridian() {
    let bbox = calculate_bounding_box(-17.7, 179.95, 20_000.0);
    assert!(bbox.wraps_antimeridian());
    assert!(is_within_bounding_box(-17.7, -179.95, &bbox));
    assert!(!is_within_bounding_box(-17.7, 0.0, &bbox));
}

#[test]
fn test_grid_index_matches_brute_force() {
    let mut index = GridIndex::new(0.05);
    let center = GeoPoint::new(52.52, 13.40);
    let mut points = Vec::new();
    for i in 0..20 {
        for j in 0..20 {
            let point = GeoPoint::new(52.3 + i as f64 * 0.025, 13.1 + j as f64 * 0.035);
            let id = format!("{}-{}", i, j);
            index.insert(&id, point);
            points.push((id, point));
        }
    }

    let radius_m = 12_000.0;
    let found: HashSet<UserId> = index
        .query(&center, radius_m)
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    let expected: HashSet<UserId> = points
        .into_iter()
        .filter(|(_, p)| {
            haversine_distance(center.latitude, center.longitude, p.latitude, p.longitude)
                <= radius_m
        })
        .map(|(id, _)| id)
        .collect();

    assert!(!expected.is_empty());
    assert_eq!(found, expected);
}

#[test]
fn test_cursor_orders_ties_by_identity() {
    let cursor = Cursor::new(100.0, "m");
    assert!(cursor.precedes(100.0, "n"));
    assert!(!cursor.precedes(100.0, "m"));
    assert!(!cursor.precedes(100.0, "a"));
    assert!(cursor.precedes(100.5, "a"));
    assert!(!cursor.precedes(99.5, "z"));
}

#[test]
fn test_cursor_rejects_garbage() {
    assert!(Cursor::decode("").is_err());
    assert!(Cursor::decode("abc").is_err());
    assert!(Cursor::decode("zzzzzzzzzzzzzzzz.user").is_err());
    assert!(Cursor::decode("0000000000000000.").is_err());
    assert!(Cursor::decode(&format!("{:016x}.user", f64::NAN.to_bits())).is_err());
}

#[test]
fn test_age_range_is_inclusive() {
    let preferences = create_preferences(18, 30, 10.0);
    assert!(matches_age_range(&create_nearby("a", 18, 0.0), &preferences));
    assert!(matches_age_range(&create_nearby("a", 30, 0.0), &preferences));
    assert!(!matches_age_range(&create_nearby("a", 17, 0.0), &preferences));
    assert!(!matches_age_range(&create_nearby("a", 31, 0.0), &preferences));
}

#[test]
fn test_activity_filter_modes() {
    let preferences = create_preferences(18, 30, 10.0);
    let mut high = create_nearby("h", 20, 0.0);
    high.activity_level = Some(ActivityLevel::High);
    let mut low = create_nearby("l", 20, 0.0);
    low.activity_level = Some(ActivityLevel::Low);
    let unknown = create_nearby("u", 20, 0.0);

    let fallback = ActivityLevel::Medium;
    assert!(matches_activity(&low, &preferences, ActivityFilter::Any, fallback));
    assert!(!matches_activity(&high, &preferences, ActivityFilter::Exact, fallback));
    assert!(matches_activity(&unknown, &preferences, ActivityFilter::Exact, fallback));
    assert!(matches_activity(&high, &preferences, ActivityFilter::Adjacent, fallback));
    assert!(matches_activity(&low, &preferences, ActivityFilter::Adjacent, fallback));
}

#[test]
fn test_rank_candidates_orders_filters_and_pages() {
    let preferences = create_preferences(18, 30, 10.0);
    let options = RetrievalOptions::default();
    let nearby = vec![
        create_nearby("far", 25, 9_000.0),
        create_nearby("tie-b", 25, 2_000.0),
        create_nearby("tie-a", 25, 2_000.0),
        create_nearby("too-old", 45, 500.0),
        create_nearby("seen", 25, 100.0),
        create_nearby("near", 25, 1_000.0),
    ];
    let excluded: HashSet<UserId> = ["seen".to_string()].into_iter().collect();

    let first = rank_candidates(nearby.clone(), &preferences, &excluded, &options, None, 2);
    let ids: Vec<&str> = first.candidates.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["near", "tie-a"]);
    assert_eq!(first.candidates[0].distance, 1.0);

    let cursor = Cursor::decode(first.next_cursor.as_deref().unwrap()).unwrap();
    let second = rank_candidates(nearby, &preferences, &excluded, &options, Some(&cursor), 2);
    let ids: Vec<&str> = second.candidates.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["tie-b", "far"]);
}

#[test]
fn test_rank_candidates_empty_page_has_no_cursor() {
    let preferences = create_preferences(18, 30, 10.0);
    let page = rank_candidates(
        Vec::new(),
        &preferences,
        &HashSet::new(),
        &RetrievalOptions::default(),
        None,
        20,
    );
    assert!(page.candidates.is_empty());
    assert!(page.next_cursor.is_none());
}

#[test]
fn test_pair_canonical_order_is_bytewise() {
    let pair = UserPair::new("b", "B").unwrap();
    assert_eq!(pair.low(), "B");
    assert_eq!(pair.high(), "b");
    assert!(UserPair::new("same", "same").is_err());
}
