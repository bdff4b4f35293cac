use std::collections::{BTreeSet, HashMap};

use crate::core::distance::{calculate_bounding_box, distance_between};
use crate::models::{GeoPoint, UserId};

/// Default cell edge in degrees (~11km at the equator)
pub const DEFAULT_CELL_DEGREES: f64 = 0.1;

/// Fixed-grid spatial index over profile locations
///
/// Points are bucketed into `cell_degrees` x `cell_degrees` cells. A radius
/// query visits only the cells overlapping the radius' bounding box and then
/// applies the exact haversine check.
#[derive(Debug, Clone)]
pub struct GridIndex {
    cell_degrees: f64,
    rows: i32,
    columns: i32,
    cells: HashMap<(i32, i32), BTreeSet<UserId>>,
    positions: HashMap<UserId, GeoPoint>,
}

impl GridIndex {
    pub fn new(cell_degrees: f64) -> Self {
        let usable = cell_degrees.is_finite() && cell_degrees > 0.0 && cell_degrees <= 90.0;
        let cell_degrees = if usable {
            cell_degrees
        } else {
            DEFAULT_CELL_DEGREES
        };

        Self {
            cell_degrees,
            rows: (180.0 / cell_degrees).ceil() as i32,
            columns: (360.0 / cell_degrees).ceil() as i32,
            cells: HashMap::new(),
            positions: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Insert or move a point
    pub fn insert(&mut self, user_id: &str, point: GeoPoint) {
        self.remove(user_id);
        let cell = self.cell_of(&point);
        self.cells
            .entry(cell)
            .or_default()
            .insert(user_id.to_string());
        self.positions.insert(user_id.to_string(), point);
    }

    pub fn remove(&mut self, user_id: &str) -> Option<GeoPoint> {
        let point = self.positions.remove(user_id)?;
        let cell = self.cell_of(&point);
        if let Some(members) = self.cells.get_mut(&cell) {
            members.remove(user_id);
            if members.is_empty() {
                self.cells.remove(&cell);
            }
        }
        Some(point)
    }

    /// Every indexed id within `radius_m` meters of `center`, with its distance
    pub fn query(&self, center: &GeoPoint, radius_m: f64) -> Vec<(UserId, f64)> {
        let bbox = calculate_bounding_box(center.latitude, center.longitude, radius_m);

        let min_row = self.row_of(bbox.min_lat);
        let max_row = self.row_of(bbox.max_lat);

        let full_width = bbox.min_lon <= -180.0 && bbox.max_lon >= 180.0;
        let column_ranges: Vec<(i32, i32)> = if full_width {
            vec![(0, self.columns - 1)]
        } else if bbox.wraps_antimeridian() || bbox.max_lon >= 180.0 {
            // Longitude 180 shares column 0 with -180
            vec![
                (self.column_of(bbox.min_lon), self.columns - 1),
                (0, self.column_of(bbox.max_lon)),
            ]
        } else {
            vec![(self.column_of(bbox.min_lon), self.column_of(bbox.max_lon))]
        };

        let mut found = Vec::new();
        for row in min_row..=max_row {
            for &(first, last) in &column_ranges {
                for column in first..=last {
                    let Some(members) = self.cells.get(&(row, column)) else {
                        continue;
                    };
                    for user_id in members {
                        let Some(point) = self.positions.get(user_id) else {
                            continue;
                        };
                        let distance = distance_between(center, point);
                        if distance <= radius_m {
                            found.push((user_id.clone(), distance));
                        }
                    }
                }
            }
        }

        found
    }

    fn cell_of(&self, point: &GeoPoint) -> (i32, i32) {
        (self.row_of(point.latitude), self.column_of(point.longitude))
    }

    fn row_of(&self, lat: f64) -> i32 {
        let row = ((lat + 90.0) / self.cell_degrees).floor() as i32;
        row.clamp(0, self.rows - 1)
    }

    fn column_of(&self, lon: f64) -> i32 {
        let column = ((lon + 180.0) / self.cell_degrees).floor() as i32;
        column.rem_euclid(self.columns)
    }
}

impl Default for GridIndex {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_DEGREES)
    }
}
