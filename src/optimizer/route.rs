// Distances, travel cost and visit ordering.
use std::cmp::Ordering;
use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::model::Store;

/// Virtual start/end node. The tilde keeps it out of the store-id namespace.
pub const HOME: &str = "~home";

/// Subset sizes up to this bound get an exact permutation search; larger
/// subsets fall back to nearest-neighbor construction plus 2-opt, which is
/// an approximation.
pub const EXHAUSTIVE_LIMIT: usize = 6;

const EARTH_RADIUS_MILES: f64 = 3959.0;

/// Symmetric travel distances between home and every routable store.
#[derive(Debug, Clone, Default)]
pub struct DistanceMatrix {
    miles: BTreeMap<(String, String), f64>,
}

impl DistanceMatrix {
    /// No distances at all; every lookup is zero. Used for no-travel runs.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds the matrix from store coordinates. Stores without a location
    /// simply get no entries.
    pub fn build(home: (f64, f64), stores: &[Store]) -> Self {
        let mut matrix = Self::default();
        let located: Vec<(&str, (f64, f64))> = stores
            .iter()
            .filter_map(|s| s.location.map(|loc| (s.id.as_str(), loc)))
            .collect();

        for (id, loc) in &located {
            matrix.insert_pair(HOME, id, haversine_miles(home, *loc));
        }
        for (i, (id_a, loc_a)) in located.iter().enumerate() {
            for (id_b, loc_b) in located.iter().skip(i + 1) {
                matrix.insert_pair(id_a, id_b, haversine_miles(*loc_a, *loc_b));
            }
        }
        matrix
    }

    pub(crate) fn insert_pair(&mut self, a: &str, b: &str, miles: f64) {
        self.miles.insert(key(a, b), miles);
    }

    pub fn distance(&self, a: &str, b: &str) -> f64 {
        if a == b {
            return 0.0;
        }
        self.miles.get(&key(a, b)).copied().unwrap_or(0.0)
    }
}

fn key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Great-circle distance in miles between two (lat, long) points.
pub fn haversine_miles(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lat1, lon1) = (a.0.to_radians(), a.1.to_radians());
    let (lat2, lon2) = (b.0.to_radians(), b.1.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    EARTH_RADIUS_MILES * 2.0 * h.sqrt().asin()
}

/// Trip money cost for a distance, per the configured vehicle economy.
/// Rounded to cents so it can join exact plan arithmetic.
pub fn travel_money(miles: f64, gas_price_per_gallon: f64, avg_mpg: f64) -> Decimal {
    Decimal::from_f64_retain(miles / avg_mpg * gas_price_per_gallon)
        .unwrap_or_default()
        .round_dp(2)
}

#[derive(Debug, Clone)]
pub struct Route {
    pub order: Vec<String>,
    pub miles: f64,
}

/// Cost-minimal visiting order over the given stores, starting and ending
/// at home. Exact for small subsets; deterministic in both branches (ties
/// go to the lexicographically earliest order).
pub fn best_route(matrix: &DistanceMatrix, store_ids: &[String]) -> Route {
    let mut ids: Vec<String> = store_ids.to_vec();
    ids.sort();

    if ids.is_empty() {
        return Route { order: Vec::new(), miles: 0.0 };
    }
    if ids.len() <= EXHAUSTIVE_LIMIT {
        return exhaustive_route(matrix, ids);
    }
    let order = two_opt(matrix, nearest_neighbor(matrix, &ids));
    let miles = route_miles(matrix, &order);
    Route { order, miles }
}

pub fn route_miles(matrix: &DistanceMatrix, order: &[String]) -> f64 {
    if order.is_empty() {
        return 0.0;
    }
    let mut miles = matrix.distance(HOME, &order[0]);
    for pair in order.windows(2) {
        miles += matrix.distance(&pair[0], &pair[1]);
    }
    miles + matrix.distance(&order[order.len() - 1], HOME)
}

/// Visits permutations in lexicographic order; strict improvement keeps
/// the earliest order on ties.
fn exhaustive_route(matrix: &DistanceMatrix, sorted_ids: Vec<String>) -> Route {
    let mut best_order = sorted_ids.clone();
    let mut best_miles = route_miles(matrix, &sorted_ids);

    let mut perm = sorted_ids;
    while next_permutation(&mut perm) {
        let miles = route_miles(matrix, &perm);
        if miles.total_cmp(&best_miles) == Ordering::Less {
            best_miles = miles;
            best_order = perm.clone();
        }
    }

    Route { order: best_order, miles: best_miles }
}

/// Standard next-permutation step. Returns false once the sequence is the
/// last (descending) permutation.
fn next_permutation(seq: &mut [String]) -> bool {
    if seq.len() < 2 {
        return false;
    }
    let Some(i) = (0..seq.len() - 1).rev().find(|&i| seq[i] < seq[i + 1]) else {
        return false;
    };
    let j = (i + 1..seq.len()).rev().find(|&j| seq[j] > seq[i]).unwrap_or(i + 1);
    seq.swap(i, j);
    seq[i + 1..].reverse();
    true
}

/// Greedy construction: always drive to the closest unvisited store.
/// Candidates are scanned in id order, so distance ties stay deterministic.
fn nearest_neighbor(matrix: &DistanceMatrix, sorted_ids: &[String]) -> Vec<String> {
    let mut unvisited: Vec<&String> = sorted_ids.iter().collect();
    let mut order = Vec::with_capacity(sorted_ids.len());
    let mut current = HOME.to_string();

    while !unvisited.is_empty() {
        let mut nearest_idx = 0;
        let mut nearest_miles = matrix.distance(&current, unvisited[0]);
        for (idx, candidate) in unvisited.iter().enumerate().skip(1) {
            let miles = matrix.distance(&current, candidate);
            if miles.total_cmp(&nearest_miles) == Ordering::Less {
                nearest_miles = miles;
                nearest_idx = idx;
            }
        }
        let next = unvisited.remove(nearest_idx);
        current = next.clone();
        order.push(next.clone());
    }
    order
}

/// Pairwise segment-reversal improvement until no swap strictly shortens
/// the tour.
fn two_opt(matrix: &DistanceMatrix, mut order: Vec<String>) -> Vec<String> {
    let mut best_miles = route_miles(matrix, &order);
    let mut improved = true;

    while improved {
        improved = false;
        for i in 0..order.len().saturating_sub(1) {
            for j in i + 1..order.len() {
                order[i..=j].reverse();
                let miles = route_miles(matrix, &order);
                if miles.total_cmp(&best_miles) == Ordering::Less {
                    best_miles = miles;
                    improved = true;
                } else {
                    order[i..=j].reverse();
                }
            }
        }
    }
    order
}
