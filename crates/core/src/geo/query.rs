//! Radius search over repeater records.

use std::cmp::Ordering;

use super::{Radius, bounding_box, haversine};
use crate::model::Repeater;
use crate::store::{Column, Predicate};

/// Store predicate selecting every row inside the bounding box of `radius`.
///
/// The box is a superset of the circle; refine the rows with [`filter_by_radius`].
pub fn bounding_box_predicate(radius: &Radius) -> Predicate {
    let bbox = bounding_box(radius);
    Predicate::between(Column::Latitude, bbox.south, bbox.north)
        .and(Predicate::between(Column::Longitude, bbox.west, bbox.east))
}

/// Keep the candidates within `radius` of its origin, nearest first.
///
/// Ties on distance are broken by ascending id.
pub fn filter_by_radius(candidates: impl IntoIterator<Item = Repeater>, radius: &Radius) -> Vec<Repeater> {
    let mut hits: Vec<(f64, Repeater)> = candidates
        .into_iter()
        .map(|r| (haversine(radius.origin, r.position(), radius.unit), r))
        .filter(|(d, _)| *d <= radius.distance)
        .collect();

    hits.sort_by(|(da, a), (db, b)| match da.total_cmp(db) {
        Ordering::Equal => a.id.cmp(&b.id),
        other => other,
    });

    hits.into_iter().map(|(_, r)| r).collect()
}
