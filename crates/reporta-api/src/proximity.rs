use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};

use reporta_db::Database;
use reporta_types::api::{ComplaintResponse, NearbyQuery};
use reporta_types::models::Complaint;

use crate::complaints::complaint_from_row;
use crate::error::ApiError;
use crate::geo::Coordinates;
use crate::run_blocking;
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct NearbyMatch {
    pub complaint: Complaint,
    pub distance_km: f64,
}

/// Read-only radius search over complaint locations.
///
/// Distances are great-circle (haversine) kilometres computed in the
/// application over every stored location; nothing is precomputed.
#[derive(Clone)]
pub struct ProximityIndex {
    db: Arc<Database>,
}

impl ProximityIndex {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn nearby(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
    ) -> Result<Vec<NearbyMatch>, ApiError> {
        let origin = Coordinates::new(latitude, longitude)?;
        validate_radius(radius_km)?;

        let complaints = self
            .db
            .list_complaints()?
            .into_iter()
            .map(complaint_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rank_within(origin, radius_km, complaints))
    }
}

fn validate_radius(radius_km: f64) -> Result<(), ApiError> {
    if !radius_km.is_finite() || radius_km < 0.0 {
        return Err(ApiError::invalid("radius must be a non-negative number"));
    }
    Ok(())
}

/// Keep complaints within `radius_km` of `origin`, nearest first, ties by id.
pub fn rank_within(
    origin: Coordinates,
    radius_km: f64,
    complaints: Vec<Complaint>,
) -> Vec<NearbyMatch> {
    let mut matches: Vec<NearbyMatch> = complaints
        .into_iter()
        .filter_map(|complaint| {
            let here = Coordinates {
                latitude: complaint.latitude,
                longitude: complaint.longitude,
            };
            let distance_km = origin.distance_km(here);
            (distance_km <= radius_km).then_some(NearbyMatch {
                complaint,
                distance_km,
            })
        })
        .collect();

    matches.sort_by(|a, b| {
        a.distance_km
            .total_cmp(&b.distance_km)
            .then_with(|| a.complaint.id.cmp(&b.complaint.id))
    });
    matches
}

/// GET /complaints/nearby?latitude=&longitude=&radius=
pub async fn nearby_complaints(
    State(state): State<AppState>,
    query: Result<Query<NearbyQuery>, QueryRejection>,
) -> Result<Json<Vec<ComplaintResponse>>, ApiError> {
    let Query(q) = query?;

    let index = state.proximity.clone();
    let matches = run_blocking(move || index.nearby(q.latitude, q.longitude, q.radius)).await?;

    Ok(Json(
        matches
            .into_iter()
            .map(|m| ComplaintResponse {
                complaint: m.complaint,
                photo: None,
                distance_km: Some(m.distance_km),
            })
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::EARTH_RADIUS_KM;
    use chrono::Utc;
    use uuid::Uuid;

    fn ids(matches: &[NearbyMatch]) -> Vec<Uuid> {
        matches.iter().map(|m| m.complaint.id).collect()
    }

    /// A complaint `km` kilometres due north of the equator/prime-meridian origin.
    fn north_of_origin(km: f64, id: Uuid) -> Complaint {
        Complaint {
            id,
            kind: "pothole".into(),
            description: None,
            latitude: (km / EARTH_RADIUS_KM).to_degrees(),
            longitude: 0.0,
            owner_id: Uuid::nil(),
            photo_size: 1,
            created_at: Utc::now(),
        }
    }

    fn origin() -> Coordinates {
        Coordinates::new(0.0, 0.0).unwrap()
    }

    #[test]
    fn keeps_within_radius_nearest_first() {
        let (near, far, mid) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let complaints = vec![
            north_of_origin(1.0, near),
            north_of_origin(5.0, far),
            north_of_origin(3.0, mid),
        ];

        let matches = rank_within(origin(), 4.0, complaints);
        assert_eq!(ids(&matches), vec![near, mid]);
        assert!((matches[0].distance_km - 1.0).abs() < 1e-9);
        assert!((matches[1].distance_km - 3.0).abs() < 1e-9);
    }

    #[test]
    fn boundary_distance_is_included() {
        let c = north_of_origin(2.0, Uuid::new_v4());
        let exact = origin().distance_km(Coordinates {
            latitude: c.latitude,
            longitude: c.longitude,
        });
        assert_eq!(rank_within(origin(), exact, vec![c]).len(), 1);
    }

    #[test]
    fn ties_break_by_ascending_id() {
        let low = Uuid::from_u128(1);
        let high = Uuid::from_u128(2);
        let matches = rank_within(
            origin(),
            10.0,
            vec![north_of_origin(2.0, high), north_of_origin(2.0, low)],
        );
        assert_eq!(ids(&matches), vec![low, high]);
    }

    #[test]
    fn zero_radius_matches_only_the_exact_point() {
        let here = north_of_origin(0.0, Uuid::new_v4());
        let there = north_of_origin(0.5, Uuid::new_v4());
        let matches = rank_within(origin(), 0.0, vec![there, here.clone()]);
        assert_eq!(ids(&matches), vec![here.id]);
    }

    #[test]
    fn radius_must_be_non_negative_and_finite() {
        assert!(validate_radius(0.0).is_ok());
        assert!(validate_radius(-1.0).is_err());
        assert!(validate_radius(f64::NAN).is_err());
        assert!(validate_radius(f64::INFINITY).is_err());
    }
}
