use crate::geo::{haversine_km, Coordinates};
use crate::users::repo_types::User;

/// Search bounds for one nearby-users lookup.
#[derive(Debug, Clone, Copy)]
pub struct MatchQuery {
    pub temp: Coordinates,
    pub root: Coordinates,
    pub radius_km: f64,
    pub root_radius_km: f64,
}

/// Keep users whose current location is strictly within `radius_km` of the
/// requester's current location and whose root location is strictly within
/// `root_radius_km` of the requester's root. Input order is preserved.
pub fn find_nearby(candidates: Vec<User>, q: &MatchQuery) -> Vec<User> {
    candidates
        .into_iter()
        .filter(|user| {
            let Some(temp) = user.temp_location() else {
                return false;
            };
            haversine_km(q.temp, temp) < q.radius_km
                && haversine_km(q.root, user.root_location()) < q.root_radius_km
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, root: (f64, f64), temp: Option<(f64, f64)>) -> User {
        User {
            id,
            name: format!("user{id}"),
            email: format!("user{id}@example.com"),
            password_hash: String::new(),
            root_latitude: root.0,
            root_longitude: root.1,
            temp_latitude: temp.map(|t| t.0),
            temp_longitude: temp.map(|t| t.1),
            last_updated: temp.map(|_| "2024-01-01 00:00:00".to_string()),
        }
    }

    fn query(radius_km: f64) -> MatchQuery {
        MatchQuery {
            temp: Coordinates::new(0.0, 0.0),
            root: Coordinates::new(0.0, 0.0),
            radius_km,
            root_radius_km: 50.0,
        }
    }

    #[test]
    fn far_root_is_excluded_even_when_current_location_coincides() {
        let candidates = vec![
            user(1, (0.0, 0.0), Some((0.0, 0.001))),
            user(2, (10.0, 10.0), Some((0.0, 0.001))),
        ];
        let ids: Vec<i64> = find_nearby(candidates, &query(1.0))
            .iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn far_current_location_is_excluded() {
        // 0.05 degrees of longitude on the equator is about 5.6 km.
        let candidates = vec![user(1, (0.0, 0.0), Some((0.0, 0.05)))];
        assert!(find_nearby(candidates.clone(), &query(1.0)).is_empty());
        assert_eq!(find_nearby(candidates, &query(10.0)).len(), 1);
    }

    #[test]
    fn users_without_current_location_never_match() {
        let candidates = vec![user(1, (0.0, 0.0), None)];
        assert!(find_nearby(candidates, &query(20_000.0)).is_empty());
    }

    #[test]
    fn bounds_are_strict() {
        let candidates = vec![user(1, (0.0, 0.0), Some((0.0, 0.0)))];
        assert!(find_nearby(candidates.clone(), &query(0.0)).is_empty());
        assert_eq!(find_nearby(candidates, &query(0.0001)).len(), 1);
    }

    #[test]
    fn preserves_storage_order() {
        let candidates = vec![
            user(3, (0.0, 0.0), Some((0.0, 0.002))),
            user(1, (0.0, 0.0), Some((0.0, 0.001))),
            user(2, (0.0, 0.0), Some((0.001, 0.0))),
        ];
        let ids: Vec<i64> = find_nearby(candidates, &query(1.0))
            .iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }
}
