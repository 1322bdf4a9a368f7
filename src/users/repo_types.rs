use sqlx::FromRow;

use crate::geo::Coordinates;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String, // Argon2 PHC string
    pub root_latitude: f64,
    pub root_longitude: f64,
    pub temp_latitude: Option<f64>,
    pub temp_longitude: Option<f64>,
    pub last_updated: Option<String>, // "YYYY-MM-DD HH:MM:SS", UTC
}

impl User {
    pub fn root_location(&self) -> Coordinates {
        Coordinates::new(self.root_latitude, self.root_longitude)
    }

    /// Current location, present only when both columns are set.
    pub fn temp_location(&self) -> Option<Coordinates> {
        match (self.temp_latitude, self.temp_longitude) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
            _ => None,
        }
    }
}

/// Fields for a registration insert.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub root: Coordinates,
}
