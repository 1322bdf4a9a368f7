use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct GeoConfig {
    pub api_key: String,
    pub geocode_url: String,
    pub ip_geolocation_url: String,
    pub http_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchConfig {
    /// Geofence radius used when the login form leaves it blank.
    pub default_radius_km: f64,
    /// Maximum distance between two users' root locations.
    pub root_radius_km: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    /// Take the caller address from `X-Forwarded-For`. Only safe behind a reverse proxy.
    pub trust_forwarded_for: bool,
    pub geo: GeoConfig,
    pub matching: MatchConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let geo = GeoConfig {
            api_key: std::env::var("GOOGLE_MAPS_API_KEY")?,
            geocode_url: std::env::var("GEOCODE_URL").unwrap_or_else(|_| {
                "https://maps.googleapis.com/maps/api/geocode/json".into()
            }),
            ip_geolocation_url: std::env::var("IP_GEOLOCATION_URL")
                .unwrap_or_else(|_| "https://ipinfo.io".into()),
            http_timeout_secs: parsed_or("HTTP_TIMEOUT_SECS", 10),
        };
        let matching = MatchConfig {
            default_radius_km: parsed_or("DEFAULT_RADIUS_KM", 1.0),
            root_radius_km: parsed_or("ROOT_RADIUS_KM", 50.0),
        };
        matching.validate()?;
        Ok(Self {
            database_url,
            db_max_connections: parsed_or("DB_MAX_CONNECTIONS", 10),
            trust_forwarded_for: parsed_or("TRUST_FORWARDED_FOR", false),
            geo,
            matching,
        })
    }
}

impl MatchConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [
            ("DEFAULT_RADIUS_KM", self.default_radius_km),
            ("ROOT_RADIUS_KM", self.root_radius_km),
        ] {
            if !value.is_finite() || value <= 0.0 {
                anyhow::bail!("{name} must be a positive number of kilometers, got {value}");
            }
        }
        Ok(())
    }
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_config_rejects_non_positive_thresholds() {
        let cfg = MatchConfig {
            default_radius_km: 0.0,
            root_radius_km: 50.0,
        };
        assert!(cfg.validate().is_err());

        let cfg = MatchConfig {
            default_radius_km: 1.0,
            root_radius_km: f64::NAN,
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn match_config_accepts_defaults() {
        let cfg = MatchConfig {
            default_radius_km: 1.0,
            root_radius_km: 50.0,
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn parsed_or_falls_back_on_missing_key() {
        let v: f64 = parsed_or("GEOFENCE_TEST_SURELY_UNSET_KEY", 2.5);
        assert_eq!(v, 2.5);
    }
}
