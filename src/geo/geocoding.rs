use std::net::IpAddr;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::Coordinates;
use crate::config::GeoConfig;

/// Resolves free-text addresses and caller network addresses to coordinates.
///
/// `Ok(None)` means the upstream service answered but had no usable result.
/// Transport and decoding failures are errors.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> anyhow::Result<Option<Coordinates>>;
    async fn locate_ip(&self, ip: Option<IpAddr>) -> anyhow::Result<Option<Coordinates>>;
}

pub struct HttpGeocoder {
    client: Client,
    config: GeoConfig,
}

impl HttpGeocoder {
    pub fn new(config: GeoConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .context("build http client")?;
        Ok(Self { client, config })
    }

    pub(crate) fn ip_lookup_url(&self, ip: Option<IpAddr>) -> String {
        let base = self.config.ip_geolocation_url.trim_end_matches('/');
        match ip.map(|ip| ip.to_canonical()).filter(is_public) {
            Some(ip) => format!("{}/{}/json", base, ip),
            None => format!("{}/json", base),
        }
    }
}

#[async_trait]
impl Geocoder for HttpGeocoder {
    async fn geocode(&self, address: &str) -> anyhow::Result<Option<Coordinates>> {
        let body: GeocodeResponse = self
            .client
            .get(&self.config.geocode_url)
            .query(&[("address", address), ("key", self.config.api_key.as_str())])
            .send()
            .await
            .context("geocode request")?
            .json()
            .await
            .context("decode geocode response")?;

        let coords = body.first_location();
        if coords.is_none() {
            warn!(status = %body.status, "geocode returned no location");
        } else {
            debug!(status = %body.status, "geocode ok");
        }
        Ok(coords)
    }

    async fn locate_ip(&self, ip: Option<IpAddr>) -> anyhow::Result<Option<Coordinates>> {
        let url = self.ip_lookup_url(ip);
        let body: IpLookupResponse = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("ip lookup {}", url))?
            .json()
            .await
            .context("decode ip lookup response")?;

        let coords = body.coordinates();
        if coords.is_none() {
            warn!(?ip, "ip lookup returned no location");
        }
        Ok(coords)
    }
}

fn is_public(ip: &IpAddr) -> bool {
    // Unwrap IPv4-mapped IPv6 (`::ffff:a.b.c.d`) so it gets the IPv4 checks.
    match ip.to_canonical() {
        IpAddr::V4(v4) => {
            !(v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast())
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            let unique_local = (first & 0xfe00) == 0xfc00;
            let link_local = (first & 0xffc0) == 0xfe80;
            !(v6.is_loopback() || v6.is_unspecified() || unique_local || link_local)
        }
    }
}

// ---- wire types ----

#[derive(Debug, Deserialize)]
pub(crate) struct GeocodeResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeocodeResult {
    pub geometry: Geometry,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Geometry {
    pub location: LatLng,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl GeocodeResponse {
    pub fn first_location(&self) -> Option<Coordinates> {
        if self.status != "OK" {
            return None;
        }
        self.results
            .first()
            .map(|r| Coordinates::new(r.geometry.location.lat, r.geometry.location.lng))
    }
}

/// ipinfo-style payload: `{"loc": "37.3860,-122.0838", ...}`.
#[derive(Debug, Deserialize)]
pub(crate) struct IpLookupResponse {
    pub loc: Option<String>,
}

impl IpLookupResponse {
    pub fn coordinates(&self) -> Option<Coordinates> {
        let (lat, lon) = self.loc.as_deref()?.split_once(',')?;
        let lat = lat.trim().parse::<f64>().ok()?;
        let lon = lon.trim().parse::<f64>().ok()?;
        Some(Coordinates::new(lat, lon))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geocoder() -> HttpGeocoder {
        HttpGeocoder::new(GeoConfig {
            api_key: "k".into(),
            geocode_url: "http://geocode.invalid/json".into(),
            ip_geolocation_url: "https://ipinfo.example/".into(),
            http_timeout_secs: 1,
        })
        .expect("client builds")
    }

    #[test]
    fn geocode_ok_takes_first_result() {
        let body: GeocodeResponse = serde_json::from_str(
            r#"{"status":"OK","results":[
                {"geometry":{"location":{"lat":12.97,"lng":77.59}}},
                {"geometry":{"location":{"lat":1.0,"lng":2.0}}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(body.first_location(), Some(Coordinates::new(12.97, 77.59)));
    }

    #[test]
    fn geocode_non_ok_status_is_absent() {
        let body: GeocodeResponse =
            serde_json::from_str(r#"{"status":"ZERO_RESULTS","results":[]}"#).unwrap();
        assert_eq!(body.first_location(), None);

        let body: GeocodeResponse = serde_json::from_str(
            r#"{"status":"REQUEST_DENIED","error_message":"bad key"}"#,
        )
        .unwrap();
        assert_eq!(body.first_location(), None);
    }

    #[test]
    fn geocode_ok_without_results_is_absent() {
        let body: GeocodeResponse = serde_json::from_str(r#"{"status":"OK"}"#).unwrap();
        assert_eq!(body.first_location(), None);
    }

    #[test]
    fn ip_lookup_parses_loc() {
        let body: IpLookupResponse =
            serde_json::from_str(r#"{"ip":"8.8.8.8","loc":"37.3860,-122.0838"}"#).unwrap();
        assert_eq!(body.coordinates(), Some(Coordinates::new(37.386, -122.0838)));
    }

    #[test]
    fn ip_lookup_without_loc_is_absent() {
        let body: IpLookupResponse = serde_json::from_str(r#"{"ip":"10.0.0.1","bogon":true}"#).unwrap();
        assert_eq!(body.coordinates(), None);

        let body: IpLookupResponse = serde_json::from_str(r#"{"loc":"garbage"}"#).unwrap();
        assert_eq!(body.coordinates(), None);
    }

    #[test]
    fn ip_lookup_url_uses_public_caller_address_only() {
        let g = geocoder();
        assert_eq!(
            g.ip_lookup_url(Some("8.8.8.8".parse().unwrap())),
            "https://ipinfo.example/8.8.8.8/json"
        );
        assert_eq!(
            g.ip_lookup_url(Some("127.0.0.1".parse().unwrap())),
            "https://ipinfo.example/json"
        );
        assert_eq!(
            g.ip_lookup_url(Some("192.168.1.20".parse().unwrap())),
            "https://ipinfo.example/json"
        );
        assert_eq!(g.ip_lookup_url(None), "https://ipinfo.example/json");
    }

    #[test]
    fn ip_lookup_url_skips_non_routable_ipv6() {
        let g = geocoder();
        for ip in ["fe80::1", "fd00::5", "::1", "::ffff:10.1.2.3", "::ffff:127.0.0.1"] {
            assert_eq!(
                g.ip_lookup_url(Some(ip.parse().unwrap())),
                "https://ipinfo.example/json",
                "{ip} should not be looked up directly"
            );
        }
        assert_eq!(
            g.ip_lookup_url(Some("2001:4860:4860::8888".parse().unwrap())),
            "https://ipinfo.example/2001:4860:4860::8888/json"
        );
        assert_eq!(
            g.ip_lookup_url(Some("::ffff:8.8.8.8".parse().unwrap())),
            "https://ipinfo.example/8.8.8.8/json"
        );
    }
}
