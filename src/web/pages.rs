use std::fmt::Write;

use reqwest::Url;

use crate::geo::Coordinates;
use crate::users::dto::LoginOutcome;
use crate::users::repo_types::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Login,
    Register,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl NoticeLevel {
    fn css_class(self) -> &'static str {
        match self {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "success",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        }
    }
}

/// An inline message shown above a form or result.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    fn render(&self) -> String {
        format!(
            r#"<div class="notice {}">{}</div>"#,
            self.level.css_class(),
            escape_html(&self.message)
        )
    }
}

const STYLE: &str = "body{font-family:sans-serif;max-width:760px;margin:2rem auto;padding:0 1rem}\
label{display:block;margin:.6rem 0}input[type=text],input[type=email],input[type=password],\
input[type=number]{width:100%;padding:.4rem}.notice{padding:.6rem;margin:.8rem 0;border-radius:4px}\
.info{background:#e7f1fb}.success{background:#e6f6e6}.warning{background:#fff4d6}\
.error{background:#fde2e2}nav a{margin-right:1rem}nav a.active{font-weight:bold}";

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// JSON-encode a value for inline `<script>` use.
fn js_literal<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".into())
        .replace("</", "<\\/")
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>{STYLE}</style>
</head>
<body>
<h1>Global Geofencing App</h1>
{body}
</body>
</html>"#,
        title = escape_html(title),
    )
}

fn selector(active: Page) -> String {
    let class = |p: Page| if p == active { " class=\"active\"" } else { "" };
    format!(
        r#"<nav><a href="/login"{}>Login</a><a href="/register"{}>Register</a></nav>"#,
        class(Page::Login),
        class(Page::Register)
    )
}

fn login_form() -> &'static str {
    r#"<h2>Login</h2>
<form method="post" action="/login">
<label>Email <input type="email" name="email" placeholder="Enter your email address"></label>
<label>Password <input type="password" name="password" placeholder="Enter your password"></label>
<fieldset>
<legend>How do you want to set your current location?</legend>
<label><input type="radio" name="location_mode" value="auto" checked> Auto-detect</label>
<label><input type="radio" name="location_mode" value="manual"> Manual entry</label>
<label>Current location <input type="text" name="address" placeholder="Enter your current location"></label>
</fieldset>
<label>Radius (km) to find nearby users <input type="number" name="radius_km" step="any" min="0"></label>
<button type="submit">Login</button>
</form>"#
}

fn register_form() -> &'static str {
    r#"<h2>Register</h2>
<form method="post" action="/register">
<label>Name <input type="text" name="name"></label>
<label>Email <input type="email" name="email"></label>
<label>Password <input type="password" name="password"></label>
<label>Root (home) location <input type="text" name="address" placeholder="Enter your root (home) location"></label>
<button type="submit">Register</button>
</form>"#
}

/// The selector plus one form, with an optional notice above it.
pub fn form_page(page: Page, notice: Option<&Notice>) -> String {
    let (title, form) = match page {
        Page::Login => ("Login", login_form()),
        Page::Register => ("Register", register_form()),
    };
    let notice = notice.map(Notice::render).unwrap_or_default();
    layout(title, &format!("{}\n{}\n{}", selector(page), notice, form))
}

/// External map link for a user's current location.
pub fn tracking_link(at: Coordinates) -> String {
    let q = format!("{},{}", at.latitude, at.longitude);
    match Url::parse_with_params("https://www.google.com/maps", &[("q", q.as_str())]) {
        Ok(url) => url.to_string(),
        Err(_) => "https://www.google.com/maps".into(),
    }
}

fn nearby_list(nearby: &[User]) -> String {
    if nearby.is_empty() {
        return Notice::info("No nearby users found.").render();
    }
    let mut out = String::from("<h3>Nearby Users</h3>\n<ul class=\"nearby\">\n");
    for user in nearby {
        let Some(at) = user.temp_location() else {
            continue;
        };
        let _ = writeln!(
            out,
            r#"<li>{}: <a href="{}" target="_blank" rel="noopener">Track Location</a></li>"#,
            escape_html(&user.name),
            escape_html(&tracking_link(at))
        );
    }
    out.push_str("</ul>");
    out
}

/// Embedded map: red self marker, blue marker per match, geofence circle in meters.
pub fn map_widget(api_key: &str, center: Coordinates, radius_km: f64, nearby: &[User]) -> String {
    let markers: Vec<serde_json::Value> = nearby
        .iter()
        .filter_map(|u| {
            u.temp_location().map(|at| {
                serde_json::json!({ "lat": at.latitude, "lng": at.longitude, "title": u.name })
            })
        })
        .collect();
    let center_js = js_literal(&serde_json::json!({ "lat": center.latitude, "lng": center.longitude }));
    let script_src = Url::parse_with_params(
        "https://maps.googleapis.com/maps/api/js",
        &[("key", api_key), ("callback", "initMap")],
    )
    .map(|u| u.to_string())
    .unwrap_or_default();

    format!(
        r#"<div id="map" style="height: 450px;"></div>
<script>
function initMap() {{
  var userLocation = {center};
  var map = new google.maps.Map(document.getElementById('map'), {{ zoom: 14, center: userLocation }});
  new google.maps.Marker({{
    position: userLocation, map: map, title: 'Your Current Location',
    icon: 'https://maps.google.com/mapfiles/ms/icons/red-dot.png'
  }});
  new google.maps.Circle({{
    strokeColor: '#FF0000', strokeOpacity: 0.8, strokeWeight: 2,
    fillColor: '#FF0000', fillOpacity: 0.2,
    map: map, center: userLocation, radius: {radius_m}
  }});
  {markers}.forEach(function (m) {{
    new google.maps.Marker({{
      position: {{ lat: m.lat, lng: m.lng }}, map: map, title: m.title,
      icon: 'https://maps.google.com/mapfiles/ms/icons/blue-dot.png'
    }});
  }});
}}
</script>
<script async defer src="{src}"></script>"#,
        center = center_js,
        radius_m = js_literal(&(radius_km * 1000.0)),
        markers = js_literal(&markers),
        src = escape_html(&script_src),
    )
}

pub fn result_page(api_key: &str, outcome: &LoginOutcome) -> String {
    let mut body = selector(Page::Login);
    body.push('\n');
    body.push_str(&Notice::success(format!("Welcome, {}!", outcome.user.name)).render());
    body.push('\n');
    body.push_str(&nearby_list(&outcome.nearby));
    if let Some(groups) = &outcome.groups {
        body.push('\n');
        body.push_str(
            &Notice::info(format!(
                "Nearby users form {} group(s); {} not grouped.",
                groups.groups, groups.noise
            ))
            .render(),
        );
    }
    body.push('\n');
    body.push_str(&map_widget(
        api_key,
        outcome.location,
        outcome.radius_km,
        &outcome.nearby,
    ));
    layout("Nearby users", &body)
}
