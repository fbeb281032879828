use std::str::FromStr;

use anyhow::{bail, Context};

use crate::models::{Category, Coordinate};

pub const DEFAULT_SHEET_ID: &str = "1CmhMm_RnnIfP71bliknEYy8HWDph2kUlXoIhAbYeJQE";
pub const DEFAULT_JITTER: f64 = 0.005;
pub const DEFAULT_DENSE_CITIES: [&str; 5] = ["Toronto", "Montreal", "Vancouver", "Ottawa", "Calgary"];

/// Settings for one pipeline run. Values can be overridden through
/// `ATLAS_*` environment variables.
#[derive(Debug, Clone)]
pub struct AtlasConfig {
    pub sheet_id: String,
    pub jitter: f64,
    pub dense_cities: Vec<String>,
    pub center: Coordinate,
    pub zoom: u8,
    pub min_zoom: u8,
    pub locate_max_zoom: u8,
    pub dense_radius_m: f64,
    pub request_radius_m: f64,
    pub volunteer_color: String,
    pub request_color: String,
    pub contact_email: String,
    pub volunteer_form_url: String,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            sheet_id: DEFAULT_SHEET_ID.to_string(),
            jitter: DEFAULT_JITTER,
            dense_cities: DEFAULT_DENSE_CITIES.iter().map(|c| c.to_string()).collect(),
            center: Coordinate {
                lat: 42.0,
                lon: -97.5,
            },
            zoom: 4,
            min_zoom: 3,
            locate_max_zoom: 13,
            dense_radius_m: 250.0,
            request_radius_m: 300.0,
            volunteer_color: "#00d700".to_string(),
            request_color: "#d77a00".to_string(),
            contact_email: "volunteers.atlas@gmail.com".to_string(),
            volunteer_form_url: "https://docs.google.com/forms/d/e/1FAIpQLSfw3LFsXtCCmr-ewkUuIltKIP5PKNY8Xn8h3MjVrFrvfvktPw/viewform".to_string(),
        }
    }
}

impl AtlasConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("ATLAS_SHEET_ID") {
            config.sheet_id = value;
        }
        if let Some(value) = parsed(&lookup, "ATLAS_JITTER")? {
            if !(0.0..1.0).contains(&value) {
                bail!("ATLAS_JITTER must be within [0, 1) degrees, got {value}");
            }
            config.jitter = value;
        }
        if let Some(value) = lookup("ATLAS_DENSE_CITIES") {
            config.dense_cities = value
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(value) = lookup("ATLAS_MAP_CENTER") {
            config.center = parse_center(&value).context("ATLAS_MAP_CENTER must be 'lat,lon'")?;
        }
        if let Some(value) = parsed(&lookup, "ATLAS_MAP_ZOOM")? {
            config.zoom = value;
        }
        if let Some(value) = parsed(&lookup, "ATLAS_MIN_ZOOM")? {
            config.min_zoom = value;
        }
        if let Some(value) = parsed(&lookup, "ATLAS_LOCATE_MAX_ZOOM")? {
            config.locate_max_zoom = value;
        }
        if let Some(value) = lookup("ATLAS_VOLUNTEER_COLOR") {
            config.volunteer_color = value;
        }
        if let Some(value) = lookup("ATLAS_REQUEST_COLOR") {
            config.request_color = value;
        }
        if let Some(value) = lookup("ATLAS_CONTACT_EMAIL") {
            config.contact_email = value;
        }
        if let Some(value) = lookup("ATLAS_VOLUNTEER_FORM_URL") {
            config.volunteer_form_url = value;
        }

        if config.min_zoom > config.zoom {
            bail!(
                "ATLAS_MIN_ZOOM ({}) must not exceed ATLAS_MAP_ZOOM ({})",
                config.min_zoom,
                config.zoom
            );
        }

        Ok(config)
    }

    pub fn color(&self, category: Category) -> &str {
        match category {
            Category::Volunteer => &self.volunteer_color,
            Category::Request => &self.request_color,
        }
    }
}

/// Membership test for the dense-city list, ignoring case and padding.
pub fn is_dense_city(dense_cities: &[String], city: &str) -> bool {
    dense_cities
        .iter()
        .any(|dense| dense.trim().eq_ignore_ascii_case(city.trim()))
}

fn parsed<F, T>(lookup: &F, key: &str) -> anyhow::Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(None),
    }
}

fn parse_center(value: &str) -> anyhow::Result<Coordinate> {
    let (lat, lon) = value.split_once(',').context("missing comma")?;
    Ok(Coordinate {
        lat: lat.trim().parse()?,
        lon: lon.trim().parse()?,
    })
}
