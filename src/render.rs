use std::fmt::Write;

use serde::Serialize;
use uuid::Uuid;

use crate::config::AtlasConfig;
use crate::i18n::Language;
use crate::models::{Category, ClusterGroup, Coordinate, PopupEntry, PopupValue};

const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";
const CLUSTER_CSS: &str = "https://unpkg.com/leaflet.markercluster@1.5.3/dist/MarkerCluster.Default.css";
const CLUSTER_BASE_CSS: &str = "https://unpkg.com/leaflet.markercluster@1.5.3/dist/MarkerCluster.css";
const CLUSTER_JS: &str = "https://unpkg.com/leaflet.markercluster@1.5.3/dist/leaflet.markercluster.js";
const LOCATE_CSS: &str = "https://cdn.jsdelivr.net/npm/leaflet.locatecontrol@0.79.0/dist/L.Control.Locate.min.css";
const LOCATE_JS: &str = "https://cdn.jsdelivr.net/npm/leaflet.locatecontrol@0.79.0/dist/L.Control.Locate.min.js";
const TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
const TILE_ATTRIBUTION: &str = "&copy; OpenStreetMap contributors";

/// Base map placement and zoom limits.
#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    pub center: Coordinate,
    pub zoom: u8,
    pub min_zoom: u8,
    pub locate_max_zoom: u8,
}

impl MapView {
    pub fn from_config(config: &AtlasConfig) -> Self {
        Self {
            center: config.center,
            zoom: config.zoom,
            min_zoom: config.min_zoom,
            locate_max_zoom: config.locate_max_zoom,
        }
    }
}

#[derive(Serialize)]
struct RenderedMarker<'a> {
    lat: f64,
    lon: f64,
    radius: f64,
    color: &'a str,
    popup: String,
}

/// Renders cluster groups into a standalone Leaflet document.
///
/// Output depends only on the inputs: element ids are name-based UUIDs, so two
/// renders of the same groups are byte-identical.
pub fn render_map(groups: &[ClusterGroup], view: &MapView, language: Language, notice: Option<&str>) -> String {
    let map_id = element_id("map", "atlas");
    let mut output = String::new();

    let _ = writeln!(output, "<!DOCTYPE html>");
    let _ = writeln!(output, "<html lang=\"{}\">", language.code());
    let _ = writeln!(output, "<head>");
    let _ = writeln!(output, "<meta charset=\"utf-8\" />");
    let _ = writeln!(
        output,
        "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\" />"
    );
    for stylesheet in [LEAFLET_CSS, CLUSTER_BASE_CSS, CLUSTER_CSS, LOCATE_CSS] {
        let _ = writeln!(output, "<link rel=\"stylesheet\" href=\"{stylesheet}\" />");
    }
    for script in [LEAFLET_JS, CLUSTER_JS, LOCATE_JS] {
        let _ = writeln!(output, "<script src=\"{script}\"></script>");
    }
    let _ = writeln!(
        output,
        "<style>html, body {{ width: 100%; height: 100%; margin: 0; padding: 0; }} \
         #{map_id} {{ position: absolute; top: 0; bottom: 0; left: 0; right: 0; }} \
         .atlas-notice {{ position: absolute; z-index: 1000; top: 10px; left: 50%; transform: translateX(-50%); \
         background: #fff3cd; border: 1px solid #d7a500; padding: 6px 12px; font-family: sans-serif; }}</style>"
    );
    let _ = writeln!(output, "</head>");
    let _ = writeln!(output, "<body>");

    if let Some(notice) = notice {
        let _ = writeln!(output, "<div class=\"atlas-notice\" role=\"alert\">{}</div>", html_escape::encode_text(notice));
    }
    let _ = writeln!(output, "<div id=\"{map_id}\"></div>");
    let _ = writeln!(output, "<script>");
    let _ = writeln!(
        output,
        "var {map_id} = L.map(\"{map_id}\", {{center: [{}, {}], zoom: {}, minZoom: {}, zoomControl: true}});",
        view.center.lat, view.center.lon, view.zoom, view.min_zoom
    );
    let _ = writeln!(output, "L.control.scale().addTo({map_id});");
    let _ = writeln!(
        output,
        "L.tileLayer({}, {{attribution: {}}}).addTo({map_id});",
        js_string(TILE_URL),
        js_string(TILE_ATTRIBUTION)
    );
    let _ = writeln!(output, "var overlays = {{}};");

    for group in groups {
        let cluster_id = element_id("marker_cluster", category_key(group.category));
        let markers: Vec<RenderedMarker<'_>> = group
            .markers
            .iter()
            .map(|marker| RenderedMarker {
                lat: marker.lat,
                lon: marker.lon,
                radius: marker.radius_m,
                color: &marker.color,
                popup: popup_html(&marker.popup),
            })
            .collect();

        let _ = writeln!(
            output,
            "var {cluster_id} = L.markerClusterGroup({{showCoverageOnHover: false}});"
        );
        let _ = writeln!(output, "var {cluster_id}_data = {};", js_json(&markers));
        let _ = writeln!(
            output,
            "{cluster_id}_data.forEach(function (m) {{ L.circle([m.lat, m.lon], {{radius: m.radius, color: m.color, fill: true, fillColor: m.color}}).bindPopup(m.popup, {{maxWidth: 250}}).addTo({cluster_id}); }});"
        );
        let _ = writeln!(output, "{cluster_id}.addTo({map_id});");
        let _ = writeln!(output, "overlays[{}] = {cluster_id};", js_string(&group.name));
    }

    let _ = writeln!(output, "L.control.layers(null, overlays, {{collapsed: true}}).addTo({map_id});");
    let _ = writeln!(
        output,
        "L.control.locate({{flyTo: true, keepCurrentZoomLevel: false, showPopup: true, returnToPrevBounds: true, locateOptions: {{maxZoom: {}}}}}).addTo({map_id});",
        view.locate_max_zoom
    );
    let _ = writeln!(output, "</script>");
    let _ = writeln!(output, "</body>");
    let _ = writeln!(output, "</html>");

    output
}

fn popup_html(entries: &[PopupEntry]) -> String {
    let mut html = String::from("<div style=\"font-size:14px;font-family:sans-serif\">");
    for entry in entries {
        match &entry.value {
            PopupValue::Text { text } => {
                let _ = write!(
                    html,
                    "<b>{}:</b> {} <br>",
                    html_escape::encode_text(&entry.label),
                    html_escape::encode_text(text)
                );
            }
            PopupValue::Link { href, text } => {
                let _ = write!(
                    html,
                    "<a href=\"{}\" target=\"_blank\">{}</a> <br>",
                    html_escape::encode_double_quoted_attribute(href),
                    html_escape::encode_text(text)
                );
            }
        }
    }
    html.push_str("</div>");
    html
}

fn category_key(category: Category) -> &'static str {
    match category {
        Category::Volunteer => "volunteers",
        Category::Request => "requests",
    }
}

fn element_id(prefix: &str, name: &str) -> String {
    let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("{prefix}:{name}").as_bytes());
    format!("{prefix}_{}", id.simple())
}

fn js_string(value: &str) -> String {
    js_json(&value)
}

/// JSON literal safe to embed inside a `<script>` element.
fn js_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace("</", "<\\/")
}
