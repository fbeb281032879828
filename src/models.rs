use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    Volunteer,
    Request,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Volunteer, Category::Request];

    /// Worksheet title holding this category's registrations.
    pub fn table_name(self) -> &'static str {
        match self {
            Category::Volunteer => "Volunteers",
            Category::Request => "Requests",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    Eligible,
    Ineligible,
}

impl Flag {
    pub fn from_cell(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "yes" || v == "true" || v == "eligible" => Flag::Eligible,
            _ => Flag::Ineligible,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: u64,
    pub category: Category,
    pub name: String,
    pub country: String,
    pub city: String,
    pub about: String,
    pub email: String,
    pub services: String,
    pub transportation: String,
    pub reimbursement: String,
    pub languages: String,
    pub preferred_days: String,
    pub preferred_times: String,
    pub radius_km: Option<f64>,
    pub coordinate: Option<Coordinate>,
    pub health: Flag,
    pub availability: Flag,
    pub submitted_at: NaiveDateTime,
}

/// A record paired with its display position for one render pass.
#[derive(Debug, Clone)]
pub struct JitteredRecord<'a> {
    pub record: &'a Record,
    pub position: Option<Coordinate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PopupValue {
    Text { text: String },
    Link { href: String, text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopupEntry {
    pub label: String,
    pub value: PopupValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerDescriptor {
    pub record_id: u64,
    pub category: Category,
    pub lat: f64,
    pub lon: f64,
    pub radius_m: f64,
    pub color: String,
    pub popup: Vec<PopupEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterGroup {
    pub category: Category,
    pub name: String,
    pub markers: Vec<MarkerDescriptor>,
}
