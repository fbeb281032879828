use std::collections::HashSet;

use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use tracing::info;

use crate::error::AtlasError;
use crate::models::{Category, Coordinate, Flag, Record};
use crate::source::TableSource;

/// First synthesized identifier; keeps generated ids clear of small
/// row numbers shown anywhere else.
pub const ID_OFFSET: u64 = 100_000;

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "ID", default)]
    id: Option<String>,
    #[serde(rename = "Timestamp")]
    timestamp: Option<String>,
    #[serde(rename = "Given Name")]
    name: Option<String>,
    #[serde(rename = "Country")]
    country: Option<String>,
    #[serde(rename = "City/Town")]
    city: Option<String>,
    #[serde(rename = "About Me", default)]
    about: Option<String>,
    #[serde(rename = "Email Address")]
    email: Option<String>,
    #[serde(rename = "Type of Services", default)]
    services: Option<String>,
    #[serde(rename = "Mode of Transportation", default)]
    transportation: Option<String>,
    #[serde(rename = "Reimbursement Method", default)]
    reimbursement: Option<String>,
    #[serde(rename = "Languages Spoken", default)]
    languages: Option<String>,
    #[serde(rename = "Preferred Day of Week", default)]
    preferred_days: Option<String>,
    #[serde(rename = "Preferred Time of Day", default)]
    preferred_times: Option<String>,
    #[serde(rename = "Radius", default)]
    radius: Option<String>,
    #[serde(rename = "Latitude", default)]
    latitude: Option<String>,
    #[serde(rename = "Longtitude", default)]
    longitude: Option<String>,
    #[serde(rename = "Health", default)]
    health: Option<String>,
    #[serde(rename = "Availability", default)]
    availability: Option<String>,
}

/// Columns every registration export carries; a body without them is not a
/// worksheet export (for example a sign-in page served for a private sheet).
pub const REQUIRED_COLUMNS: [&str; 2] = ["Timestamp", "City/Town"];

/// Fetches and normalizes both registration tables. Identifiers are unique
/// across both tables: Requests continue numbering after Volunteers.
pub async fn load_all<S: TableSource>(source: &S) -> Result<(Vec<Record>, Vec<Record>), AtlasError> {
    let volunteer_body = fetch_export(source, Category::Volunteer).await?;
    let request_body = fetch_export(source, Category::Request).await?;

    let volunteers = parse_table(&volunteer_body, Category::Volunteer, ID_OFFSET)?;
    let requests = parse_table(&request_body, Category::Request, ID_OFFSET + volunteers.len() as u64)?;
    info!(
        volunteers = volunteers.len(),
        requests = requests.len(),
        "loaded worksheets"
    );

    if volunteers.is_empty() && requests.is_empty() {
        return Err(AtlasError::SourceUnavailable {
            source_id: source.source_id(),
            reason: "no rows in either table".to_string(),
        });
    }

    let volunteer_ids: HashSet<u64> = volunteers.iter().map(|r| r.id).collect();
    if let Some(clash) = requests.iter().find(|r| volunteer_ids.contains(&r.id)) {
        return Err(AtlasError::MalformedField {
            table: Category::Request.table_name().to_string(),
            record: clash.id,
            field: "ID",
            value: "identifier already used in Volunteers".to_string(),
        });
    }

    Ok((volunteers, requests))
}

async fn fetch_export<S: TableSource>(source: &S, category: Category) -> Result<String, AtlasError> {
    let table = category.table_name();
    let body = source.fetch_table(table).await?;
    if !has_registration_header(&body) {
        return Err(AtlasError::SourceUnavailable {
            source_id: source.source_id(),
            reason: format!("worksheet '{table}' did not return a registration export"),
        });
    }
    Ok(body)
}

pub fn has_registration_header(body: &str) -> bool {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(body.as_bytes());
    match reader.headers() {
        Ok(headers) => REQUIRED_COLUMNS
            .iter()
            .all(|column| headers.iter().any(|header| header == *column)),
        Err(_) => false,
    }
}

/// Parses one worksheet export, numbering rows without an `ID` from
/// `first_id`. Any malformed field aborts the whole table.
pub fn parse_table(body: &str, category: Category, first_id: u64) -> Result<Vec<Record>, AtlasError> {
    let table = category.table_name();
    let row_error = |record: u64, err: csv::Error| AtlasError::MalformedField {
        table: table.to_string(),
        record,
        field: "row",
        value: err.to_string(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(body.as_bytes());
    let headers = reader.headers().map_err(|err| row_error(first_id, err))?.clone();

    let mut records = Vec::new();
    let mut seen = HashSet::new();

    for result in reader.records() {
        let fallback_id = first_id + records.len() as u64;
        let row = result.map_err(|err| row_error(fallback_id, err))?;
        if row.iter().all(|field| field.is_empty()) {
            continue;
        }

        let raw: RawRow = row
            .deserialize(Some(&headers))
            .map_err(|err| row_error(fallback_id, err))?;
        let record = normalize(raw, category, fallback_id)?;

        if !seen.insert(record.id) {
            return Err(AtlasError::MalformedField {
                table: table.to_string(),
                record: record.id,
                field: "ID",
                value: "duplicate identifier".to_string(),
            });
        }
        records.push(record);
    }

    Ok(records)
}

fn normalize(raw: RawRow, category: Category, fallback_id: u64) -> Result<Record, AtlasError> {
    let table = category.table_name();
    let malformed = |record: u64, field: &'static str, value: &str| AtlasError::MalformedField {
        table: table.to_string(),
        record,
        field,
        value: value.to_string(),
    };

    let id = match present(&raw.id) {
        Some(value) => value
            .parse::<u64>()
            .map_err(|_| malformed(fallback_id, "ID", value))?,
        None => fallback_id,
    };

    let timestamp = present(&raw.timestamp).unwrap_or_default();
    let submitted_at = parse_timestamp(timestamp).ok_or_else(|| malformed(id, "Timestamp", timestamp))?;

    let radius_km = match present(&raw.radius) {
        Some(value) => Some(parse_radius(value).ok_or_else(|| malformed(id, "Radius", value))?),
        None => None,
    };

    let latitude = parse_degrees(present(&raw.latitude)).map_err(|value| malformed(id, "Latitude", value))?;
    let longitude = parse_degrees(present(&raw.longitude)).map_err(|value| malformed(id, "Longtitude", value))?;
    let coordinate = match (latitude, longitude) {
        (Some(lat), Some(lon)) => Some(Coordinate { lat, lon }),
        (None, None) => None,
        (Some(_), None) => return Err(malformed(id, "Longtitude", "")),
        (None, Some(_)) => return Err(malformed(id, "Latitude", "")),
    };

    Ok(Record {
        id,
        category,
        name: text(raw.name),
        country: text(raw.country),
        city: title_case(&text(raw.city)),
        about: text(raw.about),
        email: text(raw.email),
        services: text(raw.services),
        transportation: text(raw.transportation),
        reimbursement: text(raw.reimbursement),
        languages: text(raw.languages),
        preferred_days: text(raw.preferred_days),
        preferred_times: text(raw.preferred_times),
        radius_km,
        coordinate,
        health: Flag::from_cell(raw.health.as_deref()),
        availability: Flag::from_cell(raw.availability.as_deref()),
        submitted_at,
    })
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn text(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

/// Parses values such as `"10km"` or `"2.5 km"` into kilometers.
pub fn parse_radius(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    let number = match trimmed.len().checked_sub(2) {
        Some(split) if trimmed.is_char_boundary(split) && trimmed[split..].eq_ignore_ascii_case("km") => {
            &trimmed[..split]
        }
        _ => trimmed,
    };
    number
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|km| km.is_finite() && *km >= 0.0)
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_utc());
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

fn parse_degrees(value: Option<&str>) -> Result<Option<f64>, &str> {
    match value {
        None => Ok(None),
        Some(raw) => raw
            .parse::<f64>()
            .ok()
            .filter(|deg| deg.is_finite())
            .map(Some)
            .ok_or(raw),
    }
}

/// Capitalizes the first letter of every word, lowercasing the rest.
pub fn title_case(value: &str) -> String {
    let mut output = String::with_capacity(value.len());
    let mut at_word_start = true;
    for ch in value.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                output.extend(ch.to_uppercase());
            } else {
                output.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            output.push(ch);
            at_word_start = true;
        }
    }
    output
}
