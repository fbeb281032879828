use crate::config::{is_dense_city, AtlasConfig};
use crate::error::AtlasError;
use crate::i18n::{label, LabelKey, Language};
use crate::models::{Category, ClusterGroup, JitteredRecord, MarkerDescriptor, PopupEntry, PopupValue, Record};

/// How the visible circle radius is derived for a category.
#[derive(Debug, Clone, PartialEq)]
pub enum RadiusRule {
    /// Records in a dense city get `dense_m`; everyone else is drawn at their
    /// declared service radius.
    DenseOrDeclared { dense_m: f64, dense_cities: Vec<String> },
    Fixed(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupField {
    Name,
    CategoryLabel,
    Country,
    City,
    Services,
    Transportation,
    Radius,
    DayOfWeek,
    TimeOfDay,
    Languages,
    Payment,
    AboutMe,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PopupLink {
    /// Prefilled mail to the record's address, copying the atlas inbox.
    Contact { cc: String },
    /// Generic link to the volunteer signup form; carries nothing personal.
    SignUp { url: String },
}

/// Declarative per-category marker settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryProfile {
    pub category: Category,
    pub layer: LabelKey,
    pub color: String,
    pub radius: RadiusRule,
    pub fields: Vec<PopupField>,
    pub required: Vec<PopupField>,
    pub link: PopupLink,
}

impl CategoryProfile {
    pub fn for_category(category: Category, config: &AtlasConfig) -> Self {
        match category {
            Category::Volunteer => Self {
                category,
                layer: LabelKey::VolunteersLayer,
                color: config.color(category).to_string(),
                radius: RadiusRule::DenseOrDeclared {
                    dense_m: config.dense_radius_m,
                    dense_cities: config.dense_cities.clone(),
                },
                fields: vec![
                    PopupField::Name,
                    PopupField::Country,
                    PopupField::City,
                    PopupField::Services,
                    PopupField::Transportation,
                    PopupField::Radius,
                    PopupField::DayOfWeek,
                    PopupField::TimeOfDay,
                    PopupField::Languages,
                    PopupField::Payment,
                    PopupField::AboutMe,
                ],
                required: vec![PopupField::Name, PopupField::City, PopupField::Radius],
                link: PopupLink::Contact {
                    cc: config.contact_email.clone(),
                },
            },
            Category::Request => Self {
                category,
                layer: LabelKey::RequestsLayer,
                color: config.color(category).to_string(),
                radius: RadiusRule::Fixed(config.request_radius_m),
                fields: vec![
                    PopupField::CategoryLabel,
                    PopupField::Country,
                    PopupField::City,
                    PopupField::Services,
                    PopupField::Transportation,
                    PopupField::DayOfWeek,
                    PopupField::TimeOfDay,
                    PopupField::Languages,
                    PopupField::Payment,
                ],
                required: vec![PopupField::City],
                link: PopupLink::SignUp {
                    url: config.volunteer_form_url.clone(),
                },
            },
        }
    }
}

/// Turns eligible records into one cluster group. Pure: the same input
/// always yields identical descriptors.
pub fn build_cluster_group(
    items: &[JitteredRecord<'_>],
    profile: &CategoryProfile,
    language: Language,
) -> Result<ClusterGroup, AtlasError> {
    let markers = items
        .iter()
        .map(|item| build_marker(item, profile, language))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ClusterGroup {
        category: profile.category,
        name: label(profile.layer, language).to_string(),
        markers,
    })
}

fn build_marker(
    item: &JitteredRecord<'_>,
    profile: &CategoryProfile,
    language: Language,
) -> Result<MarkerDescriptor, AtlasError> {
    let record = item.record;
    let position = item.position.ok_or(AtlasError::MissingField {
        table: record.category.table_name(),
        record: record.id,
        field: "Latitude",
    })?;

    for field in &profile.required {
        if field_value(record, *field, language).is_none() {
            return Err(AtlasError::MissingField {
                table: record.category.table_name(),
                record: record.id,
                field: source_column(*field),
            });
        }
    }

    Ok(MarkerDescriptor {
        record_id: record.id,
        category: profile.category,
        lat: position.lat,
        lon: position.lon,
        radius_m: visible_radius(record, &profile.radius)?,
        color: profile.color.clone(),
        popup: popup_entries(record, profile, language)?,
    })
}

pub fn visible_radius(record: &Record, rule: &RadiusRule) -> Result<f64, AtlasError> {
    match rule {
        RadiusRule::Fixed(radius) => Ok(*radius),
        RadiusRule::DenseOrDeclared { dense_m, dense_cities } => {
            if is_dense_city(dense_cities, &record.city) {
                return Ok(*dense_m);
            }
            let km = record.radius_km.ok_or(AtlasError::MissingField {
                table: record.category.table_name(),
                record: record.id,
                field: "Radius",
            })?;
            Ok(km * 1000.0)
        }
    }
}

fn popup_entries(
    record: &Record,
    profile: &CategoryProfile,
    language: Language,
) -> Result<Vec<PopupEntry>, AtlasError> {
    let mut entries: Vec<PopupEntry> = profile
        .fields
        .iter()
        .filter_map(|field| {
            field_value(record, *field, language).map(|text| PopupEntry {
                label: label(field_label(*field), language).to_string(),
                value: PopupValue::Text { text },
            })
        })
        .collect();

    let link = match &profile.link {
        PopupLink::Contact { cc } => {
            if record.email.is_empty() {
                return Err(AtlasError::MissingField {
                    table: record.category.table_name(),
                    record: record.id,
                    field: "Email Address",
                });
            }
            let subject = format!("Delivery Request for {}", record.name);
            PopupEntry {
                label: label(LabelKey::Contact, language).to_string(),
                value: PopupValue::Link {
                    href: format!(
                        "mailto:{}?cc={}&Subject={}",
                        record.email,
                        cc,
                        urlencoding::encode(&subject)
                    ),
                    text: format!("{} {}", label(LabelKey::Contact, language), record.name),
                },
            }
        }
        PopupLink::SignUp { url } => PopupEntry {
            label: label(LabelKey::SignUpToHelp, language).to_string(),
            value: PopupValue::Link {
                href: url.clone(),
                text: label(LabelKey::SignUpToHelp, language).to_string(),
            },
        },
    };
    entries.push(link);

    Ok(entries)
}

fn field_value(record: &Record, field: PopupField, language: Language) -> Option<String> {
    let text = match field {
        PopupField::Name => record.name.clone(),
        PopupField::CategoryLabel => label(LabelKey::DeliveryRequest, language).to_string(),
        PopupField::Country => record.country.clone(),
        PopupField::City => record.city.clone(),
        PopupField::Services => record.services.clone(),
        PopupField::Transportation => record.transportation.clone(),
        PopupField::Radius => return record.radius_km.map(|km| format!("{km} km")),
        PopupField::DayOfWeek => record.preferred_days.clone(),
        PopupField::TimeOfDay => record.preferred_times.clone(),
        PopupField::Languages => record.languages.clone(),
        PopupField::Payment => record.reimbursement.clone(),
        PopupField::AboutMe => record.about.clone(),
    };
    (!text.is_empty()).then_some(text)
}

fn field_label(field: PopupField) -> LabelKey {
    match field {
        PopupField::Name => LabelKey::Name,
        PopupField::CategoryLabel => LabelKey::Category,
        PopupField::Country => LabelKey::Country,
        PopupField::City => LabelKey::City,
        PopupField::Services => LabelKey::Services,
        PopupField::Transportation => LabelKey::Transportation,
        PopupField::Radius => LabelKey::Radius,
        PopupField::DayOfWeek => LabelKey::DayOfWeek,
        PopupField::TimeOfDay => LabelKey::TimeOfDay,
        PopupField::Languages => LabelKey::Languages,
        PopupField::Payment => LabelKey::Payment,
        PopupField::AboutMe => LabelKey::AboutMe,
    }
}

fn source_column(field: PopupField) -> &'static str {
    match field {
        PopupField::Name => "Given Name",
        PopupField::CategoryLabel => "Category",
        PopupField::Country => "Country",
        PopupField::City => "City/Town",
        PopupField::Services => "Type of Services",
        PopupField::Transportation => "Mode of Transportation",
        PopupField::Radius => "Radius",
        PopupField::DayOfWeek => "Preferred Day of Week",
        PopupField::TimeOfDay => "Preferred Time of Day",
        PopupField::Languages => "Languages Spoken",
        PopupField::Payment => "Reimbursement Method",
        PopupField::AboutMe => "About Me",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{filter_eligible, MapFilter};
    use crate::jitter::jitter_records;
    use crate::loader::{parse_table, ID_OFFSET};
    use crate::loader::tests::{table, volunteer_row};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn volunteers(rows: &[String]) -> Vec<Record> {
        parse_table(&table(rows), Category::Volunteer, ID_OFFSET).unwrap()
    }

    fn group_for(records: &[Record], category: Category, language: Language) -> Result<ClusterGroup, AtlasError> {
        let config = AtlasConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let eligible = filter_eligible(
            jitter_records(records, config.jitter, &mut rng),
            category,
            &MapFilter::default(),
        );
        build_cluster_group(&eligible, &CategoryProfile::for_category(category, &config), language)
    }

    #[test]
    fn dense_city_volunteer_uses_fixed_radius() {
        let records = volunteers(&[volunteer_row("Avery", "Toronto", "10km", ("43.65", "-79.38"), "Yes", "Yes")]);
        let group = group_for(&records, Category::Volunteer, Language::En).unwrap();
        assert_eq!(group.markers[0].radius_m, 250.0);
    }

    #[test]
    fn other_city_volunteer_scales_declared_radius() {
        let records = volunteers(&[volunteer_row("Jules", "Sudbury", "10km", ("46.49", "-80.99"), "Yes", "Yes")]);
        let group = group_for(&records, Category::Volunteer, Language::En).unwrap();
        assert_eq!(group.markers[0].radius_m, 10.0 * 1000.0);
        assert_eq!(group.markers[0].color, "#00d700");
        assert_eq!(group.name, "Volunteers");
    }

    #[test]
    fn volunteer_popup_carries_contact_link() {
        let records = volunteers(&[volunteer_row("Kiara", "Sudbury", "3km", ("46.49", "-80.99"), "Yes", "Yes")]);
        let group = group_for(&records, Category::Volunteer, Language::En).unwrap();
        let popup = &group.markers[0].popup;

        assert_eq!(popup[0].label, "Name");
        assert_eq!(popup[0].value, PopupValue::Text { text: "Kiara".to_string() });
        let contact = popup.last().unwrap();
        assert_eq!(
            contact.value,
            PopupValue::Link {
                href: "mailto:kiara@example.com?cc=volunteers.atlas@gmail.com&Subject=Delivery%20Request%20for%20Kiara"
                    .to_string(),
                text: "Contact Kiara".to_string(),
            }
        );
    }

    #[test]
    fn request_popups_never_expose_personal_details() {
        let rows: Vec<String> = ["Sam", "Robin", "Alex"]
            .iter()
            .map(|name| volunteer_row(name, "Toronto", "", ("43.7", "-79.4"), "No", "No"))
            .collect();
        let records = parse_table(&table(&rows), Category::Request, ID_OFFSET).unwrap();
        let group = group_for(&records, Category::Request, Language::En).unwrap();
        assert_eq!(group.markers.len(), records.len());

        for (marker, record) in group.markers.iter().zip(&records) {
            assert_eq!(marker.radius_m, 300.0);
            assert_eq!(marker.color, "#d77a00");
            let payload = serde_json::to_string(&marker.popup).unwrap();
            assert!(!payload.contains(&record.email), "email leaked: {payload}");
            assert!(!payload.contains(&record.name), "name leaked: {payload}");
            assert!(!payload.contains(&record.about), "about leaked: {payload}");
            assert!(!payload.contains("mailto:"));
        }
    }

    #[test]
    fn rebuilding_is_byte_identical() {
        let records = volunteers(&[
            volunteer_row("Avery", "Toronto", "10km", ("43.65", "-79.38"), "Yes", "Yes"),
            volunteer_row("Jules", "Sudbury", "4km", ("46.49", "-80.99"), "Yes", "Yes"),
        ]);
        let config = AtlasConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let eligible = filter_eligible(
            jitter_records(&records, config.jitter, &mut rng),
            Category::Volunteer,
            &MapFilter::default(),
        );
        let profile = CategoryProfile::for_category(Category::Volunteer, &config);

        let first = build_cluster_group(&eligible, &profile, Language::Fr).unwrap();
        let second = build_cluster_group(&eligible, &profile, Language::Fr).unwrap();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        assert_eq!(first.name, "Bénévoles");
    }

    #[test]
    fn missing_required_field_fails_loudly() {
        let records = volunteers(&[volunteer_row("Avery", "Sudbury", "", ("46.49", "-80.99"), "Yes", "Yes")]);
        let err = group_for(&records, Category::Volunteer, Language::En).unwrap_err();
        match err {
            AtlasError::MissingField { table, record, field } => {
                assert_eq!(table, "Volunteers");
                assert_eq!(record, records[0].id);
                assert_eq!(field, "Radius");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn request_without_city_fails_loudly() {
        let rows = vec![
            volunteer_row("Sam", "Ottawa", "", ("45.42", "-75.69"), "No", "No"),
            volunteer_row("Robin", "", "", ("45.40", "-75.70"), "No", "No"),
        ];
        let records = parse_table(&table(&rows), Category::Request, ID_OFFSET).unwrap();
        let err = group_for(&records, Category::Request, Language::En).unwrap_err();
        match err {
            AtlasError::MissingField { table, record, field } => {
                assert_eq!(table, "Requests");
                assert_eq!(record, records[1].id);
                assert_eq!(field, "City/Town");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
