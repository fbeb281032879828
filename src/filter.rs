use crate::models::{Category, Flag, JitteredRecord, Record};

/// Inclusion predicate for displaying a record on the map.
///
/// Volunteers must pass both the health and availability gates. Requests are
/// only required to be plottable.
pub fn is_eligible(record: &Record, category: Category) -> bool {
    if record.coordinate.is_none() {
        return false;
    }
    match category {
        Category::Volunteer => record.health == Flag::Eligible && record.availability == Flag::Eligible,
        Category::Request => true,
    }
}

/// Stable filter over jittered records; anything without a display position
/// is dropped regardless of category.
pub fn filter_eligible<'a>(
    items: Vec<JitteredRecord<'a>>,
    category: Category,
    map_filter: &MapFilter,
) -> Vec<JitteredRecord<'a>> {
    items
        .into_iter()
        .filter(|item| item.position.is_some())
        .filter(|item| is_eligible(item.record, category))
        .filter(|item| map_filter.matches(item.record))
        .collect()
}

pub fn count_eligible(records: &[Record], category: Category, map_filter: &MapFilter) -> usize {
    records
        .iter()
        .filter(|record| is_eligible(record, category) && map_filter.matches(record))
        .count()
}

/// Narrowing selections from the map's day, time, service and payment pickers.
/// An empty facet matches every record.
#[derive(Debug, Clone, Default)]
pub struct MapFilter {
    pub days: Vec<String>,
    pub times: Vec<String>,
    pub services: Vec<String>,
    pub payments: Vec<String>,
}

impl MapFilter {
    pub fn is_empty(&self) -> bool {
        self.days.is_empty() && self.times.is_empty() && self.services.is_empty() && self.payments.is_empty()
    }

    pub fn matches(&self, record: &Record) -> bool {
        facet_matches(&self.days, &record.preferred_days)
            && facet_matches(&self.times, &record.preferred_times)
            && facet_matches(&self.services, &record.services)
            && facet_matches(&self.payments, &record.reimbursement)
    }
}

fn facet_matches(selected: &[String], cell: &str) -> bool {
    if selected.is_empty() {
        return true;
    }
    cell.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .any(|value| selected.iter().any(|wanted| wanted.trim().eq_ignore_ascii_case(value)))
}
